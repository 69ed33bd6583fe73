//! Synchronization primitives, from plain Vulkan wrappers up to the D3D12
//! fence/queue model (§3, §4.8, §4.9).
//!
//! - [`fence`] / [`semaphore`] / [`execution_manager`] / [`submit_batch`] are
//! the underlying frame-submission helpers: a binary-semaphore-chained,
//! single-`vkQueueSubmit2`-per-frame pattern, kept around because
//! [`crate::wsi`] still builds on it.
//! - [`timeline_semaphore`] wraps a `VK_SEMAPHORE_TYPE_TIMELINE` semaphore.
//! - [`d3d12_fence`] is the `ID3D12Fence` entity: `Signal`,
//! `GetCompletedValue`, `SetEventOnCompletion`.
//! - [`host_event`] is the Win32-`Event`-like primitive those waits complete.
//! - [`fence_worker`] batches `vkWaitSemaphores` calls across every
//! registered waiter on a single background thread per device.
//! - [`command_queue`] is the per-queue submission engine: one mailbox, one
//! submission thread, one internal timeline semaphore.
//! - [`queue_timeline`] is the optional profiling hook `command_queue`'s
//! submission thread calls on enqueue/retire.

pub mod command_queue;
pub mod d3d12_fence;
pub mod domain;
pub mod execution_manager;
pub mod fence;
pub mod fence_worker;
pub mod host_event;
pub mod queue_timeline;
pub mod semaphore;
pub mod submit_batch;
pub mod timeline_semaphore;
