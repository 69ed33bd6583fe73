//! Per-queue submission engine (§4.8 "Command Queue and Submission Engine").
//!
//! Each [`CommandQueue`] owns a background submission thread, an internal
//! timeline semaphore with its own monotonic counter, and an MPSC mailbox of
//! [`SubmissionRecord`]s. The API thread (`ExecuteCommandLists`, `Signal`,
//! `Wait`, ...) only ever pushes a record into the mailbox; all actual
//! `vkQueueSubmit2`/`vkQueueBindSparse`/`vkQueuePresentKHR` calls happen on
//! the submission thread, in enqueue order, which is what gives D3D12's
//! per-queue ordering guarantee (§5 "Within a queue: submission order == GPU
//! execution order").

use std::any::Any;
use std::sync::atomic::Ordering;
use std::sync::mpsc::{Receiver, Sender};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use ash::vk;

use crate::core::atomic::MonotonicCounter;
use crate::core::device::DeviceRemovedReason;
use crate::core::queue::DeviceQueue;
use crate::sync::d3d12_fence::D3D12Fence;
use crate::sync::fence_worker::FenceWorker;
use crate::sync::queue_timeline::{QueueLabel, QueueTimelineObserver};
use crate::sync::timeline_semaphore::TimelineSemaphore;
use crate::Device;

/// A sparse-residency bind for a single `VkBuffer` or the opaque portion of a
/// `VkImage`, the two shapes `CreateReservedResource` + `UpdateTileMappings`
/// reduce to once split per-resource (§4.8 "SparseBind").
pub struct SparseBufferBind {
    pub buffer: vk::Buffer,
    pub binds: Vec<vk::SparseMemoryBind>,
}

pub struct SparseImageOpaqueBind {
    pub image: vk::Image,
    pub binds: Vec<vk::SparseMemoryBind>,
}

/// One entry in a queue's submission mailbox (§4.8). The five shapes named in
/// the design mirror `ID3D12CommandQueue`'s `ExecuteCommandLists`, the sparse
/// update entry points, `Signal`/`Wait`, and `Present`.
pub enum SubmissionRecord {
    ExecuteCommandLists {
        command_buffers: Vec<vk::CommandBuffer>,
        /// Resources, PSOs, and command allocators this batch references;
        /// retained until the queue's timeline reaches the value this batch
        /// signals, then dropped (§4.8 step 5).
        retained: Vec<Box<dyn Any + Send>>,
    },
    SparseBind {
        buffer_binds: Vec<SparseBufferBind>,
        image_opaque_binds: Vec<SparseImageOpaqueBind>,
    },
    Signal {
        fence: Arc<D3D12Fence>,
        value: u64,
    },
    Wait {
        fence: Arc<D3D12Fence>,
        value: u64,
    },
    Present {
        swapchain: vk::SwapchainKHR,
        image_index: u32,
        wait_semaphore: vk::Semaphore,
    },
}

/// A `{worker-observed batch}` handle kept alive only until the queue's
/// internal timeline reaches `retire_at`.
struct RetainedBatch {
    retire_at: u64,
    #[allow(dead_code)]
    objects: Vec<Box<dyn Any + Send>>,
}

struct Inner {
    device: Device,
    vk_queue: Arc<Mutex<DeviceQueue>>,
    timeline: TimelineSemaphore,
    counter: MonotonicCounter,
    receiver: Mutex<Receiver<SubmissionRecord>>,
    pending_retain: Mutex<Vec<RetainedBatch>>,
    fence_worker: Arc<FenceWorker>,
    swapchain_khr: Option<ash::extensions::khr::Swapchain>,
    label: QueueLabel,
    observer: Option<Arc<dyn QueueTimelineObserver>>,
}

/// Per-queue submission engine (§4.8). Cloning a `CommandQueue` clones the
/// `Arc` handle; all clones share the same mailbox and submission thread.
pub struct CommandQueue {
    inner: Arc<Inner>,
    sender: Sender<SubmissionRecord>,
    thread: Mutex<Option<std::thread::JoinHandle<()>>>,
}

impl CommandQueue {
    pub fn new(
        device: Device,
        vk_queue: Arc<Mutex<DeviceQueue>>,
        fence_worker: Arc<FenceWorker>,
        swapchain_khr: Option<ash::extensions::khr::Swapchain>,
        label: QueueLabel,
        observer: Option<Arc<dyn QueueTimelineObserver>>,
    ) -> Result<Self> {
        let timeline = TimelineSemaphore::new(device.clone(), 0)?;
        let (sender, receiver) = std::sync::mpsc::channel();
        let inner = Arc::new(Inner {
            device,
            vk_queue,
            timeline,
            counter: MonotonicCounter::new(),
            receiver: Mutex::new(receiver),
            pending_retain: Mutex::new(Vec::new()),
            fence_worker,
            swapchain_khr,
            label,
            observer,
        });
        let thread_inner = inner.clone();
        let handle = std::thread::Builder::new()
            .name("d3d12vk-submission".into())
            .spawn(move || Self::run(thread_inner))
            .expect("failed to spawn submission thread");
        Ok(Self {
            inner,
            sender,
            thread: Mutex::new(Some(handle)),
        })
    }

    /// Enqueues a record onto this queue's mailbox (API thread, producer side).
    pub fn enqueue(&self, record: SubmissionRecord) {
        // A closed receiver only happens once the queue itself, and hence the
        // submission thread, has already been torn down.
        let _ = self.sender.send(record);
    }

    fn run(inner: Arc<Inner>) {
        loop {
            let record = {
                let receiver = inner.receiver.lock().unwrap();
                receiver.recv()
            };
            let record = match record {
                Ok(r) => r,
                Err(_) => break, // sender dropped: device teardown (§4.8 "Cancellation").
            };
            if let Err(e) = Self::process(&inner, record) {
                log::error!("submission thread: {e}");
                inner.device.report_device_removed(DeviceRemovedReason::Unknown);
            }
            Self::reap_retained(&inner);
        }
        // Drain anything still queued so no producer blocks forever on a full
        // mailbox, then signal the timeline to infinity so any fence worker
        // wait unblocks (§4.8 "Cancellation").
        let receiver = inner.receiver.lock().unwrap();
        while receiver.try_recv().is_ok() {}
        let _ = inner.timeline.signal(u64::MAX);
    }

    fn process(inner: &Arc<Inner>, record: SubmissionRecord) -> Result<()> {
        match record {
            SubmissionRecord::ExecuteCommandLists {
                command_buffers,
                retained,
            } => {
                let value = inner.counter.next();
                let submit_info = vk::SubmitInfo2::builder()
                    .command_buffer_infos(&command_buffers_info(&command_buffers))
                    .signal_semaphore_infos(&[vk::SemaphoreSubmitInfo::builder()
                        .semaphore(unsafe { inner.timeline.handle() })
                        .value(value)
                        .stage_mask(vk::PipelineStageFlags2::ALL_COMMANDS)
                        .build()]);
                let queue = inner.vk_queue.lock().unwrap();
                unsafe { inner.device.queue_submit2(queue.handle, std::slice::from_ref(&submit_info), vk::Fence::null())? };
                drop(queue);
                if let Some(observer) = &inner.observer {
                    observer.on_enqueue(inner.label, value, "ExecuteCommandLists");
                }
                inner.pending_retain.lock().unwrap().push(RetainedBatch {
                    retire_at: value,
                    objects: retained,
                });
            }
            SubmissionRecord::SparseBind {
                buffer_binds,
                image_opaque_binds,
            } => {
                let buffer_infos: Vec<vk::SparseBufferMemoryBindInfo> = buffer_binds
                    .iter()
                    .map(|b| {
                        vk::SparseBufferMemoryBindInfo::builder()
                            .buffer(b.buffer)
                            .binds(&b.binds)
                            .build()
                    })
                    .collect();
                let image_infos: Vec<vk::SparseImageOpaqueMemoryBindInfo> = image_opaque_binds
                    .iter()
                    .map(|i| {
                        vk::SparseImageOpaqueMemoryBindInfo::builder()
                            .image(i.image)
                            .binds(&i.binds)
                            .build()
                    })
                    .collect();
                let bind_info = vk::BindSparseInfo::builder()
                    .buffer_binds(&buffer_infos)
                    .image_opaque_binds(&image_infos);
                let queue = inner.vk_queue.lock().unwrap();
                unsafe { inner.device.queue_bind_sparse(queue.handle, std::slice::from_ref(&bind_info), vk::Fence::null())? };
            }
            SubmissionRecord::Signal {
                fence,
                value,
            } => {
                // GPU-ordered signal: an empty submit that only signals, so it
                // is sequenced after every ExecuteCommandLists enqueued before
                // it on this queue (§4.8 step 4).
                let submit_info = vk::SubmitInfo2::builder().signal_semaphore_infos(&[vk::SemaphoreSubmitInfo::builder()
                    .semaphore(unsafe { fence.timeline().handle() })
                    .value(value)
                    .stage_mask(vk::PipelineStageFlags2::ALL_COMMANDS)
                    .build()]);
                let queue = inner.vk_queue.lock().unwrap();
                unsafe { inner.device.queue_submit2(queue.handle, std::slice::from_ref(&submit_info), vk::Fence::null())? };
            }
            SubmissionRecord::Wait {
                fence,
                value,
            } => {
                // Held here until observed, possibly signaled by a different
                // queue entirely -- this is what makes D3D12's "wait on a
                // value not yet signaled" legal (§4.8 "Ordering guarantees").
                fence.timeline().wait(value, u64::MAX)?;
            }
            SubmissionRecord::Present {
                swapchain,
                image_index,
                wait_semaphore,
            } => {
                let khr = inner
                    .swapchain_khr
                    .as_ref()
                    .expect("Present record enqueued on a queue with no swapchain extension loaded");
                let swapchains = [swapchain];
                let indices = [image_index];
                let waits = [wait_semaphore];
                let present_info = vk::PresentInfoKHR::builder()
                    .wait_semaphores(&waits)
                    .swapchains(&swapchains)
                    .image_indices(&indices);
                let queue = inner.vk_queue.lock().unwrap();
                unsafe { khr.queue_present(queue.handle, &present_info)? };
            }
        }
        Ok(())
    }

    /// Drops the `retained` payload of every batch whose signal value the
    /// timeline has now reached (§4.8 step 5).
    fn reap_retained(inner: &Arc<Inner>) {
        let reached = inner.timeline.counter_value().unwrap_or(0);
        if let Some(observer) = &inner.observer {
            let retained = inner.pending_retain.lock().unwrap();
            for batch in retained.iter().filter(|b| b.retire_at <= reached) {
                observer.on_retire(inner.label, batch.retire_at);
            }
        }
        inner.pending_retain.lock().unwrap().retain(|b| b.retire_at > reached);
    }

    pub fn timeline_value(&self) -> u64 {
        self.inner.timeline.counter_value().unwrap_or(0)
    }
}

impl Drop for CommandQueue {
    fn drop(&mut self) {
        // Dropping `sender` (there is exactly one, owned by this struct)
        // closes the channel, which unblocks the submission thread's `recv`.
        if let Some(handle) = self.thread.lock().unwrap().take() {
            let _ = handle.join();
        }
    }
}

fn command_buffers_info(buffers: &[vk::CommandBuffer]) -> Vec<vk::CommandBufferSubmitInfo> {
    buffers
        .iter()
        .map(|cb| vk::CommandBufferSubmitInfo::builder().command_buffer(*cb).build())
        .collect()
}

#[cfg(test)]
mod tests {
    // Submission requires a live VkQueue; covered by the integration tests
    // under `tests/`.
}
