//! Concurrent GPU virtual-address map (§4.2, §8 scenario 1).
//!
//! A `VaMap` answers "which resource owns this `GetGPUVirtualAddress()`
//! value" without a global lock on the read path. Large allocations
//! (`size >= VA_BLOCK_SIZE`) are indexed by a radix tree of fixed-size
//! blocks; each block has two slots (`lo`/`hi`) so a single block can
//! simultaneously be "the tail of resource A" and "the head of resource B".
//! Small allocations fall back to a mutex-guarded sorted array searched by
//! binary search, since a radix tree sized for tiny allocations would be
//! mostly empty blocks.
//!
//! This is a direct re-expression of `vkd3d_va_map_insert`/`_remove`/`_deref`
//! in `examples/original_source/libs/vkd3d/va_map.c`.

use std::sync::atomic::{AtomicPtr, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Number of low bits that select a block within a tree leaf (1024 blocks/leaf).
const BLOCK_INDEX_BITS: u32 = 10;
/// Size in bytes of the region a single block covers.
const BLOCK_SIZE_BITS: u32 = 16;
const BLOCK_SIZE: u64 = 1 << BLOCK_SIZE_BITS;
const BLOCK_LO_MASK: u64 = BLOCK_SIZE - 1;
const BLOCK_INDEX_MASK: u64 = (1 << BLOCK_INDEX_BITS) - 1;
/// Fan-out of each radix tree level (16-way).
const NEXT_BITS: u32 = 4;
const NEXT_MASK: u64 = (1 << NEXT_BITS) - 1;
const NEXT_ARITY: usize = 1 << NEXT_BITS;

/// Below this size, a resource is tracked in the small-entry array rather
/// than the radix tree, since a dedicated block per allocation would waste
/// more memory than the allocation itself.
pub const VA_BLOCK_SIZE: u64 = BLOCK_SIZE;

/// Anything with a GPU virtual-address range that the VA map can track.
pub trait VaRange {
    fn va(&self) -> u64;
    fn size(&self) -> u64;
}

struct Slot<T> {
    /// See module docs: meaning differs between `lo` and `hi`.
    bound: AtomicU64,
    resource: AtomicPtr<T>,
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self {
            bound: AtomicU64::new(0),
            resource: AtomicPtr::new(std::ptr::null_mut()),
        }
    }
}

struct Block<T> {
    /// Covers `va < lo.bound` when a resource begins at or before this block
    /// and extends into it.
    lo: Slot<T>,
    /// Covers `va >= hi.bound` when a resource begins inside this block.
    hi: Slot<T>,
}

impl<T> Default for Block<T> {
    fn default() -> Self {
        Self {
            lo: Slot::default(),
            hi: Slot::default(),
        }
    }
}

struct Tree<T> {
    next: [AtomicPtr<Tree<T>>; NEXT_ARITY],
    blocks: Vec<Block<T>>,
}

impl<T> Tree<T> {
    fn new() -> Self {
        let mut blocks = Vec::with_capacity(1 << BLOCK_INDEX_BITS);
        blocks.resize_with(1 << BLOCK_INDEX_BITS, Block::default);
        Self {
            next: std::array::from_fn(|_| AtomicPtr::new(std::ptr::null_mut())),
            blocks,
        }
    }
}

impl<T> Drop for Tree<T> {
    fn drop(&mut self) {
        for slot in &self.next {
            let ptr = slot.load(Ordering::Relaxed);
            if !ptr.is_null() {
                unsafe {
                    drop(Box::from_raw(ptr));
                }
            }
        }
    }
}

fn next_address(va: u64) -> u64 {
    va >> (BLOCK_SIZE_BITS + BLOCK_INDEX_BITS)
}

fn block_index(va: u64) -> usize {
    ((va >> BLOCK_SIZE_BITS) & BLOCK_INDEX_MASK) as usize
}

/// Concurrent sparse map from a 64-bit GPU virtual address to the resource
/// that owns it. Lookups never take a lock on the radix-tree path; only
/// small-allocation lookups and any tree-growing insert take the small-entry
/// mutex or pay a CAS respectively.
pub struct VaMap<T: VaRange> {
    tree: Tree<T>,
    small_entries: Mutex<Vec<Arc<T>>>,
}

impl<T: VaRange> Default for VaMap<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: VaRange> VaMap<T> {
    pub fn new() -> Self {
        Self {
            tree: Tree::new(),
            small_entries: Mutex::new(Vec::new()),
        }
    }

    fn find_block(&self, va: u64) -> Option<&Block<T>> {
        let mut next = next_address(va);
        let mut tree = &self.tree;
        while next != 0 {
            let child = tree.next[(next & NEXT_MASK) as usize].load(Ordering::Acquire);
            if child.is_null() {
                return None;
            }
            tree = unsafe { &*child };
            next >>= NEXT_BITS;
        }
        Some(&tree.blocks[block_index(va)])
    }

    /// Finds the block for `va`, growing the tree as needed. Growth installs
    /// new subtrees with a release-ordered CAS; a thread that loses the race
    /// frees its draft and walks into the winner's subtree.
    fn get_or_grow_block(&self, va: u64) -> &Block<T> {
        let mut next = next_address(va);
        let mut tree = &self.tree;
        while next != 0 {
            let slot = &tree.next[(next & NEXT_MASK) as usize];
            let mut child = slot.load(Ordering::Acquire);
            if child.is_null() {
                let draft = Box::into_raw(Box::new(Tree::new()));
                match slot.compare_exchange(
                    std::ptr::null_mut(),
                    draft,
                    Ordering::Release,
                    Ordering::Acquire,
                ) {
                    Ok(_) => child = draft,
                    Err(existing) => {
                        unsafe {
                            drop(Box::from_raw(draft));
                        }
                        child = existing;
                    }
                }
            }
            tree = unsafe { &*child };
            next >>= NEXT_BITS;
        }
        &tree.blocks[block_index(va)]
    }

    fn find_small_index(entries: &[Arc<T>], va: u64) -> (Option<usize>, usize) {
        let mut lo = 0usize;
        let mut hi = entries.len();
        let mut found = None;
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let r = &entries[mid];
            if va < r.va() {
                hi = mid;
            } else if va >= r.va() + r.size() {
                lo = mid + 1;
            } else {
                lo = mid;
                hi = mid;
                found = Some(mid);
            }
        }
        (found, lo)
    }

    /// Registers `resource`'s address range in the map. Resources of at
    /// least [`VA_BLOCK_SIZE`] write their bounds into every block they
    /// touch; smaller ones are inserted into the sorted small-entry array.
    pub fn insert(&self, resource: Arc<T>) {
        if resource.size() >= VA_BLOCK_SIZE {
            let min_va = resource.va();
            let max_va = min_va + resource.size();
            let mut block_va = min_va & !BLOCK_LO_MASK;
            let raw = Arc::as_ptr(&resource) as *mut T;
            while block_va < max_va {
                let block = self.get_or_grow_block(block_va);
                if block_va < min_va {
                    block.hi.bound.store(min_va, Ordering::Release);
                    block.hi.resource.store(raw, Ordering::Release);
                } else {
                    block.lo.bound.store(max_va, Ordering::Release);
                    block.lo.resource.store(raw, Ordering::Release);
                }
                block_va += BLOCK_SIZE;
            }
            // Every block slot stores the same raw pointer; the map holds
            // exactly one strong reference for the whole allocation,
            // regardless of how many blocks it touches. `remove` drops it.
            std::mem::forget(resource);
        } else {
            let mut entries = self.small_entries.lock().unwrap();
            let (existing, index) = Self::find_small_index(&entries, resource.va());
            if existing.is_none() {
                entries.insert(index, resource);
            }
        }
    }

    /// Removes a previously inserted resource's address range.
    pub fn remove(&self, resource: &Arc<T>) {
        if resource.size() >= VA_BLOCK_SIZE {
            let min_va = resource.va();
            let max_va = min_va + resource.size();
            let mut block_va = min_va & !BLOCK_LO_MASK;
            let target = Arc::as_ptr(resource) as *mut T;
            let mut found_any = false;
            while block_va < max_va {
                if let Some(block) = self.find_block(block_va) {
                    if block.lo.resource.load(Ordering::Acquire) == target {
                        block.lo.bound.store(0, Ordering::Release);
                        block.lo.resource.store(std::ptr::null_mut(), Ordering::Release);
                        found_any = true;
                    } else if block.hi.resource.load(Ordering::Acquire) == target {
                        block.hi.bound.store(0, Ordering::Release);
                        block.hi.resource.store(std::ptr::null_mut(), Ordering::Release);
                        found_any = true;
                    }
                }
                block_va += BLOCK_SIZE;
            }
            // Undo the single `mem::forget` `insert` performed for the whole
            // allocation, regardless of how many blocks it touched.
            if found_any {
                unsafe {
                    Arc::decrement_strong_count(target);
                }
            }
        } else {
            let mut entries = self.small_entries.lock().unwrap();
            let (existing, index) = Self::find_small_index(&entries, resource.va());
            if existing == Some(index) {
                entries.remove(index);
            }
        }
    }

    /// Resolves a GPU virtual address back to its owning resource, or `None`
    /// if `va` is outside any known allocation.
    pub fn deref(&self, va: u64) -> Option<Arc<T>> {
        if let Some(block) = self.find_block(va) {
            let lo_bound = block.lo.bound.load(Ordering::Acquire);
            if lo_bound != 0 && va < lo_bound {
                let ptr = block.lo.resource.load(Ordering::Acquire);
                if !ptr.is_null() {
                    unsafe {
                        Arc::increment_strong_count(ptr);
                        return Some(Arc::from_raw(ptr));
                    }
                }
            }
            let hi_bound = block.hi.bound.load(Ordering::Acquire);
            if hi_bound != 0 && va >= hi_bound {
                let ptr = block.hi.resource.load(Ordering::Acquire);
                if !ptr.is_null() {
                    unsafe {
                        Arc::increment_strong_count(ptr);
                        return Some(Arc::from_raw(ptr));
                    }
                }
            }
        }
        let entries = self.small_entries.lock().unwrap();
        let (found, _) = Self::find_small_index(&entries, va);
        found.map(|i| entries[i].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Buf {
        va: u64,
        size: u64,
    }

    impl VaRange for Buf {
        fn va(&self) -> u64 {
            self.va
        }

        fn size(&self) -> u64 {
            self.size
        }
    }

    #[test]
    fn small_allocation_round_trips() {
        let map: VaMap<Buf> = VaMap::new();
        let res = Arc::new(Buf {
            va: 0x1000,
            size: 4096,
        });
        map.insert(res.clone());
        assert!(Arc::ptr_eq(&map.deref(0x1000).unwrap(), &res));
        assert!(Arc::ptr_eq(&map.deref(0x1FFF).unwrap(), &res));
        assert!(map.deref(0x2000).is_none());
        map.remove(&res);
        assert!(map.deref(0x1000).is_none());
    }

    #[test]
    fn large_allocation_spans_multiple_blocks() {
        let map: VaMap<Buf> = VaMap::new();
        let size = VA_BLOCK_SIZE * 3;
        let res = Arc::new(Buf {
            va: 0x1_0000_0000,
            size,
        });
        map.insert(res.clone());
        assert!(Arc::ptr_eq(&map.deref(res.va).unwrap(), &res));
        assert!(Arc::ptr_eq(&map.deref(res.va + size - 1).unwrap(), &res));
        assert!(map.deref(res.va + size).is_none());
        map.remove(&res);
        assert!(map.deref(res.va).is_none());
    }

    #[test]
    fn deref_outside_any_resource_is_null() {
        let map: VaMap<Buf> = VaMap::new();
        assert!(map.deref(0xDEAD_BEEF).is_none());
    }

    #[test]
    fn disjoint_concurrent_inserts_agree_with_single_threaded_reference() {
        use std::thread;
        let map: Arc<VaMap<Buf>> = Arc::new(VaMap::new());
        let mut handles = vec![];
        for i in 0..16u64 {
            let map = map.clone();
            handles.push(thread::spawn(move || {
                let res = Arc::new(Buf {
                    va: i * VA_BLOCK_SIZE * 4,
                    size: VA_BLOCK_SIZE * 2,
                });
                map.insert(res.clone());
                res
            }));
        }
        let resources: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for res in &resources {
            assert!(Arc::ptr_eq(&map.deref(res.va).unwrap(), res));
        }
    }
}
