use super::{CpuDescriptorHandle, DescriptorHeapInfo, DescriptorPair, GpuDescriptorHandle};

/// Hands out fixed-size slots of a shader-visible descriptor heap.
///
/// The free list is a LIFO stack seeded with `capacity - 1 ..= 0`, so a fresh
/// allocator returns index 0 first and the most recently freed index is always
/// reused next. The heap never grows; capacity is fixed at creation.
///
/// Exhaustion through [`alloc`](Self::alloc) is a configuration error and panics.
/// Callers that need to back out gracefully use [`try_alloc`](Self::try_alloc).
#[derive(Debug)]
pub struct DescriptorSlotAllocator {
    heap: DescriptorHeapInfo,
    free_indices: Vec<u32>,
}

impl DescriptorSlotAllocator {
    /// Creates an allocator covering every slot of `heap`.
    pub fn new(heap: DescriptorHeapInfo) -> Self {
        assert!(heap.increment > 0, "descriptor heap increment must be non-zero");

        let mut free_indices = Vec::with_capacity(heap.capacity as usize);
        for n in (0..heap.capacity).rev() {
            free_indices.push(n);
        }

        Self { heap, free_indices }
    }

    /// Heap geometry this allocator was created for.
    pub fn heap(&self) -> DescriptorHeapInfo {
        self.heap
    }

    pub fn capacity(&self) -> u32 {
        self.heap.capacity
    }

    /// Number of slots currently available.
    pub fn free_count(&self) -> usize {
        self.free_indices.len()
    }

    /// Number of slots currently handed out.
    pub fn allocated_count(&self) -> usize {
        self.heap.capacity as usize - self.free_indices.len()
    }

    /// Allocates a slot.
    ///
    /// # Panics
    /// Panics when the heap is exhausted. The heap must be sized for the
    /// worst-case number of live textures.
    pub fn alloc(&mut self) -> DescriptorPair {
        match self.try_alloc() {
            Some(pair) => pair,
            None => panic!(
                "descriptor heap exhausted ({} slots); raise RendererConfig::descriptor_capacity",
                self.heap.capacity
            ),
        }
    }

    /// Allocates a slot, returning `None` when the heap is exhausted.
    pub fn try_alloc(&mut self) -> Option<DescriptorPair> {
        let index = self.free_indices.pop()?;
        Some(self.handles_for(index))
    }

    /// Returns a slot to the free list.
    ///
    /// Both handles must address the same slot inside the heap. Freeing a slot
    /// twice is a caller bug; debug builds catch it.
    pub fn free(&mut self, pair: DescriptorPair) {
        let cpu_index = self.cpu_index(pair.cpu);
        let gpu_index = self.gpu_index(pair.gpu);
        assert_eq!(
            cpu_index, gpu_index,
            "descriptor handles disagree: cpu slot {cpu_index:?}, gpu slot {gpu_index:?}"
        );
        let index = match cpu_index {
            Some(index) if index < self.heap.capacity => index,
            _ => panic!(
                "descriptor handle {:#x} outside heap of {} slots",
                pair.cpu.0, self.heap.capacity
            ),
        };
        debug_assert!(
            !self.free_indices.contains(&index),
            "descriptor slot {index} freed twice"
        );

        self.free_indices.push(index);
    }

    /// Computes the handle pair for `index`.
    pub fn handles_for(&self, index: u32) -> DescriptorPair {
        let offset = u64::from(index) * self.heap.increment;
        DescriptorPair {
            index,
            cpu: CpuDescriptorHandle(self.heap.cpu_start.0 + offset),
            gpu: GpuDescriptorHandle(self.heap.gpu_start.0 + offset),
        }
    }

    /// Returns the slot index a pair refers to, if both handles agree and lie
    /// inside the heap.
    pub fn index_of(&self, pair: DescriptorPair) -> Option<u32> {
        let index = self.cpu_index(pair.cpu)?;
        (self.gpu_index(pair.gpu) == Some(index) && index < self.heap.capacity).then_some(index)
    }

    fn cpu_index(&self, handle: CpuDescriptorHandle) -> Option<u32> {
        slot_index(handle.0, self.heap.cpu_start.0, self.heap.increment)
    }

    fn gpu_index(&self, handle: GpuDescriptorHandle) -> Option<u32> {
        slot_index(handle.0, self.heap.gpu_start.0, self.heap.increment)
    }
}

/// Index of the slot starting at `handle`; `None` below the base, between
/// slots, or past `u32`.
fn slot_index(handle: u64, start: u64, increment: u64) -> Option<u32> {
    let offset = handle.checked_sub(start)?;
    if offset % increment != 0 {
        return None;
    }
    u32::try_from(offset / increment).ok()
}
