use crate::device::{CommandAllocator, Fence};

/// Lifecycle of one frame context.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FrameState {
    /// Never used, or its last submission has been confirmed and consumed.
    Idle,
    /// Handed out for recording.
    Acquired,
    /// Commands submitted; completion value stamped.
    Submitted,
    /// The device reached the stamped value; reusable.
    Confirmed,
}

/// One slot of the in-flight ring.
#[derive(Debug)]
pub struct FrameContext<A> {
    pub allocator: A,
    fence_value: u64,
    state: FrameState,
}

impl<A> FrameContext<A> {
    /// Completion value stamped at the last submission; 0 means nothing pending.
    pub fn fence_value(&self) -> u64 {
        self.fence_value
    }

    pub fn state(&self) -> FrameState {
        self.state
    }
}

impl<A: CommandAllocator> FrameContext<A> {
    /// Consumes a confirmed stamp and recycles the allocator.
    fn recycle(&mut self) {
        debug_assert_ne!(self.state, FrameState::Acquired, "frame context acquired twice");
        debug_assert_ne!(self.state, FrameState::Submitted, "frame context reused before confirmation");
        self.fence_value = 0;
        self.state = FrameState::Idle;
        self.allocator.reset();
    }
}

/// Paces CPU recording against GPU completion over a ring of `N` frame contexts.
///
/// Each submission stamps its context with the next value of a monotonically
/// increasing counter and signals that value on the fence. A context is handed
/// out again only after the device has reached its stamp, so the CPU is never
/// more than `N` frames ahead.
#[derive(Debug)]
pub struct FrameSynchronizer<F, A> {
    fence: F,
    frames: Vec<FrameContext<A>>,
    frame_index: u64,
    last_signaled: u64,
}

impl<F, A> FrameSynchronizer<F, A>
where
    F: Fence,
    A: CommandAllocator,
{
    /// Creates a ring with one context per allocator.
    pub fn new(fence: F, allocators: Vec<A>) -> Self {
        assert!(!allocators.is_empty(), "frame ring needs at least one context");

        let frames = allocators
            .into_iter()
            .map(|allocator| FrameContext {
                allocator,
                fence_value: 0,
                state: FrameState::Idle,
            })
            .collect();

        Self {
            fence,
            frames,
            frame_index: 0,
            last_signaled: 0,
        }
    }

    pub fn frames_in_flight(&self) -> usize {
        self.frames.len()
    }

    /// Number of frames acquired so far.
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Last completion value signaled by a frame submission.
    pub fn last_signaled(&self) -> u64 {
        self.last_signaled
    }

    pub fn fence(&self) -> &F {
        &self.fence
    }

    pub fn context(&self, slot: usize) -> &FrameContext<A> {
        &self.frames[slot]
    }

    pub fn context_mut(&mut self, slot: usize) -> &mut FrameContext<A> {
        &mut self.frames[slot]
    }

    /// Slot of the most recently acquired frame.
    pub fn current_slot(&self) -> usize {
        (self.frame_index % self.frames.len() as u64) as usize
    }

    /// Whether the current slot holds a submission the device has not confirmed.
    pub fn is_pending(&self) -> bool {
        let value = self.frames[self.current_slot()].fence_value;
        value != 0 && self.fence.completed_value() < value
    }

    /// Advances to the next frame context, blocking until its previous
    /// submission has completed, and resets its allocator.
    ///
    /// Returns the slot index of the acquired context.
    pub fn acquire_next(&mut self) -> usize {
        self.frame_index += 1;
        let slot = self.current_slot();

        let value = self.frames[slot].fence_value;
        if value != 0 {
            if self.fence.completed_value() < value {
                log::trace!("frame {}: waiting for fence value {value}", self.frame_index);
                self.fence.wait(value);
            }
            self.frames[slot].state = FrameState::Confirmed;
        }

        let ctx = &mut self.frames[slot];
        ctx.recycle();
        ctx.state = FrameState::Acquired;
        slot
    }

    /// Signals the next completion value for the frame in `slot`.
    ///
    /// Must be called after the frame's commands have been executed on the queue.
    pub fn submit(&mut self, slot: usize) -> u64 {
        let ctx = &mut self.frames[slot];
        debug_assert_eq!(ctx.state, FrameState::Acquired, "submitting a frame that was not acquired");

        let value = self.last_signaled + 1;
        self.fence.signal(value);
        self.last_signaled = value;

        ctx.fence_value = value;
        ctx.state = FrameState::Submitted;
        value
    }

    /// Returns an acquired context to idle without submitting it.
    ///
    /// Used when a frame is abandoned after acquisition.
    pub fn abandon(&mut self, slot: usize) {
        let ctx = &mut self.frames[slot];
        if ctx.state == FrameState::Acquired {
            ctx.state = FrameState::Idle;
        }
    }

    /// Blocks until the most recently acquired frame's submission completes.
    ///
    /// Does not advance the frame index. A zero stamp means nothing is pending.
    pub fn wait_for_last_submitted(&mut self) {
        let slot = self.current_slot();
        let ctx = &mut self.frames[slot];

        let value = ctx.fence_value;
        if value == 0 {
            return;
        }
        ctx.fence_value = 0;
        ctx.state = FrameState::Confirmed;

        if self.fence.completed_value() >= value {
            return;
        }
        self.fence.wait(value);
    }

    /// Blocks until every signaled frame has completed.
    pub fn wait_idle(&mut self) {
        if self.last_signaled != 0 && self.fence.completed_value() < self.last_signaled {
            self.fence.wait(self.last_signaled);
        }
        for ctx in &mut self.frames {
            if ctx.fence_value != 0 {
                ctx.fence_value = 0;
                ctx.state = FrameState::Confirmed;
            }
        }
    }
}
