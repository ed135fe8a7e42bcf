use std::cell::RefCell;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::api::Fence;

/// Completion counter built on wgpu submission indices.
///
/// `signal(v)` closes the current queue batch, remembers its submission index
/// under `v`, and registers a work-done callback that publishes `v`. `wait(v)`
/// polls the device until that submission has retired.
pub struct WgpuFence {
    device: wgpu::Device,
    queue: wgpu::Queue,
    completed: Arc<AtomicU64>,
    pending: RefCell<VecDeque<(u64, wgpu::SubmissionIndex)>>,
}

impl WgpuFence {
    pub(crate) fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self {
            device,
            queue,
            completed: Arc::new(AtomicU64::new(0)),
            pending: RefCell::new(VecDeque::new()),
        }
    }

    fn retire_up_to(&self, value: u64) {
        self.completed.fetch_max(value, Ordering::AcqRel);
        self.retire_completed();
    }

    /// Drops submission indices the device has already reached.
    fn retire_completed(&self) {
        let completed = self.completed_value();
        let mut pending = self.pending.borrow_mut();
        while pending.front().is_some_and(|(v, _)| *v <= completed) {
            pending.pop_front();
        }
    }
}

impl Fence for WgpuFence {
    fn signal(&self, value: u64) {
        // An empty submit yields an index ordered after everything already queued.
        let index = self.queue.submit(std::iter::empty());

        let completed = Arc::clone(&self.completed);
        self.queue.on_submitted_work_done(move || {
            completed.fetch_max(value, Ordering::AcqRel);
        });

        // Bounds the queue for callers that never wait.
        self.retire_completed();
        self.pending.borrow_mut().push_back((value, index));
    }

    fn completed_value(&self) -> u64 {
        self.completed.load(Ordering::Acquire)
    }

    fn wait(&self, value: u64) {
        if self.completed_value() >= value {
            self.retire_completed();
            return;
        }

        let index = self
            .pending
            .borrow()
            .iter()
            .find(|(v, _)| *v >= value)
            .map(|(_, index)| index.clone());

        let Some(index) = index else {
            log::warn!("fence wait on value {value} that was never signaled");
            return;
        };

        if let Err(err) = self.device.poll(wgpu::PollType::Wait {
            submission_index: Some(index),
            timeout: None,
        }) {
            log::error!("device poll failed while waiting for fence value {value}: {err}");
        }

        self.retire_up_to(value);
    }
}
