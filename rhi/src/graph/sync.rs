//! GPU synchronization state owned by the frame scheduler.
//!
//! Each queue has one timeline semaphore. Every pass submitted to a queue
//! signals the next value on that queue's timeline, and a pass on another
//! queue that depends on it waits for that value. Frame fences bound how far
//! the CPU may run ahead of the GPU: slot `frame_index % frame_count` is
//! waited on before the slot is reused.

use crate::backend::{
    BackendResult, FenceHandle, GpuBackend, SemaphoreHandle, SemaphoreSignal, SemaphoreWait,
};
use crate::types::QueueType;

use super::barrier::PipelineStage;

/// Timeline semaphore of one queue.
#[derive(Debug)]
pub struct QueueTimeline {
    queue: QueueType,
    semaphore: SemaphoreHandle,
    /// Last value handed out.
    value: u64,
}

impl QueueTimeline {
    pub(crate) fn new(backend: &dyn GpuBackend, queue: QueueType) -> BackendResult<Self> {
        Ok(Self {
            queue,
            semaphore: backend.create_timeline_semaphore(0)?,
            value: 0,
        })
    }

    pub fn queue(&self) -> QueueType {
        self.queue
    }

    pub fn semaphore(&self) -> SemaphoreHandle {
        self.semaphore
    }

    /// Last value assigned to a submission.
    pub fn value(&self) -> u64 {
        self.value
    }

    /// Reserve the next value for a submission.
    pub(crate) fn advance(&mut self) -> u64 {
        self.value += 1;
        self.value
    }

    pub(crate) fn signal(&self, value: u64) -> SemaphoreSignal {
        SemaphoreSignal {
            semaphore: self.semaphore,
            value,
        }
    }

    pub(crate) fn wait(&self, value: u64, stage: PipelineStage) -> SemaphoreWait {
        SemaphoreWait {
            semaphore: self.semaphore,
            value,
            stage,
        }
    }
}

/// Cross-queue waits of one pass, at most one per queue.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct QueueWaits {
    values: [Option<(u64, PipelineStage)>; QueueType::ALL.len()],
}

impl QueueWaits {
    /// Wait for `value` on `queue`. Keeps the larger value if one is present.
    pub(crate) fn add(&mut self, queue: QueueType, value: u64, stage: PipelineStage) {
        let slot = &mut self.values[queue.index()];
        *slot = Some(match *slot {
            Some((existing, stages)) => (existing.max(value), stages | stage),
            None => (value, stage),
        });
    }

    /// Returns true if a wait on `queue` for at least `value` is present.
    pub(crate) fn covers(&self, queue: QueueType, value: u64) -> bool {
        self.values[queue.index()].is_some_and(|(existing, _)| existing >= value)
    }

    pub(crate) fn resolve(&self, timelines: &[QueueTimeline]) -> Vec<SemaphoreWait> {
        timelines
            .iter()
            .filter_map(|timeline| {
                self.values[timeline.queue().index()]
                    .map(|(value, stage)| timeline.wait(value, stage))
            })
            .collect()
    }
}

/// Per-slot frame fences.
#[derive(Debug)]
pub struct FrameFences {
    fences: Vec<FenceHandle>,
    submitted: Vec<bool>,
}

impl FrameFences {
    pub(crate) fn new(backend: &dyn GpuBackend, frame_count: usize) -> BackendResult<Self> {
        let mut fences = Vec::with_capacity(frame_count);
        for _ in 0..frame_count {
            match backend.create_fence(false) {
                Ok(fence) => fences.push(fence),
                Err(err) => {
                    for fence in fences {
                        backend.destroy_fence(fence);
                    }
                    return Err(err);
                }
            }
        }
        Ok(Self {
            fences,
            submitted: vec![false; frame_count],
        })
    }

    /// Number of frame slots.
    pub fn len(&self) -> usize {
        self.fences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fences.is_empty()
    }

    /// Slot used by the frame with the given index.
    pub fn slot(&self, frame_index: u64) -> usize {
        (frame_index % self.fences.len() as u64) as usize
    }

    pub fn fence(&self, slot: usize) -> FenceHandle {
        self.fences[slot]
    }

    /// Returns true if work signaling the slot's fence is in flight.
    pub fn is_submitted(&self, slot: usize) -> bool {
        self.submitted[slot]
    }

    pub(crate) fn mark_submitted(&mut self, slot: usize) {
        self.submitted[slot] = true;
    }

    /// Wait for the slot's previous frame and reset its fence.
    ///
    /// Returns false if nothing was submitted in the slot yet.
    pub(crate) fn wait_and_reset(
        &mut self,
        backend: &dyn GpuBackend,
        slot: usize,
    ) -> BackendResult<bool> {
        if !self.submitted[slot] {
            return Ok(false);
        }
        backend.wait_fence(self.fences[slot])?;
        backend.reset_fence(self.fences[slot])?;
        self.submitted[slot] = false;
        Ok(true)
    }

    pub(crate) fn destroy(&mut self, backend: &dyn GpuBackend) {
        for fence in self.fences.drain(..) {
            backend.destroy_fence(fence);
        }
        self.submitted.clear();
    }
}

#[cfg(all(test, feature = "dummy"))]
mod tests {
    use super::*;
    use crate::backend::{DummyBackend, SubmitInfo};

    #[test]
    fn test_timeline_advance() {
        let backend = DummyBackend::new();
        let mut timeline = QueueTimeline::new(&backend, QueueType::Compute).unwrap();
        assert_eq!(timeline.value(), 0);
        assert_eq!(timeline.advance(), 1);
        assert_eq!(timeline.advance(), 2);
        assert_eq!(timeline.signal(2).value, 2);
        assert_eq!(timeline.queue(), QueueType::Compute);
    }

    #[test]
    fn test_queue_waits_keep_max() {
        let backend = DummyBackend::new();
        let timelines: Vec<_> = QueueType::ALL
            .iter()
            .map(|&queue| QueueTimeline::new(&backend, queue).unwrap())
            .collect();

        let mut waits = QueueWaits::default();
        waits.add(QueueType::Compute, 3, PipelineStage::COMPUTE_SHADER);
        waits.add(QueueType::Compute, 1, PipelineStage::FRAGMENT_SHADER);
        waits.add(QueueType::Transfer, 2, PipelineStage::TRANSFER);

        let resolved = waits.resolve(&timelines);
        assert_eq!(resolved.len(), 2);
        let compute = resolved
            .iter()
            .find(|w| w.semaphore == timelines[QueueType::Compute.index()].semaphore())
            .unwrap();
        assert_eq!(compute.value, 3);
        assert_eq!(
            compute.stage,
            PipelineStage::COMPUTE_SHADER | PipelineStage::FRAGMENT_SHADER
        );
        assert!(waits.covers(QueueType::Compute, 2));
        assert!(!waits.covers(QueueType::Transfer, 3));
        assert!(!waits.covers(QueueType::Graphics, 1));
    }

    #[test]
    fn test_frame_fences_skip_unsubmitted() {
        let backend = DummyBackend::new();
        let mut fences = FrameFences::new(&backend, 2).unwrap();
        assert_eq!(fences.slot(5), 1);
        assert!(!fences.wait_and_reset(&backend, 0).unwrap());

        let mut list = backend.create_command_list(QueueType::Graphics).unwrap();
        list.begin();
        list.end();
        backend
            .submit(
                QueueType::Graphics,
                list,
                &SubmitInfo {
                    fence: Some(fences.fence(0)),
                    ..Default::default()
                },
            )
            .unwrap();
        fences.mark_submitted(0);

        assert!(fences.wait_and_reset(&backend, 0).unwrap());
        assert!(!fences.is_submitted(0));
        assert!(!backend.is_fence_signaled(fences.fence(0)).unwrap());
        fences.destroy(&backend);
        assert!(fences.is_empty());
    }
}
