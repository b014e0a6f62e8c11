//! Frame-in-flight slots and the per-frame state machine

use ash::vk;

use crate::render::backends::vulkan::state::{Fence, Semaphore};
use crate::render::backends::vulkan::{VulkanError, VulkanResult};

/// Number of frames the CPU may record ahead of the GPU
pub const MAX_FRAMES_IN_FLIGHT: usize = 2;

/// Phase of the frame currently being produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameState {
    /// Between frames
    #[default]
    Idle,
    /// Slot fence waited; acquiring a swapchain image
    Acquiring,
    /// Writing uniforms and recording the command buffer
    Recording,
    /// Command buffer handed to the graphics queue
    Submitted,
    /// Presentation queued
    Presenting,
}

/// Resources exclusively owned by one frame-in-flight slot
///
/// Nothing here may be touched until `in_flight` from the slot's previous
/// use has signaled.
pub struct FrameSlot {
    /// Primary command buffer, reset and re-recorded each use
    pub command_buffer: vk::CommandBuffer,
    /// Signaled when the acquired swapchain image is ready
    pub image_available: Semaphore,
    /// Signaled when rendering finishes; presentation waits on it
    pub render_finished: Semaphore,
    /// Signaled when the GPU has retired the slot's submission
    pub in_flight: Fence,
    /// Global descriptor set pointing at this slot's uniform slice
    pub global_descriptor_set: vk::DescriptorSet,
    /// Byte offset of this slot's slice in the global uniform buffer
    pub uniform_offset: vk::DeviceSize,
}

/// Tracks the active slot and enforces wait-then-mutate ordering
///
/// Slot resources may only be mutated between [`FrameTracker::fence_waited`]
/// and [`FrameTracker::submitted`] for that slot.
#[derive(Debug, Clone, Default)]
pub struct FrameTracker {
    current: usize,
    frame_number: u64,
    state: FrameState,
    fence_waited: [bool; MAX_FRAMES_IN_FLIGHT],
}

impl FrameTracker {
    /// Tracker starting at slot 0, frame 0
    pub fn new() -> Self {
        Self::default()
    }

    fn expect_state(&self, expected: FrameState, action: &str) -> VulkanResult<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(VulkanError::InvalidOperation {
                reason: format!("cannot {action} while frame is {:?}", self.state),
            })
        }
    }

    /// Record that the current slot's fence has been waited on; enters `Acquiring`
    pub fn fence_waited(&mut self) -> VulkanResult<usize> {
        self.expect_state(FrameState::Idle, "wait for slot fence")?;
        self.fence_waited[self.current] = true;
        self.state = FrameState::Acquiring;
        Ok(self.current)
    }

    /// Enter `Recording`; fails unless the slot's fence was waited on this cycle
    pub fn begin_recording(&mut self) -> VulkanResult<usize> {
        self.expect_state(FrameState::Acquiring, "record")?;
        if !self.fence_waited[self.current] {
            return Err(VulkanError::InvalidOperation {
                reason: format!("slot {} fence not waited before recording", self.current),
            });
        }
        self.state = FrameState::Recording;
        Ok(self.current)
    }

    /// The slot's fence was reset and its work submitted; enters `Submitted`
    pub fn submitted(&mut self) -> VulkanResult<()> {
        self.expect_state(FrameState::Recording, "submit")?;
        self.fence_waited[self.current] = false;
        self.state = FrameState::Submitted;
        Ok(())
    }

    /// Enter `Presenting`
    pub fn begin_present(&mut self) -> VulkanResult<()> {
        self.expect_state(FrameState::Submitted, "present")?;
        self.state = FrameState::Presenting;
        Ok(())
    }

    /// Move to the next slot and return to `Idle`
    pub fn advance(&mut self) -> VulkanResult<()> {
        self.expect_state(FrameState::Presenting, "advance")?;
        self.current = (self.current + 1) % MAX_FRAMES_IN_FLIGHT;
        self.frame_number += 1;
        self.state = FrameState::Idle;
        Ok(())
    }

    /// Abandon the frame before submission and stay on the same slot
    ///
    /// The fence was never reset, so it is still signaled and the waited
    /// flag stays valid for the retry.
    pub fn abort(&mut self) {
        if matches!(self.state, FrameState::Acquiring | FrameState::Recording) {
            log::trace!("Frame {} aborted on slot {}", self.frame_number, self.current);
            self.state = FrameState::Idle;
        }
    }

    /// Whether resources of `slot` may be written right now
    pub fn can_mutate(&self, slot: usize) -> bool {
        slot == self.current
            && matches!(self.state, FrameState::Acquiring | FrameState::Recording)
            && self.fence_waited[slot]
    }

    /// Active slot index
    pub const fn current_slot(&self) -> usize {
        self.current
    }

    /// Number of frames presented so far
    pub const fn frame_number(&self) -> u64 {
        self.frame_number
    }

    /// Current phase
    pub const fn state(&self) -> FrameState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_frame(tracker: &mut FrameTracker) {
        tracker.fence_waited().unwrap();
        tracker.begin_recording().unwrap();
        tracker.submitted().unwrap();
        tracker.begin_present().unwrap();
        tracker.advance().unwrap();
    }

    #[test]
    fn test_full_cycle_rotates_slots() {
        let mut tracker = FrameTracker::new();
        for expected in [0, 1, 0, 1] {
            assert_eq!(tracker.current_slot(), expected);
            run_frame(&mut tracker);
        }
        assert_eq!(tracker.frame_number(), 4);
        assert_eq!(tracker.state(), FrameState::Idle);
    }

    #[test]
    fn test_recording_requires_fence_wait() {
        let mut tracker = FrameTracker::new();
        assert!(tracker.begin_recording().is_err());
        assert!(tracker.submitted().is_err());
        assert!(!tracker.can_mutate(0));
    }

    #[test]
    fn test_abort_keeps_slot_and_skips_present() {
        let mut tracker = FrameTracker::new();
        tracker.fence_waited().unwrap();
        tracker.abort();
        assert_eq!(tracker.state(), FrameState::Idle);
        assert_eq!(tracker.current_slot(), 0);
        assert_eq!(tracker.frame_number(), 0);

        run_frame(&mut tracker);
        assert_eq!(tracker.current_slot(), 1);
    }

    #[test]
    fn test_abort_after_submit_is_ignored() {
        let mut tracker = FrameTracker::new();
        tracker.fence_waited().unwrap();
        tracker.begin_recording().unwrap();
        tracker.submitted().unwrap();
        tracker.abort();
        assert_eq!(tracker.state(), FrameState::Submitted);
    }

    #[test]
    fn test_slot_never_mutated_without_wait() {
        let mut tracker = FrameTracker::new();
        // Interleave aborted and completed frames over several cycles
        for frame in 0..50u32 {
            for slot in 0..MAX_FRAMES_IN_FLIGHT {
                assert!(!tracker.can_mutate(slot), "idle slot {slot} writable");
            }
            let slot = tracker.fence_waited().unwrap();
            assert!(tracker.can_mutate(slot));
            assert!(!tracker.can_mutate((slot + 1) % MAX_FRAMES_IN_FLIGHT));

            if frame % 7 == 3 {
                tracker.abort();
                continue;
            }
            tracker.begin_recording().unwrap();
            tracker.submitted().unwrap();
            assert!(!tracker.can_mutate(slot));
            tracker.begin_present().unwrap();
            tracker.advance().unwrap();
        }
    }
}
