//! Swapchain, render targets and per-frame synchronization state

pub mod frame;
pub mod framebuffer;
pub mod swapchain;
pub mod sync;

pub use frame::{FrameSlot, FrameState, FrameTracker, MAX_FRAMES_IN_FLIGHT};
pub use framebuffer::{framebuffer_attachments, Framebuffer, RenderTargets};
pub use swapchain::{SurfaceSupport, Swapchain, SwapchainSpec, SwapchainState};
pub use sync::{Fence, Semaphore};
