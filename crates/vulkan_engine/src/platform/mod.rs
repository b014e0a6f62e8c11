//! Platform layer: GLFW window ownership and input state
//!
//! The renderer only needs the narrow collaborator surface exposed here:
//! poll events, read the current input snapshot, and ask whether the
//! framebuffer was resized.

mod input;
mod window;

pub use input::{InputSnapshot, InputState};
pub use window::{Window, WindowError, WindowResult};
