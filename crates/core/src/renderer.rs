//! Common renderer trait for presenting emulated video output.
//!
//! ```text
//! System (state management) -> Renderer trait -> {Software, Hardware} implementations
//! ```
//!
//! A system owns the emulated video state and hands finished pictures to a
//! renderer; the renderer owns the host-side framebuffer.

use crate::types::Frame;

/// Common renderer trait for emulated graphics systems
pub trait Renderer: Send {
    /// Get the current framebuffer (read-only)
    fn get_frame(&self) -> &Frame;

    /// Clear the framebuffer with a solid ARGB color
    fn clear(&mut self, color: u32);

    /// Reset the renderer to its initial state
    fn reset(&mut self);

    /// Get the name of this renderer (for debugging/UI)
    fn name(&self) -> &str;

    /// Check if this renderer uses hardware acceleration
    fn is_hardware_accelerated(&self) -> bool {
        false
    }

    /// Resize the renderer to new dimensions
    fn resize(&mut self, width: u32, height: u32);
}
