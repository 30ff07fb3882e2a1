//! Helpers for exercising frame buffers without a camera.
pub mod framegen;
