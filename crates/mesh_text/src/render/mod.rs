//! # Rendering System
//!
//! Mesh-shader text rendering on top of a Vulkan backend.
//!
//! ## Architecture
//!
//! - **Frame**: backend-agnostic frame orchestrator and its [`FrameBackend`](frame::FrameBackend) seam
//! - **Systems**: content producers, MSDF text layout and curve glyph rows
//! - **Vulkan Backend**: swapchain, pipeline, GPU resources and the frame backend implementation
//!
//! Errors from every layer fold into [`RenderError`]. A stale or suboptimal
//! swapchain is never an error; the orchestrator recreates and carries on.

use ash::vk;

pub mod backends;
pub mod frame;
pub mod systems;

use crate::config::ConfigError;
use backends::vulkan::WindowError;
use frame::ImageLayout;
use systems::curve::CurveError;
use systems::text::{AtlasError, FontError};

/// Rendering system error types
///
/// Everything except the recoverable stale-surface case ends up here and is
/// handed up to the caller, which decides whether the process ends.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// A Vulkan call returned a non-success result
    #[error("{call} failed: {result:?}")]
    Api {
        /// Name of the Vulkan entry point
        call: &'static str,
        /// Result code returned by the driver
        result: vk::Result,
    },

    /// Renderer initialization failed during setup
    #[error("Renderer initialization failed: {0}")]
    InitializationFailed(String),

    /// A required device feature or extension is not available
    #[error("Required device feature missing: {0}")]
    MissingFeature(&'static str),

    /// No memory type satisfies the allocation requirements
    #[error("No suitable memory type found")]
    NoSuitableMemoryType,

    /// Shader binary could not be used
    #[error("Invalid shader {path}: {reason}")]
    InvalidShader {
        /// Shader file path
        path: String,
        /// What was wrong with it
        reason: String,
    },

    /// A swapchain image layout change outside the transition table
    #[error("Illegal image layout transition {from:?} -> {to:?}")]
    IllegalLayoutTransition {
        /// Layout the image is in
        from: ImageLayout,
        /// Layout that was requested
        to: ImageLayout,
    },

    /// The surface handed back an image index it never created
    #[error("Image index {index} out of range for {image_count} presentable images")]
    ImageIndexOutOfRange {
        /// Index returned by acquire
        index: u32,
        /// Images in the current surface
        image_count: u32,
    },

    /// Font metrics failed to load
    #[error(transparent)]
    Font(#[from] FontError),

    /// Atlas pixels failed to load
    #[error(transparent)]
    Atlas(#[from] AtlasError),

    /// Curve glyph geometry is malformed
    #[error(transparent)]
    Curve(#[from] CurveError),

    /// Window or surface creation failed
    #[error(transparent)]
    Window(#[from] WindowError),

    /// Configuration failed to load
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl RenderError {
    /// Wrap a Vulkan result code with the name of the call that produced it
    pub fn api(call: &'static str) -> impl Fn(vk::Result) -> Self {
        move |result| Self::Api { call, result }
    }
}

/// Result type for rendering operations
pub type RenderResult<T> = Result<T, RenderError>;
