//! Swapchain image layout tracking
//!
//! Each presentable image carries the layout its last recorded operation left
//! it in, so the next barrier's source layout is known without a query.
//!
//! Legal transitions:
//!
//! | from            | to              | when                          |
//! |-----------------|-----------------|-------------------------------|
//! | `Undefined`     | `ColorWritable` | first use after (re)creation  |
//! | `Presentable`   | `ColorWritable` | every later frame             |
//! | `ColorWritable` | `Presentable`   | end of every frame            |

use ash::vk;

use crate::render::{RenderError, RenderResult};

/// Layout state of one swapchain image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageLayout {
    /// Freshly created, contents undefined
    Undefined,
    /// Color attachment, writable by the draw
    ColorWritable,
    /// Handed to (or returned from) the presentation engine
    Presentable,
}

/// Access and stage masks for one layout transition barrier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutTransition {
    /// Layout the image leaves
    pub old_layout: vk::ImageLayout,
    /// Layout the image enters
    pub new_layout: vk::ImageLayout,
    /// Accesses that must complete first
    pub src_access: vk::AccessFlags,
    /// Accesses that wait on the barrier
    pub dst_access: vk::AccessFlags,
    /// Stages that must complete first
    pub src_stage: vk::PipelineStageFlags,
    /// Stages that wait on the barrier
    pub dst_stage: vk::PipelineStageFlags,
}

impl ImageLayout {
    /// Vulkan layout for this state
    pub const fn to_vk(self) -> vk::ImageLayout {
        match self {
            Self::Undefined => vk::ImageLayout::UNDEFINED,
            Self::ColorWritable => vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
            Self::Presentable => vk::ImageLayout::PRESENT_SRC_KHR,
        }
    }

    /// Whether `self -> to` is in the transition table
    pub const fn can_transition_to(self, to: Self) -> bool {
        matches!(
            (self, to),
            (Self::Undefined | Self::Presentable, Self::ColorWritable)
                | (Self::ColorWritable, Self::Presentable)
        )
    }

    /// Barrier parameters for `self -> to`
    pub fn transition_to(self, to: Self) -> RenderResult<LayoutTransition> {
        if !self.can_transition_to(to) {
            return Err(RenderError::IllegalLayoutTransition { from: self, to });
        }

        let (src_access, dst_access, src_stage, dst_stage) = match to {
            Self::ColorWritable => (
                if self == Self::Undefined { vk::AccessFlags::empty() } else { vk::AccessFlags::MEMORY_READ },
                vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
                vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
                vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            ),
            _ => (
                vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
                vk::AccessFlags::MEMORY_READ,
                vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
                vk::PipelineStageFlags::BOTTOM_OF_PIPE,
            ),
        };

        Ok(LayoutTransition {
            old_layout: self.to_vk(),
            new_layout: to.to_vk(),
            src_access,
            dst_access,
            src_stage,
            dst_stage,
        })
    }
}
