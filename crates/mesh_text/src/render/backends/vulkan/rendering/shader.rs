//! SPIR-V shader modules
//!
//! Loads compiled shaders from disk and wraps the resulting
//! `vk::ShaderModule` with RAII cleanup. Binaries are read with
//! [`ash::util::read_spv`], which takes care of word alignment and
//! endianness; the byte length is checked first so a truncated file is
//! reported with its path instead of as a driver error.

use std::ffi::CStr;
use std::io::Cursor;
use std::path::Path;

use ash::{vk, Device};

use crate::render::{RenderError, RenderResult};

/// Check that `len` is a usable SPIR-V byte length (positive, whole words)
pub fn validate_spirv_len(len: usize) -> Result<(), String> {
    if len == 0 {
        return Err("file is empty".to_string());
    }
    if len % 4 != 0 {
        return Err(format!("size {len} is not a multiple of 4"));
    }
    Ok(())
}

/// SPIR-V shader module wrapper with automatic resource management
pub struct ShaderModule {
    device: Device,
    module: vk::ShaderModule,
}

impl ShaderModule {
    /// Create shader module from SPIR-V bytecode
    ///
    /// `name` is only used in errors and logs.
    pub fn from_bytes(device: &Device, name: &str, bytes: &[u8]) -> RenderResult<Self> {
        let invalid = |reason: String| RenderError::InvalidShader {
            path: name.to_string(),
            reason,
        };

        validate_spirv_len(bytes.len()).map_err(invalid)?;
        let words = ash::util::read_spv(&mut Cursor::new(bytes)).map_err(|e| invalid(e.to_string()))?;

        log::debug!("[SHADER] {} contains {} u32 words", name, words.len());

        let create_info = vk::ShaderModuleCreateInfo::builder().code(&words);
        let module = unsafe { device.create_shader_module(&create_info, None) }.map_err(|e| {
            log::error!("[SHADER] vkCreateShaderModule failed for {}: {:?}", name, e);
            RenderError::api("vkCreateShaderModule")(e)
        })?;

        Ok(Self {
            device: device.clone(),
            module,
        })
    }

    /// Load shader from SPIR-V file
    pub fn from_file<P: AsRef<Path>>(device: &Device, path: P) -> RenderResult<Self> {
        let path = path.as_ref();
        log::debug!("[SHADER] Loading shader from: {:?}", path);

        let bytes = std::fs::read(path).map_err(|e| {
            log::error!("[SHADER] Failed to read shader file {:?}: {}", path, e);
            RenderError::InvalidShader {
                path: path.display().to_string(),
                reason: e.to_string(),
            }
        })?;

        Self::from_bytes(device, &path.display().to_string(), &bytes)
    }

    /// Create shader stage create info
    pub fn create_stage_info(&self, stage: vk::ShaderStageFlags, entry_point: &CStr) -> vk::PipelineShaderStageCreateInfo {
        vk::PipelineShaderStageCreateInfo::builder()
            .stage(stage)
            .module(self.module)
            .name(entry_point)
            .build()
    }
}

impl Drop for ShaderModule {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_shader_module(self.module, None);
        }
    }
}
