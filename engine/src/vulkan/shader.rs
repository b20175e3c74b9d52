use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use log::*;
use thiserror::Error;
use vulkanalia::bytecode::Bytecode;
use vulkanalia::vk::{self, DeviceV1_0, HasBuilder};

use super::device::VulkanDevice;

const SPIRV_MAGIC: u32 = 0x0723_0203;

#[derive(Debug, Error)]
pub enum ShaderError {
    #[error("Failed to read shader `{}`.", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Shader `{}` is not SPIR-V bytecode: {reason}.", .path.display())]
    Invalid { path: PathBuf, reason: String },
}

/// Reads a compiled SPIR-V binary fully into memory.
pub fn read_bytecode(path: &Path) -> Result<Vec<u8>, ShaderError> {
    let bytes = fs::read(path).map_err(|source| ShaderError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let invalid = |reason: &str| ShaderError::Invalid {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };

    if bytes.is_empty() {
        return Err(invalid("file is empty"));
    }
    if bytes.len() % 4 != 0 {
        return Err(invalid("length is not a multiple of 4"));
    }
    let magic = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    if magic != SPIRV_MAGIC {
        return Err(invalid("bad magic number"));
    }

    debug!("Read {} bytes of SPIR-V from `{}`.", bytes.len(), path.display());
    Ok(bytes)
}

/// Vertex and fragment bytecode, loaded before any pipeline object exists.
#[derive(Clone, Debug)]
pub struct ShaderSet {
    pub vertex: Vec<u8>,
    pub fragment: Vec<u8>,
}

impl ShaderSet {
    pub fn load(vertex: &Path, fragment: &Path) -> Result<Self, ShaderError> {
        Ok(Self {
            vertex: read_bytecode(vertex)?,
            fragment: read_bytecode(fragment)?,
        })
    }
}

pub unsafe fn create_shader_module(
    device: &VulkanDevice,
    bytecode: &[u8],
) -> Result<vk::ShaderModule> {
    let bytecode =
        Bytecode::new(bytecode).map_err(|e| anyhow!("Invalid shader bytecode: {:?}", e))?;
    let info = vk::ShaderModuleCreateInfo::builder()
        .code_size(bytecode.code_size())
        .code(bytecode.code());

    device
        .vk_device
        .create_shader_module(&info, None)
        .context("vkCreateShaderModule")
}
