use std::path::PathBuf;

use vulkanalia::vk;

/// Runtime settings for the window and renderer.
#[derive(Clone, Debug)]
pub struct RendererConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub vertex_shader: PathBuf,
    pub fragment_shader: PathBuf,
    /// Lower bound on swapchain images; the driver may hand back more.
    pub min_image_count: u32,
    pub clear_color: [f32; 4],
    /// Wait on the in-flight fence before each submission so the CPU never
    /// runs more than one frame ahead of the GPU.
    pub throttle_frames: bool,
    pub print_diagnostics: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            title: "Vulkan Triangle".to_string(),
            width: 400,
            height: 300,
            vertex_shader: PathBuf::from("shaders/vert.spv"),
            fragment_shader: PathBuf::from("shaders/frag.spv"),
            min_image_count: 2,
            clear_color: [0.0, 0.0, 0.0, 1.0],
            throttle_frames: true,
            print_diagnostics: false,
        }
    }
}

impl RendererConfig {
    /// The fixed surface extent. Every extent-sized object derives from this.
    pub fn extent(&self) -> vk::Extent2D {
        vk::Extent2D {
            width: self.width,
            height: self.height,
        }
    }
}
