use anyhow::Result;
use winit::window::Window;

use crate::config::RendererConfig;
use crate::vulkan::VulkanRenderer;

#[derive(Debug)]
pub struct Renderer {
    pub vk_renderer: VulkanRenderer,
}

impl Renderer {
    /// Creates our Vulkan app.
    pub unsafe fn create(window: &Window, config: &RendererConfig) -> Result<Self> {
        let vk_renderer = VulkanRenderer::new(window, config)?;

        Ok(Self { vk_renderer })
    }

    /// Renders a frame for our Vulkan app.
    pub unsafe fn render(&mut self) -> Result<()> {
        self.vk_renderer.render()
    }

    pub fn frames(&self) -> u64 {
        self.vk_renderer.frames()
    }

    /// Destroys our Vulkan app.
    pub unsafe fn destroy(&mut self) -> Result<()> {
        self.vk_renderer.destroy()
    }
}
