use anyhow::{Context, Result};
use vulkanalia::window as vk_window;
use winit::window::Window;

use super::context::VulkanContext;
use super::instance::VulkanInstance;
use super::lifecycle::Resource;

#[derive(Debug)]
pub struct VulkanSurface;

impl VulkanSurface {
    /// Binds a presentable surface to the window.
    pub unsafe fn create(
        window: &Window,
        instance: &VulkanInstance,
        context: &mut VulkanContext,
    ) -> Result<()> {
        context.surface = vk_window::create_surface(&instance.vk_instance, window, window)
            .context("vkCreateSurfaceKHR")?;
        context.resources.record(Resource::Surface(context.surface));
        Ok(())
    }
}
