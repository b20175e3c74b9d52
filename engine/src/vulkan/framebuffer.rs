use super::{context::VulkanContext, device::VulkanDevice, lifecycle::Resource, per_image::PerImage};
use anyhow::{Context, Result};
use vulkanalia::vk::{self, DeviceV1_0, HasBuilder};

/// A single-layer framebuffer over `attachments`, sized to `extent`.
/// `attachments` must outlive the returned info.
pub fn framebuffer_info(
    render_pass: vk::RenderPass,
    attachments: &[vk::ImageView],
    extent: vk::Extent2D,
) -> vk::FramebufferCreateInfo {
    vk::FramebufferCreateInfo::builder()
        .render_pass(render_pass)
        .attachments(attachments)
        .width(extent.width)
        .height(extent.height)
        .layers(1)
        .build()
}

#[derive(Debug)]
pub struct VulkanFramebuffer;

impl VulkanFramebuffer {
    /// One framebuffer per image view, each sized to the swapchain extent.
    pub unsafe fn create(device: &VulkanDevice, context: &mut VulkanContext) -> Result<()> {
        let mut framebuffers = Vec::with_capacity(context.swapchain_image_views.len());
        for view in &context.swapchain_image_views {
            let attachments = &[*view];
            let create_info =
                framebuffer_info(context.render_pass, attachments, context.swapchain_extent);

            let framebuffer = device
                .vk_device
                .create_framebuffer(&create_info, None)
                .context("vkCreateFramebuffer")?;
            context.resources.record(Resource::Framebuffer(framebuffer));
            framebuffers.push(framebuffer);
        }

        context.framebuffers = PerImage::new("framebuffers", framebuffers, context.image_count())?;
        Ok(())
    }
}
