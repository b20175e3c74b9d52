use super::{
    context::VulkanContext, device::VulkanDevice, lifecycle::Resource, per_image::PerImage,
};
use anyhow::{Context, Result};
use log::*;
use vulkanalia::vk::{self, DeviceV1_0, HasBuilder};

/// The region each recorded render pass clears and draws into.
pub fn render_area(extent: vk::Extent2D) -> vk::Rect2D {
    vk::Rect2D::builder()
        .offset(vk::Offset2D::default())
        .extent(extent)
        .build()
}

#[derive(Debug)]
pub struct VulkanCommandBuffer;

impl VulkanCommandBuffer {
    pub unsafe fn create_command_pool(
        device: &VulkanDevice,
        context: &mut VulkanContext,
    ) -> Result<()> {
        let info = vk::CommandPoolCreateInfo::builder()
            .flags(vk::CommandPoolCreateFlags::empty())
            .queue_family_index(context.queue_family);

        context.command_pool = device
            .vk_device
            .create_command_pool(&info, None)
            .context("vkCreateCommandPool")?;
        context
            .resources
            .record(Resource::CommandPool(context.command_pool));

        Ok(())
    }

    /// Allocates one primary buffer per framebuffer and records the draw into
    /// each of them once. They are replayed unchanged every frame.
    pub unsafe fn create_command_buffers(
        device: &VulkanDevice,
        clear_color: [f32; 4],
        context: &mut VulkanContext,
    ) -> Result<()> {
        let allocate_info = vk::CommandBufferAllocateInfo::builder()
            .command_pool(context.command_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(context.framebuffers.len() as u32);

        let command_buffers = device
            .vk_device
            .allocate_command_buffers(&allocate_info)
            .context("vkAllocateCommandBuffers")?;
        context.resources.record(Resource::CommandBuffers(
            context.command_pool,
            command_buffers.clone(),
        ));
        context.command_buffers =
            PerImage::new("command buffers", command_buffers, context.image_count())?;

        for (i, command_buffer) in context.command_buffers.iter().enumerate() {
            VulkanCommandBuffer::record(device, context, *command_buffer, i, clear_color)?;
        }
        debug!("Recorded {} command buffers.", context.command_buffers.len());

        Ok(())
    }

    unsafe fn record(
        device: &VulkanDevice,
        context: &VulkanContext,
        command_buffer: vk::CommandBuffer,
        image_index: usize,
        clear_color: [f32; 4],
    ) -> Result<()> {
        let info = vk::CommandBufferBeginInfo::builder()
            .flags(vk::CommandBufferUsageFlags::SIMULTANEOUS_USE);

        device
            .vk_device
            .begin_command_buffer(command_buffer, &info)
            .context("vkBeginCommandBuffer")?;

        let color_clear_value = vk::ClearValue {
            color: vk::ClearColorValue {
                float32: clear_color,
            },
        };

        let clear_values = &[color_clear_value];
        let info = vk::RenderPassBeginInfo::builder()
            .render_pass(context.render_pass)
            .framebuffer(context.framebuffers[image_index])
            .render_area(render_area(context.swapchain_extent))
            .clear_values(clear_values);

        device.vk_device.cmd_begin_render_pass(
            command_buffer,
            &info,
            vk::SubpassContents::INLINE,
        );

        device.vk_device.cmd_bind_pipeline(
            command_buffer,
            vk::PipelineBindPoint::GRAPHICS,
            context.pipeline,
        );

        device.vk_device.cmd_draw(command_buffer, 3, 1, 0, 0);
        device.vk_device.cmd_end_render_pass(command_buffer);

        device
            .vk_device
            .end_command_buffer(command_buffer)
            .context("vkEndCommandBuffer")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RendererConfig;

    #[test]
    fn render_area_covers_configured_extent() {
        let extent = RendererConfig::default().extent();

        let area = render_area(extent);

        assert_eq!((area.offset.x, area.offset.y), (0, 0));
        assert_eq!(
            (area.extent.width, area.extent.height),
            (extent.width, extent.height)
        );
        assert_eq!((area.extent.width, area.extent.height), (400, 300));
    }
}
