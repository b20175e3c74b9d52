use anyhow::{Context, Result};
use vulkanalia::vk::{self, DeviceV1_0, HasBuilder};

use super::{context::VulkanContext, device::VulkanDevice, lifecycle::Resource};

#[derive(Debug)]
pub struct VulkanSync;

impl VulkanSync {
    /// The image-available/rendering-done semaphore pair plus the fence that
    /// caps how far the CPU may run ahead.
    pub unsafe fn create_sync_objects(
        device: &VulkanDevice,
        context: &mut VulkanContext,
    ) -> Result<()> {
        let semaphore_info = vk::SemaphoreCreateInfo::builder();
        // Signalled so the first frame does not wait.
        let fence_info = vk::FenceCreateInfo::builder().flags(vk::FenceCreateFlags::SIGNALED);

        context.image_available_semaphore = device
            .vk_device
            .create_semaphore(&semaphore_info, None)
            .context("vkCreateSemaphore")?;
        context
            .resources
            .record(Resource::Semaphore(context.image_available_semaphore));

        context.rendering_done_semaphore = device
            .vk_device
            .create_semaphore(&semaphore_info, None)
            .context("vkCreateSemaphore")?;
        context
            .resources
            .record(Resource::Semaphore(context.rendering_done_semaphore));

        context.in_flight_fence = device
            .vk_device
            .create_fence(&fence_info, None)
            .context("vkCreateFence")?;
        context
            .resources
            .record(Resource::Fence(context.in_flight_fence));

        Ok(())
    }
}
