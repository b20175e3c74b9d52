use vulkanalia::vk;

use super::lifecycle::Lifecycle;
use super::per_image::PerImage;

/// The Vulkan handles and associated properties used by our Vulkan app.
///
/// Handles are plain copies; ownership of the underlying objects lives in
/// `resources`, which destroys them in reverse creation order.
#[derive(Debug, Default)]
pub struct VulkanContext {
    pub messenger: vk::DebugUtilsMessengerEXT,
    pub surface: vk::SurfaceKHR,

    pub physical_device: vk::PhysicalDevice,
    pub queue_family: u32,
    pub graphics_queue: vk::Queue,

    pub swapchain: vk::SwapchainKHR,
    pub swapchain_format: vk::Format,
    pub swapchain_extent: vk::Extent2D,
    pub swapchain_images: Vec<vk::Image>,
    pub swapchain_image_views: PerImage<vk::ImageView>,

    pub pipeline_layout: vk::PipelineLayout,
    pub render_pass: vk::RenderPass,
    pub pipeline: vk::Pipeline,
    pub framebuffers: PerImage<vk::Framebuffer>,

    pub command_pool: vk::CommandPool,
    pub command_buffers: PerImage<vk::CommandBuffer>,

    pub image_available_semaphore: vk::Semaphore,
    pub rendering_done_semaphore: vk::Semaphore,
    pub in_flight_fence: vk::Fence,

    pub resources: Lifecycle,
}

impl VulkanContext {
    /// Number of images the driver actually gave the swapchain.
    pub fn image_count(&self) -> usize {
        self.swapchain_images.len()
    }
}
