use anyhow::{Context, Result};
use log::*;
use vulkanalia::vk::{
    self, DeviceV1_0, ExtDebugUtilsExtension, InstanceV1_0, KhrSurfaceExtension,
    KhrSwapchainExtension,
};
use vulkanalia::{Device, Instance};

/// A driver object owned by the renderer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resource {
    Instance,
    Messenger(vk::DebugUtilsMessengerEXT),
    Surface(vk::SurfaceKHR),
    Device,
    Swapchain(vk::SwapchainKHR),
    ImageView(vk::ImageView),
    PipelineLayout(vk::PipelineLayout),
    RenderPass(vk::RenderPass),
    Pipeline(vk::Pipeline),
    Framebuffer(vk::Framebuffer),
    CommandPool(vk::CommandPool),
    CommandBuffers(vk::CommandPool, Vec<vk::CommandBuffer>),
    Semaphore(vk::Semaphore),
    Fence(vk::Fence),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ResourceKind {
    Instance,
    Messenger,
    Surface,
    Device,
    Swapchain,
    ImageView,
    PipelineLayout,
    RenderPass,
    Pipeline,
    Framebuffer,
    CommandPool,
    CommandBuffers,
    Semaphore,
    Fence,
}

impl Resource {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Resource::Instance => ResourceKind::Instance,
            Resource::Messenger(_) => ResourceKind::Messenger,
            Resource::Surface(_) => ResourceKind::Surface,
            Resource::Device => ResourceKind::Device,
            Resource::Swapchain(_) => ResourceKind::Swapchain,
            Resource::ImageView(_) => ResourceKind::ImageView,
            Resource::PipelineLayout(_) => ResourceKind::PipelineLayout,
            Resource::RenderPass(_) => ResourceKind::RenderPass,
            Resource::Pipeline(_) => ResourceKind::Pipeline,
            Resource::Framebuffer(_) => ResourceKind::Framebuffer,
            Resource::CommandPool(_) => ResourceKind::CommandPool,
            Resource::CommandBuffers(..) => ResourceKind::CommandBuffers,
            Resource::Semaphore(_) => ResourceKind::Semaphore,
            Resource::Fence(_) => ResourceKind::Fence,
        }
    }
}

/// Destroys individual resources handed out by a [`Lifecycle`].
pub trait Destroy {
    /// Blocks until no queue work is pending on the device.
    unsafe fn wait_idle(&self) -> Result<()>;

    unsafe fn destroy(&self, resource: Resource);
}

/// Creation-ordered record of every live driver object.
///
/// Objects are destroyed strictly last-in-first-out, so a resource is always
/// destroyed before anything it was created from.
#[derive(Debug, Default)]
pub struct Lifecycle {
    created: Vec<Resource>,
}

impl Lifecycle {
    pub fn record(&mut self, resource: Resource) {
        debug!("Created {:?}.", resource.kind());
        self.created.push(resource);
    }

    pub fn len(&self) -> usize {
        self.created.len()
    }

    pub fn is_empty(&self) -> bool {
        self.created.is_empty()
    }

    /// Waits for the device to go idle, then destroys everything in reverse
    /// creation order. Calling it again afterwards does nothing.
    pub unsafe fn tear_down<D: Destroy>(&mut self, destroyer: &D) -> Result<()> {
        if self.is_empty() {
            return Ok(());
        }

        if self.created.contains(&Resource::Device) {
            destroyer.wait_idle()?;
        }

        while let Some(resource) = self.created.pop() {
            trace!("Destroying {:?}.", resource.kind());
            destroyer.destroy(resource);
        }

        Ok(())
    }
}

/// [`Destroy`] backed by the live instance and (once created) device.
pub struct VulkanDestroyer<'a> {
    instance: &'a Instance,
    device: Option<&'a Device>,
}

impl<'a> VulkanDestroyer<'a> {
    pub fn new(instance: &'a Instance, device: Option<&'a Device>) -> Self {
        Self { instance, device }
    }
}

impl Destroy for VulkanDestroyer<'_> {
    unsafe fn wait_idle(&self) -> Result<()> {
        if let Some(device) = self.device {
            device.device_wait_idle().context("vkDeviceWaitIdle")?;
        }
        Ok(())
    }

    unsafe fn destroy(&self, resource: Resource) {
        let device = match &resource {
            Resource::Instance => return self.instance.destroy_instance(None),
            Resource::Messenger(messenger) => {
                return self
                    .instance
                    .destroy_debug_utils_messenger_ext(*messenger, None)
            }
            Resource::Surface(surface) => {
                return self.instance.destroy_surface_khr(*surface, None)
            }
            _ => match self.device {
                Some(device) => device,
                None => {
                    error!("No device to destroy {:?} with.", resource.kind());
                    return;
                }
            },
        };

        match resource {
            Resource::Device => device.destroy_device(None),
            Resource::Swapchain(swapchain) => device.destroy_swapchain_khr(swapchain, None),
            Resource::ImageView(view) => device.destroy_image_view(view, None),
            Resource::PipelineLayout(layout) => device.destroy_pipeline_layout(layout, None),
            Resource::RenderPass(render_pass) => device.destroy_render_pass(render_pass, None),
            Resource::Pipeline(pipeline) => device.destroy_pipeline(pipeline, None),
            Resource::Framebuffer(framebuffer) => device.destroy_framebuffer(framebuffer, None),
            Resource::CommandPool(pool) => device.destroy_command_pool(pool, None),
            Resource::CommandBuffers(pool, buffers) => device.free_command_buffers(pool, &buffers),
            Resource::Semaphore(semaphore) => device.destroy_semaphore(semaphore, None),
            Resource::Fence(fence) => device.destroy_fence(fence, None),
            Resource::Instance | Resource::Messenger(_) | Resource::Surface(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use vulkanalia::vk::Handle;

    use super::*;

    #[derive(Debug, PartialEq)]
    enum Call {
        WaitIdle,
        Destroy(ResourceKind),
    }

    #[derive(Default)]
    struct RecordingDestroyer {
        calls: RefCell<Vec<Call>>,
    }

    impl Destroy for RecordingDestroyer {
        unsafe fn wait_idle(&self) -> Result<()> {
            self.calls.borrow_mut().push(Call::WaitIdle);
            Ok(())
        }

        unsafe fn destroy(&self, resource: Resource) {
            self.calls.borrow_mut().push(Call::Destroy(resource.kind()));
        }
    }

    /// Records a full startup the way the renderer does for `images` images.
    fn startup(lifecycle: &mut Lifecycle, images: u64) {
        lifecycle.record(Resource::Instance);
        lifecycle.record(Resource::Surface(vk::SurfaceKHR::from_raw(1)));
        lifecycle.record(Resource::Device);
        lifecycle.record(Resource::Swapchain(vk::SwapchainKHR::from_raw(2)));
        for i in 0..images {
            lifecycle.record(Resource::ImageView(vk::ImageView::from_raw(10 + i)));
        }
        lifecycle.record(Resource::PipelineLayout(vk::PipelineLayout::from_raw(3)));
        lifecycle.record(Resource::RenderPass(vk::RenderPass::from_raw(4)));
        lifecycle.record(Resource::Pipeline(vk::Pipeline::from_raw(5)));
        for i in 0..images {
            lifecycle.record(Resource::Framebuffer(vk::Framebuffer::from_raw(20 + i)));
        }
        let pool = vk::CommandPool::from_raw(6);
        lifecycle.record(Resource::CommandPool(pool));
        lifecycle.record(Resource::CommandBuffers(
            pool,
            (0..images)
                .map(|i| vk::CommandBuffer::from_raw(30 + i as usize))
                .collect(),
        ));
        lifecycle.record(Resource::Semaphore(vk::Semaphore::from_raw(7)));
        lifecycle.record(Resource::Semaphore(vk::Semaphore::from_raw(8)));
    }

    #[test]
    fn teardown_is_reverse_of_creation() {
        let mut lifecycle = Lifecycle::default();
        startup(&mut lifecycle, 3);
        let created = lifecycle
            .created
            .iter()
            .map(Resource::kind)
            .collect::<Vec<_>>();

        let destroyer = RecordingDestroyer::default();
        unsafe { lifecycle.tear_down(&destroyer) }.unwrap();

        let calls = destroyer.calls.into_inner();
        assert_eq!(calls[0], Call::WaitIdle);
        let destroyed = calls[1..]
            .iter()
            .map(|c| match c {
                Call::Destroy(kind) => *kind,
                Call::WaitIdle => panic!("waited for idle mid-teardown"),
            })
            .collect::<Vec<_>>();

        let mut sequence = created.clone();
        sequence.extend(destroyed);
        let mut reversed = sequence.clone();
        reversed.reverse();
        assert_eq!(sequence, reversed);
        assert!(lifecycle.is_empty());
    }

    #[test]
    fn teardown_follows_dependency_order() {
        let mut lifecycle = Lifecycle::default();
        startup(&mut lifecycle, 1);

        let destroyer = RecordingDestroyer::default();
        unsafe { lifecycle.tear_down(&destroyer) }.unwrap();

        use ResourceKind as K;
        let expected = [
            K::Semaphore,
            K::Semaphore,
            K::CommandBuffers,
            K::CommandPool,
            K::Framebuffer,
            K::Pipeline,
            K::RenderPass,
            K::PipelineLayout,
            K::ImageView,
            K::Swapchain,
            K::Device,
            K::Surface,
            K::Instance,
        ];
        let destroyed = destroyer.calls.into_inner();
        assert_eq!(destroyed[0], Call::WaitIdle);
        assert_eq!(&destroyed[1..], &expected.map(Call::Destroy)[..]);
    }

    #[test]
    fn teardown_without_device_skips_idle_wait() {
        let mut lifecycle = Lifecycle::default();
        lifecycle.record(Resource::Instance);
        lifecycle.record(Resource::Surface(vk::SurfaceKHR::from_raw(1)));

        let destroyer = RecordingDestroyer::default();
        unsafe { lifecycle.tear_down(&destroyer) }.unwrap();

        assert_eq!(
            destroyer.calls.into_inner(),
            vec![
                Call::Destroy(ResourceKind::Surface),
                Call::Destroy(ResourceKind::Instance),
            ]
        );
    }

    #[test]
    fn second_teardown_is_a_no_op() {
        let mut lifecycle = Lifecycle::default();
        startup(&mut lifecycle, 2);

        let destroyer = RecordingDestroyer::default();
        unsafe { lifecycle.tear_down(&destroyer) }.unwrap();
        let first = destroyer.calls.borrow().len();
        unsafe { lifecycle.tear_down(&destroyer) }.unwrap();

        assert_eq!(destroyer.calls.borrow().len(), first);
    }
}
