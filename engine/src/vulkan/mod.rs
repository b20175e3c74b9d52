use std::fmt;
use std::io;

use anyhow::{anyhow, Context, Result};
use command_buffer::VulkanCommandBuffer;
use context::VulkanContext;
use device::VulkanDevice;
use frame::{FrameScheduler, VulkanFrameQueue};
use framebuffer::VulkanFramebuffer;
use instance::VulkanInstance;
use lifecycle::VulkanDestroyer;
use log::*;
use pipeline::VulkanPipeline;
use render_pass::VulkanRenderPass;
use shader::ShaderSet;
use surface::VulkanSurface;
use swapchain::VulkanSwapchain;
use sync::VulkanSync;
use vulkanalia::{
    loader::{LibloadingLoader, LIBRARY},
    Entry,
};
use winit::window::Window;

use crate::config::RendererConfig;

mod command_buffer;
mod constants;
mod context;
mod device;
mod diagnostics;
mod frame;
mod framebuffer;
mod instance;
mod lifecycle;
mod per_image;
mod pipeline;
mod render_pass;
mod shader;
mod surface;
mod swapchain;
mod sync;

pub struct VulkanRenderer {
    instance: VulkanInstance,
    device: VulkanDevice,
    context: VulkanContext,
    scheduler: FrameScheduler,
    throttle_frames: bool,
    // Keeps the Vulkan library loaded until teardown has finished.
    _entry: Entry,
}

impl VulkanRenderer {
    /// Builds the full object graph in dependency order. On failure every
    /// object created so far is destroyed before the error is returned.
    pub unsafe fn new(window: &Window, config: &RendererConfig) -> Result<VulkanRenderer> {
        let shaders = ShaderSet::load(&config.vertex_shader, &config.fragment_shader)?;

        let loader = LibloadingLoader::new(LIBRARY)?;
        let entry = Entry::new(loader).map_err(|b| anyhow!("{}", b))?;

        let mut context = VulkanContext::default();
        let instance = VulkanInstance::new(window, &entry, &mut context)?;

        let device = match VulkanRenderer::create_device(
            window,
            &entry,
            &instance,
            config,
            &mut context,
        ) {
            Ok(device) => device,
            Err(err) => return Err(VulkanRenderer::abort(&instance, None, &mut context, err)),
        };

        if let Err(err) =
            VulkanRenderer::create_device_objects(&instance, &device, &shaders, config, &mut context)
        {
            return Err(VulkanRenderer::abort(
                &instance,
                Some(&device),
                &mut context,
                err,
            ));
        }

        let scheduler = FrameScheduler::new(
            context.image_available_semaphore,
            context.rendering_done_semaphore,
            context.image_count(),
        );
        info!(
            "Renderer ready: {} driver objects alive.",
            context.resources.len()
        );

        Ok(VulkanRenderer {
            instance,
            device,
            context,
            scheduler,
            throttle_frames: config.throttle_frames,
            _entry: entry,
        })
    }

    unsafe fn create_device(
        window: &Window,
        entry: &Entry,
        instance: &VulkanInstance,
        config: &RendererConfig,
        context: &mut VulkanContext,
    ) -> Result<VulkanDevice> {
        VulkanSurface::create(window, instance, context)?;

        if config.print_diagnostics {
            diagnostics::write_or_warn(&mut io::stdout().lock(), |out| {
                diagnostics::report(out, entry, &instance.vk_instance, context.surface)
            });
        }

        VulkanDevice::new(entry, instance, context)
    }

    unsafe fn create_device_objects(
        instance: &VulkanInstance,
        device: &VulkanDevice,
        shaders: &ShaderSet,
        config: &RendererConfig,
        context: &mut VulkanContext,
    ) -> Result<()> {
        VulkanSwapchain::create(config, instance, device, context)?;
        VulkanSwapchain::create_image_views(device, context)?;

        VulkanPipeline::create_layout(device, context)?;
        VulkanRenderPass::create(device, context)?;
        VulkanPipeline::create(device, shaders, context)?;
        VulkanFramebuffer::create(device, context)?;

        VulkanCommandBuffer::create_command_pool(device, context)?;
        VulkanCommandBuffer::create_command_buffers(device, config.clear_color, context)?;

        VulkanSync::create_sync_objects(device, context)
    }

    unsafe fn abort(
        instance: &VulkanInstance,
        device: Option<&VulkanDevice>,
        context: &mut VulkanContext,
        err: anyhow::Error,
    ) -> anyhow::Error {
        let destroyer =
            VulkanDestroyer::new(&instance.vk_instance, device.map(|d| &d.vk_device));
        if let Err(teardown) = context.resources.tear_down(&destroyer) {
            error!("Teardown after failed startup also failed: {:#}", teardown);
        }
        err
    }

    /// Acquires, submits and presents one frame.
    pub unsafe fn render(&mut self) -> Result<()> {
        let mut queue = VulkanFrameQueue::new(&self.device, &self.context, self.throttle_frames);
        let frame = self.scheduler.frames();
        self.scheduler.draw_frame(&mut queue).with_context(|| {
            format!("Frame {} failed while {:?}.", frame, self.scheduler.state())
        })
    }

    pub fn frames(&self) -> u64 {
        self.scheduler.frames()
    }

    /// Waits for the device to go idle and destroys every object in reverse
    /// creation order. Safe to call more than once.
    pub unsafe fn destroy(&mut self) -> Result<()> {
        let destroyer =
            VulkanDestroyer::new(&self.instance.vk_instance, Some(&self.device.vk_device));
        self.context.resources.tear_down(&destroyer)
    }
}

impl fmt::Debug for VulkanRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VulkanRenderer")
            .field("instance", &self.instance)
            .field("device", &self.device)
            .field("context", &self.context)
            .field("scheduler", &self.scheduler)
            .field("throttle_frames", &self.throttle_frames)
            .finish_non_exhaustive()
    }
}

impl Drop for VulkanRenderer {
    fn drop(&mut self) {
        if let Err(err) = unsafe { self.destroy() } {
            error!("Failed to destroy renderer: {:#}", err);
        }
    }
}
