#![allow(clippy::missing_safety_doc, clippy::too_many_arguments)]

use anyhow::Result;
use log::*;
use renderer::Renderer;
use winit::dpi::PhysicalSize;
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::{Window, WindowBuilder};

pub use config::RendererConfig;

mod config;
mod renderer;
mod vulkan;

#[derive(Debug)]
pub struct Engine {
    window: Window,
    renderer: Renderer,
    event_loop: EventLoop<()>,
}

impl Engine {
    pub fn new(config: RendererConfig) -> Result<Engine> {
        // Window
        let event_loop = EventLoop::new()?;
        let window = WindowBuilder::new()
            .with_title(config.title.as_str())
            .with_inner_size(PhysicalSize::new(config.width, config.height))
            .with_resizable(false)
            .build(&event_loop)?;

        let renderer = unsafe { Renderer::create(&window, &config)? };

        Ok(Engine {
            window,
            renderer,
            event_loop,
        })
    }

    /// Drives the frame loop until the window is closed or a frame fails,
    /// then tears the renderer down.
    pub fn run(self) -> Result<()> {
        let Engine {
            window,
            mut renderer,
            event_loop,
        } = self;
        let mut failure = None;

        event_loop.set_control_flow(ControlFlow::Poll);
        event_loop.run(|event, elwt| match event {
            // Request a redraw when all events were processed.
            Event::AboutToWait => window.request_redraw(),
            Event::WindowEvent { event, .. } => match event {
                // Render a frame if our Vulkan app is not being destroyed.
                WindowEvent::RedrawRequested if !elwt.exiting() => {
                    if let Err(err) = unsafe { renderer.render() } {
                        failure = Some(err);
                        elwt.exit();
                    }
                }
                WindowEvent::CloseRequested => elwt.exit(),
                _ => {}
            },
            _ => {}
        })?;

        info!("Frame loop stopped after {} frames.", renderer.frames());
        let teardown = unsafe { renderer.destroy() };

        finish(failure, teardown)
    }
}

/// A frame failure outranks a teardown failure; the latter is only logged then.
fn finish(failure: Option<anyhow::Error>, teardown: Result<()>) -> Result<()> {
    match (failure, teardown) {
        (Some(err), Err(teardown)) => {
            error!("Teardown after a failed frame also failed: {:#}", teardown);
            Err(err)
        }
        (Some(err), Ok(())) => Err(err),
        (None, teardown) => teardown,
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;

    use super::*;

    #[test]
    fn frame_failure_survives_failed_teardown() {
        let result = finish(
            Some(anyhow!("vkQueueSubmit")),
            Err(anyhow!("vkDeviceWaitIdle")),
        );

        assert_eq!(result.unwrap_err().to_string(), "vkQueueSubmit");
    }

    #[test]
    fn teardown_failure_is_reported_after_clean_loop() {
        let result = finish(None, Err(anyhow!("vkDeviceWaitIdle")));

        assert_eq!(result.unwrap_err().to_string(), "vkDeviceWaitIdle");
    }

    #[test]
    fn clean_loop_and_teardown_succeed() {
        assert!(finish(None, Ok(())).is_ok());
    }

    #[test]
    fn renderer_types_are_debug() {
        fn is_debug<T: std::fmt::Debug>() {}

        is_debug::<Engine>();
        is_debug::<Renderer>();
        is_debug::<vulkan::VulkanRenderer>();
    }
}
