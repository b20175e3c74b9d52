//! The steady-state acquire → submit → present loop.
//!
//! Ordering between the presentation engine and the graphics queue is carried
//! entirely by two binary semaphores:
//!
//! * `image_available` is signalled by acquire and waited on by submit at the
//!   color-attachment-output stage, so vertex work may start before the image
//!   is released but no color write can.
//! * `rendering_done` is signalled by submit and waited on by present.

use anyhow::{Context, Result};
use log::*;
use thiserror::Error;
use vulkanalia::vk::{self, DeviceV1_0, Handle, HasBuilder, KhrSwapchainExtension};

use super::context::VulkanContext;
use super::device::VulkanDevice;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FrameState {
    Idle,
    ImageAcquired(u32),
    Submitted(u32),
    Presented(u32),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("Cannot {operation} while the frame is {state:?}.")]
    OutOfOrder {
        operation: &'static str,
        state: FrameState,
    },
    #[error("Acquired image {index} but the swapchain only has {count} images.")]
    ImageOutOfRange { index: u32, count: usize },
}

/// The three queue operations a frame is made of.
pub trait FrameQueue {
    /// Returns the next image index; `signal` fires once the presentation
    /// engine has released that image.
    unsafe fn acquire_image(&mut self, signal: vk::Semaphore) -> Result<u32>;

    /// Submits the pre-recorded commands for `image_index`.
    unsafe fn submit(
        &mut self,
        image_index: u32,
        wait: vk::Semaphore,
        signal: vk::Semaphore,
    ) -> Result<()>;

    unsafe fn present(&mut self, image_index: u32, wait: vk::Semaphore) -> Result<()>;
}

#[derive(Debug)]
pub struct FrameScheduler {
    state: FrameState,
    image_available: vk::Semaphore,
    rendering_done: vk::Semaphore,
    image_count: usize,
    frames: u64,
}

impl FrameScheduler {
    pub fn new(
        image_available: vk::Semaphore,
        rendering_done: vk::Semaphore,
        image_count: usize,
    ) -> Self {
        Self {
            state: FrameState::Idle,
            image_available,
            rendering_done,
            image_count,
            frames: 0,
        }
    }

    pub fn state(&self) -> FrameState {
        self.state
    }

    /// Number of frames that completed all three steps.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub unsafe fn acquire<Q: FrameQueue>(&mut self, queue: &mut Q) -> Result<u32> {
        if !matches!(self.state, FrameState::Idle | FrameState::Presented(_)) {
            return Err(self.out_of_order("acquire").into());
        }

        let index = queue.acquire_image(self.image_available)?;
        if index as usize >= self.image_count {
            return Err(FrameError::ImageOutOfRange {
                index,
                count: self.image_count,
            }
            .into());
        }

        self.state = FrameState::ImageAcquired(index);
        Ok(index)
    }

    pub unsafe fn submit<Q: FrameQueue>(&mut self, queue: &mut Q) -> Result<()> {
        let FrameState::ImageAcquired(index) = self.state else {
            return Err(self.out_of_order("submit").into());
        };

        queue.submit(index, self.image_available, self.rendering_done)?;
        self.state = FrameState::Submitted(index);
        Ok(())
    }

    pub unsafe fn present<Q: FrameQueue>(&mut self, queue: &mut Q) -> Result<()> {
        let FrameState::Submitted(index) = self.state else {
            return Err(self.out_of_order("present").into());
        };

        queue.present(index, self.rendering_done)?;
        self.state = FrameState::Presented(index);
        Ok(())
    }

    /// Runs one full iteration and returns to [`FrameState::Idle`].
    pub unsafe fn draw_frame<Q: FrameQueue>(&mut self, queue: &mut Q) -> Result<()> {
        let index = self.acquire(queue)?;
        self.submit(queue)?;
        self.present(queue)?;

        self.state = FrameState::Idle;
        self.frames += 1;
        trace!("Presented image {} (frame {}).", index, self.frames);
        Ok(())
    }

    fn out_of_order(&self, operation: &'static str) -> FrameError {
        FrameError::OutOfOrder {
            operation,
            state: self.state,
        }
    }
}

/// [`FrameQueue`] over the graphics queue and the pre-recorded buffers.
pub struct VulkanFrameQueue<'a> {
    device: &'a VulkanDevice,
    context: &'a VulkanContext,
    throttle: bool,
}

impl<'a> VulkanFrameQueue<'a> {
    pub fn new(device: &'a VulkanDevice, context: &'a VulkanContext, throttle: bool) -> Self {
        Self {
            device,
            context,
            throttle,
        }
    }
}

impl FrameQueue for VulkanFrameQueue<'_> {
    unsafe fn acquire_image(&mut self, signal: vk::Semaphore) -> Result<u32> {
        if self.throttle {
            self.device
                .vk_device
                .wait_for_fences(&[self.context.in_flight_fence], true, u64::MAX)
                .context("vkWaitForFences")?;
        }

        // OUT_OF_DATE is fatal: the surface never changes size.
        let (index, code) = self
            .device
            .vk_device
            .acquire_next_image_khr(
                self.context.swapchain,
                u64::MAX,
                signal,
                vk::Fence::null(),
            )
            .context("vkAcquireNextImageKHR")?;
        if code == vk::SuccessCode::SUBOPTIMAL_KHR {
            debug!("Swapchain is suboptimal for the surface.");
        }

        Ok(index)
    }

    unsafe fn submit(
        &mut self,
        image_index: u32,
        wait: vk::Semaphore,
        signal: vk::Semaphore,
    ) -> Result<()> {
        let wait_semaphores = &[wait];
        let wait_stages = &[vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let command_buffers = &[self.context.command_buffers[image_index]];
        let signal_semaphores = &[signal];
        let submit_info = vk::SubmitInfo::builder()
            .wait_semaphores(wait_semaphores)
            .wait_dst_stage_mask(wait_stages)
            .command_buffers(command_buffers)
            .signal_semaphores(signal_semaphores);

        let fence = if self.throttle {
            self.device
                .vk_device
                .reset_fences(&[self.context.in_flight_fence])
                .context("vkResetFences")?;
            self.context.in_flight_fence
        } else {
            vk::Fence::null()
        };

        self.device
            .vk_device
            .queue_submit(self.context.graphics_queue, &[submit_info], fence)
            .context("vkQueueSubmit")?;

        Ok(())
    }

    unsafe fn present(&mut self, image_index: u32, wait: vk::Semaphore) -> Result<()> {
        let wait_semaphores = &[wait];
        let swapchains = &[self.context.swapchain];
        let image_indices = &[image_index];
        let present_info = vk::PresentInfoKHR::builder()
            .wait_semaphores(wait_semaphores)
            .swapchains(swapchains)
            .image_indices(image_indices);

        self.device
            .vk_device
            .queue_present_khr(self.context.graphics_queue, &present_info)
            .context("vkQueuePresentKHR")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;

    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    enum Call {
        Acquire {
            signal: vk::Semaphore,
        },
        Submit {
            index: u32,
            wait: vk::Semaphore,
            signal: vk::Semaphore,
        },
        Present {
            index: u32,
            wait: vk::Semaphore,
        },
    }

    /// Hands out image indices round-robin and records every call.
    struct RecordingQueue {
        image_count: u32,
        next: u32,
        calls: Vec<Call>,
        fail_acquire: bool,
    }

    impl RecordingQueue {
        fn new(image_count: u32) -> Self {
            Self {
                image_count,
                next: 0,
                calls: Vec::new(),
                fail_acquire: false,
            }
        }
    }

    impl FrameQueue for RecordingQueue {
        unsafe fn acquire_image(&mut self, signal: vk::Semaphore) -> Result<u32> {
            if self.fail_acquire {
                return Err(anyhow!("ERROR_OUT_OF_DATE_KHR"));
            }
            self.calls.push(Call::Acquire { signal });
            let index = self.next;
            self.next = (self.next + 1) % self.image_count;
            Ok(index)
        }

        unsafe fn submit(
            &mut self,
            index: u32,
            wait: vk::Semaphore,
            signal: vk::Semaphore,
        ) -> Result<()> {
            self.calls.push(Call::Submit {
                index,
                wait,
                signal,
            });
            Ok(())
        }

        unsafe fn present(&mut self, index: u32, wait: vk::Semaphore) -> Result<()> {
            self.calls.push(Call::Present { index, wait });
            Ok(())
        }
    }

    fn semaphores() -> (vk::Semaphore, vk::Semaphore) {
        (vk::Semaphore::from_raw(1), vk::Semaphore::from_raw(2))
    }

    #[test]
    fn k_iterations_issue_k_ordered_triples() {
        let (available, done) = semaphores();
        let mut scheduler = FrameScheduler::new(available, done, 3);
        let mut queue = RecordingQueue::new(3);

        const K: usize = 7;
        for _ in 0..K {
            unsafe { scheduler.draw_frame(&mut queue) }.unwrap();
        }

        assert_eq!(queue.calls.len(), 3 * K);
        for (frame, triple) in queue.calls.chunks(3).enumerate() {
            let index = (frame % 3) as u32;
            assert_eq!(
                triple,
                &[
                    Call::Acquire { signal: available },
                    Call::Submit {
                        index,
                        wait: available,
                        signal: done,
                    },
                    Call::Present { index, wait: done },
                ]
            );
        }
        assert_eq!(scheduler.frames(), K as u64);
        assert_eq!(scheduler.state(), FrameState::Idle);
    }

    #[test]
    fn semaphores_alternate_roles() {
        let (available, done) = semaphores();
        let mut scheduler = FrameScheduler::new(available, done, 2);
        let mut queue = RecordingQueue::new(2);

        const K: usize = 5;
        for _ in 0..K {
            unsafe { scheduler.draw_frame(&mut queue) }.unwrap();
        }

        let signalled = |s: vk::Semaphore| {
            queue
                .calls
                .iter()
                .filter(|c| match c {
                    Call::Acquire { signal } | Call::Submit { signal, .. } => *signal == s,
                    Call::Present { .. } => false,
                })
                .count()
        };
        let waited = |s: vk::Semaphore| {
            queue
                .calls
                .iter()
                .filter(|c| match c {
                    Call::Submit { wait, .. } | Call::Present { wait, .. } => *wait == s,
                    Call::Acquire { .. } => false,
                })
                .count()
        };

        assert_eq!(signalled(available), K);
        assert_eq!(waited(available), K);
        assert_eq!(signalled(done), K);
        assert_eq!(waited(done), K);
    }

    #[test]
    fn submit_requires_acquire() {
        let (available, done) = semaphores();
        let mut scheduler = FrameScheduler::new(available, done, 2);
        let mut queue = RecordingQueue::new(2);

        let err = unsafe { scheduler.submit(&mut queue) }.unwrap_err();

        assert_eq!(
            err.downcast_ref::<FrameError>(),
            Some(&FrameError::OutOfOrder {
                operation: "submit",
                state: FrameState::Idle,
            })
        );
        assert!(queue.calls.is_empty());
    }

    #[test]
    fn present_requires_submit() {
        let (available, done) = semaphores();
        let mut scheduler = FrameScheduler::new(available, done, 2);
        let mut queue = RecordingQueue::new(2);

        unsafe { scheduler.acquire(&mut queue) }.unwrap();
        let err = unsafe { scheduler.present(&mut queue) }.unwrap_err();

        assert_eq!(
            err.downcast_ref::<FrameError>(),
            Some(&FrameError::OutOfOrder {
                operation: "present",
                state: FrameState::ImageAcquired(0),
            })
        );
        assert_eq!(queue.calls.len(), 1);
    }

    #[test]
    fn image_is_never_submitted_twice_without_acquire() {
        let (available, done) = semaphores();
        let mut scheduler = FrameScheduler::new(available, done, 2);
        let mut queue = RecordingQueue::new(2);

        unsafe { scheduler.acquire(&mut queue) }.unwrap();
        unsafe { scheduler.submit(&mut queue) }.unwrap();
        assert!(unsafe { scheduler.submit(&mut queue) }.is_err());
        unsafe { scheduler.present(&mut queue) }.unwrap();
        assert!(unsafe { scheduler.present(&mut queue) }.is_err());
        assert_eq!(scheduler.state(), FrameState::Presented(0));

        assert_eq!(unsafe { scheduler.acquire(&mut queue) }.unwrap(), 1);
        assert!(unsafe { scheduler.acquire(&mut queue) }.is_err());
        assert_eq!(queue.calls.len(), 4);
    }

    #[test]
    fn rejects_index_outside_swapchain() {
        let (available, done) = semaphores();
        let mut scheduler = FrameScheduler::new(available, done, 2);
        let mut queue = RecordingQueue::new(4);
        queue.next = 3;

        let err = unsafe { scheduler.draw_frame(&mut queue) }.unwrap_err();

        assert_eq!(
            err.downcast_ref::<FrameError>(),
            Some(&FrameError::ImageOutOfRange { index: 3, count: 2 })
        );
        assert_eq!(scheduler.state(), FrameState::Idle);
        assert_eq!(scheduler.frames(), 0);
    }

    #[test]
    fn acquire_failure_is_propagated() {
        let (available, done) = semaphores();
        let mut scheduler = FrameScheduler::new(available, done, 2);
        let mut queue = RecordingQueue::new(2);
        queue.fail_acquire = true;

        let err = unsafe { scheduler.draw_frame(&mut queue) }.unwrap_err();

        assert_eq!(err.to_string(), "ERROR_OUT_OF_DATE_KHR");
        assert!(queue.calls.is_empty());
        assert_eq!(scheduler.state(), FrameState::Idle);
    }
}
