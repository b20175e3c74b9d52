use anyhow::{Context, Result};
use log::*;
use vulkanalia::prelude::v1_0::*;
use vulkanalia::vk::{self, Handle, KhrSurfaceExtension, KhrSwapchainExtension};

use super::constants;
use super::context::VulkanContext;
use super::device::{SuitabilityError, VulkanDevice};
use super::instance::VulkanInstance;
use super::lifecycle::Resource;
use super::per_image::PerImage;
use crate::config::RendererConfig;

#[derive(Debug)]
pub struct VulkanSwapchain;

/// Image count to request: at least `requested`, within the surface limits.
///
/// A `max_image_count` of zero means the surface has no upper bound.
pub fn image_count(requested: u32, capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let count = requested.max(capabilities.min_image_count);
    if capabilities.max_image_count != 0 {
        count.min(capabilities.max_image_count)
    } else {
        count
    }
}

/// Fails unless the fixed swapchain format and color space are offered.
pub fn check_surface_format(formats: &[vk::SurfaceFormatKHR]) -> Result<(), SuitabilityError> {
    let supported = formats.iter().any(|f| {
        f.format == constants::SWAPCHAIN_FORMAT && f.color_space == constants::SWAPCHAIN_COLOR_SPACE
    });
    // A lone UNDEFINED entry means the surface accepts any format.
    let unconstrained = formats.len() == 1 && formats[0].format == vk::Format::UNDEFINED;

    if supported || unconstrained {
        Ok(())
    } else {
        Err(SuitabilityError::UnsupportedSurfaceFormat {
            format: constants::SWAPCHAIN_FORMAT,
            color_space: constants::SWAPCHAIN_COLOR_SPACE,
        })
    }
}

impl VulkanSwapchain {
    /// Creates the swapchain with the fixed format, extent and FIFO presentation.
    pub unsafe fn create(
        config: &RendererConfig,
        instance: &VulkanInstance,
        device: &VulkanDevice,
        context: &mut VulkanContext,
    ) -> Result<()> {
        let capabilities = instance
            .vk_instance
            .get_physical_device_surface_capabilities_khr(context.physical_device, context.surface)
            .context("vkGetPhysicalDeviceSurfaceCapabilitiesKHR")?;
        let formats = instance
            .vk_instance
            .get_physical_device_surface_formats_khr(context.physical_device, context.surface)
            .context("vkGetPhysicalDeviceSurfaceFormatsKHR")?;
        check_surface_format(&formats)?;

        let extent = config.extent();
        let current = capabilities.current_extent;
        if current.width != u32::MAX && (current.width, current.height) != (extent.width, extent.height)
        {
            warn!(
                "Surface reports {}x{}, using the fixed {}x{} extent.",
                current.width, current.height, extent.width, extent.height
            );
        }

        let queue_family_indices = &[context.queue_family];
        let info = vk::SwapchainCreateInfoKHR::builder()
            .surface(context.surface)
            .min_image_count(image_count(config.min_image_count, &capabilities))
            .image_format(constants::SWAPCHAIN_FORMAT)
            .image_color_space(constants::SWAPCHAIN_COLOR_SPACE)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            .queue_family_indices(queue_family_indices)
            .pre_transform(vk::SurfaceTransformFlagsKHR::IDENTITY)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(vk::PresentModeKHR::FIFO)
            .clipped(true)
            .old_swapchain(vk::SwapchainKHR::null());

        context.swapchain = device
            .vk_device
            .create_swapchain_khr(&info, None)
            .context("vkCreateSwapchainKHR")?;
        context
            .resources
            .record(Resource::Swapchain(context.swapchain));

        context.swapchain_images = device
            .vk_device
            .get_swapchain_images_khr(context.swapchain)
            .context("vkGetSwapchainImagesKHR")?;
        context.swapchain_format = constants::SWAPCHAIN_FORMAT;
        context.swapchain_extent = extent;

        info!(
            "Created {}x{} swapchain with {} images.",
            extent.width,
            extent.height,
            context.image_count()
        );

        Ok(())
    }

    pub unsafe fn create_image_views(
        device: &VulkanDevice,
        context: &mut VulkanContext,
    ) -> Result<()> {
        let components = vk::ComponentMapping::builder()
            .r(vk::ComponentSwizzle::IDENTITY)
            .g(vk::ComponentSwizzle::IDENTITY)
            .b(vk::ComponentSwizzle::IDENTITY)
            .a(vk::ComponentSwizzle::IDENTITY)
            .build();

        let subresource_range = vk::ImageSubresourceRange::builder()
            .aspect_mask(vk::ImageAspectFlags::COLOR)
            .base_mip_level(0)
            .level_count(1)
            .base_array_layer(0)
            .layer_count(1)
            .build();

        let mut views = Vec::with_capacity(context.image_count());
        for image in &context.swapchain_images {
            let info = vk::ImageViewCreateInfo::builder()
                .image(*image)
                .view_type(vk::ImageViewType::_2D)
                .format(context.swapchain_format)
                .components(components)
                .subresource_range(subresource_range);

            let view = device
                .vk_device
                .create_image_view(&info, None)
                .context("vkCreateImageView")?;
            context.resources.record(Resource::ImageView(view));
            views.push(view);
        }

        context.swapchain_image_views = PerImage::new("image views", views, context.image_count())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capabilities(min: u32, max: u32) -> vk::SurfaceCapabilitiesKHR {
        vk::SurfaceCapabilitiesKHR {
            min_image_count: min,
            max_image_count: max,
            ..Default::default()
        }
    }

    #[test]
    fn requests_configured_minimum() {
        assert_eq!(image_count(2, &capabilities(1, 8)), 2);
    }

    #[test]
    fn raises_to_surface_minimum() {
        assert_eq!(image_count(2, &capabilities(3, 8)), 3);
    }

    #[test]
    fn caps_at_surface_maximum() {
        assert_eq!(image_count(4, &capabilities(1, 3)), 3);
    }

    #[test]
    fn zero_maximum_is_unbounded() {
        assert_eq!(image_count(5, &capabilities(2, 0)), 5);
    }

    #[test]
    fn accepts_fixed_format() {
        let formats = [
            vk::SurfaceFormatKHR {
                format: vk::Format::R8G8B8A8_SRGB,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            },
            vk::SurfaceFormatKHR {
                format: vk::Format::B8G8R8A8_UNORM,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            },
        ];
        assert_eq!(check_surface_format(&formats), Ok(()));
    }

    #[test]
    fn accepts_unconstrained_surface() {
        let formats = [vk::SurfaceFormatKHR {
            format: vk::Format::UNDEFINED,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        }];
        assert_eq!(check_surface_format(&formats), Ok(()));
    }

    #[test]
    fn rejects_missing_format() {
        let formats = [vk::SurfaceFormatKHR {
            format: vk::Format::R8G8B8A8_SRGB,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        }];
        assert!(matches!(
            check_surface_format(&formats),
            Err(SuitabilityError::UnsupportedSurfaceFormat { .. })
        ));
    }
}
