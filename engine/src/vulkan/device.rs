use anyhow::{Context, Result};
use log::*;
use thiserror::Error;
use vulkanalia::{
    vk::{self, DeviceV1_0, HasBuilder, InstanceV1_0, KhrSurfaceExtension},
    Device, Entry,
};

use super::{constants, context::VulkanContext, instance::VulkanInstance, lifecycle::Resource};

#[derive(Debug)]
pub struct VulkanDevice {
    pub vk_device: Device,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SuitabilityError {
    #[error("No physical devices available.")]
    NoPhysicalDevice,
    #[error("Queue family {0} does not exist.")]
    MissingQueueFamily(u32),
    #[error("Queue family {0} does not support graphics.")]
    NoGraphicsSupport(u32),
    #[error("Queue family {0} cannot present to the surface.")]
    NoPresentationSupport(u32),
    #[error("Surface does not support format {format:?} with color space {color_space:?}.")]
    UnsupportedSurfaceFormat {
        format: vk::Format,
        color_space: vk::ColorSpaceKHR,
    },
}

/// Picks the adapter the device is created on.
///
/// TODO: score adapters by queue support and type instead of taking the first.
pub fn select_physical_device(
    devices: &[vk::PhysicalDevice],
) -> Result<vk::PhysicalDevice, SuitabilityError> {
    devices
        .first()
        .copied()
        .ok_or(SuitabilityError::NoPhysicalDevice)
}

/// Checks that queue family `index` can both draw and present.
pub fn check_queue_family(
    families: &[vk::QueueFamilyProperties],
    index: u32,
    presentation_supported: bool,
) -> Result<(), SuitabilityError> {
    let family = families
        .get(index as usize)
        .ok_or(SuitabilityError::MissingQueueFamily(index))?;

    if !family.queue_flags.contains(vk::QueueFlags::GRAPHICS) {
        return Err(SuitabilityError::NoGraphicsSupport(index));
    }
    if !presentation_supported {
        return Err(SuitabilityError::NoPresentationSupport(index));
    }

    Ok(())
}

impl VulkanDevice {
    unsafe fn pick_physical_device(
        instance: &VulkanInstance,
        context: &mut VulkanContext,
    ) -> Result<()> {
        let devices = instance
            .vk_instance
            .enumerate_physical_devices()
            .context("vkEnumeratePhysicalDevices")?;
        let physical_device = select_physical_device(&devices)?;

        let properties = instance
            .vk_instance
            .get_physical_device_properties(physical_device);
        info!(
            "Selected physical device (`{}`) out of {}.",
            properties.device_name,
            devices.len()
        );

        context.physical_device = physical_device;
        Ok(())
    }

    unsafe fn check_physical_device(
        instance: &VulkanInstance,
        context: &VulkanContext,
    ) -> Result<()> {
        let families = instance
            .vk_instance
            .get_physical_device_queue_family_properties(context.physical_device);

        let presentation_supported = if (constants::QUEUE_FAMILY_INDEX as usize) < families.len() {
            instance
                .vk_instance
                .get_physical_device_surface_support_khr(
                    context.physical_device,
                    constants::QUEUE_FAMILY_INDEX,
                    context.surface,
                )
                .context("vkGetPhysicalDeviceSurfaceSupportKHR")?
        } else {
            false
        };

        check_queue_family(
            &families,
            constants::QUEUE_FAMILY_INDEX,
            presentation_supported,
        )?;
        Ok(())
    }

    pub unsafe fn new(
        entry: &Entry,
        instance: &VulkanInstance,
        context: &mut VulkanContext,
    ) -> Result<VulkanDevice> {
        VulkanDevice::pick_physical_device(instance, context)?;
        VulkanDevice::check_physical_device(instance, context)?;

        let queue_priorities = &[1.0];
        let queue_info = vk::DeviceQueueCreateInfo::builder()
            .queue_family_index(constants::QUEUE_FAMILY_INDEX)
            .queue_priorities(queue_priorities);

        let layers = if constants::VALIDATION_ENABLED {
            vec![constants::VALIDATION_LAYER.as_ptr()]
        } else {
            vec![]
        };

        let mut extensions = constants::DEVICE_EXTENSIONS
            .iter()
            .map(|n| n.as_ptr())
            .collect::<Vec<_>>();

        // Required by Vulkan SDK on macOS since 1.3.216.
        if cfg!(target_os = "macos") && entry.version()? >= constants::PORTABILITY_MACOS_VERSION {
            extensions.push(vk::KHR_PORTABILITY_SUBSET_EXTENSION.name.as_ptr());
        }

        let features = vk::PhysicalDeviceFeatures::builder();

        let queue_infos = &[queue_info];
        let info = vk::DeviceCreateInfo::builder()
            .queue_create_infos(queue_infos)
            .enabled_layer_names(&layers)
            .enabled_extension_names(&extensions)
            .enabled_features(&features);

        let device = instance
            .vk_instance
            .create_device(context.physical_device, &info, None)
            .context("vkCreateDevice")?;
        context.resources.record(Resource::Device);

        context.queue_family = constants::QUEUE_FAMILY_INDEX;
        context.graphics_queue = device.get_device_queue(constants::QUEUE_FAMILY_INDEX, 0);

        Ok(VulkanDevice { vk_device: device })
    }
}
