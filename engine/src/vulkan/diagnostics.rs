//! Read-only reporting about the driver, adapters and surface.
//!
//! Nothing here influences control flow; it only writes text.

use std::io::{self, Write};

use anyhow::{Context, Result};
use log::*;
use vulkanalia::prelude::v1_0::*;
use vulkanalia::vk::{self, KhrSurfaceExtension};

/// Splits a packed Vulkan version into `major.minor.patch`.
pub fn format_version(version: u32) -> String {
    format!(
        "{}.{}.{}",
        version >> 22,
        (version >> 12) & 0x3ff,
        version & 0xfff
    )
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

pub fn write_layers(out: &mut impl Write, layers: &[vk::LayerProperties]) -> io::Result<()> {
    writeln!(out, "Instance layers: {}", layers.len())?;
    for layer in layers {
        writeln!(
            out,
            "  {} (spec {}): {}",
            layer.layer_name,
            format_version(layer.spec_version),
            layer.description
        )?;
    }
    writeln!(out)
}

pub fn write_extensions(
    out: &mut impl Write,
    extensions: &[vk::ExtensionProperties],
) -> io::Result<()> {
    writeln!(out, "Instance extensions: {}", extensions.len())?;
    for extension in extensions {
        writeln!(
            out,
            "  {} (version {})",
            extension.extension_name, extension.spec_version
        )?;
    }
    writeln!(out)
}

pub fn write_adapter(
    out: &mut impl Write,
    properties: &vk::PhysicalDeviceProperties,
    features: &vk::PhysicalDeviceFeatures,
    memory: &vk::PhysicalDeviceMemoryProperties,
    families: &[vk::QueueFamilyProperties],
) -> io::Result<()> {
    writeln!(out, "Name:                     {}", properties.device_name)?;
    writeln!(
        out,
        "API Version:              {}",
        format_version(properties.api_version)
    )?;
    writeln!(out, "Driver Version:           {}", properties.driver_version)?;
    writeln!(out, "Vendor ID:                {}", properties.vendor_id)?;
    writeln!(out, "Device ID:                {}", properties.device_id)?;
    writeln!(out, "Device Type:              {:?}", properties.device_type)?;
    writeln!(
        out,
        "DiscreteQueuePriorities:  {}",
        properties.limits.discrete_queue_priorities
    )?;
    writeln!(
        out,
        "Geometry Shader:          {}",
        yes_no(features.geometry_shader == vk::TRUE)
    )?;
    writeln!(
        out,
        "Memory Heaps / Types:     {} / {}",
        memory.memory_heap_count, memory.memory_type_count
    )?;
    writeln!(out, "Queue Families:           {}", families.len())?;

    for (index, family) in families.iter().enumerate() {
        let flags = family.queue_flags;
        let granularity = family.min_image_transfer_granularity;
        writeln!(out)?;
        writeln!(out, "Queue Family #{}", index)?;
        writeln!(
            out,
            "  GRAPHICS        {}",
            yes_no(flags.contains(vk::QueueFlags::GRAPHICS))
        )?;
        writeln!(
            out,
            "  COMPUTE         {}",
            yes_no(flags.contains(vk::QueueFlags::COMPUTE))
        )?;
        writeln!(
            out,
            "  TRANSFER        {}",
            yes_no(flags.contains(vk::QueueFlags::TRANSFER))
        )?;
        writeln!(
            out,
            "  SPARSE_BINDING  {}",
            yes_no(flags.contains(vk::QueueFlags::SPARSE_BINDING))
        )?;
        writeln!(out, "  Queue Count:          {}", family.queue_count)?;
        writeln!(
            out,
            "  Timestamp Valid Bits: {}",
            family.timestamp_valid_bits
        )?;
        writeln!(
            out,
            "  Min Image Transfer Granularity: {}, {}, {}",
            granularity.width, granularity.height, granularity.depth
        )?;
    }
    writeln!(out)
}

pub fn write_surface(
    out: &mut impl Write,
    capabilities: &vk::SurfaceCapabilitiesKHR,
    formats: &[vk::SurfaceFormatKHR],
    present_modes: &[vk::PresentModeKHR],
) -> io::Result<()> {
    let extent = |e: vk::Extent2D| format!("{}x{}", e.width, e.height);

    writeln!(out, "Surface capabilities")?;
    writeln!(out, "  Min Image Count:     {}", capabilities.min_image_count)?;
    writeln!(out, "  Max Image Count:     {}", capabilities.max_image_count)?;
    writeln!(
        out,
        "  Current Extent:      {}",
        extent(capabilities.current_extent)
    )?;
    writeln!(
        out,
        "  Min Image Extent:    {}",
        extent(capabilities.min_image_extent)
    )?;
    writeln!(
        out,
        "  Max Image Extent:    {}",
        extent(capabilities.max_image_extent)
    )?;
    writeln!(
        out,
        "  Max Array Layers:    {}",
        capabilities.max_image_array_layers
    )?;
    writeln!(
        out,
        "  Supported Transforms: {:?}",
        capabilities.supported_transforms
    )?;
    writeln!(
        out,
        "  Current Transform:   {:?}",
        capabilities.current_transform
    )?;
    writeln!(
        out,
        "  Composite Alpha:     {:?}",
        capabilities.supported_composite_alpha
    )?;
    writeln!(
        out,
        "  Usage Flags:         {:?}",
        capabilities.supported_usage_flags
    )?;

    writeln!(out, "Surface formats: {}", formats.len())?;
    for format in formats {
        writeln!(out, "  {:?} / {:?}", format.format, format.color_space)?;
    }

    writeln!(out, "Present modes: {}", present_modes.len())?;
    for mode in present_modes {
        writeln!(out, "  {:?}", mode)?;
    }
    writeln!(out)
}

/// Runs `write` against `out` and logs a failure instead of returning it.
/// Returns whether the report was written in full.
pub fn write_or_warn<W: Write>(out: &mut W, write: impl FnOnce(&mut W) -> Result<()>) -> bool {
    match write(out) {
        Ok(()) => true,
        Err(err) => {
            warn!("Diagnostics failed: {:#}", err);
            false
        }
    }
}

/// Queries everything the driver reports and writes it to `out`.
pub unsafe fn report(
    out: &mut impl Write,
    entry: &Entry,
    instance: &Instance,
    surface: vk::SurfaceKHR,
) -> Result<()> {
    let layers = entry
        .enumerate_instance_layer_properties()
        .context("vkEnumerateInstanceLayerProperties")?;
    write_layers(out, &layers)?;

    let extensions = entry
        .enumerate_instance_extension_properties(None)
        .context("vkEnumerateInstanceExtensionProperties")?;
    write_extensions(out, &extensions)?;

    let devices = instance
        .enumerate_physical_devices()
        .context("vkEnumeratePhysicalDevices")?;
    writeln!(out, "Physical devices: {}", devices.len())?;
    writeln!(out)?;

    for device in &devices {
        write_adapter(
            out,
            &instance.get_physical_device_properties(*device),
            &instance.get_physical_device_features(*device),
            &instance.get_physical_device_memory_properties(*device),
            &instance.get_physical_device_queue_family_properties(*device),
        )?;
    }

    if let Some(device) = devices.first() {
        let capabilities = instance
            .get_physical_device_surface_capabilities_khr(*device, surface)
            .context("vkGetPhysicalDeviceSurfaceCapabilitiesKHR")?;
        let formats = instance
            .get_physical_device_surface_formats_khr(*device, surface)
            .context("vkGetPhysicalDeviceSurfaceFormatsKHR")?;
        let present_modes = instance
            .get_physical_device_surface_present_modes_khr(*device, surface)
            .context("vkGetPhysicalDeviceSurfacePresentModesKHR")?;
        write_surface(out, &capabilities, &formats, &present_modes)?;
    }

    out.flush()?;
    Ok(())
}
