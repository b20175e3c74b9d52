use vulkanalia::{vk, Version};

pub const PORTABILITY_MACOS_VERSION: Version = Version::new(1, 3, 216);
pub const VALIDATION_ENABLED: bool = cfg!(debug_assertions);
pub const VALIDATION_LAYER: vk::ExtensionName =
    vk::ExtensionName::from_bytes(b"VK_LAYER_KHRONOS_validation");

pub const APPLICATION_NAME: &[u8] = b"Vulkan Triangle\0";
pub const ENGINE_NAME: &[u8] = b"Triangle Engine\0";
/// Vulkan API version targeted by the instance, as (major, minor, patch).
pub const API_VERSION: (u32, u32, u32) = (1, 2, 0);

pub const DEVICE_EXTENSIONS: &[vk::ExtensionName] = &[vk::KHR_SWAPCHAIN_EXTENSION.name];

/// The only queue family the device is ever created from.
pub const QUEUE_FAMILY_INDEX: u32 = 0;

pub const SWAPCHAIN_FORMAT: vk::Format = vk::Format::B8G8R8A8_UNORM;
pub const SWAPCHAIN_COLOR_SPACE: vk::ColorSpaceKHR = vk::ColorSpaceKHR::SRGB_NONLINEAR;

/// Entry point name shared by both shader stages.
pub const SHADER_ENTRY: &[u8] = b"main\0";
