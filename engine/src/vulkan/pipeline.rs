use super::constants;
use super::lifecycle::Resource;
use super::shader::{create_shader_module, ShaderSet};
use super::{context::VulkanContext, device::VulkanDevice};
use anyhow::{Context, Result};
use vulkanalia::vk::{self, DeviceV1_0, Handle, HasBuilder};

#[derive(Debug)]
pub struct VulkanPipeline;

/// Full-surface viewport for `extent`.
pub fn viewport(extent: vk::Extent2D) -> vk::Viewport {
    vk::Viewport::builder()
        .x(0.0)
        .y(0.0)
        .width(extent.width as f32)
        .height(extent.height as f32)
        .min_depth(0.0)
        .max_depth(1.0)
        .build()
}

pub fn scissor(extent: vk::Extent2D) -> vk::Rect2D {
    vk::Rect2D::builder()
        .offset(vk::Offset2D { x: 0, y: 0 })
        .extent(extent)
        .build()
}

/// Standard "over" compositing: `src * a + dst * (1 - a)`.
pub fn color_blend_attachment() -> vk::PipelineColorBlendAttachmentState {
    vk::PipelineColorBlendAttachmentState::builder()
        .color_write_mask(vk::ColorComponentFlags::all())
        .blend_enable(true)
        .src_color_blend_factor(vk::BlendFactor::SRC_ALPHA)
        .dst_color_blend_factor(vk::BlendFactor::ONE_MINUS_SRC_ALPHA)
        .color_blend_op(vk::BlendOp::ADD)
        .src_alpha_blend_factor(vk::BlendFactor::ONE)
        .dst_alpha_blend_factor(vk::BlendFactor::ZERO)
        .alpha_blend_op(vk::BlendOp::ADD)
        .build()
}

impl VulkanPipeline {
    /// Empty layout: the geometry lives in the vertex shader, so there are no
    /// descriptor sets or push constants.
    pub unsafe fn create_layout(device: &VulkanDevice, context: &mut VulkanContext) -> Result<()> {
        let layout_info = vk::PipelineLayoutCreateInfo::builder();
        context.pipeline_layout = device
            .vk_device
            .create_pipeline_layout(&layout_info, None)
            .context("vkCreatePipelineLayout")?;
        context
            .resources
            .record(Resource::PipelineLayout(context.pipeline_layout));
        Ok(())
    }

    pub unsafe fn create(
        device: &VulkanDevice,
        shaders: &ShaderSet,
        context: &mut VulkanContext,
    ) -> Result<()> {
        let vertex_shader_module = create_shader_module(device, &shaders.vertex)?;
        let fragment_shader_module = match create_shader_module(device, &shaders.fragment) {
            Ok(module) => module,
            Err(err) => {
                device
                    .vk_device
                    .destroy_shader_module(vertex_shader_module, None);
                return Err(err);
            }
        };

        let result = VulkanPipeline::create_with_modules(
            device,
            vertex_shader_module,
            fragment_shader_module,
            context,
        );

        // destroy shader modules
        device
            .vk_device
            .destroy_shader_module(vertex_shader_module, None);
        device
            .vk_device
            .destroy_shader_module(fragment_shader_module, None);

        context.pipeline = result?;
        context
            .resources
            .record(Resource::Pipeline(context.pipeline));

        Ok(())
    }

    unsafe fn create_with_modules(
        device: &VulkanDevice,
        vertex_shader_module: vk::ShaderModule,
        fragment_shader_module: vk::ShaderModule,
        context: &VulkanContext,
    ) -> Result<vk::Pipeline> {
        let vert_stage = vk::PipelineShaderStageCreateInfo::builder()
            .stage(vk::ShaderStageFlags::VERTEX)
            .module(vertex_shader_module)
            .name(constants::SHADER_ENTRY);

        let frag_stage = vk::PipelineShaderStageCreateInfo::builder()
            .stage(vk::ShaderStageFlags::FRAGMENT)
            .module(fragment_shader_module)
            .name(constants::SHADER_ENTRY);

        // no vertex buffers, positions are constants in the vertex shader
        let vertex_input_state = vk::PipelineVertexInputStateCreateInfo::builder();
        let input_assembly_state = vk::PipelineInputAssemblyStateCreateInfo::builder()
            .topology(vk::PrimitiveTopology::TRIANGLE_LIST)
            .primitive_restart_enable(false);

        let viewports = &[viewport(context.swapchain_extent)];
        let scissors = &[scissor(context.swapchain_extent)];
        let viewport_state = vk::PipelineViewportStateCreateInfo::builder()
            .viewports(viewports)
            .scissors(scissors);

        // rasterizer
        let rasterization_state = vk::PipelineRasterizationStateCreateInfo::builder()
            .depth_clamp_enable(false)
            .rasterizer_discard_enable(false)
            .polygon_mode(vk::PolygonMode::FILL)
            .line_width(1.0)
            .cull_mode(vk::CullModeFlags::BACK)
            .front_face(vk::FrontFace::CLOCKWISE)
            .depth_bias_enable(false);

        // multisampling
        let multisample_state = vk::PipelineMultisampleStateCreateInfo::builder()
            .sample_shading_enable(false)
            .rasterization_samples(vk::SampleCountFlags::_1);

        // color blending
        let attachments = &[color_blend_attachment()];
        let color_blend_state = vk::PipelineColorBlendStateCreateInfo::builder()
            .logic_op_enable(false)
            .logic_op(vk::LogicOp::COPY)
            .attachments(attachments)
            .blend_constants([0.0, 0.0, 0.0, 0.0]);

        let stages = &[vert_stage, frag_stage];
        let info = vk::GraphicsPipelineCreateInfo::builder()
            .stages(stages)
            .vertex_input_state(&vertex_input_state)
            .input_assembly_state(&input_assembly_state)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterization_state)
            .multisample_state(&multisample_state)
            .color_blend_state(&color_blend_state)
            .layout(context.pipeline_layout)
            .render_pass(context.render_pass)
            .subpass(0);

        let pipeline = device
            .vk_device
            .create_graphics_pipelines(vk::PipelineCache::null(), &[info], None)
            .context("vkCreateGraphicsPipelines")?
            .0[0];

        Ok(pipeline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RendererConfig;

    #[test]
    fn viewport_and_scissor_match_configured_extent() {
        let extent = RendererConfig::default().extent();

        let viewport = viewport(extent);
        let scissor = scissor(extent);

        assert_eq!(viewport.width, 400.0);
        assert_eq!(viewport.height, 300.0);
        assert_eq!((viewport.x, viewport.y), (0.0, 0.0));
        assert_eq!((viewport.min_depth, viewport.max_depth), (0.0, 1.0));
        assert_eq!((scissor.offset.x, scissor.offset.y), (0, 0));
        assert_eq!(
            (scissor.extent.width, scissor.extent.height),
            (extent.width, extent.height)
        );
    }

    #[test]
    fn blending_composites_over() {
        let blend = color_blend_attachment();

        assert_eq!(blend.blend_enable, vk::TRUE);
        assert_eq!(blend.src_color_blend_factor, vk::BlendFactor::SRC_ALPHA);
        assert_eq!(
            blend.dst_color_blend_factor,
            vk::BlendFactor::ONE_MINUS_SRC_ALPHA
        );
        assert_eq!(blend.color_blend_op, vk::BlendOp::ADD);
        assert_eq!(blend.color_write_mask, vk::ColorComponentFlags::all());
    }
}
