// Translation between the backend-neutral vocabulary and ash/vk values

use ash::vk;
use gpu_allocator::MemoryLocation;

use crate::gpu_core::*;

macro_rules! map_flags {
    ($value:expr, $out:ty, { $($from:expr => $to:expr),* $(,)? }) => {{
        let mut out = <$out>::empty();
        $(
            if $value.contains($from) {
                out |= $to;
            }
        )*
        out
    }};
}

pub(super) fn format(format: Format) -> vk::Format {
    match format {
        Format::Undefined => vk::Format::UNDEFINED,
        Format::R8Unorm => vk::Format::R8_UNORM,
        Format::R8G8B8A8Unorm => vk::Format::R8G8B8A8_UNORM,
        Format::R8G8B8A8Srgb => vk::Format::R8G8B8A8_SRGB,
        Format::B8G8R8A8Unorm => vk::Format::B8G8R8A8_UNORM,
        Format::B8G8R8A8Srgb => vk::Format::B8G8R8A8_SRGB,
        Format::R16G16B16A16Sfloat => vk::Format::R16G16B16A16_SFLOAT,
        Format::R32Uint => vk::Format::R32_UINT,
        Format::R32Sfloat => vk::Format::R32_SFLOAT,
        Format::R32G32Sfloat => vk::Format::R32G32_SFLOAT,
        Format::R32G32B32Sfloat => vk::Format::R32G32B32_SFLOAT,
        Format::R32G32B32A32Sfloat => vk::Format::R32G32B32A32_SFLOAT,
        Format::D16Unorm => vk::Format::D16_UNORM,
        Format::D32Sfloat => vk::Format::D32_SFLOAT,
        Format::D24UnormS8Uint => vk::Format::D24_UNORM_S8_UINT,
        Format::D32SfloatS8Uint => vk::Format::D32_SFLOAT_S8_UINT,
    }
}

/// `None` for native formats without a frontend equivalent
pub(super) fn format_from_vk(format: vk::Format) -> Option<Format> {
    Some(match format {
        vk::Format::R8_UNORM => Format::R8Unorm,
        vk::Format::R8G8B8A8_UNORM => Format::R8G8B8A8Unorm,
        vk::Format::R8G8B8A8_SRGB => Format::R8G8B8A8Srgb,
        vk::Format::B8G8R8A8_UNORM => Format::B8G8R8A8Unorm,
        vk::Format::B8G8R8A8_SRGB => Format::B8G8R8A8Srgb,
        vk::Format::R16G16B16A16_SFLOAT => Format::R16G16B16A16Sfloat,
        vk::Format::R32_UINT => Format::R32Uint,
        vk::Format::R32_SFLOAT => Format::R32Sfloat,
        vk::Format::R32G32_SFLOAT => Format::R32G32Sfloat,
        vk::Format::R32G32B32_SFLOAT => Format::R32G32B32Sfloat,
        vk::Format::R32G32B32A32_SFLOAT => Format::R32G32B32A32Sfloat,
        vk::Format::D16_UNORM => Format::D16Unorm,
        vk::Format::D32_SFLOAT => Format::D32Sfloat,
        vk::Format::D24_UNORM_S8_UINT => Format::D24UnormS8Uint,
        vk::Format::D32_SFLOAT_S8_UINT => Format::D32SfloatS8Uint,
        _ => return None,
    })
}

pub(super) fn color_space(color_space: ColorSpace) -> vk::ColorSpaceKHR {
    match color_space {
        ColorSpace::SrgbNonlinear => vk::ColorSpaceKHR::SRGB_NONLINEAR,
        ColorSpace::ExtendedSrgbLinear => vk::ColorSpaceKHR::EXTENDED_SRGB_LINEAR_EXT,
        ColorSpace::Hdr10St2084 => vk::ColorSpaceKHR::HDR10_ST2084_EXT,
    }
}

pub(super) fn color_space_from_vk(color_space: vk::ColorSpaceKHR) -> Option<ColorSpace> {
    match color_space {
        vk::ColorSpaceKHR::SRGB_NONLINEAR => Some(ColorSpace::SrgbNonlinear),
        vk::ColorSpaceKHR::EXTENDED_SRGB_LINEAR_EXT => Some(ColorSpace::ExtendedSrgbLinear),
        vk::ColorSpaceKHR::HDR10_ST2084_EXT => Some(ColorSpace::Hdr10St2084),
        _ => None,
    }
}

pub(super) fn present_mode(mode: PresentMode) -> vk::PresentModeKHR {
    match mode {
        PresentMode::Immediate => vk::PresentModeKHR::IMMEDIATE,
        PresentMode::Mailbox => vk::PresentModeKHR::MAILBOX,
        PresentMode::Fifo => vk::PresentModeKHR::FIFO,
        PresentMode::FifoRelaxed => vk::PresentModeKHR::FIFO_RELAXED,
    }
}

pub(super) fn present_mode_from_vk(mode: vk::PresentModeKHR) -> Option<PresentMode> {
    match mode {
        vk::PresentModeKHR::IMMEDIATE => Some(PresentMode::Immediate),
        vk::PresentModeKHR::MAILBOX => Some(PresentMode::Mailbox),
        vk::PresentModeKHR::FIFO => Some(PresentMode::Fifo),
        vk::PresentModeKHR::FIFO_RELAXED => Some(PresentMode::FifoRelaxed),
        _ => None,
    }
}

pub(super) fn device_type_from_vk(device_type: vk::PhysicalDeviceType) -> AdapterDeviceType {
    match device_type {
        vk::PhysicalDeviceType::DISCRETE_GPU => AdapterDeviceType::DiscreteGpu,
        vk::PhysicalDeviceType::INTEGRATED_GPU => AdapterDeviceType::IntegratedGpu,
        vk::PhysicalDeviceType::VIRTUAL_GPU => AdapterDeviceType::VirtualGpu,
        vk::PhysicalDeviceType::CPU => AdapterDeviceType::Cpu,
        _ => AdapterDeviceType::Other,
    }
}

pub(super) fn queue_flags_from_vk(flags: vk::QueueFlags) -> QueueFlags {
    map_flags!(flags, QueueFlags, {
        vk::QueueFlags::GRAPHICS => QueueFlags::GRAPHICS,
        vk::QueueFlags::COMPUTE => QueueFlags::COMPUTE,
        vk::QueueFlags::TRANSFER => QueueFlags::TRANSFER,
        vk::QueueFlags::SPARSE_BINDING => QueueFlags::SPARSE_BINDING,
    })
}

pub(super) fn texture_usage(usage: TextureUsageFlags) -> vk::ImageUsageFlags {
    map_flags!(usage, vk::ImageUsageFlags, {
        TextureUsageFlags::TRANSFER_SRC => vk::ImageUsageFlags::TRANSFER_SRC,
        TextureUsageFlags::TRANSFER_DST => vk::ImageUsageFlags::TRANSFER_DST,
        TextureUsageFlags::SAMPLED => vk::ImageUsageFlags::SAMPLED,
        TextureUsageFlags::STORAGE => vk::ImageUsageFlags::STORAGE,
        TextureUsageFlags::COLOR_ATTACHMENT => vk::ImageUsageFlags::COLOR_ATTACHMENT,
        TextureUsageFlags::DEPTH_STENCIL_ATTACHMENT => vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT,
    })
}

pub(super) fn texture_usage_from_vk(usage: vk::ImageUsageFlags) -> TextureUsageFlags {
    map_flags!(usage, TextureUsageFlags, {
        vk::ImageUsageFlags::TRANSFER_SRC => TextureUsageFlags::TRANSFER_SRC,
        vk::ImageUsageFlags::TRANSFER_DST => TextureUsageFlags::TRANSFER_DST,
        vk::ImageUsageFlags::SAMPLED => TextureUsageFlags::SAMPLED,
        vk::ImageUsageFlags::STORAGE => TextureUsageFlags::STORAGE,
        vk::ImageUsageFlags::COLOR_ATTACHMENT => TextureUsageFlags::COLOR_ATTACHMENT,
        vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT => TextureUsageFlags::DEPTH_STENCIL_ATTACHMENT,
    })
}

pub(super) fn buffer_usage(usage: BufferUsageFlags) -> vk::BufferUsageFlags {
    map_flags!(usage, vk::BufferUsageFlags, {
        BufferUsageFlags::TRANSFER_SRC => vk::BufferUsageFlags::TRANSFER_SRC,
        BufferUsageFlags::TRANSFER_DST => vk::BufferUsageFlags::TRANSFER_DST,
        BufferUsageFlags::UNIFORM_BUFFER => vk::BufferUsageFlags::UNIFORM_BUFFER,
        BufferUsageFlags::STORAGE_BUFFER => vk::BufferUsageFlags::STORAGE_BUFFER,
        BufferUsageFlags::INDEX_BUFFER => vk::BufferUsageFlags::INDEX_BUFFER,
        BufferUsageFlags::VERTEX_BUFFER => vk::BufferUsageFlags::VERTEX_BUFFER,
        BufferUsageFlags::INDIRECT_BUFFER => vk::BufferUsageFlags::INDIRECT_BUFFER,
    })
}

pub(super) fn aspect(aspect: TextureAspectFlags) -> vk::ImageAspectFlags {
    map_flags!(aspect, vk::ImageAspectFlags, {
        TextureAspectFlags::COLOR => vk::ImageAspectFlags::COLOR,
        TextureAspectFlags::DEPTH => vk::ImageAspectFlags::DEPTH,
        TextureAspectFlags::STENCIL => vk::ImageAspectFlags::STENCIL,
    })
}

pub(super) fn shader_stages(stages: ShaderStageFlags) -> vk::ShaderStageFlags {
    map_flags!(stages, vk::ShaderStageFlags, {
        ShaderStageFlags::VERTEX => vk::ShaderStageFlags::VERTEX,
        ShaderStageFlags::FRAGMENT => vk::ShaderStageFlags::FRAGMENT,
        ShaderStageFlags::COMPUTE => vk::ShaderStageFlags::COMPUTE,
    })
}

pub(super) fn pipeline_stages(stages: PipelineStageFlags) -> vk::PipelineStageFlags {
    let out = map_flags!(stages, vk::PipelineStageFlags, {
        PipelineStageFlags::TOP_OF_PIPE => vk::PipelineStageFlags::TOP_OF_PIPE,
        PipelineStageFlags::VERTEX_INPUT => vk::PipelineStageFlags::VERTEX_INPUT,
        PipelineStageFlags::VERTEX_SHADER => vk::PipelineStageFlags::VERTEX_SHADER,
        PipelineStageFlags::FRAGMENT_SHADER => vk::PipelineStageFlags::FRAGMENT_SHADER,
        PipelineStageFlags::EARLY_FRAGMENT_TESTS => vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS,
        PipelineStageFlags::LATE_FRAGMENT_TESTS => vk::PipelineStageFlags::LATE_FRAGMENT_TESTS,
        PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT => vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
        PipelineStageFlags::COMPUTE_SHADER => vk::PipelineStageFlags::COMPUTE_SHADER,
        PipelineStageFlags::TRANSFER => vk::PipelineStageFlags::TRANSFER,
        PipelineStageFlags::BOTTOM_OF_PIPE => vk::PipelineStageFlags::BOTTOM_OF_PIPE,
        PipelineStageFlags::HOST => vk::PipelineStageFlags::HOST,
        PipelineStageFlags::ALL_GRAPHICS => vk::PipelineStageFlags::ALL_GRAPHICS,
        PipelineStageFlags::ALL_COMMANDS => vk::PipelineStageFlags::ALL_COMMANDS,
    });
    // An empty stage mask is invalid in a barrier
    if out.is_empty() {
        vk::PipelineStageFlags::TOP_OF_PIPE
    } else {
        out
    }
}

pub(super) fn access(access: AccessFlags) -> vk::AccessFlags {
    map_flags!(access, vk::AccessFlags, {
        AccessFlags::INDIRECT_COMMAND_READ => vk::AccessFlags::INDIRECT_COMMAND_READ,
        AccessFlags::INDEX_READ => vk::AccessFlags::INDEX_READ,
        AccessFlags::VERTEX_ATTRIBUTE_READ => vk::AccessFlags::VERTEX_ATTRIBUTE_READ,
        AccessFlags::UNIFORM_READ => vk::AccessFlags::UNIFORM_READ,
        AccessFlags::SHADER_READ => vk::AccessFlags::SHADER_READ,
        AccessFlags::SHADER_WRITE => vk::AccessFlags::SHADER_WRITE,
        AccessFlags::COLOR_ATTACHMENT_READ => vk::AccessFlags::COLOR_ATTACHMENT_READ,
        AccessFlags::COLOR_ATTACHMENT_WRITE => vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
        AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ => vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ,
        AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE => vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
        AccessFlags::TRANSFER_READ => vk::AccessFlags::TRANSFER_READ,
        AccessFlags::TRANSFER_WRITE => vk::AccessFlags::TRANSFER_WRITE,
        AccessFlags::HOST_READ => vk::AccessFlags::HOST_READ,
        AccessFlags::HOST_WRITE => vk::AccessFlags::HOST_WRITE,
        AccessFlags::MEMORY_READ => vk::AccessFlags::MEMORY_READ,
        AccessFlags::MEMORY_WRITE => vk::AccessFlags::MEMORY_WRITE,
    })
}

pub(super) fn texture_layout(layout: TextureLayout) -> vk::ImageLayout {
    match layout {
        TextureLayout::Undefined => vk::ImageLayout::UNDEFINED,
        TextureLayout::General => vk::ImageLayout::GENERAL,
        TextureLayout::ColorAttachmentOptimal => vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        TextureLayout::DepthStencilAttachmentOptimal => vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
        TextureLayout::ShaderReadOnlyOptimal => vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        TextureLayout::TransferSrcOptimal => vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
        TextureLayout::TransferDstOptimal => vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        TextureLayout::PresentSrc => vk::ImageLayout::PRESENT_SRC_KHR,
    }
}

pub(super) fn image_type(texture_type: TextureType) -> vk::ImageType {
    match texture_type {
        TextureType::TextureType1D => vk::ImageType::TYPE_1D,
        TextureType::TextureType2D => vk::ImageType::TYPE_2D,
        TextureType::TextureType3D => vk::ImageType::TYPE_3D,
    }
}

pub(super) fn view_type(view_type: ViewType) -> vk::ImageViewType {
    match view_type {
        ViewType::ViewType1D => vk::ImageViewType::TYPE_1D,
        ViewType::ViewType2D => vk::ImageViewType::TYPE_2D,
        ViewType::ViewType3D => vk::ImageViewType::TYPE_3D,
        ViewType::ViewTypeCube => vk::ImageViewType::CUBE,
        ViewType::ViewType2DArray => vk::ImageViewType::TYPE_2D_ARRAY,
    }
}

pub(super) fn samples(samples: SampleCount) -> vk::SampleCountFlags {
    match samples {
        SampleCount::Samples1 => vk::SampleCountFlags::TYPE_1,
        SampleCount::Samples2 => vk::SampleCountFlags::TYPE_2,
        SampleCount::Samples4 => vk::SampleCountFlags::TYPE_4,
        SampleCount::Samples8 => vk::SampleCountFlags::TYPE_8,
    }
}

pub(super) fn load_op(op: AttachmentLoadOperation) -> vk::AttachmentLoadOp {
    match op {
        AttachmentLoadOperation::Load => vk::AttachmentLoadOp::LOAD,
        AttachmentLoadOperation::Clear => vk::AttachmentLoadOp::CLEAR,
        AttachmentLoadOperation::DontCare => vk::AttachmentLoadOp::DONT_CARE,
    }
}

pub(super) fn store_op(op: AttachmentStoreOperation) -> vk::AttachmentStoreOp {
    match op {
        AttachmentStoreOperation::Store => vk::AttachmentStoreOp::STORE,
        AttachmentStoreOperation::DontCare => vk::AttachmentStoreOp::DONT_CARE,
    }
}

pub(super) fn topology(topology: PrimitiveTopology) -> vk::PrimitiveTopology {
    match topology {
        PrimitiveTopology::PointList => vk::PrimitiveTopology::POINT_LIST,
        PrimitiveTopology::LineList => vk::PrimitiveTopology::LINE_LIST,
        PrimitiveTopology::LineStrip => vk::PrimitiveTopology::LINE_STRIP,
        PrimitiveTopology::TriangleList => vk::PrimitiveTopology::TRIANGLE_LIST,
        PrimitiveTopology::TriangleStrip => vk::PrimitiveTopology::TRIANGLE_STRIP,
    }
}

pub(super) fn cull_mode(mode: CullMode) -> vk::CullModeFlags {
    match mode {
        CullMode::None => vk::CullModeFlags::NONE,
        CullMode::Front => vk::CullModeFlags::FRONT,
        CullMode::Back => vk::CullModeFlags::BACK,
        CullMode::FrontAndBack => vk::CullModeFlags::FRONT_AND_BACK,
    }
}

pub(super) fn front_face(face: FrontFace) -> vk::FrontFace {
    match face {
        FrontFace::CounterClockwise => vk::FrontFace::COUNTER_CLOCKWISE,
        FrontFace::Clockwise => vk::FrontFace::CLOCKWISE,
    }
}

pub(super) fn polygon_mode(mode: PolygonMode) -> vk::PolygonMode {
    match mode {
        PolygonMode::Fill => vk::PolygonMode::FILL,
        PolygonMode::Line => vk::PolygonMode::LINE,
        PolygonMode::Point => vk::PolygonMode::POINT,
    }
}

pub(super) fn compare_op(op: CompareOperation) -> vk::CompareOp {
    match op {
        CompareOperation::Never => vk::CompareOp::NEVER,
        CompareOperation::Less => vk::CompareOp::LESS,
        CompareOperation::Equal => vk::CompareOp::EQUAL,
        CompareOperation::LessOrEqual => vk::CompareOp::LESS_OR_EQUAL,
        CompareOperation::Greater => vk::CompareOp::GREATER,
        CompareOperation::NotEqual => vk::CompareOp::NOT_EQUAL,
        CompareOperation::GreaterOrEqual => vk::CompareOp::GREATER_OR_EQUAL,
        CompareOperation::Always => vk::CompareOp::ALWAYS,
    }
}

pub(super) fn vertex_rate(rate: VertexRate) -> vk::VertexInputRate {
    match rate {
        VertexRate::Vertex => vk::VertexInputRate::VERTEX,
        VertexRate::Instance => vk::VertexInputRate::INSTANCE,
    }
}

pub(super) fn index_type(index_type: IndexType) -> vk::IndexType {
    match index_type {
        IndexType::Uint16 => vk::IndexType::UINT16,
        IndexType::Uint32 => vk::IndexType::UINT32,
    }
}

pub(super) fn filter(mode: FilterMode) -> vk::Filter {
    match mode {
        FilterMode::Nearest => vk::Filter::NEAREST,
        FilterMode::Linear => vk::Filter::LINEAR,
    }
}

pub(super) fn mipmap_mode(mode: FilterMode) -> vk::SamplerMipmapMode {
    match mode {
        FilterMode::Nearest => vk::SamplerMipmapMode::NEAREST,
        FilterMode::Linear => vk::SamplerMipmapMode::LINEAR,
    }
}

pub(super) fn address_mode(mode: AddressMode) -> vk::SamplerAddressMode {
    match mode {
        AddressMode::Repeat => vk::SamplerAddressMode::REPEAT,
        AddressMode::MirroredRepeat => vk::SamplerAddressMode::MIRRORED_REPEAT,
        AddressMode::ClampToEdge => vk::SamplerAddressMode::CLAMP_TO_EDGE,
        AddressMode::ClampToBorder => vk::SamplerAddressMode::CLAMP_TO_BORDER,
    }
}

pub(super) fn descriptor_type(binding_type: ResourceBindingType) -> vk::DescriptorType {
    match binding_type {
        ResourceBindingType::UniformBuffer => vk::DescriptorType::UNIFORM_BUFFER,
        ResourceBindingType::DynamicUniformBuffer => vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC,
        ResourceBindingType::StorageBuffer => vk::DescriptorType::STORAGE_BUFFER,
        ResourceBindingType::CombinedImageSampler => vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
        ResourceBindingType::SampledImage => vk::DescriptorType::SAMPLED_IMAGE,
        ResourceBindingType::StorageImage => vk::DescriptorType::STORAGE_IMAGE,
        ResourceBindingType::Sampler => vk::DescriptorType::SAMPLER,
    }
}

pub(super) fn memory_location(usage: MemoryUsage) -> MemoryLocation {
    match usage {
        MemoryUsage::GpuOnly => MemoryLocation::GpuOnly,
        MemoryUsage::CpuOnly | MemoryUsage::CpuToGpu => MemoryLocation::CpuToGpu,
        MemoryUsage::GpuToCpu => MemoryLocation::GpuToCpu,
    }
}

pub(super) fn extent_2d(extent: Extent2D) -> vk::Extent2D {
    vk::Extent2D {
        width: extent.width,
        height: extent.height,
    }
}

pub(super) fn extent_2d_from_vk(extent: vk::Extent2D) -> Extent2D {
    Extent2D {
        width: extent.width,
        height: extent.height,
    }
}

pub(super) fn extent_3d(extent: Extent3D) -> vk::Extent3D {
    vk::Extent3D {
        width: extent.width,
        height: extent.height,
        depth: extent.depth,
    }
}

pub(super) fn rect_2d(rect: Rect2D) -> vk::Rect2D {
    vk::Rect2D {
        offset: vk::Offset2D {
            x: rect.offset.x,
            y: rect.offset.y,
        },
        extent: extent_2d(rect.extent),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_round_trips_through_vk() {
        for format in [Format::B8G8R8A8Srgb, Format::D32Sfloat, Format::R32G32B32Sfloat] {
            assert_eq!(format_from_vk(self::format(format)), Some(format));
        }
        assert_eq!(format_from_vk(vk::Format::BC1_RGB_UNORM_BLOCK), None);
    }

    #[test]
    fn test_flag_mapping_keeps_every_bit() {
        let usage = TextureUsageFlags::COLOR_ATTACHMENT | TextureUsageFlags::TRANSFER_DST;
        assert_eq!(
            texture_usage(usage),
            vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_DST
        );
        assert_eq!(texture_usage_from_vk(texture_usage(usage)), usage);
        assert_eq!(
            shader_stages(ShaderStageFlags::ALL_GRAPHICS),
            vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT
        );
    }

    #[test]
    fn test_empty_stage_mask_becomes_top_of_pipe() {
        assert_eq!(
            pipeline_stages(PipelineStageFlags::empty()),
            vk::PipelineStageFlags::TOP_OF_PIPE
        );
    }
}
