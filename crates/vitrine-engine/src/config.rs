use crate::device::GpuInit;

/// Renderer sizing and backend options.
///
/// All values are fixed for the renderer's lifetime. The descriptor heap in
/// particular never grows: size it for the largest number of images that may
/// be loaded at once.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Frame contexts in the submission ring. The CPU never runs more than this
    /// many frames ahead of GPU completion.
    pub frames_in_flight: usize,

    /// Swap-chain back buffers. Also used as the maximum frame latency.
    pub back_buffer_count: u32,

    /// Slots in the shader-visible descriptor heap.
    pub descriptor_capacity: u32,

    /// wgpu-specific surface/device options.
    pub gpu: GpuInit,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            frames_in_flight: 2,
            back_buffer_count: 2,
            descriptor_capacity: 64,
            gpu: GpuInit::default(),
        }
    }
}
