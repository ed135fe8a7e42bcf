use thiserror::Error;

use crate::descriptor::DescriptorSlotAllocator;
use crate::device::{DeviceError, Fence, PixelFormat, RenderDevice, ResourceState, TextureDesc};

use super::footprint::pack_rows;
use super::gpu_texture::GpuTexture;

/// Why a texture upload failed. Nothing created by the failed call survives.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("unsupported pixel size of {bytes_per_pixel} bytes (expected 4)")]
    UnsupportedFormat { bytes_per_pixel: u32 },

    #[error("pixel buffer holds {actual} bytes, {width}x{height} needs {expected}")]
    PixelCountMismatch {
        width: u32,
        height: u32,
        expected: u64,
        actual: u64,
    },

    #[error("texture creation failed")]
    TextureCreation(#[source] DeviceError),

    #[error("descriptor heap exhausted ({capacity} slots)")]
    DescriptorsExhausted { capacity: u32 },

    #[error("staging buffer creation failed")]
    Staging(#[source] DeviceError),

    #[error("recording upload commands failed")]
    Recording(#[source] DeviceError),

    #[error("upload submission failed")]
    Submission(#[source] DeviceError),
}

/// Synchronous CPU → GPU texture upload.
///
/// Every call records a one-shot copy from a staging buffer, submits it, and
/// blocks on a fence dedicated to uploads before handing back the texture.
pub struct TextureUploadPipeline<D: RenderDevice> {
    fence: D::Fence,
    fence_value: u64,
}

impl<D: RenderDevice> TextureUploadPipeline<D> {
    pub fn new(device: &D) -> Result<Self, DeviceError> {
        Ok(Self {
            fence: device.create_fence()?,
            fence_value: 0,
        })
    }

    /// Last value signaled on the upload fence.
    pub fn fence_value(&self) -> u64 {
        self.fence_value
    }

    /// Uploads tightly packed, top-to-bottom `pixels` into a new texture bound to
    /// a fresh descriptor slot.
    pub fn load(
        &mut self,
        device: &D,
        slots: &mut DescriptorSlotAllocator,
        pixels: &[u8],
        width: u32,
        height: u32,
        bytes_per_pixel: u32,
    ) -> Result<GpuTexture<D::Texture>, UploadError> {
        let format = PixelFormat::Rgba8;
        if bytes_per_pixel != format.bytes_per_pixel() {
            return Err(UploadError::UnsupportedFormat { bytes_per_pixel });
        }
        let expected = u64::from(width) * u64::from(height) * u64::from(bytes_per_pixel);
        if pixels.len() as u64 != expected {
            return Err(UploadError::PixelCountMismatch {
                width,
                height,
                expected,
                actual: pixels.len() as u64,
            });
        }

        let desc = TextureDesc {
            label: format!("vitrine image {width}x{height}"),
            width,
            height,
            format,
        };

        let texture = device
            .create_texture(&desc)
            .map_err(UploadError::TextureCreation)?;

        let Some(slot) = slots.try_alloc() else {
            drop(texture);
            return Err(UploadError::DescriptorsExhausted {
                capacity: slots.capacity(),
            });
        };
        device.bind_shader_view(&texture, slot);

        if let Err(err) = self.stage_and_copy(device, &texture, &desc, pixels) {
            device.unbind_shader_view(slot);
            slots.free(slot);
            drop(texture);
            log::warn!("upload of {width}x{height} texture rolled back: {err}");
            return Err(err);
        }

        log::debug!(
            "uploaded {width}x{height} texture into slot {} (fence {})",
            slot.index,
            self.fence_value
        );
        Ok(GpuTexture::new(texture, slot, width, height))
    }

    fn stage_and_copy(
        &mut self,
        device: &D,
        texture: &D::Texture,
        desc: &TextureDesc,
        pixels: &[u8],
    ) -> Result<(), UploadError> {
        let footprint = device
            .copyable_footprint(desc)
            .map_err(UploadError::Staging)?;

        let mut staging = device
            .create_staging_buffer(footprint.offset + footprint.total_bytes)
            .map_err(UploadError::Staging)?;

        let packed = pack_rows(pixels, &footprint).map_err(UploadError::Staging)?;
        device
            .write_staging(&mut staging, footprint.offset, &packed)
            .map_err(UploadError::Staging)?;

        let mut allocator = device
            .create_command_allocator("vitrine upload")
            .map_err(UploadError::Recording)?;
        let mut list = device
            .begin_commands(&mut allocator)
            .map_err(UploadError::Recording)?;

        device.copy_staging_to_texture(&mut list, &staging, &footprint, texture);
        device.texture_barrier(
            &mut list,
            texture,
            ResourceState::CopyDest,
            ResourceState::PixelShaderResource,
        );

        device.execute(list).map_err(UploadError::Submission)?;

        self.fence_value += 1;
        self.fence.signal(self.fence_value);
        self.fence.wait(self.fence_value);

        // Staging buffer and allocator drop here, after the copy has retired.
        Ok(())
    }
}
