//! Staging layout math for linear → tiled texture copies.

use crate::device::{CopyableFootprint, DeviceError};

/// Rounds `value` up to a multiple of `alignment`.
pub fn align_up(value: u64, alignment: u64) -> Result<u64, DeviceError> {
    if alignment == 0 {
        return Err(DeviceError::SizeOverflow);
    }
    let bumped = value
        .checked_add(alignment - 1)
        .ok_or(DeviceError::SizeOverflow)?;
    Ok(bumped / alignment * alignment)
}

/// Computes the staging footprint of a single-subresource 2D texture.
///
/// `row_alignment` is the device's required pitch alignment (256 bytes on
/// D3D12 and wgpu).
pub fn footprint_for(
    width: u32,
    height: u32,
    bytes_per_pixel: u32,
    row_alignment: u32,
) -> Result<CopyableFootprint, DeviceError> {
    let row_size = width
        .checked_mul(bytes_per_pixel)
        .ok_or(DeviceError::SizeOverflow)?;
    let row_pitch = align_up(u64::from(row_size), u64::from(row_alignment))?;
    let row_pitch = u32::try_from(row_pitch).map_err(|_| DeviceError::SizeOverflow)?;

    let total_bytes = if height == 0 {
        0
    } else {
        u64::from(row_pitch)
            .checked_mul(u64::from(height - 1))
            .and_then(|n| n.checked_add(u64::from(row_size)))
            .ok_or(DeviceError::SizeOverflow)?
    };

    Ok(CopyableFootprint {
        offset: 0,
        width,
        height,
        row_pitch,
        row_size,
        rows: height,
        total_bytes,
    })
}

/// Re-packs tightly packed rows into the padded layout of `footprint`.
///
/// `src` uses a stride of `footprint.row_size`; the destination stride is
/// `footprint.row_pitch`. Padding bytes are left zeroed. The returned buffer is
/// exactly `footprint.total_bytes` long.
pub fn pack_rows(src: &[u8], footprint: &CopyableFootprint) -> Result<Vec<u8>, DeviceError> {
    let row_size = footprint.row_size as usize;
    let pitch = footprint.row_pitch as usize;
    let rows = footprint.rows as usize;

    let expected = row_size.checked_mul(rows).ok_or(DeviceError::SizeOverflow)?;
    if src.len() < expected {
        return Err(DeviceError::Other(format!(
            "source holds {} bytes, layout needs {expected}",
            src.len()
        )));
    }

    let total = usize::try_from(footprint.total_bytes).map_err(|_| DeviceError::SizeOverflow)?;
    let mut packed = Vec::new();
    packed
        .try_reserve_exact(total)
        .map_err(|_| DeviceError::OutOfMemory { what: "staging memory" })?;
    packed.resize(total, 0);

    for row in 0..rows {
        let src_start = row * row_size;
        let dst_start = row * pitch;
        packed[dst_start..dst_start + row_size].copy_from_slice(&src[src_start..src_start + row_size]);
    }

    Ok(packed)
}
