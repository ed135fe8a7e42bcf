use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use crate::descriptor::{DescriptorSlotAllocator, GpuDescriptorHandle};
use crate::device::RenderDevice;

use super::gpu_texture::GpuTexture;

/// Largest on-screen extent an image is shown at by default.
pub const MAX_DISPLAY_EXTENT: f32 = 400.0;

/// Scales `width`×`height` down to fit inside a `max`×`max` box, keeping the
/// aspect ratio. Images already inside the box keep their size.
pub fn fit_within(width: u32, height: u32, max: f32) -> (f32, f32) {
    let (w, h) = (width as f32, height as f32);
    if w <= 0.0 || h <= 0.0 {
        return (0.0, 0.0);
    }
    let scale = (max / w).min(max / h).min(1.0);
    (w * scale, h * scale)
}

/// Normalizes a source path into a registry key.
///
/// Surrounding whitespace is trimmed, `.` segments are dropped and `..` folds
/// into its parent where one exists. The filesystem is not consulted. Returns
/// `None` for paths that are empty after trimming.
pub fn normalize_path(path: &Path) -> Option<PathBuf> {
    let trimmed = match path.to_str() {
        Some(s) => Path::new(s.trim()),
        None => path,
    };
    if trimmed.as_os_str().is_empty() {
        return None;
    }

    let mut out = PathBuf::new();
    for component in trimmed.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let last_is_normal = matches!(out.components().next_back(), Some(Component::Normal(_)));
                if last_is_normal {
                    out.pop();
                } else if !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }

    if out.as_os_str().is_empty() {
        out.push(".");
    }
    Some(out)
}

/// Read-back view of one registered image.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TextureInfo<'a> {
    pub path: &'a Path,
    pub width: u32,
    pub height: u32,
    pub display_handle: GpuDescriptorHandle,
    /// Size fitted into [`MAX_DISPLAY_EXTENT`].
    pub display_size: (f32, f32),
}

/// Owns every loaded texture, keyed by normalized source path.
///
/// At most one texture exists per path.
pub struct LoadedTextureRegistry<T> {
    entries: BTreeMap<PathBuf, GpuTexture<T>>,
}

impl<T> LoadedTextureRegistry<T> {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    pub fn get(&self, path: &Path) -> Option<&GpuTexture<T>> {
        self.entries.get(path)
    }

    /// Registers `texture` under `path`.
    ///
    /// If the path is taken the texture is handed back unregistered; the caller
    /// still owns its slot.
    pub fn insert(&mut self, path: PathBuf, texture: GpuTexture<T>) -> Result<(), GpuTexture<T>> {
        if self.entries.contains_key(&path) {
            return Err(texture);
        }
        self.entries.insert(path, texture);
        Ok(())
    }

    /// Registered images in path order.
    pub fn iter(&self) -> impl Iterator<Item = TextureInfo<'_>> + '_ {
        self.entries.iter().map(|(path, tex)| TextureInfo {
            path,
            width: tex.width(),
            height: tex.height(),
            display_handle: tex.display_handle(),
            display_size: fit_within(tex.width(), tex.height(), MAX_DISPLAY_EXTENT),
        })
    }

    /// Releases a single texture and forgets its path.
    pub fn remove<D>(&mut self, path: &Path, device: &D, allocator: &mut DescriptorSlotAllocator) -> bool
    where
        D: RenderDevice<Texture = T>,
    {
        match self.entries.remove(path) {
            Some(mut tex) => {
                tex.release(device, allocator);
                true
            }
            None => false,
        }
    }

    /// Releases every texture, returning all slots.
    pub fn release_all<D>(&mut self, device: &D, allocator: &mut DescriptorSlotAllocator)
    where
        D: RenderDevice<Texture = T>,
    {
        let count = self.entries.len();
        for (_, mut tex) in std::mem::take(&mut self.entries) {
            tex.release(device, allocator);
        }
        if count > 0 {
            log::debug!("released {count} textures");
        }
    }
}

impl<T> Default for LoadedTextureRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}
