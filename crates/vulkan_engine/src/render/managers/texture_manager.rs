//! Texture cache backing the material texture array

use std::path::{Path, PathBuf};

use ash::vk;

use crate::assets::{self, ImageData};
use crate::foundation::collections::DedupRegistry;
use crate::render::backends::vulkan::initialization::DeviceContext;
use crate::render::backends::vulkan::rendering::CommandPool;
use crate::render::backends::vulkan::resources::{Image, MAX_TEXTURES};
use crate::render::backends::vulkan::{VulkanError, VulkanResult};
use crate::EngineResult;

/// Slot of the built-in 1x1 white texture
pub const DEFAULT_TEXTURE_INDEX: u32 = 0;

const WHITE: [u8; 4] = [255, 255, 255, 255];

/// Pad `bound` to `capacity` entries by repeating the first one
///
/// Every array element of the material binding must be written, so unused
/// slots point at the default texture.
pub fn fill_texture_slots<T: Copy>(bound: &[T], capacity: usize) -> VulkanResult<Vec<T>> {
    let Some(&fill) = bound.first() else {
        return Err(VulkanError::InvalidOperation {
            reason: "no default texture to fill material slots with".to_string(),
        });
    };
    if bound.len() > capacity {
        return Err(VulkanError::DescriptorMismatch(format!(
            "{} textures exceed the material array of {capacity}",
            bound.len()
        )));
    }
    let mut slots = bound.to_vec();
    slots.resize(capacity, fill);
    Ok(slots)
}

/// Path-deduplicated texture uploads
///
/// Slot 0 is always a white texture so untextured models sample a neutral
/// color. Slots are stable for the manager's lifetime.
pub struct TextureManager {
    textures: DedupRegistry<PathBuf, Image>,
}

impl TextureManager {
    /// Create the manager and upload the default texture
    pub fn new(context: &DeviceContext, pool: &CommandPool) -> VulkanResult<Self> {
        let mut textures = DedupRegistry::new();
        let white = Image::texture_from_pixels(context, pool, &ImageData::solid(WHITE))?;
        textures.insert_anonymous(white);
        Ok(Self { textures })
    }

    /// Load and upload `path` on first sight; return its slot
    pub fn register(
        &mut self,
        context: &DeviceContext,
        pool: &CommandPool,
        path: impl AsRef<Path>,
    ) -> EngineResult<u32> {
        let path = path.as_ref();
        if self.textures.index_of(path).is_none() && self.textures.len() >= MAX_TEXTURES as usize {
            return Err(VulkanError::InvalidOperation {
                reason: format!("texture array is full ({MAX_TEXTURES} slots), cannot add {}", path.display()),
            }
            .into());
        }

        let index = self.textures.register_with(path.to_path_buf(), || -> EngineResult<Image> {
            let data = assets::load_image(path)?;
            let image = Image::texture_from_pixels(context, pool, &data)?;
            log::info!(
                "Texture loaded: {} ({}x{}, {} mips)",
                path.display(),
                data.width,
                data.height,
                image.desc().mip_levels
            );
            Ok(image)
        })?;
        Ok(index as u32)
    }

    /// View/sampler pairs for every material slot, padded with the default texture
    pub fn descriptor_images(&self) -> VulkanResult<Vec<(vk::ImageView, vk::Sampler)>> {
        let bound = self
            .textures
            .items()
            .iter()
            .map(|image| {
                image
                    .sampler()
                    .map(|sampler| (image.view(), sampler))
                    .ok_or_else(|| VulkanError::InvalidOperation {
                        reason: "texture image has no sampler".to_string(),
                    })
            })
            .collect::<VulkanResult<Vec<_>>>()?;
        fill_texture_slots(&bound, MAX_TEXTURES as usize)
    }

    /// Number of uploads that resolved to `slot`
    pub fn ref_count(&self, slot: u32) -> u32 {
        self.textures.ref_count(slot as usize)
    }

    /// Number of distinct textures, including the default
    pub fn len(&self) -> usize {
        self.textures.len()
    }

    /// Always false; the default texture is present from construction
    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slots_padded_with_default() {
        let slots = fill_texture_slots(&[7u64, 8, 9], 5).unwrap();
        assert_eq!(slots, vec![7, 8, 9, 7, 7]);
    }

    #[test]
    fn test_full_array_is_unchanged() {
        let bound: Vec<u32> = (0..MAX_TEXTURES).collect();
        let slots = fill_texture_slots(&bound, MAX_TEXTURES as usize).unwrap();
        assert_eq!(slots, bound);
    }

    #[test]
    fn test_overflow_and_empty_rejected() {
        assert!(matches!(
            fill_texture_slots(&[1u8, 2, 3], 2),
            Err(VulkanError::DescriptorMismatch(_))
        ));
        assert!(matches!(
            fill_texture_slots::<u8>(&[], 2),
            Err(VulkanError::InvalidOperation { .. })
        ));
    }
}
