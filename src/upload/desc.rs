//! Upload buffer descriptors.

use std::fmt;

use super::format::TextureFormat;

/// Shape of a staging texture; doubles as the idle-cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UploadBufferDesc {
    /// Width of mip 0 in texels.
    pub width: u32,
    /// Height of mip 0 in texels.
    pub height: u32,
    /// Depth of mip 0; 1 for 2D textures.
    pub depth: u32,
    /// Number of mip levels.
    pub mip_levels: u32,
    /// Number of array slices.
    pub array_size: u32,
    /// Texel format.
    pub format: TextureFormat,
}

impl UploadBufferDesc {
    /// A single-mip, single-slice 2D staging texture.
    pub fn new_2d(width: u32, height: u32, format: TextureFormat) -> Self {
        Self {
            width,
            height,
            depth: 1,
            mip_levels: 1,
            array_size: 1,
            format,
        }
    }

    /// Builder pattern: set the mip count.
    pub fn with_mip_levels(mut self, mip_levels: u32) -> Self {
        self.mip_levels = mip_levels;
        self
    }

    /// Builder pattern: set the array size.
    pub fn with_array_size(mut self, array_size: u32) -> Self {
        self.array_size = array_size;
        self
    }

    /// Builder pattern: set the depth.
    pub fn with_depth(mut self, depth: u32) -> Self {
        self.depth = depth;
        self
    }

    /// Check that every extent is non-zero and the mip chain fits.
    pub fn validate(&self) -> Result<(), String> {
        if self.width == 0 || self.height == 0 || self.depth == 0 {
            return Err(format!("zero extent {}x{}x{}", self.width, self.height, self.depth));
        }
        if self.array_size == 0 {
            return Err("zero array size".to_string());
        }
        let max_dim = self.width.max(self.height).max(self.depth);
        let max_mips = u32::BITS - max_dim.leading_zeros();
        if self.mip_levels == 0 || self.mip_levels > max_mips {
            return Err(format!(
                "{} mip levels requested, {} possible",
                self.mip_levels, max_mips
            ));
        }
        Ok(())
    }

    /// Number of (mip, slice) subresources.
    pub fn subresource_count(&self) -> u32 {
        self.mip_levels * self.array_size
    }

    /// Flat subresource index of (mip, slice) in this texture.
    pub fn subresource_index(&self, mip: u32, slice: u32) -> u32 {
        calc_subresource(mip, slice, self.mip_levels)
    }

    /// Bytes of tightly-pitched staging memory across all subresources.
    pub fn staging_size(&self) -> u64 {
        let per_slice: u64 = (0..self.mip_levels)
            .map(|mip| {
                let (width, height, depth) = self.mip_extent(mip);
                self.format.row_pitch(width) as u64
                    * self.format.row_count(height) as u64
                    * depth as u64
            })
            .sum();
        per_slice * self.array_size as u64
    }

    /// Extent of a mip level; never below one texel.
    pub fn mip_extent(&self, mip: u32) -> (u32, u32, u32) {
        (
            (self.width >> mip).max(1),
            (self.height >> mip).max(1),
            (self.depth >> mip).max(1),
        )
    }
}

impl fmt::Display for UploadBufferDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{}x{} {}-mip {}",
            self.width, self.height, self.depth, self.mip_levels, self.format
        )?;
        if self.array_size > 1 {
            write!(f, " [{} slices]", self.array_size)?;
        }
        Ok(())
    }
}

/// Flat subresource index: mips of slice 0 first, then slice 1, and so on.
#[inline]
pub fn calc_subresource(mip: u32, slice: u32, mip_levels: u32) -> u32 {
    mip + slice * mip_levels
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_equality_covers_every_field() {
        let base = UploadBufferDesc::new_2d(256, 256, TextureFormat::Rgba8Unorm);
        let mut set = HashSet::new();
        set.insert(base);
        set.insert(base);
        set.insert(base.with_mip_levels(2));
        set.insert(base.with_array_size(2));
        set.insert(base.with_depth(2));
        set.insert(UploadBufferDesc::new_2d(256, 256, TextureFormat::Bgra8Unorm));
        assert_eq!(set.len(), 5);
    }

    #[test]
    fn test_subresource_layout() {
        let desc = UploadBufferDesc::new_2d(64, 64, TextureFormat::R8Unorm)
            .with_mip_levels(3)
            .with_array_size(2);
        assert_eq!(desc.subresource_count(), 6);
        assert_eq!(desc.subresource_index(0, 1), 3);
        assert_eq!(desc.subresource_index(2, 1), 5);
        assert_eq!(desc.mip_extent(2), (16, 16, 1));
        // (64*64 + 32*32 + 16*16) bytes per slice
        assert_eq!(desc.staging_size(), 2 * (4096 + 1024 + 256));
    }

    #[test]
    fn test_validate() {
        let desc = UploadBufferDesc::new_2d(4, 4, TextureFormat::Rgba8Unorm);
        assert!(desc.validate().is_ok());
        assert!(desc.with_mip_levels(3).validate().is_ok());
        assert!(desc.with_mip_levels(4).validate().is_err());
        assert!(UploadBufferDesc::new_2d(0, 4, TextureFormat::Rgba8Unorm).validate().is_err());
    }

    #[test]
    fn test_display() {
        let desc = UploadBufferDesc::new_2d(256, 128, TextureFormat::Rgba8Unorm);
        assert_eq!(desc.to_string(), "256x128x1 1-mip RGBA8_UNORM");
    }
}
