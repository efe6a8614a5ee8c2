//! Texture format metadata.
//!
//! A read-only table built at compile time and handed out by reference.
//! Only what staging uploads need is recorded: texel/block size for pitch
//! computation and a name for log output.

use std::fmt;

/// Staging texture formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TextureFormat {
    Rgba32Float,
    Rgba16Float,
    Rgba16Unorm,
    Rgba8Unorm,
    Rgba8UnormSrgb,
    Bgra8Unorm,
    Rg32Float,
    Rg16Float,
    R32Float,
    R16Unorm,
    R8Unorm,
    Bc1Unorm,
    Bc3Unorm,
}

/// Per-format metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatInfo {
    /// Human-readable name.
    pub name: &'static str,
    /// Bytes per texel, or per block for block-compressed formats.
    pub block_bytes: u32,
    /// Block width in texels (1 for uncompressed).
    pub block_width: u32,
    /// Block height in texels (1 for uncompressed).
    pub block_height: u32,
}

impl FormatInfo {
    const fn texel(name: &'static str, bytes: u32) -> Self {
        Self {
            name,
            block_bytes: bytes,
            block_width: 1,
            block_height: 1,
        }
    }

    const fn block(name: &'static str, bytes: u32) -> Self {
        Self {
            name,
            block_bytes: bytes,
            block_width: 4,
            block_height: 4,
        }
    }

    /// Whether the format is block-compressed.
    pub const fn is_compressed(&self) -> bool {
        self.block_width > 1
    }
}

/// Indexed by `TextureFormat as usize`.
static FORMAT_TABLE: [FormatInfo; 13] = [
    FormatInfo::texel("RGBA32_FLOAT", 16),
    FormatInfo::texel("RGBA16_FLOAT", 8),
    FormatInfo::texel("RGBA16_UNORM", 8),
    FormatInfo::texel("RGBA8_UNORM", 4),
    FormatInfo::texel("RGBA8_UNORM_SRGB", 4),
    FormatInfo::texel("BGRA8_UNORM", 4),
    FormatInfo::texel("RG32_FLOAT", 8),
    FormatInfo::texel("RG16_FLOAT", 4),
    FormatInfo::texel("R32_FLOAT", 4),
    FormatInfo::texel("R16_UNORM", 2),
    FormatInfo::texel("R8_UNORM", 1),
    FormatInfo::block("BC1_UNORM", 8),
    FormatInfo::block("BC3_UNORM", 16),
];

impl TextureFormat {
    /// Metadata for this format.
    pub fn info(self) -> &'static FormatInfo {
        &FORMAT_TABLE[self as usize]
    }

    /// Bytes in one row of `width` texels (one block row when compressed).
    pub fn row_pitch(self, width: u32) -> u32 {
        let info = self.info();
        (width + info.block_width - 1) / info.block_width * info.block_bytes
    }

    /// Number of rows (block rows when compressed) in `height` texels.
    pub fn row_count(self, height: u32) -> u32 {
        let block_height = self.info().block_height;
        (height + block_height - 1) / block_height
    }
}

impl fmt::Display for TextureFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.info().name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_matches_enum_order() {
        assert_eq!(TextureFormat::Rgba32Float.info().name, "RGBA32_FLOAT");
        assert_eq!(TextureFormat::R8Unorm.info().name, "R8_UNORM");
        assert_eq!(TextureFormat::Bc3Unorm.info().name, "BC3_UNORM");
    }

    #[test]
    fn test_pitches() {
        assert_eq!(TextureFormat::Rgba8Unorm.row_pitch(256), 1024);
        assert_eq!(TextureFormat::Rgba8Unorm.row_count(256), 256);
        // 10 texels -> 3 blocks of 8 bytes
        assert_eq!(TextureFormat::Bc1Unorm.row_pitch(10), 24);
        assert_eq!(TextureFormat::Bc1Unorm.row_count(10), 3);
        assert!(TextureFormat::Bc1Unorm.info().is_compressed());
    }
}
