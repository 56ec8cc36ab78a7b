//! The decoded-image boundary the loader consumes. Decoders live outside
//! the engine; the loader only needs mip-enumerable pixel data.

use ember_rhi::Format;

/// A decoded image exposing its mip chain. Implemented by whatever decoder
/// feeds the loader (DDS, KTX, procedural sources).
pub trait Image: Send {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn depth(&self) -> u32;
    fn array_size(&self) -> u32;
    fn mip_levels(&self) -> u32;
    fn format(&self) -> Format;
    fn is_cubemap(&self) -> bool;
    /// Raw texel data of one mip, tightly packed, layers back to back.
    fn mip_data(&self, mip: u32) -> &[u8];
    fn mip_size(&self, mip: u32) -> u64 {
        self.mip_data(mip).len() as u64
    }
}

/// In-memory image, mainly for generated content and tests.
pub struct RawImage {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub array_size: u32,
    pub format: Format,
    pub is_cubemap: bool,
    /// One tightly packed blob per mip level.
    pub mips: Vec<Vec<u8>>,
}

impl RawImage {
    /// Single-mip 2D image over an owned pixel blob.
    pub fn new_2d(width: u32, height: u32, format: Format, pixels: Vec<u8>) -> RawImage {
        RawImage {
            width,
            height,
            depth: 1,
            array_size: 1,
            format,
            is_cubemap: false,
            mips: vec![pixels],
        }
    }
}

impl Image for RawImage {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn depth(&self) -> u32 {
        self.depth
    }

    fn array_size(&self) -> u32 {
        self.array_size
    }

    fn mip_levels(&self) -> u32 {
        self.mips.len() as u32
    }

    fn format(&self) -> Format {
        self.format
    }

    fn is_cubemap(&self) -> bool {
        self.is_cubemap
    }

    fn mip_data(&self, mip: u32) -> &[u8] {
        &self.mips[mip as usize]
    }
}
