//! Pixel/texel format registry: block geometry, compression, planarity,
//! depth/stencil classification, and the surface-size math used by uploads.

/// Texel formats understood by the RHI. Every variant has a total mapping to
/// each backend's native format enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Format {
    #[default]
    Undefined,
    R8Unorm,
    R8G8Unorm,
    R8G8B8A8Unorm,
    R8G8B8A8Srgb,
    B8G8R8A8Unorm,
    B8G8R8A8Srgb,
    A2B10G10R10Unorm,
    R16Uint,
    R16Float,
    R16G16Float,
    R16G16B16A16Float,
    R32Uint,
    R32Sint,
    R32Float,
    R32G32Float,
    R32G32B32Float,
    R32G32B32A32Float,
    // depth / stencil
    D16Unorm,
    X8D24Unorm,
    D32Float,
    S8Uint,
    D16UnormS8Uint,
    D24UnormS8Uint,
    D32FloatS8Uint,
    // block compressed
    Bc1RgbaUnorm,
    Bc1RgbaSrgb,
    Bc2Unorm,
    Bc3Unorm,
    Bc3Srgb,
    Bc4Unorm,
    Bc5Unorm,
    Bc6hUfloat,
    Bc7Unorm,
    Bc7Srgb,
    // multi-planar video formats
    G8B8R8TwoPlane420Unorm,
    G8B8R8ThreePlane420Unorm,
}

impl Format {
    /// Every concrete format, for capability probing loops.
    pub const ALL: &'static [Format] = &[
        Format::R8Unorm,
        Format::R8G8Unorm,
        Format::R8G8B8A8Unorm,
        Format::R8G8B8A8Srgb,
        Format::B8G8R8A8Unorm,
        Format::B8G8R8A8Srgb,
        Format::A2B10G10R10Unorm,
        Format::R16Uint,
        Format::R16Float,
        Format::R16G16Float,
        Format::R16G16B16A16Float,
        Format::R32Uint,
        Format::R32Sint,
        Format::R32Float,
        Format::R32G32Float,
        Format::R32G32B32Float,
        Format::R32G32B32A32Float,
        Format::D16Unorm,
        Format::X8D24Unorm,
        Format::D32Float,
        Format::S8Uint,
        Format::D16UnormS8Uint,
        Format::D24UnormS8Uint,
        Format::D32FloatS8Uint,
        Format::Bc1RgbaUnorm,
        Format::Bc1RgbaSrgb,
        Format::Bc2Unorm,
        Format::Bc3Unorm,
        Format::Bc3Srgb,
        Format::Bc4Unorm,
        Format::Bc5Unorm,
        Format::Bc6hUfloat,
        Format::Bc7Unorm,
        Format::Bc7Srgb,
        Format::G8B8R8TwoPlane420Unorm,
        Format::G8B8R8ThreePlane420Unorm,
    ];

    /// Bits per block. For uncompressed formats the block is one texel; for
    /// BC formats it is 4x4 texels. Planar formats report the sum of their
    /// planes for one chroma-subsampled 2x2 cell.
    pub fn bit_size_of_block(self) -> u32 {
        match self {
            Format::Undefined => 0,
            Format::R8Unorm | Format::S8Uint => 8,
            Format::R8G8Unorm | Format::R16Uint | Format::R16Float | Format::D16Unorm => 16,
            Format::D16UnormS8Uint => 24,
            Format::R8G8B8A8Unorm
            | Format::R8G8B8A8Srgb
            | Format::B8G8R8A8Unorm
            | Format::B8G8R8A8Srgb
            | Format::A2B10G10R10Unorm
            | Format::R16G16Float
            | Format::R32Uint
            | Format::R32Sint
            | Format::R32Float
            | Format::X8D24Unorm
            | Format::D32Float
            | Format::D24UnormS8Uint => 32,
            Format::D32FloatS8Uint => 40,
            Format::R16G16B16A16Float | Format::R32G32Float => 64,
            Format::R32G32B32Float => 96,
            Format::R32G32B32A32Float => 128,
            Format::Bc1RgbaUnorm | Format::Bc1RgbaSrgb | Format::Bc4Unorm => 64,
            Format::Bc2Unorm
            | Format::Bc3Unorm
            | Format::Bc3Srgb
            | Format::Bc5Unorm
            | Format::Bc6hUfloat
            | Format::Bc7Unorm
            | Format::Bc7Srgb => 128,
            // 4 luma bytes + 2 (or 1+1) chroma bytes per 2x2 cell
            Format::G8B8R8TwoPlane420Unorm | Format::G8B8R8ThreePlane420Unorm => 48,
        }
    }

    /// Bytes per block for single-plane formats.
    pub fn byte_count(self) -> u32 {
        self.bit_size_of_block() / 8
    }

    pub fn block_width(self) -> u32 {
        if self.is_compressed() { 4 } else { 1 }
    }

    pub fn block_height(self) -> u32 {
        if self.is_compressed() { 4 } else { 1 }
    }

    pub fn is_compressed(self) -> bool {
        matches!(
            self,
            Format::Bc1RgbaUnorm
                | Format::Bc1RgbaSrgb
                | Format::Bc2Unorm
                | Format::Bc3Unorm
                | Format::Bc3Srgb
                | Format::Bc4Unorm
                | Format::Bc5Unorm
                | Format::Bc6hUfloat
                | Format::Bc7Unorm
                | Format::Bc7Srgb
        )
    }

    pub fn is_planar(self) -> bool {
        self.num_planes() > 1
    }

    pub fn is_single_plane(self) -> bool {
        !self.is_planar()
    }

    pub fn num_planes(self) -> u32 {
        match self {
            Format::G8B8R8TwoPlane420Unorm => 2,
            Format::G8B8R8ThreePlane420Unorm => 3,
            _ => 1,
        }
    }

    /// Width of `plane` for an image of width `width` (chroma planes of 420
    /// formats are horizontally halved).
    pub fn plane_width(self, plane: u32, width: u32) -> u32 {
        if plane == 0 { width } else { (width / 2).max(1) }
    }

    /// Height of `plane` for an image of height `height`.
    pub fn plane_height(self, plane: u32, height: u32) -> u32 {
        if plane == 0 { height } else { (height / 2).max(1) }
    }

    /// Bytes per texel within one plane.
    pub fn plane_size_of_block(self, plane: u32) -> u32 {
        match self {
            Format::G8B8R8TwoPlane420Unorm => {
                if plane == 0 { 1 } else { 2 }
            }
            Format::G8B8R8ThreePlane420Unorm => 1,
            _ => self.byte_count(),
        }
    }

    pub fn has_depth(self) -> bool {
        matches!(
            self,
            Format::D16Unorm
                | Format::X8D24Unorm
                | Format::D32Float
                | Format::D16UnormS8Uint
                | Format::D24UnormS8Uint
                | Format::D32FloatS8Uint
        )
    }

    pub fn has_stencil(self) -> bool {
        matches!(
            self,
            Format::S8Uint | Format::D16UnormS8Uint | Format::D24UnormS8Uint | Format::D32FloatS8Uint
        )
    }

    pub fn is_depth_only(self) -> bool {
        self.has_depth() && !self.has_stencil()
    }

    pub fn is_depth_and_stencil(self) -> bool {
        self.has_depth() && self.has_stencil()
    }

    pub fn is_srgb(self) -> bool {
        matches!(
            self,
            Format::R8G8B8A8Srgb | Format::B8G8R8A8Srgb | Format::Bc1RgbaSrgb | Format::Bc3Srgb | Format::Bc7Srgb
        )
    }

    /// Byte sizes of one 2D surface of extent (`width`, `height`):
    /// total bytes, bytes per row, and number of rows. Returns `None` for
    /// `Undefined` or when the result would overflow `u32`.
    pub fn surface_info(self, width: u32, height: u32) -> Option<(u32, u32, u32)> {
        let bpp = self.bit_size_of_block() as u64;
        if bpp == 0 {
            return None;
        }

        let (num_bytes, row_bytes, num_rows): (u64, u64, u64) = if self.is_compressed() {
            let bw = self.block_width() as u64;
            let bh = self.block_height() as u64;
            let blocks_wide = if width > 0 { ((width as u64) + bw - 1) / bw } else { 0 }.max(1);
            let blocks_high = if height > 0 { ((height as u64) + bh - 1) / bh } else { 0 }.max(1);
            let row = blocks_wide * (bpp / 8);
            (row * blocks_high, row, blocks_high)
        } else if self.is_planar() {
            let mut total = 0u64;
            for plane in 0..self.num_planes() {
                total += self.plane_width(plane, width) as u64
                    * self.plane_height(plane, height) as u64
                    * self.plane_size_of_block(plane) as u64;
            }
            (total, total, 1)
        } else {
            let row = ((width as u64) * bpp + 7) / 8;
            (row * height as u64, row, height as u64)
        };

        if num_bytes > u32::MAX as u64 || row_bytes > u32::MAX as u64 || num_rows > u32::MAX as u64 {
            return None;
        }
        Some((num_bytes as u32, row_bytes as u32, num_rows as u32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn surface_info_linear_rgba8() {
        let (num_bytes, row_bytes, num_rows) = Format::R8G8B8A8Unorm.surface_info(64, 64).unwrap();
        assert_eq!(row_bytes, 64 * 4);
        assert_eq!(num_rows, 64);
        assert_eq!(num_bytes, 64 * 64 * 4);
    }

    #[test]
    fn surface_info_block_compressed() {
        // BC1: 4x4 blocks of 8 bytes.
        let (num_bytes, row_bytes, num_rows) = Format::Bc1RgbaUnorm.surface_info(8, 8).unwrap();
        assert_eq!(row_bytes, 2 * 8);
        assert_eq!(num_rows, 2);
        assert_eq!(num_bytes, 32);

        // Non multiple-of-4 extents round up to whole blocks.
        let (_, row_bytes, num_rows) = Format::Bc7Unorm.surface_info(10, 6).unwrap();
        assert_eq!(row_bytes, 3 * 16);
        assert_eq!(num_rows, 2);
    }

    #[test]
    fn surface_info_planar_420() {
        // 4x4 NV12-style: 16 luma bytes + 2x2 interleaved chroma (8 bytes).
        let (num_bytes, _, num_rows) = Format::G8B8R8TwoPlane420Unorm.surface_info(4, 4).unwrap();
        assert_eq!(num_bytes, 16 + 8);
        assert_eq!(num_rows, 1);
    }

    #[test]
    fn depth_stencil_classification() {
        assert!(Format::D32Float.is_depth_only());
        assert!(Format::D24UnormS8Uint.is_depth_and_stencil());
        assert!(Format::S8Uint.has_stencil() && !Format::S8Uint.has_depth());
        assert!(!Format::R8G8B8A8Unorm.has_depth());
    }

    #[test]
    fn undefined_has_no_surface() {
        assert!(Format::Undefined.surface_info(16, 16).is_none());
    }
}
