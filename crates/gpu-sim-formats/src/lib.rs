//! Surface format tables and small numeric conversions.
//!
//! Kept as tiny pure functions over the surface formats the render-cache
//! and sampler units need, rather than a stateful format registry.

/// Surface pixel formats the simulator understands, named the way the
/// binding-table/surface-state fields spell them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum SurfaceFormat {
    B8G8R8A8Unorm,
    R8G8B8X8Unorm,
    R8G8B8A8Unorm,
    R32G32B32A32Float,
    R8Uint,
}

impl SurfaceFormat {
    /// Bytes per pixel, used by tiling address math (`cpp`).
    pub fn bytes_per_pixel(self) -> u32 {
        match self {
            SurfaceFormat::B8G8R8A8Unorm
            | SurfaceFormat::R8G8B8X8Unorm
            | SurfaceFormat::R8G8B8A8Unorm => 4,
            SurfaceFormat::R32G32B32A32Float => 16,
            SurfaceFormat::R8Uint => 1,
        }
    }

    /// Decode the surface-state `SURFACE_FORMAT` field.
    pub fn from_field(value: u32) -> Option<Self> {
        match value {
            0x0c0 => Some(SurfaceFormat::R32G32B32A32Float),
            0x0c2 => Some(SurfaceFormat::R8G8B8A8Unorm),
            0x0c9 => Some(SurfaceFormat::R8G8B8X8Unorm),
            0x0d2 => Some(SurfaceFormat::B8G8R8A8Unorm),
            0x121 => Some(SurfaceFormat::R8Uint),
            _ => None,
        }
    }
}

/// Tiling mode a render target surface can be laid out in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileMode {
    Linear,
    XTiled,
    YTiled,
}

/// Reinterpret an `f32` as the `i32` bit pattern the EU's immediate-move
/// path uses for a vertex element's `STORE_1_FP` component control.
pub fn fp_as_int32(value: f32) -> i32 {
    value.to_bits() as i32
}

/// Pack four 0.0..=1.0 float channels into 8-bit sRGB-range ARGB8, the way
/// the render-cache's SIMD8 RT-write path scales and ORs channels together.
pub fn pack_argb8(r: f32, g: f32, b: f32, a: f32) -> u32 {
    let chan = |v: f32| ((v.clamp(0.0, 1.0) * 255.0) as u32) & 0xff;
    (chan(a) << 24) | (chan(r) << 16) | (chan(g) << 8) | chan(b)
}

/// Unpack an 8-bit-per-channel pixel (`R8G8B8X8`/`R8G8B8A8`) into
/// normalized floats, low byte first, matching `sfid_sampler`'s unpack
/// order (`dst+0` = lowest byte).
pub fn unpack_rgba8(word: u32, alpha_from_texture: bool) -> [f32; 4] {
    let chan = |shift: u32| ((word >> shift) & 0xff) as f32 / 255.0;
    [
        chan(0),
        chan(8),
        chan(16),
        if alpha_from_texture { chan(24) } else { 1.0 },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fp_as_int32_matches_ieee754_bit_pattern() {
        assert_eq!(fp_as_int32(1.0), 0x3f800000);
        assert_eq!(fp_as_int32(0.0), 0);
    }

    #[test]
    fn pack_argb8_round_trips_full_white() {
        assert_eq!(pack_argb8(1.0, 1.0, 1.0, 1.0), 0xff_ff_ff_ff);
    }

    #[test]
    fn unpack_rgb8x8_forces_alpha_one() {
        let [_, _, _, a] = unpack_rgba8(0x00ff0000, false);
        assert_eq!(a, 1.0);
    }

    #[test]
    fn surface_format_bpp_matches_field_decode() {
        let fmt = SurfaceFormat::from_field(0x0d2).unwrap();
        assert_eq!(fmt, SurfaceFormat::B8G8R8A8Unorm);
        assert_eq!(fmt.bytes_per_pixel(), 4);
    }
}
