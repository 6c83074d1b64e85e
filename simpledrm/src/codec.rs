//! Pixel Codec
//!
//! Converts single pixels between packed layouts and 16-bit-normalized
//! RGB. Encoding takes the top bits of each sample; decoding places the
//! channel bits at the top of the sample with zero fill. Neither side
//! assumes any alignment of the byte buffer.

use crate::format::FourCc;

/// One pixel as 16-bit-normalized samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb16 {
    pub r: u16,
    pub g: u16,
    pub b: u16,
}

impl Rgb16 {
    pub const fn new(r: u16, g: u16, b: u16) -> Self {
        Self { r, g, b }
    }

    /// Widen 8-bit channels the way the XRGB8888 decoder does
    pub const fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: (r as u16) << 8,
            g: (g as u16) << 8,
            b: (b as u16) << 8,
        }
    }
}

/// Encoded pixel, 1 to 4 bytes in memory order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackedPixel {
    bytes: [u8; 4],
    len: u8,
}

impl PackedPixel {
    #[inline]
    fn from_u16(v: u16) -> Self {
        let b = v.to_ne_bytes();
        Self { bytes: [b[0], b[1], 0, 0], len: 2 }
    }

    #[inline]
    fn from_u32(v: u32) -> Self {
        Self { bytes: v.to_ne_bytes(), len: 4 }
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len as usize
    }
}

/// Pack `px` into the layout named by `format`
///
/// Returns `None` for codes without an encoder.
pub fn encode_pixel(format: FourCc, px: Rgb16) -> Option<PackedPixel> {
    let (r, g, b) = (px.r as u32, px.g as u32, px.b as u32);
    let packed = match format {
        FourCc::RGB565 => PackedPixel::from_u16((((r >> 11) << 11) | ((g >> 10) << 5) | (b >> 11)) as u16),
        FourCc::XRGB1555 | FourCc::ARGB1555 => {
            PackedPixel::from_u16((((r >> 11) << 10) | ((g >> 11) << 5) | (b >> 11)) as u16)
        }
        FourCc::RGB888 => {
            let (r, g, b) = ((r >> 8) as u8, (g >> 8) as u8, (b >> 8) as u8);
            #[cfg(target_endian = "little")]
            let bytes = [b, g, r, 0];
            #[cfg(target_endian = "big")]
            let bytes = [r, g, b, 0];
            PackedPixel { bytes, len: 3 }
        }
        FourCc::XRGB8888 | FourCc::ARGB8888 => PackedPixel::from_u32(((r >> 8) << 16) | ((g >> 8) << 8) | (b >> 8)),
        FourCc::ABGR8888 => PackedPixel::from_u32(((b >> 8) << 16) | ((g >> 8) << 8) | (r >> 8)),
        FourCc::XRGB2101010 | FourCc::ARGB2101010 => {
            PackedPixel::from_u32(((r >> 6) << 20) | ((g >> 6) << 10) | (b >> 6))
        }
        _ => return None,
    };
    Some(packed)
}

/// Write `px` at the start of `dst` in `format`
///
/// Unknown formats are skipped; callers reject them when the
/// configuration is set up.
#[inline]
pub fn put_pixel(dst: &mut [u8], format: FourCc, px: Rgb16) {
    if let Some(packed) = encode_pixel(format, px) {
        dst[..packed.len()].copy_from_slice(packed.as_bytes());
    }
}

#[inline]
fn read_u16(src: &[u8]) -> u32 {
    u16::from_ne_bytes([src[0], src[1]]) as u32
}

#[inline]
fn read_u32(src: &[u8]) -> u32 {
    u32::from_ne_bytes([src[0], src[1], src[2], src[3]])
}

/// Read one pixel in `format` from the start of `src`
///
/// Returns `None` for codes without a decoder.
pub fn decode_pixel(format: FourCc, src: &[u8]) -> Option<Rgb16> {
    let (r, g, b) = match format {
        FourCc::RGB565 => {
            let v = read_u16(src);
            (v & 0xf800, (v & 0x07e0) << 5, (v & 0x001f) << 11)
        }
        FourCc::XRGB1555 | FourCc::ARGB1555 => {
            let v = read_u16(src);
            ((v & 0x7c00) << 1, (v & 0x03e0) << 6, (v & 0x001f) << 11)
        }
        FourCc::RGB888 => {
            #[cfg(target_endian = "little")]
            let (r, g, b) = (src[2], src[1], src[0]);
            #[cfg(target_endian = "big")]
            let (r, g, b) = (src[0], src[1], src[2]);
            ((r as u32) << 8, (g as u32) << 8, (b as u32) << 8)
        }
        FourCc::XRGB8888 | FourCc::ARGB8888 => {
            let v = read_u32(src);
            ((v & 0x00ff_0000) >> 8, v & 0x0000_ff00, (v & 0x0000_00ff) << 8)
        }
        FourCc::ABGR8888 => {
            let v = read_u32(src);
            ((v & 0x0000_00ff) << 8, v & 0x0000_ff00, (v & 0x00ff_0000) >> 8)
        }
        FourCc::XRGB2101010 | FourCc::ARGB2101010 => {
            let v = read_u32(src);
            (((v >> 20) & 0x3ff) << 6, ((v >> 10) & 0x3ff) << 6, (v & 0x3ff) << 6)
        }
        _ => return None,
    };
    Some(Rgb16::new(r as u16, g as u16, b as u16))
}

/// Whether pixels of `format` can be read as a client format
pub fn can_decode(format: FourCc) -> bool {
    decode_pixel(format, &[0; 4]).is_some()
}

/// Whether pixels can be written in `format`
pub fn can_encode(format: FourCc) -> bool {
    encode_pixel(format, Rgb16::default()).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb565_truncates() {
        let px = Rgb16::from_rgb8(0x11, 0x22, 0x33);
        let packed = encode_pixel(FourCc::RGB565, px).unwrap();
        assert_eq!(u16::from_ne_bytes([packed.as_bytes()[0], packed.as_bytes()[1]]), 0x1106);
    }

    #[test]
    fn test_xrgb8888_leaves_alpha_zero() {
        let px = Rgb16::from_rgb8(0xaa, 0xbb, 0xcc);
        let packed = encode_pixel(FourCc::ARGB8888, px).unwrap();
        assert_eq!(u32::from_ne_bytes(packed.as_bytes().try_into().unwrap()), 0x00aa_bbcc);
    }

    #[test]
    fn test_abgr8888_swaps_red_blue() {
        let px = Rgb16::from_rgb8(0xaa, 0xbb, 0xcc);
        let packed = encode_pixel(FourCc::ABGR8888, px).unwrap();
        assert_eq!(u32::from_ne_bytes(packed.as_bytes().try_into().unwrap()), 0x00cc_bbaa);
    }

    #[test]
    fn test_rgb888_byte_order() {
        let px = Rgb16::from_rgb8(0x01, 0x02, 0x03);
        let packed = encode_pixel(FourCc::RGB888, px).unwrap();
        #[cfg(target_endian = "little")]
        assert_eq!(packed.as_bytes(), &[0x03, 0x02, 0x01]);
        #[cfg(target_endian = "big")]
        assert_eq!(packed.as_bytes(), &[0x01, 0x02, 0x03]);
    }

    #[test]
    fn test_2101010_keeps_ten_bits() {
        let px = Rgb16::new(0xffff, 0x8000, 0x0040);
        let packed = encode_pixel(FourCc::XRGB2101010, px).unwrap();
        let v = u32::from_ne_bytes(packed.as_bytes().try_into().unwrap());
        assert_eq!(v, (0x3ff << 20) | (0x200 << 10) | 0x001);
    }

    #[test]
    fn test_1555_packing() {
        let px = Rgb16::new(0xf800, 0x0800, 0x0000);
        let packed = encode_pixel(FourCc::XRGB1555, px).unwrap();
        let v = u16::from_ne_bytes([packed.as_bytes()[0], packed.as_bytes()[1]]);
        assert_eq!(v, (0x1f << 10) | (0x01 << 5));
    }

    #[test]
    fn test_put_pixel_unaligned() {
        let mut buf = [0u8; 7];
        put_pixel(&mut buf[1..], FourCc::XRGB8888, Rgb16::from_rgb8(0x12, 0x34, 0x56));
        assert_eq!(read_u32(&buf[1..]), 0x0012_3456);
        assert_eq!(buf[0], 0);
        assert_eq!(&buf[5..], &[0, 0]);
    }

    #[test]
    fn test_unknown_format_is_noop() {
        let mut buf = [0xeeu8; 4];
        put_pixel(&mut buf, FourCc::BGR888, Rgb16::from_rgb8(1, 2, 3));
        assert_eq!(buf, [0xee; 4]);
        assert!(decode_pixel(FourCc::BGR888, &buf).is_none());
        assert!(!can_decode(FourCc::BGR888));
        assert!(!can_encode(FourCc(0)));
    }

    #[test]
    fn test_decode_matches_client_extraction() {
        let v: u32 = 0xff11_2233;
        let px = decode_pixel(FourCc::ARGB8888, &v.to_ne_bytes()).unwrap();
        assert_eq!(px, Rgb16::new(0x1100, 0x2200, 0x3300));

        let v: u16 = 0xffff;
        let px = decode_pixel(FourCc::RGB565, &v.to_ne_bytes()).unwrap();
        assert_eq!(px, Rgb16::new(0xf800, 0xfc00, 0xf800));
    }

    #[test]
    fn test_every_registry_format_has_codec() {
        for info in crate::format::SIMPLEFB_FORMATS.iter() {
            assert!(can_encode(info.fourcc), "{}", info.name);
            assert!(can_decode(info.fourcc), "{}", info.name);
            let packed = encode_pixel(info.fourcc, Rgb16::default()).unwrap();
            assert_eq!(packed.len(), info.bytes_per_pixel());
        }
    }
}
