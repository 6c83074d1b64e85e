//! Pixel Format Registry
//!
//! Fixed table of the linear framebuffer layouts a firmware framebuffer
//! can be described with. Each entry carries the name used in platform
//! data, the per-channel bit layout and the DRM four-character code.

use core::fmt;

use bitflags::bitflags;

/// DRM four-character code identifying a concrete pixel layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FourCc(pub u32);

impl FourCc {
    /// Pack four ASCII characters, first character in the low byte
    pub const fn from_chars(a: u8, b: u8, c: u8, d: u8) -> Self {
        FourCc((a as u32) | ((b as u32) << 8) | ((c as u32) << 16) | ((d as u32) << 24))
    }

    pub const RGB565: FourCc = FourCc::from_chars(b'R', b'G', b'1', b'6');
    pub const XRGB1555: FourCc = FourCc::from_chars(b'X', b'R', b'1', b'5');
    pub const ARGB1555: FourCc = FourCc::from_chars(b'A', b'R', b'1', b'5');
    pub const RGB888: FourCc = FourCc::from_chars(b'R', b'G', b'2', b'4');
    pub const BGR888: FourCc = FourCc::from_chars(b'B', b'G', b'2', b'4');
    pub const XRGB8888: FourCc = FourCc::from_chars(b'X', b'R', b'2', b'4');
    pub const ARGB8888: FourCc = FourCc::from_chars(b'A', b'R', b'2', b'4');
    pub const ABGR8888: FourCc = FourCc::from_chars(b'A', b'B', b'2', b'4');
    pub const XRGB2101010: FourCc = FourCc::from_chars(b'X', b'R', b'3', b'0');
    pub const ARGB2101010: FourCc = FourCc::from_chars(b'A', b'R', b'3', b'0');

    /// Registry entry for this code
    pub fn info(self) -> Option<&'static PixelFormatInfo> {
        find_by_fourcc(self)
    }
}

impl fmt::Display for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.0.to_le_bytes();
        if bytes.iter().all(|b| b.is_ascii_graphic() || *b == b' ') {
            for b in bytes {
                write!(f, "{}", b as char)?;
            }
            Ok(())
        } else {
            write!(f, "0x{:08x}", self.0)
        }
    }
}

/// Offset and width of one channel inside the packed pixel word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bitfield {
    pub offset: u8,
    pub length: u8,
}

impl Bitfield {
    const fn new(offset: u8, length: u8) -> Self {
        Self { offset, length }
    }

    /// Bit mask of this channel within the packed word
    pub const fn mask(&self) -> u32 {
        if self.length == 0 {
            0
        } else {
            (u32::MAX >> (32 - self.length as u32)) << self.offset
        }
    }
}

bitflags! {
    /// Layout properties of a registry format
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FormatFlags: u8 {
        /// Has a real alpha channel
        const ALPHA = 0b01;
        /// Has bits not covered by any channel
        const PADDED = 0b10;
    }
}

/// Immutable descriptor of one supported pixel layout
#[derive(Debug, PartialEq, Eq)]
pub struct PixelFormatInfo {
    /// Name used by simple-framebuffer platform data
    pub name: &'static str,
    pub bits_per_pixel: u32,
    pub red: Bitfield,
    pub green: Bitfield,
    pub blue: Bitfield,
    /// `length == 0` means no alpha
    pub transp: Bitfield,
    pub fourcc: FourCc,
    pub flags: FormatFlags,
}

impl PixelFormatInfo {
    /// Bytes per pixel, rounded up
    #[inline]
    pub const fn bytes_per_pixel(&self) -> usize {
        (self.bits_per_pixel as usize + 7) / 8
    }

    #[inline]
    pub fn has_alpha(&self) -> bool {
        self.flags.contains(FormatFlags::ALPHA)
    }
}

const fn entry(
    name: &'static str,
    bits_per_pixel: u32,
    red: Bitfield,
    green: Bitfield,
    blue: Bitfield,
    transp: Bitfield,
    fourcc: FourCc,
) -> PixelFormatInfo {
    let used = red.length as u32 + green.length as u32 + blue.length as u32 + transp.length as u32;
    let mut bits = 0;
    if transp.length != 0 {
        bits |= FormatFlags::ALPHA.bits();
    }
    if used < bits_per_pixel {
        bits |= FormatFlags::PADDED.bits();
    }
    PixelFormatInfo {
        name,
        bits_per_pixel,
        red,
        green,
        blue,
        transp,
        fourcc,
        flags: FormatFlags::from_bits_truncate(bits),
    }
}

/// All layouts the driver can scan out from or read as a client format
pub static SIMPLEFB_FORMATS: [PixelFormatInfo; 9] = [
    entry("a8b8g8r8", 32, Bitfield::new(0, 8), Bitfield::new(8, 8), Bitfield::new(16, 8), Bitfield::new(24, 8), FourCc::ABGR8888),
    entry("x8r8g8b8", 32, Bitfield::new(16, 8), Bitfield::new(8, 8), Bitfield::new(0, 8), Bitfield::new(0, 0), FourCc::XRGB8888),
    entry("r8g8b8", 24, Bitfield::new(16, 8), Bitfield::new(8, 8), Bitfield::new(0, 8), Bitfield::new(0, 0), FourCc::RGB888),
    entry("a8r8g8b8", 32, Bitfield::new(16, 8), Bitfield::new(8, 8), Bitfield::new(0, 8), Bitfield::new(24, 8), FourCc::ARGB8888),
    entry("r5g6b5", 16, Bitfield::new(11, 5), Bitfield::new(5, 6), Bitfield::new(0, 5), Bitfield::new(0, 0), FourCc::RGB565),
    entry("x1r5g5b5", 16, Bitfield::new(10, 5), Bitfield::new(5, 5), Bitfield::new(0, 5), Bitfield::new(0, 0), FourCc::XRGB1555),
    entry("a1r5g5b5", 16, Bitfield::new(10, 5), Bitfield::new(5, 5), Bitfield::new(0, 5), Bitfield::new(15, 1), FourCc::ARGB1555),
    entry("x2r10g10b10", 32, Bitfield::new(20, 10), Bitfield::new(10, 10), Bitfield::new(0, 10), Bitfield::new(0, 0), FourCc::XRGB2101010),
    entry("a2r10g10b10", 32, Bitfield::new(20, 10), Bitfield::new(10, 10), Bitfield::new(0, 10), Bitfield::new(30, 2), FourCc::ARGB2101010),
];

/// Look up a format by its platform data name
pub fn find_by_name(name: &str) -> Option<&'static PixelFormatInfo> {
    SIMPLEFB_FORMATS.iter().find(|f| f.name == name)
}

/// Look up a format by four-character code
pub fn find_by_fourcc(code: FourCc) -> Option<&'static PixelFormatInfo> {
    SIMPLEFB_FORMATS.iter().find(|f| f.fourcc == code)
}

/// Codes advertised on the primary plane
pub fn plane_formats() -> impl Iterator<Item = FourCc> {
    SIMPLEFB_FORMATS.iter().map(|f| f.fourcc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_name_and_code() {
        let info = find_by_name("r5g6b5").unwrap();
        assert_eq!(info.fourcc, FourCc::RGB565);
        assert_eq!(info.bytes_per_pixel(), 2);
        assert!(core::ptr::eq(info, FourCc::RGB565.info().unwrap()));

        assert!(find_by_name("b8g8r8").is_none());
        assert!(find_by_fourcc(FourCc::BGR888).is_none());
    }

    #[test]
    fn test_fourcc_packing() {
        assert_eq!(FourCc::XRGB8888.0, 0x3432_5258);
        assert_eq!(alloc::format!("{}", FourCc::RGB565), "RG16");
        assert_eq!(alloc::format!("{}", FourCc(0)), "0x00000000");
    }

    #[test]
    fn test_flags_follow_layout() {
        let argb = find_by_name("a8r8g8b8").unwrap();
        assert!(argb.has_alpha());
        assert!(!argb.flags.contains(FormatFlags::PADDED));

        let xrgb = find_by_name("x1r5g5b5").unwrap();
        assert!(!xrgb.has_alpha());
        assert!(xrgb.flags.contains(FormatFlags::PADDED));

        let rgb = find_by_name("r8g8b8").unwrap();
        assert!(rgb.flags.is_empty());
        assert_eq!(rgb.bytes_per_pixel(), 3);
    }

    #[test]
    fn test_channel_masks() {
        let info = find_by_name("x2r10g10b10").unwrap();
        assert_eq!(info.red.mask(), 0x3ff0_0000);
        assert_eq!(info.green.mask(), 0x000f_fc00);
        assert_eq!(info.blue.mask(), 0x0000_03ff);
        assert_eq!(info.transp.mask(), 0);
    }

    #[test]
    fn test_names_and_codes_unique() {
        for (i, a) in SIMPLEFB_FORMATS.iter().enumerate() {
            for b in &SIMPLEFB_FORMATS[i + 1..] {
                assert_ne!(a.name, b.name);
                assert_ne!(a.fourcc, b.fourcc);
            }
        }
    }
}
