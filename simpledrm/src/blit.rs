//! Line Blitter
//!
//! Copies a rectangular region row by row between two buffers that each
//! have their own stride. Both entry points take slices that start at the
//! first pixel of the region; rows are `stride` bytes apart and the stride
//! may include padding past the last pixel.

use crate::codec::{self, Rgb16};
use crate::error::{DrmError, Result};
use crate::format::FourCc;
use crate::memcpy::fast_copy;

/// Same-format copy of `height` rows of `row_bytes` each
///
/// Panics if either slice is too short for the region; callers size the
/// region from validated buffer geometry.
pub fn copy_lines(
    src: &[u8],
    src_stride: usize,
    dst: &mut [u8],
    dst_stride: usize,
    row_bytes: usize,
    height: usize,
) {
    for row in 0..height {
        let s = row * src_stride;
        let d = row * dst_stride;
        fast_copy(&mut dst[d..d + row_bytes], &src[s..s + row_bytes]);
    }
}

/// Whether a source in `src` can be blitted into a destination in `dst`
pub fn can_convert(src: FourCc, dst: FourCc) -> bool {
    src.info().is_some() && dst.info().is_some() && codec::can_decode(src) && codec::can_encode(dst)
}

/// Per-pixel conversion of a `width` x `height` region
///
/// Fails with [`DrmError::UnsupportedFormat`] before touching `dst` when
/// either side has no codec.
pub fn convert_lines(
    src: &[u8],
    src_stride: usize,
    src_format: FourCc,
    dst: &mut [u8],
    dst_stride: usize,
    dst_format: FourCc,
    width: usize,
    height: usize,
) -> Result<()> {
    let src_bpp = src_format
        .info()
        .filter(|_| codec::can_decode(src_format))
        .ok_or(DrmError::UnsupportedFormat(src_format))?
        .bytes_per_pixel();
    let dst_bpp = dst_format
        .info()
        .filter(|_| codec::can_encode(dst_format))
        .ok_or(DrmError::UnsupportedFormat(dst_format))?
        .bytes_per_pixel();

    for row in 0..height {
        let s = row * src_stride;
        let d = row * dst_stride;
        let src_row = &src[s..s + width * src_bpp];
        let dst_row = &mut dst[d..d + width * dst_bpp];

        for (sp, dp) in src_row.chunks_exact(src_bpp).zip(dst_row.chunks_exact_mut(dst_bpp)) {
            let px = codec::decode_pixel(src_format, sp).unwrap_or(Rgb16::default());
            codec::put_pixel(dp, dst_format, px);
        }
    }

    Ok(())
}
