//! Row Copy
//!
//! Raw byte copy used by the same-format blit path. Scanout memory is
//! usually mapped write-combined, so wide aligned stores matter more
//! than anything else here.

/// Copy `src` into `dst`; both slices must have the same length
#[inline]
pub fn fast_copy(dst: &mut [u8], src: &[u8]) {
    debug_assert_eq!(dst.len(), src.len());
    let len = dst.len().min(src.len());

    // Small rows are not worth the alignment prologue
    if len < 64 {
        dst[..len].copy_from_slice(&src[..len]);
        return;
    }

    copy_wide(&mut dst[..len], &src[..len]);
}

#[cfg(all(feature = "simd-copy", target_arch = "x86_64"))]
#[inline]
fn copy_wide(dst: &mut [u8], src: &[u8]) {
    // Bytes until the destination sits on a 16-byte boundary
    let head = dst.as_ptr().align_offset(16).min(dst.len());
    let (dst_head, dst_rest) = dst.split_at_mut(head);
    let (src_head, src_rest) = src.split_at(head);
    dst_head.copy_from_slice(src_head);

    let body = dst_rest.len() & !15;
    let (dst_body, dst_tail) = dst_rest.split_at_mut(body);
    let (src_body, src_tail) = src_rest.split_at(body);
    // SAFETY: `dst_body` starts 16-byte aligned, both halves are `body`
    // bytes long, and SSE2 is baseline on x86_64.
    unsafe { store_lanes_sse2(dst_body, src_body) }
    dst_tail.copy_from_slice(src_tail);
}

#[cfg(not(all(feature = "simd-copy", target_arch = "x86_64")))]
#[inline]
fn copy_wide(dst: &mut [u8], src: &[u8]) {
    dst.copy_from_slice(src);
}

/// Copy 16-byte lanes with unaligned loads and aligned stores
///
/// # Safety
/// `dst` must start on a 16-byte boundary, and both slices must have the
/// same length, a multiple of 16.
#[cfg(all(feature = "simd-copy", target_arch = "x86_64"))]
#[target_feature(enable = "sse2")]
unsafe fn store_lanes_sse2(dst: &mut [u8], src: &[u8]) {
    use core::arch::x86_64::{__m128i, _mm_loadu_si128, _mm_store_si128};

    for (d, s) in dst.chunks_exact_mut(16).zip(src.chunks_exact(16)) {
        unsafe {
            let lane = _mm_loadu_si128(s.as_ptr() as *const __m128i);
            _mm_store_si128(d.as_mut_ptr() as *mut __m128i, lane);
        }
    }
}
