//! Dirty-Region Synchronizer
//!
//! Copies damaged regions of the bound framebuffer into scanout memory.
//! Everything here runs with the device mode lock held; the lock is what
//! makes the binding check and the blit one atomic step with respect to
//! swaps and teardown.

use alloc::boxed::Box;
use alloc::sync::Arc;

use crate::blit;
use crate::damage::Rect;
use crate::error::{DrmError, Result};
use crate::format::FourCc;
use crate::framebuffer::{Framebuffer, FramebufferId};
use crate::gem::CpuAccess;
use crate::scanout::{ScanoutBuffer, ScanoutMemory};

/// Which framebuffer, if any, feeds the scanout
#[derive(Debug, Clone, Default)]
pub enum Binding {
    #[default]
    Unbound,
    Bound(Arc<Framebuffer>),
    /// Mapping released; nothing may be written any more
    TearingDown,
}

/// Destination geometry, copied out before the mapping is borrowed
#[derive(Clone, Copy)]
struct Target {
    width: u32,
    height: u32,
    stride: usize,
    bpp: usize,
    format: FourCc,
}

/// Scanout buffer plus its binding state
#[derive(Debug)]
pub struct Synchronizer {
    scanout: ScanoutBuffer,
    binding: Binding,
}

impl Synchronizer {
    pub fn new(scanout: ScanoutBuffer) -> Self {
        Self {
            scanout,
            binding: Binding::Unbound,
        }
    }

    pub fn scanout(&self) -> &ScanoutBuffer {
        &self.scanout
    }

    #[cfg(test)]
    pub(crate) fn scanout_mut(&mut self) -> &mut ScanoutBuffer {
        &mut self.scanout
    }

    pub fn binding(&self) -> &Binding {
        &self.binding
    }

    /// Id of the bound framebuffer
    pub fn bound_id(&self) -> Option<FramebufferId> {
        match &self.binding {
            Binding::Bound(fb) => Some(fb.id()),
            _ => None,
        }
    }

    /// Make `fb` the scanout source, replacing any previous one
    pub fn bind(&mut self, fb: Arc<Framebuffer>) -> Result<()> {
        if matches!(self.binding, Binding::TearingDown) || !self.scanout.is_mapped() {
            return Err(DrmError::NoDevice);
        }
        log::debug!("[simpledrm] bind {}", fb.id());
        self.binding = Binding::Bound(fb);
        Ok(())
    }

    /// Drop the current source; a no-op unless bound
    pub fn unbind(&mut self) -> Option<Arc<Framebuffer>> {
        match core::mem::take(&mut self.binding) {
            Binding::Bound(fb) => Some(fb),
            other => {
                self.binding = other;
                None
            }
        }
    }

    /// Copy `rects` of `fb` to the scanout; an empty list means the whole
    /// framebuffer
    ///
    /// Damage for anything but the bound framebuffer, and damage arriving
    /// after teardown, is dropped without error.
    pub fn update(&mut self, fb: &Framebuffer, rects: &[Rect]) -> Result<()> {
        let full = [fb.rect()];
        let rects = if rects.is_empty() { &full[..] } else { rects };

        match &self.binding {
            Binding::Bound(bound) if bound.id() == fb.id() => {}
            Binding::Bound(bound) => {
                log::debug!("[simpledrm] stale damage for {} (bound {})", fb.id(), bound.id());
                return Ok(());
            }
            Binding::Unbound => return Ok(()),
            Binding::TearingDown => {
                log::debug!("[simpledrm] damage during teardown ignored");
                return Ok(());
            }
        }
        if !self.scanout.is_mapped() {
            return Ok(());
        }

        let src_format = fb.format();
        let dst_format = self.scanout.format();
        if src_format != dst_format && !blit::can_convert(src_format, dst_format) {
            return Err(DrmError::UnsupportedFormat(src_format));
        }

        let access = CpuAccess::begin(fb.object()).map_err(|e| {
            log::warn!("[simpledrm] cannot access {}: {}", fb.id(), e);
            e
        })?;

        let target = Target {
            width: self.scanout.width(),
            height: self.scanout.height(),
            stride: self.scanout.stride(),
            bpp: self.scanout.bytes_per_pixel(),
            format: dst_format,
        };
        let scanout = &mut self.scanout;
        let blitted = access.read(|src| {
            if !source_fits(src, fb) {
                return Err(DrmError::InvalidArgument("buffer object shorter than framebuffer"));
            }
            match scanout.pixels_mut() {
                Some(dst) => blit_rects(src, fb, dst, target, rects),
                None => Ok(()),
            }
        });
        drop(access);
        blitted.unwrap_or(Err(DrmError::InvalidArgument("buffer object has no contents")))
    }

    /// Copy the whole bound framebuffer; nothing to do when unbound
    pub fn sync_all(&mut self) -> Result<()> {
        let fb = match &self.binding {
            Binding::Bound(fb) => fb.clone(),
            _ => return Ok(()),
        };
        self.update(&fb, &[])
    }

    /// Drop the binding and release the mapping
    ///
    /// Returns the mapping the first time; later calls find nothing left.
    pub fn begin_teardown(&mut self) -> Option<Box<dyn ScanoutMemory>> {
        self.binding = Binding::TearingDown;
        self.scanout.unmap()
    }

    pub fn teardown_complete(&mut self) -> Result<()> {
        if !matches!(self.binding, Binding::TearingDown) {
            return Err(DrmError::InvalidState);
        }
        self.binding = Binding::Unbound;
        Ok(())
    }
}

/// Whether `src` holds every byte the framebuffer layout addresses
fn source_fits(src: &[u8], fb: &Framebuffer) -> bool {
    let rows = (fb.height() as usize).saturating_sub(1);
    let end = fb.offset() + rows * fb.pitch() + fb.width() as usize * fb.bytes_per_pixel();
    end <= src.len()
}

/// Blit clamped `rects`; `src` must already have passed `source_fits`
fn blit_rects(src: &[u8], fb: &Framebuffer, dst: &mut [u8], target: Target, rects: &[Rect]) -> Result<()> {
    let src_bpp = fb.bytes_per_pixel();
    let src_pitch = fb.pitch();

    for rect in rects {
        if rect.is_empty() {
            continue;
        }
        let Some(r) = rect
            .clamp(target.width, target.height)
            .and_then(|r| r.clamp(fb.width(), fb.height()))
        else {
            continue;
        };

        let (x, y) = (r.x1 as usize, r.y1 as usize);
        let (width, height) = (r.width() as usize, r.height() as usize);

        let src_off = fb.offset() + y * src_pitch + x * src_bpp;
        let dst_off = y * target.stride + x * target.bpp;

        if fb.format() == target.format {
            blit::copy_lines(
                &src[src_off..],
                src_pitch,
                &mut dst[dst_off..],
                target.stride,
                width * src_bpp,
                height,
            );
        } else {
            blit::convert_lines(
                &src[src_off..],
                src_pitch,
                fb.format(),
                &mut dst[dst_off..],
                target.stride,
                target.format,
                width,
                height,
            )?;
        }
    }

    Ok(())
}
