//! Framebuffers
//!
//! A framebuffer is a client buffer object plus the layout needed to read
//! pixels out of it. Layout is checked once at creation; afterwards the
//! synchronizer trusts `pitch`, `offset` and the dimensions when it slices
//! the object.

use alloc::sync::Arc;
use core::fmt;

use bitflags::bitflags;

use crate::damage::Rect;
use crate::error::{DrmError, Result};
use crate::format::{FourCc, PixelFormatInfo};
use crate::gem::BufferObject;
use crate::mode::ModeConfig;

/// Largest pitch a framebuffer may declare
pub const MAX_PITCH: u32 = 0xffff;

/// Device-unique framebuffer identity
///
/// Ids are never reused, so a damage report naming a framebuffer that has
/// since been swapped out can be told apart from one for the bound buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FramebufferId(pub(crate) u64);

impl FramebufferId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for FramebufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FB:{}", self.0)
    }
}

bitflags! {
    /// Creation flags; none are supported
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FramebufferFlags: u32 {
        const INTERLACED = 1 << 0;
        const MODIFIERS = 1 << 1;
    }
}

/// Framebuffer creation request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramebufferCmd {
    pub width: u32,
    pub height: u32,
    pub pixel_format: FourCc,
    /// Bytes per row in the buffer object
    pub pitch: u32,
    /// Byte offset of the first pixel in the buffer object
    pub offset: u32,
    pub flags: FramebufferFlags,
}

impl FramebufferCmd {
    /// Tightly packed request with no flags and no offset
    pub fn new(width: u32, height: u32, pixel_format: FourCc, pitch: u32) -> Self {
        Self {
            width,
            height,
            pixel_format,
            pitch,
            offset: 0,
            flags: FramebufferFlags::empty(),
        }
    }

    /// Check the request against the device limits and the object size
    pub fn validate(&self, limits: &ModeConfig, object_size: usize) -> Result<&'static PixelFormatInfo> {
        if !self.flags.is_empty() {
            return Err(DrmError::InvalidArgument("framebuffer flags"));
        }

        let format = self
            .pixel_format
            .info()
            .ok_or(DrmError::UnsupportedFormat(self.pixel_format))?;

        if !limits.accepts(self.width, self.height) {
            return Err(DrmError::InvalidArgument("framebuffer size outside mode config"));
        }

        let bpp = format.bytes_per_pixel() as u64;
        if bpp == 0 || bpp > 4 {
            return Err(DrmError::InvalidArgument("bytes per pixel"));
        }
        if (self.pitch as u64) < bpp * self.width as u64 || self.pitch > MAX_PITCH {
            return Err(DrmError::InvalidArgument("framebuffer pitch"));
        }

        let end = (self.pitch as u64)
            .checked_mul(self.height as u64)
            .and_then(|size| size.checked_add(self.offset as u64))
            .ok_or(DrmError::InvalidArgument("framebuffer size overflow"))?;
        if end > object_size as u64 {
            return Err(DrmError::InvalidArgument("framebuffer exceeds buffer object"));
        }

        Ok(format)
    }
}

/// A validated client framebuffer
pub struct Framebuffer {
    id: FramebufferId,
    obj: Arc<dyn BufferObject>,
    format: &'static PixelFormatInfo,
    width: u32,
    height: u32,
    pitch: u32,
    offset: u32,
}

impl Framebuffer {
    pub(crate) fn new(
        id: FramebufferId,
        obj: Arc<dyn BufferObject>,
        cmd: &FramebufferCmd,
        limits: &ModeConfig,
    ) -> Result<Self> {
        let format = cmd.validate(limits, obj.size())?;
        Ok(Self {
            id,
            obj,
            format,
            width: cmd.width,
            height: cmd.height,
            pitch: cmd.pitch,
            offset: cmd.offset,
        })
    }

    #[inline]
    pub fn id(&self) -> FramebufferId {
        self.id
    }

    #[inline]
    pub fn object(&self) -> &dyn BufferObject {
        &*self.obj
    }

    #[inline]
    pub fn format(&self) -> FourCc {
        self.format.fourcc
    }

    #[inline]
    pub fn format_info(&self) -> &'static PixelFormatInfo {
        self.format
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn pitch(&self) -> usize {
        self.pitch as usize
    }

    #[inline]
    pub fn offset(&self) -> usize {
        self.offset as usize
    }

    #[inline]
    pub fn bits_per_pixel(&self) -> u32 {
        self.format.bits_per_pixel
    }

    #[inline]
    pub fn bytes_per_pixel(&self) -> usize {
        self.format.bytes_per_pixel()
    }

    /// The whole surface
    pub fn rect(&self) -> Rect {
        Rect::full(self.width, self.height)
    }
}

impl fmt::Debug for Framebuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Framebuffer")
            .field("id", &self.id)
            .field("format", &self.format.fourcc)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("pitch", &self.pitch)
            .field("offset", &self.offset)
            .finish()
    }
}
