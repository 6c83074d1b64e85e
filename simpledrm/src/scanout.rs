//! Scanout Buffer
//!
//! The firmware-provided framebuffer the display engine continuously reads
//! from. Its geometry and format are fixed when the device attaches; the
//! only thing that changes afterwards is whether the aperture is still
//! mapped.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;

use crate::error::{ConfigError, Result};
use crate::format::{self, FourCc, PixelFormatInfo};

/// CPU-writable view of the scanout aperture
pub trait ScanoutMemory: Send {
    /// Mapped length in bytes
    fn len(&self) -> usize;

    /// The whole mapping
    fn as_mut_bytes(&mut self) -> &mut [u8];
}

impl ScanoutMemory for Vec<u8> {
    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn as_mut_bytes(&mut self) -> &mut [u8] {
        self.as_mut_slice()
    }
}

impl ScanoutMemory for Box<[u8]> {
    fn len(&self) -> usize {
        <[u8]>::len(self)
    }

    fn as_mut_bytes(&mut self) -> &mut [u8] {
        &mut self[..]
    }
}

/// Aperture mapped by the platform code (write-combined I/O memory)
pub struct IoMapping {
    ptr: *mut u8,
    len: usize,
}

// SAFETY: the mapping is exclusively owned by one `IoMapping`, and all
// access goes through `&mut self`.
unsafe impl Send for IoMapping {}

impl IoMapping {
    /// Wrap an existing mapping
    ///
    /// # Safety
    /// `ptr` must be valid for reads and writes of `len` bytes for the
    /// lifetime of the returned value, and nothing else may access it.
    pub unsafe fn from_raw_parts(ptr: *mut u8, len: usize) -> Self {
        Self { ptr, len }
    }
}

impl ScanoutMemory for IoMapping {
    fn len(&self) -> usize {
        self.len
    }

    fn as_mut_bytes(&mut self) -> &mut [u8] {
        // SAFETY: upheld by the `from_raw_parts` contract
        unsafe { core::slice::from_raw_parts_mut(self.ptr, self.len) }
    }
}

/// Mode description of a simple-framebuffer node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimplefbPlatformData {
    pub width: u32,
    pub height: u32,
    /// Bytes per scanline
    pub stride: u32,
    /// Registry format name, e.g. `"x8r8g8b8"`
    pub format: String,
}

/// Physical memory resource backing the framebuffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemResource {
    pub start: u64,
    pub len: usize,
}

/// Scanout geometry, validated before the aperture is mapped
#[derive(Debug, Clone, Copy)]
pub struct ScanoutConfig {
    /// Physical base address of the aperture
    pub base_address: u64,
    /// Aperture size in bytes
    pub size: usize,
    pub width: u32,
    pub height: u32,
    /// Bytes per scanline
    pub stride: u32,
    pub format: &'static PixelFormatInfo,
}

impl ScanoutConfig {
    /// Resolve platform data and its memory resource into a config
    pub fn from_platform_data(mode: &SimplefbPlatformData, mem: Option<MemResource>) -> Result<Self> {
        let mem = mem.ok_or_else(|| {
            log::error!("[simpledrm] No memory resource");
            ConfigError::NoMemoryResource
        })?;

        let format = format::find_by_name(&mode.format).ok_or_else(|| {
            log::error!("[simpledrm] Unknown format {}", mode.format);
            ConfigError::UnknownFormat
        })?;

        let config = Self {
            base_address: mem.start,
            size: mem.len,
            width: mode.width,
            height: mode.height,
            stride: mode.stride,
            format,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check that the mode fits the aperture
    pub fn validate(&self) -> core::result::Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            log::error!("[simpledrm] Empty mode {}x{}", self.width, self.height);
            return Err(ConfigError::EmptyMode);
        }

        let needed = (self.stride as u64) * (self.height as u64);
        if (self.size as u64) < needed {
            log::error!("[simpledrm] FB too small");
            return Err(ConfigError::FramebufferTooSmall);
        }

        let row = (self.format.bytes_per_pixel() as u64) * (self.width as u64);
        if row > self.stride as u64 {
            log::error!("[simpledrm] Invalid stride");
            return Err(ConfigError::InvalidStride);
        }

        Ok(())
    }
}

/// The hardware scanout buffer and its mapping
pub struct ScanoutBuffer {
    config: ScanoutConfig,
    memory: Option<Box<dyn ScanoutMemory>>,
}

impl ScanoutBuffer {
    /// Validate `config` and take ownership of the mapped aperture
    pub fn new(config: ScanoutConfig, memory: Box<dyn ScanoutMemory>) -> Result<Self> {
        config.validate()?;

        if memory.len() < config.size {
            log::error!(
                "[simpledrm] cannot remap VMEM: mapped {} of {} bytes",
                memory.len(),
                config.size
            );
            return Err(ConfigError::MappingTooSmall.into());
        }

        log::debug!("[simpledrm] format: {}", config.format.fourcc);

        Ok(Self {
            config,
            memory: Some(memory),
        })
    }

    pub fn config(&self) -> &ScanoutConfig {
        &self.config
    }

    #[inline]
    pub fn base_address(&self) -> u64 {
        self.config.base_address
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.config.size
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.config.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.config.height
    }

    #[inline]
    pub fn stride(&self) -> usize {
        self.config.stride as usize
    }

    #[inline]
    pub fn format(&self) -> FourCc {
        self.config.format.fourcc
    }

    #[inline]
    pub fn format_info(&self) -> &'static PixelFormatInfo {
        self.config.format
    }

    #[inline]
    pub fn bits_per_pixel(&self) -> u32 {
        self.config.format.bits_per_pixel
    }

    #[inline]
    pub fn bytes_per_pixel(&self) -> usize {
        self.config.format.bytes_per_pixel()
    }

    /// Whether the aperture is still mapped
    #[inline]
    pub fn is_mapped(&self) -> bool {
        self.memory.is_some()
    }

    /// Scanout bytes covered by the validated geometry
    pub(crate) fn pixels_mut(&mut self) -> Option<&mut [u8]> {
        let size = self.config.size;
        self.memory.as_mut().map(|m| &mut m.as_mut_bytes()[..size])
    }

    /// Release the mapping; later updates become no-ops
    pub fn unmap(&mut self) -> Option<Box<dyn ScanoutMemory>> {
        self.memory.take()
    }
}

impl core::fmt::Debug for ScanoutBuffer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ScanoutBuffer")
            .field("config", &self.config)
            .field("mapped", &self.is_mapped())
            .finish()
    }
}
