//! Buffer Objects
//!
//! Client-visible memory backing a framebuffer. The scanout core only ever
//! reads from a buffer object, and only inside a begin/end CPU access
//! bracket so that imported buffers can sync caches or fault pages in.

use alloc::vec;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicUsize, Ordering};

use spin::Mutex;

use crate::error::{AccessError, DrmError, Result};

/// Page granularity of buffer object allocations
pub const PAGE_SIZE: usize = 4096;

/// Round `size` up to a whole number of pages
pub const fn page_align(size: usize) -> Option<usize> {
    match size.checked_add(PAGE_SIZE - 1) {
        Some(v) => Some(v & !(PAGE_SIZE - 1)),
        None => None,
    }
}

/// Memory object a framebuffer reads its pixels from
pub trait BufferObject: Send + Sync {
    /// Object size in bytes
    fn size(&self) -> usize;

    /// Make the contents coherent for CPU reads
    fn begin_cpu_access(&self) -> core::result::Result<(), AccessError>;

    /// Release what `begin_cpu_access` acquired
    fn end_cpu_access(&self);

    /// Run `f` over the contents; only called inside an access bracket
    fn read(&self, f: &mut dyn FnMut(&[u8]));
}

/// Scoped CPU access to a buffer object
///
/// Ends access when dropped, on every exit path.
pub struct CpuAccess<'a> {
    obj: &'a dyn BufferObject,
}

impl<'a> CpuAccess<'a> {
    pub fn begin(obj: &'a dyn BufferObject) -> Result<Self> {
        obj.begin_cpu_access()?;
        Ok(Self { obj })
    }

    /// Run `f` over the buffer contents
    ///
    /// `None` if the object never handed out its contents.
    pub fn read<R>(&self, f: impl FnOnce(&[u8]) -> R) -> Option<R> {
        let mut f = Some(f);
        let mut out = None;
        self.obj.read(&mut |bytes| {
            if let Some(f) = f.take() {
                out = Some(f(bytes));
            }
        });
        out
    }
}

impl Drop for CpuAccess<'_> {
    fn drop(&mut self) {
        self.obj.end_cpu_access();
    }
}

/// Arguments of a dumb buffer allocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DumbBufferArgs {
    pub width: u32,
    pub height: u32,
    pub bpp: u32,
    pub flags: u32,
}

/// Pitch and size chosen for a dumb buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DumbBufferLayout {
    pub pitch: u32,
    pub size: usize,
}

impl DumbBufferArgs {
    /// Tightly packed rows, page-rounded size
    pub fn layout(&self) -> Result<DumbBufferLayout> {
        if self.flags != 0 {
            return Err(DrmError::InvalidArgument("dumb buffer flags"));
        }
        if self.width == 0 || self.height == 0 || self.bpp == 0 {
            return Err(DrmError::InvalidArgument("empty dumb buffer"));
        }

        let pitch = ((self.bpp + 7) / 8)
            .checked_mul(self.width)
            .ok_or(DrmError::InvalidArgument("dumb buffer pitch overflow"))?;
        let size = (pitch as usize)
            .checked_mul(self.height as usize)
            .and_then(page_align)
            .ok_or(DrmError::InvalidArgument("dumb buffer size overflow"))?;

        Ok(DumbBufferLayout { pitch, size })
    }
}

/// Heap-backed buffer object
///
/// Pages are allocated zeroed on first access and kept until the object
/// is dropped.
pub struct ShmemObject {
    size: usize,
    pages: Mutex<Option<Vec<u8>>>,
    active: AtomicUsize,
}

impl ShmemObject {
    /// Create an object of `size` bytes, rounded up to whole pages
    pub fn new(size: usize) -> Result<Self> {
        if size == 0 {
            return Err(DrmError::InvalidArgument("empty buffer object"));
        }
        let size = page_align(size).ok_or(DrmError::InvalidArgument("buffer object size overflow"))?;
        Ok(Self {
            size,
            pages: Mutex::new(None),
            active: AtomicUsize::new(0),
        })
    }

    /// Allocate a dumb buffer and report its layout
    pub fn create_dumb(args: &DumbBufferArgs) -> Result<(Self, DumbBufferLayout)> {
        let layout = args.layout()?;
        let obj = Self::new(layout.size)?;
        Ok((obj, layout))
    }

    /// Whether backing pages exist
    pub fn has_pages(&self) -> bool {
        self.pages.lock().is_some()
    }

    /// Open CPU access brackets
    pub fn access_count(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    /// Copy `bytes` into the object at `offset`
    pub fn write(&self, offset: usize, bytes: &[u8]) -> Result<()> {
        let end = offset
            .checked_add(bytes.len())
            .filter(|&end| end <= self.size)
            .ok_or(DrmError::InvalidArgument("write past end of buffer object"))?;

        let mut pages = self.pages.lock();
        let pages = pages.get_or_insert_with(|| vec![0u8; self.size]);
        pages[offset..end].copy_from_slice(bytes);
        Ok(())
    }
}

impl BufferObject for ShmemObject {
    fn size(&self) -> usize {
        self.size
    }

    fn begin_cpu_access(&self) -> core::result::Result<(), AccessError> {
        self.pages.lock().get_or_insert_with(|| vec![0u8; self.size]);
        self.active.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    fn end_cpu_access(&self) {
        self.active.fetch_sub(1, Ordering::AcqRel);
    }

    fn read(&self, f: &mut dyn FnMut(&[u8])) {
        match self.pages.lock().as_deref() {
            Some(pages) => f(pages),
            None => f(&[]),
        }
    }
}
