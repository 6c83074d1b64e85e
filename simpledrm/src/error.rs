//! Driver error types

use core::fmt;

use crate::format::FourCc;

/// Errors reported by the scanout core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrmError {
    /// Invalid scanout configuration; the device refuses to attach
    Configuration(ConfigError),
    /// CPU access to a source buffer could not be acquired
    Access(AccessError),
    /// Pixel format unknown, or no conversion path for this pairing
    UnsupportedFormat(FourCc),
    /// Rejected framebuffer, dumb buffer or atomic state
    InvalidArgument(&'static str),
    /// Scanout mapping is gone (device torn down)
    NoDevice,
    /// Operation not valid in the current binding state
    InvalidState,
}

impl fmt::Display for DrmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DrmError::Configuration(e) => write!(f, "configuration error: {}", e),
            DrmError::Access(e) => write!(f, "buffer access error: {}", e),
            DrmError::UnsupportedFormat(code) => write!(f, "unsupported format {}", code),
            DrmError::InvalidArgument(msg) => write!(f, "invalid argument: {}", msg),
            DrmError::NoDevice => write!(f, "no device"),
            DrmError::InvalidState => write!(f, "invalid state"),
        }
    }
}

impl From<ConfigError> for DrmError {
    fn from(e: ConfigError) -> Self {
        DrmError::Configuration(e)
    }
}

impl From<AccessError> for DrmError {
    fn from(e: AccessError) -> Self {
        DrmError::Access(e)
    }
}

/// Attach-time configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No memory resource describing the aperture
    NoMemoryResource,
    /// Format name not in the registry
    UnknownFormat,
    /// Width or height is zero
    EmptyMode,
    /// `stride * height` exceeds the aperture
    FramebufferTooSmall,
    /// `bytes_per_pixel * width` exceeds the stride
    InvalidStride,
    /// Mapping is shorter than the declared aperture
    MappingTooSmall,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            ConfigError::NoMemoryResource => "no memory resource",
            ConfigError::UnknownFormat => "unknown format",
            ConfigError::EmptyMode => "empty mode",
            ConfigError::FramebufferTooSmall => "FB too small",
            ConfigError::InvalidStride => "invalid stride",
            ConfigError::MappingTooSmall => "cannot map VMEM",
        };
        f.write_str(msg)
    }
}

/// Buffer object access failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessError {
    /// Backing pages could not be allocated or pinned
    OutOfMemory,
    /// The exporter refused CPU access
    Refused,
    /// The buffer object has been released
    Released,
}

impl fmt::Display for AccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            AccessError::OutOfMemory => "out of memory",
            AccessError::Refused => "access refused",
            AccessError::Released => "buffer released",
        };
        f.write_str(msg)
    }
}

/// Result type for driver operations
pub type Result<T> = core::result::Result<T, DrmError>;
