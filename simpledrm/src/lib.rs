//! KPIO SimpleDRM
//!
//! Display driver core for a framebuffer the firmware already set up.
//! The driver cannot program the hardware; it exposes the one fixed mode
//! and keeps the scanout memory in sync with client framebuffers, copying
//! or converting damaged regions as they are reported.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │   Device  (mode lock, atomic commit)     │
//! ├──────────────┬───────────────────────────┤
//! │    pipe      │   dirty (Synchronizer)    │
//! ├──────────────┴──────┬────────────────────┤
//! │ framebuffer  gem    │  blit  codec       │
//! ├─────────────────────┴────────────────────┤
//! │   scanout  format  damage  memcpy        │
//! └──────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `format`: pixel format registry and four-character codes
//! - `codec`: single-pixel encode/decode
//! - `blit`: strided copy and per-pixel conversion
//! - `damage`: clip rectangles
//! - `scanout`: the firmware framebuffer aperture
//! - `gem`: client buffer objects
//! - `framebuffer`: validated client framebuffers
//! - `mode`: fixed mode and connector
//! - `pipe`: plane/CRTC checks and pipeline hooks
//! - `dirty`: binding state and damage handling
//! - `device`: the device context

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod blit;
pub mod codec;
pub mod damage;
pub mod device;
pub mod dirty;
pub mod error;
pub mod format;
pub mod framebuffer;
pub mod gem;
pub mod memcpy;
pub mod mode;
pub mod pipe;
pub mod scanout;

pub use damage::Rect;
pub use device::Device;
pub use error::{AccessError, ConfigError, DrmError, Result};
pub use format::{FourCc, PixelFormatInfo};
pub use framebuffer::{Framebuffer, FramebufferCmd, FramebufferFlags, FramebufferId};
pub use gem::{BufferObject, CpuAccess, DumbBufferArgs, ShmemObject};
pub use mode::{ConnectorStatus, DisplayMode, ModeConfig};
pub use pipe::{CrtcState, PlaneState, Pipeline, VblankEvent};
pub use scanout::{IoMapping, MemResource, ScanoutConfig, ScanoutMemory, SimplefbPlatformData};
