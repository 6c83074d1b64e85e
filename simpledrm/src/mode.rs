//! Mode and connector
//!
//! A firmware framebuffer has exactly one mode: whatever the firmware set
//! up. There is nothing to program and nothing to detect.

use alloc::format;
use alloc::string::String;
use core::fmt;

use crate::format::{self, FourCc};
use crate::scanout::ScanoutBuffer;

/// Nominal refresh rate reported for the fixed mode
pub const REFRESH_HZ: u32 = 60;

/// A display timing, reduced to what userspace can observe here
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayMode {
    pub name: String,
    pub hdisplay: u32,
    pub vdisplay: u32,
    /// Vertical refresh in Hz
    pub vrefresh: u32,
    pub preferred: bool,
}

impl DisplayMode {
    /// The single preferred mode of a `width` x `height` scanout
    pub fn fixed(width: u32, height: u32) -> Self {
        Self {
            name: format!("{}x{}", width, height),
            hdisplay: width,
            vdisplay: height,
            vrefresh: REFRESH_HZ,
            preferred: true,
        }
    }

    /// Pixel clock in kHz
    pub fn clock_khz(&self) -> u64 {
        self.hdisplay as u64 * self.vdisplay as u64 * self.vrefresh as u64 / 1000
    }
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.vrefresh)
    }
}

/// Size limits applied to framebuffers created on the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeConfig {
    pub min_width: u32,
    pub max_width: u32,
    pub min_height: u32,
    pub max_height: u32,
    pub preferred_depth: u32,
}

impl ModeConfig {
    /// Limits pinned to the scanout geometry
    pub fn for_scanout(scanout: &ScanoutBuffer) -> Self {
        Self {
            min_width: scanout.width(),
            max_width: scanout.width(),
            min_height: scanout.height(),
            max_height: scanout.height(),
            preferred_depth: scanout.bits_per_pixel(),
        }
    }

    pub fn accepts(&self, width: u32, height: u32) -> bool {
        (self.min_width..=self.max_width).contains(&width) && (self.min_height..=self.max_height).contains(&height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectorStatus {
    Connected,
    Disconnected,
    Unknown,
}

/// Virtual connector of the firmware framebuffer
#[derive(Debug, Clone)]
pub struct Connector {
    mode: DisplayMode,
}

impl Connector {
    pub fn new(scanout: &ScanoutBuffer) -> Self {
        Self {
            mode: DisplayMode::fixed(scanout.width(), scanout.height()),
        }
    }

    /// Always connected; there is no way to sense a monitor
    pub fn detect(&self) -> ConnectorStatus {
        ConnectorStatus::Connected
    }

    /// Modes the connector reports, preferred first
    pub fn modes(&self) -> &[DisplayMode] {
        core::slice::from_ref(&self.mode)
    }

    /// Every mode is acceptable; the commit check enforces the real limit
    pub fn mode_valid(&self, _mode: &DisplayMode) -> bool {
        true
    }

    /// Formats the primary plane scans out from
    pub fn plane_formats(&self) -> impl Iterator<Item = FourCc> {
        format::plane_formats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::SIMPLEFB_FORMATS;
    use crate::scanout::ScanoutConfig;
    use alloc::boxed::Box;
    use alloc::vec;
    use alloc::vec::Vec;

    fn scanout(width: u32, height: u32) -> ScanoutBuffer {
        let format = &SIMPLEFB_FORMATS[1];
        let stride = width * 4;
        let size = (stride * height) as usize;
        let config = ScanoutConfig {
            base_address: 0,
            size,
            width,
            height,
            stride,
            format,
        };
        ScanoutBuffer::new(config, Box::new(vec![0u8; size])).unwrap()
    }

    #[test]
    fn test_fixed_mode() {
        let connector = Connector::new(&scanout(1024, 768));
        let modes = connector.modes();
        assert_eq!(modes.len(), 1);
        assert_eq!(modes[0].name, "1024x768");
        assert_eq!(modes[0].vrefresh, 60);
        assert!(modes[0].preferred);
        assert_eq!(modes[0].clock_khz(), 47185);
        assert_eq!(connector.detect(), ConnectorStatus::Connected);
        assert!(connector.mode_valid(&DisplayMode::fixed(1, 1)));
    }

    #[test]
    fn test_mode_config_pins_size() {
        let config = ModeConfig::for_scanout(&scanout(8, 6));
        assert_eq!(config.preferred_depth, 32);
        assert!(config.accepts(8, 6));
        assert!(!config.accepts(7, 6));
        assert!(!config.accepts(8, 7));
    }

    #[test]
    fn test_plane_formats_match_registry() {
        let connector = Connector::new(&scanout(2, 2));
        let formats: Vec<FourCc> = connector.plane_formats().collect();
        assert_eq!(formats.len(), SIMPLEFB_FORMATS.len());
        assert!(formats.contains(&FourCc::XRGB8888));
        assert!(!formats.contains(&FourCc::BGR888));
    }
}
