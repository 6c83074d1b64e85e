//! Display Pipeline
//!
//! One plane, one CRTC, one encoder, one connector, all fixed. Commits are
//! validated here and then handed to the pipeline hooks, which for the
//! active pipeline means binding the plane's framebuffer as the scanout
//! source and pushing a full copy to the hardware.

use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::damage::Rect;
use crate::dirty::Synchronizer;
use crate::error::{DrmError, Result};
use crate::framebuffer::Framebuffer;
use crate::mode::DisplayMode;

/// Completion event requested by a commit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VblankEvent {
    /// Opaque value supplied with the commit
    pub user_data: u64,
    /// Frame counter at completion; zero until sent
    pub sequence: u64,
}

impl VblankEvent {
    pub fn new(user_data: u64) -> Self {
        Self { user_data, sequence: 0 }
    }
}

/// Requested state of the primary plane
#[derive(Debug, Clone, Default)]
pub struct PlaneState {
    /// Plane is attached to the CRTC
    pub crtc: bool,
    pub fb: Option<Arc<Framebuffer>>,
    /// Source rectangle in framebuffer pixels
    pub src: Rect,
    /// Destination rectangle in CRTC pixels
    pub dst: Rect,
}

impl PlaneState {
    /// Show `fb` full screen
    pub fn full_screen(fb: Arc<Framebuffer>) -> Self {
        let rect = fb.rect();
        Self {
            crtc: true,
            fb: Some(fb),
            src: rect,
            dst: rect,
        }
    }

    /// Detached plane with nothing to scan out
    pub fn disabled() -> Self {
        Self::default()
    }
}

/// Requested state of the CRTC
#[derive(Debug, Clone)]
pub struct CrtcState {
    pub enable: bool,
    pub mode: DisplayMode,
    /// Sent once the commit has been applied
    pub event: Option<VblankEvent>,
}

impl CrtcState {
    pub fn new(enable: bool, mode: DisplayMode) -> Self {
        Self { enable, mode, event: None }
    }

    pub fn with_event(mut self, event: VblankEvent) -> Self {
        self.event = Some(event);
        self
    }
}

/// Checks every pipeline shares: plane and CRTC agree, and an enabled
/// plane covers the whole mode without scaling or positioning
pub fn check_plane(plane: &PlaneState, crtc: &CrtcState) -> Result<()> {
    if crtc.enable != plane.crtc {
        return Err(DrmError::InvalidArgument("plane must match crtc enable state"));
    }
    if !crtc.enable {
        return Ok(());
    }

    let fb = plane
        .fb
        .as_ref()
        .ok_or(DrmError::InvalidArgument("enabled plane without framebuffer"))?;

    let clip = Rect::full(crtc.mode.hdisplay, crtc.mode.vdisplay);
    if plane.dst != clip {
        return Err(DrmError::InvalidArgument("plane must cover the full mode"));
    }
    if plane.src.width() != plane.dst.width() || plane.src.height() != plane.dst.height() {
        return Err(DrmError::InvalidArgument("plane scaling not supported"));
    }
    if !fb.rect().contains_rect(&plane.src) {
        return Err(DrmError::InvalidArgument("plane source outside framebuffer"));
    }

    Ok(())
}

/// Hooks of the active pipeline
#[derive(Debug, Default)]
pub struct ActivePipe {
    sequence: u64,
}

impl ActivePipe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames completed so far
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    fn send_vblank_event(&mut self, crtc: &mut CrtcState, events: &mut Vec<VblankEvent>) {
        if let Some(mut event) = crtc.event.take() {
            self.sequence += 1;
            event.sequence = self.sequence;
            events.push(event);
        }
    }
}

/// Display pipeline hooks, chosen at attach
#[derive(Debug)]
pub enum Pipeline {
    /// No hooks: commits succeed and nothing reaches the scanout
    Null,
    Active(ActivePipe),
}

impl Pipeline {
    pub fn active() -> Self {
        Pipeline::Active(ActivePipe::new())
    }

    /// Pipeline-specific commit check, run after [`check_plane`]
    ///
    /// Neither pipeline constrains a commit beyond the shared plane check.
    pub fn check(&self, _plane: &PlaneState, _crtc: &CrtcState) -> Result<()> {
        match self {
            Pipeline::Null | Pipeline::Active(_) => Ok(()),
        }
    }

    pub fn enable(&mut self, crtc: &mut CrtcState, events: &mut Vec<VblankEvent>) {
        if let Pipeline::Active(pipe) = self {
            pipe.send_vblank_event(crtc, events);
        }
    }

    pub fn disable(&mut self, crtc: &mut CrtcState, events: &mut Vec<VblankEvent>) {
        if let Pipeline::Active(pipe) = self {
            pipe.send_vblank_event(crtc, events);
        }
    }

    /// Make the plane's framebuffer the scanout source and copy it over
    ///
    /// Runs with the mode lock held.
    pub fn update(
        &mut self,
        plane: &PlaneState,
        crtc: &mut CrtcState,
        sync: &mut Synchronizer,
        events: &mut Vec<VblankEvent>,
    ) -> Result<()> {
        let Pipeline::Active(pipe) = self else {
            return Ok(());
        };

        pipe.send_vblank_event(crtc, events);

        match &plane.fb {
            Some(fb) => {
                sync.bind(fb.clone())?;
                sync.sync_all()
            }
            None => {
                sync.unbind();
                Ok(())
            }
        }
    }
}
