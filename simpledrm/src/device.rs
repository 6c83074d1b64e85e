//! Device context
//!
//! One `Device` per firmware framebuffer. All state that swaps, damage and
//! teardown race on sits behind a single mode lock; everything else is
//! fixed at attach and readable without it.

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicU64, Ordering};

use spin::Mutex;

use crate::damage::Rect;
use crate::dirty::Synchronizer;
use crate::error::Result;
use crate::framebuffer::{Framebuffer, FramebufferCmd, FramebufferId};
use crate::gem::BufferObject;
use crate::mode::{Connector, ConnectorStatus, DisplayMode, ModeConfig};
use crate::pipe::{self, CrtcState, PlaneState, Pipeline, VblankEvent};
use crate::scanout::{ScanoutBuffer, ScanoutConfig, ScanoutMemory};

/// State guarded by the mode lock
struct ModeState {
    sync: Synchronizer,
    pipeline: Pipeline,
    plane: PlaneState,
    crtc: CrtcState,
    events: Vec<VblankEvent>,
}

/// A firmware framebuffer exposed as a display device
pub struct Device {
    config: ScanoutConfig,
    mode_config: ModeConfig,
    connector: Connector,
    next_fb_id: AtomicU64,
    state: Mutex<ModeState>,
}

impl Device {
    /// Take over a mapped scanout aperture
    pub fn attach(config: ScanoutConfig, memory: Box<dyn ScanoutMemory>, pipeline: Pipeline) -> Result<Self> {
        let scanout = ScanoutBuffer::new(config, memory)?;
        let mode_config = ModeConfig::for_scanout(&scanout);
        let connector = Connector::new(&scanout);
        let crtc = CrtcState::new(false, DisplayMode::fixed(scanout.width(), scanout.height()));

        log::info!(
            "[simpledrm] {}x{} {} stride {} at {:#x} ({} bytes)",
            config.width,
            config.height,
            config.format.fourcc,
            config.stride,
            config.base_address,
            config.size
        );

        Ok(Self {
            config,
            mode_config,
            connector,
            next_fb_id: AtomicU64::new(1),
            state: Mutex::new(ModeState {
                sync: Synchronizer::new(scanout),
                pipeline,
                plane: PlaneState::disabled(),
                crtc,
                events: Vec::new(),
            }),
        })
    }

    /// Scanout geometry fixed at attach
    pub fn scanout_config(&self) -> &ScanoutConfig {
        &self.config
    }

    pub fn mode_config(&self) -> &ModeConfig {
        &self.mode_config
    }

    pub fn connector_status(&self) -> ConnectorStatus {
        self.connector.detect()
    }

    pub fn modes(&self) -> &[DisplayMode] {
        self.connector.modes()
    }

    pub fn connector(&self) -> &Connector {
        &self.connector
    }

    /// Whether the scanout aperture is still mapped
    pub fn is_mapped(&self) -> bool {
        self.state.lock().sync.scanout().is_mapped()
    }

    /// Framebuffer currently feeding the scanout
    pub fn bound_framebuffer(&self) -> Option<FramebufferId> {
        self.state.lock().sync.bound_id()
    }

    /// Wrap a buffer object in a validated framebuffer
    pub fn create_framebuffer(&self, obj: Arc<dyn BufferObject>, cmd: &FramebufferCmd) -> Result<Arc<Framebuffer>> {
        let fb = Framebuffer::new(self.alloc_fb_id(), obj, cmd, &self.mode_config)?;
        log::debug!("[simpledrm] [{}] pixel_format: {}", fb.id(), fb.format());
        Ok(Arc::new(fb))
    }

    fn alloc_fb_id(&self) -> FramebufferId {
        FramebufferId(self.next_fb_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Make `fb` the scanout source
    pub fn bind(&self, fb: &Arc<Framebuffer>) -> Result<()> {
        self.state.lock().sync.bind(fb.clone())
    }

    pub fn unbind(&self) {
        self.state.lock().sync.unbind();
    }

    /// Push damaged regions of `fb` to the scanout
    ///
    /// An empty `rects` means the whole framebuffer. Damage for a
    /// framebuffer that is not bound is ignored.
    pub fn request_update(&self, fb: &Framebuffer, rects: &[Rect]) -> Result<()> {
        self.state.lock().sync.update(fb, rects)
    }

    /// Copy the whole bound framebuffer
    pub fn full_resync(&self) -> Result<()> {
        self.state.lock().sync.sync_all()
    }

    /// Restore scanout contents after the firmware may have clobbered them
    pub fn resume(&self) -> Result<()> {
        log::debug!("[simpledrm] resume");
        self.full_resync()
    }

    /// Stop scanning out and hand back the mapping for release
    ///
    /// Updates that took the lock earlier have finished; later ones see no
    /// mapping and do nothing.
    pub fn begin_teardown(&self) -> Option<Box<dyn ScanoutMemory>> {
        let memory = self.state.lock().sync.begin_teardown();
        log::info!("[simpledrm] teardown");
        memory
    }

    pub fn teardown_complete(&self) -> Result<()> {
        self.state.lock().sync.teardown_complete()
    }

    /// Check and apply a new plane/CRTC state
    pub fn atomic_commit(&self, plane: PlaneState, mut crtc: CrtcState) -> Result<()> {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        pipe::check_plane(&plane, &crtc)?;
        state.pipeline.check(&plane, &crtc)?;

        let was_enabled = state.crtc.enable;
        if was_enabled && !crtc.enable {
            state.pipeline.disable(&mut crtc, &mut state.events);
        }
        if !was_enabled && crtc.enable {
            state.pipeline.enable(&mut crtc, &mut state.events);
        }

        let updated = state.pipeline.update(&plane, &mut crtc, &mut state.sync, &mut state.events);

        state.plane = plane;
        state.crtc = crtc;

        if let Err(e) = updated {
            log::warn!("[simpledrm] plane update failed: {}", e);
        }
        Ok(())
    }

    /// Drain completed vblank events
    pub fn take_vblank_events(&self) -> Vec<VblankEvent> {
        core::mem::take(&mut self.state.lock().events)
    }
}

impl core::fmt::Debug for Device {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Device")
            .field("config", &self.config)
            .field("mode_config", &self.mode_config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DrmError;
    use crate::format::{self, FourCc};
    use crate::gem::ShmemObject;
    use crate::scanout::{MemResource, SimplefbPlatformData};
    use alloc::string::ToString;
    use alloc::vec;
    use std::sync::atomic::AtomicBool;
    use std::thread;

    const W: u32 = 8;
    const H: u32 = 4;

    fn device(name: &str, pipeline: Pipeline) -> Device {
        let bpp = format::find_by_name(name).unwrap().bytes_per_pixel() as u32;
        let mode = SimplefbPlatformData {
            width: W,
            height: H,
            stride: W * bpp,
            format: name.to_string(),
        };
        let size = (W * bpp * H) as usize;
        let config = ScanoutConfig::from_platform_data(&mode, Some(MemResource { start: 0x8000_0000, len: size })).unwrap();
        Device::attach(config, Box::new(vec![0u8; size]), pipeline).unwrap()
    }

    fn xrgb_fb(dev: &Device, fill: u8) -> (Arc<ShmemObject>, Arc<Framebuffer>) {
        let obj = Arc::new(ShmemObject::new((W * H * 4) as usize).unwrap());
        obj.write(0, &vec![fill; (W * H * 4) as usize]).unwrap();
        let fb = dev
            .create_framebuffer(obj.clone(), &FramebufferCmd::new(W, H, FourCc::XRGB8888, W * 4))
            .unwrap();
        (obj, fb)
    }

    fn scanout_copy(dev: &Device) -> Vec<u8> {
        let mut state = dev.state.lock();
        state.sync.scanout_mut().pixels_mut().map(|p| p.to_vec()).unwrap_or_default()
    }

    #[test]
    fn test_attach_metadata() {
        let dev = device("r5g6b5", Pipeline::Null);
        assert_eq!(dev.scanout_config().format.fourcc, FourCc::RGB565);
        assert_eq!(dev.mode_config().max_width, W);
        assert_eq!(dev.mode_config().preferred_depth, 16);
        assert_eq!(dev.connector_status(), ConnectorStatus::Connected);
        assert_eq!(dev.modes()[0].hdisplay, W);
        assert!(dev.is_mapped());
    }

    #[test]
    fn test_framebuffer_ids_are_unique() {
        let dev = device("x8r8g8b8", Pipeline::Null);
        let (_, a) = xrgb_fb(&dev, 0);
        let (_, b) = xrgb_fb(&dev, 0);
        assert!(b.id() > a.id());
    }

    #[test]
    fn test_create_framebuffer_limits() {
        let dev = device("x8r8g8b8", Pipeline::Null);
        let obj: Arc<dyn BufferObject> = Arc::new(ShmemObject::new(4096).unwrap());
        let cmd = FramebufferCmd::new(W + 1, H, FourCc::XRGB8888, (W + 1) * 4);
        assert!(matches!(dev.create_framebuffer(obj, &cmd), Err(DrmError::InvalidArgument(_))));
    }

    #[test]
    fn test_bind_update_resync() {
        let dev = device("x8r8g8b8", Pipeline::Null);
        let (obj, fb) = xrgb_fb(&dev, 0x42);

        dev.bind(&fb).unwrap();
        assert_eq!(dev.bound_framebuffer(), Some(fb.id()));
        dev.request_update(&fb, &[Rect::new(0, 0, 1, 1)]).unwrap();
        let out = scanout_copy(&dev);
        assert_eq!(&out[..4], &[0x42; 4]);
        assert_eq!(out[4], 0);

        obj.write(0, &vec![0x17; (W * H * 4) as usize]).unwrap();
        dev.resume().unwrap();
        assert!(scanout_copy(&dev).iter().all(|&b| b == 0x17));

        dev.unbind();
        assert_eq!(dev.bound_framebuffer(), None);
        assert!(dev.full_resync().is_ok());
    }

    #[test]
    fn test_teardown() {
        let dev = device("x8r8g8b8", Pipeline::Null);
        let (_, fb) = xrgb_fb(&dev, 0x42);
        dev.bind(&fb).unwrap();

        assert!(dev.begin_teardown().is_some());
        assert!(!dev.is_mapped());
        assert!(dev.request_update(&fb, &[]).is_ok());
        assert_eq!(dev.bind(&fb), Err(DrmError::NoDevice));
        dev.teardown_complete().unwrap();
        assert_eq!(dev.teardown_complete(), Err(DrmError::InvalidState));
    }

    #[test]
    fn test_atomic_commit_active_pipe() {
        let dev = device("r5g6b5", Pipeline::active());
        let (_, fb) = xrgb_fb(&dev, 0xff);
        let mode = dev.modes()[0].clone();

        let crtc = CrtcState::new(true, mode.clone()).with_event(VblankEvent::new(1));
        dev.atomic_commit(PlaneState::full_screen(fb.clone()), crtc).unwrap();
        assert_eq!(dev.bound_framebuffer(), Some(fb.id()));
        assert!(scanout_copy(&dev).iter().all(|&b| b == 0xff));

        // One event per commit even though enable and update both ran
        let events = dev.take_vblank_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].user_data, 1);
        assert!(dev.take_vblank_events().is_empty());

        let crtc = CrtcState::new(false, mode).with_event(VblankEvent::new(2));
        dev.atomic_commit(PlaneState::disabled(), crtc).unwrap();
        assert_eq!(dev.bound_framebuffer(), None);
        assert_eq!(dev.take_vblank_events()[0].user_data, 2);
    }

    #[test]
    fn test_atomic_commit_null_pipe_binds_nothing() {
        let dev = device("x8r8g8b8", Pipeline::Null);
        let (_, fb) = xrgb_fb(&dev, 0x11);
        let crtc = CrtcState::new(true, dev.modes()[0].clone()).with_event(VblankEvent::new(1));
        dev.atomic_commit(PlaneState::full_screen(fb), crtc).unwrap();
        assert_eq!(dev.bound_framebuffer(), None);
        assert!(dev.take_vblank_events().is_empty());
        assert!(scanout_copy(&dev).iter().all(|&b| b == 0));
    }

    #[test]
    fn test_atomic_commit_rejects_bad_state() {
        let dev = device("x8r8g8b8", Pipeline::active());
        let (_, fb) = xrgb_fb(&dev, 0x11);
        let crtc = CrtcState::new(false, dev.modes()[0].clone());
        let err = dev.atomic_commit(PlaneState::full_screen(fb), crtc);
        assert!(matches!(err, Err(DrmError::InvalidArgument(_))));
        assert_eq!(dev.bound_framebuffer(), None);
    }

    #[test]
    fn test_concurrent_update_and_teardown() {
        let dev = Arc::new(device("x8r8g8b8", Pipeline::Null));
        let (_, fb) = xrgb_fb(&dev, 0x5a);
        dev.bind(&fb).unwrap();

        let stop = Arc::new(AtomicBool::new(false));
        let workers: Vec<_> = (0..4)
            .map(|_| {
                let dev = dev.clone();
                let fb = fb.clone();
                let stop = stop.clone();
                thread::spawn(move || {
                    while !stop.load(Ordering::Relaxed) {
                        dev.request_update(&fb, &[]).unwrap();
                    }
                })
            })
            .collect();

        let mut memory = dev.begin_teardown().unwrap();
        // Nothing may land in the released mapping from here on
        memory.as_mut_bytes().fill(0);
        thread::sleep(std::time::Duration::from_millis(20));
        stop.store(true, Ordering::Relaxed);
        for worker in workers {
            worker.join().unwrap();
        }
        assert!(memory.as_mut_bytes().iter().all(|&b| b == 0));
    }
}
