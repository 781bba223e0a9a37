//! Desktop host for the LensFX engine.
//!
//! Opens one window as the preview target and feeds it a synthetic camera
//! pattern through the render thread. Window resize and close are forwarded as
//! surface lifecycle events. A lost GPU context shows in the window title
//! while the render thread is rebuilt.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use lensfx_engine::capture::{frame_channel, CameraFrame, FrameReceiver, FrameSender, DEFAULT_FRAME_QUEUE};
use lensfx_engine::device::{GpuInit, WgpuBackend};
use lensfx_engine::logging::{init_logging, LoggingConfig};
use lensfx_engine::render::{PassthroughEffect, RenderHandle, RenderThread, RenderThreadConfig};
use lensfx_engine::surface::{SurfaceHandle, TargetId, TargetOptions, MIRROR_HORIZONTAL};
use lensfx_engine::RenderError;

const CAMERA_WIDTH: u32 = 640;
const CAMERA_HEIGHT: u32 = 480;
const CAMERA_INTERVAL: Duration = Duration::from_millis(33);
const STATUS_POLL: Duration = Duration::from_millis(250);
const TITLE: &str = "LensFX Studio";

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
    let mut studio = Studio::default();

    event_loop
        .run_app(&mut studio)
        .context("winit event loop terminated with error")?;

    studio.stop();
    Ok(())
}

// ── synthetic camera ──────────────────────────────────────────────────────

/// Produces a scrolling gradient at roughly 30 fps until stopped or until the
/// render thread goes away.
struct SyntheticCamera {
    stop: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl SyntheticCamera {
    fn start(sender: FrameSender) -> Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);

        let join = thread::Builder::new()
            .name("lensfx-camera".into())
            .spawn(move || run_camera(sender, flag))
            .context("failed to spawn camera thread")?;

        Ok(Self {
            stop,
            join: Some(join),
        })
    }

    fn stop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

fn run_camera(sender: FrameSender, stop: Arc<AtomicBool>) {
    let start = Instant::now();
    let mut tick: u32 = 0;

    while !stop.load(Ordering::Acquire) {
        let frame = match CameraFrame::rgba(start.elapsed(), CAMERA_WIDTH, CAMERA_HEIGHT, gradient(tick)) {
            Ok(frame) => frame,
            Err(err) => {
                log::error!("camera frame rejected: {err}");
                return;
            }
        };

        match sender.send(frame) {
            Ok(()) => {}
            Err(RenderError::Released) => {
                log::info!("render thread gone, camera stopping");
                return;
            }
            Err(err) => log::warn!("camera frame not delivered: {err}"),
        }

        tick = tick.wrapping_add(1);
        thread::sleep(CAMERA_INTERVAL);
    }
}

fn gradient(tick: u32) -> Vec<u8> {
    let mut pixels = Vec::with_capacity((CAMERA_WIDTH * CAMERA_HEIGHT * 4) as usize);
    for y in 0..CAMERA_HEIGHT {
        for x in 0..CAMERA_WIDTH {
            let r = ((x + tick * 2) % 256) as u8;
            let g = ((y + tick) % 256) as u8;
            let b = (((x ^ y) + tick) % 256) as u8;
            pixels.extend_from_slice(&[r, g, b, 255]);
        }
    }
    pixels
}

// ── window host ───────────────────────────────────────────────────────────

#[derive(Default)]
struct Studio {
    window: Option<Arc<Window>>,
    surface: Option<SurfaceHandle>,
    render: Option<RenderHandle>,
    camera: Option<SyntheticCamera>,
    /// Set while the window title reports a lost context.
    context_lost: bool,
}

/// The preview shows the camera the way a mirror would.
fn preview_options() -> TargetOptions {
    TargetOptions::for_target(&TargetId::preview()).with_transform(MIRROR_HORIZONTAL)
}

impl Studio {
    fn start(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title(TITLE)
            .with_inner_size(LogicalSize::new(960.0, 720.0));
        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .context("failed to create window")?,
        );

        let (sender, receiver) = frame_channel(DEFAULT_FRAME_QUEUE);
        let render = spawn_renderer(receiver)?;

        let size = window.inner_size();
        let handle = SurfaceHandle::from_window(window.as_ref())?;
        render.surface_created_with(
            TargetId::preview(),
            handle,
            size.width as i32,
            size.height as i32,
            preview_options(),
        )?;

        self.camera = Some(SyntheticCamera::start(sender)?);
        self.surface = Some(handle);
        self.render = Some(render);
        self.window = Some(window);
        Ok(())
    }

    /// Unregisters the preview before the window goes away, then joins both threads.
    fn stop(&mut self) {
        if let Some(render) = self.render.as_mut() {
            if let Err(err) = render.surface_destroyed(TargetId::preview()) {
                log::warn!("preview teardown: {err}");
            }
            match render.shutdown() {
                Ok(summary) => log::info!(
                    "render thread stopped: {} frames received, {} presented",
                    summary.stats.frames_received,
                    summary.stats.frames_presented
                ),
                Err(err) => log::warn!("render thread shutdown: {err}"),
            }
        }
        self.render = None;

        if let Some(camera) = self.camera.as_mut() {
            camera.stop();
        }
        self.camera = None;
        self.surface = None;
        self.window = None;
    }

    /// Surfaces a halted render thread in the title and tries to rebuild it.
    fn check_render_status(&mut self) {
        let (Some(render), Some(window)) = (self.render.as_ref(), self.window.as_ref()) else {
            return;
        };

        let Some(cause) = render.halted() else {
            if self.context_lost {
                window.set_title(TITLE);
                self.context_lost = false;
            }
            return;
        };

        if !self.context_lost {
            log::error!("rendering halted: {cause}");
            window.set_title(&format!("{TITLE} (GPU context lost, rebuilding)"));
            self.context_lost = true;
        }

        match render.recover() {
            Ok(()) => {
                log::info!("rendering resumed");
                window.set_title(TITLE);
                self.context_lost = false;
            }
            Err(err) => log::warn!("gpu context rebuild failed: {err}"),
        }
    }
}

fn spawn_renderer(frames: FrameReceiver) -> Result<RenderHandle> {
    let handle = RenderThread::new(RenderThreadConfig::default()).spawn(frames, || {
        let backend = WgpuBackend::new(GpuInit::default())?;
        Ok((backend, PassthroughEffect::new()))
    })?;
    Ok(handle)
}

impl ApplicationHandler for Studio {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(err) = self.start(event_loop) {
            log::error!("studio startup failed: {err:#}");
            self.stop();
            event_loop.exit();
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        self.check_render_status();
        event_loop.set_control_flow(ControlFlow::WaitUntil(Instant::now() + STATUS_POLL));
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::Resized(size) => {
                let (Some(render), Some(handle)) = (self.render.as_ref(), self.surface) else {
                    return;
                };
                let (width, height) = (size.width as i32, size.height as i32);

                // Minimizing removes the preview; restoring registers it again.
                let result = match render.surface_changed(TargetId::preview(), width, height) {
                    Err(RenderError::NotFound(_)) if width > 0 && height > 0 => {
                        render.surface_created_with(TargetId::preview(), handle, width, height, preview_options())
                    }
                    other => other,
                };

                if let Err(err) = result {
                    log::warn!("preview resize to {width}x{height}: {err}");
                    if err.is_fatal() {
                        self.stop();
                        event_loop.exit();
                    }
                }
            }
            WindowEvent::CloseRequested => {
                self.stop();
                event_loop.exit();
            }
            _ => {}
        }
    }
}
