use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use parking_lot::Mutex;

use super::surface::{choose_alpha_mode, choose_present_mode, choose_surface_format, map_surface_error};
use super::{BackendError, GpuBackend, GpuInit};
use crate::surface::{OutputSurface, SurfaceHandle, Viewport};

/// Swap chain of one attached output surface.
struct SurfaceSlot {
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
}

/// Real GPU backend on top of wgpu.
///
/// Owns the Instance/Adapter/Device/Queue and one configured swap chain per
/// attached native surface. Surfaces are created from raw handles, so the
/// host must keep each native window alive until its target is unregistered.
pub struct WgpuBackend {
    /// wgpu instance used to create the adapter and surfaces.
    instance: wgpu::Instance,

    /// Selected adapter.
    adapter: wgpu::Adapter,

    /// Logical device.
    device: wgpu::Device,

    /// Command queue.
    queue: wgpu::Queue,

    init: GpuInit,

    surfaces: HashMap<SurfaceHandle, SurfaceSlot>,

    /// Set from the device-lost callback, which may run on any thread.
    lost: Arc<Mutex<Option<String>>>,
}

/// One acquired swap-chain image plus the encoder recording into it.
///
/// This object is short-lived and must be finalized promptly. Holding the surface
/// texture prevents acquisition of subsequent frames.
pub struct WgpuPass {
    pub surface_texture: wgpu::SurfaceTexture,
    pub view: wgpu::TextureView,
    pub encoder: wgpu::CommandEncoder,
    pub format: wgpu::TextureFormat,
}

impl WgpuBackend {
    /// Blocking constructor; runs adapter/device acquisition on the calling thread.
    pub fn new(init: GpuInit) -> Result<Self> {
        pollster::block_on(Self::new_async(init))
    }

    /// Adapter/device acquisition is asynchronous under wgpu.
    pub async fn new_async(init: GpuInit) -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: init.backends,
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: init.power_preference,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .context("failed to find a suitable GPU adapter")?;

        let info = adapter.get_info();
        log::info!("using adapter {} ({:?})", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("lensfx-engine device"),
                required_features: init.required_features,
                required_limits: init.required_limits.clone(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create wgpu device/queue")?;

        let lost = Arc::new(Mutex::new(None));
        let flag = Arc::clone(&lost);
        device.set_device_lost_callback(move |reason, message| {
            *flag.lock() = Some(format!("{reason:?}: {message}"));
        });

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
            init,
            surfaces: HashMap::new(),
            lost,
        })
    }

    /// Returns a reference to the logical device.
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// Returns a reference to the command queue.
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Swap-chain format of an attached surface.
    pub fn surface_format(&self, handle: &SurfaceHandle) -> Option<wgpu::TextureFormat> {
        self.surfaces.get(handle).map(|slot| slot.config.format)
    }

    fn lost_reason(&self) -> Option<String> {
        self.lost.lock().clone()
    }
}

impl GpuBackend for WgpuBackend {
    type Pass = WgpuPass;

    fn is_lost(&self) -> bool {
        self.lost.lock().is_some()
    }

    fn attach(&mut self, surface: &OutputSurface, viewport: Viewport) -> Result<(), BackendError> {
        if let Some(reason) = self.lost_reason() {
            return Err(BackendError::ContextLost(reason));
        }

        let handle = surface.handle();
        let target = wgpu::SurfaceTargetUnsafe::RawHandle {
            raw_display_handle: handle.raw_display_handle(),
            raw_window_handle: handle.raw_window_handle(),
        };

        // SAFETY: the registry only holds handles of live native windows, and
        // the host unregisters a target before destroying its window, which
        // detaches (and drops) this surface first.
        let wgpu_surface = unsafe { self.instance.create_surface_unsafe(target) }
            .map_err(|e| BackendError::SurfaceLost(e.to_string()))?;

        let caps = wgpu_surface.get_capabilities(&self.adapter);
        let format = choose_surface_format(&caps, self.init.prefer_srgb)
            .ok_or_else(|| BackendError::SurfaceLost(format!("{surface} has no supported formats")))?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: viewport.width,
            height: viewport.height,
            present_mode: choose_present_mode(&caps, self.init.present_mode),
            alpha_mode: choose_alpha_mode(&caps, self.init.alpha_mode),
            view_formats: vec![],
            desired_maximum_frame_latency: self.init.desired_maximum_frame_latency,
        };

        wgpu_surface.configure(&self.device, &config);
        log::debug!("configured {surface} as {format:?}");

        self.surfaces.insert(
            handle,
            SurfaceSlot {
                surface: wgpu_surface,
                config,
            },
        );
        Ok(())
    }

    fn begin(&mut self, surface: &OutputSurface, viewport: Viewport) -> Result<WgpuPass, BackendError> {
        if let Some(reason) = self.lost_reason() {
            return Err(BackendError::ContextLost(reason));
        }

        let slot = self
            .surfaces
            .get_mut(&surface.handle())
            .ok_or_else(|| BackendError::SurfaceLost(format!("{surface} is not attached")))?;

        if slot.config.width != viewport.width || slot.config.height != viewport.height {
            slot.config.width = viewport.width;
            slot.config.height = viewport.height;
            slot.surface.configure(&self.device, &slot.config);
        }

        let surface_texture = slot
            .surface
            .get_current_texture()
            .map_err(|err| map_surface_error(&slot.surface, &self.device, &slot.config, err))?;

        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("lensfx frame encoder"),
            });

        Ok(WgpuPass {
            surface_texture,
            view,
            encoder,
            format: slot.config.format,
        })
    }

    fn end(&mut self, _surface: &OutputSurface, pass: WgpuPass) -> Result<(), BackendError> {
        if let Some(reason) = self.lost_reason() {
            return Err(BackendError::ContextLost(reason));
        }

        self.queue.submit(std::iter::once(pass.encoder.finish()));
        drop(pass.view);
        pass.surface_texture.present();
        Ok(())
    }

    fn abandon(&mut self, _surface: &OutputSurface, pass: WgpuPass) {
        // An unpresented surface texture is discarded on drop.
        drop(pass);
    }

    fn detach(&mut self, surface: &OutputSurface) {
        if self.surfaces.remove(&surface.handle()).is_some() {
            log::debug!("dropped swap chain for {surface}");
        }
    }

    fn shutdown(&mut self) {
        self.surfaces.clear();
        if let Err(err) = self.device.poll(wgpu::PollType::wait_indefinitely()) {
            log::warn!("device poll during shutdown failed: {err}");
        }
    }
}
