use std::collections::{HashMap, VecDeque};
use std::fmt;

use super::{BackendError, GpuBackend};
use crate::error::{RenderError, Result};
use crate::render::RenderTarget;
use crate::surface::{BindingRelease, OutputSurface, SurfaceHandle, Viewport};

/// Lifecycle of a [`GpuContext`].
///
/// `Uninitialized -> Ready -> (Bound <-> Ready)* -> Lost | Destroyed`.
/// `Lost` can be entered from any live state and only `Destroyed` follows it.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ContextState {
    Uninitialized,
    Ready,
    Bound,
    Lost,
    Destroyed,
}

impl fmt::Display for ContextState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContextState::Uninitialized => "uninitialized",
            ContextState::Ready => "ready",
            ContextState::Bound => "bound",
            ContextState::Lost => "lost",
            ContextState::Destroyed => "destroyed",
        };
        f.write_str(name)
    }
}

struct Binding<P> {
    surface: OutputSurface,
    viewport: Viewport,
    pass: P,
}

/// Owns one GPU device and mediates every bind/present against it.
///
/// At most one surface is bound at a time, and only between `make_current`
/// and the matching `present` (or `abandon`). A surface is stale when its
/// handle was released and not admitted since, or when the registry admitted a
/// newer value for the same handle. Stale surfaces report `InvalidSurface`
/// instead of reaching the driver.
///
/// Dropping the context runs [`GpuContext::destroy`].
pub struct GpuContext<B: GpuBackend> {
    backend: B,
    state: ContextState,
    lost_reason: Option<String>,
    bound: Option<Binding<B::Pass>>,
    attached: HashMap<SurfaceHandle, OutputSurface>,
    /// Current value of every handle the registry admitted.
    admitted: HashMap<SurfaceHandle, OutputSurface>,
    /// Released handles not admitted since, oldest first.
    retired: VecDeque<SurfaceHandle>,
}

/// Released handles remembered for `InvalidSurface` reporting. Older ones are
/// forgotten; a dead native handle still fails in the backend.
const RETIRED_LIMIT: usize = 64;

impl<B: GpuBackend> GpuContext<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            state: ContextState::Uninitialized,
            lost_reason: None,
            bound: None,
            attached: HashMap::new(),
            admitted: HashMap::new(),
            retired: VecDeque::new(),
        }
    }

    /// Builds and initializes in one step.
    pub fn with_backend(backend: B) -> Result<Self> {
        let mut ctx = Self::new(backend);
        ctx.initialize()?;
        Ok(ctx)
    }

    /// `Uninitialized -> Ready`. Repeated calls on a ready context are no-ops.
    pub fn initialize(&mut self) -> Result<()> {
        match self.state {
            ContextState::Uninitialized => {}
            ContextState::Ready | ContextState::Bound => return Ok(()),
            ContextState::Lost => return Err(self.lost_error()),
            ContextState::Destroyed => {
                return Err(RenderError::PreconditionViolation(
                    "cannot initialize a destroyed context".into(),
                ));
            }
        }

        match self.backend.initialize() {
            Ok(()) => {
                self.state = ContextState::Ready;
                log::debug!("gpu context ready");
                Ok(())
            }
            Err(BackendError::ContextLost(reason)) => {
                self.mark_lost(reason);
                Err(self.lost_error())
            }
            Err(err) => Err(RenderError::Init(err.to_string())),
        }
    }

    pub fn state(&self) -> ContextState {
        self.state
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Surface bound by the last successful `make_current`, if still bound.
    pub fn bound_surface(&self) -> Option<OutputSurface> {
        self.bound.as_ref().map(|b| b.surface)
    }

    /// Viewport of the bound surface. Always equals its (width, height).
    pub fn viewport(&self) -> Option<Viewport> {
        self.bound.as_ref().map(|b| b.viewport)
    }

    /// Number of surfaces with a live GPU-side binding.
    pub fn live_bindings(&self) -> usize {
        self.attached.len()
    }

    /// Binds `surface` as the render target and sets the viewport to its size.
    ///
    /// Errors:
    /// - `ContextLost` once the device is gone
    /// - `PreconditionViolation` before `initialize`, after `destroy`, or while
    ///   another surface is still bound
    /// - `InvalidArgument` for a degenerate surface
    /// - `InvalidSurface` for a released surface or a dead native handle
    /// - `FrameDropped` when the swap chain has no image this time
    pub fn make_current(&mut self, surface: &OutputSurface) -> Result<Viewport> {
        self.ensure_live()?;

        if let Some(binding) = &self.bound {
            let msg = format!(
                "make_current({surface}) while {} is still bound",
                binding.surface
            );
            log::error!("{msg}");
            self.abort_pass();
            return Err(RenderError::PreconditionViolation(msg));
        }

        let viewport = surface.viewport().ok_or_else(|| {
            RenderError::InvalidArgument(format!("surface {surface} is not renderable"))
        })?;

        if self.is_stale(surface) {
            return Err(RenderError::InvalidSurface(*surface));
        }

        match self.attached.get(&surface.handle()).copied() {
            Some(current) if current == *surface => {}
            Some(stale) => {
                log::debug!("rebinding {stale} as {surface}");
                self.backend.detach(&stale);
                self.attached.remove(&stale.handle());
                self.attach(surface, viewport)?;
            }
            None => self.attach(surface, viewport)?,
        }

        let pass = match self.backend.begin(surface, viewport) {
            Ok(pass) => pass,
            Err(err) => return Err(self.backend_failure(surface, err)),
        };

        self.bound = Some(Binding {
            surface: *surface,
            viewport,
            pass,
        });
        self.state = ContextState::Bound;
        Ok(viewport)
    }

    /// Drawing handle for the bound surface.
    pub fn target(&mut self) -> Result<RenderTarget<'_, B>> {
        let Some(binding) = self.bound.as_mut() else {
            return Err(RenderError::PreconditionViolation(
                "no surface is bound".into(),
            ));
        };

        Ok(RenderTarget::new(
            &self.backend,
            &mut binding.pass,
            binding.surface,
            binding.viewport,
        ))
    }

    /// Publishes the frame rendered into the bound surface.
    ///
    /// A released surface reports `InvalidSurface` even when it is not the
    /// bound one. Presenting a different surface than the bound one is a
    /// `PreconditionViolation` and aborts the pending pass.
    pub fn present(&mut self, surface: &OutputSurface) -> Result<()> {
        self.ensure_live()?;

        if self.is_stale(surface) {
            if self.bound_surface() == Some(*surface) {
                self.abort_pass();
            }
            return Err(RenderError::InvalidSurface(*surface));
        }

        let binding = match self.bound.take() {
            Some(binding) if binding.surface == *surface => binding,
            Some(other) => {
                let msg = format!("present({surface}) while {} is bound", other.surface);
                log::error!("{msg}");
                self.bound = Some(other);
                self.abort_pass();
                return Err(RenderError::PreconditionViolation(msg));
            }
            None => {
                let msg = format!("present({surface}) without a preceding make_current");
                log::error!("{msg}");
                return Err(RenderError::PreconditionViolation(msg));
            }
        };

        self.state = ContextState::Ready;
        match self.backend.end(surface, binding.pass) {
            Ok(()) => Ok(()),
            Err(err) => Err(self.backend_failure(surface, err)),
        }
    }

    /// Drops the pending pass without presenting. Returns the surface that was bound.
    pub fn abandon(&mut self) -> Option<OutputSurface> {
        let surface = self.bound.as_ref().map(|b| b.surface)?;
        self.abort_pass();
        Some(surface)
    }

    /// Releases the GPU-side binding of `surface`. No-op if it was never bound.
    pub fn release(&mut self, surface: &OutputSurface) {
        if self.state == ContextState::Destroyed {
            return;
        }

        if self
            .bound
            .as_ref()
            .is_some_and(|b| b.surface.handle() == surface.handle())
        {
            self.abort_pass();
        }

        if let Some(attached) = self.attached.remove(&surface.handle()) {
            self.backend.detach(&attached);
            log::debug!("released binding for {attached}");
        }

        self.admitted.remove(&surface.handle());
        self.retire(surface.handle());
    }

    /// Whether `surface` may no longer be bound or presented.
    pub fn is_stale(&self, surface: &OutputSurface) -> bool {
        let handle = surface.handle();
        self.retired.contains(&handle)
            || self
                .admitted
                .get(&handle)
                .is_some_and(|current| current != surface)
    }

    /// External invalidation (app-lifecycle teardown, driver reset).
    pub fn invalidate(&mut self, reason: impl Into<String>) {
        if matches!(self.state, ContextState::Lost | ContextState::Destroyed) {
            return;
        }
        self.mark_lost(reason.into());
    }

    /// Tears down every binding and the device. Idempotent.
    ///
    /// Allowed from any state, including `Lost`. Afterwards no backend
    /// resource remains and every call but `destroy` fails.
    pub fn destroy(&mut self) {
        if self.state == ContextState::Destroyed {
            return;
        }

        if let Some(binding) = self.bound.take() {
            self.backend.abandon(&binding.surface, binding.pass);
        }
        for (_, surface) in self.attached.drain() {
            self.backend.detach(&surface);
        }
        self.backend.shutdown();
        self.admitted.clear();
        self.retired.clear();

        log::info!("gpu context destroyed (was {})", self.state);
        self.state = ContextState::Destroyed;
    }

    fn attach(&mut self, surface: &OutputSurface, viewport: Viewport) -> Result<()> {
        if let Err(err) = self.backend.attach(surface, viewport) {
            return Err(self.backend_failure(surface, err));
        }
        self.attached.insert(surface.handle(), *surface);
        log::debug!("attached {surface}");
        Ok(())
    }

    fn ensure_live(&mut self) -> Result<()> {
        if self.backend.is_lost()
            && !matches!(self.state, ContextState::Lost | ContextState::Destroyed)
        {
            self.mark_lost("device reported loss".into());
        }

        match self.state {
            ContextState::Ready | ContextState::Bound => Ok(()),
            ContextState::Lost => Err(self.lost_error()),
            ContextState::Uninitialized => Err(RenderError::PreconditionViolation(
                "context is not initialized".into(),
            )),
            ContextState::Destroyed => Err(RenderError::PreconditionViolation(
                "context has been destroyed".into(),
            )),
        }
    }

    fn retire(&mut self, handle: SurfaceHandle) {
        if self.retired.contains(&handle) {
            return;
        }
        self.retired.push_back(handle);
        if self.retired.len() > RETIRED_LIMIT {
            self.retired.pop_front();
        }
    }

    fn abort_pass(&mut self) {
        if let Some(binding) = self.bound.take() {
            self.backend.abandon(&binding.surface, binding.pass);
        }
        if self.state == ContextState::Bound {
            self.state = ContextState::Ready;
        }
    }

    fn mark_lost(&mut self, reason: String) {
        log::error!("gpu context lost: {reason}");
        if let Some(binding) = self.bound.take() {
            self.backend.abandon(&binding.surface, binding.pass);
        }
        self.lost_reason = Some(reason);
        self.state = ContextState::Lost;
    }

    fn lost_error(&self) -> RenderError {
        RenderError::ContextLost(
            self.lost_reason
                .clone()
                .unwrap_or_else(|| "context invalidated".into()),
        )
    }

    fn backend_failure(&mut self, surface: &OutputSurface, err: BackendError) -> RenderError {
        match err {
            BackendError::ContextLost(reason) => {
                self.mark_lost(reason);
                self.lost_error()
            }
            BackendError::SurfaceLost(reason) => {
                log::warn!("surface {surface} lost: {reason}");
                self.release(surface);
                RenderError::InvalidSurface(*surface)
            }
            BackendError::Transient(reason) => RenderError::FrameDropped(reason),
        }
    }
}

impl<B: GpuBackend> BindingRelease for GpuContext<B> {
    fn release(&mut self, surface: &OutputSurface) {
        GpuContext::release(self, surface);
    }

    fn admit(&mut self, surface: &OutputSurface) {
        let handle = surface.handle();
        self.retired.retain(|h| *h != handle);
        self.admitted.insert(handle, *surface);
    }
}

impl<B: GpuBackend> Drop for GpuContext<B> {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl<B: GpuBackend> fmt::Debug for GpuContext<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GpuContext")
            .field("state", &self.state)
            .field("bound", &self.bound_surface())
            .field("attached", &self.attached.len())
            .finish()
    }
}
