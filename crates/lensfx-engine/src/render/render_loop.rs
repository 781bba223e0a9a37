use crate::capture::CameraFrame;
use crate::device::{ContextState, GpuBackend, GpuContext};
use crate::error::{RenderError, Result};
use crate::render::{Effect, FrameReport, RenderStats};
use crate::surface::{
    BindingRelease, LifecycleOutcome, OutputSurface, RegisteredTarget, Registration, SurfaceEvent,
    SurfaceRegistry, TargetId, TargetOptions,
};
use crate::time::{FrameTime, FrameTimeline};

/// Per-frame driver: bind each active target, run the effect, present.
///
/// Target-scoped failures are isolated: a stale surface is unregistered and
/// skipped, an effect failure or dropped frame only affects that target.
/// Fatal errors (`ContextLost`, `PreconditionViolation`) halt the loop; every
/// later frame is refused with the same error until a new context is supplied
/// through [`RenderLoop::replace_context`].
pub struct RenderLoop<B: GpuBackend, E: Effect<B>> {
    registry: SurfaceRegistry,
    effect: E,
    timeline: FrameTimeline,
    last_frame: Option<FrameTime>,
    stats: RenderStats,
    halted: Option<RenderError>,
    gpu: GpuContext<B>,
}

impl<B: GpuBackend, E: Effect<B>> RenderLoop<B, E> {
    /// Builds and initializes the GPU context around `backend`.
    pub fn new(backend: B, effect: E) -> Result<Self> {
        Ok(Self::with_context(GpuContext::with_backend(backend)?, effect))
    }

    pub fn with_context(gpu: GpuContext<B>, effect: E) -> Self {
        Self {
            registry: SurfaceRegistry::new(),
            effect,
            timeline: FrameTimeline::new(),
            last_frame: None,
            stats: RenderStats::default(),
            halted: None,
            gpu,
        }
    }

    pub fn registry(&self) -> &SurfaceRegistry {
        &self.registry
    }

    pub fn context(&self) -> &GpuContext<B> {
        &self.gpu
    }

    pub fn context_mut(&mut self) -> &mut GpuContext<B> {
        &mut self.gpu
    }

    pub fn effect_mut(&mut self) -> &mut E {
        &mut self.effect
    }

    pub fn stats(&self) -> &RenderStats {
        &self.stats
    }

    /// Timing of the last accepted frame.
    pub fn last_frame(&self) -> Option<FrameTime> {
        self.last_frame
    }

    /// The fatal error that stopped the loop, if any.
    pub fn halted(&self) -> Option<&RenderError> {
        self.halted.as_ref()
    }

    pub fn register(&mut self, id: impl Into<TargetId>, surface: OutputSurface) -> Result<Registration> {
        self.registry.register(id.into(), surface, &mut self.gpu)
    }

    pub fn register_with(
        &mut self,
        id: impl Into<TargetId>,
        surface: OutputSurface,
        options: TargetOptions,
    ) -> Result<Registration> {
        self.registry.register_with(id.into(), surface, options, &mut self.gpu)
    }

    pub fn unregister(&mut self, id: &TargetId) -> Option<OutputSurface> {
        self.registry.unregister(id, &mut self.gpu)
    }

    /// Applies a hosting-lifecycle notification.
    pub fn apply_event(&mut self, event: SurfaceEvent) -> Result<LifecycleOutcome> {
        self.registry.apply_event(event, &mut self.gpu)
    }

    /// External context invalidation. Halts the loop.
    pub fn context_lost(&mut self, reason: impl Into<String>) -> RenderError {
        let reason = reason.into();
        self.gpu.invalidate(reason.clone());
        let err = RenderError::ContextLost(reason);
        self.halt(err.clone());
        err
    }

    /// Swaps in a freshly built context and resumes a halted loop.
    ///
    /// The old context is destroyed. Registered targets are kept and bound on
    /// the new context at their next frame. An uninitialized `gpu` is
    /// initialized first; any other state than ready is refused.
    pub fn replace_context(&mut self, mut gpu: GpuContext<B>) -> Result<()> {
        if gpu.state() == ContextState::Uninitialized {
            gpu.initialize()?;
        }
        if gpu.state() != ContextState::Ready {
            return Err(RenderError::PreconditionViolation(format!(
                "replacement context is {}",
                gpu.state()
            )));
        }

        self.gpu.destroy();
        self.gpu = gpu;
        for (_, surface) in self.registry.active_targets() {
            self.gpu.admit(surface);
        }

        if let Some(err) = self.halted.take() {
            log::info!("render loop resumed after: {err}");
        }
        Ok(())
    }

    /// Swaps the effect, returning the previous one. Needed alongside
    /// [`replace_context`](Self::replace_context) when the effect holds
    /// resources of the old device.
    pub fn replace_effect(&mut self, effect: E) -> E {
        std::mem::replace(&mut self.effect, effect)
    }

    /// Renders `frame` to every active target.
    ///
    /// `Ok` carries per-target outcomes. `Err` is either fatal (the loop is
    /// now halted) or `FrameOrder` (the frame was dropped, the loop continues).
    pub fn render_frame(&mut self, frame: &CameraFrame) -> Result<FrameReport> {
        self.render(frame, false)
    }

    /// Renders a frame that a newer queued frame already supersedes.
    ///
    /// Only lossless targets receive it; latest-wins targets are skipped and
    /// listed in [`FrameReport::superseded`].
    pub fn render_superseded_frame(&mut self, frame: &CameraFrame) -> Result<FrameReport> {
        self.render(frame, true)
    }

    /// Unregisters every target and destroys the context. Idempotent.
    pub fn destroy(&mut self) {
        self.registry.clear(&mut self.gpu);
        self.gpu.destroy();
    }

    fn render(&mut self, frame: &CameraFrame, superseded: bool) -> Result<FrameReport> {
        if let Some(err) = &self.halted {
            return Err(err.clone());
        }
        if self.gpu.state() == ContextState::Lost {
            let err = RenderError::ContextLost("context was invalidated".into());
            self.halt(err.clone());
            return Err(err);
        }

        self.stats.frames_received += 1;

        let time = match self.timeline.observe(frame.timestamp()) {
            Ok(time) => time,
            Err(err) => {
                self.stats.frames_out_of_order += 1;
                log::warn!("dropping frame: {err}");
                return Err(err);
            }
        };
        self.last_frame = Some(time);

        let mut report = FrameReport::new(frame.timestamp());

        for RegisteredTarget { id, surface, options } in self.registry.targets() {
            if superseded && !options.is_lossless() {
                report.superseded.push(id);
                continue;
            }

            match self.render_target(&surface, &options, frame, time) {
                Ok(()) => report.presented.push(id),

                Err(err) if err.is_fatal() => {
                    self.stats.record(&report);
                    self.halt(err.clone());
                    return Err(err);
                }

                Err(err @ RenderError::InvalidSurface(_)) => {
                    log::warn!("`{id}`: {err}; unregistering");
                    if self.registry.contains(&id, &surface) {
                        self.registry.unregister(&id, &mut self.gpu);
                    }
                    report.unregistered.push(id.clone());
                    report.failures.push((id, err));
                }

                Err(err) => {
                    log::warn!("`{id}`: skipped frame {:?}: {err}", frame.timestamp());
                    report.failures.push((id, err));
                }
            }
        }

        self.stats.record(&report);
        Ok(report)
    }

    fn render_target(
        &mut self,
        surface: &OutputSurface,
        options: &TargetOptions,
        frame: &CameraFrame,
        time: FrameTime,
    ) -> Result<()> {
        self.gpu.make_current(surface)?;

        let applied = {
            let mut target = self.gpu.target()?.with_frame(options.transform, time);
            self.effect.apply(frame, &mut target)
        };

        if let Err(err) = applied {
            self.gpu.abandon();
            return Err(RenderError::EffectFailure(err.to_string()));
        }

        self.gpu.present(surface)
    }

    fn halt(&mut self, err: RenderError) {
        log::error!("render loop halted: {err}");
        self.halted = Some(err);
    }
}
