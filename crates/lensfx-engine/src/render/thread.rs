use std::ops::ControlFlow;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use parking_lot::RwLock;

use crate::capture::{CameraFrame, FrameReceiver};
use crate::device::{ContextState, GpuBackend, GpuContext};
use crate::error::{RenderError, Result};
use crate::render::{Effect, FrameReport, RenderLoop, RenderStats};
use crate::surface::{
    LifecycleOutcome, OutputSurface, SurfaceEvent, SurfaceHandle, TargetId, TargetOptions,
};
use crate::time::FrameTime;

/// Render thread parameters.
#[derive(Debug, Clone)]
pub struct RenderThreadConfig {
    /// Thread name; shows up in log lines and debuggers.
    pub name: String,

    /// Pending lifecycle requests before callers block.
    pub command_capacity: usize,

    /// How long the thread waits for a frame or command before refreshing status.
    pub idle_poll: Duration,
}

impl Default for RenderThreadConfig {
    fn default() -> Self {
        Self {
            name: "lensfx-render".into(),
            command_capacity: 16,
            idle_poll: Duration::from_millis(100),
        }
    }
}

/// Snapshot published by the render thread after every command and frame.
#[derive(Debug, Clone)]
pub struct RenderStatus {
    pub running: bool,
    pub context: ContextState,
    pub targets: Vec<(TargetId, OutputSurface)>,
    pub stats: RenderStats,
    /// Timing of the last frame the loop accepted.
    pub last_frame: Option<FrameTime>,
    /// Most recent frame with a failing or unregistered target.
    pub last_failed_frame: Option<FrameReport>,
    /// Fatal error that stopped rendering. Cleared by a successful
    /// [`RenderHandle::recover`].
    pub halted: Option<RenderError>,
}

impl Default for RenderStatus {
    fn default() -> Self {
        Self {
            running: false,
            context: ContextState::Uninitialized,
            targets: Vec::new(),
            stats: RenderStats::default(),
            last_frame: None,
            last_failed_frame: None,
            halted: None,
        }
    }
}

/// Final state handed back by [`RenderHandle::shutdown`].
#[derive(Debug, Clone)]
pub struct RenderSummary {
    pub stats: RenderStats,
    pub halted: Option<RenderError>,
}

enum Command {
    Surface(SurfaceEvent, Sender<Result<LifecycleOutcome>>),
    ContextLost(String),
    Recover(Sender<Result<()>>),
    Shutdown,
}

/// Builder for the thread that owns the GPU context.
///
/// Every GPU call, registry mutation and present runs on that one thread.
/// Lifecycle requests are queued behind each other and applied between
/// frames, so a frame is never presented to a surface after its unregister
/// was acknowledged.
#[derive(Debug, Clone, Default)]
pub struct RenderThread {
    config: RenderThreadConfig,
}

impl RenderThread {
    pub fn new(config: RenderThreadConfig) -> Self {
        Self { config }
    }

    /// Starts the thread. `factory` runs on it and builds the backend and
    /// effect, so neither has to be `Send`. It runs again for every
    /// [`RenderHandle::recover`].
    pub fn spawn<B, E, F>(self, frames: FrameReceiver, factory: F) -> Result<RenderHandle>
    where
        B: GpuBackend + 'static,
        E: Effect<B> + 'static,
        F: FnMut() -> anyhow::Result<(B, E)> + Send + 'static,
    {
        let (commands_tx, commands_rx) = crossbeam_channel::bounded(self.config.command_capacity.max(1));
        let status = Arc::new(RwLock::new(RenderStatus::default()));

        let thread_status = Arc::clone(&status);
        let idle_poll = self.config.idle_poll;
        let join = std::thread::Builder::new()
            .name(self.config.name.clone())
            .spawn(move || run(factory, frames, commands_rx, thread_status, idle_poll))
            .map_err(|e| RenderError::Init(format!("failed to spawn render thread: {e}")))?;

        Ok(RenderHandle {
            commands: commands_tx,
            status,
            join: Some(join),
        })
    }
}

/// Caller-side handle to a running render thread.
///
/// Lifecycle calls block until the render thread has applied them. Once the
/// thread has stopped they fail with the error that stopped it, or
/// `Released` after a regular shutdown.
pub struct RenderHandle {
    commands: Sender<Command>,
    status: Arc<RwLock<RenderStatus>>,
    join: Option<JoinHandle<RenderSummary>>,
}

impl RenderHandle {
    /// `surface-created(id, handle, width, height)`.
    pub fn surface_created(
        &self,
        id: impl Into<TargetId>,
        handle: SurfaceHandle,
        width: i32,
        height: i32,
    ) -> Result<LifecycleOutcome> {
        self.request(SurfaceEvent::created(id, handle, width, height))
    }

    /// `surface-created` with explicit delivery policy and transform.
    pub fn surface_created_with(
        &self,
        id: impl Into<TargetId>,
        handle: SurfaceHandle,
        width: i32,
        height: i32,
        options: TargetOptions,
    ) -> Result<LifecycleOutcome> {
        self.request(SurfaceEvent::created_with(id, handle, width, height, options))
    }

    /// `surface-changed(id, width, height)`.
    pub fn surface_changed(&self, id: impl Into<TargetId>, width: i32, height: i32) -> Result<LifecycleOutcome> {
        self.request(SurfaceEvent::changed(id, width, height))
    }

    /// `surface-destroyed(id)`. When this returns, no further frame reaches the surface.
    pub fn surface_destroyed(&self, id: impl Into<TargetId>) -> Result<LifecycleOutcome> {
        self.request(SurfaceEvent::destroyed(id))
    }

    /// Applies any lifecycle event.
    pub fn request(&self, event: SurfaceEvent) -> Result<LifecycleOutcome> {
        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        self.commands
            .send(Command::Surface(event, reply_tx))
            .map_err(|_| self.closed_error())?;
        reply_rx.recv().map_err(|_| self.closed_error())?
    }

    /// Reports that the platform tore down the GPU context.
    ///
    /// Rendering halts with `ContextLost` until [`recover`](Self::recover)
    /// succeeds. Lifecycle requests keep working in the meantime.
    pub fn context_lost(&self, reason: impl Into<String>) -> Result<()> {
        self.commands
            .send(Command::ContextLost(reason.into()))
            .map_err(|_| self.closed_error())
    }

    /// Rebuilds backend and effect with the spawn factory and resumes
    /// rendering to the registered targets.
    ///
    /// On failure rendering stays halted and the factory error is returned as
    /// `Init`. A no-op while rendering is not halted.
    pub fn recover(&self) -> Result<()> {
        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        self.commands
            .send(Command::Recover(reply_tx))
            .map_err(|_| self.closed_error())?;
        reply_rx.recv().map_err(|_| self.closed_error())?
    }

    pub fn status(&self) -> RenderStatus {
        self.status.read().clone()
    }

    pub fn is_running(&self) -> bool {
        self.status.read().running
    }

    /// The error rendering is halted on, if any.
    pub fn halted(&self) -> Option<RenderError> {
        self.status.read().halted.clone()
    }

    /// Stops the thread after the in-flight frame and waits for it.
    ///
    /// The context is destroyed before this returns. A second call reports `Released`.
    pub fn shutdown(&mut self) -> Result<RenderSummary> {
        let Some(join) = self.join.take() else {
            return Err(RenderError::Released);
        };

        // Fails only if the thread already stopped on its own.
        let _ = self.commands.send(Command::Shutdown);

        join.join().map_err(|_| {
            log::error!("render thread panicked");
            RenderError::Released
        })
    }

    fn closed_error(&self) -> RenderError {
        self.status
            .read()
            .halted
            .clone()
            .unwrap_or(RenderError::Released)
    }
}

impl Drop for RenderHandle {
    fn drop(&mut self) {
        if self.join.is_some() {
            let _ = self.shutdown();
        }
    }
}

fn build<B, E, F>(factory: &mut F) -> Result<(GpuContext<B>, E)>
where
    B: GpuBackend,
    F: FnMut() -> anyhow::Result<(B, E)>,
{
    let (backend, effect) = factory().map_err(|e| RenderError::Init(format!("{e:#}")))?;
    Ok((GpuContext::with_backend(backend)?, effect))
}

fn run<B, E, F>(
    mut factory: F,
    frames: FrameReceiver,
    commands: Receiver<Command>,
    status: Arc<RwLock<RenderStatus>>,
    idle_poll: Duration,
) -> RenderSummary
where
    B: GpuBackend,
    E: Effect<B>,
    F: FnMut() -> anyhow::Result<(B, E)>,
{
    match build(&mut factory) {
        Ok((gpu, effect)) => Worker {
            render_loop: RenderLoop::with_context(gpu, effect),
            factory,
            frames,
            commands,
            status,
            idle_poll,
            last_failed_frame: None,
        }
        .run(),
        Err(err) => {
            log::error!("render thread failed to start: {err}");
            status.write().halted = Some(err.clone());
            RenderSummary {
                stats: RenderStats::default(),
                halted: Some(err),
            }
        }
    }
}

/// State owned by the render thread.
struct Worker<B: GpuBackend, E: Effect<B>, F> {
    render_loop: RenderLoop<B, E>,
    factory: F,
    frames: FrameReceiver,
    commands: Receiver<Command>,
    status: Arc<RwLock<RenderStatus>>,
    idle_poll: Duration,
    last_failed_frame: Option<FrameReport>,
}

impl<B, E, F> Worker<B, E, F>
where
    B: GpuBackend,
    E: Effect<B>,
    F: FnMut() -> anyhow::Result<(B, E)>,
{
    fn run(mut self) -> RenderSummary {
        log::info!("render thread started");
        self.publish(true);

        let never = crossbeam_channel::never();
        let mut frames_open = true;

        loop {
            // Lifecycle changes go first so the next frame sees them.
            if self.drain_commands().is_break() {
                break;
            }

            let commands = self.commands.clone();
            let frames = if frames_open { self.frames.channel().clone() } else { never.clone() };

            let step = crossbeam_channel::select! {
                recv(commands) -> cmd => match cmd {
                    Ok(cmd) => self.apply(cmd),
                    Err(_) => ControlFlow::Break(()),
                },
                recv(frames) -> frame => {
                    match frame {
                        Ok(frame) => self.render(&frame),
                        Err(_) => {
                            log::info!("frame source closed");
                            frames_open = false;
                        }
                    }
                    ControlFlow::Continue(())
                },
                default(self.idle_poll) => ControlFlow::Continue(()),
            };

            if step.is_break() {
                break;
            }
            self.publish(true);
        }

        let halted = self.render_loop.halted().cloned();
        self.render_loop.destroy();
        self.publish(false);

        let stats = self.status.read().stats.clone();
        log::info!("render thread stopped after {} frames", stats.frames_presented);

        RenderSummary { stats, halted }
    }

    fn drain_commands(&mut self) -> ControlFlow<()> {
        while let Ok(cmd) = self.commands.try_recv() {
            if self.apply(cmd).is_break() {
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    fn apply(&mut self, cmd: Command) -> ControlFlow<()> {
        match cmd {
            Command::Surface(event, reply) => {
                log::debug!("lifecycle: {event:?}");
                let outcome = self.render_loop.apply_event(event);
                if let Err(err) = &outcome {
                    log::warn!("lifecycle request failed: {err}");
                }
                // Callers may read the status as soon as they get the reply.
                self.publish(true);
                let _ = reply.send(outcome);
            }
            Command::ContextLost(reason) => {
                self.render_loop.context_lost(reason);
            }
            Command::Recover(reply) => {
                let outcome = self.recover();
                self.publish(true);
                let _ = reply.send(outcome);
            }
            Command::Shutdown => {
                log::info!("shutdown requested");
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    fn recover(&mut self) -> Result<()> {
        let Some(cause) = self.render_loop.halted().cloned() else {
            return Ok(());
        };
        log::info!("rebuilding gpu context after: {cause}");

        let (gpu, effect) = build(&mut self.factory).inspect_err(|err| {
            log::error!("gpu context rebuild failed: {err}");
        })?;
        // The old effect may hold resources of the old device; drop it with it.
        drop(self.render_loop.replace_effect(effect));
        self.render_loop.replace_context(gpu)
    }

    fn render(&mut self, frame: &CameraFrame) {
        // A newer frame already queued means latest-wins targets can skip this one.
        let result = if self.frames.has_pending() {
            self.render_loop.render_superseded_frame(frame)
        } else {
            self.render_loop.render_frame(frame)
        };

        match result {
            Ok(report) if !report.is_clean() || !report.unregistered.is_empty() => {
                self.last_failed_frame = Some(report);
            }
            Ok(_) => {}
            Err(err) => log::trace!("frame {:?} not rendered: {err}", frame.timestamp()),
        }
    }

    fn publish(&self, running: bool) {
        self.frames
            .set_lossless(self.render_loop.registry().requires_lossless());

        let mut status = self.status.write();
        status.running = running;
        status.context = self.render_loop.context().state();
        status.targets = self.render_loop.registry().snapshot();
        status.stats = self.render_loop.stats().clone();
        status.stats.frames_replaced = self.frames.dropped();
        status.last_frame = self.render_loop.last_frame();
        status.last_failed_frame = self.last_failed_frame.clone();
        status.halted = self.render_loop.halted().cloned();
    }
}

#[cfg(test)]
mod tests {
    use std::ffi::c_void;
    use std::time::Instant;

    use super::*;
    use crate::capture::{frame_channel, FrameSender, DEFAULT_FRAME_QUEUE};
    use crate::device::{BackendCall, HeadlessBackend, HeadlessJournal};
    use crate::render::{EffectError, RenderTarget};
    use crate::surface::Registration;

    #[derive(Clone)]
    struct Stamp;

    impl Effect<HeadlessBackend> for Stamp {
        fn apply(
            &mut self,
            frame: &CameraFrame,
            target: &mut RenderTarget<'_, HeadlessBackend>,
        ) -> std::result::Result<(), EffectError> {
            target.pass().draw(frame.timestamp());
            Ok(())
        }
    }

    /// Stamps after a fixed delay, slower than the producer.
    #[derive(Clone)]
    struct Slow(Duration);

    impl Effect<HeadlessBackend> for Slow {
        fn apply(
            &mut self,
            frame: &CameraFrame,
            target: &mut RenderTarget<'_, HeadlessBackend>,
        ) -> std::result::Result<(), EffectError> {
            std::thread::sleep(self.0);
            target.pass().draw(frame.timestamp());
            Ok(())
        }
    }

    fn handle(addr: usize) -> SurfaceHandle {
        SurfaceHandle::from_android_window(addr as *mut c_void).unwrap()
    }

    fn frame(ms: u64) -> CameraFrame {
        CameraFrame::rgba(Duration::from_millis(ms), 1, 1, vec![0, 0, 0, 255]).unwrap()
    }

    fn ms_range(range: std::ops::RangeInclusive<u64>) -> Vec<Duration> {
        range.map(Duration::from_millis).collect()
    }

    /// Every backend the factory builds, first or rebuilt, logs into one journal.
    fn spawn_with<E>(effect: E) -> (RenderHandle, FrameSender, HeadlessJournal)
    where
        E: Effect<HeadlessBackend> + Clone + Send + 'static,
    {
        let journal = HeadlessJournal::default();
        let shared = journal.clone();
        let (tx, rx) = frame_channel(DEFAULT_FRAME_QUEUE);
        let handle = RenderThread::default()
            .spawn(rx, move || {
                Ok((HeadlessBackend::with_journal(shared.clone()), effect.clone()))
            })
            .unwrap();
        (handle, tx, journal)
    }

    fn spawn() -> (RenderHandle, FrameSender, HeadlessJournal) {
        spawn_with(Stamp)
    }

    fn wait_for(mut cond: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !cond() {
            assert!(Instant::now() < deadline, "condition not reached in time");
            std::thread::sleep(Duration::from_millis(2));
        }
    }

    // ── lifecycle ─────────────────────────────────────────────────────────

    #[test]
    fn frames_reach_registered_targets_in_order() {
        let (mut rt, tx, journal) = spawn();

        let outcome = rt.surface_created("record", handle(0x20), 640, 480).unwrap();
        assert_eq!(outcome, LifecycleOutcome::Registered(Registration::Inserted));

        for ms in 1..=20 {
            tx.send(frame(ms)).unwrap();
        }
        wait_for(|| journal.presented_frames(handle(0x20)).len() == 20);
        assert_eq!(journal.presented_frames(handle(0x20)), ms_range(1..=20));

        let summary = rt.shutdown().unwrap();
        assert_eq!(summary.stats.presented_to(&TargetId::record()), 20);
        assert!(summary.halted.is_none());
    }

    #[test]
    fn no_frame_reaches_a_surface_after_destroy_is_acknowledged() {
        let (mut rt, tx, journal) = spawn();
        rt.surface_created("preview", handle(0x10), 640, 480).unwrap();

        tx.send(frame(1)).unwrap();
        wait_for(|| journal.presented_frames(handle(0x10)).len() == 1);

        rt.surface_destroyed("preview").unwrap();
        let presents = journal.presented_frames(handle(0x10)).len();

        for ms in 2..10 {
            tx.send(frame(ms)).unwrap();
        }
        wait_for(|| rt.status().stats.frames_received >= 2);
        rt.shutdown().unwrap();

        assert_eq!(journal.presented_frames(handle(0x10)).len(), presents);
    }

    #[test]
    fn changed_for_unknown_target_reports_not_found() {
        let (rt, _tx, _) = spawn();
        let err = rt.surface_changed("record", 640, 480).unwrap_err();
        assert!(matches!(err, RenderError::NotFound(_)));
    }

    #[test]
    fn status_lists_registered_targets() {
        let (rt, _tx, _) = spawn();
        rt.surface_created("record", handle(0x20), 1280, 720).unwrap();
        rt.surface_created("preview", handle(0x10), 1920, 1080).unwrap();

        let status = rt.status();
        assert!(status.running);
        let ids: Vec<_> = status.targets.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["preview", "record"]);
    }

    // ── delivery ──────────────────────────────────────────────────────────

    #[test]
    fn slow_effect_still_records_every_frame() {
        let (mut rt, tx, journal) = spawn_with(Slow(Duration::from_millis(5)));
        rt.surface_created("preview", handle(0x10), 640, 480).unwrap();
        rt.surface_created("record", handle(0x20), 640, 480).unwrap();

        for ms in 1..=30 {
            tx.send(frame(ms)).unwrap();
        }
        wait_for(|| journal.presented_frames(handle(0x20)).len() == 30);
        wait_for(|| journal.presented_frames(handle(0x10)).last() == Some(&Duration::from_millis(30)));

        assert_eq!(journal.presented_frames(handle(0x20)), ms_range(1..=30));
        let preview = journal.presented_frames(handle(0x10));
        assert!(preview.windows(2).all(|w| w[0] < w[1]));

        let summary = rt.shutdown().unwrap();
        assert_eq!(summary.stats.frames_replaced, 0);
        assert_eq!(summary.stats.frames_received, 30);
    }

    #[test]
    fn preview_alone_keeps_only_fresh_frames() {
        let (mut rt, tx, journal) = spawn_with(Slow(Duration::from_millis(5)));
        rt.surface_created("preview", handle(0x10), 640, 480).unwrap();

        for ms in 1..=30 {
            tx.send(frame(ms)).unwrap();
        }
        wait_for(|| journal.presented_frames(handle(0x10)).last() == Some(&Duration::from_millis(30)));

        let summary = rt.shutdown().unwrap();
        assert!(summary.stats.presented_to(&TargetId::preview()) < 30);
    }

    #[test]
    fn failed_frame_is_published() {
        let (rt, tx, journal) = spawn();
        rt.surface_created("preview", handle(0x10), 640, 480).unwrap();
        rt.surface_created("record", handle(0x20), 640, 480).unwrap();
        assert!(rt.status().last_failed_frame.is_none());

        journal.invalidate_handle(handle(0x20));
        tx.send(frame(1)).unwrap();
        wait_for(|| rt.status().last_failed_frame.is_some());

        let report = rt.status().last_failed_frame.unwrap();
        assert_eq!(report.timestamp, Duration::from_millis(1));
        assert_eq!(report.unregistered, vec![TargetId::record()]);
        assert!(matches!(report.failure(&TargetId::record()), Some(RenderError::InvalidSurface(_))));
        assert_eq!(report.presented, vec![TargetId::preview()]);
    }

    // ── shutdown / loss ───────────────────────────────────────────────────

    #[test]
    fn shutdown_destroys_context_and_refuses_later_calls() {
        let (mut rt, tx, journal) = spawn();
        rt.surface_created("preview", handle(0x10), 640, 480).unwrap();
        tx.send(frame(1)).unwrap();
        wait_for(|| journal.presents_to(&OutputSurface::new(handle(0x10), 640, 480)) == 1);

        rt.shutdown().unwrap();

        assert_eq!(journal.live_bindings(), 0);
        assert_eq!(journal.count(|c| *c == BackendCall::Shutdown), 1);
        assert!(!rt.is_running());
        assert!(matches!(rt.shutdown(), Err(RenderError::Released)));
        assert!(matches!(
            rt.surface_created("preview", handle(0x30), 640, 480),
            Err(RenderError::Released)
        ));
        assert!(matches!(tx.send(frame(2)), Err(RenderError::Released)));
    }

    #[test]
    fn context_loss_halts_rendering_and_is_reported() {
        let (mut rt, tx, journal) = spawn();
        rt.surface_created("preview", handle(0x10), 640, 480).unwrap();

        rt.context_lost("activity destroyed").unwrap();
        wait_for(|| rt.halted().is_some());

        assert!(matches!(rt.halted(), Some(RenderError::ContextLost(_))));
        assert!(rt.is_running());

        tx.send(frame(1)).unwrap();
        let summary = rt.shutdown().unwrap();
        assert_eq!(journal.presents_to(&OutputSurface::new(handle(0x10), 640, 480)), 0);
        assert!(matches!(summary.halted, Some(RenderError::ContextLost(_))));
        assert_eq!(journal.live_bindings(), 0);
    }

    #[test]
    fn lost_context_is_rebuilt_and_rendering_resumes() {
        let (mut rt, tx, journal) = spawn();
        rt.surface_created("preview", handle(0x10), 640, 480).unwrap();
        tx.send(frame(1)).unwrap();
        wait_for(|| journal.presented_frames(handle(0x10)).len() == 1);

        journal.lose_context("device removed");
        tx.send(frame(2)).unwrap();
        wait_for(|| rt.halted().is_some());
        assert!(matches!(rt.halted(), Some(RenderError::ContextLost(_))));

        // Targets can still come and go while halted.
        rt.surface_created("record", handle(0x20), 640, 480).unwrap();

        journal.restore_device();
        rt.recover().unwrap();
        assert!(rt.halted().is_none());
        assert_eq!(rt.status().context, ContextState::Ready);
        assert_eq!(journal.count(|c| *c == BackendCall::Initialize), 2);

        tx.send(frame(3)).unwrap();
        wait_for(|| journal.presented_frames(handle(0x20)) == vec![Duration::from_millis(3)]);
        assert_eq!(
            journal.presented_frames(handle(0x10)),
            vec![Duration::from_millis(1), Duration::from_millis(3)]
        );

        let summary = rt.shutdown().unwrap();
        assert!(summary.halted.is_none());
        assert_eq!(journal.live_bindings(), 0);
    }

    #[test]
    fn failed_rebuild_stays_halted() {
        let (_tx, rx) = frame_channel(DEFAULT_FRAME_QUEUE);
        let mut builds = 0;
        let rt = RenderThread::default()
            .spawn(rx, move || {
                builds += 1;
                if builds > 1 {
                    anyhow::bail!("adapter unavailable");
                }
                Ok((HeadlessBackend::new(), Stamp))
            })
            .unwrap();

        rt.context_lost("activity destroyed").unwrap();
        let err = rt.recover().unwrap_err();
        assert!(matches!(err, RenderError::Init(msg) if msg.contains("adapter unavailable")));
        assert!(matches!(rt.halted(), Some(RenderError::ContextLost(_))));
        assert!(rt.is_running());
    }

    #[test]
    fn recover_without_loss_is_a_noop() {
        let (rt, _tx, journal) = spawn();
        rt.recover().unwrap();
        assert_eq!(journal.count(|c| *c == BackendCall::Initialize), 1);
    }

    #[test]
    fn failing_factory_surfaces_init_error() {
        let (_tx, rx) = frame_channel(DEFAULT_FRAME_QUEUE);
        let mut rt = RenderThread::default()
            .spawn(rx, || -> anyhow::Result<(HeadlessBackend, Stamp)> {
                anyhow::bail!("no adapter")
            })
            .unwrap();

        let summary = rt.shutdown().unwrap();
        assert!(matches!(summary.halted, Some(RenderError::Init(msg)) if msg.contains("no adapter")));
    }
}
