use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::{BackendError, GpuBackend};
use crate::surface::{OutputSurface, SurfaceHandle, Viewport};

/// One call received by a [`HeadlessBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    Initialize,
    Attach(OutputSurface),
    Begin(OutputSurface, Viewport),
    End {
        surface: OutputSurface,
        frame: Option<Duration>,
    },
    Abandon(OutputSurface),
    Detach(OutputSurface),
    Shutdown,
}

#[derive(Debug, Default)]
struct JournalState {
    calls: Vec<BackendCall>,
    live: HashSet<SurfaceHandle>,
    dead_handles: HashSet<SurfaceHandle>,
    lost: Option<String>,
    transient: Vec<String>,
}

/// Shared view into a [`HeadlessBackend`]: call log plus fault injection.
///
/// Clones observe the same backend, so a test can keep one after moving the
/// backend into a context or onto the render thread.
#[derive(Debug, Clone, Default)]
pub struct HeadlessJournal {
    state: Arc<Mutex<JournalState>>,
}

impl HeadlessJournal {
    pub fn calls(&self) -> Vec<BackendCall> {
        self.state.lock().calls.clone()
    }

    pub fn clear(&self) {
        self.state.lock().calls.clear();
    }

    pub fn count(&self, pred: impl Fn(&BackendCall) -> bool) -> usize {
        self.state.lock().calls.iter().filter(|c| pred(c)).count()
    }

    /// Presents that reached `surface`.
    pub fn presents_to(&self, surface: &OutputSurface) -> usize {
        self.count(|c| matches!(c, BackendCall::End { surface: s, .. } if s == surface))
    }

    /// Frame timestamps presented to any surface with this handle, in order.
    pub fn presented_frames(&self, handle: SurfaceHandle) -> Vec<Duration> {
        self.state
            .lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                BackendCall::End { surface, frame } if surface.handle() == handle => *frame,
                _ => None,
            })
            .collect()
    }

    /// Surfaces with an attached swap chain right now.
    pub fn live_bindings(&self) -> usize {
        self.state.lock().live.len()
    }

    /// Simulates the native window behind `handle` going away.
    pub fn invalidate_handle(&self, handle: SurfaceHandle) {
        self.state.lock().dead_handles.insert(handle);
    }

    /// Simulates device loss; every later call fails with `ContextLost`.
    pub fn lose_context(&self, reason: impl Into<String>) {
        self.state.lock().lost = Some(reason.into());
    }

    /// Brings a lost device back, as a driver reset would. Only a context
    /// built on a fresh backend sees the difference.
    pub fn restore_device(&self) {
        self.state.lock().lost = None;
    }

    /// The next `begin` reports a transient failure.
    pub fn fail_next_begin(&self, reason: impl Into<String>) {
        self.state.lock().transient.push(reason.into());
    }
}

/// Pass handed to effects by the headless backend.
#[derive(Debug)]
pub struct HeadlessPass {
    surface: OutputSurface,
    viewport: Viewport,
    frame: Option<Duration>,
}

impl HeadlessPass {
    pub fn surface(&self) -> OutputSurface {
        self.surface
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Records which camera frame was drawn into this pass.
    pub fn draw(&mut self, timestamp: Duration) {
        self.frame = Some(timestamp);
    }
}

/// GPU-free backend that records every call.
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    journal: HeadlessJournal,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend that logs into an existing journal, so one journal can follow
    /// a context and its replacement.
    pub fn with_journal(journal: HeadlessJournal) -> Self {
        Self { journal }
    }

    pub fn journal(&self) -> HeadlessJournal {
        self.journal.clone()
    }

    fn check(state: &JournalState, handle: SurfaceHandle) -> Result<(), BackendError> {
        if let Some(reason) = &state.lost {
            return Err(BackendError::ContextLost(reason.clone()));
        }
        if state.dead_handles.contains(&handle) {
            return Err(BackendError::SurfaceLost(format!("{handle} was destroyed")));
        }
        Ok(())
    }
}

impl GpuBackend for HeadlessBackend {
    type Pass = HeadlessPass;

    fn initialize(&mut self) -> Result<(), BackendError> {
        let mut state = self.journal.state.lock();
        state.calls.push(BackendCall::Initialize);
        match &state.lost {
            Some(reason) => Err(BackendError::ContextLost(reason.clone())),
            None => Ok(()),
        }
    }

    fn is_lost(&self) -> bool {
        self.journal.state.lock().lost.is_some()
    }

    fn attach(&mut self, surface: &OutputSurface, _viewport: Viewport) -> Result<(), BackendError> {
        let mut state = self.journal.state.lock();
        state.calls.push(BackendCall::Attach(*surface));
        Self::check(&state, surface.handle())?;
        state.live.insert(surface.handle());
        Ok(())
    }

    fn begin(&mut self, surface: &OutputSurface, viewport: Viewport) -> Result<HeadlessPass, BackendError> {
        let mut state = self.journal.state.lock();
        state.calls.push(BackendCall::Begin(*surface, viewport));
        Self::check(&state, surface.handle())?;
        if !state.transient.is_empty() {
            return Err(BackendError::Transient(state.transient.remove(0)));
        }
        Ok(HeadlessPass {
            surface: *surface,
            viewport,
            frame: None,
        })
    }

    fn end(&mut self, surface: &OutputSurface, pass: HeadlessPass) -> Result<(), BackendError> {
        let mut state = self.journal.state.lock();
        Self::check(&state, surface.handle())?;
        state.calls.push(BackendCall::End {
            surface: *surface,
            frame: pass.frame,
        });
        Ok(())
    }

    fn abandon(&mut self, surface: &OutputSurface, _pass: HeadlessPass) {
        self.journal
            .state
            .lock()
            .calls
            .push(BackendCall::Abandon(*surface));
    }

    fn detach(&mut self, surface: &OutputSurface) {
        let mut state = self.journal.state.lock();
        state.calls.push(BackendCall::Detach(*surface));
        state.live.remove(&surface.handle());
    }

    fn shutdown(&mut self) {
        let mut state = self.journal.state.lock();
        state.calls.push(BackendCall::Shutdown);
        state.live.clear();
    }
}
