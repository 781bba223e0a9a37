use std::collections::BTreeMap;
use std::time::Duration;

use crate::error::RenderError;
use crate::surface::TargetId;

/// What happened to one frame across all active targets.
#[derive(Debug, Clone)]
pub struct FrameReport {
    pub timestamp: Duration,
    /// Targets that received the frame, in registry order.
    pub presented: Vec<TargetId>,
    /// Per-target recoverable failures.
    pub failures: Vec<(TargetId, RenderError)>,
    /// Targets removed from the registry because their surface went stale.
    pub unregistered: Vec<TargetId>,
    /// Latest-wins targets skipped because a newer frame was already queued.
    pub superseded: Vec<TargetId>,
}

impl FrameReport {
    pub(crate) fn new(timestamp: Duration) -> Self {
        Self {
            timestamp,
            presented: Vec::new(),
            failures: Vec::new(),
            unregistered: Vec::new(),
            superseded: Vec::new(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failure(&self, id: &TargetId) -> Option<&RenderError> {
        self.failures
            .iter()
            .find_map(|(target, err)| (target == id).then_some(err))
    }
}

/// Counters of one target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetStats {
    pub presented: u64,
    pub frames_dropped: u64,
    pub effect_failures: u64,
    pub invalidated: u64,
    /// Frames skipped in favour of a newer one (latest-wins targets only).
    pub superseded: u64,
}

/// Running totals of a render loop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub frames_received: u64,
    /// Frames that reached at least one target.
    pub frames_presented: u64,
    /// Frames rejected for a non-increasing timestamp.
    pub frames_out_of_order: u64,
    /// Frames replaced in the mailbox before the render thread took them.
    pub frames_replaced: u64,
    pub targets: BTreeMap<TargetId, TargetStats>,
}

impl RenderStats {
    pub fn target(&self, id: &TargetId) -> Option<&TargetStats> {
        self.targets.get(id)
    }

    pub fn presented_to(&self, id: &TargetId) -> u64 {
        self.target(id).map_or(0, |t| t.presented)
    }

    pub(crate) fn record(&mut self, report: &FrameReport) {
        if !report.presented.is_empty() {
            self.frames_presented += 1;
        }

        for id in &report.presented {
            self.targets.entry(id.clone()).or_default().presented += 1;
        }

        for id in &report.superseded {
            self.targets.entry(id.clone()).or_default().superseded += 1;
        }

        for (id, err) in &report.failures {
            let entry = self.targets.entry(id.clone()).or_default();
            match err {
                RenderError::EffectFailure(_) => entry.effect_failures += 1,
                RenderError::InvalidSurface(_) => entry.invalidated += 1,
                _ => entry.frames_dropped += 1,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_splits_failures_by_kind() {
        let mut stats = RenderStats::default();
        let mut report = FrameReport::new(Duration::from_millis(1));
        report.presented.push(TargetId::preview());
        report
            .failures
            .push((TargetId::record(), RenderError::EffectFailure("shader".into())));
        stats.record(&report);

        let mut report = FrameReport::new(Duration::from_millis(2));
        report
            .failures
            .push((TargetId::record(), RenderError::FrameDropped("timeout".into())));
        stats.record(&report);

        assert_eq!(stats.frames_presented, 1);
        assert_eq!(stats.presented_to(&TargetId::preview()), 1);
        let record = stats.target(&TargetId::record()).unwrap();
        assert_eq!((record.effect_failures, record.frames_dropped), (1, 1));
        assert_eq!(record.presented, 0);
    }

    #[test]
    fn superseded_frames_are_not_failures() {
        let mut stats = RenderStats::default();
        let mut report = FrameReport::new(Duration::from_millis(1));
        report.presented.push(TargetId::record());
        report.superseded.push(TargetId::preview());
        assert!(report.is_clean());

        stats.record(&report);
        assert_eq!(stats.target(&TargetId::preview()).unwrap().superseded, 1);
        assert_eq!(stats.presented_to(&TargetId::preview()), 0);
    }
}
