use std::collections::btree_map::{self, BTreeMap};

use super::{OutputSurface, TargetId, TargetOptions};
use crate::error::{RenderError, Result};

/// Receiver of binding-release requests issued by [`SurfaceRegistry`].
///
/// Implemented by [`GpuContext`](crate::device::GpuContext). The registry
/// calls `release` for a displaced surface before the replacement is admitted,
/// so no bind of the new value can precede the release of the old one.
pub trait BindingRelease {
    /// Drops any GPU-side binding held for `surface`.
    fn release(&mut self, surface: &OutputSurface);

    /// Notifies that `surface` is (again) a live target.
    fn admit(&mut self, surface: &OutputSurface) {
        let _ = surface;
    }
}

/// Outcome of [`SurfaceRegistry::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// First surface for this identifier.
    Inserted,
    /// The previous value was released and replaced.
    Replaced(OutputSurface),
    /// Identical value already registered; nothing was released or rebound.
    Unchanged,
}

/// One registered target as seen by the render loop.
#[derive(Debug, Clone, PartialEq)]
pub struct RegisteredTarget {
    pub id: TargetId,
    pub surface: OutputSurface,
    pub options: TargetOptions,
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    surface: OutputSurface,
    options: TargetOptions,
}

/// Authoritative map from target identifier to its current surface.
///
/// Iteration order is by identifier, so frames reach targets in a stable order.
#[derive(Debug, Default)]
pub struct SurfaceRegistry {
    entries: BTreeMap<TargetId, Entry>,
}

impl SurfaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the surface for `id`.
    ///
    /// A new target gets [`TargetOptions::for_target`]; a replaced one keeps
    /// its options. Non-renderable surfaces are refused with `InvalidArgument`
    /// and leave the registry untouched.
    pub fn register<R>(
        &mut self,
        id: TargetId,
        surface: OutputSurface,
        bindings: &mut R,
    ) -> Result<Registration>
    where
        R: BindingRelease + ?Sized,
    {
        let options = match self.entries.get(&id) {
            Some(entry) => entry.options,
            None => TargetOptions::for_target(&id),
        };
        self.register_with(id, surface, options, bindings)
    }

    /// Like [`register`](Self::register) with explicit options.
    ///
    /// Changing only the options of an unchanged surface releases nothing.
    pub fn register_with<R>(
        &mut self,
        id: TargetId,
        surface: OutputSurface,
        options: TargetOptions,
        bindings: &mut R,
    ) -> Result<Registration>
    where
        R: BindingRelease + ?Sized,
    {
        if !surface.is_renderable() {
            return Err(RenderError::InvalidArgument(format!(
                "surface {surface} for `{id}` is not renderable"
            )));
        }

        match self.entries.entry(id) {
            btree_map::Entry::Vacant(slot) => {
                log::debug!("registered `{}` -> {surface} ({:?})", slot.key(), options.delivery);
                bindings.admit(&surface);
                slot.insert(Entry { surface, options });
                Ok(Registration::Inserted)
            }
            btree_map::Entry::Occupied(mut slot) if slot.get().surface == surface => {
                slot.get_mut().options = options;
                Ok(Registration::Unchanged)
            }
            btree_map::Entry::Occupied(mut slot) => {
                let previous = slot.get().surface;
                bindings.release(&previous);
                bindings.admit(&surface);
                slot.insert(Entry { surface, options });
                log::debug!("replaced `{}`: {previous} -> {surface}", slot.key());
                Ok(Registration::Replaced(previous))
            }
        }
    }

    /// Removes `id` and releases its binding. Returns the removed surface, if any.
    pub fn unregister<R>(&mut self, id: &TargetId, bindings: &mut R) -> Option<OutputSurface>
    where
        R: BindingRelease + ?Sized,
    {
        let removed = self.entries.remove(id)?.surface;
        bindings.release(&removed);
        log::debug!("unregistered `{id}` ({removed})");
        Some(removed)
    }

    pub fn get(&self, id: &TargetId) -> Result<OutputSurface> {
        self.entries
            .get(id)
            .map(|entry| entry.surface)
            .ok_or_else(|| RenderError::NotFound(id.clone()))
    }

    pub fn options(&self, id: &TargetId) -> Option<TargetOptions> {
        self.entries.get(id).map(|entry| entry.options)
    }

    pub fn contains(&self, id: &TargetId, surface: &OutputSurface) -> bool {
        self.entries.get(id).is_some_and(|entry| entry.surface == *surface)
    }

    /// Whether any registered target needs every frame.
    pub fn requires_lossless(&self) -> bool {
        self.entries.values().any(|entry| entry.options.is_lossless())
    }

    /// Owned copy of every target with its options, in iteration order.
    pub fn targets(&self) -> Vec<RegisteredTarget> {
        self.entries
            .iter()
            .map(|(id, entry)| RegisteredTarget {
                id: id.clone(),
                surface: entry.surface,
                options: entry.options,
            })
            .collect()
    }

    /// Currently registered targets. The iterator is lazy and cloneable, so a
    /// caller can walk it more than once.
    pub fn active_targets(&self) -> ActiveTargets<'_> {
        ActiveTargets {
            inner: self.entries.iter(),
        }
    }

    /// Owned copy of the current entries, for inspection from other components.
    pub fn snapshot(&self) -> Vec<(TargetId, OutputSurface)> {
        self.active_targets()
            .map(|(id, surface)| (id.clone(), *surface))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Unregisters every target, releasing each binding.
    pub fn clear<R>(&mut self, bindings: &mut R)
    where
        R: BindingRelease + ?Sized,
    {
        for (_, entry) in std::mem::take(&mut self.entries) {
            bindings.release(&entry.surface);
        }
    }
}

/// Iterator returned by [`SurfaceRegistry::active_targets`].
#[derive(Clone)]
pub struct ActiveTargets<'a> {
    inner: btree_map::Iter<'a, TargetId, Entry>,
}

impl<'a> Iterator for ActiveTargets<'a> {
    type Item = (&'a TargetId, &'a OutputSurface);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(id, entry)| (id, &entry.surface))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for ActiveTargets<'_> {}

#[cfg(test)]
mod tests {
    use std::ffi::c_void;

    use super::*;
    use crate::capture::DeliveryPolicy;

    #[derive(Debug, PartialEq, Eq)]
    enum Call {
        Release(OutputSurface),
        Admit(OutputSurface),
    }

    #[derive(Default)]
    struct Recorder {
        calls: Vec<Call>,
    }

    impl BindingRelease for Recorder {
        fn release(&mut self, surface: &OutputSurface) {
            self.calls.push(Call::Release(*surface));
        }

        fn admit(&mut self, surface: &OutputSurface) {
            self.calls.push(Call::Admit(*surface));
        }
    }

    impl Recorder {
        fn releases(&self) -> usize {
            self.calls
                .iter()
                .filter(|c| matches!(c, Call::Release(_)))
                .count()
        }
    }

    fn surface(addr: usize, w: i32, h: i32) -> OutputSurface {
        OutputSurface::from_native_window(addr as *mut c_void, w, h).unwrap()
    }

    // ── register ──────────────────────────────────────────────────────────

    #[test]
    fn first_registration_inserts() {
        let mut reg = SurfaceRegistry::new();
        let mut rec = Recorder::default();
        let s = surface(0x10, 1920, 1080);

        assert_eq!(reg.register(TargetId::preview(), s, &mut rec).unwrap(), Registration::Inserted);
        assert_eq!(reg.get(&TargetId::preview()).unwrap(), s);
        assert_eq!(rec.releases(), 0);
    }

    #[test]
    fn identical_registration_is_idempotent() {
        let mut reg = SurfaceRegistry::new();
        let mut rec = Recorder::default();
        let s = surface(0x10, 1920, 1080);

        reg.register(TargetId::preview(), s, &mut rec).unwrap();
        let calls_after_first = rec.calls.len();

        assert_eq!(reg.register(TargetId::preview(), s, &mut rec).unwrap(), Registration::Unchanged);
        assert_eq!(rec.calls.len(), calls_after_first);
    }

    #[test]
    fn replacement_releases_old_exactly_once_before_admitting_new() {
        let mut reg = SurfaceRegistry::new();
        let mut rec = Recorder::default();
        let old = surface(0x10, 1920, 1080);
        let new = surface(0x20, 1080, 1920);

        reg.register(TargetId::preview(), old, &mut rec).unwrap();
        rec.calls.clear();

        let outcome = reg.register(TargetId::preview(), new, &mut rec).unwrap();
        assert_eq!(outcome, Registration::Replaced(old));
        assert_eq!(rec.calls, vec![Call::Release(old), Call::Admit(new)]);
    }

    #[test]
    fn resize_of_same_handle_counts_as_replacement() {
        let mut reg = SurfaceRegistry::new();
        let mut rec = Recorder::default();
        let old = surface(0x10, 1920, 1080);

        reg.register(TargetId::preview(), old, &mut rec).unwrap();
        let outcome = reg
            .register(TargetId::preview(), old.resized(1280, 720), &mut rec)
            .unwrap();

        assert_eq!(outcome, Registration::Replaced(old));
        assert_eq!(rec.releases(), 1);
    }

    #[test]
    fn non_renderable_surface_is_refused_without_side_effects() {
        let mut reg = SurfaceRegistry::new();
        let mut rec = Recorder::default();
        let good = surface(0x10, 1920, 1080);
        reg.register(TargetId::preview(), good, &mut rec).unwrap();
        rec.calls.clear();

        let err = reg
            .register(TargetId::preview(), surface(0x10, 0, 0), &mut rec)
            .unwrap_err();

        assert!(matches!(err, RenderError::InvalidArgument(_)));
        assert!(rec.calls.is_empty());
        assert_eq!(reg.get(&TargetId::preview()).unwrap(), good);
    }

    #[test]
    fn replacement_keeps_target_options() {
        let mut reg = SurfaceRegistry::new();
        let mut rec = Recorder::default();
        let mirrored = TargetOptions::default().with_transform(crate::surface::MIRROR_HORIZONTAL);

        reg.register_with(TargetId::preview(), surface(0x10, 1920, 1080), mirrored, &mut rec)
            .unwrap();
        reg.register(TargetId::preview(), surface(0x10, 1080, 1920), &mut rec)
            .unwrap();

        assert_eq!(reg.options(&TargetId::preview()), Some(mirrored));
    }

    #[test]
    fn option_change_alone_releases_nothing() {
        let mut reg = SurfaceRegistry::new();
        let mut rec = Recorder::default();
        let s = surface(0x10, 1920, 1080);
        reg.register(TargetId::preview(), s, &mut rec).unwrap();
        rec.calls.clear();

        let lossless = TargetOptions::default().with_delivery(DeliveryPolicy::Lossless);
        let outcome = reg
            .register_with(TargetId::preview(), s, lossless, &mut rec)
            .unwrap();

        assert_eq!(outcome, Registration::Unchanged);
        assert!(rec.calls.is_empty());
        assert!(reg.requires_lossless());
    }

    #[test]
    fn record_target_requires_lossless_delivery() {
        let mut reg = SurfaceRegistry::new();
        let mut rec = Recorder::default();
        reg.register(TargetId::preview(), surface(0x10, 1920, 1080), &mut rec).unwrap();
        assert!(!reg.requires_lossless());

        reg.register(TargetId::record(), surface(0x20, 1280, 720), &mut rec).unwrap();
        assert!(reg.requires_lossless());

        reg.unregister(&TargetId::record(), &mut rec);
        assert!(!reg.requires_lossless());
    }

    // ── unregister / get ──────────────────────────────────────────────────

    #[test]
    fn unregister_releases_and_get_reports_not_found() {
        let mut reg = SurfaceRegistry::new();
        let mut rec = Recorder::default();
        let s = surface(0x10, 1920, 1080);
        reg.register(TargetId::record(), s, &mut rec).unwrap();

        assert_eq!(reg.unregister(&TargetId::record(), &mut rec), Some(s));
        assert!(rec.calls.contains(&Call::Release(s)));
        assert!(matches!(
            reg.get(&TargetId::record()),
            Err(RenderError::NotFound(id)) if id == TargetId::record()
        ));
    }

    #[test]
    fn unregister_of_absent_id_is_noop() {
        let mut reg = SurfaceRegistry::new();
        let mut rec = Recorder::default();
        assert_eq!(reg.unregister(&TargetId::preview(), &mut rec), None);
        assert!(rec.calls.is_empty());
    }

    // ── active_targets ────────────────────────────────────────────────────

    #[test]
    fn active_targets_is_restartable_and_ordered() {
        let mut reg = SurfaceRegistry::new();
        let mut rec = Recorder::default();
        reg.register(TargetId::record(), surface(0x20, 1280, 720), &mut rec).unwrap();
        reg.register(TargetId::preview(), surface(0x10, 1920, 1080), &mut rec).unwrap();

        let targets = reg.active_targets();
        assert_eq!(targets.len(), 2);

        let first: Vec<_> = targets.clone().map(|(id, _)| id.as_str().to_owned()).collect();
        let second: Vec<_> = targets.map(|(id, _)| id.as_str().to_owned()).collect();
        assert_eq!(first, vec!["preview", "record"]);
        assert_eq!(first, second);
    }

    #[test]
    fn clear_releases_every_entry() {
        let mut reg = SurfaceRegistry::new();
        let mut rec = Recorder::default();
        reg.register(TargetId::preview(), surface(0x10, 1920, 1080), &mut rec).unwrap();
        reg.register(TargetId::record(), surface(0x20, 1280, 720), &mut rec).unwrap();

        reg.clear(&mut rec);
        assert!(reg.is_empty());
        assert_eq!(rec.releases(), 2);
    }
}
