//! Backfill of option lists for a pre-filled selection.
//!
//! A stored record arrives with codes at several levels but without the
//! option lists needed to show their names. The resolver walks the levels
//! top-down and fetches each missing list with the code one level up as
//! parent, strictly one level at a time. Runs are debounced and never
//! overlap.

use serde::Serialize;
use std::{
    fmt,
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};
use tokio::task::JoinHandle;

use crate::error::WilayahError;
use crate::models::wilayah::Level;
use crate::selector::Inner;
use crate::selector::form::SelectionVector;
use crate::selector::notify::Severity;
use crate::selector::store::{FetchOutcome, HierarchyStore, fetch_level};
use crate::selector::visibility::VisibleLevels;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum ReconcileStatus {
    #[default]
    Idle,
    Resolving(Level),
    Done,
    Failed(Level),
}

impl ReconcileStatus {
    /// Status text shown next to the selector.
    pub fn label(&self) -> String {
        match self {
            ReconcileStatus::Idle => String::new(),
            ReconcileStatus::Resolving(level) => format!("Memuat data {}...", level.label()),
            ReconcileStatus::Done => "Selesai".to_string(),
            ReconcileStatus::Failed(level) => format!("Gagal memuat data {}", level.label()),
        }
    }

    pub fn is_in_progress(&self) -> bool {
        matches!(self, ReconcileStatus::Resolving(_))
    }
}

impl fmt::Display for ReconcileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Levels whose option lists were fetched, in order.
    pub fetched: Vec<Level>,
    pub status: ReconcileStatus,
}

#[derive(Debug, Default)]
pub(crate) struct ResolverState {
    running: AtomicBool,
    generation: AtomicU64,
    status: Mutex<ReconcileStatus>,
}

impl ResolverState {
    pub(crate) fn status(&self) -> ReconcileStatus {
        *self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_status(&self, status: ReconcileStatus) {
        *self.status.lock().unwrap_or_else(PoisonError::into_inner) = status;
    }
}

/// Clears the running flag when a walk ends, including by panic.
struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// First visible level whose code is set but whose options are not loaded
/// for the code above it.
pub fn first_missing(
    selection: &SelectionVector,
    store: &HierarchyStore,
    visible: &VisibleLevels,
) -> Option<Level> {
    Level::ALL.into_iter().find(|level| {
        visible.is_visible(*level)
            && selection.get(*level).is_some()
            && !store.is_loaded_for(*level, selection.parent_of(*level))
    })
}

pub fn needs_backfill(
    selection: &SelectionVector,
    store: &HierarchyStore,
    visible: &VisibleLevels,
) -> bool {
    first_missing(selection, store, visible).is_some()
}

/// Walks the levels once. Returns `None` when another walk is running.
pub(crate) async fn reconcile(inner: &Inner) -> Option<ReconcileReport> {
    let state = &inner.resolver;
    if state.running.swap(true, Ordering::AcqRel) {
        log::debug!("Rekonsiliasi wilayah sedang berjalan, dilewati");
        return None;
    }
    let _guard = RunGuard(&state.running);

    log::info!("Rekonsiliasi wilayah dimulai");
    let mut fetched = Vec::new();

    for level in Level::ALL {
        if !inner.visible.is_visible(level) {
            continue;
        }
        // the user may edit while a fetch is pending
        let selection = SelectionVector::read(inner.form.as_ref());
        if selection.get(level).is_none() {
            continue;
        }
        let parent = selection.parent_of(level).map(str::to_string);
        let loaded = inner.store().is_loaded_for(level, parent.as_deref());
        if loaded {
            continue;
        }

        state.set_status(ReconcileStatus::Resolving(level));
        match fetch_level(inner, level, parent.as_deref()).await {
            Ok(FetchOutcome::Applied(_)) => fetched.push(level),
            Ok(FetchOutcome::Stale) => {
                log::debug!("Induk {} berubah saat rekonsiliasi", level);
            }
            Err(e) => {
                // fetch failures are notified by fetch_level
                if let WilayahError::MissingParent { .. } = e {
                    inner.notifier.notify(
                        &format!("Gagal memuat data {}", level.label()),
                        Severity::Error,
                    );
                }
                log::warn!("Rekonsiliasi berhenti di {}: {}", level, e);
                let status = ReconcileStatus::Failed(level);
                state.set_status(status);
                return Some(ReconcileReport { fetched, status });
            }
        }
    }

    log::info!("Rekonsiliasi wilayah selesai: {:?}", fetched);
    state.set_status(ReconcileStatus::Done);
    Some(ReconcileReport {
        fetched,
        status: ReconcileStatus::Done,
    })
}

/// Runs a walk only when the source finished its initial load and some
/// level actually lacks its options.
pub(crate) async fn reconcile_if_needed(inner: &Inner) -> Option<ReconcileReport> {
    if !inner.source.is_ready() {
        log::debug!("Sumber wilayah belum siap, rekonsiliasi ditunda");
        return None;
    }
    let selection = SelectionVector::read(inner.form.as_ref());
    let missing = needs_backfill(&selection, &inner.store(), &inner.visible);
    if !missing {
        return None;
    }
    reconcile(inner).await
}

/// Debounced trigger: only the last call within the debounce window runs.
pub(crate) fn schedule(inner: &Arc<Inner>) -> JoinHandle<Option<ReconcileReport>> {
    let ticket = inner.resolver.generation.fetch_add(1, Ordering::AcqRel) + 1;
    let inner = Arc::clone(inner);
    tokio::spawn(async move {
        tokio::time::sleep(inner.config.debounce).await;
        if inner.resolver.generation.load(Ordering::Acquire) != ticket {
            return None;
        }
        reconcile_if_needed(&inner).await
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::selector::form::{HostForm, SelectionVector};
    use crate::selector::tests::harness;

    fn stored(form: &dyn HostForm) {
        SelectionVector::new(Some("11"), Some("1101"), Some("110101"), None).write_to(form);
    }

    #[tokio::test]
    async fn walks_top_down_one_level_at_a_time() {
        let (selector, form, source, _) = harness("L4");
        stored(form.as_ref());
        source.hold(Level::Kabupaten, Some("11"));

        let walk = {
            let selector = selector.clone();
            tokio::spawn(async move { selector.reconcile().await })
        };
        source.wait_for_calls(2).await;
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert_eq!(source.call_count(), 2, "kecamatan must wait for kabupaten");

        source.release(Level::Kabupaten, Some("11"));
        let report = walk.await.expect("join").expect("walk ran");

        assert_eq!(
            source.calls(),
            vec![
                (Level::Provinsi, None),
                (Level::Kabupaten, Some("11".to_string())),
                (Level::Kecamatan, Some("1101".to_string())),
            ]
        );
        assert_eq!(
            report.fetched,
            vec![Level::Provinsi, Level::Kabupaten, Level::Kecamatan]
        );
        assert_eq!(report.status.label(), "Selesai");
        assert_eq!(selector.display_name(Level::Kecamatan).as_deref(), Some("Teupah Selatan"));
    }

    #[tokio::test]
    async fn second_run_fetches_nothing() {
        let (selector, form, source, _) = harness("L4");
        stored(form.as_ref());

        selector.reconcile().await.expect("first walk");
        let calls = source.call_count();
        let report = selector.reconcile().await.expect("second walk");

        assert!(report.fetched.is_empty());
        assert_eq!(source.call_count(), calls);
        assert!(selector.reconcile_if_needed().await.is_none());
    }

    #[tokio::test]
    async fn failure_stops_the_walk_with_one_notification() {
        let (selector, form, source, toasts) = harness("L4");
        stored(form.as_ref());
        source.fail(Level::Kabupaten, "11");

        let report = selector.reconcile().await.expect("walk ran");
        assert_eq!(report.status, ReconcileStatus::Failed(Level::Kabupaten));
        assert_eq!(report.fetched, vec![Level::Provinsi]);
        assert_eq!(source.call_count(), 2);

        let toasts = toasts.drain();
        assert_eq!(toasts.len(), 1);
        assert_eq!(toasts[0].message, "Gagal memuat data kabupaten/kota");

        assert_eq!(selector.options(Level::Provinsi).len(), 2);
        assert!(selector.options(Level::Kabupaten).is_empty());
        assert_eq!(selector.display_name(Level::Kabupaten).as_deref(), Some("1101"));
    }

    #[tokio::test]
    async fn hidden_levels_are_not_backfilled() {
        let (selector, form, source, _) = harness("L2");
        stored(form.as_ref());

        let report = selector.reconcile().await.expect("walk ran");
        assert_eq!(report.fetched, vec![Level::Provinsi, Level::Kabupaten]);
        assert_eq!(source.call_count(), 2);
        assert!(selector.options(Level::Kecamatan).is_empty());
        assert!(selector.reconcile_if_needed().await.is_none());
    }

    #[tokio::test]
    async fn edit_during_walk_discards_superseded_backfill() {
        let (selector, form, source, toasts) = harness("L4");
        stored(form.as_ref());
        source.hold(Level::Kecamatan, Some("1101"));

        let walk = {
            let selector = selector.clone();
            tokio::spawn(async move { selector.reconcile().await })
        };
        source.wait_for_calls(3).await;

        selector
            .on_user_change(Level::Kabupaten, Some("1102".into()))
            .expect("kecamatan fetch for 1102")
            .await
            .expect("join");

        source.release(Level::Kecamatan, Some("1101"));
        let report = walk.await.expect("join").expect("walk ran");

        assert_eq!(report.status, ReconcileStatus::Done);
        assert_eq!(report.fetched, vec![Level::Provinsi, Level::Kabupaten]);
        assert_eq!(selector.status(), ReconcileStatus::Done);

        let kecamatan = selector.options(Level::Kecamatan);
        assert_eq!(kecamatan.len(), 1);
        assert_eq!(kecamatan[0].code, "110201");
        assert_eq!(form.selected(Level::Kecamatan), None);
        assert_eq!(selector.options(Level::Kabupaten).len(), 2);
        assert!(toasts.is_empty());
    }

    #[tokio::test]
    async fn overlapping_walks_are_suppressed() {
        let (selector, form, source, _) = harness("L4");
        stored(form.as_ref());
        source.hold(Level::Provinsi, None);

        let walk = {
            let selector = selector.clone();
            tokio::spawn(async move { selector.reconcile().await })
        };
        source.wait_for_calls(1).await;
        assert!(selector.status().is_in_progress());
        assert!(selector.reconcile().await.is_none());

        source.release(Level::Provinsi, None);
        assert!(walk.await.expect("join").is_some());
        assert_eq!(source.call_count(), 3);
    }

    #[tokio::test]
    async fn waits_for_source_readiness() {
        let (selector, form, source, _) = harness("L4");
        stored(form.as_ref());
        source.set_ready(false);
        assert!(selector.reconcile_if_needed().await.is_none());
        assert_eq!(source.call_count(), 0);

        source.set_ready(true);
        assert!(selector.reconcile_if_needed().await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn burst_of_requests_runs_once() {
        let (selector, form, source, _) = harness("L4");
        stored(form.as_ref());

        let early: Vec<_> = (0..4).map(|_| selector.request_reconcile()).collect();
        tokio::time::sleep(Duration::from_millis(100)).await;
        let last = selector.request_reconcile();

        for handle in early {
            assert!(handle.await.expect("join").is_none());
        }
        assert!(last.await.expect("join").is_some());
        assert_eq!(source.call_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn form_watch_triggers_backfill() {
        let (selector, form, source, _) = harness("L4");
        let watcher = selector.watch_form(form.subscribe());

        stored(form.as_ref());
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(source.call_count(), 0);

        tokio::time::sleep(Duration::from_millis(400)).await;
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert_eq!(source.call_count(), 3);
        assert_eq!(selector.status(), ReconcileStatus::Done);
        watcher.abort();
    }
}
