//! Per-level option lists and the fetch wrapper that fills them.

use serde::Serialize;

use crate::error::Result;
use crate::models::wilayah::{Level, Wilayah};
use crate::selector::Inner;
use crate::selector::notify::Severity;
use crate::selector::source::require_parent;

/// Options of one level, scoped to the parent code they were fetched for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LevelOptionSet {
    pub parent: Option<String>,
    pub items: Vec<Wilayah>,
}

impl LevelOptionSet {
    pub fn find(&self, code: &str) -> Option<&Wilayah> {
        self.items.iter().find(|item| item.code == code)
    }
}

#[derive(Debug, Default)]
struct LevelSlot {
    options: Option<LevelOptionSet>,
    /// Parent code of the latest request still awaited.
    pending: Option<Option<String>>,
}

#[derive(Debug, Default)]
pub struct HierarchyStore {
    slots: [LevelSlot; 4],
}

/// The unset / loading / loaded tri-state of one level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LevelState {
    pub level: Level,
    pub code: Option<String>,
    pub option_count: usize,
    pub loading: bool,
}

impl HierarchyStore {
    pub fn options(&self, level: Level) -> Option<&LevelOptionSet> {
        self.slots[level.index()].options.as_ref()
    }

    pub fn items(&self, level: Level) -> &[Wilayah] {
        self.options(level)
            .map(|set| set.items.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_loading(&self, level: Level) -> bool {
        self.slots[level.index()].pending.is_some()
    }

    /// Whether options for `level` are loaded for exactly `parent`.
    pub fn is_loaded_for(&self, level: Level, parent: Option<&str>) -> bool {
        self.options(level)
            .is_some_and(|set| set.parent.as_deref() == parent)
    }

    pub fn find(&self, level: Level, code: &str) -> Option<&Wilayah> {
        self.options(level).and_then(|set| set.find(code))
    }

    /// Marks `level` as loading for `parent`. Repeating the call for the
    /// same parent is a no-op.
    pub fn begin(&mut self, level: Level, parent: Option<&str>) {
        self.slots[level.index()].pending = Some(parent.map(str::to_string));
    }

    /// Clears the loading flag if the latest request was for `parent`.
    pub fn finish(&mut self, level: Level, parent: Option<&str>) {
        let slot = &mut self.slots[level.index()];
        if slot.pending.as_ref().map(Option::as_deref) == Some(parent) {
            slot.pending = None;
        }
    }

    /// Replaces the option list wholesale.
    pub fn replace(&mut self, level: Level, parent: Option<&str>, items: Vec<Wilayah>) {
        self.slots[level.index()].options = Some(LevelOptionSet {
            parent: parent.map(str::to_string),
            items,
        });
    }

    /// Drops the option list and any pending marker.
    pub fn clear(&mut self, level: Level) {
        self.slots[level.index()] = LevelSlot::default();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Response applied; number of options.
    Applied(usize),
    /// Parent selection changed while the request was in flight.
    Stale,
}

/// Fetches `level` for `parent` and applies the result if `parent` still
/// matches the form's selection at the level above.
///
/// Failures leave the previous option list in place, clear the loading
/// flag and raise one notification. The error is still returned so a
/// caller walking several levels can stop. A response for a superseded
/// parent is discarded without notification, failed or not.
pub(crate) async fn fetch_level(
    inner: &Inner,
    level: Level,
    parent: Option<&str>,
) -> Result<FetchOutcome> {
    let parent = require_parent(level, parent).inspect_err(|e| {
        log::warn!("Fetch {} dibatalkan: {}", level, e);
    })?;

    log::debug!("Memuat {} untuk induk {:?}", level, parent);
    inner.store().begin(level, parent);

    let result = inner.source.fetch(level, parent).await;

    let mut store = inner.store();
    store.finish(level, parent);

    // superseded requests are dropped whether they succeeded or not
    let current = level.parent().and_then(|p| inner.form.selected(p));
    if level.parent().is_some() && current.as_deref() != parent {
        log::warn!(
            "Respons {} untuk induk {:?} diabaikan, induk sekarang {:?}",
            level,
            parent,
            current
        );
        return Ok(FetchOutcome::Stale);
    }

    match result {
        Ok(items) => {
            let count = items.len();
            store.replace(level, parent, items);
            log::debug!("{} {} dimuat", count, level);
            Ok(FetchOutcome::Applied(count))
        }
        Err(e) => {
            drop(store);
            log::warn!("Gagal memuat {} (induk {:?}): {}", level, parent, e);
            inner.notifier.notify(
                &format!("Gagal memuat data {}", level.label()),
                Severity::Error,
            );
            Err(e)
        }
    }
}
