//! Cascading provinsi → kabupaten → kecamatan → desa selector.
//!
//! [`WilayahSelector`] holds the option lists of one form instance. The
//! selected codes live in the host form ([`form::HostForm`]), the option
//! lists come from a [`source::WilayahSource`] and fetch failures go to a
//! [`notify::Notifier`].

pub mod cascade;
pub mod form;
pub mod label;
pub mod notify;
pub mod resolver;
pub mod source;
pub mod store;
pub mod visibility;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::{sync::watch, task::JoinHandle};

use crate::config::SelectorConfig;
use crate::error::Result;
use crate::models::wilayah::{Level, Wilayah};
use form::{HostForm, SelectionVector};
use notify::Notifier;
use resolver::{ReconcileReport, ReconcileStatus, ResolverState};
use source::WilayahSource;
use store::{FetchOutcome, HierarchyStore, LevelState};
use visibility::VisibleLevels;

pub(crate) struct Inner {
    pub(crate) source: Arc<dyn WilayahSource>,
    pub(crate) form: Arc<dyn HostForm>,
    pub(crate) notifier: Arc<dyn Notifier>,
    pub(crate) config: SelectorConfig,
    pub(crate) visible: VisibleLevels,
    pub(crate) store: Mutex<HierarchyStore>,
    pub(crate) resolver: ResolverState,
}

impl Inner {
    pub(crate) fn store(&self) -> MutexGuard<'_, HierarchyStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Clone)]
pub struct WilayahSelector {
    inner: Arc<Inner>,
}

impl WilayahSelector {
    pub fn new(
        source: Arc<dyn WilayahSource>,
        form: Arc<dyn HostForm>,
        notifier: Arc<dyn Notifier>,
        config: SelectorConfig,
    ) -> Self {
        let visible = visibility::visible_levels(&config.mode);
        if visible.is_empty() {
            log::debug!("Mode wilayah {:?} tidak dikenal", config.mode);
        }
        Self {
            inner: Arc::new(Inner {
                source,
                form,
                notifier,
                config,
                visible,
                store: Mutex::new(HierarchyStore::default()),
                resolver: ResolverState::default(),
            }),
        }
    }

    pub fn visible_levels(&self) -> VisibleLevels {
        self.inner.visible
    }

    /// Loads the provinsi list for a freshly mounted form.
    pub async fn load_root(&self) -> Result<FetchOutcome> {
        store::fetch_level(&self.inner, Level::Provinsi, None).await
    }

    /// Fetches `level` for `parent` through the stale-response guard.
    pub async fn fetch_level(&self, level: Level, parent: Option<&str>) -> Result<FetchOutcome> {
        store::fetch_level(&self.inner, level, parent).await
    }

    /// User edit at `level`. See [`cascade::on_user_change`].
    pub fn on_user_change(&self, level: Level, code: Option<String>) -> Option<JoinHandle<()>> {
        cascade::on_user_change(&self.inner, level, code)
    }

    /// Immediate walk, ignoring readiness and debounce.
    pub async fn reconcile(&self) -> Option<ReconcileReport> {
        resolver::reconcile(&self.inner).await
    }

    pub async fn reconcile_if_needed(&self) -> Option<ReconcileReport> {
        resolver::reconcile_if_needed(&self.inner).await
    }

    /// Debounced reconcile; call after programmatic form updates.
    pub fn request_reconcile(&self) -> JoinHandle<Option<ReconcileReport>> {
        resolver::schedule(&self.inner)
    }

    /// Requests a reconcile on every change published by the form. The
    /// task ends when the form's sender is dropped.
    pub fn watch_form(&self, mut changes: watch::Receiver<u64>) -> JoinHandle<()> {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            while changes.changed().await.is_ok() {
                resolver::schedule(&inner);
            }
        })
    }

    pub fn status(&self) -> ReconcileStatus {
        self.inner.resolver.status()
    }

    pub fn selection(&self) -> SelectionVector {
        SelectionVector::read(self.inner.form.as_ref())
    }

    pub fn options(&self, level: Level) -> Vec<Wilayah> {
        self.inner.store().items(level).to_vec()
    }

    pub fn level_state(&self, level: Level) -> LevelState {
        let store = self.inner.store();
        LevelState {
            level,
            code: self.inner.form.selected(level),
            option_count: store.items(level).len(),
            loading: store.is_loading(level),
        }
    }

    /// Display text for the selected code at `level`, `None` when unset.
    pub fn display_name(&self, level: Level) -> Option<String> {
        let code = self.inner.form.selected(level)?;
        Some(label::name_for_code(&code, self.inner.store().items(level)))
    }
}
