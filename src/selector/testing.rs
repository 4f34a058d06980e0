//! In-memory source for selector tests. Records every call and can hold a
//! response back until the test releases it.

use async_trait::async_trait;
use std::{
    collections::{HashMap, HashSet},
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
};
use tokio::sync::Semaphore;

use crate::error::{Result, WilayahError};
use crate::models::wilayah::{Level, Wilayah};
use crate::selector::source::{WilayahSource, require_parent};

type Key = (Level, Option<String>);

pub(crate) struct ScriptedSource {
    data: HashMap<Key, Vec<Wilayah>>,
    calls: Mutex<Vec<Key>>,
    failing: Mutex<HashSet<Key>>,
    gates: Mutex<HashMap<Key, Arc<Semaphore>>>,
    ready: AtomicBool,
}

fn key(level: Level, parent: Option<&str>) -> Key {
    (level, parent.map(str::to_string))
}

impl ScriptedSource {
    pub(crate) fn sample() -> Self {
        let mut data = HashMap::new();
        data.insert(
            key(Level::Provinsi, None),
            vec![Wilayah::new("11", "Aceh"), Wilayah::new("12", "Sumatera Utara")],
        );
        data.insert(
            key(Level::Kabupaten, Some("11")),
            vec![
                Wilayah::new("1101", "Kabupaten Simeulue").with_parent("11"),
                Wilayah::new("1102", "Kabupaten Aceh Singkil").with_parent("11"),
            ],
        );
        data.insert(
            key(Level::Kabupaten, Some("12")),
            vec![Wilayah::new("1201", "Kabupaten Nias").with_parent("12")],
        );
        data.insert(
            key(Level::Kecamatan, Some("1101")),
            vec![
                Wilayah::new("110101", "Teupah Selatan").with_parent("1101"),
                Wilayah::new("110102", "Simeulue Timur").with_parent("1101"),
            ],
        );
        data.insert(
            key(Level::Kecamatan, Some("1102")),
            vec![Wilayah::new("110201", "Pulau Banyak").with_parent("1102")],
        );
        data.insert(
            key(Level::Desa, Some("110101")),
            vec![
                Wilayah::new("1101011001", "Latiung")
                    .with_parent("110101")
                    .with_postal_code("23891"),
                Wilayah::new("1101011002", "Labuhan Bajau").with_parent("110101"),
            ],
        );
        data.insert(
            key(Level::Desa, Some("110201")),
            vec![
                Wilayah::new("1102011001", "Pulau Balai")
                    .with_parent("110201")
                    .with_postal_code("24791"),
            ],
        );

        Self {
            data,
            calls: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
            gates: Mutex::new(HashMap::new()),
            ready: AtomicBool::new(true),
        }
    }

    pub(crate) fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    pub(crate) fn calls(&self) -> Vec<Key> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub(crate) fn fail(&self, level: Level, parent: &str) {
        self.failing.lock().unwrap().insert(key(level, Some(parent)));
    }

    pub(crate) fn recover(&self, level: Level, parent: &str) {
        self.failing.lock().unwrap().remove(&key(level, Some(parent)));
    }

    /// Responses for `(level, parent)` wait until [`Self::release`].
    pub(crate) fn hold(&self, level: Level, parent: Option<&str>) {
        self.gates
            .lock()
            .unwrap()
            .insert(key(level, parent), Arc::new(Semaphore::new(0)));
    }

    pub(crate) fn release(&self, level: Level, parent: Option<&str>) {
        if let Some(gate) = self.gates.lock().unwrap().get(&key(level, parent)) {
            gate.add_permits(1);
        }
    }

    /// Yields until at least `n` calls have been recorded.
    pub(crate) async fn wait_for_calls(&self, n: usize) {
        while self.call_count() < n {
            tokio::task::yield_now().await;
        }
    }
}

#[async_trait]
impl WilayahSource for ScriptedSource {
    async fn fetch(&self, level: Level, parent: Option<&str>) -> Result<Vec<Wilayah>> {
        let parent = require_parent(level, parent)?;
        let k = key(level, parent);
        self.calls.lock().unwrap().push(k.clone());

        let gate = self.gates.lock().unwrap().get(&k).cloned();
        if let Some(gate) = gate {
            gate.acquire().await.unwrap().forget();
        }

        if self.failing.lock().unwrap().contains(&k) {
            return Err(WilayahError::Status {
                status: 503,
                url: format!("scripted://{}", level.path_segment()),
            });
        }
        Ok(self.data.get(&k).cloned().unwrap_or_default())
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}
