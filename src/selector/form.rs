//! Host form contract. The form owns the selected codes; the selector only
//! reads and writes them through [`HostForm`].

use serde::Serialize;
use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
};
use tokio::sync::watch;

use crate::models::wilayah::Level;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FormField {
    Provinsi,
    Kabupaten,
    Kecamatan,
    Desa,
    /// Derived from the selected desa.
    KodePos,
}

impl From<Level> for FormField {
    fn from(level: Level) -> Self {
        match level {
            Level::Provinsi => FormField::Provinsi,
            Level::Kabupaten => FormField::Kabupaten,
            Level::Kecamatan => FormField::Kecamatan,
            Level::Desa => FormField::Desa,
        }
    }
}

impl FormField {
    /// Field name used by the DPPI forms.
    pub fn name(self) -> &'static str {
        match self {
            FormField::Provinsi => "id_provinsi",
            FormField::Kabupaten => "id_kabupaten",
            FormField::Kecamatan => "id_kecamatan",
            FormField::Desa => "id_desa",
            FormField::KodePos => "kode_pos",
        }
    }
}

pub trait HostForm: Send + Sync {
    fn value(&self, field: FormField) -> Option<String>;
    fn set_value(&self, field: FormField, value: Option<String>);

    /// Selected code at `level`, blank values read as unset.
    fn selected(&self, level: Level) -> Option<String> {
        normalize(self.value(level.into()))
    }
}

pub fn normalize(code: Option<String>) -> Option<String> {
    code.map(|c| c.trim().to_string()).filter(|c| !c.is_empty())
}

/// Snapshot of the four selected codes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SelectionVector {
    codes: [Option<String>; 4],
}

impl SelectionVector {
    pub fn new(
        provinsi: Option<&str>,
        kabupaten: Option<&str>,
        kecamatan: Option<&str>,
        desa: Option<&str>,
    ) -> Self {
        let own = |c: Option<&str>| normalize(c.map(str::to_string));
        Self {
            codes: [own(provinsi), own(kabupaten), own(kecamatan), own(desa)],
        }
    }

    pub fn read(form: &dyn HostForm) -> Self {
        Self {
            codes: Level::ALL.map(|level| form.selected(level)),
        }
    }

    pub fn get(&self, level: Level) -> Option<&str> {
        self.codes[level.index()].as_deref()
    }

    /// Code of the level above `level`; `None` for provinsi.
    pub fn parent_of(&self, level: Level) -> Option<&str> {
        level.parent().and_then(|p| self.get(p))
    }

    /// Writes every level into the form. Used when loading a stored record.
    pub fn write_to(&self, form: &dyn HostForm) {
        for level in Level::ALL {
            form.set_value(level.into(), self.get(level).map(str::to_string));
        }
    }

    /// True when no level is set below an unset level.
    pub fn is_contiguous(&self) -> bool {
        self.codes
            .windows(2)
            .all(|pair| pair[1].is_none() || pair[0].is_some())
    }
}

/// In-memory form with a revision counter published over a watch channel,
/// the `watch` half of the host contract.
pub struct MemoryForm {
    values: Mutex<HashMap<FormField, String>>,
    revision: watch::Sender<u64>,
}

impl Default for MemoryForm {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryForm {
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            values: Mutex::new(HashMap::new()),
            revision,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }
}

impl HostForm for MemoryForm {
    fn value(&self, field: FormField) -> Option<String> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&field)
            .cloned()
    }

    fn set_value(&self, field: FormField, value: Option<String>) {
        {
            let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
            match normalize(value) {
                Some(v) => values.insert(field, v),
                None => values.remove(&field),
            };
        }
        self.revision.send_modify(|rev| *rev += 1);
    }
}
