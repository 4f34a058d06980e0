// src/models/wilayah.rs
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

/// One tier of the administrative hierarchy, ordered from the root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Provinsi,
    Kabupaten,
    Kecamatan,
    Desa,
}

impl Level {
    pub const ALL: [Level; 4] = [
        Level::Provinsi,
        Level::Kabupaten,
        Level::Kecamatan,
        Level::Desa,
    ];

    /// 1-based depth: Provinsi = 1 .. Desa = 4.
    pub fn depth(self) -> usize {
        self.index() + 1
    }

    pub fn index(self) -> usize {
        match self {
            Level::Provinsi => 0,
            Level::Kabupaten => 1,
            Level::Kecamatan => 2,
            Level::Desa => 3,
        }
    }

    pub fn from_depth(depth: usize) -> Option<Level> {
        depth.checked_sub(1).and_then(|i| Self::ALL.get(i).copied())
    }

    pub fn parent(self) -> Option<Level> {
        self.index().checked_sub(1).map(|i| Self::ALL[i])
    }

    pub fn child(self) -> Option<Level> {
        Self::ALL.get(self.index() + 1).copied()
    }

    /// Levels strictly below this one.
    pub fn descendants(self) -> impl Iterator<Item = Level> {
        Self::ALL.into_iter().skip(self.index() + 1)
    }

    /// Human label used in notifications.
    pub fn label(self) -> &'static str {
        match self {
            Level::Provinsi => "provinsi",
            Level::Kabupaten => "kabupaten/kota",
            Level::Kecamatan => "kecamatan",
            Level::Desa => "desa/kelurahan",
        }
    }

    /// Path segment of the reference-data API.
    pub fn path_segment(self) -> &'static str {
        match self {
            Level::Provinsi => "provinsi",
            Level::Kabupaten => "kabupaten",
            Level::Kecamatan => "kecamatan",
            Level::Desa => "desa",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single region entry as served by the reference-data API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Wilayah {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub parent_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
}

impl Wilayah {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            parent_code: None,
            postal_code: None,
        }
    }

    pub fn with_parent(mut self, parent_code: impl Into<String>) -> Self {
        self.parent_code = Some(parent_code.into());
        self
    }

    pub fn with_postal_code(mut self, postal_code: impl Into<String>) -> Self {
        self.postal_code = Some(postal_code.into());
        self
    }
}
