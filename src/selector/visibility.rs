//! Which hierarchy levels a form renders for a given mode token.
//!
//! Modes are ordered, each one including the levels of the previous:
//! `L1` shows only provinsi, `L4` shows all four levels. The level names
//! (`provinsi`, `kabupaten`, `kecamatan`, `desa`) are accepted as aliases.
//! Anything else renders no level and the host shows a "pilih tingkat"
//! placeholder instead.

use serde::Serialize;

use crate::models::wilayah::Level;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VisibleLevels {
    pub level1: bool,
    pub level2: bool,
    pub level3: bool,
    pub level4: bool,
}

impl VisibleLevels {
    fn up_to(depth: usize) -> Self {
        Self {
            level1: depth >= 1,
            level2: depth >= 2,
            level3: depth >= 3,
            level4: depth >= 4,
        }
    }

    pub fn is_visible(&self, level: Level) -> bool {
        match level {
            Level::Provinsi => self.level1,
            Level::Kabupaten => self.level2,
            Level::Kecamatan => self.level3,
            Level::Desa => self.level4,
        }
    }

    /// True when nothing is rendered and the placeholder should show.
    pub fn is_empty(&self) -> bool {
        !self.level1
    }

    /// Deepest visible level, if any.
    pub fn deepest(&self) -> Option<Level> {
        Level::ALL
            .into_iter()
            .rev()
            .find(|level| self.is_visible(*level))
    }
}

/// Depth implied by a mode token, `None` when unrecognized.
pub fn mode_depth(mode: &str) -> Option<usize> {
    match mode.trim().to_ascii_lowercase().as_str() {
        "l1" | "provinsi" => Some(1),
        "l2" | "kabupaten" => Some(2),
        "l3" | "kecamatan" => Some(3),
        "l4" | "desa" => Some(4),
        _ => None,
    }
}

pub fn visible_levels(mode: &str) -> VisibleLevels {
    mode_depth(mode)
        .map(VisibleLevels::up_to)
        .unwrap_or_default()
}
