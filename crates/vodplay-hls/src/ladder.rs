//! Quality ladder: user-facing quality choices for one parsed manifest.
//!
//! The ladder is derived once per manifest and never re-derived. Its entries
//! are `auto` followed by every manifest level in manifest order, so the
//! position of a label in the ladder always agrees with the engine's level
//! index.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use vodplay_common::{PlayerError, Result};

use crate::ManifestLevel;

/// Level index the engine reads as "choose automatically".
pub const AUTO_LEVEL_INDEX: i32 = -1;

/// Level requested from an adaptive engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EngineLevel {
    /// Let the engine pick.
    #[default]
    Auto,
    /// Pin a manifest-order level.
    Index(usize),
}

impl EngineLevel {
    /// Raw engine index, with [`AUTO_LEVEL_INDEX`] for automatic selection.
    pub fn raw(self) -> i32 {
        match self {
            Self::Auto => AUTO_LEVEL_INDEX,
            Self::Index(i) => i as i32,
        }
    }

    /// Inverse of [`EngineLevel::raw`]. Any negative index means automatic.
    pub fn from_raw(raw: i32) -> Self {
        usize::try_from(raw).map_or(Self::Auto, Self::Index)
    }
}

/// A selection a user can make in the quality menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualitySelection {
    #[default]
    Auto,
    Level(usize),
}

impl QualitySelection {
    /// Stable key for menus and the command line: `auto` or `level-N`.
    pub fn key(&self) -> String {
        match self {
            Self::Auto => "auto".to_string(),
            Self::Level(i) => format!("level-{i}"),
        }
    }
}

impl fmt::Display for QualitySelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

impl FromStr for QualitySelection {
    type Err = PlayerError;

    /// Accepts `auto`, `level-N` or a bare index `N`.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("auto") {
            return Ok(Self::Auto);
        }
        s.strip_prefix("level-")
            .unwrap_or(s)
            .parse::<usize>()
            .map(Self::Level)
            .map_err(|_| PlayerError::unknown_quality(s))
    }
}

/// One entry of the ladder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityLevel {
    /// Engine index; [`AUTO_LEVEL_INDEX`] for the `auto` entry.
    pub index: i32,
    /// Display label, e.g. `720p`.
    pub label: String,
}

impl QualityLevel {
    /// The selection this entry stands for.
    pub fn selection(&self) -> QualitySelection {
        match EngineLevel::from_raw(self.index) {
            EngineLevel::Auto => QualitySelection::Auto,
            EngineLevel::Index(i) => QualitySelection::Level(i),
        }
    }
}

/// Immutable ladder derived from one manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualityLadder {
    levels: Vec<QualityLevel>,
}

impl QualityLadder {
    /// Build the ladder for a parsed manifest: `auto`, then each level in
    /// manifest order.
    pub fn derive_from(manifest_levels: &[ManifestLevel]) -> Self {
        let mut levels = Vec::with_capacity(manifest_levels.len() + 1);
        levels.push(QualityLevel {
            index: AUTO_LEVEL_INDEX,
            label: "Auto".to_string(),
        });

        for (position, level) in manifest_levels.iter().enumerate() {
            levels.push(QualityLevel {
                index: position as i32,
                label: label_for(position, level),
            });
        }

        Self { levels }
    }

    /// All entries, `auto` first.
    pub fn levels(&self) -> &[QualityLevel] {
        &self.levels
    }

    /// Number of manifest levels, not counting `auto`.
    pub fn manifest_len(&self) -> usize {
        self.levels.len() - 1
    }

    /// Map a selection to the engine level it stands for.
    pub fn resolve(&self, selection: QualitySelection) -> Result<EngineLevel> {
        match selection {
            QualitySelection::Auto => Ok(EngineLevel::Auto),
            QualitySelection::Level(i) if i < self.manifest_len() => Ok(EngineLevel::Index(i)),
            QualitySelection::Level(_) => Err(PlayerError::unknown_quality(selection.key())),
        }
    }

    /// Interpret free-form user input: a selection key, a bare index, or a
    /// display label such as `720p`. The first entry with a matching label
    /// wins.
    pub fn selection_for(&self, input: &str) -> Result<QualitySelection> {
        let selection = match input.parse::<QualitySelection>() {
            Ok(selection) => selection,
            Err(_) => self
                .levels
                .iter()
                .find(|l| l.label.eq_ignore_ascii_case(input.trim()))
                .map(QualityLevel::selection)
                .ok_or_else(|| PlayerError::unknown_quality(input))?,
        };
        self.resolve(selection)?;
        Ok(selection)
    }

    /// Label shown for a selection.
    pub fn label_of(&self, selection: QualitySelection) -> Option<&str> {
        self.levels
            .iter()
            .find(|l| l.selection() == selection)
            .map(|l| l.label.as_str())
    }
}

fn label_for(position: usize, level: &ManifestLevel) -> String {
    if let Some(height) = level.height {
        format!("{height}p")
    } else if let Some(bandwidth) = level.bandwidth {
        format!("{} kbps", bandwidth / 1000)
    } else {
        format!("Level {position}")
    }
}
