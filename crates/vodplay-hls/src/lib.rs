//! HLS manifest handling for vodplay.
//!
//! Two pieces live here:
//!
//! - [`manifest`]: turns master manifest text into ordered [`ManifestLevel`]s
//! - [`ladder`]: derives the user-facing [`QualityLadder`] from those levels
//!   and maps selections to engine level indices
//!
//! # Example
//!
//! ```
//! use vodplay_hls::{parse_master, QualityLadder, QualitySelection};
//!
//! let text = "#EXTM3U\n\
//! #EXT-X-STREAM-INF:BANDWIDTH=800000,RESOLUTION=640x360\n\
//! 360p/playlist.m3u8\n";
//!
//! let levels = parse_master(text).unwrap();
//! let ladder = QualityLadder::derive_from(&levels);
//! assert_eq!(ladder.levels().len(), 2);
//! assert_eq!(ladder.resolve(QualitySelection::Level(0)).unwrap().raw(), 0);
//! ```

pub mod ladder;
pub mod manifest;

pub use ladder::{EngineLevel, QualityLadder, QualityLevel, QualitySelection, AUTO_LEVEL_INDEX};
pub use manifest::{parse_master, ManifestLevel};
