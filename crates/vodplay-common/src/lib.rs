//! Vodplay-Common: Shared types and errors for the playback core.
//!
//! This crate provides the pieces every other vodplay crate agrees on:
//!
//! - **Typed IDs**: [`VideoId`] so catalog identifiers are not confused with
//!   arbitrary strings
//! - **Records**: [`VideoRecord`] and the catalog wire shapes it is built from
//! - **Error Handling**: the [`PlayerError`] taxonomy surfaced to views
//!
//! # Examples
//!
//! ```
//! use vodplay_common::{PlayerError, VideoId};
//!
//! let id = VideoId::from("v1");
//! let err = PlayerError::not_found(&id);
//! assert_eq!(err.to_string(), "Video not found: v1");
//! ```

pub mod error;
pub mod ids;
pub mod types;

pub use error::{PlayerError, Result};
pub use ids::*;
pub use types::*;
