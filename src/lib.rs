//! Vodplay - adaptive-streaming playback for an HLS video catalog
//!
//! This library crate exposes the playback core for the binary and for
//! integration testing.

pub mod catalog;
pub mod config;
pub mod orchestrator;
pub mod player;
