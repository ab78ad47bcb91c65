//! Catalog access: the HTTP client for the video service and the gate that
//! turns an identifier into a [`VideoRecord`](vodplay_common::VideoRecord).

mod client;
mod gate;

pub use client::{HttpCatalog, VideoCatalog};
pub use gate::MetadataGate;
