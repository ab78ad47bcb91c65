//! Master manifest parsing.

use hls_m3u8::{tags::VariantStream as HlsVariantStream, MasterPlaylist, MediaPlaylist};
use vodplay_common::{PlayerError, Result};

/// One variant stream declared by a master manifest, in manifest order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestLevel {
    /// Position in the manifest. This is the engine's level index.
    pub index: usize,
    /// Media playlist URI, relative to the manifest. Empty when the manifest
    /// is itself the only media playlist.
    pub uri: String,
    /// Advertised bandwidth in bits per second.
    pub bandwidth: Option<u64>,
    /// Video width in pixels.
    pub width: Option<u32>,
    /// Video height in pixels.
    pub height: Option<u32>,
    /// Raw `CODECS` attribute.
    pub codecs: Option<String>,
}

impl ManifestLevel {
    /// A level with only the fields the ladder cares about.
    pub fn with_height(index: usize, height: u32) -> Self {
        Self {
            index,
            uri: format!("{height}p/playlist.m3u8"),
            bandwidth: None,
            width: None,
            height: Some(height),
            codecs: None,
        }
    }
}

/// Parse manifest text into its ordered variant levels.
///
/// A master playlist yields one level per `#EXT-X-STREAM-INF`; I-frame
/// variants are not playable levels and are skipped. A bare media playlist
/// yields a single level pointing back at the manifest itself.
pub fn parse_master(text: &str) -> Result<Vec<ManifestLevel>> {
    if !text.trim_start().starts_with("#EXTM3U") {
        return Err(PlayerError::manifest("missing #EXTM3U header"));
    }

    if !text.contains("#EXT-X-STREAM-INF") {
        return parse_single_rendition(text);
    }

    let master = MasterPlaylist::try_from(text).map_err(|e| PlayerError::manifest(e.to_string()))?;

    let levels: Vec<ManifestLevel> = master
        .variant_streams
        .iter()
        .filter_map(|vs| match vs {
            HlsVariantStream::ExtXStreamInf {
                uri, stream_data, ..
            } => Some((uri.to_string(), stream_data)),
            HlsVariantStream::ExtXIFrame { .. } => None,
        })
        .enumerate()
        .map(|(index, (uri, stream_data))| {
            let resolution = stream_data.resolution();
            ManifestLevel {
                index,
                uri,
                bandwidth: Some(stream_data.bandwidth()),
                width: resolution.map(|r| r.width() as u32),
                height: resolution.map(|r| r.height() as u32),
                codecs: stream_data.codecs().map(|c| c.to_string()),
            }
        })
        .collect();

    if levels.is_empty() {
        return Err(PlayerError::manifest("manifest declares no playable variants"));
    }

    tracing::debug!(levels = levels.len(), "Parsed master manifest");
    Ok(levels)
}

fn parse_single_rendition(text: &str) -> Result<Vec<ManifestLevel>> {
    MediaPlaylist::try_from(text).map_err(|e| PlayerError::manifest(e.to_string()))?;

    tracing::debug!("Manifest is a single media playlist");
    Ok(vec![ManifestLevel {
        index: 0,
        uri: String::new(),
        bandwidth: None,
        width: None,
        height: None,
        codecs: None,
    }])
}
