use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use crate::capture::pipeline::FinalAsset;
use crate::config::settings::ExportFormat;
use crate::foundation::error::{MotionError, MotionResult};

/// Directory prefix of every virtual export path.
pub const EXPORT_NAMESPACE: &str = "ExportTemplate";

pub const POSTER_MEDIA_TYPE: &str = "image/jpeg";

/// `data:` URL of `bytes` tagged with `media` (e.g. `video/webm;codecs=vp9`).
pub fn to_data_url(media: &str, bytes: &[u8]) -> String {
    format!("data:{media};base64,{}", STANDARD.encode(bytes))
}

/// Strip the `data:<media type>[;codecs=...];base64,` prefix, leaving only the payload.
///
/// Text that is not a base64 data URL is returned unchanged.
pub fn strip_data_url_prefix(url: &str) -> &str {
    if !url.starts_with("data:") {
        return url;
    }
    match url.find(";base64,") {
        Some(i) => &url[i + ";base64,".len()..],
        None => url,
    }
}

/// Text-safe transport form of a binary asset.
pub fn encode_transport(media: &str, bytes: &[u8]) -> String {
    strip_data_url_prefix(&to_data_url(media, bytes)).to_owned()
}

pub fn decode_transport(text: &str) -> MotionResult<Vec<u8>> {
    STANDARD
        .decode(strip_data_url_prefix(text.trim()))
        .map_err(|e| MotionError::validation(format!("invalid transport encoding: {e}")))
}

/// Virtual path the host stores the video under.
pub fn virtual_path(size_id: &str, format: ExportFormat) -> String {
    format!("{EXPORT_NAMESPACE}/{size_id}.{}", format.extension())
}

/// Both assets of an export in transport form, plus the virtual path of the video.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct TransportAsset {
    pub path: String,
    pub video: String,
    pub poster: String,
}

impl TransportAsset {
    pub fn encode(asset: &FinalAsset, size_id: &str, format: ExportFormat) -> Self {
        Self {
            path: virtual_path(size_id, format),
            video: encode_transport(&asset.container.to_string(), &asset.video),
            poster: encode_transport(POSTER_MEDIA_TYPE, &asset.poster),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/handshake/transport.rs"]
mod tests;
