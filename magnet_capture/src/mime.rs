//! Best-effort container negotiation.

/// Container types in order of preference.
pub const MIME_PRIORITY: &[&str] = &[
    "video/webm;codecs=vp9",
    "video/webm;codecs=vp8",
    "video/webm",
    "video/mp4",
    "video/x-matroska;codecs=avc1",
];

/// Used when neither the recorder nor its chunks name a type.
pub const FALLBACK_MIME: &str = "video/webm";

/// First entry of [`MIME_PRIORITY`] the recorder accepts, else `None` to let
/// the recorder pick its platform default.
pub fn negotiate(supported: impl Fn(&str) -> bool) -> Option<&'static str> {
    MIME_PRIORITY.iter().copied().find(|m| supported(m))
}

/// File extension for an artifact of type `mime`.
pub fn extension_for(mime: &str) -> &'static str {
    let base = mime.split(';').next().unwrap_or(mime).trim();
    match base {
        "video/mp4"           => "mp4",
        "video/x-motion-jpeg" => "mjpeg",
        "image/png"           => "png",
        "image/jpeg"          => "jpg",
        _                     => "webm",
    }
}
