pub mod assets;
pub mod client;
pub mod items;

pub use assets::AssetUploader;
pub use client::{ContentApi, OcmClient, OcmError, UploadedAsset};
pub use items::ProductRecorder;

/// Characters OCM rejects in item names.
const UNSAFE_NAME_CHARS: &[char] = &[
    '&', '/', '\\', '#', ',', '+', '(', ')', '$', '~', '%', '\'', '"', ':', ';', '*', '?', '<',
    '>', '{', '}',
];

pub fn sanitize_name(value: &str) -> String {
    value
        .chars()
        .filter(|ch| !UNSAFE_NAME_CHARS.contains(ch))
        .collect()
}
