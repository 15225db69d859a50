//! Embedded chat UI
//!
//! In development, falls back to serving from the filesystem.

use rust_embed::Embed;

#[derive(Embed)]
#[folder = "ui"]
struct Assets;

/// Get the index.html content (embedded or from filesystem)
pub fn get_index_html() -> Option<String> {
    if let Some(content) = Assets::get("index.html") {
        return String::from_utf8(content.data.to_vec()).ok();
    }

    std::fs::read_to_string("ui/index.html").ok()
}

/// Look up an embedded asset and its MIME type
pub fn get_asset(path: &str) -> Option<(Vec<u8>, String)> {
    let content = Assets::get(path)?;
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    Some((content.data.to_vec(), mime.to_string()))
}
