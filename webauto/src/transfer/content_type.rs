//! Content-Type policy for uploaded objects.

use std::path::Path;

/// Content-Type used when the extension is unknown, binary files included.
pub const FALLBACK_CONTENT_TYPE: &str = "text/plain";

/// Infer the Content-Type for an object key from its file extension.
pub fn for_key(key: &str) -> &'static str {
    guess(key).unwrap_or(FALLBACK_CONTENT_TYPE)
}

/// Extension lookup without the fallback applied.
pub fn guess(key: &str) -> Option<&'static str> {
    let ext = Path::new(key)
        .extension()
        .and_then(|x| x.to_str())
        .map(|x| x.to_ascii_lowercase())?;

    let mime = match ext.as_str() {
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" | "mjs" => "application/javascript",
        "json" | "map" => "application/json",
        "txt" => "text/plain",
        "md" | "markdown" => "text/markdown",
        "csv" => "text/csv",
        "xml" => "application/xml",
        "rss" => "application/rss+xml",
        "atom" => "application/atom+xml",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "gz" => "application/gzip",
        "wasm" => "application/wasm",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        _ => return None,
    };
    Some(mime)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_site_assets() {
        assert_eq!(for_key("index.html"), "text/html");
        assert_eq!(for_key("css/site.css"), "text/css");
        assert_eq!(for_key("js/app.js"), "application/javascript");
        assert_eq!(for_key("img/logo.PNG"), "image/png");
    }

    #[test]
    fn test_unknown_extension_falls_back() {
        assert_eq!(guess("data.bin"), None);
        assert_eq!(for_key("data.bin"), FALLBACK_CONTENT_TYPE);
        assert_eq!(for_key("LICENSE"), "text/plain");
    }
}
