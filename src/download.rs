use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use reqwest::Client;

use crate::fetch;

/// Download an image and store it as `<dir>/<slug>.<ext>`, with the
/// extension taken from the URL path when it carries a plausible one.
pub async fn save_image(
    client: &Client,
    image_url: &str,
    dir: &Path,
    name: &str,
) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;

    let bytes = fetch::fetch_bytes(client, image_url).await?;
    let path = dir.join(format!("{}.{}", slug(name), extension(image_url)));
    std::fs::write(&path, &bytes)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

/// Lowercased alphanumerics with single dashes: "Ground squirrel" becomes
/// "ground-squirrel".
fn slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.is_empty() && !out.ends_with('-') {
            out.push('-');
        }
    }
    out.trim_end_matches('-').to_string()
}

fn extension(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    match path.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() && ext.len() <= 4 && ext.chars().all(|c| c.is_ascii_alphanumeric()) => ext,
        _ => "jpg",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_flattens_punctuation_and_case() {
        assert_eq!(slug("Aardvark"), "aardvark");
        assert_eq!(slug("Ground squirrel"), "ground-squirrel");
        assert_eq!(slug("  Pere David's deer "), "pere-david-s-deer");
    }

    #[test]
    fn extension_from_url_path() {
        assert_eq!(
            extension("https://upload.wikimedia.org/thumb/Aardvark.jpg/250px-Aardvark.png"),
            "png"
        );
        assert_eq!(extension("https://example.org/photo.jpeg?download=1"), "jpeg");
    }

    #[test]
    fn extension_defaults_to_jpg() {
        assert_eq!(extension("https://example.org/image"), "jpg");
        assert_eq!(extension("https://example.org/a.b/image"), "jpg");
    }
}
