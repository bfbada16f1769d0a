use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::table::{self, TableTarget};

static IMG_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("img").unwrap());
static FILE_IMG_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("img.mw-file-element").unwrap());

/// Image URL for one animal page: the taxonomy infobox image when there is
/// one, otherwise the first rendered-file image in the article body.
pub fn extract_image_url(html: &str) -> Option<String> {
    let doc = Html::parse_document(html);

    if let Some(src) = infobox_image(&doc) {
        return Some(normalize_image_url(&src));
    }
    if let Some(src) = doc.select(&FILE_IMG_SEL).next().and_then(img_src) {
        return Some(normalize_image_url(&src));
    }
    debug!("no usable image on page");
    None
}

fn infobox_image(doc: &Html) -> Option<String> {
    let table = TableTarget::infobox().try_find(doc)?;
    let body = table::table_body(table)?;
    body.select(&IMG_SEL).next().and_then(img_src)
}

fn img_src(img: ElementRef<'_>) -> Option<String> {
    img.value()
        .attr("src")
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

/// Wikipedia serves image sources protocol-relative; give those a scheme
/// and leave full URLs alone.
pub fn normalize_image_url(src: &str) -> String {
    if src.starts_with("//") {
        format!("https:{}", src)
    } else {
        src.to_string()
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infobox_image_wins() {
        let html = std::fs::read_to_string("tests/fixtures/animal_page_infobox.html").unwrap();
        assert_eq!(
            extract_image_url(&html).as_deref(),
            Some("https://upload.wikimedia.org/wikipedia/commons/thumb/Aardvark.jpg/250px-Aardvark.jpg")
        );
    }

    #[test]
    fn falls_back_to_rendered_file_image() {
        let html = std::fs::read_to_string("tests/fixtures/animal_page_no_infobox.html").unwrap();
        assert_eq!(
            extract_image_url(&html).as_deref(),
            Some("https://upload.wikimedia.org/wikipedia/commons/thumb/Weasel.jpg/220px-Weasel.jpg")
        );
    }

    #[test]
    fn imageless_infobox_falls_through() {
        let html = r#"<html><body>
            <table class="infobox biota"><tbody>
            <tr><th>Classification</th></tr>
            <tr><td>Mammalia</td></tr>
            </tbody></table>
            <img class="mw-file-element" src="//upload.example.org/body.jpg">
            </body></html>"#;
        assert_eq!(
            extract_image_url(html).as_deref(),
            Some("https://upload.example.org/body.jpg")
        );
    }

    #[test]
    fn no_image_anywhere() {
        let html = "<html><body><p>Text only article.</p><img src=\"/icon.png\"></body></html>";
        assert_eq!(extract_image_url(html), None);
    }

    #[test]
    fn normalize_prefixes_protocol_relative_only() {
        assert_eq!(
            normalize_image_url("//upload.wikimedia.org/x.jpg"),
            "https://upload.wikimedia.org/x.jpg"
        );
        assert_eq!(
            normalize_image_url("https://upload.wikimedia.org/x.jpg"),
            "https://upload.wikimedia.org/x.jpg"
        );
        assert_eq!(normalize_image_url("http://example.org/x.jpg"), "http://example.org/x.jpg");
        assert_eq!(normalize_image_url("/relative/x.jpg"), "/relative/x.jpg");
    }
}
