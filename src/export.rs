use std::path::Path;

use anyhow::{Context, Result};

use crate::parser::Record;

const PAGE_HEAD: &str = r#"<!DOCTYPE html>
<html>
<head>
    <title>Animals and Collateral Adjectives</title>
    <style>
        body { font-family: Arial, sans-serif; }
        .animal { margin-bottom: 20px; }
        img { width: 200px; height: auto; margin-top: 10px; }
    </style>
</head>
<body>
    <h1>List of Animals and Their Collateral Adjectives</h1>
    <div class="animal-list">
"#;

const PAGE_FOOT: &str = "    </div>\n</body>\n</html>\n";

/// Render the report page.
pub fn render(records: &[Record]) -> String {
    let mut html = String::from(PAGE_HEAD);

    for record in records {
        let adjectives = record
            .adjectives
            .as_ref()
            .filter(|a| !a.is_empty())
            .map(|a| a.join(", "))
            .unwrap_or_else(|| "-".to_string());

        html.push_str("        <div class=\"animal\">\n");
        html.push_str(&format!("            <h2>{}</h2>\n", escape(&record.name)));
        html.push_str(&format!(
            "            <p><strong>Collateral Adjectives:</strong> {}</p>\n",
            escape(&adjectives)
        ));
        if let Some(image) = &record.image {
            html.push_str(&format!(
                "            <img src=\"{}\" alt=\"{} image\"/>\n",
                escape(image),
                escape(&record.name)
            ));
        }
        html.push_str("        </div>\n");
    }

    html.push_str(PAGE_FOOT);
    html
}

/// Write the report, one file per run.
pub fn write_report(records: &[Record], path: &Path) -> Result<()> {
    std::fs::write(path, render(records))
        .with_context(|| format!("Failed to write report to {}", path.display()))
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, adjectives: Option<Vec<&str>>, image: Option<&str>) -> Record {
        Record {
            name: name.to_string(),
            adjectives: adjectives.map(|a| a.iter().map(|s| s.to_string()).collect()),
            page_url: None,
            image: image.map(|s| s.to_string()),
        }
    }

    #[test]
    fn renders_names_and_joined_adjectives() {
        let html = render(&[record("Bee", Some(vec!["apian", "apiarian"]), None)]);
        assert!(html.contains("<h2>Bee</h2>"));
        assert!(html.contains("apian, apiarian"));
    }

    #[test]
    fn missing_adjectives_render_as_dash() {
        let html = render(&[record("Moth", None, None)]);
        assert!(html.contains("<strong>Collateral Adjectives:</strong> -</p>"));
    }

    #[test]
    fn image_tag_only_when_present() {
        let with = render(&[record("Weasel", None, Some("data/images/weasel.jpg"))]);
        assert!(with.contains("src=\"data/images/weasel.jpg\""));
        assert!(with.contains("alt=\"Weasel image\""));

        let without = render(&[record("Weasel", None, None)]);
        assert!(!without.contains("<img"));
    }

    #[test]
    fn escapes_markup_in_fields() {
        let html = render(&[record("Fish & <chips>", None, None)]);
        assert!(html.contains("Fish &amp; &lt;chips&gt;"));
    }
}
