use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::ExtractError;

/// Class markers of the animal table on the list page.
pub const LISTING_TABLE_CSS: &str = "table.wikitable.sortable.sticky-header";
/// Taxonomy infobox on individual animal pages.
pub const INFOBOX_TABLE_CSS: &str = "table.infobox.biota";

static TBODY_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tbody").unwrap());
static TH_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("th").unwrap());

/// A table located by CSS class markers plus a candidate index. The list
/// page carries a generic-terms table with the same markers ahead of the
/// animal table, hence `index: 1` for the listing.
#[derive(Debug, Clone)]
pub struct TableTarget {
    pub css: String,
    pub index: usize,
}

impl TableTarget {
    pub fn listing() -> Self {
        Self {
            css: LISTING_TABLE_CSS.to_string(),
            index: 1,
        }
    }

    pub fn infobox() -> Self {
        Self {
            css: INFOBOX_TABLE_CSS.to_string(),
            index: 0,
        }
    }

    /// Nth matching table, or a structure error naming how many matched.
    pub fn find<'a>(&self, doc: &'a Html) -> Result<ElementRef<'a>, ExtractError> {
        let sel = self.selector()?;
        let found: Vec<ElementRef> = doc.select(&sel).collect();
        found.get(self.index).copied().ok_or_else(|| {
            ExtractError::Structure(format!(
                "expected table {} of '{}', found {} match(es); page layout may have changed",
                self.index + 1,
                self.css,
                found.len()
            ))
        })
    }

    /// Like `find`, but absence is fine (detail pages without an infobox).
    pub fn try_find<'a>(&self, doc: &'a Html) -> Option<ElementRef<'a>> {
        let sel = self.selector().ok()?;
        let found = doc.select(&sel).nth(self.index);
        if found.is_none() {
            debug!("no '{}' table in document", self.css);
        }
        found
    }

    fn selector(&self) -> Result<Selector, ExtractError> {
        Selector::parse(&self.css).map_err(|e| {
            ExtractError::Structure(format!("bad table selector '{}': {}", self.css, e))
        })
    }
}

/// First `tbody` under a table. html5ever inserts one even when the source
/// markup omits it.
pub fn table_body(table: ElementRef<'_>) -> Option<ElementRef<'_>> {
    table.select(&TBODY_SEL).next()
}

/// Zero-based ordinal of the `<th>` whose trimmed text equals `header`,
/// scanning all header cells of the body in tree order. MediaWiki closes
/// header cells after a newline, so the text is trimmed before comparing.
pub fn header_index(body: ElementRef<'_>, header: &str) -> Option<usize> {
    body.select(&TH_SEL)
        .position(|th| th.text().collect::<String>().trim() == header)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MARKERS: &str = "wikitable sortable sticky-header";

    fn doc(body: &str) -> Html {
        Html::parse_document(&format!("<html><body>{}</body></html>", body))
    }

    #[test]
    fn listing_takes_second_match() {
        let d = doc(&format!(
            "<table class=\"{m}\"><tbody><tr><td>first</td></tr></tbody></table>\
             <table class=\"{m}\"><tbody><tr><td>second</td></tr></tbody></table>",
            m = MARKERS
        ));
        let table = TableTarget::listing().find(&d).unwrap();
        let text: String = table.text().collect();
        assert!(text.contains("second"));
        assert!(!text.contains("first"));
    }

    #[test]
    fn too_few_matches_is_structure_error() {
        let none = doc("<p>no tables here</p>");
        assert!(matches!(
            TableTarget::listing().find(&none),
            Err(ExtractError::Structure(_))
        ));

        let one = doc(&format!(
            "<table class=\"{}\"><tbody><tr><td>only</td></tr></tbody></table>",
            MARKERS
        ));
        assert!(matches!(
            TableTarget::listing().find(&one),
            Err(ExtractError::Structure(_))
        ));
    }

    #[test]
    fn partial_markers_do_not_match() {
        // First table lacks sticky-header, so only one real candidate exists.
        let d = doc(&format!(
            "<table class=\"wikitable sortable\"><tbody><tr><td>nav</td></tr></tbody></table>\
             <table class=\"{}\"><tbody><tr><td>animals</td></tr></tbody></table>",
            MARKERS
        ));
        assert!(matches!(
            TableTarget::listing().find(&d),
            Err(ExtractError::Structure(_))
        ));
    }

    #[test]
    fn header_index_trims_cell_text() {
        let d = doc(&format!(
            "<table class=\"{}\"><tbody><tr><th>Animal\n</th><th>Young\n</th><th>Collateral adjective\n</th></tr></tbody></table>",
            MARKERS
        ));
        let target = TableTarget {
            css: LISTING_TABLE_CSS.to_string(),
            index: 0,
        };
        let body = table_body(target.find(&d).unwrap()).unwrap();
        assert_eq!(header_index(body, "Animal"), Some(0));
        assert_eq!(header_index(body, "Collateral adjective"), Some(2));
        assert_eq!(header_index(body, "Adult"), None);
    }

    #[test]
    fn try_find_absent_infobox() {
        let d = doc("<p>article text without an infobox</p>");
        assert!(TableTarget::infobox().try_find(&d).is_none());
    }

    #[test]
    fn infobox_first_match() {
        let d = doc(
            "<table class=\"infobox biota\"><tbody><tr><td>taxo</td></tr></tbody></table>\
             <table class=\"infobox biota\"><tbody><tr><td>later</td></tr></tbody></table>",
        );
        let table = TableTarget::infobox().try_find(&d).unwrap();
        let text: String = table.text().collect();
        assert!(text.contains("taxo"));
    }
}
