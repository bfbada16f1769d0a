use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use tracing::{debug, warn};

use super::table::{self, TableTarget};
use super::{ExtractError, Record};

static TR_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").unwrap());
static TD_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").unwrap());
static A_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a").unwrap());
static SEE_REF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)see\s+([A-Za-z]+)").unwrap());

/// Editorial "no value" markers used in adjective cells.
const PLACEHOLDERS: &[&str] = &["-", "—", "–"];

/// Where and how to read the listing table. Defaults match the Wikipedia
/// animal-names list; tests swap in other markers and header texts.
#[derive(Debug, Clone)]
pub struct ListingProfile {
    pub table: TableTarget,
    pub name_header: String,
    pub adjective_header: String,
    pub base_url: String,
}

impl Default for ListingProfile {
    fn default() -> Self {
        Self {
            table: TableTarget::listing(),
            name_header: "Animal".to_string(),
            adjective_header: "Collateral adjective".to_string(),
            base_url: "https://en.wikipedia.org".to_string(),
        }
    }
}

/// Walk the listing table and build the keyed record collection.
///
/// Records are keyed by lowercased name; a repeated name keeps its first
/// position and takes the later row's fields. After the scan, "see X" rows
/// back-fill empty adjective lists from their target, one hop, in the
/// order the references were first seen.
pub fn resolve(
    doc: &Html,
    profile: &ListingProfile,
    extended: bool,
) -> Result<Vec<Record>, ExtractError> {
    let table = profile.table.find(doc)?;
    let body = table::table_body(table)
        .ok_or_else(|| ExtractError::Structure("listing table has no tbody".into()))?;

    let name_col = table::header_index(body, &profile.name_header).ok_or_else(|| {
        ExtractError::Structure(format!(
            "no '{}' column in listing table",
            profile.name_header
        ))
    })?;
    let adjective_col = table::header_index(body, &profile.adjective_header).ok_or_else(|| {
        ExtractError::Structure(format!(
            "no '{}' column in listing table",
            profile.adjective_header
        ))
    })?;

    let mut records: Vec<Record> = Vec::new();
    let mut index_by_key: HashMap<String, usize> = HashMap::new();
    let mut references: Vec<(String, String)> = Vec::new();

    for row in body.select(&TR_SEL) {
        let cells: Vec<ElementRef> = row.select(&TD_SEL).collect();
        if cells.is_empty() {
            continue; // header and section-divider rows
        }

        let (name, link) = resolve_name(&cells, name_col)?;

        if let Some(target) = see_reference(cells[name_col]) {
            note_reference(&mut references, &name, target);
        }

        let adjectives = resolve_adjectives(&cells, adjective_col, &name);
        let page_url = if extended {
            resolve_page_url(link, &profile.base_url, &name)
        } else {
            None
        };

        let record = Record {
            name: name.clone(),
            adjectives,
            page_url,
            image: None,
        };
        let key = name.to_lowercase();
        if let Some(&at) = index_by_key.get(&key) {
            debug!("duplicate row for '{}', keeping the later fields", name);
            records[at] = record;
        } else {
            index_by_key.insert(key, records.len());
            records.push(record);
        }
    }

    backfill_adjectives(&mut records, &index_by_key, &references);
    Ok(records)
}

/// The name is the sole direct text fragment of the first link in the name
/// cell. Anything else (no cell, no link, zero or several fragments) means
/// the row does not have the shape the rest of the pipeline relies on.
fn resolve_name<'a>(
    cells: &[ElementRef<'a>],
    col: usize,
) -> Result<(String, ElementRef<'a>), ExtractError> {
    let cell = cells.get(col).copied().ok_or_else(|| {
        ExtractError::MalformedRow(format!(
            "row has {} cells, name expected at column {}",
            cells.len(),
            col
        ))
    })?;
    let link = cell.select(&A_SEL).next().ok_or_else(|| {
        ExtractError::MalformedRow(format!("no link in name cell '{}'", cell_text(cell).trim()))
    })?;
    let mut fragments = direct_text_fragments(link);
    if fragments.len() != 1 {
        return Err(ExtractError::MalformedRow(format!(
            "expected one name fragment, got {:?} in cell '{}'",
            fragments,
            cell_text(cell).trim()
        )));
    }
    Ok((fragments.remove(0), link))
}

/// Direct text-node children only. Nested markup (footnote sups, italics)
/// does not contribute.
fn direct_text_fragments(el: ElementRef<'_>) -> Vec<String> {
    el.children()
        .filter_map(|node| match node.value() {
            Node::Text(t) => {
                let s = t.trim();
                (!s.is_empty()).then(|| s.to_string())
            }
            _ => None,
        })
        .collect()
}

fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text().collect()
}

/// "see X" anywhere in the name cell marks a forward reference to another
/// record.
fn see_reference(cell: ElementRef<'_>) -> Option<String> {
    let text = cell_text(cell);
    SEE_REF_RE.captures(&text).map(|caps| caps[1].to_string())
}

/// Re-observing a name updates its target in place, keeping the original
/// order of the reference list.
fn note_reference(references: &mut Vec<(String, String)>, name: &str, target: String) {
    if let Some(entry) = references.iter_mut().find(|(from, _)| from == name) {
        entry.1 = target;
    } else {
        references.push((name.to_string(), target));
    }
}

/// Direct text fragments of the adjective cell with placeholder dashes
/// dropped. Missing cells and all-placeholder cells are data gaps, not
/// errors.
fn resolve_adjectives(cells: &[ElementRef<'_>], col: usize, name: &str) -> Option<Vec<String>> {
    let Some(cell) = cells.get(col).copied() else {
        warn!("'{}': row too short for an adjective cell", name);
        return None;
    };
    let adjectives: Vec<String> = direct_text_fragments(cell)
        .into_iter()
        .filter(|s| !PLACEHOLDERS.contains(&s.as_str()))
        .collect();
    if adjectives.is_empty() {
        debug!("'{}': no collateral adjectives listed", name);
        return None;
    }
    Some(adjectives)
}

/// Absolute detail-page URL from the name link's href. A missing target is
/// logged and left empty.
fn resolve_page_url(link: ElementRef<'_>, base_url: &str, name: &str) -> Option<String> {
    match link.value().attr("href") {
        Some(href) if !href.is_empty() => Some(absolutize(base_url, href)),
        _ => {
            warn!("'{}': name link has no href", name);
            None
        }
    }
}

fn absolutize(base_url: &str, href: &str) -> String {
    if href.starts_with("http") {
        href.to_string()
    } else {
        format!("{}{}", base_url, href)
    }
}

/// One-hop fill of empty adjective lists from "see X" targets, applied in
/// the order the references were seen. The donor's list is read at apply
/// time, so an earlier reference can feed a later one, but chains observed
/// in scan order never collapse transitively.
fn backfill_adjectives(
    records: &mut [Record],
    index_by_key: &HashMap<String, usize>,
    references: &[(String, String)],
) {
    for (from, to) in references {
        let (Some(&i), Some(&j)) = (
            index_by_key.get(&from.to_lowercase()),
            index_by_key.get(&to.to_lowercase()),
        ) else {
            warn!("unresolved reference '{}' -> '{}'", from, to);
            continue;
        };
        let empty = records[i]
            .adjectives
            .as_ref()
            .map_or(true, |a| a.is_empty());
        if empty {
            records[i].adjectives = records[j].adjectives.clone();
        }
    }
}

// ── Tests ──
