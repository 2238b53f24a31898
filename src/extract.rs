use scraper::{ElementRef, Html, Selector};

use crate::{
    profile::{RowRule, SiteProfile},
    types::{ExtractError, ListingRecord},
};

lazy_static! {
    static ref TD: Selector = Selector::parse("td").unwrap();
}

pub(crate) fn parse_selector(selector: &str) -> Result<Selector, ExtractError> {
    Selector::parse(selector).map_err(|e| ExtractError::BadSelector {
        selector: selector.into(),
        reason: format!("{:?}", e),
    })
}

fn text_of(element: ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Parses one listing page into records, in document order. A container that
/// yields nothing extractable is skipped; its siblings still go through.
/// An empty vec is the "no data" signal for the pagination controller.
pub fn extract_records(
    html: &str,
    profile: &SiteProfile,
) -> Result<Vec<ListingRecord>, ExtractError> {
    let document = Html::parse_document(html);
    let mut records = Vec::new();

    match &profile.row {
        RowRule::Table {
            row_selector,
            fields,
        } => {
            let rows = parse_selector(row_selector)?;
            for row in document.select(&rows) {
                let cells: Vec<String> = row.select(&TD).map(text_of).collect();
                if cells.is_empty() {
                    debug!("skipping row without data cells");
                    continue;
                }
                let values = (0..fields.len())
                    .map(|i| cells.get(i).cloned().unwrap_or_default())
                    .collect();
                records.push(ListingRecord::new(values));
            }
        }
        RowRule::Cards {
            item_selector,
            fields,
            split,
        } => {
            let items = parse_selector(item_selector)?;
            let field_selectors = fields
                .iter()
                .map(|f| parse_selector(&f.selector))
                .collect::<Result<Vec<_>, _>>()?;
            for item in document.select(&items) {
                let mut values: Vec<String> = field_selectors
                    .iter()
                    .map(|sel| item.select(sel).next().map(text_of).unwrap_or_default())
                    .collect();
                if let Some(split) = split {
                    let source = fields
                        .iter()
                        .position(|f| f.name == split.source)
                        .and_then(|i| values.get(i).cloned())
                        .unwrap_or_default();
                    let parts: Vec<&str> = source.split(split.delimiter).collect();
                    for i in 0..split.into.len() {
                        values.push(
                            parts
                                .get(i)
                                .map(|p| p.trim().to_string())
                                .unwrap_or_default(),
                        );
                    }
                }
                records.push(ListingRecord::new(values));
            }
        }
    }

    Ok(records)
}

/// True when the next-page affordance is present and not marked disabled.
pub fn has_next_page(html: &str, profile: &SiteProfile) -> Result<bool, ExtractError> {
    let document = Html::parse_document(html);
    let next = parse_selector(&profile.next_page.selector)?;
    match document.select(&next).next() {
        Some(element) => {
            let classes = element.value().attr("class").unwrap_or("");
            Ok(!classes
                .split_whitespace()
                .any(|c| c == profile.next_page.disabled_class))
        }
        None => Ok(false),
    }
}
