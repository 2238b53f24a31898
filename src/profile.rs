use std::{fs, path::Path};

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Declarative description of one listing endpoint: where the pages live and
/// which selectors map page markup to record fields. Site markup changes are
/// absorbed by editing a profile (or loading one from JSON), not code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteProfile {
    pub name: String,
    /// Path of the paginated listing, e.g. "/Car/Management".
    pub listing_path: String,
    /// Query parameter carrying the 1-based page index. Page 1 uses the bare URL.
    pub page_param: String,
    /// Query parameter requesting a larger page, e.g. "pageSize".
    #[serde(default = "default_page_size_param")]
    pub page_size_param: String,
    /// Items per page; sent on every page fetch when set.
    #[serde(default)]
    pub page_size: Option<u32>,
    /// Selector the browser variant waits on before reading the page.
    pub ready_selector: String,
    pub row: RowRule,
    pub next_page: NextPageRule,
}

fn default_page_size_param() -> String {
    "pageSize".into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RowRule {
    /// Positional extraction: one record per row, one field per `<td>` in order.
    Table {
        row_selector: String,
        fields: Vec<String>,
    },
    /// Card extraction: one record per container, each field located by selector.
    Cards {
        item_selector: String,
        fields: Vec<FieldRule>,
        #[serde(default)]
        split: Option<SplitRule>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldRule {
    pub name: String,
    pub selector: String,
}

/// Derives extra fields by splitting an already-extracted field on a delimiter.
/// Missing segments yield empty strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitRule {
    pub source: String,
    pub delimiter: char,
    pub into: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NextPageRule {
    pub selector: String,
    pub disabled_class: String,
}

impl SiteProfile {
    /// The 9-column management table read by the browser variant.
    pub fn management_table() -> Self {
        SiteProfile {
            name: "management".into(),
            listing_path: "/Car/Management".into(),
            page_param: "page".into(),
            page_size_param: default_page_size_param(),
            page_size: None,
            ready_selector: "table.table".into(),
            row: RowRule::Table {
                row_selector: "table.table tbody tr".into(),
                fields: vec![
                    "date".into(),
                    "car_number".into(),
                    "car_name".into(),
                    "model_year".into(),
                    "mileage".into(),
                    "price".into(),
                    "status".into(),
                    "dealer".into(),
                    "location".into(),
                ],
            },
            next_page: NextPageRule {
                selector: "a.next-page".into(),
                disabled_class: "disabled".into(),
            },
        }
    }

    /// The card-style search listing read by the http variant. The combined
    /// info field is pipe-split into year/mileage/fuel_type.
    pub fn search_cards() -> Self {
        SiteProfile {
            name: "search".into(),
            listing_path: "/Car/Search".into(),
            page_param: "page".into(),
            page_size_param: default_page_size_param(),
            page_size: None,
            ready_selector: "div.car-item".into(),
            row: RowRule::Cards {
                item_selector: "div.car-item".into(),
                fields: vec![
                    FieldRule {
                        name: "title".into(),
                        selector: "div.car-title".into(),
                    },
                    FieldRule {
                        name: "price".into(),
                        selector: "div.car-price".into(),
                    },
                    FieldRule {
                        name: "info".into(),
                        selector: "div.car-info".into(),
                    },
                    FieldRule {
                        name: "details".into(),
                        selector: "div.car-details".into(),
                    },
                ],
                split: Some(SplitRule {
                    source: "info".into(),
                    delimiter: '|',
                    into: vec!["year".into(), "mileage".into(), "fuel_type".into()],
                }),
            },
            next_page: NextPageRule {
                selector: "ul.pagination a.next".into(),
                disabled_class: "disabled".into(),
            },
        }
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)
            .context(format!("could not read site profile {:?}", path))?;
        let profile: SiteProfile = serde_json::from_str(&raw)
            .context(format!("could not parse site profile {:?}", path))?;
        Ok(profile)
    }

    /// Field names in export order: the rule's own fields, then split targets.
    pub fn schema(&self) -> Vec<String> {
        match &self.row {
            RowRule::Table { fields, .. } => fields.clone(),
            RowRule::Cards { fields, split, .. } => {
                let mut names: Vec<String> = fields.iter().map(|f| f.name.clone()).collect();
                if let Some(split) = split {
                    names.extend(split.into.iter().cloned());
                }
                names
            }
        }
    }

    pub fn page_url(&self, base_url: &str, page: u32) -> String {
        let mut url = format!("{}{}", base_url.trim_end_matches('/'), self.listing_path);
        let mut separator = '?';
        if let Some(size) = self.page_size {
            url.push_str(&format!("{}{}={}", separator, self.page_size_param, size));
            separator = '&';
        }
        if page > 1 {
            url.push_str(&format!("{}{}={}", separator, self.page_param, page));
        }
        url
    }
}
