use chrono::Local;

pub const FILENAME_TS: &str = "%Y%m%d_%H%M%S";

/// Timestamp token shared by the data file and its summary sibling.
pub fn run_timestamp() -> String {
    Local::now().format(FILENAME_TS).to_string()
}

/// Parses a free-text price such as "1,234만원". Empty or non-numeric input
/// is a parse failure, not zero.
pub fn parse_price(raw: &str) -> Option<f64> {
    let cleaned = raw.replace(',', "").replace("만원", "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok()
}
