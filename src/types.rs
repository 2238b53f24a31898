use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// One parsed car entry. Values are aligned to the active profile's schema;
/// a field the page did not provide is an empty string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingRecord {
    pub values: Vec<String>,
}

impl ListingRecord {
    pub fn new(values: Vec<String>) -> Self {
        ListingRecord { values }
    }
}

/// Why the pagination loop ended. `FetchFailed` is deliberately kept apart
/// from `Exhausted` so a transient error is not reported as end-of-results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Exhausted,
    LimitReached,
    NoNextControl,
    FetchFailed,
    Terminated,
}

#[derive(Debug)]
pub struct CrawlOutcome {
    pub records: Vec<ListingRecord>,
    pub pages_fetched: u32,
    pub stop: StopReason,
}

#[derive(Debug)]
pub struct ExportedFiles {
    pub data: PathBuf,
    pub summary: PathBuf,
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("browser error: {0}")]
    Browser(String),
    #[error("login verification failed")]
    VerificationFailed,
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {0}")]
    Status(u16),
    #[error("browser error: {0}")]
    Browser(String),
    #[error("listing content did not appear in time")]
    ContentUnavailable,
}

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("invalid selector `{selector}`: {reason}")]
    BadSelector { selector: String, reason: String },
}
