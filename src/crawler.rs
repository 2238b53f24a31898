use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use crate::{
    extract::{extract_records, has_next_page},
    profile::SiteProfile,
    types::{CrawlOutcome, Credentials, ExtractError, FetchError, SessionError, StopReason},
};

/// An authenticated handle to the listing site. Both the browser session and
/// the http session implement this; tests drive the controller with canned pages.
pub trait PageSource {
    fn login(&mut self, credentials: &Credentials) -> Result<(), SessionError>;
    /// Returns the raw document for a 1-based page index.
    fn fetch_page(&mut self, page: u32) -> Result<String, FetchError>;
}

#[derive(Debug, Clone)]
pub struct CrawlOptions {
    pub max_pages: Option<u32>,
    /// Politeness delay between successive page fetches.
    pub page_delay: Duration,
}

/// The pagination loop: fetch, extract, decide, repeat. Stops on the first of:
/// fetch failure, empty page, configured page limit, missing/disabled next-page
/// control, or an external termination signal. There is no resume; a restarted
/// run begins again at page 1.
pub fn crawl_listing<S: PageSource>(
    source: &mut S,
    profile: &SiteProfile,
    options: &CrawlOptions,
    should_terminate: &Arc<AtomicBool>,
) -> Result<CrawlOutcome, ExtractError> {
    let mut records = Vec::new();
    let mut pages_fetched = 0u32;
    let mut page = 1u32;

    let stop = loop {
        if should_terminate.load(Ordering::Relaxed) {
            warn!("termination requested, stopping crawl at page {}", page);
            break StopReason::Terminated;
        }

        info!("crawling page {}...", page);
        let html = match source.fetch_page(page) {
            Ok(html) => html,
            Err(e) => {
                warn!("page {} could not be fetched: {}", page, e);
                break StopReason::FetchFailed;
            }
        };
        pages_fetched += 1;

        let page_records = extract_records(&html, profile)?;
        if page_records.is_empty() {
            info!("no more data found after page {}", page.saturating_sub(1));
            break StopReason::Exhausted;
        }
        info!("found {} cars on page {}", page_records.len(), page);
        records.extend(page_records);

        if let Some(max) = options.max_pages {
            if page >= max {
                info!("reached maximum pages limit ({})", max);
                break StopReason::LimitReached;
            }
        }

        if !has_next_page(&html, profile)? {
            info!("no usable next page control, reached last page");
            break StopReason::NoNextControl;
        }

        thread::sleep(options.page_delay);
        page += 1;
    };

    Ok(CrawlOutcome {
        records,
        pages_fetched,
        stop,
    })
}

#[cfg(test)]
mod test {
    use super::*;

    struct StubSource {
        pages: Vec<String>,
        attempts: u32,
    }

    impl StubSource {
        fn new(pages: Vec<String>) -> Self {
            StubSource { pages, attempts: 0 }
        }
    }

    impl PageSource for StubSource {
        fn login(&mut self, _credentials: &Credentials) -> Result<(), SessionError> {
            Ok(())
        }

        fn fetch_page(&mut self, page: u32) -> Result<String, FetchError> {
            self.attempts += 1;
            self.pages
                .get(page as usize - 1)
                .cloned()
                .ok_or(FetchError::ContentUnavailable)
        }
    }

    fn table_page(rows: usize, next_class: Option<&str>) -> String {
        let mut html = String::from("<table class=\"table\"><tbody>");
        for i in 0..rows {
            html.push_str(&format!(
                "<tr><td>2024-01-0{}</td><td>12가{}</td><td>car</td></tr>",
                i + 1,
                1000 + i
            ));
        }
        html.push_str("</tbody></table>");
        if let Some(class) = next_class {
            html.push_str(&format!("<a class=\"{}\">다음</a>", class));
        }
        html
    }

    fn options(max_pages: Option<u32>) -> CrawlOptions {
        CrawlOptions {
            max_pages,
            page_delay: Duration::from_millis(0),
        }
    }

    fn no_signal() -> Arc<AtomicBool> {
        Arc::new(AtomicBool::new(false))
    }

    #[test]
    fn stops_after_first_empty_page() {
        let profile = SiteProfile::management_table();
        let mut source = StubSource::new(vec![
            table_page(5, Some("next-page")),
            table_page(5, Some("next-page")),
            table_page(0, Some("next-page")),
        ]);
        let outcome =
            crawl_listing(&mut source, &profile, &options(None), &no_signal()).unwrap();
        assert_eq!(outcome.records.len(), 10);
        assert_eq!(outcome.pages_fetched, 3);
        assert_eq!(outcome.stop, StopReason::Exhausted);
    }

    #[test]
    fn honors_max_pages_despite_next_control() {
        let profile = SiteProfile::management_table();
        let mut source = StubSource::new(vec![table_page(5, Some("next-page"))]);
        let outcome =
            crawl_listing(&mut source, &profile, &options(Some(1)), &no_signal()).unwrap();
        assert_eq!(outcome.records.len(), 5);
        assert_eq!(outcome.pages_fetched, 1);
        assert_eq!(outcome.stop, StopReason::LimitReached);
        assert_eq!(source.attempts, 1);
    }

    #[test]
    fn stops_when_next_control_is_absent() {
        let profile = SiteProfile::management_table();
        let mut source = StubSource::new(vec![table_page(3, None)]);
        let outcome =
            crawl_listing(&mut source, &profile, &options(None), &no_signal()).unwrap();
        assert_eq!(outcome.records.len(), 3);
        assert_eq!(outcome.stop, StopReason::NoNextControl);
    }

    #[test]
    fn stops_when_next_control_is_disabled() {
        let profile = SiteProfile::management_table();
        let mut source = StubSource::new(vec![table_page(3, Some("next-page disabled"))]);
        let outcome =
            crawl_listing(&mut source, &profile, &options(None), &no_signal()).unwrap();
        assert_eq!(outcome.stop, StopReason::NoNextControl);
    }

    #[test]
    fn fetch_failure_is_not_reported_as_exhaustion() {
        let profile = SiteProfile::management_table();
        // page 2 is missing entirely, so its fetch fails
        let mut source = StubSource::new(vec![table_page(4, Some("next-page"))]);
        let outcome =
            crawl_listing(&mut source, &profile, &options(None), &no_signal()).unwrap();
        assert_eq!(outcome.records.len(), 4);
        assert_eq!(outcome.pages_fetched, 1);
        assert_eq!(outcome.stop, StopReason::FetchFailed);
    }

    #[test]
    fn termination_flag_stops_before_any_fetch() {
        let profile = SiteProfile::management_table();
        let mut source = StubSource::new(vec![table_page(5, Some("next-page"))]);
        let flag = Arc::new(AtomicBool::new(true));
        let outcome = crawl_listing(&mut source, &profile, &options(None), &flag).unwrap();
        assert_eq!(outcome.records.len(), 0);
        assert_eq!(outcome.pages_fetched, 0);
        assert_eq!(outcome.stop, StopReason::Terminated);
        assert_eq!(source.attempts, 0);
    }
}
