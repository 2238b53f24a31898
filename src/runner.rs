use std::{
    fs,
    path::PathBuf,
    sync::{atomic::AtomicBool, Arc},
    time::Duration,
};

use anyhow::Context;
use signal_hook::consts::{SIGINT, SIGTERM};

use crate::{
    crawler::{crawl_listing, CrawlOptions, PageSource},
    export::{write_csv, write_summary, Summary},
    profile::SiteProfile,
    types::{CrawlOutcome, Credentials, ExportedFiles},
    utils::run_timestamp,
};

#[derive(Builder, Debug, Clone)]
#[builder(setter(into))]
pub struct RunnerOptions {
    base_url: String,
    credentials: Credentials,
    // stop after this many listing pages, unbounded when unset
    #[builder(default)]
    max_pages: Option<u32>,
    // politeness delay between page fetches
    #[builder(default = "Duration::from_millis(1000)")]
    page_delay: Duration,
    // directory the data and summary files are written to
    #[builder(default = "PathBuf::from(\"data\")")]
    data_dir: PathBuf,
    // explicit data filename instead of the timestamped default
    #[builder(default)]
    output: Option<PathBuf>,
}

impl RunnerOptions {
    pub fn default_builder() -> RunnerOptionsBuilder {
        RunnerOptionsBuilder::default()
    }
}

/// Orchestrates one run: login, paginate, export. The session is owned by the
/// caller so its cleanup path (browser teardown) runs regardless of how the
/// run ends.
pub struct Runner {
    options: RunnerOptions,
    profile: SiteProfile,
    should_terminate: Arc<AtomicBool>,
}

impl Runner {
    pub fn new(options: RunnerOptions, profile: SiteProfile) -> anyhow::Result<Self> {
        let should_terminate = Arc::new(AtomicBool::new(false));
        signal_hook::flag::register(SIGTERM, Arc::clone(&should_terminate))?;
        signal_hook::flag::register(SIGINT, Arc::clone(&should_terminate))?;

        Ok(Runner {
            options,
            profile,
            should_terminate,
        })
    }

    /// Login must succeed before any page is fetched; a verification failure
    /// aborts the run with nothing written.
    pub fn run<S: PageSource>(&self, source: &mut S) -> anyhow::Result<ExportedFiles> {
        info!("attempting to login to {}...", self.options.base_url);
        source
            .login(&self.options.credentials)
            .context("login failed, check your credentials")?;
        info!("login successful");

        info!("starting data collection...");
        let crawl_options = CrawlOptions {
            max_pages: self.options.max_pages,
            page_delay: self.options.page_delay,
        };
        let outcome = crawl_listing(
            source,
            &self.profile,
            &crawl_options,
            &self.should_terminate,
        )?;
        info!(
            "crawl ended after {} pages ({:?}), {} records collected",
            outcome.pages_fetched, outcome.stop, outcome.records.len()
        );

        self.export(&outcome)
    }

    fn export(&self, outcome: &CrawlOutcome) -> anyhow::Result<ExportedFiles> {
        fs::create_dir_all(&self.options.data_dir).context(format!(
            "could not create data directory {:?}",
            self.options.data_dir
        ))?;

        let timestamp = run_timestamp();
        let csv_name = self
            .options
            .output
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("car_data_{}.csv", timestamp)));
        let csv_path = self.options.data_dir.join(csv_name);

        let schema = self.profile.schema();
        write_csv(&schema, &outcome.records, &csv_path)?;
        info!("data saved to {}", csv_path.display());
        info!("total cars collected: {}", outcome.records.len());

        let summary = Summary::compute(&schema, &outcome.records);
        let summary_path = self
            .options
            .data_dir
            .join(format!("summary_{}.json", timestamp));
        write_summary(&summary, &summary_path)?;
        info!("summary saved to {}", summary_path.display());

        Ok(ExportedFiles {
            data: csv_path,
            summary: summary_path,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::types::{FetchError, SessionError};
    use std::time::{SystemTime, UNIX_EPOCH};

    struct StubSource {
        accept_login: bool,
        pages: Vec<String>,
    }

    impl PageSource for StubSource {
        fn login(&mut self, _credentials: &Credentials) -> Result<(), SessionError> {
            if self.accept_login {
                Ok(())
            } else {
                Err(SessionError::VerificationFailed)
            }
        }

        fn fetch_page(&mut self, page: u32) -> Result<String, FetchError> {
            self.pages
                .get(page as usize - 1)
                .cloned()
                .ok_or(FetchError::ContentUnavailable)
        }
    }

    fn tmp_dir() -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("carcrawl_runner_{}", nanos))
    }

    fn options(data_dir: PathBuf) -> RunnerOptions {
        RunnerOptions::default_builder()
            .base_url("https://example.invalid")
            .credentials(Credentials {
                username: "user".into(),
                password: "pass".into(),
            })
            .page_delay(Duration::from_millis(0))
            .data_dir(data_dir)
            .build()
            .unwrap()
    }

    fn table_page(rows: usize, with_next: bool) -> String {
        let mut html = String::from("<table class=\"table\"><tbody>");
        for i in 0..rows {
            html.push_str(&format!(
                "<tr><td>2024-01-05</td><td>12가{}</td><td>car</td><td>2021</td>\
                 <td>10km</td><td>1,000만원</td><td>판매중</td><td>딜러{}</td><td>서울</td></tr>",
                1000 + i,
                i % 2
            ));
        }
        html.push_str("</tbody></table>");
        if with_next {
            html.push_str("<a class=\"next-page\">다음</a>");
        }
        html
    }

    #[test]
    fn failed_login_writes_no_files() {
        let dir = tmp_dir();
        let runner =
            Runner::new(options(dir.clone()), SiteProfile::management_table()).unwrap();
        let mut source = StubSource {
            accept_login: false,
            pages: vec![table_page(5, true)],
        };

        assert!(runner.run(&mut source).is_err());
        assert!(!dir.exists());
    }

    #[test]
    fn full_run_exports_every_collected_record() {
        let dir = tmp_dir();
        let runner =
            Runner::new(options(dir.clone()), SiteProfile::management_table()).unwrap();
        let mut source = StubSource {
            accept_login: true,
            pages: vec![table_page(5, true), table_page(5, true), table_page(0, true)],
        };

        let files = runner.run(&mut source).unwrap();
        let bytes = std::fs::read(&files.data).unwrap();
        let text = String::from_utf8(bytes[3..].to_vec()).unwrap();
        // header + 10 records across pages 1 and 2
        assert_eq!(text.lines().count(), 11);

        let summary: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&files.summary).unwrap()).unwrap();
        assert_eq!(summary["total_cars"], 10);
        assert_eq!(summary["unique_dealers"], 2);

        std::fs::remove_dir_all(dir).unwrap();
    }
}
