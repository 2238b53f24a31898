use std::{path::PathBuf, time::Duration};

use anyhow::Context;
use carcrawl::{
    browser_session::BrowserSession,
    http_session::HttpSession,
    profile::SiteProfile,
    runner::{Runner, RunnerOptions},
    types::Credentials,
};
use clap::{Parser, ValueEnum};
use log::info;

#[derive(ValueEnum, Debug, Clone, Copy)]
enum Variant {
    /// Raw requests with a cookie jar, parsing returned markup directly
    Http,
    /// A real Chrome instance with full rendering and form interaction
    Browser,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "CarManager listing crawler", long_about = None)]
struct Args {
    /// Which pipeline drives the site
    #[arg(short = 'v', long, value_enum, default_value = "http")]
    variant: Variant,
    /// Base URL of the dealer portal
    #[arg(long, env = "CARCRAWL_BASE_URL", default_value = "https://carmanager.co.kr")]
    base_url: String,
    /// Portal account name
    #[arg(short = 'u', long, env = "CARCRAWL_USERNAME")]
    username: String,
    /// Portal account password
    #[arg(short = 'p', long, env = "CARCRAWL_PASSWORD", hide_env_values = true)]
    password: String,
    /// Stop after this many listing pages
    #[arg(short = 'm', long)]
    max_pages: Option<u32>,
    /// Items per page requested via the profile's page-size parameter
    #[arg(long)]
    page_size: Option<u32>,
    /// Pause between successive page fetches in milliseconds
    #[arg(long, default_value_t = 1000)]
    delay_ms: u64,
    /// Seconds to wait for the listing container to render (browser variant)
    #[arg(long, default_value_t = 10)]
    page_timeout: u64,
    /// Directory the data and summary files are written to
    #[arg(short = 'd', long, env = "CARCRAWL_DATA_DIR", default_value = "data")]
    data_dir: PathBuf,
    /// Explicit data filename instead of the timestamped default
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,
    /// JSON site profile overriding the built-in selectors
    #[arg(long)]
    profile: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = Args::parse();

    let mut profile = match &args.profile {
        Some(path) => SiteProfile::from_file(path)?,
        None => match args.variant {
            Variant::Http => SiteProfile::search_cards(),
            Variant::Browser => SiteProfile::management_table(),
        },
    };
    if let Some(size) = args.page_size {
        profile.page_size = Some(size);
    }

    let options = RunnerOptions::default_builder()
        .base_url(args.base_url.clone())
        .credentials(Credentials {
            username: args.username,
            password: args.password,
        })
        .max_pages(args.max_pages)
        .page_delay(Duration::from_millis(args.delay_ms))
        .data_dir(args.data_dir)
        .output(args.output)
        .build()?;

    let runner = Runner::new(options, profile.clone())?;

    info!(
        "initializing crawl of {} with the {:?} variant, profile `{}`",
        args.base_url, args.variant, profile.name
    );

    let files = match args.variant {
        Variant::Http => {
            let mut session = HttpSession::new(&args.base_url, profile)
                .context("could not build http session")?;
            runner.run(&mut session)?
        }
        Variant::Browser => {
            // the session owns the browser process; its Drop guarantees teardown
            let mut session = BrowserSession::new(
                &args.base_url,
                profile,
                Duration::from_secs(args.page_timeout),
            )
            .context("could not launch browser session")?;
            runner.run(&mut session)?
        }
    };

    info!(
        "data collection completed successfully: {} / {}",
        files.data.display(),
        files.summary.display()
    );

    Ok(())
}
