use std::{path::PathBuf, time::Duration};

use carcrawl::{
    browser_session::BrowserSession,
    crawler::PageSource,
    http_session::HttpSession,
    profile::SiteProfile,
    runner::{Runner, RunnerOptions},
    types::Credentials,
};

fn credentials_from_env() -> Credentials {
    Credentials {
        username: std::env::var("CARCRAWL_USERNAME").expect("CARCRAWL_USERNAME not set"),
        password: std::env::var("CARCRAWL_PASSWORD").expect("CARCRAWL_PASSWORD not set"),
    }
}

/*
RUST_LOG=debug CARCRAWL_USERNAME=... CARCRAWL_PASSWORD=... \
    cargo test --test crawl -- crawl_search_listing --exact --ignored
*/
#[test]
#[ignore = "live site"]
fn crawl_search_listing() -> anyhow::Result<()> {
    env_logger::init();
    let base_url = "https://carmanager.co.kr";
    let profile = SiteProfile::search_cards();

    let options = RunnerOptions::default_builder()
        .base_url(base_url)
        .credentials(credentials_from_env())
        .max_pages(Some(2u32))
        .page_delay(Duration::from_millis(1000))
        .data_dir(PathBuf::from("data"))
        .build()?;

    let runner = Runner::new(options, profile.clone())?;
    let mut session = HttpSession::new(base_url, profile)?;
    let files = runner.run(&mut session)?;
    println!("{files:#?}");
    Ok(())
}

#[test]
#[ignore = "live site"]
fn browser_login_and_first_page() -> anyhow::Result<()> {
    env_logger::init();
    let base_url = "https://carmanager.co.kr";
    let profile = SiteProfile::management_table();

    let mut session = BrowserSession::new(base_url, profile, Duration::from_secs(10))?;
    session.login(&credentials_from_env())?;
    let html = session.fetch_page(1)?;
    println!("first page is {} bytes", html.len());
    Ok(())
}
