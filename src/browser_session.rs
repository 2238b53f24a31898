use std::{sync::Arc, thread, time::Duration};

use anyhow::Context;
use headless_chrome::{browser::default_executable, Browser, LaunchOptions, Tab};
use sysinfo::{Pid, PidExt, ProcessExt, System, SystemExt};

use crate::{
    crawler::PageSource,
    profile::SiteProfile,
    types::{Credentials, FetchError, SessionError},
};

const LOGIN_LINK: &str = "a.login";
const USERNAME_INPUT: &str = "input#Id";
const PASSWORD_INPUT: &str = "input#Password";
const SUBMIT_BUTTON: &str = "button.btn.btn-primary";
const ACCOUNT_MARKERS: &str = ".mypage, .logout, .user-info";

/// Real-browser variant: one Chrome process and one tab carry the
/// authenticated state for the whole run. The process is killed when the
/// session is dropped, whether the run succeeded or not.
pub struct BrowserSession {
    browser: Browser,
    tab: Arc<Tab>,
    base_url: String,
    profile: SiteProfile,
    page_timeout: Duration,
}

impl BrowserSession {
    pub fn new(
        base_url: &str,
        profile: SiteProfile,
        page_timeout: Duration,
    ) -> anyhow::Result<Self> {
        let is_docker = std::env::var("IN_DOCKER").is_ok();
        let options = LaunchOptions::default_builder()
            .path(Some(default_executable().map_err(anyhow::Error::msg)?))
            .window_size(Some((1920, 1080)))
            .idle_browser_timeout(Duration::from_secs(45))
            // warning only do this if in docker env
            .sandbox(!is_docker)
            .build()
            .expect("Couldn't find appropriate Chrome binary.");
        let browser = Browser::new(options).context("browser launching error")?;
        let tab = browser.new_tab().context("could not create new tab")?;

        Ok(BrowserSession {
            browser,
            tab,
            base_url: base_url.trim_end_matches('/').to_string(),
            profile,
            page_timeout,
        })
    }

    fn navigate(&self, url: &str) -> anyhow::Result<()> {
        let nv = match self.tab.navigate_to(url) {
            Ok(t) => t,
            Err(e) => {
                error!("could not navigate to {} with error {}", url, e);
                self.tab.navigate_to(url)?
            }
        };
        if let Err(e) = nv.wait_until_navigated() {
            // we wait one more timeout
            warn!("error waiting for navigation, retrying {}", e);
            nv.wait_until_navigated()?;
        }
        Ok(())
    }

    fn submit_login_form(&self, credentials: &Credentials) -> anyhow::Result<()> {
        self.navigate(&self.base_url)?;

        debug!("looking for login button...");
        self.tab
            .wait_for_element(LOGIN_LINK)
            .context("login link not found")?
            .click()?;

        debug!("entering credentials...");
        self.tab
            .wait_for_element(USERNAME_INPUT)
            .context("username field not found")?
            .click()?;
        self.tab.type_str(&credentials.username)?;

        self.tab
            .find_element(PASSWORD_INPUT)
            .context("password field not found")?
            .click()?;
        self.tab.type_str(&credentials.password)?;

        debug!("submitting login form...");
        self.tab
            .find_element(SUBMIT_BUTTON)
            .context("submit button not found")?
            .click()?;

        // give the site a moment to process the redirect
        thread::sleep(Duration::from_secs(3));
        Ok(())
    }

    pub fn kill(&self) -> bool {
        let pid = match self.browser.get_process_id() {
            Some(pid) => pid,
            None => {
                warn!("could not get process id for browser");
                return false;
            }
        };
        let s = System::new_all();
        if let Some(process) = s.process(Pid::from_u32(pid)) {
            debug!("killing process with id {}", pid);
            process.kill();
            return true;
        }
        false
    }
}

impl PageSource for BrowserSession {
    fn login(&mut self, credentials: &Credentials) -> Result<(), SessionError> {
        self.submit_login_form(credentials)
            .map_err(|e| SessionError::Browser(e.to_string()))?;

        debug!("verifying login status...");
        let url = self.tab.get_url().to_lowercase();
        if url.contains("logout") || url.contains("mypage") {
            info!("login verified by url");
            return Ok(());
        }

        // alternative verification via an account element on the page
        match self
            .tab
            .wait_for_element_with_custom_timeout(ACCOUNT_MARKERS, Duration::from_secs(5))
        {
            Ok(_) => {
                info!("login verified by account element");
                Ok(())
            }
            Err(_) => Err(SessionError::VerificationFailed),
        }
    }

    fn fetch_page(&mut self, page: u32) -> Result<String, FetchError> {
        let url = self.profile.page_url(&self.base_url, page);
        debug!("navigating to {}", url);
        self.navigate(&url)
            .map_err(|e| FetchError::Browser(e.to_string()))?;

        if self
            .tab
            .wait_for_element_with_custom_timeout(&self.profile.ready_selector, self.page_timeout)
            .is_err()
        {
            return Err(FetchError::ContentUnavailable);
        }

        self.tab
            .get_content()
            .map_err(|e| FetchError::Browser(e.to_string()))
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        debug!("killing browser process...");
        self.kill();
    }
}
