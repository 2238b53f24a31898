use reqwest::{
    blocking::Client,
    header::{ORIGIN, REFERER},
};
use scraper::{Html, Selector};

use crate::{
    crawler::PageSource,
    profile::SiteProfile,
    types::{Credentials, FetchError, SessionError},
};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

lazy_static! {
    static ref TOKEN_INPUT: Selector =
        Selector::parse("input[name=\"__RequestVerificationToken\"]").unwrap();
}

/// Raw-request variant: a blocking client with a cookie jar carries the
/// authenticated state across all page fetches.
pub struct HttpSession {
    client: Client,
    base_url: String,
    profile: SiteProfile,
}

impl HttpSession {
    pub fn new(base_url: &str, profile: SiteProfile) -> Result<Self, SessionError> {
        let client = Client::builder()
            .cookie_store(true)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(HttpSession {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            profile,
        })
    }

    fn login_url(&self) -> String {
        format!("{}/User/Login", self.base_url)
    }

    fn extract_token(body: &str) -> Option<String> {
        let document = Html::parse_document(body);
        document
            .select(&TOKEN_INPUT)
            .next()
            .and_then(|input| input.value().attr("value"))
            .map(|v| v.to_string())
    }
}

impl PageSource for HttpSession {
    fn login(&mut self, credentials: &Credentials) -> Result<(), SessionError> {
        let login_url = self.login_url();
        debug!("fetching login page {}", login_url);
        let body = self.client.get(&login_url).send()?.text()?;

        // Credentials first, then the anti-forgery token merged in if the
        // login page carries one.
        let mut form: Vec<(&str, String)> = vec![
            ("Id", credentials.username.clone()),
            ("Password", credentials.password.clone()),
        ];
        match Self::extract_token(&body) {
            Some(token) => {
                debug!("merging request verification token into login form");
                form.push(("__RequestVerificationToken", token));
            }
            None => debug!("login page carries no verification token"),
        }

        info!("submitting login form...");
        let response = self
            .client
            .post(&login_url)
            .header(REFERER, login_url.as_str())
            .header(ORIGIN, self.base_url.as_str())
            .form(&form)
            .send()?;
        let body = response.text()?;

        // Korean account markers are the only reliable success signal here.
        if body.contains("로그아웃") || body.contains("마이페이지") {
            info!("login verified");
            Ok(())
        } else {
            Err(SessionError::VerificationFailed)
        }
    }

    fn fetch_page(&mut self, page: u32) -> Result<String, FetchError> {
        let url = self.profile.page_url(&self.base_url, page);
        debug!("GET {}", url);
        let response = self.client.get(&url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        Ok(response.text()?)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn finds_verification_token_in_login_page() {
        let body = concat!(
            "<form action=\"/User/Login\">",
            "<input name=\"__RequestVerificationToken\" type=\"hidden\" value=\"tok123\"/>",
            "</form>",
        );
        assert_eq!(HttpSession::extract_token(body), Some("tok123".to_string()));
    }

    #[test]
    fn token_is_optional() {
        assert_eq!(HttpSession::extract_token("<form></form>"), None);
    }
}
