use anyhow::{Result, Context};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::blocking::{multipart::Form, Client, Response};
use reqwest::header::{COOKIE, SET_COOKIE};
use reqwest::StatusCode;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::libs::arguments::{FormVariant, TimerCommand};
use crate::libs::errors::ClockError;
use crate::libs::token::{join_set_cookies, token_from_body, token_from_cookies, TOKEN_NAME};

// RFC 3986 unreserved characters stay as they are.
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
    pub subdomain: String,
}

/// Cookie string and token handed from the login page to the form post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionArtifact {
    pub cookie_header: String,
    pub verification_token: String,
}

/// Outcome of a single request step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationResult {
    pub successful: bool,
    pub data: String,
    pub error: String,
}

impl OperationResult {
    pub fn success(data: impl Into<String>) -> Self {
        OperationResult { successful: true, data: data.into(), error: String::new() }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        OperationResult { successful: false, data: String::new(), error: error.into() }
    }
}

impl From<&std::result::Result<SessionArtifact, ClockError>> for OperationResult {
    fn from(outcome: &std::result::Result<SessionArtifact, ClockError>) -> Self {
        match outcome {
            Ok(session) => OperationResult::success(&session.cookie_header),
            Err(err) => OperationResult::failure(err.reason()),
        }
    }
}

impl From<&std::result::Result<(), ClockError>> for OperationResult {
    fn from(outcome: &std::result::Result<(), ClockError>) -> Self {
        match outcome {
            Ok(()) => OperationResult::success(""),
            Err(err) => OperationResult::failure(err.reason()),
        }
    }
}

/// Everything needed to talk to one server. Passed in, never global.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub user_agent: String,
    pub timeout: Duration,
    pub proxy: Option<String>,
    pub variant: FormVariant,
}

pub fn build_client(config: &ClientConfig) -> Result<Client> {
    let mut client_builder = Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(config.timeout);

    if let Some(prox) = config.proxy.as_deref() {
        let proxy_http = reqwest::Proxy::http(prox).context("invalid http proxy")?;
        let proxy_https = reqwest::Proxy::https(prox).context("invalid https proxy")?;

        client_builder = client_builder
            .proxy(proxy_http)
            .proxy(proxy_https);
    }

    let client = client_builder
        .build()
        .context("unable to build http client")?;

    Ok(client)
}

pub fn login_page_url(base_url: &str, subdomain: &str) -> String {
    let subdomain = utf8_percent_encode(subdomain, QUERY_VALUE);
    format!("{base_url}/Login?subDomain={subdomain}")
}

pub fn login_post_url(base_url: &str) -> String {
    format!("{base_url}/Login")
}

/// `500 Internal Server Error`; codes without a registered phrase read `520 Unknown Status`.
fn status_text(status: StatusCode) -> String {
    format!("{} {}", status.as_str(), status.canonical_reason().unwrap_or("Unknown Status"))
}

fn set_cookies(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .map(str::to_owned)
        .collect()
}

/// Loads the login page and returns the session cookie string and verification token.
pub fn fetch_verification_token(client: &Client, base_url: &str, subdomain: &str) -> std::result::Result<SessionArtifact, ClockError> {
    let url = login_page_url(base_url, subdomain);
    debug!("GET {url}");

    let response = client
        .get(&url)
        .send()
        .map_err(|err| ClockError::auth(err.to_string()))?;

    if !response.status().is_success() {
        let reason = status_text(response.status());
        warn!(status = %response.status(), "login page request failed");
        return Err(ClockError::auth(reason));
    }

    let cookie_header = join_set_cookies(set_cookies(&response).iter().map(String::as_str));
    if cookie_header.is_empty() {
        return Err(ClockError::auth("login page did not set a session cookie"));
    }

    let verification_token = match token_from_cookies(&cookie_header) {
        Some(token) => token,
        None => {
            debug!("no {TOKEN_NAME} cookie, looking in the page body");
            let body = response
                .text()
                .map_err(|err| ClockError::auth(err.to_string()))?;
            token_from_body(&body)
                .map_err(|err| ClockError::auth(err.to_string()))?
                .ok_or_else(|| ClockError::auth("verification token not found"))?
        }
    };

    info!("received verification token");
    Ok(SessionArtifact { cookie_header, verification_token })
}

fn login_form(credentials: &Credentials, command: TimerCommand, token: &str, variant: FormVariant) -> Form {
    let (quick_password, quick_clock_in, command_value) = match variant {
        FormVariant::QuickClockIn => ("True", "True", command.wire_value()),
        FormVariant::LogIn => ("true", command.wire_value(), "LogIn"),
    };

    Form::new()
        .text(TOKEN_NAME, token.to_owned())
        .text("Subdomain", credentials.subdomain.clone())
        .text("ClientDetails.QuickClockInPassword", quick_password)
        .text("ClientDetails.QuickClockIn", quick_clock_in)
        .text("UserName", credentials.email.clone())
        .text("Password", credentials.password.clone())
        .text("command", command_value)
}

/// Posts the login form with the clock command, replaying the session cookie.
pub fn submit_form(
    client: &Client,
    base_url: &str,
    credentials: &Credentials,
    command: TimerCommand,
    session: &SessionArtifact,
    variant: FormVariant,
) -> std::result::Result<(), ClockError> {
    let url = login_post_url(base_url);
    debug!("POST {url} as {}", credentials.email);

    let response = client
        .post(&url)
        .header(COOKIE, session.cookie_header.as_str())
        .multipart(login_form(credentials, command, &session.verification_token, variant))
        .send()
        .map_err(|err| ClockError::submit(err.to_string()))?;

    if !response.status().is_success() {
        warn!(status = %response.status(), "login form was rejected");
        return Err(ClockError::submit(status_text(response.status())));
    }

    if variant == FormVariant::QuickClockIn && set_cookies(&response).is_empty() {
        warn!("login form accepted but no session was issued");
        return Err(ClockError::submit("server returned no new session"));
    }

    info!("{} accepted", command.label());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_page_url_test() {
        let base = "https://apps.timeclockwizard.com";
        let test_cases = [
            ("acme", "https://apps.timeclockwizard.com/Login?subDomain=acme"),
            ("acme-co_2.test~x", "https://apps.timeclockwizard.com/Login?subDomain=acme-co_2.test~x"),
            ("ACME42", "https://apps.timeclockwizard.com/Login?subDomain=ACME42"),
            ("a b&c", "https://apps.timeclockwizard.com/Login?subDomain=a%20b%26c"),
        ];
        for case in test_cases {
            assert_eq!(login_page_url(base, case.0), case.1);
        }
        assert_eq!(login_post_url(base), "https://apps.timeclockwizard.com/Login");
    }

    #[test]
    fn status_text_test() {
        let test_cases = [
            (500, "500 Internal Server Error"),
            (400, "400 Bad Request"),
            (403, "403 Forbidden"),
            (520, "520 Unknown Status"),
        ];
        for case in test_cases {
            assert_eq!(status_text(StatusCode::from_u16(case.0).unwrap()), case.1);
        }
    }

    #[test]
    fn operation_result_test() {
        let session = SessionArtifact {
            cookie_header: "a=b; __RequestVerificationToken=T".to_owned(),
            verification_token: "T".to_owned(),
        };
        let report = OperationResult::from(&Ok::<_, ClockError>(session));
        assert!(report.successful);
        assert_eq!(report.data, "a=b; __RequestVerificationToken=T");
        assert!(report.error.is_empty());

        let report = OperationResult::from(&Err::<SessionArtifact, _>(ClockError::auth("Internal Server Error")));
        assert!(!report.successful);
        assert!(report.data.is_empty());
        assert_eq!(report.error, "Internal Server Error");

        let report = OperationResult::from(&Err::<(), _>(ClockError::submit("Bad Request")));
        assert!(!report.successful);
        assert_eq!(report.error, "Bad Request");
    }

    #[test]
    fn build_client_test() {
        let mut config = ClientConfig {
            base_url: "https://apps.timeclockwizard.com".to_owned(),
            user_agent: "agent".to_owned(),
            timeout: Duration::from_secs(5),
            proxy: None,
            variant: FormVariant::QuickClockIn,
        };
        assert!(build_client(&config).is_ok());
        config.proxy = Some("http://127.0.0.1:3128".to_owned());
        assert!(build_client(&config).is_ok());
    }
}
