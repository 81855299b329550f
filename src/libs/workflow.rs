use anyhow::{Result, Context, Error};
use regex::Regex;
use reqwest::Url;
use std::net::ToSocketAddrs;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::libs::arguments::TimerCommand;
use crate::libs::errors::ClockError;
use crate::libs::requests::{build_client, fetch_verification_token, submit_form, ClientConfig, Credentials, OperationResult};
use crate::libs::store::{PreferenceStore, Preferences};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    Idle,
    Validating,
    Authenticating,
    Submitting,
    Done,
}

/// Answers "is there a network at all" before any request is made.
pub trait Reachability {
    fn is_online(&self) -> bool;
}

/// Treats the network as up when the server's host name resolves within `timeout`.
#[derive(Debug, Clone)]
pub struct DnsProbe {
    address: String,
    timeout: Duration,
}

impl DnsProbe {
    pub fn for_base_url(base_url: &str, timeout: Duration) -> Result<Self> {
        let url = Url::parse(base_url).context("unable to parse base url")?;
        let host = url.host_str().ok_or_else(|| Error::msg("base url has no host"))?;
        let port = url.port_or_known_default().ok_or_else(|| Error::msg("base url has no port"))?;
        Ok(DnsProbe { address: format!("{host}:{port}"), timeout })
    }
}

/// Runs `check` on its own thread and gives up after `timeout`.
/// The system resolver cannot be cancelled, so a stuck lookup is left behind.
fn answers_within<F>(check: F, timeout: Duration) -> bool
where
    F: FnOnce() -> bool + Send + 'static,
{
    let (sender, receiver) = mpsc::channel();
    thread::spawn(move || {
        let _ = sender.send(check());
    });
    receiver.recv_timeout(timeout).unwrap_or(false)
}

impl Reachability for DnsProbe {
    fn is_online(&self) -> bool {
        let address = self.address.clone();
        let online = answers_within(
            move || match address.to_socket_addrs() {
                Ok(mut addrs) => addrs.next().is_some(),
                Err(err) => {
                    debug!("unable to resolve {address}: {err}");
                    false
                }
            },
            self.timeout,
        );
        if !online {
            debug!("{} did not resolve within {:?}", self.address, self.timeout);
        }
        online
    }
}

#[derive(Debug, Clone)]
pub struct ClockRequest {
    pub credentials: Credentials,
    pub command: TimerCommand,
}

pub fn is_valid_email(email: &str) -> Result<bool> {
    let re = Regex::new(r"^[a-zA-Z0-9+._%\-]{1,256}@[a-zA-Z0-9][a-zA-Z0-9\-]{0,64}(\.[a-zA-Z0-9][a-zA-Z0-9\-]{0,25})+$")
        .context("unable to compile regex")?;
    Ok(re.is_match(email))
}

/// Field checks, in the order the user is told about them.
pub fn validate_credentials(credentials: &Credentials) -> std::result::Result<(), ClockError> {
    if !is_valid_email(&credentials.email).unwrap_or(false) {
        return Err(ClockError::InvalidEmail);
    }
    if credentials.subdomain.is_empty() {
        return Err(ClockError::EmptySubdomain);
    }
    if credentials.password.is_empty() {
        return Err(ClockError::EmptyPassword);
    }
    Ok(())
}

/// One clock action: validate, fetch the login page, post the form.
///
/// Each call to [`Workflow::submit`] builds its own HTTP client, so a session
/// never outlives the action that created it.
pub struct Workflow<R: Reachability> {
    config: ClientConfig,
    probe: R,
    store: Option<PreferenceStore>,
    state: WorkflowState,
    token_report: Option<OperationResult>,
}

impl<R: Reachability> Workflow<R> {
    pub fn new(config: ClientConfig, probe: R) -> Self {
        Workflow { config, probe, store: None, state: WorkflowState::Idle, token_report: None }
    }

    /// Remember email and subdomain here once they pass validation.
    pub fn with_store(mut self, store: PreferenceStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    /// Report of the token step from the last run, if it got that far.
    pub fn token_report(&self) -> Option<&OperationResult> {
        self.token_report.as_ref()
    }

    fn enter(&mut self, state: WorkflowState) {
        debug!("{:?} -> {:?}", self.state, state);
        self.state = state;
    }

    /// Runs the whole action and returns the message for the user.
    pub fn submit(&mut self, request: &ClockRequest) -> std::result::Result<String, ClockError> {
        self.state = WorkflowState::Idle;
        self.token_report = None;

        let outcome = self.run(request);
        self.enter(WorkflowState::Done);

        match &outcome {
            Ok(message) => info!("{message}"),
            Err(err) => warn!(category = ?err.category(), reason = %err.reason(), "clock action failed"),
        }
        outcome
    }

    fn run(&mut self, request: &ClockRequest) -> std::result::Result<String, ClockError> {
        let credentials = &request.credentials;

        self.enter(WorkflowState::Validating);
        validate_credentials(credentials)?;
        if !self.probe.is_online() {
            return Err(ClockError::Offline);
        }
        self.remember(credentials);

        self.enter(WorkflowState::Authenticating);
        let client = build_client(&self.config).map_err(|err| ClockError::auth(format!("{err:#}")))?;
        let session = fetch_verification_token(&client, &self.config.base_url, &credentials.subdomain);
        self.token_report = Some(OperationResult::from(&session));
        let session = session?;

        self.enter(WorkflowState::Submitting);
        submit_form(&client, &self.config.base_url, credentials, request.command, &session, self.config.variant)?;

        Ok(format!("You have been successfully {}", request.command.past_tense()))
    }

    fn remember(&self, credentials: &Credentials) {
        let Some(store) = &self.store else {
            return;
        };
        let preferences = Preferences {
            email: credentials.email.clone(),
            subdomain: credentials.subdomain.clone(),
        };
        if let Err(err) = store.save(&preferences) {
            warn!("unable to save preferences: {err:#}");
        }
    }
}
