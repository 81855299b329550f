use anyhow::{Result,Error};
use clap::Parser;
use reqwest::Url;
use std::fmt;
use std::path::PathBuf;

pub const DEFAULT_BASE_URL: &str = "https://apps.timeclockwizard.com";
pub const DEFAULT_USER_AGENT: &str = concat!("timeclock_client/", env!("CARGO_PKG_VERSION"));

#[derive(
    clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq
)]
pub enum TimerCommand {
    ClockIn,
    ClockOut,
}

impl TimerCommand {
    /// Label shown to the user.
    pub fn label(&self) -> &'static str {
        match self {
            TimerCommand::ClockIn => "Clock In",
            TimerCommand::ClockOut => "Clock Out",
        }
    }

    /// Value sent in the login form.
    pub fn wire_value(&self) -> &'static str {
        match self {
            TimerCommand::ClockIn => "ClockIn",
            TimerCommand::ClockOut => "ClockOut",
        }
    }

    pub fn past_tense(&self) -> &'static str {
        match self {
            TimerCommand::ClockIn => "clocked in",
            TimerCommand::ClockOut => "clocked out",
        }
    }
}

impl fmt::Display for TimerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Layout of the login form and the rule used to decide whether the post worked.
///
/// `QuickClockIn` sends the command as `command` and wants fresh cookies back.
/// `LogIn` sends the command as `ClientDetails.QuickClockIn` with `command=LogIn`
/// and trusts the status code alone.
#[derive(
    clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq
)]
pub enum FormVariant {
    #[default]
    QuickClockIn,
    LogIn,
}

fn validate_base_url(url: &str) -> Result<String> {
    let parsed = Url::parse(url)?;
    match parsed.scheme() {
        "http" | "https" if parsed.host_str().is_some() => Ok(url.trim_end_matches('/').to_string()),
        _ => Err(Error::msg("must be in format https://apps.timeclockwizard.com"))
    }
}

fn validate_timeout(secs: &str) -> Result<u64> {
    let secs: u64 = secs.parse()?;
    if (1..=300).contains(&secs) {
        Ok(secs)
    }
    else {
        Err(Error::msg("timeout must be between 1 and 300 seconds"))
    }
}

#[derive(Parser, Debug)]
#[command(version, about = "Clock in or out of TimeClockWizard from the command line", long_about = None)]
pub struct Args {
    /// Account email [default: last saved email]
    #[arg(short, long, env = "TCW_EMAIL")]
    pub email: Option<String>,

    /// Account password (never saved)
    #[arg(short, long, env = "TCW_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Company subdomain [default: last saved subdomain]
    #[arg(short, long, env = "TCW_SUBDOMAIN")]
    pub subdomain: Option<String>,

    /// What to do
    #[arg(short, long, value_enum, default_value_t = TimerCommand::ClockIn)]
    pub command: TimerCommand,

    /// Value sent as User-Agent
    #[arg(short, long, default_value_t = String::from(DEFAULT_USER_AGENT))]
    pub user_agent: String,

    /// Request timeout in seconds
    #[arg(short, long, default_value_t = 30, value_parser = validate_timeout)]
    pub timeout: u64,

    /// HTTP(S) proxy for both requests
    #[arg(long)]
    pub proxy: Option<String>,

    /// Login form layout expected by the server
    #[arg(long, value_enum, default_value_t = FormVariant::QuickClockIn)]
    pub variant: FormVariant,

    /// Preferences file holding the saved email and subdomain
    #[arg(long, env = "TCW_SETTINGS")]
    pub settings: Option<PathBuf>,

    /// Server address
    #[arg(long, default_value_t = String::from(DEFAULT_BASE_URL), value_parser = validate_base_url)]
    pub base_url: String,

    /// Print debug logs
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool

}



#[test]
fn validate_base_url_test() {
    let test_cases = [
        ("https://apps.timeclockwizard.com",true),
        ("https://apps.timeclockwizard.com/",true),
        ("http://127.0.0.1:8080",true),
        ("ftp://apps.timeclockwizard.com",false),
        ("apps.timeclockwizard.com",false),

    ];

    for case in test_cases {
        let result = validate_base_url(case.0);
        if case.1 {
            assert!(result.is_ok());
            assert!(!result.unwrap().ends_with('/'));
        }
        else {
            assert!(result.is_err());
        }
    }
}

#[test]
fn validate_timeout_test() {
    assert_eq!(validate_timeout("30").unwrap(), 30);
    assert!(validate_timeout("0").is_err());
    assert!(validate_timeout("301").is_err());
    assert!(validate_timeout("ten").is_err());
}

#[test]
fn timer_command_test() {
    let test_cases = [
        (TimerCommand::ClockIn, "Clock In", "ClockIn", "clocked in"),
        (TimerCommand::ClockOut, "Clock Out", "ClockOut", "clocked out"),
    ];
    for case in test_cases {
        assert_eq!(case.0.label(), case.1);
        assert_eq!(case.0.to_string(), case.1);
        assert_eq!(case.0.wire_value(), case.2);
        assert_eq!(case.0.past_tense(), case.3);
    }
}

#[test]
fn parse_args_test() {
    let args = Args::try_parse_from([
        "timeclock_client", "-e", "a@b.com", "-s", "acme", "-c", "clock-out", "--variant", "log-in"
    ]).unwrap();
    assert_eq!(args.email.as_deref(), Some("a@b.com"));
    assert_eq!(args.subdomain.as_deref(), Some("acme"));
    assert_eq!(args.command, TimerCommand::ClockOut);
    assert_eq!(args.variant, FormVariant::LogIn);
    assert_eq!(args.base_url, DEFAULT_BASE_URL);
    assert_eq!(args.timeout, 30);
}
