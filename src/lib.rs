pub mod libs {
    pub mod arguments;
    pub mod errors;
    pub mod logging;
    pub mod requests;
    pub mod store;
    pub mod token;
    pub mod workflow;
}
use libs::arguments::Args;
use libs::requests::{ClientConfig, Credentials};
use libs::store::{PreferenceStore, Preferences};
use libs::workflow::{ClockRequest, DnsProbe, Workflow};
use clap::Parser;
use std::process::exit;
use std::thread;
use std::time::Duration;


fn pick(given: Option<String>, saved: &str) -> String {
    given
        .map(|value| value.trim().to_owned())
        .unwrap_or_else(|| saved.to_owned())
}

pub fn clock_run() {
    let args = Args::parse();
    libs::logging::init_logger(args.verbose);

    let store = PreferenceStore::new(args.settings.clone().unwrap_or_else(PreferenceStore::default_path));
    let saved = match store.load() {
        Ok(saved) => saved,
        Err(err) => {
            tracing::warn!("ignoring saved preferences: {err:#}");
            Preferences::default()
        }
    };

    let request = ClockRequest {
        credentials: Credentials {
            email: pick(args.email, &saved.email),
            password: pick(args.password, ""),
            subdomain: pick(args.subdomain, &saved.subdomain),
        },
        command: args.command,
    };

    let probe = match DnsProbe::for_base_url(&args.base_url, Duration::from_secs(args.timeout)) {
        Ok(probe) => probe,
        Err(err) => {
            eprintln!("[-] {err:#}");
            exit(1);
        }
    };

    let config = ClientConfig {
        base_url: args.base_url,
        user_agent: args.user_agent,
        timeout: Duration::from_secs(args.timeout),
        proxy: args.proxy,
        variant: args.variant,
    };

    println!("[*] {} on {}", request.command, request.credentials.subdomain);

    let worker = thread::spawn(move || {
        let mut workflow = Workflow::new(config, probe).with_store(store);
        workflow.submit(&request)
    });

    match worker.join() {
        Ok(Ok(message)) => println!("[+] {message}"),
        Ok(Err(err)) => {
            println!("[-] {err}");
            exit(1);
        }
        Err(_) => {
            eprintln!("[-] clock worker stopped unexpectedly");
            exit(1);
        }
    }
}

#[test]
fn pick_test() {
    assert_eq!(pick(Some(" me@acme.com ".to_owned()), "old@acme.com"), "me@acme.com");
    assert_eq!(pick(None, "old@acme.com"), "old@acme.com");
    assert_eq!(pick(None, ""), "");
}
