use super::validators;
use crate::kerberos::hash::CrackFormat;
use crate::kerberos::session::SessionOptions;
use crate::spray::{RunnerConfig, DEFAULT_THREAD_COUNT};
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::time::Duration;

/// Options shared by every subcommand
pub fn add_session_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("domain")
                .long("domain")
                .short('d')
                .value_name("domain")
                .help("The full domain to use (e.g. contoso.com)")
                .value_parser(validators::is_domain)
                .required(true),
        )
        .arg(
            Arg::new("dc")
                .long("dc")
                .value_name("host")
                .help("The location of the Domain Controller (KDC) to target. If blank, will lookup via DNS"),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .short('o')
                .value_name("file")
                .help("File to write valid results to"),
        )
        .arg(
            Arg::new("threads")
                .long("threads")
                .short('t')
                .value_name("n")
                .help("Threads to use")
                .value_parser(validators::is_thread_count)
                .default_value("10"),
        )
        .arg(
            Arg::new("delay")
                .long("delay")
                .value_name("ms")
                .help("Delay in millisecond between each attempt. Will always use single thread if set")
                .value_parser(clap::value_parser!(u64))
                .default_value("0"),
        )
        .arg(
            Arg::new("safe")
                .long("safe")
                .action(ArgAction::SetTrue)
                .help("Safe mode. Will abort if any user comes back as locked out"),
        )
        .arg(
            Arg::new("downgrade")
                .long("downgrade")
                .action(ArgAction::SetTrue)
                .help("Force downgraded encryption type (arcfour-hmac-md5)"),
        )
        .arg(
            Arg::new("hash-file")
                .long("hash-file")
                .value_name("file")
                .help("File to save AS-REP hashes to (if any captured), otherwise just logged"),
        )
        .arg(
            Arg::new("hash-format")
                .long("hash-format")
                .value_name("format")
                .help("Format of the captured AS-REP hashes")
                .value_parser(validators::to_crack_format)
                .default_value("hashcat"),
        )
        .arg(
            Arg::new("socks5")
                .long("socks5")
                .value_name("host:port")
                .help("SOCKS5 proxy to route KDC traffic through (forces TCP)")
                .value_parser(validators::is_host_port),
        )
        .arg(
            Arg::new("socks5-user")
                .long("socks5-user")
                .value_name("user")
                .requires("socks5")
                .help("Username for SOCKS5 proxy authentication"),
        )
        .arg(
            Arg::new("socks5-pass")
                .long("socks5-pass")
                .value_name("password")
                .requires("socks5-user")
                .help("Password for SOCKS5 proxy authentication"),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .action(ArgAction::SetTrue)
                .help("Log failures and errors"),
        )
}

#[derive(Debug, Clone)]
pub struct CommonArguments {
    pub domain: String,
    pub domain_controller: Option<String>,
    pub output: Option<String>,
    pub threads: usize,
    pub delay: Duration,
    pub safe_mode: bool,
    pub downgrade: bool,
    pub hash_file: Option<String>,
    pub hash_format: CrackFormat,
    pub socks5_proxy: Option<String>,
    pub socks5_username: Option<String>,
    pub socks5_password: Option<String>,
    pub verbose: bool,
}

impl CommonArguments {
    pub fn parse(matches: &ArgMatches) -> Self {
        Self {
            domain: string_arg(matches, "domain").unwrap_or_default(),
            domain_controller: string_arg(matches, "dc"),
            output: string_arg(matches, "output"),
            threads: matches
                .get_one::<usize>("threads")
                .copied()
                .unwrap_or(DEFAULT_THREAD_COUNT),
            delay: Duration::from_millis(
                matches.get_one::<u64>("delay").copied().unwrap_or(0),
            ),
            safe_mode: matches.get_flag("safe"),
            downgrade: matches.get_flag("downgrade"),
            hash_file: string_arg(matches, "hash-file"),
            hash_format: matches
                .get_one::<CrackFormat>("hash-format")
                .copied()
                .unwrap_or_default(),
            socks5_proxy: string_arg(matches, "socks5"),
            socks5_username: string_arg(matches, "socks5-user"),
            socks5_password: string_arg(matches, "socks5-pass"),
            verbose: matches.get_flag("verbose"),
        }
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            domain: self.domain.clone(),
            domain_controller: self.domain_controller.clone(),
            verbose: self.verbose,
            safe_mode: self.safe_mode,
            downgrade: self.downgrade,
            hash_filename: self.hash_file.clone(),
            hash_format: self.hash_format,
            socks5_proxy: self.socks5_proxy.clone(),
            socks5_username: self.socks5_username.clone(),
            socks5_password: self.socks5_password.clone(),
            logger: None,
        }
    }

    pub fn runner_config(&self, stop_on_success: bool) -> RunnerConfig {
        RunnerConfig {
            threads: self.threads,
            delay: self.delay,
            output: self.output.clone(),
            stop_on_success,
        }
    }
}

pub(super) fn string_arg(matches: &ArgMatches, id: &str) -> Option<String> {
    matches.get_one::<String>(id).cloned()
}
