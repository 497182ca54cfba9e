//! Worker pool that drives many probes against one session.

use crate::error::{Error, KdcErrorKind, ProbeOutcome, Result};
use crate::kerberos::session::Session;
use crate::logger::Logger;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{sync_channel, Receiver};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

pub const DEFAULT_THREAD_COUNT: usize = 10;

// Characters that can never be part of a sAMAccountName.
const INVALID_USERNAME_CHARS: &[char] =
    &['"', '/', '\\', '[', ']', ':', ';', '|', '=', ',', '+', '*', '?', '<', '>'];

/// A single probe to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Job {
    Username(String),
    Login { username: String, password: String },
}

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub threads: usize,
    pub delay: Duration,
    pub output: Option<String>,
    pub stop_on_success: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            threads: DEFAULT_THREAD_COUNT,
            delay: Duration::ZERO,
            output: None,
            stop_on_success: false,
        }
    }
}

impl RunnerConfig {
    /// Any delay between attempts forces a single worker, otherwise the
    /// pacing would be meaningless.
    pub fn worker_count(&self) -> usize {
        if !self.delay.is_zero() {
            return 1;
        }
        self.threads.max(1)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub tested: usize,
    pub valid: usize,
    pub aborted: bool,
}

struct Shared {
    session: Arc<Session>,
    stop: AtomicBool,
    aborted: AtomicBool,
    tested: AtomicUsize,
    valid: AtomicUsize,
    output: Option<Mutex<File>>,
    stop_on_success: bool,
    delay: Duration,
}

impl Shared {
    fn abort(&self) {
        self.aborted.store(true, Ordering::SeqCst);
        self.stop.store(true, Ordering::SeqCst);
    }
}

pub struct Runner {
    shared: Arc<Shared>,
    workers: usize,
}

impl Runner {
    pub fn new(session: Arc<Session>, config: RunnerConfig) -> Result<Self> {
        let output = match &config.output {
            Some(path) => Some(Mutex::new(File::create(path).map_err(|err| {
                Error::Io(format!("Unable to create output file '{}'", path), err)
            })?)),
            None => None,
        };

        Ok(Self {
            workers: config.worker_count(),
            shared: Arc::new(Shared {
                session,
                stop: AtomicBool::new(false),
                aborted: AtomicBool::new(false),
                tested: AtomicUsize::new(0),
                valid: AtomicUsize::new(0),
                output,
                stop_on_success: config.stop_on_success,
                delay: config.delay,
            }),
        })
    }

    pub fn run<I>(self, jobs: I) -> RunSummary
    where
        I: IntoIterator<Item = Job>,
    {
        let logger = self.shared.session.logger().clone();
        let start = Instant::now();

        let (sender, receiver) = sync_channel::<Job>(self.workers * 2);
        let receiver = Arc::new(Mutex::new(receiver));

        let mut handles = Vec::with_capacity(self.workers);
        for _ in 0..self.workers {
            let shared = Arc::clone(&self.shared);
            let receiver = Arc::clone(&receiver);
            handles.push(thread::spawn(move || worker(shared, receiver)));
        }
        drop(receiver);

        for job in jobs {
            if self.shared.stop.load(Ordering::SeqCst) {
                break;
            }
            if sender.send(job).is_err() {
                break;
            }
        }
        drop(sender);

        for handle in handles {
            if let Err(e) = handle.join() {
                logger.error(format!("Worker thread panicked: {:?}", e));
            }
        }

        let summary = RunSummary {
            tested: self.shared.tested.load(Ordering::SeqCst),
            valid: self.shared.valid.load(Ordering::SeqCst),
            aborted: self.shared.aborted.load(Ordering::SeqCst),
        };

        logger.info(format!(
            "Done! Tested {} attempts ({} valid) in {:.3} seconds",
            summary.tested,
            summary.valid,
            start.elapsed().as_secs_f64()
        ));

        summary
    }
}

fn worker(shared: Arc<Shared>, receiver: Arc<Mutex<Receiver<Job>>>) {
    loop {
        if shared.stop.load(Ordering::SeqCst) {
            break;
        }

        let job = match receiver.lock() {
            Ok(receiver) => match receiver.recv() {
                Ok(job) => job,
                Err(_) => break,
            },
            Err(_) => break,
        };

        // Jobs still queued when the run is stopped are dropped.
        if shared.stop.load(Ordering::SeqCst) {
            break;
        }

        match job {
            Job::Username(username) => test_username(&shared, &username),
            Job::Login { username, password } => {
                test_login(&shared, &username, &password)
            }
        }
        shared.tested.fetch_add(1, Ordering::SeqCst);

        if !shared.delay.is_zero() {
            thread::sleep(shared.delay);
        }
    }
}

fn test_username(shared: &Shared, username: &str) {
    let session = &shared.session;
    let logger = session.logger();
    let user_at_domain = format!("{}@{}", username, session.domain());

    match session.test_username(username) {
        Ok(_) => {
            logger.notice(format!("VALID USERNAME:\t {}", user_at_domain));
            record_valid(shared, &user_at_domain);
        }
        Err(err) => match ProbeOutcome::from_error(&err) {
            ProbeOutcome::InvalidUser => {
                logger.debug(format!("{} - User does not exist", user_at_domain));
            }
            _ => handle_fatal_or_log(shared, logger, &user_at_domain, &err),
        },
    }
}

fn test_login(shared: &Shared, username: &str, password: &str) {
    let session = &shared.session;
    let logger = session.logger();
    let user_at_domain = format!("{}@{}", username, session.domain());
    let login = format!("{}:{}", user_at_domain, password);

    let result = session.test_login(username, password);
    match ProbeOutcome::from_result(&result) {
        ProbeOutcome::Success => {
            logger.notice(format!("VALID LOGIN:\t {}", login));
            record_valid(shared, &login);
            if shared.stop_on_success {
                shared.stop.store(true, Ordering::SeqCst);
            }
        }
        ProbeOutcome::BadCredentials => {
            logger.debug(format!("{} - Invalid password", user_at_domain));
        }
        ProbeOutcome::InvalidUser => {
            logger.debug(format!("{} - User does not exist", user_at_domain));
        }
        ProbeOutcome::NeedsPreauth | ProbeOutcome::Error => {
            let err = match result {
                Err(err) => err,
                Ok(_) => Error::Protocol("Unexpected login result".into()),
            };

            match err.kdc_error_kind() {
                Some(kind) if kind.confirms_password() => {
                    logger.notice(format!("VALID LOGIN:\t {}", login));
                    logger.warn(format!(
                        "{} - valid password, but {}",
                        user_at_domain,
                        kind.describe()
                    ));
                    record_valid(shared, &login);
                    if shared.stop_on_success {
                        shared.stop.store(true, Ordering::SeqCst);
                    }
                }
                Some(KdcErrorKind::ClientRevoked) => {
                    if session.safe_mode() {
                        logger.error(format!(
                            "{} - USER LOCKED OUT and safe mode on! Aborting...",
                            user_at_domain
                        ));
                        shared.abort();
                    } else {
                        logger.warn(format!(
                            "{} - {}",
                            user_at_domain,
                            KdcErrorKind::ClientRevoked.describe()
                        ));
                    }
                }
                _ => handle_fatal_or_log(shared, logger, &user_at_domain, &err),
            }
        }
    }
}

/// Errors showing the KDC cannot be talked to end the whole run.
fn handle_fatal_or_log(shared: &Shared, logger: &Logger, subject: &str, err: &Error) {
    let fatal = err.is_transport_error()
        || err.kdc_error_kind() == Some(KdcErrorKind::WrongRealm);

    if fatal {
        let reason = match err.kdc_error_kind() {
            Some(kind) => kind.describe().to_string(),
            None => err.to_string(),
        };
        logger.error(format!("{} - {}. Aborting...", subject, reason));
        shared.abort();
    } else {
        logger.error(format!("{} - {}", subject, err));
    }
}

fn record_valid(shared: &Shared, line: &str) {
    shared.valid.fetch_add(1, Ordering::SeqCst);

    if let Some(output) = &shared.output {
        let logger = shared.session.logger();
        match output.lock() {
            Ok(mut file) => {
                if let Err(err) = writeln!(file, "{}", line) {
                    logger.error(format!("Error writing to output file: {}", err));
                }
            }
            Err(_) => logger.error("Output file lock poisoned"),
        }
    }
}

/// Strips `user@domain` and `DOMAIN\user` decorations.
pub fn format_username(raw: &str) -> std::result::Result<String, String> {
    let mut username = raw.trim();

    if let Some((_, user)) = username.rsplit_once('\\') {
        username = user;
    }
    if let Some((user, _)) = username.split_once('@') {
        username = user;
    }

    let username = username.trim();
    if username.is_empty() {
        return Err(format!("Bad username: '{}'", raw));
    }
    if username
        .chars()
        .any(|c| c.is_whitespace() || INVALID_USERNAME_CHARS.contains(&c))
    {
        return Err(format!("Bad username (invalid character): '{}'", raw));
    }

    Ok(username.to_string())
}

/// Lines of a file, or of stdin when `path` is `-`.
pub fn read_lines(path: &str) -> Result<Box<dyn Iterator<Item = String> + Send>> {
    if path == "-" {
        let stdin = BufReader::new(io::stdin());
        return Ok(Box::new(stdin.lines().map_while(|line| line.ok())));
    }

    let file = File::open(path).map_err(|err| {
        Error::Io(format!("Unable to read the file '{}'", path), err)
    })?;
    Ok(Box::new(BufReader::new(file).lines().map_while(|line| line.ok())))
}

/// Normalised usernames; bad lines are reported on the debug log.
pub fn usernames<'a, I>(lines: I, logger: &'a Logger) -> impl Iterator<Item = String> + 'a
where
    I: Iterator<Item = String> + 'a,
{
    lines
        .filter(|line| !line.trim().is_empty())
        .filter_map(move |line| match format_username(&line) {
            Ok(username) => Some(username),
            Err(err) => {
                logger.debug(format!("{} - skipping", err));
                None
            }
        })
}

/// Parses a `username:password` combo line. The password may contain `:`.
pub fn parse_combo(line: &str) -> std::result::Result<(String, String), String> {
    let (username, password) = line
        .split_once(':')
        .ok_or_else(|| format!("Bad combo line (missing ':'): '{}'", line))?;

    Ok((format_username(username)?, password.to_string()))
}
