use chrono::Local;
use log::{Level, LevelFilter};
use std::io::Write;

pub const DEFAULT_TARGET: &str = "kerbprobe";

/// Logging handle carried by each session. Records go through the `log`
/// facade under this handle's target, and debug records are only emitted
/// when the handle is verbose.
#[derive(Debug, Clone)]
pub struct Logger {
    verbose: bool,
    target: String,
}

impl Logger {
    pub fn new(verbose: bool, target: &str) -> Self {
        let target = if target.is_empty() {
            DEFAULT_TARGET
        } else {
            target
        };

        Self {
            verbose,
            target: target.to_string(),
        }
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn debug(&self, msg: impl AsRef<str>) {
        if self.verbose {
            self.emit(Level::Debug, msg.as_ref());
        }
    }

    pub fn info(&self, msg: impl AsRef<str>) {
        self.emit(Level::Info, msg.as_ref());
    }

    /// Findings (valid users, valid logins, hashes). `log` has no notice
    /// level, so these are info records tagged with `[+]`.
    pub fn notice(&self, msg: impl AsRef<str>) {
        self.emit(Level::Info, &format!("[+] {}", msg.as_ref()));
    }

    pub fn warn(&self, msg: impl AsRef<str>) {
        self.emit(Level::Warn, msg.as_ref());
    }

    pub fn error(&self, msg: impl AsRef<str>) {
        self.emit(Level::Error, msg.as_ref());
    }

    fn emit(&self, level: Level, msg: &str) {
        log::log!(target: self.target.as_str(), level, "{}", msg);
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new(false, DEFAULT_TARGET)
    }
}

/// Installs the process wide `env_logger` backend. `RUST_LOG` takes
/// precedence over the verbosity flag.
pub fn init_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(level)
        .format(|buf, record| {
            let timestamp = Local::now().format("%Y/%m/%d %H:%M:%S");
            writeln!(
                buf,
                "{} >  {}",
                timestamp,
                format_record(record.level(), &record.args().to_string())
            )
        })
        .parse_env("RUST_LOG");

    let _ = builder.try_init();
}

fn format_record(level: Level, msg: &str) -> String {
    match level {
        Level::Error => format!("[!] {}", msg),
        Level::Warn => format!("[!] {}", msg),
        Level::Debug | Level::Trace => format!("[DEBUG] {}", msg),
        Level::Info => msg.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_target_falls_back_to_default() {
        let logger = Logger::new(true, "");
        assert_eq!(logger.target(), DEFAULT_TARGET);
        assert!(logger.is_verbose());
    }

    #[test]
    fn test_independent_loggers() {
        let first = Logger::new(false, "realm-a");
        let second = Logger::new(true, "realm-b");
        assert_eq!(first.target(), "realm-a");
        assert_eq!(second.target(), "realm-b");
        assert!(!first.is_verbose());
        assert!(second.is_verbose());
    }

    #[test]
    fn test_format_record() {
        assert_eq!(format_record(Level::Error, "boom"), "[!] boom");
        assert_eq!(format_record(Level::Debug, "x"), "[DEBUG] x");
        assert_eq!(format_record(Level::Info, "[+] hash"), "[+] hash");
    }
}
