pub mod args;
pub mod commands;
pub mod communication;
pub mod error;
pub mod kerberos;
pub mod logger;
pub mod spray;

pub use error::{Error, KdcErrorKind, ProbeOutcome, Result};
pub use kerberos::{CrackFormat, Session, SessionOptions};
pub use logger::Logger;
