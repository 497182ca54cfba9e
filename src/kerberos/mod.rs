pub mod hash;
pub mod kdc_req;
pub mod krb5conf;
pub mod login;
pub mod senders;
pub mod session;

pub use hash::{as_rep_to_crack_string, CrackFormat, HashSink};
pub use krb5conf::{render_krb5_conf, Krb5Config};
pub use session::{Session, SessionOptions, UsernameStatus};
