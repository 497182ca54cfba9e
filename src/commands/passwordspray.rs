use super::{new_session, run_jobs};
use crate::args::passwordspray::Arguments;
use crate::error::{Error, Result};
use crate::spray::{read_lines, usernames, Job, RunSummary};

pub fn run(args: Arguments) -> Result<RunSummary> {
    let password = match (&args.password, args.user_as_pass) {
        (_, true) => None,
        (Some(password), false) => Some(password.clone()),
        (None, false) => {
            return Err(Error::Config(
                "A password is required unless --user-as-pass is set".into(),
            ))
        }
    };

    let session = new_session(&args.common)?;
    let logger = session.logger().clone();
    let lines = read_lines(&args.usernames)?;

    let jobs = usernames(lines, &logger).map(|username| Job::Login {
        password: password.clone().unwrap_or_else(|| username.clone()),
        username,
    });
    run_jobs(&args.common, session, jobs, false)
}
