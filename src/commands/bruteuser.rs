use super::{new_session, run_jobs};
use crate::args::bruteuser::Arguments;
use crate::error::{Error, Result};
use crate::spray::{format_username, read_lines, Job, RunSummary};

pub fn run(args: Arguments) -> Result<RunSummary> {
    let username = format_username(&args.username).map_err(Error::Config)?;

    let session = new_session(&args.common)?;
    let passwords = read_lines(&args.passwords)?;

    let jobs = passwords.map(|password| Job::Login {
        username: username.clone(),
        password,
    });
    run_jobs(&args.common, session, jobs, true)
}
