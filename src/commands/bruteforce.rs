use super::{new_session, run_jobs};
use crate::args::bruteforce::Arguments;
use crate::error::Result;
use crate::spray::{parse_combo, read_lines, Job, RunSummary};

pub fn run(args: Arguments) -> Result<RunSummary> {
    let session = new_session(&args.common)?;
    let logger = session.logger().clone();
    let lines = read_lines(&args.combos)?;

    let jobs = lines
        .filter(|line| !line.trim().is_empty())
        .filter_map(move |line| match parse_combo(&line) {
            Ok((username, password)) => Some(Job::Login { username, password }),
            Err(err) => {
                logger.debug(format!("{} - skipping", err));
                None
            }
        });
    run_jobs(&args.common, session, jobs, false)
}
