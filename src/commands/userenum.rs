use super::{new_session, run_jobs};
use crate::args::userenum::Arguments;
use crate::error::Result;
use crate::spray::{read_lines, usernames, Job, RunSummary};

pub fn run(args: Arguments) -> Result<RunSummary> {
    let session = new_session(&args.common)?;
    let logger = session.logger().clone();
    let lines = read_lines(&args.usernames)?;

    let jobs = usernames(lines, &logger).map(Job::Username);
    run_jobs(&args.common, session, jobs, false)
}
