//! The subcommands: each one turns its arguments into probe jobs and hands
//! them to the runner.

pub mod bruteforce;
pub mod bruteuser;
pub mod passwordspray;
pub mod userenum;

use crate::args::{Arguments, CommonArguments};
use crate::error::Result;
use crate::kerberos::session::Session;
use crate::spray::{Job, RunSummary, Runner};
use std::sync::Arc;

pub fn run(arguments: Arguments) -> Result<RunSummary> {
    match arguments {
        Arguments::UserEnum(args) => userenum::run(args),
        Arguments::PasswordSpray(args) => passwordspray::run(args),
        Arguments::BruteUser(args) => bruteuser::run(args),
        Arguments::BruteForce(args) => bruteforce::run(args),
    }
}

fn new_session(common: &CommonArguments) -> Result<Arc<Session>> {
    let session = Session::new(common.session_options())?;
    let logger = session.logger();

    logger.info("Using KDC(s):");
    for kdc in session.kdcs().values() {
        logger.info(format!("\t{}", kdc));
    }
    logger.debug(format!("krb5.conf:\n{}", session.config_string()));

    Ok(Arc::new(session))
}

fn run_jobs<I>(
    common: &CommonArguments,
    session: Arc<Session>,
    jobs: I,
    stop_on_success: bool,
) -> Result<RunSummary>
where
    I: IntoIterator<Item = Job>,
{
    let runner = Runner::new(session, common.runner_config(stop_on_success))?;
    Ok(runner.run(jobs))
}
