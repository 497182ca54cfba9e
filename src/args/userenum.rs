use super::common::{add_session_args, string_arg, CommonArguments};
use clap::{Arg, ArgMatches, Command};

pub const COMMAND_NAME: &str = "userenum";

pub fn command() -> Command {
    add_session_args(
        Command::new(COMMAND_NAME)
            .about("Enumerate valid domain usernames via Kerberos")
            .arg(
                Arg::new("usernames")
                    .help("File containing usernames to test, one per line ('-' for stdin)")
                    .required(true),
            ),
    )
}

#[derive(Debug)]
pub struct Arguments {
    pub common: CommonArguments,
    pub usernames: String,
}

pub struct ArgumentsParser<'a> {
    matches: &'a ArgMatches,
}

impl<'a> ArgumentsParser<'a> {
    pub fn parse(matches: &'a ArgMatches) -> Arguments {
        let parser = Self { matches };
        parser._parse()
    }

    fn _parse(&self) -> Arguments {
        Arguments {
            common: CommonArguments::parse(self.matches),
            usernames: string_arg(self.matches, "usernames").unwrap_or_default(),
        }
    }
}
