use super::common::{add_session_args, string_arg, CommonArguments};
use clap::{Arg, ArgMatches, Command};

pub const COMMAND_NAME: &str = "bruteuser";

pub fn command() -> Command {
    add_session_args(
        Command::new(COMMAND_NAME)
            .about("Bruteforce a single user's password from a wordlist")
            .arg(
                Arg::new("passwords")
                    .help("File containing passwords to test, one per line ('-' for stdin)")
                    .required(true),
            )
            .arg(
                Arg::new("username")
                    .help("Username to bruteforce")
                    .required(true),
            ),
    )
}

#[derive(Debug)]
pub struct Arguments {
    pub common: CommonArguments,
    pub passwords: String,
    pub username: String,
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
            passwords: string_arg(self.matches, "passwords").unwrap_or_default(),
            username: string_arg(self.matches, "username").unwrap_or_default(),
        }
    }
}
