use super::common::{add_session_args, string_arg, CommonArguments};
use clap::{Arg, ArgAction, ArgMatches, Command};

pub const COMMAND_NAME: &str = "passwordspray";

pub fn command() -> Command {
    add_session_args(
        Command::new(COMMAND_NAME)
            .about("Test a single password against a list of users")
            .arg(
                Arg::new("usernames")
                    .help("File containing usernames to spray, one per line ('-' for stdin)")
                    .required(true),
            )
            .arg(
                Arg::new("password")
                    .help("Password to spray")
                    .required_unless_present("user-as-pass"),
            )
            .arg(
                Arg::new("user-as-pass")
                    .long("user-as-pass")
                    .action(ArgAction::SetTrue)
                    .help("Spray every account with its own username as password"),
            ),
    )
}

#[derive(Debug)]
pub struct Arguments {
    pub common: CommonArguments,
    pub usernames: String,
    pub password: Option<String>,
    pub user_as_pass: bool,
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
            password: string_arg(self.matches, "password"),
            user_as_pass: self.matches.get_flag("user-as-pass"),
        }
    }
}
