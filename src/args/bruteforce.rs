use super::common::{add_session_args, string_arg, CommonArguments};
use clap::{Arg, ArgMatches, Command};

pub const COMMAND_NAME: &str = "bruteforce";

pub fn command() -> Command {
    add_session_args(
        Command::new(COMMAND_NAME)
            .about("Read username:password combos from a file or stdin and test them")
            .arg(
                Arg::new("combos")
                    .help("File containing username:password combos, one per line ('-' for stdin)")
                    .required(true),
            ),
    )
}

#[derive(Debug)]
pub struct Arguments {
    pub common: CommonArguments,
    pub combos: String,
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
            combos: string_arg(self.matches, "combos").unwrap_or_default(),
        }
    }
}
