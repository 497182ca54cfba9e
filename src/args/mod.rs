pub mod bruteforce;
pub mod bruteuser;
mod common;
pub mod passwordspray;
pub mod userenum;
mod validators;

pub use common::CommonArguments;

use clap::{command, ArgMatches, Command};

pub fn args() -> Command {
    command!()
        .author(env!("CARGO_PKG_AUTHORS"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(userenum::command())
        .subcommand(passwordspray::command())
        .subcommand(bruteuser::command())
        .subcommand(bruteforce::command())
}

#[derive(Debug)]
pub enum Arguments {
    UserEnum(userenum::Arguments),
    PasswordSpray(passwordspray::Arguments),
    BruteUser(bruteuser::Arguments),
    BruteForce(bruteforce::Arguments),
}

impl Arguments {
    pub fn common(&self) -> &CommonArguments {
        match self {
            Self::UserEnum(args) => &args.common,
            Self::PasswordSpray(args) => &args.common,
            Self::BruteUser(args) => &args.common,
            Self::BruteForce(args) => &args.common,
        }
    }
}

pub struct ArgumentsParser {}

impl ArgumentsParser {
    pub fn parse(matches: &ArgMatches) -> Option<Arguments> {
        let (name, sub_matches) = matches.subcommand()?;
        let arguments = match name {
            userenum::COMMAND_NAME => {
                Arguments::UserEnum(userenum::ArgumentsParser::parse(sub_matches))
            }
            passwordspray::COMMAND_NAME => Arguments::PasswordSpray(
                passwordspray::ArgumentsParser::parse(sub_matches),
            ),
            bruteuser::COMMAND_NAME => {
                Arguments::BruteUser(bruteuser::ArgumentsParser::parse(sub_matches))
            }
            bruteforce::COMMAND_NAME => Arguments::BruteForce(
                bruteforce::ArgumentsParser::parse(sub_matches),
            ),
            _ => return None,
        };

        Some(arguments)
    }
}
