const LOGO: &str = r#"
 _            _                      _
| | _____ _ __| |__  _ __  _ __ ___ | |__   ___
| |/ / _ \ '__| '_ \| '_ \| '__/ _ \| '_ \ / _ \
|   <  __/ |  | |_) | |_) | | | (_) | |_) |  __/
|_|\_\___|_|  |_.__/| .__/|_|  \___/|_.__/ \___|
                    |_|
Kerberos pre-auth probing: user enumeration, password spraying, AS-REP roasting
"#;

use chrono::Local;
use kerbprobe::args::{args, ArgumentsParser};
use kerbprobe::commands;
use kerbprobe::logger::init_logging;
use std::process::ExitCode;

fn main() -> ExitCode {
    let matches = args().get_matches();
    let Some(arguments) = ArgumentsParser::parse(&matches) else {
        eprintln!("[!] Unknown command");
        return ExitCode::FAILURE;
    };

    println!("{}", LOGO);
    println!(
        "Version: {} - {}\n",
        env!("CARGO_PKG_VERSION"),
        Local::now().format("%m/%d/%y - %H:%M:%S")
    );

    init_logging(arguments.common().verbose);

    match commands::run(arguments) {
        Ok(summary) if summary.aborted => ExitCode::FAILURE,
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!(target: kerbprobe::logger::DEFAULT_TARGET, "{}", err);
            ExitCode::FAILURE
        }
    }
}
