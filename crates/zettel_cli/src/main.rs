//! `zettel` command-line front end.
//!
//! # Responsibility
//! - Open the store configured through `ZETTELTWEET_*` variables.
//! - Map one command line onto one store operation.
//!
//! # Invariants
//! - Failures print `error: <message>` to stderr and exit with status 1.

mod args;
mod commands;

use args::Command;
use commands::CliError;
use log::error;
use std::io::{self, Write};
use std::process::ExitCode;
use zettel_core::{open_store, StoreConfig};

fn main() -> ExitCode {
    match run(std::env::args().skip(1).collect()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_command module=cli status=error error={err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(raw_args: Vec<String>) -> Result<(), CliError> {
    let command = args::parse(raw_args)?;
    if command == Command::Help {
        print_help();
        return Ok(());
    }

    let config = StoreConfig::from_env()?;
    let mut store = open_store(&config)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    commands::run(command, &mut store, &mut out)?;
    out.flush().map_err(commands::stdout_error)
}

fn print_help() {
    println!(
        "\
ZettelTweet notes
Usage:
  zettel list                                 List notes, newest first
  zettel show <id>                            Show one note with its replies
  zettel tag <name>                           List notes carrying a tag
  zettel tags                                 List tags with usage counts
  zettel links                                List note pairs that share tags
  zettel threads                              List threads, most recently updated first
  zettel thread <id>                          Show a thread in reply order
  zettel new <content> [-t tag]...            Create a standalone note
  zettel start <content> [-t tag]...          Start a new thread
  zettel reply <parent-id> <content> [-t tag]...
                                              Reply to a note (threads it when needed)
  zettel edit <id> [--content text] [-t tag]...
                                              Replace content and/or tags
  zettel delete <id>                          Delete a note without replies
  zettel search <query> [--limit n]           Case-insensitive search in content and tags
  zettel export [dir]                         Write zetteltweet-backup-<date>.json
  zettel import <file>                        Replace all data with a backup file
  zettel usage                                Show storage usage and last sync time
  zettel clear                                Remove all notes and threads
  zettel help                                 Show this message

Environment:
  ZETTELTWEET_BACKEND     memory | file | sqlite (default: sqlite)
  ZETTELTWEET_DATA_PATH   Database file or data directory (default: system temp dir)
  ZETTELTWEET_SEED        Set to 0 or false to skip seeding an empty store
  ZETTELTWEET_LOG_LEVEL   trace | debug | info | warn | error
  ZETTELTWEET_LOG_DIR     Absolute directory for rolling log files
"
    );
}
