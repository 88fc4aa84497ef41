// HBNB - Command console
//
// Reads commands from stdin, one per line, until `quit` or end of input.
// Piped input gets no prompt, so scripts see only command output.

use std::io::{self, BufRead, IsTerminal, Write};

use anyhow::{Context, Result};
use clap::Parser;

use hbnb::config::StorageArgs;
use hbnb::console::{Console, PROMPT};
use hbnb::{logging, storage, StorageConfig};

#[derive(Parser)]
#[command(name = "hbnb-console", version, about = "HBNB command console")]
struct Cli {
    #[command(flatten)]
    storage: StorageArgs,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    logging::init(logging::CONSOLE_LEVEL);

    let config = StorageConfig::from(cli.storage);
    let storage = storage::open(&config).context("opening storage")?;

    let interactive = io::stdin().is_terminal();
    let mut console = Console::new(storage, io::stdout());
    let mut lines = io::stdin().lock().lines();

    loop {
        if interactive {
            write!(console.output_mut(), "{}", PROMPT)?;
            console.output_mut().flush()?;
        }

        let line = match lines.next() {
            Some(line) => line.context("reading stdin")?,
            None => "EOF".to_string(),
        };

        if console.onecmd(&line)? {
            break;
        }
    }

    console.finish()?;
    Ok(())
}
