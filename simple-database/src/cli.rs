use std::path::PathBuf;

use clap::{Parser, ValueHint};

#[derive(Parser, Debug)]
#[command(author, version, about = "In-memory key-value database with nested transactions", long_about = None)]
pub struct Cli {
    /// Read commands from this file instead of standard input.
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub input: Option<PathBuf>,

    /// Print a `> ` prompt before reading each command.
    #[arg(long)]
    pub prompt: bool,
}

impl Cli {
    pub fn prompt(&self) -> Option<&'static str> {
        self.prompt.then_some("> ")
    }
}
