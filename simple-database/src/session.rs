//! The read-eval-print loop that drives a [`TransactionalStore`].
//!
//! A [`Session`] owns one store for its whole lifetime. Each input line is
//! parsed with [`Command::parse`]; rejected lines produce a usage message and
//! never touch the store. Output lines are written and flushed as soon as
//! they are produced so interactive use and piped input behave the same.

use std::fmt;
use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::protocol::Command;
use crate::store::{StoreError, TransactionalStore};

/// What a single command produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Command succeeded with nothing to print.
    Silent,
    Value(String),
    /// `GET` on a variable that is not set.
    Null,
    Count(usize),
    NoTransaction,
    End,
}

impl Reply {
    /// The line to print, if any.
    pub fn line(&self) -> Option<String> {
        match self {
            Reply::Silent | Reply::End => None,
            other => Some(other.to_string()),
        }
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Silent | Reply::End => Ok(()),
            Reply::Value(value) => f.write_str(value),
            Reply::Null => f.write_str("NULL"),
            Reply::Count(count) => write!(f, "{count}"),
            Reply::NoTransaction => write!(f, "{}", StoreError::NoOpenTransaction),
        }
    }
}

/// Result of feeding one line to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Continue(Option<String>),
    Stop,
}

/// Counters reported when a session finishes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SessionStats {
    /// Lines read from the input.
    pub lines: usize,
    /// Lines that parsed into a command, including `END`.
    pub commands: usize,
    /// Lines rejected with a usage message.
    pub rejected: usize,
    /// `true` if the input ended with `END` rather than end-of-file.
    pub stopped_by_end: bool,
}

#[derive(Debug, Default)]
pub struct Session {
    store: TransactionalStore,
    stats: SessionStats,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a session on top of an existing store.
    pub fn with_store(store: TransactionalStore) -> Self {
        Self {
            store,
            stats: SessionStats::default(),
        }
    }

    pub fn store(&self) -> &TransactionalStore {
        &self.store
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Consumes the session, handing back its store.
    pub fn into_store(self) -> TransactionalStore {
        self.store
    }

    /// Applies one parsed command to the store.
    pub fn execute(&mut self, command: Command) -> Reply {
        let store = &mut self.store;
        match command {
            Command::Set { name, value } => {
                store.set(&name, &value);
                Reply::Silent
            }
            Command::Get { name } => match store.get(&name) {
                Some(value) => Reply::Value(value.to_string()),
                None => Reply::Null,
            },
            Command::Unset { name } => {
                store.unset(&name);
                Reply::Silent
            }
            Command::NumEqualTo { value } => Reply::Count(store.count_equal(&value)),
            Command::Begin => {
                store.begin();
                Reply::Silent
            }
            Command::Rollback => transaction_reply(store.rollback()),
            Command::Commit => transaction_reply(store.commit()),
            Command::End => Reply::End,
        }
    }

    /// Parses and executes one input line.
    pub fn handle_line(&mut self, line: &str) -> Step {
        self.stats.lines += 1;
        match Command::parse(line) {
            Ok(command) => {
                self.stats.commands += 1;
                match self.execute(command) {
                    Reply::End => Step::Stop,
                    reply => Step::Continue(reply.line()),
                }
            }
            Err(err) => {
                self.stats.rejected += 1;
                warn!(line = line.trim_end(), error = %err, "rejected command");
                Step::Continue(Some(err.to_string()))
            }
        }
    }

    /// Reads commands from `input` until `END` or end-of-file, writing every
    /// reply line to `output`. When `prompt` is set it is written (without a
    /// newline) before each read.
    pub fn run<R, W>(
        &mut self,
        mut input: R,
        mut output: W,
        prompt: Option<&str>,
    ) -> Result<SessionStats>
    where
        R: BufRead,
        W: Write,
    {
        info!("session started");
        let mut buf = Vec::new();
        loop {
            if let Some(prompt) = prompt {
                output.write_all(prompt.as_bytes()).context("failed to write prompt")?;
                output.flush().context("failed to flush output")?;
            }

            buf.clear();
            let bytes = input
                .read_until(b'\n', &mut buf)
                .context("failed to read command")?;
            if bytes == 0 {
                break;
            }

            // Names and values are opaque; invalid UTF-8 is decoded lossily.
            let line = String::from_utf8_lossy(&buf);
            match self.handle_line(&line) {
                Step::Continue(Some(reply)) => {
                    writeln!(output, "{reply}").context("failed to write reply")?;
                    output.flush().context("failed to flush output")?;
                }
                Step::Continue(None) => {}
                Step::Stop => {
                    self.stats.stopped_by_end = true;
                    break;
                }
            }
        }

        let stats = self.stats;
        info!(
            lines = stats.lines,
            commands = stats.commands,
            rejected = stats.rejected,
            open_transactions = self.store.depth(),
            "session finished"
        );
        Ok(stats)
    }
}

fn transaction_reply(result: Result<(), StoreError>) -> Reply {
    match result {
        Ok(()) => Reply::Silent,
        Err(StoreError::NoOpenTransaction) => Reply::NoTransaction,
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn run_script(script: &str) -> (String, SessionStats) {
        let mut session = Session::new();
        let mut output = Vec::new();
        let stats = session
            .run(Cursor::new(script), &mut output, None)
            .expect("session run");
        (String::from_utf8(output).expect("utf8 output"), stats)
    }

    #[test]
    fn replies_render_as_output_lines() {
        assert_eq!(Reply::Value("10".into()).line().as_deref(), Some("10"));
        assert_eq!(Reply::Null.line().as_deref(), Some("NULL"));
        assert_eq!(Reply::Count(0).line().as_deref(), Some("0"));
        assert_eq!(Reply::NoTransaction.line().as_deref(), Some("NO TRANSACTION"));
        assert_eq!(Reply::Silent.line(), None);
        assert_eq!(Reply::End.line(), None);
    }

    #[test]
    fn execute_maps_store_results() {
        let mut session = Session::new();
        assert_eq!(session.execute(Command::Rollback), Reply::NoTransaction);
        assert_eq!(
            session.execute(Command::Set {
                name: "a".into(),
                value: "1".into()
            }),
            Reply::Silent
        );
        assert_eq!(
            session.execute(Command::Get { name: "a".into() }),
            Reply::Value("1".into())
        );
        assert_eq!(
            session.execute(Command::NumEqualTo { value: "1".into() }),
            Reply::Count(1)
        );
        assert_eq!(session.execute(Command::Begin), Reply::Silent);
        assert_eq!(session.execute(Command::Commit), Reply::Silent);
        assert_eq!(session.execute(Command::Commit), Reply::NoTransaction);
    }

    #[test]
    fn handle_line_reports_usage_without_touching_store() {
        let mut session = Session::new();
        assert_eq!(
            session.handle_line("SET a"),
            Step::Continue(Some("Usage: SET <name> <value>".into()))
        );
        assert!(session.store().is_empty());
        assert_eq!(session.handle_line("END"), Step::Stop);

        let stats = session.stats();
        assert_eq!(stats.lines, 2);
        assert_eq!(stats.commands, 1);
        assert_eq!(stats.rejected, 1);
    }

    #[test]
    fn run_stops_at_end_and_ignores_the_rest() {
        let (output, stats) = run_script("SET a 10\nGET a\nEND\nGET a\n");
        assert_eq!(output, "10\n");
        assert!(stats.stopped_by_end);
        assert_eq!(stats.lines, 3);
    }

    #[test]
    fn run_stops_at_end_of_input_without_end() {
        let (output, stats) = run_script("SET a 10\nGET a");
        assert_eq!(output, "10\n");
        assert!(!stats.stopped_by_end);
    }

    #[test]
    fn run_continues_past_invalid_utf8() {
        let mut session = Session::new();
        let mut output = Vec::new();
        let stats = session
            .run(Cursor::new(&b"SET a 1\nSET b \xff\xfe\nGET a\nEND\n"[..]), &mut output, None)
            .expect("session run");

        assert_eq!(String::from_utf8(output).unwrap(), "1\n");
        assert!(stats.stopped_by_end);
        assert_eq!(stats.commands, 4);
        assert_eq!(session.store().len(), 2);
        assert_eq!(session.store().count_equal("\u{fffd}\u{fffd}"), 1);
    }

    #[test]
    fn run_writes_prompt_before_each_read() {
        let mut session = Session::new();
        let mut output = Vec::new();
        session
            .run(Cursor::new("GET a\nEND\n"), &mut output, Some("> "))
            .expect("session run");
        assert_eq!(String::from_utf8(output).unwrap(), "> NULL\n> ");
    }

    #[test]
    fn session_wraps_existing_store() {
        let mut store = TransactionalStore::new();
        store.set("x", "seed");
        let mut session = Session::with_store(store);
        assert_eq!(
            session.handle_line("GET x"),
            Step::Continue(Some("seed".into()))
        );
        assert_eq!(session.into_store().get("x"), Some("seed"));
    }
}
