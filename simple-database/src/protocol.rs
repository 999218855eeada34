//! Command parsing for the database shell.
//!
//! Turns a line such as `SET a 10` into a [`Command`]. Verbs are
//! case-sensitive and every verb takes an exact number of arguments, so the
//! store only ever receives complete calls. Anything else becomes a
//! [`ParseError`] whose `Display` is the usage line printed back to the user.

use thiserror::Error;

/// A fully-formed command accepted by the shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Set { name: String, value: String },
    Get { name: String },
    Unset { name: String },
    NumEqualTo { value: String },
    Begin,
    Rollback,
    Commit,
    End,
}

/// The verbs the shell understands, used for usage messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Set,
    Get,
    Unset,
    NumEqualTo,
    Begin,
    Rollback,
    Commit,
    End,
}

impl Verb {
    fn from_token(token: &str) -> Option<Self> {
        let verb = match token {
            "SET" => Verb::Set,
            "GET" => Verb::Get,
            "UNSET" => Verb::Unset,
            "NUMEQUALTO" => Verb::NumEqualTo,
            "BEGIN" => Verb::Begin,
            "ROLLBACK" => Verb::Rollback,
            "COMMIT" => Verb::Commit,
            "END" => Verb::End,
            _ => return None,
        };
        Some(verb)
    }

    /// Expected syntax, e.g. `SET <name> <value>`.
    pub fn usage(self) -> &'static str {
        match self {
            Verb::Set => "SET <name> <value>",
            Verb::Get => "GET <name>",
            Verb::Unset => "UNSET <name>",
            Verb::NumEqualTo => "NUMEQUALTO <value>",
            Verb::Begin => "BEGIN",
            Verb::Rollback => "ROLLBACK",
            Verb::Commit => "COMMIT",
            Verb::End => "END",
        }
    }
}

/// Why a line was rejected before reaching the store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Valid Command: SET GET UNSET NUMEQUALTO BEGIN ROLLBACK COMMIT END")]
    Empty,

    /// Known verb, wrong number of arguments.
    #[error("Usage: {}", .0.usage())]
    Usage(Verb),

    #[error("Valid Command: SET GET UNSET NUMEQUALTO BEGIN ROLLBACK COMMIT END")]
    Unknown(String),
}

impl Command {
    /// Parses one input line. Tokens are separated by runs of whitespace.
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some((&head, args)) = parts.split_first() else {
            return Err(ParseError::Empty);
        };
        let verb = Verb::from_token(head).ok_or_else(|| ParseError::Unknown(head.to_string()))?;

        let command = match (verb, args) {
            (Verb::Set, [name, value]) => Command::Set {
                name: name.to_string(),
                value: value.to_string(),
            },
            (Verb::Get, [name]) => Command::Get {
                name: name.to_string(),
            },
            (Verb::Unset, [name]) => Command::Unset {
                name: name.to_string(),
            },
            (Verb::NumEqualTo, [value]) => Command::NumEqualTo {
                value: value.to_string(),
            },
            (Verb::Begin, []) => Command::Begin,
            (Verb::Rollback, []) => Command::Rollback,
            (Verb::Commit, []) => Command::Commit,
            (Verb::End, []) => Command::End,
            (verb, _) => return Err(ParseError::Usage(verb)),
        };
        Ok(command)
    }
}
