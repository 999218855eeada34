//! A small in-memory database with nested transactions.
//!
//! Variables map names to values. Transactions can be nested with `BEGIN`;
//! `ROLLBACK` undoes only the innermost block while `COMMIT` closes all of
//! them at once. `NUMEQUALTO` counts the variables holding a value through a
//! reverse index that is kept in step with every write and undo.
//!
//! - [`store`]: the transactional store and its two indexes
//! - [`protocol`]: parsing of shell lines into commands
//! - [`session`]: the line-oriented loop that feeds commands to a store
//! - [`cli`]: command-line flags for the binary

pub mod cli;
pub mod protocol;
pub mod session;
pub mod store;

pub use protocol::{Command, ParseError};
pub use session::{Reply, Session, SessionStats};
pub use store::{StoreError, TransactionalStore};
