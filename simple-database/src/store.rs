//! In-memory transactional key-value store.
//!
//! Every variable keeps a stack of values. Outside a transaction the top of
//! the stack is overwritten in place; inside one, each write pushes a new
//! entry that `rollback` later pops. A reverse index from value to the set of
//! names currently holding it answers `NUMEQUALTO` without scanning.

use std::collections::{BTreeMap, HashMap, HashSet};

use thiserror::Error;
use tracing::{debug, trace};

/// A history entry. `None` is the unset marker.
type Slot = Option<String>;

/// Failures reported by transaction control. None of them change the store.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    /// `ROLLBACK` or `COMMIT` with no open `BEGIN`.
    #[error("NO TRANSACTION")]
    NoOpenTransaction,
}

/// Key-value store with nested transactions.
///
/// The forward index (`name -> history`) and the reverse index
/// (`value -> names`) are only ever updated together through [`Self::assign`]
/// and [`Self::undo_one`], so after every public call the reverse index holds
/// exactly the names whose current value is that key.
#[derive(Debug, Default)]
pub struct TransactionalStore {
    histories: HashMap<String, Vec<Slot>>,
    holders: HashMap<String, HashSet<String>>,
    /// One mutation log per open `BEGIN`, innermost last.
    scopes: Vec<Vec<String>>,
}

impl TransactionalStore {
    /// Creates an empty store with no open transaction.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `name` to `value`.
    pub fn set(&mut self, name: &str, value: &str) {
        self.assign(name, Some(value.to_string()));
    }

    /// Unsets `name`, making it behave as if it was never set.
    pub fn unset(&mut self, name: &str) {
        self.assign(name, None);
    }

    /// Returns the current value of `name`, or `None` if it is not set.
    pub fn get(&self, name: &str) -> Option<&str> {
        let value = self.current(name);
        trace!(name, found = value.is_some(), "get");
        value
    }

    /// Number of variables currently set to exactly `value`.
    pub fn count_equal(&self, value: &str) -> usize {
        self.holders.get(value).map_or(0, HashSet::len)
    }

    /// Opens a new (possibly nested) transaction block.
    pub fn begin(&mut self) {
        self.scopes.push(Vec::new());
        debug!(depth = self.scopes.len(), "begin");
    }

    /// Undoes every write made in the innermost open block and closes it.
    ///
    /// Outer blocks stay open. Writes are undone in the order they were
    /// logged, one history entry per logged write, so a variable written N
    /// times in the block is popped N times.
    pub fn rollback(&mut self) -> Result<(), StoreError> {
        let frame = self.scopes.pop().ok_or(StoreError::NoOpenTransaction)?;
        debug!(depth = self.scopes.len() + 1, writes = frame.len(), "rollback");
        for name in &frame {
            self.undo_one(name);
        }
        Ok(())
    }

    /// Closes every open block at once and forgets all undo history.
    pub fn commit(&mut self) -> Result<(), StoreError> {
        if self.scopes.is_empty() {
            return Err(StoreError::NoOpenTransaction);
        }
        debug!(depth = self.scopes.len(), "commit");
        self.scopes.clear();

        for history in self.histories.values_mut() {
            if history.len() > 1 {
                let latest = history.pop().flatten();
                history.clear();
                history.extend(latest.map(Some));
            }
        }
        self.histories.retain(|_, history| !history.is_empty());
        Ok(())
    }

    /// Number of open transaction blocks.
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// `true` while at least one `BEGIN` is open.
    pub fn in_transaction(&self) -> bool {
        !self.scopes.is_empty()
    }

    /// Number of entries in the value history of `name`, including unset
    /// markers. Zero for names never written.
    pub fn history_depth(&self, name: &str) -> usize {
        self.histories.get(name).map_or(0, Vec::len)
    }

    /// Every variable that is currently set, with its value.
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.histories
            .iter()
            .filter_map(|(name, history)| {
                let value = history.last()?.as_ref()?;
                Some((name.clone(), value.clone()))
            })
            .collect()
    }

    /// Number of variables that are currently set.
    pub fn len(&self) -> usize {
        self.holders.values().map(HashSet::len).sum()
    }

    /// `true` when no variable is currently set.
    pub fn is_empty(&self) -> bool {
        self.holders.is_empty()
    }

    fn current(&self, name: &str) -> Option<&str> {
        self.histories.get(name)?.last()?.as_deref()
    }

    /// Writes `slot` as the new current value of `name`, keeping both
    /// indexes and the open block's log in step.
    fn assign(&mut self, name: &str, slot: Slot) {
        let history = self.histories.entry(name.to_string()).or_default();
        if let Some(Some(old)) = history.last() {
            remove_holder(&mut self.holders, old, name);
        }

        if self.scopes.is_empty() && !history.is_empty() {
            if let Some(top) = history.last_mut() {
                *top = slot.clone();
            }
        } else {
            history.push(slot.clone());
        }

        if let Some(value) = &slot {
            self.holders
                .entry(value.clone())
                .or_default()
                .insert(name.to_string());
        }

        if let Some(frame) = self.scopes.last_mut() {
            frame.push(name.to_string());
        }

        debug!(
            name,
            value = slot.as_deref().unwrap_or("<unset>"),
            depth = self.scopes.len(),
            "assign"
        );
    }

    /// Pops the top history entry of `name` and re-indexes what is left.
    fn undo_one(&mut self, name: &str) {
        let Some(history) = self.histories.get_mut(name) else {
            return;
        };
        if let Some(Some(popped)) = history.pop() {
            remove_holder(&mut self.holders, &popped, name);
        }
        if let Some(Some(restored)) = history.last() {
            self.holders
                .entry(restored.clone())
                .or_default()
                .insert(name.to_string());
        }
        if history.is_empty() {
            self.histories.remove(name);
        }
    }
}

fn remove_holder(holders: &mut HashMap<String, HashSet<String>>, value: &str, name: &str) {
    if let Some(names) = holders.get_mut(value) {
        names.remove(name);
        if names.is_empty() {
            holders.remove(value);
        }
    }
}
