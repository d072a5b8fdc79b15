//! Change notifications consumed by a UI binding layer
//!
//! Models run on the UI thread, so slots are plain `FnMut` closures with no
//! synchronization.

use std::fmt;

/// A structural change to a model's rows.
///
/// `Begin*` and `End*` always come in pairs so observers can update
/// consistently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    BeginReset,
    EndReset,
    /// Rows `first..=last` are about to be inserted at the top level.
    BeginInsertRows { first: usize, last: usize },
    EndInsertRows,
}

/// A list of slots invoked whenever a value is emitted.
pub struct Signal<T> {
    slots: Vec<Box<dyn FnMut(&T)>>,
}

impl<T> Signal<T> {
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// Connect a slot. Slots are called in connection order.
    pub fn connect(&mut self, slot: impl FnMut(&T) + 'static) {
        self.slots.push(Box::new(slot));
    }

    pub fn emit(&mut self, value: &T) {
        for slot in &mut self.slots {
            slot(value);
        }
    }

    pub fn is_connected(&self) -> bool {
        !self.slots.is_empty()
    }
}

impl<T> Default for Signal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("slots", &self.slots.len())
            .finish()
    }
}
