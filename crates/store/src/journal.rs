//! Undo journal for `MemoryStore` transactions.
//!
//! Writes are applied to the tables eagerly; the journal keeps what is
//! needed to undo them if the transaction rolls back.

use rowstage_core::Value;

/// Internal row slot identifier within one in-memory table.
pub type SlotId = u64;

/// A single journaled change.
#[derive(Clone, Debug, PartialEq)]
pub enum JournalEntry {
    /// A row was inserted into `slot`.
    Insert { table: String, slot: SlotId },
    /// The row in `slot` was overwritten; `old` holds its prior values.
    Update {
        table: String,
        slot: SlotId,
        old: Vec<Value>,
    },
    /// The row in `slot` was removed; `row` holds its values.
    Delete {
        table: String,
        slot: SlotId,
        row: Vec<Value>,
    },
}

impl JournalEntry {
    pub fn table(&self) -> &str {
        match self {
            JournalEntry::Insert { table, .. }
            | JournalEntry::Update { table, .. }
            | JournalEntry::Delete { table, .. } => table,
        }
    }

    pub fn slot(&self) -> SlotId {
        match self {
            JournalEntry::Insert { slot, .. }
            | JournalEntry::Update { slot, .. }
            | JournalEntry::Delete { slot, .. } => *slot,
        }
    }
}

/// Ordered list of changes made inside one transaction.
#[derive(Debug, Default)]
pub struct Journal {
    entries: Vec<JournalEntry>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_insert(&mut self, table: &str, slot: SlotId) {
        self.entries.push(JournalEntry::Insert {
            table: table.into(),
            slot,
        });
    }

    pub fn record_update(&mut self, table: &str, slot: SlotId, old: Vec<Value>) {
        self.entries.push(JournalEntry::Update {
            table: table.into(),
            slot,
            old,
        });
    }

    pub fn record_delete(&mut self, table: &str, slot: SlotId, row: Vec<Value>) {
        self.entries.push(JournalEntry::Delete {
            table: table.into(),
            slot,
            row,
        });
    }

    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Finalizes the transaction, handing back what it changed.
    pub fn commit(self) -> Vec<JournalEntry> {
        self.entries
    }

    /// Consumes the journal, yielding entries newest first for undo.
    pub fn into_undo(self) -> impl Iterator<Item = JournalEntry> {
        self.entries.into_iter().rev()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_journal_records_in_order() {
        let mut journal = Journal::new();
        assert!(journal.is_empty());

        journal.record_insert("t", 1);
        journal.record_update("t", 0, vec![Value::Int64(5)]);
        journal.record_delete("u", 2, vec![Value::Null]);

        assert_eq!(journal.len(), 3);
        assert_eq!(journal.entries()[1].slot(), 0);
        assert_eq!(journal.entries()[2].table(), "u");
    }

    #[test]
    fn test_undo_order_is_reversed() {
        let mut journal = Journal::new();
        journal.record_insert("t", 1);
        journal.record_insert("t", 2);

        let slots: Vec<SlotId> = journal.into_undo().map(|e| e.slot()).collect();
        assert_eq!(slots, vec![2, 1]);
    }

    #[test]
    fn test_commit_hands_back_entries() {
        let mut journal = Journal::new();
        journal.record_delete("t", 7, vec![Value::Int64(7)]);
        let entries = journal.commit();
        assert!(matches!(entries[0], JournalEntry::Delete { slot: 7, .. }));
    }
}
