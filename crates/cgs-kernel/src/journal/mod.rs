//! Append-only event journal
//!
//! Hash-chained, in-memory store for graph events. Each entry commits to
//! the previous entry's hash, so any edit to history breaks the chain.

use crate::error::JournalError;
use crate::types::CommandGraphEvent;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// One committed event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub sequence: u64,
    pub event: CommandGraphEvent,
    pub prev_hash: [u8; 32],
    pub hash: [u8; 32],
}

impl JournalEntry {
    /// Hex rendering of this entry's hash
    #[must_use]
    pub fn hash_hex(&self) -> String {
        hex::encode(self.hash)
    }
}

/// Thread-safe journal; appends serialize on an internal lock
#[derive(Debug, Default)]
pub struct EventJournal {
    inner: Mutex<Vec<JournalEntry>>,
}

impl EventJournal {
    /// Create an empty journal
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Commit one event and return its sequence number
    pub fn append(&self, event: CommandGraphEvent) -> u64 {
        let mut guard = self.inner.lock();
        let prev_hash = guard.last().map_or([0u8; 32], |e| e.hash);
        let sequence = guard.len() as u64;
        let hash = compute_hash(sequence, &event, &prev_hash);
        guard.push(JournalEntry {
            sequence,
            event,
            prev_hash,
            hash,
        });
        sequence
    }

    /// Commit events in order
    pub fn extend(&self, events: impl IntoIterator<Item = CommandGraphEvent>) {
        for event in events {
            self.append(event);
        }
    }

    /// Snapshot of every committed entry
    pub fn entries(&self) -> Vec<JournalEntry> {
        self.inner.lock().clone()
    }

    /// Number of committed entries
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Whether nothing has been committed yet
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Recompute the chain and report the first broken link
    pub fn verify_integrity(&self) -> Result<(), JournalError> {
        verify_chain(&self.inner.lock())
    }
}

/// Check a sequence of entries, e.g. one read back from storage
pub fn verify_chain(entries: &[JournalEntry]) -> Result<(), JournalError> {
    let mut prev = [0u8; 32];
    for (index, entry) in entries.iter().enumerate() {
        let expected = compute_hash(index as u64, &entry.event, &prev);
        if entry.sequence != index as u64 || entry.prev_hash != prev || entry.hash != expected {
            return Err(JournalError::IntegrityViolation {
                sequence: index as u64,
            });
        }
        prev = entry.hash;
    }
    Ok(())
}

fn compute_hash(sequence: u64, event: &CommandGraphEvent, prev_hash: &[u8; 32]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(sequence.to_le_bytes());
    hasher.update(event.event_id.as_bytes());
    hasher.update(event.kind.as_str().as_bytes());
    hasher.update([0]);
    hasher.update(event.graph_id.as_str().as_bytes());
    hasher.update([0]);
    hasher.update(event.trace_id.as_bytes());
    hasher.update([0]);
    hasher.update(event.emitted_at.timestamp_micros().to_le_bytes());
    hasher.update(event.payload.to_string().as_bytes());
    hasher.update([0]);
    hasher.update(prev_hash);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CommandNode, GraphId};

    fn event(id: &str) -> CommandGraphEvent {
        CommandGraphEvent::node_state_changed(&CommandNode::new(GraphId::from("g"), id, id))
    }

    #[test]
    fn append_chains_hashes() {
        let journal = EventJournal::new();
        assert!(journal.is_empty());
        assert_eq!(journal.append(event("a")), 0);
        assert_eq!(journal.append(event("b")), 1);

        let entries = journal.entries();
        assert_eq!(entries[0].prev_hash, [0u8; 32]);
        assert_eq!(entries[1].prev_hash, entries[0].hash);
        assert_eq!(entries[0].hash_hex().len(), 64);
        assert!(journal.verify_integrity().is_ok());
    }

    #[test]
    fn tampering_is_detected() {
        let journal = EventJournal::new();
        journal.extend([event("a"), event("b"), event("c")]);

        let mut entries = journal.entries();
        entries[1].event.trace_id = "forged".to_string();
        assert_eq!(
            verify_chain(&entries),
            Err(JournalError::IntegrityViolation { sequence: 1 })
        );
    }
}
