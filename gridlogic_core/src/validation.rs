//! Validation Module - Store Consistency Audit
//! ============================================
//!
//! Checks that the position index and the instance table of a
//! [`GridStore`] agree with each other:
//! - every index entry names a live instance sitting at that cell
//! - every live instance is indexed at its own position
//!
//! Usage:
//! ```ignore
//! use gridlogic_core::validation::audit;
//!
//! let report = audit(circuit.store());
//! assert!(report.is_consistent(), "{report}");
//! ```

use crate::gridlogic_space::{Coord, GridStore, InstanceId};
use serde::Serialize;
use std::fmt;

// =============================================================================
// ISSUES
// =============================================================================

/// One disagreement between the index and the instance table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum ConsistencyIssue {
    /// Index names an id that is not in the table
    DanglingIndex { pos: Coord, id: InstanceId },

    /// Index names a live instance that sits elsewhere
    PositionMismatch { pos: Coord, id: InstanceId, actual: Coord },

    /// Live instance whose cell does not point back at it
    MissingIndex { id: InstanceId, pos: Coord },
}

impl fmt::Display for ConsistencyIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsistencyIssue::DanglingIndex { pos, id } => {
                write!(f, "index {} -> {} has no instance", pos, id)
            }
            ConsistencyIssue::PositionMismatch { pos, id, actual } => {
                write!(f, "index {} -> {} but instance is at {}", pos, id, actual)
            }
            ConsistencyIssue::MissingIndex { id, pos } => {
                write!(f, "{} at {} is not indexed", id, pos)
            }
        }
    }
}

// =============================================================================
// REPORT
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConsistencyReport {
    pub instances: usize,
    pub index_entries: usize,
    pub issues: Vec<ConsistencyIssue>,
}

impl ConsistencyReport {
    pub fn is_consistent(&self) -> bool {
        self.issues.is_empty()
    }
}

impl fmt::Display for ConsistencyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} instances, {} index entries, {} issues",
            self.instances,
            self.index_entries,
            self.issues.len()
        )?;
        for issue in &self.issues {
            writeln!(f, "  - {}", issue)?;
        }
        Ok(())
    }
}

/// Audits a store. Issues are sorted so reports compare stably.
pub fn audit(store: &GridStore) -> ConsistencyReport {
    let mut issues = Vec::new();
    let mut index_entries = 0;

    for (pos, id) in store.index_entries() {
        index_entries += 1;
        match store.get(id) {
            None => issues.push(ConsistencyIssue::DanglingIndex { pos, id }),
            Some(instance) if instance.position() != pos => {
                issues.push(ConsistencyIssue::PositionMismatch {
                    pos,
                    id,
                    actual: instance.position(),
                })
            }
            Some(_) => {}
        }
    }

    for instance in store.iter() {
        if store.id_at(instance.position()) != Some(instance.id()) {
            issues.push(ConsistencyIssue::MissingIndex {
                id: instance.id(),
                pos: instance.position(),
            });
        }
    }

    issues.sort_by_key(|issue| match issue {
        ConsistencyIssue::DanglingIndex { id, .. }
        | ConsistencyIssue::PositionMismatch { id, .. }
        | ConsistencyIssue::MissingIndex { id, .. } => *id,
    });

    ConsistencyReport {
        instances: store.len(),
        index_entries,
        issues,
    }
}
