//! The "SPACE" Engine - Spatial Index + Placed-Component Store
//!
//! A sparse, unbounded grid. Two maps are kept in lockstep:
//! - `index`: Coord -> InstanceId (who occupies a cell)
//! - `instances`: InstanceId -> Instance (what the occupant is)
//!
//! Every mutation goes through [`GridStore`] so the two maps can never
//! disagree: `index[pos] == id` holds exactly when `instances[id].position == pos`.

use crate::gridlogic_kinds::{ComponentKind, Instance, Part};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// An integer grid cell. `x` grows east, `y` grows south.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coord {
    pub x: i64,
    pub y: i64,
}

impl Coord {
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    /// The adjacent cell in `dir`, or `None` at the edge of the `i64` plane.
    pub fn step(self, dir: Direction) -> Option<Coord> {
        let (dx, dy) = dir.offset();
        Some(Coord {
            x: self.x.checked_add(dx)?,
            y: self.y.checked_add(dy)?,
        })
    }

    /// Translates by a layout offset.
    pub fn offset(self, dx: i64, dy: i64) -> Option<Coord> {
        Some(Coord {
            x: self.x.checked_add(dx)?,
            y: self.y.checked_add(dy)?,
        })
    }
}

impl From<(i64, i64)> for Coord {
    fn from((x, y): (i64, i64)) -> Self {
        Self { x, y }
    }
}

impl std::fmt::Display for Coord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// One of the four grid directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// -y
    North,
    /// +y
    South,
    /// +x ("front" of comparators and repeaters)
    East,
    /// -x ("back" of switches, comparators and repeaters)
    West,
}

impl Direction {
    /// Order used by [`GridStore::neighbors4`].
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    pub fn offset(self) -> (i64, i64) {
        match self {
            Direction::North => (0, -1),
            Direction::South => (0, 1),
            Direction::East => (1, 0),
            Direction::West => (-1, 0),
        }
    }
}

/// Opaque handle of a placed component.
///
/// Handed out from a monotonic counter and never reused, so a stale id held
/// by a pending effect can never alias a newer instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(pub u64);

impl std::fmt::Display for InstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Errors reported to the editor by edit operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EditError {
    /// The target cell already holds an instance
    #[error("Cell {0} is already occupied")]
    OccupiedCell(Coord),

    /// No live instance has this id
    #[error("Unknown instance {0}")]
    UnknownId(InstanceId),

    /// Only buttons can be toggled by hand
    #[error("Instance {id} ({kind}) cannot be toggled")]
    NotToggleable { id: InstanceId, kind: ComponentKind },
}

/// Spatial index and component store.
#[derive(Debug, Default)]
pub struct GridStore {
    /// Primary index: cell -> occupant
    index: HashMap<Coord, InstanceId>,

    /// Owning store: id -> instance
    instances: HashMap<InstanceId, Instance>,

    /// Counter for generating instance ids
    next_id: u64,
}

impl GridStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a fresh instance of `kind` at `pos`.
    ///
    /// The instance starts with its kind's default activation and, for
    /// switches, `initialized = false`. A dangling index entry at `pos` is
    /// overwritten.
    pub fn insert(&mut self, pos: Coord, kind: ComponentKind) -> Result<InstanceId, EditError> {
        if self.at(pos).is_some() {
            return Err(EditError::OccupiedCell(pos));
        }

        let id = InstanceId(self.next_id);
        self.next_id += 1;

        let active = kind.default_active();
        self.instances.insert(
            id,
            Instance {
                id,
                position: pos,
                active,
                previous_active: active,
                part: Part::fresh(kind),
            },
        );
        self.index.insert(pos, id);

        Ok(id)
    }

    /// Moves an instance to `new_pos`.
    ///
    /// The old index entry is only dropped if it still points at `id`.
    pub fn relocate(&mut self, id: InstanceId, new_pos: Coord) -> Result<(), EditError> {
        let old_pos = match self.instances.get(&id) {
            Some(instance) => instance.position,
            None => return Err(EditError::UnknownId(id)),
        };

        if old_pos == new_pos {
            return Ok(());
        }

        if self.at(new_pos).is_some() {
            return Err(EditError::OccupiedCell(new_pos));
        }

        if self.index.get(&old_pos) == Some(&id) {
            self.index.remove(&old_pos);
        }
        self.index.insert(new_pos, id);

        if let Some(instance) = self.instances.get_mut(&id) {
            instance.position = new_pos;
        }

        Ok(())
    }

    /// Removes an instance from both maps. Removing twice is not an error.
    pub fn remove(&mut self, id: InstanceId) -> Option<Instance> {
        let instance = self.instances.remove(&id)?;
        if self.index.get(&instance.position) == Some(&id) {
            self.index.remove(&instance.position);
        }
        Some(instance)
    }

    /// Drops every instance. Ids keep counting up.
    pub fn clear(&mut self) {
        self.index.clear();
        self.instances.clear();
    }

    /// Returns the id indexed at `pos`.
    pub fn id_at(&self, pos: Coord) -> Option<InstanceId> {
        self.index.get(&pos).copied()
    }

    /// Returns the instance occupying `pos`.
    ///
    /// A dangling index entry resolves to `None`.
    pub fn at(&self, pos: Coord) -> Option<&Instance> {
        self.index.get(&pos).and_then(|id| self.instances.get(id))
    }

    pub fn get(&self, id: InstanceId) -> Option<&Instance> {
        self.instances.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: InstanceId) -> Option<&mut Instance> {
        self.instances.get_mut(&id)
    }

    /// Occupants of the four adjacent cells, in [`Direction::ALL`] order.
    pub fn neighbors4(&self, pos: Coord) -> [Option<InstanceId>; 4] {
        Direction::ALL.map(|dir| pos.step(dir).and_then(|n| self.id_at(n)))
    }

    /// Whether the cell holds an active instance. Empty cells are inactive.
    pub fn is_active_at(&self, pos: Coord) -> bool {
        self.at(pos).is_some_and(|instance| instance.active)
    }

    /// Same as [`is_active_at`](Self::is_active_at) for the cell next to `pos`.
    pub fn is_active_toward(&self, pos: Coord, dir: Direction) -> bool {
        pos.step(dir).is_some_and(|n| self.is_active_at(n))
    }

    /// Sets `active`, returning whether it changed.
    pub(crate) fn set_active(&mut self, id: InstanceId, active: bool) -> bool {
        match self.instances.get_mut(&id) {
            Some(instance) if instance.active != active => {
                instance.active = active;
                true
            }
            _ => false,
        }
    }

    /// Latches every instance's `previous_active` before a pass.
    pub(crate) fn latch_previous(&mut self) {
        for instance in self.instances.values_mut() {
            instance.previous_active = instance.active;
        }
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// All live instances, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &Instance> {
        self.instances.values()
    }

    /// All index entries, in no particular order.
    pub fn index_entries(&self) -> impl Iterator<Item = (Coord, InstanceId)> + '_ {
        self.index.iter().map(|(pos, id)| (*pos, *id))
    }

    /// Ids of every instance of `kind`, sorted.
    pub fn ids_of(&self, kind: ComponentKind) -> Vec<InstanceId> {
        let mut ids: Vec<InstanceId> = self
            .instances
            .values()
            .filter(|instance| instance.kind() == kind)
            .map(|instance| instance.id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Cells occupied by an instance of `kind`.
    pub fn positions_of(&self, kind: ComponentKind) -> HashSet<Coord> {
        self.instances
            .values()
            .filter(|instance| instance.kind() == kind)
            .map(|instance| instance.position)
            .collect()
    }

    #[cfg(test)]
    pub(crate) fn corrupt_index(&mut self, pos: Coord, id: InstanceId) {
        self.index.insert(pos, id);
    }
}
