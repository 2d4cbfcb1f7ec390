//! Edit Interface - the mutation and query surface the editor talks to.
//!
//! A [`Circuit`] owns the [`GridStore`] and the [`PropagationEngine`]. Edits
//! apply immediately; deferred effects that edits or passes ask for are
//! collected in an outbox which the [`Scheduler`](crate::Scheduler) drains
//! into its timer queue.

use crate::gridlogic_engine::PropagationEngine;
use crate::gridlogic_kinds::{ComponentKind, Instance, InstanceView};
use crate::gridlogic_space::{Coord, EditError, GridStore, InstanceId};
use crate::gridlogic_time::{DeferredEffect, EffectOutcome};
use crate::layout::Layout;
use crate::metrics::TickReport;
use std::collections::HashSet;
use tracing::debug;

/// A grid of placed components plus the engine that drives them.
#[derive(Debug, Default)]
pub struct Circuit {
    store: GridStore,
    engine: PropagationEngine,
    outbox: Vec<DeferredEffect>,
}

impl Circuit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Places a new component.
    ///
    /// Switches also request their initialization delay.
    pub fn place(&mut self, kind: ComponentKind, pos: Coord) -> Result<InstanceId, EditError> {
        let id = self.store.insert(pos, kind)?;
        if kind == ComponentKind::Switch {
            self.outbox.push(DeferredEffect::InitializeSwitch { id });
        }
        debug!(%id, %kind, %pos, "placed");
        Ok(id)
    }

    /// Moves a component. State is reconciled by the next pass.
    pub fn move_to(&mut self, id: InstanceId, pos: Coord) -> Result<(), EditError> {
        self.store.relocate(id, pos)?;
        self.engine.forget(id);
        debug!(%id, %pos, "moved");
        Ok(())
    }

    /// Deletes a component. Returns whether anything was removed.
    pub fn delete(&mut self, id: InstanceId) -> bool {
        let removed = self.store.remove(id);
        self.engine.forget(id);
        if let Some(instance) = &removed {
            debug!(%id, kind = %instance.kind(), pos = %instance.position(), "deleted");
        }
        removed.is_some()
    }

    /// Flips a button. Returns its new activation.
    pub fn toggle(&mut self, id: InstanceId) -> Result<bool, EditError> {
        let instance = self.store.get(id).ok_or(EditError::UnknownId(id))?;
        let kind = instance.kind();
        if !kind.is_toggleable() {
            return Err(EditError::NotToggleable { id, kind });
        }

        let active = !instance.is_active();
        self.store.set_active(id, active);
        debug!(%id, active, "toggled");
        Ok(active)
    }

    /// Places every cell of `layout` shifted by `origin`.
    ///
    /// All target cells are checked first; on conflict nothing is placed.
    pub fn import_layout(&mut self, layout: &Layout, origin: Coord) -> Result<Vec<InstanceId>, EditError> {
        let mut cells = Vec::with_capacity(layout.cells.len());
        let mut seen = HashSet::new();

        for cell in &layout.cells {
            // a cell pushed off the i64 plane is reported at the origin
            let pos = origin
                .offset(cell.dx, cell.dy)
                .ok_or(EditError::OccupiedCell(origin))?;
            if self.store.at(pos).is_some() || !seen.insert(pos) {
                return Err(EditError::OccupiedCell(pos));
            }
            cells.push((cell.kind, pos));
        }

        let mut ids = Vec::with_capacity(cells.len());
        for (kind, pos) in cells {
            ids.push(self.place(kind, pos)?);
        }
        debug!(layout = %layout.name, %origin, count = ids.len(), "imported layout");
        Ok(ids)
    }

    /// Removes every component.
    pub fn reset(&mut self) {
        self.store.clear();
        self.engine.clear();
        self.outbox.clear();
    }

    /// Runs one propagation pass now.
    ///
    /// Requested effects wait in the outbox until [`take_requests`](Self::take_requests).
    /// A request already waiting there is not queued twice, so a repeater
    /// that stays on holds one pulse however many passes run undrained.
    pub fn tick(&mut self) -> TickReport {
        let (report, effects) = self.engine.tick(&mut self.store);
        for effect in effects {
            if !self.outbox.contains(&effect) {
                self.outbox.push(effect);
            }
        }
        report
    }

    /// Immediate corrective pass after an edit; same as [`tick`](Self::tick).
    pub fn reconcile(&mut self) -> TickReport {
        self.tick()
    }

    /// Applies a deferred effect whose deadline has passed.
    pub fn apply_effect(&mut self, effect: DeferredEffect) -> EffectOutcome {
        self.engine.apply_effect(&mut self.store, effect)
    }

    /// Drains the effects requested since the last call.
    pub fn take_requests(&mut self) -> Vec<DeferredEffect> {
        std::mem::take(&mut self.outbox)
    }

    /// Every live component, in no particular order.
    pub fn all_instances(&self) -> impl Iterator<Item = InstanceView> + '_ {
        self.store.iter().map(Instance::view)
    }

    /// Every live component, sorted by id.
    pub fn snapshot(&self) -> Vec<InstanceView> {
        let mut views: Vec<InstanceView> = self.all_instances().collect();
        views.sort_by_key(|v| v.id);
        views
    }

    pub fn instance(&self, id: InstanceId) -> Option<&Instance> {
        self.store.get(id)
    }

    pub fn occupant(&self, pos: Coord) -> Option<&Instance> {
        self.store.at(pos)
    }

    pub fn is_active(&self, id: InstanceId) -> Option<bool> {
        self.store.get(id).map(Instance::is_active)
    }

    pub fn store(&self) -> &GridStore {
        &self.store
    }

    pub fn engine(&self) -> &PropagationEngine {
        &self.engine
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}
