//! gridlogic Metrics Module
//! ========================
//!
//! Per-pass [`TickReport`]s and the running [`SimMetrics`] totals the
//! scheduler keeps. Nothing here feeds back into the simulation.

use crate::gridlogic_kinds::ComponentKind;
use crate::gridlogic_space::GridStore;
use crate::gridlogic_time::EffectOutcome;
use serde::Serialize;
use std::collections::BTreeMap;

/// Summary of one propagation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    /// Pass number (1-based, counts corrective passes too)
    pub tick: u64,

    /// Instances whose activation differs from the start of the pass
    pub changed: usize,

    /// Deferred effects the pass asked for
    pub effects_scheduled: usize,

    /// Active instances per kind after the pass
    pub active: BTreeMap<ComponentKind, usize>,
}

impl TickReport {
    /// Builds the report from the store right after a pass.
    pub fn collect(tick: u64, store: &GridStore, effects_scheduled: usize) -> Self {
        let mut active = BTreeMap::new();
        let mut changed = 0;

        for instance in store.iter() {
            if instance.is_active() {
                *active.entry(instance.kind()).or_insert(0) += 1;
            }
            if instance.is_active() != instance.previous_active() {
                changed += 1;
            }
        }

        Self {
            tick,
            changed,
            effects_scheduled,
            active,
        }
    }

    pub fn active_of(&self, kind: ComponentKind) -> usize {
        self.active.get(&kind).copied().unwrap_or(0)
    }

    /// True when the pass changed nothing and scheduled nothing.
    pub fn is_quiescent(&self) -> bool {
        self.changed == 0 && self.effects_scheduled == 0
    }
}

/// Running totals across a scheduler's lifetime.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SimMetrics {
    pub ticks: u64,
    pub changes: u64,
    pub effects_scheduled: u64,
    pub effects_applied: u64,
    pub effects_dropped: u64,
}

impl SimMetrics {
    pub fn record_tick(&mut self, report: &TickReport) {
        self.ticks += 1;
        self.changes += report.changed as u64;
        self.effects_scheduled += report.effects_scheduled as u64;
    }

    pub fn record_effect(&mut self, outcome: EffectOutcome) {
        match outcome {
            EffectOutcome::Applied => self.effects_applied += 1,
            EffectOutcome::Stale | EffectOutcome::Ignored => self.effects_dropped += 1,
        }
    }
}

impl std::fmt::Display for SimMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ticks={} changes={} effects scheduled={} applied={} dropped={}",
            self.ticks,
            self.changes,
            self.effects_scheduled,
            self.effects_applied,
            self.effects_dropped
        )
    }
}
