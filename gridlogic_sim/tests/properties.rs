//! Property tests: flood fill against the oracle, and store bookkeeping under
//! arbitrary edit sequences.

use gridlogic_core::{audit, Circuit, ComponentKind, Coord, DeferredEffect, EditError, EffectOutcome, InstanceId};
use gridlogic_sim::oracle::{check_cables, expected_cables};
use proptest::prelude::*;
use std::collections::{HashMap, HashSet};

const KINDS: [ComponentKind; 6] = ComponentKind::ALL;

#[derive(Debug, Clone)]
enum Edit {
    Place(usize, i64, i64),
    Move(usize, i64, i64),
    Delete(usize),
    Toggle(usize),
}

fn edit_strategy() -> impl Strategy<Value = Edit> {
    prop_oneof![
        3 => (0..ComponentKind::ALL.len(), 0i64..6, 0i64..6).prop_map(|(k, x, y)| Edit::Place(k, x, y)),
        1 => (0usize..64, 0i64..6, 0i64..6).prop_map(|(i, x, y)| Edit::Move(i, x, y)),
        1 => (0usize..64).prop_map(Edit::Delete),
        1 => (0usize..64).prop_map(Edit::Toggle),
    ]
}

/// Fires every pending request now, returning the cables a pulse landed on.
fn fire_requests(circuit: &mut Circuit) -> HashMap<Coord, InstanceId> {
    let mut pulsed = HashMap::new();
    for effect in circuit.take_requests() {
        let outcome = circuit.apply_effect(effect);
        if let (DeferredEffect::RepeaterPulse { target, .. }, EffectOutcome::Applied) = (effect, outcome) {
            if let Some(hit) = circuit.store().id_at(target) {
                pulsed.insert(target, hit);
            }
        }
    }
    pulsed
}

/// Places the given cells, initializes every switch and flips the chosen buttons.
fn build(cells: &[(usize, i64, i64)], off: &[bool]) -> Circuit {
    let mut circuit = Circuit::new();
    for (i, &(kind, x, y)) in cells.iter().enumerate() {
        if let Ok(id) = circuit.place(KINDS[kind], Coord::new(x, y)) {
            if KINDS[kind] == ComponentKind::Button && off.get(i).copied().unwrap_or(false) {
                circuit.toggle(id).unwrap();
            }
        }
    }
    for effect in circuit.take_requests() {
        circuit.apply_effect(effect);
    }
    circuit
}

proptest! {
    #[test]
    fn prop_flood_fill_matches_oracle(
        cells in prop::collection::vec((0usize..KINDS.len(), -4i64..4, -4i64..4), 0..40),
        off in prop::collection::vec(any::<bool>(), 40),
        edits in prop::collection::vec((0usize..64, -4i64..4, -4i64..4), 6),
    ) {
        let mut circuit = build(&cells, &off);
        let mut pulsed = HashMap::new();

        for (victim, x, y) in edits {
            // between passes: drop one instance, drop a cable somewhere
            let live = circuit.snapshot();
            if !live.is_empty() {
                circuit.delete(live[victim % live.len()].id);
            }
            let _ = circuit.place(ComponentKind::Cable, Coord::new(x, y));

            circuit.tick();
            let checked = check_cables(circuit.store(), &pulsed);
            prop_assert!(checked.is_ok(), "{:?}", checked);

            pulsed = fire_requests(&mut circuit);
        }
    }

    #[test]
    fn prop_button_cable_grid_is_stable(
        cells in prop::collection::vec((0usize..2, -4i64..4, -4i64..4), 0..40),
        off in prop::collection::vec(any::<bool>(), 40),
    ) {
        let mut circuit = build(&cells, &off);

        circuit.tick();
        let first: HashSet<Coord> = circuit
            .all_instances()
            .filter(|v| v.active)
            .map(|v| v.position)
            .collect();

        let report = circuit.tick();
        let second: HashSet<Coord> = circuit
            .all_instances()
            .filter(|v| v.active)
            .map(|v| v.position)
            .collect();

        prop_assert_eq!(report.changed, 0);
        prop_assert_eq!(first, second);

        let reached = expected_cables(circuit.store(), &HashSet::new());
        prop_assert_eq!(report.active_of(ComponentKind::Cable), reached.len());
    }

    #[test]
    fn prop_edits_keep_store_consistent(edits in prop::collection::vec(edit_strategy(), 0..80)) {
        let mut circuit = Circuit::new();
        let mut issued: Vec<InstanceId> = Vec::new();

        for edit in edits {
            match edit {
                Edit::Place(k, x, y) => {
                    let pos = Coord::new(x, y);
                    let occupied = circuit.occupant(pos).is_some();
                    match circuit.place(ComponentKind::ALL[k], pos) {
                        Ok(id) => {
                            prop_assert!(!occupied);
                            prop_assert!(!issued.contains(&id), "id {} reused", id);
                            issued.push(id);
                        }
                        Err(e) => prop_assert_eq!(e, EditError::OccupiedCell(pos)),
                    }
                }
                Edit::Move(i, x, y) => {
                    if let Some(id) = issued.get(i).copied() {
                        let pos = Coord::new(x, y);
                        if circuit.move_to(id, pos).is_ok() {
                            prop_assert_eq!(circuit.occupant(pos).map(|i| i.id()), Some(id));
                        }
                    }
                }
                Edit::Delete(i) => {
                    if let Some(id) = issued.get(i).copied() {
                        circuit.delete(id);
                        prop_assert!(circuit.instance(id).is_none());
                    }
                }
                Edit::Toggle(i) => {
                    if let Some(id) = issued.get(i).copied() {
                        let _ = circuit.toggle(id);
                    }
                }
            }

            circuit.tick();
            let report = audit(circuit.store());
            prop_assert!(report.is_consistent(), "{}", report);
        }
    }
}
