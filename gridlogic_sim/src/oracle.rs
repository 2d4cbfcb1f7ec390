//! Ground truth oracle for simulation.
//!
//! Recomputes cable reachability independently of the engine: no queue, just
//! repeated sweeps until the set stops growing. Seeds are rebuilt from the
//! store and from the pulses the caller saw land, never read back from the
//! engine. Used to check the engine's flood fill after every pass.

use gridlogic_core::{ComponentKind, Coord, Direction, GridStore, InstanceId};
use std::collections::{HashMap, HashSet};

/// Cables reachable from active sources and from `seeds`.
///
/// A source feeds the cable on each of its source sides; seeds are cables
/// that were driven directly before the pass.
pub fn expected_cables(store: &GridStore, seeds: &HashSet<Coord>) -> HashSet<Coord> {
    let cables = store.positions_of(ComponentKind::Cable);

    let mut reached: HashSet<Coord> = seeds.intersection(&cables).copied().collect();
    for source in store.iter().filter(|i| i.is_active()) {
        for dir in source.kind().source_directions() {
            if let Some(next) = source.position().step(*dir) {
                if cables.contains(&next) {
                    reached.insert(next);
                }
            }
        }
    }

    loop {
        let grown: Vec<Coord> = cables
            .iter()
            .filter(|cable| !reached.contains(*cable))
            .filter(|cable| {
                Direction::ALL
                    .iter()
                    .any(|dir| cable.step(*dir).is_some_and(|n| reached.contains(&n)))
            })
            .copied()
            .collect();

        if grown.is_empty() {
            return reached;
        }
        reached.extend(grown);
    }
}

/// Cells east of the comparators matching `on` that hold a cable.
fn comparator_fronts(store: &GridStore, on: impl Fn(bool, bool) -> bool) -> HashSet<Coord> {
    store
        .iter()
        .filter(|c| c.kind() == ComponentKind::Comparator && on(c.previous_active(), c.is_active()))
        .filter_map(|c| c.position().step(Direction::East))
        .filter(|front| store.at(*front).is_some_and(|t| t.kind() == ComponentKind::Cable))
        .collect()
}

/// Seeds of the pass that just ran.
///
/// Front cables of comparators that were on when the pass began, plus every
/// pulsed cell that still holds the cable the pulse landed on.
pub fn pass_seeds(store: &GridStore, pulsed: &HashMap<Coord, InstanceId>) -> HashSet<Coord> {
    let mut seeds = comparator_fronts(store, |before, _| before);
    seeds.extend(pulsed.iter().filter_map(|(pos, hit)| {
        let still_there = store
            .at(*pos)
            .is_some_and(|c| c.id() == *hit && c.kind() == ComponentKind::Cable);
        still_there.then_some(*pos)
    }));
    seeds
}

/// Compares the store's active cables against [`expected_cables`].
///
/// Call right after a pass. `pulsed` maps each cell a repeater pulse landed
/// on since the previous pass to the id it hit. Cables driven by comparators
/// that came on during the pass may be on without being reachable yet.
pub fn check_cables(store: &GridStore, pulsed: &HashMap<Coord, InstanceId>) -> Result<(), String> {
    let expected = expected_cables(store, &pass_seeds(store, pulsed));
    let forced = comparator_fronts(store, |_, now| now);
    let actual: HashSet<Coord> = store
        .iter()
        .filter(|i| i.kind() == ComponentKind::Cable && i.is_active())
        .map(|i| i.position())
        .collect();

    if let Some(missing) = expected.difference(&actual).min() {
        return Err(format!("cable at {} is reachable but off", missing));
    }
    if let Some(extra) = actual.difference(&expected).filter(|c| !forced.contains(*c)).min() {
        return Err(format!("cable at {} is on but unreachable", extra));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridlogic_core::{Circuit, DeferredEffect, EffectOutcome};

    fn c(x: i64, y: i64) -> Coord {
        Coord::new(x, y)
    }

    #[test]
    fn test_button_reaches_connected_cables_only() {
        let mut store = GridStore::new();
        store.insert(c(0, 0), ComponentKind::Button).unwrap();
        store.insert(c(1, 0), ComponentKind::Cable).unwrap();
        store.insert(c(1, 1), ComponentKind::Cable).unwrap();
        store.insert(c(5, 5), ComponentKind::Cable).unwrap();

        let reached = expected_cables(&store, &HashSet::new());
        assert_eq!(reached, HashSet::from([c(1, 0), c(1, 1)]));
    }

    #[test]
    fn test_seed_floods_its_component() {
        let mut store = GridStore::new();
        store.insert(c(0, 0), ComponentKind::Cable).unwrap();
        store.insert(c(0, 1), ComponentKind::Cable).unwrap();
        store.insert(c(3, 3), ComponentKind::Cable).unwrap();

        let seeds = HashSet::from([c(0, 0), c(9, 9)]);
        let reached = expected_cables(&store, &seeds);
        assert_eq!(reached, HashSet::from([c(0, 0), c(0, 1)]));
    }

    #[test]
    fn test_inactive_switch_feeds_nothing() {
        let mut store = GridStore::new();
        store.insert(c(0, 0), ComponentKind::Switch).unwrap();
        store.insert(c(1, 0), ComponentKind::Cable).unwrap();

        assert!(expected_cables(&store, &HashSet::new()).is_empty());
    }

    #[test]
    fn test_check_reports_unpowered_cable() {
        let mut store = GridStore::new();
        store.insert(c(0, 0), ComponentKind::Button).unwrap();
        store.insert(c(1, 0), ComponentKind::Cable).unwrap();

        let err = check_cables(&store, &HashMap::new()).unwrap_err();
        assert!(err.contains("(1, 0)"), "{err}");
    }

    #[test]
    fn test_pulsed_seed_needs_the_same_cable() {
        let mut store = GridStore::new();
        let hit = store.insert(c(0, 0), ComponentKind::Cable).unwrap();
        store.remove(hit);
        store.insert(c(0, 0), ComponentKind::Cable).unwrap();

        let pulsed = HashMap::from([(c(0, 0), hit)]);
        assert!(pass_seeds(&store, &pulsed).is_empty());
    }

    #[test]
    fn test_comparator_output_agrees_with_engine() {
        let mut circuit = Circuit::new();
        circuit.place(ComponentKind::Button, c(0, 0)).unwrap();
        circuit.place(ComponentKind::Comparator, c(1, 0)).unwrap();
        circuit.place(ComponentKind::Cable, c(2, 0)).unwrap();
        circuit.place(ComponentKind::Cable, c(3, 0)).unwrap();

        for _ in 0..3 {
            circuit.tick();
            assert_eq!(check_cables(circuit.store(), &HashMap::new()), Ok(()));
        }
        assert_eq!(
            pass_seeds(circuit.store(), &HashMap::new()),
            HashSet::from([c(2, 0)])
        );
    }

    #[test]
    fn test_flags_cable_powered_by_replaced_pulse_target() {
        let mut circuit = Circuit::new();
        circuit.place(ComponentKind::Cable, c(0, 0)).unwrap();
        let hit = circuit.place(ComponentKind::Cable, c(1, 0)).unwrap();
        let outcome = circuit.apply_effect(DeferredEffect::RepeaterPulse {
            source: InstanceId(100),
            target: c(1, 0),
            expected: Some(hit),
        });
        assert_eq!(outcome, EffectOutcome::Applied);

        let pulsed = HashMap::from([(c(1, 0), hit)]);
        circuit.tick();
        assert_eq!(check_cables(circuit.store(), &pulsed), Ok(()));
        assert!(circuit.store().iter().all(|i| i.is_active()));

        // a store whose cables are on with no seed left is caught
        let err = check_cables(circuit.store(), &HashMap::new()).unwrap_err();
        assert!(err.contains("on but unreachable"), "{err}");
    }
}
