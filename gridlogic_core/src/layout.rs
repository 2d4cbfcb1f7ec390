//! Canned layouts (preset logic gates) imported by repeated placement.

use crate::gridlogic_kinds::ComponentKind;
use crate::gridlogic_space::Coord;

/// One component of a layout, relative to the import origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutCell {
    pub kind: ComponentKind,
    pub dx: i64,
    pub dy: i64,
}

/// A named list of relative placements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub name: String,
    pub cells: Vec<LayoutCell>,
}

impl Layout {
    pub fn new(name: impl Into<String>, cells: &[(ComponentKind, i64, i64)]) -> Self {
        Self {
            name: name.into(),
            cells: cells
                .iter()
                .map(|&(kind, dx, dy)| LayoutCell { kind, dx, dy })
                .collect(),
        }
    }
}

/// Built-in gate presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayoutId {
    AndGate,
    OrGate,
    NandGate,
    NorGate,
    NotGate,
}

use ComponentKind::{Button, Cable, Led, Switch};

impl LayoutId {
    pub fn all() -> Vec<LayoutId> {
        vec![
            LayoutId::AndGate,
            LayoutId::OrGate,
            LayoutId::NandGate,
            LayoutId::NorGate,
            LayoutId::NotGate,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            LayoutId::AndGate => "and_gate",
            LayoutId::OrGate => "or_gate",
            LayoutId::NandGate => "nand_gate",
            LayoutId::NorGate => "nor_gate",
            LayoutId::NotGate => "not_gate",
        }
    }

    pub fn layout(&self) -> Layout {
        let cells: &[(ComponentKind, i64, i64)] = match self {
            // two inverted inputs share a cable; a third switch inverts the cable
            LayoutId::AndGate => &[
                (Button, 0, 0),
                (Switch, 1, 0),
                (Button, 0, 2),
                (Switch, 1, 2),
                (Cable, 1, 1),
                (Switch, 2, 1),
                (Led, 3, 1),
            ],
            LayoutId::OrGate => &[
                (Button, 0, 0),
                (Button, 0, 1),
                (Cable, 1, 0),
                (Cable, 1, 1),
                (Led, 2, 0),
            ],
            LayoutId::NandGate => &[
                (Button, 0, 0),
                (Switch, 1, 0),
                (Button, 0, 2),
                (Switch, 1, 2),
                (Cable, 1, 1),
                (Led, 2, 1),
            ],
            LayoutId::NorGate => &[
                (Button, 0, 0),
                (Cable, 1, 0),
                (Button, 0, 1),
                (Cable, 1, 1),
                (Switch, 2, 0),
                (Led, 3, 0),
            ],
            LayoutId::NotGate => &[(Button, 0, 0), (Switch, 1, 0), (Led, 2, 0)],
        };
        Layout::new(self.name(), cells)
    }

    /// Input buttons, relative to the origin.
    pub fn input_offsets(&self) -> Vec<(i64, i64)> {
        match self {
            LayoutId::AndGate | LayoutId::NandGate => vec![(0, 0), (0, 2)],
            LayoutId::OrGate | LayoutId::NorGate => vec![(0, 0), (0, 1)],
            LayoutId::NotGate => vec![(0, 0)],
        }
    }

    /// Output LED, relative to the origin.
    pub fn output_offset(&self) -> (i64, i64) {
        match self {
            LayoutId::AndGate => (3, 1),
            LayoutId::OrGate => (2, 0),
            LayoutId::NandGate => (2, 1),
            LayoutId::NorGate => (3, 0),
            LayoutId::NotGate => (2, 0),
        }
    }

    /// Input cells for a layout imported at the origin.
    pub fn inputs(&self) -> Vec<Coord> {
        self.input_offsets().into_iter().map(Coord::from).collect()
    }

    /// Output cell for a layout imported at the origin.
    pub fn output(&self) -> Coord {
        Coord::from(self.output_offset())
    }

    /// Expected LED state for the given button states.
    pub fn expected(&self, inputs: &[bool]) -> bool {
        match self {
            LayoutId::AndGate => inputs.iter().all(|b| *b),
            LayoutId::OrGate => inputs.iter().any(|b| *b),
            LayoutId::NandGate => !inputs.iter().all(|b| *b),
            LayoutId::NorGate => !inputs.iter().any(|b| *b),
            LayoutId::NotGate => !inputs.first().copied().unwrap_or(false),
        }
    }
}

impl std::fmt::Display for LayoutId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for LayoutId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "and_gate" | "and" => Ok(LayoutId::AndGate),
            "or_gate" | "or" => Ok(LayoutId::OrGate),
            "nand_gate" | "nand" => Ok(LayoutId::NandGate),
            "nor_gate" | "nor" => Ok(LayoutId::NorGate),
            "not_gate" | "not" => Ok(LayoutId::NotGate),
            _ => Err(format!("Unknown layout: {}", s)),
        }
    }
}
