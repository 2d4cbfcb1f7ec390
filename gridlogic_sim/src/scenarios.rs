//! Deterministic circuit scenarios.

use gridlogic_core::LayoutId;
use serde::Serialize;

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioId {
    /// Preset AND gate over all input combinations
    AndGate,

    /// Preset OR gate over all input combinations
    OrGate,

    /// Preset NAND gate over all input combinations
    NandGate,

    /// Preset NOR gate over all input combinations
    NorGate,

    /// Preset NOT gate over both input states
    NotGate,

    /// Button feeding a cable line, toggled off again
    CableChain,

    /// Comparator inhibition table and front-cable drive
    Comparator,

    /// Repeater output arrives one delay after the pass
    RepeaterDelay,

    /// Target removed or replaced while a pulse is pending
    DeleteUnderDelay,

    /// Seeded random edits with audit and reachability checks every pass
    EditChurn,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::AndGate,
            ScenarioId::OrGate,
            ScenarioId::NandGate,
            ScenarioId::NorGate,
            ScenarioId::NotGate,
            ScenarioId::CableChain,
            ScenarioId::Comparator,
            ScenarioId::RepeaterDelay,
            ScenarioId::DeleteUnderDelay,
            ScenarioId::EditChurn,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::AndGate => "and_gate",
            ScenarioId::OrGate => "or_gate",
            ScenarioId::NandGate => "nand_gate",
            ScenarioId::NorGate => "nor_gate",
            ScenarioId::NotGate => "not_gate",
            ScenarioId::CableChain => "cable_chain",
            ScenarioId::Comparator => "comparator",
            ScenarioId::RepeaterDelay => "repeater_delay",
            ScenarioId::DeleteUnderDelay => "delete_under_delay",
            ScenarioId::EditChurn => "edit_churn",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::AndGate => "AND preset: LED lit only with both buttons on",
            ScenarioId::OrGate => "OR preset: LED lit with either button on",
            ScenarioId::NandGate => "NAND preset: LED dark only with both buttons on",
            ScenarioId::NorGate => "NOR preset: LED lit only with both buttons off",
            ScenarioId::NotGate => "NOT preset: LED follows the inverted button",
            ScenarioId::CableChain => "Button powers two cables, toggling it clears them",
            ScenarioId::Comparator => "Back input passes unless a side input is on",
            ScenarioId::RepeaterDelay => "Front cable powers up exactly one repeater delay after the pass",
            ScenarioId::DeleteUnderDelay => "Pending pulse into a deleted or replaced cell is dropped",
            ScenarioId::EditChurn => "Random place/move/delete/toggle, store and reachability checked each pass",
        }
    }

    /// The preset a gate scenario drives, if any.
    pub fn layout(&self) -> Option<LayoutId> {
        match self {
            ScenarioId::AndGate => Some(LayoutId::AndGate),
            ScenarioId::OrGate => Some(LayoutId::OrGate),
            ScenarioId::NandGate => Some(LayoutId::NandGate),
            ScenarioId::NorGate => Some(LayoutId::NorGate),
            ScenarioId::NotGate => Some(LayoutId::NotGate),
            _ => None,
        }
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "and_gate" | "and" => Ok(ScenarioId::AndGate),
            "or_gate" | "or" => Ok(ScenarioId::OrGate),
            "nand_gate" | "nand" => Ok(ScenarioId::NandGate),
            "nor_gate" | "nor" => Ok(ScenarioId::NorGate),
            "not_gate" | "not" => Ok(ScenarioId::NotGate),
            "cable_chain" | "cablechain" => Ok(ScenarioId::CableChain),
            "comparator" => Ok(ScenarioId::Comparator),
            "repeater_delay" | "repeaterdelay" => Ok(ScenarioId::RepeaterDelay),
            "delete_under_delay" | "deleteunderdelay" => Ok(ScenarioId::DeleteUnderDelay),
            "edit_churn" | "editchurn" | "churn" => Ok(ScenarioId::EditChurn),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}
