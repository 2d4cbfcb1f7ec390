//! Component registry: the closed set of component kinds and their static rules.

use crate::gridlogic_space::{Coord, Direction, InstanceId};
use serde::{Deserialize, Serialize};

/// Kinds of component that can be placed on the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    /// Manual source, toggled by the user
    Button,

    /// Wire; carries signal by flood fill
    Cable,

    /// Inverter: on unless its west input is on
    Switch,

    /// Sensor; lights when any neighbor is on
    Led,

    /// Passes its back input unless a side input inhibits it
    Comparator,

    /// Forwards its back input to the front cell after a delay
    Repeater,
}

/// Off/on colors handed to the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Palette {
    pub off: &'static str,
    pub on: &'static str,
}

impl Palette {
    pub fn pick(&self, active: bool) -> &'static str {
        if active {
            self.on
        } else {
            self.off
        }
    }
}

const ALL_DIRECTIONS: [Direction; 4] = Direction::ALL;
const SWITCH_DIRECTIONS: [Direction; 3] = [Direction::East, Direction::North, Direction::South];

impl ComponentKind {
    pub const ALL: [ComponentKind; 6] = [
        ComponentKind::Button,
        ComponentKind::Cable,
        ComponentKind::Switch,
        ComponentKind::Led,
        ComponentKind::Comparator,
        ComponentKind::Repeater,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ComponentKind::Button => "button",
            ComponentKind::Cable => "cable",
            ComponentKind::Switch => "switch",
            ComponentKind::Led => "led",
            ComponentKind::Comparator => "comparator",
            ComponentKind::Repeater => "repeater",
        }
    }

    /// Activation right after placement. Buttons start pressed.
    pub fn default_active(&self) -> bool {
        matches!(self, ComponentKind::Button)
    }

    pub fn palette(&self) -> Palette {
        match self {
            ComponentKind::Button => Palette { off: "brown", on: "red" },
            ComponentKind::Cable => Palette { off: "forestgreen", on: "lime" },
            ComponentKind::Switch => Palette { off: "moccasin", on: "orange" },
            ComponentKind::Led => Palette { off: "olive", on: "yellow" },
            ComponentKind::Comparator => Palette { off: "purple", on: "violet" },
            ComponentKind::Repeater => Palette { off: "darkblue", on: "blue" },
        }
    }

    /// Directions an active instance of this kind feeds cables in.
    ///
    /// Empty for kinds that are not flood-fill sources. A switch never
    /// feeds back into its own west input.
    pub fn source_directions(&self) -> &'static [Direction] {
        match self {
            ComponentKind::Button => &ALL_DIRECTIONS,
            ComponentKind::Switch => &SWITCH_DIRECTIONS,
            _ => &[],
        }
    }

    pub fn is_toggleable(&self) -> bool {
        matches!(self, ComponentKind::Button)
    }
}

impl std::fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ComponentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "button" => Ok(ComponentKind::Button),
            "cable" | "wire" => Ok(ComponentKind::Cable),
            "switch" => Ok(ComponentKind::Switch),
            "led" | "lamp" => Ok(ComponentKind::Led),
            "comparator" => Ok(ComponentKind::Comparator),
            "repeater" => Ok(ComponentKind::Repeater),
            _ => Err(format!("Unknown component kind: {}", s)),
        }
    }
}

/// Kind-specific state of an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Part {
    Button,
    Cable,
    /// `initialized` flips once the settle delay after placement has elapsed
    Switch { initialized: bool },
    Led,
    Comparator,
    Repeater,
}

impl Part {
    /// State of a freshly placed instance.
    pub fn fresh(kind: ComponentKind) -> Self {
        match kind {
            ComponentKind::Button => Part::Button,
            ComponentKind::Cable => Part::Cable,
            ComponentKind::Switch => Part::Switch { initialized: false },
            ComponentKind::Led => Part::Led,
            ComponentKind::Comparator => Part::Comparator,
            ComponentKind::Repeater => Part::Repeater,
        }
    }

    pub fn kind(&self) -> ComponentKind {
        match self {
            Part::Button => ComponentKind::Button,
            Part::Cable => ComponentKind::Cable,
            Part::Switch { .. } => ComponentKind::Switch,
            Part::Led => ComponentKind::Led,
            Part::Comparator => ComponentKind::Comparator,
            Part::Repeater => ComponentKind::Repeater,
        }
    }
}

/// A placed component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instance {
    pub(crate) id: InstanceId,
    pub(crate) position: Coord,
    pub(crate) active: bool,
    pub(crate) previous_active: bool,
    pub(crate) part: Part,
}

impl Instance {
    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn kind(&self) -> ComponentKind {
        self.part.kind()
    }

    pub fn part(&self) -> Part {
        self.part
    }

    pub fn position(&self) -> Coord {
        self.position
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Activation at the start of the last engine pass.
    pub fn previous_active(&self) -> bool {
        self.previous_active
    }

    /// Always true for kinds without a warm-up.
    pub fn is_initialized(&self) -> bool {
        match self.part {
            Part::Switch { initialized } => initialized,
            _ => true,
        }
    }

    /// Color the renderer should draw this instance with.
    pub fn color(&self) -> &'static str {
        self.kind().palette().pick(self.active)
    }

    pub fn view(&self) -> InstanceView {
        InstanceView {
            id: self.id,
            kind: self.kind(),
            position: self.position,
            active: self.active,
            color: self.color(),
        }
    }
}

/// Read-only snapshot of an instance for rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InstanceView {
    pub id: InstanceId,
    pub kind: ComponentKind,
    pub position: Coord,
    pub active: bool,
    pub color: &'static str,
}
