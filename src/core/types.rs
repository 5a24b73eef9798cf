use serde::{Deserialize, Serialize};

/// Identifier of a sub-chip instance, unique within its parent definition
pub type InstanceId = u32;

/// Chip definition identity: name plus version
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChipId {
    pub(crate) name: String,
    pub(crate) version: u32,
}

impl ChipId {
    /// Create a new chip ID
    pub fn new(name: impl Into<String>, version: u32) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }

    /// Get the chip name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the definition version
    pub fn version(&self) -> u32 {
        self.version
    }
}

impl std::fmt::Display for ChipId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

/// Handle for one end of a wire
///
/// Pins are addressed by their index in the owning definition's ordered pin list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PinRef {
    /// Input pin of the chip being defined
    ChipInput(usize),
    /// Output pin of the chip being defined
    ChipOutput(usize),
    /// Input pin of a sub-chip instance
    SubChipInput { instance: InstanceId, pin: usize },
    /// Output pin of a sub-chip instance
    SubChipOutput { instance: InstanceId, pin: usize },
}

impl PinRef {
    /// Create an input pin handle on a sub-chip instance
    pub fn sub_input(instance: InstanceId, pin: usize) -> Self {
        PinRef::SubChipInput { instance, pin }
    }

    /// Create an output pin handle on a sub-chip instance
    pub fn sub_output(instance: InstanceId, pin: usize) -> Self {
        PinRef::SubChipOutput { instance, pin }
    }

    /// Whether this pin can drive a wire
    pub fn is_source(&self) -> bool {
        matches!(self, PinRef::ChipInput(_) | PinRef::SubChipOutput { .. })
    }

    /// Whether this pin can be driven by a wire
    pub fn is_dest(&self) -> bool {
        matches!(self, PinRef::ChipOutput(_) | PinRef::SubChipInput { .. })
    }

    /// The sub-chip instance this pin belongs to, if any
    pub fn instance(&self) -> Option<InstanceId> {
        match self {
            PinRef::SubChipInput { instance, .. } | PinRef::SubChipOutput { instance, .. } => {
                Some(*instance)
            }
            _ => None,
        }
    }
}

impl std::fmt::Display for PinRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PinRef::ChipInput(pin) => write!(f, "in[{}]", pin),
            PinRef::ChipOutput(pin) => write!(f, "out[{}]", pin),
            PinRef::SubChipInput { instance, pin } => write!(f, "#{}.in[{}]", instance, pin),
            PinRef::SubChipOutput { instance, pin } => write!(f, "#{}.out[{}]", instance, pin),
        }
    }
}
