use crate::core::cache::eligibility::CacheEligibilityChecker;
use crate::core::components::primitives::PrimitiveKind;
use crate::core::types::{ChipId, InstanceId, PinRef};
use serde::{Deserialize, Serialize};

/// Named pin with a fixed bit width
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PinSpec {
    pub name: String,
    pub bit_width: u8,
}

impl PinSpec {
    pub fn new(name: &str, bit_width: u8) -> Self {
        Self {
            name: name.to_string(),
            bit_width,
        }
    }
}

/// Whether a chip is built from sub-chips or evaluated natively
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChipKind {
    Composite,
    Primitive(PrimitiveKind),
}

/// Placement of a child chip inside a composite definition
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubChipSpec {
    pub instance_id: InstanceId,
    pub chip: ChipId,
    /// Initial state slots (constant value, bound key, ...)
    #[serde(default)]
    pub internal_data: Vec<u64>,
}

/// Connection from a driving pin to a driven pin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Wire {
    pub source: PinRef,
    pub dest: PinRef,
}

/// Description of a chip as supplied by the definition loader
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChipDefinition {
    pub id: ChipId,
    pub kind: ChipKind,
    pub input_pins: Vec<PinSpec>,
    pub output_pins: Vec<PinSpec>,
    #[serde(default)]
    pub sub_chips: Vec<SubChipSpec>,
    #[serde(default)]
    pub wires: Vec<Wire>,
    #[serde(default)]
    pub can_be_cached: bool,
    #[serde(default)]
    pub should_be_cached: bool,
}

impl ChipDefinition {
    /// Start building a composite definition
    pub fn composite(name: &str, version: u32) -> ChipDefinitionBuilder {
        ChipDefinitionBuilder::new(ChipId::new(name, version), ChipKind::Composite)
    }

    /// Standard-shaped primitive definition (see [`PrimitiveKind::standard_pins`])
    pub fn primitive(name: &str, kind: PrimitiveKind, width: u8) -> ChipDefinition {
        let (inputs, outputs) = kind.standard_pins(width);
        let mut builder =
            ChipDefinitionBuilder::new(ChipId::new(name, 1), ChipKind::Primitive(kind));
        builder.input_pins = inputs;
        builder.output_pins = outputs;
        builder.build()
    }

    /// Start building a primitive definition with custom pins (buses)
    pub fn primitive_builder(name: &str, kind: PrimitiveKind) -> ChipDefinitionBuilder {
        ChipDefinitionBuilder::new(ChipId::new(name, 1), ChipKind::Primitive(kind))
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self.kind, ChipKind::Primitive(_))
    }

    /// Sub-chip placement with the given instance id
    pub fn sub_chip(&self, instance_id: InstanceId) -> Option<&SubChipSpec> {
        self.sub_chips.iter().find(|s| s.instance_id == instance_id)
    }
}

/// Builder for chip definitions
///
/// `build` derives `can_be_cached` from the pin widths, so a freshly
/// authored definition never carries an inconsistent caching flag.
pub struct ChipDefinitionBuilder {
    id: ChipId,
    kind: ChipKind,
    input_pins: Vec<PinSpec>,
    output_pins: Vec<PinSpec>,
    sub_chips: Vec<SubChipSpec>,
    wires: Vec<Wire>,
    should_be_cached: bool,
}

impl ChipDefinitionBuilder {
    pub fn new(id: ChipId, kind: ChipKind) -> Self {
        Self {
            id,
            kind,
            input_pins: Vec::new(),
            output_pins: Vec::new(),
            sub_chips: Vec::new(),
            wires: Vec::new(),
            should_be_cached: false,
        }
    }

    pub fn input(mut self, name: &str, bit_width: u8) -> Self {
        self.input_pins.push(PinSpec::new(name, bit_width));
        self
    }

    pub fn output(mut self, name: &str, bit_width: u8) -> Self {
        self.output_pins.push(PinSpec::new(name, bit_width));
        self
    }

    /// Place a child chip with default state
    pub fn sub_chip(self, instance_id: InstanceId, chip: &ChipId) -> Self {
        self.sub_chip_with_data(instance_id, chip, Vec::new())
    }

    /// Place a child chip with initial state slots
    pub fn sub_chip_with_data(
        mut self,
        instance_id: InstanceId,
        chip: &ChipId,
        internal_data: Vec<u64>,
    ) -> Self {
        self.sub_chips.push(SubChipSpec {
            instance_id,
            chip: chip.clone(),
            internal_data,
        });
        self
    }

    pub fn wire(mut self, source: PinRef, dest: PinRef) -> Self {
        self.wires.push(Wire { source, dest });
        self
    }

    /// Record the user's caching preference
    pub fn cached(mut self, should_be_cached: bool) -> Self {
        self.should_be_cached = should_be_cached;
        self
    }

    pub fn build(self) -> ChipDefinition {
        let mut definition = ChipDefinition {
            id: self.id,
            kind: self.kind,
            input_pins: self.input_pins,
            output_pins: self.output_pins,
            sub_chips: self.sub_chips,
            wires: self.wires,
            can_be_cached: false,
            should_be_cached: self.should_be_cached,
        };
        definition.can_be_cached = CacheEligibilityChecker::evaluate(&definition).can_cache;
        CacheEligibilityChecker::correct(&mut definition);
        definition
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_sets_can_be_cached_from_widths() {
        let small = ChipDefinition::composite("SMALL", 1)
            .input("a", 4)
            .output("y", 4)
            .cached(true)
            .build();
        assert!(small.can_be_cached);
        assert!(small.should_be_cached);

        let wide = ChipDefinition::composite("WIDE", 1)
            .input("a", 32)
            .output("y", 1)
            .cached(true)
            .build();
        assert!(!wide.can_be_cached);
        assert!(!wide.should_be_cached, "preference cannot outlive eligibility");
    }

    #[test]
    fn test_primitive_definition_shape() {
        let and = ChipDefinition::primitive("AND", PrimitiveKind::And, 1);
        assert!(and.is_primitive());
        assert_eq!(and.input_pins.len(), 2);
        assert_eq!(and.output_pins.len(), 1);
        assert_eq!(and.id, ChipId::new("AND", 1));
    }

    #[test]
    fn test_persisted_definition_defaults_optional_fields() {
        let json = r#"{
            "id": { "name": "NOT", "version": 1 },
            "kind": { "Primitive": "Not" },
            "input_pins": [{ "name": "in", "bit_width": 1 }],
            "output_pins": [{ "name": "out", "bit_width": 1 }]
        }"#;
        let def: ChipDefinition = serde_json::from_str(json).unwrap();
        assert_eq!(def.kind, ChipKind::Primitive(PrimitiveKind::Not));
        assert!(def.sub_chips.is_empty());
        assert!(def.wires.is_empty());
        assert!(!def.can_be_cached);
        assert!(!def.should_be_cached);
    }
}
