use crate::core::components::definition::{ChipDefinition, ChipKind, PinSpec, Wire};
use crate::core::errors::SimError;
use crate::core::types::{InstanceId, PinRef};
use crate::core::values::MAX_PIN_WIDTH;
use std::collections::{HashMap, HashSet};

/// Structural checks run on every definition before it is compiled
pub struct ConnectionValidator;

impl ConnectionValidator {
    /// Validate a definition against the definitions of its sub-chips.
    ///
    /// `children` maps each instance id to the definition it instantiates.
    pub fn validate(
        definition: &ChipDefinition,
        children: &HashMap<InstanceId, &ChipDefinition>,
    ) -> Result<(), SimError> {
        Self::validate_definition(definition, children)
            .map_err(|message| SimError::structural(&definition.id, message))
    }

    fn validate_definition(
        definition: &ChipDefinition,
        children: &HashMap<InstanceId, &ChipDefinition>,
    ) -> Result<(), String> {
        Self::validate_pin_widths(&definition.input_pins)?;
        Self::validate_pin_widths(&definition.output_pins)?;

        match definition.kind {
            ChipKind::Primitive(kind) => {
                if !definition.sub_chips.is_empty() || !definition.wires.is_empty() {
                    return Err("Primitive chips cannot contain sub-chips or wires".to_string());
                }
                kind.check_shape(&definition.input_pins, &definition.output_pins)
            }
            ChipKind::Composite => {
                Self::validate_instance_ids(definition)?;
                let mut drivers: HashMap<PinRef, PinRef> = HashMap::new();
                for wire in &definition.wires {
                    Self::validate_wire(definition, children, wire)?;
                    Self::check_dest_collision(&drivers, wire)?;
                    drivers.insert(wire.dest, wire.source);
                }
                Ok(())
            }
        }
    }

    /// Every pin must be between 1 and 64 bits wide
    pub fn validate_pin_widths(pins: &[PinSpec]) -> Result<(), String> {
        for pin in pins {
            if pin.bit_width == 0 || pin.bit_width > MAX_PIN_WIDTH {
                return Err(format!(
                    "Pin '{}' has width {}; widths must be between 1 and {}",
                    pin.name, pin.bit_width, MAX_PIN_WIDTH
                ));
            }
        }
        Ok(())
    }

    /// Instance ids must be unique within a definition
    pub fn validate_instance_ids(definition: &ChipDefinition) -> Result<(), String> {
        let mut seen = HashSet::new();
        for sub_chip in &definition.sub_chips {
            if !seen.insert(sub_chip.instance_id) {
                return Err(format!("Duplicate sub-chip instance #{}", sub_chip.instance_id));
            }
        }
        Ok(())
    }

    /// Check that both ends of a wire exist, point the right way and agree on width
    pub fn validate_wire(
        definition: &ChipDefinition,
        children: &HashMap<InstanceId, &ChipDefinition>,
        wire: &Wire,
    ) -> Result<(), String> {
        if !wire.source.is_source() {
            return Err(format!("Wire source {} cannot drive a signal", wire.source));
        }
        if !wire.dest.is_dest() {
            return Err(format!("Wire destination {} cannot be driven", wire.dest));
        }

        let source_width = Self::pin_width(definition, children, wire.source)?;
        let dest_width = Self::pin_width(definition, children, wire.dest)?;
        if source_width != dest_width {
            return Err(format!(
                "Width mismatch on wire {} -> {}: {} bits vs {} bits",
                wire.source, wire.dest, source_width, dest_width
            ));
        }
        Ok(())
    }

    /// Resolve a pin reference to its bit width
    pub fn pin_width(
        definition: &ChipDefinition,
        children: &HashMap<InstanceId, &ChipDefinition>,
        pin: PinRef,
    ) -> Result<u8, String> {
        let lookup = |pins: &[PinSpec], index: usize| {
            pins.get(index)
                .map(|p| p.bit_width)
                .ok_or_else(|| format!("Pin {} does not exist", pin))
        };

        match pin {
            PinRef::ChipInput(index) => lookup(&definition.input_pins, index),
            PinRef::ChipOutput(index) => lookup(&definition.output_pins, index),
            PinRef::SubChipInput { instance, pin: index } => {
                lookup(&Self::child(definition, children, instance)?.input_pins, index)
            }
            PinRef::SubChipOutput { instance, pin: index } => {
                lookup(&Self::child(definition, children, instance)?.output_pins, index)
            }
        }
    }

    fn child<'a>(
        definition: &ChipDefinition,
        children: &HashMap<InstanceId, &'a ChipDefinition>,
        instance: InstanceId,
    ) -> Result<&'a ChipDefinition, String> {
        if definition.sub_chip(instance).is_none() {
            return Err(format!("Sub-chip instance #{} does not exist", instance));
        }
        children
            .get(&instance)
            .copied()
            .ok_or_else(|| format!("Sub-chip instance #{} has no resolved definition", instance))
    }

    /// A destination pin may have only one driver
    pub fn check_dest_collision(drivers: &HashMap<PinRef, PinRef>, wire: &Wire) -> Result<(), String> {
        if let Some(existing) = drivers.get(&wire.dest) {
            return Err(format!(
                "Pin {} is already driven by {}. Multiple drivers not allowed.",
                wire.dest, existing
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::components::primitives::PrimitiveKind;
    use crate::core::types::ChipId;

    fn and_gate() -> ChipDefinition {
        ChipDefinition::primitive("AND", PrimitiveKind::And, 1)
    }

    fn validate(definition: &ChipDefinition, and: &ChipDefinition) -> Result<(), SimError> {
        let children: HashMap<InstanceId, &ChipDefinition> =
            definition.sub_chips.iter().map(|s| (s.instance_id, and)).collect();
        ConnectionValidator::validate(definition, &children)
    }

    fn wrapper() -> crate::core::components::definition::ChipDefinitionBuilder {
        ChipDefinition::composite("WRAP", 1)
            .input("a", 1)
            .input("b", 1)
            .output("y", 1)
            .sub_chip(0, &ChipId::new("AND", 1))
    }

    #[test]
    fn test_valid_wrapper() {
        let def = wrapper()
            .wire(PinRef::ChipInput(0), PinRef::sub_input(0, 0))
            .wire(PinRef::ChipInput(1), PinRef::sub_input(0, 1))
            .wire(PinRef::sub_output(0, 0), PinRef::ChipOutput(0))
            .build();
        assert!(validate(&def, &and_gate()).is_ok());
    }

    #[test]
    fn test_missing_pin_is_structural() {
        let def = wrapper().wire(PinRef::ChipInput(0), PinRef::sub_input(0, 5)).build();
        let err = validate(&def, &and_gate()).unwrap_err();
        assert!(matches!(err, SimError::Structural { .. }));
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_missing_instance_is_structural() {
        let def = wrapper().wire(PinRef::ChipInput(0), PinRef::sub_input(7, 0)).build();
        let err = validate(&def, &and_gate()).unwrap_err();
        assert!(err.to_string().contains("#7"));
    }

    #[test]
    fn test_wire_direction_is_checked() {
        let def = wrapper().wire(PinRef::ChipOutput(0), PinRef::sub_input(0, 0)).build();
        assert!(validate(&def, &and_gate()).is_err());

        let def = wrapper().wire(PinRef::ChipInput(0), PinRef::ChipInput(1)).build();
        assert!(validate(&def, &and_gate()).is_err());
    }

    #[test]
    fn test_width_mismatch() {
        let def = ChipDefinition::composite("WRAP", 1)
            .input("a", 4)
            .sub_chip(0, &ChipId::new("AND", 1))
            .wire(PinRef::ChipInput(0), PinRef::sub_input(0, 0))
            .build();
        let err = validate(&def, &and_gate()).unwrap_err();
        assert!(err.to_string().contains("Width mismatch"));
    }

    #[test]
    fn test_multiple_drivers_rejected() {
        let def = wrapper()
            .wire(PinRef::ChipInput(0), PinRef::sub_input(0, 0))
            .wire(PinRef::ChipInput(1), PinRef::sub_input(0, 0))
            .build();
        let err = validate(&def, &and_gate()).unwrap_err();
        assert!(err.to_string().contains("Multiple drivers not allowed"));
    }

    #[test]
    fn test_duplicate_instance_ids() {
        let def = wrapper().sub_chip(0, &ChipId::new("AND", 1)).build();
        let err = validate(&def, &and_gate()).unwrap_err();
        assert!(err.to_string().contains("Duplicate"));
    }

    #[test]
    fn test_pin_width_bounds() {
        let def = ChipDefinition::composite("BAD", 1).input("a", 0).build();
        assert!(validate(&def, &and_gate()).is_err());

        let def = ChipDefinition::composite("BAD", 1).output("y", 65).build();
        assert!(validate(&def, &and_gate()).is_err());
    }

    #[test]
    fn test_primitive_shape_checked() {
        let mut def = and_gate();
        def.output_pins[0].bit_width = 2;
        assert!(validate(&def, &and_gate()).is_err());
    }
}
