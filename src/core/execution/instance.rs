use crate::core::components::registry::{ChipLibrary, CompiledChip};
use crate::core::errors::SimError;
use crate::core::types::{ChipId, InstanceId};
use crate::core::values::PinValue;
use std::sync::Arc;

/// Live instantiation of a compiled chip
///
/// Owns its pin buffers, its state slots and, for composites, one child
/// instance per netlist slot. Dropping an instance drops its whole subtree.
#[derive(Debug, Clone)]
pub struct ChipInstance {
    pub(crate) chip: Arc<CompiledChip>,
    pub(crate) inputs: Vec<PinValue>,
    pub(crate) outputs: Vec<PinValue>,
    pub(crate) internal_data: Vec<u64>,
    pub(crate) children: Vec<ChipInstance>,
}

impl ChipInstance {
    /// Instantiate a registered chip
    pub fn new(library: &ChipLibrary, id: &ChipId) -> Result<Self, SimError> {
        Ok(Self::from_compiled(library.get(id)?))
    }

    /// Instantiate a compiled chip with default state
    pub fn from_compiled(chip: Arc<CompiledChip>) -> Self {
        Self::with_data(chip, &[])
    }

    fn with_data(chip: Arc<CompiledChip>, data: &[u64]) -> Self {
        let definition = chip.definition();
        let inputs = definition
            .input_pins
            .iter()
            .map(|p| PinValue::undriven(p.bit_width))
            .collect();
        let outputs = definition
            .output_pins
            .iter()
            .map(|p| PinValue::undriven(p.bit_width))
            .collect();

        let slots = chip.primitive_kind().map_or(0, |kind| kind.state_slots());
        let mut internal_data = data.to_vec();
        if internal_data.len() < slots {
            internal_data.resize(slots, 0);
        }

        let children = definition
            .sub_chips
            .iter()
            .zip(chip.children())
            .map(|(sub_chip, child)| Self::with_data(Arc::clone(child), &sub_chip.internal_data))
            .collect();

        Self {
            chip,
            inputs,
            outputs,
            internal_data,
            children,
        }
    }

    pub fn chip(&self) -> &Arc<CompiledChip> {
        &self.chip
    }

    pub fn id(&self) -> &ChipId {
        self.chip.id()
    }

    pub fn inputs(&self) -> &[PinValue] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[PinValue] {
        &self.outputs
    }

    /// Current value of an output pin; undriven pins read 0
    pub fn output_bits(&self, pin: usize) -> Option<u64> {
        self.outputs.get(pin).map(PinValue::bits)
    }

    /// Drive an input pin. Returns whether the value changed.
    pub fn set_input(&mut self, pin: usize, bits: u64) -> Result<bool, SimError> {
        let id = self.chip.id();
        self.inputs
            .get_mut(pin)
            .map(|value| value.set(bits))
            .ok_or_else(|| SimError::InvalidEdit(format!("{} has no input pin {}", id, pin)))
    }

    /// Drive every input pin in order
    pub fn set_inputs(&mut self, values: &[u64]) -> Result<(), SimError> {
        if values.len() != self.inputs.len() {
            return Err(SimError::InvalidEdit(format!(
                "{} expects {} input values, got {}",
                self.chip.id(),
                self.inputs.len(),
                values.len()
            )));
        }
        for (pin, bits) in values.iter().enumerate() {
            self.set_input(pin, *bits)?;
        }
        Ok(())
    }

    /// Return an input pin to the undriven state
    pub fn release_input(&mut self, pin: usize) -> Result<(), SimError> {
        let id = self.chip.id();
        self.inputs
            .get_mut(pin)
            .map(PinValue::release)
            .ok_or_else(|| SimError::InvalidEdit(format!("{} has no input pin {}", id, pin)))
    }

    /// Copy input values from another instance, pin by pin, where widths agree
    pub fn copy_inputs_from(&mut self, other: &ChipInstance) {
        for (mine, theirs) in self.inputs.iter_mut().zip(&other.inputs) {
            if mine.width() == theirs.width() {
                mine.assign(theirs);
            }
        }
    }

    /// State slots (constant value, bound key, flip-flop state)
    pub fn internal_data(&self) -> &[u64] {
        &self.internal_data
    }

    pub(crate) fn internal_data_mut(&mut self) -> &mut Vec<u64> {
        &mut self.internal_data
    }

    pub fn children(&self) -> &[ChipInstance] {
        &self.children
    }

    /// Instance id of the child in a netlist slot
    pub fn child_id(&self, slot: usize) -> Option<InstanceId> {
        self.chip.netlist().and_then(|n| n.child_id(slot))
    }

    /// Look up a nested instance by its path of instance ids
    pub fn find(&self, path: &[InstanceId]) -> Option<&ChipInstance> {
        match path.split_first() {
            None => Some(self),
            Some((head, rest)) => {
                let slot = self.chip.netlist()?.child_slot(*head)?;
                self.children.get(slot)?.find(rest)
            }
        }
    }

    pub fn find_mut(&mut self, path: &[InstanceId]) -> Option<&mut ChipInstance> {
        match path.split_first() {
            None => Some(self),
            Some((head, rest)) => {
                let slot = self.chip.netlist()?.child_slot(*head)?;
                self.children.get_mut(slot)?.find_mut(rest)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::components::definition::ChipDefinition;
    use crate::core::components::primitives::PrimitiveKind;
    use crate::core::types::PinRef;

    #[test]
    fn test_instance_buffers_start_undriven() {
        let library = ChipLibrary::with_primitives().unwrap();
        let instance = ChipInstance::new(&library, &ChipId::new("AND", 1)).unwrap();
        assert_eq!(instance.inputs().len(), 2);
        assert!(instance.outputs().iter().all(|o| !o.is_driven()));
    }

    #[test]
    fn test_child_state_comes_from_sub_chip_spec() {
        let mut library = ChipLibrary::with_primitives().unwrap();
        library
            .register(ChipDefinition::primitive("CONST4", PrimitiveKind::Constant, 4))
            .unwrap();
        library
            .register(
                ChipDefinition::composite("ONE", 1)
                    .output("y", 4)
                    .sub_chip_with_data(5, &ChipId::new("CONST4", 1), vec![9])
                    .wire(PinRef::sub_output(5, 0), PinRef::ChipOutput(0))
                    .build(),
            )
            .unwrap();

        let mut instance = ChipInstance::new(&library, &ChipId::new("ONE", 1)).unwrap();
        assert_eq!(instance.find(&[5]).unwrap().internal_data(), &[9]);
        assert_eq!(instance.child_id(0), Some(5));
        assert!(instance.find(&[6]).is_none());

        instance.find_mut(&[5]).unwrap().internal_data_mut()[0] = 3;
        assert_eq!(instance.children()[0].internal_data(), &[3]);
    }

    #[test]
    fn test_set_input_bounds() {
        let library = ChipLibrary::with_primitives().unwrap();
        let mut instance = ChipInstance::new(&library, &ChipId::new("NOT", 1)).unwrap();
        assert!(instance.set_input(0, 1).unwrap());
        assert!(!instance.set_input(0, 1).unwrap());
        assert!(matches!(instance.set_input(3, 1), Err(SimError::InvalidEdit(_))));
        assert!(instance.set_inputs(&[1, 0]).is_err());
    }
}
