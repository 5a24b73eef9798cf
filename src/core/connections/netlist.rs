use crate::core::components::definition::ChipDefinition;
use crate::core::execution::execution_order::ExecutionOrderBuilder;
use crate::core::types::{InstanceId, PinRef};
use std::collections::HashMap;

/// Receiving end of a compiled wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// Input pin of the child in slot `child`
    ChildInput { child: usize, pin: usize },
    /// Output pin of the enclosing chip
    ChipOutput(usize),
}

/// Index-based wiring of a validated composite definition
///
/// Children are addressed by slot (their position in `sub_chips`), so the
/// evaluator never hashes instance ids on the hot path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Netlist {
    child_ids: Vec<InstanceId>,
    /// Per chip input pin, the endpoints it drives
    input_fanout: Vec<Vec<Endpoint>>,
    /// Per child slot, per output pin, the endpoints it drives
    child_fanout: Vec<Vec<Vec<Endpoint>>>,
    has_feedback: bool,
}

impl Netlist {
    /// Compile the wires of a definition that has already passed validation.
    ///
    /// `child_output_counts[slot]` is the number of output pins of the child in
    /// that slot.
    pub fn compile(definition: &ChipDefinition, child_output_counts: &[usize]) -> Result<Self, String> {
        let child_ids: Vec<InstanceId> = definition.sub_chips.iter().map(|s| s.instance_id).collect();
        let slots: HashMap<InstanceId, usize> =
            child_ids.iter().enumerate().map(|(slot, id)| (*id, slot)).collect();
        let slot_of = |instance: InstanceId| {
            slots
                .get(&instance)
                .copied()
                .ok_or_else(|| format!("Sub-chip instance #{} does not exist", instance))
        };

        let mut input_fanout = vec![Vec::new(); definition.input_pins.len()];
        let mut child_fanout: Vec<Vec<Vec<Endpoint>>> = child_output_counts
            .iter()
            .map(|count| vec![Vec::new(); *count])
            .collect();
        let mut feedback_edges: HashMap<usize, Vec<usize>> = HashMap::new();

        for wire in &definition.wires {
            let endpoint = match wire.dest {
                PinRef::ChipOutput(pin) => Endpoint::ChipOutput(pin),
                PinRef::SubChipInput { instance, pin } => Endpoint::ChildInput {
                    child: slot_of(instance)?,
                    pin,
                },
                other => return Err(format!("Wire destination {} cannot be driven", other)),
            };

            let fanout = match wire.source {
                PinRef::ChipInput(pin) => input_fanout.get_mut(pin),
                PinRef::SubChipOutput { instance, pin } => {
                    let slot = slot_of(instance)?;
                    if let Endpoint::ChildInput { child, .. } = endpoint {
                        feedback_edges.entry(slot).or_default().push(child);
                    }
                    child_fanout.get_mut(slot).and_then(|pins| pins.get_mut(pin))
                }
                other => return Err(format!("Wire source {} cannot drive a signal", other)),
            };

            fanout
                .ok_or_else(|| format!("Pin {} does not exist", wire.source))?
                .push(endpoint);
        }

        let slot_list: Vec<usize> = (0..child_ids.len()).collect();
        let has_feedback = ExecutionOrderBuilder::has_cycle(&slot_list, &feedback_edges);

        Ok(Self {
            child_ids,
            input_fanout,
            child_fanout,
            has_feedback,
        })
    }

    pub fn child_count(&self) -> usize {
        self.child_ids.len()
    }

    /// Slot of the child with the given instance id
    pub fn child_slot(&self, instance: InstanceId) -> Option<usize> {
        self.child_ids.iter().position(|id| *id == instance)
    }

    pub fn child_id(&self, slot: usize) -> Option<InstanceId> {
        self.child_ids.get(slot).copied()
    }

    pub fn input_fanout(&self, pin: usize) -> &[Endpoint] {
        self.input_fanout.get(pin).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn child_fanout(&self, slot: usize, pin: usize) -> &[Endpoint] {
        self.child_fanout
            .get(slot)
            .and_then(|pins| pins.get(pin))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Whether some child's output reaches back to its own inputs
    pub fn has_feedback(&self) -> bool {
        self.has_feedback
    }
}
