use crate::core::cache::truth_table::TruthTableCache;
use crate::core::components::primitives;
use crate::core::connections::netlist::Endpoint;
use crate::core::errors::SimError;
use crate::core::execution::config::SimulationConfig;
use crate::core::execution::instance::ChipInstance;
use crate::core::input::bridge::InputView;
use crate::core::values::PinValue;
use log::{debug, trace};
use std::sync::Arc;

/// Whether a tick reached a steady state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickStatus {
    Stable,
    /// The pass limit was hit somewhere in the tree; outputs hold the last values computed
    Unstable { passes: usize },
}

/// Outcome of one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub status: TickStatus,
    /// Propagation passes over the top-level chip's children
    pub passes: usize,
    /// Child evaluations at every level, cache lookups included
    pub evaluations: usize,
    pub cache_lookups: usize,
    /// Top-level children still marked dirty when the tick ended
    pub dirty_remaining: usize,
}

impl TickReport {
    pub fn is_stable(&self) -> bool {
        self.status == TickStatus::Stable
    }
}

/// Tick engine
///
/// Owns the truth-table cache; both live on the simulation thread.
pub struct Evaluator {
    config: SimulationConfig,
    cache: TruthTableCache,
}

impl Evaluator {
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            config,
            cache: TruthTableCache::new(),
        }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn cache(&self) -> &TruthTableCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut TruthTableCache {
        &mut self.cache
    }

    /// Propagate the instance's current inputs until its outputs settle.
    ///
    /// The first pass evaluates every child so that key sensors and clocked
    /// state see the current tick; later passes only evaluate children whose
    /// inputs changed. Hitting the pass limit is reported in the status, not
    /// as an error.
    pub fn tick(
        &mut self,
        instance: &mut ChipInstance,
        external: &dyn InputView,
    ) -> Result<TickReport, SimError> {
        let cache = if self.config.use_truth_tables {
            Some(&mut self.cache)
        } else {
            None
        };
        let mut propagation = Propagation::new(&self.config, cache, external, false);
        let settled = propagation.evaluate(instance)?;

        let status = if settled.stable && !propagation.nested_unstable {
            TickStatus::Stable
        } else {
            debug!(
                "{}: tick did not settle after {} passes ({} dirty)",
                instance.id(),
                settled.passes,
                settled.dirty_remaining
            );
            TickStatus::Unstable {
                passes: settled.passes,
            }
        };

        Ok(TickReport {
            status,
            passes: settled.passes,
            evaluations: propagation.evaluations,
            cache_lookups: propagation.cache_lookups,
            dirty_remaining: settled.dirty_remaining,
        })
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new(SimulationConfig::default())
    }
}

/// Result of settling one chip level
#[derive(Debug, Clone, Copy)]
pub(crate) struct Settled {
    pub(crate) passes: usize,
    pub(crate) dirty_remaining: usize,
    pub(crate) stable: bool,
}

/// State of one recursive evaluation
pub(crate) struct Propagation<'a> {
    config: &'a SimulationConfig,
    cache: Option<&'a mut TruthTableCache>,
    external: &'a dyn InputView,
    /// Allow at least `children + 1` passes per level; enough for any
    /// feedback-free netlist to settle
    acyclic: bool,
    pub(crate) evaluations: usize,
    pub(crate) cache_lookups: usize,
    pub(crate) nested_unstable: bool,
}

impl<'a> Propagation<'a> {
    pub(crate) fn new(
        config: &'a SimulationConfig,
        cache: Option<&'a mut TruthTableCache>,
        external: &'a dyn InputView,
        acyclic: bool,
    ) -> Self {
        Self {
            config,
            cache,
            external,
            acyclic,
            evaluations: 0,
            cache_lookups: 0,
            nested_unstable: false,
        }
    }

    /// Evaluate an instance directly: primitives natively, composites by
    /// settling their netlist
    pub(crate) fn evaluate(&mut self, instance: &mut ChipInstance) -> Result<Settled, SimError> {
        let chip = Arc::clone(&instance.chip);
        let Some(netlist) = chip.netlist() else {
            if let Some(kind) = chip.primitive_kind() {
                self.evaluations += 1;
                primitives::evaluate(
                    kind,
                    &instance.inputs,
                    &mut instance.outputs,
                    &mut instance.internal_data,
                    self.external,
                );
            }
            return Ok(Settled {
                passes: 1,
                dirty_remaining: 0,
                stable: true,
            });
        };

        let count = netlist.child_count();
        let limit = if self.acyclic {
            self.config.max_passes.max(count + 1)
        } else {
            self.config.max_passes
        };

        let mut dirty = vec![true; count];
        for pin in 0..instance.inputs.len() {
            let value = instance.inputs[pin];
            for endpoint in netlist.input_fanout(pin) {
                deliver(instance, *endpoint, &value, &mut dirty);
            }
        }

        let mut passes = 0;
        let mut changed: Vec<usize> = Vec::with_capacity(count);
        let stable = loop {
            if !dirty.contains(&true) {
                break true;
            }
            if passes >= limit {
                break false;
            }
            passes += 1;

            // Phase 1: every dirty child reads its inputs as they stood at pass start
            changed.clear();
            for slot in 0..count {
                if dirty[slot] {
                    dirty[slot] = false;
                    if self.evaluate_child(&mut instance.children[slot])? {
                        changed.push(slot);
                    }
                }
            }

            // Phase 2: propagate changed outputs and mark receivers dirty
            for &slot in &changed {
                for pin in 0..instance.children[slot].outputs.len() {
                    let value = instance.children[slot].outputs[pin];
                    for endpoint in netlist.child_fanout(slot, pin) {
                        deliver(instance, *endpoint, &value, &mut dirty);
                    }
                }
            }
        };

        let dirty_remaining = dirty.iter().filter(|d| **d).count();
        trace!(
            "{}: settled={} after {} passes",
            instance.id(),
            stable,
            passes
        );
        Ok(Settled {
            passes,
            dirty_remaining,
            stable,
        })
    }

    /// Evaluate one child, through its truth table when enabled and every
    /// input is driven. Returns whether any of its outputs changed.
    fn evaluate_child(&mut self, child: &mut ChipInstance) -> Result<bool, SimError> {
        let before = child.outputs.clone();

        // Rows are tabulated from driven inputs only
        if child.chip.cache_enabled() && child.inputs.iter().all(PinValue::is_driven) {
            let config = self.config;
            if let Some(cache) = self.cache.as_deref_mut() {
                let chip = Arc::clone(&child.chip);
                let changed = cache
                    .get_or_build(&chip, &child.inputs, config)?
                    .write_to(&mut child.outputs);
                self.evaluations += 1;
                self.cache_lookups += 1;
                return Ok(changed);
            }
        }

        let settled = self.evaluate(child)?;
        if !settled.stable {
            self.nested_unstable = true;
        }
        Ok(child.outputs != before)
    }
}

fn deliver(instance: &mut ChipInstance, endpoint: Endpoint, value: &PinValue, dirty: &mut [bool]) {
    match endpoint {
        Endpoint::ChildInput { child, pin } => {
            let target = instance
                .children
                .get_mut(child)
                .and_then(|c| c.inputs.get_mut(pin));
            if let Some(target) = target {
                if target.assign(value) {
                    dirty[child] = true;
                }
            }
        }
        Endpoint::ChipOutput(pin) => {
            if let Some(target) = instance.outputs.get_mut(pin) {
                target.assign(value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::components::definition::ChipDefinition;
    use crate::core::components::registry::ChipLibrary;
    use crate::core::input::bridge::InputSnapshot;
    use crate::core::types::{ChipId, PinRef};

    fn not_chain(length: u32) -> (ChipLibrary, ChipId) {
        let mut library = ChipLibrary::with_primitives().unwrap();
        let not = ChipId::new("NOT", 1);
        let mut builder = ChipDefinition::composite("CHAIN", 1).input("a", 1).output("y", 1);
        for i in 0..length {
            builder = builder.sub_chip(i, &not);
            let source = if i == 0 {
                PinRef::ChipInput(0)
            } else {
                PinRef::sub_output(i - 1, 0)
            };
            builder = builder.wire(source, PinRef::sub_input(i, 0));
        }
        builder = builder.wire(PinRef::sub_output(length - 1, 0), PinRef::ChipOutput(0));
        library.register(builder.build()).unwrap();
        (library, ChipId::new("CHAIN", 1))
    }

    #[test]
    fn test_primitive_top_level() {
        let library = ChipLibrary::with_primitives().unwrap();
        let mut and = ChipInstance::new(&library, &ChipId::new("AND", 1)).unwrap();
        let mut evaluator = Evaluator::default();
        and.set_inputs(&[1, 1]).unwrap();
        let report = evaluator.tick(&mut and, &InputSnapshot::empty()).unwrap();
        assert!(report.is_stable());
        assert_eq!(and.output_bits(0), Some(1));
    }

    #[test]
    fn test_chain_settles_within_depth_plus_one_passes() {
        let (library, id) = not_chain(4);
        let mut chain = ChipInstance::new(&library, &id).unwrap();
        chain.set_input(0, 1).unwrap();

        let mut evaluator = Evaluator::default();
        let report = evaluator.tick(&mut chain, &InputSnapshot::empty()).unwrap();
        assert!(report.is_stable());
        assert_eq!(chain.output_bits(0), Some(1));
        assert!(report.passes <= 5);
        assert_eq!(report.dirty_remaining, 0);
        assert_eq!(report.cache_lookups, 0);
    }

    #[test]
    fn test_pass_limit_reports_unstable() {
        let (library, id) = not_chain(4);
        let mut chain = ChipInstance::new(&library, &id).unwrap();
        chain.set_input(0, 0).unwrap();

        let mut evaluator = Evaluator::new(SimulationConfig::new().with_max_passes(2));
        let report = evaluator.tick(&mut chain, &InputSnapshot::empty()).unwrap();
        assert_eq!(report.status, TickStatus::Unstable { passes: 2 });
        assert!(report.dirty_remaining > 0);

        // Later ticks resume from the values left behind
        let report = evaluator.tick(&mut chain, &InputSnapshot::empty()).unwrap();
        assert_eq!(report.passes, 2);
        let report = evaluator.tick(&mut chain, &InputSnapshot::empty()).unwrap();
        assert!(report.is_stable());
        assert_eq!(chain.output_bits(0), Some(0));
    }

    #[test]
    fn test_unwired_output_stays_undriven() {
        let mut library = ChipLibrary::with_primitives().unwrap();
        library
            .register(ChipDefinition::composite("OPEN", 1).input("a", 1).output("y", 1).build())
            .unwrap();
        let mut open = ChipInstance::new(&library, &ChipId::new("OPEN", 1)).unwrap();
        open.set_input(0, 1).unwrap();
        let report = Evaluator::default()
            .tick(&mut open, &InputSnapshot::empty())
            .unwrap();
        assert!(report.is_stable());
        assert_eq!(report.passes, 0);
        assert!(!open.outputs()[0].is_driven());
    }
}
