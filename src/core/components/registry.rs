use crate::core::components::definition::{ChipDefinition, ChipKind};
use crate::core::components::primitives::PrimitiveKind;
use crate::core::cache::eligibility::CacheEligibilityChecker;
use crate::core::connections::connection_validator::ConnectionValidator;
use crate::core::connections::netlist::Netlist;
use crate::core::errors::SimError;
use crate::core::execution::execution_order::ExecutionOrderBuilder;
use crate::core::types::{ChipId, InstanceId};
use fnv::FnvHasher;
use log::{debug, info, warn};
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A registered definition together with everything derived from it
#[derive(Debug)]
pub struct CompiledChip {
    definition: ChipDefinition,
    netlist: Option<Netlist>,
    children: Vec<Arc<CompiledChip>>,
    content_hash: u64,
    stateful: bool,
    cache_enabled: bool,
}

impl CompiledChip {
    pub fn id(&self) -> &ChipId {
        &self.definition.id
    }

    pub fn definition(&self) -> &ChipDefinition {
        &self.definition
    }

    /// Wiring of a composite chip; `None` for primitives
    pub fn netlist(&self) -> Option<&Netlist> {
        self.netlist.as_ref()
    }

    /// Compiled children, indexed by netlist slot
    pub fn children(&self) -> &[Arc<CompiledChip>] {
        &self.children
    }

    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        match self.definition.kind {
            ChipKind::Primitive(kind) => Some(kind),
            ChipKind::Composite => None,
        }
    }

    /// Structural hash over this definition and every definition below it
    pub fn content_hash(&self) -> u64 {
        self.content_hash
    }

    /// Whether outputs can depend on anything besides the current inputs:
    /// key sensors, flip-flops or feedback loops anywhere in the tree
    pub fn is_stateful(&self) -> bool {
        self.stateful
    }

    /// Whether the evaluator should use a truth table for this chip
    pub fn cache_enabled(&self) -> bool {
        self.cache_enabled
    }

    /// Whether `id` appears anywhere in this chip's tree, including itself
    pub fn contains_chip(&self, id: &ChipId) -> bool {
        self.id() == id || self.children.iter().any(|c| c.contains_chip(id))
    }

    fn compile(
        mut definition: ChipDefinition,
        library: &HashMap<ChipId, Arc<CompiledChip>>,
    ) -> Result<CompiledChip, SimError> {
        CacheEligibilityChecker::correct(&mut definition);

        let mut children = Vec::with_capacity(definition.sub_chips.len());
        for sub_chip in &definition.sub_chips {
            let child = library
                .get(&sub_chip.chip)
                .ok_or_else(|| SimError::UnknownChip(sub_chip.chip.clone()))?;
            if child.contains_chip(&definition.id) {
                return Err(SimError::structural(
                    &definition.id,
                    format!("Definition cycle through '{}'", sub_chip.chip),
                ));
            }
            children.push(Arc::clone(child));
        }

        let child_defs: HashMap<InstanceId, &ChipDefinition> = definition
            .sub_chips
            .iter()
            .zip(&children)
            .map(|(sub_chip, child)| (sub_chip.instance_id, child.definition()))
            .collect();
        ConnectionValidator::validate(&definition, &child_defs)?;

        let netlist = match definition.kind {
            ChipKind::Composite => {
                let output_counts: Vec<usize> =
                    children.iter().map(|c| c.definition.output_pins.len()).collect();
                let netlist = Netlist::compile(&definition, &output_counts)
                    .map_err(|message| SimError::structural(&definition.id, message))?;
                Some(netlist)
            }
            ChipKind::Primitive(_) => None,
        };

        let stateful = match definition.kind {
            ChipKind::Primitive(kind) => kind.is_stateful(),
            ChipKind::Composite => {
                netlist.as_ref().map_or(false, Netlist::has_feedback)
                    || children.iter().any(|c| c.stateful)
            }
        };

        let mut hasher = FnvHasher::default();
        definition.hash(&mut hasher);
        for child in &children {
            child.content_hash.hash(&mut hasher);
        }
        let content_hash = hasher.finish();

        if definition.should_be_cached && stateful {
            warn!(
                "{}: caching preference ignored, chip has internal state",
                definition.id
            );
        }
        let cache_enabled = definition.should_be_cached && definition.can_be_cached && !stateful;

        Ok(CompiledChip {
            definition,
            netlist,
            children,
            content_hash,
            stateful,
            cache_enabled,
        })
    }
}

/// Registered chip definitions, keyed by identity
///
/// Definitions must be registered leaf-first. Re-registering an existing id
/// replaces it and recompiles every chip that contains it; if any of those
/// fails, the library is left unchanged.
#[derive(Debug, Default, Clone)]
pub struct ChipLibrary {
    chips: HashMap<ChipId, Arc<CompiledChip>>,
}

impl ChipLibrary {
    pub fn new() -> Self {
        Self {
            chips: HashMap::new(),
        }
    }

    /// Library pre-populated with the 1-bit standard primitives
    pub fn with_primitives() -> Result<Self, SimError> {
        let mut library = Self::new();
        for kind in PrimitiveKind::STANDARD {
            library.register(ChipDefinition::primitive(kind.default_name(), kind, 1))?;
        }
        Ok(library)
    }

    /// Correct, validate and compile a definition, then store it.
    pub fn register(&mut self, definition: ChipDefinition) -> Result<Arc<CompiledChip>, SimError> {
        let id = definition.id.clone();
        let compiled = Arc::new(CompiledChip::compile(definition, &self.chips)?);

        if !self.chips.contains_key(&id) {
            debug!("Registered chip {}", id);
            self.chips.insert(id, Arc::clone(&compiled));
            return Ok(compiled);
        }

        // Replacement: recompile dependents on a staging copy
        let mut staging = self.chips.clone();
        staging.insert(id.clone(), Arc::clone(&compiled));

        let dependents = self.dependents_of(&id)?;
        for dependent in &dependents {
            let definition = match staging.get(dependent) {
                Some(chip) => chip.definition.clone(),
                None => continue,
            };
            let recompiled = CompiledChip::compile(definition, &staging)?;
            staging.insert(dependent.clone(), Arc::new(recompiled));
        }

        info!(
            "Replaced chip {} and recompiled {} dependent(s)",
            id,
            dependents.len()
        );
        self.chips = staging;
        Ok(compiled)
    }

    /// Every chip that contains `id` directly or indirectly, children first
    pub fn dependents_of(&self, id: &ChipId) -> Result<Vec<ChipId>, SimError> {
        let mut nodes: Vec<ChipId> = self.chips.keys().cloned().collect();
        nodes.sort();

        let mut edges: HashMap<ChipId, Vec<ChipId>> = HashMap::new();
        for chip in self.chips.values() {
            for sub_chip in &chip.definition.sub_chips {
                edges
                    .entry(sub_chip.chip.clone())
                    .or_default()
                    .push(chip.id().clone());
            }
        }

        let order = ExecutionOrderBuilder::build_order(&nodes, &edges)
            .map_err(|message| SimError::structural(id, message))?;

        let mut affected: HashSet<ChipId> = HashSet::new();
        affected.insert(id.clone());
        let mut dependents = Vec::new();
        for candidate in order {
            let Some(chip) = self.chips.get(&candidate) else {
                continue;
            };
            if chip
                .definition
                .sub_chips
                .iter()
                .any(|s| affected.contains(&s.chip))
            {
                affected.insert(candidate.clone());
                dependents.push(candidate);
            }
        }
        Ok(dependents)
    }

    pub fn get(&self, id: &ChipId) -> Result<Arc<CompiledChip>, SimError> {
        self.chips
            .get(id)
            .cloned()
            .ok_or_else(|| SimError::UnknownChip(id.clone()))
    }

    pub fn contains(&self, id: &ChipId) -> bool {
        self.chips.contains_key(id)
    }

    /// Registered ids in sorted order
    pub fn ids(&self) -> Vec<ChipId> {
        let mut ids: Vec<ChipId> = self.chips.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.chips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chips.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::PinRef;

    fn and_id() -> ChipId {
        ChipId::new("AND", 1)
    }

    fn wrapper(name: &str, child: &ChipId) -> ChipDefinition {
        ChipDefinition::composite(name, 1)
            .input("a", 1)
            .input("b", 1)
            .output("y", 1)
            .sub_chip(0, child)
            .wire(PinRef::ChipInput(0), PinRef::sub_input(0, 0))
            .wire(PinRef::ChipInput(1), PinRef::sub_input(0, 1))
            .wire(PinRef::sub_output(0, 0), PinRef::ChipOutput(0))
            .cached(true)
            .build()
    }

    #[test]
    fn test_with_primitives() {
        let library = ChipLibrary::with_primitives().unwrap();
        assert!(library.contains(&and_id()));
        assert!(library.contains(&ChipId::new("KEY", 1)));
        assert!(library.get(&ChipId::new("KEY", 1)).unwrap().is_stateful());
        assert!(!library.get(&and_id()).unwrap().is_stateful());
    }

    #[test]
    fn test_unknown_child() {
        let mut library = ChipLibrary::new();
        let err = library.register(wrapper("W", &and_id())).unwrap_err();
        assert_eq!(err, SimError::UnknownChip(and_id()));
        assert!(library.is_empty());
    }

    #[test]
    fn test_register_corrects_persisted_flags() {
        let mut library = ChipLibrary::with_primitives().unwrap();
        let mut def = ChipDefinition::composite("WIDE", 1).input("a", 17).output("y", 1).build();
        def.can_be_cached = true;
        def.should_be_cached = true;

        let compiled = library.register(def).unwrap();
        assert!(!compiled.definition().can_be_cached);
        assert!(!compiled.definition().should_be_cached);
        assert!(!compiled.cache_enabled());
    }

    #[test]
    fn test_stateful_chip_is_never_cache_enabled() {
        let mut library = ChipLibrary::with_primitives().unwrap();
        let def = ChipDefinition::composite("SENSE", 1)
            .output("y", 1)
            .sub_chip(0, &ChipId::new("KEY", 1))
            .wire(PinRef::sub_output(0, 0), PinRef::ChipOutput(0))
            .cached(true)
            .build();
        let compiled = library.register(def).unwrap();
        assert!(compiled.is_stateful());
        assert!(!compiled.cache_enabled());
        assert!(compiled.definition().should_be_cached);
    }

    #[test]
    fn test_replacement_recompiles_dependents() {
        let mut library = ChipLibrary::with_primitives().unwrap();
        library.register(wrapper("INNER", &and_id())).unwrap();
        let outer = library.register(wrapper("OUTER", &ChipId::new("INNER", 1))).unwrap();
        let old_hash = outer.content_hash();

        library.register(wrapper("INNER", &ChipId::new("OR", 1))).unwrap();

        let outer = library.get(&ChipId::new("OUTER", 1)).unwrap();
        assert_ne!(outer.content_hash(), old_hash);
        assert_eq!(outer.children()[0].children()[0].id(), &ChipId::new("OR", 1));
    }

    #[test]
    fn test_failed_replacement_rolls_back() {
        let mut library = ChipLibrary::with_primitives().unwrap();
        library.register(wrapper("INNER", &and_id())).unwrap();
        library.register(wrapper("OUTER", &ChipId::new("INNER", 1))).unwrap();
        let before = library.get(&ChipId::new("OUTER", 1)).unwrap().content_hash();

        // New INNER has no second input, so OUTER's wiring no longer resolves
        let narrowed = ChipDefinition::composite("INNER", 1)
            .input("a", 1)
            .output("y", 1)
            .build();
        assert!(library.register(narrowed).is_err());

        let inner = library.get(&ChipId::new("INNER", 1)).unwrap();
        assert_eq!(inner.definition().input_pins.len(), 2);
        assert_eq!(library.get(&ChipId::new("OUTER", 1)).unwrap().content_hash(), before);
    }

    #[test]
    fn test_definition_cycle_rejected() {
        let mut library = ChipLibrary::with_primitives().unwrap();
        library.register(wrapper("INNER", &and_id())).unwrap();
        library.register(wrapper("OUTER", &ChipId::new("INNER", 1))).unwrap();

        let err = library
            .register(wrapper("INNER", &ChipId::new("OUTER", 1)))
            .unwrap_err();
        assert!(err.to_string().contains("Definition cycle"));
    }

    #[test]
    fn test_content_hash_is_deterministic() {
        let mut a = ChipLibrary::with_primitives().unwrap();
        let mut b = ChipLibrary::with_primitives().unwrap();
        let ha = a.register(wrapper("W", &and_id())).unwrap().content_hash();
        let hb = b.register(wrapper("W", &and_id())).unwrap().content_hash();
        assert_eq!(ha, hb);
    }
}
