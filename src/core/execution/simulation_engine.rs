use crate::core::components::definition::ChipDefinition;
use crate::core::components::primitives::PrimitiveKind;
use crate::core::components::registry::ChipLibrary;
use crate::core::errors::SimError;
use crate::core::execution::config::SimulationConfig;
use crate::core::execution::evaluator::{Evaluator, TickReport};
use crate::core::execution::instance::ChipInstance;
use crate::core::input::bridge::ExternalInputBridge;
use crate::core::input::keys::KeyCode;
use crate::core::types::{ChipId, InstanceId};
use crate::core::values::PinValue;
use log::{debug, info, warn};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

/// Change requested by the authoring side, applied between ticks
#[derive(Debug, Clone)]
pub enum SimulationEdit {
    /// Register a new version of a definition and rebuild the circuit if it uses it
    ReplaceDefinition(ChipDefinition),
    /// Rebind the key sensor at `path`
    BindKey { path: Vec<InstanceId>, key: KeyCode },
    /// Change the value of the constant at `path`
    SetConstant { path: Vec<InstanceId>, value: u64 },
    /// Drive a top-level input pin
    SetInput { pin: usize, bits: u64 },
}

/// Cloneable handle for queueing edits from other threads
#[derive(Debug, Clone)]
pub struct EditSender {
    sender: Sender<SimulationEdit>,
}

impl EditSender {
    pub fn send(&self, edit: SimulationEdit) -> Result<(), SimError> {
        self.sender
            .send(edit)
            .map_err(|_| SimError::InvalidEdit("Simulator has shut down".to_string()))
    }

    pub fn replace_definition(&self, definition: ChipDefinition) -> Result<(), SimError> {
        self.send(SimulationEdit::ReplaceDefinition(definition))
    }

    pub fn bind_key(&self, path: &[InstanceId], key: KeyCode) -> Result<(), SimError> {
        self.send(SimulationEdit::BindKey {
            path: path.to_vec(),
            key,
        })
    }

    pub fn set_constant(&self, path: &[InstanceId], value: u64) -> Result<(), SimError> {
        self.send(SimulationEdit::SetConstant {
            path: path.to_vec(),
            value,
        })
    }

    pub fn set_input(&self, pin: usize, bits: u64) -> Result<(), SimError> {
        self.send(SimulationEdit::SetInput { pin, bits })
    }
}

/// Observer trait for simulation events
pub trait TickObserver: Send {
    /// Called after every tick with the top-level outputs
    fn on_tick(&mut self, tick: u64, report: &TickReport, outputs: &[PinValue]);

    /// Called when a queued edit could not be applied
    fn on_edit_rejected(&mut self, _edit: &SimulationEdit, _error: &SimError) {}
}

/// Owner of everything the simulation thread mutates
///
/// Holds the chip library, the live circuit, the evaluator (and through it the
/// truth-table cache) and the receiving end of the edit queue. Edits queued
/// through an [`EditSender`] are drained at the start of each tick.
pub struct Simulator {
    library: ChipLibrary,
    root: ChipId,
    instance: ChipInstance,
    evaluator: Evaluator,
    bridge: Arc<ExternalInputBridge>,
    edits: Receiver<SimulationEdit>,
    sender: Sender<SimulationEdit>,
    observers: Vec<Box<dyn TickObserver>>,
    tick_count: u64,
}

impl Simulator {
    /// Create a simulator running `root` from the library
    ///
    /// # Arguments
    /// * `library` - Registered chip definitions; the simulator takes ownership
    /// * `root` - The chip to instantiate as the top-level circuit
    /// * `config` - Pass limit, truth-table and concurrency settings
    /// * `bridge` - Shared input bridge refreshed by the polling thread
    ///
    /// # Returns
    /// The simulator, or `UnknownChip` if `root` is not registered
    pub fn new(
        library: ChipLibrary,
        root: &ChipId,
        config: SimulationConfig,
        bridge: Arc<ExternalInputBridge>,
    ) -> Result<Self, SimError> {
        let instance = ChipInstance::new(&library, root)?;
        let (sender, edits) = mpsc::channel();
        info!("Simulator created for {}", root);

        Ok(Self {
            library,
            root: root.clone(),
            instance,
            evaluator: Evaluator::new(config),
            bridge,
            edits,
            sender,
            observers: Vec::new(),
            tick_count: 0,
        })
    }

    /// Handle for queueing edits from other threads
    pub fn edit_sender(&self) -> EditSender {
        EditSender {
            sender: self.sender.clone(),
        }
    }

    /// Add an observer to the simulation
    ///
    /// # Arguments
    /// * `observer` - Receives every tick report and every rejected edit
    pub fn add_observer(&mut self, observer: Box<dyn TickObserver>) {
        self.observers.push(observer);
    }

    /// Apply queued edits, then run one tick against the current input snapshot
    ///
    /// # Returns
    /// The tick report; an unstable tick is reported in its status, not as an error
    pub fn tick(&mut self) -> Result<TickReport, SimError> {
        self.apply_pending_edits();

        let report = self.evaluator.tick(&mut self.instance, self.bridge.as_ref())?;
        self.tick_count += 1;

        for observer in &mut self.observers {
            observer.on_tick(self.tick_count, &report, &self.instance.outputs);
        }
        Ok(report)
    }

    /// Run several ticks back to back
    ///
    /// # Arguments
    /// * `ticks` - Number of ticks to run
    ///
    /// # Returns
    /// The last tick's report, or `None` if `ticks` is zero
    pub fn run(&mut self, ticks: u64) -> Result<Option<TickReport>, SimError> {
        let mut last = None;
        for _ in 0..ticks {
            last = Some(self.tick()?);
        }
        Ok(last)
    }

    /// Drain the edit queue. Rejected edits are logged and reported to
    /// observers; the rest still apply. Returns the number applied.
    pub fn apply_pending_edits(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(edit) = self.edits.try_recv() {
            match self.apply_edit(edit.clone()) {
                Ok(()) => applied += 1,
                Err(error) => {
                    warn!("Rejected edit {:?}: {}", edit, error);
                    for observer in &mut self.observers {
                        observer.on_edit_rejected(&edit, &error);
                    }
                }
            }
        }
        applied
    }

    /// Apply one edit immediately
    ///
    /// # Arguments
    /// * `edit` - The edit to apply
    ///
    /// # Returns
    /// `InvalidEdit` if the edit addresses a missing instance or the wrong kind
    /// of primitive, or the registration error of a rejected definition
    pub fn apply_edit(&mut self, edit: SimulationEdit) -> Result<(), SimError> {
        match edit {
            SimulationEdit::ReplaceDefinition(definition) => self.replace_definition(definition),
            SimulationEdit::BindKey { path, key } => {
                let sensor = self.primitive_at(&path, PrimitiveKind::KeySensor)?;
                sensor.internal_data_mut()[0] = key.0 as u64;
                debug!("Bound key sensor {:?} to {}", path, key.0);
                Ok(())
            }
            SimulationEdit::SetConstant { path, value } => {
                let constant = self.primitive_at(&path, PrimitiveKind::Constant)?;
                constant.internal_data_mut()[0] = value;
                Ok(())
            }
            SimulationEdit::SetInput { pin, bits } => self.instance.set_input(pin, bits).map(|_| ()),
        }
    }

    fn replace_definition(&mut self, definition: ChipDefinition) -> Result<(), SimError> {
        let id = definition.id.clone();
        self.library.register(definition)?;
        self.evaluator.cache_mut().invalidate(&id);

        if self.instance.chip().contains_chip(&id) {
            let mut rebuilt = ChipInstance::new(&self.library, &self.root)?;
            rebuilt.copy_inputs_from(&self.instance);
            self.instance = rebuilt;
            info!("Rebuilt {} after replacing {}", self.root, id);
        }
        Ok(())
    }

    fn primitive_at(
        &mut self,
        path: &[InstanceId],
        expected: PrimitiveKind,
    ) -> Result<&mut ChipInstance, SimError> {
        let target = self
            .instance
            .find_mut(path)
            .ok_or_else(|| SimError::InvalidEdit(format!("No instance at path {:?}", path)))?;
        if target.chip().primitive_kind() != Some(expected) {
            return Err(SimError::InvalidEdit(format!(
                "Instance at {:?} is {}, not a {:?}",
                path,
                target.id(),
                expected
            )));
        }
        if target.internal_data().is_empty() {
            target.internal_data_mut().push(0);
        }
        Ok(target)
    }

    pub fn instance(&self) -> &ChipInstance {
        &self.instance
    }

    pub fn outputs(&self) -> &[PinValue] {
        self.instance.outputs()
    }

    pub fn library(&self) -> &ChipLibrary {
        &self.library
    }

    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }

    pub fn bridge(&self) -> &Arc<ExternalInputBridge> {
        &self.bridge
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }
}
