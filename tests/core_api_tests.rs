use chipsim::core::execution::{SimulationEdit, TickObserver};
use chipsim::core::input::{HeldKeys, InputBridgeConfig};
use chipsim::{
    ChipDefinition, ChipId, ChipLibrary, ExternalInputBridge, KeyCode, PinRef, PinValue, SimError,
    SimulationConfig, Simulator, TickReport, TickStatus,
};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;

/// Two-input gate wrapper whose body can be swapped between AND and OR
fn gate(body: &str) -> ChipDefinition {
    ChipDefinition::composite("GATE", 1)
        .input("a", 1)
        .input("b", 1)
        .output("y", 1)
        .sub_chip(0, &ChipId::new(body, 1))
        .wire(PinRef::ChipInput(0), PinRef::sub_input(0, 0))
        .wire(PinRef::ChipInput(1), PinRef::sub_input(0, 1))
        .wire(PinRef::sub_output(0, 0), PinRef::ChipOutput(0))
        .build()
}

/// Board driving one GATE and lighting a lamp while the space bar is held
fn board_library() -> Result<ChipLibrary, SimError> {
    let mut library = ChipLibrary::with_primitives()?;
    library.register(gate("AND"))?;
    library.register(
        ChipDefinition::composite("BOARD", 1)
            .input("a", 1)
            .input("b", 1)
            .output("gate", 1)
            .output("lamp", 1)
            .sub_chip(0, &ChipId::new("GATE", 1))
            .sub_chip_with_data(1, &ChipId::new("KEY", 1), vec![KeyCode::SPACE.0 as u64])
            .wire(PinRef::ChipInput(0), PinRef::sub_input(0, 0))
            .wire(PinRef::ChipInput(1), PinRef::sub_input(0, 1))
            .wire(PinRef::sub_output(0, 0), PinRef::ChipOutput(0))
            .wire(PinRef::sub_output(1, 0), PinRef::ChipOutput(1))
            .build(),
    )?;
    Ok(library)
}

/// Records every tick's outputs and rejected edit
#[derive(Default)]
struct Trace {
    outputs: Vec<Vec<u64>>,
    unstable: usize,
    rejected: usize,
}

struct TraceObserver(Arc<Mutex<Trace>>);

impl TickObserver for TraceObserver {
    fn on_tick(&mut self, _tick: u64, report: &TickReport, outputs: &[PinValue]) {
        let mut trace = self.0.lock().unwrap();
        trace.outputs.push(outputs.iter().map(PinValue::bits).collect());
        if !report.is_stable() {
            trace.unstable += 1;
        }
    }

    fn on_edit_rejected(&mut self, _edit: &SimulationEdit, _error: &SimError) {
        self.0.lock().unwrap().rejected += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polling_thread_feeds_simulation() -> Result<(), SimError> {
        let bridge = Arc::new(ExternalInputBridge::new(InputBridgeConfig::default()));
        let mut sim = Simulator::new(
            board_library()?,
            &ChipId::new("BOARD", 1),
            SimulationConfig::default(),
            Arc::clone(&bridge),
        )?;

        let (polled, wait_for_poll) = mpsc::channel();
        let (resume, wait_for_tick) = mpsc::channel::<()>();
        let poller = {
            let bridge = Arc::clone(&bridge);
            thread::spawn(move || {
                let mut keyboard = HeldKeys::new();
                keyboard.press(KeyCode::SPACE);
                bridge.refresh(&keyboard);
                polled.send(()).unwrap();

                wait_for_tick.recv().unwrap();
                keyboard.release(KeyCode::SPACE);
                bridge.refresh(&keyboard);
                polled.send(()).unwrap();
            })
        };

        wait_for_poll.recv().unwrap();
        sim.tick()?;
        assert_eq!(sim.outputs()[1].bits(), 1);

        resume.send(()).unwrap();
        wait_for_poll.recv().unwrap();
        sim.tick()?;
        assert_eq!(sim.outputs()[1].bits(), 0);

        poller.join().unwrap();
        assert_eq!(bridge.refresh_count(), 2);
        Ok(())
    }

    #[test]
    fn test_edits_from_another_thread() -> Result<(), SimError> {
        let trace = Arc::new(Mutex::new(Trace::default()));
        let mut sim = Simulator::new(
            board_library()?,
            &ChipId::new("BOARD", 1),
            SimulationConfig::default(),
            Arc::new(ExternalInputBridge::default()),
        )?;
        sim.add_observer(Box::new(TraceObserver(Arc::clone(&trace))));

        let edits = sim.edit_sender();
        thread::spawn(move || {
            edits.set_input(0, 1).unwrap();
            edits.set_input(1, 1).unwrap();
            // Not a constant: rejected, the others still apply
            edits.set_constant(&[0], 1).unwrap();
        })
        .join()
        .unwrap();

        sim.tick()?;
        let trace = trace.lock().unwrap();
        assert_eq!(trace.outputs, vec![vec![1, 0]]);
        assert_eq!(trace.rejected, 1);
        assert_eq!(trace.unstable, 0);
        Ok(())
    }

    #[test]
    fn test_replacing_definition_rebuilds_and_keeps_inputs() -> Result<(), SimError> {
        let mut sim = Simulator::new(
            board_library()?,
            &ChipId::new("BOARD", 1),
            SimulationConfig::default(),
            Arc::new(ExternalInputBridge::default()),
        )?;
        let edits = sim.edit_sender();

        edits.set_input(0, 1)?;
        sim.tick()?;
        assert_eq!(sim.outputs()[0].bits(), 0, "AND with one low input");

        edits.replace_definition(gate("OR"))?;
        sim.tick()?;
        assert_eq!(sim.outputs()[0].bits(), 1, "OR with one high input");
        assert_eq!(sim.instance().inputs()[0].bits(), 1);

        // A replacement that no longer validates leaves the old version running
        edits.replace_definition(gate("MISSING"))?;
        sim.tick()?;
        assert_eq!(sim.outputs()[0].bits(), 1);
        assert!(!sim.library().contains(&ChipId::new("MISSING", 1)));
        Ok(())
    }

    #[test]
    fn test_persisted_definition_flags_are_corrected_on_load() -> Result<(), String> {
        let json = r#"{
            "id": { "name": "WIDE_AND", "version": 1 },
            "kind": "Composite",
            "input_pins": [
                { "name": "a", "bit_width": 16 },
                { "name": "b", "bit_width": 1 }
            ],
            "output_pins": [ { "name": "y", "bit_width": 1 } ],
            "sub_chips": [ { "instance_id": 0, "chip": { "name": "AND", "version": 1 } } ],
            "wires": [
                { "source": { "ChipInput": 1 }, "dest": { "SubChipInput": { "instance": 0, "pin": 0 } } },
                { "source": { "ChipInput": 1 }, "dest": { "SubChipInput": { "instance": 0, "pin": 1 } } },
                { "source": { "SubChipOutput": { "instance": 0, "pin": 0 } }, "dest": { "ChipOutput": 0 } }
            ],
            "can_be_cached": true,
            "should_be_cached": true
        }"#;
        let definition: ChipDefinition = serde_json::from_str(json).map_err(|e| e.to_string())?;
        assert!(definition.can_be_cached, "loaded as persisted");

        let mut library = ChipLibrary::with_primitives().map_err(|e| e.to_string())?;
        library.register(definition).map_err(|e| e.to_string())?;

        let chip = library
            .get(&ChipId::new("WIDE_AND", 1))
            .map_err(|e| e.to_string())?;
        assert!(!chip.definition().can_be_cached, "17 input bits is over the limit");
        assert!(!chip.definition().should_be_cached);
        assert!(!chip.cache_enabled());
        Ok(())
    }

    #[test]
    fn test_feedback_loop_reports_unstable_ticks() -> Result<(), SimError> {
        let mut library = ChipLibrary::with_primitives()?;
        library.register(
            ChipDefinition::composite("BLINK", 1)
                .output("q", 1)
                .sub_chip(0, &ChipId::new("NOT", 1))
                .wire(PinRef::sub_output(0, 0), PinRef::sub_input(0, 0))
                .wire(PinRef::sub_output(0, 0), PinRef::ChipOutput(0))
                .build(),
        )?;
        let trace = Arc::new(Mutex::new(Trace::default()));
        let mut sim = Simulator::new(
            library,
            &ChipId::new("BLINK", 1),
            SimulationConfig::new().with_max_passes(3),
            Arc::new(ExternalInputBridge::default()),
        )?;
        sim.add_observer(Box::new(TraceObserver(Arc::clone(&trace))));

        let last = sim.run(4)?.unwrap();
        assert_eq!(last.status, TickStatus::Unstable { passes: 3 });
        assert_eq!(trace.lock().unwrap().unstable, 4);
        Ok(())
    }
}
