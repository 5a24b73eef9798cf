//! Runs a small keyboard-driven circuit on a simulation thread while a second
//! thread plays back a scripted key sequence through the input bridge.

use chipsim::core::execution::TickObserver;
use chipsim::core::input::{HeldKeys, InputBridgeConfig};
use chipsim::{
    ChipDefinition, ChipId, ChipLibrary, ExternalInputBridge, KeyCode, PinRef, PinValue, SimError,
    SimulationConfig, Simulator, TickReport,
};
use log::{error, info, LevelFilter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const TICK_INTERVAL: Duration = Duration::from_millis(20);
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Keyboard state per polling step
fn script() -> Vec<Vec<KeyCode>> {
    vec![
        vec![],
        vec![KeyCode::A],
        vec![KeyCode::A, KeyCode::B],
        vec![KeyCode::B],
        vec![KeyCode::LEFT_CONTROL, KeyCode::A],
        vec![KeyCode::SPACE],
        vec![],
    ]
}

/// Outputs: a AND b, a XOR b, space held
fn build_library() -> Result<ChipLibrary, SimError> {
    let mut library = ChipLibrary::with_primitives()?;
    library.register(
        ChipDefinition::composite("HALF_ADDER", 1)
            .input("a", 1)
            .input("b", 1)
            .output("sum", 1)
            .output("carry", 1)
            .sub_chip(0, &ChipId::new("XOR", 1))
            .sub_chip(1, &ChipId::new("AND", 1))
            .wire(PinRef::ChipInput(0), PinRef::sub_input(0, 0))
            .wire(PinRef::ChipInput(1), PinRef::sub_input(0, 1))
            .wire(PinRef::ChipInput(0), PinRef::sub_input(1, 0))
            .wire(PinRef::ChipInput(1), PinRef::sub_input(1, 1))
            .wire(PinRef::sub_output(0, 0), PinRef::ChipOutput(0))
            .wire(PinRef::sub_output(1, 0), PinRef::ChipOutput(1))
            .cached(true)
            .build(),
    )?;

    let key = ChipId::new("KEY", 1);
    library.register(
        ChipDefinition::composite("KEYPAD", 1)
            .output("both", 1)
            .output("either", 1)
            .output("space", 1)
            .sub_chip_with_data(0, &key, vec![KeyCode::A.0 as u64])
            .sub_chip_with_data(1, &key, vec![KeyCode::B.0 as u64])
            .sub_chip_with_data(2, &key, vec![KeyCode::SPACE.0 as u64])
            .sub_chip(3, &ChipId::new("HALF_ADDER", 1))
            .wire(PinRef::sub_output(0, 0), PinRef::sub_input(3, 0))
            .wire(PinRef::sub_output(1, 0), PinRef::sub_input(3, 1))
            .wire(PinRef::sub_output(3, 1), PinRef::ChipOutput(0))
            .wire(PinRef::sub_output(3, 0), PinRef::ChipOutput(1))
            .wire(PinRef::sub_output(2, 0), PinRef::ChipOutput(2))
            .build(),
    )?;
    Ok(library)
}

/// Prints the outputs whenever they change
struct PrintObserver {
    last: Vec<u64>,
}

impl TickObserver for PrintObserver {
    fn on_tick(&mut self, tick: u64, report: &TickReport, outputs: &[PinValue]) {
        let bits: Vec<u64> = outputs.iter().map(PinValue::bits).collect();
        if bits != self.last {
            info!(
                "tick {:>4}: both={} either={} space={} ({} passes, {} lookups)",
                tick, bits[0], bits[1], bits[2], report.passes, report.cache_lookups
            );
            self.last = bits;
        }
    }
}

fn run() -> Result<(), SimError> {
    let bridge = Arc::new(ExternalInputBridge::new(InputBridgeConfig::default()));
    let mut sim = Simulator::new(
        build_library()?,
        &ChipId::new("KEYPAD", 1),
        SimulationConfig::default(),
        Arc::clone(&bridge),
    )?;
    sim.add_observer(Box::new(PrintObserver { last: Vec::new() }));

    let done = Arc::new(AtomicBool::new(false));
    let poller = {
        let bridge = Arc::clone(&bridge);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            for held in script() {
                let mut keyboard = HeldKeys::new();
                for key in held {
                    keyboard.press(key);
                }
                bridge.refresh(&keyboard);
                thread::sleep(POLL_INTERVAL);
            }
            done.store(true, Ordering::Release);
        })
    };

    while !done.load(Ordering::Acquire) {
        sim.tick()?;
        thread::sleep(TICK_INTERVAL);
    }
    sim.tick()?;

    if poller.join().is_err() {
        error!("Polling thread panicked");
    }
    info!(
        "Ran {} ticks over {} input refreshes, {} truth tables built",
        sim.tick_count(),
        bridge.refresh_count(),
        sim.evaluator().cache().stats().builds
    );
    Ok(())
}

fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(LevelFilter::Info)
        .format_timestamp(None)
        .init();

    if let Err(e) = run() {
        error!("Simulation failed: {}", e);
        std::process::exit(1);
    }
}
