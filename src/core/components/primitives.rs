use crate::core::components::definition::PinSpec;
use crate::core::input::bridge::InputView;
use crate::core::input::keys::KeyCode;
use crate::core::values::{width_mask, PinValue};
use serde::{Deserialize, Serialize};

/// Natively evaluated chips
///
/// Bitwise gates operate over the whole pin width. Bus primitives treat their
/// first pin as the most significant slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrimitiveKind {
    Nand,
    And,
    Or,
    Nor,
    Xor,
    Not,
    Buffer,
    /// Outputs `internal_data[0]`
    Constant,
    /// Outputs 1 while the key id in `internal_data[0]` is active
    KeySensor,
    /// Captures `data` on a rising `clock` edge; state is `[stored, last_clock]`
    DFlipFlop,
    /// Concatenates its inputs into one output
    Merge,
    /// Slices its input across its outputs
    Split,
}

impl PrimitiveKind {
    /// Kinds registered by [`ChipLibrary::with_primitives`]
    ///
    /// [`ChipLibrary::with_primitives`]: crate::core::components::registry::ChipLibrary::with_primitives
    pub const STANDARD: [PrimitiveKind; 10] = [
        PrimitiveKind::Nand,
        PrimitiveKind::And,
        PrimitiveKind::Or,
        PrimitiveKind::Nor,
        PrimitiveKind::Xor,
        PrimitiveKind::Not,
        PrimitiveKind::Buffer,
        PrimitiveKind::Constant,
        PrimitiveKind::KeySensor,
        PrimitiveKind::DFlipFlop,
    ];

    /// Library name of the standard 1-bit chip of this kind
    pub fn default_name(self) -> &'static str {
        match self {
            PrimitiveKind::Nand => "NAND",
            PrimitiveKind::And => "AND",
            PrimitiveKind::Or => "OR",
            PrimitiveKind::Nor => "NOR",
            PrimitiveKind::Xor => "XOR",
            PrimitiveKind::Not => "NOT",
            PrimitiveKind::Buffer => "BUFFER",
            PrimitiveKind::Constant => "CONST",
            PrimitiveKind::KeySensor => "KEY",
            PrimitiveKind::DFlipFlop => "DFF",
            PrimitiveKind::Merge => "MERGE",
            PrimitiveKind::Split => "SPLIT",
        }
    }

    /// Pin layout for a primitive of the given width
    ///
    /// Merge and Split use a 1-bit/`width`-bit layout here; other bus shapes
    /// are built with [`ChipDefinition::primitive_builder`].
    ///
    /// [`ChipDefinition::primitive_builder`]: crate::core::components::definition::ChipDefinition::primitive_builder
    pub fn standard_pins(self, width: u8) -> (Vec<PinSpec>, Vec<PinSpec>) {
        match self {
            PrimitiveKind::Nand
            | PrimitiveKind::And
            | PrimitiveKind::Or
            | PrimitiveKind::Nor
            | PrimitiveKind::Xor => (
                vec![PinSpec::new("a", width), PinSpec::new("b", width)],
                vec![PinSpec::new("out", width)],
            ),
            PrimitiveKind::Not | PrimitiveKind::Buffer => (
                vec![PinSpec::new("in", width)],
                vec![PinSpec::new("out", width)],
            ),
            PrimitiveKind::Constant => (vec![], vec![PinSpec::new("out", width)]),
            PrimitiveKind::KeySensor => (vec![], vec![PinSpec::new("out", 1)]),
            PrimitiveKind::DFlipFlop => (
                vec![PinSpec::new("data", width), PinSpec::new("clock", 1)],
                vec![PinSpec::new("q", width)],
            ),
            PrimitiveKind::Merge => (
                (0..width).map(|i| PinSpec::new(&format!("in{}", i), 1)).collect(),
                vec![PinSpec::new("out", width)],
            ),
            PrimitiveKind::Split => (
                vec![PinSpec::new("in", width)],
                (0..width).map(|i| PinSpec::new(&format!("out{}", i), 1)).collect(),
            ),
        }
    }

    /// Check that a pin layout is one this primitive can evaluate
    pub fn check_shape(self, inputs: &[PinSpec], outputs: &[PinSpec]) -> Result<(), String> {
        let total = |pins: &[PinSpec]| pins.iter().map(|p| p.bit_width as u32).sum::<u32>();
        let uniform = |pins: &[PinSpec], width: u8| pins.iter().all(|p| p.bit_width == width);
        let expect = |ok: bool, what: &str| {
            if ok {
                Ok(())
            } else {
                Err(format!("{:?} expects {}", self, what))
            }
        };

        match self {
            PrimitiveKind::Nand
            | PrimitiveKind::And
            | PrimitiveKind::Or
            | PrimitiveKind::Nor
            | PrimitiveKind::Xor => expect(
                inputs.len() == 2 && outputs.len() == 1 && uniform(inputs, outputs[0].bit_width),
                "two inputs and one output of equal width",
            ),
            PrimitiveKind::Not | PrimitiveKind::Buffer => expect(
                inputs.len() == 1 && outputs.len() == 1 && inputs[0].bit_width == outputs[0].bit_width,
                "one input and one output of equal width",
            ),
            PrimitiveKind::Constant => {
                expect(inputs.is_empty() && outputs.len() == 1, "no inputs and one output")
            }
            PrimitiveKind::KeySensor => expect(
                inputs.is_empty() && outputs.len() == 1 && outputs[0].bit_width == 1,
                "no inputs and one 1-bit output",
            ),
            PrimitiveKind::DFlipFlop => expect(
                inputs.len() == 2
                    && outputs.len() == 1
                    && inputs[0].bit_width == outputs[0].bit_width
                    && inputs[1].bit_width == 1,
                "data and 1-bit clock inputs and one output matching data",
            ),
            PrimitiveKind::Merge => expect(
                !inputs.is_empty() && outputs.len() == 1 && total(inputs) == total(outputs),
                "inputs whose widths sum to the single output width",
            ),
            PrimitiveKind::Split => expect(
                inputs.len() == 1 && !outputs.is_empty() && total(inputs) == total(outputs),
                "a single input whose width equals the sum of the outputs",
            ),
        }
    }

    /// Whether the outputs depend on anything besides the current inputs
    pub fn is_stateful(self) -> bool {
        matches!(self, PrimitiveKind::KeySensor | PrimitiveKind::DFlipFlop)
    }

    /// Number of internal state slots an instance carries
    pub fn state_slots(self) -> usize {
        match self {
            PrimitiveKind::Constant | PrimitiveKind::KeySensor => 1,
            PrimitiveKind::DFlipFlop => 2,
            _ => 0,
        }
    }
}

/// Evaluate a primitive, writing its outputs. Undriven inputs read as 0.
pub fn evaluate(
    kind: PrimitiveKind,
    inputs: &[PinValue],
    outputs: &mut [PinValue],
    state: &mut [u64],
    external: &dyn InputView,
) {
    let input = |i: usize| inputs.get(i).map(PinValue::bits).unwrap_or(0);

    match kind {
        PrimitiveKind::Nand => {
            outputs[0].set(!(input(0) & input(1)));
        }
        PrimitiveKind::And => {
            outputs[0].set(input(0) & input(1));
        }
        PrimitiveKind::Or => {
            outputs[0].set(input(0) | input(1));
        }
        PrimitiveKind::Nor => {
            outputs[0].set(!(input(0) | input(1)));
        }
        PrimitiveKind::Xor => {
            outputs[0].set(input(0) ^ input(1));
        }
        PrimitiveKind::Not => {
            outputs[0].set(!input(0));
        }
        PrimitiveKind::Buffer => {
            outputs[0].set(input(0));
        }
        PrimitiveKind::Constant => {
            outputs[0].set(state.first().copied().unwrap_or(0));
        }
        PrimitiveKind::KeySensor => {
            let key = state.first().copied().unwrap_or(0);
            outputs[0].set(key_sensor_reads_active(key, external) as u64);
        }
        PrimitiveKind::DFlipFlop => {
            let clock = input(1) & 1;
            if state.len() >= 2 {
                if clock == 1 && state[1] == 0 {
                    state[0] = input(0);
                }
                state[1] = clock;
            }
            outputs[0].set(state.first().copied().unwrap_or(0));
        }
        PrimitiveKind::Merge => {
            let merged = inputs.iter().fold(0u64, |acc, pin| {
                shift_in(acc, pin.width()) | pin.bits()
            });
            outputs[0].set(merged);
        }
        PrimitiveKind::Split => {
            let mut remaining = input(0);
            for out in outputs.iter_mut().rev() {
                out.set(remaining & width_mask(out.width()));
                remaining = shift_out(remaining, out.width());
            }
        }
    }
}

/// The "no key" binding is active exactly when nothing else is
fn key_sensor_reads_active(key: u64, external: &dyn InputView) -> bool {
    let Ok(key) = u32::try_from(key) else {
        return false;
    };
    let key = KeyCode(key);
    if key == KeyCode::NONE {
        !external.has_any_input()
    } else {
        external.is_active(key)
    }
}

fn shift_in(acc: u64, width: u8) -> u64 {
    if width >= 64 {
        0
    } else {
        acc << width
    }
}

fn shift_out(value: u64, width: u8) -> u64 {
    if width >= 64 {
        0
    } else {
        value >> width
    }
}
