/// Widest value a pin can carry
pub const MAX_PIN_WIDTH: u8 = 64;

/// Bit mask covering the low `width` bits
pub fn width_mask(width: u8) -> u64 {
    if width >= MAX_PIN_WIDTH {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

/// Fixed-width value held by a pin, together with its driven state
///
/// An undriven pin reads as 0 but compares unequal to a driven 0, so the
/// evaluator notices when a pin first receives a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PinValue {
    bits: u64,
    width: u8,
    driven: bool,
}

impl PinValue {
    /// Create an undriven pin of the given width
    pub fn undriven(width: u8) -> Self {
        debug_assert!(
            (1..=MAX_PIN_WIDTH).contains(&width),
            "pin width {} out of range",
            width
        );
        Self {
            bits: 0,
            width: width.clamp(1, MAX_PIN_WIDTH),
            driven: false,
        }
    }

    /// Create a driven pin, truncating `bits` to the width
    pub fn driven(width: u8, bits: u64) -> Self {
        let mut value = Self::undriven(width);
        value.set(bits);
        value
    }

    /// Current value; 0 when undriven
    pub fn bits(&self) -> u64 {
        self.bits
    }

    pub fn width(&self) -> u8 {
        self.width
    }

    pub fn is_driven(&self) -> bool {
        self.driven
    }

    /// Single bit of the value, bit 0 being least significant
    pub fn bit(&self, index: u8) -> bool {
        index < self.width && (self.bits >> index) & 1 == 1
    }

    /// Drive the pin with a new value. Returns true if the pin changed.
    pub fn set(&mut self, bits: u64) -> bool {
        let bits = bits & width_mask(self.width);
        let changed = !self.driven || self.bits != bits;
        self.bits = bits;
        self.driven = true;
        changed
    }

    /// Copy value and driven state from another pin of the same width.
    /// Returns true if the pin changed.
    pub fn assign(&mut self, other: &PinValue) -> bool {
        debug_assert_eq!(self.width, other.width);
        let changed = self.driven != other.driven || self.bits != other.bits;
        self.bits = other.bits & width_mask(self.width);
        self.driven = other.driven;
        changed
    }

    /// Return the pin to the undriven state
    pub fn release(&mut self) {
        self.bits = 0;
        self.driven = false;
    }
}

impl std::fmt::Display for PinValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.driven {
            write!(f, "{:0width$b}", self.bits, width = self.width as usize)
        } else {
            write!(f, "{}", "z".repeat(self.width as usize))
        }
    }
}
