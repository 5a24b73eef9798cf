use crate::core::components::definition::{ChipDefinition, PinSpec};
use log::debug;

/// Largest total input width that can be tabulated (2^16 rows)
pub const MAX_INPUT_BITS_FOR_CACHE: u32 = 16;

/// Widest single pin a table row can hold
pub const MAX_PIN_WIDTH_FOR_CACHE: u32 = 64;

/// Why a definition cannot be backed by a truth table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IneligibleReason {
    TooManyInputBits { total: u32, max: u32 },
    OutputPinTooWide { width: u32, max: u32 },
    InputPinTooWide { width: u32, max: u32 },
}

impl std::fmt::Display for IneligibleReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IneligibleReason::TooManyInputBits { total, max } => {
                write!(f, "{} input bits exceeds the limit of {}", total, max)
            }
            IneligibleReason::OutputPinTooWide { width, max } => {
                write!(f, "output pin of {} bits exceeds the limit of {}", width, max)
            }
            IneligibleReason::InputPinTooWide { width, max } => {
                write!(f, "input pin of {} bits exceeds the limit of {}", width, max)
            }
        }
    }
}

/// Result of an eligibility check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheEligibility {
    pub can_cache: bool,
    pub reason: Option<IneligibleReason>,
}

impl CacheEligibility {
    fn eligible() -> Self {
        Self {
            can_cache: true,
            reason: None,
        }
    }

    fn ineligible(reason: IneligibleReason) -> Self {
        Self {
            can_cache: false,
            reason: Some(reason),
        }
    }
}

/// Decides whether a definition's I/O shape fits in a truth table and keeps the
/// persisted caching flags consistent with that decision
pub struct CacheEligibilityChecker;

impl CacheEligibilityChecker {
    /// Check a definition's pin widths against the cache limits
    pub fn evaluate(definition: &ChipDefinition) -> CacheEligibility {
        let total = Self::total_input_width(definition);
        if total > MAX_INPUT_BITS_FOR_CACHE {
            return CacheEligibility::ineligible(IneligibleReason::TooManyInputBits {
                total,
                max: MAX_INPUT_BITS_FOR_CACHE,
            });
        }

        let widest_output = Self::widest_output_pin(definition);
        if widest_output > MAX_PIN_WIDTH_FOR_CACHE {
            return CacheEligibility::ineligible(IneligibleReason::OutputPinTooWide {
                width: widest_output,
                max: MAX_PIN_WIDTH_FOR_CACHE,
            });
        }

        let widest_input = Self::widest_input_pin(definition);
        if widest_input > MAX_PIN_WIDTH_FOR_CACHE {
            return CacheEligibility::ineligible(IneligibleReason::InputPinTooWide {
                width: widest_input,
                max: MAX_PIN_WIDTH_FOR_CACHE,
            });
        }

        CacheEligibility::eligible()
    }

    /// Force the caching flags to agree with eligibility.
    ///
    /// Eligibility is checked before preference: an ineligible definition loses
    /// `can_be_cached` whatever was persisted, and a definition that cannot be
    /// cached loses `should_be_cached`. Returns the eligibility that was applied.
    pub fn correct(definition: &mut ChipDefinition) -> CacheEligibility {
        let eligibility = Self::evaluate(definition);

        if !eligibility.can_cache && definition.can_be_cached {
            if let Some(reason) = eligibility.reason {
                debug!("{}: clearing can_be_cached ({})", definition.id, reason);
            }
            definition.can_be_cached = false;
        }

        if !definition.can_be_cached && definition.should_be_cached {
            debug!("{}: clearing should_be_cached on uncacheable chip", definition.id);
            definition.should_be_cached = false;
        }

        eligibility
    }

    /// Sum of all input pin widths
    pub fn total_input_width(definition: &ChipDefinition) -> u32 {
        definition.input_pins.iter().map(|p| p.bit_width as u32).sum()
    }

    pub fn widest_input_pin(definition: &ChipDefinition) -> u32 {
        widest(&definition.input_pins)
    }

    pub fn widest_output_pin(definition: &ChipDefinition) -> u32 {
        widest(&definition.output_pins)
    }
}

fn widest(pins: &[PinSpec]) -> u32 {
    pins.iter().map(|p| p.bit_width as u32).max().unwrap_or(0)
}
