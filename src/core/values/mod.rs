pub mod pin_value;

// Re-export commonly used types
pub use pin_value::{width_mask, PinValue, MAX_PIN_WIDTH};
