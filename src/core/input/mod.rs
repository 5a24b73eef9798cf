pub mod bridge;
pub mod keys;

// Re-export commonly used types
pub use bridge::{
    ExternalInputBridge, HeldKeys, InputBridgeConfig, InputSnapshot, InputView, RawInputSource,
};
pub use keys::{KeyCode, MODIFIER_KEYS, VALID_INPUT_KEYS};
