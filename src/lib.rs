pub mod core;

// Re-export commonly used types
pub use crate::core::cache::{
    CacheEligibilityChecker, TruthTableCache, MAX_INPUT_BITS_FOR_CACHE, MAX_PIN_WIDTH_FOR_CACHE,
};
pub use crate::core::components::{ChipDefinition, ChipLibrary, PrimitiveKind};
pub use crate::core::errors::SimError;
pub use crate::core::execution::{
    ChipInstance, Evaluator, SimulationConfig, Simulator, TickReport, TickStatus,
};
pub use crate::core::input::{ExternalInputBridge, InputSnapshot, InputView, KeyCode};
pub use crate::core::types::{ChipId, InstanceId, PinRef};
pub use crate::core::values::PinValue;
