pub mod definition;
pub mod primitives;
pub mod registry;

// Re-export commonly used types
pub use definition::{ChipDefinition, ChipDefinitionBuilder, ChipKind, PinSpec, SubChipSpec, Wire};
pub use primitives::PrimitiveKind;
pub use registry::{ChipLibrary, CompiledChip};
