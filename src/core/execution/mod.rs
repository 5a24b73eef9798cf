pub mod config;
pub mod evaluator;
pub mod execution_order;
pub mod instance;
pub mod simulation_engine;

// Re-export commonly used types
pub use config::{ConcurrencyMode, SimulationConfig, DEFAULT_MAX_PASSES};
pub use evaluator::{Evaluator, TickReport, TickStatus};
pub use execution_order::ExecutionOrderBuilder;
pub use instance::ChipInstance;
pub use simulation_engine::{EditSender, SimulationEdit, Simulator, TickObserver};
