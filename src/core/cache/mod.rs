pub mod eligibility;
pub mod truth_table;

// Re-export commonly used types
pub use eligibility::{
    CacheEligibility, CacheEligibilityChecker, IneligibleReason, MAX_INPUT_BITS_FOR_CACHE,
    MAX_PIN_WIDTH_FOR_CACHE,
};
pub use truth_table::{CacheStats, CachedOutputs, TruthTable, TruthTableCache};
