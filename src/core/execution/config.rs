//! Configuration for chip simulation
//!
//! Controls the pass limit of a tick, whether truth tables are used, and how
//! truth-table enumeration is spread across threads.

/// Default number of propagation passes before a tick is declared unstable
pub const DEFAULT_MAX_PASSES: usize = 1000;

/// Enumeration of supported concurrency modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConcurrencyMode {
    /// Truth tables are enumerated row by row on the simulation thread
    #[default]
    Sequential,
    /// Truth-table rows are enumerated in parallel using Rayon
    Rayon,
}

/// Configuration for simulation execution
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Passes per tick (per chip level) before giving up with `Unstable`
    pub max_passes: usize,
    /// Use truth tables for cache-enabled chips
    pub use_truth_tables: bool,
    /// The concurrency mode used when building truth tables
    pub concurrency_mode: ConcurrencyMode,
    /// Size of a dedicated thread pool for table builds
    /// Only relevant when concurrency_mode is Rayon; `None` uses the global pool
    pub thread_pool_size: Option<usize>,
}

impl SimulationConfig {
    /// Create a new simulation configuration with default values
    ///
    /// Default configuration allows 1000 passes per tick, uses truth tables and
    /// builds them sequentially with no dedicated thread pool
    pub fn new() -> Self {
        Self {
            max_passes: DEFAULT_MAX_PASSES,
            use_truth_tables: true,
            concurrency_mode: ConcurrencyMode::default(),
            thread_pool_size: None,
        }
    }

    /// Set the number of passes a chip level may take before the tick is unstable
    ///
    /// # Arguments
    /// * `max_passes` - The pass limit; values below 1 are raised to 1
    ///
    /// # Returns
    /// A new configuration with the specified pass limit
    pub fn with_max_passes(mut self, max_passes: usize) -> Self {
        self.max_passes = max_passes.max(1);
        self
    }

    /// Enable or disable truth-table lookups for cache-enabled chips
    ///
    /// # Arguments
    /// * `enabled` - Whether cache-enabled children are read from their tables
    ///
    /// # Returns
    /// A new configuration with the specified table setting
    pub fn with_truth_tables(mut self, enabled: bool) -> Self {
        self.use_truth_tables = enabled;
        self
    }

    /// Set the concurrency mode for truth-table builds
    ///
    /// # Arguments
    /// * `mode` - The concurrency mode to use
    ///
    /// # Returns
    /// A new configuration with the specified concurrency mode
    pub fn with_concurrency(mut self, mode: ConcurrencyMode) -> Self {
        self.concurrency_mode = mode;
        self
    }

    /// Set the thread pool size for parallel builds
    ///
    /// # Arguments
    /// * `size` - The number of threads to use in the thread pool
    ///
    /// # Returns
    /// A new configuration with the specified thread pool size
    ///
    /// # Note
    /// This setting only affects execution when concurrency_mode is Rayon
    pub fn with_thread_pool_size(mut self, size: usize) -> Self {
        self.thread_pool_size = Some(size);
        self
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SimulationConfig::default();
        assert_eq!(config.max_passes, DEFAULT_MAX_PASSES);
        assert!(config.use_truth_tables);
        assert_eq!(config.concurrency_mode, ConcurrencyMode::Sequential);
        assert_eq!(config.thread_pool_size, None);
    }

    #[test]
    fn test_config_builder() {
        let config = SimulationConfig::new()
            .with_max_passes(16)
            .with_truth_tables(false)
            .with_concurrency(ConcurrencyMode::Rayon)
            .with_thread_pool_size(4);

        assert_eq!(config.max_passes, 16);
        assert!(!config.use_truth_tables);
        assert_eq!(config.concurrency_mode, ConcurrencyMode::Rayon);
        assert_eq!(config.thread_pool_size, Some(4));
    }

    #[test]
    fn test_zero_passes_is_raised() {
        let config = SimulationConfig::new().with_max_passes(0);
        assert_eq!(config.max_passes, 1);
    }
}
