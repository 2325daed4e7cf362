use log::LevelFilter;

/// Number of interrupts a single core can hold back while its guest is not
/// interruptible. Interrupts arriving beyond this are dropped.
pub const PENDING_INTERRUPTS_BUFFER_CAPACITY: usize = 64;

/// Upper bound on the per-core table of a session.
pub const MAX_PROCESSORS: usize = 256;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct HypervisorConfig {
    /// Number of logical processors to create state for. Core ids run from
    /// `0` to `processor_count - 1`.
    pub processor_count: usize,

    /// Applied with `log::set_max_level` when a session starts.
    pub max_log_level: LevelFilter,
}

impl HypervisorConfig {
    pub fn new(processor_count: usize) -> Self {
        Self {
            processor_count,
            ..Self::default()
        }
    }

    pub fn with_max_log_level(mut self, level: LevelFilter) -> Self {
        self.max_log_level = level;
        self
    }
}

impl Default for HypervisorConfig {
    fn default() -> Self {
        Self {
            processor_count: 1,
            max_log_level: LevelFilter::Info,
        }
    }
}
