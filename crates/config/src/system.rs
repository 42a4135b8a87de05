//! Process-level settings

use serde::Deserialize;

/// Process-level configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    /// Number of worker threads for the async runtime
    /// Default: number of CPU cores
    pub worker_threads: usize,

    /// Log route loading and lifecycle events at info level
    pub verbose: bool,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            worker_threads: num_cpus(),
            verbose: false,
        }
    }
}

/// Get the number of available CPUs, defaulting to 4 if detection fails
fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}
