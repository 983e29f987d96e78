/// Engine-wide configuration for Onyx.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub profiling: ProfilingMode,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            profiling: ProfilingMode::Off,
        }
    }
}

impl Config {
    /// Apply the configuration to the global profiler.
    pub fn apply(&self) {
        match self.profiling {
            ProfilingMode::Off => crate::profiling::set_enabled(false),
            ProfilingMode::On => crate::profiling::set_enabled(true),
            ProfilingMode::WithServer => {
                crate::profiling::init_profiling(crate::profiling::ProfilingBackend::PuffinHttp)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfilingMode {
    /// Profiling scopes are disabled
    Off,
    /// Profiling scopes are recorded in-process
    On,
    /// Profiling scopes are recorded and served to external tools such as 'puffin_viewer'
    WithServer,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_disables_profiling() {
        let config = Config::default();
        assert_eq!(config.profiling, ProfilingMode::Off);
        assert_ne!(config, Config { profiling: ProfilingMode::WithServer });
    }
}
