//! Timing breakdown of a scene build.
//!
//! Every build records one [`BuildStats`] and logs it at info level:
//! ```bash
//! RUST_LOG=guise=info cargo run --example scene_dump
//! ```

use std::time::Duration;

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct BuildStats {
    /// Tearing down the previous tree.
    pub destroy: Duration,
    /// Running the scene script.
    pub script: Duration,
    pub count: Duration,
    pub parse: Duration,
    /// The build walk over the finished tree.
    pub build: Duration,
    pub total: Duration,
    pub widgets: usize,
    pub layouts: usize,
}

impl BuildStats {
    /// Build time without the teardown of the previous tree.
    pub fn build_total(&self) -> Duration {
        self.total.saturating_sub(self.destroy)
    }

    pub fn log(&self) {
        log::info!(
            "[Build Stats] widgets={} layouts={} total={:.3}ms destroy={:.3}ms script={:.3}ms count={:.3}ms parse={:.3}ms build={:.3}ms build_total={:.3}ms",
            self.widgets,
            self.layouts,
            millis(self.total),
            millis(self.destroy),
            millis(self.script),
            millis(self.count),
            millis(self.parse),
            millis(self.build),
            millis(self.build_total()),
        );
    }
}

fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_total_excludes_destroy() {
        let stats = BuildStats {
            destroy: Duration::from_millis(2),
            total: Duration::from_millis(10),
            ..Default::default()
        };
        assert_eq!(stats.build_total(), Duration::from_millis(8));
    }
}
