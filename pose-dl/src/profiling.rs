//! Per-stage timing of sample pipelines, compiled out unless the `profiling`
//! feature is enabled.

use crate::common::*;
#[cfg(feature = "profiling")]
use dashmap::DashMap;

#[cfg(feature = "profiling")]
lazy_static! {
    static ref PROFILING_CONFIG: ProfilingConfig = {
        match envy::prefixed("POSEDL_").from_env() {
            Ok(config) => config,
            Err(err) => {
                warn!("invalid POSEDL_ profiling variables, use defaults: {:?}", err);
                Default::default()
            }
        }
    };
    static ref SAMPLE_COUNTS: DashMap<&'static str, usize> = DashMap::new();
}

/// Controls which pipelines are reported.
///
/// Read from `POSEDL_PROFILING_WHITELIST` (comma separated pipeline names)
/// and `POSEDL_PROFILING_SLOW_MILLIS` when the `profiling` feature is on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfilingConfig {
    pub profiling_whitelist: Option<HashSet<String>>,
    /// Samples that finish faster than this are not reported.
    #[serde(default)]
    pub profiling_slow_millis: u64,
}

impl ProfilingConfig {
    pub fn should_report(&self, pipeline: &str, total: Duration) -> bool {
        let listed = self
            .profiling_whitelist
            .as_ref()
            .map(|whitelist| whitelist.contains(pipeline))
            .unwrap_or(true);
        listed && total >= Duration::from_millis(self.profiling_slow_millis)
    }
}

/// Splits the time spent on one sample into named stages.
#[cfg(feature = "profiling")]
#[derive(Debug)]
pub struct StageTimer {
    pipeline: &'static str,
    start: Instant,
    last: Instant,
    stages: Vec<(&'static str, Duration)>,
}

#[cfg(not(feature = "profiling"))]
#[derive(Debug)]
pub struct StageTimer;

impl StageTimer {
    pub fn new(pipeline: &'static str) -> Self {
        #[cfg(feature = "profiling")]
        {
            let now = Instant::now();
            Self {
                pipeline,
                start: now,
                last: now,
                stages: vec![],
            }
        }

        #[cfg(not(feature = "profiling"))]
        {
            let _ = pipeline;
            Self
        }
    }

    /// Closes the stage that ended now.
    pub fn stage(&mut self, name: &'static str) {
        #[cfg(feature = "profiling")]
        {
            let now = Instant::now();
            self.stages.push((name, now - self.last));
            self.last = now;
        }

        #[cfg(not(feature = "profiling"))]
        let _ = name;
    }

    /// Logs the stage durations of a sample if the pipeline is reported.
    pub fn finish(self) {
        #[cfg(feature = "profiling")]
        {
            let total = self.start.elapsed();
            let count = {
                let mut count = SAMPLE_COUNTS.entry(self.pipeline).or_insert(0);
                *count += 1;
                *count
            };

            if PROFILING_CONFIG.should_report(self.pipeline, total) {
                let stages = self
                    .stages
                    .iter()
                    .map(|(name, elapsed)| format!("{} {:?}", name, elapsed))
                    .join(", ");
                info!(
                    "'{}' sample #{} took {:?}: {}",
                    self.pipeline, count, total, stages
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_filter() {
        let config = ProfilingConfig::default();
        assert!(config.should_report("mppe", Duration::ZERO));

        let config = ProfilingConfig {
            profiling_whitelist: Some(["full_pipeline".to_string()].into_iter().collect()),
            profiling_slow_millis: 5,
        };
        assert!(!config.should_report("mppe", Duration::from_millis(10)));
        assert!(!config.should_report("full_pipeline", Duration::from_millis(4)));
        assert!(config.should_report("full_pipeline", Duration::from_millis(5)));
    }

    #[test]
    fn timer_runs_through_stages() {
        let mut timer = StageTimer::new("test");
        timer.stage("first");
        timer.stage("second");
        timer.finish();
    }
}
