//! Logging, metrics dump and optional continuous profiling for the binaries.

use anyhow::Context;
use pyroscope::pyroscope::PyroscopeAgentRunning;
use pyroscope::PyroscopeAgent;
use pyroscope_pprofrs::{pprof_backend, PprofConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter, e.g. `PLATES_LOG=plate_canon=debug`.
pub const LOG_ENV: &str = "PLATES_LOG";

/// Installs the global subscriber. Logs go to stderr so that the report can
/// be written to stdout.
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Writes the Prometheus text exposition of the pipeline metrics to stderr.
pub fn dump_metrics() -> anyhow::Result<()> {
    let text = plate_canon::metrics::gather_text().context("cannot render metrics")?;
    eprintln!("{text}");
    Ok(())
}

/// Running Pyroscope agent, stopped on [`Profiler::stop`].
pub struct Profiler {
    agent: Option<PyroscopeAgent<PyroscopeAgentRunning>>,
}

impl Profiler {
    /// Starts profiling when a server URL is given, does nothing otherwise.
    pub fn start(url: Option<&str>, application: &str) -> anyhow::Result<Self> {
        let Some(url) = url else {
            return Ok(Self { agent: None });
        };

        let agent = PyroscopeAgent::builder(url, application)
            .backend(pprof_backend(PprofConfig::new().sample_rate(100)))
            .build()
            .context("cannot build pyroscope agent")?;
        let agent = agent.start().context("cannot start pyroscope agent")?;
        info!(url, application, "profiling started");
        Ok(Self { agent: Some(agent) })
    }

    pub fn stop(mut self) {
        let Some(agent) = self.agent.take() else {
            return;
        };
        match agent.stop() {
            Ok(ready) => ready.shutdown(),
            Err(e) => warn!(error = %e, "cannot stop pyroscope agent"),
        }
    }
}
