//! Log output for action runs. Workflow commands (`::error::`) go to stdout,
//! tracing events go to stderr so the two never interleave in a step log.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum LogFormat {
    /// Compact lines for the step log.
    #[default]
    Text,
    /// JSON lines for runners that ship logs to a collector.
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub format: LogFormat,
    pub directive: &'static str,
    /// The hosted runner stamps every line itself.
    pub timestamps: bool,
}

impl LogSettings {
    /// `RUNNER_DEBUG=1` is set when a workflow is re-run with debug logging.
    pub fn resolve(format: LogFormat, verbose: bool, env: impl Fn(&str) -> Option<String>) -> Self {
        let debug = verbose || env("RUNNER_DEBUG").as_deref() == Some("1");
        let on_runner = env("GITHUB_ACTIONS").as_deref() == Some("true");
        Self {
            format,
            directive: if debug { "ci_actions=debug,info" } else { "ci_actions=info" },
            timestamps: !on_runner || format == LogFormat::Json,
        }
    }

    pub fn from_env(format: LogFormat, verbose: bool) -> Self {
        Self::resolve(format, verbose, |key| std::env::var(key).ok())
    }
}

pub fn init_logger(settings: &LogSettings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(settings.directive));

    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_file(false)
        .with_line_number(false);

    let layer = match (settings.format, settings.timestamps) {
        (LogFormat::Json, _) => layer.json().boxed(),
        (LogFormat::Text, true) => layer.compact().boxed(),
        (LogFormat::Text, false) => layer.without_time().compact().boxed(),
    };

    tracing_subscriber::registry().with(filter).with(layer).init();
}
