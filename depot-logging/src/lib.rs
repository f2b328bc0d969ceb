//! Tracing subscriber setup for the depot binaries.
//!
//! Verbosity, format and destination are plain configuration values
//! ([`LogSettings`]) handed to [`init_subscriber`] once at startup. `RUST_LOG`
//! still takes precedence when it is set, which keeps ad-hoc debugging of a
//! single module possible without touching the config file.

use std::{
    io::{self, Write},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::MakeWriter, layer::SubscriberExt, registry::LookupSpan, util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// Output encoding for log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Human,
    Json,
}

/// Where log lines are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Console,
    File,
    Both,
}

impl LogOutput {
    fn console(self) -> bool {
        matches!(self, LogOutput::Console | LogOutput::Both)
    }

    fn file(self) -> bool {
        matches!(self, LogOutput::File | LogOutput::Both)
    }
}

/// Logging configuration, usually the `[logging]` table of the config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// Enables debug level output and per-request logging.
    pub verbose: bool,
    pub format: LogFormat,
    pub output: LogOutput,
    /// Log file location, rolled daily. Only used when `output` includes a file.
    pub file: PathBuf,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            verbose: false,
            format: LogFormat::Human,
            output: LogOutput::Console,
            file: PathBuf::from("depot.log"),
        }
    }
}

impl LogSettings {
    /// Level used when `RUST_LOG` is not set.
    pub fn default_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else {
            "info"
        }
    }
}

// --- Tee writer, used when logging to console and file at once ---
struct Tee<A, B> {
    a: A,
    b: B,
}

impl<A, B> Write for Tee<A, B>
where
    A: Write,
    B: Write,
{
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let res_a = self.a.write(buf);
        let res_b = self.b.write(buf);
        res_a.or(res_b)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.a.flush()?;
        self.b.flush()
    }
}

#[derive(Clone)]
struct MakeTee<A, B> {
    make_a: A,
    make_b: B,
}

impl<'a, A, B, W1, W2> MakeWriter<'a> for MakeTee<A, B>
where
    A: MakeWriter<'a, Writer = W1>,
    B: MakeWriter<'a, Writer = W2>,
    W1: Write + 'a,
    W2: Write + 'a,
{
    type Writer = Tee<W1, W2>;
    fn make_writer(&'a self) -> Self::Writer {
        Tee {
            a: self.make_a.make_writer(),
            b: self.make_b.make_writer(),
        }
    }
}

fn fmt_layer<S, W>(writer: W, format: LogFormat) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'span> LookupSpan<'span>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = tracing_subscriber::fmt::layer().with_writer(writer);
    match format {
        LogFormat::Json => layer.json().boxed(),
        LogFormat::Human => layer.pretty().boxed(),
    }
}

fn env_filter(settings: &LogSettings) -> EnvFilter {
    let mut filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.default_level()));
    for directive in ["tokio=warn", "hyper=warn"] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }
    filter
}

/// Installs the global tracing subscriber described by `settings`.
///
/// The returned guard flushes the non-blocking file writer when dropped and
/// must be held for the lifetime of the process. If a global subscriber is
/// already installed (tests, embedding), the existing one is kept.
pub fn init_subscriber(settings: &LogSettings) -> Option<WorkerGuard> {
    let subscriber = tracing_subscriber::registry().with(env_filter(settings));

    let log_dir = settings
        .file
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let log_filename = settings
        .file
        .file_name()
        .unwrap_or_else(|| "depot.log".as_ref());

    let mut guard: Option<WorkerGuard> = None;
    let result = match (settings.output.console(), settings.output.file()) {
        (true, true) => {
            let file_appender = tracing_appender::rolling::daily(log_dir, log_filename);
            let (non_blocking, file_guard) = tracing_appender::non_blocking(file_appender);
            guard = Some(file_guard);
            let tee_writer = MakeTee {
                make_a: std::io::stdout,
                make_b: non_blocking,
            };
            subscriber
                .with(fmt_layer(tee_writer, settings.format))
                .try_init()
        }
        (false, true) => {
            let file_appender = tracing_appender::rolling::daily(log_dir, log_filename);
            let (non_blocking, file_guard) = tracing_appender::non_blocking(file_appender);
            guard = Some(file_guard);
            subscriber
                .with(fmt_layer(non_blocking, settings.format))
                .try_init()
        }
        _ => subscriber
            .with(fmt_layer(std::io::stdout, settings.format))
            .try_init(),
    };

    if let Err(e) = result {
        tracing::debug!(error = %e, "Global subscriber already installed");
    }

    guard
}
