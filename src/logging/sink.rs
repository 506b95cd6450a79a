//! Background log sinks: one channel + one consumer task per
//! (sink kind × message kind).
//!
//! # Responsibilities
//! - Decouple log I/O from request dispatch (producers only enqueue)
//! - Console sink: format and write to stdout, fall back to a file on error
//! - Disc sink: append to per-event log files with bounded retry
//! - Terminate every consumer cleanly on `stop()`
//!
//! # Design Decisions
//! - Channels are unbounded; enqueue never blocks regardless of consumer
//!   state
//! - Disc retry handles transient errors only: 5 attempts, 100 ms apart;
//!   permanent errors abort the single write
//! - Consumer state machine: Running → Terminated on cancellation or
//!   channel close; Running → Running (after delay) on transient errors
//! - File naming is pluggable via arc-swap so it can change while serving

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use arc_swap::ArcSwap;
use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::logging::event::LogTarget;
use crate::logging::message::{LogMessage, MessageKind};

/// Attempts per disc write that fails transiently.
pub const MAX_WRITE_ATTEMPTS: u32 = 5;

/// Delay between disc write attempts.
pub const WRITE_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Pause after a console write failure before the loop resumes.
const CONSOLE_ERROR_DELAY: Duration = Duration::from_millis(100);

/// Computes a log file name from (logging path, context, event name).
pub type FileNamer = dyn Fn(&str, &str, &str) -> String + Send + Sync;

/// Errors inside a sink consumer. Never visible to request handling.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("transient I/O error persisted after {attempts} attempts: {source}")]
    TransientIo {
        attempts: u32,
        source: std::io::Error,
    },

    #[error("permanent I/O error: {0}")]
    PermanentIo(std::io::Error),

    #[error("log channel closed")]
    ChannelClosed,

    #[error("logging cancelled")]
    Cancelled,
}

/// Default file naming: `<context>_<event>_<year>-<month>.log`.
pub fn default_file_namer(_path: &str, context: &str, event: &str) -> String {
    format!("{}_{}_{}.log", context, event, Utc::now().format("%Y-%m"))
}

/// Shared state of the disc sink consumers.
struct DiscShared {
    dir: PathBuf,
    namer: ArcSwap<Box<FileNamer>>,
}

/// Fan-out point for all log sinks.
///
/// Producers call [`SinkHub::enqueue`]; every write happens on one of the
/// dedicated consumer tasks spawned at construction.
pub struct SinkHub {
    console_request: mpsc::UnboundedSender<LogMessage>,
    console_response: mpsc::UnboundedSender<LogMessage>,
    disc_request: mpsc::UnboundedSender<LogMessage>,
    disc_response: mpsc::UnboundedSender<LogMessage>,

    /// Pluggable transports for targets the hub does not write itself
    /// (network, SSE). Absent transports drop their messages.
    transports: dashmap::DashMap<LogTarget, mpsc::UnboundedSender<LogMessage>>,

    disc: Arc<DiscShared>,
    cancel: CancellationToken,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl SinkHub {
    /// Spawn the four consumer tasks and return the hub.
    ///
    /// `log_dir` receives disc sink files and the console fallback file.
    pub fn start(log_dir: impl Into<PathBuf>) -> Arc<Self> {
        let dir = log_dir.into();
        let disc = Arc::new(DiscShared {
            dir: dir.clone(),
            namer: ArcSwap::from_pointee(Box::new(default_file_namer) as Box<FileNamer>),
        });
        let cancel = CancellationToken::new();
        let fallback = dir.join("console-fallback.log");

        let (console_request, crx) = mpsc::unbounded_channel();
        let (console_response, crx2) = mpsc::unbounded_channel();
        let (disc_request, drx) = mpsc::unbounded_channel();
        let (disc_response, drx2) = mpsc::unbounded_channel();

        let workers = vec![
            tokio::spawn(console_loop(
                MessageKind::Request,
                crx,
                cancel.clone(),
                fallback.clone(),
            )),
            tokio::spawn(console_loop(
                MessageKind::Response,
                crx2,
                cancel.clone(),
                fallback,
            )),
            tokio::spawn(disc_loop(
                MessageKind::Request,
                drx,
                cancel.clone(),
                disc.clone(),
            )),
            tokio::spawn(disc_loop(
                MessageKind::Response,
                drx2,
                cancel.clone(),
                disc.clone(),
            )),
        ];

        Arc::new(Self {
            console_request,
            console_response,
            disc_request,
            disc_response,
            transports: dashmap::DashMap::new(),
            disc,
            cancel,
            workers: Mutex::new(workers),
        })
    }

    /// Replace the disc file naming function.
    pub fn set_file_namer<F>(&self, namer: F)
    where
        F: Fn(&str, &str, &str) -> String + Send + Sync + 'static,
    {
        self.disc.namer.store(Arc::new(Box::new(namer) as Box<FileNamer>));
    }

    /// Attach a transport for a target the hub does not write itself.
    /// The caller owns the receiving end and its consumer.
    pub fn set_transport(&self, target: LogTarget, sender: mpsc::UnboundedSender<LogMessage>) {
        self.transports.insert(target, sender);
    }

    /// Enqueue a message for one target. Non-blocking; never awaits I/O.
    /// Failures (closed channel after `stop()`, missing transport) are
    /// intentionally invisible to the producer.
    pub fn enqueue(&self, target: LogTarget, message: LogMessage) {
        let sender = match target {
            LogTarget::Console => match message.kind() {
                MessageKind::Request => &self.console_request,
                MessageKind::Response => &self.console_response,
            },
            LogTarget::Disc => match message.kind() {
                MessageKind::Request => &self.disc_request,
                MessageKind::Response => &self.disc_response,
            },
            LogTarget::Network | LogTarget::ServerSentEvents => {
                if let Some(sender) = self.transports.get(&target) {
                    let _ = sender.send(message);
                } else {
                    tracing::trace!(target = ?target, "No transport attached, message dropped");
                }
                return;
            }
        };
        let _ = sender.send(message);
    }

    /// Signal every consumer loop to terminate. In-flight request dispatch
    /// is not affected.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Wait for all consumer tasks to reach their terminated state.
    pub async fn join(&self) {
        let workers = {
            let mut guard = self
                .workers
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            std::mem::take(&mut *guard)
        };
        for worker in workers {
            let _ = worker.await;
        }
    }
}

/// Console consumer: Running until cancelled or the channel closes;
/// transient write errors divert to the fallback file and the loop
/// continues after a fixed delay.
async fn console_loop(
    kind: MessageKind,
    mut rx: mpsc::UnboundedReceiver<LogMessage>,
    cancel: CancellationToken,
    fallback: PathBuf,
) {
    loop {
        let message = tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!(kind = ?kind, "Console sink cancelled");
                return;
            }
            msg = rx.recv() => match msg {
                Some(m) => m,
                None => {
                    tracing::debug!(kind = ?kind, "Console sink channel closed");
                    return;
                }
            },
        };

        let line = message.format_line();
        if let Err(e) = write_console(&line) {
            // Keep the failure out of stdout; record it and move on.
            let _ = append_line(&fallback, &format!("console write failed: {e}: {line}"));
            tokio::time::sleep(CONSOLE_ERROR_DELAY).await;
        }
    }
}

fn write_console(line: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(line.as_bytes())?;
    stdout.write_all(b"\n")
}

/// Disc consumer: Running until cancelled or the channel closes; each
/// message becomes one append to a file chosen by the pluggable namer.
async fn disc_loop(
    kind: MessageKind,
    mut rx: mpsc::UnboundedReceiver<LogMessage>,
    cancel: CancellationToken,
    shared: Arc<DiscShared>,
) {
    loop {
        let message = tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!(kind = ?kind, "Disc sink cancelled");
                return;
            }
            msg = rx.recv() => match msg {
                Some(m) => m,
                None => {
                    tracing::debug!(kind = ?kind, "Disc sink channel closed");
                    return;
                }
            },
        };

        let namer = shared.namer.load();
        let file = shared
            .dir
            .join((**namer)(&message.path, &message.context, &message.event));
        let line = message.format_line();

        match append_with_retry(
            || append_line(&file, &line),
            MAX_WRITE_ATTEMPTS,
            WRITE_RETRY_DELAY,
        )
        .await
        {
            Ok(()) => metrics::counter!("log_sink_writes_total", "sink" => "disc").increment(1),
            Err(SinkError::TransientIo { attempts, source }) => {
                tracing::trace!(
                    file = %file.display(),
                    attempts,
                    error = %source,
                    "Disc write gave up after transient errors"
                );
                metrics::counter!("log_sink_write_failures_total", "sink" => "disc").increment(1);
            }
            Err(SinkError::PermanentIo(e)) => {
                tracing::trace!(file = %file.display(), error = %e, "Disc write aborted");
                metrics::counter!("log_sink_write_failures_total", "sink" => "disc").increment(1);
            }
            Err(_) => {}
        }
    }
}

fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    file.write_all(line.as_bytes())?;
    file.write_all(b"\n")
}

/// Transient errors are the file-sharing class: another writer briefly
/// holds the file. Everything else aborts immediately.
fn is_transient(error: &std::io::Error) -> bool {
    matches!(
        error.kind(),
        std::io::ErrorKind::WouldBlock
            | std::io::ErrorKind::Interrupted
            | std::io::ErrorKind::TimedOut
    )
}

/// Run `attempt` up to `max_attempts` times, sleeping `delay` between
/// transient failures. Permanent failures return immediately.
pub async fn append_with_retry<F>(
    mut attempt: F,
    max_attempts: u32,
    delay: Duration,
) -> Result<(), SinkError>
where
    F: FnMut() -> std::io::Result<()>,
{
    let mut tries = 0;
    loop {
        tries += 1;
        match attempt() {
            Ok(()) => return Ok(()),
            Err(e) if is_transient(&e) => {
                if tries >= max_attempts {
                    return Err(SinkError::TransientIo {
                        attempts: tries,
                        source: e,
                    });
                }
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(SinkError::PermanentIo(e)),
        }
    }
}
