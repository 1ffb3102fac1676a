//! Request, response and error log channels.
//!
//! # Responsibilities
//! - Own the three channel destinations opened once at startup
//! - Prefix every line with the channel name, a timestamp and the source
//!   `file:line` of the call that produced it
//! - Mirror each channel to the console (stdout, or stderr for errors)
//!
//! # Design Decisions
//! - Files are opened in append mode; one `write_all` per line under a
//!   per-channel lock, so concurrent requests interleave whole lines only
//! - A failed write is reported through `tracing` and otherwise dropped
//! - The sink is injected as `Arc<dyn LogSink>` so tests can read lines back

use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::panic::Location;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Local};
use thiserror::Error;

use crate::config::ObservabilityConfig;

/// One of the three independent log destinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Request,
    Response,
    Error,
}

impl Channel {
    /// Prefix written at the start of every line.
    pub fn prefix(self) -> &'static str {
        match self {
            Channel::Request => "REQUEST",
            Channel::Response => "RESPONSE",
            Channel::Error => "ERROR",
        }
    }

    /// File name inside the log directory.
    pub fn file_name(self) -> &'static str {
        match self {
            Channel::Request => "request.log",
            Channel::Response => "response.log",
            Channel::Error => "error.log",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Request => f.write_str("request"),
            Channel::Response => f.write_str("response"),
            Channel::Error => f.write_str("error"),
        }
    }
}

/// Errors raised while opening the log channels.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to create log directory {}: {source}", .path.display())]
    CreateDir { path: PathBuf, source: io::Error },

    #[error("failed to open {channel} log file {}: {source}", .path.display())]
    Open {
        channel: Channel,
        path: PathBuf,
        source: io::Error,
    },
}

/// Destination for channel messages.
pub trait LogSink: Send + Sync {
    /// Record one message emitted at `source`. Never fails from the
    /// caller's point of view.
    fn write(&self, channel: Channel, source: &Location<'_>, message: &str);
}

/// Render a message as a complete log line.
pub fn format_line(
    channel: Channel,
    at: DateTime<Local>,
    source: &Location<'_>,
    message: &str,
) -> String {
    let file = Path::new(source.file())
        .file_name()
        .map_or_else(|| source.file().into(), |name| name.to_string_lossy());
    let mut line = format!(
        "{}: {} {}:{}: {}",
        channel.prefix(),
        at.format("%Y/%m/%d %H:%M:%S"),
        file,
        source.line(),
        message
    );
    if !line.ends_with('\n') {
        line.push('\n');
    }
    line
}

struct ChannelFile {
    path: PathBuf,
    file: Mutex<File>,
}

/// Production sink: one append-only file per channel plus a console mirror.
pub struct FileSink {
    request: ChannelFile,
    response: ChannelFile,
    error: ChannelFile,
    console: bool,
}

impl FileSink {
    /// Create the log directory if needed and open all three channel files.
    pub fn open(dir: &Path, console: bool) -> Result<Self, SinkError> {
        fs::create_dir_all(dir).map_err(|source| SinkError::CreateDir {
            path: dir.to_path_buf(),
            source,
        })?;

        let open = |channel: Channel| -> Result<ChannelFile, SinkError> {
            let path = dir.join(channel.file_name());
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(|source| SinkError::Open {
                    channel,
                    path: path.clone(),
                    source,
                })?;
            Ok(ChannelFile {
                path,
                file: Mutex::new(file),
            })
        };

        let sink = Self {
            request: open(Channel::Request)?,
            response: open(Channel::Response)?,
            error: open(Channel::Error)?,
            console,
        };

        tracing::info!(log_dir = %dir.display(), console, "Log channels opened");
        Ok(sink)
    }

    /// Open the sink described by the observability config.
    pub fn from_config(config: &ObservabilityConfig) -> Result<Self, SinkError> {
        Self::open(&config.log_dir, config.console)
    }

    fn channel(&self, channel: Channel) -> &ChannelFile {
        match channel {
            Channel::Request => &self.request,
            Channel::Response => &self.response,
            Channel::Error => &self.error,
        }
    }
}

impl LogSink for FileSink {
    fn write(&self, channel: Channel, source: &Location<'_>, message: &str) {
        let line = format_line(channel, Local::now(), source, message);
        let target = self.channel(channel);

        let persisted = match target.file.lock() {
            Ok(mut file) => file.write_all(line.as_bytes()),
            Err(poisoned) => poisoned.into_inner().write_all(line.as_bytes()),
        };
        if let Err(e) = persisted {
            tracing::warn!(%channel, path = %target.path.display(), error = %e, "Failed to persist log line");
        }

        if self.console {
            let mirrored = match channel {
                Channel::Error => io::stderr().lock().write_all(line.as_bytes()),
                Channel::Request | Channel::Response => io::stdout().lock().write_all(line.as_bytes()),
            };
            if let Err(e) = mirrored {
                tracing::warn!(%channel, error = %e, "Failed to mirror log line to console");
            }
        }
    }
}

/// In-memory sink keeping raw messages per channel. Source locations are
/// dropped.
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Mutex<Vec<(Channel, String)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages written to `channel`, in write order.
    pub fn lines(&self, channel: Channel) -> Vec<String> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .filter(|(c, _)| *c == channel)
            .map(|(_, message)| message.clone())
            .collect()
    }
}

impl LogSink for MemorySink {
    fn write(&self, channel: Channel, _source: &Location<'_>, message: &str) {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((channel, message.to_string()));
    }
}

/// Cloneable handle to the process-wide sink, passed to every handler.
#[derive(Clone)]
pub struct ProxyLogs {
    sink: Arc<dyn LogSink>,
}

impl ProxyLogs {
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self { sink }
    }

    #[track_caller]
    pub fn write(&self, channel: Channel, message: impl fmt::Display) {
        self.sink
            .write(channel, Location::caller(), &message.to_string());
    }

    #[track_caller]
    pub fn request(&self, message: impl fmt::Display) {
        self.write(Channel::Request, message);
    }

    #[track_caller]
    pub fn response(&self, message: impl fmt::Display) {
        self.write(Channel::Response, message);
    }

    #[track_caller]
    pub fn error(&self, message: impl fmt::Display) {
        self.write(Channel::Error, message);
    }
}

impl fmt::Debug for ProxyLogs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyLogs").finish_non_exhaustive()
    }
}
