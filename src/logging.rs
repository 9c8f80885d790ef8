use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::mpsc::{self, Receiver, Sender, SyncSender};
use std::thread;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub component: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl LogEntry {
    pub fn new(level: LogLevel, component: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            component: component.into(),
            message: message.into(),
            request_id: None,
        }
    }

    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(id.into());
        self
    }
}

enum Command {
    Write(LogEntry),
    Flush(SyncSender<()>),
}

/// Append-only JSONL relay log. Entries are handed to a writer thread, so logging
/// from a request never blocks on the file.
#[derive(Clone)]
pub struct SharedLogger {
    tx: Sender<Command>,
}

impl SharedLogger {
    pub fn new(file_path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file_path = file_path.as_ref();

        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(file_path)?;

        let (tx, rx) = mpsc::channel();
        thread::Builder::new()
            .name("relay-log".to_string())
            .spawn(move || write_loop(rx, BufWriter::new(file)))?;

        Ok(Self { tx })
    }

    pub fn log(&self, entry: LogEntry) {
        // The writer only goes away at process exit.
        let _ = self.tx.send(Command::Write(entry));
    }

    pub fn info(&self, component: impl Into<String>, message: impl Into<String>) {
        self.log(LogEntry::new(LogLevel::Info, component, message));
    }

    pub fn warn(&self, component: impl Into<String>, message: impl Into<String>) {
        self.log(LogEntry::new(LogLevel::Warn, component, message));
    }

    pub fn error(&self, component: impl Into<String>, message: impl Into<String>) {
        self.log(LogEntry::new(LogLevel::Error, component, message));
    }

    /// A handle that tags every entry with a fresh request id.
    pub fn for_request(&self) -> RequestLogger {
        RequestLogger {
            inner: self.clone(),
            request_id: uuid::Uuid::new_v4().simple().to_string(),
        }
    }

    /// Block until every entry sent so far is on disk.
    pub fn flush(&self) {
        let (ack_tx, ack_rx) = mpsc::sync_channel(1);
        if self.tx.send(Command::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.recv();
        }
    }
}

fn write_loop(rx: Receiver<Command>, mut writer: BufWriter<File>) {
    while let Ok(first) = rx.recv() {
        let mut next = Some(first);
        while let Some(command) = next {
            match command {
                Command::Write(entry) => {
                    if let Ok(json) = serde_json::to_string(&entry) {
                        let _ = writeln!(writer, "{}", json);
                    }
                }
                Command::Flush(ack) => {
                    let _ = writer.flush();
                    let _ = ack.send(());
                }
            }
            next = rx.try_recv().ok();
        }
        let _ = writer.flush();
    }
}

/// Logger scoped to one relay chain.
#[derive(Clone)]
pub struct RequestLogger {
    inner: SharedLogger,
    request_id: String,
}

impl RequestLogger {
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    fn emit(&self, level: LogLevel, component: &str, message: String) {
        match level {
            LogLevel::Debug => tracing::debug!(request_id = %self.request_id, component, "{message}"),
            LogLevel::Info => tracing::info!(request_id = %self.request_id, component, "{message}"),
            LogLevel::Warn => tracing::warn!(request_id = %self.request_id, component, "{message}"),
            LogLevel::Error => tracing::error!(request_id = %self.request_id, component, "{message}"),
        }
        self.inner
            .log(LogEntry::new(level, component, message).with_request_id(&self.request_id));
    }

    pub fn debug(&self, component: &str, message: impl Into<String>) {
        self.emit(LogLevel::Debug, component, message.into());
    }

    pub fn info(&self, component: &str, message: impl Into<String>) {
        self.emit(LogLevel::Info, component, message.into());
    }

    pub fn warn(&self, component: &str, message: impl Into<String>) {
        self.emit(LogLevel::Warn, component, message.into());
    }

    pub fn error(&self, component: &str, message: impl Into<String>) {
        self.emit(LogLevel::Error, component, message.into());
    }
}
