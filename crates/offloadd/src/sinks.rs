//! Destinations for per-batch performance records and per-request data
//! records.
//!
//! Without configured log files both record kinds become structured
//! `tracing` events. With `perf_log` set, performance records are appended as
//! JSON lines; with `data_log` set, data records are appended in the wire
//! framing (handler string, input blob, output blob). Sink failures never
//! reach clients: callers log them and carry on.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::sync::{Arc, Mutex, PoisonError};

use camino::Utf8Path;
use offload_config::Config;
use offload_protocol::{Framed, TransportError};
use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::info;

const PERF_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::perf");
const DATA_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::data");

/// Timing and volume of one handler invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerfRecord {
    /// RFC 3339 UTC time the batch finished.
    pub timestamp: String,
    pub handler: String,
    /// Seconds spent inside the handler.
    pub seconds: f64,
    pub input_bytes: usize,
    pub output_bytes: usize,
    pub batch_size: usize,
}

impl PerfRecord {
    /// Builds a record stamped with the current time.
    pub fn now(
        handler: impl Into<String>,
        seconds: f64,
        input_bytes: usize,
        output_bytes: usize,
        batch_size: usize,
    ) -> Self {
        let timestamp = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_default();
        Self {
            timestamp,
            handler: handler.into(),
            seconds,
            input_bytes,
            output_bytes,
            batch_size,
        }
    }
}

/// One completed request.
#[derive(Debug, Clone, Copy)]
pub struct DataRecord<'a> {
    pub handler: &'a str,
    pub input: &'a [u8],
    pub output: &'a [u8],
}

/// Errors raised while opening or writing a sink.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The log file could not be opened for appending.
    #[error("failed to open log file '{path}': {source}")]
    Open {
        path: String,
        #[source]
        source: io::Error,
    },
    /// Writing a record failed.
    #[error("failed to write record: {0}")]
    Io(#[from] io::Error),
    /// A performance record could not be serialised.
    #[error("failed to encode performance record: {0}")]
    Encode(#[from] serde_json::Error),
    /// A data record could not be framed.
    #[error("failed to frame data record: {0}")]
    Frame(#[from] TransportError),
}

/// Receives one record per executed batch.
pub trait PerfSink: Send + Sync {
    /// Records a finished batch.
    ///
    /// # Errors
    ///
    /// Returns a [`SinkError`] when the record cannot be persisted.
    fn record(&self, record: &PerfRecord) -> Result<(), SinkError>;
}

/// Receives one record per successfully completed request.
pub trait DataSink: Send + Sync {
    /// Records a completed request.
    ///
    /// # Errors
    ///
    /// Returns a [`SinkError`] when the record cannot be persisted.
    fn record(&self, record: &DataRecord<'_>) -> Result<(), SinkError>;
}

/// Emits performance records as `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingPerfSink;

impl PerfSink for TracingPerfSink {
    fn record(&self, record: &PerfRecord) -> Result<(), SinkError> {
        info!(
            target: PERF_TARGET,
            handler = %record.handler,
            seconds = record.seconds,
            input_bytes = record.input_bytes,
            output_bytes = record.output_bytes,
            batch_size = record.batch_size,
            "batch executed"
        );
        Ok(())
    }
}

/// Emits data records as `tracing` events carrying sizes only.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDataSink;

impl DataSink for TracingDataSink {
    fn record(&self, record: &DataRecord<'_>) -> Result<(), SinkError> {
        info!(
            target: DATA_TARGET,
            handler = record.handler,
            input_bytes = record.input.len(),
            output_bytes = record.output.len(),
            "request completed"
        );
        Ok(())
    }
}

/// Appends performance records to a file, one JSON object per line.
#[derive(Debug)]
pub struct JsonPerfLog {
    writer: Mutex<BufWriter<File>>,
}

impl JsonPerfLog {
    /// Opens `path` for appending, creating it when absent.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Open`] when the file cannot be opened.
    pub fn open(path: &Utf8Path) -> Result<Self, SinkError> {
        Ok(Self {
            writer: Mutex::new(BufWriter::new(open_append(path)?)),
        })
    }
}

impl PerfSink for JsonPerfLog {
    fn record(&self, record: &PerfRecord) -> Result<(), SinkError> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writer.write_all(&line)?;
        writer.flush()?;
        Ok(())
    }
}

/// Appends data records to a file using the wire framing.
#[derive(Debug)]
pub struct FramedDataLog {
    framed: Mutex<Framed<BufWriter<File>>>,
}

impl FramedDataLog {
    /// Opens `path` for appending, creating it when absent.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Open`] when the file cannot be opened.
    pub fn open(path: &Utf8Path) -> Result<Self, SinkError> {
        Ok(Self {
            framed: Mutex::new(Framed::new(BufWriter::new(open_append(path)?))),
        })
    }
}

impl DataSink for FramedDataLog {
    fn record(&self, record: &DataRecord<'_>) -> Result<(), SinkError> {
        let mut framed = self.framed.lock().unwrap_or_else(PoisonError::into_inner);
        framed.write_string(record.handler)?;
        framed.write_blob(record.input)?;
        framed.write_blob(record.output)?;
        framed.flush()?;
        Ok(())
    }
}

fn open_append(path: &Utf8Path) -> Result<File, SinkError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path.as_std_path())
        .map_err(|source| SinkError::Open {
            path: path.to_string(),
            source,
        })
}

/// Builds the performance sink selected by `config`.
///
/// # Errors
///
/// Returns [`SinkError::Open`] when the configured log file cannot be opened.
pub fn perf_sink(config: &Config) -> Result<Arc<dyn PerfSink>, SinkError> {
    let sink: Arc<dyn PerfSink> = match config.perf_log() {
        Some(path) => Arc::new(JsonPerfLog::open(path)?),
        None => Arc::new(TracingPerfSink),
    };
    Ok(sink)
}

/// Builds the data sink selected by `config`.
///
/// # Errors
///
/// Returns [`SinkError::Open`] when the configured log file cannot be opened.
pub fn data_sink(config: &Config) -> Result<Arc<dyn DataSink>, SinkError> {
    let sink: Arc<dyn DataSink> = match config.data_log() {
        Some(path) => Arc::new(FramedDataLog::open(path)?),
        None => Arc::new(TracingDataSink),
    };
    Ok(sink)
}
