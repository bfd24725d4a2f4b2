//! Capturing a sample window with `sar` and reading it back with `sadf`.
//! [`ReportAcquirer`] is the entry point, [`Report`] is what it hands out.

use crate::Record;
use std::{
    ffi::OsString,
    ops::Deref,
    path::{Path, PathBuf},
    process::{ExitStatus, Stdio},
};
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, BufReader},
    process::Command,
};
use tracing::{debug, instrument, trace, warn};

/// Arguments shared by both tools: one sample, one second apart.
const INTERVAL_ARG: &str = "1";
const COUNT_ARG: &str = "1";
/// Select every activity class.
const ALL_ACTIVITIES: &str = "-A";

/// Why a cycle was abandoned.
#[derive(Debug, thiserror::Error)]
pub enum AcquireError {
    /// The sample window file could not be created.
    #[error("failed to create sample window file")]
    TempFile(#[source] std::io::Error),

    /// A tool could not be started.
    #[error("failed to start {tool}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    /// A tool ran but reported failure.
    #[error("{tool} exited with {status}")]
    Exit { tool: String, status: ExitStatus },

    /// The formatter's stdout pipe was not available after spawning.
    #[error("{tool} stdout was not captured")]
    Pipe { tool: String },

    /// Reading the formatter's output failed.
    #[error("failed to read report")]
    Read(#[source] std::io::Error),

    /// A record did not have as many fields as the first one.
    #[error("record on line {line} has {found} fields, expected {expected}")]
    RaggedRecord {
        line: usize,
        expected: usize,
        found: usize,
    },

    /// Waiting for the formatter to exit failed.
    #[error("failed to wait for {tool}")]
    Wait {
        tool: String,
        #[source]
        source: std::io::Error,
    },
}

/// The capture file for a single cycle.
///
/// The file is removed when this is dropped, whatever happened in between.
/// Removal errors are logged and otherwise ignored.
#[derive(Debug)]
pub struct SampleWindow {
    path: PathBuf,
}

impl SampleWindow {
    /// Create a new, empty, uniquely named file in the temp directory.
    pub fn create() -> Result<Self, AcquireError> {
        let path = tempfile::Builder::new()
            .prefix("sar")
            .tempfile()
            .map_err(AcquireError::TempFile)?
            // `sar` opens the file itself, only the path is kept.
            .into_temp_path()
            .keep()
            .map_err(|err| AcquireError::TempFile(err.error))?;
        trace!(path = %path.display(), "Created sample window");
        Ok(Self { path })
    }

    /// Location of the capture file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for SampleWindow {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => trace!(path = %self.path.display(), "Removed sample window"),
            Err(err) => warn!(path = %self.path.display(), %err, "Failed to remove sample window"),
        }
    }
}

/// The records of one cycle, together with the span of that cycle.
///
/// Like any unit of work in this crate, a report carries the span it was
/// created in, so later processing can be attributed to the right cycle.
#[derive(Debug)]
pub struct Report {
    records: Vec<Record>,

    span: tracing::Span,
}

impl Deref for Report {
    type Target = [Record];

    fn deref(&self) -> &Self::Target {
        &self.records
    }
}

impl Report {
    /// Wrap records read during the cycle of `span`.
    pub fn new(records: Vec<Record>, span: tracing::Span) -> Self {
        Self { records, span }
    }

    /// Get the tracing span associated with this report.
    pub fn span(&self) -> &tracing::Span {
        &self.span
    }
}

impl Drop for Report {
    fn drop(&mut self) {
        self.span.in_scope(|| {
            trace!(records = self.records.len(), "Dropping report");
        });
    }
}

/// Runs the sampler and formatter for one cycle.
#[derive(Debug, Clone)]
pub struct ReportAcquirer {
    sar: OsString,
    sadf: OsString,
}

impl Default for ReportAcquirer {
    fn default() -> Self {
        Self::new("sar", "sadf")
    }
}

impl ReportAcquirer {
    /// Use the given sampler and formatter executables.
    pub fn new(sar: impl Into<OsString>, sadf: impl Into<OsString>) -> Self {
        Self {
            sar: sar.into(),
            sadf: sadf.into(),
        }
    }

    /// Capture one sample window and return every record `sadf` prints for
    /// it. The capture file is gone by the time this returns.
    #[instrument(skip(self), name = "Acquiring records")]
    pub async fn acquire_records(&self) -> Result<Vec<Record>, AcquireError> {
        let window = SampleWindow::create()?;
        self.capture(window.path()).await?;
        self.format(window.path()).await
    }

    async fn capture(&self, path: &Path) -> Result<(), AcquireError> {
        let tool = self.sar.to_string_lossy().into_owned();

        let child = Command::new(&self.sar)
            .args([INTERVAL_ARG, COUNT_ARG, ALL_ACTIVITIES, "-o"])
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| AcquireError::Spawn {
                tool: tool.clone(),
                source,
            })?;
        let output = child
            .wait_with_output()
            .await
            .map_err(|source| AcquireError::Wait {
                tool: tool.clone(),
                source,
            })?;

        if !output.status.success() {
            debug!(
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "Sampler failed"
            );
            return Err(AcquireError::Exit {
                tool,
                status: output.status,
            });
        }

        debug!("Captured sample window");
        Ok(())
    }

    async fn format(&self, path: &Path) -> Result<Vec<Record>, AcquireError> {
        let tool = self.sadf.to_string_lossy().into_owned();

        // stdout must be piped before spawning, or a fast tool's output is
        // lost.
        let mut child = Command::new(&self.sadf)
            .args([INTERVAL_ARG, COUNT_ARG, "--", ALL_ACTIVITIES])
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| AcquireError::Spawn {
                tool: tool.clone(),
                source,
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AcquireError::Pipe { tool: tool.clone() })?;

        let records = read_records(BufReader::new(stdout)).await?;

        let status = child
            .wait()
            .await
            .map_err(|source| AcquireError::Wait {
                tool: tool.clone(),
                source,
            })?;
        if !status.success() {
            return Err(AcquireError::Exit { tool, status });
        }

        debug!(records = records.len(), "Formatted sample window");
        Ok(records)
    }
}

/// Read tab-delimited records until end of stream.
///
/// Blank lines are skipped. Every record must be as wide as the first.
/// Bytes that are not UTF-8, e.g. in a mount point name, are replaced rather
/// than failing the whole report.
pub async fn read_records<R>(reader: R) -> Result<Vec<Record>, AcquireError>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.split(b'\n');
    let mut records = Vec::new();
    let mut width = None;
    let mut line_no = 0;

    while let Some(mut line) = lines.next_segment().await.map_err(AcquireError::Read)? {
        line_no += 1;
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        if line.is_empty() {
            continue;
        }

        let record = Record::from_line(&String::from_utf8_lossy(&line));
        let expected = *width.get_or_insert(record.len());
        if record.len() != expected {
            return Err(AcquireError::RaggedRecord {
                line: line_no,
                expected,
                found: record.len(),
            });
        }
        records.push(record);
    }

    Ok(records)
}
