//! Output sinks.
//!
//! # Responsibilities
//! - Resolve sink identifiers (`stdout`, `stderr`, paths, `scheme://...`)
//! - Serialize writes per sink
//! - Flush every sink on `sync`
//!
//! # Design Decisions
//! - File sinks are unbuffered: a record is on disk (modulo OS cache) once written,
//!   `sync` adds an fsync
//! - Standard streams are only flushed on `sync`; fsync on a tty or pipe is not an error
//! - Custom schemes are resolved through a process-wide registry

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use dashmap::DashMap;

use super::error::LoggerError;

/// Destination for encoded records.
pub trait Sink: Send + Sync {
    /// Identifier used in error messages.
    fn name(&self) -> &str;

    /// Write one encoded record (including its trailing newline).
    fn write(&self, buf: &[u8]) -> io::Result<()>;

    /// Flush anything buffered to the underlying destination.
    fn sync(&self) -> io::Result<()>;
}

/// Builds a sink from the part of the identifier after `scheme://`.
pub type SinkFactory = Arc<dyn Fn(&str) -> io::Result<Arc<dyn Sink>> + Send + Sync>;

fn registry() -> &'static DashMap<String, SinkFactory> {
    static REGISTRY: OnceLock<DashMap<String, SinkFactory>> = OnceLock::new();
    REGISTRY.get_or_init(DashMap::new)
}

/// Register a factory for `scheme://` sink identifiers.
///
/// Schemes are case-insensitive. `file` is built in and cannot be replaced.
pub fn register_sink(scheme: &str, factory: SinkFactory) -> Result<(), LoggerError> {
    let scheme = normalize_scheme(scheme)?;
    if scheme == "file" {
        return Err(LoggerError::SchemeRegistered(scheme));
    }

    match registry().entry(scheme) {
        dashmap::mapref::entry::Entry::Occupied(e) => {
            Err(LoggerError::SchemeRegistered(e.key().clone()))
        }
        dashmap::mapref::entry::Entry::Vacant(e) => {
            e.insert(factory);
            Ok(())
        }
    }
}

/// Whether `scheme` can currently be resolved.
pub fn is_known_scheme(scheme: &str) -> bool {
    let scheme = scheme.to_ascii_lowercase();
    scheme == "file" || registry().contains_key(&scheme)
}

fn normalize_scheme(scheme: &str) -> Result<String, LoggerError> {
    let mut chars = scheme.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    if !valid {
        return Err(LoggerError::InvalidScheme(scheme.to_string()));
    }
    Ok(scheme.to_ascii_lowercase())
}

/// Split `scheme://rest`. Plain paths (including Windows drive paths) have no scheme.
pub(crate) fn split_scheme(path: &str) -> Option<(&str, &str)> {
    path.split_once("://")
}

/// Resolve one sink identifier.
pub fn open_sink(path: &str) -> Result<Arc<dyn Sink>, LoggerError> {
    match path {
        "stdout" => return Ok(Arc::new(StdStream::Stdout)),
        "stderr" => return Ok(Arc::new(StdStream::Stderr)),
        _ => {}
    }

    let Some((scheme, rest)) = split_scheme(path) else {
        return open_file(path, path);
    };

    let scheme_lc = scheme.to_ascii_lowercase();
    if scheme_lc == "file" {
        return open_file(path, rest);
    }

    let factory = registry()
        .get(&scheme_lc)
        .map(|f| Arc::clone(f.value()))
        .ok_or_else(|| LoggerError::UnknownScheme {
            scheme: scheme.to_string(),
            path: path.to_string(),
        })?;

    factory(rest).map_err(|source| LoggerError::OpenSink {
        path: path.to_string(),
        source,
    })
}

fn open_file(id: &str, path: &str) -> Result<Arc<dyn Sink>, LoggerError> {
    FileSink::open(path)
        .map(|s| Arc::new(s) as Arc<dyn Sink>)
        .map_err(|source| LoggerError::OpenSink {
            path: id.to_string(),
            source,
        })
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Standard output or standard error.
#[derive(Debug, Clone, Copy)]
pub enum StdStream {
    Stdout,
    Stderr,
}

impl Sink for StdStream {
    fn name(&self) -> &str {
        match self {
            StdStream::Stdout => "stdout",
            StdStream::Stderr => "stderr",
        }
    }

    fn write(&self, buf: &[u8]) -> io::Result<()> {
        match self {
            StdStream::Stdout => io::stdout().lock().write_all(buf),
            StdStream::Stderr => io::stderr().lock().write_all(buf),
        }
    }

    fn sync(&self) -> io::Result<()> {
        match self {
            StdStream::Stdout => io::stdout().flush(),
            StdStream::Stderr => io::stderr().flush(),
        }
    }
}

/// Append-only file.
#[derive(Debug)]
pub struct FileSink {
    name: String,
    file: Mutex<File>,
}

impl FileSink {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            name: path.display().to_string(),
            file: Mutex::new(file),
        })
    }
}

impl Sink for FileSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn write(&self, buf: &[u8]) -> io::Result<()> {
        lock(&self.file).write_all(buf)
    }

    fn sync(&self) -> io::Result<()> {
        let mut file = lock(&self.file);
        file.flush()?;
        file.sync_all()
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    buf: Vec<u8>,
    closed: bool,
    syncs: usize,
}

/// In-memory sink. Clones share the same buffer.
///
/// Useful for observing output: register it under a scheme and reference it from
/// `output_paths`.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    state: Arc<Mutex<MemoryState>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Factory handing out this sink for any `scheme://...` identifier.
    pub fn factory(&self) -> SinkFactory {
        let sink = self.clone();
        Arc::new(move |_: &str| Ok(Arc::new(sink.clone()) as Arc<dyn Sink>))
    }

    /// Everything written so far.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&lock(&self.state).buf).into_owned()
    }

    /// Written records, one per line.
    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_owned).collect()
    }

    /// Number of successful syncs.
    pub fn sync_count(&self) -> usize {
        lock(&self.state).syncs
    }

    /// Invalidate the sink; later writes and syncs fail.
    pub fn close(&self) {
        lock(&self.state).closed = true;
    }

    fn closed_error() -> io::Error {
        io::Error::new(io::ErrorKind::BrokenPipe, "sink already closed")
    }
}

impl Sink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    fn write(&self, buf: &[u8]) -> io::Result<()> {
        let mut state = lock(&self.state);
        if state.closed {
            return Err(Self::closed_error());
        }
        state.buf.extend_from_slice(buf);
        Ok(())
    }

    fn sync(&self) -> io::Result<()> {
        let mut state = lock(&self.state);
        if state.closed {
            return Err(Self::closed_error());
        }
        state.syncs += 1;
        Ok(())
    }
}

/// The resolved output and error sinks of one logger tree.
pub(crate) struct SinkSet {
    outputs: Vec<Arc<dyn Sink>>,
    errors: Vec<Arc<dyn Sink>>,
}

impl SinkSet {
    pub(crate) fn open(outputs: &[String], errors: &[String]) -> Result<Self, LoggerError> {
        Ok(Self {
            outputs: open_all(outputs)?,
            errors: open_all(errors)?,
        })
    }

    /// Write a record to every output sink. Failures go to the error sinks.
    pub(crate) fn write(&self, buf: &[u8]) {
        for sink in &self.outputs {
            if let Err(e) = sink.write(buf) {
                self.report(&format!("write error: {}: {}", sink.name(), e));
            }
        }
    }

    /// Report an internal error on the error sinks.
    pub(crate) fn report(&self, message: &str) {
        let ts = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
        let line = format!("{} {}\n", ts, message);
        for sink in &self.errors {
            // Nowhere left to report a failing error sink.
            let _ = sink.write(line.as_bytes());
        }
    }

    pub(crate) fn sync(&self) -> Result<(), LoggerError> {
        let failures = self
            .outputs
            .iter()
            .chain(&self.errors)
            .filter_map(|sink| {
                sink.sync().err().map(|source| LoggerError::Sync {
                    sink: sink.name().to_string(),
                    source,
                })
            })
            .collect();
        LoggerError::combine(failures)
    }
}

fn open_all(paths: &[String]) -> Result<Vec<Arc<dyn Sink>>, LoggerError> {
    paths.iter().map(|p| open_sink(p)).collect()
}
