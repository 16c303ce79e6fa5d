//! Structured logging facade.
//!
//! # Responsibilities
//! - Build a logging engine from a [`LoggerConfig`]
//! - Expose leveled logging behind the [`LeveledLogger`] trait
//! - Derive child loggers carrying extra context fields
//! - Flush sinks on shutdown
//!
//! # Design Decisions
//! - The engine is `tracing`: each logger tree owns a `Dispatch` made of a
//!   registry and a [`RecordLayer`]; facade calls are dispatched to it as events
//! - Construction is fail-fast, but invalid levels silently become info
//! - `with` copies the context; parents and siblings never observe a child's fields
//! - A derived logger's context rides on a span that parents its events, so it
//!   reaches the layer as typed fields
//!
//! ```ignore
//! use service_kit::observability::{LeveledLogger, Logger};
//!
//! let logger = Logger::new(None);
//! logger.info("started");
//! let req = logger.with([("request_id", "abc")]);
//! infof!(req, "served in {}ms", 12);
//! logger.sync()?;
//! ```

use std::fmt;
use std::panic::Location;
use std::sync::Arc;

use serde_json::Value;
use tracing::{Dispatch, Span};
use tracing_subscriber::prelude::*;

use super::encoder::{Encoder, Encoding};
use super::error::LoggerError;
use super::field::{Field, Fields};
use super::layer::{context_span, RecordLayer, FACADE_TARGET};
use super::level::{AtomicLevel, Level};
use super::sink::SinkSet;
use crate::config::LoggerConfig;

/// The leveled logging contract.
///
/// Implementors provide [`log`](LeveledLogger::log) and [`sync`](LeveledLogger::sync);
/// everything else is built on top. Unformatted methods take one displayable
/// value; join several with [`sprint!`](crate::sprint).
pub trait LeveledLogger: Send + Sync {
    /// Emit one record at `level`, if enabled.
    #[track_caller]
    fn log(&self, level: Level, args: fmt::Arguments<'_>);

    /// Flush buffered records to every sink.
    fn sync(&self) -> Result<(), LoggerError>;

    /// Child logger whose records also carry `fields`. The receiver is unchanged.
    fn with_fields(&self, fields: Vec<Field>) -> Self
    where
        Self: Sized;

    /// Whether `dpanic` should panic.
    fn is_development(&self) -> bool {
        false
    }

    #[track_caller]
    fn debug(&self, msg: impl fmt::Display)
    where
        Self: Sized,
    {
        self.log(Level::Debug, format_args!("{}", msg));
    }

    #[track_caller]
    fn info(&self, msg: impl fmt::Display)
    where
        Self: Sized,
    {
        self.log(Level::Info, format_args!("{}", msg));
    }

    #[track_caller]
    fn warn(&self, msg: impl fmt::Display)
    where
        Self: Sized,
    {
        self.log(Level::Warn, format_args!("{}", msg));
    }

    #[track_caller]
    fn error(&self, msg: impl fmt::Display)
    where
        Self: Sized,
    {
        self.log(Level::Error, format_args!("{}", msg));
    }

    #[track_caller]
    fn dpanic(&self, msg: impl fmt::Display)
    where
        Self: Sized,
    {
        self.dpanicf(format_args!("{}", msg));
    }

    /// Log, then panic with the message.
    #[track_caller]
    fn panic(&self, msg: impl fmt::Display) -> !
    where
        Self: Sized,
    {
        self.panicf(format_args!("{}", msg))
    }

    /// Log, flush, then exit the process with status 1.
    #[track_caller]
    fn fatal(&self, msg: impl fmt::Display) -> !
    where
        Self: Sized,
    {
        self.fatalf(format_args!("{}", msg))
    }

    #[track_caller]
    fn debugf(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Debug, args);
    }

    #[track_caller]
    fn infof(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Info, args);
    }

    #[track_caller]
    fn warnf(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Warn, args);
    }

    #[track_caller]
    fn errorf(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Error, args);
    }

    #[track_caller]
    fn dpanicf(&self, args: fmt::Arguments<'_>) {
        let message = args.to_string();
        self.log(Level::DPanic, format_args!("{}", message));
        if self.is_development() {
            panic!("{}", message);
        }
    }

    #[track_caller]
    fn panicf(&self, args: fmt::Arguments<'_>) -> ! {
        let message = args.to_string();
        self.log(Level::Panic, format_args!("{}", message));
        panic!("{}", message);
    }

    #[track_caller]
    fn fatalf(&self, args: fmt::Arguments<'_>) -> ! {
        self.log(Level::Fatal, args);
        // The process is going away; a flush failure has nowhere to go.
        let _ = self.sync();
        std::process::exit(1);
    }
}

struct Core {
    dispatch: Dispatch,
    sinks: Arc<SinkSet>,
    level: AtomicLevel,
    development: bool,
}

/// Structured logger.
///
/// Cloning is cheap. Clones and children made with [`with`](Logger::with)
/// share sinks and the level threshold.
#[derive(Clone)]
pub struct Logger {
    core: Arc<Core>,
    context: Fields,
    span: Span,
}

impl Logger {
    /// Build a logger, using the default configuration when `config` is `None`.
    ///
    /// Exits the process if the logger cannot be built (unknown encoding,
    /// unopenable sink). Use [`try_new`](Logger::try_new) to handle that instead.
    pub fn new(config: Option<LoggerConfig>) -> Self {
        match Self::try_new(config.unwrap_or_default()) {
            Ok(logger) => logger,
            Err(e) => {
                eprintln!("failed to build logger: {}", e);
                std::process::exit(1);
            }
        }
    }

    /// Build a logger, returning configuration errors.
    pub fn try_new(config: LoggerConfig) -> Result<Self, LoggerError> {
        let config = config.normalized();
        let level = AtomicLevel::new(Level::parse_or_info(&config.level));
        let encoding: Encoding = config.encoding.parse()?;
        let sinks = Arc::new(SinkSet::open(
            &config.output_paths,
            &config.error_output_paths,
        )?);

        let stacktrace_from = match (config.disable_stacktrace, config.development) {
            (true, _) => None,
            (false, true) => Some(Level::Warn),
            (false, false) => Some(Level::Error),
        };

        let layer = RecordLayer {
            encoder: Encoder::new(encoding, config.development),
            sinks: Arc::clone(&sinks),
            level: level.clone(),
            initial_fields: config.initial_fields.clone(),
            with_caller: !config.disable_caller,
            stacktrace_from,
        };
        let dispatch = Dispatch::new(tracing_subscriber::registry().with(layer));

        Ok(Self {
            core: Arc::new(Core {
                dispatch,
                sinks,
                level,
                development: config.development,
            }),
            context: Fields::default(),
            span: Span::none(),
        })
    }

    /// Child logger whose records also carry `fields`.
    ///
    /// ```ignore
    /// let child = logger.with([("user", json!("alice")), ("attempt", json!(2))]);
    /// ```
    pub fn with<I, K, V>(&self, fields: I) -> Logger
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.derive(fields.into_iter().map(Field::from))
    }

    fn derive(&self, fields: impl IntoIterator<Item = Field>) -> Logger {
        let context = self.context.extend(fields);
        Logger {
            core: Arc::clone(&self.core),
            span: context_span(&self.core.dispatch, &context),
            context,
        }
    }

    /// Current threshold.
    pub fn level(&self) -> Level {
        self.core.level.get()
    }

    /// Change the threshold for this logger and every logger sharing its sinks.
    pub fn set_level(&self, level: Level) {
        self.core.level.set(level);
    }

    /// Whether records at `level` are emitted.
    pub fn enabled(&self, level: Level) -> bool {
        self.core.level.enabled(level)
    }

    /// Route plain `tracing` events from the whole process into this logger's sinks.
    pub fn install_global(&self) -> Result<(), LoggerError> {
        tracing::dispatcher::set_global_default(self.core.dispatch.clone())
            .map_err(|_| LoggerError::GlobalAlreadySet)
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new(None)
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("level", &self.level())
            .field("development", &self.core.development)
            .field("context", &self.context)
            .finish()
    }
}

impl LeveledLogger for Logger {
    #[track_caller]
    fn log(&self, level: Level, args: fmt::Arguments<'_>) {
        if !self.enabled(level) {
            return;
        }
        let location = Location::caller();
        let caller = format!("{}:{}", location.file(), location.line());
        tracing::dispatcher::with_default(&self.core.dispatch, || {
            emit(level, &caller, &self.span, args)
        });
    }

    fn with_fields(&self, fields: Vec<Field>) -> Self {
        self.derive(fields)
    }

    fn sync(&self) -> Result<(), LoggerError> {
        self.core.sinks.sync()
    }

    fn is_development(&self) -> bool {
        self.core.development
    }
}

fn emit(level: Level, caller: &str, context: &Span, args: fmt::Arguments<'_>) {
    let severity = level.as_str();
    macro_rules! facade_event {
        ($lvl:expr) => {
            tracing::event!(
                target: FACADE_TARGET,
                parent: context,
                $lvl,
                severity = severity,
                caller = caller,
                "{}",
                args
            )
        };
    }

    match level {
        Level::Debug => facade_event!(tracing::Level::DEBUG),
        Level::Info => facade_event!(tracing::Level::INFO),
        Level::Warn => facade_event!(tracing::Level::WARN),
        Level::Error | Level::DPanic | Level::Panic | Level::Fatal => {
            facade_event!(tracing::Level::ERROR)
        }
    }
}

/// Join displayable values with single spaces.
///
/// ```ignore
/// logger.info(sprint!("listening on", addr, "with", workers, "workers"));
/// ```
#[macro_export]
macro_rules! sprint {
    ($($arg:expr),+ $(,)?) => {{
        let parts: ::std::vec::Vec<::std::string::String> =
            ::std::vec![$(::std::string::ToString::to_string(&$arg)),+];
        parts.join(" ")
    }};
}

/// `format!`-style call to [`LeveledLogger::debugf`].
#[macro_export]
macro_rules! debugf {
    ($logger:expr, $($arg:tt)+) => {{
        use $crate::observability::LeveledLogger as _;
        $logger.debugf(::std::format_args!($($arg)+))
    }};
}

/// `format!`-style call to [`LeveledLogger::infof`].
#[macro_export]
macro_rules! infof {
    ($logger:expr, $($arg:tt)+) => {{
        use $crate::observability::LeveledLogger as _;
        $logger.infof(::std::format_args!($($arg)+))
    }};
}

/// `format!`-style call to [`LeveledLogger::warnf`].
#[macro_export]
macro_rules! warnf {
    ($logger:expr, $($arg:tt)+) => {{
        use $crate::observability::LeveledLogger as _;
        $logger.warnf(::std::format_args!($($arg)+))
    }};
}

/// `format!`-style call to [`LeveledLogger::errorf`].
#[macro_export]
macro_rules! errorf {
    ($logger:expr, $($arg:tt)+) => {{
        use $crate::observability::LeveledLogger as _;
        $logger.errorf(::std::format_args!($($arg)+))
    }};
}

/// `format!`-style call to [`LeveledLogger::dpanicf`].
#[macro_export]
macro_rules! dpanicf {
    ($logger:expr, $($arg:tt)+) => {{
        use $crate::observability::LeveledLogger as _;
        $logger.dpanicf(::std::format_args!($($arg)+))
    }};
}

/// `format!`-style call to [`LeveledLogger::panicf`].
#[macro_export]
macro_rules! panicf {
    ($logger:expr, $($arg:tt)+) => {{
        use $crate::observability::LeveledLogger as _;
        $logger.panicf(::std::format_args!($($arg)+))
    }};
}

/// `format!`-style call to [`LeveledLogger::fatalf`].
#[macro_export]
macro_rules! fatalf {
    ($logger:expr, $($arg:tt)+) => {{
        use $crate::observability::LeveledLogger as _;
        $logger.fatalf(::std::format_args!($($arg)+))
    }};
}
