//! Error types plus the `anyhow`/`ErrorReporter`-style operational
//! logging boundary used when a sweep degrades silently instead of
//! raising to the caller.

use thiserror::Error;

use crate::fs::FsError;

/// Errors [`crate::stream::Stream::open`] can return to its caller.
///
/// `DecoderSetupError` deliberately has no variant here: a
/// format-level decoder setup failure is logged and swallowed, not
/// propagated — `open` returns `Ok(())` with no `source` installed.
#[derive(Debug, Error)]
pub enum OpenError {
    /// The filesystem found no file matching the requested name. The
    /// caller's prior stream state is preserved.
    #[error("file not found: {0}")]
    FileNotFound(String),
    /// The file was located but could not be read. The prior stream
    /// is closed before this error is raised.
    #[error("failed to open file: {0}")]
    FileOpenError(#[source] FsError),
}

/// A decoder-setup failure captured as a plain message (spec.md §4.2),
/// given its own error type so it can be wrapped into an `anyhow::Error`
/// at the [`ErrorReporter`] boundary instead of logged as a bare string.
#[derive(Debug, Error)]
#[error("decoder setup failed: {0}")]
struct DecoderSetupFailure(String);

/// A decoder failure discovered mid-sweep (spec.md §9 O1): the
/// producer thread exits but `sourceExhausted` is left unset, so this
/// is purely diagnostic.
#[derive(Debug, Error)]
#[error("decoder error during {phase}")]
struct DecoderRuntimeFailure {
    phase: &'static str,
}

/// Centralized, severity-leveled error reporting over `anyhow::Error`.
///
/// Mirrors the teacher's `error::operational::ErrorReporter`: a
/// consistent interface for logging degraded-but-not-fatal conditions
/// at the right severity, without forcing every call site to format
/// its own `tracing` call.
pub struct ErrorReporter;

impl ErrorReporter {
    /// Reports a recoverable condition.
    pub fn warn(error: &anyhow::Error, context: &str) {
        tracing::warn!(context = context, error = %error, "recoverable error");
    }

    /// Reports a non-recoverable condition.
    pub fn error(error: &anyhow::Error, context: &str) {
        tracing::error!(context = context, error = %error, "unrecoverable error");
    }
}

/// Reports a swallowed decoder-setup failure the way the caller would
/// want logged, without raising it.
pub fn report_decoder_setup_failure(filename: &str, message: &str) {
    let error = anyhow::Error::new(DecoderSetupFailure(message.to_string()));
    ErrorReporter::warn(&error, filename);
}

/// Reports a decoder failure discovered mid-sweep: the producer
/// thread exits but does not mark the source exhausted, so this is
/// purely diagnostic.
pub fn report_decoder_runtime_failure(phase: &'static str) {
    let error = anyhow::Error::new(DecoderRuntimeFailure { phase });
    ErrorReporter::error(&error, phase);
}
