//! The `DataSource` contract: an incremental decoder that fills
//! sink-owned buffers and reports loop geometry.
//!
//! Concrete decoders (compressed/container parsers, synthesizer
//! backends) are out of scope for this crate. Only the abstract
//! contract lives here, alongside the format-detection logic in
//! [`crate::opener`] that decides which concrete backend to
//! instantiate.

use crate::sink::BufferId;

/// Outcome of one [`DataSource::fill_buffer`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillStatus {
    /// The buffer was filled; more data remains.
    NoError,
    /// No further data will ever come; this was the last chunk.
    EndOfStream,
    /// This chunk spans a loop boundary and is the last chunk of the
    /// pre-wrap iteration.
    WrapAround,
    /// Unrecoverable decoder failure.
    Error,
}

/// An incremental audio decoder.
///
/// Implementations are exclusively owned by one [`crate::stream::Stream`]
/// for the lifetime of an open file; `fill_buffer` and `seek_to_offset`
/// are only ever called while holding that exclusive access, so
/// neither method needs to be `Sync`.
pub trait DataSource: Send {
    /// Decodes the next chunk and attaches it to `buffer`.
    fn fill_buffer(&mut self, buffer: BufferId) -> FillStatus;

    /// Repositions the decode cursor to `seconds` from the start.
    fn seek_to_offset(&mut self, seconds: f64);

    /// Frames per second of the decoded signal.
    fn sample_rate(&self) -> u32;

    /// Frame index where the loop point begins (often `0`).
    fn loop_start_frames(&self) -> i64;

    /// Attempts to set pitch natively (pre-resampling at the decoder).
    /// Returns `true` if the source absorbed it, `false` if the caller
    /// must apply pitch at the mixer instead.
    fn set_pitch(&mut self, pitch: f32) -> bool;
}
