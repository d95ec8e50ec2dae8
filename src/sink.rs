//! The `AudioSink` contract: a hardware mixer source plus its pool of
//! buffer handles.
//!
//! This crate never implements a concrete sink — the hardware audio
//! binding is an external collaborator. `AudioSink` is the interface
//! [`crate::stream::Stream`] drives; a real implementation would own
//! one mixer "source" handle and `N` buffer handles backed by a
//! platform audio API.

/// Opaque handle to one of a sink's pooled buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(pub usize);

/// Playback state as reported by the hardware mixer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkState {
    /// Never queued or played.
    Initial,
    /// Actively draining queued buffers.
    Playing,
    /// Paused mid-drain.
    Paused,
    /// Drained its queue and halted.
    Stopped,
}

/// A hardware mixer source and its pool of buffer handles.
///
/// Implementations own one mixer "source" and `N` buffer handles
/// (typically 3). Methods take `&self`: the sink is shared between the
/// control thread and the producer thread, so implementations are
/// expected to be internally synchronized (the discipline that
/// synchronizes *when* each thread is allowed to call in is the
/// `Stream`'s job, not the sink's).
pub trait AudioSink: Send + Sync {
    /// Sets playback volume, `0.0..=1.0`.
    fn set_volume(&self, volume: f32);

    /// Sets playback pitch (speed multiplier), applied at the mixer.
    fn set_pitch(&self, pitch: f32);

    /// Starts or resumes draining the queue.
    fn play(&self);

    /// Pauses draining.
    fn pause(&self);

    /// Stops draining and clears playback position.
    fn stop(&self);

    /// Current mixer-reported state.
    fn state(&self) -> SinkState;

    /// Wall-clock seconds the mixer has advanced into the currently
    /// playing buffer (sub-buffer precision on top of
    /// [`crate::stream::Stream::query_offset`]'s frame accounting).
    fn seconds_offset(&self) -> f64;

    /// Submits a filled buffer to the playback queue (FIFO).
    fn queue_buffer(&self, id: BufferId);

    /// Removes and returns the oldest fully-processed buffer, or
    /// `None` if none are ready yet.
    fn unqueue_buffer(&self) -> Option<BufferId>;

    /// Number of buffers the mixer has finished draining and is ready
    /// to hand back via [`AudioSink::unqueue_buffer`].
    fn processed_buffer_count(&self) -> usize;

    /// Drops all queued buffers without draining them.
    fn clear_queue(&self);

    /// Detaches the current buffer from the mixer source, if any.
    fn detach_buffer(&self);

    /// The fixed set of buffer handles this sink owns (length `N`).
    fn buffer_ids(&self) -> &[BufferId];

    /// Bits per sample of the data last written to `id`.
    fn bits_per_sample(&self, id: BufferId) -> u32;

    /// Size in bytes of the data last written to `id`.
    fn size_bytes(&self, id: BufferId) -> usize;

    /// Channel count of the data last written to `id`.
    fn channels(&self, id: BufferId) -> u32;
}
