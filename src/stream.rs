//! `Stream`: the state machine that drives a `DataSource` into an
//! `AudioSink` through a producer thread, with seamless loop
//! wrap-around, preemptive pause, and underrun recovery.
//!
//! This is the core of the crate: the transition table, the start/stop
//! protocols, and the concurrency discipline between the control
//! thread and the producer thread all live here.

use std::{
    path::Path,
    sync::{
        atomic::{AtomicI64, Ordering::SeqCst},
        Arc,
    },
    thread::{Builder, JoinHandle},
    time::Duration,
};

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::{
    config::StreamConfig,
    error::{report_decoder_runtime_failure, report_decoder_setup_failure, OpenError},
    flag::Flag,
    fs::{FileSystem, FsError},
    opener::{open_source, SourceBackends, SourceOpenError},
    sink::{AudioSink, BufferId, SinkState},
    source::{DataSource, FillStatus},
    sync_point::SyncPoint,
};

/// The four states a [`Stream`] can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// No source is open.
    Closed,
    /// A source is open but not producing.
    Stopped,
    /// The producer thread is running and the sink is (or should be)
    /// draining.
    Playing,
    /// A sweep is suspended.
    Paused,
}

/// The pause/resume race-resolution bit, guarded by its own mutex.
#[derive(Debug, Default)]
struct PauseState {
    preempt_pause: bool,
}

/// Resolves a pause request against the sink's *actual* state, so a
/// pause that arrives before the producer's first buffer is queued is
/// remembered instead of dropped.
fn pause_stream(sink: &dyn AudioSink, pause_state: &Mutex<PauseState>) {
    let mut guard = pause_state.lock();
    if sink.state() != SinkState::Playing {
        guard.preempt_pause = true;
    } else {
        sink.pause();
    }
}

/// The producer thread's first attempt to start playback goes through
/// here too, so a pending preemptive pause wins over it.
fn resume_stream(sink: &dyn AudioSink, pause_state: &Mutex<PauseState>) {
    let mut guard = pause_state.lock();
    if guard.preempt_pause {
        guard.preempt_pause = false;
    } else {
        sink.play();
    }
}

/// Everything the producer thread needs, cloned out of a [`Stream`] at
/// sweep start so the thread body doesn't borrow `self`.
struct ProducerCtx {
    source: Arc<Mutex<Option<Box<dyn DataSource>>>>,
    sink: Arc<dyn AudioSink>,
    sync_point: Arc<dyn SyncPoint>,
    pause_state: Arc<Mutex<PauseState>>,
    thread_term_req: Arc<Flag>,
    stream_inited: Arc<Flag>,
    source_exhausted: Arc<Flag>,
    proc_frames: Arc<AtomicI64>,
    start_offset: f64,
    audio_sleep: Duration,
}

/// Runs one play sweep on a dedicated thread.
fn run_producer(ctx: ProducerCtx) {
    if ctx.thread_term_req.is_set() {
        return;
    }

    // The seek is unconditional; `needs_rewind` is tracked on the
    // `Stream` but deliberately not consulted here.
    {
        let mut guard = ctx.source.lock();
        match guard.as_mut() {
            Some(src) => src.seek_to_offset(ctx.start_offset),
            None => return,
        }
    }

    let buffer_ids: Vec<BufferId> = ctx.sink.buffer_ids().to_vec();
    let mut first_buffer = true;

    for &buf in &buffer_ids {
        if ctx.thread_term_req.is_set() {
            return;
        }

        let status = {
            let mut guard = ctx.source.lock();
            match guard.as_mut() {
                Some(src) => src.fill_buffer(buf),
                None => return,
            }
        };

        if status == FillStatus::Error {
            // `source_exhausted` is deliberately left unset here:
            // `check_stopped` will never fire and the sweep lingers in
            // Playing until a manual stop/close.
            report_decoder_runtime_failure("initial fill");
            return;
        }

        ctx.sink.queue_buffer(buf);

        if first_buffer {
            resume_stream(&*ctx.sink, &ctx.pause_state);
            ctx.stream_inited.set();
            first_buffer = false;
        }

        if ctx.thread_term_req.is_set() {
            return;
        }

        if status == FillStatus::EndOfStream {
            ctx.source_exhausted.set();
            break;
        }
    }

    let mut last_buf: Option<BufferId> = None;

    loop {
        ctx.sync_point.wait();

        let processed = ctx.sink.processed_buffer_count();
        for _ in 0..processed {
            if ctx.thread_term_req.is_set() {
                break;
            }

            let Some(buf) = ctx.sink.unqueue_buffer() else {
                break;
            };

            if last_buf == Some(buf) {
                let loop_start = {
                    let guard = ctx.source.lock();
                    guard.as_ref().map_or(0, |src| src.loop_start_frames())
                };
                ctx.proc_frames.store(loop_start, SeqCst);
                last_buf = None;
            } else {
                let bits = ctx.sink.bits_per_sample(buf);
                let channels = ctx.sink.channels(buf);
                if bits != 0 && channels != 0 {
                    let size = ctx.sink.size_bytes(buf) as u64;
                    let frames = (size / (u64::from(bits) / 8)) / u64::from(channels);
                    ctx.proc_frames.fetch_add(frames as i64, SeqCst);
                }
            }

            if ctx.source_exhausted.is_set() {
                continue;
            }

            let status = {
                let mut guard = ctx.source.lock();
                match guard.as_mut() {
                    Some(src) => src.fill_buffer(buf),
                    None => return,
                }
            };

            if status == FillStatus::Error {
                ctx.source_exhausted.set();
                report_decoder_runtime_failure("refill");
                return;
            }

            ctx.sink.queue_buffer(buf);

            // Underrun recovery: the mixer may have drained and
            // halted while we were decoding.
            if ctx.sink.state() == SinkState::Stopped {
                ctx.sink.play();
            }

            match status {
                FillStatus::WrapAround => last_buf = Some(buf),
                FillStatus::EndOfStream => ctx.source_exhausted.set(),
                _ => {}
            }
        }

        if ctx.thread_term_req.is_set() {
            break;
        }

        std::thread::sleep(ctx.audio_sleep);
    }
}

static THREAD_SEQ: std::sync::atomic::AtomicU64 = std::sync::atomic::AtomicU64::new(0);

/// The streaming audio playback engine: a decoder producer coordinated
/// against a hardware-side buffer consumer.
pub struct Stream {
    state: State,
    loop_mode: bool,
    source: Arc<Mutex<Option<Box<dyn DataSource>>>>,
    sample_rate: u32,
    sink: Arc<dyn AudioSink>,
    fs: Arc<dyn FileSystem>,
    backends: Arc<SourceBackends>,
    sync_point: Arc<dyn SyncPoint>,
    config: StreamConfig,
    thread_name: String,
    pitch: f32,
    start_offset: f64,
    proc_frames: Arc<AtomicI64>,
    pause_state: Arc<Mutex<PauseState>>,
    thread_term_req: Arc<Flag>,
    stream_inited: Arc<Flag>,
    source_exhausted: Arc<Flag>,
    needs_rewind: Flag,
    producer_thread: Option<JoinHandle<()>>,
}

impl Stream {
    /// Creates a new, closed `Stream`.
    ///
    /// `loop_mode` is fixed for the lifetime of the `Stream`.
    #[must_use]
    pub fn new(
        sink: Arc<dyn AudioSink>,
        fs: Arc<dyn FileSystem>,
        backends: SourceBackends,
        sync_point: Arc<dyn SyncPoint>,
        loop_mode: bool,
        config: StreamConfig,
    ) -> Self {
        assert_eq!(
            sink.buffer_ids().len(),
            config.buffer_count,
            "sink's buffer ring must have config.buffer_count ({}) handles, got {}",
            config.buffer_count,
            sink.buffer_ids().len(),
        );

        let seq = THREAD_SEQ.fetch_add(1, SeqCst);
        let thread_name = format!("{}-{seq}", config.thread_name_prefix);

        Self {
            state: State::Closed,
            loop_mode,
            source: Arc::new(Mutex::new(None)),
            sample_rate: 0,
            sink,
            fs,
            backends: Arc::new(backends),
            sync_point,
            config,
            thread_name,
            pitch: 1.0,
            start_offset: 0.0,
            proc_frames: Arc::new(AtomicI64::new(0)),
            pause_state: Arc::new(Mutex::new(PauseState::default())),
            thread_term_req: Arc::new(Flag::new()),
            stream_inited: Arc::new(Flag::new()),
            source_exhausted: Arc::new(Flag::new()),
            needs_rewind: Flag::new(),
            producer_thread: None,
        }
    }

    /// Whether this stream was constructed to loop.
    #[must_use]
    pub fn loop_mode(&self) -> bool {
        self.loop_mode
    }

    /// Opens `filename`, replacing any currently open source.
    ///
    /// # Errors
    ///
    /// Returns [`OpenError::FileNotFound`] (preserving the prior
    /// stream) or [`OpenError::FileOpenError`] (closing the prior
    /// stream first). A format-level decoder setup failure is not an
    /// error here: the prior stream is closed, a diagnostic is
    /// logged, and `open` returns `Ok(())` with no source installed.
    pub fn open(&mut self, filename: &str) -> Result<(), OpenError> {
        let reader = match self.fs.open_read(filename) {
            Ok(reader) => reader,
            Err(FsError::NotFound(name)) => return Err(OpenError::FileNotFound(name)),
            Err(err @ FsError::Io(_)) => {
                self.close();
                return Err(OpenError::FileOpenError(err));
            }
        };

        let ext_hint = Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str());

        match open_source(reader, ext_hint, self.loop_mode, &self.backends) {
            Ok(source) => {
                self.close();
                self.sample_rate = source.sample_rate();
                *self.source.lock() = Some(source);
                self.needs_rewind.clear();
                self.state = State::Stopped;
                Ok(())
            }
            Err(SourceOpenError::Io(io_err)) => {
                self.close();
                Err(OpenError::FileOpenError(FsError::Io(io_err)))
            }
            Err(SourceOpenError::Decoder(decoder_err)) => {
                self.close();
                report_decoder_setup_failure(filename, &decoder_err.0);
                Ok(())
            }
        }
    }

    /// Closes the stream, running the stop protocol first if a sweep
    /// is active. Idempotent.
    pub fn close(&mut self) {
        self.check_stopped();

        match self.state {
            State::Playing | State::Paused => self.stop_sweep(),
            State::Stopped | State::Closed => {}
        }
        *self.source.lock() = None;
        self.state = State::Closed;
    }

    /// Starts (from Stopped) or resumes (from Paused) playback.
    /// A no-op if Closed, already Playing, or no source is open.
    pub fn play(&mut self, offset: f64) {
        self.check_stopped();

        if self.state == State::Closed || self.state == State::Playing {
            return;
        }
        if self.source.lock().is_none() {
            return;
        }

        match self.state {
            State::Stopped => self.start_sweep(offset),
            State::Paused => resume_stream(&*self.sink, &self.pause_state),
            State::Playing | State::Closed => unreachable!(),
        }

        self.state = State::Playing;
    }

    /// Pauses playback. A no-op unless currently Playing.
    pub fn pause(&mut self) {
        self.check_stopped();

        if self.state != State::Playing {
            return;
        }

        pause_stream(&*self.sink, &self.pause_state);
        self.state = State::Paused;
    }

    /// Stops playback. A no-op if Closed or already Stopped.
    pub fn stop(&mut self) {
        self.check_stopped();

        if self.state == State::Closed || self.state == State::Stopped {
            return;
        }

        self.stop_sweep();
        self.state = State::Stopped;
    }

    /// Forwards volume to the sink. Valid in any state.
    pub fn set_volume(&self, volume: f32) {
        self.sink.set_volume(volume.clamp(0.0, 1.0));
    }

    /// Sets pitch, preferring a source-native resampler when one is
    /// available.
    pub fn set_pitch(&mut self, pitch: f32) {
        self.pitch = pitch;

        let native = self
            .source
            .lock()
            .as_mut()
            .is_some_and(|src| src.set_pitch(pitch));

        if native {
            self.sink.set_pitch(1.0);
        } else {
            self.sink.set_pitch(pitch);
        }
    }

    /// The last pitch value requested via [`Stream::set_pitch`].
    #[must_use]
    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    /// Self-heals `Playing` to `Stopped` when the mixer has genuinely
    /// finished, then returns the current state.
    pub fn query_state(&mut self) -> State {
        self.check_stopped();
        self.state
    }

    /// Wall-clock seconds played within the current loop iteration.
    /// `0` if Closed or no source is open.
    #[must_use]
    pub fn query_offset(&self) -> f64 {
        if self.state == State::Closed || self.sample_rate == 0 {
            return 0.0;
        }
        let proc_frames = self.proc_frames.load(SeqCst);
        proc_frames as f64 / f64::from(self.sample_rate) + self.sink.seconds_offset()
    }

    /// Notices the mixer has drained past end-of-stream and moves
    /// `Playing` to `Stopped` without external prompting.
    fn check_stopped(&mut self) {
        if self.state != State::Playing {
            return;
        }
        if !self.stream_inited.is_set() {
            return;
        }
        if !self.source_exhausted.is_set() {
            return;
        }
        if self.sink.state() == SinkState::Playing {
            return;
        }

        self.stop_sweep();
        self.state = State::Stopped;
    }

    /// Spawns the producer thread for a new play sweep.
    fn start_sweep(&mut self, offset: f64) {
        self.sink.clear_queue();

        self.pause_state.lock().preempt_pause = false;
        self.stream_inited.clear();
        self.source_exhausted.clear();
        self.thread_term_req.clear();

        self.start_offset = offset;
        self.proc_frames
            .store((offset * f64::from(self.sample_rate)).round() as i64, SeqCst);

        let ctx = ProducerCtx {
            source: Arc::clone(&self.source),
            sink: Arc::clone(&self.sink),
            sync_point: Arc::clone(&self.sync_point),
            pause_state: Arc::clone(&self.pause_state),
            thread_term_req: Arc::clone(&self.thread_term_req),
            stream_inited: Arc::clone(&self.stream_inited),
            source_exhausted: Arc::clone(&self.source_exhausted),
            proc_frames: Arc::clone(&self.proc_frames),
            start_offset: self.start_offset,
            audio_sleep: Duration::from_millis(self.config.audio_sleep_ms),
        };

        let handle = Builder::new()
            .name(self.thread_name.clone())
            .spawn(move || run_producer(ctx))
            .expect("failed to spawn producer thread");

        self.producer_thread = Some(handle);
        debug!(thread = %self.thread_name, "producer thread spawned");
    }

    /// Joins the producer thread and stops the sink.
    ///
    /// The sink is stopped *after* the join: stopping it first would
    /// race against the producer re-issuing `sink.play()` on underrun
    /// recovery or its own initial resume.
    fn stop_sweep(&mut self) {
        self.thread_term_req.set();

        if let Some(handle) = self.producer_thread.take() {
            if handle.join().is_err() {
                warn!(thread = %self.thread_name, "producer thread panicked");
            }
        }

        self.needs_rewind.set();
        self.sink.stop();
        self.proc_frames.store(0, SeqCst);
    }
}
