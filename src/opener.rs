//! `SourceOpener`: detects a file's format from its signature and
//! instantiates the matching [`DataSource`], without ever double-closing
//! the underlying byte stream.
//!
//! Concrete decoder backends (Ogg/Vorbis parsing, a MIDI synthesizer,
//! a generic extension-driven decoder) are external collaborators this
//! crate never implements. `SourceBackends` is the seam: the host
//! application supplies one constructor closure per backend, and this
//! module supplies the signature-sniffing and fallback logic.

use std::io::{Read, Seek, SeekFrom};

use thiserror::Error;

use crate::{fs::ReadSeek, source::DataSource};

/// Magic bytes identifying an Ogg container.
const OGG_MAGIC: &[u8; 4] = b"OggS";
/// Magic bytes identifying a Standard MIDI File.
const MIDI_MAGIC: &[u8; 4] = b"MThd";

/// A captured decoder construction failure message.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct DecoderSetupError(pub String);

impl DecoderSetupError {
    /// Captures any error's display text.
    pub fn from_display(err: impl std::fmt::Display) -> Self {
        Self(err.to_string())
    }
}

/// Outcome of a failed [`open_source`] call, distinguishing an I/O
/// layer failure (propagated by the caller) from a format-level one
/// (logged and swallowed).
#[derive(Debug, Error)]
pub enum SourceOpenError {
    /// Reading the signature or re-seeking the stream failed.
    #[error("I/O error during format detection: {0}")]
    Io(#[from] std::io::Error),
    /// A backend constructor failed after the signature matched (or
    /// after falling back to the generic backend).
    #[error(transparent)]
    Decoder(#[from] DecoderSetupError),
}

/// Hook allowing the MIDI backend to report whether synthesizer
/// global state is available, initializing it lazily if needed.
pub trait MidiAvailability: Send + Sync {
    /// Attempts to initialize (if not already) and returns whether a
    /// synthesizer backend is available to construct a `DataSource`.
    fn ensure_initialized(&self) -> bool;
}

type BackendCtor = Box<
    dyn Fn(Box<dyn ReadSeek>, bool) -> Result<Box<dyn DataSource>, DecoderSetupError> + Send + Sync,
>;
type GenericCtor = Box<
    dyn Fn(Box<dyn ReadSeek>, Option<&str>, usize, bool) -> Result<Box<dyn DataSource>, DecoderSetupError>
        + Send
        + Sync,
>;

/// Constructors for each concrete decoder backend `SourceOpener`
/// dispatches to.
///
/// Every constructor takes the `Stream`'s fixed `loop_mode` flag
/// (spec.md §3: "`loopMode`: boolean, fixed at construction.
/// Determines whether the `DataSource` is built in looping mode.") in
/// addition to the stream and, where relevant, the extension hint.
pub struct SourceBackends {
    /// Constructs the Ogg/Vorbis `DataSource` once the signature
    /// matches `"OggS"`.
    pub open_vorbis: BackendCtor,
    /// Optional MIDI backend: availability check plus constructor.
    /// `None` means no synthesizer is wired up at all, equivalent to
    /// `ensure_initialized` always returning `false`.
    pub midi: Option<(Box<dyn MidiAvailability>, BackendCtor)>,
    /// Constructs the generic, extension-hinted `DataSource` used
    /// whenever the signature doesn't match a specialized backend.
    pub open_generic: GenericCtor,
    /// Fixed buffer size passed to the generic backend.
    pub generic_buffer_size: usize,
}

/// Reads up to 4 bytes from `stream` without treating a short read as
/// an error (an empty or tiny file simply won't match any signature).
fn read_signature(stream: &mut dyn ReadSeek) -> std::io::Result<[u8; 4]> {
    let mut sig = [0u8; 4];
    let mut filled = 0;
    while filled < sig.len() {
        match stream.read(&mut sig[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(sig)
}

/// Detects `stream`'s format from its first 4 bytes and instantiates
/// the matching `DataSource`, built in looping mode iff `loop_mode` is
/// set.
///
/// On every path — success or failure — ownership of `stream` passes
/// to exactly one backend constructor, which is solely responsible for
/// closing it. This function itself never reads past byte 4 nor holds
/// the stream open past the constructor call.
pub fn open_source(
    mut stream: Box<dyn ReadSeek>,
    ext_hint: Option<&str>,
    loop_mode: bool,
    backends: &SourceBackends,
) -> Result<Box<dyn DataSource>, SourceOpenError> {
    let signature = read_signature(stream.as_mut())?;
    stream.seek(SeekFrom::Start(0))?;

    if &signature == OGG_MAGIC {
        return (backends.open_vorbis)(stream, loop_mode).map_err(SourceOpenError::from);
    }

    if &signature == MIDI_MAGIC {
        if let Some((availability, ctor)) = &backends.midi {
            if availability.ensure_initialized() {
                return ctor(stream, loop_mode).map_err(SourceOpenError::from);
            }
        }
        // No synthesizer available: fall through to the generic backend.
    }

    (backends.open_generic)(stream, ext_hint, backends.generic_buffer_size, loop_mode)
        .map_err(SourceOpenError::from)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    struct StubSource;

    impl DataSource for StubSource {
        fn fill_buffer(&mut self, _buffer: crate::sink::BufferId) -> crate::source::FillStatus {
            crate::source::FillStatus::EndOfStream
        }
        fn seek_to_offset(&mut self, _seconds: f64) {}
        fn sample_rate(&self) -> u32 {
            44_100
        }
        fn loop_start_frames(&self) -> i64 {
            0
        }
        fn set_pitch(&mut self, _pitch: f32) -> bool {
            false
        }
    }

    struct AlwaysAvailable;
    impl MidiAvailability for AlwaysAvailable {
        fn ensure_initialized(&self) -> bool {
            true
        }
    }

    struct NeverAvailable;
    impl MidiAvailability for NeverAvailable {
        fn ensure_initialized(&self) -> bool {
            false
        }
    }

    fn backends(midi: Option<(Box<dyn MidiAvailability>, BackendCtor)>) -> SourceBackends {
        SourceBackends {
            open_vorbis: Box::new(|_s, _loop_mode| Ok(Box::new(StubSource))),
            midi,
            open_generic: Box::new(|_s, _ext, _buf, _loop_mode| Ok(Box::new(StubSource))),
            generic_buffer_size: 4096,
        }
    }

    fn cursor_with(bytes: &[u8]) -> Box<dyn ReadSeek> {
        Box::new(Cursor::new(bytes.to_vec()))
    }

    #[test]
    fn dispatches_ogg_by_signature() {
        let b = backends(None);
        let result = open_source(cursor_with(b"OggS\x00\x00\x00\x00rest"), None, false, &b);
        assert!(result.is_ok());
    }

    #[test]
    fn dispatches_midi_when_synth_available() {
        let b = backends(Some((
            Box::new(AlwaysAvailable),
            Box::new(|_s, _loop_mode| Ok(Box::new(StubSource))),
        )));
        let result = open_source(cursor_with(b"MThd\x00\x00\x00\x06"), None, false, &b);
        assert!(result.is_ok());
    }

    #[test]
    fn falls_back_to_generic_when_synth_unavailable() {
        let b = SourceBackends {
            open_vorbis: Box::new(|_s, _loop_mode| Ok(Box::new(StubSource))),
            midi: Some((
                Box::new(NeverAvailable),
                Box::new(|_s, _loop_mode| panic!("must not be called")),
            )),
            open_generic: Box::new(|_s, _ext, _buf, _loop_mode| Ok(Box::new(StubSource))),
            generic_buffer_size: 4096,
        };
        let result = open_source(cursor_with(b"MThd\x00\x00\x00\x06"), None, false, &b);
        assert!(result.is_ok());
    }

    #[test]
    fn falls_back_to_generic_for_unknown_signature() {
        let b = backends(None);
        let result = open_source(cursor_with(b"RIFFxxxx"), Some("wav"), false, &b);
        assert!(result.is_ok());
    }

    #[test]
    fn captures_decoder_error_message() {
        let b = SourceBackends {
            open_vorbis: Box::new(|_s, _loop_mode| Err(DecoderSetupError("bad vorbis header".to_string()))),
            midi: None,
            open_generic: Box::new(|_s, _ext, _buf, _loop_mode| Ok(Box::new(StubSource))),
            generic_buffer_size: 4096,
        };
        let err = open_source(cursor_with(b"OggS\x00\x00\x00\x00"), None, false, &b).unwrap_err();
        match err {
            SourceOpenError::Decoder(DecoderSetupError(msg)) => assert_eq!(msg, "bad vorbis header"),
            _ => panic!("expected Decoder error"),
        }
    }

    #[test]
    fn seeks_back_to_start_before_dispatch() {
        // The generic backend receives the stream positioned at 0,
        // even though 4 bytes were consumed detecting the signature.
        let b = SourceBackends {
            open_vorbis: Box::new(|_s, _loop_mode| Ok(Box::new(StubSource))),
            midi: None,
            open_generic: Box::new(|mut s, _ext, _buf, _loop_mode| {
                let mut buf = [0u8; 4];
                s.read_exact(&mut buf).unwrap();
                assert_eq!(&buf, b"RIFF");
                Ok(Box::new(StubSource) as Box<dyn DataSource>)
            }),
            generic_buffer_size: 4096,
        };
        let result = open_source(cursor_with(b"RIFFxxxx"), None, false, &b);
        assert!(result.is_ok());
    }

    #[test]
    fn threads_loop_mode_into_backend_constructor() {
        let b = SourceBackends {
            open_vorbis: Box::new(|_s, loop_mode| {
                assert!(loop_mode, "loop_mode must reach the backend constructor");
                Ok(Box::new(StubSource) as Box<dyn DataSource>)
            }),
            midi: None,
            open_generic: Box::new(|_s, _ext, _buf, _loop_mode| Ok(Box::new(StubSource))),
            generic_buffer_size: 4096,
        };
        let result = open_source(cursor_with(b"OggS\x00\x00\x00\x00"), None, true, &b);
        assert!(result.is_ok());
    }
}
