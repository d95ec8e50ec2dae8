//! streamcore - a streaming audio playback engine
//!
//! Drives an incremental decoder (`DataSource`) into a hardware mixer
//! (`AudioSink`) through a dedicated producer thread, handling seamless
//! loop wrap-around, preemptive pause, and underrun recovery. Concrete
//! decoders, hardware bindings, filesystem access, and cross-thread
//! scheduling barriers are external collaborators: this crate specifies
//! the contracts they implement and drives them through the `Stream`
//! state machine.

pub mod config;
pub mod control;
pub mod error;
pub mod flag;
pub mod fs;
pub mod opener;
pub mod sink;
pub mod source;
pub mod stream;
pub mod sync_point;

pub use config::StreamConfig;
pub use control::StreamHandle;
pub use error::OpenError;
pub use flag::Flag;
pub use fs::{FileSystem, FsError, ReadSeek};
pub use opener::{open_source, DecoderSetupError, MidiAvailability, SourceBackends, SourceOpenError};
pub use sink::{AudioSink, BufferId, SinkState};
pub use source::{DataSource, FillStatus};
pub use stream::{State, Stream};
pub use sync_point::{NoSyncPoint, SyncPoint};
