//! Host-facing music interface.
//!
//! The mixer drives every codec through the same two traits:
//!
//! - [`MusicCodec`] - library lifecycle and track creation
//! - [`MusicStream`] - per-track control and audio pull
//!
//! Optional operations have default implementations returning
//! [`GsfError::Unsupported`]; [`MusicInterfaceInfo::capabilities`] tells the
//! host up front which ones a codec actually provides.

use crate::buffer::SampleBufferMut;
use crate::error::{GsfError, Result};
use crate::metadata::MetaTag;
use bitflags::bitflags;
use std::io::{Read, Seek};

/// Music formats known to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MusicType {
    /// Game Boy Advance sound format (GSF / minigsf)
    Gsf,
}

bitflags! {
    /// Operations a codec implements beyond the mandatory set.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MusicCaps: u32 {
        /// Per-track volume
        const VOLUME = 1 << 0;
        /// Absolute seeking
        const SEEK = 1 << 1;
        /// Position reporting
        const TELL = 1 << 2;
        /// Track length reporting
        const DURATION = 1 << 3;
        /// Title / artist / album / copyright
        const META_TAGS = 1 << 4;
        /// Sub-track selection
        const TRACKS = 1 << 5;
        /// Jumping to a pattern order
        const JUMP = 1 << 6;
        /// Pause and resume
        const PAUSE = 1 << 7;
        /// Codec-side stop
        const STOP = 1 << 8;
        /// Tempo change
        const SPEED = 1 << 9;
        /// Pitch change
        const PITCH = 1 << 10;
        /// Loop start / end / length
        const LOOP_POINTS = 1 << 11;
    }
}

/// Static description a codec registers with the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MusicInterfaceInfo {
    /// Short codec tag, e.g. `"GSF"`
    pub tag: &'static str,
    /// Format handled
    pub music_type: MusicType,
    /// Library or API backing the codec
    pub api: &'static str,
    /// Optional operations provided
    pub capabilities: MusicCaps,
}

/// Result of one pull from a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pull {
    /// Samples written to the front of the host buffer
    pub filled: usize,
    /// The track has no more audio for this playback pass
    pub done: bool,
}

/// One opened track as seen by the host.
pub trait MusicStream {
    /// Set the mix volume (0..=128).
    fn set_volume(&mut self, volume: i32);

    /// Current mix volume.
    fn volume(&self) -> i32;

    /// Start (or restart) playback `play_count` times.
    fn play(&mut self, play_count: i32) -> Result<()>;

    /// Fill `out` with mixed audio.
    fn play_audio(&mut self, out: SampleBufferMut<'_>) -> Result<Pull>;

    /// Seek to an absolute position in seconds.
    fn seek(&mut self, seconds: f64) -> Result<()>;

    /// Current position in seconds.
    fn tell(&self) -> f64;

    /// Track length in seconds, or `-1.0` if unknown.
    fn duration(&self) -> f64;

    /// Tag value, `""` if unset.
    fn meta_tag(&self, tag: MetaTag) -> &str;

    /// Number of sub-tracks in the loaded image.
    fn num_tracks(&self) -> usize;

    /// Switch to sub-track `index` (0-based).
    fn start_track(&mut self, index: usize) -> Result<()>;

    /// Whether the codec itself considers the track playing.
    fn is_playing(&self) -> Result<bool> {
        Err(GsfError::Unsupported("is_playing"))
    }

    /// Jump to a pattern order.
    fn jump(&mut self, _order: i32) -> Result<()> {
        Err(GsfError::Unsupported("jump"))
    }

    /// Pause playback.
    fn pause(&mut self) -> Result<()> {
        Err(GsfError::Unsupported("pause"))
    }

    /// Resume after [`pause`](Self::pause).
    fn resume(&mut self) -> Result<()> {
        Err(GsfError::Unsupported("resume"))
    }

    /// Stop playback.
    fn stop(&mut self) -> Result<()> {
        Err(GsfError::Unsupported("stop"))
    }

    /// Set the tempo factor.
    fn set_speed(&mut self, _speed: f64) -> Result<()> {
        Err(GsfError::Unsupported("set_speed"))
    }

    /// Current tempo factor.
    fn speed(&self) -> Result<f64> {
        Err(GsfError::Unsupported("speed"))
    }

    /// Set the pitch factor.
    fn set_pitch(&mut self, _pitch: f64) -> Result<()> {
        Err(GsfError::Unsupported("set_pitch"))
    }

    /// Current pitch factor.
    fn pitch(&self) -> Result<f64> {
        Err(GsfError::Unsupported("pitch"))
    }

    /// Loop start in seconds.
    fn loop_start(&self) -> Result<f64> {
        Err(GsfError::Unsupported("loop_start"))
    }

    /// Loop end in seconds.
    fn loop_end(&self) -> Result<f64> {
        Err(GsfError::Unsupported("loop_end"))
    }

    /// Loop length in seconds.
    fn loop_length(&self) -> Result<f64> {
        Err(GsfError::Unsupported("loop_length"))
    }
}

/// A codec the host can register.
pub trait MusicCodec {
    /// Track type this codec opens.
    type Music: MusicStream;

    /// Static registration data.
    fn info(&self) -> &MusicInterfaceInfo;

    /// Make sure the backing library is available.
    fn load(&self) -> Result<()>;

    /// Undo one successful [`load`](Self::load).
    fn unload(&self);

    /// Open a track from `src` with default arguments.
    fn create_from_reader<R: Read + Seek>(&self, src: Option<R>) -> Result<Self::Music> {
        self.create_from_reader_ex(src, None)
    }

    /// Open a track from `src`; `args` is codec specific.
    fn create_from_reader_ex<R: Read + Seek>(
        &self,
        src: Option<R>,
        args: Option<&str>,
    ) -> Result<Self::Music>;
}
