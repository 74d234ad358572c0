//! Decoder capability table.
//!
//! [`DecoderApi`] has one method per libgsf entry point. The track adapter
//! only ever talks to the decoder through it, so the same adapter runs on a
//! library resolved at runtime, one linked at build time, or the in-crate
//! test double.
//!
//! [`DecoderBackend`] is the strategy that produces a `DecoderApi`; the
//! reference-counted [`DecoderLibrary`](crate::DecoderLibrary) calls it when
//! the first consumer acquires the library.

use crate::error::Result;
use std::path::Path;

/// Tags copied out of the decoder's tag block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecoderTags {
    /// Track title
    pub title: Option<String>,
    /// Composer or artist
    pub artist: Option<String>,
    /// Game the music comes from
    pub game: Option<String>,
    /// Copyright holder / year
    pub copyright: Option<String>,
}

/// Entry points of the GSF decoder.
///
/// `Emu` is the per-track instance handle. It is created by
/// [`new_emu`](Self::new_emu) and must be handed back to
/// [`delete`](Self::delete) exactly once.
pub trait DecoderApi: Send + Sync + 'static {
    /// Per-track decoder instance.
    type Emu: Send;

    /// Create an empty instance rendering at `sample_rate`.
    ///
    /// `flags` selects the sub-track to start on.
    fn new_emu(&self, sample_rate: u32, flags: i32) -> Result<Self::Emu>;

    /// Load an image from a file path.
    fn load_file(&self, emu: &mut Self::Emu, path: &Path) -> Result<()>;

    /// Load an image held in memory.
    fn load_data(&self, emu: &mut Self::Emu, data: &[u8]) -> Result<()>;

    /// Number of addressable sub-tracks.
    fn num_channels(&self, emu: &Self::Emu) -> usize;

    /// Rate the instance actually renders at.
    fn sample_rate(&self, emu: &Self::Emu) -> u32;

    /// Whether the track has played to its end.
    fn ended(&self, emu: &Self::Emu) -> bool;

    /// Jump to an absolute position in milliseconds.
    fn seek(&self, emu: &mut Self::Emu, millis: u64);

    /// Playback position in milliseconds.
    fn tell(&self, emu: &Self::Emu) -> u64;

    /// Render `out.len()` interleaved stereo samples.
    fn play(&self, emu: &mut Self::Emu, out: &mut [i16]) -> Result<()>;

    /// Read the tag block. The decoder-owned copy is released before returning.
    fn tags(&self, emu: &Self::Emu) -> Result<DecoderTags>;

    /// Track length in milliseconds, if the image declares one.
    fn default_length(&self, emu: &Self::Emu) -> Option<u32>;

    /// Destroy an instance created by [`new_emu`](Self::new_emu).
    fn delete(&self, emu: Self::Emu);
}

/// Produces a [`DecoderApi`] when the library is first needed.
pub trait DecoderBackend: Send + Sync + 'static {
    /// The capability table this backend resolves.
    type Api: DecoderApi;

    /// Resolve every required entry point, or fail without side effects.
    fn open(&self) -> Result<Self::Api>;
}
