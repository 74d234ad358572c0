//! GSF track adapter.
//!
//! A [`GsfMusic`] is one opened GSF/minigsf image. It owns exactly one
//! decoder instance and pulls audio through a three-stage pipeline:
//!
//! ```text
//! decoder --(scratch buffer, i16 stereo)--> AudioStream --(host format)--> mixer
//! ```
//!
//! Nothing is rendered ahead of what the host asks for beyond one scratch
//! buffer. The whole image is kept in memory because the decoder needs it to
//! build a fresh instance when the host switches sub-tracks.

use crate::api::{DecoderApi, DecoderBackend, DecoderTags};
use crate::buffer::{SampleBufferMut, ScratchBuffer, MAX_VOLUME};
use crate::config::OutputSpec;
use crate::error::{set_last_error, GsfError, RecordError, Result};
use crate::ffi::NATIVE_CHANNELS;
use crate::loader::LibraryLease;
use crate::metadata::{MetaTag, MetaTags};
use crate::music::{MusicStream, Pull};
use crate::stream::AudioStream;
use std::io::{Read, Seek, SeekFrom};

/// Samples rendered once at open time to check the image plays.
pub const PRIME_SAMPLES: usize = 1024;

type Emu<B> = <<B as DecoderBackend>::Api as DecoderApi>::Emu;

/// Run `setup` on a fresh instance, deleting it if `setup` fails.
fn with_cleanup<A: DecoderApi, T>(
    api: &A,
    mut emu: A::Emu,
    setup: impl FnOnce(&mut A::Emu) -> Result<T>,
) -> Result<(A::Emu, T)> {
    match setup(&mut emu) {
        Ok(value) => Ok((emu, value)),
        Err(err) => {
            api.delete(emu);
            Err(err)
        }
    }
}

/// Create an instance for sub-track `track` and load `image` into it.
fn open_emu<A: DecoderApi>(api: &A, image: &[u8], sample_rate: u32, track: usize) -> Result<A::Emu> {
    let flags = i32::try_from(track).map_err(|_| GsfError::InvalidTrack {
        index: track,
        available: 0,
    })?;
    let emu = api.new_emu(sample_rate, flags)?;
    let (emu, ()) = with_cleanup(api, emu, |emu| api.load_data(emu, image))?;
    Ok(emu)
}

/// Sub-track index from the host's argument string (`None`/blank = 0).
pub fn parse_track_args(args: Option<&str>) -> Result<usize> {
    match args.map(str::trim) {
        None | Some("") => Ok(0),
        Some(text) => text
            .parse()
            .map_err(|_| GsfError::InvalidArgs(format!("expected a track index, got `{text}`"))),
    }
}

/// One opened GSF track.
pub struct GsfMusic<B: DecoderBackend> {
    tags: MetaTags,
    emu: Option<Emu<B>>,
    stream: AudioStream,
    scratch: ScratchBuffer,
    image: Vec<u8>,
    spec: OutputSpec,
    play_count: i32,
    volume: i32,
    track: usize,
    track_length: Option<u32>,
    /// Released last, after the instance is gone.
    lease: LibraryLease<B>,
}

impl<B: DecoderBackend> GsfMusic<B> {
    /// Open a track from a complete GSF image.
    ///
    /// `args` selects the initial sub-track. On any failure everything built
    /// so far, including the decoder instance and `lease`, is released.
    pub fn new<R: Read + Seek>(
        lease: LibraryLease<B>,
        spec: OutputSpec,
        src: R,
        args: Option<&str>,
    ) -> Result<Self> {
        Self::open(lease, spec, src, args).record()
    }

    fn open<R: Read + Seek>(
        lease: LibraryLease<B>,
        spec: OutputSpec,
        mut src: R,
        args: Option<&str>,
    ) -> Result<Self> {
        let track = parse_track_args(args)?;
        let mut stream = AudioStream::new(spec.sample_rate, NATIVE_CHANNELS, spec)?;
        let scratch = ScratchBuffer::new(spec.samples, NATIVE_CHANNELS)?;

        src.seek(SeekFrom::Start(0))?;
        let mut image = Vec::new();
        src.read_to_end(&mut image)?;
        if image.is_empty() {
            return Err(GsfError::EmptySource);
        }

        let api = lease.api();
        let emu = open_emu(api, &image, spec.sample_rate, track)?;
        let (emu, (available, native_rate, decoder_tags, track_length)) =
            with_cleanup(api, emu, |emu| {
                let available = api.num_channels(emu);
                if track >= available {
                    return Err(GsfError::InvalidTrack {
                        index: track,
                        available,
                    });
                }
                let native_rate = api.sample_rate(emu);
                let mut prime = [0i16; PRIME_SAMPLES];
                api.play(emu, &mut prime)?;
                Ok((available, native_rate, api.tags(emu)?, api.default_length(emu)))
            })?;

        if native_rate != 0 && native_rate != spec.sample_rate {
            stream = match AudioStream::new(native_rate, NATIVE_CHANNELS, spec) {
                Ok(stream) => stream,
                Err(err) => {
                    api.delete(emu);
                    return Err(err);
                }
            };
        }

        tracing::debug!(
            bytes = image.len(),
            track,
            tracks = available,
            native_rate,
            resampling = stream.is_resampling(),
            "GSF track opened"
        );

        let mut music = Self {
            tags: MetaTags::new(),
            emu: Some(emu),
            stream,
            scratch,
            image,
            spec,
            play_count: 0,
            volume: MAX_VOLUME,
            track,
            track_length,
            lease,
        };
        music.apply_tags(decoder_tags);
        Ok(music)
    }

    fn apply_tags(&mut self, tags: DecoderTags) {
        self.tags.clear();
        self.tags.set(MetaTag::Title, tags.title.as_deref());
        self.tags.set(MetaTag::Artist, tags.artist.as_deref());
        self.tags.set(MetaTag::Album, tags.game.as_deref());
        self.tags.set(MetaTag::Copyright, tags.copyright.as_deref());
    }

    /// One step of the pull loop: drain converted audio, rendering scratch
    /// buffers into the stream until some is available.
    ///
    /// Keeps rendering until converted audio is available, so a pull fills
    /// nothing only when the decoder has ended (`done`) or `out` has no room
    /// for a whole output frame. A decoder error fails this pull only; the
    /// track stays usable.
    pub fn get_some(&mut self, out: &mut SampleBufferMut<'_>) -> Result<Pull> {
        if out.len() < self.spec.channels as usize {
            return Ok(Pull::default());
        }
        loop {
            let filled = self.stream.get(out);
            if filled > 0 {
                return Ok(Pull {
                    filled,
                    done: false,
                });
            }

            let api = self.lease.api();
            let Some(emu) = self.emu.as_mut() else {
                return Err(GsfError::Decoder("decoder instance released".into()));
            };
            if api.ended(emu) {
                return Ok(Pull {
                    filled: 0,
                    done: true,
                });
            }
            if let Err(err) = api.play(emu, self.scratch.as_mut_slice()) {
                tracing::warn!(error = %err, "GSF render failed");
                return Err(err);
            }
            self.stream.put(self.scratch.as_slice())?;
        }
    }

    /// Repeat count given to the last [`play`](MusicStream::play).
    pub fn play_count(&self) -> i32 {
        self.play_count
    }

    /// Current sub-track index.
    pub fn current_track(&self) -> usize {
        self.track
    }

    /// Host output format of this track.
    pub fn output_spec(&self) -> &OutputSpec {
        &self.spec
    }

    /// Whether decoder output is resampled to the host rate.
    pub fn is_resampling(&self) -> bool {
        self.stream.is_resampling()
    }

    /// Tags of the current sub-track.
    pub fn tags(&self) -> &MetaTags {
        &self.tags
    }

    /// Size of the in-memory image.
    pub fn image_len(&self) -> usize {
        self.image.len()
    }
}

impl<B: DecoderBackend> MusicStream for GsfMusic<B> {
    fn set_volume(&mut self, volume: i32) {
        self.volume = volume.clamp(0, MAX_VOLUME);
    }

    fn volume(&self) -> i32 {
        self.volume
    }

    fn play(&mut self, play_count: i32) -> Result<()> {
        self.stream.clear();
        self.play_count = play_count;
        if let Some(emu) = self.emu.as_mut() {
            self.lease.api().seek(emu, 0);
        }
        Ok(())
    }

    fn play_audio(&mut self, mut out: SampleBufferMut<'_>) -> Result<Pull> {
        let total = out.len();
        let mut filled = 0;
        let mut done = false;

        while filled < total && !done {
            let pull = match self.get_some(&mut out.tail(filled)) {
                Ok(pull) => pull,
                Err(err) => {
                    out.slice(0..filled).apply_volume(self.volume);
                    set_last_error(&err);
                    return Err(err);
                }
            };
            done = pull.done;
            if pull.filled == 0 {
                // Ended, or less than one frame of room left.
                break;
            }
            filled += pull.filled;
        }

        out.slice(0..filled).apply_volume(self.volume);
        Ok(Pull { filled, done })
    }

    fn seek(&mut self, seconds: f64) -> Result<()> {
        let millis = (seconds * 1000.0 + 0.5).floor();
        let millis = if millis.is_finite() && millis > 0.0 {
            millis as u64
        } else {
            0
        };
        if let Some(emu) = self.emu.as_mut() {
            self.lease.api().seek(emu, millis);
        }
        self.stream.clear();
        Ok(())
    }

    fn tell(&self) -> f64 {
        self.emu
            .as_ref()
            .map_or(0.0, |emu| self.lease.api().tell(emu) as f64 / 1000.0)
    }

    fn duration(&self) -> f64 {
        self.track_length.map_or(-1.0, |ms| ms as f64 / 1000.0)
    }

    fn meta_tag(&self, tag: MetaTag) -> &str {
        self.tags.get(tag)
    }

    fn num_tracks(&self) -> usize {
        self.emu
            .as_ref()
            .map_or(0, |emu| self.lease.api().num_channels(emu))
    }

    fn start_track(&mut self, index: usize) -> Result<()> {
        let available = self.num_tracks();
        if index >= available {
            return Err(GsfError::InvalidTrack { index, available }).record();
        }

        let api = self.lease.api();
        let emu = open_emu(api, &self.image, self.spec.sample_rate, index).record()?;
        let (emu, (track_length, tags)) =
            with_cleanup(api, emu, |emu| Ok((api.default_length(emu), api.tags(emu)?))).record()?;

        if let Some(old) = self.emu.replace(emu) {
            api.delete(old);
        }
        self.track = index;
        self.track_length = track_length;
        self.apply_tags(tags);
        tracing::debug!(track = index, "GSF sub-track started");

        self.play(self.play_count)
    }
}

impl<B: DecoderBackend> Drop for GsfMusic<B> {
    fn drop(&mut self) {
        self.tags.clear();
        if let Some(emu) = self.emu.take() {
            self.lease.api().delete(emu);
        }
        tracing::debug!(track = self.track, "GSF track closed");
    }
}
