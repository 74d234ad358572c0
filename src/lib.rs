//! GSF (Game Boy Advance) music codec for a host audio mixer
//!
//! Plays GSF and minigsf rips by delegating all emulation to libgsf, which is
//! resolved at runtime. This crate owns the glue around it: locating and
//! reference-counting the library, opening tracks from in-memory images,
//! converting the decoder's native PCM into the host's output format, and
//! exposing seek, position, duration, metadata and sub-track selection.
//!
//! # Features
//! - Runtime loading of libgsf via `libloading`, unloaded when the last track closes
//! - Per-track format conversion (channel remap, resampling with `rubato`)
//! - Sub-track selection by argument string or [`MusicStream::start_track`]
//! - Title / artist / album (game) / copyright tags
//! - Thread-local last-error string for hosts with C-style error reporting
//!
//! # Crate feature flags
//! - `static-link` (opt-in): link libgsf at build time (`StaticLoader`)
//! - `mock` (opt-in): export the deterministic `MockLoader` backend
//!
//! # Quick start
//! ```no_run
//! use gsf_music::{GsfCodec, MusicCodec, MusicStream, OutputSpec, SampleBufferMut};
//! let codec = GsfCodec::from_env(OutputSpec::new(48_000));
//! let file = std::fs::File::open("track.minigsf").unwrap();
//! let mut music = codec.create_from_reader(Some(file)).unwrap();
//! music.play(1).unwrap();
//! let mut out = vec![0i16; 4096];
//! let pull = music.play_audio(SampleBufferMut::from(&mut out[..])).unwrap();
//! println!("{} samples, done: {}", pull.filled, pull.done);
//! ```

#![warn(missing_docs)]

pub mod api; // Decoder capability table
pub mod buffer; // Sample views and scratch storage
pub mod codec; // Host registration
pub mod config; // Output / loader configuration
pub mod dynamic; // Runtime-loaded libgsf
pub mod error; // Error type and last-error slot
pub mod ffi; // libgsf C ABI
pub mod gsf_music; // Track adapter
pub mod loader; // Refcounted library handle
pub mod metadata; // Tag storage
pub mod music; // Host-facing traits
pub mod native; // libgsf function table
pub mod stream; // Format conversion
#[cfg(feature = "static-link")]
pub mod static_link; // Build-time linked libgsf

#[cfg(any(test, feature = "mock"))]
pub mod mock;

// Public API exports
pub use api::{DecoderApi, DecoderBackend, DecoderTags};
pub use buffer::{SampleBufferMut, SampleFormat, ScratchBuffer, MAX_VOLUME};
pub use codec::GsfCodec;
pub use config::{LoaderConfig, OutputSpec, DEFAULT_RENDER_SAMPLES, DEFAULT_SAMPLE_RATE};
pub use dynamic::DynamicLoader;
pub use error::{clear_last_error, last_error, GsfError, Result};
pub use gsf_music::GsfMusic;
pub use loader::{DecoderLibrary, LibraryLease};
pub use metadata::{MetaTag, MetaTags};
pub use music::{MusicCaps, MusicCodec, MusicInterfaceInfo, MusicStream, MusicType, Pull};
pub use native::NativeGsf;
pub use stream::AudioStream;

#[cfg(feature = "static-link")]
pub use static_link::StaticLoader;

#[cfg(feature = "mock")]
pub use mock::{MockConfig, MockLoader};
