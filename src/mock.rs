//! Deterministic in-process stand-in for libgsf.
//!
//! `MockLoader` is a [`DecoderBackend`] whose decoder renders a counting
//! pattern instead of emulating a GBA. It keeps counters (library opens and
//! closes, live instances, render calls) so tests can check that the adapter
//! pairs every acquisition and allocation with its release.
//!
//! Images must start with the PSF signature (`b"PSF"`); anything else is
//! rejected the way the real decoder rejects foreign data.

use crate::api::{DecoderApi, DecoderBackend, DecoderTags};
use crate::error::{GsfError, Result};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;

/// Length used for tracks that declare none.
pub const UNTIMED_TRACK_MS: u64 = 2_000;

/// One sub-track of the mock image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockTrack {
    /// Declared length; `None` plays for [`UNTIMED_TRACK_MS`]
    pub length_ms: Option<u32>,
    /// Tags reported while this track is selected
    pub tags: DecoderTags,
}

impl MockTrack {
    /// Track with `title` and fixed artist, game and copyright tags.
    pub fn new(title: &str, length_ms: Option<u32>) -> Self {
        Self {
            length_ms,
            tags: DecoderTags {
                title: Some(title.to_string()),
                artist: Some("Mock Composer".to_string()),
                game: Some("Mock Adventure".to_string()),
                copyright: Some("2004 Mock Soft".to_string()),
            },
        }
    }
}

/// Behaviour of the mock decoder.
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Sub-tracks of every loaded image
    pub tracks: Vec<MockTrack>,
    /// Rate reported by the decoder; `None` echoes the requested rate
    pub native_rate: Option<u32>,
    /// Refuse to resolve the library
    pub fail_open: bool,
    /// Reject instance creation with this message
    pub fail_new: Option<String>,
    /// Reject image loading with this message
    pub fail_load: Option<String>,
    /// Fail tag reads with this message
    pub fail_tags: Option<String>,
    /// Fail every render call once this many have succeeded
    pub fail_play_after: Option<usize>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            tracks: vec![MockTrack::new("Mock Title", Some(3_000))],
            native_rate: None,
            fail_open: false,
            fail_new: None,
            fail_load: None,
            fail_tags: None,
            fail_play_after: None,
        }
    }
}

#[derive(Debug, Default)]
struct MockState {
    config: MockConfig,
    opens: usize,
    closes: usize,
    live_emus: usize,
    play_calls: usize,
}

/// Backend handing out [`MockGsf`] tables that share one state.
#[derive(Debug, Clone)]
pub struct MockLoader {
    state: Arc<Mutex<MockState>>,
}

impl MockLoader {
    /// Backend with fresh counters behaving as `config`.
    pub fn new(config: MockConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                config,
                ..MockState::default()
            })),
        }
    }

    /// Change behaviour of instances created or rendered from now on.
    pub fn configure(&self, f: impl FnOnce(&mut MockConfig)) {
        f(&mut self.state.lock().config);
    }

    /// Times the library was resolved.
    pub fn opens(&self) -> usize {
        self.state.lock().opens
    }

    /// Times a resolved library was dropped.
    pub fn closes(&self) -> usize {
        self.state.lock().closes
    }

    /// Decoder instances created and not yet deleted.
    pub fn live_emus(&self) -> usize {
        self.state.lock().live_emus
    }

    /// Render calls that reached the decoder.
    pub fn play_calls(&self) -> usize {
        self.state.lock().play_calls
    }
}

impl DecoderBackend for MockLoader {
    type Api = MockGsf;

    fn open(&self) -> Result<MockGsf> {
        let mut state = self.state.lock();
        if state.config.fail_open {
            return Err(GsfError::LibraryUnavailable {
                reason: "mock library disabled".into(),
            });
        }
        state.opens += 1;
        Ok(MockGsf {
            state: Arc::clone(&self.state),
        })
    }
}

/// Mock capability table.
#[derive(Debug)]
pub struct MockGsf {
    state: Arc<Mutex<MockState>>,
}

impl Drop for MockGsf {
    fn drop(&mut self) {
        self.state.lock().closes += 1;
    }
}

/// Mock decoder instance.
#[derive(Debug)]
pub struct MockEmu {
    rate: u32,
    track: usize,
    image: Option<Vec<u8>>,
    seek_ms: u64,
    frames_since_seek: u64,
}

impl MockEmu {
    fn track<'a>(&self, config: &'a MockConfig) -> Option<&'a MockTrack> {
        config.tracks.get(self.track)
    }

    fn position_ms(&self) -> u64 {
        self.seek_ms + self.frames_since_seek * 1000 / self.rate as u64
    }

    fn end_ms(&self, config: &MockConfig) -> u64 {
        self.track(config)
            .and_then(|t| t.length_ms)
            .map_or(UNTIMED_TRACK_MS, u64::from)
    }
}

impl DecoderApi for MockGsf {
    type Emu = MockEmu;

    fn new_emu(&self, sample_rate: u32, flags: i32) -> Result<MockEmu> {
        let mut state = self.state.lock();
        if let Some(msg) = &state.config.fail_new {
            return Err(GsfError::Decoder(msg.clone()));
        }
        state.live_emus += 1;
        Ok(MockEmu {
            rate: state.config.native_rate.unwrap_or(sample_rate).max(1),
            track: flags.max(0) as usize,
            image: None,
            seek_ms: 0,
            frames_since_seek: 0,
        })
    }

    fn load_file(&self, emu: &mut MockEmu, path: &Path) -> Result<()> {
        let data = std::fs::read(path)?;
        self.load_data(emu, &data)
    }

    fn load_data(&self, emu: &mut MockEmu, data: &[u8]) -> Result<()> {
        let state = self.state.lock();
        if let Some(msg) = &state.config.fail_load {
            return Err(GsfError::Decoder(msg.clone()));
        }
        if !data.starts_with(b"PSF") {
            return Err(GsfError::Decoder("not a GSF image".into()));
        }
        emu.image = Some(data.to_vec());
        Ok(())
    }

    fn num_channels(&self, emu: &MockEmu) -> usize {
        if emu.image.is_none() {
            return 0;
        }
        self.state.lock().config.tracks.len()
    }

    fn sample_rate(&self, emu: &MockEmu) -> u32 {
        emu.rate
    }

    fn ended(&self, emu: &MockEmu) -> bool {
        let state = self.state.lock();
        emu.position_ms() >= emu.end_ms(&state.config)
    }

    fn seek(&self, emu: &mut MockEmu, millis: u64) {
        emu.seek_ms = millis;
        emu.frames_since_seek = 0;
    }

    fn tell(&self, emu: &MockEmu) -> u64 {
        emu.position_ms()
    }

    fn play(&self, emu: &mut MockEmu, out: &mut [i16]) -> Result<()> {
        let mut state = self.state.lock();
        if emu.image.is_none() {
            return Err(GsfError::Decoder("no image loaded".into()));
        }
        if let Some(limit) = state.config.fail_play_after {
            if state.play_calls >= limit {
                return Err(GsfError::Decoder("emulation fault".into()));
            }
        }
        state.play_calls += 1;

        let start = emu.seek_ms * emu.rate as u64 / 1000 + emu.frames_since_seek;
        for (i, frame) in out.chunks_mut(2).enumerate() {
            let value = ((start + i as u64) % 1000) as i16;
            for sample in frame {
                *sample = value;
            }
        }
        emu.frames_since_seek += (out.len() / 2) as u64;
        Ok(())
    }

    fn tags(&self, emu: &MockEmu) -> Result<DecoderTags> {
        let state = self.state.lock();
        if let Some(msg) = &state.config.fail_tags {
            return Err(GsfError::Decoder(msg.clone()));
        }
        Ok(emu
            .track(&state.config)
            .map(|t| t.tags.clone())
            .unwrap_or_default())
    }

    fn default_length(&self, emu: &MockEmu) -> Option<u32> {
        let state = self.state.lock();
        emu.track(&state.config).and_then(|t| t.length_ms)
    }

    fn delete(&self, emu: MockEmu) {
        let mut state = self.state.lock();
        state.live_emus = state.live_emus.saturating_sub(1);
        drop(emu);
    }
}

/// A minimal image the mock decoder accepts.
pub fn mock_image() -> Vec<u8> {
    let mut image = b"PSF\x22".to_vec();
    image.extend_from_slice(&[0u8; 60]);
    image
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_advances_position() {
        let loader = MockLoader::new(MockConfig::default());
        let api = loader.open().unwrap();
        let mut emu = api.new_emu(1000, 0).unwrap();
        api.load_data(&mut emu, &mock_image()).unwrap();

        let mut out = [0i16; 200];
        api.play(&mut emu, &mut out).unwrap();
        assert_eq!(api.tell(&emu), 100);
        assert_eq!(out[0], out[1]);
        assert_eq!(out[2], 1);

        api.delete(emu);
        assert_eq!(loader.live_emus(), 0);
    }

    #[test]
    fn test_rejects_foreign_data() {
        let loader = MockLoader::new(MockConfig::default());
        let api = loader.open().unwrap();
        let mut emu = api.new_emu(44_100, 0).unwrap();
        assert!(api.load_data(&mut emu, b"RIFF....").is_err());
        api.delete(emu);
    }

    #[test]
    fn test_ends_at_track_length() {
        let loader = MockLoader::new(MockConfig::default());
        let api = loader.open().unwrap();
        let mut emu = api.new_emu(1000, 0).unwrap();
        api.load_data(&mut emu, &mock_image()).unwrap();

        api.seek(&mut emu, 2_999);
        assert!(!api.ended(&emu));
        let mut out = [0i16; 2];
        api.play(&mut emu, &mut out).unwrap();
        assert!(api.ended(&emu));
        api.delete(emu);
    }
}
