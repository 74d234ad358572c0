//! Host output and library search configuration.

use crate::buffer::SampleFormat;
use crate::error::{GsfError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default output sample rate (44.1 kHz CD quality).
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Default render quantum in sample frames.
pub const DEFAULT_RENDER_SAMPLES: usize = 4096;

/// Environment variable naming an extra directory to search for libgsf.
pub const LIBRARY_DIR_ENV: &str = "GSF_LIBRARY_DIR";

/// Output format the host mixer expects from every codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSpec {
    /// Output sample rate in Hz
    pub sample_rate: u32,
    /// Interleaved output channels (1 or 2)
    pub channels: u16,
    /// Output sample format
    pub format: SampleFormat,
    /// Render quantum in sample frames
    pub samples: usize,
}

impl Default for OutputSpec {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            channels: 2,
            format: SampleFormat::S16,
            samples: DEFAULT_RENDER_SAMPLES,
        }
    }
}

impl OutputSpec {
    /// Spec with the given rate and defaults for everything else.
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            ..Default::default()
        }
    }

    /// Set the interleaved output channel count.
    pub fn channels(mut self, channels: u16) -> Self {
        self.channels = channels;
        self
    }

    /// Set the output sample format.
    pub fn format(mut self, format: SampleFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the render quantum in frames.
    pub fn samples(mut self, samples: usize) -> Self {
        self.samples = samples;
        self
    }

    /// Parse an output format from JSON, e.g. `{"sample_rate":48000,"channels":2,"format":"f32","samples":1024}`.
    pub fn from_json(text: &str) -> Result<Self> {
        let spec: Self = serde_json::from_str(text)
            .map_err(|e| GsfError::Stream(format!("invalid output spec: {e}")))?;
        spec.validate()?;
        Ok(spec)
    }

    /// Reject specs the conversion stream cannot serve.
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(GsfError::Stream("output sample rate is zero".into()));
        }
        if !(1..=2).contains(&self.channels) {
            return Err(GsfError::Stream(format!(
                "unsupported output channel count {}",
                self.channels
            )));
        }
        if self.samples == 0 {
            return Err(GsfError::Stream("render quantum is zero".into()));
        }
        Ok(())
    }
}

/// Where and under which names to look for the decoder library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Directories tried before the system search path, in order
    pub search_dirs: Vec<PathBuf>,
    /// Library file names tried in each location
    pub library_names: Vec<String>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            search_dirs: Vec::new(),
            library_names: platform_library_names()
                .iter()
                .map(|name| name.to_string())
                .collect(),
        }
    }
}

impl LoaderConfig {
    /// Default names plus the directory from `GSF_LIBRARY_DIR`, if set.
    pub fn from_env() -> Self {
        let config = Self::default();
        match std::env::var_os(LIBRARY_DIR_ENV) {
            Some(dir) if !dir.is_empty() => config.with_search_dir(dir),
            _ => config,
        }
    }

    /// Append a directory to search before the system path.
    pub fn with_search_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.search_dirs.push(dir.into());
        self
    }

    /// Every path to try, directory candidates first, then bare names for the
    /// system loader.
    pub fn candidates(&self) -> Vec<PathBuf> {
        let mut candidates = Vec::new();
        for dir in &self.search_dirs {
            for name in &self.library_names {
                candidates.push(dir.join(name));
            }
        }
        for name in &self.library_names {
            candidates.push(PathBuf::from(name));
        }
        candidates
    }
}

fn platform_library_names() -> &'static [&'static str] {
    if cfg!(target_os = "windows") {
        &["gsf.dll", "libgsf.dll"]
    } else if cfg!(target_os = "macos") {
        &["libgsf.dylib", "libgsf.0.dylib"]
    } else {
        &["libgsf.so", "libgsf.so.0"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_spec_is_valid() {
        let spec = OutputSpec::default();
        assert_eq!(spec.sample_rate, 44_100);
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.format, SampleFormat::S16);
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_spec_builder_and_validation() {
        let spec = OutputSpec::new(48_000)
            .channels(1)
            .format(SampleFormat::F32)
            .samples(512);
        assert!(spec.validate().is_ok());

        assert!(OutputSpec::new(0).validate().is_err());
        assert!(OutputSpec::default().channels(6).validate().is_err());
        assert!(OutputSpec::default().samples(0).validate().is_err());
    }

    #[test]
    fn test_spec_from_json() {
        let spec = OutputSpec::from_json(
            r#"{"sample_rate":48000,"channels":2,"format":"f32","samples":1024}"#,
        )
        .unwrap();
        assert_eq!(spec.sample_rate, 48_000);
        assert_eq!(spec.format, SampleFormat::F32);
        assert_eq!(spec.samples, 1024);

        assert!(OutputSpec::from_json(r#"{"sample_rate":0,"channels":2,"format":"s16","samples":1}"#).is_err());
        assert!(OutputSpec::from_json("not json").is_err());
    }

    #[test]
    fn test_loader_candidates_order() {
        let config = LoaderConfig {
            search_dirs: vec![PathBuf::from("/opt/gsf")],
            library_names: vec!["libgsf.so".into()],
        };
        let candidates = config.candidates();
        assert_eq!(
            candidates,
            vec![PathBuf::from("/opt/gsf/libgsf.so"), PathBuf::from("libgsf.so")]
        );
    }

    #[test]
    fn test_loader_default_has_platform_names() {
        let config = LoaderConfig::default().with_search_dir("/tmp");
        assert!(!config.library_names.is_empty());
        assert_eq!(config.candidates().len(), config.library_names.len() * 2);
    }
}
