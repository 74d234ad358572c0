//! Typed sample buffers shared between the decoder, the conversion stream
//! and the host.
//!
//! Sample data never travels as untyped bytes: the decoder renders into a
//! [`ScratchBuffer`] of `i16`, and the host pulls into a [`SampleBufferMut`]
//! whose variant states the element type.

use crate::error::{GsfError, Result};
use serde::{Deserialize, Serialize};

/// Maximum mixer volume (full scale, no attenuation).
pub const MAX_VOLUME: i32 = 128;

/// Sample formats the host may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleFormat {
    /// Signed 16-bit integer, native endian
    #[default]
    S16,
    /// 32-bit float in -1.0..=1.0
    F32,
}

impl SampleFormat {
    /// Width of one sample in bytes.
    pub fn sample_size(self) -> usize {
        match self {
            SampleFormat::S16 => 2,
            SampleFormat::F32 => 4,
        }
    }
}

/// Mutable view of an interleaved host buffer.
#[derive(Debug)]
pub enum SampleBufferMut<'a> {
    /// Signed 16-bit samples
    S16(&'a mut [i16]),
    /// Float samples
    F32(&'a mut [f32]),
}

impl<'a> SampleBufferMut<'a> {
    /// Number of samples (not frames) in the view.
    pub fn len(&self) -> usize {
        match self {
            SampleBufferMut::S16(buf) => buf.len(),
            SampleBufferMut::F32(buf) => buf.len(),
        }
    }

    /// Whether the view holds no samples.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sample format of the view.
    pub fn format(&self) -> SampleFormat {
        match self {
            SampleBufferMut::S16(_) => SampleFormat::S16,
            SampleBufferMut::F32(_) => SampleFormat::F32,
        }
    }

    /// Reborrow the samples from `start` onwards.
    pub fn tail(&mut self, start: usize) -> SampleBufferMut<'_> {
        match self {
            SampleBufferMut::S16(buf) => SampleBufferMut::S16(&mut buf[start..]),
            SampleBufferMut::F32(buf) => SampleBufferMut::F32(&mut buf[start..]),
        }
    }

    /// Reborrow `range` of the samples.
    pub fn slice(&mut self, range: std::ops::Range<usize>) -> SampleBufferMut<'_> {
        match self {
            SampleBufferMut::S16(buf) => SampleBufferMut::S16(&mut buf[range]),
            SampleBufferMut::F32(buf) => SampleBufferMut::F32(&mut buf[range]),
        }
    }

    /// Store normalised float samples starting at `offset`.
    pub fn write_f32(&mut self, offset: usize, samples: &[f32]) {
        match self {
            SampleBufferMut::S16(buf) => {
                for (dst, &src) in buf[offset..offset + samples.len()].iter_mut().zip(samples) {
                    *dst = f32_to_i16(src);
                }
            }
            SampleBufferMut::F32(buf) => {
                for (dst, &src) in buf[offset..offset + samples.len()].iter_mut().zip(samples) {
                    *dst = src.clamp(-1.0, 1.0);
                }
            }
        }
    }

    /// Scale every sample by `volume / MAX_VOLUME`.
    pub fn apply_volume(&mut self, volume: i32) {
        let volume = volume.clamp(0, MAX_VOLUME);
        if volume == MAX_VOLUME {
            return;
        }
        match self {
            SampleBufferMut::S16(buf) => {
                for sample in buf.iter_mut() {
                    *sample = ((*sample as i32 * volume) / MAX_VOLUME) as i16;
                }
            }
            SampleBufferMut::F32(buf) => {
                let gain = volume as f32 / MAX_VOLUME as f32;
                for sample in buf.iter_mut() {
                    *sample *= gain;
                }
            }
        }
    }
}

impl<'a> From<&'a mut [i16]> for SampleBufferMut<'a> {
    fn from(buf: &'a mut [i16]) -> Self {
        SampleBufferMut::S16(buf)
    }
}

impl<'a> From<&'a mut [f32]> for SampleBufferMut<'a> {
    fn from(buf: &'a mut [f32]) -> Self {
        SampleBufferMut::F32(buf)
    }
}

/// Convert a signed 16-bit sample to float.
#[inline]
pub fn i16_to_f32(sample: i16) -> f32 {
    sample as f32 / 32768.0
}

/// Convert a float sample to signed 16-bit, saturating.
#[inline]
pub fn f32_to_i16(sample: f32) -> i16 {
    (sample * 32768.0).round().clamp(-32768.0, 32767.0) as i16
}

/// One render quantum of raw interleaved decoder output.
#[derive(Debug)]
pub struct ScratchBuffer {
    samples: Vec<i16>,
    channels: usize,
}

impl ScratchBuffer {
    /// Allocate `frames * channels` samples.
    ///
    /// Allocation failure is reported as [`GsfError::OutOfMemory`] instead of
    /// aborting the process.
    pub fn new(frames: usize, channels: usize) -> Result<Self> {
        let len = frames
            .checked_mul(channels)
            .ok_or_else(|| GsfError::OutOfMemory("scratch buffer size overflows".into()))?;
        let mut samples = Vec::new();
        samples.try_reserve_exact(len).map_err(|e| {
            GsfError::OutOfMemory(format!("scratch buffer of {len} samples: {e}"))
        })?;
        samples.resize(len, 0);
        Ok(Self { samples, channels })
    }

    /// Interleaved channels per frame.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Frames per render quantum.
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels
    }

    /// Samples (not frames) per render quantum.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the quantum is zero-sized.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Size in bytes of the rendered PCM.
    pub fn byte_len(&self) -> usize {
        self.samples.len() * std::mem::size_of::<i16>()
    }

    /// Rendered samples.
    pub fn as_slice(&self) -> &[i16] {
        &self.samples
    }

    /// Render target for the decoder.
    pub fn as_mut_slice(&mut self) -> &mut [i16] {
        &mut self.samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_scratch_buffer_size() {
        let scratch = ScratchBuffer::new(4096, 2).unwrap();
        assert_eq!(scratch.len(), 8192);
        assert_eq!(scratch.frames(), 4096);
        assert_eq!(scratch.byte_len(), 4096 * 2 * 2);
        assert!(scratch.as_slice().iter().all(|&s| s == 0));
    }

    #[test]
    fn test_scratch_buffer_overflow_is_oom() {
        let err = ScratchBuffer::new(usize::MAX, 2).unwrap_err();
        assert!(matches!(err, GsfError::OutOfMemory(_)));
    }

    #[test]
    fn test_sample_conversion() {
        assert_abs_diff_eq!(i16_to_f32(16384), 0.5, epsilon = 1e-6);
        assert_eq!(f32_to_i16(0.5), 16384);
        assert_eq!(f32_to_i16(2.0), i16::MAX);
        assert_eq!(f32_to_i16(-2.0), i16::MIN);
    }

    #[test]
    fn test_apply_volume() {
        let mut data = [1000i16, -1000, 128];
        let mut view = SampleBufferMut::from(&mut data[..]);
        view.apply_volume(64);
        assert_eq!(data, [500, -500, 64]);

        let mut floats = [0.8f32, -0.4];
        SampleBufferMut::from(&mut floats[..]).apply_volume(32);
        assert_abs_diff_eq!(floats[0], 0.2, epsilon = 1e-6);
        assert_abs_diff_eq!(floats[1], -0.1, epsilon = 1e-6);
    }

    #[test]
    fn test_full_volume_is_untouched() {
        let mut data = [12345i16, -3];
        SampleBufferMut::from(&mut data[..]).apply_volume(MAX_VOLUME);
        assert_eq!(data, [12345, -3]);
    }

    #[test]
    fn test_write_f32_into_views() {
        let mut data = [0i16; 4];
        let mut view = SampleBufferMut::from(&mut data[..]);
        view.write_f32(2, &[0.5, -0.5]);
        assert_eq!(view.format(), SampleFormat::S16);
        assert_eq!(data, [0, 0, 16384, -16384]);

        let mut floats = [0.0f32; 2];
        SampleBufferMut::from(&mut floats[..]).write_f32(0, &[1.5, 0.25]);
        assert_eq!(floats, [1.0, 0.25]);
    }
}
