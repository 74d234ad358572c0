//! Format-conversion stream between the decoder and the host.
//!
//! Raw interleaved `i16` PCM goes in at the decoder's rate and channel
//! layout; converted samples come out in the host's [`OutputSpec`]. When the
//! rates differ the data runs through an FFT resampler from `rubato`, which
//! works on fixed-size chunks, so input is accumulated until a full chunk is
//! available.

use crate::buffer::{i16_to_f32, SampleBufferMut};
use crate::config::OutputSpec;
use crate::error::{GsfError, Result};
use rubato::{FftFixedInOut, Resampler};
use std::collections::VecDeque;

/// Resampler chunk size in frames.
const RESAMPLE_CHUNK: usize = 1024;

/// Buffering converter from decoder PCM to the host format.
pub struct AudioStream {
    src_rate: u32,
    src_channels: usize,
    dst: OutputSpec,
    resampler: Option<ChunkResampler>,
    /// Converted, interleaved in the output layout
    queue: VecDeque<f32>,
}

struct ChunkResampler {
    inner: FftFixedInOut<f32>,
    channels: usize,
    /// Interleaved frames waiting for a full chunk
    pending: Vec<f32>,
    input_buffers: Vec<Vec<f32>>,
}

impl AudioStream {
    /// Build a stream converting `src_rate`/`src_channels` S16 into `dst`.
    pub fn new(src_rate: u32, src_channels: usize, dst: OutputSpec) -> Result<Self> {
        dst.validate()?;
        if src_rate == 0 || !(1..=2).contains(&src_channels) {
            return Err(GsfError::Stream(format!(
                "unsupported source format: {src_rate} Hz, {src_channels} channels"
            )));
        }

        let resampler = if src_rate != dst.sample_rate {
            Some(ChunkResampler::new(
                src_rate,
                dst.sample_rate,
                dst.channels as usize,
            )?)
        } else {
            None
        };

        Ok(Self {
            src_rate,
            src_channels,
            dst,
            resampler,
            queue: VecDeque::new(),
        })
    }

    /// Rate the input is expected at.
    pub fn source_rate(&self) -> u32 {
        self.src_rate
    }

    /// Format samples are converted to.
    pub fn output_spec(&self) -> &OutputSpec {
        &self.dst
    }

    /// Whether samples pass through a resampler.
    pub fn is_resampling(&self) -> bool {
        self.resampler.is_some()
    }

    /// Converted samples ready to be pulled.
    pub fn available(&self) -> usize {
        self.queue.len()
    }

    /// Push raw decoder samples (interleaved, whole frames).
    pub fn put(&mut self, samples: &[i16]) -> Result<()> {
        if samples.len() % self.src_channels != 0 {
            return Err(GsfError::Stream(format!(
                "{} samples is not a whole number of {}-channel frames",
                samples.len(),
                self.src_channels
            )));
        }

        let dst_channels = self.dst.channels as usize;
        let mut remapped = Vec::with_capacity(samples.len() / self.src_channels * dst_channels);
        for frame in samples.chunks_exact(self.src_channels) {
            match (self.src_channels, dst_channels) {
                (2, 1) => remapped.push((i16_to_f32(frame[0]) + i16_to_f32(frame[1])) * 0.5),
                (1, 2) => {
                    let s = i16_to_f32(frame[0]);
                    remapped.push(s);
                    remapped.push(s);
                }
                _ => remapped.extend(frame.iter().map(|&s| i16_to_f32(s))),
            }
        }

        match &mut self.resampler {
            Some(resampler) => resampler.process(&remapped, &mut self.queue),
            None => {
                self.queue.extend(remapped);
                Ok(())
            }
        }
    }

    /// Move up to `out.len()` converted samples into `out`, whole frames
    /// only; returns how many.
    pub fn get(&mut self, out: &mut SampleBufferMut<'_>) -> usize {
        let channels = self.dst.channels as usize;
        let n = out.len().min(self.queue.len());
        let n = n - n % channels;
        if n == 0 {
            return 0;
        }
        let (front, back) = self.queue.as_slices();
        let first = front.len().min(n);
        out.write_f32(0, &front[..first]);
        if n > first {
            out.write_f32(first, &back[..n - first]);
        }
        self.queue.drain(..n);
        n
    }

    /// Drop everything buffered, converted or not, including the
    /// resampler's filter history.
    pub fn clear(&mut self) {
        self.queue.clear();
        if let Some(resampler) = &mut self.resampler {
            resampler.pending.clear();
            resampler.inner.reset();
        }
    }
}

impl ChunkResampler {
    fn new(src_rate: u32, dst_rate: u32, channels: usize) -> Result<Self> {
        let inner = FftFixedInOut::<f32>::new(
            src_rate as usize,
            dst_rate as usize,
            RESAMPLE_CHUNK,
            channels,
        )
        .map_err(|e| GsfError::Stream(format!("failed to create resampler: {e}")))?;
        let chunk = inner.input_frames_max();
        Ok(Self {
            inner,
            channels,
            pending: Vec::with_capacity(chunk * channels * 2),
            input_buffers: vec![vec![0.0; chunk]; channels],
        })
    }

    fn process(&mut self, input: &[f32], queue: &mut VecDeque<f32>) -> Result<()> {
        self.pending.extend_from_slice(input);

        loop {
            let frames = self.inner.input_frames_next();
            let needed = frames * self.channels;
            if self.pending.len() < needed {
                return Ok(());
            }

            for buffer in &mut self.input_buffers {
                buffer.resize(frames, 0.0);
            }
            for (i, frame) in self.pending[..needed].chunks_exact(self.channels).enumerate() {
                for (ch, &sample) in frame.iter().enumerate() {
                    self.input_buffers[ch][i] = sample;
                }
            }

            let output = self
                .inner
                .process(&self.input_buffers, None)
                .map_err(|e| GsfError::Stream(format!("resampler: {e}")))?;
            let out_frames = output.first().map_or(0, Vec::len);
            for i in 0..out_frames {
                for channel in &output {
                    queue.push_back(channel[i]);
                }
            }

            self.pending.drain(..needed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::SampleFormat;

    fn spec(rate: u32, channels: u16) -> OutputSpec {
        OutputSpec::new(rate).channels(channels).samples(256)
    }

    #[test]
    fn test_passthrough_same_rate() {
        let mut stream = AudioStream::new(44_100, 2, spec(44_100, 2)).unwrap();
        assert!(!stream.is_resampling());

        stream.put(&[100, -100, 200, -200]).unwrap();
        assert_eq!(stream.available(), 4);

        let mut out = [0i16; 8];
        let n = stream.get(&mut SampleBufferMut::from(&mut out[..]));
        assert_eq!(n, 4);
        assert_eq!(&out[..4], &[100, -100, 200, -200]);
        assert_eq!(stream.available(), 0);
    }

    #[test]
    fn test_partial_get_keeps_remainder() {
        let mut stream = AudioStream::new(32_768, 2, spec(32_768, 2)).unwrap();
        stream.put(&[1, 2, 3, 4, 5, 6]).unwrap();

        let mut out = [0i16; 4];
        assert_eq!(stream.get(&mut SampleBufferMut::from(&mut out[..])), 4);
        assert_eq!(out, [1, 2, 3, 4]);

        let mut rest = [0i16; 4];
        assert_eq!(stream.get(&mut SampleBufferMut::from(&mut rest[..])), 2);
        assert_eq!(&rest[..2], &[5, 6]);
    }

    #[test]
    fn test_stereo_to_mono_downmix() {
        let mut stream = AudioStream::new(44_100, 2, spec(44_100, 1)).unwrap();
        stream.put(&[1000, 3000, -2000, 0]).unwrap();

        let mut out = [0i16; 2];
        assert_eq!(stream.get(&mut SampleBufferMut::from(&mut out[..])), 2);
        assert_eq!(out, [2000, -1000]);
    }

    #[test]
    fn test_float_output() {
        let mut stream =
            AudioStream::new(44_100, 2, spec(44_100, 2).format(SampleFormat::F32)).unwrap();
        stream.put(&[16384, -16384]).unwrap();

        let mut out = [0.0f32; 2];
        assert_eq!(stream.get(&mut SampleBufferMut::from(&mut out[..])), 2);
        assert_eq!(out, [0.5, -0.5]);
    }

    #[test]
    fn test_rejects_partial_frames() {
        let mut stream = AudioStream::new(44_100, 2, spec(44_100, 2)).unwrap();
        assert!(matches!(stream.put(&[1, 2, 3]), Err(GsfError::Stream(_))));
    }

    #[test]
    fn test_clear_discards_buffered_audio() {
        let mut stream = AudioStream::new(44_100, 2, spec(44_100, 2)).unwrap();
        stream.put(&[1, 2, 3, 4]).unwrap();
        stream.clear();
        assert_eq!(stream.available(), 0);
    }

    #[test]
    fn test_resampling_produces_whole_frames() {
        let mut stream = AudioStream::new(22_050, 2, spec(44_100, 2)).unwrap();
        assert!(stream.is_resampling());

        let input = vec![1000i16; 8192 * 2];
        stream.put(&input).unwrap();

        let produced = stream.available();
        assert!(produced > 0);
        assert_eq!(produced % 2, 0);
        assert!(produced <= input.len() * 2);
    }

    #[test]
    fn test_clear_resets_resampler_history() {
        let mut stream = AudioStream::new(22_050, 2, spec(44_100, 2)).unwrap();
        stream.put(&vec![20_000i16; 4096 * 2]).unwrap();
        stream.clear();

        stream.put(&vec![0i16; 4096 * 2]).unwrap();
        let mut out = vec![0i16; stream.available()];
        assert!(!out.is_empty());
        stream.get(&mut SampleBufferMut::from(&mut out[..]));
        assert!(out.iter().all(|&s| s == 0));
    }

    #[test]
    fn test_get_returns_whole_frames() {
        let mut stream = AudioStream::new(44_100, 2, spec(44_100, 2)).unwrap();
        stream.put(&[1, 2, 3, 4]).unwrap();

        let mut odd = [0i16; 3];
        assert_eq!(stream.get(&mut SampleBufferMut::from(&mut odd[..])), 2);
        assert_eq!(&odd[..2], &[1, 2]);

        let mut single = [0i16; 1];
        assert_eq!(stream.get(&mut SampleBufferMut::from(&mut single[..])), 0);
        assert_eq!(stream.available(), 2);
    }

    #[test]
    fn test_invalid_source_format() {
        assert!(AudioStream::new(0, 2, spec(44_100, 2)).is_err());
        assert!(AudioStream::new(44_100, 6, spec(44_100, 2)).is_err());
        assert!(AudioStream::new(44_100, 2, spec(0, 2)).is_err());
    }
}
