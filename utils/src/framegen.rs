//! Test pattern producer, standing in for a capture device.
use std::time::Instant;

use log::trace;
use tcambuf::{MemoryBuffer, PixelFormat, StreamStatistics, VideoFormat};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NewFrameGeneratorError {
    #[error("Unsupported pixel format {0}")]
    UnsupportedFormat(PixelFormat),
    #[error("Invalid pitch")]
    InvalidPitch,
    #[error("Frame size overflows")]
    FrameTooLarge,
}

#[derive(Debug, Error)]
pub enum GenerateFrameError {
    #[error("Buffer is locked by a consumer")]
    BufferLocked,
    #[error("Provided buffer is too small")]
    BufferTooSmall,
}

/// Writes an RGB test pattern into buffers and stamps them with capture
/// statistics, like a capture device would.
pub struct FrameGenerator {
    format: VideoFormat,
    pitch: usize,
    step: u32,
    frame_count: u64,
    frames_dropped: u64,
    start: Instant,
}

impl FrameGenerator {
    pub fn new(format: VideoFormat, pitch: usize) -> Result<Self, NewFrameGeneratorError> {
        if format.pixelformat != PixelFormat::RGB3 {
            return Err(NewFrameGeneratorError::UnsupportedFormat(
                format.pixelformat,
            ));
        }
        match format.min_pitch() {
            Some(min_pitch) if min_pitch > 0 && pitch >= min_pitch => (),
            _ => return Err(NewFrameGeneratorError::InvalidPitch),
        }
        // `frame_size()` relies on this product fitting in a usize.
        pitch
            .checked_mul(format.height as usize)
            .ok_or(NewFrameGeneratorError::FrameTooLarge)?;

        Ok(FrameGenerator {
            format,
            pitch,
            step: 0,
            frame_count: 0,
            frames_dropped: 0,
            start: Instant::now(),
        })
    }

    pub fn format(&self) -> VideoFormat {
        self.format
    }

    pub fn pitch(&self) -> usize {
        self.pitch
    }

    pub fn frame_size(&self) -> usize {
        self.pitch * self.format.height as usize
    }

    /// Account for a frame that could not be delivered. It will show up in
    /// the statistics of the next generated frame.
    pub fn drop_frame(&mut self) {
        self.frames_dropped += 1;
        self.step = self.step.wrapping_add(1);
    }

    /// Write the next frame into `buffer` and update its format and
    /// statistics. Locked buffers are left untouched.
    pub fn next_frame(&mut self, buffer: &mut MemoryBuffer) -> Result<(), GenerateFrameError> {
        if buffer.is_locked() {
            return Err(GenerateFrameError::BufferLocked);
        }
        if buffer.len() < self.frame_size() {
            return Err(GenerateFrameError::BufferTooSmall);
        }

        // Safe because we do not hand out any other access to the buffer
        // while the pattern is being written.
        self.gen_pattern(unsafe { buffer.as_mut_slice() });
        self.step = self.step.wrapping_add(1);
        self.frame_count += 1;

        let capture_time_ns = self.start.elapsed().as_nanos() as u64;
        let camera_time_ns = if self.format.framerate > 0.0 {
            ((self.frame_count + self.frames_dropped) as f64 * 1e9 / self.format.framerate) as u64
        } else {
            capture_time_ns
        };
        let stats = StreamStatistics {
            frame_count: self.frame_count,
            frames_dropped: self.frames_dropped,
            capture_time_ns,
            camera_time_ns,
            framerate: self.format.framerate,
            is_damaged: false,
        };

        let desc = buffer
            .image_buffer()
            .with_format(self.format, self.pitch)
            .with_statistics(stats);
        buffer.set_image_buffer(desc);
        trace!("Generated frame {} into {:p}", self.frame_count, buffer.data());

        Ok(())
    }

    fn gen_pattern(&mut self, frame: &mut [u8]) {
        let width = self.format.width as usize;

        frame
            .chunks_exact_mut(self.pitch)
            .take(self.format.height as usize)
            .map(|l| &mut l[0..width * 3])
            .enumerate()
            .for_each(|(y, line)| {
                line.chunks_exact_mut(3).enumerate().for_each(|(x, pixel)| {
                    let rgba = self.step.wrapping_add((x ^ y) as u32).to_le_bytes();
                    pixel.copy_from_slice(&rgba[0..3]);
                });
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tcambuf::ImageBuffer;

    fn rgb_format() -> VideoFormat {
        VideoFormat {
            framerate: 30.0,
            ..VideoFormat::from((PixelFormat::RGB3, (4, 2)))
        }
    }

    #[test]
    fn rejects_bad_pitch_and_format() {
        assert!(matches!(
            FrameGenerator::new(rgb_format(), 11),
            Err(NewFrameGeneratorError::InvalidPitch)
        ));
        let grey = VideoFormat::from((PixelFormat::GREY, (4, 2)));
        assert!(matches!(
            FrameGenerator::new(grey, 4),
            Err(NewFrameGeneratorError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn rejects_empty_lines() {
        let format = VideoFormat::from((PixelFormat::RGB3, (0, 2)));
        assert!(matches!(
            FrameGenerator::new(format, 0),
            Err(NewFrameGeneratorError::InvalidPitch)
        ));
        assert!(matches!(
            FrameGenerator::new(format, 12),
            Err(NewFrameGeneratorError::InvalidPitch)
        ));
    }

    #[test]
    fn rejects_overflowing_frame_size() {
        let format = VideoFormat::from((PixelFormat::RGB3, (4, 2)));
        assert!(matches!(
            FrameGenerator::new(format, usize::MAX),
            Err(NewFrameGeneratorError::FrameTooLarge)
        ));
    }

    #[test]
    fn fills_buffer_and_stamps_statistics() {
        let mut memory = vec![0u8; 32];
        let mut gen = FrameGenerator::new(rgb_format(), 16).unwrap();
        let mut buffer = MemoryBuffer::new(ImageBuffer::new(&mut memory));

        gen.next_frame(&mut buffer).unwrap();
        let stats = buffer.statistics();
        assert_eq!(stats.frame_count, 1);
        assert_eq!(stats.frames_dropped, 0);
        assert_eq!(stats.framerate, 30.0);
        assert_eq!(buffer.format(), rgb_format());
        assert_eq!(buffer.pitch(), 16);

        gen.drop_frame();
        gen.next_frame(&mut buffer).unwrap();
        let stats = buffer.statistics();
        assert_eq!(stats.frame_count, 2);
        assert_eq!(stats.frames_dropped, 1);
        assert!(stats.camera_time_ns > 0);
        drop(buffer);

        // Second frame is generated at step 2. Pixel (1, 0) is 2 + 1.
        assert_eq!(&memory[3..6], &[3, 0, 0]);
        // Padding at the end of lines is left alone.
        assert_eq!(&memory[12..16], &[0; 4]);
    }

    #[test]
    fn refuses_locked_or_small_buffers() {
        let mut gen = FrameGenerator::new(rgb_format(), 12).unwrap();

        let mut small = vec![0u8; 8];
        let mut buffer = MemoryBuffer::new(ImageBuffer::new(&mut small));
        assert!(matches!(
            gen.next_frame(&mut buffer),
            Err(GenerateFrameError::BufferTooSmall)
        ));

        let mut memory = vec![0u8; 24];
        let mut buffer = MemoryBuffer::new(ImageBuffer::new(&mut memory));
        buffer.lock();
        assert!(matches!(
            gen.next_frame(&mut buffer),
            Err(GenerateFrameError::BufferLocked)
        ));
        assert_eq!(buffer.statistics(), StreamStatistics::default());
    }
}
