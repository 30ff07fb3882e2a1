//! Holder of a frame buffer shared between a producer and its consumers.
use log::trace;

use crate::{ImageBuffer, StreamStatistics, VideoFormat};

/// A frame buffer handed from the capture pipeline to its consumers.
///
/// `MemoryBuffer` keeps a copy of the [`ImageBuffer`] descriptor it has been
/// given, and never allocates or releases the memory behind it. Dropping a
/// `MemoryBuffer` leaves the memory untouched.
///
/// The lock flag is purely advisory: consumers set it with [`lock`] while they
/// are using the frame and reset it with [`unlock`] when done, but nothing
/// prevents a producer from writing into a locked buffer. Both transitions are
/// accepted from any state, there is no lock counting.
///
/// [`lock`]: MemoryBuffer::lock
/// [`unlock`]: MemoryBuffer::unlock
///
/// # Examples
///
/// ```
/// # use tcambuf::{ImageBuffer, MemoryBuffer};
/// let mut memory = vec![0xffu8; 16];
/// let mut buffer = MemoryBuffer::new(ImageBuffer::new(&mut memory));
///
/// buffer.clear();
/// assert!(!buffer.is_locked());
/// buffer.lock();
/// assert!(buffer.is_locked());
/// buffer.unlock();
/// assert!(!buffer.is_locked());
///
/// drop(buffer);
/// assert!(memory.iter().all(|&b| b == 0));
/// ```
#[derive(Debug)]
pub struct MemoryBuffer<'a> {
    buffer: ImageBuffer<'a>,
    lock_count: u32,
}

impl<'a> MemoryBuffer<'a> {
    pub fn new(buffer: ImageBuffer<'a>) -> Self {
        trace!("New memory buffer: {:?}", buffer);

        MemoryBuffer {
            buffer,
            lock_count: 0,
        }
    }

    /// Returns a copy of the descriptor currently held.
    pub fn image_buffer(&self) -> ImageBuffer<'a> {
        self.buffer
    }

    /// Replace the held descriptor. The memory described by the previous one
    /// is not released, this remains the job of its owner.
    pub fn set_image_buffer(&mut self, buffer: ImageBuffer<'a>) {
        self.buffer = buffer;
    }

    /// Raw pointer to the frame data. The valid length is given by
    /// [`MemoryBuffer::len`].
    pub fn data(&self) -> *mut u8 {
        self.buffer.data()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn format(&self) -> VideoFormat {
        self.buffer.format
    }

    pub fn pitch(&self) -> usize {
        self.buffer.pitch
    }

    pub fn statistics(&self) -> StreamStatistics {
        self.buffer.statistics
    }

    /// Overwrite the statistics of the held frame. Always returns `true`.
    pub fn set_statistics(&mut self, stats: &StreamStatistics) -> bool {
        self.buffer.statistics = *stats;

        true
    }

    /// Mark the buffer as being in use. Always returns `true`, even if the
    /// buffer was already locked.
    pub fn lock(&mut self) -> bool {
        self.lock_count = 1;
        true
    }

    /// Mark the buffer as free. Always returns `true`, even if the buffer was
    /// not locked.
    pub fn unlock(&mut self) -> bool {
        self.lock_count = 0;
        true
    }

    pub fn is_locked(&self) -> bool {
        self.lock_count != 0
    }

    /// Set the `len()` bytes of the frame data to 0. Bytes outside of that
    /// range are never touched.
    pub fn clear(&mut self) {
        trace!("Clearing {} bytes at {:p}", self.len(), self.data());
        self.buffer.zero();
    }

    /// View the frame data as a slice.
    ///
    /// # Safety
    ///
    /// No other copy of the held descriptor may be used to write into the
    /// frame while the returned slice is alive.
    pub unsafe fn as_slice(&self) -> &[u8] {
        self.buffer.as_slice()
    }

    /// View the frame data as a mutable slice.
    ///
    /// # Safety
    ///
    /// No other copy of the held descriptor may be used to access the frame
    /// while the returned slice is alive.
    pub unsafe fn as_mut_slice(&mut self) -> &mut [u8] {
        self.buffer.as_mut_slice()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PixelFormat;

    #[test]
    fn new_buffer_is_unlocked() {
        let mut memory = [0u8; 4];
        let buffer = MemoryBuffer::new(ImageBuffer::new(&mut memory));
        assert!(!buffer.is_locked());

        let buffer = MemoryBuffer::new(ImageBuffer::default());
        assert!(!buffer.is_locked());
        assert!(buffer.data().is_null());
    }

    #[test]
    fn lock_reflects_last_call() {
        let mut buffer = MemoryBuffer::new(ImageBuffer::default());

        assert!(buffer.unlock());
        assert!(!buffer.is_locked());
        assert!(buffer.lock());
        assert!(buffer.is_locked());
        // Locking twice is accepted and does not count.
        assert!(buffer.lock());
        assert!(buffer.is_locked());
        assert!(buffer.unlock());
        assert!(!buffer.is_locked());
        assert!(buffer.unlock());
        assert!(!buffer.is_locked());
    }

    #[test]
    fn image_buffer_roundtrip() {
        let mut first = [0u8; 8];
        let mut second = [0u8; 24];
        let mut buffer = MemoryBuffer::new(ImageBuffer::new(&mut first));

        let format = VideoFormat {
            pixelformat: PixelFormat::RGB3,
            width: 2,
            height: 4,
            framerate: 30.0,
        };
        let desc = ImageBuffer::new(&mut second)
            .with_format(format, 6)
            .with_statistics(StreamStatistics {
                frame_count: 3,
                ..Default::default()
            });

        buffer.set_image_buffer(desc);
        assert_eq!(buffer.image_buffer(), desc);
        assert_eq!(buffer.data(), desc.data());
        assert_eq!(buffer.len(), 24);
        assert_eq!(buffer.format(), format);
        assert_eq!(buffer.pitch(), 6);
        assert_eq!(buffer.statistics().frame_count, 3);
    }

    #[test]
    fn statistics_roundtrip() {
        let mut buffer = MemoryBuffer::new(ImageBuffer::default());
        let stats = StreamStatistics {
            frame_count: 42,
            frames_dropped: 2,
            capture_time_ns: 1_000_000,
            camera_time_ns: 999_000,
            framerate: 29.97,
            is_damaged: true,
        };

        assert!(buffer.set_statistics(&stats));
        assert_eq!(buffer.statistics(), stats);
        // The statistics are stored in the descriptor.
        assert_eq!(buffer.image_buffer().statistics, stats);
    }

    #[test]
    fn clear_stays_within_bounds() {
        let mut memory = [0xffu8; 16];
        let data = unsafe { memory.as_mut_ptr().add(4) };
        let desc = unsafe { ImageBuffer::from_raw_parts(data, 8) };
        let mut buffer = MemoryBuffer::new(desc);

        buffer.clear();
        drop(buffer);

        assert_eq!(&memory[..4], &[0xff; 4]);
        assert_eq!(&memory[4..12], &[0x00; 8]);
        assert_eq!(&memory[12..], &[0xff; 4]);
    }

    #[test]
    fn clear_then_lock_unlock() {
        let mut memory = vec![0xffu8; 16];
        let mut buffer = MemoryBuffer::new(ImageBuffer::new(&mut memory));

        buffer.clear();
        assert!(unsafe { buffer.as_slice() }.iter().all(|&b| b == 0));
        buffer.lock();
        assert!(buffer.is_locked());
        buffer.unlock();
        assert!(!buffer.is_locked());
    }

    #[test]
    fn clear_empty_buffer() {
        let mut buffer = MemoryBuffer::new(ImageBuffer::default());
        buffer.clear();
        assert!(buffer.is_empty());
    }

    #[test]
    fn drop_keeps_memory() {
        let mut memory = vec![7u8; 8];
        {
            let mut buffer = MemoryBuffer::new(ImageBuffer::new(&mut memory));
            let data = unsafe { buffer.as_mut_slice() };
            data[0] = 1;
        }
        assert_eq!(memory, [1, 7, 7, 7, 7, 7, 7, 7]);
    }
}
