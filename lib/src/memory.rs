//! Owners of the memory frames are stored in.
//!
//! [`ImageBuffer`] descriptors never own the memory they describe: it has to
//! be allocated by someone else, kept alive while descriptors to it exist,
//! and released afterwards. The types of this module play that role.
//!
//! Two kinds of memory are provided:
//!
//! * [`UserPtrMemory`] is plain heap memory, suitable for drivers that copy
//!   frames into user-provided buffers.
//! * [`MmapMemory`] is an anonymous, page-aligned shared mapping, which is
//!   what DMA-capable capture devices usually expect.
//!
//! Both implement [`BufferMemory`], through which descriptors can be borrowed.
mod mmap;
mod userptr;

pub use mmap::*;
pub use userptr::*;

use std::fmt::Debug;

use crate::{ImageBuffer, VideoFormat};

/// Trait for types owning the memory of a single frame.
pub trait BufferMemory: AsRef<[u8]> + AsMut<[u8]> + Debug {
    /// Size of the memory, in bytes.
    fn len(&self) -> usize {
        self.as_ref().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return a descriptor covering the whole memory, for a frame of
    /// `format` with lines `pitch` bytes apart. The memory remains borrowed
    /// for as long as the descriptor is alive.
    fn image_buffer(&mut self, format: VideoFormat, pitch: usize) -> ImageBuffer<'_> {
        ImageBuffer::new(self.as_mut()).with_format(format, pitch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemoryBuffer, PixelFormat};

    fn clear_through_holder<M: BufferMemory>(mut memory: M) {
        let format = VideoFormat::from((PixelFormat::GREY, (16, 4)));
        memory.as_mut().fill(0x55);

        let mut buffer = MemoryBuffer::new(memory.image_buffer(format, 16));
        assert_eq!(buffer.len(), 64);
        assert_eq!(buffer.format(), format);
        buffer.clear();
        drop(buffer);

        assert!(memory.as_ref().iter().all(|&b| b == 0));
    }

    #[test]
    fn clear_userptr_memory() {
        clear_through_holder(UserPtrMemory::new(64));
    }

    #[test]
    fn clear_mmap_memory() {
        clear_through_holder(MmapMemory::new(64).unwrap());
    }
}
