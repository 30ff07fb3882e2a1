//! Descriptors of frame memory and the statistics attached to a frame.
use std::fmt::{self, Debug};
use std::marker::PhantomData;
use std::ptr;
use std::slice;

use crate::VideoFormat;

/// Statistics recorded by the capture pipeline for a single frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StreamStatistics {
    /// Number of frames delivered by the stream so far, this one included.
    pub frame_count: u64,
    /// Number of frames the stream failed to deliver so far.
    pub frames_dropped: u64,
    /// Host time at which the frame was captured, in nanoseconds.
    pub capture_time_ns: u64,
    /// Camera time at which the frame was captured, in nanoseconds.
    pub camera_time_ns: u64,
    /// Framerate measured by the stream when the frame was captured.
    pub framerate: f64,
    /// Whether the frame is known to have been only partially transferred.
    pub is_damaged: bool,
}

/// Descriptor of the memory a frame is stored in.
///
/// An `ImageBuffer` does not own the memory it points to: the memory is owned
/// by whoever handed out the descriptor, and the `'a` lifetime keeps that
/// owner borrowed for as long as the descriptor exists. Descriptors are plain
/// values and can be copied freely; all copies refer to the same memory.
///
/// No validation of `length` against the actual size of the allocation is
/// performed here. Descriptors built with [`ImageBuffer::new`] are correct by
/// construction, while [`ImageBuffer::from_raw_parts`] leaves it to the
/// caller.
#[derive(Clone, Copy, PartialEq)]
pub struct ImageBuffer<'a> {
    data: *mut u8,
    length: usize,
    /// Format of the frame stored in the memory.
    pub format: VideoFormat,
    /// Number of bytes between the start of two consecutive lines.
    pub pitch: usize,
    /// Statistics of the frame stored in the memory.
    pub statistics: StreamStatistics,
    _memory: PhantomData<&'a mut [u8]>,
}

impl<'a> ImageBuffer<'a> {
    /// Create a descriptor covering all of `memory`.
    pub fn new(memory: &'a mut [u8]) -> Self {
        ImageBuffer {
            data: memory.as_mut_ptr(),
            length: memory.len(),
            ..Default::default()
        }
    }

    /// Create a descriptor from a raw pointer and length, typically received
    /// from non-Rust code.
    ///
    /// # Safety
    ///
    /// `data` must either be null with a `length` of 0, or point to `length`
    /// bytes that remain valid for reads and writes during `'a`.
    pub unsafe fn from_raw_parts(data: *mut u8, length: usize) -> Self {
        ImageBuffer {
            data,
            length,
            ..Default::default()
        }
    }

    /// Set the format and pitch of the frame described by this descriptor.
    pub fn with_format(mut self, format: VideoFormat, pitch: usize) -> Self {
        self.format = format;
        self.pitch = pitch;
        self
    }

    /// Set the statistics of the frame described by this descriptor.
    pub fn with_statistics(mut self, statistics: StreamStatistics) -> Self {
        self.statistics = statistics;
        self
    }

    /// Raw pointer to the first byte of the frame. Null for a default
    /// descriptor.
    pub fn data(&self) -> *mut u8 {
        self.data
    }

    /// Size of the frame memory, in bytes.
    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn is_null(&self) -> bool {
        self.data.is_null()
    }

    /// Set all the bytes of the described memory to 0.
    pub(crate) fn zero(&self) {
        if self.length == 0 {
            return;
        }

        // Safe because the memory is valid for writes of `length` bytes for
        // the lifetime of `self`, and no reference to it can be alive unless
        // obtained through one of the `unsafe` slice accessors.
        unsafe { ptr::write_bytes(self.data, 0, self.length) };
    }

    /// View the described memory as a slice.
    ///
    /// # Safety
    ///
    /// No copy of this descriptor may be used to write into the memory while
    /// the returned slice is alive.
    pub unsafe fn as_slice(&self) -> &[u8] {
        if self.length == 0 {
            return &[];
        }

        slice::from_raw_parts(self.data, self.length)
    }

    /// View the described memory as a mutable slice.
    ///
    /// # Safety
    ///
    /// No copy of this descriptor may be used to access the memory while the
    /// returned slice is alive.
    pub unsafe fn as_mut_slice(&mut self) -> &mut [u8] {
        if self.length == 0 {
            return &mut [];
        }

        slice::from_raw_parts_mut(self.data, self.length)
    }
}

impl<'a> Default for ImageBuffer<'a> {
    fn default() -> Self {
        ImageBuffer {
            data: ptr::null_mut(),
            length: 0,
            format: Default::default(),
            pitch: 0,
            statistics: Default::default(),
            _memory: PhantomData,
        }
    }
}

impl<'a> Debug for ImageBuffer<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageBuffer")
            .field("data", &self.data)
            .field("length", &self.length)
            .field("format", &self.format)
            .field("pitch", &self.pitch)
            .field("statistics", &self.statistics)
            .finish()
    }
}
