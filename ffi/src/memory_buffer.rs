//! C API over [`MemoryBuffer`].
//!
//! Memory buffers are created with [`tcambuf_memory_buffer_new`] around a
//! descriptor of memory owned by the caller, and remain valid until given to
//! [`tcambuf_memory_buffer_free`]. The memory itself is never allocated nor
//! released by these functions.
//!
//! None of these functions perform any locking: calls on the same buffer from
//! different threads must be serialized by the caller.
#![allow(non_camel_case_types)]

use log::{debug, warn};
use tcambuf::{ImageBuffer, MemoryBuffer, PixelFormat, StreamStatistics, VideoFormat};

/// C counterpart of [`VideoFormat`].
#[derive(Debug, Clone, Copy, Default)]
#[repr(C)]
pub struct tcambuf_video_format {
    /// Fourcc code of the pixel format.
    pub fourcc: u32,
    pub width: u32,
    pub height: u32,
    pub framerate: f64,
}

impl From<tcambuf_video_format> for VideoFormat {
    fn from(format: tcambuf_video_format) -> Self {
        VideoFormat {
            pixelformat: PixelFormat::from(format.fourcc),
            width: format.width,
            height: format.height,
            framerate: format.framerate,
        }
    }
}

impl From<VideoFormat> for tcambuf_video_format {
    fn from(format: VideoFormat) -> Self {
        tcambuf_video_format {
            fourcc: format.pixelformat.into(),
            width: format.width,
            height: format.height,
            framerate: format.framerate,
        }
    }
}

/// C counterpart of [`StreamStatistics`].
#[derive(Debug, Clone, Copy, Default)]
#[repr(C)]
pub struct tcambuf_stream_statistics {

    pub frame_count: u64,
    pub frames_dropped: u64,
    pub capture_time_ns: u64,
    pub camera_time_ns: u64,
    pub framerate: f64,
    pub is_damaged: bool,
}

impl From<tcambuf_stream_statistics> for StreamStatistics {
    fn from(stats: tcambuf_stream_statistics) -> Self {
        StreamStatistics {
            frame_count: stats.frame_count,
            frames_dropped: stats.frames_dropped,
            capture_time_ns: stats.capture_time_ns,
            camera_time_ns: stats.camera_time_ns,
            framerate: stats.framerate,
            is_damaged: stats.is_damaged,
        }
    }
}

impl From<StreamStatistics> for tcambuf_stream_statistics {
    fn from(stats: StreamStatistics) -> Self {
        tcambuf_stream_statistics {
            frame_count: stats.frame_count,
            frames_dropped: stats.frames_dropped,
            capture_time_ns: stats.capture_time_ns,
            camera_time_ns: stats.camera_time_ns,
            framerate: stats.framerate,
            is_damaged: stats.is_damaged,
        }
    }
}

/// C counterpart of [`ImageBuffer`]: description of frame memory owned by
/// the caller.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct tcambuf_image_buffer {
    /// First byte of the frame memory.
    pub data: *mut u8,
    /// Size of the frame memory, in bytes.
    pub length: usize,
    pub format: tcambuf_video_format,
    /// Number of bytes between the start of two consecutive lines.
    pub pitch: usize,
    pub statistics: tcambuf_stream_statistics,
}

impl tcambuf_image_buffer {
    /// # Safety
    ///
    /// `data` and `length` must describe memory that remains valid for as
    /// long as the returned descriptor is in use.
    unsafe fn to_image_buffer(self) -> ImageBuffer<'static> {
        ImageBuffer::from_raw_parts(self.data, self.length)
            .with_format(self.format.into(), self.pitch)
            .with_statistics(self.statistics.into())
    }
}

impl From<ImageBuffer<'_>> for tcambuf_image_buffer {
    fn from(buffer: ImageBuffer<'_>) -> Self {
        tcambuf_image_buffer {
            data: buffer.data(),
            length: buffer.len(),
            format: buffer.format.into(),
            pitch: buffer.pitch,
            statistics: buffer.statistics.into(),
        }
    }
}

/// Opaque handle to a memory buffer.
pub struct tcambuf_memory_buffer(MemoryBuffer<'static>);

/// Create a new, unlocked memory buffer holding `buffer`.
///
/// # Safety
///
/// The memory described by `buffer` must remain valid until the returned
/// memory buffer is destroyed or given another descriptor.
/// `buffer.statistics.is_damaged` must be 0 or 1.
#[no_mangle]
pub unsafe extern "C" fn tcambuf_memory_buffer_new(
    buffer: tcambuf_image_buffer,
) -> *mut tcambuf_memory_buffer {
    let memory_buffer = Box::into_raw(Box::new(tcambuf_memory_buffer(MemoryBuffer::new(
        buffer.to_image_buffer(),
    ))));
    debug!("Memory buffer {:p}: created", memory_buffer);

    memory_buffer
}

/// Destroy `buffer`. The memory it describes is left untouched.
///
/// # Safety
///
/// `buffer` must be NULL or a pointer returned by
/// [`tcambuf_memory_buffer_new`], and must not be used after this call.
#[no_mangle]
pub unsafe extern "C" fn tcambuf_memory_buffer_free(buffer: *mut tcambuf_memory_buffer) {
    if buffer.is_null() {
        warn!("Trying to free a NULL memory buffer");
        return;
    }

    debug!("Memory buffer {:p}: destroying", buffer);
    drop(Box::from_raw(buffer));
}

/// Return a copy of the descriptor held by `buffer`.
///
/// # Safety
///
/// `buffer` must be a valid pointer returned by [`tcambuf_memory_buffer_new`].
#[no_mangle]
pub unsafe extern "C" fn tcambuf_memory_buffer_get_image_buffer(
    buffer: *const tcambuf_memory_buffer,
) -> tcambuf_image_buffer {
    assert!(!buffer.is_null());
    (*buffer).0.image_buffer().into()
}

/// Replace the descriptor held by `buffer`. The memory described by the
/// previous descriptor is not released.
///
/// # Safety
///
/// `buffer` must be a valid pointer returned by [`tcambuf_memory_buffer_new`].
/// The memory described by `image_buffer` must remain valid for as long as it
/// is held by `buffer`, and `image_buffer.statistics.is_damaged` must be 0 or
/// 1.
#[no_mangle]
pub unsafe extern "C" fn tcambuf_memory_buffer_set_image_buffer(
    buffer: *mut tcambuf_memory_buffer,
    image_buffer: tcambuf_image_buffer,
) {
    assert!(!buffer.is_null());
    (*buffer).0.set_image_buffer(image_buffer.to_image_buffer());
}

/// Return the frame data pointer of `buffer`.
///
/// # Safety
///
/// `buffer` must be a valid pointer returned by [`tcambuf_memory_buffer_new`].
#[no_mangle]
pub unsafe extern "C" fn tcambuf_memory_buffer_get_data(
    buffer: *const tcambuf_memory_buffer,
) -> *mut u8 {
    assert!(!buffer.is_null());
    (*buffer).0.data()
}

/// # Safety
///
/// `buffer` must be a valid pointer returned by [`tcambuf_memory_buffer_new`].
#[no_mangle]
pub unsafe extern "C" fn tcambuf_memory_buffer_get_statistics(
    buffer: *const tcambuf_memory_buffer,
) -> tcambuf_stream_statistics {
    assert!(!buffer.is_null());
    (*buffer).0.statistics().into()
}

/// Overwrite the statistics of `buffer`. Always returns `true`.
///
/// # Safety
///
/// `buffer` must be a valid pointer returned by [`tcambuf_memory_buffer_new`],
/// and `stats` a valid pointer to statistics whose `is_damaged` field is 0
/// or 1.
#[no_mangle]
pub unsafe extern "C" fn tcambuf_memory_buffer_set_statistics(
    buffer: *mut tcambuf_memory_buffer,
    stats: *const tcambuf_stream_statistics,
) -> bool {
    assert!(!buffer.is_null());
    assert!(!stats.is_null());
    (*buffer).0.set_statistics(&(*stats).into())
}

/// # Safety
///
/// `buffer` must be a valid pointer returned by [`tcambuf_memory_buffer_new`].
#[no_mangle]
pub unsafe extern "C" fn tcambuf_memory_buffer_lock(buffer: *mut tcambuf_memory_buffer) -> bool {
    assert!(!buffer.is_null());
    (*buffer).0.lock()
}

/// # Safety
///
/// `buffer` must be a valid pointer returned by [`tcambuf_memory_buffer_new`].
#[no_mangle]
pub unsafe extern "C" fn tcambuf_memory_buffer_unlock(
    buffer: *mut tcambuf_memory_buffer,
) -> bool {
    assert!(!buffer.is_null());
    (*buffer).0.unlock()
}

/// # Safety
///
/// `buffer` must be a valid pointer returned by [`tcambuf_memory_buffer_new`].
#[no_mangle]
pub unsafe extern "C" fn tcambuf_memory_buffer_is_locked(
    buffer: *const tcambuf_memory_buffer,
) -> bool {
    assert!(!buffer.is_null());
    (*buffer).0.is_locked()
}

/// Set all the bytes of the frame memory held by `buffer` to 0.
///
/// # Safety
///
/// `buffer` must be a valid pointer returned by [`tcambuf_memory_buffer_new`],
/// and the memory it describes must still be valid.
#[no_mangle]
pub unsafe extern "C" fn tcambuf_memory_buffer_clear(buffer: *mut tcambuf_memory_buffer) {
    assert!(!buffer.is_null());
    (*buffer).0.clear()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image_buffer(memory: &mut [u8]) -> tcambuf_image_buffer {
        tcambuf_image_buffer {
            data: memory.as_mut_ptr(),
            length: memory.len(),
            format: tcambuf_video_format {
                fourcc: u32::from(PixelFormat::GREY),
                width: 4,
                height: 4,
                framerate: 15.0,
            },
            pitch: 4,
            statistics: Default::default(),
        }
    }

    #[test]
    fn c_api_lifecycle() {
        let mut memory = [0xffu8; 16];

        unsafe {
            let buffer = tcambuf_memory_buffer_new(image_buffer(&mut memory));
            assert!(!tcambuf_memory_buffer_is_locked(buffer));

            let desc = tcambuf_memory_buffer_get_image_buffer(buffer);
            assert_eq!(tcambuf_memory_buffer_get_data(buffer), desc.data);
            assert_eq!(desc.length, 16);
            assert_eq!(desc.pitch, 4);
            assert_eq!(desc.format.fourcc, u32::from(PixelFormat::GREY));

            let stats = tcambuf_stream_statistics {
                frame_count: 5,
                is_damaged: true,
                ..Default::default()
            };
            assert!(tcambuf_memory_buffer_set_statistics(buffer, &stats));
            let read = tcambuf_memory_buffer_get_statistics(buffer);
            assert_eq!(read.frame_count, 5);
            assert!(read.is_damaged);

            assert!(tcambuf_memory_buffer_lock(buffer));
            assert!(tcambuf_memory_buffer_is_locked(buffer));
            assert!(tcambuf_memory_buffer_unlock(buffer));
            assert!(!tcambuf_memory_buffer_is_locked(buffer));

            tcambuf_memory_buffer_clear(buffer);
            tcambuf_memory_buffer_free(buffer);
        }

        assert_eq!(memory, [0u8; 16]);
    }

    #[test]
    fn replace_descriptor() {
        let mut first = [1u8; 4];
        let mut second = [2u8; 8];

        unsafe {
            let buffer = tcambuf_memory_buffer_new(image_buffer(&mut first));
            tcambuf_memory_buffer_set_image_buffer(buffer, image_buffer(&mut second));
            assert_eq!(tcambuf_memory_buffer_get_image_buffer(buffer).length, 8);
            tcambuf_memory_buffer_clear(buffer);
            tcambuf_memory_buffer_free(buffer);
            tcambuf_memory_buffer_free(std::ptr::null_mut());
        }

        assert_eq!(first, [1u8; 4]);
        assert_eq!(second, [0u8; 8]);
    }
}
