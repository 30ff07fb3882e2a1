//! Frame buffer holder for camera capture pipelines.
//!
//! A capture pipeline owns the memory frames are written to, and hands out
//! *descriptors* of that memory to the stages that need to access it. This
//! crate provides the pieces that sit at that boundary:
//!
//! * [`ImageBuffer`] is the descriptor itself: a pointer to the pixel data of
//!   a frame, its length, the format of the frame and the capture statistics
//!   that were recorded when it was acquired. A descriptor never owns the
//!   memory it points to.
//!
//! * [`MemoryBuffer`] wraps a descriptor and adds an advisory lock flag that
//!   consumers set while they are working with the frame. It can also clear
//!   the frame memory before the buffer is reused.
//!
//! * The [`memory`] module provides owners for the frame memory, i.e. the
//!   types that actually allocate and release it and from which descriptors
//!   can be borrowed.
//!
pub mod buffer;
pub mod memory;
pub mod memory_buffer;

pub use buffer::*;
pub use memory_buffer::*;

use std::fmt;

/// A Fourcc pixel format. It can be converted back and forth from a 32-bit
/// integer, or a 4-bytes string.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct PixelFormat(u32);

impl PixelFormat {
    /// Packed 24-bit RGB, the format produced by test pattern generators.
    pub const RGB3: PixelFormat = PixelFormat::from_fourcc(b"RGB3");
    /// 8-bit greyscale.
    pub const GREY: PixelFormat = PixelFormat::from_fourcc(b"GREY");

    pub const fn from_u32(v: u32) -> Self {
        Self(v)
    }

    pub const fn to_u32(self) -> u32 {
        self.0
    }

    pub const fn from_fourcc(n: &[u8; 4]) -> Self {
        Self(u32::from_le_bytes(*n))
    }

    pub const fn to_fourcc(self) -> [u8; 4] {
        self.0.to_le_bytes()
    }
}

impl From<u32> for PixelFormat {
    fn from(i: u32) -> Self {
        Self::from_u32(i)
    }
}

impl From<PixelFormat> for u32 {
    fn from(format: PixelFormat) -> Self {
        format.to_u32()
    }
}

/// Simple way to convert a string litteral (e.g. b"RGB3") into a pixel
/// format.
///
/// # Examples
///
/// ```
/// # use tcambuf::PixelFormat;
/// let f = PixelFormat::from(b"GREY");
/// assert_eq!(f, PixelFormat::GREY);
/// assert_eq!(&<[u8; 4]>::from(f), b"GREY");
/// ```
impl From<&[u8; 4]> for PixelFormat {
    fn from(n: &[u8; 4]) -> Self {
        Self::from_fourcc(n)
    }
}

impl From<PixelFormat> for [u8; 4] {
    fn from(format: PixelFormat) -> Self {
        format.to_fourcc()
    }
}

/// Produces a debug string for this PixelFormat, including its hexadecimal
/// and string representation.
///
/// # Examples
///
/// ```
/// # use tcambuf::PixelFormat;
/// assert_eq!(format!("{:?}", PixelFormat::RGB3), "0x33424752 (RGB3)");
/// ```
impl fmt::Debug for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "0x{:08x} ({})", self.0, self)
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let fourcc = self
            .to_fourcc()
            .iter()
            .map(|&x| x as char)
            .collect::<String>();
        f.write_str(fourcc.as_str())
    }
}

/// Format of the frame stored in a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VideoFormat {
    /// Format each pixel is encoded in.
    pub pixelformat: PixelFormat,
    /// Width of the image in pixels.
    pub width: u32,
    /// Height of the image in pixels.
    pub height: u32,
    /// Nominal framerate of the stream, in frames per second.
    pub framerate: f64,
}

impl VideoFormat {
    /// Number of bytes used by a single pixel, if known for `pixelformat`.
    pub fn bytes_per_pixel(&self) -> Option<u32> {
        match self.pixelformat {
            PixelFormat::RGB3 => Some(3),
            PixelFormat::GREY => Some(1),
            _ => None,
        }
    }

    /// Smallest pitch able to hold a line of this format, if the pixel size
    /// is known.
    pub fn min_pitch(&self) -> Option<usize> {
        self.bytes_per_pixel()
            .map(|bpp| self.width as usize * bpp as usize)
    }
}

/// Quickly build a usable `VideoFormat` from a pixel format and resolution.
///
/// Dimensions larger than `u32::MAX` are truncated; callers parsing untrusted
/// sizes should bound them to `u32` first.
///
/// # Examples
///
/// ```
/// # use tcambuf::VideoFormat;
/// let f = VideoFormat::from((b"RGB3", (640, 480)));
/// assert_eq!(f.width, 640);
/// assert_eq!(f.height, 480);
/// assert_eq!(f.pixelformat.to_string(), "RGB3");
/// assert_eq!(f.min_pitch(), Some(640 * 3));
/// ```
impl<T: Into<PixelFormat>> From<(T, (usize, usize))> for VideoFormat {
    fn from((pixel_format, (width, height)): (T, (usize, usize))) -> Self {
        VideoFormat {
            pixelformat: pixel_format.into(),
            width: width as u32,
            height: height as u32,
            ..Default::default()
        }
    }
}

impl fmt::Display for VideoFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}x{}@{}",
            self.pixelformat, self.width, self.height, self.framerate
        )
    }
}
