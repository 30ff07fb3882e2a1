//! Frame memory obtained from an anonymous mapping.
use core::num::NonZeroUsize;
use std::ffi::c_void;
use std::ptr::NonNull;
use std::slice;

use log::{debug, error};
use nix::{errno::Errno, sys::mman};
use thiserror::Error;

use super::*;

#[derive(Debug, Error)]
pub enum MmapError {
    #[error("cannot map an empty buffer")]
    ZeroLength,
    #[error("mmap error: {0}")]
    MmapError(#[from] Errno),
}

impl From<MmapError> for Errno {
    fn from(err: MmapError) -> Self {
        match err {
            MmapError::ZeroLength => Errno::EINVAL,
            MmapError::MmapError(e) => e,
        }
    }
}

/// Page-aligned frame memory, mapped with `mmap(2)` and unmapped when
/// dropped. The memory is zero-initialized.
#[derive(Debug)]
pub struct MmapMemory {
    data: NonNull<u8>,
    len: usize,
}

impl MmapMemory {
    pub fn new(len: usize) -> Result<Self, MmapError> {
        let length = NonZeroUsize::new(len).ok_or(MmapError::ZeroLength)?;
        let data = unsafe {
            mman::mmap_anonymous(
                None,
                length,
                mman::ProtFlags::PROT_READ | mman::ProtFlags::PROT_WRITE,
                mman::MapFlags::MAP_SHARED | mman::MapFlags::MAP_ANONYMOUS,
            )
        }?;
        debug!("Mapped {} bytes at {:p}", len, data);

        Ok(MmapMemory {
            data: data.cast(),
            len,
        })
    }
}

// The mapping is exclusively owned by this object.
unsafe impl Send for MmapMemory {}

impl AsRef<[u8]> for MmapMemory {
    fn as_ref(&self) -> &[u8] {
        // Safe because the mapping covers `len` bytes and is valid until we
        // munmap it.
        unsafe { slice::from_raw_parts(self.data.as_ptr(), self.len) }
    }
}

impl AsMut<[u8]> for MmapMemory {
    fn as_mut(&mut self) -> &mut [u8] {
        unsafe { slice::from_raw_parts_mut(self.data.as_ptr(), self.len) }
    }
}

impl BufferMemory for MmapMemory {}

impl Drop for MmapMemory {
    fn drop(&mut self) {
        // Safe because the pointer and length were obtained from mmap() and
        // no descriptor can outlive `self`.
        unsafe { mman::munmap(self.data.cast::<c_void>(), self.len) }.unwrap_or_else(|e| {
            error!("Error while unmapping frame memory: {}", e);
        });
    }
}
