//! Heap-backed frame memory.
use super::*;

/// Frame memory allocated on the heap. The memory is zero-initialized.
#[derive(Debug, Clone)]
pub struct UserPtrMemory(Vec<u8>);

impl UserPtrMemory {
    pub fn new(len: usize) -> Self {
        UserPtrMemory(vec![0u8; len])
    }
}

impl From<Vec<u8>> for UserPtrMemory {
    fn from(memory: Vec<u8>) -> Self {
        UserPtrMemory(memory)
    }
}

impl AsRef<[u8]> for UserPtrMemory {
    fn as_ref(&self) -> &[u8] {
        self.0.as_ref()
    }
}

impl AsMut<[u8]> for UserPtrMemory {
    fn as_mut(&mut self) -> &mut [u8] {
        self.0.as_mut()
    }
}

impl BufferMemory for UserPtrMemory {}
