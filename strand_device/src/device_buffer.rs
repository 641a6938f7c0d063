use std::mem::MaybeUninit;
use std::ptr::NonNull;

use derive_more::Display;
use thiserror::Error;

use crate::{AllocationError, DeviceMemoryResourceHandle, Stream};

/// A host copy targeted bytes outside of a [`DeviceBuffer`].
#[derive(Clone, Debug, Display, Error, PartialEq, Eq)]
#[display("copy of {len} bytes at offset {offset} is out of bounds for a buffer of {size} bytes")]
pub struct BufferRangeError {
    offset: usize,
    len: usize,
    size: usize,
}

/// An owning, move only handle to untyped device memory.
///
/// The memory is allocated through a [`DeviceMemoryResource`](crate::DeviceMemoryResource) on a [`Stream`] and is returned to that resource, on the buffer's stream, when the buffer is dropped.
/// The contents of a buffer created with [`DeviceBuffer::new`] are uninitialised.
#[derive(Debug)]
pub struct DeviceBuffer {
    ptr: NonNull<u8>,
    size: usize,
    stream: Stream,
    mr: DeviceMemoryResourceHandle,
}

// SAFETY: a `DeviceBuffer` uniquely owns its allocation
unsafe impl Send for DeviceBuffer {}
// SAFETY: shared access only permits reads
unsafe impl Sync for DeviceBuffer {}

impl DeviceBuffer {
    /// Allocate an uninitialised buffer of exactly `size` bytes on `stream`.
    ///
    /// # Errors
    /// Returns an [`AllocationError`] if `mr` cannot satisfy the request.
    pub fn new(
        size: usize,
        stream: &Stream,
        mr: DeviceMemoryResourceHandle,
    ) -> Result<Self, AllocationError> {
        let ptr = mr.allocate(size, stream)?;
        log::debug!("allocated {size} bytes on {}", stream.id());
        Ok(Self {
            ptr,
            size,
            stream: stream.clone(),
            mr,
        })
    }

    /// Allocate a zero initialised buffer of `size` bytes on `stream`.
    ///
    /// # Errors
    /// Returns an [`AllocationError`] if `mr` cannot satisfy the request.
    pub fn zeroed(
        size: usize,
        stream: &Stream,
        mr: DeviceMemoryResourceHandle,
    ) -> Result<Self, AllocationError> {
        let mut buffer = Self::new(size, stream, mr)?;
        buffer.as_uninit_slice_mut().fill(MaybeUninit::new(0));
        Ok(buffer)
    }

    /// Allocate a buffer on `stream` and copy `src` from the host into it.
    ///
    /// # Errors
    /// Returns an [`AllocationError`] if `mr` cannot satisfy the request.
    pub fn from_host(
        src: &[u8],
        stream: &Stream,
        mr: DeviceMemoryResourceHandle,
    ) -> Result<Self, AllocationError> {
        let mut buffer = Self::new(src.len(), stream, mr)?;
        // SAFETY: the buffer holds exactly `src.len()` bytes and does not overlap `src`
        unsafe {
            std::ptr::copy_nonoverlapping(src.as_ptr(), buffer.as_mut_ptr(), src.len());
        }
        Ok(buffer)
    }

    /// Return the size of the buffer in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Returns true if the buffer holds zero bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Return a pointer to the start of the buffer.
    #[must_use]
    pub fn as_ptr(&self) -> *const u8 {
        self.ptr.as_ptr()
    }

    /// Return a mutable pointer to the start of the buffer.
    #[must_use]
    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    /// Return the stream the buffer is associated with.
    #[must_use]
    pub fn stream(&self) -> &Stream {
        &self.stream
    }

    /// Associate the buffer with `stream`. The buffer will be deallocated on this stream.
    pub fn set_stream(&mut self, stream: &Stream) {
        self.stream = stream.clone();
    }

    /// Return the memory resource that owns the allocation.
    #[must_use]
    pub fn memory_resource(&self) -> &DeviceMemoryResourceHandle {
        &self.mr
    }

    /// Return the buffer contents as possibly uninitialised bytes for filling.
    #[must_use]
    pub fn as_uninit_slice_mut(&mut self) -> &mut [MaybeUninit<u8>] {
        // SAFETY: the allocation is valid for `size` bytes and uniquely borrowed
        unsafe {
            std::slice::from_raw_parts_mut(self.ptr.as_ptr().cast::<MaybeUninit<u8>>(), self.size)
        }
    }

    /// Return the buffer contents.
    ///
    /// # Safety
    /// Every byte of the buffer must have been initialised.
    #[must_use]
    pub unsafe fn as_slice(&self) -> &[u8] {
        // SAFETY: the allocation is valid for `size` bytes and the caller guarantees it is initialised
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.size) }
    }

    /// Copy `src` from the host into the buffer starting at byte `offset`.
    ///
    /// The copy is enqueued on the buffer's stream.
    ///
    /// # Errors
    /// Returns a [`BufferRangeError`] if the copy extends past the end of the buffer.
    pub fn copy_from_host(&mut self, offset: usize, src: &[u8]) -> Result<(), BufferRangeError> {
        let size = self.size;
        let err = || BufferRangeError {
            offset,
            len: src.len(),
            size,
        };
        let end = offset.checked_add(src.len()).ok_or_else(err)?;
        let dst = self.as_uninit_slice_mut().get_mut(offset..end).ok_or_else(err)?;
        for (dst, src) in dst.iter_mut().zip(src) {
            dst.write(*src);
        }
        Ok(())
    }

    /// Deep copy the buffer to a new allocation on `stream` from the same memory resource.
    ///
    /// # Errors
    /// Returns an [`AllocationError`] if the memory resource cannot satisfy the request.
    ///
    /// # Safety
    /// Every byte of the buffer must have been initialised.
    pub unsafe fn try_clone(&self, stream: &Stream) -> Result<Self, AllocationError> {
        // SAFETY: forwarded from the caller
        Self::from_host(unsafe { self.as_slice() }, stream, self.mr.clone())
    }
}

impl Drop for DeviceBuffer {
    fn drop(&mut self) {
        // SAFETY: `ptr` was allocated by `mr` with `size` bytes and is deallocated exactly once
        unsafe { self.mr.deallocate(self.ptr, self.size, &self.stream) };
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::resource_adaptor::StatisticsResourceAdaptor;
    use crate::{ALLOCATION_ALIGNMENT, SystemMemoryResource};

    #[test]
    fn device_buffer_sizes() {
        let stream = Stream::new();
        for size in [0, 1, 255, 256, 257] {
            let buffer = DeviceBuffer::new(size, &stream, Arc::new(SystemMemoryResource)).unwrap();
            assert_eq!(buffer.size(), size);
            assert_eq!(buffer.is_empty(), size == 0);
            assert_eq!(buffer.as_ptr() as usize % ALLOCATION_ALIGNMENT, 0);
            assert_eq!(buffer.stream(), &stream);
        }
    }

    #[test]
    fn device_buffer_copy_from_host() {
        let stream = Stream::new();
        let mut buffer = DeviceBuffer::zeroed(6, &stream, Arc::new(SystemMemoryResource)).unwrap();
        buffer.copy_from_host(2, b"abc").unwrap();
        assert_eq!(unsafe { buffer.as_slice() }, b"\0\0abc\0");
        assert_eq!(
            buffer.copy_from_host(4, b"abc"),
            Err(BufferRangeError {
                offset: 4,
                len: 3,
                size: 6
            })
        );
        assert!(buffer.copy_from_host(usize::MAX, b"a").is_err());
        assert_eq!(
            buffer.copy_from_host(4, b"abc").unwrap_err().to_string(),
            "copy of 3 bytes at offset 4 is out of bounds for a buffer of 6 bytes"
        );
    }

    #[test]
    fn device_buffer_clone_and_drop() {
        let stream = Stream::new();
        let other_stream = Stream::new();
        let mr = Arc::new(StatisticsResourceAdaptor::new(Arc::new(
            SystemMemoryResource,
        )));
        let buffer = DeviceBuffer::from_host(b"strand", &stream, mr.clone()).unwrap();
        let mut copy = unsafe { buffer.try_clone(&other_stream) }.unwrap();
        assert_ne!(buffer.as_ptr(), copy.as_ptr());
        assert_eq!(unsafe { copy.as_slice() }, b"strand");
        assert_eq!(copy.stream(), &other_stream);
        copy.set_stream(&stream);
        assert_eq!(copy.stream(), &stream);
        assert_eq!(mr.current_bytes(), 12);
        drop(buffer);
        drop(copy);
        assert_eq!(mr.current_bytes(), 0);
        assert_eq!(mr.deallocations(), 2);
    }
}
