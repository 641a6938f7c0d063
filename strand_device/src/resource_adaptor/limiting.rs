//! A resource adaptor which caps the bytes outstanding through it.

use std::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::{AllocationError, DeviceMemoryResource, DeviceMemoryResourceHandle, Stream};

/// A resource adaptor which refuses allocations that would take the bytes outstanding through it above a limit.
///
/// ### Example
/// ```rust
/// # use std::sync::Arc;
/// # use strand_device::{DeviceBuffer, Stream, SystemMemoryResource};
/// # use strand_device::resource_adaptor::LimitingResourceAdaptor;
/// let mr = Arc::new(LimitingResourceAdaptor::new(Arc::new(SystemMemoryResource), 1024));
/// let stream = Stream::new();
/// let buffer = DeviceBuffer::new(1000, &stream, mr.clone()).unwrap();
/// assert!(DeviceBuffer::new(100, &stream, mr.clone()).is_err());
/// drop(buffer);
/// assert_eq!(mr.allocated_bytes(), 0);
/// ```
#[derive(Debug)]
pub struct LimitingResourceAdaptor {
    upstream: DeviceMemoryResourceHandle,
    limit: usize,
    allocated: AtomicUsize,
}

impl LimitingResourceAdaptor {
    /// Create a new limiting resource adaptor over `upstream` with an allocation limit of `limit` bytes.
    #[must_use]
    pub fn new(upstream: DeviceMemoryResourceHandle, limit: usize) -> Self {
        Self {
            upstream,
            limit,
            allocated: AtomicUsize::new(0),
        }
    }

    /// Return the allocation limit in bytes.
    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Return the bytes currently allocated through the adaptor.
    #[must_use]
    pub fn allocated_bytes(&self) -> usize {
        self.allocated.load(Ordering::Acquire)
    }

    /// Return the upstream resource.
    #[must_use]
    pub fn upstream(&self) -> &DeviceMemoryResourceHandle {
        &self.upstream
    }
}

// SAFETY: allocations are forwarded unchanged from the upstream resource
unsafe impl DeviceMemoryResource for LimitingResourceAdaptor {
    fn allocate(&self, bytes: usize, stream: &Stream) -> Result<NonNull<u8>, AllocationError> {
        self.allocated
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |allocated| {
                allocated
                    .checked_add(bytes)
                    .filter(|&total| total <= self.limit)
            })
            .map_err(|allocated| AllocationError::LimitExceeded {
                bytes,
                allocated,
                limit: self.limit,
            })?;
        self.upstream.allocate(bytes, stream).inspect_err(|_| {
            self.allocated.fetch_sub(bytes, Ordering::AcqRel);
        })
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, bytes: usize, stream: &Stream) {
        // SAFETY: forwarded from the caller
        unsafe { self.upstream.deallocate(ptr, bytes, stream) };
        self.allocated.fetch_sub(bytes, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rayon::prelude::*;

    use super::*;
    use crate::{DeviceBuffer, SystemMemoryResource};

    #[test]
    fn limiting_refuses_above_limit() {
        let stream = Stream::new();
        let mr = Arc::new(LimitingResourceAdaptor::new(
            Arc::new(SystemMemoryResource),
            100,
        ));
        let a = DeviceBuffer::new(60, &stream, mr.clone()).unwrap();
        assert_eq!(mr.allocated_bytes(), 60);
        let err = DeviceBuffer::new(41, &stream, mr.clone()).unwrap_err();
        assert_eq!(
            err,
            AllocationError::LimitExceeded {
                bytes: 41,
                allocated: 60,
                limit: 100
            }
        );
        let b = DeviceBuffer::new(40, &stream, mr.clone()).unwrap();
        assert_eq!(mr.allocated_bytes(), 100);
        drop(a);
        drop(b);
        assert_eq!(mr.allocated_bytes(), 0);
    }

    #[test]
    fn limiting_upstream_failure_releases_reservation() {
        let stream = Stream::new();
        let mr = LimitingResourceAdaptor::new(Arc::new(SystemMemoryResource), usize::MAX);
        assert!(mr.allocate(usize::MAX, &stream).is_err());
        assert_eq!(mr.allocated_bytes(), 0);
    }

    #[test]
    fn limiting_concurrent() {
        let stream = Stream::new();
        let mr = Arc::new(LimitingResourceAdaptor::new(
            Arc::new(SystemMemoryResource),
            64 * 10,
        ));
        let buffers: Vec<_> = (0..64)
            .into_par_iter()
            .map(|_| DeviceBuffer::new(64, &stream, mr.clone()))
            .collect();
        assert_eq!(buffers.iter().filter(|buffer| buffer.is_ok()).count(), 10);
        assert_eq!(mr.allocated_bytes(), 64 * 10);
        drop(buffers);
        assert_eq!(mr.allocated_bytes(), 0);
    }
}
