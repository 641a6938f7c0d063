//! A resource adaptor which records allocation statistics.

use std::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::{AllocationError, DeviceMemoryResource, DeviceMemoryResourceHandle, Stream};

/// The statistics resource adaptor. Accumulates metrics, such as the bytes outstanding and the number of allocations.
///
/// It is intended to aid in testing by allowing the application to validate that allocations match expected values for specific operations.
#[derive(Debug)]
pub struct StatisticsResourceAdaptor {
    upstream: DeviceMemoryResourceHandle,
    current_bytes: AtomicUsize,
    peak_bytes: AtomicUsize,
    total_bytes: AtomicUsize,
    allocations: AtomicUsize,
    deallocations: AtomicUsize,
}

impl StatisticsResourceAdaptor {
    /// Create a new statistics resource adaptor over `upstream`.
    #[must_use]
    pub fn new(upstream: DeviceMemoryResourceHandle) -> Self {
        Self {
            upstream,
            current_bytes: AtomicUsize::default(),
            peak_bytes: AtomicUsize::default(),
            total_bytes: AtomicUsize::default(),
            allocations: AtomicUsize::default(),
            deallocations: AtomicUsize::default(),
        }
    }

    /// Returns the bytes currently allocated.
    #[must_use]
    pub fn current_bytes(&self) -> usize {
        self.current_bytes.load(Ordering::Relaxed)
    }

    /// Returns the largest number of bytes allocated at once.
    #[must_use]
    pub fn peak_bytes(&self) -> usize {
        self.peak_bytes.load(Ordering::Relaxed)
    }

    /// Returns the sum of all successful allocation sizes.
    #[must_use]
    pub fn total_bytes(&self) -> usize {
        self.total_bytes.load(Ordering::Relaxed)
    }

    /// Returns the number of successful allocations.
    #[must_use]
    pub fn allocations(&self) -> usize {
        self.allocations.load(Ordering::Relaxed)
    }

    /// Returns the number of deallocations.
    #[must_use]
    pub fn deallocations(&self) -> usize {
        self.deallocations.load(Ordering::Relaxed)
    }
}

// SAFETY: allocations are forwarded unchanged from the upstream resource
unsafe impl DeviceMemoryResource for StatisticsResourceAdaptor {
    fn allocate(&self, bytes: usize, stream: &Stream) -> Result<NonNull<u8>, AllocationError> {
        let ptr = self.upstream.allocate(bytes, stream)?;
        let current = self.current_bytes.fetch_add(bytes, Ordering::Relaxed) + bytes;
        self.peak_bytes.fetch_max(current, Ordering::Relaxed);
        self.total_bytes.fetch_add(bytes, Ordering::Relaxed);
        self.allocations.fetch_add(1, Ordering::Relaxed);
        Ok(ptr)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, bytes: usize, stream: &Stream) {
        // SAFETY: forwarded from the caller
        unsafe { self.upstream.deallocate(ptr, bytes, stream) };
        self.current_bytes.fetch_sub(bytes, Ordering::Relaxed);
        self.deallocations.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{DeviceBuffer, SystemMemoryResource};

    #[test]
    fn statistics_track_buffers() {
        let stream = Stream::new();
        let mr = Arc::new(StatisticsResourceAdaptor::new(Arc::new(
            SystemMemoryResource,
        )));
        let a = DeviceBuffer::new(10, &stream, mr.clone()).unwrap();
        let b = DeviceBuffer::new(20, &stream, mr.clone()).unwrap();
        assert_eq!(mr.current_bytes(), 30);
        drop(a);
        assert_eq!(mr.current_bytes(), 20);
        let c = DeviceBuffer::new(5, &stream, mr.clone()).unwrap();
        drop(b);
        drop(c);
        assert_eq!(mr.current_bytes(), 0);
        assert_eq!(mr.peak_bytes(), 30);
        assert_eq!(mr.total_bytes(), 35);
        assert_eq!(mr.allocations(), 3);
        assert_eq!(mr.deallocations(), 3);
    }

    #[test]
    fn statistics_ignore_failures() {
        let stream = Stream::new();
        let mr = StatisticsResourceAdaptor::new(Arc::new(SystemMemoryResource));
        assert!(mr.allocate(usize::MAX, &stream).is_err());
        assert_eq!(mr.allocations(), 0);
        assert_eq!(mr.current_bytes(), 0);
    }
}
