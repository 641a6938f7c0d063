use std::alloc::Layout;
use std::fmt::Debug;
use std::ptr::NonNull;
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

use crate::{AllocationError, Stream};

/// The alignment of every allocation made by the resources in this crate.
///
/// Typed views of a [`DeviceBuffer`](crate::DeviceBuffer) rely on this alignment.
pub const ALLOCATION_ALIGNMENT: usize = 256;

/// A device memory resource.
///
/// Allocations are stream ordered: an allocation made on a stream may be used by work enqueued on that stream without further synchronisation.
///
/// # Safety
/// A pointer returned by [`allocate`](DeviceMemoryResource::allocate) for `bytes` bytes must be
///  - aligned to at least [`ALLOCATION_ALIGNMENT`],
///  - valid for reads and writes of `bytes` bytes until it is passed to [`deallocate`](DeviceMemoryResource::deallocate), and
///  - not aliased by any other live allocation of a non-zero size.
///
/// [`DeviceBuffer`](crate::DeviceBuffer) and [`DeviceVector`](crate::DeviceVector) create slices over the returned memory from safe code.
///
/// An implementation that does not uphold this contract must be rejected:
/// ```compile_fail
/// # use std::ptr::NonNull;
/// # use strand_device::{AllocationError, DeviceMemoryResource, Stream};
/// #[derive(Debug)]
/// struct Misaligned;
///
/// impl DeviceMemoryResource for Misaligned {
///     fn allocate(&self, bytes: usize, _stream: &Stream) -> Result<NonNull<u8>, AllocationError> {
///         Err(AllocationError::OutOfMemory { bytes })
///     }
///
///     unsafe fn deallocate(&self, _ptr: NonNull<u8>, _bytes: usize, _stream: &Stream) {}
/// }
/// ```
pub unsafe trait DeviceMemoryResource: Debug + Send + Sync {
    /// Allocate `bytes` bytes of uninitialised device memory on `stream`.
    ///
    /// The returned pointer is aligned to at least [`ALLOCATION_ALIGNMENT`].
    /// A zero byte allocation succeeds and returns an aligned dangling pointer.
    ///
    /// # Errors
    /// Returns an [`AllocationError`] if the request cannot be satisfied.
    fn allocate(&self, bytes: usize, stream: &Stream) -> Result<NonNull<u8>, AllocationError>;

    /// Deallocate memory previously returned by [`allocate`](DeviceMemoryResource::allocate).
    ///
    /// # Safety
    /// `ptr` must have been returned by `allocate` on this resource with the same `bytes`, and must not have been deallocated already.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, bytes: usize, stream: &Stream);
}

/// [`Arc`] wrapped device memory resource.
pub type DeviceMemoryResourceHandle = Arc<dyn DeviceMemoryResource>;

#[repr(C, align(256))]
struct AllocationAlignment([u8; ALLOCATION_ALIGNMENT]);

const _: () = assert!(align_of::<AllocationAlignment>() == ALLOCATION_ALIGNMENT);

fn dangling() -> NonNull<u8> {
    NonNull::<AllocationAlignment>::dangling().cast()
}

/// A memory resource backed by the system allocator.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemMemoryResource;

impl SystemMemoryResource {
    /// Create a new system memory resource.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn layout(bytes: usize) -> Result<Layout, AllocationError> {
        Layout::from_size_align(bytes, ALLOCATION_ALIGNMENT)
            .map_err(|_| AllocationError::InvalidSize { bytes })
    }
}

// SAFETY: `std::alloc` returns unique memory valid for the layout, which has `ALLOCATION_ALIGNMENT`
unsafe impl DeviceMemoryResource for SystemMemoryResource {
    fn allocate(&self, bytes: usize, _stream: &Stream) -> Result<NonNull<u8>, AllocationError> {
        if bytes == 0 {
            return Ok(dangling());
        }
        let layout = Self::layout(bytes)?;
        // SAFETY: the layout has a non-zero size
        let ptr = unsafe { std::alloc::alloc(layout) };
        NonNull::new(ptr).ok_or(AllocationError::OutOfMemory { bytes })
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, bytes: usize, _stream: &Stream) {
        if bytes == 0 {
            return;
        }
        if let Ok(layout) = Self::layout(bytes) {
            // SAFETY: the caller guarantees `ptr` was allocated by this resource with this layout
            unsafe { std::alloc::dealloc(ptr.as_ptr(), layout) };
        }
    }
}

static CURRENT_DEVICE_RESOURCE: LazyLock<RwLock<DeviceMemoryResourceHandle>> =
    LazyLock::new(|| RwLock::new(Arc::new(SystemMemoryResource)));

/// Return the current device memory resource.
///
/// This is a [`SystemMemoryResource`] unless replaced with [`set_current_device_resource`].
#[must_use]
pub fn current_device_resource() -> DeviceMemoryResourceHandle {
    CURRENT_DEVICE_RESOURCE
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// Replace the current device memory resource, returning the previous resource.
///
/// Memory allocated through the previous resource remains owned by it and is returned to it on deallocation.
pub fn set_current_device_resource(
    resource: DeviceMemoryResourceHandle,
) -> DeviceMemoryResourceHandle {
    let mut current = CURRENT_DEVICE_RESOURCE
        .write()
        .unwrap_or_else(PoisonError::into_inner);
    std::mem::replace(&mut *current, resource)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_allocate_aligned() {
        let stream = Stream::new();
        let mr = SystemMemoryResource::new();
        for bytes in [0, 1, 7, 4096] {
            let ptr = mr.allocate(bytes, &stream).unwrap();
            assert_eq!(ptr.as_ptr() as usize % ALLOCATION_ALIGNMENT, 0);
            unsafe { mr.deallocate(ptr, bytes, &stream) };
        }
    }

    #[test]
    fn adaptors_allocate_aligned() {
        use crate::DeviceVector;
        use crate::resource_adaptor::{LimitingResourceAdaptor, StatisticsResourceAdaptor};

        let stream = Stream::new();
        let statistics: DeviceMemoryResourceHandle =
            Arc::new(StatisticsResourceAdaptor::new(Arc::new(SystemMemoryResource)));
        let mr: DeviceMemoryResourceHandle =
            Arc::new(LimitingResourceAdaptor::new(statistics, 1 << 20));
        for bytes in [0, 1, 3, 1000] {
            let ptr = mr.allocate(bytes, &stream).unwrap();
            assert_eq!(ptr.as_ptr() as usize % ALLOCATION_ALIGNMENT, 0);
            unsafe { mr.deallocate(ptr, bytes, &stream) };
        }
        let vector = DeviceVector::<u64>::from_host(&[1, 2], &stream, mr).unwrap();
        assert_eq!(vector.to_host(&stream), vec![1, 2]);
    }

    #[test]
    fn system_allocate_invalid_size() {
        let stream = Stream::new();
        let mr = SystemMemoryResource::new();
        assert_eq!(
            mr.allocate(usize::MAX, &stream),
            Err(AllocationError::InvalidSize { bytes: usize::MAX })
        );
        let bytes = usize::try_from(i64::MAX).unwrap();
        assert!(mr.allocate(bytes, &stream).is_err());
    }

    #[test]
    fn current_resource_replace() {
        let limited: DeviceMemoryResourceHandle = Arc::new(
            crate::resource_adaptor::LimitingResourceAdaptor::new(current_device_resource(), 16),
        );
        let previous = set_current_device_resource(limited.clone());
        assert!(Arc::ptr_eq(&current_device_resource(), &limited));
        set_current_device_resource(previous);
        assert!(!Arc::ptr_eq(&current_device_resource(), &limited));
    }
}
