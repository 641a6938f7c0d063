use std::marker::PhantomData;
use std::mem::MaybeUninit;
use std::ops::{Deref, DerefMut};

use thiserror::Error;

use crate::{ALLOCATION_ALIGNMENT, AllocationError, DeviceBuffer, DeviceMemoryResourceHandle, Stream};

/// An error reinterpreting a [`DeviceBuffer`] as a [`DeviceVector`].
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DeviceVectorError {
    /// The buffer size is not a multiple of the element size.
    #[error("a buffer of {size} bytes is not a whole number of {element_size} byte elements")]
    Size {
        /// The buffer size in bytes.
        size: usize,
        /// The element size in bytes.
        element_size: usize,
    },
    /// The buffer is not aligned for the element type.
    #[error("the buffer is not aligned to {align} bytes")]
    Alignment {
        /// The required alignment.
        align: usize,
    },
}

/// A typed, owning, move only vector of device memory.
///
/// Uninitialised vectors are represented as `DeviceVector<MaybeUninit<T>>` and become `DeviceVector<T>` with [`assume_init`](DeviceVector::assume_init) once filled.
///
/// The host backed device makes the contents directly addressable, so the vector dereferences to a slice.
/// That slice is the device span handed to row parallel work.
/// Host code that needs to observe results of pending stream work should read through [`element`](DeviceVector::element) or [`to_host`](DeviceVector::to_host), which synchronise the stream.
#[derive(Debug)]
pub struct DeviceVector<T> {
    buffer: DeviceBuffer,
    len: usize,
    _marker: PhantomData<T>,
}

impl<T: Copy> DeviceVector<T> {
    const VALID_ELEMENT: () = assert!(
        size_of::<T>() > 0 && align_of::<T>() <= ALLOCATION_ALIGNMENT,
        "device vector elements must be sized and aligned to at most the allocation alignment"
    );

    /// Allocate an uninitialised vector of `len` elements on `stream`.
    ///
    /// # Errors
    /// Returns an [`AllocationError`] if `mr` cannot satisfy the request.
    pub fn new_uninit(
        len: usize,
        stream: &Stream,
        mr: DeviceMemoryResourceHandle,
    ) -> Result<DeviceVector<MaybeUninit<T>>, AllocationError> {
        let () = Self::VALID_ELEMENT;
        let bytes = len
            .checked_mul(size_of::<T>())
            .ok_or(AllocationError::InvalidSize { bytes: usize::MAX })?;
        Ok(DeviceVector {
            buffer: DeviceBuffer::new(bytes, stream, mr)?,
            len,
            _marker: PhantomData,
        })
    }

    /// Allocate a vector on `stream` and copy `src` from the host into it.
    ///
    /// # Errors
    /// Returns an [`AllocationError`] if `mr` cannot satisfy the request.
    pub fn from_host(
        src: &[T],
        stream: &Stream,
        mr: DeviceMemoryResourceHandle,
    ) -> Result<Self, AllocationError> {
        let mut vector = Self::new_uninit(src.len(), stream, mr)?;
        for (dst, src) in vector.iter_mut().zip(src) {
            dst.write(*src);
        }
        // SAFETY: every element was written above
        Ok(unsafe { vector.assume_init() })
    }

    /// Read the element at `index`, or [`None`] if `index` is out of bounds.
    ///
    /// This synchronises `stream` so that the value reflects all work previously enqueued on it.
    #[must_use]
    pub fn element(&self, index: usize, stream: &Stream) -> Option<T> {
        stream.synchronize();
        self.get(index).copied()
    }

    /// Copy the vector to the host.
    ///
    /// This synchronises `stream` so that the values reflect all work previously enqueued on it.
    #[must_use]
    pub fn to_host(&self, stream: &Stream) -> Vec<T> {
        stream.synchronize();
        self.to_vec()
    }
}

impl<T: Copy> DeviceVector<MaybeUninit<T>> {
    /// Reinterpret an untyped buffer as an uninitialised vector.
    ///
    /// # Errors
    /// Returns a [`DeviceVectorError`] if the buffer size is not a multiple of the element size or the buffer is misaligned for `T`.
    pub fn from_buffer(buffer: DeviceBuffer) -> Result<Self, DeviceVectorError> {
        let () = DeviceVector::<T>::VALID_ELEMENT;
        let element_size = size_of::<T>();
        if buffer.size() % element_size != 0 {
            return Err(DeviceVectorError::Size {
                size: buffer.size(),
                element_size,
            });
        }
        if buffer.as_ptr().align_offset(align_of::<T>()) != 0 {
            return Err(DeviceVectorError::Alignment {
                align: align_of::<T>(),
            });
        }
        Ok(Self {
            len: buffer.size() / element_size,
            buffer,
            _marker: PhantomData,
        })
    }

    /// Convert to an initialised vector.
    ///
    /// # Safety
    /// Every element must have been initialised.
    #[must_use]
    pub unsafe fn assume_init(self) -> DeviceVector<T> {
        DeviceVector {
            buffer: self.buffer,
            len: self.len,
            _marker: PhantomData,
        }
    }
}

impl From<DeviceBuffer> for DeviceVector<MaybeUninit<u8>> {
    fn from(buffer: DeviceBuffer) -> Self {
        Self {
            len: buffer.size(),
            buffer,
            _marker: PhantomData,
        }
    }
}

impl<T> DeviceVector<T> {
    /// Return the number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the vector has no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Return the stream the underlying buffer is associated with.
    #[must_use]
    pub fn stream(&self) -> &Stream {
        self.buffer.stream()
    }

    /// Consume the vector and return the underlying buffer.
    #[must_use]
    pub fn into_buffer(self) -> DeviceBuffer {
        self.buffer
    }
}

impl<T> Deref for DeviceVector<T> {
    type Target = [T];

    fn deref(&self) -> &Self::Target {
        // SAFETY: the buffer holds `len` aligned elements, initialised unless `T` is `MaybeUninit`
        unsafe { std::slice::from_raw_parts(self.buffer.as_ptr().cast::<T>(), self.len) }
    }
}

impl<T> DerefMut for DeviceVector<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        // SAFETY: as for `deref`, and the buffer is uniquely borrowed
        unsafe { std::slice::from_raw_parts_mut(self.buffer.as_mut_ptr().cast::<T>(), self.len) }
    }
}
