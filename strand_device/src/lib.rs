//! The device memory and execution context API for the [`strand`](https://docs.rs/strand/latest/strand/index.html) crate.
//!
//! Device resident data in `strand` is owned by a [`DeviceBuffer`] (untyped bytes) or a [`DeviceVector`] (typed elements).
//! Every allocation is serviced by an injected [`DeviceMemoryResource`] and is associated with a [`Stream`], the ordering token that sequences work on the device.
//!
//! This crate includes a host backed device: memory is obtained from the system allocator ([`SystemMemoryResource`]) and work enqueued on a stream executes eagerly in issue order.
//! Resource adaptors in [`resource_adaptor`] wrap any upstream resource to cap or observe allocations.
//!
//! ## Licence
//! `strand_device` is licensed under either of
//! - the Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> or
//! - the MIT license <http://opensource.org/licenses/MIT>, at your option.

mod device_buffer;
mod device_vector;
mod memory_resource;
pub mod resource_adaptor;
mod stream;

use derive_more::Display;
use thiserror::Error;

pub use device_buffer::{BufferRangeError, DeviceBuffer};
pub use device_vector::{DeviceVector, DeviceVectorError};
pub use memory_resource::{
    ALLOCATION_ALIGNMENT, DeviceMemoryResource, DeviceMemoryResourceHandle, SystemMemoryResource,
    current_device_resource, set_current_device_resource,
};
pub use stream::Stream;

/// A device memory allocation error.
///
/// Allocation failures are never retried. The operation that requested the memory must be abandoned.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AllocationError {
    /// The requested size cannot be described as an allocation on this device.
    #[error("an allocation of {bytes} bytes exceeds the addressable range")]
    InvalidSize {
        /// The requested size in bytes.
        bytes: usize,
    },
    /// The upstream allocator could not satisfy the request.
    #[error("out of device memory allocating {bytes} bytes")]
    OutOfMemory {
        /// The requested size in bytes.
        bytes: usize,
    },
    /// A limiting resource adaptor refused the request.
    #[error(
        "allocating {bytes} bytes would exceed the allocation limit of {limit} bytes ({allocated} bytes allocated)"
    )]
    LimitExceeded {
        /// The requested size in bytes.
        bytes: usize,
        /// The bytes currently allocated through the adaptor.
        allocated: usize,
        /// The allocation limit in bytes.
        limit: usize,
    },
}

/// The identifier of a [`Stream`].
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[display("stream {_0}")]
pub struct StreamId(pub u64);
