//! Device memory resource adaptors.
//!
//! An adaptor wraps an upstream [`DeviceMemoryResource`](crate::DeviceMemoryResource) and is itself a resource, so adaptors can be stacked.

pub mod limiting;
pub mod statistics;

pub use limiting::LimitingResourceAdaptor;
pub use statistics::StatisticsResourceAdaptor;
