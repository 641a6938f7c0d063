use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};

use crate::StreamId;

static NEXT_STREAM_ID: AtomicU64 = AtomicU64::new(1);

static DEFAULT_STREAM: LazyLock<Stream> = LazyLock::new(|| Stream::with_id(StreamId(0)));

#[derive(Debug)]
struct StreamInner {
    id: StreamId,
    synchronizations: AtomicU64,
}

/// An execution context: a sequential instruction stream on the device.
///
/// Work enqueued on the same stream executes in issue order.
/// Work on different streams has no ordering guarantee unless the streams are explicitly synchronised.
///
/// A `Stream` is a cheap handle. Clones refer to the same stream.
///
/// The host backed device executes enqueued work eagerly, so every operation issued on a stream has completed by the time the issuing call returns.
/// Code should nevertheless call [`Stream::synchronize`] wherever a host thread must observe the result of device work, as it would on an asynchronous device.
#[derive(Debug, Clone)]
pub struct Stream(Arc<StreamInner>);

impl Stream {
    /// Create a new stream with a process unique identifier.
    #[must_use]
    pub fn new() -> Self {
        Self::with_id(StreamId(NEXT_STREAM_ID.fetch_add(1, Ordering::Relaxed)))
    }

    fn with_id(id: StreamId) -> Self {
        Self(Arc::new(StreamInner {
            id,
            synchronizations: AtomicU64::new(0),
        }))
    }

    /// Return the process wide default stream.
    #[must_use]
    pub fn default_stream() -> Self {
        DEFAULT_STREAM.clone()
    }

    /// Return the stream identifier.
    #[must_use]
    pub fn id(&self) -> StreamId {
        self.0.id
    }

    /// Returns true if this is the default stream.
    #[must_use]
    pub fn is_default(&self) -> bool {
        self.0.id == StreamId(0)
    }

    /// Block the calling thread until all work enqueued on the stream has completed.
    ///
    /// This is an expensive operation on an asynchronous device and should not be called per element.
    pub fn synchronize(&self) {
        self.0.synchronizations.fetch_add(1, Ordering::Relaxed);
        log::trace!("synchronize {}", self.0.id);
    }

    /// Return the number of times the stream has been synchronised.
    #[must_use]
    pub fn synchronize_count(&self) -> u64 {
        self.0.synchronizations.load(Ordering::Relaxed)
    }
}

impl Default for Stream {
    fn default() -> Self {
        Self::default_stream()
    }
}

impl PartialEq for Stream {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for Stream {}
