use std::marker::PhantomData;

use strand_device::{DeviceVector, Stream};

/// A non-owning view of one row of a strings column: a pointer into the chars buffer and a length in bytes.
///
/// Null rows are represented by [`StringView::null`], which has a null pointer and a length of zero.
/// A view is only meaningful while the chars buffer it points into is alive.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StringView {
    data: *const u8,
    size_bytes: usize,
}

// SAFETY: a `StringView` is a read only reference into a chars buffer, like `&[u8]`
unsafe impl Send for StringView {}
// SAFETY: as above
unsafe impl Sync for StringView {}

impl StringView {
    /// Create a view of `bytes`.
    #[must_use]
    pub fn new(bytes: &[u8]) -> Self {
        Self {
            data: bytes.as_ptr(),
            size_bytes: bytes.len(),
        }
    }

    /// Return the view of a null row.
    #[must_use]
    pub const fn null() -> Self {
        Self {
            data: std::ptr::null(),
            size_bytes: 0,
        }
    }

    /// Return the pointer to the first byte of the row.
    #[must_use]
    pub fn data(&self) -> *const u8 {
        self.data
    }

    /// Return the length of the row in bytes.
    #[must_use]
    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }

    /// Returns true if this is the view of a null row.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.data.is_null()
    }

    /// Returns true if the row has zero bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.size_bytes == 0
    }

    /// Return the bytes of the row. A null row has no bytes.
    ///
    /// # Safety
    /// The chars buffer the view points into must be alive and unmodified for `'a`.
    #[must_use]
    pub unsafe fn as_bytes<'a>(&self) -> &'a [u8] {
        if self.data.is_null() {
            &[]
        } else {
            // SAFETY: the view was created from a slice that the caller guarantees is still alive
            unsafe { std::slice::from_raw_parts(self.data, self.size_bytes) }
        }
    }
}

impl Default for StringView {
    fn default() -> Self {
        Self::null()
    }
}

/// A device resident array of [`StringView`]s, one per row of a strings column, in row order.
///
/// The array owns the views but borrows the chars buffer they point into for `'a`.
#[derive(Debug)]
pub struct StringViews<'a> {
    views: DeviceVector<StringView>,
    _chars: PhantomData<&'a [u8]>,
}

impl<'a> StringViews<'a> {
    /// Wrap views into a chars buffer borrowed for `'a`.
    ///
    /// # Safety
    /// Every non-null view must point into memory that is alive and unmodified for `'a`.
    pub(crate) unsafe fn new(views: DeviceVector<StringView>) -> Self {
        Self {
            views,
            _chars: PhantomData,
        }
    }

    /// Return the number of views.
    #[must_use]
    pub fn len(&self) -> usize {
        self.views.len()
    }

    /// Returns true if there are no views.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    /// Return the raw views, the form consumed by row parallel kernels.
    #[must_use]
    pub fn as_slice(&self) -> &[StringView] {
        &self.views
    }

    /// Return the bytes of row `row`, or [`None`] if the row is null or out of bounds.
    #[must_use]
    pub fn get(&self, row: usize) -> Option<&'a [u8]> {
        self.views
            .get(row)
            .filter(|view| !view.is_null())
            // SAFETY: the chars are borrowed for 'a
            .map(|view| unsafe { view.as_bytes() })
    }

    /// Return row `row` as a string slice, or [`None`] if the row is null, out of bounds, or not valid UTF-8.
    #[must_use]
    pub fn get_str(&self, row: usize) -> Option<&'a str> {
        self.get(row)
            .and_then(|bytes| std::str::from_utf8(bytes).ok())
    }

    /// Return an iterator over the rows, yielding [`None`] for null rows.
    pub fn iter(&self) -> impl Iterator<Item = Option<&'a [u8]>> + '_ {
        (0..self.len()).map(|row| self.get(row))
    }

    /// Copy the views to the host. This synchronises `stream`.
    #[must_use]
    pub fn to_host(&self, stream: &Stream) -> Vec<StringView> {
        self.views.to_host(stream)
    }

    /// Consume the array and return the raw views.
    ///
    /// The views are no longer tied to the lifetime of the chars buffer.
    #[must_use]
    pub fn into_inner(self) -> DeviceVector<StringView> {
        self.views
    }
}
