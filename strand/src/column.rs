//! Typed columns.
//!
//! A [`Column`] owns a device resident buffer of fixed width elements and an optional validity [`Bitmask`].
//! A [`ColumnView`] is a cheap, borrowed, possibly sliced view of a column, tagged with its [`DataType`].
//!
//! Typed access to a view is checked against the tag: [`ColumnView::data`] fails with a [`ColumnTypeError`] if the requested element type does not match.

mod bitmask;
mod data_type;

pub use bitmask::Bitmask;
pub use data_type::{ColumnElement, DataType};

use derive_more::Display;
use strand_device::{AllocationError, DeviceMemoryResourceHandle, DeviceVector, Stream};
use thiserror::Error;

/// An error accessing a column with the wrong element type.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ColumnTypeError {
    /// The requested element type does not match the column data type.
    #[error("expected a column of type {expected}, found {found}")]
    Mismatch {
        /// The requested type.
        expected: DataType,
        /// The column type.
        found: DataType,
    },
    /// The column data cannot be reinterpreted as the element type.
    #[error("column data is not a valid {data_type} slice: {reason:?}")]
    Cast {
        /// The column type.
        data_type: DataType,
        /// The reason for the failure.
        reason: bytemuck::PodCastError,
    },
}

/// A column creation error.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ColumnCreateError {
    /// The data type is not fixed width.
    #[error("a column of type {_0} cannot be created from fixed width data")]
    NotFixedWidth(DataType),
    /// The data length does not match the column size.
    #[error("{len} bytes of data do not hold {size} elements of type {data_type}")]
    DataSize {
        /// The column type.
        data_type: DataType,
        /// The number of rows.
        size: usize,
        /// The data length in bytes.
        len: usize,
    },
    /// The null mask does not cover the column.
    #[error("a null mask of {mask_size} rows does not cover a column of {size} rows")]
    NullMaskSize {
        /// The rows covered by the mask.
        mask_size: usize,
        /// The number of rows.
        size: usize,
    },
    /// Allocation failure.
    #[error(transparent)]
    Allocation(#[from] AllocationError),
}

/// A slice extends beyond a column.
#[derive(Clone, Debug, Display, Error, PartialEq, Eq)]
#[display("slice {begin}..{end} is out of bounds for a column of {size} rows")]
pub struct SliceBoundsError {
    begin: usize,
    end: usize,
    size: usize,
}

impl SliceBoundsError {
    pub(crate) fn check(begin: usize, end: usize, size: usize) -> Result<(), Self> {
        if begin <= end && end <= size {
            Ok(())
        } else {
            Err(Self { begin, end, size })
        }
    }
}

/// An owned, device resident, fixed width column.
#[derive(Debug)]
pub struct Column {
    data_type: DataType,
    size: usize,
    data: DeviceVector<u8>,
    null_mask: Option<Bitmask>,
    null_count: usize,
}

impl Column {
    /// Create a column of `size` elements of `data_type` from device `data`.
    ///
    /// # Errors
    /// Returns a [`ColumnCreateError`] if `data_type` is not fixed width, `data` does not hold exactly `size` elements, or `null_mask` does not cover `size` rows.
    pub fn new(
        data_type: DataType,
        size: usize,
        data: DeviceVector<u8>,
        null_mask: Option<Bitmask>,
    ) -> Result<Self, ColumnCreateError> {
        let width = data_type
            .size_in_bytes()
            .ok_or(ColumnCreateError::NotFixedWidth(data_type))?;
        if size.checked_mul(width) != Some(data.len()) {
            return Err(ColumnCreateError::DataSize {
                data_type,
                size,
                len: data.len(),
            });
        }
        let null_count = match &null_mask {
            Some(mask) if mask.size() < size => {
                return Err(ColumnCreateError::NullMaskSize {
                    mask_size: mask.size(),
                    size,
                });
            }
            Some(mask) => mask.count_unset(0, size),
            None => 0,
        };
        Ok(Self {
            data_type,
            size,
            data,
            null_mask,
            null_count,
        })
    }

    /// Create a column by copying `values` from the host.
    ///
    /// # Errors
    /// Returns an [`AllocationError`] if `mr` cannot satisfy the request.
    pub fn from_host<T: ColumnElement>(
        values: &[T],
        stream: &Stream,
        mr: &DeviceMemoryResourceHandle,
    ) -> Result<Self, AllocationError> {
        let data = DeviceVector::from_host(bytemuck::cast_slice(values), stream, mr.clone())?;
        Ok(Self {
            data_type: T::DATA_TYPE,
            size: values.len(),
            data,
            null_mask: None,
            null_count: 0,
        })
    }

    /// Return the column data type.
    #[must_use]
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Return the number of rows.
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Returns true if the column has zero rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Return the number of null rows.
    #[must_use]
    pub fn null_count(&self) -> usize {
        self.null_count
    }

    /// Return the validity mask, if any.
    #[must_use]
    pub fn null_mask(&self) -> Option<&Bitmask> {
        self.null_mask.as_ref()
    }

    /// Return a view of the whole column.
    #[must_use]
    pub fn view(&self) -> ColumnView<'_> {
        ColumnView {
            data_type: self.data_type,
            size: self.size,
            offset: 0,
            data: &self.data,
            null_mask: self.null_mask.as_ref(),
        }
    }
}

/// A borrowed view of a fixed width column.
///
/// The view covers rows `offset..offset + size` of the underlying data.
#[derive(Clone, Copy, Debug)]
pub struct ColumnView<'a> {
    data_type: DataType,
    size: usize,
    offset: usize,
    data: &'a [u8],
    null_mask: Option<&'a Bitmask>,
}

impl<'a> ColumnView<'a> {
    /// Create a view of `size` elements of `data_type` over device `data`.
    ///
    /// # Errors
    /// Returns a [`ColumnCreateError`] if `data_type` is not fixed width, `data` does not hold exactly `size` elements, or `null_mask` does not cover `size` rows.
    pub fn new(
        data_type: DataType,
        size: usize,
        data: &'a [u8],
        null_mask: Option<&'a Bitmask>,
    ) -> Result<Self, ColumnCreateError> {
        let width = data_type
            .size_in_bytes()
            .ok_or(ColumnCreateError::NotFixedWidth(data_type))?;
        if size.checked_mul(width) != Some(data.len()) {
            return Err(ColumnCreateError::DataSize {
                data_type,
                size,
                len: data.len(),
            });
        }
        if let Some(mask) = null_mask
            && mask.size() < size
        {
            return Err(ColumnCreateError::NullMaskSize {
                mask_size: mask.size(),
                size,
            });
        }
        Ok(Self {
            data_type,
            size,
            offset: 0,
            data,
            null_mask,
        })
    }

    /// Return the column data type.
    #[must_use]
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Return the number of rows in the view.
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Returns true if the view has zero rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Return the index of the first row of the view in the underlying column.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Return the validity mask of the underlying column, if any.
    ///
    /// The mask is indexed by underlying row, i.e. row `i` of the view is bit `offset() + i`.
    #[must_use]
    pub fn null_mask(&self) -> Option<&'a Bitmask> {
        self.null_mask
    }

    /// Returns true if row `row` of the view is valid.
    #[must_use]
    #[inline]
    pub fn is_valid(&self, row: usize) -> bool {
        self.null_mask
            .is_none_or(|mask| mask.is_valid(self.offset + row))
    }

    /// Return the number of null rows in the view.
    #[must_use]
    pub fn null_count(&self) -> usize {
        self.null_mask.map_or(0, |mask| {
            mask.count_unset(self.offset, self.offset + self.size)
        })
    }

    /// Return the elements of the view.
    ///
    /// # Errors
    /// Returns a [`ColumnTypeError`] if `T` does not match the column data type.
    pub fn data<T: ColumnElement>(&self) -> Result<&'a [T], ColumnTypeError> {
        if T::DATA_TYPE != self.data_type {
            return Err(ColumnTypeError::Mismatch {
                expected: T::DATA_TYPE,
                found: self.data_type,
            });
        }
        let data: &'a [T] =
            bytemuck::try_cast_slice(self.data).map_err(|reason| ColumnTypeError::Cast {
                data_type: self.data_type,
                reason,
            })?;
        Ok(&data[self.offset..self.offset + self.size])
    }

    /// Read the element at row `index` of the view, or [`None`] if `index` is out of bounds.
    ///
    /// This synchronises `stream` and must not be used in a per-row loop.
    ///
    /// # Errors
    /// Returns a [`ColumnTypeError`] if `T` does not match the column data type.
    pub fn element<T: ColumnElement>(
        &self,
        index: usize,
        stream: &Stream,
    ) -> Result<Option<T>, ColumnTypeError> {
        let data = self.data::<T>()?;
        stream.synchronize();
        Ok(data.get(index).copied())
    }

    /// Return a view of rows `begin..end` of this view.
    ///
    /// # Errors
    /// Returns a [`SliceBoundsError`] if `begin..end` is not within the view.
    pub fn slice(&self, begin: usize, end: usize) -> Result<Self, SliceBoundsError> {
        SliceBoundsError::check(begin, end, self.size)?;
        Ok(Self {
            size: end - begin,
            offset: self.offset + begin,
            ..*self
        })
    }
}

impl<'a> From<&'a Column> for ColumnView<'a> {
    fn from(column: &'a Column) -> Self {
        column.view()
    }
}
