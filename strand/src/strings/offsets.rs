use std::ops::Range;

use super::{OffsetsCreateError, StringsError};
use crate::column::{ColumnView, DataType};

/// Width polymorphic strings offsets.
///
/// Both representations read as `i64` through [`OffsetsView::get`]: `int32` offsets are sign extended and `int64` offsets pass through unchanged.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OffsetsView<'a> {
    /// `int32` offsets.
    Int32(&'a [i32]),
    /// `int64` offsets.
    Int64(&'a [i64]),
}

impl<'a> OffsetsView<'a> {
    /// Create an offsets view from a column view.
    ///
    /// # Errors
    /// Returns [`StringsError::InvalidOffsetsType`] if the column is neither `int32` nor `int64`.
    pub fn new(offsets: &ColumnView<'a>) -> Result<Self, StringsError> {
        match offsets.data_type() {
            DataType::Int32 => Ok(Self::Int32(offsets.data::<i32>()?)),
            DataType::Int64 => Ok(Self::Int64(offsets.data::<i64>()?)),
            data_type => Err(StringsError::InvalidOffsetsType(data_type)),
        }
    }

    /// Return the offsets data type.
    #[must_use]
    pub fn data_type(&self) -> DataType {
        match self {
            Self::Int32(_) => DataType::Int32,
            Self::Int64(_) => DataType::Int64,
        }
    }

    /// Return the number of offsets.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Int32(offsets) => offsets.len(),
            Self::Int64(offsets) => offsets.len(),
        }
    }

    /// Returns true if there are no offsets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the offset at `index` widened to `i64`, or [`None`] if `index` is out of bounds.
    #[must_use]
    #[inline]
    pub fn get(&self, index: usize) -> Option<i64> {
        match self {
            Self::Int32(offsets) => offsets.get(index).copied().map(i64::from),
            Self::Int64(offsets) => offsets.get(index).copied(),
        }
    }

    /// Return an iterator over the offsets widened to `i64`.
    pub fn iter(&self) -> impl Iterator<Item = i64> + 'a {
        let (narrow, wide): (&'a [i32], &'a [i64]) = match *self {
            Self::Int32(offsets) => (offsets, &[]),
            Self::Int64(offsets) => (&[], offsets),
        };
        narrow
            .iter()
            .copied()
            .map(i64::from)
            .chain(wide.iter().copied())
    }

    /// Return the byte range of row `row` in the chars buffer.
    ///
    /// The offsets must have been validated as non-negative and `row + 1` must be in bounds.
    #[inline]
    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    pub(crate) fn byte_range(&self, row: usize) -> Range<usize> {
        match self {
            Self::Int32(offsets) => offsets[row] as usize..offsets[row + 1] as usize,
            Self::Int64(offsets) => offsets[row] as usize..offsets[row + 1] as usize,
        }
    }

    /// Check that the offsets are non-empty, non-negative and monotonically increasing.
    pub(crate) fn validate(&self) -> Result<(), StringsError> {
        let mut previous = 0;
        for (index, value) in self.iter().enumerate() {
            if value < 0 {
                return Err(OffsetsCreateError::Negative { index, value }.into());
            }
            if value < previous {
                return Err(OffsetsCreateError::NotMonotonicallyIncreasing { index }.into());
            }
            previous = value;
        }
        if self.is_empty() {
            Err(OffsetsCreateError::ZeroLength.into())
        } else {
            Ok(())
        }
    }
}
