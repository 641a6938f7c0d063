//! Strings columns.
//!
//! A strings column stores the bytes of every row contiguously in a shared *chars* buffer, delimited by an *offsets* column of `rows + 1` non-decreasing values.
//! Row `i` is the byte range `offsets[i]..offsets[i + 1]` of the chars buffer.
//! The offsets are either `int32` or `int64`: the width is chosen when a column is built, by comparing its size in bytes against the [offset64 threshold](crate::config::Config#offset64-threshold).
//!
//! This module provides:
//! - [`get_offset64_threshold`] and [`offsets_data_type_for`]: the offset width policy,
//! - [`make_offsets_child_column`] and [`create_chars_child_column`]: allocation of the children of a column under construction,
//! - [`get_offset_value`] and [`OffsetsView`]: width polymorphic offset reads,
//! - [`create_string_vector_from_column`]: projection of a column into per-row [`StringView`]s for row parallel consumers.

mod offsets;
mod string_view;
mod strings_column;
mod utilities;

pub use offsets::OffsetsView;
pub use string_view::{StringView, StringViews};
pub use strings_column::{StringsColumn, StringsColumnView};
pub use utilities::{
    create_chars_child_column, create_string_vector_from_column, get_offset64_threshold,
    get_offset_value, is_large_strings_enabled, make_offsets_child_column, offsets_data_type_for,
};

use strand_device::AllocationError;
use thiserror::Error;

use crate::column::{ColumnCreateError, ColumnTypeError, DataType, SliceBoundsError};

/// An error creating offsets for a strings column.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum OffsetsCreateError {
    /// The offsets length must be greater than zero.
    #[error("offsets length must be greater than zero")]
    ZeroLength,
    /// An offset is negative.
    #[error("offset {value} at index {index} is negative")]
    Negative {
        /// The index of the offset.
        index: usize,
        /// The offset.
        value: i64,
    },
    /// The offsets are not monotonically increasing.
    #[error("offsets are not monotonically increasing at index {index}")]
    NotMonotonicallyIncreasing {
        /// The index of the first offset smaller than its predecessor.
        index: usize,
    },
    /// The last offset does not match the chars length.
    #[error("the last offset {last} does not match the chars length {chars_len}")]
    CharsLength {
        /// The last offset.
        last: i64,
        /// The chars length in bytes.
        chars_len: usize,
    },
    /// The null mask does not cover the column.
    #[error("a null mask of {mask_size} rows does not cover a column of {size} rows")]
    NullMaskSize {
        /// The rows covered by the mask.
        mask_size: usize,
        /// The number of rows.
        size: usize,
    },
}

/// A strings column error.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StringsError {
    /// The offsets column is neither `int32` nor `int64`.
    #[error("offsets must be int32 or int64, found {_0}")]
    InvalidOffsetsType(DataType),
    /// An offset index is out of bounds.
    #[error("offset index {index} is out of bounds for offsets of length {size}")]
    OffsetIndexOutOfBounds {
        /// The requested index.
        index: usize,
        /// The offsets length.
        size: usize,
    },
    /// Invalid offsets.
    #[error(transparent)]
    InvalidOffsets(#[from] OffsetsCreateError),
    /// The column is too large for its offsets.
    #[error(
        "a strings column of {bytes} bytes exceeds the offset64 threshold of {threshold} bytes and large strings are disabled"
    )]
    ColumnSizeOverflow {
        /// The column size in bytes.
        bytes: u64,
        /// The offset64 threshold in bytes.
        threshold: i64,
    },
    /// Allocation failure.
    #[error(transparent)]
    Allocation(#[from] AllocationError),
    /// Column creation failure.
    #[error(transparent)]
    ColumnCreate(#[from] ColumnCreateError),
    /// Column type failure.
    #[error(transparent)]
    ColumnType(#[from] ColumnTypeError),
    /// Slice out of bounds.
    #[error(transparent)]
    SliceBounds(#[from] SliceBoundsError),
}
