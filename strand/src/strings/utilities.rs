use rayon::prelude::*;
use strand_device::{
    AllocationError, DeviceBuffer, DeviceMemoryResourceHandle, DeviceVector, Stream,
};

use super::{OffsetsView, StringView, StringViews, StringsColumnView, StringsError};
use crate::column::{Column, ColumnView, DataType};
use crate::config::{Config, global_config};

/// Return the size in bytes above which strings columns use `int64` offsets.
///
/// See the [offset64 threshold](crate::config::Config#offset64-threshold) configuration.
#[must_use]
pub fn get_offset64_threshold() -> i64 {
    global_config().offset64_threshold()
}

/// Returns true if strings columns may use `int64` offsets.
///
/// See the [large strings enabled](crate::config::Config#large-strings-enabled) configuration.
#[must_use]
pub fn is_large_strings_enabled() -> bool {
    global_config().large_strings_enabled()
}

/// Return the offsets data type of a strings column holding `bytes` bytes of chars.
///
/// `int32` offsets are used up to and including the offset64 threshold (and never beyond [`i32::MAX`]), `int64` offsets otherwise.
///
/// # Errors
/// Returns [`StringsError::ColumnSizeOverflow`] if `int64` offsets are required but large strings are disabled, or `bytes` exceeds [`i64::MAX`].
pub fn offsets_data_type_for(bytes: u64, config: &Config) -> Result<DataType, StringsError> {
    let threshold = config.offset64_threshold();
    let narrow_limit = u64::try_from(threshold.min(i64::from(i32::MAX))).unwrap_or(0);
    if bytes <= narrow_limit {
        Ok(DataType::Int32)
    } else if config.large_strings_enabled() && i64::try_from(bytes).is_ok() {
        Ok(DataType::Int64)
    } else {
        Err(StringsError::ColumnSizeOverflow { bytes, threshold })
    }
}

/// Create the offsets child of a strings column with rows of `sizes` bytes.
///
/// The offsets are the `sizes.len() + 1` element exclusive prefix sum of `sizes`, of the width chosen by [`offsets_data_type_for`] under the global configuration.
/// Returns the offsets column and the total size of the chars in bytes.
///
/// # Errors
/// Returns a [`StringsError`] if the total size cannot be represented by the offsets or an allocation fails.
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
pub fn make_offsets_child_column(
    sizes: &[usize],
    stream: &Stream,
    mr: &DeviceMemoryResourceHandle,
) -> Result<(Column, usize), StringsError> {
    let config = *global_config();
    let bytes = sizes
        .iter()
        .try_fold(0usize, |total, size| total.checked_add(*size))
        .ok_or(StringsError::ColumnSizeOverflow {
            bytes: u64::MAX,
            threshold: config.offset64_threshold(),
        })?;
    let data_type = offsets_data_type_for(bytes as u64, &config)?;
    let offsets = std::iter::once(0).chain(sizes.iter().scan(0usize, |offset, size| {
        *offset += size;
        Some(*offset)
    }));
    let column = match data_type {
        DataType::Int32 => {
            let offsets: Vec<i32> = offsets.map(|offset| offset as i32).collect();
            Column::from_host(&offsets, stream, mr)?
        }
        _ => {
            let offsets: Vec<i64> = offsets.map(|offset| offset as i64).collect();
            Column::from_host(&offsets, stream, mr)?
        }
    };
    log::debug!(
        "created {data_type} offsets for {} rows and {bytes} bytes of chars",
        sizes.len()
    );
    Ok((column, bytes))
}

/// Allocate the chars child of a strings column under construction.
///
/// The buffer holds exactly `bytes` uninitialised bytes, allocated from `mr` on `stream`.
/// It is filled by the caller and deallocated through `mr` when dropped.
///
/// # Errors
/// Returns an [`AllocationError`] if `mr` cannot satisfy the request.
pub fn create_chars_child_column(
    bytes: usize,
    stream: &Stream,
    mr: &DeviceMemoryResourceHandle,
) -> Result<DeviceBuffer, AllocationError> {
    DeviceBuffer::new(bytes, stream, mr.clone())
}

/// Read the offset at `index` of an `int32` or `int64` offsets column as `i64`.
///
/// `int32` offsets are sign extended. No clamping is applied to `int64` offsets.
/// This synchronises `stream` and must not be used in a per-row loop; see [`OffsetsView`] for bulk reads.
///
/// # Errors
/// Returns
///  - [`StringsError::InvalidOffsetsType`] if the column is neither `int32` nor `int64`, or
///  - [`StringsError::OffsetIndexOutOfBounds`] if `index` is not less than the column size.
pub fn get_offset_value(
    offsets: &ColumnView<'_>,
    index: usize,
    stream: &Stream,
) -> Result<i64, StringsError> {
    let offsets = OffsetsView::new(offsets)?;
    stream.synchronize();
    offsets
        .get(index)
        .ok_or(StringsError::OffsetIndexOutOfBounds {
            index,
            size: offsets.len(),
        })
}

/// Project a strings column into one [`StringView`] per row.
///
/// Valid rows view their bytes in the chars buffer of `strings`, and null rows are [`StringView::null`].
/// The views are written in parallel into a single allocation from `mr` on `stream`.
/// They borrow the chars of `strings`, so the column must outlive them.
///
/// # Errors
/// Returns a [`StringsError`] if the offsets are neither `int32` nor `int64` or the allocation fails.
pub fn create_string_vector_from_column<'a>(
    strings: &StringsColumnView<'a>,
    stream: &Stream,
    mr: &DeviceMemoryResourceHandle,
) -> Result<StringViews<'a>, StringsError> {
    let offsets = OffsetsView::new(&strings.offsets())?;
    let chars = strings.chars();
    let mut views = DeviceVector::<StringView>::new_uninit(strings.size(), stream, mr.clone())?;
    views.par_iter_mut().enumerate().for_each(|(row, view)| {
        view.write(if strings.is_valid(row) {
            StringView::new(&chars[offsets.byte_range(row)])
        } else {
            StringView::null()
        });
    });
    log::debug!(
        "projected {} rows into string views on {}",
        strings.size(),
        stream.id()
    );
    // SAFETY: every view was written above and points into `chars`, borrowed for 'a
    Ok(unsafe { StringViews::new(views.assume_init()) })
}
