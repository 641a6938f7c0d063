use std::mem::MaybeUninit;

use strand_device::{DeviceMemoryResourceHandle, DeviceVector, Stream};

use super::{
    OffsetsCreateError, OffsetsView, StringsError, create_chars_child_column, get_offset_value,
    make_offsets_child_column,
};
use crate::column::{Bitmask, Column, ColumnView, SliceBoundsError};

/// An owned, device resident strings column.
///
/// The column is made of two children, an `int32` or `int64` offsets column of `size + 1` elements and a chars buffer, plus an optional validity mask.
#[derive(Debug)]
pub struct StringsColumn {
    offsets: Column,
    chars: DeviceVector<u8>,
    null_mask: Option<Bitmask>,
    null_count: usize,
}

impl StringsColumn {
    /// Create a strings column from its children.
    ///
    /// This synchronises `stream` to read the offsets.
    ///
    /// # Errors
    /// Returns a [`StringsError`] if
    ///  - the offsets are neither `int32` nor `int64`,
    ///  - the offsets are empty, negative or decreasing,
    ///  - the last offset is not the length of `chars`, or
    ///  - `null_mask` does not cover every row.
    pub fn new(
        offsets: Column,
        chars: DeviceVector<u8>,
        null_mask: Option<Bitmask>,
        stream: &Stream,
    ) -> Result<Self, StringsError> {
        let view = OffsetsView::new(&offsets.view())?;
        stream.synchronize();
        view.validate()?;
        let last = view.get(view.len() - 1).unwrap_or_default();
        if usize::try_from(last).ok() != Some(chars.len()) {
            return Err(OffsetsCreateError::CharsLength {
                last,
                chars_len: chars.len(),
            }
            .into());
        }
        let size = view.len() - 1;
        if let Some(mask) = &null_mask
            && mask.size() < size
        {
            return Err(OffsetsCreateError::NullMaskSize {
                mask_size: mask.size(),
                size,
            }
            .into());
        }
        // SAFETY: validated above
        Ok(unsafe { Self::new_unchecked(offsets, chars, null_mask) })
    }

    /// Create a strings column from its children without validation.
    ///
    /// # Safety
    /// The offsets must be a non-empty, non-negative, non-decreasing `int32` or `int64` column whose last element is the length of `chars`.
    /// `null_mask` must cover every row.
    #[must_use]
    pub unsafe fn new_unchecked(
        offsets: Column,
        chars: DeviceVector<u8>,
        null_mask: Option<Bitmask>,
    ) -> Self {
        debug_assert!(offsets.data_type().is_offsets_type());
        debug_assert!(!offsets.is_empty());
        let size = offsets.size().saturating_sub(1);
        let null_count = null_mask
            .as_ref()
            .map_or(0, |mask| mask.count_unset(0, size));
        Self {
            offsets,
            chars,
            null_mask,
            null_count,
        }
    }

    /// Build a strings column from host strings, where [`None`] is a null row.
    ///
    /// The offsets width follows the [offset64 threshold](crate::config::Config#offset64-threshold).
    /// A validity mask is only created if there is at least one null row.
    ///
    /// # Errors
    /// Returns a [`StringsError`] if the column is too large for its offsets or an allocation fails.
    pub fn from_strs<'s>(
        strings: impl IntoIterator<Item = Option<&'s str>>,
        stream: &Stream,
        mr: &DeviceMemoryResourceHandle,
    ) -> Result<Self, StringsError> {
        let strings: Vec<Option<&str>> = strings.into_iter().collect();
        let sizes: Vec<usize> = strings.iter().map(|s| s.map_or(0, str::len)).collect();
        let (offsets, bytes) = make_offsets_child_column(&sizes, stream, mr)?;

        let mut chars = create_chars_child_column(bytes, stream, mr)?;
        let bytes_iter = strings.iter().flatten().flat_map(|s| s.bytes());
        for (dst, src) in chars.as_uninit_slice_mut().iter_mut().zip(bytes_iter) {
            dst.write(src);
        }
        let chars: DeviceVector<MaybeUninit<u8>> = chars.into();
        // SAFETY: the chars buffer holds exactly the bytes of the strings, all written above
        let chars = unsafe { chars.assume_init() };

        let null_mask = if strings.iter().any(Option::is_none) {
            let valid: Vec<bool> = strings.iter().map(Option::is_some).collect();
            Some(Bitmask::from_bools(&valid, stream, mr)?)
        } else {
            None
        };
        // SAFETY: the offsets are the prefix sum of the sizes, which total the chars length
        Ok(unsafe { Self::new_unchecked(offsets, chars, null_mask) })
    }

    /// Create a strings column with zero rows.
    ///
    /// # Errors
    /// Returns a [`StringsError`] if an allocation fails.
    pub fn empty(stream: &Stream, mr: &DeviceMemoryResourceHandle) -> Result<Self, StringsError> {
        Self::from_strs(std::iter::empty(), stream, mr)
    }

    /// Return the number of rows.
    #[must_use]
    pub fn size(&self) -> usize {
        self.offsets.size() - 1
    }

    /// Returns true if the column has zero rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Return the offsets child.
    #[must_use]
    pub fn offsets(&self) -> &Column {
        &self.offsets
    }

    /// Return the chars child.
    #[must_use]
    pub fn chars(&self) -> &[u8] {
        &self.chars
    }

    /// Return the validity mask, if any.
    #[must_use]
    pub fn null_mask(&self) -> Option<&Bitmask> {
        self.null_mask.as_ref()
    }

    /// Return the number of null rows.
    #[must_use]
    pub fn null_count(&self) -> usize {
        self.null_count
    }

    /// Return a view of the whole column.
    #[must_use]
    pub fn view(&self) -> StringsColumnView<'_> {
        StringsColumnView {
            offsets: self.offsets.view(),
            chars: &self.chars,
            null_mask: self.null_mask.as_ref(),
            offset: 0,
            size: self.size(),
        }
    }

    /// Return a view of rows `begin..end`.
    ///
    /// # Errors
    /// Returns a [`SliceBoundsError`] if `begin..end` is not within the column.
    pub fn slice(
        &self,
        begin: usize,
        end: usize,
    ) -> Result<StringsColumnView<'_>, SliceBoundsError> {
        self.view().slice(begin, end)
    }
}

/// A borrowed, possibly sliced, view of a strings column.
///
/// The offsets of the view are the `size + 1` offsets of its rows.
/// The chars are always the whole chars buffer of the underlying column, since offsets index into it.
#[derive(Clone, Copy, Debug)]
pub struct StringsColumnView<'a> {
    offsets: ColumnView<'a>,
    chars: &'a [u8],
    null_mask: Option<&'a Bitmask>,
    offset: usize,
    size: usize,
}

impl<'a> StringsColumnView<'a> {
    /// Create a view from borrowed children.
    ///
    /// `null_mask` is indexed by row of the view.
    ///
    /// # Errors
    /// Returns a [`StringsError`] if
    ///  - the offsets are neither `int32` nor `int64`,
    ///  - the offsets are empty, negative or decreasing,
    ///  - the last offset is beyond the end of `chars`, or
    ///  - `null_mask` does not cover every row.
    pub fn new(
        offsets: ColumnView<'a>,
        chars: &'a [u8],
        null_mask: Option<&'a Bitmask>,
    ) -> Result<Self, StringsError> {
        let view = OffsetsView::new(&offsets)?;
        view.validate()?;
        let last = view.get(view.len() - 1).unwrap_or_default();
        if usize::try_from(last).is_ok_and(|last| last > chars.len()) {
            return Err(OffsetsCreateError::CharsLength {
                last,
                chars_len: chars.len(),
            }
            .into());
        }
        let size = view.len() - 1;
        if let Some(mask) = null_mask
            && mask.size() < size
        {
            return Err(OffsetsCreateError::NullMaskSize {
                mask_size: mask.size(),
                size,
            }
            .into());
        }
        Ok(Self {
            offsets,
            chars,
            null_mask,
            offset: 0,
            size,
        })
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

    /// Return the `size + 1` offsets of the rows of the view.
    #[must_use]
    pub fn offsets(&self) -> ColumnView<'a> {
        self.offsets
    }

    /// Return the chars buffer of the underlying column.
    #[must_use]
    pub fn chars(&self) -> &'a [u8] {
        self.chars
    }

    /// Return the validity mask of the underlying column, if any.
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

    /// Return a view of rows `begin..end` of this view.
    ///
    /// # Errors
    /// Returns a [`SliceBoundsError`] if `begin..end` is not within the view.
    pub fn slice(&self, begin: usize, end: usize) -> Result<Self, SliceBoundsError> {
        SliceBoundsError::check(begin, end, self.size)?;
        Ok(Self {
            offsets: self.offsets.slice(begin, end + 1)?,
            offset: self.offset + begin,
            size: end - begin,
            ..*self
        })
    }

    /// Return the number of chars bytes spanned by the rows of the view.
    ///
    /// This synchronises `stream`.
    ///
    /// # Errors
    /// Returns a [`StringsError`] if the offsets cannot be read.
    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    pub fn chars_size(&self, stream: &Stream) -> Result<usize, StringsError> {
        if self.size == 0 {
            return Ok(0);
        }
        let first = get_offset_value(&self.offsets, 0, stream)?;
        let last = get_offset_value(&self.offsets, self.size, stream)?;
        Ok((last - first) as usize)
    }
}

impl<'a> From<&'a StringsColumn> for StringsColumnView<'a> {
    fn from(column: &'a StringsColumn) -> Self {
        column.view()
    }
}
