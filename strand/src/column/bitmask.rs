use strand_device::{AllocationError, DeviceMemoryResourceHandle, DeviceVector, Stream};

/// The number of bits in a bitmask word.
const WORD_BITS: usize = u32::BITS as usize;

/// A device resident validity mask with one bit per row.
///
/// Bits are packed least significant bit first into `u32` words. A set bit marks a valid (non-null) row.
#[derive(Debug)]
pub struct Bitmask {
    words: DeviceVector<u32>,
    size: usize,
}

impl Bitmask {
    /// Create a bitmask from host validity flags.
    ///
    /// # Errors
    /// Returns an [`AllocationError`] if `mr` cannot satisfy the request.
    pub fn from_bools(
        valid: &[bool],
        stream: &Stream,
        mr: &DeviceMemoryResourceHandle,
    ) -> Result<Self, AllocationError> {
        let mut words = vec![0u32; valid.len().div_ceil(WORD_BITS)];
        for (row, _) in valid.iter().enumerate().filter(|(_, valid)| **valid) {
            words[row / WORD_BITS] |= 1 << (row % WORD_BITS);
        }
        Ok(Self {
            words: DeviceVector::from_host(&words, stream, mr.clone())?,
            size: valid.len(),
        })
    }

    /// Create a bitmask of `size` rows that are all valid.
    ///
    /// # Errors
    /// Returns an [`AllocationError`] if `mr` cannot satisfy the request.
    pub fn all_valid(
        size: usize,
        stream: &Stream,
        mr: &DeviceMemoryResourceHandle,
    ) -> Result<Self, AllocationError> {
        Self::from_bools(&vec![true; size], stream, mr)
    }

    /// Return the number of rows covered by the mask.
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Returns true if `row` is valid. Rows beyond the mask are not valid.
    #[must_use]
    #[inline]
    pub fn is_valid(&self, row: usize) -> bool {
        row < self.size && self.words[row / WORD_BITS] & (1 << (row % WORD_BITS)) != 0
    }

    /// Count the null rows in `begin..end`, clamped to the mask.
    #[must_use]
    pub fn count_unset(&self, begin: usize, end: usize) -> usize {
        let end = end.min(self.size);
        (begin..end).filter(|&row| !self.is_valid(row)).count()
    }

    /// Return the packed words.
    #[must_use]
    pub fn words(&self) -> &[u32] {
        &self.words
    }
}
