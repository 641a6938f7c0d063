use derive_more::Display;

/// The element type of a column.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
pub enum DataType {
    /// A boolean stored as one byte.
    #[display("bool8")]
    Bool8,
    /// A signed 8-bit integer.
    #[display("int8")]
    Int8,
    /// A signed 16-bit integer.
    #[display("int16")]
    Int16,
    /// A signed 32-bit integer.
    #[display("int32")]
    Int32,
    /// A signed 64-bit integer.
    #[display("int64")]
    Int64,
    /// An unsigned 8-bit integer.
    #[display("uint8")]
    UInt8,
    /// An unsigned 16-bit integer.
    #[display("uint16")]
    UInt16,
    /// An unsigned 32-bit integer.
    #[display("uint32")]
    UInt32,
    /// An unsigned 64-bit integer.
    #[display("uint64")]
    UInt64,
    /// A 32-bit float.
    #[display("float32")]
    Float32,
    /// A 64-bit float.
    #[display("float64")]
    Float64,
    /// Variable length UTF-8 strings, stored as offsets and chars.
    #[display("string")]
    String,
}

impl DataType {
    /// Return the size of one element in bytes, or [`None`] for a variable length type.
    #[must_use]
    pub fn size_in_bytes(&self) -> Option<usize> {
        match self {
            Self::Bool8 | Self::Int8 | Self::UInt8 => Some(1),
            Self::Int16 | Self::UInt16 => Some(2),
            Self::Int32 | Self::UInt32 | Self::Float32 => Some(4),
            Self::Int64 | Self::UInt64 | Self::Float64 => Some(8),
            Self::String => None,
        }
    }

    /// Returns true if the type is fixed width.
    #[must_use]
    pub fn is_fixed_width(&self) -> bool {
        self.size_in_bytes().is_some()
    }

    /// Returns true if the type can represent strings offsets (`int32` or `int64`).
    #[must_use]
    pub fn is_offsets_type(&self) -> bool {
        matches!(self, Self::Int32 | Self::Int64)
    }
}

/// A plain old data type that can be the element of a fixed width column.
pub trait ColumnElement: bytemuck::Pod + Send + Sync {
    /// The column data type of this element.
    const DATA_TYPE: DataType;
}

macro_rules! impl_column_element {
    ($($t:ty => $data_type:ident),* $(,)?) => {
        $(
            impl ColumnElement for $t {
                const DATA_TYPE: DataType = DataType::$data_type;
            }
        )*
    };
}

impl_column_element!(
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    u8 => UInt8,
    u16 => UInt16,
    u32 => UInt32,
    u64 => UInt64,
    f32 => Float32,
    f64 => Float64,
);
