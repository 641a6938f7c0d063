//! Tests for the chars allocator, the offset accessor and the view projector.

use std::sync::Arc;

use strand::column::{Bitmask, Column, DataType};
use strand::device::resource_adaptor::{LimitingResourceAdaptor, StatisticsResourceAdaptor};
use strand::device::{
    ALLOCATION_ALIGNMENT, AllocationError, DeviceMemoryResourceHandle, Stream,
    SystemMemoryResource,
};
use strand::strings::{
    StringView, StringsColumn, StringsColumnView, StringsError, create_chars_child_column,
    create_string_vector_from_column, get_offset_value,
};

fn system() -> DeviceMemoryResourceHandle {
    Arc::new(SystemMemoryResource)
}

#[test]
fn chars_allocator_exact_size() {
    let stream = Stream::new();
    for bytes in [0, 1, 10, 4096] {
        let buffer = create_chars_child_column(bytes, &stream, &system()).unwrap();
        assert_eq!(buffer.size(), bytes);
        assert_eq!(buffer.is_empty(), bytes == 0);
        assert_eq!(buffer.stream(), &stream);
    }
}

#[test]
fn chars_allocator_large_size() {
    let stream = Stream::new();
    let statistics = Arc::new(StatisticsResourceAdaptor::new(system()));
    let mr: DeviceMemoryResourceHandle = statistics.clone();
    let bytes = 1usize << 31;
    let buffer = create_chars_child_column(bytes, &stream, &mr).unwrap();
    assert_eq!(buffer.size(), 2_147_483_648);
    assert_eq!(buffer.as_ptr() as usize % ALLOCATION_ALIGNMENT, 0);
    assert_eq!(statistics.current_bytes(), 2_147_483_648);
    drop(buffer);
    assert_eq!(statistics.current_bytes(), 0);
}

#[test]
fn chars_allocator_unsatisfiable() {
    let stream = Stream::new();
    assert_eq!(
        create_chars_child_column(usize::MAX, &stream, &system()).unwrap_err(),
        AllocationError::InvalidSize { bytes: usize::MAX }
    );

    let bytes = usize::try_from(i64::MAX).unwrap();
    assert!(matches!(
        create_chars_child_column(bytes, &stream, &system()),
        Err(AllocationError::InvalidSize { .. } | AllocationError::OutOfMemory { .. })
    ));

    let limited: DeviceMemoryResourceHandle =
        Arc::new(LimitingResourceAdaptor::new(system(), 1024));
    let held = create_chars_child_column(1000, &stream, &limited).unwrap();
    assert_eq!(
        create_chars_child_column(100, &stream, &limited).unwrap_err(),
        AllocationError::LimitExceeded {
            bytes: 100,
            allocated: 1000,
            limit: 1024
        }
    );
    drop(held);
    assert!(create_chars_child_column(100, &stream, &limited).is_ok());
}

#[test]
fn chars_allocator_drop_returns_memory() {
    let stream = Stream::new();
    let statistics = Arc::new(StatisticsResourceAdaptor::new(system()));
    let mr: DeviceMemoryResourceHandle = statistics.clone();
    let buffer = create_chars_child_column(777, &stream, &mr).unwrap();
    assert_eq!(statistics.current_bytes(), 777);
    assert_eq!(statistics.allocations(), 1);

    let moved = buffer;
    assert_eq!(statistics.allocations(), 1);
    drop(moved);
    assert_eq!(statistics.current_bytes(), 0);
    assert_eq!(statistics.deallocations(), 1);
}

#[test]
fn offset_accessor_both_widths() {
    let stream = Stream::new();
    let narrow = Column::from_host(&[0i32, 3, 7, 10], &stream, &system()).unwrap();
    let wide = Column::from_host(&[0i64, 3, 7, 10], &stream, &system()).unwrap();
    assert_eq!(get_offset_value(&narrow.view(), 2, &stream).unwrap(), 7);
    assert_eq!(get_offset_value(&wide.view(), 2, &stream).unwrap(), 7);
    for index in 0..4 {
        assert_eq!(
            get_offset_value(&narrow.view(), index, &stream),
            get_offset_value(&wide.view(), index, &stream)
        );
    }
}

#[test]
fn offset_accessor_invalid_type() {
    let stream = Stream::new();
    let floats = Column::from_host(&[0f32, 3.0, 7.0], &stream, &system()).unwrap();
    let err = get_offset_value(&floats.view(), 0, &stream).unwrap_err();
    assert_eq!(err, StringsError::InvalidOffsetsType(DataType::Float32));
    assert_eq!(err.to_string(), "offsets must be int32 or int64, found float32");

    let bytes = Column::from_host(&[0u8, 3], &stream, &system()).unwrap();
    assert_eq!(
        get_offset_value(&bytes.view(), 0, &stream).unwrap_err(),
        StringsError::InvalidOffsetsType(DataType::UInt8)
    );
}

#[test]
fn offset_accessor_out_of_bounds() {
    let stream = Stream::new();
    let offsets = Column::from_host(&[0i32, 3], &stream, &system()).unwrap();
    assert_eq!(
        get_offset_value(&offsets.view(), 2, &stream).unwrap_err(),
        StringsError::OffsetIndexOutOfBounds { index: 2, size: 2 }
    );
}

#[test]
fn offset_accessor_synchronizes() {
    let stream = Stream::new();
    let offsets = Column::from_host(&[0i64, 3], &stream, &system()).unwrap();
    let before = stream.synchronize_count();
    get_offset_value(&offsets.view(), 1, &stream).unwrap();
    assert_eq!(stream.synchronize_count(), before + 1);
}

#[test]
fn offset_accessor_does_not_clamp() {
    let stream = Stream::new();
    let large = i64::from(i32::MAX) + 1000;
    let offsets = Column::from_host(&[0i64, large], &stream, &system()).unwrap();
    assert_eq!(get_offset_value(&offsets.view(), 1, &stream).unwrap(), 2_147_484_647);

    let negative = Column::from_host(&[-1i32], &stream, &system()).unwrap();
    assert_eq!(get_offset_value(&negative.view(), 0, &stream).unwrap(), -1);
}

#[test]
fn projector_views_rows() {
    let stream = Stream::new();
    let offsets = Column::from_host(&[0i32, 3, 6, 10], &stream, &system()).unwrap();
    let chars = b"catdogbird";
    let view = StringsColumnView::new(offsets.view(), chars, None).unwrap();
    let views = create_string_vector_from_column(&view, &stream, &system()).unwrap();
    assert_eq!(views.len(), 3);

    let raw = views.to_host(&stream);
    let base = chars.as_ptr();
    assert_eq!((raw[0].data(), raw[0].size_bytes()), (base, 3));
    assert_eq!((raw[1].data(), raw[1].size_bytes()), (base.wrapping_add(3), 3));
    assert_eq!((raw[2].data(), raw[2].size_bytes()), (base.wrapping_add(6), 4));
    assert_eq!(
        views.iter().collect::<Vec<_>>(),
        vec![Some(&b"cat"[..]), Some(&b"dog"[..]), Some(&b"bird"[..])]
    );
}

#[test]
fn projector_null_rows() {
    let stream = Stream::new();
    let column =
        StringsColumn::from_strs([Some("cat"), None, Some("bird")], &stream, &system()).unwrap();
    let views = create_string_vector_from_column(&column.view(), &stream, &system()).unwrap();
    let raw = views.as_slice();
    assert_eq!(raw.len(), 3);
    assert_eq!(raw[1], StringView::null());
    assert!(raw[1].data().is_null());
    assert_eq!(raw[1].size_bytes(), 0);
    assert_eq!(views.get_str(0), Some("cat"));
    assert_eq!(views.get_str(1), None);
    assert_eq!(views.get_str(2), Some("bird"));
}

#[test]
fn projector_null_row_with_bytes() {
    let stream = Stream::new();
    let offsets = Column::from_host(&[0i32, 3, 6, 10], &stream, &system()).unwrap();
    let mask = Bitmask::from_bools(&[true, false, true], &stream, &system()).unwrap();
    let chars = b"catdogbird";
    let view = StringsColumnView::new(offsets.view(), chars, Some(&mask)).unwrap();
    let views = create_string_vector_from_column(&view, &stream, &system()).unwrap();

    let raw = views.to_host(&stream);
    let base = chars.as_ptr();
    assert_eq!(raw.len(), 3);
    assert_eq!((raw[0].data(), raw[0].size_bytes()), (base, 3));
    assert_eq!(raw[1], StringView::null());
    assert!(raw[1].data().is_null());
    assert_eq!(raw[1].size_bytes(), 0);
    assert_eq!((raw[2].data(), raw[2].size_bytes()), (base.wrapping_add(6), 4));
    assert_eq!(views.get_str(0), Some("cat"));
    assert_eq!(views.get_str(1), None);
    assert_eq!(views.get_str(2), Some("bird"));
}

#[test]
fn projector_is_idempotent() {
    let stream = Stream::new();
    let column = StringsColumn::from_strs(
        [Some("alpha"), None, Some(""), Some("omega")],
        &stream,
        &system(),
    )
    .unwrap();
    let first = create_string_vector_from_column(&column.view(), &stream, &system()).unwrap();
    let second = create_string_vector_from_column(&column.view(), &stream, &system()).unwrap();
    assert_eq!(first.as_slice(), second.as_slice());
}

#[test]
fn projector_wide_offsets() {
    let stream = Stream::new();
    let offsets = Column::from_host(&[0i64, 3, 6, 10], &stream, &system()).unwrap();
    let chars = b"catdogbird";
    let view = StringsColumnView::new(offsets.view(), chars, None).unwrap();
    let views = create_string_vector_from_column(&view, &stream, &system()).unwrap();
    assert_eq!(views.get(2), Some(&b"bird"[..]));
}

#[test]
fn projector_sliced_view() {
    let stream = Stream::new();
    let column = StringsColumn::from_strs(
        [Some("cat"), Some("dog"), None, Some("bird"), Some("fish")],
        &stream,
        &system(),
    )
    .unwrap();
    let sliced = column.slice(1, 4).unwrap();
    let views = create_string_vector_from_column(&sliced, &stream, &system()).unwrap();
    assert_eq!(views.len(), 3);
    assert_eq!(views.get_str(0), Some("dog"));
    assert_eq!(views.get_str(1), None);
    assert_eq!(views.get_str(2), Some("bird"));
    assert_eq!(
        views.as_slice()[0].data(),
        column.chars().as_ptr().wrapping_add(3)
    );
}

#[test]
fn projector_allocates_once() {
    let stream = Stream::new();
    let column = StringsColumn::from_strs(
        (0..1000).map(|i| if i % 7 == 0 { None } else { Some("row") }),
        &stream,
        &system(),
    )
    .unwrap();
    let statistics = Arc::new(StatisticsResourceAdaptor::new(system()));
    let mr: DeviceMemoryResourceHandle = statistics.clone();
    let views = create_string_vector_from_column(&column.view(), &stream, &mr).unwrap();
    assert_eq!(statistics.allocations(), 1);
    assert_eq!(
        statistics.current_bytes(),
        1000 * std::mem::size_of::<StringView>()
    );
    assert_eq!(views.iter().filter(Option::is_none).count(), 143);
    drop(views);
    assert_eq!(statistics.current_bytes(), 0);
}

#[test]
fn projector_allocation_failure() {
    let stream = Stream::new();
    let column = StringsColumn::from_strs([Some("a"), Some("b")], &stream, &system()).unwrap();
    let limited: DeviceMemoryResourceHandle =
        Arc::new(LimitingResourceAdaptor::new(system(), 8));
    assert!(matches!(
        create_string_vector_from_column(&column.view(), &stream, &limited),
        Err(StringsError::Allocation(AllocationError::LimitExceeded { .. }))
    ));
}
