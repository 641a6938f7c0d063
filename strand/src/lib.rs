//! `strand` is a Rust library for the offset representation of device resident strings columns.
//!
//! A strings column is a chars buffer holding the bytes of every row back to back, an offsets column delimiting the rows, and an optional validity mask.
//! This crate provides the primitives that every strings algorithm builds on:
//! - the offset width policy, deciding between `int32` and `int64` offsets ([`config`], [`strings::offsets_data_type_for`]),
//! - allocation of the children of a column under construction ([`strings::make_offsets_child_column`], [`strings::create_chars_child_column`]),
//! - width polymorphic offset reads ([`strings::get_offset_value`], [`strings::OffsetsView`]), and
//! - projection of a column into per-row [`StringView`](strings::StringView)s ([`strings::create_string_vector_from_column`]).
//!
//! Device memory and execution contexts are provided by the [`device`] module (a re-export of `strand_device`).
//!
//! ## Example
//! ```rust
//! # use strand::device::{Stream, current_device_resource};
//! # use strand::strings::{StringsColumn, create_string_vector_from_column, get_offset_value};
//! let stream = Stream::new();
//! let mr = current_device_resource();
//! let column = StringsColumn::from_strs([Some("cat"), None, Some("bird")], &stream, &mr)?;
//!
//! assert_eq!(get_offset_value(&column.offsets().view(), 3, &stream)?, 7);
//!
//! let views = create_string_vector_from_column(&column.view(), &stream, &mr)?;
//! assert_eq!(views.get_str(0), Some("cat"));
//! assert_eq!(views.get_str(1), None);
//! assert_eq!(views.get_str(2), Some("bird"));
//! # Ok::<_, Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Configuration
//! The offset width policy reads the environment once, on first use. See [`config::Config`].
//!
//! ## Licence
//! `strand` is licensed under either of
//!  - the Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> or
//!  - the MIT license <http://opensource.org/licenses/MIT>, at your option.
//!
//! Unless you explicitly state otherwise, any contribution intentionally submitted for inclusion in the work by you, as defined in the Apache-2.0 license, shall be dual licensed as above, without any additional terms or conditions.

pub mod column;
pub mod config;
pub mod strings;

pub use strand_device as device;
