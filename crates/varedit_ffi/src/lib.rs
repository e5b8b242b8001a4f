//! FFI bridge crate between the Flutter variable editor and `varedit_core`.
//! Exported functions live in `api`.

pub mod api;
