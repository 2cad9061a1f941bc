//! Derive macro for `recsheet_export`.
//!
//! `#[derive(SheetRecord)]` generates a static field descriptor table and
//! field accessors for a struct with named fields.
//!
//! ```ignore
//! use recsheet_export::SheetRecord;
//!
//! #[derive(SheetRecord)]
//! struct Person {
//!     #[sheet(column = 0, header = "ID")]
//!     id: i64,
//!     #[sheet(column = 1, header = "Name")]
//!     name: String,
//!     #[sheet(skip)]
//!     cache: Vec<u8>,
//! }
//! ```
//!
//! An embedded struct marked `#[sheet(base)]` acts as the base record: its
//! fields are written before the outer struct's own.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod attrs;
mod derive;

#[proc_macro_derive(SheetRecord, attributes(sheet))]
pub fn sheet_record_derive(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    derive::sheet_record_derive_impl(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
