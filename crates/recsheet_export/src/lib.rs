//! `recsheet_export` v1:
//! Record-to-spreadsheet export engine.
//!
//! Module layout:
//! - `conf`     : constants and default presets
//! - `spec`     : specs/models/options and error types
//! - `record`   : record/field access traits (`#[derive(SheetRecord)]`)
//! - `classify` : declared-type classification
//! - `graph`    : reachable record-type graph
//! - `plan`     : annotation and explicit column plans
//! - `coerce`   : field value to cell value conversion
//! - `row`      : per-record row population
//! - `export`   : entry points
//! - `util`     : pure helper functions
//! - `writer`   : table writers (`xlsx` via `rust_xlsxwriter`, legacy `xls`)
//! - `biff`, `cfb` : legacy binary workbook encoding

extern crate self as recsheet_export;

mod biff;
mod cfb;
pub mod classify;
pub mod coerce;
pub mod conf;
pub mod export;
pub mod graph;
pub mod plan;
pub mod record;
pub mod row;
pub mod spec;
pub mod util;
pub mod writer;

pub use recsheet_macros::SheetRecord;

pub use classify::classify_type_name;
pub use coerce::{JsonTextEncoder, TextEncoder};
pub use conf::{C_NUMERIC_ABSENT_TEXT, N_NCOLS_XLS_MAX, N_NROWS_XLS_MAX};
pub use export::{
    SheetExporter, build_sheet_by_annotation, build_sheet_by_columns, export_excel,
    export_excel_with_columns,
};
pub use record::{EnumFieldValue, EnumNumber, SheetField, SheetRecord};
pub use spec::{
    EncodeError, EnumCellValue, EnumEncodeOutcome, EnumFieldKind, EnumOutputFormat, ExportError,
    SpecColumn, SpecColumnMeta, SpecExportOptions, SpecFieldDescriptor, SpecRecordType, SpecSheet,
    SpecSheetRow, SpecValuePolicy,
};
pub use writer::{TableWriter, XlsTableWriter, XlsxTableWriter};
