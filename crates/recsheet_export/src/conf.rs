//! Export constants and default preset factories.

use crate::spec::{EnumOutputFormat, SpecExportOptions, SpecValuePolicy};

/// XLSX worksheet maximum row count.
pub const N_NROWS_XLSX_MAX: usize = 1_048_576;
/// XLSX worksheet maximum column count.
pub const N_NCOLS_XLSX_MAX: usize = 16_384;
/// BIFF8 (`.xls`) worksheet maximum row count.
pub const N_NROWS_XLS_MAX: usize = 65_536;
/// BIFF8 (`.xls`) worksheet maximum column count.
pub const N_NCOLS_XLS_MAX: usize = 256;
/// Excel sheet name maximum length.
pub const N_LEN_EXCEL_SHEET_NAME_MAX: usize = 31;
/// Excel cell text limit, in UTF-16 code units.
pub const N_LEN_EXCEL_CELL_TEXT_MAX: usize = 32_767;
/// Characters not allowed in sheet names.
pub const TUP_EXCEL_ILLEGAL: [&str; 7] = ["*", ":", "?", "/", "\\", "[", "]"];

/// Text written for an absent numeric field.
pub const C_NUMERIC_ABSENT_TEXT: &str = "NAN";
/// Sheet name used when the caller does not choose one.
pub const C_SHEET_NAME_DEFAULT: &str = "Sheet0";

/// Build the default value policy.
pub fn derive_default_value_policy() -> SpecValuePolicy {
    SpecValuePolicy {
        nan_str: C_NUMERIC_ABSENT_TEXT.to_string(),
    }
}

/// Build default export options (zip-based output, single default sheet).
pub fn derive_default_export_options() -> SpecExportOptions {
    SpecExportOptions {
        output_format: EnumOutputFormat::Xlsx,
        sheet_name: C_SHEET_NAME_DEFAULT.to_string(),
        value_policy: derive_default_value_policy(),
    }
}
