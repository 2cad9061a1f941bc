//! Stateless helper utilities used by the table writers.

use crate::conf::{
    C_SHEET_NAME_DEFAULT, N_LEN_EXCEL_SHEET_NAME_MAX, N_NCOLS_XLS_MAX, N_NCOLS_XLSX_MAX,
    N_NROWS_XLS_MAX, N_NROWS_XLSX_MAX, TUP_EXCEL_ILLEGAL,
};
use crate::spec::{EncodeError, EnumOutputFormat, SpecSheet};

////////////////////////////////////////////////////////////////////////////////
// #region SheetNormalization

/// Replace invalid chars and trim to valid Excel sheet name.
pub fn sanitize_sheet_name(name: &str, replace_to: &str) -> String {
    let mut c_name = name.to_string();
    for c_illegal in TUP_EXCEL_ILLEGAL {
        c_name = c_name.replace(c_illegal, replace_to);
    }
    // Excel rejects names wrapped in apostrophes.
    c_name = c_name.trim().trim_matches('\'').trim().to_string();
    if c_name.is_empty() {
        c_name = C_SHEET_NAME_DEFAULT.to_string();
    }

    c_name.chars().take(N_LEN_EXCEL_SHEET_NAME_MAX).collect()
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Limits

/// `(max_rows, max_cols)` of one worksheet in `format`.
pub fn derive_format_limits(format: EnumOutputFormat) -> (usize, usize) {
    match format {
        EnumOutputFormat::Xls => (N_NROWS_XLS_MAX, N_NCOLS_XLS_MAX),
        EnumOutputFormat::Xlsx => (N_NROWS_XLSX_MAX, N_NCOLS_XLSX_MAX),
    }
}

/// Check that `sheet` fits one worksheet of `format`.
pub fn validate_sheet_limits(sheet: &SpecSheet, format: EnumOutputFormat) -> Result<(), EncodeError> {
    let (n_rows_max, n_cols_max) = derive_format_limits(format);
    let n_rows = sheet.height();
    if n_rows > n_rows_max {
        return Err(EncodeError::LimitExceeded {
            format,
            axis: "rows",
            value: n_rows,
            limit: n_rows_max,
        });
    }
    let n_cols = sheet.width();
    if n_cols > n_cols_max {
        return Err(EncodeError::LimitExceeded {
            format,
            axis: "columns",
            value: n_cols,
            limit: n_cols_max,
        });
    }
    Ok(())
}

pub fn cast_row_num(value: usize) -> Result<u32, EncodeError> {
    u32::try_from(value).map_err(|_| EncodeError::InvalidData(format!("row index overflow: {value}")))
}

pub fn cast_col_num(value: usize) -> Result<u16, EncodeError> {
    u16::try_from(value)
        .map_err(|_| EncodeError::InvalidData(format!("column index overflow: {value}")))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
