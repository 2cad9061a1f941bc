//! Table writers that encode an in-memory sheet into workbook bytes.

use rust_xlsxwriter::{Workbook, Worksheet};

use crate::biff::derive_workbook_stream;
use crate::cfb::derive_compound_file;
use crate::spec::{EncodeError, EnumCellValue, EnumOutputFormat, SpecSheet};
use crate::util::{cast_col_num, cast_row_num, sanitize_sheet_name, validate_sheet_limits};

/// Physical encoder of one populated sheet.
pub trait TableWriter {
    /// Encoding produced by this writer.
    fn output_format(&self) -> EnumOutputFormat;

    /// Encode `sheet` as a complete single-sheet workbook.
    fn write_table(&self, sheet: &SpecSheet) -> Result<Vec<u8>, EncodeError>;
}

/// Table writer for `format`.
pub fn derive_table_writer(format: EnumOutputFormat) -> Box<dyn TableWriter> {
    match format {
        EnumOutputFormat::Xls => Box::new(XlsTableWriter),
        EnumOutputFormat::Xlsx => Box::new(XlsxTableWriter),
    }
}

////////////////////////////////////////////////////////////////////////////////
// #region Xlsx

/// Zip-based workbook writer backed by `rust_xlsxwriter`.
#[derive(Debug, Clone, Copy, Default)]
pub struct XlsxTableWriter;

impl TableWriter for XlsxTableWriter {
    fn output_format(&self) -> EnumOutputFormat {
        EnumOutputFormat::Xlsx
    }

    fn write_table(&self, sheet: &SpecSheet) -> Result<Vec<u8>, EncodeError> {
        validate_sheet_limits(sheet, EnumOutputFormat::Xlsx)?;

        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(sanitize_sheet_name(&sheet.sheet_name, "_"))?;

        for (n_idx_row, row) in sheet.rows.iter().enumerate() {
            for (&n_idx_col, value) in &row.cells {
                write_cell(worksheet, n_idx_row, n_idx_col, value)?;
            }
        }

        Ok(workbook.save_to_buffer()?)
    }
}

fn write_cell(
    worksheet: &mut Worksheet,
    row_idx: usize,
    col_idx: usize,
    value: &EnumCellValue,
) -> Result<(), EncodeError> {
    let n_row = cast_row_num(row_idx)?;
    let n_col = cast_col_num(col_idx)?;
    match value {
        // Unformatted blank cells carry no data in the zip container.
        EnumCellValue::None => {}
        EnumCellValue::String(val) => {
            worksheet.write_string(n_row, n_col, val)?;
        }
        EnumCellValue::Boolean(val) => {
            worksheet.write_boolean(n_row, n_col, *val)?;
        }
    }
    Ok(())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Xls

/// Legacy binary workbook writer: a BIFF8 `Workbook` stream inside an OLE2
/// compound file.
#[derive(Debug, Clone, Copy, Default)]
pub struct XlsTableWriter;

impl TableWriter for XlsTableWriter {
    fn output_format(&self) -> EnumOutputFormat {
        EnumOutputFormat::Xls
    }

    fn write_table(&self, sheet: &SpecSheet) -> Result<Vec<u8>, EncodeError> {
        validate_sheet_limits(sheet, EnumOutputFormat::Xls)?;

        let sheet_name = sanitize_sheet_name(&sheet.sheet_name, "_");
        let stream = derive_workbook_stream(sheet, &sheet_name)?;
        Ok(derive_compound_file(&[("Workbook", &stream)]))
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
