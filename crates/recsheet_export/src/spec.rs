//! Shared export models, options and top-level error types.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;

use crate::classify::classify_type_name;
use crate::record::EnumNumber;

////////////////////////////////////////////////////////////////////////////////
// #region OutputFormat

/// Physical workbook encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum EnumOutputFormat {
    /// Legacy binary workbook (BIFF8 inside an OLE2 compound file, `.xls`).
    Xls,
    /// Zip-based tabular container (Office Open XML, `.xlsx`).
    Xlsx,
}

impl EnumOutputFormat {
    /// Conventional file extension without the leading dot.
    pub fn file_extension(&self) -> &'static str {
        match self {
            Self::Xls => "xls",
            Self::Xlsx => "xlsx",
        }
    }

    /// MIME type for serving the encoded bytes.
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Xls => "application/vnd.ms-excel",
            Self::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        }
    }
}

impl FromStr for EnumOutputFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim().to_ascii_lowercase();
        match value.as_str() {
            "xls" | "hssf" => Ok(Self::Xls),
            "xlsx" | "xssf" => Ok(Self::Xlsx),
            _ => Err(ExportError::UnknownOutputFormat(s.to_string())),
        }
    }
}

impl TryFrom<String> for EnumOutputFormat {
    type Error = ExportError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for EnumOutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_extension())
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region RecordDescriptors

/// Classification bucket of a declared field type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnumFieldKind {
    /// String-like field.
    Text,
    /// Integer or floating point field.
    Numeric,
    /// Boolean field.
    Boolean,
    /// List/set/map container, written as one encoded text value.
    Compound,
    /// Anything else; a nested record candidate.
    Other,
}

/// Column metadata declared on a field (`#[sheet(column = .., header = ..)]`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecColumnMeta {
    /// Zero-based target column.
    pub column_index: usize,
    /// Header cell text.
    pub header: &'static str,
}

/// Static description of one declared field.
#[derive(Debug, Clone, Copy)]
pub struct SpecFieldDescriptor {
    /// Field name as declared on the struct.
    pub name: &'static str,
    /// Declared static type, as written in source.
    pub type_name: &'static str,
    /// Annotation-mode column metadata.
    pub column: Option<SpecColumnMeta>,
    /// Descriptor of the nested record type, if the field holds one.
    pub nested: fn() -> Option<&'static SpecRecordType>,
}

impl SpecFieldDescriptor {
    /// Classification of the declared type.
    pub fn kind(&self) -> EnumFieldKind {
        classify_type_name(self.type_name)
    }

    /// Nested record type when the field is classified [`EnumFieldKind::Other`].
    pub fn nested_type(&self) -> Option<&'static SpecRecordType> {
        match self.kind() {
            EnumFieldKind::Other => (self.nested)(),
            _ => None,
        }
    }
}

/// Static description of one record type, generated by `#[derive(SheetRecord)]`.
#[derive(Debug)]
pub struct SpecRecordType {
    /// Fully qualified type path; identity for cycle checks.
    pub type_path: &'static str,
    /// Bare type name.
    pub type_name: &'static str,
    /// Declared fields in declaration order (the base field excluded).
    pub fields: &'static [SpecFieldDescriptor],
    /// Embedded base record type (`#[sheet(base)]`).
    pub base: Option<fn() -> &'static SpecRecordType>,
}

impl SpecRecordType {
    /// Resolve the base record type, if any.
    pub fn base_type(&self) -> Option<&'static SpecRecordType> {
        self.base.map(|f| f())
    }

    /// Identity comparison by type path.
    pub fn is_same(&self, other: &SpecRecordType) -> bool {
        self.type_path == other.type_path
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ColumnSpecification

/// Custom numeric formatter attached to an explicit column.
pub type ValueFormatter = Arc<dyn Fn(&EnumNumber) -> String + Send + Sync>;

/// Caller-supplied column for explicit mode.
///
/// Duplicate `column_index` values across a column list are not rejected;
/// the later column overwrites the earlier one's cells.
#[derive(Clone)]
pub struct SpecColumn {
    column_index: usize,
    source_field: String,
    header: String,
    formatter: Option<ValueFormatter>,
}

impl SpecColumn {
    /// Validate and build one column.
    pub fn new(
        column_index: i64,
        source_field: impl Into<String>,
        header: impl Into<String>,
    ) -> Result<Self, ExportError> {
        let n_idx_col = usize::try_from(column_index)
            .map_err(|_| ExportError::InvalidColumnIndex(column_index))?;
        let source_field = source_field.into();
        if source_field.is_empty() {
            return Err(ExportError::InvalidSourceField {
                column_index: n_idx_col,
            });
        }
        Ok(Self {
            column_index: n_idx_col,
            source_field,
            header: header.into(),
            formatter: None,
        })
    }

    /// Attach a formatter applied to numeric values of this column.
    pub fn with_formatter<F>(mut self, formatter: F) -> Self
    where
        F: Fn(&EnumNumber) -> String + Send + Sync + 'static,
    {
        self.formatter = Some(Arc::new(formatter));
        self
    }

    pub fn column_index(&self) -> usize {
        self.column_index
    }

    pub fn source_field(&self) -> &str {
        &self.source_field
    }

    pub fn header(&self) -> &str {
        &self.header
    }

    pub fn formatter(&self) -> Option<&ValueFormatter> {
        self.formatter.as_ref()
    }
}

impl fmt::Debug for SpecColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpecColumn")
            .field("column_index", &self.column_index)
            .field("source_field", &self.source_field)
            .field("header", &self.header)
            .field("formatter", &self.formatter.is_some())
            .finish()
    }
}

/// One header cell of the annotation-mode plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecHeaderCell {
    /// Header text.
    pub header: String,
    /// Target column.
    pub column_index: usize,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SheetModel

/// Normalized cell value handed to table writers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnumCellValue {
    /// Cell exists but holds nothing.
    None,
    /// Text value.
    String(String),
    /// Boolean value.
    Boolean(bool),
}

impl EnumCellValue {
    /// Display text of the cell.
    pub fn to_text(&self) -> String {
        match self {
            Self::None => String::new(),
            Self::String(s) => s.clone(),
            Self::Boolean(b) => b.to_string(),
        }
    }
}

/// Sparse row keyed by column index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpecSheetRow {
    /// Cells by column index.
    pub cells: BTreeMap<usize, EnumCellValue>,
}

impl SpecSheetRow {
    /// Create or overwrite the cell at `column_index`.
    pub fn set_cell(&mut self, column_index: usize, value: EnumCellValue) {
        self.cells.insert(column_index, value);
    }

    pub fn cell(&self, column_index: usize) -> Option<&EnumCellValue> {
        self.cells.get(&column_index)
    }

    /// One past the highest populated column.
    pub fn width(&self) -> usize {
        self.cells.keys().next_back().map_or(0, |n_idx| n_idx + 1)
    }
}

/// In-memory sheet: row 0 is the header, rows `1..` follow input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpecSheet {
    /// Sheet (tab) name.
    pub sheet_name: String,
    /// Rows in output order.
    pub rows: Vec<SpecSheetRow>,
}

impl SpecSheet {
    pub fn new(sheet_name: impl Into<String>) -> Self {
        Self {
            sheet_name: sheet_name.into(),
            rows: Vec::new(),
        }
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.rows.iter().map(SpecSheetRow::width).max().unwrap_or(0)
    }

    pub fn cell(&self, row_index: usize, column_index: usize) -> Option<&EnumCellValue> {
        self.rows.get(row_index)?.cell(column_index)
    }

    /// Dense text view, blank for missing cells.
    pub fn to_text_grid(&self) -> Vec<Vec<String>> {
        let n_width = self.width();
        self.rows
            .iter()
            .map(|row| {
                (0..n_width)
                    .map(|n_idx_col| row.cell(n_idx_col).map(EnumCellValue::to_text).unwrap_or_default())
                    .collect()
            })
            .collect()
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ExportOptions

/// Value conversion policy.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SpecValuePolicy {
    /// Text written for an absent numeric field.
    pub nan_str: String,
}

impl Default for SpecValuePolicy {
    fn default() -> Self {
        crate::conf::derive_default_value_policy()
    }
}

/// Options for one configured exporter.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SpecExportOptions {
    /// Physical encoding.
    pub output_format: EnumOutputFormat,
    /// Name of the single output sheet.
    pub sheet_name: String,
    /// Value conversion policy.
    pub value_policy: SpecValuePolicy,
}

impl Default for SpecExportOptions {
    fn default() -> Self {
        crate::conf::derive_default_export_options()
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region OutcomeAndErrors

/// Result of the encoding stage.
///
/// Encoding failures are logged and reported here instead of aborting the
/// call, so callers must check which variant they received.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnumEncodeOutcome {
    /// Encoded workbook bytes.
    Encoded(Vec<u8>),
    /// Encoding failed; no bytes were produced.
    Failed {
        /// User-facing failure text.
        reason: String,
    },
}

impl EnumEncodeOutcome {
    pub fn is_encoded(&self) -> bool {
        matches!(self, Self::Encoded(_))
    }

    /// Borrow the bytes when encoding succeeded.
    pub fn bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Encoded(v) => Some(v),
            Self::Failed { .. } => None,
        }
    }

    pub fn into_result(self) -> Result<Vec<u8>, String> {
        match self {
            Self::Encoded(v) => Ok(v),
            Self::Failed { reason } => Err(reason),
        }
    }
}

/// Setup-stage failures; nothing is written when one of these is returned.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Output format name not recognized.
    #[error("unknown excel type: {0:?}")]
    UnknownOutputFormat(String),
    /// Annotation mode found no declared fields for the record type.
    #[error("no classes or fields found for record type `{0}`")]
    EmptyTypeGraph(String),
    /// Negative column index in an explicit column.
    #[error("column index is invalid: {0}")]
    InvalidColumnIndex(i64),
    /// Empty source field name in an explicit column.
    #[error("source field is invalid for column {column_index}")]
    InvalidSourceField {
        /// Column the invalid spec targeted.
        column_index: usize,
    },
    /// Two explicit columns read the same source field.
    #[error("duplicate source field in column list: {0:?}")]
    DuplicateSourceField(String),
}

/// Failures raised by a [`crate::writer::TableWriter`].
#[derive(Debug, Error)]
pub enum EncodeError {
    /// Zip-based writer failure.
    #[error("xlsx write error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
    /// Byte sink failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Sheet does not fit the target format.
    #[error("{format} limit exceeded: {axis} {value} > {limit}")]
    LimitExceeded {
        /// Target format.
        format: EnumOutputFormat,
        /// `"rows"` or `"columns"`.
        axis: &'static str,
        /// Offending count.
        value: usize,
        /// Maximum allowed count.
        limit: usize,
    },
    /// Value cannot be represented in the target format.
    #[error("invalid data: {0}")]
    InvalidData(String),
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::{EnumOutputFormat, ExportError, SpecColumn, SpecExportOptions, SpecSheet};
    use crate::spec::{EnumCellValue, SpecSheetRow};

    #[test]
    fn output_format_parses_known_names() {
        assert_eq!("xls".parse::<EnumOutputFormat>().unwrap(), EnumOutputFormat::Xls);
        assert_eq!(" XLSX ".parse::<EnumOutputFormat>().unwrap(), EnumOutputFormat::Xlsx);
        assert_eq!("hssf".parse::<EnumOutputFormat>().unwrap(), EnumOutputFormat::Xls);
        assert_eq!("xssf".parse::<EnumOutputFormat>().unwrap(), EnumOutputFormat::Xlsx);
        assert_eq!(EnumOutputFormat::Xls.to_string(), "xls");
        assert_eq!(EnumOutputFormat::Xls.content_type(), "application/vnd.ms-excel");
    }

    #[test]
    fn output_format_rejects_unknown_name() {
        let err = "ods".parse::<EnumOutputFormat>().expect_err("must fail");
        assert!(matches!(err, ExportError::UnknownOutputFormat(ref s) if s == "ods"));
        assert!("".parse::<EnumOutputFormat>().is_err());
    }

    #[test]
    fn column_rejects_negative_index() {
        let err = SpecColumn::new(-1, "id", "ID").expect_err("negative index");
        assert!(matches!(err, ExportError::InvalidColumnIndex(-1)));
    }

    #[test]
    fn column_rejects_empty_source_field() {
        let err = SpecColumn::new(3, "", "ID").expect_err("empty field");
        assert!(matches!(err, ExportError::InvalidSourceField { column_index: 3 }));
    }

    #[test]
    fn column_debug_hides_formatter_body() {
        let column = SpecColumn::new(0, "amount", "Amount")
            .unwrap()
            .with_formatter(|n| format!("{n}!"));
        let txt = format!("{column:?}");
        assert!(txt.contains("formatter: true"));
    }

    #[test]
    fn export_options_deserialize_with_defaults() {
        let options: SpecExportOptions =
            serde_json::from_str(r#"{"output_format": "xls"}"#).expect("deserialize");
        assert_eq!(options.output_format, EnumOutputFormat::Xls);
        assert_eq!(options.sheet_name, "Sheet0");
        assert_eq!(options.value_policy.nan_str, "NAN");

        let err = serde_json::from_str::<SpecExportOptions>(r#"{"output_format": "csv"}"#);
        assert!(err.is_err());
    }

    #[test]
    fn sheet_text_grid_fills_gaps() {
        let mut sheet = SpecSheet::new("S");
        let mut row = SpecSheetRow::default();
        row.set_cell(2, EnumCellValue::String("c".to_string()));
        row.set_cell(0, EnumCellValue::Boolean(true));
        sheet.rows.push(row);
        sheet.rows.push(SpecSheetRow::default());

        assert_eq!(sheet.width(), 3);
        assert_eq!(
            sheet.to_text_grid(),
            vec![
                vec!["true".to_string(), String::new(), "c".to_string()],
                vec![String::new(), String::new(), String::new()],
            ]
        );
    }
}
