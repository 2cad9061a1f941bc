//! Export entry points.

use crate::coerce::{JsonTextEncoder, TextEncoder};
use crate::graph::resolve_type_graph;
use crate::plan::{EnumColumnPlan, plan_columns_explicit, plan_headers_by_annotation};
use crate::record::SheetRecord;
use crate::row::{SpecRowContext, write_row};
use crate::spec::{
    EnumEncodeOutcome, EnumOutputFormat, ExportError, SpecColumn, SpecExportOptions, SpecSheet,
    SpecSheetRow,
};
use crate::writer::{TableWriter, derive_table_writer};

/// Configured exporter: output format, sheet name, value policy and
/// compound text encoder.
pub struct SheetExporter {
    options: SpecExportOptions,
    encoder: Box<dyn TextEncoder + Send + Sync>,
}

impl Default for SheetExporter {
    fn default() -> Self {
        Self::new(SpecExportOptions::default())
    }
}

impl SheetExporter {
    pub fn new(options: SpecExportOptions) -> Self {
        Self {
            options,
            encoder: Box::new(JsonTextEncoder),
        }
    }

    /// Replace the compound value encoder.
    pub fn with_text_encoder<E>(mut self, encoder: E) -> Self
    where
        E: TextEncoder + Send + Sync + 'static,
    {
        self.encoder = Box::new(encoder);
        self
    }

    pub fn options(&self) -> &SpecExportOptions {
        &self.options
    }

    /// Populate a sheet from field metadata on `T` and its reachable types.
    pub fn build_sheet_by_annotation<T: SheetRecord>(
        &self,
        records: &[T],
    ) -> Result<SpecSheet, ExportError> {
        let graph = resolve_type_graph(T::sheet_type());
        let plan = plan_headers_by_annotation(&graph)?;
        Ok(self.build_sheet(records, &plan))
    }

    /// Populate a sheet from a caller-supplied column list.
    pub fn build_sheet_by_columns<T: SheetRecord>(
        &self,
        records: &[T],
        columns: &[SpecColumn],
    ) -> Result<SpecSheet, ExportError> {
        let plan = plan_columns_explicit(columns)?;
        Ok(self.build_sheet(records, &plan))
    }

    /// Annotation-mode export to workbook bytes.
    pub fn export<T: SheetRecord>(&self, records: &[T]) -> Result<EnumEncodeOutcome, ExportError> {
        let sheet = self.build_sheet_by_annotation(records)?;
        Ok(self.encode(&sheet))
    }

    /// Explicit-mode export to workbook bytes.
    pub fn export_with_columns<T: SheetRecord>(
        &self,
        records: &[T],
        columns: &[SpecColumn],
    ) -> Result<EnumEncodeOutcome, ExportError> {
        let sheet = self.build_sheet_by_columns(records, columns)?;
        Ok(self.encode(&sheet))
    }

    /// Encode a populated sheet. Failures are logged and reported in the
    /// outcome.
    pub fn encode(&self, sheet: &SpecSheet) -> EnumEncodeOutcome {
        let writer = derive_table_writer(self.options.output_format);
        encode_with(writer.as_ref(), sheet)
    }

    fn build_sheet<T: SheetRecord>(&self, records: &[T], plan: &EnumColumnPlan) -> SpecSheet {
        let mut sheet = SpecSheet::new(self.options.sheet_name.clone());
        let mut header = SpecSheetRow::default();
        plan.write_header(&mut header);
        sheet.rows.push(header);

        let ctx = SpecRowContext {
            plan,
            encoder: self.encoder.as_ref(),
            policy: &self.options.value_policy,
        };
        for record in records {
            let mut row = SpecSheetRow::default();
            write_row(&mut row, record, &ctx);
            sheet.rows.push(row);
        }

        tracing::debug!(
            n_records = records.len(),
            n_cols = sheet.width(),
            if_annotation = plan.is_annotation(),
            "sheet built"
        );
        sheet
    }
}

/// Encode `sheet` with `writer`, downgrading failure to a reported outcome.
pub fn encode_with(writer: &dyn TableWriter, sheet: &SpecSheet) -> EnumEncodeOutcome {
    match writer.write_table(sheet) {
        Ok(bytes) => {
            tracing::info!(
                format = %writer.output_format(),
                n_rows = sheet.height(),
                n_cols = sheet.width(),
                n_bytes = bytes.len(),
                "workbook encoded"
            );
            EnumEncodeOutcome::Encoded(bytes)
        }
        Err(err) => {
            tracing::error!(format = %writer.output_format(), error = %err, "workbook encoding failed");
            EnumEncodeOutcome::Failed {
                reason: err.to_string(),
            }
        }
    }
}

fn derive_exporter(output_format: &str) -> Result<SheetExporter, ExportError> {
    let output_format: EnumOutputFormat = output_format.parse()?;
    Ok(SheetExporter::new(SpecExportOptions {
        output_format,
        ..SpecExportOptions::default()
    }))
}

/// Export `records` using field metadata declared on `T`.
///
/// `output_format` is `"xls"` or `"xlsx"`; anything else fails before any
/// work is done.
pub fn export_excel<T: SheetRecord>(
    records: &[T],
    output_format: &str,
) -> Result<EnumEncodeOutcome, ExportError> {
    derive_exporter(output_format)?.export(records)
}

/// Export `records` using an explicit column list.
pub fn export_excel_with_columns<T: SheetRecord>(
    records: &[T],
    columns: &[SpecColumn],
    output_format: &str,
) -> Result<EnumEncodeOutcome, ExportError> {
    derive_exporter(output_format)?.export_with_columns(records, columns)
}

/// Annotation-mode sheet with default options, without encoding.
pub fn build_sheet_by_annotation<T: SheetRecord>(records: &[T]) -> Result<SpecSheet, ExportError> {
    SheetExporter::default().build_sheet_by_annotation(records)
}

/// Explicit-mode sheet with default options, without encoding.
pub fn build_sheet_by_columns<T: SheetRecord>(
    records: &[T],
    columns: &[SpecColumn],
) -> Result<SpecSheet, ExportError> {
    SheetExporter::default().build_sheet_by_columns(records, columns)
}
