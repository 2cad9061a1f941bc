//! Column planning for annotation and explicit modes.

use std::collections::HashMap;

use crate::graph::SpecTypeGraph;
use crate::spec::{EnumCellValue, ExportError, SpecColumn, SpecHeaderCell, SpecSheetRow};

////////////////////////////////////////////////////////////////////////////////
// #region ExplicitPlan

/// Caller-supplied columns plus a `source_field -> column` lookup.
#[derive(Debug, Clone)]
pub struct SpecExplicitPlan {
    columns: Vec<SpecColumn>,
    dict_idx_by_field: HashMap<String, usize>,
}

impl SpecExplicitPlan {
    /// Column reading `field_name`, if any.
    pub fn column_for(&self, field_name: &str) -> Option<&SpecColumn> {
        self.dict_idx_by_field
            .get(field_name)
            .and_then(|&n_idx| self.columns.get(n_idx))
    }

    pub fn columns(&self) -> &[SpecColumn] {
        &self.columns
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ColumnPlan

/// Column layout for one export call. Immutable once planned.
#[derive(Debug, Clone)]
pub enum EnumColumnPlan {
    /// Headers discovered from field metadata across the type graph.
    Annotation(Vec<SpecHeaderCell>),
    /// Caller-supplied column list.
    Explicit(SpecExplicitPlan),
}

impl EnumColumnPlan {
    pub fn is_annotation(&self) -> bool {
        matches!(self, Self::Annotation(_))
    }

    /// Header cells in write order.
    pub fn header_cells(&self) -> Vec<SpecHeaderCell> {
        match self {
            Self::Annotation(l_headers) => l_headers.clone(),
            Self::Explicit(plan) => plan
                .columns
                .iter()
                .map(|column| SpecHeaderCell {
                    header: column.header().to_string(),
                    column_index: column.column_index(),
                })
                .collect(),
        }
    }

    /// Build the header row. Later cells overwrite earlier ones on equal index.
    pub fn write_header(&self, row: &mut SpecSheetRow) {
        for cell in self.header_cells() {
            row.set_cell(cell.column_index, EnumCellValue::String(cell.header));
        }
    }
}

/// Plan headers from field metadata.
///
/// Headers come back sorted by column index; fields without metadata are
/// skipped. An empty graph is a setup error.
pub fn plan_headers_by_annotation(graph: &SpecTypeGraph) -> Result<EnumColumnPlan, ExportError> {
    if graph.is_empty() {
        return Err(ExportError::EmptyTypeGraph(graph.root_path.to_string()));
    }

    let mut l_headers: Vec<SpecHeaderCell> = graph
        .iter_fields()
        .filter_map(|field| field.column)
        .map(|meta| SpecHeaderCell {
            header: meta.header.to_string(),
            column_index: meta.column_index,
        })
        .collect();
    l_headers.sort_by_key(|cell| cell.column_index);

    Ok(EnumColumnPlan::Annotation(l_headers))
}

/// Plan an explicit column list.
///
/// Duplicate column indices are accepted (the later column wins); duplicate
/// source fields are rejected.
pub fn plan_columns_explicit(columns: &[SpecColumn]) -> Result<EnumColumnPlan, ExportError> {
    let mut dict_idx_by_field = HashMap::with_capacity(columns.len());
    for (n_idx, column) in columns.iter().enumerate() {
        if dict_idx_by_field
            .insert(column.source_field().to_string(), n_idx)
            .is_some()
        {
            return Err(ExportError::DuplicateSourceField(
                column.source_field().to_string(),
            ));
        }
    }

    Ok(EnumColumnPlan::Explicit(SpecExplicitPlan {
        columns: columns.to_vec(),
        dict_idx_by_field,
    }))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
