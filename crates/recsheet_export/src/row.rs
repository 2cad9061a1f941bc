//! Per-record row population.

use crate::coerce::{TextEncoder, coerce_field_value};
use crate::plan::EnumColumnPlan;
use crate::record::{EnumFieldValue, SheetRecord};
use crate::spec::{
    EnumCellValue, SpecFieldDescriptor, SpecRecordType, SpecSheetRow, SpecValuePolicy,
    ValueFormatter,
};

/// Shared, read-only inputs of every row write in one export call.
pub struct SpecRowContext<'a> {
    pub plan: &'a EnumColumnPlan,
    pub encoder: &'a dyn TextEncoder,
    pub policy: &'a SpecValuePolicy,
}

/// Populate `row` from one record.
///
/// Base records are written first, so a field of the derived record mapped
/// to the same column wins. Nested records are traversed when their field
/// has no column, and in explicit mode also after their column is written.
/// A record type already on the current traversal path is not entered
/// again. Unreadable values degrade to absent for that field only.
pub fn write_row(row: &mut SpecSheetRow, record: &dyn SheetRecord, ctx: &SpecRowContext<'_>) {
    let mut l_path: Vec<&'static str> = Vec::new();
    write_record(row, record, &mut l_path, ctx);
}

fn write_record(
    row: &mut SpecSheetRow,
    record: &dyn SheetRecord,
    l_path: &mut Vec<&'static str>,
    ctx: &SpecRowContext<'_>,
) {
    let record_type = record.record_type();
    if record_type.fields.is_empty() && record_type.base.is_none() {
        return;
    }
    if l_path.contains(&record_type.type_path) {
        tracing::debug!(
            type_path = record_type.type_path,
            "record type already on traversal path; skipped"
        );
        return;
    }
    l_path.push(record_type.type_path);

    if let Some(base) = record.base_record() {
        write_record(row, base, l_path, ctx);
    }

    for field in record_type.fields {
        let value = record.read_field(field.name);
        let if_recurse = match ctx.plan {
            EnumColumnPlan::Annotation(_) => match field.column {
                Some(meta) => {
                    write_cell(row, meta.column_index, field, &value, None, ctx);
                    false
                }
                None => true,
            },
            EnumColumnPlan::Explicit(plan) => {
                if let Some(column) = plan.column_for(field.name) {
                    write_cell(
                        row,
                        column.column_index(),
                        field,
                        &value,
                        column.formatter(),
                        ctx,
                    );
                }
                !is_enclosing_type(field, record_type)
            }
        };

        if !if_recurse || field.nested_type().is_none() {
            continue;
        }
        if let EnumFieldValue::Record(nested) = value {
            write_record(row, nested, l_path, ctx);
        }
    }

    l_path.pop();
}

fn write_cell(
    row: &mut SpecSheetRow,
    column_index: usize,
    field: &SpecFieldDescriptor,
    value: &EnumFieldValue<'_>,
    formatter: Option<&ValueFormatter>,
    ctx: &SpecRowContext<'_>,
) {
    let cell = coerce_field_value(field.kind(), value, formatter, ctx.encoder, ctx.policy)
        .unwrap_or(EnumCellValue::None);
    row.set_cell(column_index, cell);
}

fn is_enclosing_type(field: &SpecFieldDescriptor, record_type: &SpecRecordType) -> bool {
    field
        .nested_type()
        .is_some_and(|nested| nested.is_same(record_type))
}

#[cfg(test)]
mod tests {
    use super::{SpecRowContext, write_row};
    use crate::SheetRecord;
    use crate::coerce::JsonTextEncoder;
    use crate::graph::resolve_type_graph;
    use crate::plan::{EnumColumnPlan, plan_columns_explicit, plan_headers_by_annotation};
    use crate::spec::{EnumCellValue, SpecColumn, SpecSheetRow, SpecValuePolicy};

    #[derive(SheetRecord)]
    struct Inner {
        #[sheet(column = 1, header = "Code")]
        code: String,
    }

    #[derive(SheetRecord)]
    struct Outer {
        #[sheet(column = 0, header = "Inner")]
        inner: Inner,
    }

    #[derive(SheetRecord)]
    struct Parent {
        #[sheet(column = 0, header = "Label")]
        label: String,
        #[sheet(column = 2, header = "Active")]
        active: bool,
    }

    #[derive(SheetRecord)]
    struct Child {
        #[sheet(base)]
        parent: Parent,
        #[sheet(column = 0, header = "Label")]
        name: String,
        #[sheet(column = 1, header = "Score")]
        score: Option<f64>,
    }

    #[derive(SheetRecord)]
    struct Node {
        #[sheet(column = 0, header = "Value")]
        value: i64,
        next: Option<Box<Self>>,
    }

    #[derive(SheetRecord)]
    struct Left {
        #[sheet(column = 0, header = "L")]
        l: i64,
        right: Option<Box<Right>>,
    }

    #[derive(SheetRecord)]
    struct Right {
        #[sheet(column = 1, header = "R")]
        r: i64,
        left: Option<Box<Left>>,
    }

    fn write_one<T: SheetRecord>(record: &T, plan: &EnumColumnPlan) -> SpecSheetRow {
        let policy = SpecValuePolicy::default();
        let ctx = SpecRowContext {
            plan,
            encoder: &JsonTextEncoder,
            policy: &policy,
        };
        let mut row = SpecSheetRow::default();
        write_row(&mut row, record, &ctx);
        row
    }

    fn annotation_plan<T: SheetRecord>() -> EnumColumnPlan {
        plan_headers_by_annotation(&resolve_type_graph(T::sheet_type())).unwrap()
    }

    fn text(value: &str) -> EnumCellValue {
        EnumCellValue::String(value.to_string())
    }

    #[test]
    fn annotated_nested_field_is_blank_and_not_traversed() {
        let record = Outer {
            inner: Inner {
                code: "x".to_string(),
            },
        };
        let row = write_one(&record, &annotation_plan::<Outer>());
        assert_eq!(row.cell(0), Some(&EnumCellValue::None));
        assert_eq!(row.cell(1), None);
    }

    #[test]
    fn explicit_matched_nested_field_is_written_then_traversed() {
        let record = Outer {
            inner: Inner {
                code: "x".to_string(),
            },
        };
        let plan = plan_columns_explicit(&[
            SpecColumn::new(0, "inner", "Inner").unwrap(),
            SpecColumn::new(1, "code", "Code").unwrap(),
        ])
        .unwrap();
        let row = write_one(&record, &plan);
        assert_eq!(row.cell(0), Some(&EnumCellValue::None));
        assert_eq!(row.cell(1), Some(&text("x")));
    }

    #[test]
    fn derived_field_overwrites_base_on_same_column() {
        let record = Child {
            parent: Parent {
                label: "base".to_string(),
                active: true,
            },
            name: "derived".to_string(),
            score: None,
        };
        let row = write_one(&record, &annotation_plan::<Child>());
        assert_eq!(row.cell(0), Some(&text("derived")));
        assert_eq!(row.cell(1), Some(&text("NAN")));
        assert_eq!(row.cell(2), Some(&EnumCellValue::Boolean(true)));
    }

    #[test]
    fn self_reference_terminates() {
        let record = Node {
            value: 1,
            next: Some(Box::new(Node {
                value: 2,
                next: None,
            })),
        };
        let row = write_one(&record, &annotation_plan::<Node>());
        assert_eq!(row.cell(0), Some(&text("1")));
        assert_eq!(row.width(), 1);
    }

    #[test]
    fn mutual_cycle_terminates_and_writes_each_type_once() {
        let record = Left {
            l: 1,
            right: Some(Box::new(Right {
                r: 2,
                left: Some(Box::new(Left { l: 3, right: None })),
            })),
        };
        let row = write_one(&record, &annotation_plan::<Left>());
        assert_eq!(row.cell(0), Some(&text("1")));
        assert_eq!(row.cell(1), Some(&text("2")));
    }

    #[test]
    fn explicit_self_reference_is_written_but_not_entered() {
        let record = Node {
            value: 1,
            next: Some(Box::new(Node {
                value: 2,
                next: None,
            })),
        };
        let plan = plan_columns_explicit(&[
            SpecColumn::new(0, "value", "Value").unwrap(),
            SpecColumn::new(1, "next", "Next").unwrap(),
        ])
        .unwrap();
        let row = write_one(&record, &plan);
        assert_eq!(row.cells.len(), 2);
        assert_eq!(row.cell(0), Some(&text("1")));
        assert_eq!(row.cell(1), Some(&EnumCellValue::None));
    }

    #[test]
    fn explicit_mutual_cycle_stops_at_repeated_type() {
        let record = Left {
            l: 1,
            right: Some(Box::new(Right {
                r: 2,
                left: Some(Box::new(Left { l: 3, right: None })),
            })),
        };
        let plan = plan_columns_explicit(&[
            SpecColumn::new(0, "l", "L").unwrap(),
            SpecColumn::new(1, "r", "R").unwrap(),
        ])
        .unwrap();
        let row = write_one(&record, &plan);
        assert_eq!(row.cells.len(), 2);
        assert_eq!(row.cell(0), Some(&text("1")));
        assert_eq!(row.cell(1), Some(&text("2")));
    }

    #[test]
    fn explicit_unmatched_fields_are_skipped() {
        let record = Child {
            parent: Parent {
                label: "base".to_string(),
                active: false,
            },
            name: "derived".to_string(),
            score: Some(1.5),
        };
        let plan = plan_columns_explicit(&[SpecColumn::new(3, "score", "Score").unwrap()]).unwrap();
        let row = write_one(&record, &plan);
        assert_eq!(row.cells.len(), 1);
        assert_eq!(row.cell(3), Some(&text("1.5")));
    }
}
