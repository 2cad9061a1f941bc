//! Field value to cell value conversion.

use crate::conf::N_LEN_EXCEL_CELL_TEXT_MAX;
use crate::record::EnumFieldValue;
use crate::spec::{EnumCellValue, EnumFieldKind, SpecValuePolicy, ValueFormatter};

/// Structural text encoder for compound values.
pub trait TextEncoder {
    fn encode_text(&self, value: &serde_json::Value) -> Result<String, String>;
}

/// Compact JSON text encoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonTextEncoder;

impl TextEncoder for JsonTextEncoder {
    fn encode_text(&self, value: &serde_json::Value) -> Result<String, String> {
        serde_json::to_string(value).map_err(|e| e.to_string())
    }
}

/// Convert one field value into a cell value by its declared classification.
///
/// Returns `None` for [`EnumFieldKind::Other`]: such a field is traversed
/// rather than written. A value whose shape does not match `kind` is treated
/// as absent. The formatter only applies to numeric values. Text longer
/// than a cell can hold is written as a blank cell.
pub fn coerce_field_value(
    kind: EnumFieldKind,
    value: &EnumFieldValue<'_>,
    formatter: Option<&ValueFormatter>,
    encoder: &dyn TextEncoder,
    policy: &SpecValuePolicy,
) -> Option<EnumCellValue> {
    let cell = match kind {
        EnumFieldKind::Numeric => match value {
            EnumFieldValue::Number(n) => {
                EnumCellValue::String(formatter.map_or_else(|| n.to_string(), |f| f(n)))
            }
            _ => EnumCellValue::String(policy.nan_str.clone()),
        },
        EnumFieldKind::Text => match value {
            EnumFieldValue::Text(s) => EnumCellValue::String((*s).to_string()),
            _ => EnumCellValue::None,
        },
        EnumFieldKind::Boolean => match value {
            EnumFieldValue::Boolean(b) => EnumCellValue::Boolean(*b),
            _ => EnumCellValue::None,
        },
        EnumFieldKind::Compound => match value {
            EnumFieldValue::Compound(v) => match encoder.encode_text(v) {
                Ok(txt) => EnumCellValue::String(txt),
                Err(err) => {
                    tracing::warn!(error = %err, "compound value encoding failed; writing empty text");
                    EnumCellValue::String(String::new())
                }
            },
            _ => EnumCellValue::String(String::new()),
        },
        EnumFieldKind::Other => return None,
    };
    Some(limit_cell_text(cell))
}

fn limit_cell_text(cell: EnumCellValue) -> EnumCellValue {
    match cell {
        EnumCellValue::String(ref txt) if txt.encode_utf16().count() > N_LEN_EXCEL_CELL_TEXT_MAX => {
            tracing::warn!(
                n_len = txt.len(),
                limit = N_LEN_EXCEL_CELL_TEXT_MAX,
                "cell text exceeds the cell limit; writing a blank cell"
            );
            EnumCellValue::None
        }
        other => other,
    }
}
