//! Record access traits: the static stand-in for runtime field reflection.
//!
//! `#[derive(SheetRecord)]` implements [`SheetRecord`] and [`SheetField`] for a
//! struct. Leaf field types implement [`SheetField`] here.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, LinkedList, VecDeque};
use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::rc::Rc;
use std::sync::Arc;

use serde::Serialize;

use crate::spec::SpecRecordType;

////////////////////////////////////////////////////////////////////////////////
// #region FieldValues

/// Numeric field value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EnumNumber {
    /// Signed integer.
    Integer(i64),
    /// Unsigned integer.
    Unsigned(u64),
    /// Single-precision floating point, printed at its own precision.
    Float32(f32),
    /// Floating point.
    Float(f64),
}

impl EnumNumber {
    pub fn as_f64(&self) -> f64 {
        match self {
            Self::Integer(v) => *v as f64,
            Self::Unsigned(v) => *v as f64,
            Self::Float32(v) => f64::from(*v),
            Self::Float(v) => *v,
        }
    }
}

impl fmt::Display for EnumNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "{v}"),
            Self::Unsigned(v) => write!(f, "{v}"),
            Self::Float32(v) => write_float(f, f64::from(*v), v),
            Self::Float(v) => write_float(f, *v, v),
        }
    }
}

/// Non-finite values print as `NaN`, `Infinity` and `-Infinity`.
fn write_float(f: &mut fmt::Formatter<'_>, value: f64, text: &dyn fmt::Display) -> fmt::Result {
    if value.is_nan() {
        f.write_str("NaN")
    } else if value.is_infinite() {
        f.write_str(if value > 0.0 { "Infinity" } else { "-Infinity" })
    } else {
        write!(f, "{text}")
    }
}

/// Runtime value read from one field.
#[derive(Clone)]
pub enum EnumFieldValue<'a> {
    /// Missing value or unreadable field.
    Absent,
    /// Text value.
    Text(&'a str),
    /// Numeric value.
    Number(EnumNumber),
    /// Boolean value.
    Boolean(bool),
    /// Container captured as a structural value.
    Compound(serde_json::Value),
    /// Nested record.
    Record(&'a dyn SheetRecord),
}

impl EnumFieldValue<'_> {
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

impl fmt::Debug for EnumFieldValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent => f.write_str("Absent"),
            Self::Text(s) => f.debug_tuple("Text").field(s).finish(),
            Self::Number(n) => f.debug_tuple("Number").field(n).finish(),
            Self::Boolean(b) => f.debug_tuple("Boolean").field(b).finish(),
            Self::Compound(v) => f.debug_tuple("Compound").field(v).finish(),
            Self::Record(r) => f
                .debug_tuple("Record")
                .field(&r.record_type().type_path)
                .finish(),
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Traits

/// A record type whose fields can be mapped to sheet columns.
///
/// Usually derived with `#[derive(SheetRecord)]`.
pub trait SheetRecord {
    /// Static descriptor of the type.
    fn sheet_type() -> &'static SpecRecordType
    where
        Self: Sized;

    /// Descriptor of this value's type.
    fn record_type(&self) -> &'static SpecRecordType;

    /// Read one declared field by name. Unknown names read as absent.
    fn read_field(&self, field_name: &str) -> EnumFieldValue<'_>;

    /// Embedded base record, when the type declares one.
    fn base_record(&self) -> Option<&dyn SheetRecord> {
        None
    }
}

/// A value that can sit in a record field.
pub trait SheetField {
    /// Convert the current value for cell coercion or traversal.
    fn to_field_value(&self) -> EnumFieldValue<'_>;

    /// Record descriptor when the field type is itself a record.
    fn nested_type() -> Option<&'static SpecRecordType>
    where
        Self: Sized,
    {
        None
    }
}

/// Capture a container as a structural value.
///
/// A value that fails to serialize reads as absent.
pub fn derive_compound_value<T: Serialize + ?Sized>(value: &T) -> EnumFieldValue<'static> {
    match serde_json::to_value(value) {
        Ok(v) => EnumFieldValue::Compound(v),
        Err(err) => {
            tracing::debug!(error = %err, "compound field not serializable; treated as absent");
            EnumFieldValue::Absent
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region LeafImpls

macro_rules! impl_sheet_field_number {
    ($variant:ident, $cast:ty; $($ty:ty),* $(,)?) => {
        $(
            impl SheetField for $ty {
                fn to_field_value(&self) -> EnumFieldValue<'_> {
                    EnumFieldValue::Number(EnumNumber::$variant(*self as $cast))
                }
            }
        )*
    };
}

impl_sheet_field_number!(Integer, i64; i8, i16, i32, i64, isize);
impl_sheet_field_number!(Unsigned, u64; u8, u16, u32, u64, usize);
impl_sheet_field_number!(Float32, f32; f32);
impl_sheet_field_number!(Float, f64; f64);

impl SheetField for String {
    fn to_field_value(&self) -> EnumFieldValue<'_> {
        EnumFieldValue::Text(self.as_str())
    }
}

impl SheetField for str {
    fn to_field_value(&self) -> EnumFieldValue<'_> {
        EnumFieldValue::Text(self)
    }
}

impl SheetField for bool {
    fn to_field_value(&self) -> EnumFieldValue<'_> {
        EnumFieldValue::Boolean(*self)
    }
}

impl<T: SheetField> SheetField for Option<T> {
    fn to_field_value(&self) -> EnumFieldValue<'_> {
        match self {
            Some(v) => v.to_field_value(),
            None => EnumFieldValue::Absent,
        }
    }

    fn nested_type() -> Option<&'static SpecRecordType> {
        T::nested_type()
    }
}

macro_rules! impl_sheet_field_pointer {
    ($($ptr:ident),* $(,)?) => {
        $(
            impl<T: SheetField> SheetField for $ptr<T> {
                fn to_field_value(&self) -> EnumFieldValue<'_> {
                    (**self).to_field_value()
                }

                fn nested_type() -> Option<&'static SpecRecordType> {
                    T::nested_type()
                }
            }
        )*
    };
}

impl_sheet_field_pointer!(Box, Rc, Arc);

impl<T: SheetField + ?Sized> SheetField for &T {
    fn to_field_value(&self) -> EnumFieldValue<'_> {
        (**self).to_field_value()
    }
}

impl<T: Serialize> SheetField for Vec<T> {
    fn to_field_value(&self) -> EnumFieldValue<'_> {
        derive_compound_value(self)
    }
}

impl<T: Serialize> SheetField for VecDeque<T> {
    fn to_field_value(&self) -> EnumFieldValue<'_> {
        derive_compound_value(self)
    }
}

impl<T: Serialize> SheetField for LinkedList<T> {
    fn to_field_value(&self) -> EnumFieldValue<'_> {
        derive_compound_value(self)
    }
}

impl<T: Serialize> SheetField for BTreeSet<T> {
    fn to_field_value(&self) -> EnumFieldValue<'_> {
        derive_compound_value(self)
    }
}

impl<T: Serialize + Eq + Hash, S: BuildHasher> SheetField for HashSet<T, S> {
    fn to_field_value(&self) -> EnumFieldValue<'_> {
        derive_compound_value(self)
    }
}

impl<K: Serialize, V: Serialize> SheetField for BTreeMap<K, V> {
    fn to_field_value(&self) -> EnumFieldValue<'_> {
        derive_compound_value(self)
    }
}

impl<K: Serialize + Eq + Hash, V: Serialize, S: BuildHasher> SheetField for HashMap<K, V, S> {
    fn to_field_value(&self) -> EnumFieldValue<'_> {
        derive_compound_value(self)
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashSet};

    use super::{EnumFieldValue, EnumNumber, SheetField};

    #[test]
    fn number_display_uses_default_decimal_text() {
        assert_eq!(EnumNumber::Integer(-7).to_string(), "-7");
        assert_eq!(EnumNumber::Unsigned(42).to_string(), "42");
        assert_eq!(EnumNumber::Float(1.5).to_string(), "1.5");
        assert_eq!(EnumNumber::Float(2.0).to_string(), "2");
    }

    #[test]
    fn f32_keeps_its_own_precision() {
        let value = 0.1f32;
        assert!(matches!(
            value.to_field_value(),
            EnumFieldValue::Number(EnumNumber::Float32(_))
        ));
        let EnumFieldValue::Number(n) = value.to_field_value() else {
            panic!("f32 reads as a number");
        };
        assert_eq!(n.to_string(), "0.1");
        assert_eq!(EnumNumber::Float32(2.5).to_string(), "2.5");
    }

    #[test]
    fn non_finite_floats_print_as_words() {
        assert_eq!(EnumNumber::Float(f64::NAN).to_string(), "NaN");
        assert_eq!(EnumNumber::Float(f64::INFINITY).to_string(), "Infinity");
        assert_eq!(EnumNumber::Float32(f32::NEG_INFINITY).to_string(), "-Infinity");
    }

    #[test]
    fn option_none_reads_absent() {
        let value: Option<i32> = None;
        assert!(value.to_field_value().is_absent());
        let value = Some(3u8);
        assert!(matches!(
            value.to_field_value(),
            EnumFieldValue::Number(EnumNumber::Unsigned(3))
        ));
    }

    #[test]
    fn wrappers_are_transparent() {
        let value: Box<Option<String>> = Box::new(Some("x".to_string()));
        assert!(matches!(value.to_field_value(), EnumFieldValue::Text("x")));
        let value: &str = "y";
        assert!(matches!(value.to_field_value(), EnumFieldValue::Text("y")));
    }

    #[test]
    fn containers_capture_structural_value() {
        let mut dict = BTreeMap::new();
        dict.insert("b", vec![1, 2]);
        dict.insert("a", vec![]);
        let EnumFieldValue::Compound(value) = dict.to_field_value() else {
            panic!("expected compound");
        };
        assert_eq!(value.to_string(), r#"{"a":[],"b":[1,2]}"#);

        let set: HashSet<u8> = HashSet::from([9]);
        assert!(matches!(set.to_field_value(), EnumFieldValue::Compound(_)));
    }

    #[test]
    fn non_string_map_keys_read_absent() {
        let mut dict = BTreeMap::new();
        dict.insert(vec![1u8], "v");
        assert!(dict.to_field_value().is_absent());
    }

    #[test]
    fn leaf_types_have_no_nested_type() {
        assert!(<i64 as SheetField>::nested_type().is_none());
        assert!(<Option<String> as SheetField>::nested_type().is_none());
    }
}
