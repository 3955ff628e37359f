#![forbid(unsafe_code)]

//! Dynamically typed values flowing through bindings.
//!
//! Source paths are late-bound strings, so every property read and write
//! crosses the binding engine as a [`Value`]. Objects and lists travel by
//! reference: two `Value::Object`s are equal only when they point at the same
//! object, which is what lets a binding notice that an intermediate path link
//! changed identity.

use std::fmt;
use std::sync::Arc;

use crate::list::ObservableCollection;
use crate::observable::Bindable;

/// A property value read from a source object or a control.
#[derive(Clone, Default)]
pub enum Value {
    /// No value (unset field, broken path, "nothing selected").
    #[default]
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Enum(EnumValue),
    /// A display record produced for list controls.
    Record(DisplayRecord),
    /// A nested bindable object, compared by identity.
    Object(Arc<dyn Bindable>),
    /// An observable collection, compared by identity.
    List(Arc<dyn ObservableCollection>),
}

impl Value {
    /// Short name of the variant, used in diagnostics.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Nil => "nil",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Enum(_) => "enum",
            Self::Record(_) => "record",
            Self::Object(_) => "object",
            Self::List(_) => "list",
        }
    }

    #[must_use]
    pub fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer view. Floats with an integral value convert, so a slider
    /// reporting `3.0` can feed an integer field.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Float(f) if f.is_finite() && f.fract() == 0.0 => Some(*f as i64),
            Self::Enum(e) => Some(e.discriminant),
            _ => None,
        }
    }

    /// Float view. Integers widen.
    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_enum(&self) -> Option<&EnumValue> {
        match self {
            Self::Enum(e) => Some(e),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_record(&self) -> Option<&DisplayRecord> {
        match self {
            Self::Record(r) => Some(r),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_object(&self) -> Option<&Arc<dyn Bindable>> {
        match self {
            Self::Object(o) => Some(o),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&Arc<dyn ObservableCollection>> {
        match self {
            Self::List(l) => Some(l),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Nil, Self::Nil) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Enum(a), Self::Enum(b)) => a == b,
            (Self::Record(a), Self::Record(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b)),
            (Self::List(a), Self::List(b)) => a.identity() == b.identity(),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nil => f.write_str("Nil"),
            Self::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Self::Int(i) => f.debug_tuple("Int").field(i).finish(),
            Self::Float(x) => f.debug_tuple("Float").field(x).finish(),
            Self::Text(s) => f.debug_tuple("Text").field(s).finish(),
            Self::Enum(e) => f.debug_tuple("Enum").field(e).finish(),
            Self::Record(r) => f.debug_tuple("Record").field(r).finish(),
            Self::Object(o) => f
                .debug_struct("Object")
                .field("owner", &o.notifier().id())
                .finish(),
            Self::List(l) => f.debug_struct("List").field("len", &l.len()).finish(),
        }
    }
}

/// Display text, as a label would show the value.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nil => Ok(()),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => f.write_str(s),
            Self::Enum(e) => f.write_str(e.name),
            Self::Record(r) => f.write_str(&r.text),
            Self::Object(_) => f.write_str("<object>"),
            Self::List(l) => write!(f, "<list of {}>", l.len()),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Self::Float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

impl From<EnumValue> for Value {
    fn from(v: EnumValue) -> Self {
        Self::Enum(v)
    }
}

impl From<DisplayRecord> for Value {
    fn from(v: DisplayRecord) -> Self {
        Self::Record(v)
    }
}

impl<T: Bindable> From<Arc<T>> for Value {
    fn from(v: Arc<T>) -> Self {
        Self::Object(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Nil, Into::into)
    }
}

// ---------------------------------------------------------------------------
// Enumerations
// ---------------------------------------------------------------------------

/// One variant of a [`BindableEnum`], erased to names and numbers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EnumValue {
    /// Name of the enum type (`"Mode"`).
    pub type_name: &'static str,
    /// Name of the variant (`"B"`).
    pub name: &'static str,
    /// Numeric value of the variant, used as the list item id.
    pub discriminant: i64,
}

/// A fieldless enum that can populate a list control.
///
/// ```
/// use scenebind_core::{BindableEnum, Value};
///
/// #[derive(Clone, Copy, Debug, PartialEq)]
/// enum Mode { A, B, C }
///
/// impl BindableEnum for Mode {
///     const TYPE_NAME: &'static str = "Mode";
///     fn variants() -> &'static [Self] { &[Mode::A, Mode::B, Mode::C] }
///     fn name(self) -> &'static str {
///         match self { Mode::A => "A", Mode::B => "B", Mode::C => "C" }
///     }
///     fn discriminant(self) -> i64 { self as i64 }
/// }
///
/// let v = Mode::B.to_value();
/// assert_eq!(Mode::from_value(&v), Some(Mode::B));
/// assert_eq!(v.to_string(), "B");
/// ```
pub trait BindableEnum: Copy + Send + Sync + 'static {
    const TYPE_NAME: &'static str;

    /// Every variant, in display order.
    fn variants() -> &'static [Self];

    fn name(self) -> &'static str;

    fn discriminant(self) -> i64;

    fn to_enum_value(self) -> EnumValue {
        EnumValue {
            type_name: Self::TYPE_NAME,
            name: self.name(),
            discriminant: self.discriminant(),
        }
    }

    fn to_value(self) -> Value {
        Value::Enum(self.to_enum_value())
    }

    /// Recover a variant from an enum value of this type, or from its
    /// discriminant.
    fn from_value(value: &Value) -> Option<Self> {
        let discriminant = match value {
            Value::Enum(e) if e.type_name == Self::TYPE_NAME => e.discriminant,
            Value::Int(i) => *i,
            _ => return None,
        };
        Self::variants()
            .iter()
            .copied()
            .find(|v| v.discriminant() == discriminant)
    }
}

// ---------------------------------------------------------------------------
// Display records
// ---------------------------------------------------------------------------

/// What a list control shows for one item: display text plus a stable id.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct DisplayRecord {
    pub text: String,
    pub id: i64,
}

impl DisplayRecord {
    #[must_use]
    pub fn new(text: impl Into<String>, id: i64) -> Self {
        Self {
            text: text.into(),
            id,
        }
    }

    /// Turn a formatted item into a record.
    ///
    /// Records pass through, enum values use their name and discriminant,
    /// anything else shows its display text with `fallback_id` (the item's
    /// position) as id.
    #[must_use]
    pub fn from_value(value: Value, fallback_id: i64) -> Self {
        match value {
            Value::Record(record) => record,
            Value::Enum(e) => Self::new(e.name, e.discriminant),
            other => Self::new(other.to_string(), fallback_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq)]
    enum Tone {
        Low = 1,
        High = 5,
    }

    impl BindableEnum for Tone {
        const TYPE_NAME: &'static str = "Tone";
        fn variants() -> &'static [Self] {
            &[Tone::Low, Tone::High]
        }
        fn name(self) -> &'static str {
            match self {
                Tone::Low => "Low",
                Tone::High => "High",
            }
        }
        fn discriminant(self) -> i64 {
            self as i64
        }
    }

    #[test]
    fn numeric_views_coerce() {
        assert_eq!(Value::Float(3.0).as_int(), Some(3));
        assert_eq!(Value::Float(3.5).as_int(), None);
        assert_eq!(Value::Int(2).as_float(), Some(2.0));
        assert_eq!(Value::Text("2".into()).as_int(), None);
    }

    #[test]
    fn display_text() {
        assert_eq!(Value::Nil.to_string(), "");
        assert_eq!(Value::from(42).to_string(), "42");
        assert_eq!(Value::from("hp").to_string(), "hp");
        assert_eq!(Tone::High.to_value().to_string(), "High");
    }

    #[test]
    fn enum_round_trip_uses_discriminant() {
        let v = Tone::High.to_value();
        assert_eq!(v.as_int(), Some(5));
        assert_eq!(Tone::from_value(&v), Some(Tone::High));
        assert_eq!(Tone::from_value(&Value::Int(1)), Some(Tone::Low));
        assert_eq!(Tone::from_value(&Value::Int(3)), None);
    }

    #[test]
    fn enum_of_other_type_is_rejected() {
        let foreign = Value::Enum(EnumValue {
            type_name: "Other",
            name: "Low",
            discriminant: 1,
        });
        assert_eq!(Tone::from_value(&foreign), None);
    }

    #[test]
    fn record_from_value() {
        let r = DisplayRecord::from_value(Value::from("Alice"), 3);
        assert_eq!(r, DisplayRecord::new("Alice", 3));
        let r = DisplayRecord::from_value(Tone::High.to_value(), 0);
        assert_eq!(r, DisplayRecord::new("High", 5));
        let given = DisplayRecord::new("x", 9);
        assert_eq!(DisplayRecord::from_value(given.clone().into(), 0), given);
    }

    #[test]
    fn option_converts_to_nil() {
        assert!(Value::from(None::<i64>).is_nil());
        assert_eq!(Value::from(Some(4)), Value::Int(4));
    }
}
