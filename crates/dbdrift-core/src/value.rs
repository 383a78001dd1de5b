//! Canonical attribute values
//!
//! Every attribute an adapter reports must be expressed as an
//! [`AttributeValue`]. The set of shapes is closed so that structural
//! comparison is total: any two values can be compared without inspecting
//! engine-specific types at runtime.

use serde::{Deserialize, Serialize};
use serde_json::Number;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// A comparable metadata value
///
/// Serializes to plain JSON. Mappings are kept in a `BTreeMap` so that the
/// serialized form never depends on insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// Explicit null (distinct from a missing attribute)
    Null,

    /// Boolean flag
    Bool(bool),

    /// Integer or floating point number
    Number(Number),

    /// Text, including large definition bodies
    String(String),

    /// Sequence of values, unordered for comparison unless configured otherwise
    Sequence(Vec<AttributeValue>),

    /// Named attributes
    Mapping(BTreeMap<String, AttributeValue>),
}

impl AttributeValue {
    /// Build a mapping from `(name, value)` pairs
    pub fn mapping<K, V, I>(entries: I) -> Self
    where
        K: Into<String>,
        V: Into<AttributeValue>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self::Mapping(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Build a sequence from anything convertible into values
    pub fn sequence<V, I>(items: I) -> Self
    where
        V: Into<AttributeValue>,
        I: IntoIterator<Item = V>,
    {
        Self::Sequence(items.into_iter().map(Into::into).collect())
    }

    /// True for null, bool, number and string
    pub fn is_scalar(&self) -> bool {
        !matches!(self, Self::Sequence(_) | Self::Mapping(_))
    }

    /// Short name of the value shape, used in log messages
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Sequence(_) => "sequence",
            Self::Mapping(_) => "mapping",
        }
    }

    /// Borrow the text if this is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow the items if this is a sequence
    pub fn as_sequence(&self) -> Option<&[AttributeValue]> {
        match self {
            Self::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// Borrow the entries if this is a mapping
    pub fn as_mapping(&self) -> Option<&BTreeMap<String, AttributeValue>> {
        match self {
            Self::Mapping(entries) => Some(entries),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Bool(_) => 1,
            Self::Number(_) => 2,
            Self::String(_) => 3,
            Self::Sequence(_) => 4,
            Self::Mapping(_) => 5,
        }
    }
}

/// Numbers order by magnitude first; the textual form breaks ties between
/// representations such as `1` and `1.0`, which are not equal. Agrees with
/// `Number`'s equality, so `-0.0` and `0.0` compare equal.
fn compare_numbers(a: &Number, b: &Number) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return x.cmp(&y);
    }
    if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64()) {
        return x.cmp(&y);
    }

    let x = a.as_f64().unwrap_or(f64::NAN);
    let y = b.as_f64().unwrap_or(f64::NAN);
    x.total_cmp(&y)
        .then_with(|| a.to_string().cmp(&b.to_string()))
}

impl Ord for AttributeValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Null, Self::Null) => Ordering::Equal,
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Number(a), Self::Number(b)) => compare_numbers(a, b),
            (Self::String(a), Self::String(b)) => a.cmp(b),
            (Self::Sequence(a), Self::Sequence(b)) => a.cmp(b),
            (Self::Mapping(a), Self::Mapping(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for AttributeValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl std::fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String(s) => write!(f, "{}", s),
            other => {
                let json = serde_json::to_string(other).map_err(|_| std::fmt::Error)?;
                write!(f, "{}", json)
            }
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}

impl From<i32> for AttributeValue {
    fn from(value: i32) -> Self {
        Self::Number(value.into())
    }
}

impl From<u64> for AttributeValue {
    fn from(value: u64) -> Self {
        Self::Number(value.into())
    }
}

impl From<f64> for AttributeValue {
    /// Non-finite floats have no JSON form and become `Null`
    fn from(value: f64) -> Self {
        Number::from_f64(value).map_or(Self::Null, Self::Number)
    }
}

impl<T: Into<AttributeValue>> From<Option<T>> for AttributeValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl From<Vec<AttributeValue>> for AttributeValue {
    fn from(value: Vec<AttributeValue>) -> Self {
        Self::Sequence(value)
    }
}

impl From<BTreeMap<String, AttributeValue>> for AttributeValue {
    fn from(value: BTreeMap<String, AttributeValue>) -> Self {
        Self::Mapping(value)
    }
}

impl From<serde_json::Value> for AttributeValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => Self::Number(n),
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::Sequence(items.into_iter().map(Into::into).collect())
            }
            serde_json::Value::Object(entries) => Self::Mapping(
                entries.into_iter().map(|(k, v)| (k, v.into())).collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_roundtrip_keeps_shapes() {
        let value = AttributeValue::from(json!({
            "columns": [{"column": "id", "data_type": "int", "max_length": null}],
            "disabled": false,
            "rows": 12,
        }));

        let text = serde_json::to_string(&value).unwrap();
        let parsed: AttributeValue = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, value);

        let columns = parsed.as_mapping().unwrap()["columns"].as_sequence().unwrap();
        assert_eq!(columns.len(), 1);
        assert_eq!(columns[0].as_mapping().unwrap()["max_length"], AttributeValue::Null);
    }

    #[test]
    fn mapping_serialization_is_sorted() {
        let value = AttributeValue::mapping([("zeta", 1), ("alpha", 2)]);
        assert_eq!(serde_json::to_string(&value).unwrap(), r#"{"alpha":2,"zeta":1}"#);
    }

    #[test]
    fn ordering_is_total_across_shapes() {
        let mut values = vec![
            AttributeValue::mapping([("a", 1)]),
            AttributeValue::from("text"),
            AttributeValue::Null,
            AttributeValue::from(2.5),
            AttributeValue::from(true),
            AttributeValue::sequence([1, 2]),
            AttributeValue::from(1),
        ];
        values.sort();

        let kinds: Vec<_> = values.iter().map(|v| v.kind()).collect();
        assert_eq!(
            kinds,
            vec!["null", "bool", "number", "number", "string", "sequence", "mapping"]
        );
        assert_eq!(values[2], AttributeValue::from(1));
    }

    #[test]
    fn integer_and_float_forms_are_distinct() {
        let int = AttributeValue::from(1);
        let float = AttributeValue::from(1.0);
        assert_ne!(int, float);
        assert_ne!(int.cmp(&float), Ordering::Equal);
    }

    #[test]
    fn signed_zeros_are_equal() {
        let negative = AttributeValue::from(-0.0);
        let positive = AttributeValue::from(0.0);
        assert_eq!(negative, positive);
        assert_eq!(negative.cmp(&positive), Ordering::Equal);

        let mut left = vec![negative, AttributeValue::from(1)];
        let mut right = vec![AttributeValue::from(1), positive];
        left.sort();
        right.sort();
        assert_eq!(left, right);
    }

    #[test]
    fn large_integers_order_exactly() {
        let a = AttributeValue::from(9_007_199_254_740_993_u64);
        let b = AttributeValue::from(9_007_199_254_740_992_u64);
        assert_eq!(a.cmp(&b), Ordering::Greater);
    }

    #[test]
    fn non_finite_float_is_null() {
        assert_eq!(AttributeValue::from(f64::NAN), AttributeValue::Null);
    }

    #[test]
    fn display_is_compact() {
        assert_eq!(AttributeValue::from("varchar").to_string(), "varchar");
        assert_eq!(AttributeValue::sequence(["a", "b"]).to_string(), r#"["a","b"]"#);
        assert_eq!(AttributeValue::Null.to_string(), "null");
    }
}
