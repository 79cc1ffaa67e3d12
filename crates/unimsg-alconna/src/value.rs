use std::collections::BTreeMap;
use std::fmt;

use unimsg_core::{Segment, SegmentVariant};

/// A value produced by matching an argument.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ArgValue {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Segment(Segment),
    List(Vec<ArgValue>),
    Map(BTreeMap<String, ArgValue>),
}

impl ArgValue {
    pub fn is_null(&self) -> bool {
        matches!(self, ArgValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ArgValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ArgValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the value as a float, widening integers.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            ArgValue::Float(f) => Some(*f),
            ArgValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ArgValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_segment(&self) -> Option<&Segment> {
        match self {
            ArgValue::Segment(seg) => Some(seg),
            _ => None,
        }
    }

    /// Borrows a specific segment variant, e.g. `value.as_variant::<At>()`.
    pub fn as_variant<T: SegmentVariant>(&self) -> Option<&T> {
        self.as_segment().and_then(T::from_segment)
    }

    pub fn as_list(&self) -> Option<&[ArgValue]> {
        match self {
            ArgValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, ArgValue>> {
        match self {
            ArgValue::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Short name of the value's type, used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            ArgValue::Null => "null",
            ArgValue::Bool(_) => "bool",
            ArgValue::Int(_) => "int",
            ArgValue::Float(_) => "float",
            ArgValue::Str(_) => "str",
            ArgValue::Segment(_) => "segment",
            ArgValue::List(_) => "list",
            ArgValue::Map(_) => "map",
        }
    }
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgValue::Null => f.write_str("null"),
            ArgValue::Bool(b) => write!(f, "{b}"),
            ArgValue::Int(i) => write!(f, "{i}"),
            ArgValue::Float(x) => write!(f, "{x}"),
            ArgValue::Str(s) => f.write_str(s),
            ArgValue::Segment(seg) => write!(f, "{seg}"),
            ArgValue::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            ArgValue::Map(map) => {
                f.write_str("{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}={value}")?;
                }
                f.write_str("}")
            }
        }
    }
}

macro_rules! arg_value_from {
    ($($ty:ty => $variant:ident $(as $cast:ty)?),* $(,)?) => {
        $(
            impl From<$ty> for ArgValue {
                fn from(value: $ty) -> Self {
                    ArgValue::$variant((value $(as $cast)?).into())
                }
            }
        )*
    };
}

arg_value_from! {
    bool => Bool,
    i32 => Int as i64,
    i64 => Int,
    u32 => Int as i64,
    f64 => Float,
    &str => Str,
    String => Str,
    Segment => Segment,
    Vec<ArgValue> => List,
    BTreeMap<String, ArgValue> => Map,
}

#[cfg(test)]
mod tests {
    use super::*;
    use unimsg_core::At;

    #[test]
    fn test_accessors() {
        assert_eq!(ArgValue::from(3).as_int(), Some(3));
        assert_eq!(ArgValue::from(3).as_float(), Some(3.0));
        assert_eq!(ArgValue::from("x").as_str(), Some("x"));
        let at = ArgValue::from(Segment::at("42"));
        assert_eq!(at.as_variant::<At>().map(|a| a.target.as_str()), Some("42"));
        assert!(ArgValue::default().is_null());
    }

    #[test]
    fn test_display() {
        let list = ArgValue::List(vec![1.into(), "a".into(), true.into()]);
        assert_eq!(list.to_string(), "[1, a, true]");
    }
}
