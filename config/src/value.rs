use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use std::collections::BTreeMap;

/// One level of a configuration tree
pub type Tree = BTreeMap<String, Value>;

/// Configuration value
///
/// Scalars, lists and nested trees, as produced by any structured config format.
///
/// Null fails deserialization, as do integers outside of `i64` range.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(Tree),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Bool,
    Int,
    Float,
    String,
    List,
    Map,
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Bool(_) => ValueType::Bool,
            Value::Int(_) => ValueType::Int,
            Value::Float(_) => ValueType::Float,
            Value::String(_) => ValueType::String,
            Value::List(_) => ValueType::List,
            Value::Map(_) => ValueType::Map,
        }
    }

    pub fn is_map(&self) -> bool {
        self.value_type() == ValueType::Map
    }
}

impl std::fmt::Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ValueType::Bool => "bool",
            ValueType::Int => "integer",
            ValueType::Float => "float",
            ValueType::String => "string",
            ValueType::List => "list",
            ValueType::Map => "map",
        };
        f.write_str(name)
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::String(v) => write!(f, "{v}"),
            Value::List(values) => {
                write!(f, "[")?;
                for (pos, value) in values.iter().enumerate() {
                    if pos > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{value}")?;
                }
                write!(f, "]")
            }
            Value::Map(tree) => {
                write!(f, "{{")?;
                for (pos, (key, value)) in tree.iter().enumerate() {
                    if pos > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("bool, number, string, list or map")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Value, E> {
        Ok(Value::Int(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Value, E> {
        i64::try_from(v)
            .map(Value::Int)
            .map_err(|_| E::custom(format!("integer {v} is out of range")))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Value, E> {
        Ok(Value::Float(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Value, E> {
        Ok(Value::String(v.to_owned()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Value, E> {
        Ok(Value::String(v))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Value, E> {
        Err(E::custom("null values are not supported"))
    }

    fn visit_none<E: de::Error>(self) -> Result<Value, E> {
        self.visit_unit()
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
        let mut values = vec![];
        while let Some(value) = seq.next_element()? {
            values.push(value);
        }
        Ok(Value::List(values))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Value, A::Error> {
        let mut tree = Tree::new();
        while let Some((key, value)) = map.next_entry::<String, Value>()? {
            tree.insert(key, value);
        }
        Ok(Value::Map(tree))
    }
}

macro_rules! impl_from_value {
    ($ty:ty, $arm:tt) => {
        impl From<$ty> for Value {
            fn from(value: $ty) -> Value {
                Value::$arm(value.into())
            }
        }
    };
}

impl_from_value!(bool, Bool);
impl_from_value!(i8, Int);
impl_from_value!(i16, Int);
impl_from_value!(i32, Int);
impl_from_value!(i64, Int);
impl_from_value!(u8, Int);
impl_from_value!(u16, Int);
impl_from_value!(u32, Int);
impl_from_value!(f32, Float);
impl_from_value!(f64, Float);
impl_from_value!(String, String);
impl_from_value!(&str, String);
impl_from_value!(Vec<Value>, List);
impl_from_value!(Tree, Map);

/// Conversion of a configuration value into a concrete type
///
/// Conversions are strict: strings are never parsed into numbers or booleans.
/// Integers convert into any integer type they fit in, and into floats.
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Option<Self>;

    fn type_name() -> &'static str {
        std::any::type_name::<Self>()
    }
}

macro_rules! from_value_impl {
    ($var:ident, $ty:ty, $($arm:tt),* => $expr:tt)  => {
        impl FromValue for $ty {
            fn from_value(value: &Value) -> Option<Self> {
                match value {
                    $(Value::$arm($var) => from_value_impl!(@expand_expr, $expr),)*
                    _ => None,
                }
            }
        }
    };
    (@expand_expr, { $($token:tt)+ }) => {
        $($token)*
    }
}

from_value_impl!(v, i8, Int => { (*v).try_into().ok() });
from_value_impl!(v, i16, Int => { (*v).try_into().ok() });
from_value_impl!(v, i32, Int => { (*v).try_into().ok() });
from_value_impl!(v, i64, Int => { Some(*v) });
from_value_impl!(v, isize, Int => { (*v).try_into().ok() });
from_value_impl!(v, u8, Int => { (*v).try_into().ok() });
from_value_impl!(v, u16, Int => { (*v).try_into().ok() });
from_value_impl!(v, u32, Int => { (*v).try_into().ok() });
from_value_impl!(v, u64, Int => { (*v).try_into().ok() });
from_value_impl!(v, usize, Int => { (*v).try_into().ok() });
from_value_impl!(v, f64, Float, Int => { Some(*v as f64) });
from_value_impl!(v, f32, Float, Int => { Some(*v as f32) });
from_value_impl!(v, bool, Bool => { Some(*v) });
from_value_impl!(v, String, String => { Some(v.clone()) });
from_value_impl!(v, Tree, Map => { Some(v.clone()) });

impl FromValue for Value {
    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::List(values) => values.iter().map(T::from_value).collect(),
            _ => None,
        }
    }
}
