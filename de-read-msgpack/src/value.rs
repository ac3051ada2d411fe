//! Self-describing MessagePack values.
//!
//! [`Value`] is what a destination without a fixed shape decodes into. It is
//! also a [`serde::Deserializer`] itself, which is how values produced by
//! extension decoders populate ordinary typed records.
use alloc::{string::String, vec::Vec};
use core::fmt;

use serde::de::{self, Deserialize, IntoDeserializer, MapAccess, SeqAccess, Visitor};
use serde::de::value::{MapDeserializer, SeqDeserializer};
use serde::forward_to_deserialize_any;

use crate::error::{Error, Result};

/// Upper bound of elements preallocated from an untrusted size hint.
const MAX_PREALLOC: usize = 4096;

/// A dynamically typed MessagePack value.
///
/// Every integer has exactly one representation: [`Value::Int`] whenever the
/// number fits `i64`, [`Value::UInt`] only above `i64::MAX`.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    #[default]
    Nil,
    Bool(bool),
    Int(i64),
    UInt(u64),
    F32(f32),
    F64(f64),
    Str(String),
    Bin(Vec<u8>),
    Array(Vec<Value>),
    /// Entries in wire order
    Map(Vec<(Value, Value)>),
}

impl Value {
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Value::Bool(b) => Some(b),
            _ => None
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Int(n) => Some(n),
            _ => None
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            Value::Int(n) => n.try_into().ok(),
            Value::UInt(n) => Some(n),
            _ => None
        }
    }

    /// Return any number as `f64`, possibly losing precision.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Int(n) => Some(n as f64),
            Value::UInt(n) => Some(n as f64),
            Value::F32(f) => Some(f.into()),
            Value::F64(f) => Some(f),
            _ => None
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bin(b) => Some(b),
            _ => None
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(a) => Some(a),
            _ => None
        }
    }

    pub fn as_map(&self) -> Option<&[(Value, Value)]> {
        match self {
            Value::Map(m) => Some(m),
            _ => None
        }
    }

    /// Look up the last entry with a string key equal to `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_map()?
            .iter()
            .rev()
            .find(|(k, _)| k.as_str() == Some(key))
            .map(|(_, v)| v)
    }

    /// Deserialize a typed value from this one.
    pub fn deserialize_into<T>(self) -> Result<T>
        where T: de::DeserializeOwned
    {
        T::deserialize(self)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

macro_rules! value_from_signed {
    ($($ty:ty),*) => {$(
        impl From<$ty> for Value {
            fn from(n: $ty) -> Self {
                Value::Int(n.into())
            }
        }
    )*};
}

macro_rules! value_from_unsigned {
    ($($ty:ty),*) => {$(
        impl From<$ty> for Value {
            fn from(n: $ty) -> Self {
                let n = u64::from(n);
                i64::try_from(n).map(Value::Int).unwrap_or(Value::UInt(n))
            }
        }
    )*};
}

value_from_signed!(i8, i16, i32, i64);
value_from_unsigned!(u8, u16, u32, u64);

impl From<f32> for Value {
    fn from(f: f32) -> Self {
        Value::F32(f)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::F64(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<&[u8]> for Value {
    fn from(b: &[u8]) -> Self {
        Value::Bin(b.into())
    }
}

impl From<Vec<Value>> for Value {
    fn from(a: Vec<Value>) -> Self {
        Value::Array(a)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Nil, Into::into)
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("any MessagePack value")
    }

    fn visit_unit<E>(self) -> core::result::Result<Value, E> {
        Ok(Value::Nil)
    }

    fn visit_none<E>(self) -> core::result::Result<Value, E> {
        Ok(Value::Nil)
    }

    fn visit_some<D>(self, deserializer: D) -> core::result::Result<Value, D::Error>
        where D: de::Deserializer<'de>
    {
        Value::deserialize(deserializer)
    }

    fn visit_newtype_struct<D>(self, deserializer: D) -> core::result::Result<Value, D::Error>
        where D: de::Deserializer<'de>
    {
        Value::deserialize(deserializer)
    }

    fn visit_bool<E>(self, v: bool) -> core::result::Result<Value, E> {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E>(self, v: i64) -> core::result::Result<Value, E> {
        Ok(Value::Int(v))
    }

    fn visit_u64<E>(self, v: u64) -> core::result::Result<Value, E> {
        Ok(v.into())
    }

    fn visit_f32<E>(self, v: f32) -> core::result::Result<Value, E> {
        Ok(Value::F32(v))
    }

    fn visit_f64<E>(self, v: f64) -> core::result::Result<Value, E> {
        Ok(Value::F64(v))
    }

    fn visit_str<E>(self, v: &str) -> core::result::Result<Value, E> {
        Ok(v.into())
    }

    fn visit_string<E>(self, v: String) -> core::result::Result<Value, E> {
        Ok(Value::Str(v))
    }

    fn visit_bytes<E>(self, v: &[u8]) -> core::result::Result<Value, E> {
        Ok(v.into())
    }

    fn visit_byte_buf<E>(self, v: Vec<u8>) -> core::result::Result<Value, E> {
        Ok(Value::Bin(v))
    }

    fn visit_seq<A>(self, mut access: A) -> core::result::Result<Value, A::Error>
        where A: SeqAccess<'de>
    {
        let mut items = Vec::with_capacity(access.size_hint().unwrap_or(0).min(MAX_PREALLOC));
        while let Some(item) = access.next_element()? {
            items.push(item);
        }
        Ok(Value::Array(items))
    }

    fn visit_map<A>(self, mut access: A) -> core::result::Result<Value, A::Error>
        where A: MapAccess<'de>
    {
        let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0).min(MAX_PREALLOC));
        while let Some(entry) = access.next_entry()? {
            entries.push(entry);
        }
        Ok(Value::Map(entries))
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> core::result::Result<Value, D::Error>
        where D: de::Deserializer<'de>
    {
        deserializer.deserialize_any(ValueVisitor)
    }
}

impl<'de> IntoDeserializer<'de, Error> for Value {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self {
        self
    }
}

impl<'de> de::Deserializer<'de> for Value {
    type Error = Error;

    fn is_human_readable(&self) -> bool {
        false
    }

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value>
        where V: Visitor<'de>
    {
        match self {
            Value::Nil => visitor.visit_unit(),
            Value::Bool(b) => visitor.visit_bool(b),
            Value::Int(n) => visitor.visit_i64(n),
            Value::UInt(n) => visitor.visit_u64(n),
            Value::F32(f) => visitor.visit_f32(f),
            Value::F64(f) => visitor.visit_f64(f),
            Value::Str(s) => visitor.visit_string(s),
            Value::Bin(b) => visitor.visit_byte_buf(b),
            Value::Array(items) => {
                let mut access = SeqDeserializer::new(items.into_iter());
                let value = visitor.visit_seq(&mut access)?;
                access.end()?;
                Ok(value)
            }
            Value::Map(entries) => {
                let mut access = MapDeserializer::new(entries.into_iter());
                let value = visitor.visit_map(&mut access)?;
                access.end()?;
                Ok(value)
            }
        }
    }

    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value>
        where V: Visitor<'de>
    {
        match self {
            Value::Nil => visitor.visit_none(),
            value => visitor.visit_some(value)
        }
    }

    fn deserialize_newtype_struct<V>(self, _name: &'static str, visitor: V) -> Result<V::Value>
        where V: Visitor<'de>
    {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value>
        where V: Visitor<'de>
    {
        match self {
            Value::Str(variant) => visitor.visit_enum(variant.into_deserializer()),
            value => value.deserialize_any(visitor)
        }
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf unit unit_struct seq tuple
        tuple_struct map struct identifier ignored_any
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;
    use serde::Deserialize;
    use crate::de::{from_slice, Decoder};
    use super::*;

    #[test]
    fn test_de_value_scalars() {
        assert_eq!(from_slice::<Value>(b"\xC0"), Ok(Value::Nil));
        assert_eq!(from_slice::<Value>(b"\xC3"), Ok(Value::Bool(true)));
        assert_eq!(from_slice::<Value>(b"\x05"), Ok(Value::Int(5)));
        assert_eq!(from_slice::<Value>(b"\xE0"), Ok(Value::Int(-32)));
        assert_eq!(from_slice::<Value>(b"\xCC\xFF"), Ok(Value::Int(255)));
        assert_eq!(from_slice::<Value>(b"\xD1\xFF\x00"), Ok(Value::Int(-256)));
        assert_eq!(from_slice::<Value>(b"\xCF\x7F\xFF\xFF\xFF\xFF\xFF\xFF\xFF"), Ok(Value::Int(i64::MAX)));
        assert_eq!(from_slice::<Value>(b"\xCF\xFF\xFF\xFF\xFF\xFF\xFF\xFF\xFF"), Ok(Value::UInt(u64::MAX)));
        assert_eq!(from_slice::<Value>(b"\xCA\xC0\x20\x00\x00"), Ok(Value::F32(-2.5)));
        assert_eq!(from_slice::<Value>(b"\xCB\x40\x04\x00\x00\x00\x00\x00\x00"), Ok(Value::F64(2.5)));
        assert_eq!(from_slice::<Value>(b"\xA3abc"), Ok(Value::Str("abc".into())));
        assert_eq!(from_slice::<Value>(b"\xC4\x02\x00\xFF"), Ok(Value::Bin(vec![0, 0xff])));
        // error
        assert_eq!(from_slice::<Value>(b""), Err(Error::UnexpectedEof { offset: 0, needed: 1 }));
        assert_eq!(from_slice::<Value>(b"\xC1"), Err(Error::ReservedCode));
        assert_eq!(from_slice::<Value>(b"\xD4\x01\x00"), Err(Error::UnsupportedExt { code: 0xd4 }));
        assert_eq!(from_slice::<Value>(b"\xA2a"), Err(Error::UnexpectedEof { offset: 1, needed: 2 }));
    }

    #[test]
    fn test_de_value_nested() {
        let value = from_slice::<Value>(b"\x82\xA1a\x93\x01\xC0\xA1x\xA1b\x81\x02\xC2").unwrap();
        assert_eq!(value, Value::Map(vec![
            ("a".into(), Value::Array(vec![1.into(), Value::Nil, "x".into()])),
            ("b".into(), Value::Map(vec![(2.into(), false.into())])),
        ]));
        assert_eq!(value.get("a").and_then(Value::as_array).map(<[Value]>::len), Some(3));
        assert_eq!(value.get("c"), None);
        // wire order is kept, duplicates included
        let value = from_slice::<Value>(b"\x82\xA1k\x01\xA1k\x02").unwrap();
        assert_eq!(value.as_map().unwrap().len(), 2);
        assert_eq!(value.get("k"), Some(&Value::Int(2)));
    }

    #[test]
    fn test_de_value_depth() {
        let mut input = vec![0x91; 10];
        input.push(0xC0);
        assert!(Decoder::new().max_depth(10).decode::<Value>(&input).is_ok());
        assert_eq!(Decoder::new().max_depth(9).decode::<Value>(&input),
                   Err(Error::DepthExceeded { max_depth: 9 }));
    }

    #[test]
    fn test_value_into_typed() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Point {
            x: i32,
            y: Option<u8>,
            tag: String,
        }
        let positional = Value::Array(vec![(-3).into(), Value::Nil, "p".into()]);
        assert_eq!(positional.deserialize_into(),
                   Ok(Point { x: -3, y: None, tag: "p".into() }));
        let named = Value::Map(vec![
            ("tag".into(), "q".into()),
            ("x".into(), 7u8.into()),
            ("y".into(), 9u8.into()),
        ]);
        assert_eq!(named.deserialize_into(),
                   Ok(Point { x: 7, y: Some(9), tag: "q".into() }));
        assert!(Value::Array(vec![1.into()]).deserialize_into::<Point>().is_err());
        assert_eq!(Value::UInt(u64::MAX).deserialize_into::<u64>(), Ok(u64::MAX));
        assert!(Value::Int(-1).deserialize_into::<u8>().is_err());

        #[derive(Debug, Deserialize, PartialEq)]
        enum Mode { Fast, Slow }
        assert_eq!(Value::from("Slow").deserialize_into(), Ok(Mode::Slow));
    }

    #[test]
    fn test_value_accessors() {
        assert!(Value::Nil.is_nil());
        assert_eq!(Value::from(true).as_bool(), Some(true));
        assert_eq!(Value::from(300u16), Value::Int(300));
        assert_eq!(Value::from(u64::MAX).as_u64(), Some(u64::MAX));
        assert_eq!(Value::from(-1i8).as_u64(), None);
        assert_eq!(Value::from(1.5f32).as_f64(), Some(1.5));
        assert_eq!(Value::from(&b"ab"[..]).as_bytes(), Some(&b"ab"[..]));
        assert_eq!(Value::from(None::<u8>), Value::Nil);
        assert_eq!(Value::from(Some("s")).as_str(), Some("s"));
    }
}
