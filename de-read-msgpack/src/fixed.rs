//! Fast paths for a handful of fixed container shapes.
//!
//! Sequences of integers or strings and string keyed maps of integers or
//! strings are decoded here without dispatching every element through the
//! generic engine. Results are identical to the generic path.
//!
//! Use the modules with `#[serde(with = ...)]`:
//!
//! ```
//! use std::collections::BTreeMap;
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct Scores {
//!     #[serde(with = "de_read_msgpack::fixed::str_int_map")]
//!     points: BTreeMap<String, i64>,
//!     #[serde(with = "de_read_msgpack::fixed::int_seq")]
//!     history: Vec<i64>,
//! }
//!
//! let scores: Scores = de_read_msgpack::from_slice(
//!     b"\x82\xA6points\x81\xA3ann\x05\xA7history\x92\x01\x02").unwrap();
//! assert_eq!(scores.points["ann"], 5);
//! assert_eq!(scores.history, [1, 2]);
//! ```
//!
//! or the `Fixed*` newtypes. Other deserializers see a plain newtype struct
//! and decode the generic way.
use alloc::{collections::BTreeMap, string::String, vec::Vec};
use core::{fmt, marker::PhantomData};

use serde::de::{self, DeserializeSeed, MapAccess, SeqAccess, Visitor, Deserialize, Deserializer as _};
use serde::de::value::{BorrowedStrDeserializer, I64Deserializer};

use crate::de::Deserializer;
use crate::error::{Error, Result};
use crate::magick;

const INT_SEQ: &str = "$de_read_msgpack::fixed::IntSeq";
const STR_SEQ: &str = "$de_read_msgpack::fixed::StrSeq";
const STR_INT_MAP: &str = "$de_read_msgpack::fixed::StrIntMap";
const STR_STR_MAP: &str = "$de_read_msgpack::fixed::StrStrMap";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Scalar {
    Int,
    Str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Shape {
    Seq(Scalar),
    Map(Scalar, Scalar),
}

impl Shape {
    pub(crate) fn from_name(name: &str) -> Option<Shape> {
        match name {
            INT_SEQ => Some(Shape::Seq(Scalar::Int)),
            STR_SEQ => Some(Shape::Seq(Scalar::Str)),
            STR_INT_MAP => Some(Shape::Map(Scalar::Str, Scalar::Int)),
            STR_STR_MAP => Some(Shape::Map(Scalar::Str, Scalar::Str)),
            _ => None
        }
    }
}

/// Decode a fixed shape, falling back to the generic path for anything
/// but a plain array or map header.
pub(crate) fn deserialize_fixed<'de, V>(de: &mut Deserializer<'de>, shape: Shape, visitor: V) -> Result<V::Value>
    where V: Visitor<'de>
{
    let code = de.peek()?;
    match shape {
        Shape::Seq(elem) if magick::is_array(code) => {
            de.nested(|de| {
                let len = de.parse_array_len()?;
                let mut access = FixedAccess { de, remaining: len, key: elem, value: elem };
                let value = visitor.visit_seq(&mut access)?;
                access.finish()?;
                Ok(value)
            })
        }
        Shape::Map(key, value) if magick::is_map(code) => {
            de.nested(|de| {
                let len = de.parse_map_len()?;
                let mut access = FixedAccess { de, remaining: len, key, value };
                let value = visitor.visit_map(&mut access)?;
                access.finish()?;
                Ok(value)
            })
        }
        Shape::Seq(..) => (&mut *de).deserialize_seq(visitor),
        Shape::Map(..) => (&mut *de).deserialize_map(visitor),
    }
}

struct FixedAccess<'a, 'de: 'a> {
    de: &'a mut Deserializer<'de>,
    remaining: usize,
    key: Scalar,
    value: Scalar,
}

impl<'de> FixedAccess<'_, 'de> {
    fn scalar<T>(&mut self, scalar: Scalar, seed: T) -> Result<T::Value>
        where T: DeserializeSeed<'de>
    {
        match scalar {
            Scalar::Int => {
                let n: i64 = self.de.parse_integer()?;
                seed.deserialize(I64Deserializer::<Error>::new(n))
            }
            Scalar::Str => {
                let s = self.de.parse_str()?;
                seed.deserialize(BorrowedStrDeserializer::<Error>::new(s))
            }
        }
    }

    fn finish(&self) -> Result<()> {
        if self.remaining != 0 {
            return Err(Error::TrailingElements)
        }
        Ok(())
    }
}

impl<'de> SeqAccess<'de> for FixedAccess<'_, 'de> {
    type Error = Error;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>>
        where T: DeserializeSeed<'de>
    {
        if self.remaining == 0 {
            return Ok(None)
        }
        self.remaining -= 1;
        self.scalar(self.value, seed).map(Some)
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.remaining)
    }
}

impl<'de> MapAccess<'de> for FixedAccess<'_, 'de> {
    type Error = Error;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>>
        where K: DeserializeSeed<'de>
    {
        if self.remaining == 0 {
            return Ok(None)
        }
        self.remaining -= 1;
        self.scalar(self.key, seed).map(Some)
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value>
        where V: DeserializeSeed<'de>
    {
        self.scalar(self.value, seed)
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.remaining)
    }
}

struct SeqVisitor<C, T>(PhantomData<(C, T)>);

impl<'de, C, T> Visitor<'de> for SeqVisitor<C, T>
    where C: Default + Extend<T>,
          T: Deserialize<'de>
{
    type Value = C;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a sequence")
    }

    fn visit_newtype_struct<D>(self, deserializer: D) -> core::result::Result<C, D::Error>
        where D: de::Deserializer<'de>
    {
        deserializer.deserialize_seq(self)
    }

    fn visit_unit<E>(self) -> core::result::Result<C, E> {
        Ok(C::default())
    }

    fn visit_seq<A>(self, mut access: A) -> core::result::Result<C, A::Error>
        where A: SeqAccess<'de>
    {
        let mut items = C::default();
        while let Some(item) = access.next_element()? {
            items.extend(Some(item));
        }
        Ok(items)
    }
}

struct MapVisitor<C, K, V>(PhantomData<(C, K, V)>);

impl<'de, C, K, V> Visitor<'de> for MapVisitor<C, K, V>
    where C: Default + Extend<(K, V)>,
          K: Deserialize<'de>,
          V: Deserialize<'de>
{
    type Value = C;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a map")
    }

    fn visit_newtype_struct<D>(self, deserializer: D) -> core::result::Result<C, D::Error>
        where D: de::Deserializer<'de>
    {
        deserializer.deserialize_map(self)
    }

    fn visit_unit<E>(self) -> core::result::Result<C, E> {
        Ok(C::default())
    }

    fn visit_map<A>(self, mut access: A) -> core::result::Result<C, A::Error>
        where A: MapAccess<'de>
    {
        let mut entries = C::default();
        while let Some(entry) = access.next_entry()? {
            entries.extend(Some(entry));
        }
        Ok(entries)
    }
}

macro_rules! fixed_seq {
    ($module:ident, $name:ident, $elem:ty, $newtype:ident) => {
        #[doc = concat!("Fast path for sequences of `", stringify!($elem), "`.")]
        pub mod $module {
            use super::*;

            pub fn deserialize<'de, D, C>(deserializer: D) -> core::result::Result<C, D::Error>
                where D: de::Deserializer<'de>,
                      C: Default + Extend<$elem>
            {
                deserializer.deserialize_newtype_struct($name, SeqVisitor::<C, $elem>(PhantomData))
            }
        }

        #[doc = concat!("A `Vec<", stringify!($elem), ">` decoded by the [`", stringify!($module), "`] fast path.")]
        #[derive(Debug, Default, Clone, PartialEq, Eq)]
        pub struct $newtype(pub Vec<$elem>);

        impl<'de> Deserialize<'de> for $newtype {
            fn deserialize<D>(deserializer: D) -> core::result::Result<Self, D::Error>
                where D: de::Deserializer<'de>
            {
                $module::deserialize(deserializer).map($newtype)
            }
        }
    };
}

macro_rules! fixed_map {
    ($module:ident, $name:ident, $value:ty, $newtype:ident) => {
        #[doc = concat!("Fast path for string keyed maps of `", stringify!($value), "`.")]
        pub mod $module {
            use super::*;

            pub fn deserialize<'de, D, C>(deserializer: D) -> core::result::Result<C, D::Error>
                where D: de::Deserializer<'de>,
                      C: Default + Extend<(String, $value)>
            {
                deserializer.deserialize_newtype_struct($name, MapVisitor::<C, String, $value>(PhantomData))
            }
        }

        #[doc = concat!("A `BTreeMap<String, ", stringify!($value), ">` decoded by the [`", stringify!($module), "`] fast path.")]
        #[derive(Debug, Default, Clone, PartialEq, Eq)]
        pub struct $newtype(pub BTreeMap<String, $value>);

        impl<'de> Deserialize<'de> for $newtype {
            fn deserialize<D>(deserializer: D) -> core::result::Result<Self, D::Error>
                where D: de::Deserializer<'de>
            {
                $module::deserialize(deserializer).map($newtype)
            }
        }
    };
}

fixed_seq!(int_seq, INT_SEQ, i64, FixedIntSeq);
fixed_seq!(str_seq, STR_SEQ, String, FixedStrSeq);
fixed_map!(str_int_map, STR_INT_MAP, i64, FixedStrIntMap);
fixed_map!(str_str_map, STR_STR_MAP, String, FixedStrStrMap);
