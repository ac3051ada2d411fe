//! A deserializer producing the zero value of whatever type asks for it.
//!
//! Used to fill the slots of fixed size targets the wire left unpopulated.
use serde::de::{self, DeserializeSeed, MapAccess, SeqAccess, Visitor};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy)]
pub(crate) struct Zero;

macro_rules! zero_numbers {
    ($($method:ident => $visit:ident($zero:expr)),*) => {$(
        fn $method<V>(self, visitor: V) -> Result<V::Value>
            where V: Visitor<'de>
        {
            visitor.$visit($zero)
        }
    )*};
}

impl<'de> de::Deserializer<'de> for Zero {
    type Error = Error;

    fn is_human_readable(&self) -> bool {
        false
    }

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value>
        where V: Visitor<'de>
    {
        visitor.visit_unit()
    }

    zero_numbers! {
        deserialize_bool => visit_bool(false),
        deserialize_i8 => visit_i8(0),
        deserialize_i16 => visit_i16(0),
        deserialize_i32 => visit_i32(0),
        deserialize_i64 => visit_i64(0),
        deserialize_u8 => visit_u8(0),
        deserialize_u16 => visit_u16(0),
        deserialize_u32 => visit_u32(0),
        deserialize_u64 => visit_u64(0),
        deserialize_f32 => visit_f32(0.0),
        deserialize_f64 => visit_f64(0.0),
        deserialize_char => visit_char('\0'),
        deserialize_str => visit_borrowed_str(""),
        deserialize_string => visit_borrowed_str(""),
        deserialize_bytes => visit_borrowed_bytes(&[]),
        deserialize_byte_buf => visit_borrowed_bytes(&[])
    }

    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value>
        where V: Visitor<'de>
    {
        visitor.visit_none()
    }

    fn deserialize_unit<V>(self, visitor: V) -> Result<V::Value>
        where V: Visitor<'de>
    {
        visitor.visit_unit()
    }

    fn deserialize_unit_struct<V>(self, _name: &'static str, visitor: V) -> Result<V::Value>
        where V: Visitor<'de>
    {
        visitor.visit_unit()
    }

    fn deserialize_newtype_struct<V>(self, _name: &'static str, visitor: V) -> Result<V::Value>
        where V: Visitor<'de>
    {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V>(self, visitor: V) -> Result<V::Value>
        where V: Visitor<'de>
    {
        visitor.visit_seq(ZeroAccess::new(0))
    }

    fn deserialize_tuple<V>(self, len: usize, visitor: V) -> Result<V::Value>
        where V: Visitor<'de>
    {
        visitor.visit_seq(ZeroAccess::new(len))
    }

    fn deserialize_tuple_struct<V>(self, _name: &'static str, len: usize, visitor: V) -> Result<V::Value>
        where V: Visitor<'de>
    {
        visitor.visit_seq(ZeroAccess::new(len))
    }

    fn deserialize_map<V>(self, visitor: V) -> Result<V::Value>
        where V: Visitor<'de>
    {
        visitor.visit_map(ZeroAccess::new(0))
    }

    fn deserialize_struct<V>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value>
        where V: Visitor<'de>
    {
        visitor.visit_seq(ZeroAccess::new(fields.len()))
    }

    fn deserialize_enum<V>(
        self,
        name: &'static str,
        _variants: &'static [&'static str],
        _visitor: V,
    ) -> Result<V::Value>
        where V: Visitor<'de>
    {
        Err(de::Error::custom(format_args!("enum {} has no zero value", name)))
    }

    fn deserialize_identifier<V>(self, _visitor: V) -> Result<V::Value>
        where V: Visitor<'de>
    {
        Err(de::Error::custom("an identifier has no zero value"))
    }

    fn deserialize_ignored_any<V>(self, visitor: V) -> Result<V::Value>
        where V: Visitor<'de>
    {
        visitor.visit_unit()
    }
}

/// Yields `remaining` zero values as sequence elements or map entries.
pub(crate) struct ZeroAccess {
    remaining: usize,
}

impl ZeroAccess {
    pub(crate) fn new(remaining: usize) -> Self {
        ZeroAccess { remaining }
    }
}

impl<'de> SeqAccess<'de> for ZeroAccess {
    type Error = Error;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>>
        where T: DeserializeSeed<'de>
    {
        if self.remaining == 0 {
            return Ok(None)
        }
        self.remaining -= 1;
        seed.deserialize(Zero).map(Some)
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.remaining)
    }
}

impl<'de> MapAccess<'de> for ZeroAccess {
    type Error = Error;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>>
        where K: DeserializeSeed<'de>
    {
        if self.remaining == 0 {
            return Ok(None)
        }
        self.remaining -= 1;
        seed.deserialize(Zero).map(Some)
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value>
        where V: DeserializeSeed<'de>
    {
        seed.deserialize(Zero)
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.remaining)
    }
}
