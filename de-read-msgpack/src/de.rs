//! MessagePack serde deserializer
use alloc::{vec, vec::Vec};
use core::hash::{Hash, Hasher};
use core::slice;

use de_read::{BigEndian, DeRead};
use serde::de::{self, Visitor, SeqAccess, MapAccess, DeserializeSeed, Unexpected};
use serde::de::value::BorrowedStrDeserializer;
use serde::forward_to_deserialize_any;
use tracing::{debug, trace};

use crate::error::{Error, Expected, Result};
use crate::ext::ExtDecoder;
use crate::fixed::{self, Shape};
use crate::magick::*;
use crate::options::{DecodeOptions, StructMode};
use crate::value::Value;
use crate::zero::{Zero, ZeroAccess};

/// Deserialize an instance of type `T` from a slice of bytes in a MessagePack format.
///
/// Structs are expected as maps keyed by field names. The whole input must be
/// consumed by a single MessagePack value, otherwise `Error::SizeMismatch` is returned.
///
/// Any `&str` or `&[u8]` in the returned type will contain references to the provided slice.
pub fn from_slice<'a, T>(input: &'a[u8]) -> Result<T>
    where T: de::Deserialize<'a>
{
    Decoder::new().decode(input)
}

/// Like [`from_slice`] but structs are expected as arrays of fields in declaration order.
pub fn from_slice_positional<'a, T>(input: &'a[u8]) -> Result<T>
    where T: de::Deserialize<'a>
{
    Decoder::new().positional().decode(input)
}

/// Deserialize an instance of type `T` from a slice of bytes in a MessagePack format.
///
/// Return a tuple with `(value, tail)`, where `tail` is the tail of the input beginning
/// at the byte following the last byte of the serialized data.
///
/// Any `&str` or `&[u8]` in the returned type will contain references to the provided slice.
pub fn from_slice_split_tail<'a, T>(input: &'a[u8]) -> Result<(T, &'a[u8])>
    where T: de::Deserialize<'a>
{
    Decoder::new().decode_split_tail(input)
}

/// Populate `dest` from a MessagePack `input` with structs laid out by `mode`.
///
/// `dest` is only assigned when the whole input decodes successfully.
pub fn decode_into<'a, T>(input: &'a[u8], dest: &mut T, mode: StructMode) -> Result<()>
    where T: de::Deserialize<'a>
{
    Decoder::new().struct_mode(mode).decode_into(input, dest)
}

/// A reusable, immutable decode configuration.
///
/// ```
/// use de_read_msgpack::{Decoder, Timestamp, TimestampDecoder};
///
/// let decoder = Decoder::new().positional().extension(TimestampDecoder);
/// let (id, at): (u8, Timestamp) = decoder.decode(b"\x92\x01\xD6\xFF\x00\x00\x00\x02").unwrap();
/// assert_eq!(id, 1);
/// assert_eq!(at, Timestamp { secs: 2, nanos: 0 });
/// ```
#[derive(Debug, Clone, Default)]
pub struct Decoder {
    options: DecodeOptions,
}

impl Decoder {
    pub fn new() -> Self {
        Decoder::default()
    }

    pub fn with_options(options: DecodeOptions) -> Self {
        Decoder { options }
    }

    pub fn options(&self) -> &DecodeOptions {
        &self.options
    }
    /// Structs are MessagePack arrays.
    pub fn positional(self) -> Self {
        self.struct_mode(StructMode::Positional)
    }
    /// Structs are MessagePack maps.
    pub fn named(self) -> Self {
        self.struct_mode(StructMode::Named)
    }

    pub fn struct_mode(mut self, mode: StructMode) -> Self {
        self.options.struct_mode = mode;
        self
    }

    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.options.max_depth = max_depth;
        self
    }
    /// Register an extension decoder after the ones already registered.
    pub fn extension<E: ExtDecoder + 'static>(mut self, coder: E) -> Self {
        self.options.extensions.push(coder);
        self
    }
    /// Decode a value spanning the whole `input`.
    pub fn decode<'a, T>(&self, input: &'a[u8]) -> Result<T>
        where T: de::Deserialize<'a>
    {
        let mut de = Deserializer::with_options(input, self.options.clone());
        let value = T::deserialize(&mut de)?;
        de.end()?;
        Ok(value)
    }
    /// Decode a value spanning the whole `input` into `dest`.
    pub fn decode_into<'a, T>(&self, input: &'a[u8], dest: &mut T) -> Result<()>
        where T: de::Deserialize<'a>
    {
        *dest = self.decode(input)?;
        Ok(())
    }
    /// Decode the first value in `input` and return it with the unparsed tail.
    pub fn decode_split_tail<'a, T>(&self, input: &'a[u8]) -> Result<(T, &'a[u8])>
        where T: de::Deserialize<'a>
    {
        let mut de = Deserializer::with_options(input, self.options.clone());
        let value = T::deserialize(&mut de)?;
        Ok((value, de.into_tail()))
    }
}

/// Serde MessagePack deserializer.
///
/// * deserializes data from a slice,
/// * deserializes borrowed references to `&str` and `&[u8]` types,
/// * deserializes structs from MessagePack maps or arrays, depending on [`StructMode`],
/// * deserializes enum variants and struct fields from MessagePack strings or integers,
/// * deserializes integers from any MessagePack integer type as long as the number fits,
/// * deserializes the zero value of scalars, sequences and maps from `nil`,
/// * rejects nesting deeper than the configured maximum.
pub struct Deserializer<'de> {
    input: &'de[u8],
    index: usize,
    depth: usize,
    options: DecodeOptions,
}

/// Some methods in a `Deserializer` object are made public to allow custom
/// manipulation of MessagePack encoded data for other purposes than simply
/// deserializing.
///
/// For example, splitting a stream of messages encoded with the MessagePack
/// format without fully decoding messages.
impl<'de> Deserializer<'de> {
    /// Create a new decoder instance with default options by providing a slice
    /// from which to deserialize messages.
    pub fn from_slice(input: &'de[u8]) -> Self {
        Deserializer::with_options(input, DecodeOptions::default())
    }

    pub fn with_options(input: &'de[u8], options: DecodeOptions) -> Self {
        Deserializer { input, index: 0, depth: 0, options }
    }

    pub fn options(&self) -> &DecodeOptions {
        &self.options
    }
    /// Return the offset of the next unparsed byte.
    #[inline]
    pub fn position(&self) -> usize {
        self.index
    }
    /// Consume [`Deserializer`] and check that the whole input was parsed.
    ///
    /// Otherwise return `Error::SizeMismatch`.
    pub fn end(self) -> Result<()> {
        let len = self.input.len();
        let consumed = self.index;
        if consumed != len {
            debug!(len, consumed, "MessagePack value does not span the whole input");
            return Err(Error::SizeMismatch { len, consumed })
        }
        Ok(())
    }
    /// Consume [`Deserializer`] and return the unparsed portion of the input slice.
    pub fn into_tail(self) -> &'de[u8] {
        self.input_ref()
    }
    /// Return the remaining number of unparsed bytes in the input slice.
    #[inline]
    pub fn remaining_len(&self) -> usize {
        self.input.len().saturating_sub(self.index)
    }
    /// Peek at the next byte code and return it on success, otherwise return
    /// `Err(Error::UnexpectedEof)` if there are no more unparsed bytes
    /// remaining in the input slice.
    #[inline]
    pub fn peek(&self) -> Result<u8> {
        Ok(self.input.peek_at(self.index)?)
    }
    /// Fetch the next byte from input or return an `Err::UnexpectedEof` error.
    pub fn fetch(&mut self) -> Result<u8> {
        let c = self.peek()?;
        self.index += 1;
        Ok(c)
    }
    /// Advance the input cursor by `len` bytes.
    ///
    /// Return `Err::UnexpectedEof` without moving the cursor when fewer than
    /// `len` bytes remain.
    #[inline]
    pub fn eat_some(&mut self, len: usize) -> Result<()> {
        self.split_input(len).map(drop)
    }
    /// Return a reference to the unparsed portion of the input slice.
    #[inline]
    pub fn input_ref(&self) -> &'de[u8] {
        self.input.get(self.index..).unwrap_or_default()
    }
    /// Return the next `len` bytes of the input with the lifetime of the
    /// original slice container and advance the cursor past them.
    ///
    /// The returned slice can be passed to `visit_borrowed_*` functions of a [`Visitor`].
    pub fn split_input(&mut self, len: usize) -> Result<&'de[u8]> {
        let (bytes, index) = self.input.read_slice(self.index, len)?;
        self.index = index;
        Ok(bytes)
    }

    fn fetch_be<N: BigEndian>(&mut self) -> Result<N> {
        let (n, index) = self.input.read_be::<N>(self.index)?;
        self.index = index;
        Ok(n)
    }
    /// Fail unless `len` items of at least `item_size` bytes could still follow.
    ///
    /// Every MessagePack value occupies at least one byte, so this rejects
    /// declared lengths the input can't possibly hold.
    fn check_len(&self, len: usize, item_size: usize) -> Result<()> {
        let needed = len.saturating_mul(item_size);
        if needed > self.remaining_len() {
            return Err(Error::UnexpectedEof { offset: self.index, needed })
        }
        Ok(())
    }
    /// Run `f` one nesting level deeper.
    pub(crate) fn nested<R, F>(&mut self, f: F) -> Result<R>
        where F: FnOnce(&mut Self) -> Result<R>
    {
        let max_depth = self.options.max_depth;
        if self.depth >= max_depth {
            debug!(max_depth, offset = self.index, "MessagePack nesting too deep");
            return Err(Error::DepthExceeded { max_depth })
        }
        self.depth += 1;
        let res = f(self);
        self.depth -= 1;
        res
    }
    /// Parse an array header and return the number of elements.
    pub fn parse_array_len(&mut self) -> Result<usize> {
        let len: usize = match self.fetch()? {
            c@(FIXARRAY..=FIXARRAY_MAX) => (c as usize) & MAX_FIXARRAY_SIZE,
            ARRAY_16 => self.fetch_be::<u16>()?.into(),
            ARRAY_32 => self.fetch_be::<u32>()?.try_into()?,
            c => return Err(Error::invalid_code(c, Expected::Array))
        };
        self.check_len(len, 1)?;
        Ok(len)
    }
    /// Parse a map header and return the number of entries.
    pub fn parse_map_len(&mut self) -> Result<usize> {
        let len: usize = match self.fetch()? {
            c@(FIXMAP..=FIXMAP_MAX) => (c as usize) & MAX_FIXMAP_SIZE,
            MAP_16 => self.fetch_be::<u16>()?.into(),
            MAP_32 => self.fetch_be::<u32>()?.try_into()?,
            c => return Err(Error::invalid_code(c, Expected::Map))
        };
        self.check_len(len, 2)?;
        Ok(len)
    }

    pub(crate) fn parse_str(&mut self) -> Result<&'de str> {
        let len: usize = match self.fetch()? {
            c@(FIXSTR..=FIXSTR_MAX) => (c as usize) & MAX_FIXSTR_SIZE,
            STR_8 => self.fetch_be::<u8>()?.into(),
            STR_16 => self.fetch_be::<u16>()?.into(),
            STR_32 => self.fetch_be::<u32>()?.try_into()?,
            NIL => 0,
            c => return Err(Error::invalid_code(c, Expected::String))
        };
        Ok(core::str::from_utf8(self.split_input(len)?)?)
    }

    /// The string at the cursor, leaving the cursor in place.
    fn peek_str(&self) -> Option<&'de str> {
        let input = self.input;
        let offset = self.index;
        let (len, offset): (usize, usize) = match input.peek_at(offset).ok()? {
            c@(FIXSTR..=FIXSTR_MAX) => ((c as usize) & MAX_FIXSTR_SIZE, offset + 1),
            STR_8 => input.read_be::<u8>(offset + 1).ok().map(|(n, o)| (usize::from(n), o))?,
            STR_16 => input.read_be::<u16>(offset + 1).ok().map(|(n, o)| (usize::from(n), o))?,
            STR_32 => {
                let (n, o) = input.read_be::<u32>(offset + 1).ok()?;
                (n.try_into().ok()?, o)
            }
            _ => return None
        };
        let (bytes, _) = input.read_slice(offset, len).ok()?;
        core::str::from_utf8(bytes).ok()
    }
    /// The unsigned integer at the cursor, leaving the cursor in place.
    fn peek_uint(&self) -> Option<u64> {
        let input = self.input;
        let offset = self.index + 1;
        match input.peek_at(self.index).ok()? {
            n@(MIN_POSFIXINT..=MAX_POSFIXINT) => Some(n.into()),
            UINT_8 => input.read_be::<u8>(offset).ok().map(|(n, _)| n.into()),
            UINT_16 => input.read_be::<u16>(offset).ok().map(|(n, _)| n.into()),
            UINT_32 => input.read_be::<u32>(offset).ok().map(|(n, _)| n.into()),
            UINT_64 => input.read_be::<u64>(offset).ok().map(|(n, _)| n),
            _ => None
        }
    }

    fn parse_bytes(&mut self) -> Result<&'de[u8]> {
        let len: usize = match self.fetch()? {
            c@(FIXSTR..=FIXSTR_MAX) => (c as usize) & MAX_FIXSTR_SIZE,
            BIN_8|STR_8 => self.fetch_be::<u8>()?.into(),
            BIN_16|STR_16 => self.fetch_be::<u16>()?.into(),
            BIN_32|STR_32 => self.fetch_be::<u32>()?.try_into()?,
            NIL => 0,
            c => return Err(Error::invalid_code(c, Expected::Bin))
        };
        self.split_input(len)
    }

    pub(crate) fn parse_integer<N>(&mut self) -> Result<N>
        where N: TryFrom<i8> + TryFrom<u8> +
                 TryFrom<i16> + TryFrom<u16> +
                 TryFrom<i32> + TryFrom<u32> +
                 TryFrom<i64> + TryFrom<u64>,
              Error: From<<N as TryFrom<i8>>::Error>,
              Error: From<<N as TryFrom<u8>>::Error>,
              Error: From<<N as TryFrom<i16>>::Error>,
              Error: From<<N as TryFrom<u16>>::Error>,
              Error: From<<N as TryFrom<i32>>::Error>,
              Error: From<<N as TryFrom<u32>>::Error>,
              Error: From<<N as TryFrom<i64>>::Error>,
              Error: From<<N as TryFrom<u64>>::Error>,
    {
        let n: N = match self.fetch()? {
            n@(MIN_POSFIXINT..=MAX_POSFIXINT|NEGFIXINT..=0xff) => {
                (n as i8).try_into()?
            }
            NIL => 0u8.try_into()?,
            UINT_8  => self.fetch_be::<u8>()?.try_into()?,
            UINT_16 => self.fetch_be::<u16>()?.try_into()?,
            UINT_32 => self.fetch_be::<u32>()?.try_into()?,
            UINT_64 => self.fetch_be::<u64>()?.try_into()?,
            INT_8   => self.fetch_be::<i8>()?.try_into()?,
            INT_16  => self.fetch_be::<i16>()?.try_into()?,
            INT_32  => self.fetch_be::<i32>()?.try_into()?,
            INT_64  => self.fetch_be::<i64>()?.try_into()?,
            c => return Err(Error::invalid_code(c, Expected::Integer))
        };
        Ok(n)
    }

    fn parse_f32(&mut self) -> Result<f32> {
        let f: f32 = match self.fetch()? {
            FLOAT_32 => self.fetch_be::<f32>()?,
            NIL => 0.0,
            n@(MIN_POSFIXINT..=MAX_POSFIXINT|NEGFIXINT..=0xff) => {
                (n as i8) as f32
            }
            UINT_8  => self.fetch_be::<u8>()?  as f32,
            UINT_16 => self.fetch_be::<u16>()? as f32,
            UINT_32 => self.fetch_be::<u32>()? as f32,
            UINT_64 => self.fetch_be::<u64>()? as f32,
            INT_8   => self.fetch_be::<i8>()?  as f32,
            INT_16  => self.fetch_be::<i16>()? as f32,
            INT_32  => self.fetch_be::<i32>()? as f32,
            INT_64  => self.fetch_be::<i64>()? as f32,
            c@FLOAT_64 => return Err(Error::invalid_code(c, Expected::Float32)),
            c => return Err(Error::invalid_code(c, Expected::Number))
        };
        Ok(f)
    }

    fn parse_f64(&mut self) -> Result<f64> {
        let f: f64 = match self.fetch()? {
            FLOAT_64 => self.fetch_be::<f64>()?,
            FLOAT_32 => self.fetch_be::<f32>()?.into(),
            NIL => 0.0,
            n@(MIN_POSFIXINT..=MAX_POSFIXINT|NEGFIXINT..=0xff) => {
                (n as i8).into()
            }
            UINT_8  => self.fetch_be::<u8>()?.into(),
            UINT_16 => self.fetch_be::<u16>()?.into(),
            UINT_32 => self.fetch_be::<u32>()?.into(),
            UINT_64 => self.fetch_be::<u64>()? as f64,
            INT_8   => self.fetch_be::<i8>()?.into(),
            INT_16  => self.fetch_be::<i16>()?.into(),
            INT_32  => self.fetch_be::<i32>()?.into(),
            INT_64  => self.fetch_be::<i64>()? as f64,
            c => return Err(Error::invalid_code(c, Expected::Number))
        };
        Ok(f)
    }
    /// Ask the registered extension decoders for the value at the cursor.
    fn decode_extension(&mut self) -> Result<Option<Value>> {
        let extensions = &self.options.extensions;
        if extensions.is_empty() {
            return Ok(None)
        }
        match extensions.decode(self.input, self.index)? {
            Some((value, index)) => {
                if index <= self.index || index > self.input.len() {
                    return Err(Error::InvalidLength)
                }
                self.index = index;
                Ok(Some(value))
            }
            None => Ok(None)
        }
    }

    /// Attempts to consume a single MessagePack message from the input without fully decoding its content.
    ///
    /// Return `Ok(())` on success or `Err(Error::UnexpectedEof)` if there was not enough data
    /// to fully decode a MessagePack item.
    ///
    /// Nested containers are skipped without recursion, so the nesting depth
    /// limit doesn't apply here.
    pub fn eat_message(&mut self) -> Result<()> {
        let mut pending: usize = 1;
        while pending != 0 {
            pending -= 1;
            let (skip, items): (usize, usize) = match self.fetch()? {
                NIL|
                FALSE|
                TRUE|
                MIN_POSFIXINT..=MAX_POSFIXINT|
                NEGFIXINT..=0xff => (0, 0),
                c@(FIXMAP..=FIXMAP_MAX) => (0, ((c as usize) & MAX_FIXMAP_SIZE) * 2),
                c@(FIXARRAY..=FIXARRAY_MAX) => (0, (c as usize) & MAX_FIXARRAY_SIZE),
                c@(FIXSTR..=FIXSTR_MAX) => ((c as usize) & MAX_FIXSTR_SIZE, 0),
                RESERVED => return Err(Error::ReservedCode),
                BIN_8|STR_8 => (self.fetch_be::<u8>()?.into(), 0),
                BIN_16|STR_16 => (self.fetch_be::<u16>()?.into(), 0),
                BIN_32|STR_32 => (self.fetch_be::<u32>()?.try_into()?, 0),
                EXT_8 => (1 + usize::from(self.fetch_be::<u8>()?), 0),
                EXT_16 => (1 + usize::from(self.fetch_be::<u16>()?), 0),
                EXT_32 => {
                    let len = usize::try_from(self.fetch_be::<u32>()?)?;
                    (len.checked_add(1).ok_or(Error::InvalidLength)?, 0)
                }
                FLOAT_32 => (4, 0),
                FLOAT_64 => (8, 0),
                UINT_8 => (1, 0),
                UINT_16 => (2, 0),
                UINT_32 => (4, 0),
                UINT_64 => (8, 0),
                INT_8 => (1, 0),
                INT_16 => (2, 0),
                INT_32 => (4, 0),
                INT_64 => (8, 0),
                FIXEXT_1 => (2, 0),
                FIXEXT_2 => (3, 0),
                FIXEXT_4 => (5, 0),
                FIXEXT_8 => (9, 0),
                FIXEXT_16 => (17, 0),
                ARRAY_16 => (0, self.fetch_be::<u16>()?.into()),
                ARRAY_32 => (0, self.fetch_be::<u32>()?.try_into()?),
                MAP_16 => (0, usize::from(self.fetch_be::<u16>()?) * 2),
                MAP_32 => {
                    let len = usize::try_from(self.fetch_be::<u32>()?)?;
                    (0, len.checked_mul(2).ok_or(Error::InvalidLength)?)
                }
            };
            self.eat_some(skip)?;
            pending = pending.checked_add(items).ok_or(Error::InvalidLength)?;
            self.check_len(pending, 1)?;
        }
        Ok(())
    }
}

impl<'de> de::Deserializer<'de> for &mut Deserializer<'de> {
    type Error = Error;

    fn is_human_readable(&self) -> bool {
        false
    }

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value>
        where V: Visitor<'de>
    {
        match self.peek()? {
            MIN_POSFIXINT..=MAX_POSFIXINT => self.deserialize_u8(visitor),
            FIXMAP..=FIXMAP_MAX => self.deserialize_map(visitor),
            FIXARRAY..=FIXARRAY_MAX => self.deserialize_seq(visitor),
            FIXSTR..=FIXSTR_MAX => self.deserialize_str(visitor),
            NIL => self.deserialize_unit(visitor),
            RESERVED => Err(Error::ReservedCode),
            FALSE|
            TRUE => self.deserialize_bool(visitor),
            BIN_8|
            BIN_16|
            BIN_32 => self.deserialize_bytes(visitor),
            code@(EXT_8|
                  EXT_16|
                  EXT_32|
                  FIXEXT_1..=FIXEXT_16) => {
                match self.decode_extension()? {
                    Some(value) => de::Deserializer::deserialize_any(value, visitor),
                    None => Err(Error::UnsupportedExt { code })
                }
            }
            FLOAT_32 => self.deserialize_f32(visitor),
            FLOAT_64 => self.deserialize_f64(visitor),
            UINT_8 => self.deserialize_u8(visitor),
            UINT_16 => self.deserialize_u16(visitor),
            UINT_32 => self.deserialize_u32(visitor),
            UINT_64 => self.deserialize_u64(visitor),
            INT_8 => self.deserialize_i8(visitor),
            INT_16 => self.deserialize_i16(visitor),
            INT_32 => self.deserialize_i32(visitor),
            INT_64 => self.deserialize_i64(visitor),
            STR_8|
            STR_16|
            STR_32 => self.deserialize_str(visitor),
            ARRAY_16|
            ARRAY_32 => self.deserialize_seq(visitor),
            MAP_16|
            MAP_32 => self.deserialize_map(visitor),
            NEGFIXINT..=0xff => self.deserialize_i8(visitor),
        }
    }

    fn deserialize_bool<V>(self, visitor: V) -> Result<V::Value>
        where V: Visitor<'de>
    {
        let boolean = match self.fetch()? {
            TRUE => true,
            FALSE|NIL => false,
            c => return Err(Error::invalid_code(c, Expected::Bool))
        };
        visitor.visit_bool(boolean)
    }

    fn deserialize_i8<V>(self, visitor: V) -> Result<V::Value>
        where V: Visitor<'de>
    {
        visitor.visit_i8(self.parse_integer()?)
    }

    fn deserialize_i16<V>(self, visitor: V) -> Result<V::Value>
        where V: Visitor<'de>
    {
        visitor.visit_i16(self.parse_integer()?)
    }

    fn deserialize_i32<V>(self, visitor: V) -> Result<V::Value>
        where V: Visitor<'de>
    {
        visitor.visit_i32(self.parse_integer()?)
    }

    fn deserialize_i64<V>(self, visitor: V) -> Result<V::Value>
        where V: Visitor<'de>
    {
        visitor.visit_i64(self.parse_integer()?)
    }

    fn deserialize_u8<V>(self, visitor: V) -> Result<V::Value>
        where V: Visitor<'de>
    {
        visitor.visit_u8(self.parse_integer()?)
    }

    fn deserialize_u16<V>(self, visitor: V) -> Result<V::Value>
        where V: Visitor<'de>
    {
        visitor.visit_u16(self.parse_integer()?)
    }

    fn deserialize_u32<V>(self, visitor: V) -> Result<V::Value>
        where V: Visitor<'de>
    {
        visitor.visit_u32(self.parse_integer()?)
    }

    fn deserialize_u64<V>(self, visitor: V) -> Result<V::Value>
        where V: Visitor<'de>
    {
        visitor.visit_u64(self.parse_integer()?)
    }

    fn deserialize_f32<V>(self, visitor: V) -> Result<V::Value>
        where V: Visitor<'de>
    {
        visitor.visit_f32(self.parse_f32()?)
    }

    fn deserialize_f64<V>(self, visitor: V) -> Result<V::Value>
        where V: Visitor<'de>
    {
        visitor.visit_f64(self.parse_f64()?)
    }

    fn deserialize_char<V>(self, visitor: V) -> Result<V::Value>
        where V: Visitor<'de>
    {
        if self.peek()? == NIL {
            self.index += 1;
            return visitor.visit_char('\0')
        }
        let mut chars = self.parse_str()?.chars();
        match (chars.next(), chars.next()) {
            (Some(ch), None) => visitor.visit_char(ch),
            _ => Err(Error::InvalidLength)
        }
    }

    fn deserialize_str<V>(self, visitor: V) -> Result<V::Value>
        where V: Visitor<'de>
    {
        visitor.visit_borrowed_str(self.parse_str()?)
    }

    fn deserialize_string<V>(self, visitor: V) -> Result<V::Value>
        where V: Visitor<'de>
    {
        self.deserialize_str(visitor)
    }

    fn deserialize_bytes<V>(self, visitor: V) -> Result<V::Value>
        where V: Visitor<'de>
    {
        visitor.visit_borrowed_bytes(self.parse_bytes()?)
    }

    fn deserialize_byte_buf<V>(self, visitor: V) -> Result<V::Value>
        where V: Visitor<'de>
    {
        self.deserialize_bytes(visitor)
    }

    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value>
        where V: Visitor<'de>
    {
        match self.peek()? {
            NIL => {
                self.index += 1;
                visitor.visit_none()
            }
            _ => visitor.visit_some(self)
        }
    }

    fn deserialize_unit<V>(self, visitor: V) -> Result<V::Value>
        where V: Visitor<'de>
    {
        match self.fetch()? {
            NIL => visitor.visit_unit(),
            c => Err(Error::invalid_code(c, Expected::Nil))
        }
    }

    fn deserialize_unit_struct<V>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value>
        where V: Visitor<'de>
    {
        self.deserialize_unit(visitor)
    }

    // Newtype structs are transparent, except for the reserved names of the
    // fixed shape fast paths.
    fn deserialize_newtype_struct<V>(
        self,
        name: &'static str,
        visitor: V,
    ) -> Result<V::Value>
        where V: Visitor<'de>
    {
        match Shape::from_name(name) {
            Some(shape) => fixed::deserialize_fixed(self, shape, visitor),
            None => visitor.visit_newtype_struct(self)
        }
    }

    fn deserialize_seq<V>(self, visitor: V) -> Result<V::Value>
        where V: Visitor<'de>
    {
        match self.peek()? {
            NIL => {
                self.index += 1;
                visitor.visit_seq(ZeroAccess::new(0))
            }
            c if is_bin(c) || is_str(c) => {
                let bytes = self.parse_bytes()?;
                let mut access = BytesAccess::new(c, bytes, 0);
                let value = visitor.visit_seq(&mut access)?;
                access.finish()?;
                Ok(value)
            }
            _ => self.nested(|de| {
                let len = de.parse_array_len()?;
                let mut access = CountingAccess::new(de, len);
                let value = visitor.visit_seq(&mut access)?;
                access.finish()?;
                Ok(value)
            })
        }
    }

    fn deserialize_tuple<V>(self, len: usize, visitor: V) -> Result<V::Value>
        where V: Visitor<'de>
    {
        match self.peek()? {
            NIL => {
                self.index += 1;
                visitor.visit_seq(ZeroAccess::new(len))
            }
            c if is_bin(c) || is_str(c) => {
                let bytes = self.parse_bytes()?;
                let padding = len.checked_sub(bytes.len())
                    .ok_or(Error::CapacityExceeded { capacity: len, len: bytes.len() })?;
                let mut access = BytesAccess::new(c, bytes, padding);
                let value = visitor.visit_seq(&mut access)?;
                access.finish()?;
                Ok(value)
            }
            _ => self.nested(|de| {
                let wire_len = de.parse_array_len()?;
                let padding = len.checked_sub(wire_len)
                    .ok_or(Error::CapacityExceeded { capacity: len, len: wire_len })?;
                let mut access = CountingAccess::padded(de, wire_len, padding);
                let value = visitor.visit_seq(&mut access)?;
                access.finish()?;
                Ok(value)
            })
        }
    }

    fn deserialize_tuple_struct<V>(
        self,
        name: &'static str,
        len: usize,
        visitor: V,
    ) -> Result<V::Value>
        where V: Visitor<'de>
    {
        if let Some(value) = self.decode_extension()? {
            return de::Deserializer::deserialize_tuple_struct(value, name, len, visitor)
        }
        self.deserialize_tuple(len, visitor)
    }

    fn deserialize_map<V>(self, visitor: V) -> Result<V::Value>
        where V: Visitor<'de>
    {
        if self.peek()? == NIL {
            self.index += 1;
            return visitor.visit_map(ZeroAccess::new(0))
        }
        self.nested(|de| {
            let len = de.parse_map_len()?;
            let mut access = CountingAccess::new(de, len);
            let value = visitor.visit_map(&mut access)?;
            access.finish()?;
            Ok(value)
        })
    }

    fn deserialize_struct<V>(
        self,
        name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value>
        where V: Visitor<'de>
    {
        if let Some(value) = self.decode_extension()? {
            return de::Deserializer::deserialize_struct(value, name, fields, visitor)
        }
        match self.options.struct_mode {
            StructMode::Positional => self.nested(|de| {
                let len = de.parse_array_len()?;
                let padding = fields.len().saturating_sub(len);
                let mut access = CountingAccess::padded(de, len, padding);
                let value = visitor.visit_seq(&mut access)?;
                access.skip_rest()?;
                Ok(value)
            }),
            StructMode::Named => self.nested(|de| {
                let len = de.parse_map_len()?;
                let mut access = FieldsAccess::new(de, len, fields);
                let value = visitor.visit_map(&mut access)?;
                access.finish()?;
                Ok(value)
            })
        }
    }

    fn deserialize_enum<V>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value>
        where V: Visitor<'de>
    {
        if is_map(self.peek()?) {
            self.nested(|de| {
                if de.parse_map_len()? != 1 {
                    return Err(Error::InvalidLength)
                }
                visitor.visit_enum(VariantAccess { de })
            })
        }
        else {
            visitor.visit_enum(UnitVariantAccess { de: self })
        }
    }

    fn deserialize_identifier<V>(self, visitor: V) -> Result<V::Value>
        where V: Visitor<'de>
    {
        match self.peek()? {
            MIN_POSFIXINT..=MAX_POSFIXINT|
            UINT_8|
            UINT_16|
            UINT_32 => self.deserialize_u32(visitor),
            FIXSTR..=FIXSTR_MAX|
            STR_8|
            STR_16|
            STR_32  => self.deserialize_str(visitor),
            c => Err(Error::invalid_code(c, Expected::Identifier))
        }
    }

    fn deserialize_ignored_any<V>(self, visitor: V) -> Result<V::Value>
        where V: Visitor<'de>
    {
        self.eat_message()?;
        visitor.visit_unit()
    }
}

/// Hands out `count` wire elements followed by `padding` zero values.
struct CountingAccess<'a, 'de: 'a> {
    de: &'a mut Deserializer<'de>,
    count: usize,
    padding: usize,
}

impl<'a, 'de> CountingAccess<'a, 'de> {
    fn new(de: &'a mut Deserializer<'de>, count: usize) -> Self {
        CountingAccess::padded(de, count, 0)
    }

    fn padded(de: &'a mut Deserializer<'de>, count: usize, padding: usize) -> Self {
        CountingAccess { de, count, padding }
    }
    /// Wire elements left behind by the visitor are an error.
    fn finish(&self) -> Result<()> {
        if self.count != 0 {
            return Err(Error::TrailingElements)
        }
        Ok(())
    }
    /// Skip wire elements left behind by the visitor.
    fn skip_rest(&mut self) -> Result<()> {
        while self.count != 0 {
            self.count -= 1;
            self.de.eat_message()?;
        }
        Ok(())
    }
}

impl<'de> SeqAccess<'de> for CountingAccess<'_, 'de> {
    type Error = Error;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>>
        where T: DeserializeSeed<'de>
    {
        if self.count != 0 {
            self.count -= 1;
            return seed.deserialize(&mut *self.de).map(Some)
        }
        if self.padding != 0 {
            self.padding -= 1;
            return seed.deserialize(Zero).map(Some)
        }
        Ok(None)
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.count + self.padding)
    }
}

impl<'de> MapAccess<'de> for CountingAccess<'_, 'de> {
    type Error = Error;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>>
        where K: DeserializeSeed<'de>
    {
        if self.count != 0 {
            self.count -= 1;
            return seed.deserialize(&mut *self.de).map(Some)
        }
        Ok(None)
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value>
        where V: DeserializeSeed<'de>
    {
        seed.deserialize(&mut *self.de)
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.count)
    }
}

/// Entries of a map decoded into a struct with named fields.
///
/// Once the wire entries are exhausted, each declared field the map left out
/// is yielded with a zero value. Keys are told apart by the identity the
/// struct's field visitor resolves them to, so a field reachable under several
/// names (aliases) is never yielded twice.
struct FieldsAccess<'a, 'de: 'a> {
    de: &'a mut Deserializer<'de>,
    count: usize,
    fields: &'static [&'static str],
    /// Names carried by the wire or already zero filled
    named: Vec<bool>,
    /// Identities of the keys yielded so far
    claimed: Vec<u64>,
    filling: bool,
}

impl<'a, 'de> FieldsAccess<'a, 'de> {
    fn new(de: &'a mut Deserializer<'de>, count: usize, fields: &'static [&'static str]) -> Self {
        let named = vec![false; fields.len()];
        FieldsAccess { de, count, fields, named, claimed: Vec::new(), filling: false }
    }

    fn finish(&self) -> Result<()> {
        if self.count != 0 {
            return Err(Error::TrailingElements)
        }
        Ok(())
    }
    /// Note the declared name the key at the cursor spells, if any.
    fn note_wire_key(&mut self) {
        let index = match self.de.peek_str() {
            Some(name) => self.fields.iter().position(|&field| field == name),
            None => self.de.peek_uint()
                           .and_then(|n| usize::try_from(n).ok())
                           .filter(|&n| n < self.fields.len())
        };
        if let Some(index) = index {
            self.named[index] = true;
        }
    }
    /// Record the identity of a yielded key, `false` if it was already yielded.
    fn claim<K>(&mut self, key: &K) -> bool {
        let identity = key_identity(key);
        if self.claimed.contains(&identity) {
            return false
        }
        self.claimed.push(identity);
        true
    }
    /// Choose the next left out name to zero fill.
    ///
    /// Names of a single field are listed together in ascending order, so a
    /// name far from every populated one within its ascending run is the least
    /// likely to alias a populated field and goes first.
    fn next_missing(&self) -> Option<usize> {
        let mut best: Option<(usize, usize)> = None;
        for (index, _) in self.named.iter().enumerate().filter(|(_, named)| !**named) {
            let distance = self.distance_to_named(index);
            if best.map_or(true, |(_, best)| distance > best) {
                best = Some((index, distance));
            }
        }
        best.map(|(index, _)| index)
    }

    fn distance_to_named(&self, index: usize) -> usize {
        let fields = self.fields;
        let mut distance = usize::MAX;
        let mut lo = index;
        while lo > 0 && fields[lo - 1] < fields[lo] {
            lo -= 1;
            if self.named[lo] {
                distance = index - lo;
                break
            }
        }
        let mut hi = index;
        while hi + 1 < fields.len() && fields[hi] < fields[hi + 1] {
            hi += 1;
            if self.named[hi] {
                distance = distance.min(hi - index);
                break
            }
        }
        distance
    }
}

/// Which variant of a field identifier a key is.
fn key_identity<K>(key: &K) -> u64 {
    let mut hasher = IdentityHasher::default();
    core::mem::discriminant(key).hash(&mut hasher);
    hasher.finish()
}

/// FNV-1a
struct IdentityHasher(u64);

impl Default for IdentityHasher {
    fn default() -> Self {
        IdentityHasher(0xcbf2_9ce4_8422_2325)
    }
}

impl Hasher for IdentityHasher {
    fn write(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.0 = (self.0 ^ u64::from(byte)).wrapping_mul(0x0100_0000_01b3);
        }
    }

    fn finish(&self) -> u64 {
        self.0
    }
}

impl<'de> MapAccess<'de> for FieldsAccess<'_, 'de> {
    type Error = Error;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>>
        where K: DeserializeSeed<'de>
    {
        if self.count != 0 {
            self.count -= 1;
            self.note_wire_key();
            let key = seed.deserialize(&mut *self.de)?;
            self.claim(&key);
            return Ok(Some(key))
        }
        let index = match self.next_missing() {
            Some(index) => index,
            None => return Ok(None)
        };
        let name = self.fields[index];
        self.named[index] = true;
        self.filling = true;
        let key = seed.deserialize(BorrowedStrDeserializer::<Error>::new(name))?;
        if !self.claim(&key) {
            // an alias of a populated field, the map ends here and fields still
            // left out get the struct's own missing field handling
            trace!(key = name, "zero filling stopped at an alias");
            self.named.iter_mut().for_each(|named| *named = true);
            return Ok(None)
        }
        Ok(Some(key))
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value>
        where V: DeserializeSeed<'de>
    {
        if self.filling {
            return seed.deserialize(Zero)
        }
        seed.deserialize(&mut *self.de)
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.count)
    }
}

/// Bin or str payload seen as a sequence of `u8`, followed by `padding` zero values.
///
/// Elements other than `u8` are refused as if an array was expected.
struct BytesAccess<'de> {
    code: u8,
    bytes: slice::Iter<'de, u8>,
    padding: usize,
}

impl<'de> BytesAccess<'de> {
    fn new(code: u8, bytes: &'de[u8], padding: usize) -> Self {
        BytesAccess { code, bytes: bytes.iter(), padding }
    }

    fn finish(&self) -> Result<()> {
        if self.bytes.len() != 0 {
            return Err(Error::TrailingElements)
        }
        Ok(())
    }
}

impl<'de> SeqAccess<'de> for BytesAccess<'de> {
    type Error = Error;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>>
        where T: DeserializeSeed<'de>
    {
        if let Some(&byte) = self.bytes.next() {
            return seed.deserialize(ByteDeserializer { code: self.code, byte }).map(Some)
        }
        if self.padding != 0 {
            self.padding -= 1;
            return seed.deserialize(Zero).map(Some)
        }
        Ok(None)
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.bytes.len() + self.padding)
    }
}

struct ByteDeserializer {
    code: u8,
    byte: u8,
}

impl<'de> de::Deserializer<'de> for ByteDeserializer {
    type Error = Error;

    fn deserialize_any<V>(self, _visitor: V) -> Result<V::Value>
        where V: Visitor<'de>
    {
        Err(Error::invalid_code(self.code, Expected::Array))
    }

    fn deserialize_u8<V>(self, visitor: V) -> Result<V::Value>
        where V: Visitor<'de>
    {
        visitor.visit_u8(self.byte)
    }

    fn deserialize_ignored_any<V>(self, visitor: V) -> Result<V::Value>
        where V: Visitor<'de>
    {
        visitor.visit_unit()
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf option unit unit_struct newtype_struct seq tuple
        tuple_struct map struct enum identifier
    }
}

struct UnitVariantAccess<'a, 'de> {
    de: &'a mut Deserializer<'de>,
}

impl<'a, 'de> de::EnumAccess<'de> for UnitVariantAccess<'a, 'de> {
    type Error = Error;
    type Variant = Self;

    fn variant_seed<V>(self, seed: V) -> Result<(V::Value, Self)>
        where V: de::DeserializeSeed<'de>
    {
        let variant = seed.deserialize(&mut *self.de)?;
        Ok((variant, self))
    }
}

impl<'a, 'de> de::VariantAccess<'de> for UnitVariantAccess<'a, 'de> {
    type Error = Error;

    fn unit_variant(self) -> Result<()> {
        Ok(())
    }

    fn newtype_variant_seed<T>(self, _seed: T) -> Result<T::Value>
        where T: de::DeserializeSeed<'de>
    {
        Err(de::Error::invalid_type(Unexpected::UnitVariant, &"newtype variant"))
    }

    fn tuple_variant<V>(self, _len: usize, _visitor: V) -> Result<V::Value>
        where V: de::Visitor<'de>
    {
        Err(de::Error::invalid_type(Unexpected::UnitVariant, &"tuple variant"))
    }

    fn struct_variant<V>(self, _fields: &'static [&'static str], _visitor: V) -> Result<V::Value>
        where V: de::Visitor<'de>
    {
        Err(de::Error::invalid_type(Unexpected::UnitVariant, &"struct variant"))
    }
}

struct VariantAccess<'a, 'de> {
    de: &'a mut Deserializer<'de>,
}

impl<'a, 'de> de::EnumAccess<'de> for VariantAccess<'a, 'de> {
    type Error = Error;
    type Variant = Self;

    fn variant_seed<V>(self, seed: V) -> Result<(V::Value, Self)>
        where V: de::DeserializeSeed<'de>
    {
        let variant = seed.deserialize(&mut *self.de)?;
        Ok((variant, self))
    }
}

impl<'a, 'de> de::VariantAccess<'de> for VariantAccess<'a, 'de> {
    type Error = Error;

    // {"Variant": nil}
    fn unit_variant(self) -> Result<()> {
        de::Deserialize::deserialize(self.de)
    }

    fn newtype_variant_seed<T>(self, seed: T) -> Result<T::Value>
        where T: de::DeserializeSeed<'de>
    {
        seed.deserialize(self.de)
    }

    fn tuple_variant<V>(self, len: usize, visitor: V) -> Result<V::Value>
        where V: de::Visitor<'de>
    {
        de::Deserializer::deserialize_tuple(self.de, len, visitor)
    }

    fn struct_variant<V>(self, fields: &'static [&'static str], visitor: V) -> Result<V::Value>
        where V: de::Visitor<'de>
    {
        de::Deserializer::deserialize_struct(self.de, "", fields, visitor)
    }
}
