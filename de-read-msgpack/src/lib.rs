//! A type-directed MessagePack deserializer for serde built on [`de-read`](`de_read`) cursors.
/*!

The shape of the decoded value is driven entirely by the destination type: the
[`Deserializer`] reconciles the wire code found at the cursor with the serde
data model method the destination's `Deserialize` implementation asked for.

[`Deserializer`] types:

| MessagePack type -> | Serde type (depending on context)
|---------------------|----------------------------------------
| `nil`               | `unit`, `none`, zero value of any scalar, empty `seq`/`map`, all-zero `array`
| `bool`              | `bool`
| `fixint`, `int`     | `u8`-`u64`,`i8`-`i64` (checked), `f32`, `f64`
| `float-32`          | `f32` or `f64`
| `float-64`          | `f64`
| `str`               | `str`, `char`, `enum variant`, `field name`, `bytes`, `seq` of `u8`
| `bin`               | `bytes`, `seq` of `u8`
| `array`             | `array`, `tuple`, `tuple struct`, `tuple variant`, `seq-like`, `struct` (positional)
| `map`               | `enum variant`, `struct variant`, `map-like`, `struct` (named)
| `T`                 | `NewType(T)`, `Some(T)`
| `fixext`, `ext`     | whatever a registered [`ExtDecoder`] yields, e.g. [`Timestamp`]

Structs are decoded according to a single [`StructMode`] chosen for the whole
call: from arrays (positional) or from maps keyed by field names (named).

Fixed size targets (`[T; N]`, tuples) never accept more wire elements than
they can hold. Fewer elements leave the remaining slots at their zero value.

The top level entry points require the input to be consumed exactly.

[`Deserializer`]: de::Deserializer
*/
#![no_std]
#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

#[cfg(feature = "std")]
extern crate std;

extern crate alloc;

pub mod de;
pub mod error;
pub mod ext;
pub mod fixed;
pub mod options;
pub mod value;
mod zero;

pub use de_read;
pub use de_read::DeRead;

pub use de::{
    decode_into,
    from_slice,
    from_slice_positional,
    from_slice_split_tail,
    Decoder,
    Deserializer
};
pub use error::{Error, Expected, Result};
pub use ext::{ExtDecoder, ExtRegistry, Timestamp, TimestampDecoder};
pub use options::{DecodeOptions, StructMode};
pub use value::Value;

pub mod magick {
    //! MessagePack wire codes and leading byte classification.
    use core::ops::RangeInclusive;
    /* MessagePack MAGICK */
    pub const MIN_POSFIXINT: u8 = 0x00;
    pub const MAX_POSFIXINT: u8 = 0x7f;
    pub const NEGFIXINT: u8 = 0b11100000;
    pub const MIN_NEGFIXINT: i8 = NEGFIXINT as i8; //-32
    pub const FIXINT_I64: RangeInclusive<i64> = MIN_NEGFIXINT as i64..=MAX_POSFIXINT as i64;
    pub const NIL: u8      = 0xc0;
    pub const RESERVED: u8 = 0xc1;
    pub const FALSE: u8    = 0xc2;
    pub const TRUE: u8     = 0xc3;

    pub const FIXMAP: u8   = 0x80; /* 1000xxxx */
    pub const MAX_FIXMAP_SIZE: usize = 0b1111;
    pub const FIXMAP_MAX: u8 = FIXMAP + MAX_FIXMAP_SIZE as u8; /* 10001111 */

    pub const FIXARRAY: u8 = 0x90; /* 1001xxxx */
    pub const MAX_FIXARRAY_SIZE: usize = 0b1111;
    pub const FIXARRAY_MAX: u8 = FIXARRAY + MAX_FIXARRAY_SIZE as u8; /* 10011111 */

    pub const FIXSTR: u8   = 0xa0; /* 101xxxxx */
    pub const MAX_FIXSTR_SIZE: usize = 0b11111;
    pub const FIXSTR_MAX: u8 = FIXSTR + MAX_FIXSTR_SIZE as u8; /* 10111111 */

    pub const BIN_8: u8     = 0xc4;
    pub const BIN_16: u8    = 0xc5;
    pub const BIN_32: u8    = 0xc6;

    pub const EXT_8: u8     = 0xc7;
    pub const EXT_16: u8    = 0xc8;
    pub const EXT_32: u8    = 0xc9;

    pub const FLOAT_32: u8  = 0xca;
    pub const FLOAT_64: u8  = 0xcb;

    pub const UINT_8: u8    = 0xcc;
    pub const UINT_16: u8   = 0xcd;
    pub const UINT_32: u8   = 0xce;
    pub const UINT_64: u8   = 0xcf;

    pub const INT_8: u8     = 0xd0;
    pub const INT_16: u8    = 0xd1;
    pub const INT_32: u8    = 0xd2;
    pub const INT_64: u8    = 0xd3;

    pub const FIXEXT_1: u8  = 0xd4;
    pub const FIXEXT_2: u8  = 0xd5;
    pub const FIXEXT_4: u8  = 0xd6;
    pub const FIXEXT_8: u8  = 0xd7;
    pub const FIXEXT_16: u8 = 0xd8;

    pub const STR_8: u8     = 0xd9;
    pub const STR_16: u8    = 0xda;
    pub const STR_32: u8    = 0xdb;

    pub const ARRAY_16: u8  = 0xdc;
    pub const ARRAY_32: u8  = 0xdd;

    pub const MAP_16: u8    = 0xde;
    pub const MAP_32: u8    = 0xdf;

    #[inline]
    pub const fn is_nil(code: u8) -> bool {
        code == NIL
    }

    #[inline]
    pub const fn is_bool(code: u8) -> bool {
        matches!(code, FALSE|TRUE)
    }

    #[inline]
    pub const fn is_int(code: u8) -> bool {
        matches!(code, MIN_POSFIXINT..=MAX_POSFIXINT|NEGFIXINT..=0xff|UINT_8..=INT_64)
    }

    #[inline]
    pub const fn is_float(code: u8) -> bool {
        matches!(code, FLOAT_32|FLOAT_64)
    }

    #[inline]
    pub const fn is_str(code: u8) -> bool {
        matches!(code, FIXSTR..=FIXSTR_MAX|STR_8|STR_16|STR_32)
    }

    #[inline]
    pub const fn is_bin(code: u8) -> bool {
        matches!(code, BIN_8|BIN_16|BIN_32)
    }

    #[inline]
    pub const fn is_array(code: u8) -> bool {
        matches!(code, FIXARRAY..=FIXARRAY_MAX|ARRAY_16|ARRAY_32)
    }

    #[inline]
    pub const fn is_map(code: u8) -> bool {
        matches!(code, FIXMAP..=FIXMAP_MAX|MAP_16|MAP_32)
    }

    #[inline]
    pub const fn is_ext(code: u8) -> bool {
        matches!(code, EXT_8|EXT_16|EXT_32|FIXEXT_1..=FIXEXT_16)
    }

}
