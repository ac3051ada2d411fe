//! Pluggable decoders for MessagePack extension types.
//!
//! An [`ExtDecoder`] is asked whether it claims the value at a given offset
//! before the engine falls back to generic struct decoding. The claiming
//! decoder turns the raw wire bytes into a [`Value`] which then populates the
//! destination like any other self-describing value.
//!
//! Decoders are registered per call through [`DecodeOptions`](crate::DecodeOptions),
//! there is no global registry.
use alloc::{sync::Arc, vec::Vec};
use core::fmt;

use de_read::DeRead;
use serde::Deserialize;
use tracing::trace;

use crate::error::{Error, Expected, Result};
use crate::magick::*;
use crate::value::Value;

/// MessagePack extension type reserved for timestamps.
pub const TIMESTAMP_EXT_TYPE: i8 = -1;

/// A decoder of a single MessagePack extension shape.
pub trait ExtDecoder: Send + Sync {
    /// Return `true` if the value starting at `offset` belongs to this decoder.
    ///
    /// Must not fail, an out of bounds offset simply isn't claimed.
    fn is_type(&self, input: &[u8], offset: usize) -> bool;
    /// Decode the value starting at `offset`.
    ///
    /// Return the value and the offset right after it.
    fn decode(&self, input: &[u8], offset: usize) -> Result<(Value, usize)>;
}

/// An [`ExtDecoder`] built from a pair of closures, see [`ext_fn`].
pub struct ExtFn<P, D> {
    predicate: P,
    decoder: D,
}

/// Create an [`ExtDecoder`] from a predicate and a decode function.
pub fn ext_fn<P, D>(predicate: P, decoder: D) -> ExtFn<P, D>
    where P: Fn(&[u8], usize) -> bool + Send + Sync,
          D: Fn(&[u8], usize) -> Result<(Value, usize)> + Send + Sync
{
    ExtFn { predicate, decoder }
}

impl<P, D> ExtDecoder for ExtFn<P, D>
    where P: Fn(&[u8], usize) -> bool + Send + Sync,
          D: Fn(&[u8], usize) -> Result<(Value, usize)> + Send + Sync
{
    fn is_type(&self, input: &[u8], offset: usize) -> bool {
        (self.predicate)(input, offset)
    }

    fn decode(&self, input: &[u8], offset: usize) -> Result<(Value, usize)> {
        (self.decoder)(input, offset)
    }
}

/// An ordered list of extension decoders.
///
/// Cloning is cheap, decoders are shared.
#[derive(Clone, Default)]
pub struct ExtRegistry {
    coders: Vec<Arc<dyn ExtDecoder>>,
}

impl fmt::Debug for ExtRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtRegistry")
         .field("len", &self.coders.len())
         .finish()
    }
}

impl ExtRegistry {
    pub fn new() -> Self {
        ExtRegistry::default()
    }
    /// Append a decoder. Earlier decoders take precedence.
    pub fn push<E: ExtDecoder + 'static>(&mut self, coder: E) {
        self.coders.push(Arc::new(coder));
    }
    /// Append a shared decoder.
    pub fn push_shared(&mut self, coder: Arc<dyn ExtDecoder>) {
        self.coders.push(coder);
    }
    pub fn len(&self) -> usize {
        self.coders.len()
    }
    pub fn is_empty(&self) -> bool {
        self.coders.is_empty()
    }
    /// Let the first decoder claiming `offset` decode the value there.
    ///
    /// Return `Ok(None)` when no decoder claims it.
    pub fn decode(&self, input: &[u8], offset: usize) -> Result<Option<(Value, usize)>> {
        for (index, coder) in self.coders.iter().enumerate() {
            if coder.is_type(input, offset) {
                trace!(index, offset, "extension decoder claimed value");
                return coder.decode(input, offset).map(Some)
            }
        }
        Ok(None)
    }
}

/// A MessagePack timestamp: seconds since the Unix epoch plus nanoseconds.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
pub struct Timestamp {
    pub secs: i64,
    pub nanos: u32,
}

impl From<Timestamp> for Value {
    fn from(ts: Timestamp) -> Self {
        Value::Array(alloc::vec![ts.secs.into(), ts.nanos.into()])
    }
}

const NANOS_PER_SEC: u32 = 1_000_000_000;

/// Decodes the timestamp extension (type `-1`) in all three of its layouts.
///
/// * `fixext 4`: `u32` seconds,
/// * `fixext 8`: 30 bit nanoseconds and 34 bit seconds packed in a `u64`,
/// * `ext 8` of length 12: `u32` nanoseconds followed by `i64` seconds.
///
/// The decoded value is a `[secs, nanos]` array which populates [`Timestamp`].
#[derive(Debug, Default, Clone, Copy)]
pub struct TimestampDecoder;

const TIMESTAMP_TYPE: u8 = TIMESTAMP_EXT_TYPE as u8;

impl ExtDecoder for TimestampDecoder {
    fn is_type(&self, input: &[u8], offset: usize) -> bool {
        let header = |n: usize| input.get(offset..).and_then(|s| s.get(..n));
        match header(3) {
            Some(&[EXT_8, 12, TIMESTAMP_TYPE]) => true,
            _ => matches!(header(2),
                          Some(&[FIXEXT_4|FIXEXT_8, TIMESTAMP_TYPE]))
        }
    }

    fn decode(&self, input: &[u8], offset: usize) -> Result<(Value, usize)> {
        let (code, offset) = input.read_be::<u8>(offset)?;
        let (secs, nanos, offset) = match code {
            FIXEXT_4 => {
                let (secs, offset) = input.read_be::<u32>(offset + 1)?;
                (secs.into(), 0, offset)
            }
            FIXEXT_8 => {
                let (data, offset) = input.read_be::<u64>(offset + 1)?;
                let nanos = (data >> 34) as u32;
                let secs = (data & 0x3_ffff_ffff) as i64;
                (secs, nanos, offset)
            }
            EXT_8 => {
                let (nanos, offset) = input.read_be::<u32>(offset + 2)?;
                let (secs, offset) = input.read_be::<i64>(offset)?;
                (secs, nanos, offset)
            }
            code => return Err(Error::invalid_code(code, Expected::Ext))
        };
        if nanos >= NANOS_PER_SEC {
            return Err(Error::InvalidTimestamp)
        }
        Ok((Timestamp { secs, nanos }.into(), offset))
    }
}
