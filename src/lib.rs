#![no_std]
#![cfg_attr(docsrs, feature(doc_cfg))]
//! Cursor primitives shared by slice-based deserializers.
//!
//! A cursor is a plain `usize` offset into an immutable input slice. Every
//! read takes the offset by value and returns the advanced offset together
//! with the data, so a decoder can thread its position through recursion
//! without sharing mutable state. All reads are bounds checked.

#[cfg(feature = "std")]
extern crate std;

use thiserror::Error;

pub type ReadResult<T> = Result<T, ReadError>;

/// An error returned by [`DeRead`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum ReadError {
    /// Input ended before `needed` bytes could be read at `offset`
    #[error("unexpected end of input: {needed} byte(s) needed at offset {offset}")]
    UnexpectedEof {
        offset: usize,
        needed: usize
    },
}

/// Fixed width numbers decoded from big-endian bytes.
pub trait BigEndian: Sized + Copy {
    /// Width in bytes
    const WIDTH: usize;
    /// Decode from exactly [`Self::WIDTH`] bytes.
    fn from_be_slice(bytes: &[u8]) -> Self;
}

macro_rules! impl_big_endian {
    ($($ty:ty),*) => {$(
        impl BigEndian for $ty {
            const WIDTH: usize = core::mem::size_of::<$ty>();
            #[inline]
            fn from_be_slice(bytes: &[u8]) -> Self {
                let mut buf = [0u8; core::mem::size_of::<$ty>()];
                buf.copy_from_slice(bytes);
                <$ty>::from_be_bytes(buf)
            }
        }
    )*};
}

impl_big_endian!(u8, u16, u32, u64, i8, i16, i32, i64, f32, f64);

/// Deserializers read their input through implementations of this trait.
///
/// Offsets are passed by value and the new offset is returned on success.
/// A read never succeeds partially: on `Err` the caller's offset is unchanged.
pub trait DeRead<'de> {
    /// The whole input.
    fn input(&self) -> &'de [u8];

    /// Return the input length.
    #[inline]
    fn input_len(&self) -> usize {
        self.input().len()
    }
    /// Return the byte at `offset` without advancing.
    ///
    /// When `offset` is out of bounds return `Err(ReadError::UnexpectedEof)`.
    #[inline]
    fn peek_at(&self, offset: usize) -> ReadResult<u8> {
        self.input().get(offset).copied()
        .ok_or(ReadError::UnexpectedEof { offset, needed: 1 })
    }
    /// Read `len` bytes at `offset` borrowing them from the input.
    fn read_slice(&self, offset: usize, len: usize) -> ReadResult<(&'de [u8], usize)> {
        let eof = ReadError::UnexpectedEof { offset, needed: len };
        let end = offset.checked_add(len).ok_or(eof)?;
        let bytes = self.input().get(offset..end).ok_or(eof)?;
        Ok((bytes, end))
    }
    /// Read exactly `N` bytes at `offset`.
    #[inline]
    fn read_fixed<const N: usize>(&self, offset: usize) -> ReadResult<([u8; N], usize)> {
        let (bytes, end) = self.read_slice(offset, N)?;
        let mut buf = [0u8; N];
        buf.copy_from_slice(bytes);
        Ok((buf, end))
    }
    /// Read a big-endian number at `offset`.
    #[inline]
    fn read_be<N: BigEndian>(&self, offset: usize) -> ReadResult<(N, usize)> {
        let (bytes, end) = self.read_slice(offset, N::WIDTH)?;
        Ok((N::from_be_slice(bytes), end))
    }
}

impl<'de> DeRead<'de> for &'de [u8] {
    #[inline(always)]
    fn input(&self) -> &'de [u8] {
        self
    }
}
