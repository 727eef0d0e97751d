//! Array-style typed access to remote memory.
//!
//! Out-of-range reads yield `None` and out-of-range writes are silently
//! dropped, mirroring how typed arrays behave locally.

use std::marker::PhantomData;

use crate::memory::RemoteMemory;
use crate::memory::Result;
use crate::memory::codec;

/// A fixed-width numeric element stored little-endian in linear memory.
pub trait Element: Copy + Send + Sync + 'static {
    const BYTES: usize;

    fn from_le(bytes: &[u8]) -> Self;

    fn to_le(self) -> Vec<u8>;
}

macro_rules! integer_element {
    ($ty:ty, $unsigned:ty) => {
        impl Element for $ty {
            const BYTES: usize = std::mem::size_of::<$ty>();

            fn from_le(bytes: &[u8]) -> Self {
                codec::decode_le(bytes) as $unsigned as $ty
            }

            fn to_le(self) -> Vec<u8> {
                codec::encode_le(self as $unsigned as u64, Self::BYTES)
            }
        }
    };
}

integer_element!(u8, u8);
integer_element!(i8, u8);
integer_element!(u16, u16);
integer_element!(i16, u16);
integer_element!(u32, u32);
integer_element!(i32, u32);

impl Element for f32 {
    const BYTES: usize = 4;

    fn from_le(bytes: &[u8]) -> Self {
        let mut raw = [0u8; 4];
        let n = bytes.len().min(4);
        raw[..n].copy_from_slice(&bytes[..n]);
        f32::from_le_bytes(raw)
    }

    fn to_le(self) -> Vec<u8> {
        self.to_le_bytes().to_vec()
    }
}

impl Element for f64 {
    const BYTES: usize = 8;

    fn from_le(bytes: &[u8]) -> Self {
        let mut raw = [0u8; 8];
        let n = bytes.len().min(8);
        raw[..n].copy_from_slice(&bytes[..n]);
        f64::from_le_bytes(raw)
    }

    fn to_le(self) -> Vec<u8> {
        self.to_le_bytes().to_vec()
    }
}

/// A window of remote memory read and written in units of `E`.
#[derive(Clone)]
pub struct TypedArray<E: Element> {
    buffer: RemoteMemory,
    _element: PhantomData<E>,
}

pub type Uint8Array = TypedArray<u8>;
pub type Int8Array = TypedArray<i8>;
pub type Uint16Array = TypedArray<u16>;
pub type Int16Array = TypedArray<i16>;
pub type Uint32Array = TypedArray<u32>;
pub type Int32Array = TypedArray<i32>;
pub type Float32Array = TypedArray<f32>;
pub type Float64Array = TypedArray<f64>;

impl<E: Element> TypedArray<E> {
    pub fn new(buffer: RemoteMemory) -> Self {
        Self {
            buffer,
            _element: PhantomData,
        }
    }

    /// An array over `len` elements starting `byte_offset` bytes into
    /// `buffer`; `len` defaults to as many whole elements as fit.
    ///
    /// A range that does not fit, or that overflows, yields an empty array.
    pub fn with_range(buffer: &RemoteMemory, byte_offset: usize, len: Option<usize>) -> Self {
        let end = match len {
            Some(len) => len
                .checked_mul(E::BYTES)
                .and_then(|bytes| byte_offset.checked_add(bytes)),
            None => Some(buffer.len()),
        };
        let range = end.filter(|&end| byte_offset <= end && end <= buffer.len());

        let window = match range {
            Some(end) => buffer.subarray(Some(byte_offset as i64), Some(end as i64)),
            None => buffer.subarray(Some(0), Some(0)),
        };
        Self::new(window)
    }

    pub fn buffer(&self) -> &RemoteMemory {
        &self.buffer
    }

    /// Whole elements in the window.
    pub fn len(&self) -> usize {
        self.buffer.len() / E::BYTES
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Result<Option<E>> {
        if index >= self.len() {
            return Ok(None);
        }
        let bytes = self.buffer.read_exact(index * E::BYTES, E::BYTES)?;
        Ok(bytes.map(|bytes| E::from_le(&bytes)))
    }

    pub fn set(&self, index: usize, value: E) -> Result<()> {
        if index >= self.len() {
            return Ok(());
        }
        self.buffer.set(index * E::BYTES, &value.to_le())?;
        Ok(())
    }

    /// Writes `values` starting at element `offset`. Returns `false` and
    /// writes nothing if they do not fit.
    pub fn set_from(&self, values: &[E], offset: usize) -> Result<bool> {
        if offset.saturating_add(values.len()) > self.len() {
            return Ok(false);
        }
        let bytes: Vec<u8> = values.iter().flat_map(|value| value.to_le()).collect();
        self.buffer.set(offset * E::BYTES, &bytes)
    }

    /// A narrower view; indices are in elements and resolve like
    /// [`RemoteMemory::subarray`].
    pub fn subarray(&self, start: Option<i64>, end: Option<i64>) -> Self {
        Self::new(self.buffer.subarray(self.to_bytes(start), self.to_bytes(end)))
    }

    pub fn slice(&self, start: Option<i64>, end: Option<i64>) -> Result<Vec<E>> {
        let bytes = self.buffer.slice(self.to_bytes(start), self.to_bytes(end))?;
        Ok(bytes.chunks_exact(E::BYTES).map(E::from_le).collect())
    }

    pub fn to_vec(&self) -> Result<Vec<E>> {
        self.slice(None, None)
    }

    fn to_bytes(&self, index: Option<i64>) -> Option<i64> {
        let len = self.len() as i64;
        index.map(|index| {
            let index = if index < 0 { (len + index).max(0) } else { index };
            index.saturating_mul(E::BYTES as i64)
        })
    }
}

impl<E: Element> std::fmt::Debug for TypedArray<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypedArray")
            .field("element", &std::any::type_name::<E>())
            .field("buffer", &self.buffer)
            .field("len", &self.len())
            .finish()
    }
}
