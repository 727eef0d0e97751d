//! View-style access to remote memory with explicit byte offsets and
//! endianness. Unlike [`TypedArray`](crate::memory::TypedArray), an access
//! past the end of the window is an error.

use crate::memory::Element;
use crate::memory::Error;
use crate::memory::RemoteMemory;
use crate::memory::Result;
use crate::memory::codec;

#[derive(Debug, Clone)]
pub struct DataView {
    buffer: RemoteMemory,
}

macro_rules! accessors {
    ($($ty:ty => $get:ident, $set:ident;)*) => {
        $(
            pub fn $get(&self, byte_offset: usize, little_endian: bool) -> Result<$ty> {
                self.get::<$ty>(byte_offset, little_endian)
            }

            pub fn $set(&self, byte_offset: usize, value: $ty, little_endian: bool) -> Result<()> {
                self.set::<$ty>(byte_offset, value, little_endian)
            }
        )*
    };
}

impl DataView {
    pub fn new(buffer: RemoteMemory) -> Self {
        Self { buffer }
    }

    pub fn buffer(&self) -> &RemoteMemory {
        &self.buffer
    }

    pub fn byte_len(&self) -> usize {
        self.buffer.len()
    }

    pub fn get<E: Element>(&self, byte_offset: usize, little_endian: bool) -> Result<E> {
        let bytes = self
            .buffer
            .read_exact(byte_offset, E::BYTES)?
            .ok_or_else(|| self.out_of_range(byte_offset, E::BYTES))?;

        if little_endian {
            Ok(E::from_le(&bytes))
        } else {
            Ok(E::from_le(&codec::reverse(bytes)))
        }
    }

    pub fn set<E: Element>(&self, byte_offset: usize, value: E, little_endian: bool) -> Result<()> {
        let bytes = if little_endian {
            value.to_le()
        } else {
            codec::reverse(value.to_le())
        };

        if self.buffer.set(byte_offset, &bytes)? {
            Ok(())
        } else {
            Err(self.out_of_range(byte_offset, E::BYTES))
        }
    }

    // single bytes have no byte order
    pub fn get_u8(&self, byte_offset: usize) -> Result<u8> {
        self.get::<u8>(byte_offset, true)
    }

    pub fn set_u8(&self, byte_offset: usize, value: u8) -> Result<()> {
        self.set::<u8>(byte_offset, value, true)
    }

    pub fn get_i8(&self, byte_offset: usize) -> Result<i8> {
        self.get::<i8>(byte_offset, true)
    }

    pub fn set_i8(&self, byte_offset: usize, value: i8) -> Result<()> {
        self.set::<i8>(byte_offset, value, true)
    }

    accessors! {
        u16 => get_u16, set_u16;
        i16 => get_i16, set_i16;
        u32 => get_u32, set_u32;
        i32 => get_i32, set_i32;
        f32 => get_f32, set_f32;
        f64 => get_f64, set_f64;
    }

    fn out_of_range(&self, offset: usize, width: usize) -> Error {
        Error::OutOfRange {
            offset,
            width,
            length: self.buffer.len(),
        }
    }
}
