//! Sequential byte-stream helpers used by index and backend persistence.
//! All scalars are little-endian; variable sections are length-prefixed.
//! Any failure to read or decode surfaces as `PersistenceCorrupt` and fails
//! the whole load.

use std::io::{Read, Write};

use crate::core::errors::{IndexError, Result};

/// Upper bound for any single length-prefixed section. A prefix beyond this
/// is treated as corruption rather than attempted as an allocation.
const MAX_SECTION_LEN: usize = 1 << 30;

pub struct StreamWriter<W: Write> {
    inner: W,
}

impl<W: Write> StreamWriter<W> {
    pub fn new(inner: W) -> Self {
        StreamWriter { inner }
    }

    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.write_raw(&[value])
    }

    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.write_raw(&value.to_le_bytes())
    }

    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        self.write_raw(&value.to_le_bytes())
    }

    pub fn write_f32(&mut self, value: f32) -> Result<()> {
        self.write_raw(&value.to_le_bytes())
    }

    /// Length-prefixed byte section.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.write_u32(bytes.len() as u32)?;
        self.write_raw(bytes)
    }

    /// Raw f32 run; the reader must know the element count.
    pub fn write_f32s(&mut self, data: &[f32]) -> Result<()> {
        for value in data {
            self.write_f32(*value)?;
        }
        Ok(())
    }

    fn write_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.inner
            .write_all(bytes)
            .map_err(|e| IndexError::PersistenceCorrupt(format!("stream write failed: {}", e)))
    }
}

pub struct StreamReader<R: Read> {
    inner: R,
}

impl<R: Read> StreamReader<R> {
    pub fn new(inner: R) -> Self {
        StreamReader { inner }
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        let mut buf = [0u8; 8];
        self.read_exact(&mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf)?;
        Ok(f32::from_le_bytes(buf))
    }

    pub fn read_bytes(&mut self) -> Result<Vec<u8>> {
        let len = self.read_u32()? as usize;
        if len > MAX_SECTION_LEN {
            return Err(IndexError::PersistenceCorrupt(format!(
                "section length {} exceeds limit",
                len
            )));
        }
        let mut buf = vec![0u8; len];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }

    pub fn read_f32s(&mut self, count: usize) -> Result<Vec<f32>> {
        let mut out = Vec::with_capacity(count);
        for _ in 0..count {
            out.push(self.read_f32()?);
        }
        Ok(out)
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        self.inner
            .read_exact(buf)
            .map_err(|e| IndexError::PersistenceCorrupt(format!("stream read failed: {}", e)))
    }
}
