use byteorder::{ByteOrder, LittleEndian};

use super::{LoadError, LoadErrorKind};

/// Failure modes of the LEB128 decoder, independent of where the bytes come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum VarintError {
    #[error("unexpected end of input")]
    UnexpectedEof,
    #[error("integer representation too long")]
    TooLong,
}

/// Cursor over a module binary. Every failure is reported with the offset
/// the cursor had reached.
pub struct Reader {
    bytes: Vec<u8>,
    pos: usize,
}

impl Reader {
    pub fn new(bytes: Vec<u8>) -> Reader {
        Reader { bytes, pos: 0 }
    }

    // Basic operations --------------------------------------------------------
    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn has_at_least(&self, count: usize) -> bool {
        self.remaining() >= count
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    pub fn error(&self, kind: LoadErrorKind) -> LoadError {
        LoadError::new(kind, self.pos)
    }

    pub fn read_byte(&mut self) -> Result<u8, LoadError> {
        match self.next() {
            Some(byte) => Ok(byte),
            None => Err(self.error(LoadErrorKind::UnexpectedEof)),
        }
    }

    pub fn slice(&self, from: usize, to: usize) -> &[u8] {
        &self.bytes[from..to]
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>, LoadError> {
        if !self.has_at_least(len) {
            return Err(self.error(LoadErrorKind::UnexpectedEof));
        }
        let vec = self.bytes[self.pos..self.pos + len].to_vec();
        self.pos += len;
        Ok(vec)
    }

    // Read and interpret types ------------------------------------------------

    // le
    pub fn read_u32(&mut self) -> Result<u32, LoadError> {
        let bytes = self.read_bytes(4)?;
        Ok(LittleEndian::read_u32(&bytes))
    }

    pub fn read_f32(&mut self) -> Result<f32, LoadError> {
        let bytes = self.read_bytes(4)?;
        Ok(LittleEndian::read_f32(&bytes))
    }

    pub fn read_f64(&mut self) -> Result<f64, LoadError> {
        let bytes = self.read_bytes(8)?;
        Ok(LittleEndian::read_f64(&bytes))
    }

    pub fn read_vu32(&mut self) -> Result<u32, LoadError> {
        let start = self.pos;
        read_vu32(&mut || self.next()).map_err(|e| LoadError::new(e.into(), start))
    }

    pub fn read_vs32(&mut self) -> Result<i32, LoadError> {
        let start = self.pos;
        read_vs32(&mut || self.next()).map_err(|e| LoadError::new(e.into(), start))
    }

    pub fn read_vs64(&mut self) -> Result<i64, LoadError> {
        let start = self.pos;
        read_vs64(&mut || self.next()).map_err(|e| LoadError::new(e.into(), start))
    }

    pub fn read_string(&mut self) -> Result<String, LoadError> {
        let len = self.read_vu32()? as usize;
        let start = self.pos;
        let bytes = self.read_bytes(len)?;
        String::from_utf8(bytes).map_err(|_| LoadError::new(LoadErrorKind::InvalidUtf8, start))
    }

    pub fn read_u8vec(&mut self) -> Result<Vec<u8>, LoadError> {
        let len = self.read_vu32()? as usize;
        self.read_bytes(len)
    }
}

impl Iterator for Reader {
    type Item = u8;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos < self.bytes.len() {
            let byte = self.bytes[self.pos];
            self.pos += 1;
            Some(byte)
        } else {
            None
        }
    }
}

// LEB128 ----------------------------------------------------------------------

fn read_vu<F>(next: &mut F, size: u32) -> Result<u64, VarintError>
where
    F: FnMut() -> Option<u8>,
{
    let mut result: u64 = 0;
    let mut shift = 0;
    loop {
        let b = next().ok_or(VarintError::UnexpectedEof)?;
        if shift >= size {
            return Err(VarintError::TooLong);
        }
        result |= ((b & 0x7f) as u64) << shift;
        shift += 7;
        if (b & 0x80) == 0 {
            return Ok(result);
        }
    }
}

fn read_vs<F>(next: &mut F, size: u32) -> Result<i64, VarintError>
where
    F: FnMut() -> Option<u8>,
{
    let mut result: i64 = 0;
    let mut shift = 0;
    loop {
        let b = next().ok_or(VarintError::UnexpectedEof)?;
        if shift >= size {
            return Err(VarintError::TooLong);
        }
        result |= ((b & 0x7f) as i64) << shift;
        shift += 7;
        if (b & 0x80) == 0 {
            // sign-extend from the last consumed byte only while bits remain
            if shift < size && (b & 0x40) != 0 {
                result |= -1i64 << shift;
            }
            return Ok(result);
        }
    }
}

pub fn read_vu32<F>(next: &mut F) -> Result<u32, VarintError>
where
    F: FnMut() -> Option<u8>,
{
    read_vu(next, 32).map(|v| v as u32)
}

pub fn read_vs32<F>(next: &mut F) -> Result<i32, VarintError>
where
    F: FnMut() -> Option<u8>,
{
    read_vs(next, 32).map(|v| v as i32)
}

pub fn read_vs64<F>(next: &mut F) -> Result<i64, VarintError>
where
    F: FnMut() -> Option<u8>,
{
    read_vs(next, 64)
}

/// Decodes an unsigned varint from `bytes` at `pos`, returning the value and
/// the offset just past it.
pub fn decode_vu32(bytes: &[u8], pos: usize) -> Result<(u32, usize), VarintError> {
    let mut cursor = pos;
    let value = read_vu32(&mut || {
        let byte = bytes.get(cursor).copied();
        cursor += 1;
        byte
    })?;
    Ok((value, cursor))
}

pub fn decode_vs32(bytes: &[u8], pos: usize) -> Result<(i32, usize), VarintError> {
    let mut cursor = pos;
    let value = read_vs32(&mut || {
        let byte = bytes.get(cursor).copied();
        cursor += 1;
        byte
    })?;
    Ok((value, cursor))
}

pub fn decode_vs64(bytes: &[u8], pos: usize) -> Result<(i64, usize), VarintError> {
    let mut cursor = pos;
    let value = read_vs64(&mut || {
        let byte = bytes.get(cursor).copied();
        cursor += 1;
        byte
    })?;
    Ok((value, cursor))
}

fn emit_vu(v: u64) -> Vec<u8> {
    let mut result: Vec<u8> = vec![];
    let mut value = v;
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            result.push(byte);
            return result;
        }
        result.push(byte | 0x80);
    }
}

fn emit_vs(v: i64) -> Vec<u8> {
    let mut result: Vec<u8> = vec![];
    let mut value = v;
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if (value == 0 && (byte & 0x40) == 0) || (value == -1 && (byte & 0x40) != 0) {
            result.push(byte);
            return result;
        }
        result.push(byte | 0x80);
    }
}

pub fn emit_vu32(v: u32) -> Vec<u8> {
    emit_vu(v as u64)
}

pub fn emit_vs32(v: i32) -> Vec<u8> {
    emit_vs(v as i64)
}

pub fn emit_vs64(v: i64) -> Vec<u8> {
    emit_vs(v)
}
