// Minimal ordinary-cell builder and representation hash.
//
// repr(cell) = d1 || d2 || padded_data || depth(ref_i)... || hash(ref_i)...
//   d1 = number of refs          (ordinary, level 0)
//   d2 = ceil(bits/8) + floor(bits/8)
//   padded_data: when bits % 8 != 0 a single 1 bit follows the data, then zeros
// hash(cell) = sha256(repr(cell))

use super::CodecError;
use crate::hash::sha256;

pub const MAX_BITS: usize = 1023;
pub const MAX_REFS: usize = 4;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cell {
    data: Vec<u8>,
    bit_len: usize,
    refs: Vec<Cell>,
}

impl Cell {
    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    pub fn refs(&self) -> &[Cell] {
        &self.refs
    }

    pub fn depth(&self) -> u16 {
        self.refs
            .iter()
            .map(|r| r.depth() + 1)
            .max()
            .unwrap_or(0)
    }

    pub fn hash(&self) -> [u8; 32] {
        sha256(&self.repr())
    }

    fn repr(&self) -> Vec<u8> {
        let full_bytes = self.bit_len / 8;
        let padded_len = self.bit_len.div_ceil(8);
        let mut out = Vec::with_capacity(2 + padded_len + self.refs.len() * 34);
        out.push(self.refs.len() as u8);
        out.push((full_bytes + padded_len) as u8);

        let mut data = self.data[..padded_len].to_vec();
        let rem = self.bit_len % 8;
        if rem != 0 {
            data[full_bytes] |= 0x80 >> rem;
        }
        out.extend_from_slice(&data);

        for r in &self.refs {
            out.extend_from_slice(&r.depth().to_be_bytes());
        }
        for r in &self.refs {
            out.extend_from_slice(&r.hash());
        }
        out
    }
}

#[derive(Default)]
pub struct CellBuilder {
    data: Vec<u8>,
    bit_len: usize,
    refs: Vec<Cell>,
}

impl CellBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store_bit(&mut self, bit: bool) -> Result<&mut Self, CodecError> {
        if self.bit_len >= MAX_BITS {
            return Err(CodecError::CellOverflow);
        }
        if self.bit_len % 8 == 0 {
            self.data.push(0);
        }
        if bit {
            let last = self.data.len() - 1;
            self.data[last] |= 0x80 >> (self.bit_len % 8);
        }
        self.bit_len += 1;
        Ok(self)
    }

    /// Stores the low `bits` bits of `value`, most significant first.
    pub fn store_uint(&mut self, value: u64, bits: usize) -> Result<&mut Self, CodecError> {
        if bits > 64 || self.bit_len + bits > MAX_BITS {
            return Err(CodecError::CellOverflow);
        }
        for i in (0..bits).rev() {
            self.store_bit((value >> i) & 1 == 1)?;
        }
        Ok(self)
    }

    pub fn store_bytes(&mut self, bytes: &[u8]) -> Result<&mut Self, CodecError> {
        if self.bit_len + bytes.len() * 8 > MAX_BITS {
            return Err(CodecError::CellOverflow);
        }
        for byte in bytes {
            self.store_uint(u64::from(*byte), 8)?;
        }
        Ok(self)
    }

    pub fn store_ref(&mut self, cell: Cell) -> Result<&mut Self, CodecError> {
        if self.refs.len() >= MAX_REFS {
            return Err(CodecError::CellOverflow);
        }
        self.refs.push(cell);
        Ok(self)
    }

    pub fn build(self) -> Cell {
        Cell {
            data: self.data,
            bit_len: self.bit_len,
            refs: self.refs,
        }
    }
}
