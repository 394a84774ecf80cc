//! Golomb-Rice coding of sorted integer sequences.
//!
//! Each gap between consecutive distinct values is split into a quotient
//! `gap >> div`, written in unary as that many zero bits followed by a one
//! bit, and the low `div` bits of the gap. Bits are packed least significant
//! first within each byte.

/// Largest accepted Rice parameter.
pub const MAX_DIV: u32 = 62;

/// Rice parameter for a sorted set, estimated from the mean gap assuming the
/// gaps are geometrically distributed.
pub fn estimate_div(sorted: &[u64]) -> u32 {
    let Some(&last) = sorted.last() else {
        return 0;
    };
    let avg = (last as f64 + 1.0) / sorted.len() as f64;
    let prob = 1.0 / avg;
    let div = (-(-(1.0 - prob).log2()).log2()).round().max(0.0);
    (div as u32).min(MAX_DIV)
}

/// Compress an ascending sequence, dropping duplicates.
///
/// Returns the Rice parameter used and the packed bits.
pub fn compress(sorted: &[u64], div: Option<u32>) -> (u32, Vec<u8>) {
    if sorted.is_empty() {
        return (0, Vec::new());
    }
    let div = div.unwrap_or_else(|| estimate_div(sorted)).min(MAX_DIV);

    let mut writer = BitWriter::default();
    let mut prev = None;
    for &value in sorted {
        if matches!(prev, Some(p) if value <= p) {
            continue;
        }
        let delta = value - prev.unwrap_or(0);
        writer.skip(delta >> div);
        writer.push_bit(true);
        writer.push_bits(delta, div);
        prev = Some(value);
    }
    (div, writer.into_bytes())
}

/// Iterator over the values of a compressed sequence, in ascending order.
///
/// Stops at the end of the stream, or early if the stream is corrupt.
pub struct Decoder<'a> {
    reader: BitReader<'a>,
    div: u32,
    sum: u64,
}

impl<'a> Decoder<'a> {
    pub fn new(bytes: &'a [u8], div: u32) -> Self {
        Self {
            reader: BitReader { bytes, pos: 0 },
            div: div.min(MAX_DIV),
            sum: 0,
        }
    }
}

impl Iterator for Decoder<'_> {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        let quotient = self.reader.read_unary()?;
        let remainder = self.reader.read_bits(self.div)?;
        let delta = quotient.checked_mul(1u64 << self.div)? | remainder;
        self.sum = self.sum.checked_add(delta)?;
        Some(self.sum)
    }
}

/// Return the `(value, index)` pairs of `sorted` whose value occurs in the
/// compressed sequence. `sorted` must be ascending by value.
pub fn intersect(bytes: &[u8], div: u32, sorted: &[(u64, usize)]) -> Vec<usize> {
    let mut result = Vec::new();
    let mut candidates = sorted.iter().peekable();

    for value in Decoder::new(bytes, div) {
        while candidates.next_if(|(hash, _)| *hash < value).is_some() {}
        while let Some((_, index)) = candidates.next_if(|(hash, _)| *hash == value) {
            result.push(*index);
        }
        if candidates.peek().is_none() {
            break;
        }
    }
    result
}

#[derive(Default)]
struct BitWriter {
    bytes: Vec<u8>,
    len: usize,
}

impl BitWriter {
    fn skip(&mut self, count: u64) {
        self.len += count as usize;
    }

    fn push_bit(&mut self, bit: bool) {
        let byte = self.len / 8;
        if byte >= self.bytes.len() {
            self.bytes.resize(byte + 1, 0);
        }
        if bit {
            self.bytes[byte] |= 1 << (self.len % 8);
        }
        self.len += 1;
    }

    fn push_bits(&mut self, value: u64, count: u32) {
        for i in 0..count {
            self.push_bit((value >> i) & 1 == 1);
        }
    }

    fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

struct BitReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl BitReader<'_> {
    fn read_bit(&mut self) -> Option<bool> {
        let byte = self.bytes.get(self.pos / 8)?;
        let bit = (byte >> (self.pos % 8)) & 1 == 1;
        self.pos += 1;
        Some(bit)
    }

    fn read_unary(&mut self) -> Option<u64> {
        let mut count = 0u64;
        loop {
            // Whole zero bytes are part of the quotient.
            if self.pos % 8 == 0 && self.bytes.get(self.pos / 8) == Some(&0) {
                count += 8;
                self.pos += 8;
                continue;
            }
            if self.read_bit()? {
                return Some(count);
            }
            count += 1;
        }
    }

    fn read_bits(&mut self, count: u32) -> Option<u64> {
        let mut value = 0u64;
        for i in 0..count {
            if self.read_bit()? {
                value |= 1 << i;
            }
        }
        Some(value)
    }
}
