//! TCP sequence-number arithmetic in modulo-2^32 space

/// Signed distance from `from` to `to`, interpreting the wrapped difference
/// as a two's-complement `i32`.
///
/// Positive results mean `to` lies ahead of `from`.
pub fn seq_distance(from: u32, to: u32) -> i32 {
    to.wrapping_sub(from) as i32
}

/// Returns true if `seq` is strictly behind `expected` (already delivered).
pub fn seq_behind(seq: u32, expected: u32) -> bool {
    seq_distance(seq, expected) > 0
}

/// Advance a sequence number by `len` bytes, wrapping at 2^32.
pub fn seq_advance(seq: u32, len: usize) -> u32 {
    seq.wrapping_add(len as u32)
}
