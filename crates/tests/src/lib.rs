pub use test_utils::*;

pub const IPV4_DATA: &[u8] = b"I'm an IPv4 packet payload";
pub const LARGER: &[u8] = &[0xf3; 1001];

/// A payload of `len` bytes whose contents encode their own position, so
/// misplaced fragments show up
pub fn jumbo(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}
