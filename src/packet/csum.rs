//! Utilities for calculating [internet checksums](https://en.wikipedia.org/wiki/Internet_checksum)
//!
//! All functions operate on network order bytes and return checksums as host
//! order values, so the result can be written into a header with
//! [`u16::to_be_bytes`].

use std::net::Ipv4Addr;

/// The length of the IPv4 [pseudo header](https://en.wikipedia.org/wiki/User_Datagram_Protocol#IPv4_pseudo_header)
pub const PSEUDO_HEADER_LEN: usize = 12;

/// Folds a running checksum calculation to a 16-bit value appropriate for use
/// in a checksum field
#[inline]
pub fn fold_checksum(mut csum: u32) -> u16 {
    while csum >> 16 != 0 {
        csum = (csum & 0xffff) + (csum >> 16);
    }
    !csum as u16
}

/// Reduces the intermediate 64-bit sum to 32-bits that can be fed into
/// further calculations
#[inline]
fn finalize(mut sum: u64) -> u32 {
    while sum >> 32 != 0 {
        sum = (sum & 0xffff_ffff) + (sum >> 32);
    }
    sum as u32
}

/// Calculates the ones' complement sum of the big-endian 16-bit words in `buf`,
/// appending it to the previous calculation `sum`
///
/// An odd trailing byte is treated as the high byte of a word padded with a
/// zero low byte, so only the final span of a multi-span calculation may have
/// an odd length.
pub fn partial(buf: &[u8], sum: u32) -> u32 {
    let mut sum = sum as u64;

    let mut words = buf.chunks_exact(2);
    for word in &mut words {
        sum += u16::from_be_bytes([word[0], word[1]]) as u64;
    }

    if let [last] = words.remainder() {
        sum += (*last as u64) << 8;
    }

    finalize(sum)
}

/// The internet checksum of `buf`
///
/// Writing the result into a zeroed checksum field within `buf` and running
/// this function again over the same bytes yields 0.
#[inline]
pub fn checksum16(buf: &[u8]) -> u16 {
    fold_checksum(partial(buf, 0))
}

/// Builds the IPv4 pseudo header that is prepended, but never transmitted, when
/// calculating transport layer checksums
///
/// ```text
/// ┌──────────┌──────────┌──────┌──────────┌──────────┐
/// │source(4) │dest(4)   │0x00  │proto(1)  │length(2) │
/// └──────────└──────────└──────└──────────└──────────┘
/// ```
#[inline]
pub fn pseudo_header(
    proto: u8,
    source: Ipv4Addr,
    destination: Ipv4Addr,
    length: u16,
) -> [u8; PSEUDO_HEADER_LEN] {
    let mut hdr = [0u8; PSEUDO_HEADER_LEN];
    hdr[0..4].copy_from_slice(&source.octets());
    hdr[4..8].copy_from_slice(&destination.octets());
    hdr[9] = proto;
    hdr[10..12].copy_from_slice(&length.to_be_bytes());
    hdr
}

/// Calculates the checksum of a transport segment (header and data) preceded
/// by its pseudo header
///
/// The segment is only borrowed, so the caller's bytes are never modified.
#[inline]
pub fn transport_checksum(
    proto: u8,
    segment: &[u8],
    source: Ipv4Addr,
    destination: Ipv4Addr,
) -> u16 {
    let pseudo = pseudo_header(proto, source, destination, segment.len() as u16);
    fold_checksum(partial(segment, partial(&pseudo, 0)))
}
