//! IPv4 validation, demultiplexing and send-side fragmentation
//!
//! Received fragments are handed to the protocol handlers as they are, they
//! are never reassembled.

use crate::{
    NetStack, Packet,
    link::Link,
    packet::{
        csum,
        net_types::{Ipv4Hdr, MacAddress, UnreachableCode},
    },
};
use std::net::Ipv4Addr;

/// The largest header, 15 words
const MAX_HEADER_LEN: usize = Ipv4Hdr::MAX_HEADER_WORDS as usize * 4;

/// The largest payload a datagram with a 20 byte header can carry
pub const MAX_PAYLOAD: usize = u16::MAX as usize - Ipv4Hdr::LEN;

/// Verifies the checksum over the first `header_len` bytes of `buf`
///
/// The check field is zeroed in a copy of the header, the received bytes are
/// left as they are.
fn verify_checksum(buf: &[u8], header_len: usize, check: u16) -> bool {
    let mut header = [0u8; MAX_HEADER_LEN];
    header[..header_len].copy_from_slice(&buf[..header_len]);
    header[Ipv4Hdr::CHECK_OFFSET..Ipv4Hdr::CHECK_OFFSET + 2].fill(0);
    csum::checksum16(&header[..header_len]) == check
}

impl<L: Link> NetStack<L> {
    /// Validates a received IPv4 packet addressed to this host and hands its
    /// payload to the handler registered for its protocol
    ///
    /// A packet carrying a protocol with no handler is answered with an ICMP
    /// protocol unreachable.
    pub fn ip_in(&mut self, mut packet: Packet, _src_mac: MacAddress) {
        let ip = match Ipv4Hdr::parse(&packet) {
            Ok(ip) => ip,
            Err(err) => {
                log::trace!("dropping ip packet: {err}");
                return;
            }
        };

        if ip.version != 4 {
            log::trace!("dropping ip packet: version {}", ip.version);
            return;
        }

        if !(Ipv4Hdr::MIN_HEADER_WORDS..=Ipv4Hdr::MAX_HEADER_WORDS).contains(&ip.header_words) {
            log::trace!("dropping ip packet: header length {} words", ip.header_words);
            return;
        }

        let header_len = ip.internet_header_length();
        let total_length = ip.total_length as usize;
        if total_length > packet.len() || total_length < header_len {
            log::trace!(
                "dropping ip packet: total length {total_length}, header {header_len}, received {}",
                packet.len()
            );
            return;
        }

        if !verify_checksum(&packet, header_len, ip.check) {
            log::trace!("dropping ip packet from {}: bad checksum", ip.source);
            return;
        }

        if ip.destination != self.cfg.ip {
            log::trace!("dropping ip packet: {} is not for us", ip.destination);
            return;
        }

        // Ethernet padding
        packet.truncate(total_length);

        let Some(handler) = self.ip_handler(ip.proto) else {
            log::debug!("no handler for ip protocol {} from {}", ip.proto, ip.source);
            self.icmp_unreachable(&packet, ip.source, UnreachableCode::Protocol);
            return;
        };

        if let Err(err) = packet.pull_header(header_len) {
            log::trace!("dropping ip packet: {err}");
            return;
        }

        handler(self, packet, ip.source)
    }

    /// Prepends a 20 byte header to a single fragment and sends it
    ///
    /// `offset` is the byte offset of this fragment within the datagram and
    /// must be a multiple of 8.
    pub fn ip_fragment_out(
        &mut self,
        mut packet: Packet,
        destination: Ipv4Addr,
        proto: u8,
        identification: u16,
        offset: usize,
        more_fragments: bool,
    ) {
        let mut ip = Ipv4Hdr::new(
            proto,
            self.cfg.ip,
            destination,
            self.cfg.ttl,
            self.cfg.tos,
        );
        ip.total_length = (Ipv4Hdr::LEN + packet.len()) as u16;
        ip.identification = identification;
        ip.set_fragment(more_fragments, offset);
        ip.calc_checksum();

        packet
            .push_header(Ipv4Hdr::LEN)
            .copy_from_slice(&ip.to_bytes());

        self.arp_out(packet, destination);
    }

    /// Sends `packet` as the payload of a datagram to `destination`,
    /// fragmenting it if it does not fit in a single frame
    ///
    /// Every fragment shares the same identification, a new one is used for
    /// each call. A payload larger than [`MAX_PAYLOAD`] is dropped.
    pub fn ip_out(&mut self, packet: Packet, destination: Ipv4Addr, proto: u8) {
        if packet.len() > MAX_PAYLOAD {
            log::trace!(
                "dropping {} byte datagram to {destination}: exceeds {MAX_PAYLOAD}",
                packet.len()
            );
            return;
        }

        let identification = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);

        let threshold = self.cfg.fragment_threshold;
        if packet.len() <= threshold {
            self.ip_fragment_out(packet, destination, proto, identification, 0, false);
            return;
        }

        log::debug!(
            "fragmenting {} byte datagram {identification} to {destination} into {} fragments",
            packet.len(),
            packet.len().div_ceil(threshold)
        );

        let mut chunks = packet.chunks(threshold).enumerate().peekable();
        while let Some((i, chunk)) = chunks.next() {
            let more_fragments = chunks.peek().is_some();
            let fragment = Packet::from_payload(self.cfg.head_room, chunk);
            self.ip_fragment_out(
                fragment,
                destination,
                proto,
                identification,
                i * threshold,
                more_fragments,
            );
        }
    }
}
