//! ICMP echo replies and destination unreachable messages

use crate::{
    NetStack, Packet,
    link::Link,
    packet::{
        csum,
        net_types::{IcmpHdr, IcmpType, IpProto, Ipv4Hdr, UnreachableCode},
    },
};
use std::net::Ipv4Addr;

/// The number of bytes of the offending datagram's payload quoted after its
/// header, enough for the ports of a UDP or TCP header
const QUOTED_PAYLOAD: usize = 8;

/// Writes the checksum of the whole message into the header at the front of
/// `message`, whose check field must be zero
#[inline]
fn seal(message: &mut [u8]) {
    let check = csum::checksum16(message);
    message[IcmpHdr::CHECK_OFFSET..IcmpHdr::CHECK_OFFSET + 2].copy_from_slice(&check.to_be_bytes());
}

impl<L: Link> NetStack<L> {
    /// Processes a received ICMP message, answering echo requests
    ///
    /// The request is turned into the reply in place, the identifier, sequence
    /// and data are echoed back unchanged.
    pub fn icmp_in(&mut self, mut packet: Packet, src_ip: Ipv4Addr) {
        let icmp = match IcmpHdr::parse(&packet) {
            Ok(icmp) => icmp,
            Err(err) => {
                log::trace!("dropping icmp message from {src_ip}: {err}");
                return;
            }
        };

        if icmp.icmp_type != IcmpType::EchoRequest as u8 {
            log::trace!("ignoring icmp type {} from {src_ip}", icmp.icmp_type);
            return;
        }

        log::debug!(
            "echo reply to {src_ip} id {} seq {}",
            icmp.identifier,
            icmp.sequence
        );

        let reply = IcmpHdr {
            icmp_type: IcmpType::EchoReply as u8,
            code: 0,
            check: 0,
            ..icmp
        };
        packet[..IcmpHdr::LEN].copy_from_slice(&reply.to_bytes());
        seal(&mut packet);

        self.ip_out(packet, src_ip, IpProto::Icmp as u8);
    }

    /// Tells `src_ip` that the datagram in `original` could not be delivered
    ///
    /// `original` must start at the IP header of the offending datagram. The
    /// message quotes that header and the first 8 bytes of its payload, zero
    /// padded if the payload was shorter.
    pub fn icmp_unreachable(&mut self, original: &Packet, src_ip: Ipv4Addr, code: UnreachableCode) {
        let header_len = Ipv4Hdr::parse(original)
            .map(|ip| ip.internet_header_length())
            .unwrap_or(Ipv4Hdr::LEN)
            .clamp(Ipv4Hdr::LEN, original.len().max(Ipv4Hdr::LEN));
        let quoted = header_len + QUOTED_PAYLOAD;

        log::debug!("destination unreachable ({code:?}) to {src_ip}");

        let mut packet = self.alloc(IcmpHdr::LEN + quoted);
        let icmp = IcmpHdr {
            icmp_type: IcmpType::DestinationUnreachable as u8,
            code: code as u8,
            check: 0,
            identifier: 0,
            sequence: 0,
        };
        packet.append(&icmp.to_bytes());
        packet.append(&original[..quoted.min(original.len())]);
        packet.pad(IcmpHdr::LEN + quoted - packet.len());
        seal(&mut packet);

        self.ip_out(packet, src_ip, IpProto::Icmp as u8);
    }
}
