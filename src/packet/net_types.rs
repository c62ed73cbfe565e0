//! This is a minimal set of type definitions/helpers for the network types the
//! stack speaks
//!
//! Headers are decoded from and encoded to network order bytes field by field,
//! they are never reinterpreted in place, so alignment and host endianness
//! don't matter.

use super::{PacketError, csum};
use std::{fmt, net::Ipv4Addr, str::FromStr};

#[inline]
fn ensure_len(buf: &[u8], size: usize) -> Result<(), PacketError> {
    if buf.len() < size {
        return Err(PacketError::InsufficientData {
            offset: 0,
            size,
            length: buf.len(),
        });
    }

    Ok(())
}

#[inline]
fn be16(buf: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([buf[offset], buf[offset + 1]])
}

#[inline]
fn ipv4(buf: &[u8], offset: usize) -> Ipv4Addr {
    Ipv4Addr::new(
        buf[offset],
        buf[offset + 1],
        buf[offset + 2],
        buf[offset + 3],
    )
}

#[inline]
fn mac(buf: &[u8], offset: usize) -> MacAddress {
    let mut mac = [0u8; 6];
    mac.copy_from_slice(&buf[offset..offset + 6]);
    MacAddress(mac)
}

/// A [MAC address](https://en.wikipedia.org/wiki/MAC_address)
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct MacAddress(pub [u8; 6]);

impl MacAddress {
    /// `ff:ff:ff:ff:ff:ff`, every station on the segment
    pub const BROADCAST: Self = Self([0xff; 6]);
    /// `00:00:00:00:00:00`, used as the unknown target of an ARP request
    pub const ZERO: Self = Self([0; 6]);
}

impl fmt::Debug for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

impl From<[u8; 6]> for MacAddress {
    #[inline]
    fn from(v: [u8; 6]) -> Self {
        Self(v)
    }
}

/// The text was not 6 `:` or `-` separated hex octets
#[derive(Debug, thiserror::Error)]
#[error("invalid MAC address '{0}'")]
pub struct ParseMacError(String);

impl FromStr for MacAddress {
    type Err = ParseMacError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut mac = [0u8; 6];
        let mut octets = s.split([':', '-']);

        for octet in &mut mac {
            *octet = octets
                .next()
                .filter(|o| o.len() == 2 && o.bytes().all(|b| b.is_ascii_hexdigit()))
                .and_then(|o| u8::from_str_radix(o, 16).ok())
                .ok_or_else(|| ParseMacError(s.to_owned()))?;
        }

        if octets.next().is_some() {
            return Err(ParseMacError(s.to_owned()));
        }

        Ok(Self(mac))
    }
}

/// The [payload](https://en.wikipedia.org/wiki/EtherType) for an Ethernet frame
#[repr(u16)]
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum EtherType {
    /// The payload is an [`Ipv4Hdr`]
    Ipv4 = 0x0800,
    /// The payload is an [`ArpHdr`]
    Arp = 0x0806,
}

/// The transport layer protocols that can be encapsulated in an IPv4 packet
///
/// <https://en.wikipedia.org/wiki/List_of_IP_protocol_numbers>
#[repr(u8)]
#[derive(PartialEq, Eq, Debug, Copy, Clone)]
pub enum IpProto {
    /// Internet Control Message, see [`IcmpHdr`]
    Icmp = 1,
    /// [User Datagram](struct@UdpHdr)
    Udp = 17,
}

/// An [Ethernet II](https://en.wikipedia.org/wiki/Ethernet_frame#Ethernet_II) header
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct EthHdr {
    /// The destination MAC address
    pub destination: MacAddress,
    /// The source MAC address
    pub source: MacAddress,
    /// The [`EtherType`] determines the rest of the payload. Kept raw as
    /// unknown types are valid on the wire
    pub ether_type: u16,
}

impl EthHdr {
    /// The length in bytes of the header
    pub const LEN: usize = 14;

    /// Decodes the header from the front of `buf`
    #[inline]
    pub fn parse(buf: &[u8]) -> Result<Self, PacketError> {
        ensure_len(buf, Self::LEN)?;

        Ok(Self {
            destination: mac(buf, 0),
            source: mac(buf, 6),
            ether_type: be16(buf, 12),
        })
    }

    /// Encodes the header
    #[inline]
    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        let mut out = [0u8; Self::LEN];
        out[0..6].copy_from_slice(&self.destination.0);
        out[6..12].copy_from_slice(&self.source.0);
        out[12..14].copy_from_slice(&self.ether_type.to_be_bytes());
        out
    }
}

/// The [ARP operation](https://en.wikipedia.org/wiki/Address_Resolution_Protocol#Packet_structure)
#[repr(u16)]
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum ArpOp {
    /// Who has `target_ip`?
    Request = 1,
    /// `sender_ip` is at `sender_mac`
    Reply = 2,
}

impl ArpOp {
    /// Converts from the raw opcode, `None` for anything but request or reply
    #[inline]
    pub fn from_raw(op: u16) -> Option<Self> {
        match op {
            1 => Some(Self::Request),
            2 => Some(Self::Reply),
            _ => None,
        }
    }
}

/// An [ARP](https://en.wikipedia.org/wiki/Address_Resolution_Protocol) packet
/// for Ethernet and IPv4
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ArpHdr {
    /// The link protocol, 1 for Ethernet
    pub hardware_type: u16,
    /// The protocol being resolved, 0x0800 for IPv4
    pub protocol_type: u16,
    /// The length of a hardware address, 6 for Ethernet
    pub hardware_len: u8,
    /// The length of a protocol address, 4 for IPv4
    pub protocol_len: u8,
    /// The raw operation, see [`ArpOp`]
    pub opcode: u16,
    /// The MAC of the sender
    pub sender_mac: MacAddress,
    /// The IP of the sender
    pub sender_ip: Ipv4Addr,
    /// The MAC of the target, zero in requests
    pub target_mac: MacAddress,
    /// The IP of the target
    pub target_ip: Ipv4Addr,
}

impl ArpHdr {
    /// The length in bytes of the packet
    pub const LEN: usize = 28;
    /// Hardware type for Ethernet
    pub const HW_ETHERNET: u16 = 1;

    /// Creates an Ethernet/IPv4 packet
    #[inline]
    pub fn new(
        op: ArpOp,
        sender_mac: MacAddress,
        sender_ip: Ipv4Addr,
        target_mac: MacAddress,
        target_ip: Ipv4Addr,
    ) -> Self {
        Self {
            hardware_type: Self::HW_ETHERNET,
            protocol_type: EtherType::Ipv4 as u16,
            hardware_len: 6,
            protocol_len: 4,
            opcode: op as u16,
            sender_mac,
            sender_ip,
            target_mac,
            target_ip,
        }
    }

    /// Decodes the packet from the front of `buf`, without validating any fields
    #[inline]
    pub fn parse(buf: &[u8]) -> Result<Self, PacketError> {
        ensure_len(buf, Self::LEN)?;

        Ok(Self {
            hardware_type: be16(buf, 0),
            protocol_type: be16(buf, 2),
            hardware_len: buf[4],
            protocol_len: buf[5],
            opcode: be16(buf, 6),
            sender_mac: mac(buf, 8),
            sender_ip: ipv4(buf, 14),
            target_mac: mac(buf, 18),
            target_ip: ipv4(buf, 24),
        })
    }

    /// Encodes the packet
    #[inline]
    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        let mut out = [0u8; Self::LEN];
        out[0..2].copy_from_slice(&self.hardware_type.to_be_bytes());
        out[2..4].copy_from_slice(&self.protocol_type.to_be_bytes());
        out[4] = self.hardware_len;
        out[5] = self.protocol_len;
        out[6..8].copy_from_slice(&self.opcode.to_be_bytes());
        out[8..14].copy_from_slice(&self.sender_mac.0);
        out[14..18].copy_from_slice(&self.sender_ip.octets());
        out[18..24].copy_from_slice(&self.target_mac.0);
        out[24..28].copy_from_slice(&self.target_ip.octets());
        out
    }

    /// True if this is an Ethernet/IPv4 packet with a known operation
    #[inline]
    pub fn is_supported(&self) -> bool {
        self.hardware_type == Self::HW_ETHERNET
            && self.protocol_type == EtherType::Ipv4 as u16
            && self.hardware_len == 6
            && self.protocol_len == 4
            && ArpOp::from_raw(self.opcode).is_some()
    }
}

/// The [IPv4](https://en.wikipedia.org/wiki/IPv4) header
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Ipv4Hdr {
    /// The IP version, always 4
    pub version: u8,
    /// The [Internet Header Length](https://en.wikipedia.org/wiki/IPv4#IHL)
    /// in 32-bit words, `[5..=15]`
    #[doc(alias = "ihl")]
    pub header_words: u8,
    /// The type of service
    pub tos: u8,
    /// The [total length](https://en.wikipedia.org/wiki/IPv4#Total_Length) of the packet,
    /// including the header and the data payload
    pub total_length: u16,
    /// The [identification](https://en.wikipedia.org/wiki/IPv4#Identification)
    /// shared by every fragment of a datagram
    pub identification: u16,
    /// The flags in the top 3 bits and the fragment offset, in 8-byte units, in
    /// the low 13 bits
    pub flags_fragment: u16,
    /// Technically this is a time in units of seconds, but in reality this is
    /// used as a [hop count](https://en.wikipedia.org/wiki/Hop_(networking))
    #[doc(alias = "ttl")]
    pub time_to_live: u8,
    /// The layer 4 protocol encapsulated in this packet, see [`IpProto`]
    pub proto: u8,
    /// The [checksum](https://en.wikipedia.org/wiki/Internet_checksum) of the
    /// fields in this header, with the check field itself being 0
    pub check: u16,
    /// The source [IP](https://en.wikipedia.org/wiki/IPv4#Addressing)
    pub source: Ipv4Addr,
    /// The destination [IP](https://en.wikipedia.org/wiki/IPv4#Addressing)
    pub destination: Ipv4Addr,
}

impl Ipv4Hdr {
    /// The length in bytes of a header without options
    pub const LEN: usize = 20;
    /// The minimum valid [`Self::header_words`]
    pub const MIN_HEADER_WORDS: u8 = 5;
    /// The maximum valid [`Self::header_words`]
    pub const MAX_HEADER_WORDS: u8 = 15;
    /// The More Fragments flag, set on every fragment but the last
    pub const MORE_FRAGMENTS: u16 = 0x2000;
    /// The mask of the fragment offset within [`Self::flags_fragment`]
    pub const OFFSET_MASK: u16 = 0x1fff;
    /// Offset of the check field within the header
    pub const CHECK_OFFSET: usize = 10;

    /// Creates a header without options for an unfragmented packet
    #[inline]
    pub fn new(proto: u8, source: Ipv4Addr, destination: Ipv4Addr, ttl: u8, tos: u8) -> Self {
        Self {
            version: 4,
            header_words: Self::MIN_HEADER_WORDS,
            tos,
            total_length: Self::LEN as u16,
            identification: 0,
            flags_fragment: 0,
            time_to_live: ttl,
            proto,
            check: 0,
            source,
            destination,
        }
    }

    /// Decodes the fixed 20 bytes of the header from the front of `buf`,
    /// without validating any fields. Options, if any, are not decoded.
    #[inline]
    pub fn parse(buf: &[u8]) -> Result<Self, PacketError> {
        ensure_len(buf, Self::LEN)?;

        Ok(Self {
            version: buf[0] >> 4,
            header_words: buf[0] & 0x0f,
            tos: buf[1],
            total_length: be16(buf, 2),
            identification: be16(buf, 4),
            flags_fragment: be16(buf, 6),
            time_to_live: buf[8],
            proto: buf[9],
            check: be16(buf, 10),
            source: ipv4(buf, 12),
            destination: ipv4(buf, 16),
        })
    }

    /// Encodes the fixed 20 bytes of the header
    #[inline]
    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        let mut out = [0u8; Self::LEN];
        out[0] = (self.version << 4) | (self.header_words & 0x0f);
        out[1] = self.tos;
        out[2..4].copy_from_slice(&self.total_length.to_be_bytes());
        out[4..6].copy_from_slice(&self.identification.to_be_bytes());
        out[6..8].copy_from_slice(&self.flags_fragment.to_be_bytes());
        out[8] = self.time_to_live;
        out[9] = self.proto;
        out[10..12].copy_from_slice(&self.check.to_be_bytes());
        out[12..16].copy_from_slice(&self.source.octets());
        out[16..20].copy_from_slice(&self.destination.octets());
        out
    }

    /// Gets the total length of the header, including options, in bytes
    ///
    /// This value is in the range `[20..=60]` for valid headers
    #[doc(alias = "ihl")]
    #[inline]
    pub fn internet_header_length(&self) -> usize {
        self.header_words as usize * 4
    }

    /// True if more fragments of the datagram follow this one
    #[inline]
    pub fn more_fragments(&self) -> bool {
        self.flags_fragment & Self::MORE_FRAGMENTS != 0
    }

    /// The offset of this fragment's payload within the datagram, in bytes
    #[inline]
    pub fn fragment_offset(&self) -> usize {
        (self.flags_fragment & Self::OFFSET_MASK) as usize * 8
    }

    /// Sets the More Fragments flag and the fragment offset, which is given in
    /// bytes and must be a multiple of 8
    #[inline]
    pub fn set_fragment(&mut self, more_fragments: bool, offset: usize) {
        debug_assert_eq!(offset % 8, 0, "fragment offsets are in 8-byte units");

        let mut flags_fragment = ((offset / 8) as u16) & Self::OFFSET_MASK;
        if more_fragments {
            flags_fragment |= Self::MORE_FRAGMENTS;
        }
        self.flags_fragment = flags_fragment;
    }

    /// Recalculates the [`Self::check`] field based on the current contents
    /// of the header
    #[inline]
    pub fn calc_checksum(&mut self) {
        self.check = 0;
        self.check = csum::checksum16(&self.to_bytes());
    }
}

/// The [ICMP](https://en.wikipedia.org/wiki/Internet_Control_Message_Protocol)
/// message types the stack generates or answers
#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum IcmpType {
    /// Answer to an [`Self::EchoRequest`]
    EchoReply = 0,
    /// The datagram quoted in the data could not be delivered
    DestinationUnreachable = 3,
    /// A ping
    EchoRequest = 8,
}

/// The code of an [`IcmpType::DestinationUnreachable`] message
#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum UnreachableCode {
    /// Destination network unreachable
    Net = 0,
    /// Destination host unreachable
    Host = 1,
    /// No handler for the IP protocol
    Protocol = 2,
    /// No handler for the UDP port
    Port = 3,
}

/// The [ICMP header](https://en.wikipedia.org/wiki/Internet_Control_Message_Protocol#Header)
///
/// The identifier and sequence are only meaningful for echo messages and are
/// zero otherwise.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct IcmpHdr {
    /// The message type, see [`IcmpType`]
    pub icmp_type: u8,
    /// The message subtype
    pub code: u8,
    /// The checksum of the header and data, with this field set to 0
    pub check: u16,
    /// The echo identifier
    pub identifier: u16,
    /// The echo sequence number
    pub sequence: u16,
}

impl IcmpHdr {
    /// The length in bytes of the header
    pub const LEN: usize = 8;
    /// Offset of the check field within the header
    pub const CHECK_OFFSET: usize = 2;

    /// Decodes the header from the front of `buf`
    #[inline]
    pub fn parse(buf: &[u8]) -> Result<Self, PacketError> {
        ensure_len(buf, Self::LEN)?;

        Ok(Self {
            icmp_type: buf[0],
            code: buf[1],
            check: be16(buf, 2),
            identifier: be16(buf, 4),
            sequence: be16(buf, 6),
        })
    }

    /// Encodes the header
    #[inline]
    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        let mut out = [0u8; Self::LEN];
        out[0] = self.icmp_type;
        out[1] = self.code;
        out[2..4].copy_from_slice(&self.check.to_be_bytes());
        out[4..6].copy_from_slice(&self.identifier.to_be_bytes());
        out[6..8].copy_from_slice(&self.sequence.to_be_bytes());
        out
    }
}

/// The [UDP](https://en.wikipedia.org/wiki/User_Datagram_Protocol) header
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct UdpHdr {
    /// The source port of the sender
    pub source: u16,
    /// The destination port
    pub destination: u16,
    /// The length of this header and the data portion following it
    pub length: u16,
    /// The [checksum](https://en.wikipedia.org/wiki/Internet_checksum) of
    /// the [IPv4 pseudo header](https://en.wikipedia.org/wiki/User_Datagram_Protocol#IPv4_pseudo_header),
    /// this header (with the `check` field set to 0), and the data payload.
    /// 0 means no checksum was calculated
    pub check: u16,
}

impl UdpHdr {
    /// The length in bytes of the header
    pub const LEN: usize = 8;
    /// Offset of the check field within the header
    pub const CHECK_OFFSET: usize = 6;

    /// Decodes the header from the front of `buf`
    #[inline]
    pub fn parse(buf: &[u8]) -> Result<Self, PacketError> {
        ensure_len(buf, Self::LEN)?;

        Ok(Self {
            source: be16(buf, 0),
            destination: be16(buf, 2),
            length: be16(buf, 4),
            check: be16(buf, 6),
        })
    }

    /// Encodes the header
    #[inline]
    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        let mut out = [0u8; Self::LEN];
        out[0..2].copy_from_slice(&self.source.to_be_bytes());
        out[2..4].copy_from_slice(&self.destination.to_be_bytes());
        out[4..6].copy_from_slice(&self.length.to_be_bytes());
        out[6..8].copy_from_slice(&self.check.to_be_bytes());
        out
    }
}
