pub use etherparse;

use netlab::{
    NetStack,
    clock::ManualClock,
    config::{StackCfg, StackCfgBuilder},
    link::MemoryLink,
    packet::net_types::{ArpHdr, ArpOp, EthHdr, EtherType, Ipv4Hdr, MacAddress},
};
use std::net::Ipv4Addr;

static LOGGER: std::sync::Once = std::sync::Once::new();

pub const LOCAL_IP: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 1);
pub const LOCAL_MAC: MacAddress = MacAddress([0x02, 0x00, 0x00, 0x00, 0x00, 0x01]);
pub const PEER_IP: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 2);
pub const PEER_MAC: MacAddress = MacAddress([0xaa; 6]);

pub type Stack = NetStack<MemoryLink>;

/// Initializes `env_logger` the first time it is called, set `RUST_LOG` to see
/// the stack's output
pub fn init_logger() {
    LOGGER.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

pub fn cfg() -> StackCfg {
    StackCfgBuilder {
        ip: LOCAL_IP,
        mac: LOCAL_MAC,
        ..Default::default()
    }
    .build()
    .expect("failed to build stack cfg")
}

/// Creates a stack on [`LOCAL_IP`] driven by a manual clock, with the startup
/// ARP announcement already taken off the link
pub fn stack() -> (Stack, ManualClock) {
    stack_with(cfg())
}

pub fn stack_with(cfg: StackCfg) -> (Stack, ManualClock) {
    init_logger();

    let clock = ManualClock::new();
    let mut stack = NetStack::with_clock(cfg, MemoryLink::default(), clock.clone());
    let announcement = stack.link_mut().take_sent();
    assert_eq!(announcement.len(), 1, "expected a single ARP announcement");

    (stack, clock)
}

/// Delivers `frame` to the stack and returns every frame sent in response
pub fn deliver(stack: &mut Stack, frame: impl Into<Vec<u8>>) -> Vec<Vec<u8>> {
    stack.link_mut().inject(frame);
    assert!(stack.poll().expect("link failure"), "frame was not received");
    stack.link_mut().take_sent()
}

/// Teaches the stack that [`PEER_IP`] is at [`PEER_MAC`]
pub fn resolve_peer(stack: &mut Stack) {
    let sent = deliver(
        stack,
        arp_frame(ArpOp::Reply, PEER_MAC, PEER_IP, LOCAL_MAC, LOCAL_IP),
    );
    assert!(sent.is_empty(), "unexpected response to ARP reply: {sent:?}");
}

pub fn eth_frame(
    destination: MacAddress,
    source: MacAddress,
    ether_type: u16,
    payload: &[u8],
) -> Vec<u8> {
    let eth = EthHdr {
        destination,
        source,
        ether_type,
    };
    let mut frame = eth.to_bytes().to_vec();
    frame.extend_from_slice(payload);
    frame
}

/// An ARP packet from `sender` framed for the local host, broadcast if it is
/// a request
pub fn arp_frame(
    op: ArpOp,
    sender_mac: MacAddress,
    sender_ip: Ipv4Addr,
    target_mac: MacAddress,
    target_ip: Ipv4Addr,
) -> Vec<u8> {
    let arp = ArpHdr::new(op, sender_mac, sender_ip, target_mac, target_ip);
    let destination = match op {
        ArpOp::Request => MacAddress::BROADCAST,
        ArpOp::Reply => target_mac,
    };
    eth_frame(destination, sender_mac, EtherType::Arp as u16, &arp.to_bytes())
}

/// An unfragmented IPv4 packet from [`PEER_IP`] to [`LOCAL_IP`] with a valid
/// header checksum, without the Ethernet header
pub fn ipv4_packet(proto: u8, payload: &[u8]) -> Vec<u8> {
    let mut ip = Ipv4Hdr::new(proto, PEER_IP, LOCAL_IP, 64, 0);
    ip.total_length = (Ipv4Hdr::LEN + payload.len()) as u16;
    ip.identification = 0x1234;
    ip.calc_checksum();

    let mut packet = ip.to_bytes().to_vec();
    packet.extend_from_slice(payload);
    packet
}

/// [`ipv4_packet`] framed from [`PEER_MAC`] to [`LOCAL_MAC`]
pub fn ipv4_frame(proto: u8, payload: &[u8]) -> Vec<u8> {
    eth_frame(
        LOCAL_MAC,
        PEER_MAC,
        EtherType::Ipv4 as u16,
        &ipv4_packet(proto, payload),
    )
}

/// A complete UDP frame from `PEER_IP:src_port` to `LOCAL_IP:dst_port`, built
/// and checksummed by etherparse
pub fn udp_frame(src_port: u16, dst_port: u16, payload: &[u8]) -> Vec<u8> {
    let builder = etherparse::PacketBuilder::ethernet2(PEER_MAC.0, LOCAL_MAC.0)
        .ipv4(PEER_IP.octets(), LOCAL_IP.octets(), 64)
        .udp(src_port, dst_port);

    let mut frame = Vec::with_capacity(builder.size(payload.len()));
    builder
        .write(&mut frame, payload)
        .expect("failed to build UDP frame");
    frame
}

/// A complete ICMP echo request frame from [`PEER_IP`], built and checksummed
/// by etherparse
pub fn echo_request_frame(id: u16, seq: u16, payload: &[u8]) -> Vec<u8> {
    let builder = etherparse::PacketBuilder::ethernet2(PEER_MAC.0, LOCAL_MAC.0)
        .ipv4(PEER_IP.octets(), LOCAL_IP.octets(), 64)
        .icmpv4_echo_request(id, seq);

    let mut frame = Vec::with_capacity(builder.size(payload.len()));
    builder
        .write(&mut frame, payload)
        .expect("failed to build ICMP frame");
    frame
}

/// The headers of a frame sent by the stack
#[derive(Debug)]
pub struct Sent<'frame> {
    pub eth: EthHdr,
    pub ip: Ipv4Hdr,
    /// The IP payload, without any Ethernet padding
    pub payload: &'frame [u8],
}

/// Splits an IPv4 frame sent by the stack, asserting that its headers are
/// well formed
pub fn parse_ipv4(frame: &[u8]) -> Sent<'_> {
    let eth = EthHdr::parse(frame).expect("truncated ethernet header");
    assert_eq!(eth.ether_type, EtherType::Ipv4 as u16);
    assert_eq!(eth.source, LOCAL_MAC);

    let ip_bytes = &frame[EthHdr::LEN..];
    let ip = Ipv4Hdr::parse(ip_bytes).expect("truncated ip header");

    let (header, _) =
        etherparse::Ipv4Header::from_slice(ip_bytes).expect("etherparse rejected the ip header");
    assert_eq!(header.header_checksum, header.calc_header_checksum());
    assert_eq!(header.source, LOCAL_IP.octets());

    let payload = &ip_bytes[ip.internet_header_length()..ip.total_length as usize];
    Sent { eth, ip, payload }
}
