use netlab::{
    Packet,
    config::StackCfgBuilder,
    packet::{
        csum,
        net_types::{ArpOp, EthHdr, IcmpHdr, IcmpType, IpProto, Ipv4Hdr, UdpHdr, UnreachableCode},
    },
};
use netlab::udp::MAX_DATAGRAM;
use std::{cell::RefCell, net::Ipv4Addr, rc::Rc};
use tests::*;

const UDP_OFFSET: usize = EthHdr::LEN + Ipv4Hdr::LEN;

type Received = Rc<RefCell<Vec<(Vec<u8>, Ipv4Addr, u16)>>>;

fn record(stack: &mut Stack, port: u16) -> Received {
    let received = Received::default();
    let sink = received.clone();
    stack.udp_open(port, move |_stack, data, src_ip, src_port| {
        sink.borrow_mut().push((data.to_vec(), src_ip, src_port));
    });
    received
}

/// Checks the UDP header of a frame sent by the stack against etherparse's
/// checksum calculation and returns it with its payload
fn parse_udp(frame: &[u8]) -> (UdpHdr, Vec<u8>) {
    let sent = parse_ipv4(frame);
    assert_eq!(sent.ip.proto, IpProto::Udp as u8);

    let udp = UdpHdr::parse(sent.payload).unwrap();
    assert_eq!(udp.length as usize, sent.payload.len());
    let data = sent.payload[UdpHdr::LEN..].to_vec();

    let hdr = etherparse::UdpHeader {
        source_port: udp.source,
        destination_port: udp.destination,
        length: udp.length,
        checksum: 0,
    };
    assert_eq!(
        hdr.calc_checksum_ipv4_raw(sent.ip.source.octets(), sent.ip.destination.octets(), &data)
            .unwrap(),
        udp.check
    );

    (udp, data)
}

#[test]
fn dispatches_to_handler() {
    let (mut stack, _clock) = stack();
    let received = record(&mut stack, 7);

    assert!(deliver(&mut stack, udp_frame(5000, 7, IPV4_DATA)).is_empty());
    assert!(deliver(&mut stack, udp_frame(5001, 7, b"")).is_empty());

    let received = received.borrow();
    assert_eq!(received.len(), 2);
    assert_eq!(received[0], (IPV4_DATA.to_vec(), PEER_IP, 5000));
    assert_eq!(received[1], (Vec::new(), PEER_IP, 5001));
}

#[test]
fn echo() {
    let (mut stack, _clock) = stack();
    resolve_peer(&mut stack);
    stack.udp_open(7, |stack, data, src_ip, src_port| {
        stack.udp_send(data, 7, src_ip, src_port);
    });

    for data in [IPV4_DATA, LARGER] {
        let sent = deliver(&mut stack, udp_frame(40000, 7, data));
        assert_eq!(sent.len(), 1);

        let (udp, echoed) = parse_udp(&sent[0]);
        assert_eq!(udp.source, 7);
        assert_eq!(udp.destination, 40000);
        assert_eq!(echoed, data);
    }
}

#[test]
fn port_unreachable() {
    let (mut stack, _clock) = stack();
    resolve_peer(&mut stack);

    let original = udp_frame(5000, 9, LARGER);
    let sent = deliver(&mut stack, original.clone());
    assert_eq!(sent.len(), 1);

    let msg = parse_ipv4(&sent[0]);
    assert_eq!(msg.eth.destination, PEER_MAC);
    assert_eq!(msg.ip.destination, PEER_IP);
    assert_eq!(msg.ip.proto, IpProto::Icmp as u8);
    assert_eq!(csum::checksum16(msg.payload), 0);

    let icmp = IcmpHdr::parse(msg.payload).unwrap();
    assert_eq!(icmp.icmp_type, IcmpType::DestinationUnreachable as u8);
    assert_eq!(icmp.code, UnreachableCode::Port as u8);

    // The original IP header and UDP header, checksum untouched
    assert_eq!(
        &msg.payload[IcmpHdr::LEN..],
        &original[EthHdr::LEN..UDP_OFFSET + UdpHdr::LEN]
    );
}

#[test]
fn open_and_close() {
    let (mut stack, _clock) = stack();
    resolve_peer(&mut stack);

    let first = record(&mut stack, 53);
    let second = record(&mut stack, 53);
    assert!(deliver(&mut stack, udp_frame(1024, 53, b"query")).is_empty());
    assert!(first.borrow().is_empty());
    assert_eq!(second.borrow().len(), 1);

    stack.udp_close(53);
    stack.udp_close(54);
    let sent = deliver(&mut stack, udp_frame(1024, 53, b"query"));
    assert_eq!(sent.len(), 1);
    assert_eq!(second.borrow().len(), 1);

    let msg = parse_ipv4(&sent[0]);
    assert_eq!(IcmpHdr::parse(msg.payload).unwrap().code, UnreachableCode::Port as u8);
}

#[test]
fn checksum_validation() {
    let (mut stack, _clock) = stack();
    let received = record(&mut stack, 7);

    let mut corrupt = udp_frame(5000, 7, IPV4_DATA);
    corrupt[UDP_OFFSET + UdpHdr::CHECK_OFFSET] ^= 0x5a;
    assert!(deliver(&mut stack, corrupt).is_empty());

    let mut corrupt = udp_frame(5000, 7, IPV4_DATA);
    *corrupt.last_mut().unwrap() ^= 1;
    assert!(deliver(&mut stack, corrupt).is_empty());
    assert!(received.borrow().is_empty());

    // Zero means the sender did not calculate a checksum
    let mut unchecked = udp_frame(5000, 7, IPV4_DATA);
    unchecked[UDP_OFFSET + UdpHdr::CHECK_OFFSET..UDP_OFFSET + UdpHdr::CHECK_OFFSET + 2].fill(0);
    *unchecked.last_mut().unwrap() ^= 1;
    assert!(deliver(&mut stack, unchecked).is_empty());
    assert_eq!(received.borrow().len(), 1);
}

#[test]
fn length_validation() {
    let (mut stack, _clock) = stack();
    let received = record(&mut stack, 7);

    let segment = |length: u16, data: &[u8]| {
        let mut segment = UdpHdr {
            source: 5000,
            destination: 7,
            length,
            check: 0,
        }
        .to_bytes()
        .to_vec();
        segment.extend_from_slice(data);
        segment
    };

    let udp = IpProto::Udp as u8;
    assert!(deliver(&mut stack, ipv4_frame(udp, &segment(13, b"four"))).is_empty());
    assert!(deliver(&mut stack, ipv4_frame(udp, &segment(7, b"four"))).is_empty());
    assert!(deliver(&mut stack, ipv4_frame(udp, &[0; 7])).is_empty());
    assert!(received.borrow().is_empty());

    // Bytes past the UDP length are ignored
    assert!(deliver(&mut stack, ipv4_frame(udp, &segment(10, b"twoEXTRA"))).is_empty());
    assert_eq!(received.borrow()[0].0, b"tw");
}

/// A calculated checksum of zero is sent as all ones and accepted as such
#[test]
fn zero_checksum_sent_as_ones() {
    let (mut stack, _clock) = stack();
    resolve_peer(&mut stack);

    // Pick the payload that makes the ones' complement sum all ones
    let mut segment = UdpHdr {
        source: 1234,
        destination: 4321,
        length: UdpHdr::LEN as u16 + 2,
        check: 0,
    }
    .to_bytes()
    .to_vec();
    segment.extend_from_slice(&[0, 0]);
    let data = csum::transport_checksum(IpProto::Udp as u8, &segment, LOCAL_IP, PEER_IP).to_be_bytes();

    stack.udp_send(&data, 1234, PEER_IP, 4321);
    let sent = stack.link_mut().take_sent();
    let (udp, _) = parse_udp(&sent[0]);
    assert_eq!(udp.check, 0xffff);

    let (mut peer, _clock) = stack_with(
        StackCfgBuilder {
            ip: PEER_IP,
            mac: PEER_MAC,
            ..Default::default()
        }
        .build()
        .unwrap(),
    );
    let received = record(&mut peer, 4321);
    deliver(&mut peer, sent[0].clone());
    assert_eq!(received.borrow()[0], (data.to_vec(), LOCAL_IP, 1234));
}

#[test]
fn send_before_resolution() {
    let (mut stack, _clock) = stack();

    stack.udp_out(Packet::from_payload(0, b"early"), 68, PEER_IP, 67);
    assert_eq!(stack.link_mut().take_sent().len(), 1);
    assert_eq!(stack.arp_pending(), [PEER_IP]);

    let sent = deliver(
        &mut stack,
        arp_frame(ArpOp::Reply, PEER_MAC, PEER_IP, LOCAL_MAC, LOCAL_IP),
    );
    let (udp, data) = parse_udp(&sent[0]);
    assert_eq!((udp.source, udp.destination), (68, 67));
    assert_eq!(data, b"early");
}

/// Handlers may drive the stack, but a handler is never re-entered
#[test]
fn handlers_drive_the_stack() {
    let (mut stack, _clock) = stack();
    let calls = Rc::new(RefCell::new(0));

    let counter = calls.clone();
    stack.udp_open(7, move |stack, _data, _src_ip, _src_port| {
        *counter.borrow_mut() += 1;
        // The next datagram for this port arrives while we are still running
        assert!(stack.poll().unwrap());
        stack.udp_close(7);
    });

    stack.link_mut().inject(udp_frame(5000, 7, b"one"));
    stack.link_mut().inject(udp_frame(5000, 7, b"two"));
    assert!(stack.poll().unwrap());
    assert_eq!(*calls.borrow(), 1);
    assert!(stack.link_mut().take_sent().is_empty());

    // Closed by the handler itself
    let sent = deliver(&mut stack, udp_frame(5000, 7, b"three"));
    assert_eq!(sent.len(), 1);
    assert_eq!(stack.arp_pending(), [PEER_IP]);
}

/// The largest datagram still fits the 16-bit length fields, anything larger
/// is dropped rather than sent with a wrapped length
#[test]
fn largest_datagram() {
    let (mut stack, _clock) = stack();
    resolve_peer(&mut stack);

    stack.udp_send(&jumbo(MAX_DATAGRAM), 5000, PEER_IP, 5001);
    let sent = stack.link_mut().take_sent();
    let threshold = stack.config().fragment_threshold();
    let total = UdpHdr::LEN + MAX_DATAGRAM;
    assert_eq!(sent.len(), total.div_ceil(threshold));

    let udp = UdpHdr::parse(parse_ipv4(&sent[0]).payload).unwrap();
    assert_eq!(udp.length, u16::MAX - Ipv4Hdr::LEN as u16);

    let last = parse_ipv4(&sent[sent.len() - 1]);
    assert!(!last.ip.more_fragments());
    assert_eq!(last.ip.fragment_offset(), (sent.len() - 1) * threshold);
    assert_eq!(last.ip.fragment_offset() + last.payload.len(), total);

    stack.udp_send(&jumbo(MAX_DATAGRAM + 1), 5000, PEER_IP, 5001);
    stack.udp_out(
        Packet::from_payload(64, &jumbo(70_000)),
        5000,
        PEER_IP,
        5001,
    );
    assert!(stack.link_mut().take_sent().is_empty());
}
