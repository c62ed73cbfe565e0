use netlab::{
    NetStack, Packet,
    error::{Error, LinkError},
    link::{Link, MemoryLink},
    packet::net_types::{EthHdr, MacAddress},
};
use tests::*;

const EXPERIMENTAL: u16 = 0x88b5;

fn bounce(stack: &mut Stack, packet: Packet, src_mac: MacAddress) {
    stack.ethernet_out(packet, src_mac, EXPERIMENTAL);
}

#[test]
fn poll_empty() {
    let (mut stack, _clock) = stack();
    assert!(!stack.poll().unwrap());
    assert!(stack.link().sent().is_empty());
}

#[test]
fn drops_runt_and_unknown() {
    let (mut stack, _clock) = stack();

    assert!(deliver(&mut stack, vec![0xffu8; EthHdr::LEN - 1]).is_empty());
    assert!(deliver(&mut stack, Vec::<u8>::new()).is_empty());
    assert!(deliver(&mut stack, eth_frame(LOCAL_MAC, PEER_MAC, EXPERIMENTAL, b"hi")).is_empty());
    // IPv6 is not spoken
    assert!(deliver(&mut stack, eth_frame(LOCAL_MAC, PEER_MAC, 0x86dd, &[0x60; 40])).is_empty());
}

#[test]
fn registered_ethertype() {
    let (mut stack, _clock) = stack();
    stack.register_ethertype(EXPERIMENTAL, bounce);

    let sent = deliver(&mut stack, eth_frame(LOCAL_MAC, PEER_MAC, EXPERIMENTAL, b"hello"));
    assert_eq!(sent.len(), 1);

    let frame = &sent[0];
    let eth = EthHdr::parse(frame).unwrap();
    assert_eq!(eth.destination, PEER_MAC);
    assert_eq!(eth.source, LOCAL_MAC);
    assert_eq!(eth.ether_type, EXPERIMENTAL);

    // Short payloads are zero padded to the minimum
    assert_eq!(frame.len(), EthHdr::LEN + 46);
    assert_eq!(&frame[EthHdr::LEN..EthHdr::LEN + 5], b"hello");
    assert!(frame[EthHdr::LEN + 5..].iter().all(|b| *b == 0));
}

#[test]
fn no_padding_when_long_enough() {
    let (mut stack, _clock) = stack();

    stack.ethernet_out(Packet::from_payload(14, LARGER), PEER_MAC, EXPERIMENTAL);
    stack.ethernet_out(Packet::from_payload(0, &[1; 46]), PEER_MAC, EXPERIMENTAL);

    let sent = stack.link_mut().take_sent();
    assert_eq!(sent[0].len(), EthHdr::LEN + LARGER.len());
    assert_eq!(&sent[0][EthHdr::LEN..], LARGER);
    assert_eq!(sent[1].len(), EthHdr::LEN + 46);
}

#[test]
fn oversized_frame_is_a_link_error() {
    let (mut stack, _clock) = stack();
    let oversized = vec![0u8; stack.config().max_frame() + 1];
    stack.link_mut().inject(oversized);

    assert!(matches!(
        stack.poll(),
        Err(Error::Link(LinkError::Oversized { .. }))
    ));
    // The link moves on to the next frame
    assert!(!stack.poll().unwrap());
}

/// A link whose every send fails
#[derive(Default)]
struct Unplugged {
    attempts: usize,
}

impl Link for Unplugged {
    fn send(&mut self, _frame: &[u8]) -> Result<(), LinkError> {
        self.attempts += 1;
        Err(LinkError::Closed)
    }

    fn receive(&mut self, _buf: &mut [u8]) -> Result<Option<usize>, LinkError> {
        Ok(None)
    }
}

#[test]
fn send_failures_are_not_fatal() {
    init_logger();

    let mut stack = NetStack::new(cfg(), Unplugged::default());
    // The startup announcement
    assert_eq!(stack.link().attempts, 1);

    stack.ethernet_out(Packet::from_payload(0, b"lost"), PEER_MAC, EXPERIMENTAL);
    assert_eq!(stack.link().attempts, 2);
    assert!(!stack.poll().unwrap());
}

#[test]
fn borrowed_link() {
    init_logger();

    let mut link = MemoryLink::default();
    {
        let mut stack = NetStack::new(cfg(), &mut link);
        stack.ethernet_out(Packet::from_payload(0, b"via ref"), PEER_MAC, EXPERIMENTAL);
    }
    assert_eq!(link.sent().len(), 2);
}
