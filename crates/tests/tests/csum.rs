use netlab::packet::{
    csum,
    net_types::{EthHdr, IpProto, Ipv4Hdr, UdpHdr},
};
use tests::*;

fn reference(data: &[u8]) -> u16 {
    let mut csum = internet_checksum::Checksum::new();
    csum.add_bytes(data);
    u16::from_be_bytes(csum.checksum())
}

/// Ensures our checksum agrees with another implementation for even, odd and
/// empty inputs
#[test]
fn matches_internet_checksum() {
    let data = jumbo(1501);

    for len in [0usize, 1, 2, 3, 7, 8, 19, 20, 63, 64, 65, 255, 1024, 1501] {
        assert_eq!(csum::checksum16(&data[..len]), reference(&data[..len]), "len {len}");
    }

    assert_eq!(csum::checksum16(LARGER), reference(LARGER));
    assert_eq!(csum::checksum16(&[0xff; 64]), reference(&[0xff; 64]));
}

/// Summing several spans yields the same result as summing them joined
#[test]
fn partial_spans() {
    let data = jumbo(333);
    let (head, tail) = data.split_at(128);

    let joined = csum::checksum16(&data);
    let spans = csum::fold_checksum(csum::partial(tail, csum::partial(head, 0)));
    assert_eq!(joined, spans);
}

/// Calculating is deterministic and never modifies its input
#[test]
fn side_effect_free() {
    let data = IPV4_DATA.to_vec();
    let first = csum::checksum16(&data);
    assert_eq!(first, csum::checksum16(&data));
    assert_eq!(data, IPV4_DATA);

    let first = csum::transport_checksum(IpProto::Udp as u8, &data, PEER_IP, LOCAL_IP);
    assert_eq!(
        first,
        csum::transport_checksum(IpProto::Udp as u8, &data, PEER_IP, LOCAL_IP)
    );
    assert_eq!(data, IPV4_DATA);
}

/// Ensures we generate the correct IPv4 header checksum
#[test]
fn checksums_ipv4_header() {
    let frame = udp_frame(9000, 10001, IPV4_DATA);

    let mut ip_hdr = Ipv4Hdr::parse(&frame[EthHdr::LEN..]).unwrap();
    let valid_checksum = ip_hdr.check;
    ip_hdr.calc_checksum();
    assert_eq!(valid_checksum, ip_hdr.check);

    // Embedding the checksum in the header makes it sum to zero
    assert_eq!(
        csum::checksum16(&frame[EthHdr::LEN..EthHdr::LEN + Ipv4Hdr::LEN]),
        0
    );
}

/// Ensures we generate the correct IPv4 UDP checksum
#[test]
fn checksums_ipv4_udp() {
    let payloads: [&[u8]; 4] = [IPV4_DATA, LARGER, b"", b"odd"];
    for data in payloads {
        let frame = udp_frame(9000, 10001, data);
        let udp_offset = EthHdr::LEN + Ipv4Hdr::LEN;
        let udp = UdpHdr::parse(&frame[udp_offset..]).unwrap();

        let mut segment = frame[udp_offset..].to_vec();
        segment[UdpHdr::CHECK_OFFSET..UdpHdr::CHECK_OFFSET + 2].fill(0);
        assert_eq!(
            csum::transport_checksum(IpProto::Udp as u8, &segment, PEER_IP, LOCAL_IP),
            udp.check
        );

        let hdr = etherparse::UdpHeader {
            source_port: udp.source,
            destination_port: udp.destination,
            length: udp.length,
            checksum: 0,
        };
        assert_eq!(
            hdr.calc_checksum_ipv4_raw(PEER_IP.octets(), LOCAL_IP.octets(), data)
                .unwrap(),
            udp.check
        );
    }
}

/// The pseudo header is laid out as `src || dst || 0 || proto || length`
#[test]
fn pseudo_header_layout() {
    let pseudo = csum::pseudo_header(IpProto::Udp as u8, PEER_IP, LOCAL_IP, 0x0123);
    assert_eq!(
        pseudo,
        [10, 0, 0, 2, 10, 0, 0, 1, 0, 17, 0x01, 0x23]
    );
}
