use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use netlab::packet::{
    csum,
    net_types::{EthHdr, IpProto, Ipv4Hdr, UdpHdr},
};
use std::{hint::black_box, net::Ipv4Addr};

const SRC: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 139);
const DST: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 1);

fn generate(len: usize) -> (Vec<u8>, u16) {
    const PAYLOAD: &[u8] = &[0xc0; 2048];

    let builder = etherparse::PacketBuilder::ethernet2([1, 1, 1, 1, 1, 1], [2, 2, 2, 2, 2, 2])
        .ipv4(SRC.octets(), DST.octets(), 64)
        .udp(8888, 54321);
    let mut frame = Vec::with_capacity(builder.size(len));
    builder.write(&mut frame, &PAYLOAD[..len]).unwrap();

    let mut segment = frame[EthHdr::LEN + Ipv4Hdr::LEN..].to_vec();
    let expected = UdpHdr::parse(&segment).unwrap().check;
    segment[UdpHdr::CHECK_OFFSET..UdpHdr::CHECK_OFFSET + 2].fill(0);
    (segment, expected)
}

#[inline]
fn csum_netlab(segment: &[u8]) -> u16 {
    csum::transport_checksum(IpProto::Udp as u8, segment, SRC, DST)
}

fn csum_ic(segment: &[u8]) -> u16 {
    let mut csum = internet_checksum::Checksum::new();
    csum.add_bytes(&csum::pseudo_header(
        IpProto::Udp as u8,
        SRC,
        DST,
        segment.len() as u16,
    ));
    csum.add_bytes(segment);
    u16::from_be_bytes(csum.checksum())
}

fn csum_ep(segment: &[u8]) -> u16 {
    let udp = UdpHdr::parse(segment).unwrap();
    let hdr = etherparse::UdpHeader {
        source_port: udp.source,
        destination_port: udp.destination,
        length: udp.length,
        checksum: 0,
    };

    hdr.calc_checksum_ipv4_raw(SRC.octets(), DST.octets(), &segment[UdpHdr::LEN..])
        .unwrap()
}

fn bench_csum(c: &mut Criterion) {
    let mut group = c.benchmark_group("csum");

    for i in [
        0usize, 1, 10, 32, 33, 63, 72, 80, 81, 127, 128, 256, 512, 773, 919, 1024, 1409,
    ] {
        let (segment, expected) = generate(i);

        // Sanity check that all algorithms calculate the same
        assert_eq!(csum_netlab(&segment), expected);
        assert_eq!(csum_ic(&segment), expected);
        assert_eq!(csum_ep(&segment), expected);

        group.bench_function(BenchmarkId::new("ipv4 netlab", i), |b| {
            b.iter(|| csum_netlab(black_box(&segment)));
        });
        group.bench_function(BenchmarkId::new("ipv4 internet-checksum", i), |b| {
            b.iter(|| csum_ic(black_box(&segment)));
        });
        group.bench_function(BenchmarkId::new("ipv4 etherparse", i), |b| {
            b.iter(|| csum_ep(black_box(&segment)));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_csum);
criterion_main!(benches);
