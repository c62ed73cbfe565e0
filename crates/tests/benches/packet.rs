use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use netlab::{NetStack, clock::ManualClock, link::MemoryLink, packet::net_types::ArpOp};
use std::hint::black_box;
use test_utils::*;

/// A UDP echo round trip through the whole stack, from frame in to frame out
fn bench_echo(c: &mut Criterion) {
    let mut group = c.benchmark_group("echo");

    let mut stack = NetStack::with_clock(cfg(), MemoryLink::default(), ManualClock::new());
    stack.link_mut().inject(arp_frame(
        ArpOp::Reply,
        PEER_MAC,
        PEER_IP,
        LOCAL_MAC,
        LOCAL_IP,
    ));
    stack.poll().unwrap();
    stack.udp_open(7, |stack, data, src_ip, src_port| {
        stack.udp_send(data, 7, src_ip, src_port);
    });

    for len in [0usize, 64, 512, 1472] {
        let frame = udp_frame(40000, 7, &vec![0xc0; len]);

        group.bench_function(BenchmarkId::new("udp", len), |b| {
            b.iter(|| {
                stack.link_mut().inject(black_box(frame.clone()));
                stack.poll().unwrap();
                black_box(stack.link_mut().take_sent())
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_echo);
criterion_main!(benches);
