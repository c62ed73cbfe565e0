//! UDP datagrams and port keyed dispatch to application handlers

use crate::{
    NetStack, Packet,
    ip::MAX_PAYLOAD,
    link::Link,
    packet::{
        csum,
        net_types::{IpProto, Ipv4Hdr, UdpHdr, UnreachableCode},
    },
};
use std::{cell::RefCell, net::Ipv4Addr, rc::Rc};

/// An application handler bound to a UDP port
///
/// It is called with the stack, the datagram payload, and the address and
/// port of the sender, and may send through the stack, or open and close
/// ports, while it runs.
pub type UdpHandler<L> = Rc<RefCell<dyn FnMut(&mut NetStack<L>, &[u8], Ipv4Addr, u16)>>;

/// The largest payload a single datagram can carry
pub const MAX_DATAGRAM: usize = MAX_PAYLOAD - UdpHdr::LEN;

/// The checksum as transmitted, a calculated 0 is sent as all ones as 0 means
/// no checksum
#[inline]
fn wire_checksum(check: u16) -> u16 {
    if check == 0 { 0xffff } else { check }
}

impl<L: Link> NetStack<L> {
    /// Validates a received datagram and hands its payload to the handler
    /// bound to its destination port
    ///
    /// A datagram for a port nobody listens on is answered with an ICMP port
    /// unreachable.
    pub fn udp_in(&mut self, mut packet: Packet, src_ip: Ipv4Addr) {
        let udp = match UdpHdr::parse(&packet) {
            Ok(udp) => udp,
            Err(err) => {
                log::trace!("dropping udp datagram from {src_ip}: {err}");
                return;
            }
        };

        let length = udp.length as usize;
        if length > packet.len() || length < UdpHdr::LEN {
            log::trace!(
                "dropping udp datagram from {src_ip}: length {length}, received {}",
                packet.len()
            );
            return;
        }
        packet.truncate(length);

        if udp.check != 0 {
            let check_field = UdpHdr::CHECK_OFFSET..UdpHdr::CHECK_OFFSET + 2;
            packet[check_field.clone()].fill(0);
            let calculated =
                csum::transport_checksum(IpProto::Udp as u8, &packet, src_ip, self.cfg.ip);
            packet[check_field].copy_from_slice(&udp.check.to_be_bytes());

            if wire_checksum(calculated) != udp.check {
                log::trace!(
                    "dropping udp datagram from {src_ip}:{}: checksum {:#06x}, expected {:#06x}",
                    udp.source,
                    udp.check,
                    wire_checksum(calculated)
                );
                return;
            }
        }

        let Some(bound) = self.udp_ports.get(&udp.destination).cloned() else {
            log::debug!(
                "port {} unreachable for {src_ip}:{}",
                udp.destination,
                udp.source
            );
            // The IP header is still in front of the datagram, options are not
            // accounted for
            if let Err(err) = packet.adjust_head(-(Ipv4Hdr::LEN as i32)) {
                log::trace!("unable to quote udp datagram: {err}");
                return;
            }
            self.icmp_unreachable(&packet, src_ip, UnreachableCode::Port);
            return;
        };

        if let Err(err) = packet.pull_header(UdpHdr::LEN) {
            log::trace!("dropping udp datagram: {err}");
            return;
        }

        log::debug!(
            "{} bytes from {src_ip}:{} to port {}",
            packet.len(),
            udp.source,
            udp.destination
        );

        let Ok(mut handler) = bound.try_borrow_mut() else {
            log::trace!(
                "dropping udp datagram for port {}: handler is already running",
                udp.destination
            );
            return;
        };
        (&mut *handler)(self, &packet, src_ip, udp.source);
    }

    /// Prepends a UDP header to `packet` and sends it to `dst_ip:dst_port`
    ///
    /// A payload larger than [`MAX_DATAGRAM`] is dropped.
    pub fn udp_out(&mut self, mut packet: Packet, src_port: u16, dst_ip: Ipv4Addr, dst_port: u16) {
        if packet.len() > MAX_DATAGRAM {
            log::trace!(
                "dropping {} byte datagram to {dst_ip}:{dst_port}: exceeds {MAX_DATAGRAM}",
                packet.len()
            );
            return;
        }

        let mut udp = UdpHdr {
            source: src_port,
            destination: dst_port,
            length: (UdpHdr::LEN + packet.len()) as u16,
            check: 0,
        };
        packet
            .push_header(UdpHdr::LEN)
            .copy_from_slice(&udp.to_bytes());

        udp.check = wire_checksum(csum::transport_checksum(
            IpProto::Udp as u8,
            &packet,
            self.cfg.ip,
            dst_ip,
        ));
        packet[UdpHdr::CHECK_OFFSET..UdpHdr::CHECK_OFFSET + 2]
            .copy_from_slice(&udp.check.to_be_bytes());

        self.ip_out(packet, dst_ip, IpProto::Udp as u8);
    }

    /// Sends a copy of `data` to `dst_ip:dst_port`
    pub fn udp_send(&mut self, data: &[u8], src_port: u16, dst_ip: Ipv4Addr, dst_port: u16) {
        let packet = Packet::from_payload(self.cfg.head_room, data);
        self.udp_out(packet, src_port, dst_ip, dst_port);
    }

    /// Binds `handler` to `port`, replacing any handler already bound to it
    pub fn udp_open<F>(&mut self, port: u16, handler: F)
    where
        F: FnMut(&mut NetStack<L>, &[u8], Ipv4Addr, u16) + 'static,
    {
        let handler: UdpHandler<L> = Rc::new(RefCell::new(handler));
        self.udp_ports.insert(port, handler);
    }

    /// Unbinds the handler of `port`, if any
    #[inline]
    pub fn udp_close(&mut self, port: u16) {
        self.udp_ports.remove(&port);
    }
}
