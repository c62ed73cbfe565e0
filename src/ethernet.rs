//! Ethernet II framing and demultiplexing by [`EtherType`](crate::packet::net_types::EtherType)

use crate::{
    NetStack, Packet,
    link::Link,
    packet::net_types::{EthHdr, MacAddress},
};

impl<L: Link> NetStack<L> {
    /// Strips the Ethernet header from a received frame and hands the payload
    /// to the handler registered for its ether type
    ///
    /// Frames shorter than a header, or with an unregistered ether type, are
    /// dropped. The destination address is not filtered, the link is expected
    /// to only deliver frames meant for this host.
    pub fn ethernet_in(&mut self, mut packet: Packet) {
        let eth = match EthHdr::parse(&packet) {
            Ok(eth) => eth,
            Err(err) => {
                log::trace!("dropping ethernet frame: {err}");
                return;
            }
        };

        let Some(handler) = self.ethertype_handler(eth.ether_type) else {
            log::trace!(
                "dropping ethernet frame from {}: no handler for ether type {:#06x}",
                eth.source,
                eth.ether_type
            );
            return;
        };

        if let Err(err) = packet.pull_header(EthHdr::LEN) {
            log::trace!("dropping ethernet frame: {err}");
            return;
        }

        handler(self, packet, eth.source)
    }

    /// Frames `packet` and sends it to `destination`
    ///
    /// Payloads shorter than the configured minimum are zero padded. A failure
    /// of the link is logged and the frame is lost.
    pub fn ethernet_out(&mut self, mut packet: Packet, destination: MacAddress, ether_type: u16) {
        let min_payload = self.cfg.min_payload;
        if packet.len() < min_payload {
            packet.pad(min_payload - packet.len());
        }

        let eth = EthHdr {
            destination,
            source: self.cfg.mac,
            ether_type,
        };
        packet
            .push_header(EthHdr::LEN)
            .copy_from_slice(&eth.to_bytes());

        self.transmit(&packet);
    }
}
