//! [ARP](https://en.wikipedia.org/wiki/Address_Resolution_Protocol) resolution
//! of IPv4 addresses to MAC addresses
//!
//! Resolved addresses are cached for [`StackCfg::arp_timeout`]. A datagram
//! sent to an address that is not in the cache is held in a single slot per
//! destination while the request is outstanding, and any further datagram to
//! the same destination is dropped until the slot is either flushed by an ARP
//! packet from that destination or expires after [`StackCfg::arp_min_interval`].

use crate::{
    NetStack, Packet,
    config::StackCfg,
    link::Link,
    packet::net_types::{ArpHdr, ArpOp, EtherType, MacAddress},
    table::ExpiringMap,
};
use std::{fmt, net::Ipv4Addr, time::Duration};

/// The ARP cache and the pending datagram slots
#[derive(Debug)]
pub(crate) struct ArpTables {
    cache: ExpiringMap<Ipv4Addr, MacAddress>,
    pending: ExpiringMap<Ipv4Addr, Packet>,
}

impl ArpTables {
    pub(crate) fn new(cfg: &StackCfg) -> Self {
        Self {
            cache: ExpiringMap::new(Some(cfg.arp_timeout)),
            pending: ExpiringMap::new(Some(cfg.arp_min_interval)),
        }
    }
}

/// A live entry of the ARP cache
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ArpEntry {
    /// The resolved address
    pub ip: Ipv4Addr,
    /// The MAC address `ip` resolves to
    pub mac: MacAddress,
    /// Time since the mapping was last observed
    pub age: Duration,
}

impl fmt::Display for ArpEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} | {} | {}s", self.ip, self.mac, self.age.as_secs())
    }
}

impl<L: Link> NetStack<L> {
    fn send_arp(&mut self, arp: ArpHdr, destination: MacAddress) {
        let mut packet = self.alloc(ArpHdr::LEN);
        packet.append(&arp.to_bytes());
        self.ethernet_out(packet, destination, EtherType::Arp as u16);
    }

    /// Broadcasts a request asking who has `target_ip`
    pub fn arp_request(&mut self, target_ip: Ipv4Addr) {
        log::debug!("who has {target_ip}? tell {}", self.cfg.ip);

        let arp = ArpHdr::new(
            ArpOp::Request,
            self.cfg.mac,
            self.cfg.ip,
            MacAddress::ZERO,
            target_ip,
        );
        self.send_arp(arp, MacAddress::BROADCAST);
    }

    /// Tells `target_mac` that the local address is at the local MAC
    pub fn arp_reply(&mut self, target_ip: Ipv4Addr, target_mac: MacAddress) {
        log::debug!("{} is at {}, telling {target_ip}", self.cfg.ip, self.cfg.mac);

        let arp = ArpHdr::new(
            ArpOp::Reply,
            self.cfg.mac,
            self.cfg.ip,
            target_mac,
            target_ip,
        );
        self.send_arp(arp, target_mac);
    }

    /// Processes a received ARP packet
    ///
    /// Every valid packet, request or reply, refreshes the cache entry of its
    /// sender. If a datagram was waiting on the sender it is flushed, otherwise
    /// a request for the local address is answered.
    pub fn arp_in(&mut self, packet: Packet, _src_mac: MacAddress) {
        let arp = match ArpHdr::parse(&packet) {
            Ok(arp) => arp,
            Err(err) => {
                log::trace!("dropping arp packet: {err}");
                return;
            }
        };

        if !arp.is_supported() {
            log::trace!(
                "dropping arp packet: hw {} proto {:#06x} lengths {}/{} op {}",
                arp.hardware_type,
                arp.protocol_type,
                arp.hardware_len,
                arp.protocol_len,
                arp.opcode
            );
            return;
        }

        let now = self.now();
        log::debug!("learned {} is at {}", arp.sender_ip, arp.sender_mac);
        self.arp.cache.set(arp.sender_ip, arp.sender_mac, now);

        if let Some(pending) = self.arp.pending.take(&arp.sender_ip, now) {
            log::debug!(
                "flushing {} byte datagram to {}",
                pending.len(),
                arp.sender_ip
            );
            self.ethernet_out(pending, arp.sender_mac, EtherType::Ipv4 as u16);
            return;
        }

        if arp.opcode == ArpOp::Request as u16 && arp.target_ip == self.cfg.ip {
            self.arp_reply(arp.sender_ip, arp.sender_mac);
        }
    }

    /// Sends an IPv4 datagram to `target_ip`, resolving its MAC first if needed
    ///
    /// If the address is not cached the datagram is held until the address is
    /// resolved, unless another datagram is already held for it, in which case
    /// this one is dropped.
    pub fn arp_out(&mut self, packet: Packet, target_ip: Ipv4Addr) {
        let now = self.now();

        if let Some(mac) = self.arp.cache.get(&target_ip, now).copied() {
            self.ethernet_out(packet, mac, EtherType::Ipv4 as u16);
            return;
        }

        if self.arp.pending.get(&target_ip, now).is_some() {
            log::trace!(
                "dropping {} byte datagram: {target_ip} is already being resolved",
                packet.len()
            );
            return;
        }

        self.arp.pending.set(target_ip, packet, now);
        self.arp_request(target_ip);
    }

    /// The live entries of the ARP cache, ordered by address
    pub fn arp_entries(&self) -> Vec<ArpEntry> {
        let now = self.now();
        let mut entries = Vec::with_capacity(self.arp.cache.len());
        self.arp.cache.for_each(now, |ip, mac, stamp| {
            entries.push(ArpEntry {
                ip: *ip,
                mac: *mac,
                age: now.saturating_duration_since(stamp),
            });
        });
        entries.sort_unstable_by_key(|entry| entry.ip);
        entries
    }

    /// The addresses a datagram is currently held for, ordered by address
    pub fn arp_pending(&self) -> Vec<Ipv4Addr> {
        let mut pending = Vec::new();
        self.arp
            .pending
            .for_each(self.now(), |ip, _, _| pending.push(*ip));
        pending.sort_unstable();
        pending
    }
}
