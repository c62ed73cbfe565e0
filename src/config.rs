//! [`StackCfg`] creation and validation

use crate::{
    error::{ConfigError, ConfigErrorKind, Error},
    packet::net_types::{EthHdr, Ipv4Hdr, MacAddress},
};
use std::{net::Ipv4Addr, time::Duration};

/// Builder for a [`StackCfg`].
///
/// Using [`StackCfgBuilder::default`] yields a stack on `10.0.0.1` with a
/// locally administered MAC, a 1500 byte MTU and the usual ARP timers.
#[derive(Clone, Debug)]
pub struct StackCfgBuilder {
    /// The single IPv4 address of the interface
    pub ip: Ipv4Addr,
    /// The MAC address of the interface
    pub mac: MacAddress,
    /// How long a learned IP → MAC mapping is trusted. Defaults to 5 minutes.
    pub arp_timeout: Duration,
    /// How long a packet waits for address resolution before a new send to
    /// the same IP may trigger another ARP request. Defaults to 1 second.
    pub arp_min_interval: Duration,
    /// Ethernet payloads shorter than this are zero padded. Defaults to 46.
    pub min_payload: usize,
    /// The largest IP packet, header included, sent in one frame. Defaults to 1500.
    ///
    /// `mtu - 20` is the fragment payload threshold and must be a multiple of 8
    pub mtu: usize,
    /// The TTL of every packet sent. Defaults to 64.
    pub ttl: u8,
    /// The type of service of every packet sent. Defaults to 0.
    pub tos: u8,
    /// Bytes reserved in front of freshly allocated packets so headers can be
    /// prepended without copying. Defaults to 64.
    pub head_room: usize,
}

impl Default for StackCfgBuilder {
    fn default() -> Self {
        Self {
            ip: Ipv4Addr::new(10, 0, 0, 1),
            mac: MacAddress([0x02, 0x00, 0x00, 0x00, 0x00, 0x01]),
            arp_timeout: Duration::from_secs(60 * 5),
            arp_min_interval: Duration::from_secs(1),
            min_payload: 46,
            mtu: 1500,
            ttl: 64,
            tos: 0,
            head_room: 64,
        }
    }
}

impl StackCfgBuilder {
    /// The largest MTU accepted, jumbo frames included
    pub const MAX_MTU: usize = 9000;

    /// Attempts to build a [`StackCfg`] that can be used with [`crate::NetStack::new`]
    ///
    /// # Examples
    ///
    /// ```
    /// let cfg = netlab::config::StackCfgBuilder::default().build().expect("failed to build stack cfg");
    /// assert_eq!(cfg.fragment_threshold(), 1480);
    /// ```
    pub fn build(self) -> Result<StackCfg, Error> {
        // 68 is the smallest MTU every IPv4 host must accept (RFC 791)
        let mtu = within_range!(self, mtu, 68..Self::MAX_MTU + 1);
        let fragment_threshold = mtu - Ipv4Hdr::LEN;
        if fragment_threshold % 8 != 0 {
            return Err(Error::Cfg(ConfigError {
                name: "mtu",
                kind: ConfigErrorKind::Unaligned {
                    size: fragment_threshold,
                    align: 8,
                },
            }));
        }

        let min_payload = within_range!(self, min_payload, 0..mtu + 1);
        let ttl = non_zero!(self, ttl);
        let arp_timeout = non_zero!(self, arp_timeout);
        let arp_min_interval = non_zero!(self, arp_min_interval);
        let head_room = within_range!(self, head_room, 0..64 * 1024);

        Ok(StackCfg {
            ip: self.ip,
            mac: self.mac,
            arp_timeout,
            arp_min_interval,
            min_payload,
            fragment_threshold,
            ttl,
            tos: self.tos,
            head_room,
        })
    }
}

/// The validated configuration of a [`crate::NetStack`]
#[derive(Clone, Debug)]
pub struct StackCfg {
    pub(crate) ip: Ipv4Addr,
    pub(crate) mac: MacAddress,
    pub(crate) arp_timeout: Duration,
    pub(crate) arp_min_interval: Duration,
    pub(crate) min_payload: usize,
    pub(crate) fragment_threshold: usize,
    pub(crate) ttl: u8,
    pub(crate) tos: u8,
    pub(crate) head_room: usize,
}

impl StackCfg {
    /// The IPv4 address of the interface
    #[inline]
    pub fn ip(&self) -> Ipv4Addr {
        self.ip
    }

    /// The MAC address of the interface
    #[inline]
    pub fn mac(&self) -> MacAddress {
        self.mac
    }

    /// The lifetime of an ARP cache entry
    #[inline]
    pub fn arp_timeout(&self) -> Duration {
        self.arp_timeout
    }

    /// The lifetime of a packet held while its destination is resolved
    #[inline]
    pub fn arp_min_interval(&self) -> Duration {
        self.arp_min_interval
    }

    /// The minimum Ethernet payload length
    #[inline]
    pub fn min_payload(&self) -> usize {
        self.min_payload
    }

    /// The largest IP payload sent without fragmenting
    #[inline]
    pub fn fragment_threshold(&self) -> usize {
        self.fragment_threshold
    }

    /// The largest frame the link may hand the stack
    #[inline]
    pub fn max_frame(&self) -> usize {
        EthHdr::LEN + self.fragment_threshold + Ipv4Hdr::LEN
    }

    /// The TTL of packets sent
    #[inline]
    pub fn ttl(&self) -> u8 {
        self.ttl
    }

    /// The type of service of packets sent
    #[inline]
    pub fn tos(&self) -> u8 {
        self.tos
    }

    /// The headroom reserved in packets the stack allocates
    #[inline]
    pub fn head_room(&self) -> usize {
        self.head_room
    }
}
