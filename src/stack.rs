use crate::{
    Packet,
    arp::ArpTables,
    clock::{Clock, SystemClock},
    config::StackCfg,
    error::Error,
    link::Link,
    packet::net_types::{EtherType, IpProto, MacAddress},
    udp::UdpHandler,
};
use std::{collections::HashMap, net::Ipv4Addr};

/// Handles the payload of an Ethernet frame, called with the MAC of the sender
pub type EthernetHandler<L> = fn(&mut NetStack<L>, Packet, MacAddress);
/// Handles the payload of an IPv4 packet, called with the IP of the sender
pub type IpHandler<L> = fn(&mut NetStack<L>, Packet, Ipv4Addr);

/// A host IPv4 stack bound to a single [`Link`]
///
/// The stack owns every table it needs, the ARP cache and pending slots, the
/// handler registries, the UDP ports and the datagram id counter, and is only
/// ever driven from the thread that owns it. Inbound traffic is processed
/// exclusively by [`Self::poll`], outbound traffic is sent synchronously from
/// whichever call produced it.
pub struct NetStack<L: Link> {
    link: L,
    clock: Box<dyn Clock>,
    pub(crate) cfg: StackCfg,
    rx_buf: Vec<u8>,
    ether_types: HashMap<u16, EthernetHandler<L>>,
    ip_protocols: HashMap<u8, IpHandler<L>>,
    pub(crate) arp: ArpTables,
    /// The identification of the next datagram sent
    pub(crate) next_id: u16,
    pub(crate) udp_ports: HashMap<u16, UdpHandler<L>>,
}

impl<L: Link> NetStack<L> {
    /// Creates a stack that ages its ARP tables with the [`SystemClock`]
    ///
    /// This immediately broadcasts an ARP request for the local address.
    pub fn new(cfg: StackCfg, link: L) -> Self {
        Self::with_clock(cfg, link, SystemClock)
    }

    /// Creates a stack that ages its ARP tables with the provided [`Clock`]
    pub fn with_clock(cfg: StackCfg, link: L, clock: impl Clock + 'static) -> Self {
        let mut stack = Self {
            link,
            clock: Box::new(clock),
            rx_buf: vec![0; cfg.max_frame()],
            arp: ArpTables::new(&cfg),
            cfg,
            ether_types: HashMap::new(),
            ip_protocols: HashMap::new(),
            next_id: 0,
            udp_ports: HashMap::new(),
        };

        stack.register_ethertype(EtherType::Arp as u16, Self::arp_in);
        stack.register_ethertype(EtherType::Ipv4 as u16, Self::ip_in);
        stack.register_ip_protocol(IpProto::Icmp as u8, Self::icmp_in);
        stack.register_ip_protocol(IpProto::Udp as u8, Self::udp_in);

        // Announce ourselves, any peer that already knows us refreshes its cache
        let local = stack.cfg.ip;
        stack.arp_request(local);

        stack
    }

    /// Receives at most one frame from the link and processes it to completion
    ///
    /// Returns `Ok(true)` if a frame was processed, and `Ok(false)` if the link
    /// had nothing pending. Malformed frames are dropped silently, only
    /// failures of the link itself are surfaced.
    pub fn poll(&mut self) -> Result<bool, Error> {
        let Some(len) = self.link.receive(&mut self.rx_buf)? else {
            return Ok(false);
        };

        let packet = Packet::from_payload(0, &self.rx_buf[..len]);
        self.ethernet_in(packet);
        Ok(true)
    }

    /// Registers the handler for Ethernet frames of `ether_type`, replacing
    /// any previous handler
    #[inline]
    pub fn register_ethertype(&mut self, ether_type: u16, handler: EthernetHandler<L>) {
        self.ether_types.insert(ether_type, handler);
    }

    /// Registers the handler for IPv4 packets carrying `proto`, replacing any
    /// previous handler
    #[inline]
    pub fn register_ip_protocol(&mut self, proto: u8, handler: IpHandler<L>) {
        self.ip_protocols.insert(proto, handler);
    }

    #[inline]
    pub(crate) fn ethertype_handler(&self, ether_type: u16) -> Option<EthernetHandler<L>> {
        self.ether_types.get(&ether_type).copied()
    }

    #[inline]
    pub(crate) fn ip_handler(&self, proto: u8) -> Option<IpHandler<L>> {
        self.ip_protocols.get(&proto).copied()
    }

    /// The configuration the stack was created with
    #[inline]
    pub fn config(&self) -> &StackCfg {
        &self.cfg
    }

    /// The underlying link
    #[inline]
    pub fn link(&self) -> &L {
        &self.link
    }

    /// The underlying link
    #[inline]
    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    #[inline]
    pub(crate) fn now(&self) -> std::time::Instant {
        self.clock.now()
    }

    /// Allocates an empty packet with the configured headroom
    #[inline]
    pub(crate) fn alloc(&self, capacity: usize) -> Packet {
        Packet::with_capacity(self.cfg.head_room, capacity)
    }

    /// Hands a complete frame to the link, failures are logged and the frame
    /// is lost
    pub(crate) fn transmit(&mut self, frame: &[u8]) {
        if let Err(err) = self.link.send(frame) {
            log::warn!("failed to send {} byte frame: {err}", frame.len());
        }
    }
}

impl<L: Link + std::fmt::Debug> std::fmt::Debug for NetStack<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetStack")
            .field("link", &self.link)
            .field("cfg", &self.cfg)
            .field("next_id", &self.next_id)
            .field("udp_ports", &self.udp_ports.len())
            .finish_non_exhaustive()
    }
}
