#![deny(missing_docs)]
#![doc = include_str!("../README.md")]

macro_rules! within_range {
    ($ctx:expr, $name:ident, $range:expr) => {{
        let val = $ctx.$name;
        let uval = val as usize;

        if !$range.contains(&uval) {
            return Err($crate::error::ConfigError {
                name: stringify!($name),
                kind: $crate::error::ConfigErrorKind::OutOfRange {
                    size: uval,
                    range: $range,
                },
            }
            .into());
        }

        val
    }};
}

macro_rules! non_zero {
    ($ctx:expr, $name:ident) => {{
        let val = $ctx.$name;
        if val == Default::default() {
            return Err($crate::error::ConfigError {
                name: stringify!($name),
                kind: $crate::error::ConfigErrorKind::Zero,
            }
            .into());
        }

        val
    }};
}

pub mod arp;
pub mod clock;
pub mod config;
pub mod error;
pub mod ethernet;
pub mod icmp;
pub mod ip;
pub mod link;
pub mod packet;
mod stack;
pub mod table;
pub mod udp;

pub use packet::Packet;
pub use stack::{EthernetHandler, IpHandler, NetStack};
