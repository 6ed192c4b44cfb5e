//! Address validation — advisory filters applied to externally supplied
//! values before they reach the peer table.
//!
//! These predicates never fail loudly: a value that does not pass makes the
//! enclosing operation a no-op, it never raises an error that could disturb
//! other connections.

use std::net::{IpAddr, Ipv4Addr};

/// True iff `s` is a dotted-quad IPv4 literal: four octets 0–255, no leading
/// zero in any octet except the literal `"0"`, no trailing characters.
pub fn is_valid_ipv4_literal(s: &str) -> bool {
    let mut octets = 0u8;
    for part in s.split('.') {
        octets += 1;
        if octets > 4 {
            return false;
        }
        if part.is_empty() || part.len() > 3 {
            return false;
        }
        if !part.bytes().all(|b| b.is_ascii_digit()) {
            return false;
        }
        if part.len() > 1 && part.starts_with('0') {
            return false;
        }
        match part.parse::<u16>() {
            Ok(v) if v <= 255 => {}
            _ => return false,
        }
    }
    octets == 4
}

/// True iff `n` is a usable port number: strictly greater than 0 and
/// strictly less than 65536.
pub fn is_valid_port(n: u32) -> bool {
    (1..=65535).contains(&n)
}

/// Classify a transport-observed address as IPv4, stripping the `::ffff:`
/// IPv6-mapped representation some stacks report for IPv4 peers.
///
/// `None` means the connection is not serviceable and must be closed
/// (fatal for that connection only).
pub fn normalize_observed_ip(ip: IpAddr) -> Option<Ipv4Addr> {
    match ip {
        IpAddr::V4(v4) => Some(v4),
        IpAddr::V6(v6) => v6.to_ipv4_mapped(),
    }
}
