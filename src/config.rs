use std::net::Ipv4Addr;

use nom::combinator::all_consuming;
use serde_derive::Serialize;

use crate::range::{self, RangeError};
use crate::tokens;

#[derive(Debug)]
pub enum ConfigError {
    MissingSubnet,
    MissingRange,
    InvalidRange(RangeError),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match &*self {
            ConfigError::MissingSubnet => write!(f, "No subnet declaration found"),
            ConfigError::MissingRange => write!(f, "No range declaration found"),
            ConfigError::InvalidRange(err) => write!(f, "Invalid range declaration: {}", err),
        }
    }
}

impl From<RangeError> for ConfigError {
    fn from(error: RangeError) -> Self {
        ConfigError::InvalidRange(error)
    }
}

/// Static pool descriptor for the subnet dhcpd hands leases out of.
#[derive(Debug, Clone, Serialize)]
pub struct Subnet {
    pub subnet_address: Ipv4Addr,
    pub netmask: Ipv4Addr,
    pub range_start: Ipv4Addr,
    pub range_finish: Ipv4Addr,
    // Number of addresses in range_start..=range_finish
    pub pool_size: u32,
}

/// Extracts the subnet descriptor from dhcpd.conf text.
///
/// Single forward scan. `#` comment lines are skipped; a `subnet` line
/// contributes its first two dotted-quad tokens as (subnet, netmask) and a
/// `range` line its first two as the pool bounds, sized via the range
/// expander. Lines whose tokens fail the dotted-quad pattern are skipped
/// silently. Only the last subnet/range pair is kept, so multi-subnet
/// configurations collapse to their final declaration.
pub fn parse(text: &str) -> Result<Subnet, ConfigError> {
    let mut subnet_pair: Option<(Ipv4Addr, Ipv4Addr)> = None;
    let mut range: Option<(Ipv4Addr, Ipv4Addr, u32)> = None;

    for line in text.lines() {
        let line = line.trim_start();
        if line.starts_with('#') {
            continue;
        }
        if line.starts_with("subnet") {
            if let Some(pair) = address_pair(line) {
                subnet_pair = Some(pair);
            }
        } else if line.starts_with("range") {
            if let Some((start, finish)) = address_pair(line) {
                let (_, pool_size) = range::expand(start, finish)?;
                range = Some((start, finish, pool_size));
            }
        }
    }

    let (subnet_address, netmask) = subnet_pair.ok_or(ConfigError::MissingSubnet)?;
    let (range_start, range_finish, pool_size) = range.ok_or(ConfigError::MissingRange)?;
    Ok(Subnet {
        subnet_address,
        netmask,
        range_start,
        range_finish,
        pool_size,
    })
}

/// First two whole-token dotted quads on a line, if present.
fn address_pair(line: &str) -> Option<(Ipv4Addr, Ipv4Addr)> {
    let mut addresses = line.split_whitespace().filter_map(|token| {
        let token = token.trim_end_matches(|c| c == ';' || c == '{');
        all_consuming(tokens::dotted_quad)(token)
            .ok()
            .map(|(_, address)| address)
    });
    let first = addresses.next()?;
    let second = addresses.next()?;
    Some((first, second))
}
