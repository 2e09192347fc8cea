use std::collections::HashMap;
use std::net::Ipv4Addr;

use nom::character::complete::space1;
use nom::sequence::preceded;
use serde_derive::Serialize;

use crate::tokens;

/// Epoch value standing in for `ends never;`: the largest 32-bit epoch
/// second, matching how dhcpd callers treat a lease that never expires.
pub const LEASE_NEVER_EXPIRES: i64 = 2147483647;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingState {
    Active,
    Free,
}

/// A hardware address in canonical lowercase colon-hex form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HardwareAddr(pub [u8; 6]);

impl std::fmt::Display for HardwareAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let octets = &self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            octets[0], octets[1], octets[2], octets[3], octets[4], octets[5]
        )
    }
}

impl serde::Serialize for HardwareAddr {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One `lease { ... }` block from the database file.
///
/// Fields the block did not carry (or carried in a form that did not
/// parse) stay unset; there is no block-level validation. Equality is
/// exact over every field, which is what the diff relies on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaseRecord {
    pub ip: Ipv4Addr,
    pub starts_at: Option<i64>,
    pub ends_at: Option<i64>,
    pub state: Option<BindingState>,
    pub hardware_address: Option<HardwareAddr>,
    pub client_uid: Option<String>,
    pub client_hostname: Option<String>,
}

impl LeaseRecord {
    fn new(ip: Ipv4Addr) -> LeaseRecord {
        LeaseRecord {
            ip,
            starts_at: None,
            ends_at: None,
            state: None,
            hardware_address: None,
            client_uid: None,
            client_hostname: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state == Some(BindingState::Active)
    }
}

/// Parses dhcpd.leases text into records, in file order.
///
/// Line-oriented scan: a `lease <ip> {` line starts a record, recognized
/// field lines fill in the record being built and `}` closes it. Anything
/// else (`tstp`, `cltt`, `set`, unknown binding states, unparseable
/// values) is ignored, so unsupported directives degrade to unset fields
/// rather than errors. Non-active records are included; filtering happens
/// in `active_leases`.
pub fn parse(text: &str) -> Vec<LeaseRecord> {
    let mut records: Vec<LeaseRecord> = Vec::new();
    let mut open = false;

    for line in text.lines() {
        let line = line.trim_start();
        if let Some(rest) = line.strip_prefix("lease") {
            if let Ok((_, ip)) = preceded(space1, tokens::dotted_quad)(rest) {
                records.push(LeaseRecord::new(ip));
                open = true;
            }
        } else if line.starts_with('}') {
            open = false;
        } else if open {
            if let Some(record) = records.last_mut() {
                populate_field(record, line);
            }
        }
    }

    records
}

fn populate_field(record: &mut LeaseRecord, line: &str) {
    if let Some(rest) = line.strip_prefix("starts") {
        record.starts_at = tokens::lease_time(rest).ok().map(|(_, stamp)| stamp);
    } else if let Some(rest) = line.strip_prefix("ends") {
        record.ends_at = if rest.contains("never") {
            Some(LEASE_NEVER_EXPIRES)
        } else {
            tokens::lease_time(rest).ok().map(|(_, stamp)| stamp)
        };
    } else if let Some(rest) = line.strip_prefix("binding state") {
        match rest.trim().trim_end_matches(';') {
            "active" => record.state = Some(BindingState::Active),
            "free" => record.state = Some(BindingState::Free),
            _ => {}
        }
    } else if let Some(rest) = line.strip_prefix("hardware ethernet") {
        record.hardware_address = preceded(space1, tokens::mac_address)(rest)
            .ok()
            .map(|(_, octets)| HardwareAddr(octets));
    } else if let Some(rest) = line.strip_prefix("client-hostname") {
        record.client_hostname = tokens::quoted(rest).ok().map(|(_, value)| value.to_string());
    } else if let Some(rest) = line.strip_prefix("uid") {
        record.client_uid = tokens::quoted(rest).ok().map(|(_, value)| value.to_string());
    }
}

/// Collapses a parse pass into the active lease table.
///
/// Records are filtered to active state first; among active blocks sharing
/// an address, the last one in file order wins. A later non-active block
/// does not evict an earlier active one; dhcpd appends history, and only
/// active entries count.
pub fn active_leases(records: &[LeaseRecord]) -> HashMap<Ipv4Addr, LeaseRecord> {
    let mut active = HashMap::new();
    for record in records {
        if record.is_active() {
            active.insert(record.ip, record.clone());
        }
    }
    active
}
