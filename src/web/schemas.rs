use std::collections::HashMap;
use std::net::Ipv4Addr;

use serde_derive::Serialize;

use crate::config::Subnet;
use crate::leases::LeaseRecord;
use crate::store::SnapshotMeta;

pub type LeaseTable = HashMap<Ipv4Addr, LeaseRecord>;

/// Pool status. `meta` is null until the first successful reparse.
#[derive(Serialize)]
pub struct StatusResponse {
    pub subnet: Subnet,
    pub meta: Option<SnapshotMeta>,
}
