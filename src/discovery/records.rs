//! Multicast-DNS answer records consumed by the discovery listener

use std::fmt;

/// DNS record class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordClass {
    /// Internet class
    In,
    /// Any other class value
    Other(u16),
}

impl From<u16> for RecordClass {
    fn from(value: u16) -> Self {
        // The top bit is the mDNS cache-flush flag, not part of the class
        match value & 0x7fff {
            1 => RecordClass::In,
            other => RecordClass::Other(other),
        }
    }
}

/// One answer of an mDNS response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MdnsRecord {
    /// Service location: instance `name` is served by `target:port`
    Srv {
        name: String,
        target: String,
        port: u16,
    },
    /// IPv4 address of host `name`
    A {
        name: String,
        class: RecordClass,
        data: String,
    },
    /// Any record the listener does not act on
    Other { name: String, record_type: String },
}

impl MdnsRecord {
    pub fn srv(name: impl Into<String>, target: impl Into<String>, port: u16) -> Self {
        MdnsRecord::Srv {
            name: name.into(),
            target: target.into(),
            port,
        }
    }

    /// `A` record of class `IN`
    pub fn a(name: impl Into<String>, data: impl Into<String>) -> Self {
        MdnsRecord::A {
            name: name.into(),
            class: RecordClass::In,
            data: data.into(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            MdnsRecord::Srv { name, .. }
            | MdnsRecord::A { name, .. }
            | MdnsRecord::Other { name, .. } => name,
        }
    }

    pub fn record_type(&self) -> &str {
        match self {
            MdnsRecord::Srv { .. } => "SRV",
            MdnsRecord::A { .. } => "A",
            MdnsRecord::Other { record_type, .. } => record_type,
        }
    }
}

impl fmt::Display for MdnsRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MdnsRecord::Srv { name, target, port } => write!(f, "SRV {name} -> {target}:{port}"),
            MdnsRecord::A { name, data, .. } => write!(f, "A {name} -> {data}"),
            MdnsRecord::Other { name, record_type } => write!(f, "{record_type} {name}"),
        }
    }
}

/// Strip the trailing root label from a DNS name (`foo.local.` -> `foo.local`)
pub fn normalize_name(name: &str) -> &str {
    name.strip_suffix('.').unwrap_or(name)
}
