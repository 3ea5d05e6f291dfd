//! Split extracted prefixes by address family.

use ipnet::{IpNet, Ipv4Net, Ipv6Net};
use std::fmt;

use crate::error::ImportError;
use crate::validation::parse_network;

/// IP address family of a network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Family {
    V4,
    V6,
}

impl Family {
    /// 4 or 6
    pub fn number(self) -> u8 {
        match self {
            Family::V4 => 4,
            Family::V6 => 6,
        }
    }

    pub fn of(net: &IpNet) -> Self {
        match net {
            IpNet::V4(_) => Family::V4,
            IpNet::V6(_) => Family::V6,
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IPv{}", self.number())
    }
}

/// Networks split by family, in input order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionedPrefixes {
    pub ipv4: Vec<Ipv4Net>,
    pub ipv6: Vec<Ipv6Net>,
}

impl PartitionedPrefixes {
    pub fn len(&self) -> usize {
        self.ipv4.len() + self.ipv6.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ipv4.is_empty() && self.ipv6.is_empty()
    }

    /// Networks of one family, as generic `IpNet` values
    pub fn networks(&self, family: Family) -> Vec<IpNet> {
        match family {
            Family::V4 => self.ipv4.iter().copied().map(IpNet::V4).collect(),
            Family::V6 => self.ipv6.iter().copied().map(IpNet::V6).collect(),
        }
    }
}

/// Parse every prefix and sort it into the IPv4 or IPv6 list.
///
/// Fails on the first string that is not a valid network; nothing is
/// returned for the other prefixes in that case. The family comes from the
/// parsed address, not from the shape of the string (`::ffff:192.0.2.0/120`
/// is IPv6).
pub fn partition<I, S>(prefixes: I) -> Result<PartitionedPrefixes, ImportError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut partitioned = PartitionedPrefixes::default();

    for prefix in prefixes {
        match parse_network(prefix.as_ref())? {
            IpNet::V4(net) => partitioned.ipv4.push(net),
            IpNet::V6(net) => partitioned.ipv6.push(net),
        }
    }

    Ok(partitioned)
}
