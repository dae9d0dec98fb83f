//! Numeric identities of the nodes taking part in gossip.

use std::fmt;
use std::str::FromStr;

/// Identifies a node (and therefore an event creator) in the network.
///
/// Displayed as `node<N>`, parsed from either `node<N>` or a bare `N`.
#[derive(
    Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Copy, Clone, Serialize, Deserialize, Default,
)]
pub struct NodeId(pub u64);

impl NodeId {
    pub fn new(id: u64) -> Self {
        NodeId(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "node{}", self.0)
    }
}

impl FromStr for NodeId {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, crate::Error> {
        let digits = s.strip_prefix("node").unwrap_or(s);
        digits.parse::<u64>().map(NodeId).map_err(|_| crate::Error::TryFromStringError)
    }
}

impl From<u64> for NodeId {
    fn from(id: u64) -> Self {
        NodeId(id)
    }
}
