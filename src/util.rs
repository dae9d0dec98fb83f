use crate::{Error, NodeId, Result};

use std::net::SocketAddr;

/// Parses a peer given as `ID@IP`, for example `node2@127.0.0.1:1236` or `2@127.0.0.1:1236`.
pub fn parse_id_and_ip(s: &str) -> Result<(NodeId, SocketAddr)> {
    let mut parts = s.splitn(2, '@');
    let id = parts.next().ok_or(Error::PeerParseError)?;
    let ip = parts.next().ok_or(Error::PeerParseError)?;
    let id = id.parse::<NodeId>().map_err(|_| Error::PeerParseError)?;
    let ip = ip.parse::<SocketAddr>().map_err(|_| Error::PeerParseError)?;
    Ok((id, ip))
}
