//! Establishes gossip connections over TCP.
//!
//! Right after the TCP handshake both sides send a `Hello` frame carrying their node id, the
//! caller first. No authentication takes place.

use super::connection::Connection;
use crate::channel::{self, Frame};
use crate::{Error, NodeId, Result};

use colored::Colorize;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{timeout, Duration};
use tracing::debug;

use std::net::SocketAddr;

async fn read_hello(receiver: &mut channel::Receiver, read_timeout: Duration) -> Result<NodeId> {
    match timeout(read_timeout, receiver.recv()).await {
        Ok(Ok(Frame::Hello(id))) => Ok(id),
        Ok(Ok(other)) => {
            Err(channel::Error::UnexpectedFrame { expected: "hello", received: other.kind() }.into())
        }
        Ok(Err(err)) => Err(err.into()),
        Err(_) => Err(channel::Error::TimedOut.into()),
    }
}

/// Dials `peer_id` at `address` and checks that the node answering is the one expected.
pub async fn connect(
    self_id: NodeId,
    peer_id: NodeId,
    address: SocketAddr,
    read_timeout: Duration,
) -> Result<Connection> {
    let stream = match timeout(read_timeout, TcpStream::connect(address)).await {
        Ok(stream) => stream?,
        Err(_) => return Err(channel::Error::TimedOut.into()),
    };
    stream.set_nodelay(true)?;

    let (mut sender, mut receiver) = channel::split(stream);
    sender.send(Frame::Hello(self_id)).await?;
    let presented = read_hello(&mut receiver, read_timeout).await?;
    if presented != peer_id {
        return Err(Error::UnexpectedPeerConnected);
    }
    debug!("[{}] connected to {} at {}", "p2p".green(), peer_id, address);
    Ok(Connection::from_parts(sender, receiver, self_id, peer_id, true, read_timeout))
}

/// Accepts the next inbound connection and learns the caller's id.
pub async fn accept(listener: &TcpListener, self_id: NodeId, read_timeout: Duration) -> Result<Connection> {
    let (stream, address) = listener.accept().await?;
    stream.set_nodelay(true)?;

    let (mut sender, mut receiver) = channel::split(stream);
    let peer_id = read_hello(&mut receiver, read_timeout).await?;
    sender.send(Frame::Hello(self_id)).await?;
    debug!("[{}] accepted {} from {}", "p2p".green(), peer_id, address);
    Ok(Connection::from_parts(sender, receiver, self_id, peer_id, false, read_timeout))
}

#[cfg(test)]
mod test {
    use super::*;

    #[actix_rt::test]
    async fn test_identities_exchanged() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        let timeout = Duration::from_secs(2);

        let accepted = tokio::spawn(async move { accept(&listener, NodeId(2), timeout).await });
        let caller = connect(NodeId(1), NodeId(2), address, timeout).await.unwrap();
        let accepted = accepted.await.unwrap().unwrap();

        assert_eq!(caller.peer_id(), NodeId(2));
        assert!(caller.is_outbound());
        assert_eq!(accepted.peer_id(), NodeId(1));
        assert!(!accepted.is_outbound());

        caller.write_byte(3).await.unwrap();
        caller.flush().await.unwrap();
        assert_eq!(accepted.read_byte().await.unwrap(), 3);
    }

    #[actix_rt::test]
    async fn test_wrong_peer_rejected() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        let timeout = Duration::from_secs(2);

        let _accepted = tokio::spawn(async move { accept(&listener, NodeId(5), timeout).await });
        let result = connect(NodeId(1), NodeId(2), address, timeout).await;
        assert!(matches!(result, Err(Error::UnexpectedPeerConnected)));
    }
}
