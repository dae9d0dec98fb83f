use crate::channel::{self, Error, Frame, Receiver, Result, Sender};
use crate::event::{BaseEvent, Hash};
use crate::event_window::EventWindow;
use crate::NodeId;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::Mutex;
use tokio::time::{timeout, Duration};
use tokio_util::sync::CancellationToken;

/// Buffer size of the in-memory streams created by [Connection::pair].
const PAIR_BUFFER_SIZE: usize = 64 * 1024;

macro_rules! expect_frame {
    ($frame:expr, $variant:ident, $kind:expr) => {
        match $frame {
            Frame::$variant(value) => Ok(value),
            other => Err(Error::UnexpectedFrame { expected: $kind, received: other.kind() }),
        }
    };
}

/// An established, bidirectional connection to one peer.
///
/// Reads and writes may run concurrently from two tasks. Every pending operation fails with
/// [Error::Disconnected] as soon as [Connection::disconnect] is called, which is how a stuck
/// read or write is broken.
pub struct Connection {
    self_id: NodeId,
    peer_id: NodeId,
    outbound: bool,
    read_timeout: Duration,
    sender: Mutex<Sender>,
    receiver: Mutex<Receiver>,
    disconnected: CancellationToken,
}

impl Connection {
    pub fn new<S>(stream: S, self_id: NodeId, peer_id: NodeId, outbound: bool, read_timeout: Duration) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (sender, receiver) = channel::split(stream);
        Connection::from_parts(sender, receiver, self_id, peer_id, outbound, read_timeout)
    }

    /// Wraps an already framed stream, for example after an identity exchange.
    pub fn from_parts(
        sender: Sender,
        receiver: Receiver,
        self_id: NodeId,
        peer_id: NodeId,
        outbound: bool,
        read_timeout: Duration,
    ) -> Self {
        Connection {
            self_id,
            peer_id,
            outbound,
            read_timeout,
            sender: Mutex::new(sender),
            receiver: Mutex::new(receiver),
            disconnected: CancellationToken::new(),
        }
    }

    /// Two connected ends over an in-memory stream. The first end is the outbound one.
    pub fn pair(caller: NodeId, listener: NodeId, read_timeout: Duration) -> (Connection, Connection) {
        let (a, b) = tokio::io::duplex(PAIR_BUFFER_SIZE);
        (
            Connection::new(a, caller, listener, true, read_timeout),
            Connection::new(b, listener, caller, false, read_timeout),
        )
    }

    pub fn self_id(&self) -> NodeId {
        self.self_id
    }

    pub fn peer_id(&self) -> NodeId {
        self.peer_id
    }

    pub fn is_outbound(&self) -> bool {
        self.outbound
    }

    pub fn description(&self) -> String {
        if self.outbound {
            format!("{} -> {}", self.self_id, self.peer_id)
        } else {
            format!("{} <- {}", self.self_id, self.peer_id)
        }
    }

    pub fn disconnect(&self) {
        self.disconnected.cancel()
    }

    pub fn is_connected(&self) -> bool {
        !self.disconnected.is_cancelled()
    }

    async fn recv(&self) -> Result<Frame> {
        let read = async {
            let mut receiver = self.receiver.lock().await;
            match timeout(self.read_timeout, receiver.recv()).await {
                Ok(result) => result,
                Err(_) => Err(Error::TimedOut),
            }
        };
        tokio::select! {
            biased;
            _ = self.disconnected.cancelled() => Err(Error::Disconnected),
            result = read => result,
        }
    }

    async fn feed(&self, frame: Frame) -> Result<()> {
        let write = async {
            let mut sender = self.sender.lock().await;
            match timeout(self.read_timeout, sender.feed(frame)).await {
                Ok(result) => result,
                Err(_) => Err(Error::TimedOut),
            }
        };
        tokio::select! {
            biased;
            _ = self.disconnected.cancelled() => Err(Error::Disconnected),
            result = write => result,
        }
    }

    /// Pushes everything written so far to the peer.
    pub async fn flush(&self) -> Result<()> {
        let flush = async {
            let mut sender = self.sender.lock().await;
            match timeout(self.read_timeout, sender.flush()).await {
                Ok(result) => result,
                Err(_) => Err(Error::TimedOut),
            }
        };
        tokio::select! {
            biased;
            _ = self.disconnected.cancelled() => Err(Error::Disconnected),
            result = flush => result,
        }
    }

    pub async fn write_byte(&self, byte: u8) -> Result<()> {
        self.feed(Frame::Byte(byte)).await
    }

    pub async fn read_byte(&self) -> Result<u8> {
        expect_frame!(self.recv().await?, Byte, "byte")
    }

    pub async fn write_booleans(&self, booleans: Vec<bool>) -> Result<()> {
        self.feed(Frame::Booleans(booleans)).await
    }

    pub async fn read_booleans(&self) -> Result<Vec<bool>> {
        expect_frame!(self.recv().await?, Booleans, "booleans")
    }

    pub async fn write_window(&self, window: EventWindow) -> Result<()> {
        self.feed(Frame::Window(window)).await
    }

    pub async fn read_window(&self) -> Result<EventWindow> {
        expect_frame!(self.recv().await?, Window, "window")
    }

    pub async fn write_hashes(&self, hashes: Vec<Hash>) -> Result<()> {
        self.feed(Frame::Hashes(hashes)).await
    }

    pub async fn read_hashes(&self) -> Result<Vec<Hash>> {
        expect_frame!(self.recv().await?, Hashes, "hashes")
    }

    pub async fn write_event(&self, event: &BaseEvent) -> Result<()> {
        self.feed(Frame::Event(event.clone())).await
    }

    pub async fn read_event(&self) -> Result<BaseEvent> {
        expect_frame!(self.recv().await?, Event, "event")
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "Connection({})", self.description())
    }
}
