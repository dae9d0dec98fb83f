//! Length-delimited bincode framing of the gossip primitives.

use crate::event::{BaseEvent, Hash};
use crate::event_window::EventWindow;
use crate::NodeId;

use futures::prelude::*;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_serde::formats::Bincode;
use tokio_serde::Framed;
use tokio_util::codec::{FramedRead, FramedWrite, LengthDelimitedCodec};

/// One unit on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Frame {
    /// Sent once by each side when a connection is established.
    Hello(NodeId),
    Byte(u8),
    Booleans(Vec<bool>),
    Window(EventWindow),
    Hashes(Vec<Hash>),
    Event(BaseEvent),
}

impl Frame {
    pub fn kind(&self) -> &'static str {
        match self {
            Frame::Hello(_) => "hello",
            Frame::Byte(_) => "byte",
            Frame::Booleans(_) => "booleans",
            Frame::Window(_) => "window",
            Frame::Hashes(_) => "hashes",
            Frame::Event(_) => "event",
        }
    }
}

#[derive(Debug)]
pub enum Error {
    IO(std::io::Error),
    /// The peer closed the stream.
    Closed,
    /// The local side disconnected while the operation was pending.
    Disconnected,
    TimedOut,
    UnexpectedFrame { expected: &'static str, received: &'static str },
}

impl std::error::Error for Error {}

impl std::convert::From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::IO(error)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

type BoxedRead = Box<dyn AsyncRead + Send + Unpin>;
type BoxedWrite = Box<dyn AsyncWrite + Send + Unpin>;

pub type FrameCodec = Bincode<Frame, Frame>;

pub type Reader = Framed<FramedRead<BoxedRead, LengthDelimitedCodec>, Frame, Frame, FrameCodec>;

pub type Writer = Framed<FramedWrite<BoxedWrite, LengthDelimitedCodec>, Frame, Frame, FrameCodec>;

pub struct Receiver {
    reader: Reader,
}

impl Receiver {
    pub async fn recv(&mut self) -> Result<Frame> {
        match self.reader.try_next().await? {
            Some(frame) => Ok(frame),
            None => Err(Error::Closed),
        }
    }
}

pub struct Sender {
    writer: Writer,
}

impl Sender {
    /// Queues a frame without flushing.
    pub async fn feed(&mut self, frame: Frame) -> Result<()> {
        Ok(self.writer.feed(frame).await?)
    }

    pub async fn send(&mut self, frame: Frame) -> Result<()> {
        Ok(self.writer.send(frame).await?)
    }

    pub async fn flush(&mut self) -> Result<()> {
        Ok(self.writer.flush().await?)
    }
}

/// Splits a byte stream into a framed sender and receiver.
pub fn split<S>(stream: S) -> (Sender, Receiver)
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (reader, writer) = tokio::io::split(stream);

    let reader: BoxedRead = Box::new(reader);
    let reader = FramedRead::new(reader, LengthDelimitedCodec::new());
    let reader = Framed::new(reader, Bincode::default());

    let writer: BoxedWrite = Box::new(writer);
    let writer = FramedWrite::new(writer, LengthDelimitedCodec::new());
    let writer = Framed::new(writer, Bincode::default());

    (Sender { writer }, Receiver { reader })
}
