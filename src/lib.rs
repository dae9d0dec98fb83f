#[macro_use]
extern crate serde_derive;
extern crate actix_derive;
extern crate colored;

pub mod channel;
pub mod event;
pub mod event_window;
pub mod intake;
pub mod integration_test;
pub mod node_id;
pub mod p2p;
pub mod server;
pub mod shadowgraph;
pub mod sync;
pub mod util;

pub use node_id::NodeId;

#[derive(Debug)]
pub enum Error {
    IO(std::io::Error),
    Config(config::ConfigError),

    // component errors
    Channel(channel::Error),
    Shadowgraph(shadowgraph::Error),
    Sync(sync::Error),

    /// Error caused by converting from a `String` to a `NodeId`
    TryFromStringError,
    /// Error when parsing a peer description `ID@IP`
    PeerParseError,
    /// The peer presented a different id than the one it was dialled as
    UnexpectedPeerConnected,
}

impl std::error::Error for Error {}

impl std::convert::From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::IO(error)
    }
}

impl std::convert::From<config::ConfigError> for Error {
    fn from(error: config::ConfigError) -> Self {
        Error::Config(error)
    }
}

impl std::convert::From<channel::Error> for Error {
    fn from(error: channel::Error) -> Self {
        Error::Channel(error)
    }
}

impl std::convert::From<shadowgraph::Error> for Error {
    fn from(error: shadowgraph::Error) -> Self {
        Error::Shadowgraph(error)
    }
}

impl std::convert::From<sync::Error> for Error {
    fn from(error: sync::Error) -> Self {
        Error::Sync(error)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
