mod arena;
mod reservation;
mod shadow_event;
#[allow(clippy::module_inception)]
mod shadowgraph;

#[cfg(test)]
mod shadowgraph_tests;

pub use reservation::{Reservation, ReservedEventWindow};
pub use shadow_event::{Shadow, ShadowEvent, ShadowId};
pub use shadowgraph::Shadowgraph;

/// Whether an event can be added to the shadowgraph, and if not why.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertableStatus {
    Insertable,
    NullEvent,
    DuplicateShadowEvent,
    ExpiredEvent,
}

#[derive(Debug)]
pub enum Error {
    Insertion { status: InsertableStatus, description: String },
    EmptyEventList,
}

impl Error {
    /// The insertion status behind this error, if it is an insertion failure.
    pub fn status(&self) -> Option<InsertableStatus> {
        match self {
            Error::Insertion { status, .. } => Some(*status),
            Error::EmptyEventList => None,
        }
    }
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::Insertion { description, .. } => write!(f, "{}", description),
            _ => write!(f, "{:?}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
