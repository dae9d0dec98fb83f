mod base_event;
pub mod emitter;
#[allow(clippy::module_inception)]
mod event;
mod hash;

pub use base_event::*;
pub use event::*;
pub use hash::*;

/// Selects which per-event counter decides when an event becomes ancient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AncientMode {
    Generation,
    BirthRound,
}

impl AncientMode {
    /// The lowest ancient indicator an event can carry in this mode.
    pub fn first_indicator(&self) -> u64 {
        match self {
            AncientMode::Generation => FIRST_GENERATION,
            AncientMode::BirthRound => 1,
        }
    }
}

impl Default for AncientMode {
    fn default() -> Self {
        AncientMode::Generation
    }
}
