use super::hash::Hash;
use super::AncientMode;
use crate::NodeId;

use tai64::Tai64N;

/// Generation of an event without parents.
pub const FIRST_GENERATION: u64 = 0;

/// Identifies a parent event without carrying its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventDescriptor {
    pub hash: Hash,
    pub creator: NodeId,
    pub generation: u64,
    pub birth_round: u64,
}

impl EventDescriptor {
    pub fn ancient_indicator(&self, mode: AncientMode) -> u64 {
        match mode {
            AncientMode::Generation => self.generation,
            AncientMode::BirthRound => self.birth_round,
        }
    }
}

/// The part of an event that travels on the wire.
///
/// The hash is not transmitted, the receiver recomputes it from the hashed fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseEvent {
    pub creator: NodeId,
    pub self_parent: Option<EventDescriptor>,
    pub other_parent: Option<EventDescriptor>,
    pub generation: u64,
    pub birth_round: u64,
    pub time_created: Tai64N,
    pub transactions: Vec<Vec<u8>>,
    pub signature: Vec<u8>,
}

impl BaseEvent {
    /// Creates an unsigned event whose generation is one above its highest parent.
    pub fn new(
        creator: NodeId,
        self_parent: Option<EventDescriptor>,
        other_parent: Option<EventDescriptor>,
        birth_round: u64,
        transactions: Vec<Vec<u8>>,
    ) -> Self {
        let generation = self_parent
            .iter()
            .chain(other_parent.iter())
            .map(|p| p.generation + 1)
            .max()
            .unwrap_or(FIRST_GENERATION);
        BaseEvent {
            creator,
            self_parent,
            other_parent,
            generation,
            birth_round,
            time_created: Tai64N::now(),
            transactions,
            signature: vec![],
        }
    }

    /// Hashes every field except the signature.
    pub fn compute_hash(&self) -> Hash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.creator.id().to_le_bytes());
        for parent in [&self.self_parent, &self.other_parent].iter() {
            match parent {
                Some(p) => {
                    hasher.update(&[1u8]);
                    hasher.update(p.hash.as_bytes());
                }
                None => {
                    hasher.update(&[0u8]);
                }
            }
        }
        hasher.update(&self.generation.to_le_bytes());
        hasher.update(&self.birth_round.to_le_bytes());
        hasher.update(&self.time_created.to_bytes());
        hasher.update(&(self.transactions.len() as u64).to_le_bytes());
        for tx in self.transactions.iter() {
            hasher.update(&(tx.len() as u64).to_le_bytes());
            hasher.update(tx);
        }
        Hash(*hasher.finalize().as_bytes())
    }
}
