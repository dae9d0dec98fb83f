use super::shadow_event::{ShadowEvent, ShadowId};

struct Slot {
    epoch: u32,
    vertex: Option<ShadowEvent>,
}

/// Slot storage for vertices. Freed slots are reused under a new epoch so stale ids never
/// resolve to a later vertex.
#[derive(Default)]
pub(super) struct Arena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl Arena {
    pub fn insert(&mut self, vertex: ShadowEvent) -> ShadowId {
        self.live += 1;
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.epoch = slot.epoch.wrapping_add(1);
                slot.vertex = Some(vertex);
                ShadowId::new(index, slot.epoch)
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot { epoch: 0, vertex: Some(vertex) });
                ShadowId::new(index, 0)
            }
        }
    }

    pub fn get(&self, id: ShadowId) -> Option<&ShadowEvent> {
        match self.slots.get(id.index() as usize) {
            Some(slot) if slot.epoch == id.epoch() => slot.vertex.as_ref(),
            _ => None,
        }
    }

    pub fn remove(&mut self, id: ShadowId) -> Option<ShadowEvent> {
        let slot = self.slots.get_mut(id.index() as usize)?;
        if slot.epoch != id.epoch() {
            return None;
        }
        let vertex = slot.vertex.take()?;
        self.free.push(id.index());
        self.live -= 1;
        Some(vertex)
    }

    pub fn vertices_mut(&mut self) -> impl Iterator<Item = &mut ShadowEvent> {
        self.slots.iter_mut().filter_map(|slot| slot.vertex.as_mut())
    }

    pub fn len(&self) -> usize {
        self.live
    }
}
