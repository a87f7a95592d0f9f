//! Generation-indexed slot arena with a free list.

#[derive(Debug, Clone)]
enum Slot<T> {
    Occupied { generation: u32, value: T },
    Vacant { generation: u32, next_free: Option<u32> },
}

#[derive(Debug, Clone)]
pub(crate) struct Arena<T> {
    slots: Vec<Slot<T>>,
    free_head: Option<u32>,
    len: usize,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free_head: None,
            len: 0,
        }
    }
}

impl<T> Arena<T> {
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Slot index the next insertion will use.
    pub(crate) fn next_slot(&self) -> usize {
        self.free_head.map_or(self.slots.len(), |slot| slot as usize)
    }

    /// Stores `value`, reusing the most recently freed slot first.
    pub(crate) fn insert(&mut self, value: T) -> (u32, u32) {
        if let Some(slot) = self.free_head {
            let entry = &mut self.slots[slot as usize];
            if let Slot::Vacant {
                generation,
                next_free,
            } = *entry
            {
                let generation = generation.wrapping_add(1);
                self.free_head = next_free;
                *entry = Slot::Occupied { generation, value };
                self.len += 1;
                return (slot, generation);
            }
        }
        let slot = self.slots.len() as u32;
        self.slots.push(Slot::Occupied {
            generation: 0,
            value,
        });
        self.len += 1;
        (slot, 0)
    }

    pub(crate) fn get(&self, slot: u32, generation: u32) -> Option<&T> {
        match self.slots.get(slot as usize)? {
            Slot::Occupied {
                generation: g,
                value,
            } if *g == generation => Some(value),
            _ => None,
        }
    }

    pub(crate) fn get_mut(&mut self, slot: u32, generation: u32) -> Option<&mut T> {
        match self.slots.get_mut(slot as usize)? {
            Slot::Occupied {
                generation: g,
                value,
            } if *g == generation => Some(value),
            _ => None,
        }
    }

    /// Generation of the value currently stored in `slot`.
    pub(crate) fn live_generation(&self, slot: u32) -> Option<u32> {
        match self.slots.get(slot as usize)? {
            Slot::Occupied { generation, .. } => Some(*generation),
            Slot::Vacant { .. } => None,
        }
    }

    pub(crate) fn remove(&mut self, slot: u32, generation: u32) -> Option<T> {
        let entry = self.slots.get_mut(slot as usize)?;
        match entry {
            Slot::Occupied { generation: g, .. } if *g == generation => {}
            _ => return None,
        }
        let vacant = Slot::Vacant {
            generation,
            next_free: self.free_head,
        };
        let Slot::Occupied { value, .. } = std::mem::replace(entry, vacant) else {
            return None;
        };
        self.free_head = Some(slot);
        self.len -= 1;
        Some(value)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (u32, u32, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(slot, entry)| match entry {
                Slot::Occupied { generation, value } => Some((slot as u32, *generation, value)),
                Slot::Vacant { .. } => None,
            })
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (u32, u32, &mut T)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(slot, entry)| match entry {
                Slot::Occupied { generation, value } => Some((slot as u32, *generation, value)),
                Slot::Vacant { .. } => None,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn freed_slot_is_reused_with_new_generation() {
        let mut arena = Arena::default();
        let (a, ga) = arena.insert("a");
        let (b, _) = arena.insert("b");
        assert_eq!(arena.remove(a, ga), Some("a"));
        assert_eq!(arena.len(), 1);

        let (c, gc) = arena.insert("c");
        assert_eq!(c, a);
        assert_ne!(gc, ga);
        assert_eq!(arena.get(a, ga), None);
        assert_eq!(arena.get(c, gc), Some(&"c"));
        assert_eq!(arena.iter().count(), 2);
        assert_ne!(b, c);
    }

    #[test]
    fn stale_remove_is_ignored() {
        let mut arena = Arena::default();
        let (a, ga) = arena.insert(1);
        assert_eq!(arena.remove(a, ga + 1), None);
        assert_eq!(arena.live_generation(a), Some(ga));
        assert_eq!(arena.next_slot(), 1);
    }
}
