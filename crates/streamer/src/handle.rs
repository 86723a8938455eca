//! Generation-checked stream handles

/// Opaque stream handle
///
/// Packs a slot generation in the high 32 bits and the slot index in the
/// low 32 bits. Generations start at 1, so 0 is never a valid handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamHandle(u64);

impl StreamHandle {
    fn new(index: u32, generation: u32) -> Self {
        Self((u64::from(generation) << 32) | u64::from(index))
    }

    /// Rebuild a handle received from the host; 0 is rejected
    pub fn from_raw(raw: u64) -> Option<Self> {
        if raw == 0 { None } else { Some(Self(raw)) }
    }

    pub fn as_raw(&self) -> u64 {
        self.0
    }

    fn index(&self) -> usize {
        (self.0 & 0xFFFF_FFFF) as usize
    }

    fn generation(&self) -> u32 {
        (self.0 >> 32) as u32
    }
}

impl std::fmt::Display for StreamHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}.{}", self.index(), self.generation())
    }
}

struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Slot storage handing out [`StreamHandle`]s
///
/// Removing a value bumps the slot generation, so handles to destroyed
/// streams never resolve again even after the slot is reused.
pub(crate) struct Arena<T> {
    slots: Vec<Slot<T>>,
    free: Vec<usize>,
}

impl<T> Arena<T> {
    pub(crate) fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    pub(crate) fn insert(&mut self, value: T) -> StreamHandle {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index];
            slot.value = Some(value);
            return StreamHandle::new(index as u32, slot.generation);
        }

        let index = self.slots.len();
        self.slots.push(Slot {
            generation: 1,
            value: Some(value),
        });
        StreamHandle::new(index as u32, 1)
    }

    pub(crate) fn get(&self, handle: StreamHandle) -> Option<&T> {
        self.slots
            .get(handle.index())
            .filter(|slot| slot.generation == handle.generation())
            .and_then(|slot| slot.value.as_ref())
    }

    pub(crate) fn remove(&mut self, handle: StreamHandle) -> Option<T> {
        let slot = self.slots.get_mut(handle.index())?;
        if slot.generation != handle.generation() {
            return None;
        }

        let value = slot.value.take()?;
        slot.generation = match slot.generation.wrapping_add(1) {
            0 => 1,
            next => next,
        };
        self.free.push(handle.index());
        Some(value)
    }

    /// Remove every value, invalidating all outstanding handles
    pub(crate) fn drain(&mut self) -> Vec<T> {
        let mut values = Vec::new();
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if let Some(value) = slot.value.take() {
                slot.generation = match slot.generation.wrapping_add(1) {
                    0 => 1,
                    next => next,
                };
                self.free.push(index);
                values.push(value);
            }
        }
        values
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.value.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_is_invalid() {
        assert!(StreamHandle::from_raw(0).is_none());

        let mut arena = Arena::new();
        let handle = arena.insert("a");
        assert_ne!(handle.as_raw(), 0);
        assert_eq!(StreamHandle::from_raw(handle.as_raw()), Some(handle));
    }

    #[test]
    fn test_stale_handle_rejected_after_reuse() {
        let mut arena = Arena::new();
        let first = arena.insert("a");
        assert_eq!(arena.remove(first), Some("a"));

        let second = arena.insert("b");
        assert_eq!(first.index(), second.index());
        assert_ne!(first, second);

        assert_eq!(arena.get(first), None);
        assert_eq!(arena.remove(first), None);
        assert_eq!(arena.get(second), Some(&"b"));
    }

    #[test]
    fn test_double_remove() {
        let mut arena = Arena::new();
        let handle = arena.insert(1);

        assert_eq!(arena.remove(handle), Some(1));
        assert_eq!(arena.remove(handle), None);
        assert_eq!(arena.len(), 0);
    }

    #[test]
    fn test_unknown_index() {
        let arena: Arena<u8> = Arena::new();
        let forged = StreamHandle::new(42, 1);
        assert_eq!(arena.get(forged), None);
    }

    #[test]
    fn test_drain_invalidates_handles() {
        let mut arena = Arena::new();
        let a = arena.insert(1);
        let b = arena.insert(2);

        let mut drained = arena.drain();
        drained.sort();
        assert_eq!(drained, vec![1, 2]);
        assert_eq!(arena.get(a), None);
        assert_eq!(arena.get(b), None);
    }
}
