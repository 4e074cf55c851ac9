//! Slot+generation table mapping opaque `u64` handles to engines.
//!
//! A handle is `(slot << 32) | generation`. Generations start at 1, so a
//! zero-initialised handle on the C side never resolves: calling into the
//! bridge before `cumulus_init` is reported, not dereferenced. Removing an
//! entry bumps its slot's generation, so destroyed handles go stale.

const FIRST_GENERATION: u32 = 1;

fn encode(slot: u32, generation: u32) -> u64 {
    ((slot as u64) << 32) | generation as u64
}

fn decode(handle: u64) -> (usize, u32) {
    ((handle >> 32) as usize, handle as u32)
}

struct Entry<T> {
    generation: u32,
    value: Option<T>,
}

/// Owned values addressed by generation-checked handles.
pub(crate) struct HandleTable<T> {
    entries: Vec<Entry<T>>,
    free: Vec<u32>,
}

impl<T> HandleTable<T> {
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
            free: Vec::new(),
        }
    }

    /// Store `value`, reusing a freed slot when one is available.
    pub fn insert(&mut self, value: T) -> u64 {
        if let Some(slot) = self.free.pop() {
            let entry = &mut self.entries[slot as usize];
            entry.value = Some(value);
            return encode(slot, entry.generation);
        }
        let slot = self.entries.len() as u32;
        self.entries.push(Entry {
            generation: FIRST_GENERATION,
            value: Some(value),
        });
        encode(slot, FIRST_GENERATION)
    }

    /// The value behind `handle`, or `None` if it is stale or was never
    /// issued.
    pub fn get(&self, handle: u64) -> Option<&T> {
        let (slot, generation) = decode(handle);
        let entry = self.entries.get(slot)?;
        if entry.generation != generation {
            return None;
        }
        entry.value.as_ref()
    }

    /// Take the value out and retire the handle. A second remove of the
    /// same handle returns `None`.
    ///
    /// A slot whose generation would wrap is never reused.
    pub fn remove(&mut self, handle: u64) -> Option<T> {
        let (slot, generation) = decode(handle);
        let entry = self.entries.get_mut(slot)?;
        if entry.generation != generation {
            return None;
        }
        let value = entry.value.take()?;
        if let Some(next) = entry.generation.checked_add(1) {
            entry.generation = next;
            self.free.push(slot as u32);
        } else {
            entry.generation = 0;
        }
        Some(value)
    }

    /// Number of live handles.
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| e.value.is_some()).count()
    }
}
