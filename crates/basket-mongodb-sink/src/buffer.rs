//! Fixed-capacity batch buffer.

/// An ordered, bounded holding area for documents awaiting a bulk write.
#[derive(Debug, Clone)]
pub struct BatchBuffer<T> {
    items: Vec<T>,
    capacity: usize,
}

impl<T> BatchBuffer<T> {
    /// A buffer holding up to `capacity` items (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an item. A full buffer hands the item back.
    pub fn push(&mut self, item: T) -> Result<(), T> {
        if self.is_full() {
            return Err(item);
        }
        self.items.push(item);
        Ok(())
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Take every buffered item in insertion order and leave the buffer empty.
    pub fn drain_and_reset(&mut self) -> Vec<T> {
        std::mem::replace(&mut self.items, Vec::with_capacity(self.capacity))
    }
}
