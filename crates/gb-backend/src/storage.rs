use crate::backend::BufferId;
use crate::error::{BackendError, Result};

/// Slot table mapping `BufferId`s to backend-owned buffers.
///
/// Ids are never reused, so a handle that has been removed stays invalid
/// for the lifetime of the table and a second `remove` is reported as
/// `UnknownBuffer` rather than hitting some newer allocation.
#[derive(Debug)]
pub struct BufferTable<T> {
    slots: Vec<Option<T>>,
}

impl<T> BufferTable<T> {
    pub fn new() -> Self {
        BufferTable { slots: Vec::new() }
    }

    /// Store a buffer and return its handle.
    pub fn insert(&mut self, buf: T) -> BufferId {
        self.slots.push(Some(buf));
        BufferId(self.slots.len() - 1)
    }

    pub fn get(&self, id: BufferId) -> Result<&T> {
        self.slots
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or(BackendError::UnknownBuffer(id))
    }

    pub fn get_mut(&mut self, id: BufferId) -> Result<&mut T> {
        self.slots
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(BackendError::UnknownBuffer(id))
    }

    /// Remove a buffer, returning it so the caller can release it.
    ///
    /// # Errors
    /// Returns `UnknownBuffer` if the id was never issued or was already
    /// removed.
    pub fn remove(&mut self, id: BufferId) -> Result<T> {
        self.slots
            .get_mut(id.0)
            .and_then(Option::take)
            .ok_or(BackendError::UnknownBuffer(id))
    }

    /// Put a buffer taken with `remove` back under its original id.
    pub fn restore(&mut self, id: BufferId, buf: T) {
        if let Some(slot) = self.slots.get_mut(id.0) {
            *slot = Some(buf);
        }
    }

    /// Number of buffers currently held.
    pub fn live(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }
}

impl<T> Default for BufferTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Fail with `LengthMismatch` unless `got == expected`.
pub fn check_len(expected: usize, got: usize) -> Result<()> {
    if expected != got {
        return Err(BackendError::LengthMismatch { expected, got });
    }
    Ok(())
}

/// Fail with `AliasedBuffer` if C shares a handle with A or B.
pub fn check_distinct(a: BufferId, b: BufferId, c: BufferId) -> Result<()> {
    if c == a || c == b {
        return Err(BackendError::AliasedBuffer(c));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_get() {
        let mut t = BufferTable::new();
        let id = t.insert(vec![1.0f32, 2.0]);
        assert_eq!(t.get(id).unwrap(), &vec![1.0, 2.0]);
        assert_eq!(t.live(), 1);
    }

    #[test]
    fn test_remove_twice() {
        let mut t = BufferTable::new();
        let id = t.insert(vec![0.0f32]);
        assert!(t.remove(id).is_ok());
        assert!(matches!(t.remove(id), Err(BackendError::UnknownBuffer(_))));
        assert_eq!(t.live(), 0);
    }

    #[test]
    fn test_ids_not_reused() {
        let mut t = BufferTable::new();
        let a = t.insert(1u8);
        t.remove(a).unwrap();
        let b = t.insert(2u8);
        assert_ne!(a, b);
        assert!(t.get(a).is_err());
    }

    #[test]
    fn test_restore() {
        let mut t = BufferTable::new();
        let id = t.insert(vec![3.0f32]);
        let mut buf = t.remove(id).unwrap();
        buf[0] = 4.0;
        t.restore(id, buf);
        assert_eq!(t.get(id).unwrap()[0], 4.0);
    }

    #[test]
    fn test_mut_access() {
        let mut t = BufferTable::new();
        let id = t.insert(vec![1.0f32, 2.0]);
        t.get_mut(id).unwrap()[0] = 42.0;
        assert_eq!(t.get(id).unwrap()[0], 42.0);
    }

    #[test]
    fn test_check_len() {
        assert!(check_len(3, 3).is_ok());
        assert!(matches!(
            check_len(3, 2),
            Err(BackendError::LengthMismatch { expected: 3, got: 2 })
        ));
    }

    #[test]
    fn test_check_distinct() {
        let (a, b, c) = (BufferId(0), BufferId(1), BufferId(2));
        assert!(check_distinct(a, b, c).is_ok());
        assert!(check_distinct(a, b, a).is_err());
        // A and B may alias; only C is written.
        assert!(check_distinct(a, a, c).is_ok());
    }
}
