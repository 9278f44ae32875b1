//! # Resource registry
//!
//! The guest can't hold host objects, so it holds [`Handle`]s into this
//! table instead.
//!
//! ## Invariants
//!
//! - Handles come from a counter that only goes up. A released handle is
//!   never issued again, so a stale handle held by the guest can't end up
//!   naming some unrelated resource.
//! - Looking up or removing a handle that isn't live is an error, never a
//!   silent `None`.
//!
//! The table grows with every handle ever issued. That is fine for a
//! session that lives as long as the page that hosts it.

use std::collections::BTreeMap;

use crate::handles::Handle;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The handle was never issued, or its resource has been released.
    UnknownHandle(Handle),
    /// Every `u32` handle has been issued.
    Exhausted,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownHandle(h) => write!(f, "unknown handle: {}", h),
            Self::Exhausted => write!(f, "handle space exhausted"),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;

/// Table mapping live handles to the resources they name.
pub struct ResourceRegistry<T> {
    entries: BTreeMap<Handle, T>,
    next: u64,
}

impl<T> ResourceRegistry<T> {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next: 0,
        }
    }

    /// Stores `resource` under a fresh handle.
    ///
    /// The handle is greater than every handle this registry issued before.
    pub fn allocate(&mut self, resource: T) -> Result<Handle> {
        let raw = u32::try_from(self.next).map_err(|_| Error::Exhausted)?;
        self.next += 1;
        let handle = Handle(raw);
        self.entries.insert(handle, resource);
        Ok(handle)
    }

    pub fn get(&self, handle: Handle) -> Result<&T> {
        self.entries.get(&handle).ok_or(Error::UnknownHandle(handle))
    }

    /// Erases the entry and hands the resource back for destruction.
    ///
    /// A second `remove` of the same handle fails with `UnknownHandle`.
    pub fn remove(&mut self, handle: Handle) -> Result<T> {
        self.entries.remove(&handle).ok_or(Error::UnknownHandle(handle))
    }

    pub fn contains(&self, handle: Handle) -> bool {
        self.entries.contains_key(&handle)
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of handles issued over the registry's lifetime, live or not.
    pub fn issued(&self) -> u64 {
        self.next
    }

    /// Removes every live entry in handle order.
    pub fn drain(&mut self) -> impl Iterator<Item = (Handle, T)> + use<T> {
        std::mem::take(&mut self.entries).into_iter()
    }
}

impl<T> Default for ResourceRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handles_strictly_increase() {
        let mut reg = ResourceRegistry::new();
        let mut last = None;
        for i in 0..100 {
            let h = reg.allocate(i).unwrap();
            if let Some(prev) = last {
                assert!(h > prev, "{} not above {}", h, prev);
            }
            last = Some(h);
        }
        assert_eq!(reg.len(), 100);
        assert_eq!(reg.issued(), 100);
    }

    #[test]
    fn test_remove_then_get_fails() {
        let mut reg = ResourceRegistry::new();
        let h = reg.allocate("buffer").unwrap();
        assert_eq!(reg.remove(h), Ok("buffer"));
        assert_eq!(reg.get(h), Err(Error::UnknownHandle(h)));
        assert_eq!(reg.remove(h), Err(Error::UnknownHandle(h)));
    }

    #[test]
    fn test_never_issued_handle_is_unknown() {
        let mut reg: ResourceRegistry<u8> = ResourceRegistry::new();
        assert_eq!(reg.get(Handle(7)), Err(Error::UnknownHandle(Handle(7))));
        assert_eq!(reg.remove(Handle(0)), Err(Error::UnknownHandle(Handle(0))));
    }

    #[test]
    fn test_released_handle_is_not_reused() {
        let mut reg = ResourceRegistry::new();
        let a = reg.allocate('a').unwrap();
        let b = reg.allocate('b').unwrap();
        let c = reg.allocate('c').unwrap();
        assert_eq!((a, b, c), (Handle(0), Handle(1), Handle(2)));

        reg.remove(b).unwrap();
        assert!(reg.get(b).is_err());
        assert_eq!(reg.get(a), Ok(&'a'));
        assert_eq!(reg.get(c), Ok(&'c'));

        let d = reg.allocate('d').unwrap();
        assert_eq!(d, Handle(3));
        assert!(!reg.contains(b));
    }

    #[test]
    fn test_drain_empties_in_handle_order() {
        let mut reg = ResourceRegistry::new();
        for name in ["x", "y", "z"] {
            reg.allocate(name).unwrap();
        }
        reg.remove(Handle(1)).unwrap();

        let drained: Vec<_> = reg.drain().collect();
        assert_eq!(drained, vec![(Handle(0), "x"), (Handle(2), "z")]);
        assert!(reg.is_empty());

        // The counter survives a drain.
        assert_eq!(reg.allocate("w").unwrap(), Handle(3));
    }

    #[test]
    fn test_exhausted_counter() {
        let mut reg = ResourceRegistry::new();
        reg.next = u32::MAX as u64;
        assert_eq!(reg.allocate(()).unwrap(), Handle(u32::MAX));
        assert_eq!(reg.allocate(()), Err(Error::Exhausted));
    }
}
