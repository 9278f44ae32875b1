//! Type-safe handles for harness resources.
//!
//! A `Handle` is what the guest holds in place of a host object. It is a
//! plain `u32` on the wire, but on the host side it is its own type so a
//! handle can't be mixed up with an offset, a length or a `ModuleId`.

/// Opaque reference to a host resource held by the guest.
///
/// Handles are issued by a [`ResourceRegistry`](crate::registry::ResourceRegistry)
/// and mean nothing outside the registry that issued them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Handle(pub u32);

impl Handle {
    /// The value passed across the module boundary.
    pub fn into_raw(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "handle-{}", self.0)
    }
}

/// Handle to a compiled module registered with the [`Runtime`](crate::runtime::Runtime).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ModuleId(pub u64);

impl std::fmt::Display for ModuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "module-{}", self.0)
    }
}
