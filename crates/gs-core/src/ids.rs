//! Strongly typed, zero-cost identifier wrappers.
//!
//! Every arena in the kernel (constraints, variables, resources, actions) is
//! a `Vec` or an ordered map keyed by one of these ids.  They are all
//! `Copy + Ord + Hash`, and ordering doubles as creation order, which the
//! loop relies on for deterministic delivery of simultaneous events.

use std::fmt;

/// Generate a typed ID wrapper around a primitive integer.
macro_rules! typed_id {
    ($(#[$attr:meta])* $vis:vis struct $name:ident($inner:ty);) => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        $vis struct $name(pub $inner);

        impl $name {
            /// Sentinel meaning "no valid ID" (the inner type's `MAX`).
            pub const INVALID: $name = $name(<$inner>::MAX);

            /// Cast to `usize` for direct use as a `Vec` index.
            #[inline(always)]
            pub fn index(self) -> usize {
                self.0 as usize
            }

            #[inline(always)]
            pub fn is_valid(self) -> bool {
                self != Self::INVALID
            }
        }

        impl Default for $name {
            /// Returns the `INVALID` sentinel so uninitialized IDs are visibly invalid.
            #[inline(always)]
            fn default() -> Self {
                Self::INVALID
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl From<$name> for usize {
            #[inline(always)]
            fn from(id: $name) -> usize {
                id.0 as usize
            }
        }

        impl TryFrom<usize> for $name {
            type Error = std::num::TryFromIntError;
            fn try_from(n: usize) -> Result<$name, Self::Error> {
                <$inner>::try_from(n).map($name)
            }
        }
    };
}

typed_id! {
    /// Slot of a constraint inside one resource-sharing system.
    pub struct ConstraintId(u32);
}

typed_id! {
    /// Slot of a variable inside one resource-sharing system.  Slots are
    /// recycled only by the system that issued them.
    pub struct VariableId(u32);
}

typed_id! {
    /// A hardware element (CPU, link, disk) of the sealed platform.
    pub struct ResourceId(u32);
}

typed_id! {
    /// A routing vertex: every host is one, routers are the rest.
    pub struct NetPointId(u32);
}

typed_id! {
    /// A unit of simulated work.  Issued monotonically, so comparing two ids
    /// compares creation order.
    pub struct ActionId(u64);
}

typed_id! {
    /// Index of a resource model inside the engine (CPU, network, disk…).
    pub struct ModelId(u16);
}

typed_id! {
    /// A wake-up deadline registered with the loop.
    pub struct TimerId(u64);
}

typed_id! {
    /// A pending wait on an action; resolves exactly once.
    pub struct WaitId(u64);
}
