//! Opaque ids handed out by the simulation's arenas.
//!
//! Ids are recycled once their owner is removed, so a stale handle may later name a different
//! object of the same kind.

macro_rules! arena_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub struct $name(pub i32);

        impl $name {
            /// Slot of the handle in its arena.
            #[inline(always)]
            pub fn slot(self) -> usize {
                self.0 as usize
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(f, concat!(stringify!($name), "<{}>"), self.0)
            }
        }
    };
}

arena_handle!(
    /// Names a body in a simulation.
    BodyHandle
);
arena_handle!(
    /// Names a box collider attached to a body.
    BoxHandle
);
arena_handle!(
    /// Names a persistent contact constraint between two boxes.
    ContactHandle
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_the_kind() {
        assert_eq!(BodyHandle(3).to_string(), "BodyHandle<3>");
        assert_eq!(BoxHandle(0).to_string(), "BoxHandle<0>");
        assert_eq!(ContactHandle(12).slot(), 12);
    }
}
