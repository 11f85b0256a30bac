//! Property selection mask for copying object state

use std::ops::{BitAnd, BitOr, Not};

/// Set of object properties, used to copy a subset from one object to another
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PropertyFlags(u8);

impl PropertyFlags {
    pub const NONE: Self = Self(0);
    pub const MATRIX: Self = Self(1);
    pub const COLOR: Self = Self(1 << 1);
    pub const MATERIAL_INDEX: Self = Self(1 << 2);
    pub const NAME: Self = Self(1 << 3);
    pub const VISIBLE: Self = Self(1 << 4);
    pub const MESH: Self = Self(1 << 5);
    pub const ALL: Self = Self(0b11_1111);

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for PropertyFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitAnd for PropertyFlags {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl Not for PropertyFlags {
    type Output = Self;

    fn not(self) -> Self {
        Self(!self.0 & Self::ALL.0)
    }
}
