//! Identifier types for assets and live instances.
//!
//! Bytecode addresses instances with plain integers. Negative values are
//! reserved sentinels (see [`sentinel`]), small non-negative values name an
//! object asset (a type), and values at or above the first instance id name
//! one specific live instance.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Default threshold separating asset ids from instance ids.
pub const DEFAULT_FIRST_INSTANCE_ID: i32 = 100_000;

/// Reserved instance ids with special meaning in variable addressing.
pub mod sentinel {
    pub const SELF: i32 = -1;
    pub const OTHER: i32 = -2;
    pub const ALL: i32 = -3;
    pub const NOONE: i32 = -4;
    pub const GLOBAL: i32 = -5;
    pub const BUILTIN: i32 = -6;
    pub const LOCAL: i32 = -7;
    /// The real id is the next value down the operand stack.
    pub const STACKTOP: i32 = -9;
    pub const ARGUMENT: i32 = -15;
    pub const STATIC: i32 = -16;
}

/// Identifies an object asset, the type shared by many instances.
///
/// # Example
///
/// ```
/// use gmrun_core::AssetId;
///
/// let asset = AssetId::new(3);
/// assert_eq!(asset.index(), 3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(i32);

impl AssetId {
    #[inline]
    pub const fn new(index: i32) -> Self {
        Self(index)
    }

    #[inline]
    pub const fn index(self) -> i32 {
        self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "asset_{}", self.0)
    }
}

impl From<i32> for AssetId {
    fn from(index: i32) -> Self {
        Self::new(index)
    }
}

/// Identifies one live instance.
///
/// Ordering follows the numeric id, which is what asset-id lookups use to
/// pick a single instance deterministically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(i32);

impl InstanceId {
    #[inline]
    pub const fn new(id: i32) -> Self {
        Self(id)
    }

    #[inline]
    pub const fn get(self) -> i32 {
        self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for InstanceId {
    fn from(id: i32) -> Self {
        Self::new(id)
    }
}

impl From<InstanceId> for i32 {
    fn from(id: InstanceId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_id_display() {
        assert_eq!(format!("{}", AssetId::new(5)), "asset_5");
    }

    #[test]
    fn instance_id_ordering() {
        let a = InstanceId::new(100_001);
        let b = InstanceId::new(100_002);
        assert!(a < b);
        assert_eq!(std::cmp::min(b, a), a);
    }

    #[test]
    fn instance_id_roundtrips_through_i32() {
        let id = InstanceId::from(100_123);
        assert_eq!(i32::from(id), 100_123);
    }

    #[test]
    fn sentinels_are_negative() {
        for id in [
            sentinel::SELF,
            sentinel::OTHER,
            sentinel::ALL,
            sentinel::NOONE,
            sentinel::GLOBAL,
            sentinel::BUILTIN,
            sentinel::LOCAL,
            sentinel::STACKTOP,
            sentinel::ARGUMENT,
            sentinel::STATIC,
        ] {
            assert!(id < 0);
        }
    }
}
