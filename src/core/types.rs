//! Core type aliases and re-exports

use serde::{Deserialize, Deserializer};

pub use glam::{Vec2, Vec3};

/// Standard Result type for the crate
pub type Result<T> = std::result::Result<T, crate::core::error::Error>;

/// Deserialize a `u32` count from any JSON integer, clamping negatives to 0
/// and oversized values to `u32::MAX`.
pub(crate) fn deserialize_count_u32<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<u32, D::Error> {
    let value = i64::deserialize(deserializer)?;
    Ok(u32::try_from(value.max(0)).unwrap_or(u32::MAX))
}

/// `usize` variant of [`deserialize_count_u32`]
pub(crate) fn deserialize_count_usize<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<usize, D::Error> {
    let value = i64::deserialize(deserializer)?;
    Ok(usize::try_from(value.max(0)).unwrap_or(usize::MAX))
}

/// Optional variant of [`deserialize_count_u32`]
pub(crate) fn deserialize_opt_count_u32<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<u32>, D::Error> {
    let value = Option::<i64>::deserialize(deserializer)?;
    Ok(value.map(|v| u32::try_from(v.max(0)).unwrap_or(u32::MAX)))
}
