//! Data structures for match configuration files.
//!
//! This module contains pure data structures designed to be deserialized
//! from RON. Values use plain decimals so files stay readable; conversion
//! to the fixed-point [`crate::config::MatchConfig`] validates them.
//!
//! **Note:** This module contains no IO - it only defines data types.
//! File loading is handled by `lane_headless`.

mod match_data;
mod unit_data;

pub use match_data::{BaseData, FactionData, MatchData, SpawnerData};
pub use unit_data::UnitData;

use crate::error::{GameError, Result};
use crate::math::Fixed;

/// Convert a data-file decimal into fixed-point, rejecting NaN and
/// out-of-range values.
pub(crate) fn to_fixed(field: &str, value: f32) -> Result<Fixed> {
    Fixed::checked_from_num(value).ok_or_else(|| GameError::DataParseError {
        path: field.to_string(),
        message: format!("value {value} is not representable"),
    })
}
