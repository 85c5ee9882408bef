//! Row structs for the assessment tables.
//!
//! Each submodule contains a `FromRow` + `Serialize` struct matching the
//! database row and its conversion into the domain type from
//! `fairchance-core`. Conversions fail with [`StorageError::Corrupt`] when a
//! stored value is out of range.

pub mod assessment;
pub mod decision;
pub mod profile;
pub mod step_record;

use fairchance_core::gateway::StorageError;

/// Narrow a `SMALLINT` step column to a step number.
pub(crate) fn step_from_db(column: &str, value: i16) -> Result<u8, StorageError> {
    u8::try_from(value)
        .map_err(|_| StorageError::Corrupt(format!("{column} out of range: {value}")))
}
