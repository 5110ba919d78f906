//! Tradable instrument identity.

use crate::model::identity::InstrumentId;
use serde::{Deserialize, Serialize};

/// Identity record of a tradable instrument.
///
/// Created only through `InstrumentDB::add` and never mutated afterwards.
/// Orders and market-data snapshots refer to it by `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    /// Numeric id, unique within one database.
    id: InstrumentId,

    /// Short user-facing alias (e.g., "SBER").
    alias: String,

    /// Exchange symbol.
    name: String,

    /// Instrument class on the exchange (e.g., "EQ", "FUT").
    class: String,

    /// Free-form description.
    long_name: String,
}

impl Instrument {
    /// Creates a new Instrument.
    ///
    /// # Arguments
    ///
    /// * `id` - The numeric id assigned by the database.
    /// * `alias` - Unique alias.
    /// * `name` - Exchange symbol.
    /// * `long_name` - Description.
    /// * `class` - Exchange class.
    ///
    /// # Returns
    ///
    /// A new `Instrument` instance.
    pub fn new(
        id: InstrumentId,
        alias: impl Into<String>,
        name: impl Into<String>,
        long_name: impl Into<String>,
        class: impl Into<String>,
    ) -> Self {
        Self {
            id,
            alias: alias.into(),
            name: name.into(),
            class: class.into(),
            long_name: long_name.into(),
        }
    }

    pub fn get_id(&self) -> InstrumentId {
        self.id
    }

    pub fn get_alias(&self) -> &str {
        &self.alias
    }

    pub fn get_name(&self) -> &str {
        &self.name
    }

    pub fn get_class(&self) -> &str {
        &self.class
    }

    pub fn get_long_name(&self) -> &str {
        &self.long_name
    }
}
