//! In-memory database of instrument definitions.
//!
//! Instruments can be looked up by alias, by (name, class) or by id. The
//! database is append-only: `add` is the only mutator. Persistence is handled
//! by the runtime.

use crate::error::{Error, Result};
use crate::model::identity::InstrumentId;
use crate::model::instrument::Instrument;
use std::collections::HashMap;

/// A database for trading instruments.
#[derive(Debug, Default)]
pub struct InstrumentDB {
    instruments: HashMap<InstrumentId, Instrument>,
    by_alias: HashMap<String, InstrumentId>,
    by_name: HashMap<(String, String), InstrumentId>,
    next_id: InstrumentId,
}

impl InstrumentDB {
    /// Creates a new, empty InstrumentDB.
    pub fn new() -> Self {
        Self {
            next_id: 1,
            ..Default::default()
        }
    }

    /// Retrieves an instrument by its alias.
    pub fn get_by_alias(&self, alias: &str) -> Option<&Instrument> {
        self.by_alias
            .get(alias)
            .and_then(|id| self.instruments.get(id))
    }

    /// Retrieves an instrument by exchange name and class.
    pub fn get_by_name(&self, name: &str, class: &str) -> Option<&Instrument> {
        self.by_name
            .get(&(name.to_string(), class.to_string()))
            .and_then(|id| self.instruments.get(id))
    }

    /// Retrieves an instrument by its ID.
    pub fn get_by_id(&self, id: InstrumentId) -> Option<&Instrument> {
        self.instruments.get(&id)
    }

    /// Adds a new instrument and assigns it the next free id.
    ///
    /// # Arguments
    ///
    /// * `alias` - Unique alias of the instrument.
    /// * `name` - Exchange symbol.
    /// * `long_name` - Description.
    /// * `class` - Exchange class.
    ///
    /// # Returns
    ///
    /// * `Ok(&Instrument)` with the created instrument.
    /// * `Err(Error::AlreadyExists)` if the alias or the (name, class) pair is taken.
    pub fn add(
        &mut self,
        alias: &str,
        name: &str,
        long_name: &str,
        class: &str,
    ) -> Result<&Instrument> {
        let id = self.next_id;
        self.insert(Instrument::new(id, alias, name, long_name, class))
    }

    /// Inserts a fully built instrument, keeping its id.
    ///
    /// Used when restoring a persisted database. Fails on a duplicate alias,
    /// id or (name, class) pair.
    pub fn insert(&mut self, instrument: Instrument) -> Result<&Instrument> {
        let id = instrument.get_id();
        if self.by_alias.contains_key(instrument.get_alias()) {
            return Err(Error::AlreadyExists(format!(
                "instrument alias '{}'",
                instrument.get_alias()
            )));
        }
        if self.instruments.contains_key(&id) {
            return Err(Error::AlreadyExists(format!("instrument id {}", id)));
        }
        let name_key = (
            instrument.get_name().to_string(),
            instrument.get_class().to_string(),
        );
        if self.by_name.contains_key(&name_key) {
            return Err(Error::AlreadyExists(format!(
                "instrument {} of class {}",
                name_key.0, name_key.1
            )));
        }

        self.by_alias.insert(instrument.get_alias().to_string(), id);
        self.by_name.insert(name_key, id);
        self.next_id = self.next_id.max(id.saturating_add(1));
        Ok(self.instruments.entry(id).or_insert(instrument))
    }

    /// Returns the number of instruments.
    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }

    /// Returns an iterator over the instruments.
    pub fn iter(&self) -> impl Iterator<Item = (&InstrumentId, &Instrument)> {
        self.instruments.iter()
    }
}
