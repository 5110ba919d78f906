//! Persistence of the instrument database under the system home directory.

use crate::fs::{load_state_opt, save_state, PathManager};
use anyhow::{Context, Result};
use robot::{Instrument, InstrumentDB};

const INSTRUMENT_DB_FILE_NAME: &str = "instruments.json";

/// Loads the InstrumentDB from `<root>/data/instruments.json`.
///
/// A missing file yields an empty database.
pub fn load_instrument_db(path_manager: &PathManager) -> Result<InstrumentDB> {
    let file_path = path_manager.get_data_file_path(INSTRUMENT_DB_FILE_NAME);
    let mut db = InstrumentDB::new();

    let Some(instruments) = load_state_opt::<Vec<Instrument>>(&file_path)
        .with_context(|| format!("Failed to load instruments from {:?}", file_path))?
    else {
        return Ok(db);
    };

    for instrument in instruments {
        let alias = instrument.get_alias().to_string();
        db.insert(instrument)
            .with_context(|| format!("Duplicate instrument '{}' in {:?}", alias, file_path))?;
    }

    Ok(db)
}

/// Saves the InstrumentDB to `<root>/data/instruments.json`, ordered by id.
pub fn save_instrument_db(db: &InstrumentDB, path_manager: &PathManager) -> Result<()> {
    let file_path = path_manager.get_data_file_path(INSTRUMENT_DB_FILE_NAME);

    let mut instruments: Vec<Instrument> = db.iter().map(|(_, v)| v.clone()).collect();
    instruments.sort_by_key(|instrument| instrument.get_id());

    save_state(&file_path, &instruments)
        .with_context(|| format!("Failed to save instruments to {:?}", file_path))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instrument_db_survives_restart() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let paths = PathManager::from_root(dir.path());

        let mut db = InstrumentDB::new();
        db.add("SBER", "SBER", "Sberbank", "EQ")?;
        db.add("SiZ4", "SiZ4", "USD/RUB fut", "FUT")?;
        save_instrument_db(&db, &paths)?;

        let restored = load_instrument_db(&paths)?;
        assert_eq!(restored.len(), 2);
        let si = restored.get_by_name("SiZ4", "FUT").expect("restored");
        assert_eq!(si.get_id(), db.get_by_alias("SiZ4").unwrap().get_id());
        Ok(())
    }

    #[test]
    fn test_missing_file_is_empty_db() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let db = load_instrument_db(&PathManager::from_root(dir.path()))?;
        assert!(db.is_empty());
        Ok(())
    }
}
