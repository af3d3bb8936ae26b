use crate::infrastructure::error::InfraError;
use rusqlite::Connection;
use std::path::Path;

const SCHEMA_SQL: &str = include_str!("../../sql/schema.sql");

pub fn initialize_database(path: &Path) -> Result<(), InfraError> {
    let connection = Connection::open(path)?;
    connection.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initialize_database_is_idempotent() {
        let path = std::env::temp_dir().join(format!(
            "focusdeck-storage-test-{}.sqlite",
            std::process::id()
        ));
        initialize_database(&path).expect("first init");
        initialize_database(&path).expect("second init");

        let connection = Connection::open(&path).expect("open");
        let count: i64 = connection
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'kv_store'",
                [],
                |row| row.get(0),
            )
            .expect("query schema");
        assert_eq!(count, 1);
        let _ = std::fs::remove_file(&path);
    }
}
