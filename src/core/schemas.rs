//! SQLite schema definitions for the measurement store.

pub const MEASUREMENTS_DB_NAME: &str = "aqhi.db";

pub const MEASUREMENTS_DB_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS measurements (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        city TEXT NOT NULL,
        ts_hour INTEGER NOT NULL,
        pm25 REAL NOT NULL,
        o3 REAL NOT NULL,
        no2 REAL NOT NULL,
        so2 REAL NOT NULL,
        UNIQUE(city, ts_hour)
    )
";

pub const MEASUREMENTS_DB_SCHEMA_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_measurements_city_ts ON measurements(city, ts_hour)";

pub const UPSERT_MEASUREMENT: &str = "
    INSERT INTO measurements (city, ts_hour, pm25, o3, no2, so2)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
    ON CONFLICT(city, ts_hour) DO UPDATE SET
        pm25 = excluded.pm25,
        o3 = excluded.o3,
        no2 = excluded.no2,
        so2 = excluded.so2
";
