use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use weathervk_weather::{ForecastEntry, WeatherMainCast};

use crate::error::{StoreError, StoreResult};
use crate::record::{CityRecord, DailyForecastRecord, ForecastKind};

const SCHEMA_VERSION: i32 = 1;

const CITY_COLUMNS: &str =
    "id, city, latitude, longitude, temperature, humidity, wind_speed, icon, updated_at";
const FORECAST_COLUMNS: &str = "id, city_id, kind, date, temperature, description, icon";

/// Local SQLite storage for saved cities and their forecasts.
///
/// All writes commit before returning. The connection is not `Sync`; keep the
/// store on the thread that owns the view.
pub struct WeatherStore {
    conn: Connection,
}

impl WeatherStore {
    /// Open or create the database
    pub fn open(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        tracing::debug!("Opened weather database at {}", path.display());
        Self::with_connection(conn)
    }

    /// Create an in-memory store (tests, throwaway sessions)
    pub fn in_memory() -> StoreResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> StoreResult<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);

            CREATE TABLE IF NOT EXISTS cities (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                city TEXT NOT NULL UNIQUE,
                latitude REAL NOT NULL,
                longitude REAL NOT NULL,
                temperature INTEGER NOT NULL,
                humidity INTEGER NOT NULL,
                wind_speed REAL NOT NULL,
                icon TEXT,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS daily_forecasts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                city_id INTEGER NOT NULL,
                kind TEXT NOT NULL,
                date INTEGER NOT NULL,
                temperature INTEGER,
                description TEXT,
                icon TEXT,
                FOREIGN KEY (city_id) REFERENCES cities(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_forecasts_city ON daily_forecasts(city_id, kind, date);",
        )?;

        let version: Option<i32> = self
            .conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| row.get(0))
            .optional()?;

        if version != Some(SCHEMA_VERSION) {
            self.conn.execute("DELETE FROM schema_version", [])?;
            self.conn.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                params![SCHEMA_VERSION],
            )?;
        }

        Ok(())
    }

    fn row_to_city(row: &Row) -> rusqlite::Result<CityRecord> {
        let updated_at_str: String = row.get(8)?;
        let updated_at = DateTime::parse_from_rfc3339(&updated_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(8, Type::Text, Box::new(e)))?;

        Ok(CityRecord {
            id: row.get(0)?,
            city: row.get(1)?,
            latitude: row.get(2)?,
            longitude: row.get(3)?,
            temperature: row.get(4)?,
            humidity: row.get(5)?,
            wind_speed: row.get(6)?,
            icon: row.get(7)?,
            updated_at,
        })
    }

    fn row_to_forecast(row: &Row) -> rusqlite::Result<DailyForecastRecord> {
        let kind_str: String = row.get(2)?;
        let kind = ForecastKind::parse(&kind_str).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                2,
                Type::Text,
                format!("unknown forecast kind {kind_str:?}").into(),
            )
        })?;
        let date_secs: i64 = row.get(3)?;
        let date = DateTime::from_timestamp(date_secs, 0).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                3,
                Type::Integer,
                format!("timestamp {date_secs} out of range").into(),
            )
        })?;

        Ok(DailyForecastRecord {
            id: row.get(0)?,
            city_id: row.get(1)?,
            kind,
            date,
            temperature: row.get(4)?,
            description: row.get(5)?,
            icon: row.get(6)?,
        })
    }

    // ---- read ----

    /// All saved cities, ordered by name
    pub fn cities(&self) -> StoreResult<Vec<CityRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {CITY_COLUMNS} FROM cities ORDER BY city"))?;
        let cities = stmt
            .query_map([], Self::row_to_city)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(cities)
    }

    /// Saved city by exact name
    pub fn city(&self, name: &str) -> StoreResult<Option<CityRecord>> {
        let city = self
            .conn
            .query_row(
                &format!("SELECT {CITY_COLUMNS} FROM cities WHERE city = ?1"),
                [name],
                Self::row_to_city,
            )
            .optional()?;
        Ok(city)
    }

    pub fn has_cities(&self) -> StoreResult<bool> {
        Ok(self.count()? > 0)
    }

    pub fn count(&self) -> StoreResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM cities", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// The city's single "current" forecast, if one was stored
    pub fn current_forecast(&self, name: &str) -> StoreResult<Option<DailyForecastRecord>> {
        let city_id = self.require_city_id(name)?;
        let forecast = self
            .conn
            .query_row(
                &format!(
                    "SELECT {FORECAST_COLUMNS} FROM daily_forecasts
                     WHERE city_id = ?1 AND kind = ?2 LIMIT 1"
                ),
                params![city_id, ForecastKind::Current.as_str()],
                Self::row_to_forecast,
            )
            .optional()?;
        Ok(forecast)
    }

    /// The city's future forecasts in chronological order
    pub fn future_forecast(&self, name: &str) -> StoreResult<Vec<DailyForecastRecord>> {
        let city_id = self.require_city_id(name)?;
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {FORECAST_COLUMNS} FROM daily_forecasts
             WHERE city_id = ?1 AND kind = ?2 ORDER BY date"
        ))?;
        let forecasts = stmt
            .query_map(
                params![city_id, ForecastKind::Future.as_str()],
                Self::row_to_forecast,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(forecasts)
    }

    fn city_id(&self, name: &str) -> StoreResult<Option<i64>> {
        let id = self
            .conn
            .query_row("SELECT id FROM cities WHERE city = ?1", [name], |row| row.get(0))
            .optional()?;
        Ok(id)
    }

    fn require_city_id(&self, name: &str) -> StoreResult<i64> {
        self.city_id(name)?.ok_or_else(|| StoreError::not_found(name))
    }

    fn require_city(&self, name: &str) -> StoreResult<CityRecord> {
        self.city(name)?.ok_or_else(|| StoreError::not_found(name))
    }

    // ---- write ----

    /// Insert a new city. Fails with `Conflict` if the name is already saved.
    pub fn create_city(&self, weather: &WeatherMainCast) -> StoreResult<CityRecord> {
        validate(weather)?;

        let tx = self.conn.unchecked_transaction()?;
        let inserted = tx.execute(
            "INSERT INTO cities (city, latitude, longitude, temperature, humidity, wind_speed, icon, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                weather.name,
                weather.coord.lat,
                weather.coord.lon,
                rounded(weather.main.temp),
                weather.main.humidity,
                weather.wind.speed,
                weather.icon(),
                Utc::now().to_rfc3339(),
            ],
        );

        match inserted {
            Ok(_) => {}
            Err(e) if StoreError::is_constraint_violation(&e) => {
                return Err(StoreError::Conflict(weather.name.clone()));
            }
            Err(e) => return Err(e.into()),
        }

        link_forecasts(&tx, tx.last_insert_rowid(), weather)?;
        tx.commit()?;

        tracing::info!("Saved new city {}", weather.name);
        self.require_city(&weather.name)
    }

    /// Update the city with this name, inserting it if missing.
    ///
    /// A single `INSERT .. ON CONFLICT` statement, so two concurrent writers
    /// cannot produce duplicate rows.
    pub fn update_city(&self, weather: &WeatherMainCast) -> StoreResult<CityRecord> {
        validate(weather)?;

        let tx = self.conn.unchecked_transaction()?;
        upsert(&tx, weather)?;
        tx.commit()?;

        tracing::debug!("Upserted city {}", weather.name);
        self.require_city(&weather.name)
    }

    /// Upsert every entry in one transaction and return the full city list
    pub fn update_cities(&self, cities: &[WeatherMainCast]) -> StoreResult<Vec<CityRecord>> {
        for weather in cities {
            validate(weather)?;
        }

        let tx = self.conn.unchecked_transaction()?;
        for weather in cities {
            upsert(&tx, weather)?;
        }
        tx.commit()?;

        tracing::info!("Upserted {} cities", cities.len());
        self.cities()
    }

    /// Replace a saved city's forecasts
    pub fn set_forecasts<C, F>(&self, name: &str, current: Option<&C>, future: &[F]) -> StoreResult<()>
    where
        C: ForecastEntry,
        F: ForecastEntry,
    {
        let city_id = self.require_city_id(name)?;

        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM daily_forecasts WHERE city_id = ?1", params![city_id])?;
        if let Some(entry) = current {
            insert_forecast(&tx, city_id, ForecastKind::Current, entry)?;
        }
        for entry in future {
            insert_forecast(&tx, city_id, ForecastKind::Future, entry)?;
        }
        tx.commit()?;
        Ok(())
    }

    // ---- delete ----

    /// Delete a city and its forecasts. Returns whether anything was removed.
    pub fn delete_city(&self, name: &str) -> StoreResult<bool> {
        let Some(city_id) = self.city_id(name)? else {
            return Ok(false);
        };

        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM daily_forecasts WHERE city_id = ?1", params![city_id])?;
        tx.execute("DELETE FROM cities WHERE id = ?1", params![city_id])?;
        tx.commit()?;

        tracing::info!("Deleted city {}", name);
        Ok(true)
    }

    /// Delete every saved city. Returns how many were removed.
    pub fn delete_cities(&self) -> StoreResult<usize> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM daily_forecasts", [])?;
        let removed = tx.execute("DELETE FROM cities", [])?;
        tx.commit()?;

        tracing::info!("Deleted {} cities", removed);
        Ok(removed)
    }
}

fn validate(weather: &WeatherMainCast) -> StoreResult<()> {
    if weather.name.trim().is_empty() {
        return Err(StoreError::Invalid(
            "weather response has no place name".to_string(),
        ));
    }
    Ok(())
}

fn rounded(value: f64) -> i32 {
    value.round() as i32
}

fn upsert(conn: &Connection, weather: &WeatherMainCast) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO cities (city, latitude, longitude, temperature, humidity, wind_speed, icon, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(city) DO UPDATE SET
            latitude = excluded.latitude,
            longitude = excluded.longitude,
            temperature = excluded.temperature,
            humidity = excluded.humidity,
            wind_speed = excluded.wind_speed,
            icon = excluded.icon,
            updated_at = excluded.updated_at",
        params![
            weather.name,
            weather.coord.lat,
            weather.coord.lon,
            rounded(weather.main.temp),
            weather.main.humidity,
            weather.wind.speed,
            weather.icon(),
            Utc::now().to_rfc3339(),
        ],
    )?;

    let city_id: i64 = conn.query_row(
        "SELECT id FROM cities WHERE city = ?1",
        [&weather.name],
        |row| row.get(0),
    )?;
    link_forecasts(conn, city_id, weather)
}

/// Replace stored forecasts when the response carries any; otherwise keep
/// what is already there.
fn link_forecasts(conn: &Connection, city_id: i64, weather: &WeatherMainCast) -> StoreResult<()> {
    if !weather.has_forecast() {
        return Ok(());
    }

    conn.execute("DELETE FROM daily_forecasts WHERE city_id = ?1", params![city_id])?;
    if let Some(current) = &weather.current {
        insert_forecast(conn, city_id, ForecastKind::Current, current)?;
    }
    for future in &weather.weekly_forecast {
        insert_forecast(conn, city_id, ForecastKind::Future, future)?;
    }
    Ok(())
}

fn insert_forecast<E: ForecastEntry + ?Sized>(
    conn: &Connection,
    city_id: i64,
    kind: ForecastKind,
    entry: &E,
) -> StoreResult<()> {
    let condition = entry.condition();
    conn.execute(
        "INSERT INTO daily_forecasts (city_id, kind, date, temperature, description, icon)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            city_id,
            kind.as_str(),
            entry.date().timestamp(),
            entry.temperature().map(rounded),
            condition.map(|c| c.main.as_str()),
            condition.map(|c| c.icon.as_str()),
        ],
    )?;
    Ok(())
}
