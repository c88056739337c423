/// Database operations for storing attributed sensor readings
use async_trait::async_trait;

use crate::database::connection::execute_with_retry;
use crate::models::PhysicalReading;
use crate::pipeline::ReadingSink;

pub const CREATE_READINGS_TABLE: &str = "CREATE TABLE IF NOT EXISTS sensor_readings (
    measurement TEXT NOT NULL,
    location TEXT NOT NULL,
    temperature DOUBLE PRECISION NOT NULL,
    humidity DOUBLE PRECISION NOT NULL,
    atmosphere_pressure DOUBLE PRECISION NOT NULL,
    battery_voltage DOUBLE PRECISION NOT NULL,
    tx_power DOUBLE PRECISION NOT NULL,
    rssi DOUBLE PRECISION,
    time TIMESTAMPTZ NOT NULL
)";

const INSERT_READING: &str = "INSERT INTO sensor_readings(measurement, location, temperature, humidity, atmosphere_pressure, battery_voltage, tx_power, rssi, time)
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)";

/// Create the readings table if it does not exist yet
pub async fn ensure_schema(database_url: &str) -> Result<(), String> {
    execute_with_retry(database_url, |client| async move {
        client.execute(CREATE_READINGS_TABLE, &[]).await
    })
    .await
}

/// Store one reading under the given measurement name
///
/// # Arguments
/// * `measurement` - Dataset name stored with the row
/// * `reading` - Attributed reading to store
/// * `database_url` - PostgreSQL connection string
pub async fn store_reading(
    measurement: &str,
    reading: &PhysicalReading,
    database_url: &str,
) -> Result<(), String> {
    // Clone data for move into async closure
    let measurement = measurement.to_string();
    let reading = reading.clone();

    execute_with_retry(database_url, move |client| {
        let measurement = measurement.clone();
        let reading = reading.clone();
        async move {
            client
                .execute(
                    INSERT_READING,
                    &[
                        &measurement,
                        &reading.sensor_name,
                        &reading.temperature_c,
                        &reading.humidity_pct,
                        &reading.pressure_kpa,
                        &reading.battery_voltage_v,
                        &reading.tx_power_dbm,
                        &reading.rssi_dbm,
                        &reading.captured_at,
                    ],
                )
                .await
        }
    })
    .await
}

/// `ReadingSink` writing to PostgreSQL
#[derive(Debug, Clone)]
pub struct PostgresSink {
    database_url: String,
    measurement: String,
}

impl PostgresSink {
    pub fn new(database_url: impl Into<String>, measurement: impl Into<String>) -> Self {
        PostgresSink {
            database_url: database_url.into(),
            measurement: measurement.into(),
        }
    }
}

#[async_trait]
impl ReadingSink for PostgresSink {
    async fn store(&self, reading: &PhysicalReading) -> Result<(), String> {
        store_reading(&self.measurement, reading, &self.database_url).await
    }
}
