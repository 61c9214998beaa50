//! Strict schema for the miner's key/value telemetry.
//!
//! The rig API answers every query with a list of `KEY=value` records. This
//! module names every key the core reads, gives each a semantic type and a
//! default, and parses a whole batch once into typed values. Nothing past
//! this module ever looks at a raw string key.
//!
//! A batch has four slots, in query order:
//!
//! ```text
//! [summary, pool info, hardware info, hash history]
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::record::{DeviceIdentity, HashSample, SensorSample, SessionConfiguration};

// ---------------------------------------------------------------------------
// Field names
// ---------------------------------------------------------------------------

/// Every key the core reads from a telemetry record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    /// Algorithm currently mined (summary).
    Algo,
    /// Miner program name (summary).
    Name,
    /// Miner version (summary).
    Ver,
    /// API version (summary).
    Api,
    /// Pool URL (pool info).
    Url,
    /// Performance state (hardware).
    Pst,
    /// Video BIOS version (hardware).
    Bios,
    /// Driver version (trailing system record).
    NvDriver,
    /// Operating system (trailing system record).
    Os,
    /// PCI bus index (hardware).
    Bus,
    /// Workload intensity (hardware, optional).
    Intensity,
    /// Miner device index (hardware).
    Gpu,
    /// Card name (hardware).
    Card,
    /// Compute capability (hardware).
    Sm,
    /// NVAPI device id (hardware).
    NvApi,
    /// NVML device id (hardware).
    Nvml,
    /// Entry timestamp (history).
    Ts,
    /// Hash rate in kH/s (history).
    Khs,
    /// Hash count (history).
    Count,
    /// Solutions found (history).
    Found,
    /// Block height (history).
    Height,
    /// Network difficulty (history).
    Diff,
    /// Temperature in °C (hardware).
    Temp,
    /// Fan speed percentage (hardware).
    Fan,
    /// Fan speed in RPM (hardware).
    Rpm,
    /// Core clock in MHz (hardware).
    Freq,
    /// Memory clock in MHz (hardware).
    MemFreq,
}

impl Field {
    /// Key as it appears on the wire.
    pub fn key(self) -> &'static str {
        match self {
            Self::Algo => "ALGO",
            Self::Name => "NAME",
            Self::Ver => "VER",
            Self::Api => "API",
            Self::Url => "URL",
            Self::Pst => "PST",
            Self::Bios => "BIOS",
            Self::NvDriver => "NVDRIVER",
            Self::Os => "OS",
            Self::Bus => "BUS",
            Self::Intensity => "I",
            Self::Gpu => "GPU",
            Self::Card => "CARD",
            Self::Sm => "SM",
            Self::NvApi => "NVAPI",
            Self::Nvml => "NVML",
            Self::Ts => "TS",
            Self::Khs => "KHS",
            Self::Count => "COUNT",
            Self::Found => "FOUND",
            Self::Height => "H",
            Self::Diff => "DIFF",
            Self::Temp => "TEMP",
            Self::Fan => "FAN",
            Self::Rpm => "RPM",
            Self::Freq => "FREQ",
            Self::MemFreq => "MEMFREQ",
        }
    }
}

// ---------------------------------------------------------------------------
// Raw records
// ---------------------------------------------------------------------------

/// One `KEY=value` record as delivered by the transport.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord(pub HashMap<String, String>);

impl RawRecord {
    /// Build a record from key/value pairs.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Raw value of a field, if present.
    pub fn get(&self, field: Field) -> Option<&str> {
        self.0.get(field.key()).map(String::as_str)
    }

    /// Text value, or the empty string.
    pub fn text(&self, field: Field) -> String {
        self.get(field).map(str::trim).unwrap_or_default().to_string()
    }

    /// Finite decimal value, or 0.
    pub fn number(&self, field: Field) -> f64 {
        self.get(field)
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite())
            .unwrap_or_else(|| {
                log::trace!("field {} missing or not numeric, using 0", field.key());
                0.0
            })
    }

    /// Unsigned counter value, or 0.
    pub fn unsigned(&self, field: Field) -> u32 {
        self.get(field)
            .and_then(|v| v.trim().parse::<u32>().ok())
            .unwrap_or(0)
    }

    /// Signed integer value, or 0.
    pub fn signed(&self, field: Field) -> i32 {
        self.get(field)
            .and_then(|v| v.trim().parse::<i32>().ok())
            .unwrap_or(0)
    }

    /// Whether this hardware record describes a GPU (carries a bus index).
    pub fn is_device(&self) -> bool {
        self.get(Field::Bus)
            .is_some_and(|v| v.trim().parse::<i32>().is_ok())
    }
}

// ---------------------------------------------------------------------------
// Batches
// ---------------------------------------------------------------------------

/// One polling cycle worth of telemetry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryBatch {
    pub summary: Vec<RawRecord>,
    pub pool_info: Vec<RawRecord>,
    pub hardware_info: Vec<RawRecord>,
    pub history: Vec<RawRecord>,
}

impl From<[Vec<RawRecord>; 4]> for TelemetryBatch {
    fn from(slots: [Vec<RawRecord>; 4]) -> Self {
        let [summary, pool_info, hardware_info, history] = slots;
        Self {
            summary,
            pool_info,
            hardware_info,
            history,
        }
    }
}

impl TelemetryBatch {
    /// Hardware record of the device on `bus`, if the batch has one.
    pub fn hardware_for(&self, bus: i32) -> Option<&RawRecord> {
        self.hardware_info
            .iter()
            .find(|hw| hw.is_device() && hw.signed(Field::Bus) == bus)
    }

    /// Identities of every device listed in the hardware slot.
    pub fn device_identities(&self) -> Vec<DeviceIdentity> {
        self.hardware_info
            .iter()
            .filter(|hw| hw.is_device())
            .map(device_identity)
            .collect()
    }
}

/// Round-trip latencies measured alongside a batch, in ms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatencyTriple {
    pub pool: i32,
    pub remote: i32,
    pub local: i32,
}

impl From<[i32; 3]> for LatencyTriple {
    fn from([pool, remote, local]: [i32; 3]) -> Self {
        Self {
            pool,
            remote,
            local,
        }
    }
}

/// Build a device identity from a GPU hardware record.
pub fn device_identity(hw: &RawRecord) -> DeviceIdentity {
    DeviceIdentity {
        name: hw.text(Field::Card),
        nvapi_id: hw.signed(Field::NvApi),
        nvml_id: hw.signed(Field::Nvml),
        bus: hw.signed(Field::Bus),
        display_index: hw.signed(Field::Gpu),
        compute_capability: hw.unsigned(Field::Sm),
    }
}

// ---------------------------------------------------------------------------
// Parsed live report
// ---------------------------------------------------------------------------

/// Sensor values of one device, without timestamp or latencies.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SensorReading {
    pub temperature: f64,
    pub fan_percentage: f64,
    pub fan_rpm: f64,
    pub core_clock: f64,
    pub memory_clock: f64,
}

/// A batch parsed from the point of view of a single device.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LiveReport {
    pub algorithm: String,
    pub configuration: SessionConfiguration,
    pub sensor: SensorReading,
    pub hash_samples: Vec<HashSample>,
    /// False when the batch had no hardware record for the device's bus.
    pub hardware_found: bool,
}

impl LiveReport {
    /// Parse everything the core needs for the device on `bus`.
    ///
    /// Missing records and keys fall back to empty strings and zeros.
    pub fn parse(batch: &TelemetryBatch, bus: i32) -> Self {
        let empty = RawRecord::default();
        let summary = batch.summary.first().unwrap_or(&empty);
        let hardware = batch.hardware_for(bus);
        if hardware.is_none() {
            log::warn!("no hardware record for bus {bus}, sensor fields default to 0");
        }
        let hw = hardware.unwrap_or(&empty);
        let system = batch.hardware_info.last().unwrap_or(&empty);

        let configuration = SessionConfiguration {
            miner_name: summary.text(Field::Name),
            miner_version: summary.text(Field::Ver),
            api_version: summary.text(Field::Api),
            pool_url: batch
                .pool_info
                .first()
                .map(|pool| pool.text(Field::Url))
                .unwrap_or_default(),
            intensity: hw.number(Field::Intensity),
            performance_state: hw.text(Field::Pst),
            bios_version: hw.text(Field::Bios),
            driver_version: system.text(Field::NvDriver),
            operating_system: system.text(Field::Os),
        };

        let sensor = SensorReading {
            temperature: hw.number(Field::Temp),
            fan_percentage: hw.number(Field::Fan),
            fan_rpm: hw.number(Field::Rpm),
            core_clock: hw.number(Field::Freq),
            memory_clock: hw.number(Field::MemFreq),
        };

        let hash_samples = batch.history.iter().map(hash_sample).collect();

        Self {
            algorithm: summary.text(Field::Algo),
            configuration,
            sensor,
            hash_samples,
            hardware_found: hardware.is_some(),
        }
    }

    /// Stamp the sensor reading with the receipt time and measured latencies.
    pub fn sensor_sample(&self, now: i64, latency: LatencyTriple) -> SensorSample {
        SensorSample {
            timestamp: now,
            temperature: self.sensor.temperature,
            fan_percentage: self.sensor.fan_percentage,
            fan_rpm: self.sensor.fan_rpm,
            core_clock: self.sensor.core_clock,
            memory_clock: self.sensor.memory_clock,
            pool_latency: latency.pool,
            remote_latency: latency.remote,
            local_latency: latency.local,
        }
    }
}

fn hash_sample(entry: &RawRecord) -> HashSample {
    HashSample {
        timestamp: i64::from(entry.unsigned(Field::Ts)),
        hash_rate: entry.number(Field::Khs).max(0.0),
        hash_count: entry.unsigned(Field::Count),
        found: entry.unsigned(Field::Found),
        difficulty: entry.number(Field::Diff),
        height: entry.unsigned(Field::Height),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
