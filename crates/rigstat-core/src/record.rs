//! Plain observation records: device identity, hash entries, sensor readings
//! and the miner setup that defines a benchmark session.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Device identity
// ---------------------------------------------------------------------------

/// Identity of one GPU inside a rig, used to correlate incoming batches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceIdentity {
    pub name: String,
    pub nvapi_id: i32,
    pub nvml_id: i32,
    /// PCI bus index. Hardware records are matched to the device by this.
    pub bus: i32,
    /// Index the miner uses when printing the device (`GPU #n`).
    pub display_index: i32,
    pub compute_capability: u32,
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GPU #{}", self.display_index)
    }
}

// ---------------------------------------------------------------------------
// Hash entries
// ---------------------------------------------------------------------------

/// One entry of the miner's hash history.
///
/// Two entries with identical fields are the same observation: equality and
/// hashing cover every field, comparing the floating point ones bitwise.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct HashSample {
    /// Seconds since the Unix epoch, device clock.
    pub timestamp: i64,
    /// Hash rate in kH/s.
    pub hash_rate: f64,
    /// Hashes tried for this entry; the weight of the sample.
    pub hash_count: u32,
    /// Solutions found during the entry.
    pub found: u32,
    pub difficulty: f64,
    pub height: u32,
}

impl HashSample {
    fn identity(&self) -> (i64, u64, u32, u32, u64, u32) {
        (
            self.timestamp,
            self.hash_rate.to_bits(),
            self.hash_count,
            self.found,
            self.difficulty.to_bits(),
            self.height,
        )
    }
}

impl PartialEq for HashSample {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for HashSample {}

impl Hash for HashSample {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

// ---------------------------------------------------------------------------
// Sensor readings
// ---------------------------------------------------------------------------

/// Hardware sensor reading taken when a batch was received.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorSample {
    pub timestamp: i64,
    pub temperature: f64,
    pub fan_percentage: f64,
    pub fan_rpm: f64,
    pub core_clock: f64,
    pub memory_clock: f64,
    /// Share submission round trip reported by the rig, in ms.
    pub pool_latency: i32,
    /// Ping from this host to the pool, in ms.
    pub remote_latency: i32,
    /// Ping from this host to the rig, in ms.
    pub local_latency: i32,
}

// ---------------------------------------------------------------------------
// Miner setup
// ---------------------------------------------------------------------------

/// Everything about the running setup that makes two benchmarks comparable.
///
/// A live report whose setup differs from the stored one in any field starts
/// a new benchmark session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionConfiguration {
    pub miner_name: String,
    pub miner_version: String,
    pub api_version: String,
    pub pool_url: String,
    pub intensity: f64,
    pub performance_state: String,
    pub bios_version: String,
    pub driver_version: String,
    pub operating_system: String,
}

impl fmt::Display for SessionConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} (APIv{})",
            self.miner_name, self.miner_version, self.api_version
        )
    }
}
