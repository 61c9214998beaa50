//! A mining rig: one [`DeviceLogger`] per GPU.

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::logger::{DeviceLogger, UpdateOutcome, unix_now};
use crate::record::DeviceIdentity;
use crate::schema::{LatencyTriple, TelemetryBatch};

/// Devices added and removed by [`Rig::sync_devices`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceChanges {
    pub added: Vec<DeviceIdentity>,
    pub removed: Vec<DeviceIdentity>,
}

impl DeviceChanges {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Every device logger of one rig.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Rig {
    devices: Vec<DeviceLogger>,
    #[serde(default)]
    config: EngineConfig,
}

impl Rig {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            devices: Vec::new(),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn devices(&self) -> &[DeviceLogger] {
        &self.devices
    }

    /// Logger of the device on `bus`.
    pub fn device(&self, bus: i32) -> Option<&DeviceLogger> {
        self.devices.iter().find(|d| d.identity().bus == bus)
    }

    /// Reconcile the device list with the hardware records of `batch`.
    ///
    /// Devices whose identity no longer appears are dropped and new ones get
    /// a fresh logger. A batch without any device record changes nothing.
    pub fn sync_devices(&mut self, batch: &TelemetryBatch) -> DeviceChanges {
        let present = batch.device_identities();
        let mut changes = DeviceChanges::default();
        if present.is_empty() {
            return changes;
        }

        self.devices.retain(|device| {
            let keep = present.contains(device.identity());
            if !keep {
                changes.removed.push(device.identity().clone());
            }
            keep
        });

        for identity in present {
            if self.devices.iter().any(|d| *d.identity() == identity) {
                continue;
            }
            log::info!("device {identity} found on bus {}", identity.bus);
            changes.added.push(identity.clone());
            self.devices
                .push(DeviceLogger::with_config(identity, self.config.clone()));
        }

        for identity in &changes.removed {
            log::info!("device {identity} on bus {} is gone", identity.bus);
        }
        changes
    }

    /// Feed `batch` to every device, stamped with the current time.
    pub fn update(&mut self, batch: &TelemetryBatch, latency: LatencyTriple) -> Vec<UpdateOutcome> {
        self.update_at(batch, latency, unix_now())
    }

    /// Feed `batch`, received at `now`, to every device.
    pub fn update_at(
        &mut self,
        batch: &TelemetryBatch,
        latency: LatencyTriple,
        now: i64,
    ) -> Vec<UpdateOutcome> {
        self.devices
            .iter_mut()
            .map(|device| device.update_at(batch, latency, now))
            .collect()
    }

    /// Record the same availability transition on every device's active session.
    pub fn mark_all(&mut self, available: bool, closed_by_request: bool, now: i64) -> usize {
        self.devices
            .iter_mut()
            .map(|device| device.change_availability_at(available, closed_by_request, None, now))
            .filter(|&marked| marked)
            .count()
    }
}
