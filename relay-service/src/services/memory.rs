use super::database::DeviceStore;
use crate::models::{Device, DEVICE_TTL};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::{mapref::entry::Entry, DashMap};
use service_core::error::AppError;
use std::time::Duration;

/// Process-local store backing the integration tests.
///
/// Expired records are purged lazily whenever the map is read, and a
/// registration for an expired code starts a fresh record.
pub struct InMemoryDeviceStore {
    devices: DashMap<String, Device>,
    ttl: Duration,
}

impl Default for InMemoryDeviceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryDeviceStore {
    pub fn new() -> Self {
        Self::with_ttl(DEVICE_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            devices: DashMap::new(),
            ttl,
        }
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    fn purge_expired(&self) {
        let now = Utc::now();
        self.devices
            .retain(|_, device| !device.is_expired_at(now, self.ttl));
    }
}

#[async_trait]
impl DeviceStore for InMemoryDeviceStore {
    async fn upsert(&self, code: &str, push_token: &str) -> Result<Device, AppError> {
        let device = match self.devices.entry(code.to_string()) {
            Entry::Occupied(mut entry) => {
                if entry.get().is_expired_at(Utc::now(), self.ttl) {
                    entry.insert(Device::new(code, push_token));
                } else {
                    entry.get_mut().push_token = push_token.to_string();
                }
                entry.get().clone()
            }
            Entry::Vacant(entry) => entry.insert(Device::new(code, push_token)).value().clone(),
        };
        Ok(device)
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Device>, AppError> {
        self.purge_expired();
        Ok(self.devices.get(code).map(|device| device.value().clone()))
    }

    async fn list_all(&self) -> Result<Vec<Device>, AppError> {
        self.purge_expired();
        Ok(self
            .devices
            .iter()
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn delete_by_code(&self, code: &str) -> Result<(), AppError> {
        self.devices.remove(code);
        Ok(())
    }

    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }
}
