//! Named device registry
//!
//! Devices are shared as `Arc<Device>`: removing a name from the registry only
//! stops new lookups, while handles already opened keep the device alive until
//! they are dropped.

use crate::config::convert_wal_header;
use crate::device::Device;
use crate::error::{MemDbError, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info};

/// Map of device names to devices
#[derive(Debug, Default)]
pub struct Registry {
    devices: Mutex<HashMap<String, Arc<Device>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create and register a device seeded with `initial`.
    ///
    /// Fails with `DeviceExists` if `name` is taken; the existing device is
    /// left untouched.
    pub fn create(&self, name: &str, initial: &[u8]) -> Result<Arc<Device>> {
        validate_name(name)?;

        let mut devices = self.devices.lock();
        if devices.contains_key(name) {
            return Err(MemDbError::DeviceExists(name.to_string()));
        }

        let device = Arc::new(Device::new(name, initial));
        devices.insert(name.to_string(), Arc::clone(&device));
        info!("Registered device '{}' ({} total)", name, devices.len());

        Ok(device)
    }

    /// Register an already constructed device under its own name
    pub fn insert(&self, device: Device) -> Result<Arc<Device>> {
        validate_name(device.name())?;

        let mut devices = self.devices.lock();
        if devices.contains_key(device.name()) {
            return Err(MemDbError::DeviceExists(device.name().to_string()));
        }

        let device = Arc::new(device);
        devices.insert(device.name().to_string(), Arc::clone(&device));
        info!("Registered device '{}' ({} total)", device.name(), devices.len());

        Ok(device)
    }

    /// Look up `name`, creating an empty device when it is missing
    pub fn get_or_create(&self, name: &str) -> Result<Arc<Device>> {
        validate_name(name)?;

        let mut devices = self.devices.lock();
        let device = devices
            .entry(name.to_string())
            .or_insert_with(|| {
                debug!("Creating empty device '{}' on demand", name);
                Arc::new(Device::new(name, &[]))
            });

        Ok(Arc::clone(device))
    }

    pub fn get(&self, name: &str) -> Option<Arc<Device>> {
        self.devices.lock().get(name).cloned()
    }

    /// Look up `name`, failing with `DeviceNotFound`
    pub fn require(&self, name: &str) -> Result<Arc<Device>> {
        self.get(name)
            .ok_or_else(|| MemDbError::DeviceNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.devices.lock().contains_key(name)
    }

    /// Unregister `name`, returning the device if it was present
    pub fn remove(&self, name: &str) -> Option<Arc<Device>> {
        let removed = self.devices.lock().remove(name);
        if removed.is_some() {
            info!("Unregistered device '{}'", name);
        }
        removed
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.devices.lock().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.devices.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.lock().is_empty()
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains('\0') {
        return Err(MemDbError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Process-wide registry used by [`create`], [`lookup`] and [`delete`]
pub fn global() -> &'static Arc<Registry> {
    static GLOBAL: OnceLock<Arc<Registry>> = OnceLock::new();
    GLOBAL.get_or_init(|| Arc::new(Registry::new()))
}

/// Create a database device in the global registry.
///
/// A seed whose SQLite header marks WAL mode is switched to rollback-journal
/// mode first, since the VFS cannot provide WAL shared memory.
pub fn create(name: &str, initial: &[u8]) -> Result<Arc<Device>> {
    let mut seed = initial.to_vec();
    if convert_wal_header(&mut seed) {
        debug!("Converted WAL header of '{}' to rollback journal", name);
    }
    global().create(name, &seed)
}

pub fn lookup(name: &str) -> Option<Arc<Device>> {
    global().get(name)
}

/// Remove `name` from the global registry. Returns whether it was present.
pub fn delete(name: &str) -> bool {
    global().remove(name).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_get() {
        let registry = Registry::new();
        let device = registry.create("a.db", b"abc").unwrap();

        assert!(registry.contains("a.db"));
        let found = registry.get("a.db").unwrap();
        assert!(Arc::ptr_eq(&device, &found));
        assert_eq!(found.size(), 3);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let registry = Registry::new();
        registry.create("dup", b"first").unwrap();

        assert!(matches!(
            registry.create("dup", b"second"),
            Err(MemDbError::DeviceExists(name)) if name == "dup"
        ));
        assert_eq!(registry.require("dup").unwrap().dump().into_inner(), b"first");
    }

    #[test]
    fn test_insert_prebuilt_device() {
        let registry = Registry::new();
        let device = Device::with_page_size("small", b"xyz", 2).unwrap();
        registry.insert(device).unwrap();

        assert_eq!(registry.require("small").unwrap().page_size(), 2);
        assert!(registry
            .insert(Device::new("small", &[]))
            .is_err());
    }

    #[test]
    fn test_invalid_names() {
        let registry = Registry::new();
        assert!(matches!(registry.create("", b""), Err(MemDbError::InvalidName(_))));
        assert!(matches!(
            registry.create("a\0b", b""),
            Err(MemDbError::InvalidName(_))
        ));
    }

    #[test]
    fn test_get_or_create() {
        let registry = Registry::new();
        let first = registry.get_or_create("lazy").unwrap();
        first.write_at(b"data", 0).unwrap();

        let second = registry.get_or_create("lazy").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.size(), 4);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_remove_keeps_open_handles_alive() {
        let registry = Registry::new();
        let device = registry.create("gone", b"still here").unwrap();

        assert!(registry.remove("gone").is_some());
        assert!(registry.remove("gone").is_none());
        assert!(registry.get("gone").is_none());
        assert!(matches!(
            registry.require("gone"),
            Err(MemDbError::DeviceNotFound(_))
        ));

        assert_eq!(device.dump().into_inner(), b"still here");
    }

    #[test]
    fn test_names_sorted() {
        let registry = Registry::new();
        registry.create("b", b"").unwrap();
        registry.create("a", b"").unwrap();
        registry.create("c", b"").unwrap();
        assert_eq!(registry.names(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_global_create_converts_wal_header() {
        let mut image = vec![0u8; 100];
        image[18] = 2;
        image[19] = 2;

        let device = create("registry-test-wal.db", &image).unwrap();
        let dumped = device.dump().into_inner();
        assert_eq!(&dumped[18..20], &[1, 1]);
        assert_eq!(dumped.len(), 100);

        assert!(lookup("registry-test-wal.db").is_some());
        assert!(delete("registry-test-wal.db"));
        assert!(!delete("registry-test-wal.db"));
    }
}
