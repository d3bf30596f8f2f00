//! The namespaced key-value substrate.
//!
//! Each namespace is a flat map from short keys (15 characters at most,
//! the NVS limit) to typed scalars or byte blobs. Access is scoped: a
//! closure receives a handle that is gone when the closure returns, so a
//! namespace can never be left open on an early exit path.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// NVS key name limit.
pub const KEY_MAX_LEN: usize = 15;

/// The fixed namespace set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    /// Trip A counters.
    TripA,
    /// Trip B counters.
    TripB,
    /// Lifetime statistics.
    Lifetime,
    /// Fault-code history.
    FaultLog,
    /// User settings.
    Settings,
    /// Boot/shutdown bookkeeping.
    System,
    /// Fuel-economy extremes.
    FuelEconomy,
}

impl Namespace {
    /// Every namespace, load order.
    pub const ALL: [Namespace; 7] = [
        Namespace::TripA,
        Namespace::TripB,
        Namespace::Lifetime,
        Namespace::FaultLog,
        Namespace::Settings,
        Namespace::System,
        Namespace::FuelEconomy,
    ];

    /// On-flash namespace name.
    pub fn name(self) -> &'static str {
        match self {
            Namespace::TripA => "trip_a",
            Namespace::TripB => "trip_b",
            Namespace::Lifetime => "lifetime",
            Namespace::FaultLog => "fault_log",
            Namespace::Settings => "settings",
            Namespace::System => "system",
            Namespace::FuelEconomy => "fuel_econ",
        }
    }
}

/// Errors from the persistence substrate.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Filesystem failure in a file-backed store.
    #[error("storage i/o failed: {0}")]
    Io(#[from] std::io::Error),
    /// Store file did not parse.
    #[error("storage serialization failed: {0}")]
    Serde(#[from] serde_json::Error),
}

/// A typed stored value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    F32(f32),
    U64(u64),
    U32(u32),
    U16(u16),
    U8(u8),
    Bool(bool),
    Bytes(Vec<u8>),
}

type Section = BTreeMap<String, Value>;

/// Read access inside a scoped namespace handle.
///
/// A key that is absent or holds a different type reads as `None`; callers
/// substitute their defaults.
pub trait NamespaceRead {
    fn get_f32(&self, key: &str) -> Option<f32>;
    fn get_u64(&self, key: &str) -> Option<u64>;
    fn get_u32(&self, key: &str) -> Option<u32>;
    fn get_u16(&self, key: &str) -> Option<u16>;
    fn get_u8(&self, key: &str) -> Option<u8>;
    fn get_bool(&self, key: &str) -> Option<bool>;
    fn get_blob(&self, key: &str) -> Option<&[u8]>;
}

/// Write access inside a scoped namespace handle.
pub trait NamespaceWrite: NamespaceRead {
    fn put_f32(&mut self, key: &str, value: f32);
    fn put_u64(&mut self, key: &str, value: u64);
    fn put_u32(&mut self, key: &str, value: u32);
    fn put_u16(&mut self, key: &str, value: u16);
    fn put_u8(&mut self, key: &str, value: u8);
    fn put_bool(&mut self, key: &str, value: bool);
    fn put_blob(&mut self, key: &str, value: &[u8]);
}

impl NamespaceRead for Section {
    fn get_f32(&self, key: &str) -> Option<f32> {
        match self.get(key)? {
            Value::F32(v) => Some(*v),
            _ => None,
        }
    }

    fn get_u64(&self, key: &str) -> Option<u64> {
        match self.get(key)? {
            Value::U64(v) => Some(*v),
            _ => None,
        }
    }

    fn get_u32(&self, key: &str) -> Option<u32> {
        match self.get(key)? {
            Value::U32(v) => Some(*v),
            _ => None,
        }
    }

    fn get_u16(&self, key: &str) -> Option<u16> {
        match self.get(key)? {
            Value::U16(v) => Some(*v),
            _ => None,
        }
    }

    fn get_u8(&self, key: &str) -> Option<u8> {
        match self.get(key)? {
            Value::U8(v) => Some(*v),
            _ => None,
        }
    }

    fn get_bool(&self, key: &str) -> Option<bool> {
        match self.get(key)? {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    fn get_blob(&self, key: &str) -> Option<&[u8]> {
        match self.get(key)? {
            Value::Bytes(v) => Some(v),
            _ => None,
        }
    }
}

fn insert(section: &mut Section, key: &str, value: Value) {
    debug_assert!(key.len() <= KEY_MAX_LEN, "key too long: {key}");
    section.insert(key.to_owned(), value);
}

impl NamespaceWrite for Section {
    fn put_f32(&mut self, key: &str, value: f32) {
        insert(self, key, Value::F32(value));
    }

    fn put_u64(&mut self, key: &str, value: u64) {
        insert(self, key, Value::U64(value));
    }

    fn put_u32(&mut self, key: &str, value: u32) {
        insert(self, key, Value::U32(value));
    }

    fn put_u16(&mut self, key: &str, value: u16) {
        insert(self, key, Value::U16(value));
    }

    fn put_u8(&mut self, key: &str, value: u8) {
        insert(self, key, Value::U8(value));
    }

    fn put_bool(&mut self, key: &str, value: bool) {
        insert(self, key, Value::Bool(value));
    }

    fn put_blob(&mut self, key: &str, value: &[u8]) {
        insert(self, key, Value::Bytes(value.to_vec()));
    }
}

/// The persistence substrate.
///
/// `read` and `write` scope a namespace handle to the closure; release is
/// guaranteed on every exit path because the handle cannot escape. A
/// `write` persists when the closure returns, so one call is one commit.
pub trait Backend {
    /// Read within a namespace.
    fn read<R>(
        &mut self,
        ns: Namespace,
        f: impl FnOnce(&dyn NamespaceRead) -> R,
    ) -> Result<R, StoreError>;

    /// Mutate within a namespace and commit.
    fn write<R>(
        &mut self,
        ns: Namespace,
        f: impl FnOnce(&mut dyn NamespaceWrite) -> R,
    ) -> Result<R, StoreError>;
}

/// Volatile backend for tests and simulation.
#[derive(Debug, Default, Clone)]
pub struct MemBackend {
    sections: BTreeMap<&'static str, Section>,
}

impl MemBackend {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Backend for MemBackend {
    fn read<R>(
        &mut self,
        ns: Namespace,
        f: impl FnOnce(&dyn NamespaceRead) -> R,
    ) -> Result<R, StoreError> {
        let section = self.sections.entry(ns.name()).or_default();
        Ok(f(&*section))
    }

    fn write<R>(
        &mut self,
        ns: Namespace,
        f: impl FnOnce(&mut dyn NamespaceWrite) -> R,
    ) -> Result<R, StoreError> {
        let section = self.sections.entry(ns.name()).or_default();
        Ok(f(section))
    }
}

/// File-backed store: one JSON document holding all namespaces.
///
/// Every committed `write` rewrites the file. That is crude next to real
/// NVS wear levelling, but the dirty-flag batching above keeps commit
/// frequency low, and round-trip identity within one build is all the
/// format promises.
#[derive(Debug)]
pub struct JsonFileBackend {
    path: PathBuf,
    sections: BTreeMap<String, Section>,
}

impl JsonFileBackend {
    /// Open or create the store file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let sections = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(err.into()),
        };
        Ok(Self { path, sections })
    }

    fn persist(&self) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(&self.sections)?;
        fs::write(&self.path, bytes)?;
        Ok(())
    }
}

impl Backend for JsonFileBackend {
    fn read<R>(
        &mut self,
        ns: Namespace,
        f: impl FnOnce(&dyn NamespaceRead) -> R,
    ) -> Result<R, StoreError> {
        let section = self.sections.entry(ns.name().to_owned()).or_default();
        Ok(f(&*section))
    }

    fn write<R>(
        &mut self,
        ns: Namespace,
        f: impl FnOnce(&mut dyn NamespaceWrite) -> R,
    ) -> Result<R, StoreError> {
        let section = self.sections.entry(ns.name().to_owned()).or_default();
        let result = f(section);
        self.persist()?;
        Ok(result)
    }
}
