//! Persisted catalog of method signatures, used to find replacement targets
//! for call substitution.
//!
//! The catalog is built once per generation by a single writer
//! ([`CatalogBuilder`]) and is read-only afterwards, so traversals running
//! on several threads can share it freely.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::bytecode::MethodRef;
use crate::classunit::{ClassUnit, CONSTRUCTOR, STATIC_INITIALIZER};
use crate::descriptor::MethodDescriptor;
use crate::error::Result;
use crate::policy::MutationPolicy;

/// How a call may be substituted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallMode {
    /// Same parameter list and return type, different name.
    SameParameters,
    /// Same name and return type, different parameter list.
    SameName,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SignatureRecord {
    pub owner: String,
    pub name: String,
    pub descriptor: MethodDescriptor,
    pub is_static: bool,
}

impl SignatureRecord {
    pub fn new<S: Into<String>>(
        owner: S,
        name: S,
        descriptor: MethodDescriptor,
        is_static: bool,
    ) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            descriptor,
            is_static,
        }
    }

    pub fn is_initializer(&self) -> bool {
        self.name == CONSTRUCTOR || self.name == STATIC_INITIALIZER
    }

    fn is_compatible(&self, call: &MethodRef, mode: CallMode) -> bool {
        if self.owner != call.owner
            || self.is_static == call.kind.has_receiver()
            || self.descriptor.return_type() != call.descriptor.return_type()
        {
            return false;
        }

        let same_name = self.name == call.name;
        let same_params = self.descriptor.params() == call.descriptor.params();

        match mode {
            CallMode::SameParameters => same_params && !same_name,
            CallMode::SameName => same_name && !same_params,
        }
    }
}

/// Collects the signatures of one build generation.
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    generation: u64,
    records: Vec<SignatureRecord>,
    seen: HashSet<SignatureRecord>,
}

impl CatalogBuilder {
    /// Start a fresh generation. Nothing from earlier generations is kept.
    pub fn new(generation: u64) -> Self {
        Self {
            generation,
            ..Default::default()
        }
    }

    /// Add a record; constructors, static initialisers and duplicates are
    /// ignored. Returns whether the record was added.
    pub fn add(&mut self, record: SignatureRecord) -> bool {
        if record.is_initializer() || self.seen.contains(&record) {
            return false;
        }
        self.seen.insert(record.clone());
        self.records.push(record);
        true
    }

    /// Add every method of `unit`, in declaration order.
    pub fn scan(&mut self, unit: &ClassUnit) -> usize {
        let mut added = 0;
        for method in &unit.methods {
            let record = SignatureRecord::new(
                unit.name.as_str(),
                method.name.as_str(),
                method.descriptor.clone(),
                method.is_static,
            );
            if self.add(record) {
                added += 1;
            }
        }
        log::debug!("Recorded {} signatures of {}", added, unit.name);
        added
    }

    /// Like `scan`, but only for classes accepted by `policy`.
    pub fn scan_filtered(&mut self, unit: &ClassUnit, policy: &MutationPolicy) -> usize {
        if policy.check_class(&unit.name) {
            self.scan(unit)
        } else {
            0
        }
    }

    pub fn build(self) -> SignatureCatalog {
        log::info!(
            "Signature catalog generation {} holds {} signatures",
            self.generation,
            self.records.len()
        );
        SignatureCatalog {
            generation: self.generation,
            records: self.records,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignatureCatalog {
    generation: u64,
    records: Vec<SignatureRecord>,
}

impl SignatureCatalog {
    pub fn empty() -> Self {
        Default::default()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records that could replace `call` under `mode`, in build order.
    pub fn find_compatible(&self, call: &MethodRef, mode: CallMode) -> Vec<&SignatureRecord> {
        self.records
            .iter()
            .filter(|record| record.is_compatible(call, mode))
            .collect()
    }

    pub fn first_compatible(&self, call: &MethodRef, mode: CallMode) -> Option<&SignatureRecord> {
        self.records
            .iter()
            .find(|record| record.is_compatible(call, mode))
    }

    /// Write the catalog, replacing whatever was stored at `path` before.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(self)?)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let s = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&s)?)
    }

    /// Load the catalog, falling back to an empty one if it is missing or
    /// unreadable.
    pub fn load_or_empty<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(catalog) => {
                log::debug!(
                    "Loaded signature catalog generation {} from {}",
                    catalog.generation,
                    path.display()
                );
                catalog
            }
            Err(e) => {
                log::warn!(
                    "Could not load signature catalog from {}, using an empty one: {}",
                    path.display(),
                    e
                );
                Self::empty()
            }
        }
    }
}
