//! Mutation identifiers and the per-traversal site registry.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::classunit::MethodBody;
use crate::descriptor::MethodDescriptor;
use crate::error::{Error, Result};
use crate::operator::Category;

/// Identifies a method body within a set of class units.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MethodKey {
    pub owner: String,
    pub name: String,
    pub descriptor: String,
}

impl MethodKey {
    pub fn new(owner: &str, method: &MethodBody) -> Self {
        Self {
            owner: owner.into(),
            name: method.name.clone(),
            descriptor: method.descriptor.to_string(),
        }
    }

    pub fn descriptor(&self) -> Result<MethodDescriptor> {
        self.descriptor.parse()
    }
}

impl fmt::Display for MethodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}{}", self.owner, self.name, self.descriptor)
    }
}

/// Stable name of one mutation site.
///
/// Traversing the same method body with the same operators always yields
/// the same identifiers, whether or not a mutation is applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MutationIdentifier {
    pub method: MethodKey,
    pub operator: String,
    /// Index of the original instruction in the method body.
    pub instruction_index: usize,
}

impl MutationIdentifier {
    pub fn new<S: Into<String>>(method: MethodKey, operator: S, instruction_index: usize) -> Self {
        Self {
            method,
            operator: operator.into(),
            instruction_index,
        }
    }

    /// md5 hex digest of the identifier, usable as a short stable handle.
    pub fn fingerprint(&self) -> String {
        format!("{:x}", md5::compute(self.to_string()))
    }
}

impl fmt::Display for MutationIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}#{}@{}",
            self.method, self.operator, self.instruction_index
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: Option<String>,
    pub line: Option<u32>,
}

/// A registered candidate mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationSite {
    /// Registration order within the traversal of the method body.
    pub ordinal: usize,
    pub id: MutationIdentifier,
    pub category: Category,
    pub description: String,
    pub location: SourceLocation,
}

/// State shared by all rewriters during one traversal of a method body.
///
/// Every candidate is registered here, and at most one of them (the target)
/// is allowed to rewrite the code.
#[derive(Debug)]
pub struct MutationContext {
    method: MethodKey,
    source_file: Option<String>,
    target: Option<MutationIdentifier>,
    current_line: Option<u32>,
    registered: HashSet<MutationIdentifier>,
    sites: Vec<MutationSite>,
    applied: Option<MutationIdentifier>,
}

impl MutationContext {
    pub fn new(
        method: MethodKey,
        source_file: Option<String>,
        target: Option<MutationIdentifier>,
    ) -> Self {
        Self {
            method,
            source_file,
            target,
            current_line: None,
            registered: HashSet::new(),
            sites: Vec::new(),
            applied: None,
        }
    }

    pub fn method(&self) -> &MethodKey {
        &self.method
    }

    pub fn set_line(&mut self, line: Option<u32>) {
        self.current_line = line;
    }

    /// Record a candidate and return its identifier.
    pub fn register(
        &mut self,
        operator: &str,
        category: Category,
        instruction_index: usize,
        description: String,
    ) -> Result<MutationIdentifier> {
        let id = MutationIdentifier::new(self.method.clone(), operator, instruction_index);

        if !self.registered.insert(id.clone()) {
            log::error!("Mutation identifier {} registered twice", id);
            return Err(Error::IdentifierCollision(id.to_string()));
        }

        log::debug!("Registered {}: {}", id, description);
        self.sites.push(MutationSite {
            ordinal: self.sites.len(),
            id: id.clone(),
            category,
            description,
            location: SourceLocation {
                file: self.source_file.clone(),
                line: self.current_line,
            },
        });

        Ok(id)
    }

    /// Whether the candidate `id` is the one selected for this traversal.
    pub fn should_mutate(&self, id: &MutationIdentifier) -> bool {
        self.applied.is_none() && self.target.as_ref() == Some(id)
    }

    pub fn mark_applied(&mut self, id: &MutationIdentifier) {
        self.applied = Some(id.clone());
    }

    pub fn into_sites(self) -> Vec<MutationSite> {
        self.sites
    }
}
