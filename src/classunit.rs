use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::bytecode::Instruction;
use crate::descriptor::MethodDescriptor;
use crate::error::{Error, Result};

pub const CONSTRUCTOR: &str = "<init>";
pub const STATIC_INITIALIZER: &str = "<clinit>";

/// A single method with its code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodBody {
    pub name: String,
    pub descriptor: MethodDescriptor,
    #[serde(default)]
    pub is_static: bool,
    pub max_stack: u16,
    pub max_locals: u16,
    pub instructions: Vec<Instruction>,
}

impl MethodBody {
    pub fn is_constructor(&self) -> bool {
        self.name == CONSTRUCTOR
    }

    pub fn is_static_initializer(&self) -> bool {
        self.name == STATIC_INITIALIZER
    }

    /// `name(descriptor)`, e.g. `add(II)I`.
    pub fn signature(&self) -> String {
        format!("{}{}", self.name, self.descriptor)
    }
}

/// A class as handed over by the bytecode reader: its name, the source file
/// it was compiled from and all method bodies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassUnit {
    pub name: String,
    #[serde(default)]
    pub source_file: Option<String>,
    pub methods: Vec<MethodBody>,
}

impl ClassUnit {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<ClassUnit> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::FileNotFoundError(path.display().to_string()));
        }

        let s = std::fs::read_to_string(path)?;
        Self::parse_str(&s)
    }

    pub fn parse_str(s: &str) -> Result<ClassUnit> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn find_method(&self, name: &str, descriptor: &MethodDescriptor) -> Option<usize> {
        self.methods
            .iter()
            .position(|m| m.name == name && &m.descriptor == descriptor)
    }

    /// Copy of this unit with one method body swapped out.
    pub fn mutated_clone(&self, method_index: usize, body: MethodBody) -> ClassUnit {
        let mut unit = self.clone();
        unit.methods[method_index] = body;
        unit
    }
}
