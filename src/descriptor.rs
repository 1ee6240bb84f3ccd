//! Value types and method descriptors in JVM notation.
//!
//! Descriptors look like `(IJLjava/lang/String;)V`: the parameter types in
//! parentheses, followed by the return type.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::bytecode::{Constant, Instruction, LocalType};
use crate::error::{Error, Result};

/// The type of a value on the operand stack, in a local or in a signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ValueType {
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
    Object(String),
    Array(Box<ValueType>),
    Void,
}

impl ValueType {
    /// Number of stack/local slots a value of this type occupies.
    pub fn slot_width(&self) -> u16 {
        match self {
            ValueType::Void => 0,
            ValueType::Long | ValueType::Double => 2,
            _ => 1,
        }
    }

    /// The kind of local variable instruction used to move this type.
    pub fn local_type(&self) -> Option<LocalType> {
        match self {
            ValueType::Boolean
            | ValueType::Byte
            | ValueType::Char
            | ValueType::Short
            | ValueType::Int => Some(LocalType::Int),
            ValueType::Long => Some(LocalType::Long),
            ValueType::Float => Some(LocalType::Float),
            ValueType::Double => Some(LocalType::Double),
            ValueType::Object(_) | ValueType::Array(_) => Some(LocalType::Reference),
            ValueType::Void => None,
        }
    }

    /// The instruction that pushes the default value of this type
    /// (`0`, `0L`, `0.0f`, `0.0d` or `null`).
    pub fn default_value(&self) -> Result<Instruction> {
        match self.local_type() {
            Some(LocalType::Int) => Ok(Instruction::IConst(0)),
            Some(LocalType::Long) => Ok(Instruction::LConst(0)),
            Some(LocalType::Float) => Ok(Instruction::FConst(0.0)),
            Some(LocalType::Double) => Ok(Instruction::DConst(0.0)),
            Some(LocalType::Reference) => Ok(Instruction::AConstNull),
            None => Err(Error::DefaultForVoid {
                context: "default value requested".into(),
            }),
        }
    }

    /// Human readable name, e.g. `int` or `java/lang/String[]`.
    pub fn name(&self) -> String {
        match self {
            ValueType::Boolean => "boolean".into(),
            ValueType::Byte => "byte".into(),
            ValueType::Char => "char".into(),
            ValueType::Short => "short".into(),
            ValueType::Int => "int".into(),
            ValueType::Long => "long".into(),
            ValueType::Float => "float".into(),
            ValueType::Double => "double".into(),
            ValueType::Object(class) => class.clone(),
            ValueType::Array(element) => format!("{}[]", element.name()),
            ValueType::Void => "void".into(),
        }
    }

    fn parse_at(s: &str, pos: &mut usize) -> Option<ValueType> {
        let c = *s.as_bytes().get(*pos)?;
        *pos += 1;

        let value_type = match c {
            b'Z' => ValueType::Boolean,
            b'B' => ValueType::Byte,
            b'C' => ValueType::Char,
            b'S' => ValueType::Short,
            b'I' => ValueType::Int,
            b'J' => ValueType::Long,
            b'F' => ValueType::Float,
            b'D' => ValueType::Double,
            b'V' => ValueType::Void,
            b'L' => {
                let end = *pos + s[*pos..].find(';')?;
                let class = &s[*pos..end];
                if class.is_empty() {
                    return None;
                }
                *pos = end + 1;
                ValueType::Object(class.to_owned())
            }
            b'[' => match Self::parse_at(s, pos)? {
                ValueType::Void => return None,
                element => ValueType::Array(Box::new(element)),
            },
            _ => return None,
        };

        Some(value_type)
    }
}

impl FromStr for ValueType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut pos = 0;
        match ValueType::parse_at(s, &mut pos) {
            Some(value_type) if pos == s.len() => Ok(value_type),
            _ => Err(Error::InvalidDescriptor(s.into())),
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Boolean => write!(f, "Z"),
            ValueType::Byte => write!(f, "B"),
            ValueType::Char => write!(f, "C"),
            ValueType::Short => write!(f, "S"),
            ValueType::Int => write!(f, "I"),
            ValueType::Long => write!(f, "J"),
            ValueType::Float => write!(f, "F"),
            ValueType::Double => write!(f, "D"),
            ValueType::Object(class) => write!(f, "L{class};"),
            ValueType::Array(element) => write!(f, "[{element}"),
            ValueType::Void => write!(f, "V"),
        }
    }
}

impl TryFrom<String> for ValueType {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<ValueType> for String {
    fn from(value_type: ValueType) -> Self {
        value_type.to_string()
    }
}

/// Parameter types and return type of a method.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MethodDescriptor {
    params: Vec<ValueType>,
    ret: ValueType,
}

impl MethodDescriptor {
    pub fn new(params: Vec<ValueType>, ret: ValueType) -> Self {
        Self { params, ret }
    }

    pub fn params(&self) -> &[ValueType] {
        &self.params
    }

    pub fn return_type(&self) -> &ValueType {
        &self.ret
    }

    /// Total number of slots occupied by the arguments.
    pub fn argument_slots(&self) -> u16 {
        self.params.iter().map(ValueType::slot_width).sum()
    }
}

impl FromStr for MethodDescriptor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidDescriptor(s.into());

        if !s.starts_with('(') {
            return Err(invalid());
        }

        let mut pos = 1;
        let mut params = Vec::new();
        loop {
            match s.as_bytes().get(pos) {
                Some(b')') => {
                    pos += 1;
                    break;
                }
                Some(_) => match ValueType::parse_at(s, &mut pos) {
                    Some(ValueType::Void) | None => return Err(invalid()),
                    Some(param) => params.push(param),
                },
                None => return Err(invalid()),
            }
        }

        let ret = ValueType::parse_at(s, &mut pos).ok_or_else(invalid)?;
        if pos != s.len() {
            return Err(invalid());
        }

        Ok(Self { params, ret })
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for param in &self.params {
            write!(f, "{param}")?;
        }
        write!(f, "){}", self.ret)
    }
}

impl TryFrom<String> for MethodDescriptor {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<MethodDescriptor> for String {
    fn from(descriptor: MethodDescriptor) -> Self {
        descriptor.to_string()
    }
}

/// Type of the value pushed by `ldc`.
impl From<&Constant> for ValueType {
    fn from(constant: &Constant) -> Self {
        match constant {
            Constant::Int(_) => ValueType::Int,
            Constant::Long(_) => ValueType::Long,
            Constant::Float(_) => ValueType::Float,
            Constant::Double(_) => ValueType::Double,
            Constant::String(_) => ValueType::Object("java/lang/String".into()),
            Constant::Class(_) => ValueType::Object("java/lang/Class".into()),
        }
    }
}
