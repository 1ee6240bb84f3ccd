use std::fmt;

use crate::bytecode::{Constant, Instruction};

use super::{
    Category, InstructionContext, InstructionReplacement, MutationOperator, SequenceReplacement,
};

/// A numeric literal pushed by a constant instruction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Literal {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
}

impl Literal {
    pub fn from_instruction(instruction: &Instruction) -> Option<Literal> {
        let literal = match instruction {
            Instruction::IConst(v) => Literal::Int(*v),
            Instruction::BiPush(v) => Literal::Int(i32::from(*v)),
            Instruction::SiPush(v) => Literal::Int(i32::from(*v)),
            Instruction::LConst(v) => Literal::Long(*v),
            Instruction::FConst(v) => Literal::Float(*v),
            Instruction::DConst(v) => Literal::Double(*v),
            Instruction::Ldc(Constant::Int(v)) => Literal::Int(*v),
            Instruction::Ldc(Constant::Long(v)) => Literal::Long(*v),
            Instruction::Ldc(Constant::Float(v)) => Literal::Float(*v),
            Instruction::Ldc(Constant::Double(v)) => Literal::Double(*v),
            _ => return None,
        };
        Some(literal)
    }

    /// The most compact instruction that pushes this literal.
    pub fn materialize(self) -> Instruction {
        match self {
            Literal::Int(v) if (-1..=5).contains(&v) => Instruction::IConst(v),
            Literal::Int(v) => {
                if let Ok(byte) = i8::try_from(v) {
                    Instruction::BiPush(byte)
                } else if let Ok(short) = i16::try_from(v) {
                    Instruction::SiPush(short)
                } else {
                    Instruction::Ldc(Constant::Int(v))
                }
            }
            Literal::Long(v) if v == 0 || v == 1 => Instruction::LConst(v),
            Literal::Long(v) => Instruction::Ldc(Constant::Long(v)),
            Literal::Float(v)
                if v.to_bits() == 0f32.to_bits() || v == 1.0 || v == 2.0 =>
            {
                Instruction::FConst(v)
            }
            Literal::Float(v) => Instruction::Ldc(Constant::Float(v)),
            Literal::Double(v) if v.to_bits() == 0f64.to_bits() || v == 1.0 => {
                Instruction::DConst(v)
            }
            Literal::Double(v) => Instruction::Ldc(Constant::Double(v)),
        }
    }

    /// Integer arithmetic wraps around.
    pub fn perturb(self, perturbation: Perturbation) -> Literal {
        use Perturbation::*;

        match self {
            Literal::Int(v) => Literal::Int(match perturbation {
                AddOne => v.wrapping_add(1),
                SubOne => v.wrapping_sub(1),
                Negate => v.wrapping_neg(),
                ReplaceOne => 1,
                ReplaceZero => 0,
            }),
            Literal::Long(v) => Literal::Long(match perturbation {
                AddOne => v.wrapping_add(1),
                SubOne => v.wrapping_sub(1),
                Negate => v.wrapping_neg(),
                ReplaceOne => 1,
                ReplaceZero => 0,
            }),
            Literal::Float(v) => Literal::Float(match perturbation {
                AddOne => v + 1.0,
                SubOne => v - 1.0,
                Negate => -v,
                ReplaceOne => 1.0,
                ReplaceZero => 0.0,
            }),
            Literal::Double(v) => Literal::Double(match perturbation {
                AddOne => v + 1.0,
                SubOne => v - 1.0,
                Negate => -v,
                ReplaceOne => 1.0,
                ReplaceZero => 0.0,
            }),
        }
    }

    /// Bit-exact equality, so that `-0.0` and `0.0` differ and `NaN`
    /// equals itself.
    pub fn same(self, other: Literal) -> bool {
        match (self, other) {
            (Literal::Int(a), Literal::Int(b)) => a == b,
            (Literal::Long(a), Literal::Long(b)) => a == b,
            (Literal::Float(a), Literal::Float(b)) => a.to_bits() == b.to_bits(),
            (Literal::Double(a), Literal::Double(b)) => a.to_bits() == b.to_bits(),
            _ => false,
        }
    }

    fn type_name(self) -> &'static str {
        match self {
            Literal::Int(_) => "int",
            Literal::Long(_) => "long",
            Literal::Float(_) => "float",
            Literal::Double(_) => "double",
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(v) => write!(f, "{v}"),
            Literal::Long(v) => write!(f, "{v}L"),
            Literal::Float(v) => write!(f, "{v:?}f"),
            Literal::Double(v) => write!(f, "{v:?}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Perturbation {
    AddOne,
    SubOne,
    Negate,
    ReplaceOne,
    ReplaceZero,
}

impl Perturbation {
    pub const ALL: [Perturbation; 5] = [
        Perturbation::AddOne,
        Perturbation::SubOne,
        Perturbation::Negate,
        Perturbation::ReplaceOne,
        Perturbation::ReplaceZero,
    ];

    fn name(self) -> &'static str {
        match self {
            Perturbation::AddOne => "crcr_add_one",
            Perturbation::SubOne => "crcr_sub_one",
            Perturbation::Negate => "crcr_negate",
            Perturbation::ReplaceOne => "crcr_replace_one",
            Perturbation::ReplaceZero => "crcr_replace_zero",
        }
    }
}

#[derive(Debug)]
pub struct ConstantPerturbation {
    perturbation: Perturbation,
}

impl ConstantPerturbation {
    pub fn new(perturbation: Perturbation) -> Self {
        Self { perturbation }
    }
}

impl MutationOperator for ConstantPerturbation {
    fn name(&self) -> &str {
        self.perturbation.name()
    }

    fn category(&self) -> Category {
        Category::ConstantPerturbation
    }

    fn candidate(
        &self,
        instruction: &Instruction,
        _: &InstructionContext,
    ) -> Option<Box<dyn InstructionReplacement>> {
        let literal = Literal::from_instruction(instruction)?;
        let perturbed = literal.perturb(self.perturbation);

        // Equivalent mutants are not worth a site.
        if perturbed.same(literal) {
            return None;
        }

        let description = format!(
            "Replaced constant {} with {} ({})",
            literal,
            perturbed,
            literal.type_name()
        );
        let sequence = vec![perturbed.materialize()];
        Some(SequenceReplacement::new(instruction, sequence, description).boxed())
    }
}
