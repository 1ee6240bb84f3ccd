pub mod call;
pub mod constant;
pub mod operand;
pub mod substitution;
pub mod unary;

use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use crate::bytecode::{ArithOp, Condition, Instruction, LogicOp, NumericType};
use crate::catalog::{CallMode, SignatureCatalog};
use crate::classunit::MethodBody;
use crate::error::{Error, Result};

use call::CallSubstitution;
use constant::{ConstantPerturbation, Perturbation};
use operand::{OperandElimination, RemovedOperand};
use substitution::{OperatorSubstitution, SubstitutionKind};
use unary::{UnaryStep, UnaryStepKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    OperatorSubstitution,
    OperandElimination,
    ConstantPerturbation,
    UnaryStep,
    NegationInsertion,
    CallSubstitution,
}

impl Category {
    pub fn tag(self) -> &'static str {
        match self {
            Category::OperatorSubstitution => "SUBST",
            Category::OperandElimination => "OPERAND",
            Category::ConstantPerturbation => "CONST",
            Category::UnaryStep => "UNARY",
            Category::NegationInsertion => "NEGATE",
            Category::CallSubstitution => "CALL",
        }
    }
}

/// What an operator may look at besides the instruction itself.
pub struct InstructionContext<'a> {
    pub owner: &'a str,
    pub method: &'a MethodBody,
    pub catalog: Option<&'a SignatureCatalog>,
}

impl<'a> InstructionContext<'a> {
    pub fn new(
        owner: &'a str,
        method: &'a MethodBody,
        catalog: Option<&'a SignatureCatalog>,
    ) -> Self {
        Self {
            owner,
            method,
            catalog,
        }
    }

    /// Inside a constructor or static initialiser.
    pub fn in_initializer(&self) -> bool {
        self.method.is_constructor() || self.method.is_static_initializer()
    }
}

/// Hands out local variable slots above those used by the method.
#[derive(Debug, Clone)]
pub struct LocalAllocator {
    next: u16,
}

impl LocalAllocator {
    pub fn new(first_free: u16) -> Self {
        Self { next: first_free }
    }

    /// Reserve `width` slots and return the index of the first one.
    pub fn allocate(&mut self, width: u16) -> Result<u16> {
        let index = self.next;
        self.next = self
            .next
            .checked_add(width)
            .ok_or(Error::FrameOverflow("max_locals"))?;
        Ok(index)
    }

    pub fn next_free(&self) -> u16 {
        self.next
    }
}

/// A concrete rewrite of one instruction, produced by an operator.
pub trait InstructionReplacement: Send + Sync + Debug {
    fn original(&self) -> &Instruction;

    fn description(&self) -> String;

    /// The instructions emitted in place of the original one.
    fn replacement(&self, locals: &mut LocalAllocator) -> Result<Vec<Instruction>>;
}

/// A replacement by a fixed instruction sequence.
#[derive(Debug, Clone)]
pub struct SequenceReplacement {
    original: Instruction,
    sequence: Vec<Instruction>,
    description: String,
}

impl SequenceReplacement {
    pub fn new(original: &Instruction, sequence: Vec<Instruction>, description: String) -> Self {
        Self {
            original: original.clone(),
            sequence,
            description,
        }
    }

    pub fn boxed(self) -> Box<dyn InstructionReplacement> {
        Box::new(self)
    }
}

impl InstructionReplacement for SequenceReplacement {
    fn original(&self) -> &Instruction {
        &self.original
    }

    fn description(&self) -> String {
        self.description.clone()
    }

    fn replacement(&self, _: &mut LocalAllocator) -> Result<Vec<Instruction>> {
        Ok(self.sequence.clone())
    }
}

pub trait MutationOperator: Send + Sync + Debug {
    fn name(&self) -> &str;

    fn category(&self) -> Category;

    /// The rewrite this operator offers for `instruction`, if any.
    fn candidate(
        &self,
        instruction: &Instruction,
        context: &InstructionContext,
    ) -> Option<Box<dyn InstructionReplacement>>;
}

/// Named sets of operators that can be enabled together.
const GROUPS: &[(&str, &str)] = &[
    ("all", ""),
    ("aor", "aor_"),
    ("aor_i", "aor_i"),
    ("aor_l", "aor_l"),
    ("aor_f", "aor_f"),
    ("aor_d", "aor_d"),
    ("obbn", "obbn_"),
    ("ror", "ror_"),
    ("groovy", "groovy_"),
    ("aod", "aod_"),
    ("crcr", "crcr_"),
    ("uoi", "uoi_"),
    ("abs", "abs_"),
    ("call", "call_"),
];

/// The enabled operators, in traversal order.
#[derive(Debug)]
pub struct OperatorRegistry {
    operators: Vec<Box<dyn MutationOperator>>,
}

macro_rules! register_operator {
    ($operator:expr, $v:ident) => {
        $v.push(Box::new($operator) as Box<dyn MutationOperator>)
    };
}

fn all_operators() -> Vec<Box<dyn MutationOperator>> {
    let mut operators = Vec::new();

    for numeric_type in NumericType::ALL {
        for op in ArithOp::ALL {
            register_operator!(
                OperatorSubstitution::new(SubstitutionKind::Arithmetic(op, numeric_type)),
                operators
            );
        }
    }
    for op in LogicOp::ALL {
        register_operator!(
            OperatorSubstitution::new(SubstitutionKind::Bitwise(op)),
            operators
        );
    }
    for condition in Condition::ALL {
        register_operator!(
            OperatorSubstitution::new(SubstitutionKind::Relational(condition)),
            operators
        );
    }
    for op in ArithOp::ALL {
        register_operator!(
            OperatorSubstitution::new(SubstitutionKind::DynamicArithmetic(op)),
            operators
        );
    }
    for condition in Condition::ALL {
        register_operator!(
            OperatorSubstitution::new(SubstitutionKind::DynamicRelational(condition)),
            operators
        );
    }

    register_operator!(OperandElimination::new(RemovedOperand::First), operators);
    register_operator!(OperandElimination::new(RemovedOperand::Last), operators);

    for perturbation in Perturbation::ALL {
        register_operator!(ConstantPerturbation::new(perturbation), operators);
    }

    for kind in UnaryStepKind::ALL {
        register_operator!(UnaryStep::new(kind), operators);
    }

    register_operator!(CallSubstitution::new(CallMode::SameParameters), operators);
    register_operator!(CallSubstitution::new(CallMode::SameName), operators);

    operators
}

impl OperatorRegistry {
    /// Build a registry from operator and group names.
    pub fn new<S: AsRef<str>>(enabled_ops: &[S]) -> Result<Self> {
        let all = all_operators();

        for name in enabled_ops {
            let name = name.as_ref();
            let known = all.iter().any(|op| op.name() == name)
                || GROUPS.iter().any(|(group, _)| *group == name);
            if !known {
                return Err(Error::UnknownOperator(name.into()));
            }
        }

        let operators: Vec<_> = all
            .into_iter()
            .filter(|op| {
                enabled_ops
                    .iter()
                    .any(|enabled| Self::selects(enabled.as_ref(), op.name()))
            })
            .collect();

        log::debug!("Enabled {} mutation operators", operators.len());
        Ok(Self { operators })
    }

    fn selects(enabled: &str, operator: &str) -> bool {
        if enabled == operator {
            return true;
        }
        GROUPS
            .iter()
            .any(|(group, prefix)| *group == enabled && operator.starts_with(prefix))
    }

    pub fn operators(&self) -> &[Box<dyn MutationOperator>] {
        &self.operators
    }

    pub fn names(&self) -> Vec<&str> {
        self.operators.iter().map(|op| op.name()).collect()
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.operators.iter().any(|op| op.name() == name)
    }

    pub fn all_operator_names() -> Vec<String> {
        all_operators()
            .iter()
            .map(|op| op.name().to_owned())
            .collect()
    }
}

impl Default for OperatorRegistry {
    fn default() -> Self {
        Self {
            operators: all_operators(),
        }
    }
}
