use crate::bytecode::{
    ArithOp, Condition, Constant, Instruction, LogicOp, MethodRef, NumericType,
};

use super::{
    Category, InstructionContext, InstructionReplacement, MutationOperator, SequenceReplacement,
};

/// Which operator family is substituted, and the operator that replaces
/// every other member of that family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubstitutionKind {
    /// `+ - * / %` on one numeric type.
    Arithmetic(ArithOp, NumericType),
    /// `& | ^` on int and long.
    Bitwise(LogicOp),
    /// Branch conditions of `if<cond>` and `if_icmp<cond>`.
    Relational(Condition),
    /// Operator names loaded with `ldc` for Groovy's dynamic arithmetic
    /// dispatch (`"plus"`, `"minus"`, ...).
    DynamicArithmetic(ArithOp),
    /// `compare*` helpers of Groovy's `ScriptBytecodeAdapter`.
    DynamicRelational(Condition),
}

/// Runtime class whose static helpers implement Groovy comparisons.
pub const GROOVY_ADAPTER: &str = "org/codehaus/groovy/runtime/ScriptBytecodeAdapter";

fn dynamic_operator(op: ArithOp) -> &'static str {
    match op {
        ArithOp::Add => "plus",
        ArithOp::Sub => "minus",
        ArithOp::Mul => "multiply",
        ArithOp::Div => "div",
        ArithOp::Rem => "mod",
    }
}

fn dynamic_comparison(condition: Condition) -> &'static str {
    match condition {
        Condition::Eq => "compareEqual",
        Condition::Ne => "compareNotEqual",
        Condition::Lt => "compareLessThan",
        Condition::Ge => "compareGreaterThanEqual",
        Condition::Gt => "compareGreaterThan",
        Condition::Le => "compareLessThanEqual",
    }
}

fn parse_dynamic_operator(name: &str) -> Option<ArithOp> {
    ArithOp::ALL
        .into_iter()
        .find(|op| dynamic_operator(*op) == name)
}

fn parse_dynamic_comparison(call: &MethodRef) -> Option<Condition> {
    if call.owner != GROOVY_ADAPTER {
        return None;
    }
    Condition::ALL
        .into_iter()
        .find(|condition| dynamic_comparison(*condition) == call.name)
}

impl SubstitutionKind {
    pub fn name(self) -> String {
        match self {
            SubstitutionKind::Arithmetic(op, t) => format!("aor_{}{}", t.prefix(), op.mnemonic()),
            SubstitutionKind::Bitwise(op) => format!("obbn_{}", op.mnemonic()),
            SubstitutionKind::Relational(c) => format!("ror_if{}", c.mnemonic()),
            SubstitutionKind::DynamicArithmetic(op) => format!("groovy_{}", op.mnemonic()),
            SubstitutionKind::DynamicRelational(c) => format!("groovy_cmp{}", c.mnemonic()),
        }
    }

    /// Look up `instruction` in the substitution table of this kind.
    pub fn substitute(self, instruction: &Instruction) -> Option<Instruction> {
        use Instruction::*;

        match (self, instruction) {
            (SubstitutionKind::Arithmetic(target, t), Arith(op, operand_type))
                if *operand_type == t && *op != target =>
            {
                Some(Arith(target, t))
            }
            (SubstitutionKind::Bitwise(target), Logic(op, operand_type)) if *op != target => {
                Some(Logic(target, *operand_type))
            }
            (SubstitutionKind::Relational(target), If(c, label)) if *c != target => {
                Some(If(target, *label))
            }
            (SubstitutionKind::Relational(target), IfICmp(c, label)) if *c != target => {
                Some(IfICmp(target, *label))
            }
            (SubstitutionKind::DynamicArithmetic(target), Ldc(Constant::String(name))) => {
                match parse_dynamic_operator(name) {
                    Some(op) if op != target => {
                        Some(Ldc(Constant::String(dynamic_operator(target).into())))
                    }
                    _ => None,
                }
            }
            (SubstitutionKind::DynamicRelational(target), Invoke(call)) => {
                match parse_dynamic_comparison(call) {
                    Some(condition) if condition != target => Some(Invoke(MethodRef {
                        name: dynamic_comparison(target).into(),
                        ..call.clone()
                    })),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    fn describe(self, original: &Instruction, replacement: &Instruction) -> String {
        match (self, original) {
            (SubstitutionKind::Arithmetic(target, t), Instruction::Arith(op, _)) => format!(
                "Replaced {} with {} ({}): {} -> {}",
                op.symbol(),
                target.symbol(),
                t.name(),
                original,
                replacement
            ),
            (SubstitutionKind::Bitwise(target), Instruction::Logic(op, _)) => format!(
                "Replaced {} with {}: {} -> {}",
                op.symbol(),
                target.symbol(),
                original,
                replacement
            ),
            (SubstitutionKind::DynamicArithmetic(target), _) => format!(
                "Replaced dynamic arithmetic operator with {}: {} -> {}",
                target.symbol(),
                original,
                replacement
            ),
            (SubstitutionKind::DynamicRelational(target), _) => format!(
                "Replaced dynamic comparison with {}",
                dynamic_comparison(target)
            ),
            _ => format!("Replaced branch {} with {}", original, replacement),
        }
    }
}

#[derive(Debug)]
pub struct OperatorSubstitution {
    kind: SubstitutionKind,
    name: String,
}

impl OperatorSubstitution {
    pub fn new(kind: SubstitutionKind) -> Self {
        Self {
            kind,
            name: kind.name(),
        }
    }
}

impl MutationOperator for OperatorSubstitution {
    fn name(&self) -> &str {
        &self.name
    }

    fn category(&self) -> Category {
        Category::OperatorSubstitution
    }

    fn candidate(
        &self,
        instruction: &Instruction,
        _: &InstructionContext,
    ) -> Option<Box<dyn InstructionReplacement>> {
        let replacement = self.kind.substitute(instruction)?;
        let description = self.kind.describe(instruction, &replacement);
        Some(SequenceReplacement::new(instruction, vec![replacement], description).boxed())
    }
}
