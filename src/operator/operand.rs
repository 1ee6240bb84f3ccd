use crate::bytecode::{Instruction, NumericType};
use crate::error::{Error, Result};
use crate::stack::SymbolicStack;

use super::{
    Category, InstructionContext, InstructionReplacement, LocalAllocator, MutationOperator,
};

/// Which operand of a binary arithmetic instruction is thrown away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovedOperand {
    /// The operand pushed first (deeper in the stack).
    First,
    /// The operand pushed last (top of stack).
    Last,
}

impl RemovedOperand {
    fn name(self) -> &'static str {
        match self {
            RemovedOperand::First => "aod_first",
            RemovedOperand::Last => "aod_last",
        }
    }

    fn ordinal(self) -> &'static str {
        match self {
            RemovedOperand::First => "first",
            RemovedOperand::Last => "second",
        }
    }

    /// Stack shuffling that drops the operand, for operands of `width` slots.
    pub fn sequence(self, width: u16) -> Vec<Instruction> {
        match (self, width) {
            (RemovedOperand::Last, 1) => vec![Instruction::Pop],
            (RemovedOperand::Last, _) => vec![Instruction::Pop2],
            (RemovedOperand::First, 1) => vec![Instruction::Swap, Instruction::Pop],
            (RemovedOperand::First, _) => {
                vec![Instruction::Dup2X2, Instruction::Pop2, Instruction::Pop2]
            }
        }
    }
}

#[derive(Debug)]
pub struct OperandElimination {
    removed: RemovedOperand,
}

impl OperandElimination {
    pub fn new(removed: RemovedOperand) -> Self {
        Self { removed }
    }
}

impl MutationOperator for OperandElimination {
    fn name(&self) -> &str {
        self.removed.name()
    }

    fn category(&self) -> Category {
        Category::OperandElimination
    }

    fn candidate(
        &self,
        instruction: &Instruction,
        _: &InstructionContext,
    ) -> Option<Box<dyn InstructionReplacement>> {
        match instruction {
            Instruction::Arith(_, operand_type) => Some(Box::new(OperandDrop {
                original: instruction.clone(),
                operand_type: *operand_type,
                removed: self.removed,
            })),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct OperandDrop {
    original: Instruction,
    operand_type: NumericType,
    removed: RemovedOperand,
}

impl OperandDrop {
    /// Simulate the sequence on two symbolic operands and check that only
    /// the kept one survives.
    fn prove(&self, sequence: &[Instruction]) -> Result<()> {
        let width = self.operand_type.slot_width();
        let mut stack = SymbolicStack::new();
        let below = stack.push_value(1);
        let first = stack.push_value(width);
        let last = stack.push_value(width);

        stack.apply_all(sequence)?;

        let kept = match self.removed {
            RemovedOperand::First => last,
            RemovedOperand::Last => first,
        };
        if stack.values() != [below, kept] {
            return Err(Error::StackWidthMismatch {
                operator: self.removed.name().into(),
                expected: format!("{} operand kept", self.operand_type.name()),
                found: format!("{:?}", stack.values()),
            });
        }
        Ok(())
    }
}

impl InstructionReplacement for OperandDrop {
    fn original(&self) -> &Instruction {
        &self.original
    }

    fn description(&self) -> String {
        format!(
            "Removed {} operand of {} ({})",
            self.removed.ordinal(),
            self.original,
            self.operand_type.name()
        )
    }

    fn replacement(&self, _: &mut LocalAllocator) -> Result<Vec<Instruction>> {
        let sequence = self.removed.sequence(self.operand_type.slot_width());
        self.prove(&sequence)?;
        Ok(sequence)
    }
}
