use crate::bytecode::{ArithOp, Instruction, LocalType, NumericType};

use super::{
    Category, InstructionContext, InstructionReplacement, MutationOperator, SequenceReplacement,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryStepKind {
    /// `iinc v, n` becomes `iinc v, -n`.
    Reverse,
    /// `iinc v, n` becomes `iinc v, n + 1`.
    AddIncrement,
    /// Increment a local right before it is loaded.
    PreIncrement,
    /// Decrement a local right before it is loaded.
    PreDecrement,
    /// Negate the local before it is incremented.
    AbsIInc,
    /// Negate a numeric value right after it is loaded.
    AbsLoad,
    /// Negate a numeric value right before it is stored.
    AbsStore,
}

impl UnaryStepKind {
    pub const ALL: [UnaryStepKind; 7] = [
        UnaryStepKind::Reverse,
        UnaryStepKind::AddIncrement,
        UnaryStepKind::PreIncrement,
        UnaryStepKind::PreDecrement,
        UnaryStepKind::AbsIInc,
        UnaryStepKind::AbsLoad,
        UnaryStepKind::AbsStore,
    ];

    fn name(self) -> &'static str {
        match self {
            UnaryStepKind::Reverse => "uoi_reverse",
            UnaryStepKind::AddIncrement => "uoi_add_increment",
            UnaryStepKind::PreIncrement => "uoi_pre_increment",
            UnaryStepKind::PreDecrement => "uoi_pre_decrement",
            UnaryStepKind::AbsIInc => "abs_iinc",
            UnaryStepKind::AbsLoad => "abs_load",
            UnaryStepKind::AbsStore => "abs_store",
        }
    }
}

/// Load/add/store sequence for locals without a dedicated increment form.
fn synthesized_step(t: NumericType, index: u16, op: ArithOp) -> Vec<Instruction> {
    let one = match t {
        NumericType::Int => Instruction::IConst(1),
        NumericType::Long => Instruction::LConst(1),
        NumericType::Float => Instruction::FConst(1.0),
        NumericType::Double => Instruction::DConst(1.0),
    };
    vec![
        Instruction::Load(t.into(), index),
        one,
        Instruction::Arith(op, t),
        Instruction::Store(t.into(), index),
        Instruction::Load(t.into(), index),
    ]
}

fn pre_step(t: LocalType, index: u16, delta: i16) -> Option<Vec<Instruction>> {
    match t.numeric()? {
        NumericType::Int => Some(vec![
            Instruction::IInc(index, delta),
            Instruction::Load(LocalType::Int, index),
        ]),
        other => {
            let op = if delta > 0 { ArithOp::Add } else { ArithOp::Sub };
            Some(synthesized_step(other, index, op))
        }
    }
}

#[derive(Debug)]
pub struct UnaryStep {
    kind: UnaryStepKind,
}

impl UnaryStep {
    pub fn new(kind: UnaryStepKind) -> Self {
        Self { kind }
    }

    fn rewrite(
        &self,
        instruction: &Instruction,
        context: &InstructionContext,
    ) -> Option<(Vec<Instruction>, String)> {
        use Instruction::*;

        match (self.kind, instruction) {
            (UnaryStepKind::Reverse, IInc(index, delta)) => {
                let reversed = delta.checked_neg().filter(|reversed| reversed != delta)?;
                Some((
                    vec![IInc(*index, reversed)],
                    format!("Reversed increment of local {index}: {delta} -> {reversed}"),
                ))
            }
            (UnaryStepKind::AddIncrement, IInc(index, delta)) => {
                let increased = delta.checked_add(1)?;
                Some((
                    vec![IInc(*index, increased)],
                    format!("Changed increment of local {index}: {delta} -> {increased}"),
                ))
            }
            (UnaryStepKind::PreIncrement, Load(t, index)) => Some((
                pre_step(*t, *index, 1)?,
                format!("Incremented local {index} before {instruction}"),
            )),
            (UnaryStepKind::PreDecrement, Load(t, index)) => Some((
                pre_step(*t, *index, -1)?,
                format!("Decremented local {index} before {instruction}"),
            )),
            (UnaryStepKind::AbsIInc, IInc(index, _)) => Some((
                vec![
                    Load(LocalType::Int, *index),
                    Neg(NumericType::Int),
                    Store(LocalType::Int, *index),
                    instruction.clone(),
                ],
                format!("Negated local {index} before {instruction}"),
            )),
            (UnaryStepKind::AbsLoad, Load(t, _)) if !context.method.is_constructor() => {
                let numeric = t.numeric()?;
                Some((
                    vec![instruction.clone(), Neg(numeric)],
                    format!("Negated value of {instruction}"),
                ))
            }
            (UnaryStepKind::AbsStore, Store(t, _)) => {
                let numeric = t.numeric()?;
                Some((
                    vec![Neg(numeric), instruction.clone()],
                    format!("Negated value before {instruction}"),
                ))
            }
            _ => None,
        }
    }
}

impl MutationOperator for UnaryStep {
    fn name(&self) -> &str {
        self.kind.name()
    }

    fn category(&self) -> Category {
        match self.kind {
            UnaryStepKind::AbsLoad | UnaryStepKind::AbsStore => Category::NegationInsertion,
            _ => Category::UnaryStep,
        }
    }

    fn candidate(
        &self,
        instruction: &Instruction,
        context: &InstructionContext,
    ) -> Option<Box<dyn InstructionReplacement>> {
        let (sequence, description) = self.rewrite(instruction, context)?;
        Some(SequenceReplacement::new(instruction, sequence, description).boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::Instruction::*;
    use crate::operator::testutil::{method, rewrite, rewrite_simple};
    use crate::stack::verify_replacement;
    use pretty_assertions::assert_eq;

    #[test]
    fn reverse_increment() {
        assert_eq!(rewrite_simple("uoi_reverse", &IInc(2, 1)), Some(vec![IInc(2, -1)]));
        assert_eq!(rewrite_simple("uoi_reverse", &IInc(2, -5)), Some(vec![IInc(2, 5)]));
    }

    #[test]
    fn reverse_skips_unrepresentable_and_zero() {
        assert_eq!(rewrite_simple("uoi_reverse", &IInc(2, i16::MIN)), None);
        assert_eq!(rewrite_simple("uoi_reverse", &IInc(2, 0)), None);
    }

    #[test]
    fn add_increment() {
        assert_eq!(
            rewrite_simple("uoi_add_increment", &IInc(1, 1)),
            Some(vec![IInc(1, 2)])
        );
        assert_eq!(rewrite_simple("uoi_add_increment", &IInc(1, i16::MAX)), None);
    }

    #[test]
    fn pre_increment_int_uses_iinc() {
        assert_eq!(
            rewrite_simple("uoi_pre_increment", &Load(LocalType::Int, 3)),
            Some(vec![IInc(3, 1), Load(LocalType::Int, 3)])
        );
        assert_eq!(
            rewrite_simple("uoi_pre_decrement", &Load(LocalType::Int, 3)),
            Some(vec![IInc(3, -1), Load(LocalType::Int, 3)])
        );
    }

    #[test]
    fn pre_increment_long_is_synthesized() {
        let original = Load(LocalType::Long, 4);
        let replaced = rewrite_simple("uoi_pre_increment", &original).unwrap();
        assert_eq!(
            replaced,
            vec![
                Load(LocalType::Long, 4),
                LConst(1),
                Arith(ArithOp::Add, NumericType::Long),
                Store(LocalType::Long, 4),
                Load(LocalType::Long, 4),
            ]
        );
        assert!(verify_replacement("test", &[original], &replaced).is_ok());
    }

    #[test]
    fn pre_decrement_double_is_synthesized() {
        let replaced = rewrite_simple("uoi_pre_decrement", &Load(LocalType::Double, 0)).unwrap();
        assert_eq!(replaced[1], DConst(1.0));
        assert_eq!(replaced[2], Arith(ArithOp::Sub, NumericType::Double));
    }

    #[test]
    fn reference_loads_are_ignored() {
        assert_eq!(rewrite_simple("uoi_pre_increment", &Load(LocalType::Reference, 0)), None);
        assert_eq!(rewrite_simple("abs_load", &Load(LocalType::Reference, 0)), None);
        assert_eq!(rewrite_simple("abs_store", &Store(LocalType::Reference, 0)), None);
    }

    #[test]
    fn abs_iinc_negates_before_increment() {
        assert_eq!(
            rewrite_simple("abs_iinc", &IInc(2, 1)),
            Some(vec![
                Load(LocalType::Int, 2),
                Neg(NumericType::Int),
                Store(LocalType::Int, 2),
                IInc(2, 1)
            ])
        );
    }

    #[test]
    fn abs_load_and_store() {
        assert_eq!(
            rewrite_simple("abs_load", &Load(LocalType::Float, 1)),
            Some(vec![Load(LocalType::Float, 1), Neg(NumericType::Float)])
        );
        assert_eq!(
            rewrite_simple("abs_store", &Store(LocalType::Long, 1)),
            Some(vec![Neg(NumericType::Long), Store(LocalType::Long, 1)])
        );
    }

    #[test]
    fn abs_load_skips_constructors() {
        let constructor = method("<init>", 2);
        assert!(rewrite("abs_load", &Load(LocalType::Int, 1), &constructor, None).is_none());
        assert!(rewrite("abs_store", &Store(LocalType::Int, 1), &constructor, None).is_some());
    }

    #[test]
    fn descriptions() {
        let (_, description) =
            rewrite("uoi_reverse", &IInc(2, 3), &method("test", 3), None).unwrap();
        assert_eq!(description, "Reversed increment of local 2: 3 -> -3");
    }
}
