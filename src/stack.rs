//! Operand stack accounting.
//!
//! All quantities are measured in slots: `long` and `double` values occupy
//! two slots, everything else one.

use crate::bytecode::{CompareOp, Constant, Instruction, NumericType};
use crate::descriptor::ValueType;
use crate::error::{Error, Result};

/// Number of slots an instruction pops and pushes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackEffect {
    pub pops: u16,
    pub pushes: u16,
}

impl StackEffect {
    const fn new(pops: u16, pushes: u16) -> Self {
        Self { pops, pushes }
    }
}

fn constant_width(constant: &Constant) -> u16 {
    ValueType::from(constant).slot_width()
}

impl Instruction {
    pub fn stack_effect(&self) -> StackEffect {
        use Instruction::*;

        match self {
            Nop | Label(_) | Line(_) | Goto(_) | Return | IInc(..) => StackEffect::new(0, 0),

            AConstNull | IConst(_) | FConst(_) | BiPush(_) | SiPush(_) => StackEffect::new(0, 1),
            LConst(_) | DConst(_) => StackEffect::new(0, 2),
            Ldc(constant) => StackEffect::new(0, constant_width(constant)),

            Load(t, _) => StackEffect::new(0, t.slot_width()),
            Store(t, _) => StackEffect::new(t.slot_width(), 0),

            Arith(_, t) => StackEffect::new(2 * t.slot_width(), t.slot_width()),
            Neg(t) => StackEffect::new(t.slot_width(), t.slot_width()),
            Logic(_, t) => {
                let width = NumericType::from(*t).slot_width();
                StackEffect::new(2 * width, width)
            }
            // The shift distance is always an int.
            Shift(_, t) => {
                let width = NumericType::from(*t).slot_width();
                StackEffect::new(width + 1, width)
            }
            Convert(from, to) => StackEffect::new(from.slot_width(), to.slot_width()),
            Compare(CompareOp::LCmp | CompareOp::DCmpL | CompareOp::DCmpG) => {
                StackEffect::new(4, 1)
            }
            Compare(CompareOp::FCmpL | CompareOp::FCmpG) => StackEffect::new(2, 1),

            If(..) | IfNull(_) | IfNonNull(_) => StackEffect::new(1, 0),
            IfICmp(..) | IfACmp(..) => StackEffect::new(2, 0),

            Pop => StackEffect::new(1, 0),
            Pop2 => StackEffect::new(2, 0),
            Dup => StackEffect::new(1, 2),
            DupX1 => StackEffect::new(2, 3),
            DupX2 => StackEffect::new(3, 4),
            Dup2 => StackEffect::new(2, 4),
            Dup2X1 => StackEffect::new(3, 5),
            Dup2X2 => StackEffect::new(4, 6),
            Swap => StackEffect::new(2, 2),

            Invoke(method) => {
                let receiver = u16::from(method.kind.has_receiver());
                StackEffect::new(
                    method.descriptor.argument_slots() + receiver,
                    method.descriptor.return_type().slot_width(),
                )
            }
            GetField(field) => StackEffect::new(1, field.descriptor.slot_width()),
            PutField(field) => StackEffect::new(1 + field.descriptor.slot_width(), 0),
            GetStatic(field) => StackEffect::new(0, field.descriptor.slot_width()),
            PutStatic(field) => StackEffect::new(field.descriptor.slot_width(), 0),

            New(_) => StackEffect::new(0, 1),
            CheckCast(_) | InstanceOf(_) | ArrayLength => StackEffect::new(1, 1),
            AThrow => StackEffect::new(1, 0),
            ValueReturn(t) => StackEffect::new(t.slot_width(), 0),
        }
    }
}

/// Combined stack behaviour of a straight-line instruction sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SequenceEffect {
    /// Slots that must already be on the stack before the sequence runs.
    pub required: u16,
    /// Change in stack depth after the whole sequence.
    pub net: i32,
    /// Highest depth reached, relative to the starting depth.
    pub peak: i32,
}

impl SequenceEffect {
    pub fn of(instructions: &[Instruction]) -> Self {
        let mut depth: i32 = 0;
        let mut lowest: i32 = 0;
        let mut peak: i32 = 0;

        for instruction in instructions {
            let effect = instruction.stack_effect();
            depth -= i32::from(effect.pops);
            lowest = lowest.min(depth);
            depth += i32::from(effect.pushes);
            peak = peak.max(depth);
        }

        Self {
            required: (-lowest) as u16,
            net: depth,
            peak,
        }
    }
}

/// Check that `replacement` can stand in for `original` without changing
/// the stack depth seen by the surrounding code.
pub fn verify_replacement(
    operator: &str,
    original: &[Instruction],
    replacement: &[Instruction],
) -> Result<SequenceEffect> {
    let before = SequenceEffect::of(original);
    let after = SequenceEffect::of(replacement);

    if before.net != after.net || after.required > before.required {
        return Err(Error::StackWidthMismatch {
            operator: operator.into(),
            expected: format!("net {} requiring {}", before.net, before.required),
            found: format!("net {} requiring {}", after.net, after.required),
        });
    }

    Ok(after)
}

/// Extra stack slots needed by `replacement` over `original`.
pub fn additional_stack(original: &[Instruction], replacement: &[Instruction]) -> u16 {
    let before = SequenceEffect::of(original);
    let after = SequenceEffect::of(replacement);
    (after.peak - before.peak).max(0) as u16
}

/// One slot of a symbolic stack value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Slot {
    value: u32,
    width: u16,
}

/// Symbolic operand stack that tracks which value occupies each slot.
///
/// Stack manipulation instructions move slots around following the JVM
/// category rules; any other instruction consumes its operands and pushes
/// fresh values.
#[derive(Debug, Clone, Default)]
pub struct SymbolicStack {
    slots: Vec<Slot>,
    next_value: u32,
}

impl SymbolicStack {
    pub fn new() -> Self {
        Default::default()
    }

    /// Push a new value of the given width and return its identity.
    pub fn push_value(&mut self, width: u16) -> u32 {
        let value = self.next_value;
        self.next_value += 1;
        for _ in 0..width {
            self.slots.push(Slot { value, width });
        }
        value
    }

    /// The values currently on the stack, bottom first.
    pub fn values(&self) -> Vec<u32> {
        let mut values: Vec<u32> = Vec::new();
        let mut i = 0;
        while i < self.slots.len() {
            values.push(self.slots[i].value);
            i += self.slots[i].width.max(1) as usize;
        }
        values
    }

    pub fn depth(&self) -> usize {
        self.slots.len()
    }

    fn take(&mut self, n: usize, instruction: &Instruction) -> Result<Vec<Slot>> {
        if self.slots.len() < n {
            return Err(Error::StackUnderflow(instruction.to_string()));
        }
        Ok(self.slots.split_off(self.slots.len() - n))
    }

    /// Checks that `slots` holds whole values only, and that every value is
    /// one slot wide when `narrow` is set.
    fn check_boundaries(slots: &[Slot], narrow: bool, instruction: &Instruction) -> Result<()> {
        let mut i = 0;
        while i < slots.len() {
            let width = slots[i].width as usize;
            let whole = i + width <= slots.len()
                && slots[i..i + width].iter().all(|s| s.value == slots[i].value);
            if !whole || (narrow && width != 1) {
                return Err(Error::StackWidthMismatch {
                    operator: instruction.to_string(),
                    expected: if narrow {
                        "one-slot values".into()
                    } else {
                        "whole values".into()
                    },
                    found: format!("value of width {width} split"),
                });
            }
            i += width;
        }
        Ok(())
    }

    pub fn apply(&mut self, instruction: &Instruction) -> Result<()> {
        use Instruction::*;

        // Operands are listed top of stack last, i.e. [v2, v1] has v1 on top.
        let (taken, narrow, order): (usize, bool, &[usize]) = match instruction {
            Pop => (1, true, &[]),
            Pop2 => (2, false, &[]),
            Dup => (1, true, &[0, 0]),
            DupX1 => (2, true, &[1, 0, 1]),
            DupX2 => (3, false, &[2, 0, 1, 2]),
            Dup2 => (2, false, &[0, 1, 0, 1]),
            Dup2X1 => (3, false, &[1, 2, 0, 1, 2]),
            Dup2X2 => (4, false, &[2, 3, 0, 1, 2, 3]),
            Swap => (2, true, &[1, 0]),
            other => {
                let effect = other.stack_effect();
                self.take(effect.pops as usize, other)?;
                if effect.pushes > 0 {
                    self.push_value(effect.pushes);
                }
                return Ok(());
            }
        };

        let slots = self.take(taken, instruction)?;
        Self::check_boundaries(&slots, narrow, instruction)?;

        // dup_x2 and dup2_x1 need their top (resp. bottom) part to be
        // single-slot values.
        match instruction {
            DupX2 if slots[2].width != 1 => {
                Self::check_boundaries(&slots[2..], true, instruction)?
            }
            Dup2X1 if slots[0].width != 1 => {
                Self::check_boundaries(&slots[..1], true, instruction)?
            }
            _ => {}
        }

        self.slots.extend(order.iter().map(|&i| slots[i]));
        Ok(())
    }

    pub fn apply_all(&mut self, instructions: &[Instruction]) -> Result<()> {
        for instruction in instructions {
            self.apply(instruction)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::{ArithOp, InvokeKind, MethodRef};
    use pretty_assertions::assert_eq;

    #[test]
    fn invoke_effect_counts_receiver_and_widths() {
        let call = Instruction::Invoke(MethodRef {
            kind: InvokeKind::Virtual,
            owner: "Foo".into(),
            name: "bar".into(),
            descriptor: "(IJ)D".parse().unwrap(),
        });
        assert_eq!(call.stack_effect(), StackEffect::new(4, 2));
    }

    #[test]
    fn sequence_effect() {
        let effect = SequenceEffect::of(&[
            Instruction::Dup2X2,
            Instruction::Pop2,
            Instruction::Pop2,
        ]);
        assert_eq!(
            effect,
            SequenceEffect {
                required: 4,
                net: -2,
                peak: 2
            }
        );
    }

    #[test]
    fn verify_replacement_accepts_equivalent_effect() {
        let original = [Instruction::Arith(ArithOp::Add, NumericType::Int)];
        assert!(verify_replacement("test", &original, &[Instruction::Pop]).is_ok());
        assert!(
            verify_replacement("test", &original, &[Instruction::Swap, Instruction::Pop]).is_ok()
        );
    }

    #[test]
    fn verify_replacement_rejects_width_mismatch() {
        let original = [Instruction::Arith(ArithOp::Add, NumericType::Long)];
        let err = verify_replacement("test", &original, &[Instruction::Pop]).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn verify_replacement_rejects_deeper_access() {
        let original = [Instruction::Pop];
        let err = verify_replacement("test", &original, &[Instruction::Swap, Instruction::Pop])
            .unwrap_err();
        assert!(matches!(err, Error::StackWidthMismatch { .. }));
    }

    #[test]
    fn symbolic_swap_pop_keeps_second_operand() -> Result<()> {
        let mut stack = SymbolicStack::new();
        let _a = stack.push_value(1);
        let b = stack.push_value(1);
        stack.apply_all(&[Instruction::Swap, Instruction::Pop])?;
        assert_eq!(stack.values(), vec![b]);
        Ok(())
    }

    #[test]
    fn symbolic_dup2_x2_drops_first_wide_operand() -> Result<()> {
        let mut stack = SymbolicStack::new();
        let below = stack.push_value(1);
        let _a = stack.push_value(2);
        let b = stack.push_value(2);
        stack.apply_all(&[Instruction::Dup2X2, Instruction::Pop2, Instruction::Pop2])?;
        assert_eq!(stack.values(), vec![below, b]);
        assert_eq!(stack.depth(), 3);
        Ok(())
    }

    #[test]
    fn symbolic_swap_rejects_wide_values() {
        let mut stack = SymbolicStack::new();
        stack.push_value(2);
        assert!(stack.apply(&Instruction::Swap).is_err());
    }

    #[test]
    fn symbolic_pop_rejects_half_of_wide_value() {
        let mut stack = SymbolicStack::new();
        stack.push_value(2);
        assert!(stack.apply(&Instruction::Pop).is_err());
    }

    #[test]
    fn symbolic_underflow() {
        let mut stack = SymbolicStack::new();
        stack.push_value(1);
        let err = stack.apply(&Instruction::Pop2).unwrap_err();
        assert!(matches!(err, Error::StackUnderflow(_)));
    }

    #[test]
    fn symbolic_generic_instruction() -> Result<()> {
        let mut stack = SymbolicStack::new();
        let a = stack.push_value(1);
        stack.push_value(1);
        stack.push_value(1);
        stack.apply(&Instruction::Arith(ArithOp::Add, NumericType::Int))?;
        assert_eq!(stack.values().len(), 2);
        assert_eq!(stack.values()[0], a);
        Ok(())
    }
}
