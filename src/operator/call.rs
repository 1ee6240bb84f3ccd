//! Call substitution.
//!
//! A call is redirected to another method of the same owner found in the
//! signature catalog. When the parameter lists differ, the arguments already
//! on the stack are parked in fresh locals (right to left), dropped or
//! replaced by default values where the types do not line up, and reloaded
//! in the order expected by the new target.

use crate::bytecode::{Instruction, LocalType, MethodRef};
use crate::catalog::CallMode;
use crate::classunit::{CONSTRUCTOR, STATIC_INITIALIZER};
use crate::descriptor::ValueType;
use crate::error::{Error, Result};

use super::{
    Category, InstructionContext, InstructionReplacement, LocalAllocator, MutationOperator,
    SequenceReplacement,
};

#[derive(Debug)]
pub struct CallSubstitution {
    mode: CallMode,
}

impl CallSubstitution {
    pub fn new(mode: CallMode) -> Self {
        Self { mode }
    }
}

impl MutationOperator for CallSubstitution {
    fn name(&self) -> &str {
        match self.mode {
            CallMode::SameParameters => "call_replace_name",
            CallMode::SameName => "call_replace_parameters",
        }
    }

    fn category(&self) -> Category {
        Category::CallSubstitution
    }

    fn candidate(
        &self,
        instruction: &Instruction,
        context: &InstructionContext,
    ) -> Option<Box<dyn InstructionReplacement>> {
        let call = match instruction {
            Instruction::Invoke(call) => call,
            _ => return None,
        };

        if call.name == CONSTRUCTOR || call.name == STATIC_INITIALIZER || context.in_initializer()
        {
            return None;
        }

        let record = context.catalog?.first_compatible(call, self.mode)?;
        let target = MethodRef {
            kind: call.kind,
            owner: record.owner.clone(),
            name: record.name.clone(),
            descriptor: record.descriptor.clone(),
        };

        match self.mode {
            CallMode::SameParameters => {
                let description = format!(
                    "Replaced call to {}.{} with {}",
                    call.owner, call.name, target.name
                );
                Some(
                    SequenceReplacement::new(
                        instruction,
                        vec![Instruction::Invoke(target)],
                        description,
                    )
                    .boxed(),
                )
            }
            CallMode::SameName => Some(Box::new(RemarshalledCall {
                original: instruction.clone(),
                call: call.clone(),
                target,
            })),
        }
    }
}

#[derive(Debug)]
struct RemarshalledCall {
    original: Instruction,
    call: MethodRef,
    target: MethodRef,
}

fn local_type(value_type: &ValueType, target: &MethodRef) -> Result<LocalType> {
    value_type.local_type().ok_or_else(|| Error::DefaultForVoid {
        context: format!("parameter of {}.{}{}", target.owner, target.name, target.descriptor),
    })
}

fn pop(value_type: &ValueType) -> Instruction {
    if value_type.slot_width() == 2 {
        Instruction::Pop2
    } else {
        Instruction::Pop
    }
}

impl RemarshalledCall {
    fn default_value(&self, value_type: &ValueType) -> Result<Instruction> {
        value_type
            .default_value()
            .map_err(|_| Error::DefaultForVoid {
                context: format!(
                    "argument for {}.{}{}",
                    self.target.owner, self.target.name, self.target.descriptor
                ),
            })
    }
}

impl InstructionReplacement for RemarshalledCall {
    fn original(&self) -> &Instruction {
        &self.original
    }

    fn description(&self) -> String {
        format!(
            "Replaced call to {}.{}{} with {}{}",
            self.call.owner,
            self.call.name,
            self.call.descriptor,
            self.target.name,
            self.target.descriptor
        )
    }

    fn replacement(&self, locals: &mut LocalAllocator) -> Result<Vec<Instruction>> {
        let old_params = self.call.descriptor.params();
        let new_params = self.target.descriptor.params();

        let slots: Vec<u16> = new_params
            .iter()
            .map(|param| locals.allocate(param.slot_width()))
            .collect::<Result<_>>()?;

        let mut code = Vec::new();

        // Unwind the original arguments, top of stack first
        for (i, param) in old_params.iter().enumerate().rev() {
            match new_params.get(i) {
                None => code.push(pop(param)),
                Some(new_param) if new_param == param => {
                    code.push(Instruction::Store(local_type(param, &self.target)?, slots[i]));
                }
                Some(new_param) => {
                    code.push(pop(param));
                    code.push(self.default_value(new_param)?);
                    code.push(Instruction::Store(
                        local_type(new_param, &self.target)?,
                        slots[i],
                    ));
                }
            }
        }

        for (i, new_param) in new_params.iter().enumerate().skip(old_params.len()) {
            code.push(self.default_value(new_param)?);
            code.push(Instruction::Store(
                local_type(new_param, &self.target)?,
                slots[i],
            ));
        }

        for (param, slot) in new_params.iter().zip(&slots) {
            code.push(Instruction::Load(local_type(param, &self.target)?, *slot));
        }

        code.push(Instruction::Invoke(self.target.clone()));
        Ok(code)
    }
}
