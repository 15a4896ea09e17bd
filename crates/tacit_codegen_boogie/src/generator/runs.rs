//! Pre-pass over a method body that groups instruction sequences the
//! lowering treats as one unit. Classification happens before any text is
//! emitted, so fused sequences can also drop the locals they make dead.

use tacit_ir::{ConvertKind, InstructionKind, Value};

use crate::error::TranslateError;
use crate::generator::MethodTranslator;
use crate::naming;

/// One unit of lowering work. Multi-instruction variants carry the indices
/// of every instruction they consume.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Run {
    Single { index: usize },
    /// Array length load whose result only feeds a numeric conversion.
    ArrayLengthFused { load: usize, convert: usize },
    /// Metadata token load feeding a runtime array-initializer call.
    AtomicArrayInit { token: usize, call: usize },
    /// Method pointer load, delegate allocation, and the constructor call
    /// binding them together.
    DelegateCreate { load: usize, alloc: usize, ctor: usize },
    DelegateInvoke { index: usize },
}

impl MethodTranslator<'_, '_> {
    pub(crate) fn classify_runs(&mut self) -> Vec<Run> {
        let count = self.body.instructions.len();
        let mut runs = Vec::with_capacity(count);
        let mut index = 0;
        while index < count {
            if self.config.atomic_array_init {
                if let Some((run, token_var)) = self.match_atomic_init(index) {
                    self.removed_locals.insert(token_var);
                    runs.push(run);
                    index += 2;
                    continue;
                }
            }
            if let Some((run, pointer_var)) = self.match_delegate_creation(index) {
                self.removed_locals.insert(pointer_var);
                runs.push(run);
                index += 3;
                continue;
            }
            if let Some((run, length_var)) = self.match_length_fusion(index) {
                self.removed_locals.insert(length_var);
                runs.push(run);
                index += 2;
                continue;
            }
            if self.is_delegate_invoke(index) {
                runs.push(Run::DelegateInvoke { index });
                index += 1;
                continue;
            }
            runs.push(Run::Single { index });
            index += 1;
        }
        runs
    }

    /// The token load and the runtime call may arrive in either order.
    fn match_atomic_init(&self, index: usize) -> Option<(Run, String)> {
        let first = &self.body.instructions[index];
        let second = self.body.instructions.get(index + 1)?;
        let (token, call) = match (&first.kind, &second.kind) {
            (InstructionKind::LoadToken { .. }, InstructionKind::Call { .. }) => {
                (index, index + 1)
            }
            (InstructionKind::Call { .. }, InstructionKind::LoadToken { .. }) => {
                (index + 1, index)
            }
            _ => return None,
        };
        let InstructionKind::LoadToken { result, .. } = &self.body.instructions[token].kind else {
            return None;
        };
        let token_var = result.as_var()?;
        let InstructionKind::Call { callee, args, .. } = &self.body.instructions[call].kind else {
            return None;
        };
        let def = self.program.method(*callee);
        if def.name != "InitializeArray"
            || self.program.type_name(def.containing_type)
                != "System.Runtime.CompilerServices.RuntimeHelpers"
        {
            return None;
        }
        let consumes_token = args
            .iter()
            .any(|arg| arg.as_var() == Some(token_var));
        consumes_token.then(|| {
            (
                Run::AtomicArrayInit { token, call },
                token_var.to_string(),
            )
        })
    }

    /// The pointer load and the allocation may arrive in either order; the
    /// constructor call consuming both always closes the run.
    fn match_delegate_creation(&self, index: usize) -> Option<(Run, String)> {
        let first = &self.body.instructions[index];
        let second = self.body.instructions.get(index + 1)?;
        let (load, alloc) = match (&first.kind, &second.kind) {
            (
                InstructionKind::Load {
                    operand: Value::MethodPtr { .. },
                    ..
                },
                InstructionKind::NewObject { .. },
            ) => (index, index + 1),
            (
                InstructionKind::NewObject { .. },
                InstructionKind::Load {
                    operand: Value::MethodPtr { .. },
                    ..
                },
            ) => (index + 1, index),
            _ => return None,
        };
        let InstructionKind::Load { result, .. } = &self.body.instructions[load].kind else {
            return None;
        };
        let pointer_var = result.as_var()?;
        let InstructionKind::NewObject { result, allocation } = &self.body.instructions[alloc].kind
        else {
            return None;
        };
        let delegate_var = result.as_var()?;
        let allocated = self.program.types.unspecialized(*allocation);
        if !self.program.type_def(allocated).is_delegate {
            return None;
        }

        let ctor = self.body.instructions.get(index + 2)?;
        let InstructionKind::Call { callee, args, .. } = &ctor.kind else {
            return None;
        };
        if !self.program.method(*callee).is_constructor
            || args.first().and_then(Value::as_var) != Some(delegate_var)
            || !args.iter().any(|arg| arg.as_var() == Some(pointer_var))
        {
            return None;
        }
        Some((
            Run::DelegateCreate {
                load,
                alloc,
                ctor: index + 2,
            },
            pointer_var.to_string(),
        ))
    }

    fn match_length_fusion(&self, index: usize) -> Option<(Run, String)> {
        let InstructionKind::Load {
            result,
            operand: Value::ArrayLength { .. },
        } = &self.body.instructions[index].kind
        else {
            return None;
        };
        let length_var = result.as_var()?;
        let next = self.body.instructions.get(index + 1)?;
        let InstructionKind::Convert {
            operand,
            conversion: ConvertKind::Narrow,
            ..
        } = &next.kind
        else {
            return None;
        };
        if operand.as_var() != Some(length_var) {
            return None;
        }
        Some((
            Run::ArrayLengthFused {
                load: index,
                convert: index + 1,
            },
            length_var.to_string(),
        ))
    }

    fn is_delegate_invoke(&self, index: usize) -> bool {
        let InstructionKind::Call { callee, .. } = &self.body.instructions[index].kind else {
            return false;
        };
        let def = self.program.method(*callee);
        let home = self.program.types.unspecialized(def.containing_type);
        def.name == "Invoke" && self.program.type_def(home).is_delegate
    }

    /// The initializer blob's total byte size rides on the token field type
    /// name after its final `=`; element count is that size over the element
    /// width.
    pub(crate) fn lower_atomic_init(
        &mut self,
        token: usize,
        call: usize,
    ) -> Result<(), TranslateError> {
        self.emit_instruction_prologue(token.min(call));
        self.emit_instruction_prologue(token.max(call));

        let InstructionKind::LoadToken { field_type, .. } = &self.body.instructions[token].kind
        else {
            return Err(self.err_unsupported_run(token.min(call)));
        };
        let token_name = self.program.type_name(*field_type).to_string();
        let total: u64 = token_name
            .rsplit('=')
            .next()
            .and_then(|tail| tail.parse().ok())
            .ok_or_else(|| TranslateError::MalformedToken {
                method: self.name.clone(),
                token: token_name.clone(),
            })?;

        let call_instr = &self.body.instructions[call];
        let offset = call_instr.offset;
        let InstructionKind::Call { args, .. } = &call_instr.kind else {
            return Err(self.err_unsupported_run(token.min(call)));
        };
        let Some(array) = args.first() else {
            return Err(self.err_unsupported(offset, "array initializer call without arguments"));
        };
        let element_size = self
            .array_element_type(array)
            .and_then(|element| self.program.types.primitive_kind(element))
            .and_then(|kind| kind.byte_size())
            .ok_or_else(|| TranslateError::MalformedToken {
                method: self.name.clone(),
                token: token_name,
            })?;
        let count = total / u64::from(element_size);

        let array_expr = self.operand(offset, array)?;
        self.builder
            .push_line(&format!("assume $ArrayLength({}) == {};", array_expr, count));
        self.builder
            .push_line(&format!("call $HavocArrayElementsNoNull({});", array_expr));
        Ok(())
    }

    fn array_element_type(&self, array: &Value) -> Option<tacit_ir::TypeId> {
        let ty = naming::value_source_type(self.program, array)?;
        match self.program.types.def(ty).kind {
            tacit_ir::TypeKind::Array { element, .. } => Some(element),
            _ => None,
        }
    }
}
