//! Array lowering. Element storage is the global `$ArrayContents` nested
//! map holding union values, independent of the memory model; lengths live
//! behind the `$ArrayLength` function.

use tacit_ir::{InstructionKind, TypeId, Value};

use crate::error::TranslateError;
use crate::generator::MethodTranslator;
use crate::naming::{self, BoogieType};

impl MethodTranslator<'_, '_> {
    pub(crate) fn read_array_element(
        &mut self,
        offset: u32,
        array: &Value,
        indices: &[Value],
        element: TypeId,
    ) -> Result<String, TranslateError> {
        let index = self.single_index(offset, indices)?;
        let array_expr = self.operand(offset, array)?;
        self.null_guard(&array_expr);
        let index_expr = self.index_expression(offset, index)?;
        let raw = format!("$ArrayContents[{}][{}]", array_expr, index_expr);
        let element_ty = naming::boogie_type(self.program, element);
        Ok(self.coerced(&raw, BoogieType::Ref, element_ty))
    }

    pub(crate) fn write_array_element(
        &mut self,
        offset: u32,
        array: &Value,
        indices: &[Value],
        expr: &str,
        from: BoogieType,
    ) -> Result<(), TranslateError> {
        let index = self.single_index(offset, indices)?;
        let array_expr = self.operand(offset, array)?;
        self.null_guard(&array_expr);
        let index_expr = self.index_expression(offset, index)?;
        let boxed = self.coerced(expr, from, BoogieType::Ref);
        self.builder.push_line(&format!(
            "$ArrayContents[{}][{}] := {};",
            array_expr, index_expr, boxed
        ));
        Ok(())
    }

    fn single_index<'v>(
        &self,
        offset: u32,
        indices: &'v [Value],
    ) -> Result<&'v Value, TranslateError> {
        match indices {
            [index] => Ok(index),
            _ => Err(self.err_unsupported(offset, "multi-dimensional element access")),
        }
    }

    fn index_expression(&mut self, offset: u32, index: &Value) -> Result<String, TranslateError> {
        let expr = self.operand(offset, index)?;
        let ty = naming::value_boogie_type(self.program, index);
        Ok(self.coerced(&expr, ty, BoogieType::Int))
    }

    pub(crate) fn lower_new_array(
        &mut self,
        offset: u32,
        result: &Value,
        sizes: &[Value],
    ) -> Result<(), TranslateError> {
        let [size] = sizes else {
            return Err(self.err_unsupported(offset, "multi-dimensional array allocation"));
        };
        self.call_into(offset, result, BoogieType::Ref, "Alloc", "")?;
        let array_expr = self.operand(offset, result)?;
        let size_expr = self.operand(offset, size)?;
        let size_ty = naming::value_boogie_type(self.program, size);
        let size_expr = self.coerced(&size_expr, size_ty, BoogieType::Int);
        self.builder.push_line(&format!(
            "assume $ArrayLength({}) == {};",
            array_expr, size_expr
        ));
        Ok(())
    }

    /// A length load fused with its numeric conversion: the intermediate
    /// native-size variable disappears and the converted result reads the
    /// length directly.
    pub(crate) fn lower_length_fused(
        &mut self,
        load: usize,
        convert: usize,
    ) -> Result<(), TranslateError> {
        self.emit_instruction_prologue(load);
        self.emit_instruction_prologue(convert);
        let load_instr = &self.body.instructions[load];
        let offset = load_instr.offset;
        let InstructionKind::Load {
            operand: Value::ArrayLength { array },
            ..
        } = &load_instr.kind
        else {
            return Err(self.err_unsupported_run(load));
        };
        let convert_instr = &self.body.instructions[convert];
        let InstructionKind::Convert { result, .. } = &convert_instr.kind else {
            return Err(self.err_unsupported_run(load));
        };
        let array_expr = self.operand(offset, array)?;
        self.null_guard(&array_expr);
        let rendered = format!("$ArrayLength({})", array_expr);
        self.store_into(offset, result, &rendered, BoogieType::Int)
    }
}
