//! Per-instruction lowering: operand rendering, location stores, and the
//! statement forms each three-address instruction maps onto.

use tacit_ir::{
    BinaryOp, BranchCondition, BranchOp, CallKind, Constant, ConvertKind, FieldRef,
    InstructionKind, MethodId, TypeId, UnaryOp, Value,
};

use crate::context::FieldDecl;
use crate::error::TranslateError;
use crate::generator::MethodTranslator;
use crate::naming::{self, BoogieType};

const CONTRACT_CLASS: &str = "System.Diagnostics.Contracts.Contract";

const STRING_EQUALITY: &str = "System.String.op_Equality$System.String$System.String";
const STRING_INEQUALITY: &str = "System.String.op_Inequality$System.String$System.String";
const STRING_CONCAT: &str = "System.String.Concat$System.String$System.String";

impl MethodTranslator<'_, '_> {
    pub(crate) fn lower_instruction(&mut self, index: usize) -> Result<(), TranslateError> {
        self.emit_instruction_prologue(index);
        let instr = &self.body.instructions[index];
        let offset = instr.offset;
        match &instr.kind {
            InstructionKind::Load { result, operand } => self.lower_load(offset, result, operand),
            InstructionKind::Store { target, operand } => {
                let expr = self.operand(offset, operand)?;
                let ty = naming::value_boogie_type(self.program, operand);
                self.store_into(offset, target, &expr, ty)
            }
            InstructionKind::Unary {
                result,
                op,
                operand,
            } => self.lower_unary(offset, result, *op, operand),
            InstructionKind::Binary {
                result,
                op,
                left,
                right,
            } => self.lower_binary(offset, result, *op, left, right),
            InstructionKind::Branch {
                condition,
                target,
                leaves_protected,
            } => self.lower_branch(offset, condition.as_ref(), target, *leaves_protected),
            InstructionKind::Switch { operand, targets } => {
                self.lower_switch(offset, operand, targets)
            }
            InstructionKind::Call {
                result,
                callee,
                kind,
                args,
            } => self.lower_call(offset, result.as_ref(), *callee, *kind, args),
            InstructionKind::NewObject { result, allocation } => {
                self.lower_new_object(offset, result, *allocation)
            }
            InstructionKind::NewArray { result, sizes, .. } => {
                self.lower_new_array(offset, result, sizes)
            }
            InstructionKind::InitObject { targets } => self.lower_init_object(offset, targets),
            InstructionKind::Convert {
                result,
                operand,
                conversion,
                target,
            } => self.lower_convert(offset, result, operand, *conversion, *target),
            InstructionKind::Throw { exception } => self.lower_throw(offset, exception.as_ref()),
            InstructionKind::TryStart | InstructionKind::FinallyStart => Ok(()),
            InstructionKind::CatchStart {
                binding,
                exception_type,
            } => self.lower_catch_start(offset, binding.as_ref(), *exception_type),
            InstructionKind::Nop { ends_finally } => {
                if *ends_finally {
                    self.lower_end_finally(offset)
                } else {
                    Ok(())
                }
            }
            InstructionKind::Return { operand } => self.lower_return(offset, operand.as_ref()),
            InstructionKind::LoadToken { result, .. } => self.havoc_into(offset, result),
        }
    }

    /// Renders a value in read position. Dereference guards and string
    /// interning happen here, so the returned expression is pure.
    pub(crate) fn operand(&mut self, offset: u32, value: &Value) -> Result<String, TranslateError> {
        match value {
            Value::Var { name, ty } => {
                let bt = naming::boogie_type(self.program, *ty);
                if self.direct_vars.contains(name) {
                    Ok(name.clone())
                } else if self.addr_params.contains(name) {
                    Ok(self.memory.read_deref(name, bt))
                } else {
                    Ok(self.memory.read_var(name, bt))
                }
            }
            Value::Const(constant) => self.constant_expression(constant),
            Value::InstanceField { object, field } => {
                let object_expr = self.operand(offset, object)?;
                self.null_guard(&object_expr);
                let ty = naming::boogie_type(self.program, field.ty);
                let name = self.declare_field(field, false);
                Ok(self.memory.read_instance_field(&name, &object_expr, ty))
            }
            Value::StaticField { field } => {
                let ty = naming::boogie_type(self.program, field.ty);
                let name = self.declare_field(field, true);
                Ok(self.memory.read_static_field(&name, ty))
            }
            Value::ArrayElement {
                array,
                indices,
                element,
            } => self.read_array_element(offset, array, indices, *element),
            Value::ArrayLength { array } => {
                let array_expr = self.operand(offset, array)?;
                self.null_guard(&array_expr);
                Ok(format!("$ArrayLength({})", array_expr))
            }
            Value::Deref { reference } => {
                let ty = naming::value_boogie_type(self.program, value);
                let address = self.operand(offset, reference)?;
                Ok(self.memory.read_deref(&address, ty))
            }
            Value::MethodPtr { .. } => {
                Err(self.err_unsupported(offset, "method pointer outside delegate creation"))
            }
        }
    }

    /// Writes an already-rendered expression into a location, coercing
    /// between primitive and union representations as the slot requires.
    pub(crate) fn store_into(
        &mut self,
        offset: u32,
        target: &Value,
        expr: &str,
        from: BoogieType,
    ) -> Result<(), TranslateError> {
        match target {
            Value::Var { name, ty } => {
                let to = naming::boogie_type(self.program, *ty);
                let value = self.coerced(expr, from, to);
                if self.direct_vars.contains(name) {
                    self.builder.push_line(&format!("{} := {};", name, value));
                } else if self.addr_params.contains(name) {
                    let line = self.memory.write_deref(name, to, &value);
                    self.builder.push_line(&line);
                } else {
                    let line = self.memory.write_var(name, to, &value);
                    self.builder.push_line(&line);
                }
                Ok(())
            }
            Value::InstanceField { object, field } => {
                let object_expr = self.operand(offset, object)?;
                self.null_guard(&object_expr);
                let to = naming::boogie_type(self.program, field.ty);
                let value = self.coerced(expr, from, to);
                let name = self.declare_field(field, false);
                let line = self
                    .memory
                    .write_instance_field(&name, &object_expr, to, &value);
                self.builder.push_line(&line);
                Ok(())
            }
            Value::StaticField { field } => {
                let to = naming::boogie_type(self.program, field.ty);
                let value = self.coerced(expr, from, to);
                let name = self.declare_field(field, true);
                let line = self.memory.write_static_field(&name, to, &value);
                self.builder.push_line(&line);
                Ok(())
            }
            Value::ArrayElement { array, indices, .. } => {
                self.write_array_element(offset, array, indices, expr, from)
            }
            Value::Deref { reference } => {
                let to = naming::value_boogie_type(self.program, target);
                let value = self.coerced(expr, from, to);
                let address = self.operand(offset, reference)?;
                let line = self.memory.write_deref(&address, to, &value);
                self.builder.push_line(&line);
                Ok(())
            }
            _ => Err(self.err_unsupported(offset, "assignment target is not a location")),
        }
    }

    /// Moves a value between Boogie types where the lattice allows it.
    /// Boxing into a union carries the inverse-projection assumption the
    /// verifier needs to recover the payload.
    pub(crate) fn coerced(&mut self, expr: &str, from: BoogieType, to: BoogieType) -> String {
        if from == to {
            return expr.to_string();
        }
        if to == BoogieType::Ref {
            if let (Some(wrap), Some(unwrap)) = (from.to_union(), from.from_union()) {
                let wrapped = format!("{}({})", wrap, expr);
                self.builder
                    .push_line(&format!("assume {}({}) == {};", unwrap, wrapped, expr));
                return wrapped;
            }
        }
        if from == BoogieType::Ref {
            if let Some(unwrap) = to.from_union() {
                return format!("{}({})", unwrap, expr);
            }
        }
        expr.to_string()
    }

    pub(crate) fn null_guard(&mut self, expr: &str) {
        if self.config.check_null_dereferences {
            self.builder
                .push_line(&format!("assert {{:nonnull}} {} != null;", expr));
        } else {
            self.builder.push_line(&format!("assume {} != null;", expr));
        }
    }

    fn constant_expression(&mut self, constant: &Constant) -> Result<String, TranslateError> {
        Ok(match constant {
            Constant::Int(value) => value.to_string(),
            Constant::Real(value) => real_literal(*value),
            Constant::Bool(value) => value.to_string(),
            Constant::Str(text) => self.ctx.strings.intern(text, &self.name)?,
            Constant::Null => "null".to_string(),
        })
    }

    fn declare_field(&mut self, field: &FieldRef, is_static: bool) -> String {
        let name = naming::field_name(self.program, field);
        let ty = naming::boogie_type(self.program, field.ty);
        self.ctx.declare_field(name.clone(), FieldDecl { ty, is_static });
        name
    }

    /// Havocs a location. Non-variable slots go through a scratch variable
    /// since `havoc` only takes identifiers.
    pub(crate) fn havoc_into(&mut self, offset: u32, target: &Value) -> Result<(), TranslateError> {
        let ty = naming::value_boogie_type(self.program, target);
        if let Some(name) = self.direct_out_name(target, ty) {
            self.builder.push_line(&format!("havoc {};", name));
            return Ok(());
        }
        let temp = self.fresh_var(ty);
        self.builder.push_line(&format!("havoc {};", temp));
        self.store_into(offset, target, &temp, ty)
    }

    /// The variable a `call` can assign directly, when the target is one the
    /// strategy addresses by name.
    pub(crate) fn direct_out_name(&self, target: &Value, expected: BoogieType) -> Option<String> {
        let Value::Var { name, ty } = target else {
            return None;
        };
        if naming::boogie_type(self.program, *ty) != expected {
            return None;
        }
        if self.direct_vars.contains(name) || self.memory.var_address(name).is_none() {
            Some(name.clone())
        } else {
            None
        }
    }

    pub(crate) fn call_into(
        &mut self,
        offset: u32,
        target: &Value,
        ret: BoogieType,
        procedure: &str,
        args: &str,
    ) -> Result<(), TranslateError> {
        if let Some(name) = self.direct_out_name(target, ret) {
            self.builder
                .push_line(&format!("call {} := {}({});", name, procedure, args));
            return Ok(());
        }
        let temp = self.fresh_var(ret);
        self.builder
            .push_line(&format!("call {} := {}({});", temp, procedure, args));
        self.store_into(offset, target, &temp, ret)
    }

    fn lower_load(
        &mut self,
        offset: u32,
        result: &Value,
        operand: &Value,
    ) -> Result<(), TranslateError> {
        if let Value::StaticField { field } = operand {
            // Compiler-generated delegate caches are cleared before the read
            // so the creation path below the cache test is always explored.
            if self.is_delegate_cache(field) {
                let name = self.declare_field(field, true);
                let line = self.memory.write_static_field(&name, BoogieType::Ref, "null");
                self.builder.push_line(&line);
            }
        }
        let expr = self.operand(offset, operand)?;
        let ty = naming::value_boogie_type(self.program, operand);
        self.store_into(offset, result, &expr, ty)
    }

    fn is_delegate_cache(&self, field: &FieldRef) -> bool {
        let declaring = self.program.types.unspecialized(field.declaring_type);
        let field_ty = self.program.types.unspecialized(field.ty);
        self.program.type_def(declaring).is_compiler_generated
            && self.program.type_def(field_ty).is_delegate
    }

    fn lower_unary(
        &mut self,
        offset: u32,
        result: &Value,
        op: UnaryOp,
        operand: &Value,
    ) -> Result<(), TranslateError> {
        let expr = self.operand(offset, operand)?;
        let ty = naming::value_boogie_type(self.program, operand);
        let rendered = match op {
            UnaryOp::Neg => format!("-{}", expr),
            UnaryOp::Not => format!("!{}", expr),
        };
        self.store_into(offset, result, &rendered, ty)
    }

    fn lower_binary(
        &mut self,
        offset: u32,
        result: &Value,
        op: BinaryOp,
        left: &Value,
        right: &Value,
    ) -> Result<(), TranslateError> {
        if naming::is_string_value(self.program, left) || naming::is_string_value(self.program, right)
        {
            return self.lower_string_binary(offset, result, op, left, right);
        }

        let left_ty = naming::value_boogie_type(self.program, left);
        let right_ty = naming::value_boogie_type(self.program, right);
        let operand_ty = if left_ty == right_ty || left_ty != BoogieType::Ref {
            left_ty
        } else {
            right_ty
        };

        match op {
            BinaryOp::And | BinaryOp::Or if operand_ty != BoogieType::Bool => {
                return self.havoc_into(offset, result);
            }
            BinaryOp::Xor if operand_ty != BoogieType::Bool => {
                return self.havoc_into(offset, result);
            }
            BinaryOp::Shl | BinaryOp::Shr => return self.havoc_into(offset, result),
            BinaryOp::Rem if operand_ty == BoogieType::Real => {
                return Err(self.err_unsupported(offset, "remainder on real operands"));
            }
            _ => {}
        }

        let left_expr = self.operand(offset, left)?;
        let left_expr = self.coerced(&left_expr, left_ty, operand_ty);
        let right_expr = self.operand(offset, right)?;
        let right_expr = self.coerced(&right_expr, right_ty, operand_ty);
        let (symbol, boolean) = binary_symbol(op, operand_ty);
        let rendered = format!("{} {} {}", left_expr, symbol, right_expr);
        let out_ty = if boolean { BoogieType::Bool } else { operand_ty };
        self.store_into(offset, result, &rendered, out_ty)
    }

    /// String operators route through the prelude's helper procedures; any
    /// operator outside the supported trio degrades to havoc.
    fn lower_string_binary(
        &mut self,
        offset: u32,
        result: &Value,
        op: BinaryOp,
        left: &Value,
        right: &Value,
    ) -> Result<(), TranslateError> {
        let (procedure, ret) = match op {
            BinaryOp::Add => (STRING_CONCAT, BoogieType::Ref),
            BinaryOp::Eq => (STRING_EQUALITY, BoogieType::Bool),
            BinaryOp::Ne => (STRING_INEQUALITY, BoogieType::Bool),
            _ => return self.havoc_into(offset, result),
        };
        let left_expr = self.operand(offset, left)?;
        let right_expr = self.operand(offset, right)?;
        let args = format!("{}, {}", left_expr, right_expr);
        self.call_into(offset, result, ret, procedure, &args)
    }

    fn lower_branch(
        &mut self,
        offset: u32,
        condition: Option<&BranchCondition>,
        target: &str,
        leaves_protected: bool,
    ) -> Result<(), TranslateError> {
        let destination = if leaves_protected && self.config.exceptions {
            self.leave_destination(offset)?
                .unwrap_or_else(|| target.to_string())
        } else {
            target.to_string()
        };
        match condition {
            None => self.builder.push_line(&format!("goto {};", destination)),
            Some(condition) => {
                let rendered = self.compare_expression(offset, condition)?;
                self.builder.open_block(&format!("if ({})", rendered));
                self.builder.push_line(&format!("goto {};", destination));
                self.builder.close_block();
            }
        }
        Ok(())
    }

    fn compare_expression(
        &mut self,
        offset: u32,
        condition: &BranchCondition,
    ) -> Result<String, TranslateError> {
        let left_ty = naming::value_boogie_type(self.program, &condition.left);
        let right_ty = naming::value_boogie_type(self.program, &condition.right);
        let operand_ty = if left_ty == right_ty || left_ty != BoogieType::Ref {
            left_ty
        } else {
            right_ty
        };
        let left = self.operand(offset, &condition.left)?;
        let left = self.coerced(&left, left_ty, operand_ty);
        let right = self.operand(offset, &condition.right)?;
        let right = self.coerced(&right, right_ty, operand_ty);
        Ok(format!("{} {} {}", left, branch_symbol(condition.op), right))
    }

    fn lower_switch(
        &mut self,
        offset: u32,
        operand: &Value,
        targets: &[String],
    ) -> Result<(), TranslateError> {
        let expr = self.operand(offset, operand)?;
        let ty = naming::value_boogie_type(self.program, operand);
        let scrutinee = self.coerced(&expr, ty, BoogieType::Int);
        // Out-of-range scrutinees fall through to the next instruction.
        self.builder.open_block(&format!(
            "if ({} >= 0 && {} < {})",
            scrutinee,
            scrutinee,
            targets.len()
        ));
        for (case, target) in targets.iter().enumerate() {
            self.builder
                .open_block(&format!("if ({} == {})", scrutinee, case));
            self.builder.push_line(&format!("goto {};", target));
            self.builder.close_block();
        }
        self.builder.close_block();
        Ok(())
    }

    pub(crate) fn lower_call(
        &mut self,
        offset: u32,
        result: Option<&Value>,
        callee: MethodId,
        kind: CallKind,
        args: &[Value],
    ) -> Result<(), TranslateError> {
        let declared = self.program.method(callee);
        if self.program.type_name(declared.containing_type) == CONTRACT_CLASS {
            match declared.name.as_str() {
                "Assert" | "Assume" => return self.lower_contract(offset, callee, args),
                _ => {}
            }
        }

        let receiver_source = if declared.is_static {
            None
        } else {
            args.first()
                .and_then(|arg| naming::value_source_type(self.program, arg))
        };
        let candidates = self
            .resolver
            .resolve(self.hierarchy, callee, receiver_source, kind);
        for &candidate in &candidates {
            let home = self.program.method(candidate).containing_type;
            self.ctx
                .mention_class(self.program.types.unspecialized(home));
        }

        let template = self
            .program
            .method(self.program.unspecialized_method(callee));
        let expected = template.parameters.len() + usize::from(!template.is_static);
        if args.len() != expected {
            return Err(self.err_unsupported(offset, "argument count does not match the callee"));
        }

        let mut rendered = Vec::with_capacity(args.len());
        let mut out_targets = Vec::new();
        let (receiver_expr, value_args) = if template.is_static {
            (None, args)
        } else {
            let Some((receiver, rest)) = args.split_first() else {
                return Err(self.err_unsupported(offset, "instance call without a receiver"));
            };
            let expr = self.operand(offset, receiver)?;
            self.null_guard(&expr);
            rendered.push(expr.clone());
            (Some(expr), rest)
        };
        for (param, arg) in template.parameters.iter().zip(value_args) {
            if param.by_ref {
                let Some(var) = arg.as_var() else {
                    return Err(self.err_unsupported(offset, "by-ref argument is not a variable"));
                };
                if self.addr_params.contains(var) {
                    rendered.push(var.to_string());
                } else if let Some(address) = self.memory.var_address(var) {
                    rendered.push(address);
                } else {
                    let ty = naming::value_boogie_type(self.program, arg);
                    rendered.push(self.memory.read_var(var, ty));
                    out_targets.push(var.to_string());
                }
                continue;
            }
            let expr = self.operand(offset, arg)?;
            let from = naming::value_boogie_type(self.program, arg);
            let to = naming::boogie_type(self.program, param.ty);
            rendered.push(self.coerced(&expr, from, to));
        }

        let ret_ty = naming::boogie_type(self.program, template.return_type);
        let mut outs = out_targets;
        let mut result_slot = None;
        let mut deferred_store: Option<(String, &Value)> = None;
        match (result, ret_ty) {
            (_, BoogieType::Void) => {}
            (None, _) => outs.push(self.fresh_var(ret_ty)),
            (Some(target), _) => {
                if let Some(name) = self.direct_out_name(target, ret_ty) {
                    result_slot = Some(name.clone());
                    outs.push(name);
                } else {
                    let temp = self.fresh_var(ret_ty);
                    result_slot = Some(temp.clone());
                    outs.push(temp.clone());
                    deferred_store = Some((temp, target));
                }
            }
        }
        let arg_list = rendered.join(", ");

        if candidates.len() <= 1 {
            let target_method = candidates.first().copied().unwrap_or(callee);
            let name = naming::unique_method_name(self.program, target_method);
            self.builder.push_line(&call_statement(&outs, &name, &arg_list));
            self.note_callee(target_method);
        } else {
            // Static calls resolve to a single candidate, so a chain always
            // has a receiver.
            let Some(receiver) = receiver_expr else {
                return Err(self.err_unsupported(offset, "virtual dispatch without a receiver"));
            };
            let dynamic = self.fresh_var(BoogieType::Ref);
            self.builder.push_line(&format!(
                "call {} := System.Object.GetType({});",
                dynamic, receiver
            ));
            for (position, &candidate) in candidates.iter().enumerate() {
                let home = self.program.method(candidate).containing_type;
                let type_expr = self.ctx.type_expression(self.program, home);
                let guard = format!("$Subtype({}, {})", dynamic, type_expr);
                let header = if position == 0 {
                    format!("if ({})", guard)
                } else {
                    format!("else if ({})", guard)
                };
                self.builder.open_block(&header);
                let name = naming::unique_method_name(self.program, candidate);
                self.builder.push_line(&call_statement(&outs, &name, &arg_list));
                self.note_callee(candidate);
                self.builder.close_block();
            }
            self.builder.open_block("else");
            if self.config.avoid_subtype_checks_for_interfaces {
                let name = naming::unique_method_name(self.program, callee);
                self.builder.push_line(&call_statement(&outs, &name, &arg_list));
                self.note_callee(callee);
            } else {
                self.builder.push_line("assert false;");
            }
            self.builder.close_block();
        }

        self.after_call_check(offset)?;

        if ret_ty == BoogieType::Ref && candidates.len() <= 1 {
            let target_method = candidates.first().copied().unwrap_or(callee);
            if self.program.method(target_method).is_external {
                if let Some(slot) = &result_slot {
                    let type_expr = self
                        .ctx
                        .type_expression(self.program, declared.return_type);
                    self.builder.push_line(&format!(
                        "assume {} == null || $Subtype($DynamicType({}), {});",
                        slot, slot, type_expr
                    ));
                }
            }
        }
        if let Some((temp, target)) = deferred_store {
            self.store_into(offset, target, &temp, ret_ty)?;
        }
        Ok(())
    }

    fn lower_contract(
        &mut self,
        offset: u32,
        callee: MethodId,
        args: &[Value],
    ) -> Result<(), TranslateError> {
        let Some(condition) = args.first() else {
            return Err(self.err_unsupported(offset, "contract call without a condition"));
        };
        let expr = self.operand(offset, condition)?;
        let ty = naming::value_boogie_type(self.program, condition);
        let rendered = match ty {
            BoogieType::Bool => expr,
            BoogieType::Int => format!("({} != 0)", expr),
            BoogieType::Ref => format!("Union2Bool({})", expr),
            _ => expr,
        };
        let keyword = if self.program.method(callee).name == "Assert" {
            "assert"
        } else {
            "assume"
        };
        self.builder.push_line(&format!("{} {};", keyword, rendered));
        Ok(())
    }

    pub(crate) fn note_callee(&mut self, method: MethodId) {
        let def = self.program.method(method);
        if def.is_external {
            self.ctx.record_extern(method);
        } else if self
            .program
            .body(self.program.unspecialized_method(method))
            .is_none()
        {
            self.ctx.record_possibly_missing(method);
        }
    }

    fn lower_new_object(
        &mut self,
        offset: u32,
        result: &Value,
        allocation: TypeId,
    ) -> Result<(), TranslateError> {
        self.call_into(offset, result, BoogieType::Ref, "Alloc", "")?;
        let expr = self.operand(offset, result)?;
        let type_expr = self.ctx.type_expression(self.program, allocation);
        self.builder
            .push_line(&format!("assume $DynamicType({}) == {};", expr, type_expr));
        let constructor = naming::type_constructor_name(
            self.program,
            self.program.types.unspecialized(allocation),
        );
        self.builder.push_line(&format!(
            "assume $TypeConstructor($DynamicType({})) == {};",
            expr, constructor
        ));
        Ok(())
    }

    fn lower_init_object(
        &mut self,
        offset: u32,
        targets: &[Value],
    ) -> Result<(), TranslateError> {
        if targets.len() != 1 {
            return Err(TranslateError::MultiTargetInitialize {
                method: self.name.clone(),
                offset,
                count: targets.len(),
            });
        }
        let target = &targets[0];
        let ty = naming::value_boogie_type(self.program, target);
        match ty.zero() {
            Some(zero) => self.store_into(offset, target, zero, ty),
            None => self.havoc_into(offset, target),
        }
    }

    fn lower_convert(
        &mut self,
        offset: u32,
        result: &Value,
        operand: &Value,
        conversion: ConvertKind,
        target: TypeId,
    ) -> Result<(), TranslateError> {
        match conversion {
            ConvertKind::Narrow => {
                let from = naming::value_boogie_type(self.program, operand);
                let to = naming::boogie_type(self.program, target);
                if from == to {
                    let expr = self.operand(offset, operand)?;
                    self.store_into(offset, result, &expr, from)
                } else {
                    // Numeric reinterpretation has no lattice image; the
                    // result is unconstrained.
                    self.havoc_into(offset, result)
                }
            }
            ConvertKind::Box | ConvertKind::Unbox => {
                let expr = self.operand(offset, operand)?;
                let from = naming::value_boogie_type(self.program, operand);
                self.store_into(offset, result, &expr, from)
            }
            ConvertKind::As => {
                if self.program.types.is_string(self.program.types.strip_pointers(target)) {
                    return Err(self.err_unsupported(offset, "as-cast to string"));
                }
                let expr = self.operand(offset, operand)?;
                let type_expr = self.ctx.type_expression(self.program, target);
                let rendered = format!("$As({}, {})", expr, type_expr);
                self.store_into(offset, result, &rendered, BoogieType::Ref)
            }
        }
    }

    fn lower_return(
        &mut self,
        offset: u32,
        operand: Option<&Value>,
    ) -> Result<(), TranslateError> {
        if let Some(operand) = operand {
            let expr = self.operand(offset, operand)?;
            let from = naming::value_boogie_type(self.program, operand);
            let to = naming::boogie_type(self.program, self.def.return_type);
            let value = self.coerced(&expr, from, to);
            self.builder.push_line(&format!("$result := {};", value));
        }
        let epilogue = self.memory.return_epilogue(&self.by_ref_params);
        for line in epilogue {
            self.builder.push_line(&line);
        }
        self.builder.push_line("return;");
        Ok(())
    }
}

fn call_statement(outs: &[String], procedure: &str, args: &str) -> String {
    if outs.is_empty() {
        format!("call {}({});", procedure, args)
    } else {
        format!("call {} := {}({});", outs.join(", "), procedure, args)
    }
}

fn binary_symbol(op: BinaryOp, operand_ty: BoogieType) -> (&'static str, bool) {
    match op {
        BinaryOp::Add => ("+", false),
        BinaryOp::Sub => ("-", false),
        BinaryOp::Mul => ("*", false),
        BinaryOp::Div if operand_ty == BoogieType::Int => ("div", false),
        BinaryOp::Div => ("/", false),
        BinaryOp::Rem => ("mod", false),
        BinaryOp::And => ("&&", false),
        BinaryOp::Or => ("||", false),
        BinaryOp::Xor => ("!=", true),
        BinaryOp::Shl | BinaryOp::Shr => ("+", false),
        BinaryOp::Eq => ("==", true),
        BinaryOp::Ne => ("!=", true),
        BinaryOp::Lt => ("<", true),
        BinaryOp::Le => ("<=", true),
        BinaryOp::Gt => (">", true),
        BinaryOp::Ge => (">=", true),
    }
}

fn branch_symbol(op: BranchOp) -> &'static str {
    match op {
        BranchOp::Eq => "==",
        BranchOp::Ne => "!=",
        BranchOp::Lt => "<",
        BranchOp::Le => "<=",
        BranchOp::Gt => ">",
        BranchOp::Ge => ">=",
    }
}

fn real_literal(value: f64) -> String {
    let text = format!("{}", value);
    if text.contains('.') {
        text
    } else {
        format!("{:.1}", value)
    }
}
