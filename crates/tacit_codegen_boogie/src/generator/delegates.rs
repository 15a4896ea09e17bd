//! Delegate lowering. Creation sites collapse into a call to the group's
//! `CreateDelegate_` procedure, invocations into `InvokeDelegate_`, and the
//! procedures themselves are dumped once per group after the method pass.

use tacit_ir::{CallKind, InstructionKind, MethodId, TypeId, Value};

use crate::builder::BoogieSourceBuilder;
use crate::context::{DelegateGroup, TranslationContext};
use crate::error::TranslateError;
use crate::generator::{BoogieTranslator, MethodTranslator};
use crate::naming::{self, BoogieType};

impl MethodTranslator<'_, '_> {
    pub(crate) fn lower_delegate_creation(
        &mut self,
        load: usize,
        alloc: usize,
        ctor: usize,
    ) -> Result<(), TranslateError> {
        self.emit_instruction_prologue(load.min(alloc));
        self.emit_instruction_prologue(load.max(alloc));
        self.emit_instruction_prologue(ctor);

        let load_instr = &self.body.instructions[load];
        let offset = load_instr.offset;
        let InstructionKind::Load {
            operand: Value::MethodPtr { method, is_virtual },
            ..
        } = &load_instr.kind
        else {
            return Err(self.err_unsupported_run(load.min(alloc)));
        };
        let InstructionKind::NewObject { result, allocation } =
            &self.body.instructions[alloc].kind
        else {
            return Err(self.err_unsupported_run(load.min(alloc)));
        };
        let InstructionKind::Call { args, .. } = &self.body.instructions[ctor].kind else {
            return Err(self.err_unsupported_run(load.min(alloc)));
        };
        if args.len() != 3 {
            return Err(
                self.err_unsupported(offset, "delegate constructor with unexpected arguments")
            );
        }
        let receiver = &args[1];

        let delegate_type = self.program.types.unspecialized(*allocation);
        let group = naming::normalized_type_name(self.program, delegate_type);
        let invoke = self.delegate_invoke_method(offset, delegate_type)?;
        self.ctx.delegates.ensure_group(&group, invoke);

        let kind = if *is_virtual {
            CallKind::Virtual
        } else {
            CallKind::Static
        };
        let receiver_source = naming::value_source_type(self.program, receiver);
        let mut bound = self
            .resolver
            .resolve(self.hierarchy, *method, receiver_source, kind);
        if bound.is_empty() {
            let def = self.program.method(*method);
            if def.is_abstract {
                let receiver_name = receiver_source
                    .map(|ty| self.program.type_name(ty).to_string())
                    .unwrap_or_else(|| {
                        self.program.type_name(def.containing_type).to_string()
                    });
                return Err(TranslateError::MissingOverride {
                    method: self.name.clone(),
                    callee: naming::unique_method_name(self.program, *method),
                    receiver: receiver_name,
                });
            }
            bound.push(*method);
        }
        for &target in &bound {
            let unique = naming::unique_method_name(self.program, target);
            self.ctx.delegates.bind(&group, invoke, target, &unique);
            self.note_callee(target);
            let home = self.program.method(target).containing_type;
            self.ctx
                .mention_class(self.program.types.unspecialized(home));
        }
        let primary = naming::unique_method_name(self.program, bound[0]);
        let id = self.ctx.delegates.method_id_constant(&primary);

        let receiver_expr = self.operand(offset, receiver)?;
        let call_args = format!("{}, {}, null", id, receiver_expr);
        let procedure = format!("CreateDelegate_{}", group);
        self.call_into(offset, result, BoogieType::Ref, &procedure, &call_args)
    }

    pub(crate) fn lower_delegate_invoke(&mut self, index: usize) -> Result<(), TranslateError> {
        self.emit_instruction_prologue(index);
        let instr = &self.body.instructions[index];
        let offset = instr.offset;
        let InstructionKind::Call {
            result,
            callee,
            args,
            ..
        } = &instr.kind
        else {
            return Err(self.err_unsupported(offset, "delegate invocation is not a call"));
        };
        let invoke = self.program.unspecialized_method(*callee);
        let template = self.program.method(invoke);
        let home = self.program.types.unspecialized(template.containing_type);
        let group = naming::normalized_type_name(self.program, home);
        self.ctx.delegates.ensure_group(&group, invoke);

        let Some((delegate, rest)) = args.split_first() else {
            return Err(self.err_unsupported(offset, "delegate invocation without a receiver"));
        };
        if template.parameters.len() != rest.len() {
            return Err(self.err_unsupported(offset, "argument count does not match the callee"));
        }
        let delegate_expr = self.operand(offset, delegate)?;
        self.null_guard(&delegate_expr);
        let mut rendered = vec![delegate_expr];
        for (param, arg) in template.parameters.iter().zip(rest) {
            if param.by_ref {
                return Err(self.err_unsupported(offset, "by-ref delegate parameter"));
            }
            let expr = self.operand(offset, arg)?;
            let from = naming::value_boogie_type(self.program, arg);
            let to = naming::boogie_type(self.program, param.ty);
            rendered.push(self.coerced(&expr, from, to));
        }

        let ret = naming::boogie_type(self.program, template.return_type);
        let procedure = format!("InvokeDelegate_{}", group);
        let arg_list = rendered.join(", ");
        match (result.as_ref(), ret) {
            (_, BoogieType::Void) => self
                .builder
                .push_line(&format!("call {}({});", procedure, arg_list)),
            (None, _) => {
                let discard = self.fresh_var(ret);
                self.builder
                    .push_line(&format!("call {} := {}({});", discard, procedure, arg_list));
            }
            (Some(target), _) => self.call_into(offset, target, ret, &procedure, &arg_list)?,
        }
        self.after_call_check(offset)
    }

    fn delegate_invoke_method(
        &self,
        offset: u32,
        delegate_type: TypeId,
    ) -> Result<MethodId, TranslateError> {
        self.resolver
            .methods_of(delegate_type)
            .iter()
            .copied()
            .find(|&method| self.program.method(method).name == "Invoke")
            .ok_or_else(|| self.err_unsupported(offset, "delegate type without an Invoke method"))
    }
}

impl<'p> BoogieTranslator<'p> {
    pub(super) fn emit_delegate_declarations(
        &self,
        ctx: &TranslationContext,
        builder: &mut BoogieSourceBuilder,
    ) {
        if ctx.delegates.is_empty() {
            return;
        }
        for constant in ctx.delegates.id_constants() {
            builder.push_line(&format!("const unique {} : int;", constant));
        }
        builder.blank_line();
        for (group, data) in ctx.delegates.groups() {
            self.emit_create_delegate(group, builder);
            builder.blank_line();
            self.emit_invoke_delegate(group, data, builder);
            builder.blank_line();
        }
    }

    fn emit_create_delegate(&self, group: &str, builder: &mut BoogieSourceBuilder) {
        builder.open_block(&format!(
            "procedure CreateDelegate_{}(method : int, receiver : Ref, typeParameters : Ref) returns ($result : Ref)",
            group
        ));
        builder.push_line("call $result := Alloc();");
        builder.push_line("assume $RefToDelegateMethod(method, $result);");
        builder.push_line("assume $RefToDelegateReceiver(method, $result) == receiver;");
        builder.push_line("assume $RefToDelegateTypeParameters(method, $result) == typeParameters;");
        builder.close_block();
    }

    /// The group dispatcher: one guarded branch per bound method, testing
    /// which id the delegate reference was created with.
    fn emit_invoke_delegate(
        &self,
        group: &str,
        data: &DelegateGroup,
        builder: &mut BoogieSourceBuilder,
    ) {
        let template = self.program.method(data.invoke);
        let mut params = vec!["$this : Ref".to_string()];
        for param in &template.parameters {
            let ty = naming::boogie_type(self.program, param.ty);
            params.push(format!("{} : {}", param.name, ty));
        }
        let ret = naming::boogie_type(self.program, template.return_type);
        let header = if ret == BoogieType::Void {
            format!("procedure InvokeDelegate_{}({})", group, params.join(", "))
        } else {
            format!(
                "procedure InvokeDelegate_{}({}) returns ($result : {})",
                group,
                params.join(", "),
                ret
            )
        };
        builder.open_block(&header);
        builder.push_line("var $receiver : Ref;");
        builder.blank_line();

        let forwarded: Vec<&str> = template
            .parameters
            .iter()
            .map(|param| param.name.as_str())
            .collect();
        for (position, &target) in data.methods.iter().enumerate() {
            let unique = naming::unique_method_name(self.program, target);
            let id = format!("$MethodId_{}", unique);
            let guard = format!("$RefToDelegateMethod({}, $this)", id);
            let head = if position == 0 {
                format!("if ({})", guard)
            } else {
                format!("else if ({})", guard)
            };
            builder.open_block(&head);
            let def = self.program.method(target);
            let mut call_args = Vec::new();
            if !def.is_static {
                builder.push_line(&format!("$receiver := $RefToDelegateReceiver({}, $this);", id));
                call_args.push("$receiver");
            }
            call_args.extend(forwarded.iter().copied());
            let statement = if ret == BoogieType::Void {
                format!("call {}({});", unique, call_args.join(", "))
            } else {
                format!("call $result := {}({});", unique, call_args.join(", "))
            };
            builder.push_line(&statement);
            builder.close_block();
        }
        if data.methods.is_empty() {
            builder.push_line("assert false;");
        } else {
            builder.open_block("else");
            builder.push_line("assert false;");
            builder.close_block();
        }
        builder.close_block();
    }
}
