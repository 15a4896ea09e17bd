use std::collections::BTreeSet;

use tacit_cha::{ClassHierarchy, DispatchResolver};
use tacit_ir::{MethodBody, MethodDef, MethodId, Program, TypeId};
use tracing::{debug, warn};

use crate::builder::BoogieSourceBuilder;
use crate::config::BoogieCodeGenConfig;
use crate::context::TranslationContext;
use crate::error::TranslateError;
use crate::memory::{strategy_for, MemoryStrategy};
use crate::naming::{self, BoogieType};

mod arrays;
mod delegates;
mod exceptions;
mod instrs;
mod runs;

use runs::Run;

/// Procedures whose definitions come from the verification prelude rather
/// than the translated program; they are never stubbed.
const RUNTIME_PROCEDURES: &[&str] = &[
    "Alloc",
    "AllocAddr",
    "System.Object.GetType",
    "$HavocArrayElementsNoNull",
    "System.String.op_Equality$System.String$System.String",
    "System.String.op_Inequality$System.String$System.String",
    "System.String.Concat$System.String$System.String",
];

/// The translated program: one text block per lowered procedure, one
/// declaration block flushed after all of them, and the registries the
/// downstream layers consume.
#[derive(Debug, Default)]
pub struct BoogieModule {
    pub procedures: Vec<String>,
    pub declarations: String,
    pub mentioned_classes: BTreeSet<TypeId>,
    pub skipped_methods: Vec<String>,
    pub stubbed_methods: Vec<String>,
}

impl BoogieModule {
    pub fn to_source(&self) -> String {
        let mut source = String::new();
        for procedure in &self.procedures {
            source.push_str(procedure);
            source.push('\n');
        }
        source.push_str(&self.declarations);
        source
    }
}

/// Whole-program translator. One instance per run; the per-method state
/// lives in [`MethodTranslator`], the cross-method state in a
/// [`TranslationContext`] created by [`BoogieTranslator::translate_program`].
pub struct BoogieTranslator<'p> {
    program: &'p Program,
    hierarchy: &'p dyn ClassHierarchy,
    resolver: DispatchResolver<'p>,
    config: BoogieCodeGenConfig,
    memory: Box<dyn MemoryStrategy>,
}

impl<'p> BoogieTranslator<'p> {
    pub fn new(
        program: &'p Program,
        hierarchy: &'p dyn ClassHierarchy,
        config: BoogieCodeGenConfig,
    ) -> Self {
        let memory = strategy_for(config.memory_model);
        Self {
            program,
            hierarchy,
            resolver: DispatchResolver::new(program),
            config,
            memory,
        }
    }

    pub fn config(&self) -> &BoogieCodeGenConfig {
        &self.config
    }

    /// Lowers every method body in the program. A per-method failure is
    /// logged and skips that method unless fail-fast is configured; the
    /// registry dumps are emitted once after the full pass.
    pub fn translate_program(&self) -> Result<BoogieModule, TranslateError> {
        let mut ctx = TranslationContext::new();
        let mut module = BoogieModule::default();

        for (&id, body) in &self.program.bodies {
            if !self.program.is_translatable(id) {
                continue;
            }
            let name = naming::unique_method_name(self.program, id);
            match self.translate_method(id, body, &mut ctx) {
                Ok(text) => {
                    ctx.record_translated(&name);
                    module.procedures.push(text);
                    debug!(method = %name, "translated method");
                }
                Err(error) if !self.config.fail_fast => {
                    warn!(method = %name, %error, "skipping untranslatable method");
                    module.skipped_methods.push(name);
                }
                Err(error) => return Err(error),
            }
        }

        self.flush(&ctx, &mut module);
        module.mentioned_classes = ctx.mentioned_classes().clone();
        Ok(module)
    }

    fn translate_method(
        &self,
        id: MethodId,
        body: &'p MethodBody,
        ctx: &mut TranslationContext,
    ) -> Result<String, TranslateError> {
        let def = self.program.method(id);
        let name = naming::unique_method_name(self.program, id);
        if let Some(detail) = self.unsupported_body(def) {
            return Err(TranslateError::Unsupported {
                method: name,
                offset: 0,
                detail,
            });
        }
        let translator = MethodTranslator::new(self, id, def, body, name, ctx);
        translator.translate()
    }

    /// Bodies the lowering must refuse rather than approximate.
    fn unsupported_body(&self, def: &MethodDef) -> Option<String> {
        if def.name != "MoveNext" {
            return None;
        }
        let parent = self.program.type_def(def.containing_type);
        let is_async = parent.interfaces.iter().any(|&iface| {
            self.program.type_name(iface).contains("IAsyncStateMachine")
        });
        is_async.then(|| "async state-machine body".to_string())
    }

    /// The one-shot dump after all methods: exception globals, touched
    /// fields, string constants, delegate machinery, and extern stubs for
    /// callees that never materialized.
    fn flush(&self, ctx: &TranslationContext, module: &mut BoogieModule) {
        let mut builder = BoogieSourceBuilder::new(&self.config.indent);

        if self.config.exceptions {
            builder.push_line("var $Exception : Ref;");
            builder.push_line("var $ExceptionType : Ref;");
            builder.push_line("var $ExceptionInCatchHandler : Ref;");
            builder.push_line("var $ExceptionInCatchHandlerType : Ref;");
            builder.blank_line();
        }

        let mut any_field = false;
        for (name, decl) in ctx.fields() {
            builder.push_line(&self.memory.field_declaration(name, decl.ty, decl.is_static));
            any_field = true;
        }
        if any_field {
            builder.blank_line();
        }

        if !ctx.strings.is_empty() {
            builder.push_line(&format!(
                "const unique {} : Ref;",
                ctx.strings.null_constant()
            ));
            for constant in ctx.strings.constants() {
                builder.push_line(&format!("const unique {} : Ref;", constant));
            }
            builder.blank_line();
        }

        self.emit_delegate_declarations(ctx, &mut builder);
        self.emit_stubs(ctx, module, &mut builder);

        module.declarations = builder.build();
    }

    fn emit_stubs(
        &self,
        ctx: &TranslationContext,
        module: &mut BoogieModule,
        builder: &mut BoogieSourceBuilder,
    ) {
        let mut stubbed = BTreeSet::new();
        let candidates = ctx
            .externs()
            .iter()
            .chain(ctx.possibly_missing().iter());
        for &method in candidates {
            let name = naming::unique_method_name(self.program, method);
            if ctx.is_translated(&name)
                || RUNTIME_PROCEDURES.contains(&name.as_str())
                || !stubbed.insert(name.clone())
            {
                continue;
            }
            warn!(method = %name, "synthesizing extern stub for missing callee");
            builder.push_line(&self.stub_declaration(method, &name));
            module.stubbed_methods.push(name);
        }
    }

    fn stub_declaration(&self, method: MethodId, name: &str) -> String {
        let def = self.program.method(method);
        let mut params = Vec::new();
        if !def.is_static {
            params.push("this : Ref".to_string());
        }
        let mut by_ref = Vec::new();
        for p in &def.parameters {
            let bt = naming::boogie_type(self.program, p.ty);
            let lowering = self.memory.parameter(&p.name, bt, p.by_ref);
            params.push(format!("{} : {}", lowering.signature.0, lowering.signature.1));
            if p.by_ref {
                by_ref.push((p.name.clone(), bt));
            }
        }
        let mut outs: Vec<String> = self
            .memory
            .by_ref_outputs(&by_ref)
            .into_iter()
            .map(|(n, t)| format!("{} : {}", n, t))
            .collect();
        let ret = naming::boogie_type(self.program, def.return_type);
        if ret != BoogieType::Void {
            outs.push(format!("$result : {}", ret));
        }
        if outs.is_empty() {
            format!("procedure {{:extern}} {}({});", name, params.join(", "))
        } else {
            format!(
                "procedure {{:extern}} {}({}) returns ({});",
                name,
                params.join(", "),
                outs.join(", ")
            )
        }
    }
}

/// Per-method lowering state: the output builder, the declarations added and
/// removed along the way, and the classified instruction runs.
pub(crate) struct MethodTranslator<'a, 'p> {
    pub(crate) program: &'p Program,
    pub(crate) hierarchy: &'p dyn ClassHierarchy,
    pub(crate) resolver: &'a DispatchResolver<'p>,
    pub(crate) config: &'a BoogieCodeGenConfig,
    pub(crate) memory: &'a dyn MemoryStrategy,
    pub(crate) ctx: &'a mut TranslationContext,
    pub(crate) method: MethodId,
    pub(crate) def: &'p MethodDef,
    pub(crate) body: &'p MethodBody,
    pub(crate) name: String,
    pub(crate) builder: BoogieSourceBuilder,
    pub(crate) added_locals: Vec<(String, BoogieType)>,
    pub(crate) removed_locals: BTreeSet<String>,
    pub(crate) by_ref_params: Vec<(String, BoogieType)>,
    /// Names read and written directly, outside the memory strategy: `this`
    /// and generated temporaries.
    pub(crate) direct_vars: BTreeSet<String>,
    /// By-ref parameters under the address model. The parameter itself is
    /// the address, so value access dereferences it through the typed heaps
    /// and argument position forwards it bare.
    pub(crate) addr_params: BTreeSet<String>,
    fresh: u32,
}

impl<'a, 'p> MethodTranslator<'a, 'p> {
    fn new(
        translator: &'a BoogieTranslator<'p>,
        method: MethodId,
        def: &'p MethodDef,
        body: &'p MethodBody,
        name: String,
        ctx: &'a mut TranslationContext,
    ) -> Self {
        let builder = BoogieSourceBuilder::new(&translator.config.indent);
        let mut direct_vars = BTreeSet::new();
        direct_vars.insert("this".to_string());
        Self {
            program: translator.program,
            hierarchy: translator.hierarchy,
            resolver: &translator.resolver,
            config: &translator.config,
            memory: translator.memory.as_ref(),
            ctx,
            method,
            def,
            body,
            name,
            builder,
            added_locals: Vec::new(),
            removed_locals: BTreeSet::new(),
            by_ref_params: Vec::new(),
            direct_vars,
            addr_params: BTreeSet::new(),
            fresh: 0,
        }
    }

    fn translate(mut self) -> Result<String, TranslateError> {
        let runs = self.classify_runs();

        let mut params = Vec::new();
        if !self.def.is_static {
            params.push("this : Ref".to_string());
        }
        let mut declared: Vec<(String, BoogieType)> = Vec::new();
        let mut param_entries = Vec::new();
        for p in &self.def.parameters {
            let bt = naming::boogie_type(self.program, p.ty);
            let lowering = self.memory.parameter(&p.name, bt, p.by_ref);
            params.push(format!(
                "{} : {}",
                lowering.signature.0, lowering.signature.1
            ));
            if p.by_ref {
                self.by_ref_params.push((p.name.clone(), bt));
                if lowering.local.is_none() {
                    // Address model: the parameter itself is the cell.
                    self.addr_params.insert(p.name.clone());
                }
            }
            if let Some(local) = lowering.local {
                declared.push(local);
            }
            param_entries.extend(lowering.entry);
        }
        for local in &self.body.locals {
            let bt = naming::boogie_type(self.program, local.ty);
            declared.push((local.name.clone(), bt));
        }
        declared.retain(|(name, _)| !self.removed_locals.contains(name));

        self.builder.indent();
        for statement in self.memory.entry_statements(&declared) {
            self.builder.push_line(&statement);
        }
        for statement in &param_entries {
            self.builder.push_line(statement);
        }
        self.emit_entry_assumptions()?;
        for run in &runs {
            self.lower_run(run)?;
        }
        let body_text = std::mem::take(&mut self.builder).build();

        let mut outs: Vec<String> = self
            .memory
            .by_ref_outputs(&self.by_ref_params)
            .into_iter()
            .map(|(n, t)| format!("{} : {}", n, t))
            .collect();
        let return_bt = naming::boogie_type(self.program, self.def.return_type);
        if return_bt != BoogieType::Void {
            outs.push(format!("$result : {}", return_bt));
        }
        let header = if outs.is_empty() {
            format!("procedure {}({})", self.name, params.join(", "))
        } else {
            format!(
                "procedure {}({}) returns ({})",
                self.name,
                params.join(", "),
                outs.join(", ")
            )
        };

        let mut out = BoogieSourceBuilder::new(&self.config.indent);
        out.open_block(&header);
        let mut any_decl = false;
        for (name, bt) in &declared {
            out.push_line(&self.memory.local_declaration(name, *bt));
            any_decl = true;
        }
        for (name, bt) in &self.added_locals {
            out.push_line(&format!("var {} : {};", name, bt));
            any_decl = true;
        }
        if any_decl {
            out.blank_line();
        }
        out.push_raw(&body_text);
        out.close_block();
        Ok(out.build())
    }

    /// Facts assumed on entry: a non-null, correctly-typed receiver and the
    /// declared types of reference parameters.
    fn emit_entry_assumptions(&mut self) -> Result<(), TranslateError> {
        if !self.def.is_static {
            let declared = self
                .ctx
                .type_expression(self.program, self.def.containing_type);
            self.builder.push_line("assume this != null;");
            self.builder.push_line(&format!(
                "assume $Subtype($DynamicType(this), {});",
                declared
            ));
        }
        for p in &self.def.parameters {
            if p.by_ref {
                continue;
            }
            let bt = naming::boogie_type(self.program, p.ty);
            if bt != BoogieType::Ref {
                continue;
            }
            let expr = self.memory.read_var(&p.name, bt);
            let ty_expr = self.ctx.type_expression(self.program, p.ty);
            self.builder.push_line(&format!(
                "assume {} == null || $Subtype($DynamicType({}), {});",
                expr, expr, ty_expr
            ));
        }
        Ok(())
    }

    fn lower_run(&mut self, run: &Run) -> Result<(), TranslateError> {
        match *run {
            Run::Single { index } => self.lower_instruction(index),
            Run::ArrayLengthFused { load, convert } => self.lower_length_fused(load, convert),
            Run::AtomicArrayInit { token, call } => self.lower_atomic_init(token, call),
            Run::DelegateCreate { load, alloc, ctor } => {
                self.lower_delegate_creation(load, alloc, ctor)
            }
            Run::DelegateInvoke { index } => self.lower_delegate_invoke(index),
        }
    }

    /// Label and source annotation for one consumed instruction; run
    /// lowerings call this for every index they cover so jump targets stay
    /// valid.
    pub(crate) fn emit_instruction_prologue(&mut self, index: usize) {
        let instr = &self.body.instructions[index];
        if let Some(label) = &instr.label {
            self.builder.push_line(&format!("{}:", label));
        }
        if self.config.emit_line_numbers {
            if let Some(location) = &instr.source {
                self.builder.push_line(&format!(
                    "assert {{:sourceFile \"{}\"}} {{:sourceLine {}}} true;",
                    location.file, location.line
                ));
            }
        }
    }

    pub(crate) fn fresh_var(&mut self, ty: BoogieType) -> String {
        let name = format!("$t{}", self.fresh);
        self.fresh += 1;
        self.added_locals.push((name.clone(), ty));
        self.direct_vars.insert(name.clone());
        name
    }

    pub(crate) fn err_unsupported(&self, offset: u32, detail: impl Into<String>) -> TranslateError {
        TranslateError::Unsupported {
            method: self.name.clone(),
            offset,
            detail: detail.into(),
        }
    }

    /// A classified run whose interior no longer destructures as the shape
    /// its recognizer claimed.
    pub(crate) fn err_unsupported_run(&self, start: usize) -> TranslateError {
        TranslateError::UnsupportedRun {
            method: self.name.clone(),
            offset: self.body.instructions[start].offset,
        }
    }
}
