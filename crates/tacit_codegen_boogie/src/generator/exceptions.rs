//! Exception-flow lowering. A pending exception lives in the `$Exception`
//! globals; throws, post-call checks, and finally exits all route it to the
//! innermost enclosing handler, or out of the procedure when none remains.

use tacit_ir::{HandlerKind, ProtectedRegion, TypeId, Value};

use crate::error::TranslateError;
use crate::generator::MethodTranslator;
use crate::naming::BoogieType;

impl MethodTranslator<'_, '_> {
    /// Entry label of the handler a pending exception at `offset` unwinds
    /// to. Handler code sits outside its own protected range, so a miss or
    /// re-throw inside a handler naturally resolves outward.
    fn pending_exception_target(&self, offset: u32) -> Result<Option<String>, TranslateError> {
        let mut innermost: Option<&ProtectedRegion> = None;
        for region in &self.body.protected_regions {
            if !region.try_contains(offset) {
                continue;
            }
            if innermost.map_or(true, |current| region.try_start > current.try_start) {
                innermost = Some(region);
            }
        }
        let Some(region) = innermost else {
            return Ok(None);
        };
        self.handler_entry_label(region).map(Some)
    }

    /// Where a type miss at a catch entry forwards the exception: the next
    /// handler guarding the same protected range, or failing that whatever
    /// encloses the handler code itself.
    fn catch_miss_target(&self, offset: u32) -> Result<Option<String>, TranslateError> {
        let Some(current) = self
            .body
            .protected_regions
            .iter()
            .find(|region| region.handler.start == offset)
        else {
            return self.pending_exception_target(offset);
        };
        let mut next: Option<&ProtectedRegion> = None;
        for region in &self.body.protected_regions {
            if region.try_start != current.try_start || region.try_end != current.try_end {
                continue;
            }
            if region.handler.start <= current.handler.start {
                continue;
            }
            if next.map_or(true, |candidate| {
                region.handler.start < candidate.handler.start
            }) {
                next = Some(region);
            }
        }
        match next {
            Some(region) => self.handler_entry_label(region).map(Some),
            None => self.pending_exception_target(offset),
        }
    }

    /// Innermost finally whose protected range covers a leaving jump; jumps
    /// out of such a range detour through the handler before continuing.
    pub(crate) fn leave_destination(&self, offset: u32) -> Result<Option<String>, TranslateError> {
        let mut innermost: Option<&ProtectedRegion> = None;
        for region in &self.body.protected_regions {
            if region.handler.kind != HandlerKind::Finally || !region.try_contains(offset) {
                continue;
            }
            if innermost.map_or(true, |current| region.try_start > current.try_start) {
                innermost = Some(region);
            }
        }
        let Some(region) = innermost else {
            return Ok(None);
        };
        self.handler_entry_label(region).map(Some)
    }

    fn handler_entry_label(&self, region: &ProtectedRegion) -> Result<String, TranslateError> {
        let entry = self
            .body
            .instructions
            .iter()
            .find(|instr| instr.offset == region.handler.start);
        match entry.and_then(|instr| instr.label.clone()) {
            Some(label) => Ok(label),
            None => {
                Err(self.err_unsupported(region.handler.start, "handler entry without a label"))
            }
        }
    }

    pub(crate) fn after_call_check(&mut self, offset: u32) -> Result<(), TranslateError> {
        if !self.config.exceptions {
            return Ok(());
        }
        self.exception_divert(offset)
    }

    fn exception_divert(&mut self, offset: u32) -> Result<(), TranslateError> {
        let target = self.pending_exception_target(offset)?;
        self.builder.open_block("if ($Exception != null)");
        match target {
            Some(label) => self.builder.push_line(&format!("goto {};", label)),
            None => self.builder.push_line("return;"),
        }
        self.builder.close_block();
        Ok(())
    }

    pub(crate) fn lower_throw(
        &mut self,
        offset: u32,
        exception: Option<&Value>,
    ) -> Result<(), TranslateError> {
        if !self.config.exceptions {
            self.builder.push_line("assume false;");
            return Ok(());
        }
        match exception {
            Some(value) => {
                let expr = self.operand(offset, value)?;
                self.null_guard(&expr);
                self.builder.push_line(&format!("$Exception := {};", expr));
                self.builder
                    .push_line(&format!("$ExceptionType := $DynamicType({});", expr));
            }
            None => {
                self.builder
                    .push_line("$Exception := $ExceptionInCatchHandler;");
                self.builder
                    .push_line("$ExceptionType := $ExceptionInCatchHandlerType;");
            }
        }
        match self.pending_exception_target(offset)? {
            Some(label) => self.builder.push_line(&format!("goto {};", label)),
            None => self.builder.push_line("return;"),
        }
        Ok(())
    }

    /// Handler entry: a type miss forwards the still-pending exception to
    /// the next candidate handler; a hit parks it in the in-handler slot so
    /// the body runs with a clear pending state.
    pub(crate) fn lower_catch_start(
        &mut self,
        offset: u32,
        binding: Option<&Value>,
        exception_type: TypeId,
    ) -> Result<(), TranslateError> {
        if !self.config.exceptions {
            self.builder.push_line("assume false;");
            return Ok(());
        }
        let type_expr = self.ctx.type_expression(self.program, exception_type);
        let miss = self.catch_miss_target(offset)?;
        self.builder
            .open_block(&format!("if (!$Subtype($ExceptionType, {}))", type_expr));
        match miss {
            Some(label) => self.builder.push_line(&format!("goto {};", label)),
            None => self.builder.push_line("return;"),
        }
        self.builder.close_block();
        self.builder
            .push_line("$ExceptionInCatchHandler := $Exception;");
        self.builder
            .push_line("$ExceptionInCatchHandlerType := $ExceptionType;");
        self.builder.push_line("$Exception := null;");
        self.builder.push_line("$ExceptionType := null;");
        if let Some(binding) = binding {
            self.store_into(offset, binding, "$ExceptionInCatchHandler", BoogieType::Ref)?;
        }
        Ok(())
    }

    /// End of a finally body: a pending exception keeps unwinding, normal
    /// flow falls through to whatever follows the handler.
    pub(crate) fn lower_end_finally(&mut self, offset: u32) -> Result<(), TranslateError> {
        if !self.config.exceptions {
            return Ok(());
        }
        self.exception_divert(offset)
    }
}
