use tacit_cha::ProgramHierarchy;
use tacit_codegen_boogie::{BoogieCodeGenConfig, BoogieTranslator};
use tacit_ir::{
    BinaryOp, CallKind, Constant, ControlFlowGraph, FieldRef, Handler, HandlerKind, Instruction,
    InstructionKind, Local, MethodBody, MethodDef, MethodId, Parameter, PrimitiveKind, Program,
    ProtectedRegion, TypeDef, TypeId, Value,
};

fn add_class(program: &mut Program, name: &str) -> TypeId {
    program.types.intern(TypeDef::reference(name))
}

fn add_method(
    program: &mut Program,
    ty: TypeId,
    name: &str,
    params: Vec<Parameter>,
    ret: TypeId,
    is_static: bool,
) -> MethodId {
    program.add_method(MethodDef {
        name: name.into(),
        containing_type: ty,
        parameters: params,
        return_type: ret,
        is_static,
        is_abstract: false,
        is_external: false,
        is_constructor: false,
        generic_definition: None,
    })
}

fn param(name: &str, ty: TypeId, index: u16) -> Parameter {
    Parameter {
        name: name.into(),
        ty,
        by_ref: false,
        is_out: false,
        index,
    }
}

fn body(locals: Vec<Local>, instructions: Vec<Instruction>) -> MethodBody {
    MethodBody {
        locals,
        instructions,
        protected_regions: Vec::new(),
        cfg: ControlFlowGraph::default(),
    }
}

/// A small program touching fields, string constants, exception flow, and an
/// external callee, so every declaration section has something to say.
fn greeter_program() -> Program {
    let mut program = Program::new();
    let int = program.types.primitive(PrimitiveKind::Int32).unwrap();
    let string = program.types.primitive(PrimitiveKind::Str).unwrap();
    let void = program.types.primitive(PrimitiveKind::Void).unwrap();
    let exception = add_class(&mut program, "System.Exception");
    let channel = add_class(&mut program, "Lib.Channel");
    let greeter = add_class(&mut program, "App.Greeter");

    let send = add_method(
        &mut program,
        channel,
        "Send",
        vec![param("msg", string, 0)],
        void,
        true,
    );
    program.methods[send.index()].is_external = true;

    let bump = add_method(&mut program, greeter, "Bump", Vec::new(), void, false);
    let count = FieldRef {
        name: "count".into(),
        declaring_type: greeter,
        ty: int,
    };
    program.bodies.insert(
        bump,
        body(
            vec![Local {
                name: "t".into(),
                ty: int,
            }],
            vec![
                Instruction::new(
                    0,
                    InstructionKind::Load {
                        result: Value::var("t", int),
                        operand: Value::InstanceField {
                            object: Box::new(Value::var("this", greeter)),
                            field: count.clone(),
                        },
                    },
                ),
                Instruction::new(
                    1,
                    InstructionKind::Binary {
                        result: Value::var("t", int),
                        op: BinaryOp::Add,
                        left: Value::var("t", int),
                        right: Value::Const(Constant::Int(1)),
                    },
                ),
                Instruction::new(
                    2,
                    InstructionKind::Store {
                        target: Value::InstanceField {
                            object: Box::new(Value::var("this", greeter)),
                            field: count,
                        },
                        operand: Value::var("t", int),
                    },
                ),
                Instruction::new(3, InstructionKind::Return { operand: None }),
            ],
        ),
    );

    let greet = add_method(
        &mut program,
        greeter,
        "Greet",
        vec![param("name", string, 0)],
        void,
        true,
    );
    let mut greet_body = body(
        vec![Local {
            name: "msg".into(),
            ty: string,
        }],
        vec![
            Instruction::new(
                0,
                InstructionKind::Binary {
                    result: Value::var("msg", string),
                    op: BinaryOp::Add,
                    left: Value::Const(Constant::Str("\"Hi \"".into())),
                    right: Value::var("name", string),
                },
            ),
            Instruction::new(
                1,
                InstructionKind::Call {
                    result: None,
                    callee: send,
                    kind: CallKind::Static,
                    args: vec![Value::var("msg", string)],
                },
            ),
            Instruction::with_label(
                2,
                "H",
                InstructionKind::CatchStart {
                    binding: None,
                    exception_type: exception,
                },
            ),
            Instruction::new(3, InstructionKind::Return { operand: None }),
        ],
    );
    greet_body.protected_regions.push(ProtectedRegion {
        try_start: 0,
        try_end: 1,
        handler: Handler {
            kind: HandlerKind::Catch,
            start: 2,
            end: 3,
            catch_type: Some(exception),
        },
    });
    program.bodies.insert(greet, greet_body);
    program
}

fn translate(program: &Program) -> tacit_codegen_boogie::BoogieModule {
    let hierarchy = ProgramHierarchy::new(program);
    BoogieTranslator::new(program, &hierarchy, BoogieCodeGenConfig::default())
        .translate_program()
        .expect("translation should succeed")
}

#[test]
fn whole_programs_emit_procedures_then_shared_declarations() {
    let program = greeter_program();
    let module = translate(&program);
    assert_eq!(module.procedures.len(), 2);
    assert_eq!(module.stubbed_methods, vec!["Lib.Channel.Send$System.String"]);
    assert!(module.skipped_methods.is_empty());

    let source = module.to_source();
    let bump_at = source.find("procedure App.Greeter.Bump(this : Ref)").unwrap();
    let globals_at = source.find("var $Exception : Ref;").unwrap();
    let field_at = source.find("var F$App.Greeter.count : [Ref]int;").unwrap();
    let strings_at = source
        .find("const unique $string_literal_NullValue : Ref;")
        .unwrap();
    let stub_at = source
        .find("procedure {:extern} Lib.Channel.Send$System.String(msg$in : Ref);")
        .unwrap();
    assert!(bump_at < globals_at, "procedures precede declarations");
    assert!(globals_at < field_at);
    assert!(field_at < strings_at);
    assert!(strings_at < stub_at);

    assert!(source.contains("t := F$App.Greeter.count[this];"));
    assert!(source.contains("F$App.Greeter.count[this] := t;"));
    assert!(source.contains(
        "call msg := System.String.Concat$System.String$System.String($string_literal_Hi#0#, name);"
    ));
    assert!(source.contains("const unique $string_literal_Hi#0# : Ref;"));
    assert!(source.contains("call Lib.Channel.Send$System.String(msg);"));
    assert!(source.contains("    if ($Exception != null)\n    {\n        goto H;\n    }\n"));
}

#[test]
fn untranslatable_methods_skip_without_sinking_the_run() {
    let mut program = greeter_program();
    let int = program.types.primitive(PrimitiveKind::Int32).unwrap();
    let void = program.types.primitive(PrimitiveKind::Void).unwrap();
    let broken_home = add_class(&mut program, "App.Broken");
    let bad = add_method(&mut program, broken_home, "Bad", Vec::new(), void, true);
    program.bodies.insert(
        bad,
        body(
            vec![
                Local {
                    name: "a".into(),
                    ty: int,
                },
                Local {
                    name: "b".into(),
                    ty: int,
                },
            ],
            vec![
                Instruction::new(
                    0,
                    InstructionKind::InitObject {
                        targets: vec![Value::var("a", int), Value::var("b", int)],
                    },
                ),
                Instruction::new(1, InstructionKind::Return { operand: None }),
            ],
        ),
    );

    let module = translate(&program);
    assert_eq!(module.procedures.len(), 2);
    assert_eq!(module.skipped_methods, vec!["App.Broken.Bad"]);
}
