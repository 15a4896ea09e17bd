//! Location read/write strategies. The generator goes through one of these
//! for every variable and field access, so the copy-based and address-based
//! encodings never leak into the lowering logic itself.

use crate::config::MemoryModelKind;
use crate::naming::BoogieType;

/// How one declared parameter surfaces in a procedure: what the header
/// declares, which mutable local shadows it (Boogie in-parameters cannot be
/// assigned), and the statements initializing that shadow.
pub struct ParameterLowering {
    pub signature: (String, BoogieType),
    pub local: Option<(String, BoogieType)>,
    pub entry: Vec<String>,
}

pub trait MemoryStrategy {
    fn kind(&self) -> MemoryModelKind;

    fn read_var(&self, name: &str, ty: BoogieType) -> String;
    fn write_var(&self, name: &str, ty: BoogieType, value: &str) -> String;

    fn read_instance_field(&self, field: &str, object: &str, ty: BoogieType) -> String;
    fn write_instance_field(&self, field: &str, object: &str, ty: BoogieType, value: &str)
        -> String;

    fn read_static_field(&self, field: &str, ty: BoogieType) -> String;
    fn write_static_field(&self, field: &str, ty: BoogieType, value: &str) -> String;

    /// Reads through an already-rendered address expression.
    fn read_deref(&self, address: &str, ty: BoogieType) -> String;
    fn write_deref(&self, address: &str, ty: BoogieType, value: &str) -> String;

    fn local_declaration(&self, name: &str, ty: BoogieType) -> String;
    fn field_declaration(&self, field: &str, ty: BoogieType, is_static: bool) -> String;

    /// Address expression of a declared variable, for models that have one.
    fn var_address(&self, name: &str) -> Option<String>;

    fn parameter(&self, name: &str, ty: BoogieType, by_ref: bool) -> ParameterLowering;

    /// Statements to run before the first lowered instruction.
    fn entry_statements(&self, locals: &[(String, BoogieType)]) -> Vec<String>;

    /// Extra output slots a procedure carries for its by-ref parameters.
    fn by_ref_outputs(&self, by_ref_params: &[(String, BoogieType)]) -> Vec<(String, BoogieType)>;

    /// Statements every `return` runs to publish by-ref parameter state.
    fn return_epilogue(&self, by_ref_params: &[(String, BoogieType)]) -> Vec<String>;
}

pub fn strategy_for(kind: MemoryModelKind) -> Box<dyn MemoryStrategy> {
    match kind {
        MemoryModelKind::Copy => Box::new(CopyMemory),
        MemoryModelKind::Address => Box::new(AddressMemory),
    }
}

/// Default encoding: named locations, per-field `[Ref]` maps, static fields
/// as globals, by-ref parameters as copy-in/copy-out result slots.
pub struct CopyMemory;

impl MemoryStrategy for CopyMemory {
    fn kind(&self) -> MemoryModelKind {
        MemoryModelKind::Copy
    }

    fn read_var(&self, name: &str, _ty: BoogieType) -> String {
        name.to_string()
    }

    fn write_var(&self, name: &str, _ty: BoogieType, value: &str) -> String {
        format!("{} := {};", name, value)
    }

    fn read_instance_field(&self, field: &str, object: &str, _ty: BoogieType) -> String {
        format!("{}[{}]", field, object)
    }

    fn write_instance_field(
        &self,
        field: &str,
        object: &str,
        _ty: BoogieType,
        value: &str,
    ) -> String {
        format!("{}[{}] := {};", field, object, value)
    }

    fn read_static_field(&self, field: &str, _ty: BoogieType) -> String {
        field.to_string()
    }

    fn write_static_field(&self, field: &str, _ty: BoogieType, value: &str) -> String {
        format!("{} := {};", field, value)
    }

    fn read_deref(&self, address: &str, _ty: BoogieType) -> String {
        address.to_string()
    }

    fn write_deref(&self, address: &str, _ty: BoogieType, value: &str) -> String {
        format!("{} := {};", address, value)
    }

    fn local_declaration(&self, name: &str, ty: BoogieType) -> String {
        format!("var {} : {};", name, ty)
    }

    fn field_declaration(&self, field: &str, ty: BoogieType, is_static: bool) -> String {
        if is_static {
            format!("var {} : {};", field, ty)
        } else {
            format!("var {} : [Ref]{};", field, ty)
        }
    }

    fn var_address(&self, _name: &str) -> Option<String> {
        None
    }

    fn parameter(&self, name: &str, ty: BoogieType, _by_ref: bool) -> ParameterLowering {
        ParameterLowering {
            signature: (format!("{}$in", name), ty),
            local: Some((name.to_string(), ty)),
            entry: vec![self.write_var(name, ty, &format!("{}$in", name))],
        }
    }

    fn entry_statements(&self, _locals: &[(String, BoogieType)]) -> Vec<String> {
        Vec::new()
    }

    fn by_ref_outputs(&self, by_ref_params: &[(String, BoogieType)]) -> Vec<(String, BoogieType)> {
        by_ref_params
            .iter()
            .map(|(name, ty)| (format!("{}$out", name), *ty))
            .collect()
    }

    fn return_epilogue(&self, by_ref_params: &[(String, BoogieType)]) -> Vec<String> {
        by_ref_params
            .iter()
            .map(|(name, _)| format!("{}$out := {};", name, name))
            .collect()
    }
}

/// Address-based encoding: every local owns an `Addr` cell in a typed heap,
/// by-ref parameters pass the cell itself, and field contents live behind
/// address constructors. Statics resolve through `$StaticFieldAddress`.
pub struct AddressMemory;

fn heap(ty: BoogieType) -> &'static str {
    match ty {
        BoogieType::Int => "$memoryInt",
        BoogieType::Bool => "$memoryBool",
        BoogieType::Real => "$memoryReal",
        BoogieType::Addr => "$memoryAddr",
        BoogieType::Ref | BoogieType::Void => "$memoryRef",
    }
}

fn read_fn(ty: BoogieType) -> &'static str {
    match ty {
        BoogieType::Int => "ReadInt",
        BoogieType::Bool => "ReadBool",
        BoogieType::Real => "ReadReal",
        BoogieType::Addr => "ReadAddr",
        BoogieType::Ref | BoogieType::Void => "ReadRef",
    }
}

fn write_fn(ty: BoogieType) -> &'static str {
    match ty {
        BoogieType::Int => "WriteInt",
        BoogieType::Bool => "WriteBool",
        BoogieType::Real => "WriteReal",
        BoogieType::Addr => "WriteAddr",
        BoogieType::Ref | BoogieType::Void => "WriteRef",
    }
}

impl AddressMemory {
    fn cell(name: &str) -> String {
        format!("_{}", name)
    }
}

impl MemoryStrategy for AddressMemory {
    fn kind(&self) -> MemoryModelKind {
        MemoryModelKind::Address
    }

    fn read_var(&self, name: &str, ty: BoogieType) -> String {
        format!("{}({}, {})", read_fn(ty), heap(ty), Self::cell(name))
    }

    fn write_var(&self, name: &str, ty: BoogieType, value: &str) -> String {
        format!(
            "{} := {}({}, {}, {});",
            heap(ty),
            write_fn(ty),
            heap(ty),
            Self::cell(name),
            value
        )
    }

    fn read_instance_field(&self, field: &str, object: &str, ty: BoogieType) -> String {
        format!(
            "{}({}, $FieldAddress({}, {}))",
            read_fn(ty),
            heap(ty),
            field,
            object
        )
    }

    fn write_instance_field(
        &self,
        field: &str,
        object: &str,
        ty: BoogieType,
        value: &str,
    ) -> String {
        format!(
            "{} := {}({}, $FieldAddress({}, {}), {});",
            heap(ty),
            write_fn(ty),
            heap(ty),
            field,
            object,
            value
        )
    }

    fn read_static_field(&self, field: &str, ty: BoogieType) -> String {
        format!(
            "{}({}, $StaticFieldAddress({}))",
            read_fn(ty),
            heap(ty),
            field
        )
    }

    fn write_static_field(&self, field: &str, ty: BoogieType, value: &str) -> String {
        format!(
            "{} := {}({}, $StaticFieldAddress({}), {});",
            heap(ty),
            write_fn(ty),
            heap(ty),
            field,
            value
        )
    }

    fn read_deref(&self, address: &str, ty: BoogieType) -> String {
        format!("{}({}, {})", read_fn(ty), heap(ty), address)
    }

    fn write_deref(&self, address: &str, ty: BoogieType, value: &str) -> String {
        format!(
            "{} := {}({}, {}, {});",
            heap(ty),
            write_fn(ty),
            heap(ty),
            address,
            value
        )
    }

    fn local_declaration(&self, name: &str, _ty: BoogieType) -> String {
        format!("var {} : Addr;", Self::cell(name))
    }

    fn field_declaration(&self, field: &str, _ty: BoogieType, _is_static: bool) -> String {
        format!("const unique {} : Field;", field)
    }

    fn var_address(&self, name: &str) -> Option<String> {
        Some(Self::cell(name))
    }

    fn parameter(&self, name: &str, ty: BoogieType, by_ref: bool) -> ParameterLowering {
        if by_ref {
            // The address itself is the parameter; reads and writes go
            // through the typed heaps.
            return ParameterLowering {
                signature: (name.to_string(), BoogieType::Addr),
                local: None,
                entry: Vec::new(),
            };
        }
        ParameterLowering {
            signature: (format!("{}$in", name), ty),
            local: Some((name.to_string(), ty)),
            entry: vec![self.write_var(name, ty, &format!("{}$in", name))],
        }
    }

    fn entry_statements(&self, locals: &[(String, BoogieType)]) -> Vec<String> {
        locals
            .iter()
            .map(|(name, _)| format!("call {} := AllocAddr();", Self::cell(name)))
            .collect()
    }

    fn by_ref_outputs(&self, _by_ref_params: &[(String, BoogieType)]) -> Vec<(String, BoogieType)> {
        Vec::new()
    }

    fn return_epilogue(&self, _by_ref_params: &[(String, BoogieType)]) -> Vec<String> {
        Vec::new()
    }
}
