use std::collections::HashMap;
use std::fmt;

use tacit_ir::{Constant, FieldRef, MethodId, PrimitiveKind, Program, TypeId, TypeKind, Value};
use tracing::trace;

use crate::error::TranslateError;

/// The Boogie type lattice. `Union` is an alias of `Ref`; `Addr` only
/// appears under the address memory model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoogieType {
    Int,
    Bool,
    Real,
    Ref,
    Void,
    Addr,
}

impl BoogieType {
    /// Name of the primitive-to-union wrapper, when this type needs one.
    pub fn to_union(self) -> Option<&'static str> {
        match self {
            BoogieType::Int => Some("Int2Union"),
            BoogieType::Bool => Some("Bool2Union"),
            BoogieType::Real => Some("Real2Union"),
            BoogieType::Ref | BoogieType::Void | BoogieType::Addr => None,
        }
    }

    pub fn from_union(self) -> Option<&'static str> {
        match self {
            BoogieType::Int => Some("Union2Int"),
            BoogieType::Bool => Some("Union2Bool"),
            BoogieType::Real => Some("Union2Real"),
            BoogieType::Ref | BoogieType::Void | BoogieType::Addr => None,
        }
    }

    /// The neutral value a location of this type is initialized to.
    pub fn zero(self) -> Option<&'static str> {
        match self {
            BoogieType::Int => Some("0"),
            BoogieType::Bool => Some("false"),
            BoogieType::Real => Some("0.0"),
            BoogieType::Ref => Some("null"),
            BoogieType::Void | BoogieType::Addr => None,
        }
    }
}

impl fmt::Display for BoogieType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            BoogieType::Int => "int",
            BoogieType::Bool => "bool",
            BoogieType::Real => "real",
            BoogieType::Ref => "Ref",
            BoogieType::Void => "Void",
            BoogieType::Addr => "Addr",
        };
        f.write_str(text)
    }
}

/// Maps a source type onto the Boogie lattice. Total over the closed type
/// model: every integer code collapses to `int`, floats to `real`, strings
/// and all other reference shapes to `Ref`, and pointers resolve through
/// their target.
pub fn boogie_type(program: &Program, ty: TypeId) -> BoogieType {
    match &program.type_def(ty).kind {
        TypeKind::Primitive(kind) => match kind {
            PrimitiveKind::Bool => BoogieType::Bool,
            PrimitiveKind::Int32 | PrimitiveKind::Int64 | PrimitiveKind::NativeUInt => {
                BoogieType::Int
            }
            PrimitiveKind::Float32 | PrimitiveKind::Float64 => BoogieType::Real,
            PrimitiveKind::Str => BoogieType::Ref,
            PrimitiveKind::Void => BoogieType::Void,
        },
        TypeKind::Pointer { target } => boogie_type(program, *target),
        TypeKind::Reference | TypeKind::Array { .. } | TypeKind::Generic { .. } => BoogieType::Ref,
    }
}

/// The Boogie type of an operand in expression position.
pub fn value_boogie_type(program: &Program, value: &Value) -> BoogieType {
    match value {
        Value::Var { ty, .. } => boogie_type(program, *ty),
        Value::Const(constant) => match constant {
            Constant::Int(_) => BoogieType::Int,
            Constant::Real(_) => BoogieType::Real,
            Constant::Bool(_) => BoogieType::Bool,
            Constant::Str(_) | Constant::Null => BoogieType::Ref,
        },
        Value::InstanceField { field, .. } | Value::StaticField { field } => {
            boogie_type(program, field.ty)
        }
        Value::ArrayElement { element, .. } => boogie_type(program, *element),
        Value::ArrayLength { .. } => BoogieType::Int,
        Value::Deref { reference } => value_boogie_type(program, reference),
        Value::MethodPtr { .. } => BoogieType::Ref,
    }
}

/// The declared source type of an operand, when it has one.
pub fn value_source_type(program: &Program, value: &Value) -> Option<TypeId> {
    match value {
        Value::Var { ty, .. } => Some(*ty),
        Value::Const(Constant::Str(_)) => program.types.primitive(PrimitiveKind::Str),
        Value::Const(_) => None,
        Value::InstanceField { field, .. } | Value::StaticField { field } => Some(field.ty),
        Value::ArrayElement { element, .. } => Some(*element),
        Value::ArrayLength { .. } => program.types.primitive(PrimitiveKind::NativeUInt),
        Value::Deref { reference } => value_source_type(program, reference),
        Value::MethodPtr { .. } => None,
    }
}

pub fn is_string_value(program: &Program, value: &Value) -> bool {
    match value {
        Value::Const(Constant::Str(_)) => true,
        _ => value_source_type(program, value)
            .map(|ty| program.types.is_string(program.types.strip_pointers(ty)))
            .unwrap_or(false),
    }
}

fn is_identifier_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric()
        || matches!(ch, '\'' | '~' | '#' | '$' | '^' | '_' | '.' | '?' | '`')
}

/// Rewrites arbitrary signature text into a valid Boogie identifier: known
/// array-rank bracket patterns become readable suffixes, characters outside
/// the Boogie identifier alphabet become `$`, code points beyond the basic
/// multilingual plane are dropped outright, and stray NUL terminators are
/// trimmed.
pub fn turn_into_valid_identifier(text: &str) -> String {
    let rewritten = text
        .trim_matches('\u{0}')
        .replace("[0:,0:,0:,0:,0:]", "5DArray")
        .replace("[0:,0:,0:,0:]", "4DArray")
        .replace("[0:,0:,0:]", "3DArray")
        .replace("[0:,0:]", "2DArray")
        .replace("[]", "array");
    let mut result = String::with_capacity(rewritten.len());
    for ch in rewritten.chars() {
        if is_identifier_char(ch) {
            result.push(ch);
        } else if (ch as u32) < 0x10000 {
            result.push('$');
        }
    }
    result
}

/// Collision-resistant procedure name for a method. Generic instantiations
/// are unspecialized first so one identifier covers the whole family; the
/// documentation signature then disambiguates by full qualification,
/// parameter types and arity before escaping.
pub fn unique_method_name(program: &Program, method: MethodId) -> String {
    let unspecialized = program.unspecialized_method(method);
    let signature = program.doc_signature(unspecialized);
    // Strip the fixed two-character member prefix and the closing paren; the
    // remaining separators all escape to `$`.
    let bare = signature[2..].trim_end_matches(')');
    turn_into_valid_identifier(bare)
}

/// Identifier for a type, shared by all instantiations of one generic
/// definition. Compiler-generated member prefixes normalize the way the
/// downstream toolchain expects.
pub fn normalized_type_name(program: &Program, ty: TypeId) -> String {
    let unspecialized = program.types.unspecialized(ty);
    let cleaned = program
        .type_name(unspecialized)
        .replace("::", ".")
        .replace("<>", "__")
        .replace(['<', '>', ',', '='], "$")
        .replace("[]", "$Array$");
    turn_into_valid_identifier(&cleaned)
}

/// The `T$Name` constant naming a class's type constructor.
pub fn type_constructor_name(program: &Program, ty: TypeId) -> String {
    format!("T${}", normalized_type_name(program, ty))
}

/// The map or global holding a field's contents.
pub fn field_name(program: &Program, field: &FieldRef) -> String {
    format!(
        "F${}.{}",
        normalized_type_name(program, field.declaring_type),
        turn_into_valid_identifier(&field.name)
    )
}

const NULL_STRING_CONSTANT: &str = "$string_literal_NullValue";

fn is_literal_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '_' | '.' | '$' | '\'' | '`' | '~' | '^' | '?')
}

/// Deduplicating table of string-literal constants.
///
/// Literal text escapes through a `#<code>#` scheme whose per-character
/// codes are assigned on first sighting and shared across all literals, so
/// equal text always produces an identical constant name within a run. The
/// space character is pre-seeded as code zero and `#` escapes by doubling.
#[derive(Debug)]
pub struct StringInterner {
    entries: Vec<(String, String)>,
    by_text: HashMap<String, usize>,
    char_codes: HashMap<char, u32>,
    next_code: u32,
}

impl Default for StringInterner {
    fn default() -> Self {
        let mut char_codes = HashMap::new();
        char_codes.insert(' ', 0);
        Self {
            entries: Vec::new(),
            by_text: HashMap::new(),
            char_codes,
            next_code: 1,
        }
    }
}

impl StringInterner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns a quote-delimited literal, returning its constant name.
    /// Re-requesting the same text returns the same name without advancing
    /// any escape code.
    pub fn intern(&mut self, literal: &str, method: &str) -> Result<String, TranslateError> {
        if literal.len() < 2 || !literal.starts_with('"') || !literal.ends_with('"') {
            return Err(TranslateError::MalformedStringLiteral {
                method: method.to_string(),
                literal: literal.to_string(),
            });
        }
        let text = &literal[1..literal.len() - 1];
        if let Some(&index) = self.by_text.get(text) {
            return Ok(self.entries[index].1.clone());
        }

        let mut escaped = String::with_capacity(text.len());
        for ch in text.chars() {
            if ch == '#' {
                escaped.push_str("##");
            } else if is_literal_char(ch) {
                escaped.push(ch);
            } else {
                let code = match self.char_codes.get(&ch) {
                    Some(&code) => code,
                    None => {
                        let assigned = self.next_code;
                        self.next_code += 1;
                        self.char_codes.insert(ch, assigned);
                        assigned
                    }
                };
                escaped.push('#');
                escaped.push_str(&code.to_string());
                escaped.push('#');
            }
        }
        let name = format!("$string_literal_{}", escaped);
        trace!(text, constant = %name, "interned string literal");
        self.by_text.insert(text.to_string(), self.entries.len());
        self.entries.push((text.to_string(), name.clone()));
        Ok(name)
    }

    /// Constant naming the null string.
    pub fn null_constant(&self) -> &'static str {
        NULL_STRING_CONSTANT
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Interned constant names in first-interned order.
    pub fn constants(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(_, name)| name.as_str())
    }
}
