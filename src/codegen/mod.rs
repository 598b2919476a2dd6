//! Code generation
//!
//! Consumes classified member lists and emits Rust source: a staged builder
//! and an immutable value + codec registration per contract. The emitters
//! never re-classify — they only lower [`Member`]s through the
//! [`RenderProfile`].
//!
//! Output is deterministic: the same contract set produces byte-identical
//! source on every run, and the header carries the set's fingerprint so
//! drift between IR and generated code is detectable.

pub mod builder;
pub mod dto;
pub mod names;
pub mod profile;

use std::fmt::Write;

use crate::classify::{classify, Member};
use crate::error::ClassifyError;
use crate::ir::{
    CollectionShape, ContractDef, ContractId, ContractSet, MapKey, ScalarType, TypeRef,
};
pub use profile::RenderProfile;

use names::{accessor_name, to_snake_case};

/// Everything the emitters need for one contract
pub(crate) struct EmitPlan<'a> {
    pub def: &'a ContractDef,
    pub members: Vec<Member>,
    pub trait_name: String,
    pub value_name: String,
    pub module_name: String,
}

/// Synthesizes builders and value/codec modules from a contract set
pub struct Synthesizer<'a> {
    set: &'a ContractSet,
    profile: RenderProfile,
}

impl<'a> Synthesizer<'a> {
    pub fn new(set: &'a ContractSet, profile: RenderProfile) -> Self {
        Self { set, profile }
    }

    /// Generate the full output file for every contract in the set
    pub fn generate_all(&self) -> Result<String, ClassifyError> {
        let mut out = String::new();
        out.push_str("//! Generated by dtoforge-gen - DO NOT EDIT\n");
        out.push_str("//!\n");
        let _ = writeln!(out, "//! Contract set fingerprint: {}", self.set.fingerprint());
        out.push_str("//!\n");
        out.push_str("//! Regenerate with `dtoforge-gen generate` from the project root.\n\n");
        out.push_str("#![allow(unused_imports, clippy::redundant_clone)]\n\n");

        for id in self.set.ids() {
            out.push_str(&self.generate_contract(id)?);
            out.push('\n');
        }
        Ok(out)
    }

    /// Generate one contract's module: trait, value, builder, registration
    pub fn generate_contract(&self, id: &ContractId) -> Result<String, ClassifyError> {
        let def = self
            .set
            .get(id)
            .ok_or_else(|| ClassifyError::UnknownContract(id.clone()))?;
        let members = classify(self.set, id)?;
        let trait_name = def.rust_name().to_string();
        let plan = EmitPlan {
            def,
            members,
            value_name: self.profile.value_name(&trait_name),
            module_name: to_snake_case(&trait_name),
            trait_name,
        };

        let mut out = String::new();
        let _ = writeln!(out, "pub mod {} {{", plan.module_name);
        out.push_str(MODULE_IMPORTS);
        out.push('\n');
        let _ = writeln!(
            out,
            "    pub static CONTRACT_ID: ContractId = ContractId::from_static({:?});\n",
            plan.def.id.as_str()
        );
        out.push_str(&dto::emit_trait(self.set, &plan));
        out.push_str(&dto::emit_value(self.set, &plan, &self.profile));
        out.push_str(&builder::emit_builder(self.set, &plan, &self.profile));
        out.push_str(&dto::emit_registration(self.set, &plan));
        out.push_str("}\n");
        Ok(out)
    }
}

const MODULE_IMPORTS: &str = "    use std::any::{Any, TypeId};
    use std::borrow::Cow;
    use std::collections::{BTreeSet, HashMap, HashSet};
    use std::fmt;
    use std::sync::Arc;

    use serde_json::Value;

    use dtoforge::classify::{Member, MemberKind};
    use dtoforge::contract::{
        ContractDescriptor, ContractRegistry, ContractValue, DecodedFields, FieldValue,
        NamedEnum, Serializable, TypeToken,
    };
    use dtoforge::contract_cast;
    use dtoforge::error::{DeserializationError, SerializationError, ValidationError};
    use dtoforge::ir::{CollectionShape, ContractId, MapKey, ScalarType, TypeRef, ValidatorRef};
    use dtoforge::validate::{FieldValidator, InstanceValidator};
";

// ---------------------------------------------------------------------------
// Shared lowering helpers
// ---------------------------------------------------------------------------

/// Reference to a sibling contract's trait from inside `current_module`
pub(crate) fn trait_ref(set: &ContractSet, current_module: &str, id: &ContractId) -> String {
    let name = set
        .get(id)
        .map(|d| d.rust_name().to_string())
        .unwrap_or_else(|| id.simple_name().to_string());
    let module = to_snake_case(&name);
    if module == current_module {
        name
    } else {
        format!("super::{module}::{name}")
    }
}

/// Reference to a sibling contract's `CONTRACT_ID` static
pub(crate) fn contract_id_ref(set: &ContractSet, current_module: &str, id: &ContractId) -> String {
    let name = set
        .get(id)
        .map(|d| d.rust_name().to_string())
        .unwrap_or_else(|| id.simple_name().to_string());
    let module = to_snake_case(&name);
    if module == current_module {
        "CONTRACT_ID".to_string()
    } else {
        format!("super::{module}::CONTRACT_ID")
    }
}

/// The type a member is stored and set as. When a subtype narrows an
/// inherited member's contract type, storage keeps the original (widest)
/// declaration so trait accessor signatures stay coherent; the descriptor
/// still records the narrowed type for codec dispatch.
pub(crate) fn emission_ty(set: &ContractSet, def: &ContractDef, member: &Member) -> TypeRef {
    let ancestors = set.ancestors(&def.id).unwrap_or_default();
    for ancestor in ancestors.iter().rev() {
        if let Some(ancestor_def) = set.get(ancestor) {
            if let Some(decl) = ancestor_def
                .members
                .iter()
                .find(|d| d.field_name == member.field_name)
            {
                return decl.ty.clone();
            }
        }
    }
    member.ty.clone()
}

/// Owned Rust type for struct fields and builder parameters
pub(crate) fn owned_type(set: &ContractSet, current_module: &str, ty: &TypeRef) -> String {
    match ty {
        TypeRef::Scalar(s) => s.rust_type().to_string(),
        TypeRef::Enum { name } => name.clone(),
        TypeRef::Collection { shape, element } => {
            let elem = owned_type(set, current_module, element);
            match shape {
                CollectionShape::List => format!("Vec<{elem}>"),
                CollectionShape::Set => format!("HashSet<{elem}>"),
                CollectionShape::SortedSet => format!("BTreeSet<{elem}>"),
            }
        }
        TypeRef::Map { key, value } => {
            let k = match key {
                MapKey::String => "String".to_string(),
                MapKey::Enum { name } => name.clone(),
            };
            format!("HashMap<{k}, {}>", owned_type(set, current_module, value))
        }
        TypeRef::Contract(id) => format!("Arc<dyn {}>", trait_ref(set, current_module, id)),
        TypeRef::Opaque { type_name } => type_name.clone(),
    }
}

/// Accessor return type: borrowed views for non-`Copy` data, `Option` for
/// nullable members. Collections and maps are never optional — they default
/// to empty instead.
pub(crate) fn accessor_type(
    set: &ContractSet,
    current_module: &str,
    ty: &TypeRef,
    nullable: bool,
) -> String {
    match ty {
        TypeRef::Scalar(ScalarType::String) => {
            if nullable {
                "Option<&str>".to_string()
            } else {
                "&str".to_string()
            }
        }
        TypeRef::Scalar(s) => {
            if nullable {
                format!("Option<{}>", s.rust_type())
            } else {
                s.rust_type().to_string()
            }
        }
        TypeRef::Enum { name } => {
            if nullable {
                format!("Option<&{name}>")
            } else {
                format!("&{name}")
            }
        }
        TypeRef::Collection { shape, element } => {
            let elem = owned_type(set, current_module, element);
            match shape {
                CollectionShape::List => format!("&[{elem}]"),
                CollectionShape::Set => format!("&HashSet<{elem}>"),
                CollectionShape::SortedSet => format!("&BTreeSet<{elem}>"),
            }
        }
        TypeRef::Map { .. } => format!("&{}", owned_type(set, current_module, ty)),
        TypeRef::Contract(id) => {
            let t = trait_ref(set, current_module, id);
            if nullable {
                format!("Option<Arc<dyn {t}>>")
            } else {
                format!("Arc<dyn {t}>")
            }
        }
        TypeRef::Opaque { type_name } => {
            if nullable {
                format!("Option<&{type_name}>")
            } else {
                format!("&{type_name}")
            }
        }
    }
}

/// Expression for the accessor body, reading `self.<field>`
pub(crate) fn accessor_body(member_field: &str, ty: &TypeRef, nullable: bool) -> String {
    let field = format!("self.{member_field}");
    match ty {
        TypeRef::Scalar(ScalarType::String) => {
            if nullable {
                format!("{field}.as_deref()")
            } else {
                format!("&{field}")
            }
        }
        TypeRef::Scalar(_) => field,
        TypeRef::Enum { .. } => {
            if nullable {
                format!("{field}.as_ref()")
            } else {
                format!("&{field}")
            }
        }
        TypeRef::Collection { .. } | TypeRef::Map { .. } => format!("&{field}"),
        TypeRef::Contract(_) => {
            if nullable {
                format!("{field}.as_ref().map(Arc::clone)")
            } else {
                format!("Arc::clone(&{field})")
            }
        }
        TypeRef::Opaque { .. } => {
            if nullable {
                format!("{field}.as_ref()")
            } else {
                format!("&{field}")
            }
        }
    }
}

/// `FieldValue` view of a member, from any receiver expression (a struct
/// field for `Serializable::member`, a local for validator calls)
pub(crate) fn field_view_expr(receiver: &str, ty: &TypeRef, nullable: bool) -> String {
    if nullable {
        return match ty {
            TypeRef::Scalar(ScalarType::String) => {
                format!("FieldValue::opt_str({receiver}.as_deref())")
            }
            TypeRef::Scalar(s) => format!(
                "match {receiver} {{ Some(v) => {}, None => FieldValue::Null }}",
                scalar_view("v", *s)
            ),
            TypeRef::Enum { .. } => format!(
                "match &{receiver} {{ Some(v) => FieldValue::EnumName(v.name()), None => FieldValue::Null }}"
            ),
            TypeRef::Contract(_) => format!(
                "match &{receiver} {{ Some(v) => FieldValue::Contract(v.as_serializable()), None => FieldValue::Null }}"
            ),
            TypeRef::Opaque { type_name } => format!(
                "match &{receiver} {{ Some(v) => FieldValue::Opaque(v, {type_name:?}), None => FieldValue::Null }}"
            ),
            // Collections and maps ignore the nullable flag
            other => field_view_expr(receiver, other, false),
        };
    }
    match ty {
        TypeRef::Scalar(ScalarType::String) => format!("FieldValue::str(&{receiver})"),
        TypeRef::Scalar(s) => scalar_view(receiver, *s),
        TypeRef::Enum { .. } => format!("FieldValue::EnumName({receiver}.name())"),
        TypeRef::Collection { element, .. } => format!(
            "FieldValue::Items({receiver}.iter().map(|v| {}).collect())",
            element_view("v", element)
        ),
        TypeRef::Map { key, value } => {
            let key_expr = match key {
                MapKey::String => "Cow::Borrowed(k.as_str())".to_string(),
                MapKey::Enum { .. } => "Cow::Borrowed(k.name())".to_string(),
            };
            format!(
                "FieldValue::Entries({receiver}.iter().map(|(k, v)| ({key_expr}, {})).collect())",
                element_view("v", value)
            )
        }
        TypeRef::Contract(_) => format!("FieldValue::Contract({receiver}.as_serializable())"),
        TypeRef::Opaque { type_name } => {
            format!("FieldValue::Opaque(&{receiver}, {type_name:?})")
        }
    }
}

fn scalar_view(receiver: &str, s: ScalarType) -> String {
    match s {
        ScalarType::Bool => format!("FieldValue::Bool({receiver})"),
        ScalarType::I64 => format!("FieldValue::Int({receiver})"),
        ScalarType::I8 | ScalarType::I16 | ScalarType::I32 => {
            format!("FieldValue::Int(i64::from({receiver}))")
        }
        ScalarType::F64 => format!("FieldValue::Float({receiver})"),
        ScalarType::F32 => format!("FieldValue::Float(f64::from({receiver}))"),
        ScalarType::Char => format!("FieldValue::Str(Cow::Owned({receiver}.to_string()))"),
        ScalarType::String => format!("FieldValue::str(&{receiver})"),
    }
}

/// Element view inside collection/map iteration, where `var` is `&T`
fn element_view(var: &str, ty: &TypeRef) -> String {
    match ty {
        TypeRef::Scalar(ScalarType::String) => format!("FieldValue::str({var})"),
        TypeRef::Scalar(ScalarType::Bool) => format!("FieldValue::Bool(*{var})"),
        TypeRef::Scalar(ScalarType::I64) => format!("FieldValue::Int(*{var})"),
        TypeRef::Scalar(ScalarType::I8)
        | TypeRef::Scalar(ScalarType::I16)
        | TypeRef::Scalar(ScalarType::I32) => format!("FieldValue::Int(i64::from(*{var}))"),
        TypeRef::Scalar(ScalarType::F64) => format!("FieldValue::Float(*{var})"),
        TypeRef::Scalar(ScalarType::F32) => format!("FieldValue::Float(f64::from(*{var}))"),
        TypeRef::Scalar(ScalarType::Char) => {
            format!("FieldValue::Str(Cow::Owned({var}.to_string()))")
        }
        TypeRef::Enum { .. } => format!("FieldValue::EnumName({var}.name())"),
        TypeRef::Contract(_) => format!("FieldValue::Contract({var}.as_serializable())"),
        TypeRef::Opaque { type_name } => format!("FieldValue::Opaque({var}, {type_name:?})"),
        TypeRef::Collection { .. } | TypeRef::Map { .. } => {
            // Classification rejects nested collections; unreachable output
            "FieldValue::Null".to_string()
        }
    }
}

/// Statement decoding one member inside the construct function
pub(crate) fn construct_stmt(
    set: &ContractSet,
    current_module: &str,
    member: &Member,
    ty: &TypeRef,
) -> String {
    let var = accessor_name(&member.field_name);
    let field = &member.field_name;
    let rhs = match (ty, member.nullable) {
        (TypeRef::Scalar(ScalarType::Bool), false) => format!("fields.take_bool({field:?})?"),
        (TypeRef::Scalar(ScalarType::Bool), true) => format!("fields.take_opt_bool({field:?})?"),
        (TypeRef::Scalar(ScalarType::I8), false) => format!("fields.take_i8({field:?})?"),
        (TypeRef::Scalar(ScalarType::I16), false) => format!("fields.take_i16({field:?})?"),
        (TypeRef::Scalar(ScalarType::I32), false) => format!("fields.take_i32({field:?})?"),
        (TypeRef::Scalar(ScalarType::I64), false) => format!("fields.take_i64({field:?})?"),
        (TypeRef::Scalar(ScalarType::I64), true) => format!("fields.take_opt_i64({field:?})?"),
        (TypeRef::Scalar(ScalarType::I8 | ScalarType::I16 | ScalarType::I32), true) => format!(
            "fields.take_opt_i64({field:?})?.map(|v| v as {})",
            ty_scalar_name(ty)
        ),
        (TypeRef::Scalar(ScalarType::F64), false) => format!("fields.take_f64({field:?})?"),
        (TypeRef::Scalar(ScalarType::F32), false) => {
            format!("fields.take_f64({field:?})? as f32")
        }
        (TypeRef::Scalar(ScalarType::F64), true) => format!("fields.take_opt_f64({field:?})?"),
        (TypeRef::Scalar(ScalarType::F32), true) => {
            format!("fields.take_opt_f64({field:?})?.map(|v| v as f32)")
        }
        (TypeRef::Scalar(ScalarType::Char), false) => format!("fields.take_char({field:?})?"),
        (TypeRef::Scalar(ScalarType::Char), true) => format!(
            "fields.take_opt_string({field:?})?.and_then(|s| s.chars().next())"
        ),
        (TypeRef::Scalar(ScalarType::String), false) => format!("fields.take_string({field:?})?"),
        (TypeRef::Scalar(ScalarType::String), true) => {
            format!("fields.take_opt_string({field:?})?")
        }
        (TypeRef::Enum { name }, false) => format!("fields.take_enum::<{name}>({field:?})?"),
        (TypeRef::Enum { name }, true) => format!("fields.take_opt_enum::<{name}>({field:?})?"),
        (TypeRef::Collection { element, .. }, _) => {
            let container = owned_type(set, current_module, ty);
            format!(
                "fields.take_collect::<{container}, _>({field:?}, |f, v| {})?",
                element_take("f", "v", field, set, current_module, element)
            )
        }
        (TypeRef::Map { key, value }, _) => {
            let elem = element_take("f", "v", field, set, current_module, value);
            match key {
                MapKey::String => format!("fields.take_string_map({field:?}, |f, v| {elem})?"),
                MapKey::Enum { name } => {
                    format!("fields.take_enum_map::<{name}, _>({field:?}, |f, v| {elem})?")
                }
            }
        }
        (TypeRef::Contract(id), false) => {
            let t = trait_ref(set, current_module, id);
            let id_ref = contract_id_ref(set, current_module, id);
            format!(
                "Arc::from(fields.take_contract::<Box<dyn {t}>>({field:?}, &{id_ref})?)"
            )
        }
        (TypeRef::Contract(id), true) => {
            let t = trait_ref(set, current_module, id);
            let id_ref = contract_id_ref(set, current_module, id);
            format!(
                "fields.take_opt_contract::<Box<dyn {t}>>({field:?}, &{id_ref})?.map(Arc::from)"
            )
        }
        (TypeRef::Opaque { type_name }, false) => {
            format!("fields.take_opaque::<{type_name}>({field:?})?")
        }
        (TypeRef::Opaque { type_name }, true) => {
            format!("fields.take_opt_opaque::<{type_name}>({field:?})?")
        }
    };
    format!("        let {var} = {rhs};\n")
}

fn element_take(
    fields_var: &str,
    value_var: &str,
    field: &str,
    set: &ContractSet,
    current_module: &str,
    ty: &TypeRef,
) -> String {
    match ty {
        TypeRef::Scalar(ScalarType::Bool) => {
            format!("{fields_var}.elem_bool({field:?}, {value_var})")
        }
        TypeRef::Scalar(ScalarType::I64) => {
            format!("{fields_var}.elem_i64({field:?}, {value_var})")
        }
        TypeRef::Scalar(ScalarType::I8 | ScalarType::I16 | ScalarType::I32) => format!(
            "{fields_var}.elem_i64({field:?}, {value_var}).map(|n| n as {})",
            ty_scalar_name(ty)
        ),
        TypeRef::Scalar(ScalarType::F64) => {
            format!("{fields_var}.elem_f64({field:?}, {value_var})")
        }
        TypeRef::Scalar(ScalarType::F32) => format!(
            "{fields_var}.elem_f64({field:?}, {value_var}).map(|n| n as f32)"
        ),
        TypeRef::Scalar(ScalarType::Char | ScalarType::String) => {
            format!("{fields_var}.elem_string({field:?}, {value_var})")
        }
        TypeRef::Enum { name } => {
            format!("{fields_var}.elem_enum::<{name}>({field:?}, {value_var})")
        }
        TypeRef::Contract(id) => {
            let t = trait_ref(set, current_module, id);
            let id_ref = contract_id_ref(set, current_module, id);
            format!(
                "{fields_var}.element_contract::<Box<dyn {t}>>({field:?}, &{id_ref}, {value_var}).map(Arc::from)"
            )
        }
        TypeRef::Opaque { type_name } => {
            format!("{fields_var}.elem_opaque::<{type_name}>({field:?}, {value_var})")
        }
        TypeRef::Collection { .. } | TypeRef::Map { .. } => {
            // Classification rejects these elements before emission
            format!("Err({fields_var}.unsupported_element({field:?}))")
        }
    }
}

fn ty_scalar_name(ty: &TypeRef) -> &'static str {
    match ty {
        TypeRef::Scalar(s) => s.rust_type(),
        _ => "i64",
    }
}

/// Rust literal expression reconstructing a `TypeRef`
pub(crate) fn typeref_literal(ty: &TypeRef) -> String {
    match ty {
        TypeRef::Scalar(s) => format!("TypeRef::Scalar(ScalarType::{s:?})"),
        TypeRef::Enum { name } => format!("TypeRef::Enum {{ name: {name:?}.to_string() }}"),
        TypeRef::Collection { shape, element } => format!(
            "TypeRef::Collection {{ shape: CollectionShape::{shape:?}, element: Box::new({}) }}",
            typeref_literal(element)
        ),
        TypeRef::Map { key, value } => {
            let k = match key {
                MapKey::String => "MapKey::String".to_string(),
                MapKey::Enum { name } => format!("MapKey::Enum {{ name: {name:?}.to_string() }}"),
            };
            format!(
                "TypeRef::Map {{ key: {k}, value: Box::new({}) }}",
                typeref_literal(value)
            )
        }
        TypeRef::Contract(id) => {
            format!("TypeRef::Contract(ContractId::from_static({:?}))", id.as_str())
        }
        TypeRef::Opaque { type_name } => {
            format!("TypeRef::Opaque {{ type_name: {type_name:?}.to_string() }}")
        }
    }
}

/// Rust literal expression reconstructing a classified `Member`
pub(crate) fn member_literal(member: &Member) -> String {
    let validator = match &member.validator {
        Some(v) => format!("Some(ValidatorRef::new({:?}))", v.name()),
        None => "None".to_string(),
    };
    format!(
        "Member {{ field_name: {:?}.to_string(), wire_name: {:?}.to_string(), ty: {}, \
         kind: MemberKind::{:?}, nullable: {}, forms_id: {}, validator: {validator}, \
         declared_by: ContractId::from_static({:?}) }}",
        member.field_name,
        member.wire_name,
        typeref_literal(&member.ty),
        member.kind,
        member.nullable,
        member.forms_id,
        member.declared_by.as_str(),
    )
}
