//! Value/codec emission
//!
//! Per contract: the accessor trait, the immutable value struct (typed
//! fields plus the canonical JSON document decoded values own), the dynamic
//! member view the codec drives, identity equality/hash, and the
//! registration glue wiring descriptor, construct function and trait-object
//! casts into a [`ContractRegistry`].

use std::fmt::Write;

use crate::classify::Member;
use crate::ir::{ContractDef, ContractSet, MemberDecl, TypeRef};

use super::names::accessor_name;
use super::profile::RenderProfile;
use super::{
    accessor_body, accessor_type, construct_stmt, contract_id_ref, emission_ty, field_view_expr,
    member_literal, owned_type, trait_ref, EmitPlan,
};

/// Accessors a contract's own trait declares: its own declarations minus
/// overrides of inherited members (those keep the ancestor's signature)
fn own_accessor_decls<'a>(set: &ContractSet, def: &'a ContractDef) -> Vec<&'a MemberDecl> {
    let ancestors = set.ancestors(&def.id).unwrap_or_default();
    def.members
        .iter()
        .filter(|decl| {
            !ancestors.iter().any(|ancestor| {
                set.get(ancestor)
                    .map(|a| a.members.iter().any(|m| m.field_name == decl.field_name))
                    .unwrap_or(false)
            })
        })
        .collect()
}

pub(crate) fn emit_trait(set: &ContractSet, plan: &EmitPlan<'_>) -> String {
    let mut out = String::new();
    let supertraits = if plan.def.extends.is_empty() {
        "Serializable".to_string()
    } else {
        plan.def
            .extends
            .iter()
            .map(|p| trait_ref(set, &plan.module_name, p))
            .collect::<Vec<_>>()
            .join(" + ")
    };

    let _ = writeln!(out, "    /// {}", plan.def.id);
    let _ = writeln!(out, "    pub trait {}: {supertraits} {{", plan.trait_name);
    for decl in own_accessor_decls(set, plan.def) {
        let name = accessor_name(&decl.field_name);
        let ret = accessor_type(set, &plan.module_name, &decl.ty, decl.nullable);
        let _ = writeln!(out, "        fn {name}(&self) -> {ret};");
    }
    out.push_str("    }\n\n");
    out
}

pub(crate) fn emit_value(set: &ContractSet, plan: &EmitPlan<'_>, _profile: &RenderProfile) -> String {
    let mut out = String::new();
    let value = &plan.value_name;

    // Struct
    let _ = writeln!(out, "    pub struct {value} {{");
    for member in &plan.members {
        let field = accessor_name(&member.field_name);
        let ty = emission_ty(set, plan.def, member);
        let owned = owned_type(set, &plan.module_name, &ty);
        if member.nullable && !is_container(&ty) {
            let _ = writeln!(out, "        {field}: Option<{owned}>,");
        } else {
            let _ = writeln!(out, "        {field}: {owned},");
        }
    }
    out.push_str("        canonical: Option<Value>,\n");
    out.push_str("    }\n\n");

    // Accessor impls: this contract's trait plus every ancestor trait
    emit_trait_impl(&mut out, set, plan, &plan.def.id);
    for ancestor in set.ancestors(&plan.def.id).unwrap_or_default() {
        emit_trait_impl(&mut out, set, plan, &ancestor);
    }

    // Serializable
    let _ = writeln!(out, "    impl Serializable for {value} {{");
    out.push_str("        fn type_token(&self) -> TypeToken {\n            TypeToken::of::<Self>()\n        }\n\n");
    if plan.def.is_generatable() {
        let _ = writeln!(
            out,
            "        fn contract_ids(&self) -> &'static [ContractId] {{\n            static IDS: [ContractId; 1] = [ContractId::from_static({:?})];\n            &IDS\n        }}\n",
            plan.def.id.as_str()
        );
    } else {
        out.push_str(
            "        fn contract_ids(&self) -> &'static [ContractId] {\n            &[]\n        }\n\n",
        );
    }
    out.push_str("        fn member(&self, field_name: &str) -> FieldValue<'_> {\n");
    out.push_str("            match field_name {\n");
    for member in &plan.members {
        let field = accessor_name(&member.field_name);
        let ty = emission_ty(set, plan.def, member);
        let view = field_view_expr(&format!("self.{field}"), &ty, member.nullable);
        let _ = writeln!(out, "                {:?} => {view},", member.field_name);
    }
    out.push_str("                _ => FieldValue::Null,\n");
    out.push_str("            }\n        }\n\n");
    out.push_str("        fn as_any(&self) -> &dyn Any {\n            self\n        }\n\n");
    out.push_str("        fn as_serializable(&self) -> &dyn Serializable {\n            self\n        }\n");
    out.push_str("    }\n\n");

    // ContractValue
    let _ = writeln!(out, "    impl ContractValue for {value} {{");
    out.push_str("        fn contract_id(&self) -> &ContractId {\n            &CONTRACT_ID\n        }\n\n");
    out.push_str("        fn canonical_json(&self) -> Option<&Value> {\n            self.canonical.as_ref()\n        }\n\n");
    out.push_str("        fn into_any(self: Box<Self>) -> Box<dyn Any> {\n            self\n        }\n");
    out.push_str("    }\n\n");

    emit_identity(&mut out, plan);
    emit_debug(&mut out, plan);
    emit_construct(&mut out, set, plan);
    out
}

fn emit_trait_impl(
    out: &mut String,
    set: &ContractSet,
    plan: &EmitPlan<'_>,
    contract: &crate::ir::ContractId,
) {
    let Some(def) = set.get(contract) else {
        return;
    };
    let decls = own_accessor_decls(set, def);
    let target = trait_ref(set, &plan.module_name, contract);
    let _ = writeln!(out, "    impl {target} for {} {{", plan.value_name);
    for decl in decls {
        let name = accessor_name(&decl.field_name);
        let ret = accessor_type(set, &plan.module_name, &decl.ty, decl.nullable);
        let body = accessor_body(&name, &decl.ty, decl.nullable);
        let _ = writeln!(out, "        fn {name}(&self) -> {ret} {{\n            {body}\n        }}");
    }
    out.push_str("    }\n\n");
}

fn emit_identity(out: &mut String, plan: &EmitPlan<'_>) {
    let id_members: Vec<&Member> = plan.members.iter().filter(|m| m.forms_id).collect();
    if id_members.is_empty() {
        return;
    }
    let value = &plan.value_name;

    let _ = writeln!(out, "    impl PartialEq for {value} {{");
    out.push_str("        fn eq(&self, other: &Self) -> bool {\n");
    let comparisons: Vec<String> = id_members
        .iter()
        .map(|m| {
            let field = accessor_name(&m.field_name);
            match (&m.ty, m.nullable) {
                (TypeRef::Scalar(s), false) if s.is_float() => {
                    format!("self.{field}.to_bits() == other.{field}.to_bits()")
                }
                (TypeRef::Scalar(s), true) if s.is_float() => format!(
                    "self.{field}.map(|v| v.to_bits()) == other.{field}.map(|v| v.to_bits())"
                ),
                _ => format!("self.{field} == other.{field}"),
            }
        })
        .collect();
    let _ = writeln!(out, "            {}", comparisons.join("\n                && "));
    out.push_str("        }\n    }\n\n");
    let _ = writeln!(out, "    impl Eq for {value} {{}}\n");

    let _ = writeln!(out, "    impl std::hash::Hash for {value} {{");
    out.push_str("        fn hash<H: std::hash::Hasher>(&self, state: &mut H) {\n");
    for m in &id_members {
        let field = accessor_name(&m.field_name);
        let line = match (&m.ty, m.nullable) {
            (TypeRef::Scalar(s), false) if s.is_float() => {
                format!("state.write_u64(self.{field}.to_bits());")
            }
            (TypeRef::Scalar(s), true) if s.is_float() => {
                format!("self.{field}.map(|v| v.to_bits()).hash(state);")
            }
            (TypeRef::Enum { .. }, false) => format!("self.{field}.name().hash(state);"),
            (TypeRef::Enum { .. }, true) => {
                format!("self.{field}.as_ref().map(|v| v.name()).hash(state);")
            }
            (TypeRef::Collection { .. } | TypeRef::Map { .. }, _) => {
                format!("self.{field}.len().hash(state);")
            }
            _ => format!("self.{field}.hash(state);"),
        };
        let _ = writeln!(out, "            {line}");
    }
    out.push_str("        }\n    }\n\n");
}

fn emit_debug(out: &mut String, plan: &EmitPlan<'_>) {
    let value = &plan.value_name;
    let _ = writeln!(out, "    impl fmt::Debug for {value} {{");
    out.push_str("        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {\n");
    out.push_str("            match &self.canonical {\n");
    out.push_str("                Some(json) => {\n");
    out.push_str(
        "                    let text = serde_json::to_string_pretty(json).map_err(|_| fmt::Error)?;\n",
    );
    out.push_str("                    f.write_str(&text)\n");
    out.push_str("                }\n");
    out.push_str("                None => {\n");
    out.push_str("                    write!(f, \"{}:{{\", CONTRACT_ID)?;\n");
    for (i, member) in plan.members.iter().enumerate() {
        let sep = if i == 0 { "" } else { ", " };
        let _ = writeln!(
            out,
            "                    write!(f, \"{sep}{}: {{:?}}\", Serializable::member(self, {:?}))?;",
            member.field_name, member.field_name
        );
    }
    out.push_str("                    f.write_str(\"}\")\n");
    out.push_str("                }\n");
    out.push_str("            }\n        }\n    }\n\n");
}

fn emit_construct(out: &mut String, set: &ContractSet, plan: &EmitPlan<'_>) {
    if !plan.def.is_generatable() {
        return;
    }
    out.push_str(
        "    fn construct(\n        mut fields: DecodedFields<'_>,\n        canonical: Value,\n    ) -> Result<Box<dyn ContractValue>, DeserializationError> {\n",
    );
    for member in &plan.members {
        let ty = emission_ty(set, plan.def, member);
        out.push_str(&construct_stmt(set, &plan.module_name, member, &ty));
    }
    let fields: Vec<String> = plan
        .members
        .iter()
        .map(|m| accessor_name(&m.field_name))
        .collect();
    let _ = writeln!(
        out,
        "        Ok(Box::new({} {{ {}, canonical: Some(canonical) }}))",
        plan.value_name,
        fields.join(", ")
    );
    out.push_str("    }\n\n");
}

pub(crate) fn emit_registration(set: &ContractSet, plan: &EmitPlan<'_>) -> String {
    let mut out = String::new();

    out.push_str("    pub fn descriptor() -> ContractDescriptor {\n");
    out.push_str("        ContractDescriptor {\n");
    out.push_str("            id: CONTRACT_ID.clone(),\n");
    let extends: Vec<String> = plan
        .def
        .extends
        .iter()
        .map(|p| format!("ContractId::from_static({:?})", p.as_str()))
        .collect();
    let _ = writeln!(out, "            extends: vec![{}],", extends.join(", "));
    let _ = writeln!(out, "            generatable: {},", plan.def.is_generatable());
    out.push_str("            members: vec![\n");
    for member in &plan.members {
        let _ = writeln!(out, "                {},", member_literal(member));
    }
    out.push_str("            ],\n");
    match &plan.def.instance_validator {
        Some(v) => {
            let _ = writeln!(
                out,
                "            instance_validator: Some(ValidatorRef::new({:?})),",
                v.name()
            );
        }
        None => out.push_str("            instance_validator: None,\n"),
    }
    out.push_str("        }\n    }\n\n");

    out.push_str(
        "    pub fn register(registry: &mut ContractRegistry) -> Result<(), SerializationError> {\n",
    );
    if plan.def.is_generatable() {
        out.push_str("        registry.register_contract(descriptor(), Some(construct))?;\n");
    } else {
        out.push_str("        registry.register_contract(descriptor(), None)?;\n");
    }
    let value = &plan.value_name;
    let _ = writeln!(
        out,
        "        registry.register_cast(TypeId::of::<{value}>(), CONTRACT_ID.clone(), contract_cast!({value} => {}));",
        plan.trait_name
    );
    for ancestor in set.ancestors(&plan.def.id).unwrap_or_default() {
        let t = trait_ref(set, &plan.module_name, &ancestor);
        let id_ref = contract_id_ref(set, &plan.module_name, &ancestor);
        let _ = writeln!(
            out,
            "        registry.register_cast(TypeId::of::<{value}>(), {id_ref}.clone(), contract_cast!({value} => {t}));"
        );
    }
    out.push_str("        Ok(())\n    }\n");
    out
}

fn is_container(ty: &TypeRef) -> bool {
    matches!(ty, TypeRef::Collection { .. } | TypeRef::Map { .. })
}
