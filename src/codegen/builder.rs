//! Staged builder emission
//!
//! One stage struct per required member, in declaration order, each exposing
//! exactly one setter that consumes the stage and returns the next; the
//! terminal `CanBuild` stage exposes every nullable member's setter and
//! `build()`. Reaching `build()` without every required member set is a type
//! error, not a runtime check.

use std::fmt::Write;

use crate::classify::Member;
use crate::ir::{ContractSet, TypeRef};

use super::names::{accessor_name, setter_name, stage_name};
use super::profile::RenderProfile;
use super::{emission_ty, field_view_expr, owned_type, EmitPlan};

pub(crate) fn emit_builder(set: &ContractSet, plan: &EmitPlan<'_>, profile: &RenderProfile) -> String {
    let required: Vec<&Member> = plan.members.iter().filter(|m| m.is_required()).collect();
    let nullable: Vec<&Member> = plan.members.iter().filter(|m| m.nullable).collect();

    let mut out = String::new();
    emit_entry(&mut out, plan, profile, &required);

    for (index, member) in required.iter().enumerate() {
        emit_stage(&mut out, set, plan, profile, &required, index, member);
    }

    emit_can_build(&mut out, set, plan, profile, &nullable);
    emit_copy_builder(&mut out, set, plan, profile);
    out
}

fn emit_entry(
    out: &mut String,
    plan: &EmitPlan<'_>,
    profile: &RenderProfile,
    required: &[&Member],
) {
    let first_stage = match required.first() {
        Some(member) => stage_name(&member.field_name),
        None => "CanBuild".to_string(),
    };
    let init = if required.is_empty() {
        format!("CanBuild {{ {} }}", can_build_init(plan, required))
    } else {
        format!("{first_stage} {{}}")
    };
    let _ = writeln!(
        out,
        "    pub fn {}() -> {first_stage} {{\n        {init}\n    }}\n",
        profile.builder_entry
    );
}

/// Fields carried by the stage for `required[index]`: every earlier required
/// member, already set
fn carried(required: &[&Member], index: usize) -> Vec<String> {
    required[..index]
        .iter()
        .map(|m| accessor_name(&m.field_name))
        .collect()
}

fn emit_stage(
    out: &mut String,
    set: &ContractSet,
    plan: &EmitPlan<'_>,
    profile: &RenderProfile,
    required: &[&Member],
    index: usize,
    member: &Member,
) {
    let stage = stage_name(&member.field_name);
    let ty = emission_ty(set, plan.def, member);
    let param_ty = owned_type(set, &plan.module_name, &ty);
    let field = accessor_name(&member.field_name);
    let setter = setter_name(&profile.setter_prefix, &member.field_name);

    let carried_fields = carried(required, index);
    if carried_fields.is_empty() {
        let _ = writeln!(out, "    pub struct {stage};\n");
    } else {
        let _ = writeln!(out, "    pub struct {stage} {{");
        for (i, prev) in required[..index].iter().enumerate() {
            let prev_ty = owned_type(set, &plan.module_name, &emission_ty(set, plan.def, prev));
            let _ = writeln!(out, "        {}: {prev_ty},", carried_fields[i]);
        }
        out.push_str("    }\n\n");
    }

    let (next_stage, next_init) = match required.get(index + 1) {
        Some(next) => {
            let mut init: Vec<String> = carried_fields
                .iter()
                .map(|f| format!("{f}: self.{f}"))
                .collect();
            init.push(field.clone());
            (stage_name(&next.field_name), init.join(", "))
        }
        None => {
            let mut init: Vec<String> = carried_fields
                .iter()
                .map(|f| format!("{f}: self.{f}"))
                .collect();
            init.push(field.clone());
            for nullable in plan.members.iter().filter(|m| m.nullable) {
                init.push(format!("{}: None", accessor_name(&nullable.field_name)));
            }
            ("CanBuild".to_string(), init.join(", "))
        }
    };

    let _ = writeln!(out, "    impl {stage} {{");
    match &member.validator {
        Some(validator) => {
            let view = field_view_expr(&field, &ty, false);
            let _ = writeln!(
                out,
                "        pub fn {setter}(self, {field}: {param_ty}) -> Result<{next_stage}, ValidationError> {{"
            );
            let _ = writeln!(
                out,
                "            {}.validate({:?}, &{view})?;",
                profile.validator_path(validator.name()),
                member.field_name
            );
            let _ = writeln!(out, "            Ok({next_stage} {{ {next_init} }})");
            out.push_str("        }\n");
        }
        None => {
            let _ = writeln!(
                out,
                "        pub fn {setter}(self, {field}: {param_ty}) -> {next_stage} {{"
            );
            let _ = writeln!(out, "            {next_stage} {{ {next_init} }}");
            out.push_str("        }\n");
        }
    }
    out.push_str("    }\n\n");
}

fn can_build_init(plan: &EmitPlan<'_>, _required: &[&Member]) -> String {
    plan.members
        .iter()
        .filter(|m| m.nullable)
        .map(|m| format!("{}: None", accessor_name(&m.field_name)))
        .collect::<Vec<_>>()
        .join(", ")
}

fn emit_can_build(
    out: &mut String,
    set: &ContractSet,
    plan: &EmitPlan<'_>,
    profile: &RenderProfile,
    nullable: &[&Member],
) {
    out.push_str("    pub struct CanBuild {\n");
    for member in plan.members.iter() {
        let field = accessor_name(&member.field_name);
        let ty = owned_type(set, &plan.module_name, &emission_ty(set, plan.def, member));
        if member.nullable {
            let _ = writeln!(out, "        {field}: Option<{ty}>,");
        } else {
            let _ = writeln!(out, "        {field}: {ty},");
        }
    }
    out.push_str("    }\n\n");

    let _ = writeln!(out, "    impl CanBuild {{");
    for member in nullable {
        let field = accessor_name(&member.field_name);
        let ty = emission_ty(set, plan.def, member);
        let param_ty = owned_type(set, &plan.module_name, &ty);
        let setter = setter_name(&profile.setter_prefix, &member.field_name);
        match &member.validator {
            Some(validator) => {
                let view = field_view_expr(&field, &ty, true);
                let _ = writeln!(
                    out,
                    "        pub fn {setter}(mut self, {field}: Option<{param_ty}>) -> Result<CanBuild, ValidationError> {{"
                );
                let _ = writeln!(
                    out,
                    "            {}.validate({:?}, &{view})?;",
                    profile.validator_path(validator.name()),
                    member.field_name
                );
                let _ = writeln!(out, "            self.{field} = {field};");
                out.push_str("            Ok(self)\n        }\n");
            }
            None => {
                let _ = writeln!(
                    out,
                    "        pub fn {setter}(mut self, {field}: Option<{param_ty}>) -> CanBuild {{"
                );
                let _ = writeln!(out, "            self.{field} = {field};");
                out.push_str("            self\n        }\n");
            }
        }
    }

    // build() assembles the value; nullable collections fall back to empty
    let assemble: Vec<String> = plan
        .members
        .iter()
        .map(|m| {
            let field = accessor_name(&m.field_name);
            let ty = emission_ty(set, plan.def, m);
            if m.nullable && !is_container(&ty) {
                format!("{field}: self.{field}")
            } else if m.nullable {
                format!("{field}: self.{field}.unwrap_or_default()")
            } else {
                format!("{field}: self.{field}")
            }
        })
        .collect();

    match &plan.def.instance_validator {
        Some(validator) => {
            let _ = writeln!(
                out,
                "        pub fn build(self) -> Result<{}, ValidationError> {{",
                plan.value_name
            );
            let _ = writeln!(
                out,
                "            let value = {} {{ {}, canonical: None }};",
                plan.value_name,
                assemble.join(", ")
            );
            let _ = writeln!(
                out,
                "            {}.validate(value.as_serializable())?;",
                profile.validator_path(validator.name())
            );
            out.push_str("            Ok(value)\n        }\n");
        }
        None => {
            let _ = writeln!(out, "        pub fn build(self) -> {} {{", plan.value_name);
            let _ = writeln!(
                out,
                "            {} {{ {}, canonical: None }}",
                plan.value_name,
                assemble.join(", ")
            );
            out.push_str("        }\n");
        }
    }
    out.push_str("    }\n\n");
}

fn is_container(ty: &TypeRef) -> bool {
    matches!(ty, TypeRef::Collection { .. } | TypeRef::Map { .. })
}

/// The copy builder: seeded from an existing instance, every setter
/// (required and nullable) re-exposed as overridable, `build()` delegating
/// to the terminal stage.
fn emit_copy_builder(
    out: &mut String,
    set: &ContractSet,
    plan: &EmitPlan<'_>,
    profile: &RenderProfile,
) {
    let seeds: Vec<String> = plan
        .members
        .iter()
        .map(|m| {
            let field = accessor_name(&m.field_name);
            let ty = emission_ty(set, plan.def, m);
            let copied = copy_expr(&format!("source.{field}()"), &ty, m.nullable);
            if m.nullable && is_container(&ty) {
                format!("{field}: Some({copied})")
            } else {
                format!("{field}: {copied}")
            }
        })
        .collect();

    out.push_str("    pub struct CopyBuilder {\n");
    for member in plan.members.iter() {
        let field = accessor_name(&member.field_name);
        let ty = owned_type(set, &plan.module_name, &emission_ty(set, plan.def, member));
        if member.nullable {
            let _ = writeln!(out, "        {field}: Option<{ty}>,");
        } else {
            let _ = writeln!(out, "        {field}: {ty},");
        }
    }
    out.push_str("    }\n\n");

    let _ = writeln!(
        out,
        "    pub fn {}(source: &dyn {}) -> CopyBuilder {{",
        profile.copy_entry, plan.trait_name
    );
    let _ = writeln!(out, "        CopyBuilder {{ {} }}", seeds.join(", "));
    out.push_str("    }\n\n");

    out.push_str("    impl CopyBuilder {\n");
    for member in plan.members.iter() {
        let field = accessor_name(&member.field_name);
        let ty = emission_ty(set, plan.def, member);
        let owned = owned_type(set, &plan.module_name, &ty);
        let param_ty = if member.nullable {
            format!("Option<{owned}>")
        } else {
            owned
        };
        let setter = setter_name(&profile.setter_prefix, &member.field_name);
        match &member.validator {
            Some(validator) => {
                let view = field_view_expr(&field, &ty, member.nullable);
                let _ = writeln!(
                    out,
                    "        pub fn {setter}(mut self, {field}: {param_ty}) -> Result<CopyBuilder, ValidationError> {{"
                );
                let _ = writeln!(
                    out,
                    "            {}.validate({:?}, &{view})?;",
                    profile.validator_path(validator.name()),
                    member.field_name
                );
                let _ = writeln!(out, "            self.{field} = {field};");
                out.push_str("            Ok(self)\n        }\n");
            }
            None => {
                let _ = writeln!(
                    out,
                    "        pub fn {setter}(mut self, {field}: {param_ty}) -> CopyBuilder {{"
                );
                let _ = writeln!(out, "            self.{field} = {field};");
                out.push_str("            self\n        }\n");
            }
        }
    }

    let delegate: Vec<String> = plan
        .members
        .iter()
        .map(|m| {
            let field = accessor_name(&m.field_name);
            format!("{field}: self.{field}")
        })
        .collect();
    let build_ret = if plan.def.instance_validator.is_some() {
        format!("Result<{}, ValidationError>", plan.value_name)
    } else {
        plan.value_name.clone()
    };
    let _ = writeln!(out, "        pub fn build(self) -> {build_ret} {{");
    let _ = writeln!(
        out,
        "            CanBuild {{ {} }}.build()",
        delegate.join(", ")
    );
    out.push_str("        }\n");
    out.push_str("    }\n\n");
}

/// Owned copy of an accessor's return value for the copy builder. Nullable
/// members are stored as `Option`; required members directly.
fn copy_expr(accessor: &str, ty: &TypeRef, nullable: bool) -> String {
    if nullable && !is_container(ty) {
        return match ty {
            TypeRef::Scalar(crate::ir::ScalarType::String) => {
                format!("{accessor}.map(str::to_string)")
            }
            TypeRef::Scalar(_) => accessor.to_string(),
            TypeRef::Enum { .. } | TypeRef::Opaque { .. } => format!("{accessor}.cloned()"),
            TypeRef::Contract(_) => accessor.to_string(),
            _ => accessor.to_string(),
        };
    }
    match ty {
        TypeRef::Scalar(crate::ir::ScalarType::String) => format!("{accessor}.to_string()"),
        TypeRef::Scalar(_) => accessor.to_string(),
        TypeRef::Enum { .. } | TypeRef::Opaque { .. } => format!("{accessor}.clone()"),
        TypeRef::Collection { shape, .. } => match shape {
            crate::ir::CollectionShape::List => format!("{accessor}.to_vec()"),
            _ => format!("{accessor}.clone()"),
        },
        TypeRef::Map { .. } => format!("{accessor}.clone()"),
        TypeRef::Contract(_) => accessor.to_string(),
    }
}
