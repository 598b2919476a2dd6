//! Member Classification
//!
//! Turns a contract (plus everything it extends) into an ordered,
//! deduplicated list of [`Member`]s, each tagged with a [`MemberKind`].
//! This list is the single source both synthesizers and the runtime codec
//! consume; classification decisions are never re-made downstream.
//!
//! Ordering: ancestor members come first (each ancestor's own declaration
//! order preserved, parents in `extends` order), subtype-declared members
//! last. When a subtype overrides an ancestor member with a more specific
//! contract type, the override keeps the subtype position.

use serde::{Deserialize, Serialize};

use crate::error::ClassifyError;
use crate::ir::{ContractId, ContractSet, MemberDecl, TypeRef, ValidatorRef};

/// The classification taxonomy driving per-member codec rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberKind {
    /// Built-in scalar/string type, written directly as a JSON scalar
    Primitive,
    /// Enumeration encoded via its symbolic constant name
    Enum,
    /// Ordered/unordered collection of a single element type
    Collection,
    /// String- or enum-keyed, single-value-typed map
    StringKeyedMap,
    /// A member whose type is itself a schema contract
    NestedContract,
    /// Any other declared type, delegated to a registered serializer
    Opaque,
}

impl MemberKind {
    /// Fixed-precedence kind assignment. The IR's `TypeRef` constructors
    /// already make the precedence unambiguous.
    pub fn of(ty: &TypeRef) -> Self {
        match ty {
            TypeRef::Scalar(_) => MemberKind::Primitive,
            TypeRef::Enum { .. } => MemberKind::Enum,
            TypeRef::Collection { .. } => MemberKind::Collection,
            TypeRef::Map { .. } => MemberKind::StringKeyedMap,
            TypeRef::Contract(_) => MemberKind::NestedContract,
            TypeRef::Opaque { .. } => MemberKind::Opaque,
        }
    }
}

/// One classified member of a contract's effective member set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub field_name: String,
    /// Key used in the JSON wire form
    pub wire_name: String,
    pub ty: TypeRef,
    pub kind: MemberKind,
    pub nullable: bool,
    pub forms_id: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validator: Option<ValidatorRef>,
    /// The contract that contributed this member to the effective set
    pub declared_by: ContractId,
}

impl Member {
    fn from_decl(decl: &MemberDecl, declared_by: &ContractId) -> Self {
        Self {
            field_name: decl.field_name.clone(),
            wire_name: decl
                .wire_name
                .clone()
                .unwrap_or_else(|| decl.field_name.clone()),
            kind: MemberKind::of(&decl.ty),
            ty: decl.ty.clone(),
            nullable: decl.nullable,
            forms_id: decl.forms_id,
            validator: decl.validator.clone(),
            declared_by: declared_by.clone(),
        }
    }

    pub fn is_required(&self) -> bool {
        !self.nullable
    }
}

/// Classify a contract against its set.
///
/// Fails rather than silently ignoring anything it cannot handle: unknown
/// contract references, incompatible overrides, collections of collections,
/// and extends cycles are all hard errors.
pub fn classify(set: &ContractSet, id: &ContractId) -> Result<Vec<Member>, ClassifyError> {
    set.ensure_acyclic()?;
    let mut members = Vec::new();
    collect(set, id, &mut members)?;
    resolve_overrides(set, id, &mut members)?;
    for member in &members {
        check_member_type(set, id, member)?;
    }
    Ok(members)
}

/// Required (non-nullable) members of the classified list, declaration order
pub fn required_members(members: &[Member]) -> Vec<&Member> {
    members.iter().filter(|m| m.is_required()).collect()
}

/// Nullable members of the classified list, declaration order
pub fn nullable_members(members: &[Member]) -> Vec<&Member> {
    members.iter().filter(|m| m.nullable).collect()
}

fn collect(
    set: &ContractSet,
    id: &ContractId,
    out: &mut Vec<Member>,
) -> Result<(), ClassifyError> {
    let def = set
        .get(id)
        .ok_or_else(|| ClassifyError::UnknownContract(id.clone()))?;

    for parent in &def.extends {
        collect(set, parent, out)?;
    }

    let mut seen_here: Vec<&str> = Vec::new();
    for decl in &def.members {
        if seen_here.contains(&decl.field_name.as_str()) {
            return Err(ClassifyError::DuplicateMember {
                contract: id.clone(),
                field: decl.field_name.clone(),
            });
        }
        seen_here.push(&decl.field_name);

        let member = Member::from_decl(decl, id);
        // Identical re-declaration of an inherited member is a no-op
        let already = out
            .iter()
            .any(|m| m.field_name == member.field_name && m.ty == member.ty);
        if !already {
            out.push(member);
        }
    }
    Ok(())
}

/// Resolve same-name members contributed by different contracts: the one
/// whose type is assignable to the other's wins (most specific type),
/// keeping its own position; incompatible types are a schema error.
fn resolve_overrides(
    set: &ContractSet,
    contract: &ContractId,
    members: &mut Vec<Member>,
) -> Result<(), ClassifyError> {
    let mut remove = Vec::new();
    for (i, a) in members.iter().enumerate() {
        for (j, b) in members.iter().enumerate().skip(i + 1) {
            if a.field_name != b.field_name {
                continue;
            }
            if set.type_assignable(&b.ty, &a.ty) {
                remove.push(i);
            } else if set.type_assignable(&a.ty, &b.ty) {
                remove.push(j);
            } else {
                return Err(ClassifyError::IncompatibleOverride {
                    contract: contract.clone(),
                    field: a.field_name.clone(),
                    first: format!("{} {}", a.ty.describe(), a.declared_by),
                    second: format!("{} {}", b.ty.describe(), b.declared_by),
                });
            }
        }
    }
    remove.sort_unstable();
    remove.dedup();
    for idx in remove.into_iter().rev() {
        members.remove(idx);
    }
    Ok(())
}

fn check_member_type(
    set: &ContractSet,
    contract: &ContractId,
    member: &Member,
) -> Result<(), ClassifyError> {
    match &member.ty {
        TypeRef::Collection { element, .. } => {
            check_element(set, contract, member, element, "collection")?
        }
        TypeRef::Map { value, .. } => check_element(set, contract, member, value, "map value")?,
        TypeRef::Contract(id) => {
            if !set.contains(id) {
                return Err(ClassifyError::UnknownContract(id.clone()));
            }
        }
        _ => {}
    }
    Ok(())
}

fn check_element(
    set: &ContractSet,
    contract: &ContractId,
    member: &Member,
    element: &TypeRef,
    position: &str,
) -> Result<(), ClassifyError> {
    match element {
        TypeRef::Collection { .. } => Err(ClassifyError::CollectionOfCollection {
            contract: contract.clone(),
            field: member.field_name.clone(),
        }),
        TypeRef::Map { .. } => Err(ClassifyError::UnsupportedElement {
            contract: contract.clone(),
            field: member.field_name.clone(),
            detail: format!("{position} must not be a map"),
        }),
        TypeRef::Contract(id) if !set.contains(id) => {
            Err(ClassifyError::UnknownContract(id.clone()))
        }
        _ => Ok(()),
    }
}
