//! Contract IR
//!
//! The schema-description language consumed by the classifier and both
//! synthesizers. A contract is an interface-like declaration of accessor
//! members; inheritance is expressed as explicit `extends` edges, and all
//! inheritance questions (member merging, override compatibility,
//! assignability) are answered by pure graph computation over this IR.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::ClassifyError;

/// Fully-qualified contract identifier, e.g. `"demo.auth.User"`.
///
/// This is the value written to the wire as `serializedType`, so it must be
/// stable across processes. Constructible in `const` context so generated
/// code can carry `&'static [ContractId]` tables.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContractId(Cow<'static, str>);

impl ContractId {
    pub const fn from_static(id: &'static str) -> Self {
        Self(Cow::Borrowed(id))
    }

    pub fn new(id: impl Into<String>) -> Self {
        Self(Cow::Owned(id.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last dot-separated segment, used as the default Rust type name
    pub fn simple_name(&self) -> &str {
        self.0.rsplit('.').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ContractId {
    fn from(s: &str) -> Self {
        Self(Cow::Owned(s.to_string()))
    }
}

/// Built-in scalar types, mapped directly to JSON scalars
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarType {
    Bool,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    Char,
    String,
}

impl ScalarType {
    /// The Rust type generated values use for this scalar
    pub fn rust_type(&self) -> &'static str {
        match self {
            ScalarType::Bool => "bool",
            ScalarType::I8 => "i8",
            ScalarType::I16 => "i16",
            ScalarType::I32 => "i32",
            ScalarType::I64 => "i64",
            ScalarType::F32 => "f32",
            ScalarType::F64 => "f64",
            ScalarType::Char => "char",
            ScalarType::String => "String",
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(self, ScalarType::F32 | ScalarType::F64)
    }
}

/// Concrete collection shape; drives the container a decoded value rebuilds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionShape {
    /// Ordered list, rebuilt as `Vec`
    List,
    /// Unordered set, rebuilt as `HashSet`
    Set,
    /// Sorted set, rebuilt as `BTreeSet`
    SortedSet,
}

/// Supported map key types: raw strings or enums encoded by symbolic name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MapKey {
    String,
    Enum { name: String },
}

/// A declared member type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeRef {
    Scalar(ScalarType),
    /// A user enumeration type, encoded via its symbolic constant names
    Enum { name: String },
    Collection {
        shape: CollectionShape,
        element: Box<TypeRef>,
    },
    Map {
        key: MapKey,
        value: Box<TypeRef>,
    },
    /// A member whose type is itself a schema contract
    Contract(ContractId),
    /// Any other declared type; requires a registered primitive serializer
    Opaque { type_name: String },
}

impl TypeRef {
    pub fn scalar(s: ScalarType) -> Self {
        TypeRef::Scalar(s)
    }

    pub fn contract(id: impl Into<ContractId>) -> Self {
        TypeRef::Contract(id.into())
    }

    /// Human-readable form for diagnostics
    pub fn describe(&self) -> String {
        match self {
            TypeRef::Scalar(s) => s.rust_type().to_string(),
            TypeRef::Enum { name } => name.clone(),
            TypeRef::Collection { shape, element } => {
                format!("{:?}<{}>", shape, element.describe())
            }
            TypeRef::Map { key, value } => {
                let k = match key {
                    MapKey::String => "String".to_string(),
                    MapKey::Enum { name } => name.clone(),
                };
                format!("Map<{}, {}>", k, value.describe())
            }
            TypeRef::Contract(id) => id.to_string(),
            TypeRef::Opaque { type_name } => type_name.clone(),
        }
    }
}

/// Reference to an externally-registered validation routine
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidatorRef(pub String);

impl ValidatorRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

/// One accessor-shaped member declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberDecl {
    pub field_name: String,
    /// Wire-name override; defaults to `field_name`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wire_name: Option<String>,
    #[serde(rename = "type")]
    pub ty: TypeRef,
    #[serde(default)]
    pub nullable: bool,
    /// Whether this member forms part of object identity
    #[serde(default)]
    pub forms_id: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validator: Option<ValidatorRef>,
}

impl MemberDecl {
    pub fn new(field_name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            field_name: field_name.into(),
            wire_name: None,
            ty,
            nullable: false,
            forms_id: false,
            validator: None,
        }
    }

    pub fn wire_name(mut self, wire: impl Into<String>) -> Self {
        self.wire_name = Some(wire.into());
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn forms_id(mut self) -> Self {
        self.forms_id = true;
        self
    }

    pub fn validator(mut self, v: impl Into<String>) -> Self {
        self.validator = Some(ValidatorRef::new(v));
        self
    }
}

/// Which artifacts to synthesize for a contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Artifact {
    /// Builder + value + codec; the contract participates in polymorphic
    /// resolution ("generatable")
    Dto,
    /// Staged builder only; never selected by the factory cache
    BuilderOnly,
}

impl Default for Artifact {
    fn default() -> Self {
        Artifact::Dto
    }
}

/// A named contract declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractDef {
    pub id: ContractId,
    #[serde(default)]
    pub extends: Vec<ContractId>,
    #[serde(default)]
    pub members: Vec<MemberDecl>,
    #[serde(default)]
    pub artifact: Artifact,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_validator: Option<ValidatorRef>,
    /// Override for the generated Rust type name (defaults to the id's
    /// simple name)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rust_name: Option<String>,
}

impl ContractDef {
    pub fn new(id: impl Into<ContractId>) -> Self {
        Self {
            id: id.into(),
            extends: Vec::new(),
            members: Vec::new(),
            artifact: Artifact::Dto,
            instance_validator: None,
            rust_name: None,
        }
    }

    pub fn extends(mut self, parent: impl Into<ContractId>) -> Self {
        self.extends.push(parent.into());
        self
    }

    pub fn member(mut self, m: MemberDecl) -> Self {
        self.members.push(m);
        self
    }

    pub fn builder_only(mut self) -> Self {
        self.artifact = Artifact::BuilderOnly;
        self
    }

    pub fn instance_validator(mut self, v: impl Into<String>) -> Self {
        self.instance_validator = Some(ValidatorRef::new(v));
        self
    }

    pub fn is_generatable(&self) -> bool {
        self.artifact == Artifact::Dto
    }

    pub fn rust_name(&self) -> &str {
        self.rust_name.as_deref().unwrap_or_else(|| self.id.simple_name())
    }
}

/// The full set of contracts under classification/generation, with the
/// extends graph alongside for closure and cycle queries
#[derive(Debug, Default)]
pub struct ContractSet {
    defs: HashMap<ContractId, ContractDef>,
    order: Vec<ContractId>,
    graph: DiGraph<ContractId, ()>,
    nodes: HashMap<ContractId, NodeIndex>,
}

impl ContractSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, def: ContractDef) -> Result<(), ClassifyError> {
        if self.defs.contains_key(&def.id) {
            return Err(ClassifyError::DuplicateContract(def.id.clone()));
        }
        let child = self.node(def.id.clone());
        for parent in &def.extends {
            let p = self.node(parent.clone());
            self.graph.add_edge(child, p, ());
        }
        self.order.push(def.id.clone());
        self.defs.insert(def.id.clone(), def);
        Ok(())
    }

    fn node(&mut self, id: ContractId) -> NodeIndex {
        if let Some(&n) = self.nodes.get(&id) {
            return n;
        }
        let n = self.graph.add_node(id.clone());
        self.nodes.insert(id, n);
        n
    }

    pub fn get(&self, id: &ContractId) -> Option<&ContractDef> {
        self.defs.get(id)
    }

    pub fn contains(&self, id: &ContractId) -> bool {
        self.defs.contains_key(id)
    }

    /// Contract ids in insertion order
    pub fn ids(&self) -> impl Iterator<Item = &ContractId> {
        self.order.iter()
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// Fails if the extends graph has a cycle
    pub fn ensure_acyclic(&self) -> Result<(), ClassifyError> {
        toposort(&self.graph, None).map(|_| ()).map_err(|cycle| {
            ClassifyError::ExtendsCycle(self.graph[cycle.node_id()].clone())
        })
    }

    /// Transitive ancestors of `id` in deterministic order: each direct
    /// parent (declaration order) followed by that parent's own ancestors,
    /// deduplicated, nearest-first.
    pub fn ancestors(&self, id: &ContractId) -> Result<Vec<ContractId>, ClassifyError> {
        let mut out = Vec::new();
        self.collect_ancestors(id, &mut out)?;
        Ok(out)
    }

    fn collect_ancestors(
        &self,
        id: &ContractId,
        out: &mut Vec<ContractId>,
    ) -> Result<(), ClassifyError> {
        let def = self
            .defs
            .get(id)
            .ok_or_else(|| ClassifyError::UnknownContract(id.clone()))?;
        for parent in &def.extends {
            if !out.contains(parent) {
                out.push(parent.clone());
            }
            self.collect_ancestors(parent, out)?;
        }
        Ok(())
    }

    /// Whether `sub` is `sup` or transitively extends it
    pub fn is_assignable(&self, sub: &ContractId, sup: &ContractId) -> bool {
        if sub == sup {
            return true;
        }
        self.ancestors(sub)
            .map(|a| a.contains(sup))
            .unwrap_or(false)
    }

    /// Whether `sub` can override a member declared with type `sup` (same
    /// type, or a contract type assignable to the declared contract type)
    pub fn type_assignable(&self, sub: &TypeRef, sup: &TypeRef) -> bool {
        if sub == sup {
            return true;
        }
        match (sub, sup) {
            (TypeRef::Contract(a), TypeRef::Contract(b)) => self.is_assignable(a, b),
            _ => false,
        }
    }

    /// Stable content fingerprint of the whole set, stamped into generated
    /// file headers so regeneration from an unchanged IR is byte-identical
    /// and a changed IR is detectable.
    pub fn fingerprint(&self) -> String {
        let mut sorted: Vec<&ContractDef> = self.defs.values().collect();
        sorted.sort_by(|a, b| a.id.cmp(&b.id));
        let canonical = serde_json::to_string(&sorted).unwrap_or_default();
        let hash = Sha256::digest(canonical.as_bytes());
        format!("{:x}", hash)
    }
}
