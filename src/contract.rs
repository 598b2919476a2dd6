//! Runtime contract model
//!
//! The traits generated values implement ([`Serializable`], [`ContractValue`],
//! [`NamedEnum`]), the dynamic member representation the codec reads
//! ([`FieldValue`]) and writes ([`DecodedValue`]/[`DecodedFields`]), and the
//! process-wide [`ContractRegistry`] holding descriptors, decode
//! constructors, trait-object casts and validators.
//!
//! The registry is explicit state: it starts empty, registrations happen
//! before first use, and nothing is ever evicted.

use std::any::{Any, TypeId};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::trace;

use crate::classify::Member;
use crate::error::{DeserializationError, SerializationError, ValidationError};
use crate::ir::{ContractId, ValidatorRef};
use crate::validate::{FieldValidator, InstanceValidator};

/// Stable identity token for a concrete runtime type
#[derive(Debug, Clone, Copy)]
pub struct TypeToken {
    pub type_id: TypeId,
    pub type_name: &'static str,
}

impl TypeToken {
    pub fn of<T: 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        }
    }
}

impl PartialEq for TypeToken {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for TypeToken {}

impl std::hash::Hash for TypeToken {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

/// Borrowed dynamic view of one member value, produced by
/// [`Serializable::member`] and consumed by the codec and the best-effort
/// formatter.
pub enum FieldValue<'a> {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Cow<'a, str>),
    /// An enum constant's symbolic name
    EnumName(&'static str),
    /// Collection elements in iteration order; null elements are preserved
    Items(Vec<FieldValue<'a>>),
    /// String-keyed map entries; enum keys are already symbolic names
    Entries(Vec<(Cow<'a, str>, FieldValue<'a>)>),
    /// A nested contract-typed value
    Contract(&'a dyn Serializable),
    /// An opaque value handled by a registered serializer
    Opaque(&'a dyn Any, &'static str),
}

impl<'a> FieldValue<'a> {
    pub fn kind_name(&self) -> &'static str {
        match self {
            FieldValue::Null => "null",
            FieldValue::Bool(_) => "bool",
            FieldValue::Int(_) => "int",
            FieldValue::Float(_) => "float",
            FieldValue::Str(_) => "string",
            FieldValue::EnumName(_) => "enum",
            FieldValue::Items(_) => "collection",
            FieldValue::Entries(_) => "map",
            FieldValue::Contract(_) => "contract",
            FieldValue::Opaque(_, _) => "opaque",
        }
    }

    pub fn str(s: &'a str) -> Self {
        FieldValue::Str(Cow::Borrowed(s))
    }

    pub fn opt_str(s: Option<&'a str>) -> Self {
        match s {
            Some(s) => FieldValue::str(s),
            None => FieldValue::Null,
        }
    }

    pub fn opt(v: Option<FieldValue<'a>>) -> Self {
        v.unwrap_or(FieldValue::Null)
    }
}

impl fmt::Debug for FieldValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => write!(f, "null"),
            FieldValue::Bool(v) => write!(f, "{v}"),
            FieldValue::Int(v) => write!(f, "{v}"),
            FieldValue::Float(v) => write!(f, "{v}"),
            FieldValue::Str(v) => write!(f, "{v:?}"),
            FieldValue::EnumName(v) => write!(f, "{v}"),
            FieldValue::Items(v) => f.debug_list().entries(v).finish(),
            FieldValue::Entries(v) => {
                f.debug_map().entries(v.iter().map(|(k, x)| (k, x))).finish()
            }
            FieldValue::Contract(v) => write!(f, "<{}>", v.type_token().type_name),
            FieldValue::Opaque(_, name) => write!(f, "<opaque {name}>"),
        }
    }
}

/// An enumeration encoded on the wire by its symbolic constant name
pub trait NamedEnum: Sized {
    fn name(&self) -> &'static str;
    fn from_name(name: &str) -> Option<Self>;
    fn variants() -> &'static [&'static str];
}

/// Object-safe surface every value participating in serialization exposes.
///
/// `contract_ids` lists the generatable contracts the concrete type
/// implements directly, supertype-first; the registry's extends graph
/// supplies the transitive closure. `member` is the dynamic accessor the
/// codec drives, so a factory can encode any implementor of a contract, not
/// just generated values.
pub trait Serializable: Send + Sync + 'static {
    fn type_token(&self) -> TypeToken;
    fn contract_ids(&self) -> &'static [ContractId];
    fn member(&self, field_name: &str) -> FieldValue<'_>;
    fn as_any(&self) -> &dyn Any;
    /// Explicit upcast; implementations return `self`
    fn as_serializable(&self) -> &dyn Serializable;
}

/// A concrete value of one contract: what `build()` and `decode` produce.
///
/// Decoded values own the canonical JSON document they were read from;
/// builder-built values carry none until they are serialized.
pub trait ContractValue: Serializable + fmt::Debug {
    fn contract_id(&self) -> &ContractId;
    fn canonical_json(&self) -> Option<&Value>;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

/// Runtime descriptor of one contract: the classified member list plus the
/// flags resolution needs. Produced once (from the classifier's output) and
/// shared through the registry.
#[derive(Debug, Clone)]
pub struct ContractDescriptor {
    pub id: ContractId,
    pub extends: Vec<ContractId>,
    /// Whether this contract participates in polymorphic resolution
    pub generatable: bool,
    pub members: Vec<Member>,
    pub instance_validator: Option<ValidatorRef>,
}

/// Builds a typed value from decoded fields and the canonical JSON document
pub type ConstructFn =
    for<'r> fn(DecodedFields<'r>, Value) -> Result<Box<dyn ContractValue>, DeserializationError>;

/// Converts a decoded box into a `Box<dyn Trait>` for one contract, double-
/// boxed as `Box<dyn Any>` so the registry can store it untyped. Returns
/// `None` when the concrete type does not match the registration.
pub type CastFn = fn(Box<dyn ContractValue>) -> Option<Box<dyn Any>>;

/// Produces the closure needed to cast a decoded value to a contract's trait
/// object. Used by generated registration glue and hand-written fixtures.
#[macro_export]
macro_rules! contract_cast {
    ($value_ty:ty => $trait_path:path) => {{
        fn cast(
            value: Box<dyn $crate::contract::ContractValue>,
        ) -> Option<Box<dyn std::any::Any>> {
            let concrete = value.into_any().downcast::<$value_ty>().ok()?;
            let object: Box<dyn $trait_path> = concrete;
            Some(Box::new(object))
        }
        cast as $crate::contract::CastFn
    }};
}

/// Process-wide registry of contracts, decode constructors, casts and
/// validators. Owned by the serialization service; explicit initialization,
/// no teardown, nothing evicted.
#[derive(Default)]
pub struct ContractRegistry {
    descriptors: HashMap<ContractId, Arc<ContractDescriptor>>,
    constructors: HashMap<ContractId, ConstructFn>,
    casts: HashMap<(TypeId, ContractId), CastFn>,
    field_validators: HashMap<String, Arc<dyn FieldValidator>>,
    instance_validators: HashMap<String, Arc<dyn InstanceValidator>>,
}

impl ContractRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_contract(
        &mut self,
        descriptor: ContractDescriptor,
        construct: Option<ConstructFn>,
    ) -> Result<(), SerializationError> {
        if self.descriptors.contains_key(&descriptor.id) {
            return Err(SerializationError::Message(format!(
                "contract {} is already registered",
                descriptor.id
            )));
        }
        trace!(contract = %descriptor.id, "registering contract");
        if let Some(construct) = construct {
            self.constructors.insert(descriptor.id.clone(), construct);
        }
        self.descriptors
            .insert(descriptor.id.clone(), Arc::new(descriptor));
        Ok(())
    }

    pub fn register_cast(&mut self, concrete: TypeId, contract: ContractId, cast: CastFn) {
        self.casts.insert((concrete, contract), cast);
    }

    pub fn register_field_validator(
        &mut self,
        name: impl Into<String>,
        validator: Arc<dyn FieldValidator>,
    ) {
        self.field_validators.insert(name.into(), validator);
    }

    pub fn register_instance_validator(
        &mut self,
        name: impl Into<String>,
        validator: Arc<dyn InstanceValidator>,
    ) {
        self.instance_validators.insert(name.into(), validator);
    }

    pub fn descriptor(&self, id: &ContractId) -> Option<Arc<ContractDescriptor>> {
        self.descriptors.get(id).cloned()
    }

    pub fn constructor(&self, id: &ContractId) -> Option<ConstructFn> {
        self.constructors.get(id).copied()
    }

    pub fn field_validator(&self, v: &ValidatorRef) -> Option<Arc<dyn FieldValidator>> {
        self.field_validators.get(v.name()).cloned()
    }

    pub fn instance_validator(&self, v: &ValidatorRef) -> Option<Arc<dyn InstanceValidator>> {
        self.instance_validators.get(v.name()).cloned()
    }

    pub fn known_ids(&self) -> impl Iterator<Item = &ContractId> {
        self.descriptors.keys()
    }

    /// Transitive ancestor contracts of `id`, nearest-first, deduplicated
    pub fn ancestors(&self, id: &ContractId) -> Vec<ContractId> {
        let mut out = Vec::new();
        self.collect_ancestors(id, &mut out);
        out
    }

    fn collect_ancestors(&self, id: &ContractId, out: &mut Vec<ContractId>) {
        let Some(descriptor) = self.descriptors.get(id) else {
            return;
        };
        for parent in &descriptor.extends {
            if !out.contains(parent) {
                out.push(parent.clone());
            }
            self.collect_ancestors(parent, out);
        }
    }

    pub fn is_assignable(&self, sub: &ContractId, sup: &ContractId) -> bool {
        sub == sup || self.ancestors(sub).contains(sup)
    }

    /// Length of the shortest extends chain from `sub` up to `sup`
    pub fn depth(&self, sub: &ContractId, sup: &ContractId) -> Option<usize> {
        if sub == sup {
            return Some(0);
        }
        let descriptor = self.descriptors.get(sub)?;
        descriptor
            .extends
            .iter()
            .filter_map(|p| self.depth(p, sup))
            .min()
            .map(|d| d + 1)
    }

    /// All contracts in the instance's implements-closure, directly-declared
    /// contracts first, then inherited ones
    pub fn contract_closure(&self, instance: &dyn Serializable) -> Vec<ContractId> {
        let mut out: Vec<ContractId> = Vec::new();
        for id in instance.contract_ids() {
            if !out.contains(id) {
                out.push(id.clone());
            }
        }
        for id in instance.contract_ids() {
            for ancestor in self.ancestors(id) {
                if !out.contains(&ancestor) {
                    out.push(ancestor);
                }
            }
        }
        out
    }

    /// The generatable subset of the closure
    pub fn generatable_closure(&self, instance: &dyn Serializable) -> Vec<ContractId> {
        self.contract_closure(instance)
            .into_iter()
            .filter(|id| {
                self.descriptors
                    .get(id)
                    .map(|d| d.generatable)
                    .unwrap_or(false)
            })
            .collect()
    }

    /// Cast a decoded value to the trait object of `contract`, returning the
    /// double-boxed `Box<dyn Trait>` for the caller to downcast.
    pub fn cast_to(
        &self,
        value: Box<dyn ContractValue>,
        contract: &ContractId,
    ) -> Result<Box<dyn Any>, SerializationError> {
        let token = value.type_token();
        let cast = self
            .casts
            .get(&(token.type_id, contract.clone()))
            .ok_or_else(|| SerializationError::CastFailure {
                type_name: token.type_name,
                contract: contract.clone(),
            })?;
        cast(value).ok_or(SerializationError::CastFailure {
            type_name: token.type_name,
            contract: contract.clone(),
        })
    }
}

impl fmt::Debug for ContractRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContractRegistry")
            .field("contracts", &self.descriptors.len())
            .field("casts", &self.casts.len())
            .finish()
    }
}

/// Owned dynamic value produced by the decoder, handed to construct glue
pub enum DecodedValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    EnumName(String),
    Items(Vec<DecodedValue>),
    Entries(Vec<(String, DecodedValue)>),
    Contract(Box<dyn ContractValue>),
    Opaque(Box<dyn Any + Send + Sync>),
}

impl DecodedValue {
    pub fn kind_name(&self) -> &'static str {
        match self {
            DecodedValue::Null => "null",
            DecodedValue::Bool(_) => "bool",
            DecodedValue::Int(_) => "int",
            DecodedValue::Float(_) => "float",
            DecodedValue::Str(_) => "string",
            DecodedValue::EnumName(_) => "enum",
            DecodedValue::Items(_) => "collection",
            DecodedValue::Entries(_) => "map",
            DecodedValue::Contract(_) => "contract",
            DecodedValue::Opaque(_) => "opaque",
        }
    }
}

impl fmt::Debug for DecodedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodedValue::Str(v) => write!(f, "{v:?}"),
            DecodedValue::Contract(v) => write!(f, "{v:?}"),
            other => write!(f, "<{}>", other.kind_name()),
        }
    }
}

/// The decoded member values for one contract, with typed take-helpers for
/// construct glue. Every helper reports missing/mismatched fields as
/// [`DeserializationError`] with full context.
pub struct DecodedFields<'r> {
    contract: ContractId,
    values: HashMap<String, DecodedValue>,
    registry: &'r ContractRegistry,
}

impl<'r> DecodedFields<'r> {
    pub fn new(
        contract: ContractId,
        values: HashMap<String, DecodedValue>,
        registry: &'r ContractRegistry,
    ) -> Self {
        Self {
            contract,
            values,
            registry,
        }
    }

    pub fn contract(&self) -> &ContractId {
        &self.contract
    }

    fn missing(&self, field: &str) -> DeserializationError {
        DeserializationError::MissingField {
            contract: self.contract.clone(),
            field: field.to_string(),
        }
    }

    fn mismatch(&self, field: &str, expected: &'static str, got: &'static str) -> DeserializationError {
        DeserializationError::WrongShape {
            contract: self.contract.clone(),
            field: field.to_string(),
            expected,
            got,
        }
    }

    /// Remove and return a field; absent or null is an error
    pub fn take(&mut self, field: &str) -> Result<DecodedValue, DeserializationError> {
        match self.values.remove(field) {
            None => Err(self.missing(field)),
            Some(DecodedValue::Null) => Err(DeserializationError::NullRequiredField {
                contract: self.contract.clone(),
                field: field.to_string(),
            }),
            Some(v) => Ok(v),
        }
    }

    /// Remove and return a field; absent and null both map to `None`
    pub fn take_opt(&mut self, field: &str) -> Option<DecodedValue> {
        match self.values.remove(field) {
            None | Some(DecodedValue::Null) => None,
            Some(v) => Some(v),
        }
    }

    pub fn take_bool(&mut self, field: &str) -> Result<bool, DeserializationError> {
        match self.take(field)? {
            DecodedValue::Bool(v) => Ok(v),
            other => Err(self.mismatch(field, "bool", other.kind_name())),
        }
    }

    pub fn take_i64(&mut self, field: &str) -> Result<i64, DeserializationError> {
        match self.take(field)? {
            DecodedValue::Int(v) => Ok(v),
            other => Err(self.mismatch(field, "int", other.kind_name())),
        }
    }

    pub fn take_i32(&mut self, field: &str) -> Result<i32, DeserializationError> {
        let v = self.take_i64(field)?;
        v.try_into()
            .map_err(|_| self.mismatch(field, "i32", "out-of-range int"))
    }

    pub fn take_i16(&mut self, field: &str) -> Result<i16, DeserializationError> {
        let v = self.take_i64(field)?;
        v.try_into()
            .map_err(|_| self.mismatch(field, "i16", "out-of-range int"))
    }

    pub fn take_i8(&mut self, field: &str) -> Result<i8, DeserializationError> {
        let v = self.take_i64(field)?;
        v.try_into()
            .map_err(|_| self.mismatch(field, "i8", "out-of-range int"))
    }

    pub fn take_f64(&mut self, field: &str) -> Result<f64, DeserializationError> {
        match self.take(field)? {
            DecodedValue::Float(v) => Ok(v),
            DecodedValue::Int(v) => Ok(v as f64),
            other => Err(self.mismatch(field, "float", other.kind_name())),
        }
    }

    pub fn take_char(&mut self, field: &str) -> Result<char, DeserializationError> {
        let s = self.take_string(field)?;
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(self.mismatch(field, "single-character string", "string")),
        }
    }

    pub fn take_string(&mut self, field: &str) -> Result<String, DeserializationError> {
        match self.take(field)? {
            DecodedValue::Str(v) => Ok(v),
            other => Err(self.mismatch(field, "string", other.kind_name())),
        }
    }

    pub fn take_opt_string(&mut self, field: &str) -> Result<Option<String>, DeserializationError> {
        match self.take_opt(field) {
            None => Ok(None),
            Some(DecodedValue::Str(v)) => Ok(Some(v)),
            Some(other) => Err(self.mismatch(field, "string", other.kind_name())),
        }
    }

    pub fn take_opt_i64(&mut self, field: &str) -> Result<Option<i64>, DeserializationError> {
        match self.take_opt(field) {
            None => Ok(None),
            Some(DecodedValue::Int(v)) => Ok(Some(v)),
            Some(other) => Err(self.mismatch(field, "int", other.kind_name())),
        }
    }

    pub fn take_opt_bool(&mut self, field: &str) -> Result<Option<bool>, DeserializationError> {
        match self.take_opt(field) {
            None => Ok(None),
            Some(DecodedValue::Bool(v)) => Ok(Some(v)),
            Some(other) => Err(self.mismatch(field, "bool", other.kind_name())),
        }
    }

    pub fn take_opt_f64(&mut self, field: &str) -> Result<Option<f64>, DeserializationError> {
        match self.take_opt(field) {
            None => Ok(None),
            Some(DecodedValue::Float(v)) => Ok(Some(v)),
            Some(DecodedValue::Int(v)) => Ok(Some(v as f64)),
            Some(other) => Err(self.mismatch(field, "float", other.kind_name())),
        }
    }

    pub fn take_enum<E: NamedEnum>(&mut self, field: &str) -> Result<E, DeserializationError> {
        match self.take(field)? {
            DecodedValue::EnumName(name) | DecodedValue::Str(name) => {
                E::from_name(&name).ok_or_else(|| DeserializationError::UnknownEnumConstant {
                    contract: self.contract.clone(),
                    field: field.to_string(),
                    value: name,
                })
            }
            other => Err(self.mismatch(field, "enum name", other.kind_name())),
        }
    }

    pub fn take_opt_enum<E: NamedEnum>(
        &mut self,
        field: &str,
    ) -> Result<Option<E>, DeserializationError> {
        match self.take_opt(field) {
            None => Ok(None),
            Some(DecodedValue::EnumName(name)) | Some(DecodedValue::Str(name)) => E::from_name(&name)
                .map(Some)
                .ok_or_else(|| DeserializationError::UnknownEnumConstant {
                    contract: self.contract.clone(),
                    field: field.to_string(),
                    value: name,
                }),
            Some(other) => Err(self.mismatch(field, "enum name", other.kind_name())),
        }
    }

    /// Rebuild a collection member into any container. Absent collections
    /// decode as empty, never as null.
    pub fn take_collect<C, T>(
        &mut self,
        field: &str,
        convert: impl Fn(&mut Self, DecodedValue) -> Result<T, DeserializationError>,
    ) -> Result<C, DeserializationError>
    where
        C: FromIterator<T>,
    {
        let items = match self.values.remove(field) {
            None | Some(DecodedValue::Null) => Vec::new(),
            Some(DecodedValue::Items(items)) => items,
            Some(other) => return Err(self.mismatch(field, "collection", other.kind_name())),
        };
        items
            .into_iter()
            .map(|item| convert(self, item))
            .collect::<Result<C, _>>()
    }

    /// Rebuild a string-keyed map member. Absent maps decode as empty.
    pub fn take_string_map<T>(
        &mut self,
        field: &str,
        convert: impl Fn(&mut Self, DecodedValue) -> Result<T, DeserializationError>,
    ) -> Result<HashMap<String, T>, DeserializationError> {
        let entries = self.take_entries(field)?;
        entries
            .into_iter()
            .map(|(k, v)| Ok((k, convert(self, v)?)))
            .collect()
    }

    /// Rebuild an enum-keyed map member, parsing keys by symbolic name
    pub fn take_enum_map<K, T>(
        &mut self,
        field: &str,
        convert: impl Fn(&mut Self, DecodedValue) -> Result<T, DeserializationError>,
    ) -> Result<HashMap<K, T>, DeserializationError>
    where
        K: NamedEnum + Eq + std::hash::Hash,
    {
        let entries = self.take_entries(field)?;
        entries
            .into_iter()
            .map(|(k, v)| {
                let key =
                    K::from_name(&k).ok_or_else(|| DeserializationError::UnknownEnumConstant {
                        contract: self.contract.clone(),
                        field: field.to_string(),
                        value: k,
                    })?;
                Ok((key, convert(self, v)?))
            })
            .collect()
    }

    fn take_entries(
        &mut self,
        field: &str,
    ) -> Result<Vec<(String, DecodedValue)>, DeserializationError> {
        match self.values.remove(field) {
            None | Some(DecodedValue::Null) => Ok(Vec::new()),
            Some(DecodedValue::Entries(entries)) => Ok(entries),
            Some(other) => Err(self.mismatch(field, "map", other.kind_name())),
        }
    }

    /// Take a nested contract member as `Box<dyn Trait>`, e.g.
    /// `take_contract::<Box<dyn User>>("owner", &USER)`.
    pub fn take_contract<B: 'static>(
        &mut self,
        field: &str,
        contract: &ContractId,
    ) -> Result<B, DeserializationError> {
        match self.take(field)? {
            DecodedValue::Contract(value) => self.cast_contract(field, contract, value),
            other => Err(self.mismatch(field, "contract", other.kind_name())),
        }
    }

    pub fn take_opt_contract<B: 'static>(
        &mut self,
        field: &str,
        contract: &ContractId,
    ) -> Result<Option<B>, DeserializationError> {
        match self.take_opt(field) {
            None => Ok(None),
            Some(DecodedValue::Contract(value)) => {
                self.cast_contract(field, contract, value).map(Some)
            }
            Some(other) => Err(self.mismatch(field, "contract", other.kind_name())),
        }
    }

    /// Convert a collection/map element that is itself a contract value
    pub fn element_contract<B: 'static>(
        &self,
        field: &str,
        contract: &ContractId,
        element: DecodedValue,
    ) -> Result<B, DeserializationError> {
        match element {
            DecodedValue::Contract(value) => self.cast_contract(field, contract, value),
            other => Err(self.mismatch(field, "contract", other.kind_name())),
        }
    }

    fn cast_contract<B: 'static>(
        &self,
        field: &str,
        contract: &ContractId,
        value: Box<dyn ContractValue>,
    ) -> Result<B, DeserializationError> {
        let any = self.registry.cast_to(value, contract)?;
        any.downcast::<B>().map(|b| *b).map_err(|_| {
            DeserializationError::Internal(SerializationError::Message(format!(
                "cast for field `{field}` produced an unexpected trait object"
            )))
        })
    }

    pub fn take_opaque<T: 'static>(&mut self, field: &str) -> Result<T, DeserializationError> {
        match self.take(field)? {
            DecodedValue::Opaque(any) => any.downcast::<T>().map(|b| *b).map_err(|_| {
                self.mismatch(field, "registered opaque type", "different opaque type")
            }),
            other => Err(self.mismatch(field, "opaque", other.kind_name())),
        }
    }

    pub fn take_opt_opaque<T: 'static>(
        &mut self,
        field: &str,
    ) -> Result<Option<T>, DeserializationError> {
        match self.take_opt(field) {
            None => Ok(None),
            Some(DecodedValue::Opaque(any)) => any.downcast::<T>().map(|b| Some(*b)).map_err(|_| {
                self.mismatch(field, "registered opaque type", "different opaque type")
            }),
            Some(other) => Err(self.mismatch(field, "opaque", other.kind_name())),
        }
    }

    // Element converters for take_collect / take_string_map / take_enum_map

    pub fn elem_bool(&self, field: &str, v: DecodedValue) -> Result<bool, DeserializationError> {
        match v {
            DecodedValue::Bool(v) => Ok(v),
            other => Err(self.mismatch(field, "bool", other.kind_name())),
        }
    }

    pub fn elem_i64(&self, field: &str, v: DecodedValue) -> Result<i64, DeserializationError> {
        match v {
            DecodedValue::Int(v) => Ok(v),
            other => Err(self.mismatch(field, "int", other.kind_name())),
        }
    }

    pub fn elem_f64(&self, field: &str, v: DecodedValue) -> Result<f64, DeserializationError> {
        match v {
            DecodedValue::Float(v) => Ok(v),
            DecodedValue::Int(v) => Ok(v as f64),
            other => Err(self.mismatch(field, "float", other.kind_name())),
        }
    }

    pub fn elem_string(&self, field: &str, v: DecodedValue) -> Result<String, DeserializationError> {
        match v {
            DecodedValue::Str(v) => Ok(v),
            other => Err(self.mismatch(field, "string", other.kind_name())),
        }
    }

    pub fn elem_enum<E: NamedEnum>(
        &self,
        field: &str,
        v: DecodedValue,
    ) -> Result<E, DeserializationError> {
        match v {
            DecodedValue::EnumName(name) | DecodedValue::Str(name) => {
                E::from_name(&name).ok_or_else(|| DeserializationError::UnknownEnumConstant {
                    contract: self.contract.clone(),
                    field: field.to_string(),
                    value: name,
                })
            }
            other => Err(self.mismatch(field, "enum name", other.kind_name())),
        }
    }

    pub fn elem_opaque<T: 'static>(
        &self,
        field: &str,
        v: DecodedValue,
    ) -> Result<T, DeserializationError> {
        match v {
            DecodedValue::Opaque(any) => any.downcast::<T>().map(|b| *b).map_err(|_| {
                self.mismatch(field, "registered opaque type", "different opaque type")
            }),
            other => Err(self.mismatch(field, "opaque", other.kind_name())),
        }
    }

    /// Error for an element shape classification should have rejected
    pub fn unsupported_element(&self, field: &str) -> DeserializationError {
        self.mismatch(field, "scalar, enum, contract or opaque element", "nested container")
    }

    /// Run the named field validator against a decoded value, when one is
    /// registered. Unregistered validators are recorded and skipped; the
    /// builder path has already enforced them statically.
    pub fn validate_field(
        &self,
        validator: &ValidatorRef,
        field: &str,
        value: &FieldValue<'_>,
    ) -> Result<(), ValidationError> {
        match self.registry.field_validator(validator) {
            Some(v) => v.validate(field, value),
            None => {
                trace!(validator = validator.name(), field, "validator not registered; skipping");
                Ok(())
            }
        }
    }
}
