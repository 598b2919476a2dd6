//! Serialization service
//!
//! The runtime facade over the registry, the factory cache and the primitive
//! serializer registry. Serializer and contract registration happen before
//! the service is shared; afterwards every operation takes `&self` and the
//! service is freely usable from concurrent callers.

use std::any::TypeId;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::codec::SERIALIZED_TYPE_FIELD;
use crate::contract::{ContractRegistry, ContractValue, FieldValue, Serializable};
use crate::error::{DeserializationError, SerializationError};
use crate::factory::FactoryCache;
use crate::ir::ContractId;
use crate::serializers::{Serializer, SerializerRegistry};

pub struct SerializationService {
    registry: Arc<ContractRegistry>,
    serializers: SerializerRegistry,
    cache: FactoryCache,
    pretty: bool,
}

impl SerializationService {
    /// A service over the given contract registry, with the standard scalar
    /// serializers pre-registered and compact output.
    pub fn new(registry: Arc<ContractRegistry>) -> Self {
        Self {
            registry,
            serializers: SerializerRegistry::standard(),
            cache: FactoryCache::new(),
            pretty: false,
        }
    }

    pub fn registry(&self) -> &ContractRegistry {
        &self.registry
    }

    /// Register a primitive serializer. Call before the service is shared;
    /// duplicate registrations for a type are a usage defect.
    pub fn register_serializer(
        &mut self,
        serializer: Arc<dyn Serializer>,
    ) -> Result<(), SerializationError> {
        self.serializers.register(serializer)
    }

    /// Render JSON pretty-printed at indent 2
    pub fn set_pretty_print(&mut self) {
        self.pretty = true;
    }

    /// Render JSON compact (the default)
    pub fn set_compact(&mut self) {
        self.pretty = false;
    }

    // -- encode ------------------------------------------------------------

    /// Serialize, inferring the contract: the instance must implement
    /// exactly one generatable contract.
    pub fn serialize(&self, instance: &dyn Serializable) -> Result<String, SerializationError> {
        self.json_of(instance).map(|json| self.render(&json))
    }

    /// Serialize as (or within) the given contract bound
    pub fn serialize_as(
        &self,
        instance: &dyn Serializable,
        bound: &ContractId,
    ) -> Result<String, SerializationError> {
        self.json_of_as(instance, bound).map(|json| self.render(&json))
    }

    /// The canonical JSON form under unbounded contract inference
    pub fn json_of(&self, instance: &dyn Serializable) -> Result<Value, SerializationError> {
        let factory = self.cache.factory_for(&self.registry, instance)?;
        factory.encode(self, instance)
    }

    /// The canonical JSON form under a contract bound. Also the recursion
    /// point for nested contract-typed members.
    pub fn json_of_as(
        &self,
        instance: &dyn Serializable,
        bound: &ContractId,
    ) -> Result<Value, SerializationError> {
        let factory = self.cache.factory_within(&self.registry, instance, bound)?;
        factory.encode(self, instance)
    }

    /// JSON form of any dynamic value: contract values defer to their
    /// factory, enum constants write their symbolic name, everything else
    /// requires a registered primitive serializer.
    pub fn to_json(&self, value: &FieldValue<'_>) -> Result<Value, SerializationError> {
        match value {
            FieldValue::Contract(instance) => self.json_of(*instance),
            FieldValue::EnumName(name) => Ok(Value::String((*name).to_string())),
            FieldValue::Null => Ok(Value::Null),
            FieldValue::Bool(v) => Ok(Value::Bool(*v)),
            FieldValue::Int(v) => Ok(Value::from(*v)),
            FieldValue::Float(v) => serde_json::Number::from_f64(*v)
                .map(Value::Number)
                .ok_or_else(|| {
                    SerializationError::Message("non-finite float is not representable".into())
                }),
            FieldValue::Str(v) => Ok(Value::String(v.clone().into_owned())),
            FieldValue::Opaque(any, type_name) => self
                .serializers
                .by_type(any.type_id())
                .ok_or_else(|| SerializationError::NoSerializer {
                    type_name: (*type_name).to_string(),
                    field: String::new(),
                })?
                .to_json(*any),
            FieldValue::Items(items) => items
                .iter()
                .map(|item| self.to_json(item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            FieldValue::Entries(entries) => entries
                .iter()
                .map(|(k, v)| Ok((k.clone().into_owned(), self.to_json(v)?)))
                .collect::<Result<serde_json::Map<_, _>, SerializationError>>()
                .map(Value::Object),
        }
    }

    // -- decode ------------------------------------------------------------

    /// Deserialize text, selecting the concrete factory from the
    /// `serializedType` field of the JSON.
    pub fn deserialize(&self, text: &str) -> Result<Box<dyn ContractValue>, DeserializationError> {
        let json: Value = serde_json::from_str(text)?;
        self.decode_value(&json)
    }

    /// Deserialize text and require the decoded value's contract to satisfy
    /// `expected`.
    pub fn deserialize_expecting(
        &self,
        text: &str,
        expected: &ContractId,
    ) -> Result<Box<dyn ContractValue>, DeserializationError> {
        let value = self.deserialize(text)?;
        if !self.registry.is_assignable(value.contract_id(), expected) {
            return Err(DeserializationError::UnexpectedContract {
                decoded: value.contract_id().clone(),
                expected: expected.clone(),
            });
        }
        Ok(value)
    }

    /// Decode a JSON value whose `serializedType` names the contract. Also
    /// the recursion point for nested contract-typed members.
    pub fn decode_value(
        &self,
        json: &Value,
    ) -> Result<Box<dyn ContractValue>, DeserializationError> {
        let name = json
            .get(SERIALIZED_TYPE_FIELD)
            .and_then(Value::as_str)
            .ok_or_else(|| DeserializationError::MissingField {
                contract: ContractId::from_static("<unknown>"),
                field: SERIALIZED_TYPE_FIELD.to_string(),
            })?;
        debug!(serialized_type = name, "decoding value");
        let factory = self.cache.factory_named(&self.registry, name)?;
        factory.decode(self, json)
    }

    // -- plumbing ----------------------------------------------------------

    pub(crate) fn serializer_for(&self, type_id: TypeId) -> Option<Arc<dyn Serializer>> {
        self.serializers.by_type(type_id)
    }

    pub(crate) fn serializer_named(&self, name: &str) -> Option<Arc<dyn Serializer>> {
        self.serializers.by_name(name)
    }

    fn render(&self, json: &Value) -> String {
        if self.pretty {
            serde_json::to_string_pretty(json).unwrap_or_else(|_| json.to_string())
        } else {
            json.to_string()
        }
    }
}
