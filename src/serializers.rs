//! Primitive serializers for opaque member types
//!
//! Opaque members delegate their JSON form to a registered [`Serializer`]
//! for the exact runtime type. The registry is pre-populated with the
//! standard scalar types and is extensible by registration before first use.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::contract::TypeToken;
use crate::error::{DeserializationError, SerializationError};

/// A bidirectional JSON codec for one exact runtime type
pub trait Serializer: Send + Sync {
    /// The runtime type this serializer handles
    fn target(&self) -> TypeToken;
    /// The name `TypeRef::Opaque { type_name }` members use to refer to it
    fn type_name(&self) -> &str;
    fn to_json(&self, value: &dyn Any) -> Result<Value, SerializationError>;
    fn from_json(&self, value: &Value) -> Result<Box<dyn Any + Send + Sync>, DeserializationError>;
}

/// A serializer for any `T` expressible with two plain functions
pub struct ScalarSerializer<T> {
    name: &'static str,
    encode: fn(&T) -> Value,
    decode: fn(&Value) -> Option<T>,
}

impl<T: Send + Sync + 'static> ScalarSerializer<T> {
    pub fn new(name: &'static str, encode: fn(&T) -> Value, decode: fn(&Value) -> Option<T>) -> Self {
        Self {
            name,
            encode,
            decode,
        }
    }
}

impl<T: Send + Sync + 'static> Serializer for ScalarSerializer<T> {
    fn target(&self) -> TypeToken {
        TypeToken::of::<T>()
    }

    fn type_name(&self) -> &str {
        self.name
    }

    fn to_json(&self, value: &dyn Any) -> Result<Value, SerializationError> {
        let typed = value.downcast_ref::<T>().ok_or_else(|| {
            SerializationError::Message(format!(
                "serializer for `{}` given a value of a different type",
                self.name
            ))
        })?;
        Ok((self.encode)(typed))
    }

    fn from_json(&self, value: &Value) -> Result<Box<dyn Any + Send + Sync>, DeserializationError> {
        match (self.decode)(value) {
            Some(v) => Ok(Box::new(v)),
            None => Err(DeserializationError::OpaqueDecode {
                type_name: self.name.to_string(),
                got: json_kind(value),
            }),
        }
    }
}

fn json_kind(value: &Value) -> String {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
    .to_string()
}

/// Registry of primitive serializers, keyed both by runtime type and by name
#[derive(Default)]
pub struct SerializerRegistry {
    by_type: HashMap<TypeId, Arc<dyn Serializer>>,
    by_name: HashMap<String, TypeId>,
}

impl SerializerRegistry {
    /// A registry pre-populated with the standard scalar types
    pub fn standard() -> Self {
        let mut registry = Self::default();
        for serializer in standard_serializers() {
            // Standard names cannot collide with themselves
            let _ = registry.register(serializer);
        }
        registry
    }

    pub fn register(&mut self, serializer: Arc<dyn Serializer>) -> Result<(), SerializationError> {
        let token = serializer.target();
        let name = serializer.type_name().to_string();
        if self.by_type.contains_key(&token.type_id) || self.by_name.contains_key(&name) {
            return Err(SerializationError::DuplicateSerializer(name));
        }
        self.by_name.insert(name, token.type_id);
        self.by_type.insert(token.type_id, serializer);
        Ok(())
    }

    pub fn by_type(&self, type_id: TypeId) -> Option<Arc<dyn Serializer>> {
        self.by_type.get(&type_id).cloned()
    }

    pub fn by_name(&self, name: &str) -> Option<Arc<dyn Serializer>> {
        self.by_name
            .get(name)
            .and_then(|id| self.by_type.get(id))
            .cloned()
    }
}

fn standard_serializers() -> Vec<Arc<dyn Serializer>> {
    vec![
        Arc::new(ScalarSerializer::<bool>::new(
            "bool",
            |v| Value::Bool(*v),
            Value::as_bool,
        )),
        Arc::new(ScalarSerializer::<i8>::new(
            "i8",
            |v| Value::from(*v),
            |v| v.as_i64().and_then(|n| i8::try_from(n).ok()),
        )),
        Arc::new(ScalarSerializer::<i16>::new(
            "i16",
            |v| Value::from(*v),
            |v| v.as_i64().and_then(|n| i16::try_from(n).ok()),
        )),
        Arc::new(ScalarSerializer::<i32>::new(
            "i32",
            |v| Value::from(*v),
            |v| v.as_i64().and_then(|n| i32::try_from(n).ok()),
        )),
        Arc::new(ScalarSerializer::<i64>::new(
            "i64",
            |v| Value::from(*v),
            Value::as_i64,
        )),
        Arc::new(ScalarSerializer::<f32>::new(
            "f32",
            |v| Value::from(*v as f64),
            |v| v.as_f64().map(|n| n as f32),
        )),
        Arc::new(ScalarSerializer::<f64>::new(
            "f64",
            |v| Value::from(*v),
            Value::as_f64,
        )),
        Arc::new(ScalarSerializer::<char>::new(
            "char",
            |v| Value::String(v.to_string()),
            |v| {
                v.as_str().and_then(|s| {
                    let mut chars = s.chars();
                    match (chars.next(), chars.next()) {
                        (Some(c), None) => Some(c),
                        _ => None,
                    }
                })
            },
        )),
        Arc::new(ScalarSerializer::<String>::new(
            "String",
            |v| Value::String(v.clone()),
            |v| v.as_str().map(str::to_string),
        )),
    ]
}
