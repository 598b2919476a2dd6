//! Value/JSON codec rules
//!
//! One encode rule and one decode rule per [`MemberKind`], implemented once
//! and driven by contract descriptors. Factories delegate here; generated
//! values only supply dynamic member access and typed construction.
//!
//! Canonical form: `serializedType` is always present and written first;
//! nullable scalar/enum/contract members serialize as JSON `null`, but an
//! absent collection serializes as `[]` and an absent map as `{}` —
//! collections and maps never round-trip through `null`.

use std::collections::HashMap;

use serde_json::{Map, Value};
use tracing::trace;

use crate::classify::{Member, MemberKind};
use crate::contract::{
    ContractDescriptor, ContractValue, DecodedFields, DecodedValue, FieldValue, Serializable,
};
use crate::error::{DeserializationError, SerializationError};
use crate::ir::{ContractId, ScalarType, TypeRef};
use crate::service::SerializationService;

pub const SERIALIZED_TYPE_FIELD: &str = "serializedType";

// ---------------------------------------------------------------------------
// Encode
// ---------------------------------------------------------------------------

/// Encode an instance as `descriptor`'s contract.
pub fn encode_contract(
    service: &SerializationService,
    descriptor: &ContractDescriptor,
    instance: &dyn Serializable,
) -> Result<Value, SerializationError> {
    trace!(contract = %descriptor.id, "encoding");
    let mut out = Map::new();
    out.insert(
        SERIALIZED_TYPE_FIELD.to_string(),
        Value::String(descriptor.id.to_string()),
    );
    for member in &descriptor.members {
        let value = instance.member(&member.field_name);
        let encoded = encode_member(service, descriptor, member, value)?;
        out.insert(member.wire_name.clone(), encoded);
    }
    Ok(Value::Object(out))
}

fn encode_member(
    service: &SerializationService,
    descriptor: &ContractDescriptor,
    member: &Member,
    value: FieldValue<'_>,
) -> Result<Value, SerializationError> {
    match member.kind {
        MemberKind::Primitive | MemberKind::Enum => match value {
            FieldValue::Null if member.nullable => Ok(Value::Null),
            FieldValue::Null => Err(required_null(descriptor, member)),
            other => scalar_to_json(&other).ok_or_else(|| kind_mismatch(member, &other)),
        },

        MemberKind::Collection => {
            let element_ty = collection_element(&member.ty);
            match value {
                // Absent collections encode as an empty array, never null
                FieldValue::Null => Ok(Value::Array(Vec::new())),
                FieldValue::Items(items) => {
                    let mut array = Vec::with_capacity(items.len());
                    for item in items {
                        array.push(encode_element(service, member, element_ty, item)?);
                    }
                    Ok(Value::Array(array))
                }
                other => Err(kind_mismatch(member, &other)),
            }
        }

        MemberKind::StringKeyedMap => {
            let value_ty = map_value_type(&member.ty);
            match value {
                // Maps always produce a JSON object, even when empty
                FieldValue::Null => Ok(Value::Object(Map::new())),
                FieldValue::Entries(entries) => {
                    let mut object = Map::new();
                    for (key, entry) in entries {
                        let encoded = encode_element(service, member, value_ty, entry)?;
                        object.insert(key.into_owned(), encoded);
                    }
                    Ok(Value::Object(object))
                }
                other => Err(kind_mismatch(member, &other)),
            }
        }

        MemberKind::NestedContract => match value {
            FieldValue::Null => Ok(Value::Null),
            FieldValue::Contract(nested) => {
                service.json_of_as(nested, member_contract(&member.ty))
            }
            other => Err(kind_mismatch(member, &other)),
        },

        MemberKind::Opaque => match value {
            FieldValue::Null if member.nullable => Ok(Value::Null),
            FieldValue::Null => Err(required_null(descriptor, member)),
            FieldValue::Opaque(any, type_name) => service
                .serializer_for(any.type_id())
                .ok_or_else(|| SerializationError::NoSerializer {
                    type_name: type_name.to_string(),
                    field: member.field_name.clone(),
                })?
                .to_json(any),
            other => Err(kind_mismatch(member, &other)),
        },
    }
}

fn encode_element(
    service: &SerializationService,
    member: &Member,
    element_ty: &TypeRef,
    value: FieldValue<'_>,
) -> Result<Value, SerializationError> {
    match (element_ty, value) {
        // Null elements and entry values are preserved as JSON null
        (_, FieldValue::Null) => Ok(Value::Null),
        (TypeRef::Contract(id), FieldValue::Contract(nested)) => service.json_of_as(nested, id),
        (TypeRef::Opaque { type_name }, FieldValue::Opaque(any, _)) => service
            .serializer_for(any.type_id())
            .ok_or_else(|| SerializationError::NoSerializer {
                type_name: type_name.clone(),
                field: member.field_name.clone(),
            })?
            .to_json(any),
        (_, other) => scalar_to_json(&other).ok_or_else(|| kind_mismatch(member, &other)),
    }
}

fn scalar_to_json(value: &FieldValue<'_>) -> Option<Value> {
    match value {
        FieldValue::Bool(v) => Some(Value::Bool(*v)),
        FieldValue::Int(v) => Some(Value::from(*v)),
        FieldValue::Float(v) => serde_json::Number::from_f64(*v).map(Value::Number),
        FieldValue::Str(v) => Some(Value::String(v.clone().into_owned())),
        FieldValue::EnumName(v) => Some(Value::String((*v).to_string())),
        _ => None,
    }
}

fn required_null(descriptor: &ContractDescriptor, member: &Member) -> SerializationError {
    SerializationError::RequiredMemberNull {
        contract: descriptor.id.clone(),
        field: member.field_name.clone(),
    }
}

fn kind_mismatch(member: &Member, value: &FieldValue<'_>) -> SerializationError {
    SerializationError::Message(format!(
        "member `{}` declared as {:?} but the instance produced {}",
        member.field_name,
        member.kind,
        value.kind_name()
    ))
}

// ---------------------------------------------------------------------------
// Decode
// ---------------------------------------------------------------------------

/// Decode a JSON object as `descriptor`'s contract, producing the contract's
/// typed value through its registered constructor.
pub fn decode_contract(
    service: &SerializationService,
    descriptor: &ContractDescriptor,
    json: &Value,
) -> Result<Box<dyn ContractValue>, DeserializationError> {
    trace!(contract = %descriptor.id, "decoding");
    let object = json.as_object().ok_or_else(|| shape_error_top(descriptor, json))?;

    let registry = service.registry();
    let mut values = HashMap::new();
    for member in &descriptor.members {
        let decoded = decode_member(service, descriptor, member, object.get(&member.wire_name))?;
        if let Some(validator_ref) = &member.validator {
            if let Some(validator) = registry.field_validator(validator_ref) {
                validator.validate(&member.field_name, &field_view(&decoded))?;
            } else {
                trace!(
                    validator = validator_ref.name(),
                    field = %member.field_name,
                    "validator not registered; skipping decode-time check"
                );
            }
        }
        values.insert(member.field_name.clone(), decoded);
    }

    let canonical = canonicalize(descriptor, object);
    let construct = registry
        .constructor(&descriptor.id)
        .ok_or_else(|| DeserializationError::NotDecodable(descriptor.id.clone()))?;
    let fields = DecodedFields::new(descriptor.id.clone(), values, registry);
    let value = construct(fields, canonical)?;

    if let Some(validator_ref) = &descriptor.instance_validator {
        if let Some(validator) = registry.instance_validator(validator_ref) {
            validator.validate(value.as_serializable())?;
        }
    }
    Ok(value)
}

fn decode_member(
    service: &SerializationService,
    descriptor: &ContractDescriptor,
    member: &Member,
    raw: Option<&Value>,
) -> Result<DecodedValue, DeserializationError> {
    match member.kind {
        MemberKind::Primitive => match raw {
            None | Some(Value::Null) => decode_absent(descriptor, member, raw),
            Some(value) => decode_scalar(descriptor, member, scalar_type(&member.ty), value),
        },

        MemberKind::Enum => match raw {
            None | Some(Value::Null) => decode_absent(descriptor, member, raw),
            Some(Value::String(name)) => Ok(DecodedValue::EnumName(name.clone())),
            Some(other) => Err(shape_error(descriptor, member, "enum name", other)),
        },

        MemberKind::Collection => {
            let element_ty = collection_element(&member.ty);
            match raw {
                // Absent and null both rebuild the empty collection
                None | Some(Value::Null) => Ok(DecodedValue::Items(Vec::new())),
                Some(Value::Array(items)) => {
                    let mut out = Vec::with_capacity(items.len());
                    for item in items {
                        out.push(decode_element(service, descriptor, member, element_ty, item)?);
                    }
                    Ok(DecodedValue::Items(out))
                }
                Some(other) => Err(shape_error(descriptor, member, "array", other)),
            }
        }

        MemberKind::StringKeyedMap => {
            let value_ty = map_value_type(&member.ty);
            match raw {
                None | Some(Value::Null) => Ok(DecodedValue::Entries(Vec::new())),
                Some(Value::Object(entries)) => {
                    let mut out = Vec::with_capacity(entries.len());
                    for (key, entry) in entries {
                        out.push((
                            key.clone(),
                            decode_element(service, descriptor, member, value_ty, entry)?,
                        ));
                    }
                    Ok(DecodedValue::Entries(out))
                }
                Some(other) => Err(shape_error(descriptor, member, "object", other)),
            }
        }

        MemberKind::NestedContract => match raw {
            None | Some(Value::Null) => decode_absent(descriptor, member, raw),
            Some(value @ Value::Object(_)) => {
                let nested = service.decode_value(value)?;
                expect_assignable(service, nested, member_contract(&member.ty))
            }
            Some(other) => Err(shape_error(descriptor, member, "object", other)),
        },

        MemberKind::Opaque => match raw {
            None | Some(Value::Null) => decode_absent(descriptor, member, raw),
            Some(value) => {
                let type_name = opaque_name(&member.ty);
                let serializer = service.serializer_named(type_name).ok_or_else(|| {
                    DeserializationError::Internal(SerializationError::NoSerializer {
                        type_name: type_name.to_string(),
                        field: member.field_name.clone(),
                    })
                })?;
                Ok(DecodedValue::Opaque(serializer.from_json(value)?))
            }
        },
    }
}

fn decode_element(
    service: &SerializationService,
    descriptor: &ContractDescriptor,
    member: &Member,
    element_ty: &TypeRef,
    raw: &Value,
) -> Result<DecodedValue, DeserializationError> {
    match (element_ty, raw) {
        (_, Value::Null) => Ok(DecodedValue::Null),
        (TypeRef::Scalar(st), value) => decode_scalar(descriptor, member, *st, value),
        (TypeRef::Enum { .. }, Value::String(name)) => Ok(DecodedValue::EnumName(name.clone())),
        (TypeRef::Enum { .. }, other) => Err(shape_error(descriptor, member, "enum name", other)),
        (TypeRef::Contract(id), value @ Value::Object(_)) => {
            let nested = service.decode_value(value)?;
            expect_assignable(service, nested, id)
        }
        (TypeRef::Contract(_), other) => Err(shape_error(descriptor, member, "object", other)),
        (TypeRef::Opaque { type_name }, value) => {
            let serializer = service.serializer_named(type_name).ok_or_else(|| {
                DeserializationError::Internal(SerializationError::NoSerializer {
                    type_name: type_name.clone(),
                    field: member.field_name.clone(),
                })
            })?;
            Ok(DecodedValue::Opaque(serializer.from_json(value)?))
        }
        (ty, other) => Err(shape_error(descriptor, member, element_kind_name(ty), other)),
    }
}

fn decode_scalar(
    descriptor: &ContractDescriptor,
    member: &Member,
    scalar: ScalarType,
    raw: &Value,
) -> Result<DecodedValue, DeserializationError> {
    match scalar {
        ScalarType::Bool => raw
            .as_bool()
            .map(DecodedValue::Bool)
            .ok_or_else(|| shape_error(descriptor, member, "bool", raw)),
        ScalarType::I8 | ScalarType::I16 | ScalarType::I32 | ScalarType::I64 => raw
            .as_i64()
            .map(DecodedValue::Int)
            .ok_or_else(|| shape_error(descriptor, member, "integer", raw)),
        ScalarType::F32 | ScalarType::F64 => raw
            .as_f64()
            .map(DecodedValue::Float)
            .ok_or_else(|| shape_error(descriptor, member, "number", raw)),
        ScalarType::Char | ScalarType::String => raw
            .as_str()
            .map(|s| DecodedValue::Str(s.to_string()))
            .ok_or_else(|| shape_error(descriptor, member, "string", raw)),
    }
}

fn decode_absent(
    descriptor: &ContractDescriptor,
    member: &Member,
    raw: Option<&Value>,
) -> Result<DecodedValue, DeserializationError> {
    if member.nullable {
        return Ok(DecodedValue::Null);
    }
    match raw {
        None => Err(DeserializationError::MissingField {
            contract: descriptor.id.clone(),
            field: member.field_name.clone(),
        }),
        Some(_) => Err(DeserializationError::NullRequiredField {
            contract: descriptor.id.clone(),
            field: member.field_name.clone(),
        }),
    }
}

fn expect_assignable(
    service: &SerializationService,
    nested: Box<dyn ContractValue>,
    declared: &ContractId,
) -> Result<DecodedValue, DeserializationError> {
    if !service.registry().is_assignable(nested.contract_id(), declared) {
        return Err(DeserializationError::UnexpectedContract {
            decoded: nested.contract_id().clone(),
            expected: declared.clone(),
        });
    }
    Ok(DecodedValue::Contract(nested))
}

/// The canonical JSON document a decoded value owns: the input object with
/// `serializedType` forced to the decoded contract, first when it has to be
/// inserted fresh.
fn canonicalize(descriptor: &ContractDescriptor, object: &Map<String, Value>) -> Value {
    let mut out = Map::new();
    out.insert(
        SERIALIZED_TYPE_FIELD.to_string(),
        Value::String(descriptor.id.to_string()),
    );
    for (key, value) in object {
        if key != SERIALIZED_TYPE_FIELD {
            out.insert(key.clone(), value.clone());
        }
    }
    Value::Object(out)
}

/// Borrowed validator view of a decoded value
pub fn field_view(value: &DecodedValue) -> FieldValue<'_> {
    match value {
        DecodedValue::Null => FieldValue::Null,
        DecodedValue::Bool(v) => FieldValue::Bool(*v),
        DecodedValue::Int(v) => FieldValue::Int(*v),
        DecodedValue::Float(v) => FieldValue::Float(*v),
        DecodedValue::Str(v) => FieldValue::str(v),
        DecodedValue::EnumName(v) => FieldValue::Str(std::borrow::Cow::Borrowed(v)),
        DecodedValue::Items(items) => FieldValue::Items(items.iter().map(field_view).collect()),
        DecodedValue::Entries(entries) => FieldValue::Entries(
            entries
                .iter()
                .map(|(k, v)| (std::borrow::Cow::Borrowed(k.as_str()), field_view(v)))
                .collect(),
        ),
        DecodedValue::Contract(v) => FieldValue::Contract(v.as_serializable()),
        DecodedValue::Opaque(v) => FieldValue::Opaque(v.as_ref(), "opaque"),
    }
}

fn shape_error_top(descriptor: &ContractDescriptor, json: &Value) -> DeserializationError {
    DeserializationError::WrongShape {
        contract: descriptor.id.clone(),
        field: SERIALIZED_TYPE_FIELD.to_string(),
        expected: "object",
        got: json_kind(json),
    }
}

fn shape_error(
    descriptor: &ContractDescriptor,
    member: &Member,
    expected: &'static str,
    got: &Value,
) -> DeserializationError {
    DeserializationError::WrongShape {
        contract: descriptor.id.clone(),
        field: member.field_name.clone(),
        expected,
        got: json_kind(got),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn element_kind_name(ty: &TypeRef) -> &'static str {
    match ty {
        TypeRef::Scalar(_) => "scalar",
        TypeRef::Enum { .. } => "enum name",
        TypeRef::Collection { .. } => "array",
        TypeRef::Map { .. } => "object",
        TypeRef::Contract(_) => "object",
        TypeRef::Opaque { .. } => "opaque",
    }
}

fn collection_element(ty: &TypeRef) -> &TypeRef {
    match ty {
        TypeRef::Collection { element, .. } => element,
        other => other,
    }
}

fn map_value_type(ty: &TypeRef) -> &TypeRef {
    match ty {
        TypeRef::Map { value, .. } => value,
        other => other,
    }
}

fn member_contract(ty: &TypeRef) -> &ContractId {
    match ty {
        TypeRef::Contract(id) => id,
        // Classification guarantees NestedContract members carry a contract
        _ => unreachable!("NestedContract member without a contract type"),
    }
}

fn opaque_name(ty: &TypeRef) -> &str {
    match ty {
        TypeRef::Opaque { type_name } => type_name,
        _ => "opaque",
    }
}

fn scalar_type(ty: &TypeRef) -> ScalarType {
    match ty {
        TypeRef::Scalar(st) => *st,
        // Classification guarantees Primitive members carry a scalar
        _ => ScalarType::String,
    }
}
