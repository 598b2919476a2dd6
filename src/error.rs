//! Error types for classification, generation and the serialization runtime
//!
//! Two disjoint runtime families: `SerializationError` signals a schema or
//! usage defect (unrecoverable, propagate and fail the operation);
//! `DeserializationError` signals bad input data (recoverable, handled per
//! input). Build-time classification failures use `ClassifyError`.

use thiserror::Error;

use crate::ir::ContractId;

/// Schema defects detected while classifying a contract's members
#[derive(Error, Debug)]
pub enum ClassifyError {
    #[error("unknown contract: {0}")]
    UnknownContract(ContractId),

    #[error("contract {0} is already defined")]
    DuplicateContract(ContractId),

    #[error("contract {contract}: members {first} and {second} share accessor `{field}` with incompatible types")]
    IncompatibleOverride {
        contract: ContractId,
        field: String,
        first: String,
        second: String,
    },

    #[error("contract {contract}: duplicate member `{field}`")]
    DuplicateMember { contract: ContractId, field: String },

    #[error("contract {contract}: member `{field}` is a collection of collections, which is not supported")]
    CollectionOfCollection { contract: ContractId, field: String },

    #[error("contract {contract}: member `{field}` has unsupported element type: {detail}")]
    UnsupportedElement {
        contract: ContractId,
        field: String,
        detail: String,
    },

    #[error("extends cycle involving contract {0}")]
    ExtendsCycle(ContractId),
}

/// Programming errors in serialization: wrong schema usage, unresolvable
/// contracts during encode, missing serializers. These indicate a defect in
/// the calling code or the registered schema set, not in the input data.
#[derive(Error, Debug)]
pub enum SerializationError {
    #[error("no generatable contract found for type {type_name}")]
    NoContract { type_name: &'static str },

    #[error("multiple generatable contracts found for type {type_name}: {candidates:?}; specify a bound")]
    MultipleContracts {
        type_name: &'static str,
        candidates: Vec<ContractId>,
    },

    #[error("no generatable contract for type {type_name} within bound {bound}")]
    NoContractWithinBound {
        type_name: &'static str,
        bound: ContractId,
    },

    #[error("contract {0} is not registered")]
    UnregisteredContract(ContractId),

    #[error("required member `{field}` of {contract} is null")]
    RequiredMemberNull { contract: ContractId, field: String },

    #[error("no serializer registered for opaque type `{type_name}` (member `{field}`)")]
    NoSerializer { type_name: String, field: String },

    #[error("a serializer for type `{0}` is already registered")]
    DuplicateSerializer(String),

    #[error("cannot cast {type_name} to contract {contract}")]
    CastFailure {
        type_name: &'static str,
        contract: ContractId,
    },

    #[error("serialization failed: {0}")]
    Message(String),
}

/// Data errors while deserializing untrusted input. Callers are expected to
/// handle these per input.
#[derive(Error, Debug)]
pub enum DeserializationError {
    #[error("failed to parse JSON")]
    Malformed(#[from] serde_json::Error),

    #[error("missing required field `{field}` while decoding {contract}")]
    MissingField { contract: ContractId, field: String },

    #[error("required field `{field}` of {contract} is null")]
    NullRequiredField { contract: ContractId, field: String },

    #[error("unknown serialized type `{name}`{}", .suggestion.as_ref().map(|s| format!("; did you mean `{s}`?")).unwrap_or_default())]
    UnknownSerializedType {
        name: String,
        suggestion: Option<String>,
    },

    #[error("field `{field}` of {contract}: expected {expected}, got {got}")]
    WrongShape {
        contract: ContractId,
        field: String,
        expected: &'static str,
        got: &'static str,
    },

    #[error("unknown enum constant `{value}` for field `{field}` of {contract}")]
    UnknownEnumConstant {
        contract: ContractId,
        field: String,
        value: String,
    },

    #[error("cannot decode opaque type `{type_name}` from JSON {got}")]
    OpaqueDecode { type_name: String, got: String },

    #[error("contract {0} does not support decoding")]
    NotDecodable(ContractId),

    #[error("decoded contract {decoded} does not satisfy expected contract {expected}")]
    UnexpectedContract {
        decoded: ContractId,
        expected: ContractId,
    },

    #[error("decoded value failed validation")]
    Validation(#[from] ValidationError),

    #[error("internal error while decoding")]
    Internal(#[from] SerializationError),
}

/// Raised by field and instance validators
#[derive(Error, Debug)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}
