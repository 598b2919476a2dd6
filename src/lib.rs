//! dtoforge
//!
//! Staged builders and bidirectional JSON codecs for interface-style value
//! contracts, plus a runtime service that serializes polymorphically —
//! picking, among the contracts a concrete value implements, the right one
//! for a given bound, and caching that decision.
//!
//! ## Architecture
//!
//! ```text
//! contract IR (ir) ──> classifier (classify) ──┬──> builder synthesizer (codegen::builder)
//!                                              ├──> value/codec synthesizer (codegen::dto)
//!                                              └──> runtime descriptors (contract)
//!
//! SerializationService (service)
//!   ├── FactoryCache (factory)        resolution + memoization
//!   ├── ContractRegistry (contract)   descriptors, casts, validators
//!   ├── SerializerRegistry (serializers)
//!   └── codec rules (codec)           one encode/decode rule per member kind
//! ```
//!
//! Contracts are declared as an explicit IR (interface members with
//! nullability, identity and wire-name metadata, plus `extends` edges). The
//! classifier turns a contract into an ordered, deduplicated member list;
//! both synthesizers and the runtime consume that list and nothing else.
//!
//! Generated builders are typestate chains: one stage per required member,
//! so `build()` is unreachable until every required member is set — checked
//! by the compiler, not at run time.

pub mod classify;
pub mod codec;
pub mod codegen;
pub mod contract;
pub mod debug_format;
pub mod error;
pub mod factory;
pub mod ir;
pub mod serializers;
pub mod service;
pub mod validate;

pub use classify::{classify, Member, MemberKind};
pub use contract::{
    ContractDescriptor, ContractRegistry, ContractValue, DecodedFields, DecodedValue, FieldValue,
    NamedEnum, Serializable, TypeToken,
};
pub use error::{ClassifyError, DeserializationError, SerializationError, ValidationError};
pub use factory::{FactoryCache, ObjectFactory};
pub use ir::{
    Artifact, CollectionShape, ContractDef, ContractId, ContractSet, MapKey, MemberDecl,
    ScalarType, TypeRef, ValidatorRef,
};
pub use serializers::{ScalarSerializer, Serializer, SerializerRegistry};
pub use service::SerializationService;
