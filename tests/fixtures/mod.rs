//! Hand-written contract fixtures, shaped exactly like synthesizer output.
//!
//! Each module mirrors what `dtoforge-gen` emits for its contract: the
//! accessor trait, the staged builder, the value struct with dynamic member
//! access, and the registration glue. The descriptors are produced by the
//! real classifier so these fixtures exercise the same pipeline generated
//! code does.
#![allow(dead_code)]

use std::sync::Arc;

use serde_json::Value;

use dtoforge::contract::{ContractRegistry, FieldValue, NamedEnum, Serializable};
use dtoforge::error::ValidationError;
use dtoforge::ir::{
    CollectionShape, ContractDef, ContractSet, MapKey, MemberDecl, ScalarType, TypeRef,
};
use dtoforge::serializers::ScalarSerializer;
use dtoforge::service::SerializationService;
use dtoforge::validate::{InstanceValidator, NonEmptyString, PositiveI64};

/// The IR every fixture descriptor is classified from
pub fn contract_set() -> ContractSet {
    let mut set = ContractSet::new();
    set.insert(
        ContractDef::new("demo.auth.User")
            .member(MemberDecl::new("id", TypeRef::Scalar(ScalarType::I64)).forms_id())
            .member(MemberDecl::new("name", TypeRef::Scalar(ScalarType::String)))
            .member(MemberDecl::new("email", TypeRef::Scalar(ScalarType::String)).nullable()),
    )
    .unwrap();
    set.insert(
        ContractDef::new("demo.auth.PrivateUser")
            .extends("demo.auth.User")
            .member(MemberDecl::new(
                "private_information",
                TypeRef::Scalar(ScalarType::String),
            )),
    )
    .unwrap();
    set.insert(
        ContractDef::new("demo.api.PublicResponse").member(MemberDecl::new(
            "user",
            TypeRef::Contract("demo.auth.User".into()),
        )),
    )
    .unwrap();
    set.insert(
        ContractDef::new("demo.types.Renamed").member(
            MemberDecl::new("value", TypeRef::Scalar(ScalarType::String))
                .wire_name("required_field_1"),
        ),
    )
    .unwrap();
    set.insert(
        ContractDef::new("demo.types.Catalog")
            .member(MemberDecl::new(
                "tags",
                TypeRef::Collection {
                    shape: CollectionShape::List,
                    element: Box::new(TypeRef::Scalar(ScalarType::String)),
                },
            ))
            .member(MemberDecl::new(
                "ranks",
                TypeRef::Collection {
                    shape: CollectionShape::SortedSet,
                    element: Box::new(TypeRef::Scalar(ScalarType::I64)),
                },
            ))
            .member(MemberDecl::new(
                "roles",
                TypeRef::Collection {
                    shape: CollectionShape::Set,
                    element: Box::new(TypeRef::Enum {
                        name: "Role".into(),
                    }),
                },
            ))
            .member(MemberDecl::new(
                "scores",
                TypeRef::Map {
                    key: MapKey::String,
                    value: Box::new(TypeRef::Scalar(ScalarType::I64)),
                },
            ))
            .member(
                MemberDecl::new(
                    "notes",
                    TypeRef::Collection {
                        shape: CollectionShape::List,
                        element: Box::new(TypeRef::Scalar(ScalarType::String)),
                    },
                )
                .nullable(),
            ),
    )
    .unwrap();
    set.insert(
        ContractDef::new("demo.types.Weighted")
            .member(MemberDecl::new("weight", TypeRef::Scalar(ScalarType::F64)).forms_id())
            .member(MemberDecl::new("label", TypeRef::Scalar(ScalarType::String))),
    )
    .unwrap();
    set.insert(
        ContractDef::new("demo.types.Validated")
            .member(
                MemberDecl::new("name", TypeRef::Scalar(ScalarType::String))
                    .validator("non_empty_string"),
            )
            .member(
                MemberDecl::new("count", TypeRef::Scalar(ScalarType::I64))
                    .nullable()
                    .validator("positive_i64"),
            )
            .instance_validator("not_reserved"),
    )
    .unwrap();
    set.insert(
        ContractDef::new("demo.types.Wrapped").member(MemberDecl::new(
            "payload",
            TypeRef::Opaque {
                type_name: "Payload".into(),
            },
        )),
    )
    .unwrap();
    set
}

/// A fully-wired registry over the fixture contracts
pub fn registry() -> ContractRegistry {
    let set = contract_set();
    let mut registry = ContractRegistry::new();
    user::register(&mut registry, &set).unwrap();
    private_user::register(&mut registry, &set).unwrap();
    public_response::register(&mut registry, &set).unwrap();
    renamed::register(&mut registry, &set).unwrap();
    catalog::register(&mut registry, &set).unwrap();
    weighted::register(&mut registry, &set).unwrap();
    validated::register(&mut registry, &set).unwrap();
    wrapped::register(&mut registry, &set).unwrap();

    registry.register_field_validator("non_empty_string", Arc::new(NonEmptyString));
    registry.register_field_validator("positive_i64", Arc::new(PositiveI64));
    registry.register_instance_validator("not_reserved", Arc::new(NotReserved));
    registry
}

/// A service over the fixture registry with the Payload serializer added
pub fn service() -> SerializationService {
    let mut service = SerializationService::new(Arc::new(registry()));
    service
        .register_serializer(Arc::new(payload_serializer()))
        .unwrap();
    service
}

// ---------------------------------------------------------------------------
// Collaborator types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Admin,
    Member,
    Guest,
}

impl NamedEnum for Role {
    fn name(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Member => "MEMBER",
            Role::Guest => "GUEST",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "ADMIN" => Some(Role::Admin),
            "MEMBER" => Some(Role::Member),
            "GUEST" => Some(Role::Guest),
            _ => None,
        }
    }

    fn variants() -> &'static [&'static str] {
        &["ADMIN", "MEMBER", "GUEST"]
    }
}

/// An opaque collaborator type with its own registered serializer
#[derive(Debug, Clone, PartialEq)]
pub struct Payload {
    pub code: String,
}

pub fn payload_serializer() -> ScalarSerializer<Payload> {
    ScalarSerializer::new(
        "Payload",
        |p| Value::String(p.code.clone()),
        |v| {
            v.as_str().map(|s| Payload {
                code: s.to_string(),
            })
        },
    )
}

/// Rejects instances whose name member is the reserved word
pub struct NotReserved;

impl InstanceValidator for NotReserved {
    fn validate(&self, instance: &dyn Serializable) -> Result<(), ValidationError> {
        match instance.member("name") {
            FieldValue::Str(s) if s == "reserved" => {
                Err(ValidationError::new("name", "is reserved"))
            }
            _ => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// demo.auth.User
// ---------------------------------------------------------------------------

pub mod user {
    use std::any::{Any, TypeId};

    use serde_json::Value;

    use dtoforge::classify::classify;
    use dtoforge::contract::{
        ContractDescriptor, ContractRegistry, ContractValue, DecodedFields, FieldValue,
        Serializable, TypeToken,
    };
    use dtoforge::contract_cast;
    use dtoforge::error::{DeserializationError, SerializationError};
    use dtoforge::ir::{ContractId, ContractSet};

    pub static CONTRACT_ID: ContractId = ContractId::from_static("demo.auth.User");

    /// demo.auth.User
    pub trait User: Serializable {
        fn id(&self) -> i64;
        fn name(&self) -> &str;
        fn email(&self) -> Option<&str>;
    }

    pub struct UserValue {
        id: i64,
        name: String,
        email: Option<String>,
        canonical: Option<Value>,
    }

    impl User for UserValue {
        fn id(&self) -> i64 {
            self.id
        }

        fn name(&self) -> &str {
            &self.name
        }

        fn email(&self) -> Option<&str> {
            self.email.as_deref()
        }
    }

    impl Serializable for UserValue {
        fn type_token(&self) -> TypeToken {
            TypeToken::of::<Self>()
        }

        fn contract_ids(&self) -> &'static [ContractId] {
            static IDS: [ContractId; 1] = [ContractId::from_static("demo.auth.User")];
            &IDS
        }

        fn member(&self, field_name: &str) -> FieldValue<'_> {
            match field_name {
                "id" => FieldValue::Int(self.id),
                "name" => FieldValue::str(&self.name),
                "email" => FieldValue::opt_str(self.email.as_deref()),
                _ => FieldValue::Null,
            }
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_serializable(&self) -> &dyn Serializable {
            self
        }
    }

    impl ContractValue for UserValue {
        fn contract_id(&self) -> &ContractId {
            &CONTRACT_ID
        }

        fn canonical_json(&self) -> Option<&Value> {
            self.canonical.as_ref()
        }

        fn into_any(self: Box<Self>) -> Box<dyn Any> {
            self
        }
    }

    impl PartialEq for UserValue {
        fn eq(&self, other: &Self) -> bool {
            self.id == other.id
        }
    }

    impl Eq for UserValue {}

    impl std::hash::Hash for UserValue {
        fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
            self.id.hash(state);
        }
    }

    impl std::fmt::Debug for UserValue {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match &self.canonical {
                Some(json) => {
                    let text = serde_json::to_string_pretty(json).map_err(|_| std::fmt::Error)?;
                    f.write_str(&text)
                }
                None => {
                    write!(f, "{}:{{", CONTRACT_ID)?;
                    write!(f, "id: {:?}", Serializable::member(self, "id"))?;
                    write!(f, ", name: {:?}", Serializable::member(self, "name"))?;
                    write!(f, ", email: {:?}", Serializable::member(self, "email"))?;
                    f.write_str("}")
                }
            }
        }
    }

    pub fn builder() -> RequiresId {
        RequiresId
    }

    pub struct RequiresId;

    impl RequiresId {
        pub fn with_id(self, id: i64) -> RequiresName {
            RequiresName { id }
        }
    }

    pub struct RequiresName {
        id: i64,
    }

    impl RequiresName {
        pub fn with_name(self, name: String) -> CanBuild {
            CanBuild {
                id: self.id,
                name,
                email: None,
            }
        }
    }

    pub struct CanBuild {
        id: i64,
        name: String,
        email: Option<String>,
    }

    impl CanBuild {
        pub fn with_email(mut self, email: Option<String>) -> CanBuild {
            self.email = email;
            self
        }

        pub fn build(self) -> UserValue {
            UserValue {
                id: self.id,
                name: self.name,
                email: self.email,
                canonical: None,
            }
        }
    }

    pub struct CopyBuilder {
        id: i64,
        name: String,
        email: Option<String>,
    }

    pub fn copy_of(source: &dyn User) -> CopyBuilder {
        CopyBuilder {
            id: source.id(),
            name: source.name().to_string(),
            email: source.email().map(str::to_string),
        }
    }

    impl CopyBuilder {
        pub fn with_id(mut self, id: i64) -> CopyBuilder {
            self.id = id;
            self
        }

        pub fn with_name(mut self, name: String) -> CopyBuilder {
            self.name = name;
            self
        }

        pub fn with_email(mut self, email: Option<String>) -> CopyBuilder {
            self.email = email;
            self
        }

        pub fn build(self) -> UserValue {
            CanBuild {
                id: self.id,
                name: self.name,
                email: self.email,
            }
            .build()
        }
    }

    fn construct(
        mut fields: DecodedFields<'_>,
        canonical: Value,
    ) -> Result<Box<dyn ContractValue>, DeserializationError> {
        let id = fields.take_i64("id")?;
        let name = fields.take_string("name")?;
        let email = fields.take_opt_string("email")?;
        Ok(Box::new(UserValue {
            id,
            name,
            email,
            canonical: Some(canonical),
        }))
    }

    pub fn register(
        registry: &mut ContractRegistry,
        set: &ContractSet,
    ) -> Result<(), SerializationError> {
        let members = classify(set, &CONTRACT_ID).expect("User classifies");
        registry.register_contract(
            ContractDescriptor {
                id: CONTRACT_ID.clone(),
                extends: vec![],
                generatable: true,
                members,
                instance_validator: None,
            },
            Some(construct),
        )?;
        registry.register_cast(
            TypeId::of::<UserValue>(),
            CONTRACT_ID.clone(),
            contract_cast!(UserValue => User),
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// demo.auth.PrivateUser
// ---------------------------------------------------------------------------

pub mod private_user {
    use std::any::{Any, TypeId};

    use serde_json::Value;

    use dtoforge::classify::classify;
    use dtoforge::contract::{
        ContractDescriptor, ContractRegistry, ContractValue, DecodedFields, FieldValue,
        Serializable, TypeToken,
    };
    use dtoforge::contract_cast;
    use dtoforge::error::{DeserializationError, SerializationError};
    use dtoforge::ir::{ContractId, ContractSet};

    use super::user::{self, User};

    pub static CONTRACT_ID: ContractId = ContractId::from_static("demo.auth.PrivateUser");

    /// demo.auth.PrivateUser
    pub trait PrivateUser: User {
        fn private_information(&self) -> &str;
    }

    pub struct PrivateUserValue {
        id: i64,
        name: String,
        email: Option<String>,
        private_information: String,
        canonical: Option<Value>,
    }

    impl PrivateUser for PrivateUserValue {
        fn private_information(&self) -> &str {
            &self.private_information
        }
    }

    impl User for PrivateUserValue {
        fn id(&self) -> i64 {
            self.id
        }

        fn name(&self) -> &str {
            &self.name
        }

        fn email(&self) -> Option<&str> {
            self.email.as_deref()
        }
    }

    impl Serializable for PrivateUserValue {
        fn type_token(&self) -> TypeToken {
            TypeToken::of::<Self>()
        }

        fn contract_ids(&self) -> &'static [ContractId] {
            static IDS: [ContractId; 1] = [ContractId::from_static("demo.auth.PrivateUser")];
            &IDS
        }

        fn member(&self, field_name: &str) -> FieldValue<'_> {
            match field_name {
                "id" => FieldValue::Int(self.id),
                "name" => FieldValue::str(&self.name),
                "email" => FieldValue::opt_str(self.email.as_deref()),
                "private_information" => FieldValue::str(&self.private_information),
                _ => FieldValue::Null,
            }
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_serializable(&self) -> &dyn Serializable {
            self
        }
    }

    impl ContractValue for PrivateUserValue {
        fn contract_id(&self) -> &ContractId {
            &CONTRACT_ID
        }

        fn canonical_json(&self) -> Option<&Value> {
            self.canonical.as_ref()
        }

        fn into_any(self: Box<Self>) -> Box<dyn Any> {
            self
        }
    }

    impl PartialEq for PrivateUserValue {
        fn eq(&self, other: &Self) -> bool {
            self.id == other.id
        }
    }

    impl Eq for PrivateUserValue {}

    impl std::hash::Hash for PrivateUserValue {
        fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
            self.id.hash(state);
        }
    }

    impl std::fmt::Debug for PrivateUserValue {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match &self.canonical {
                Some(json) => {
                    let text = serde_json::to_string_pretty(json).map_err(|_| std::fmt::Error)?;
                    f.write_str(&text)
                }
                None => {
                    write!(f, "{}:{{", CONTRACT_ID)?;
                    write!(f, "id: {:?}", Serializable::member(self, "id"))?;
                    write!(f, ", name: {:?}", Serializable::member(self, "name"))?;
                    write!(f, ", email: {:?}", Serializable::member(self, "email"))?;
                    write!(
                        f,
                        ", private_information: {:?}",
                        Serializable::member(self, "private_information")
                    )?;
                    f.write_str("}")
                }
            }
        }
    }

    pub fn builder() -> RequiresId {
        RequiresId
    }

    pub struct RequiresId;

    impl RequiresId {
        pub fn with_id(self, id: i64) -> RequiresName {
            RequiresName { id }
        }
    }

    pub struct RequiresName {
        id: i64,
    }

    impl RequiresName {
        pub fn with_name(self, name: String) -> RequiresPrivateInformation {
            RequiresPrivateInformation {
                id: self.id,
                name,
            }
        }
    }

    pub struct RequiresPrivateInformation {
        id: i64,
        name: String,
    }

    impl RequiresPrivateInformation {
        pub fn with_private_information(self, private_information: String) -> CanBuild {
            CanBuild {
                id: self.id,
                name: self.name,
                private_information,
                email: None,
            }
        }
    }

    pub struct CanBuild {
        id: i64,
        name: String,
        email: Option<String>,
        private_information: String,
    }

    impl CanBuild {
        pub fn with_email(mut self, email: Option<String>) -> CanBuild {
            self.email = email;
            self
        }

        pub fn build(self) -> PrivateUserValue {
            PrivateUserValue {
                id: self.id,
                name: self.name,
                email: self.email,
                private_information: self.private_information,
                canonical: None,
            }
        }
    }

    fn construct(
        mut fields: DecodedFields<'_>,
        canonical: Value,
    ) -> Result<Box<dyn ContractValue>, DeserializationError> {
        let id = fields.take_i64("id")?;
        let name = fields.take_string("name")?;
        let email = fields.take_opt_string("email")?;
        let private_information = fields.take_string("private_information")?;
        Ok(Box::new(PrivateUserValue {
            id,
            name,
            email,
            private_information,
            canonical: Some(canonical),
        }))
    }

    pub fn register(
        registry: &mut ContractRegistry,
        set: &ContractSet,
    ) -> Result<(), SerializationError> {
        let members = classify(set, &CONTRACT_ID).expect("PrivateUser classifies");
        registry.register_contract(
            ContractDescriptor {
                id: CONTRACT_ID.clone(),
                extends: vec![user::CONTRACT_ID.clone()],
                generatable: true,
                members,
                instance_validator: None,
            },
            Some(construct),
        )?;
        registry.register_cast(
            TypeId::of::<PrivateUserValue>(),
            CONTRACT_ID.clone(),
            contract_cast!(PrivateUserValue => PrivateUser),
        );
        registry.register_cast(
            TypeId::of::<PrivateUserValue>(),
            user::CONTRACT_ID.clone(),
            contract_cast!(PrivateUserValue => super::user::User),
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// demo.api.PublicResponse
// ---------------------------------------------------------------------------

pub mod public_response {
    use std::any::{Any, TypeId};
    use std::sync::Arc;

    use serde_json::Value;

    use dtoforge::classify::classify;
    use dtoforge::contract::{
        ContractDescriptor, ContractRegistry, ContractValue, DecodedFields, FieldValue,
        Serializable, TypeToken,
    };
    use dtoforge::contract_cast;
    use dtoforge::error::{DeserializationError, SerializationError};
    use dtoforge::ir::{ContractId, ContractSet};

    use super::user::{self, User};

    pub static CONTRACT_ID: ContractId = ContractId::from_static("demo.api.PublicResponse");

    /// demo.api.PublicResponse
    pub trait PublicResponse: Serializable {
        fn user(&self) -> Arc<dyn User>;
    }

    pub struct PublicResponseValue {
        user: Arc<dyn User>,
        canonical: Option<Value>,
    }

    impl PublicResponse for PublicResponseValue {
        fn user(&self) -> Arc<dyn User> {
            Arc::clone(&self.user)
        }
    }

    impl Serializable for PublicResponseValue {
        fn type_token(&self) -> TypeToken {
            TypeToken::of::<Self>()
        }

        fn contract_ids(&self) -> &'static [ContractId] {
            static IDS: [ContractId; 1] = [ContractId::from_static("demo.api.PublicResponse")];
            &IDS
        }

        fn member(&self, field_name: &str) -> FieldValue<'_> {
            match field_name {
                "user" => FieldValue::Contract(self.user.as_serializable()),
                _ => FieldValue::Null,
            }
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_serializable(&self) -> &dyn Serializable {
            self
        }
    }

    impl ContractValue for PublicResponseValue {
        fn contract_id(&self) -> &ContractId {
            &CONTRACT_ID
        }

        fn canonical_json(&self) -> Option<&Value> {
            self.canonical.as_ref()
        }

        fn into_any(self: Box<Self>) -> Box<dyn Any> {
            self
        }
    }

    impl std::fmt::Debug for PublicResponseValue {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match &self.canonical {
                Some(json) => {
                    let text = serde_json::to_string_pretty(json).map_err(|_| std::fmt::Error)?;
                    f.write_str(&text)
                }
                None => {
                    write!(f, "{}:{{", CONTRACT_ID)?;
                    write!(f, "user: {:?}", Serializable::member(self, "user"))?;
                    f.write_str("}")
                }
            }
        }
    }

    pub fn builder() -> RequiresUser {
        RequiresUser
    }

    pub struct RequiresUser;

    impl RequiresUser {
        pub fn with_user(self, user: Arc<dyn User>) -> CanBuild {
            CanBuild { user }
        }
    }

    pub struct CanBuild {
        user: Arc<dyn User>,
    }

    impl CanBuild {
        pub fn build(self) -> PublicResponseValue {
            PublicResponseValue {
                user: self.user,
                canonical: None,
            }
        }
    }

    fn construct(
        mut fields: DecodedFields<'_>,
        canonical: Value,
    ) -> Result<Box<dyn ContractValue>, DeserializationError> {
        let user: Arc<dyn User> =
            Arc::from(fields.take_contract::<Box<dyn User>>("user", &user::CONTRACT_ID)?);
        Ok(Box::new(PublicResponseValue {
            user,
            canonical: Some(canonical),
        }))
    }

    pub fn register(
        registry: &mut ContractRegistry,
        set: &ContractSet,
    ) -> Result<(), SerializationError> {
        let members = classify(set, &CONTRACT_ID).expect("PublicResponse classifies");
        registry.register_contract(
            ContractDescriptor {
                id: CONTRACT_ID.clone(),
                extends: vec![],
                generatable: true,
                members,
                instance_validator: None,
            },
            Some(construct),
        )?;
        registry.register_cast(
            TypeId::of::<PublicResponseValue>(),
            CONTRACT_ID.clone(),
            contract_cast!(PublicResponseValue => PublicResponse),
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// demo.types.Renamed
// ---------------------------------------------------------------------------

pub mod renamed {
    use std::any::{Any, TypeId};

    use serde_json::Value;

    use dtoforge::classify::classify;
    use dtoforge::contract::{
        ContractDescriptor, ContractRegistry, ContractValue, DecodedFields, FieldValue,
        Serializable, TypeToken,
    };
    use dtoforge::contract_cast;
    use dtoforge::error::{DeserializationError, SerializationError};
    use dtoforge::ir::{ContractId, ContractSet};

    pub static CONTRACT_ID: ContractId = ContractId::from_static("demo.types.Renamed");

    /// demo.types.Renamed
    pub trait Renamed: Serializable {
        fn value(&self) -> &str;
    }

    pub struct RenamedValue {
        value: String,
        canonical: Option<Value>,
    }

    impl Renamed for RenamedValue {
        fn value(&self) -> &str {
            &self.value
        }
    }

    impl Serializable for RenamedValue {
        fn type_token(&self) -> TypeToken {
            TypeToken::of::<Self>()
        }

        fn contract_ids(&self) -> &'static [ContractId] {
            static IDS: [ContractId; 1] = [ContractId::from_static("demo.types.Renamed")];
            &IDS
        }

        fn member(&self, field_name: &str) -> FieldValue<'_> {
            match field_name {
                "value" => FieldValue::str(&self.value),
                _ => FieldValue::Null,
            }
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_serializable(&self) -> &dyn Serializable {
            self
        }
    }

    impl ContractValue for RenamedValue {
        fn contract_id(&self) -> &ContractId {
            &CONTRACT_ID
        }

        fn canonical_json(&self) -> Option<&Value> {
            self.canonical.as_ref()
        }

        fn into_any(self: Box<Self>) -> Box<dyn Any> {
            self
        }
    }

    impl std::fmt::Debug for RenamedValue {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match &self.canonical {
                Some(json) => {
                    let text = serde_json::to_string_pretty(json).map_err(|_| std::fmt::Error)?;
                    f.write_str(&text)
                }
                None => {
                    write!(f, "{}:{{", CONTRACT_ID)?;
                    write!(f, "value: {:?}", Serializable::member(self, "value"))?;
                    f.write_str("}")
                }
            }
        }
    }

    pub fn builder() -> RequiresValue {
        RequiresValue
    }

    pub struct RequiresValue;

    impl RequiresValue {
        pub fn with_value(self, value: String) -> CanBuild {
            CanBuild { value }
        }
    }

    pub struct CanBuild {
        value: String,
    }

    impl CanBuild {
        pub fn build(self) -> RenamedValue {
            RenamedValue {
                value: self.value,
                canonical: None,
            }
        }
    }

    fn construct(
        mut fields: DecodedFields<'_>,
        canonical: Value,
    ) -> Result<Box<dyn ContractValue>, DeserializationError> {
        let value = fields.take_string("value")?;
        Ok(Box::new(RenamedValue {
            value,
            canonical: Some(canonical),
        }))
    }

    pub fn register(
        registry: &mut ContractRegistry,
        set: &ContractSet,
    ) -> Result<(), SerializationError> {
        let members = classify(set, &CONTRACT_ID).expect("Renamed classifies");
        registry.register_contract(
            ContractDescriptor {
                id: CONTRACT_ID.clone(),
                extends: vec![],
                generatable: true,
                members,
                instance_validator: None,
            },
            Some(construct),
        )?;
        registry.register_cast(
            TypeId::of::<RenamedValue>(),
            CONTRACT_ID.clone(),
            contract_cast!(RenamedValue => Renamed),
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// demo.types.Catalog
// ---------------------------------------------------------------------------

pub mod catalog {
    use std::any::{Any, TypeId};
    use std::borrow::Cow;
    use std::collections::{BTreeSet, HashMap, HashSet};

    use serde_json::Value;

    use dtoforge::classify::classify;
    use dtoforge::contract::{
        ContractDescriptor, ContractRegistry, ContractValue, DecodedFields, FieldValue,
        NamedEnum, Serializable, TypeToken,
    };
    use dtoforge::contract_cast;
    use dtoforge::error::{DeserializationError, SerializationError};
    use dtoforge::ir::{ContractId, ContractSet};

    use super::Role;

    pub static CONTRACT_ID: ContractId = ContractId::from_static("demo.types.Catalog");

    /// demo.types.Catalog
    pub trait Catalog: Serializable {
        fn tags(&self) -> &[String];
        fn ranks(&self) -> &BTreeSet<i64>;
        fn roles(&self) -> &HashSet<Role>;
        fn scores(&self) -> &HashMap<String, i64>;
        fn notes(&self) -> &[String];
    }

    pub struct CatalogValue {
        tags: Vec<String>,
        ranks: BTreeSet<i64>,
        roles: HashSet<Role>,
        scores: HashMap<String, i64>,
        notes: Vec<String>,
        canonical: Option<Value>,
    }

    impl Catalog for CatalogValue {
        fn tags(&self) -> &[String] {
            &self.tags
        }

        fn ranks(&self) -> &BTreeSet<i64> {
            &self.ranks
        }

        fn roles(&self) -> &HashSet<Role> {
            &self.roles
        }

        fn scores(&self) -> &HashMap<String, i64> {
            &self.scores
        }

        fn notes(&self) -> &[String] {
            &self.notes
        }
    }

    impl Serializable for CatalogValue {
        fn type_token(&self) -> TypeToken {
            TypeToken::of::<Self>()
        }

        fn contract_ids(&self) -> &'static [ContractId] {
            static IDS: [ContractId; 1] = [ContractId::from_static("demo.types.Catalog")];
            &IDS
        }

        fn member(&self, field_name: &str) -> FieldValue<'_> {
            match field_name {
                "tags" => FieldValue::Items(self.tags.iter().map(|v| FieldValue::str(v)).collect()),
                "ranks" => {
                    FieldValue::Items(self.ranks.iter().map(|v| FieldValue::Int(*v)).collect())
                }
                "roles" => FieldValue::Items(
                    self.roles
                        .iter()
                        .map(|v| FieldValue::EnumName(v.name()))
                        .collect(),
                ),
                "scores" => FieldValue::Entries(
                    self.scores
                        .iter()
                        .map(|(k, v)| (Cow::Borrowed(k.as_str()), FieldValue::Int(*v)))
                        .collect(),
                ),
                "notes" => {
                    FieldValue::Items(self.notes.iter().map(|v| FieldValue::str(v)).collect())
                }
                _ => FieldValue::Null,
            }
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_serializable(&self) -> &dyn Serializable {
            self
        }
    }

    impl ContractValue for CatalogValue {
        fn contract_id(&self) -> &ContractId {
            &CONTRACT_ID
        }

        fn canonical_json(&self) -> Option<&Value> {
            self.canonical.as_ref()
        }

        fn into_any(self: Box<Self>) -> Box<dyn Any> {
            self
        }
    }

    impl std::fmt::Debug for CatalogValue {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match &self.canonical {
                Some(json) => {
                    let text = serde_json::to_string_pretty(json).map_err(|_| std::fmt::Error)?;
                    f.write_str(&text)
                }
                None => {
                    write!(f, "{}:{{", CONTRACT_ID)?;
                    write!(f, "tags: {:?}", Serializable::member(self, "tags"))?;
                    write!(f, ", ranks: {:?}", Serializable::member(self, "ranks"))?;
                    write!(f, ", roles: {:?}", Serializable::member(self, "roles"))?;
                    write!(f, ", scores: {:?}", Serializable::member(self, "scores"))?;
                    write!(f, ", notes: {:?}", Serializable::member(self, "notes"))?;
                    f.write_str("}")
                }
            }
        }
    }

    pub fn builder() -> RequiresTags {
        RequiresTags
    }

    pub struct RequiresTags;

    impl RequiresTags {
        pub fn with_tags(self, tags: Vec<String>) -> RequiresRanks {
            RequiresRanks { tags }
        }
    }

    pub struct RequiresRanks {
        tags: Vec<String>,
    }

    impl RequiresRanks {
        pub fn with_ranks(self, ranks: BTreeSet<i64>) -> RequiresRoles {
            RequiresRoles {
                tags: self.tags,
                ranks,
            }
        }
    }

    pub struct RequiresRoles {
        tags: Vec<String>,
        ranks: BTreeSet<i64>,
    }

    impl RequiresRoles {
        pub fn with_roles(self, roles: HashSet<Role>) -> RequiresScores {
            RequiresScores {
                tags: self.tags,
                ranks: self.ranks,
                roles,
            }
        }
    }

    pub struct RequiresScores {
        tags: Vec<String>,
        ranks: BTreeSet<i64>,
        roles: HashSet<Role>,
    }

    impl RequiresScores {
        pub fn with_scores(self, scores: HashMap<String, i64>) -> CanBuild {
            CanBuild {
                tags: self.tags,
                ranks: self.ranks,
                roles: self.roles,
                scores,
                notes: None,
            }
        }
    }

    pub struct CanBuild {
        tags: Vec<String>,
        ranks: BTreeSet<i64>,
        roles: HashSet<Role>,
        scores: HashMap<String, i64>,
        notes: Option<Vec<String>>,
    }

    impl CanBuild {
        pub fn with_notes(mut self, notes: Option<Vec<String>>) -> CanBuild {
            self.notes = notes;
            self
        }

        pub fn build(self) -> CatalogValue {
            CatalogValue {
                tags: self.tags,
                ranks: self.ranks,
                roles: self.roles,
                scores: self.scores,
                notes: self.notes.unwrap_or_default(),
                canonical: None,
            }
        }
    }

    fn construct(
        mut fields: DecodedFields<'_>,
        canonical: Value,
    ) -> Result<Box<dyn ContractValue>, DeserializationError> {
        let tags = fields.take_collect::<Vec<String>, _>("tags", |f, v| f.elem_string("tags", v))?;
        let ranks =
            fields.take_collect::<BTreeSet<i64>, _>("ranks", |f, v| f.elem_i64("ranks", v))?;
        let roles =
            fields.take_collect::<HashSet<Role>, _>("roles", |f, v| f.elem_enum::<Role>("roles", v))?;
        let scores = fields.take_string_map("scores", |f, v| f.elem_i64("scores", v))?;
        let notes =
            fields.take_collect::<Vec<String>, _>("notes", |f, v| f.elem_string("notes", v))?;
        Ok(Box::new(CatalogValue {
            tags,
            ranks,
            roles,
            scores,
            notes,
            canonical: Some(canonical),
        }))
    }

    pub fn register(
        registry: &mut ContractRegistry,
        set: &ContractSet,
    ) -> Result<(), SerializationError> {
        let members = classify(set, &CONTRACT_ID).expect("Catalog classifies");
        registry.register_contract(
            ContractDescriptor {
                id: CONTRACT_ID.clone(),
                extends: vec![],
                generatable: true,
                members,
                instance_validator: None,
            },
            Some(construct),
        )?;
        registry.register_cast(
            TypeId::of::<CatalogValue>(),
            CONTRACT_ID.clone(),
            contract_cast!(CatalogValue => Catalog),
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// demo.types.Weighted
// ---------------------------------------------------------------------------

pub mod weighted {
    use std::any::{Any, TypeId};

    use serde_json::Value;

    use dtoforge::classify::classify;
    use dtoforge::contract::{
        ContractDescriptor, ContractRegistry, ContractValue, DecodedFields, FieldValue,
        Serializable, TypeToken,
    };
    use dtoforge::contract_cast;
    use dtoforge::error::{DeserializationError, SerializationError};
    use dtoforge::ir::{ContractId, ContractSet};

    pub static CONTRACT_ID: ContractId = ContractId::from_static("demo.types.Weighted");

    /// demo.types.Weighted
    pub trait Weighted: Serializable {
        fn weight(&self) -> f64;
        fn label(&self) -> &str;
    }

    pub struct WeightedValue {
        weight: f64,
        label: String,
        canonical: Option<Value>,
    }

    impl Weighted for WeightedValue {
        fn weight(&self) -> f64 {
            self.weight
        }

        fn label(&self) -> &str {
            &self.label
        }
    }

    impl Serializable for WeightedValue {
        fn type_token(&self) -> TypeToken {
            TypeToken::of::<Self>()
        }

        fn contract_ids(&self) -> &'static [ContractId] {
            static IDS: [ContractId; 1] = [ContractId::from_static("demo.types.Weighted")];
            &IDS
        }

        fn member(&self, field_name: &str) -> FieldValue<'_> {
            match field_name {
                "weight" => FieldValue::Float(self.weight),
                "label" => FieldValue::str(&self.label),
                _ => FieldValue::Null,
            }
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_serializable(&self) -> &dyn Serializable {
            self
        }
    }

    impl ContractValue for WeightedValue {
        fn contract_id(&self) -> &ContractId {
            &CONTRACT_ID
        }

        fn canonical_json(&self) -> Option<&Value> {
            self.canonical.as_ref()
        }

        fn into_any(self: Box<Self>) -> Box<dyn Any> {
            self
        }
    }

    // Identity over the weight member; floats compare and hash by IEEE-754
    // bit pattern
    impl PartialEq for WeightedValue {
        fn eq(&self, other: &Self) -> bool {
            self.weight.to_bits() == other.weight.to_bits()
        }
    }

    impl Eq for WeightedValue {}

    impl std::hash::Hash for WeightedValue {
        fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
            state.write_u64(self.weight.to_bits());
        }
    }

    impl std::fmt::Debug for WeightedValue {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match &self.canonical {
                Some(json) => {
                    let text = serde_json::to_string_pretty(json).map_err(|_| std::fmt::Error)?;
                    f.write_str(&text)
                }
                None => {
                    write!(f, "{}:{{", CONTRACT_ID)?;
                    write!(f, "weight: {:?}", Serializable::member(self, "weight"))?;
                    write!(f, ", label: {:?}", Serializable::member(self, "label"))?;
                    f.write_str("}")
                }
            }
        }
    }

    pub fn builder() -> RequiresWeight {
        RequiresWeight
    }

    pub struct RequiresWeight;

    impl RequiresWeight {
        pub fn with_weight(self, weight: f64) -> RequiresLabel {
            RequiresLabel { weight }
        }
    }

    pub struct RequiresLabel {
        weight: f64,
    }

    impl RequiresLabel {
        pub fn with_label(self, label: String) -> CanBuild {
            CanBuild {
                weight: self.weight,
                label,
            }
        }
    }

    pub struct CanBuild {
        weight: f64,
        label: String,
    }

    impl CanBuild {
        pub fn build(self) -> WeightedValue {
            WeightedValue {
                weight: self.weight,
                label: self.label,
                canonical: None,
            }
        }
    }

    fn construct(
        mut fields: DecodedFields<'_>,
        canonical: Value,
    ) -> Result<Box<dyn ContractValue>, DeserializationError> {
        let weight = fields.take_f64("weight")?;
        let label = fields.take_string("label")?;
        Ok(Box::new(WeightedValue {
            weight,
            label,
            canonical: Some(canonical),
        }))
    }

    pub fn register(
        registry: &mut ContractRegistry,
        set: &ContractSet,
    ) -> Result<(), SerializationError> {
        let members = classify(set, &CONTRACT_ID).expect("Weighted classifies");
        registry.register_contract(
            ContractDescriptor {
                id: CONTRACT_ID.clone(),
                extends: vec![],
                generatable: true,
                members,
                instance_validator: None,
            },
            Some(construct),
        )?;
        registry.register_cast(
            TypeId::of::<WeightedValue>(),
            CONTRACT_ID.clone(),
            contract_cast!(WeightedValue => Weighted),
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// demo.types.Validated
// ---------------------------------------------------------------------------

pub mod validated {
    use std::any::{Any, TypeId};

    use serde_json::Value;

    use dtoforge::classify::classify;
    use dtoforge::contract::{
        ContractDescriptor, ContractRegistry, ContractValue, DecodedFields, FieldValue,
        Serializable, TypeToken,
    };
    use dtoforge::contract_cast;
    use dtoforge::error::{DeserializationError, SerializationError, ValidationError};
    use dtoforge::ir::{ContractId, ContractSet, ValidatorRef};
    use dtoforge::validate::{FieldValidator, InstanceValidator, NonEmptyString, PositiveI64};

    use super::NotReserved;

    pub static CONTRACT_ID: ContractId = ContractId::from_static("demo.types.Validated");

    /// demo.types.Validated
    pub trait Validated: Serializable {
        fn name(&self) -> &str;
        fn count(&self) -> Option<i64>;
    }

    pub struct ValidatedValue {
        name: String,
        count: Option<i64>,
        canonical: Option<Value>,
    }

    impl Validated for ValidatedValue {
        fn name(&self) -> &str {
            &self.name
        }

        fn count(&self) -> Option<i64> {
            self.count
        }
    }

    impl Serializable for ValidatedValue {
        fn type_token(&self) -> TypeToken {
            TypeToken::of::<Self>()
        }

        fn contract_ids(&self) -> &'static [ContractId] {
            static IDS: [ContractId; 1] = [ContractId::from_static("demo.types.Validated")];
            &IDS
        }

        fn member(&self, field_name: &str) -> FieldValue<'_> {
            match field_name {
                "name" => FieldValue::str(&self.name),
                "count" => match self.count {
                    Some(v) => FieldValue::Int(v),
                    None => FieldValue::Null,
                },
                _ => FieldValue::Null,
            }
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_serializable(&self) -> &dyn Serializable {
            self
        }
    }

    impl ContractValue for ValidatedValue {
        fn contract_id(&self) -> &ContractId {
            &CONTRACT_ID
        }

        fn canonical_json(&self) -> Option<&Value> {
            self.canonical.as_ref()
        }

        fn into_any(self: Box<Self>) -> Box<dyn Any> {
            self
        }
    }

    impl std::fmt::Debug for ValidatedValue {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match &self.canonical {
                Some(json) => {
                    let text = serde_json::to_string_pretty(json).map_err(|_| std::fmt::Error)?;
                    f.write_str(&text)
                }
                None => {
                    write!(f, "{}:{{", CONTRACT_ID)?;
                    write!(f, "name: {:?}", Serializable::member(self, "name"))?;
                    write!(f, ", count: {:?}", Serializable::member(self, "count"))?;
                    f.write_str("}")
                }
            }
        }
    }

    pub fn builder() -> RequiresName {
        RequiresName
    }

    pub struct RequiresName;

    impl RequiresName {
        pub fn with_name(self, name: String) -> Result<CanBuild, ValidationError> {
            NonEmptyString.validate("name", &FieldValue::str(&name))?;
            Ok(CanBuild { name, count: None })
        }
    }

    #[derive(Debug)]
    pub struct CanBuild {
        name: String,
        count: Option<i64>,
    }

    impl CanBuild {
        pub fn with_count(mut self, count: Option<i64>) -> Result<CanBuild, ValidationError> {
            PositiveI64.validate(
                "count",
                &match count {
                    Some(v) => FieldValue::Int(v),
                    None => FieldValue::Null,
                },
            )?;
            self.count = count;
            Ok(self)
        }

        pub fn build(self) -> Result<ValidatedValue, ValidationError> {
            let value = ValidatedValue {
                name: self.name,
                count: self.count,
                canonical: None,
            };
            NotReserved.validate(value.as_serializable())?;
            Ok(value)
        }
    }

    pub struct CopyBuilder {
        name: String,
        count: Option<i64>,
    }

    pub fn copy_of(source: &dyn Validated) -> CopyBuilder {
        CopyBuilder {
            name: source.name().to_string(),
            count: source.count(),
        }
    }

    impl CopyBuilder {
        pub fn with_name(mut self, name: String) -> Result<CopyBuilder, ValidationError> {
            NonEmptyString.validate("name", &FieldValue::str(&name))?;
            self.name = name;
            Ok(self)
        }

        pub fn with_count(mut self, count: Option<i64>) -> Result<CopyBuilder, ValidationError> {
            PositiveI64.validate(
                "count",
                &match count {
                    Some(v) => FieldValue::Int(v),
                    None => FieldValue::Null,
                },
            )?;
            self.count = count;
            Ok(self)
        }

        pub fn build(self) -> Result<ValidatedValue, ValidationError> {
            CanBuild {
                name: self.name,
                count: self.count,
            }
            .build()
        }
    }

    fn construct(
        mut fields: DecodedFields<'_>,
        canonical: Value,
    ) -> Result<Box<dyn ContractValue>, DeserializationError> {
        let name = fields.take_string("name")?;
        let count = fields.take_opt_i64("count")?;
        Ok(Box::new(ValidatedValue {
            name,
            count,
            canonical: Some(canonical),
        }))
    }

    pub fn register(
        registry: &mut ContractRegistry,
        set: &ContractSet,
    ) -> Result<(), SerializationError> {
        let members = classify(set, &CONTRACT_ID).expect("Validated classifies");
        registry.register_contract(
            ContractDescriptor {
                id: CONTRACT_ID.clone(),
                extends: vec![],
                generatable: true,
                members,
                instance_validator: Some(ValidatorRef::new("not_reserved")),
            },
            Some(construct),
        )?;
        registry.register_cast(
            TypeId::of::<ValidatedValue>(),
            CONTRACT_ID.clone(),
            contract_cast!(ValidatedValue => Validated),
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// demo.types.Wrapped
// ---------------------------------------------------------------------------

pub mod wrapped {
    use std::any::{Any, TypeId};

    use serde_json::Value;

    use dtoforge::classify::classify;
    use dtoforge::contract::{
        ContractDescriptor, ContractRegistry, ContractValue, DecodedFields, FieldValue,
        Serializable, TypeToken,
    };
    use dtoforge::contract_cast;
    use dtoforge::error::{DeserializationError, SerializationError};
    use dtoforge::ir::{ContractId, ContractSet};

    use super::Payload;

    pub static CONTRACT_ID: ContractId = ContractId::from_static("demo.types.Wrapped");

    /// demo.types.Wrapped
    pub trait Wrapped: Serializable {
        fn payload(&self) -> &Payload;
    }

    pub struct WrappedValue {
        payload: Payload,
        canonical: Option<Value>,
    }

    impl Wrapped for WrappedValue {
        fn payload(&self) -> &Payload {
            &self.payload
        }
    }

    impl Serializable for WrappedValue {
        fn type_token(&self) -> TypeToken {
            TypeToken::of::<Self>()
        }

        fn contract_ids(&self) -> &'static [ContractId] {
            static IDS: [ContractId; 1] = [ContractId::from_static("demo.types.Wrapped")];
            &IDS
        }

        fn member(&self, field_name: &str) -> FieldValue<'_> {
            match field_name {
                "payload" => FieldValue::Opaque(&self.payload, "Payload"),
                _ => FieldValue::Null,
            }
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_serializable(&self) -> &dyn Serializable {
            self
        }
    }

    impl ContractValue for WrappedValue {
        fn contract_id(&self) -> &ContractId {
            &CONTRACT_ID
        }

        fn canonical_json(&self) -> Option<&Value> {
            self.canonical.as_ref()
        }

        fn into_any(self: Box<Self>) -> Box<dyn Any> {
            self
        }
    }

    impl std::fmt::Debug for WrappedValue {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match &self.canonical {
                Some(json) => {
                    let text = serde_json::to_string_pretty(json).map_err(|_| std::fmt::Error)?;
                    f.write_str(&text)
                }
                None => {
                    write!(f, "{}:{{", CONTRACT_ID)?;
                    write!(f, "payload: {:?}", Serializable::member(self, "payload"))?;
                    f.write_str("}")
                }
            }
        }
    }

    pub fn builder() -> RequiresPayload {
        RequiresPayload
    }

    pub struct RequiresPayload;

    impl RequiresPayload {
        pub fn with_payload(self, payload: Payload) -> CanBuild {
            CanBuild { payload }
        }
    }

    pub struct CanBuild {
        payload: Payload,
    }

    impl CanBuild {
        pub fn build(self) -> WrappedValue {
            WrappedValue {
                payload: self.payload,
                canonical: None,
            }
        }
    }

    fn construct(
        mut fields: DecodedFields<'_>,
        canonical: Value,
    ) -> Result<Box<dyn ContractValue>, DeserializationError> {
        let payload = fields.take_opaque::<Payload>("payload")?;
        Ok(Box::new(WrappedValue {
            payload,
            canonical: Some(canonical),
        }))
    }

    pub fn register(
        registry: &mut ContractRegistry,
        set: &ContractSet,
    ) -> Result<(), SerializationError> {
        let members = classify(set, &CONTRACT_ID).expect("Wrapped classifies");
        registry.register_contract(
            ContractDescriptor {
                id: CONTRACT_ID.clone(),
                extends: vec![],
                generatable: true,
                members,
                instance_validator: None,
            },
            Some(construct),
        )?;
        registry.register_cast(
            TypeId::of::<WrappedValue>(),
            CONTRACT_ID.clone(),
            contract_cast!(WrappedValue => Wrapped),
        );
        Ok(())
    }
}
