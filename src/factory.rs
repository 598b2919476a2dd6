//! Factories and the factory cache
//!
//! An [`ObjectFactory`] is the encode/decode capability pair for one
//! contract. The [`FactoryCache`] resolves which factory applies to a
//! concrete runtime type — unbounded (exactly one generatable contract in
//! the type's closure), bounded (the most general generatable contract
//! assignable to the bound), or by serialized name during decode — and
//! memoizes the answer for the life of the process.
//!
//! Concurrent first access is handled by recomputation, not mutual
//! exclusion: resolution is a pure function of the type's registered
//! structure, so two racing threads publish observably-equivalent factories
//! and no caller ever blocks on another thread's resolution.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use serde_json::Value;
use tracing::{debug, trace};

use crate::codec;
use crate::contract::{ContractDescriptor, ContractRegistry, ContractValue, Serializable};
use crate::error::{DeserializationError, SerializationError};
use crate::ir::ContractId;
use crate::service::SerializationService;

/// The encode/decode pair for one contract
#[derive(Debug)]
pub struct ObjectFactory {
    descriptor: Arc<ContractDescriptor>,
}

impl ObjectFactory {
    fn new(descriptor: Arc<ContractDescriptor>) -> Self {
        Self { descriptor }
    }

    pub fn contract_id(&self) -> &ContractId {
        &self.descriptor.id
    }

    pub fn descriptor(&self) -> &ContractDescriptor {
        &self.descriptor
    }

    pub fn encode(
        &self,
        service: &SerializationService,
        instance: &dyn Serializable,
    ) -> Result<Value, SerializationError> {
        codec::encode_contract(service, &self.descriptor, instance)
    }

    pub fn decode(
        &self,
        service: &SerializationService,
        json: &Value,
    ) -> Result<Box<dyn ContractValue>, DeserializationError> {
        codec::decode_contract(service, &self.descriptor, json)
    }
}

#[derive(PartialEq, Eq, Hash)]
enum FactoryKey {
    /// Resolution for a concrete runtime type, optionally within a bound
    Instance {
        type_id: TypeId,
        bound: Option<ContractId>,
    },
    /// Resolution from a serialized contract identifier
    Named(ContractId),
}

/// Memoizes factory resolution per `(concrete type, bound)` and per
/// serialized name. Entries live for the process lifetime; there is no
/// eviction.
#[derive(Default)]
pub struct FactoryCache {
    factories: RwLock<HashMap<FactoryKey, Arc<ObjectFactory>>>,
}

impl FactoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn cached(&self, key: &FactoryKey) -> Option<Arc<ObjectFactory>> {
        self.factories
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(key)
            .cloned()
    }

    fn publish(&self, key: FactoryKey, factory: Arc<ObjectFactory>) -> Arc<ObjectFactory> {
        self.factories
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .entry(key)
            .or_insert(factory)
            .clone()
    }

    /// Unbounded resolution: the instance's closure must contain exactly one
    /// generatable contract.
    pub fn factory_for(
        &self,
        registry: &ContractRegistry,
        instance: &dyn Serializable,
    ) -> Result<Arc<ObjectFactory>, SerializationError> {
        let token = instance.type_token();
        let key = FactoryKey::Instance {
            type_id: token.type_id,
            bound: None,
        };
        if let Some(hit) = self.cached(&key) {
            trace!(type_name = token.type_name, "factory cache hit");
            return Ok(hit);
        }

        let mut candidates = registry.generatable_closure(instance);
        let contract = match candidates.len() {
            0 => {
                return Err(SerializationError::NoContract {
                    type_name: token.type_name,
                })
            }
            1 => candidates.remove(0),
            _ => {
                return Err(SerializationError::MultipleContracts {
                    type_name: token.type_name,
                    candidates,
                })
            }
        };
        debug!(type_name = token.type_name, contract = %contract, "resolved contract");
        let factory = self.factory_of(registry, &contract)?;
        Ok(self.publish(key, factory))
    }

    /// Bounded resolution: among the generatable contracts the instance
    /// implements that are assignable to `bound`, select the most general
    /// one (the qualifying contract nearest the top of the extends
    /// hierarchy — usually the bound itself). Serializing as a wider
    /// contract must never leak narrower members.
    pub fn factory_within(
        &self,
        registry: &ContractRegistry,
        instance: &dyn Serializable,
        bound: &ContractId,
    ) -> Result<Arc<ObjectFactory>, SerializationError> {
        let token = instance.type_token();
        let key = FactoryKey::Instance {
            type_id: token.type_id,
            bound: Some(bound.clone()),
        };
        if let Some(hit) = self.cached(&key) {
            return Ok(hit);
        }

        let mut best: Option<(usize, ContractId)> = None;
        for candidate in registry.generatable_closure(instance) {
            if !registry.is_assignable(&candidate, bound) {
                continue;
            }
            let Some(depth) = registry.depth(&candidate, bound) else {
                continue;
            };
            let better = match &best {
                None => true,
                Some((best_depth, _)) => depth <= *best_depth,
            };
            if better {
                best = Some((depth, candidate));
            }
        }
        let (_, contract) = best.ok_or_else(|| SerializationError::NoContractWithinBound {
            type_name: token.type_name,
            bound: bound.clone(),
        })?;
        debug!(type_name = token.type_name, %bound, contract = %contract, "resolved bounded contract");
        let factory = self.factory_of(registry, &contract)?;
        Ok(self.publish(key, factory))
    }

    /// By-name resolution from a `serializedType` identifier. Unresolvable
    /// identifiers are a data error and carry a closest-match suggestion.
    pub fn factory_named(
        &self,
        registry: &ContractRegistry,
        name: &str,
    ) -> Result<Arc<ObjectFactory>, DeserializationError> {
        let id = ContractId::new(name);
        let key = FactoryKey::Named(id.clone());
        if let Some(hit) = self.cached(&key) {
            return Ok(hit);
        }

        let descriptor = registry
            .descriptor(&id)
            .ok_or_else(|| DeserializationError::UnknownSerializedType {
                name: name.to_string(),
                suggestion: closest_id(registry, name),
            })?;
        if !descriptor.generatable {
            return Err(DeserializationError::NotDecodable(id));
        }
        let factory = Arc::new(ObjectFactory::new(descriptor));
        Ok(self.publish(key, factory))
    }

    fn factory_of(
        &self,
        registry: &ContractRegistry,
        contract: &ContractId,
    ) -> Result<Arc<ObjectFactory>, SerializationError> {
        let descriptor = registry
            .descriptor(contract)
            .ok_or_else(|| SerializationError::UnregisteredContract(contract.clone()))?;
        Ok(Arc::new(ObjectFactory::new(descriptor)))
    }
}

fn closest_id(registry: &ContractRegistry, name: &str) -> Option<String> {
    let matcher = SkimMatcherV2::default();
    registry
        .known_ids()
        .filter_map(|id| {
            matcher
                .fuzzy_match(id.as_str(), name)
                .map(|score| (score, id))
        })
        .max_by_key(|(score, _)| *score)
        .map(|(_, id)| id.to_string())
}
