//! Best-effort diagnostic formatting
//!
//! A text form for logging and debugging that never fails: values of
//! registered contracts render as a field enumeration through their dynamic
//! member accessor, anything else degrades to a bare type-name form. The
//! output is not a wire format and must never be fed back to `deserialize`.
//!
//! A per-type formatter can be registered to override the generic routine.

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt::Write;
use std::sync::Arc;

use crate::contract::{ContractRegistry, Serializable};

/// A registered diagnostic formatter for one concrete value type
pub trait DebugFormatter: Send + Sync {
    fn format(&self, instance: &dyn Serializable) -> String;
}

/// Field-enumerating diagnostic formatter with per-type overrides
pub struct BestEffortFormatter {
    registry: Arc<ContractRegistry>,
    overrides: HashMap<TypeId, Arc<dyn DebugFormatter>>,
}

impl BestEffortFormatter {
    pub fn new(registry: Arc<ContractRegistry>) -> Self {
        Self {
            registry,
            overrides: HashMap::new(),
        }
    }

    /// Override the generic routine for one concrete type
    pub fn register_override(&mut self, type_id: TypeId, formatter: Arc<dyn DebugFormatter>) {
        self.overrides.insert(type_id, formatter);
    }

    /// Render any serializable value. Degrades, never fails.
    pub fn format(&self, instance: &dyn Serializable) -> String {
        let token = instance.type_token();
        if let Some(custom) = self.overrides.get(&token.type_id) {
            return custom.format(instance);
        }

        let Some(contract) = instance.contract_ids().first() else {
            return format!("{}:{{}}", token.type_name);
        };
        let Some(descriptor) = self.registry.descriptor(contract) else {
            return format!("{}:{{<unregistered {}>}}", token.type_name, contract);
        };

        let mut out = format!("{}:{{", contract);
        let mut first = true;
        for member in &descriptor.members {
            if !first {
                out.push_str(", ");
            }
            first = false;
            let value = instance.member(&member.field_name);
            // Debug on FieldValue cannot fail, so neither can this
            let _ = write!(out, "{}: {:?}", member.field_name, value);
        }
        out.push('}');
        out
    }
}
