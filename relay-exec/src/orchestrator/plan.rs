use std::collections::{BTreeMap, BTreeSet};

use relay_core::Value;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::backend::BackendRegistry;
use crate::orchestrator::result::OrchestratorError;

/// Planner output for one client request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicalRequest {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    /// Ambient document every call's request block reads from.
    #[serde(default)]
    pub context: Value,
    /// `ALL`, `PRIORITY`, `HIERARCHY`; anything else means no cancellation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancel_order: Option<String>,
    /// Call ids forming the cancellation group.
    #[serde(default)]
    pub registered: Vec<String>,
    pub calls: Vec<PlannedCall>,
}

impl LogicalRequest {
    pub fn new(context: Value, calls: Vec<PlannedCall>) -> Self {
        Self {
            id: Uuid::new_v4(),
            context,
            cancel_order: None,
            registered: Vec::new(),
            calls,
        }
    }

    pub fn with_cancel_order(mut self, order: impl Into<String>) -> Self {
        self.cancel_order = Some(order.into());
        self
    }

    pub fn with_registered<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.registered = ids.into_iter().map(Into::into).collect();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedCall {
    pub id: String,
    pub backend: String,
    pub service: String,
    #[serde(default)]
    pub priority: i32,
    /// Hierarchy position: the call this one descends from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// Successor dispatched once this call completes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
}

impl PlannedCall {
    pub fn new(id: impl Into<String>, backend: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            backend: backend.into(),
            service: service.into(),
            priority: 0,
            parent: None,
            next: None,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_next(mut self, next: impl Into<String>) -> Self {
        self.next = Some(next.into());
        self
    }
}

/// Validated call graph of a logical request.
#[derive(Debug, Clone)]
pub struct CallGraph {
    calls: BTreeMap<String, PlannedCall>,
    roots: Vec<String>,
    registered: BTreeSet<String>,
}

impl CallGraph {
    pub fn build(request: &LogicalRequest, registry: &BackendRegistry) -> Result<Self, OrchestratorError> {
        let mut calls = BTreeMap::new();
        for call in &request.calls {
            let backend = registry
                .get(&call.backend)
                .ok_or_else(|| OrchestratorError::UnknownBackend(call.backend.clone()))?;
            if backend.service(&call.service).is_none() {
                return Err(OrchestratorError::UnknownService {
                    backend: call.backend.clone(),
                    service: call.service.clone(),
                });
            }
            if calls.insert(call.id.clone(), call.clone()).is_some() {
                return Err(OrchestratorError::DuplicateCall(call.id.clone()));
            }
        }

        let mut successors = BTreeSet::new();
        for call in calls.values() {
            if let Some(parent) = &call.parent {
                if !calls.contains_key(parent) {
                    return Err(OrchestratorError::DanglingLink {
                        call: call.id.clone(),
                        target: parent.clone(),
                    });
                }
            }
            if let Some(next) = &call.next {
                if !calls.contains_key(next) {
                    return Err(OrchestratorError::DanglingLink {
                        call: call.id.clone(),
                        target: next.clone(),
                    });
                }
                if next == &call.id || !successors.insert(next.clone()) {
                    return Err(OrchestratorError::InvalidChain(next.clone()));
                }
            }
        }

        // Every successor must be reachable from a root, otherwise the chain is a cycle.
        let roots: Vec<String> = calls
            .keys()
            .filter(|id| !successors.contains(*id))
            .cloned()
            .collect();
        let mut reachable = 0;
        for root in &roots {
            let mut cur = calls.get(root).and_then(|c| c.next.as_ref());
            while let Some(id) = cur {
                reachable += 1;
                cur = calls.get(id).and_then(|c| c.next.as_ref());
            }
        }
        if reachable != successors.len() {
            let stray = successors.iter().next().cloned().unwrap_or_default();
            return Err(OrchestratorError::InvalidChain(stray));
        }

        Ok(Self {
            calls,
            roots,
            registered: request.registered.iter().cloned().collect(),
        })
    }

    pub fn get(&self, id: &str) -> Option<&PlannedCall> {
        self.calls.get(id)
    }

    /// Calls that are nobody's successor, dispatched up front.
    pub fn roots(&self) -> &[String] {
        &self.roots
    }

    pub fn is_registered(&self, id: &str) -> bool {
        self.registered.contains(id)
    }

    pub fn has_registered(&self) -> bool {
        !self.registered.is_empty()
    }

    /// The chain hanging off `id`, in order, excluding `id` itself.
    pub fn chain_after(&self, id: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut cur = self.calls.get(id).and_then(|c| c.next.clone());
        while let Some(next) = cur {
            cur = self.calls.get(&next).and_then(|c| c.next.clone());
            out.push(next);
        }
        out
    }
}
