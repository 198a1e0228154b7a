//! In-memory autoscaler policy store.

use super::gate::Gate;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use wizflow_pipeline::autoscaler::{AutoscalerPolicy, AutoscalerPolicyApi};
use wizflow_pipeline::remote::{RemoteError, RemoteResult};

#[derive(Default)]
struct State {
    policies: HashMap<String, AutoscalerPolicy>,
    updates: Vec<(String, AutoscalerPolicy)>,
    get_gate: Option<Gate>,
    fail_updates: bool,
}

/// Policy store keyed by application guid
#[derive(Clone, Default)]
pub struct InMemoryAutoscalerPolicyApi {
    state: Arc<RwLock<State>>,
}

impl InMemoryAutoscalerPolicyApi {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `policy` for `app_guid`
    pub fn with_policy(self, app_guid: &str, policy: AutoscalerPolicy) -> Self {
        self.state.write().policies.insert(app_guid.to_string(), policy);
        self
    }

    /// Holds every `get_policy` call at `gate`
    pub fn gate_reads(&self, gate: Gate) {
        self.state.write().get_gate = Some(gate);
    }

    /// Makes `update_policy` fail
    pub fn fail_updates(&self) {
        self.state.write().fail_updates = true;
    }

    /// Stored policy of `app_guid`
    pub fn policy(&self, app_guid: &str) -> Option<AutoscalerPolicy> {
        self.state.read().policies.get(app_guid).cloned()
    }

    /// Updates received, in order
    pub fn updates(&self) -> Vec<(String, AutoscalerPolicy)> {
        self.state.read().updates.clone()
    }
}

#[async_trait]
impl AutoscalerPolicyApi for InMemoryAutoscalerPolicyApi {
    async fn get_policy(&self, app_guid: &str) -> RemoteResult<Option<AutoscalerPolicy>> {
        let gate = self.state.read().get_gate.clone();
        if let Some(gate) = gate {
            gate.pass().await;
        }
        Ok(self.policy(app_guid))
    }

    async fn update_policy(&self, app_guid: &str, policy: AutoscalerPolicy) -> RemoteResult<()> {
        let mut state = self.state.write();
        state.updates.push((app_guid.to_string(), policy.clone()));
        if state.fail_updates {
            return Err(RemoteError::Request {
                status: 400,
                message: "Invalid policy".to_string(),
            });
        }
        state.policies.insert(app_guid.to_string(), policy);
        Ok(())
    }
}
