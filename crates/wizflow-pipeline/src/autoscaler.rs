//! Autoscaler policy editor
//!
//! A one-step wizard editing the global instance limits and the schedule
//! timezone of an application's autoscaler policy.

use crate::error::{outcome, PipelineError, PipelineResult};
use crate::remote::RemoteResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use wizflow_core::domain::validation::number_with_fraction_or_exceed_range;
use wizflow_core::{
    FormValidator, Step, StepHandler, StepOutcome, ValidationErrors, WorkflowDefinition,
    WorkflowEngine,
};

/// Schedules of a policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicySchedules {
    /// IANA timezone the schedules are expressed in
    pub timezone: String,
}

/// Autoscaler policy of an application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoscalerPolicy {
    /// Lower bound of the instance count
    pub instance_min_count: u32,
    /// Upper bound of the instance count
    pub instance_max_count: u32,
    /// Schedules
    pub schedules: PolicySchedules,
    /// Scaling rules, passed through untouched
    #[serde(default)]
    pub scaling_rules: Vec<serde_json::Value>,
}

impl Default for AutoscalerPolicy {
    fn default() -> Self {
        Self {
            instance_min_count: 1,
            instance_max_count: 10,
            schedules: PolicySchedules {
                timezone: "UTC".to_string(),
            },
            scaling_rules: Vec::new(),
        }
    }
}

/// Values of the limits form
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyLimits {
    /// Minimum instance count
    pub instance_min_count: u32,
    /// Maximum instance count
    pub instance_max_count: u32,
    /// Schedule timezone
    pub timezone: String,
}

impl PolicyLimits {
    /// Form values for an existing policy
    pub fn from_policy(policy: &AutoscalerPolicy) -> Self {
        Self {
            instance_min_count: policy.instance_min_count,
            instance_max_count: policy.instance_max_count,
            timezone: policy.schedules.timezone.clone(),
        }
    }

    /// `policy` with these limits applied
    pub fn apply_to(&self, policy: &AutoscalerPolicy) -> AutoscalerPolicy {
        let mut updated = policy.clone();
        updated.instance_min_count = self.instance_min_count;
        updated.instance_max_count = self.instance_max_count;
        updated.schedules.timezone = self.timezone.clone();
        updated
    }
}

/// Context of one policy edit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AutoscalerContext {
    /// Application whose policy is edited
    pub app_guid: String,
    /// Form values
    pub limits: PolicyLimits,
    /// Policy as loaded, or the default one
    pub current_policy: Option<AutoscalerPolicy>,
    /// Policy as saved by the last step
    pub saved_policy: Option<AutoscalerPolicy>,
}

/// Backend storing autoscaler policies
#[async_trait]
pub trait AutoscalerPolicyApi: Send + Sync {
    /// Current policy; `None` when the application has none
    async fn get_policy(&self, app_guid: &str) -> RemoteResult<Option<AutoscalerPolicy>>;

    /// Replace the policy
    async fn update_policy(&self, app_guid: &str, policy: AutoscalerPolicy) -> RemoteResult<()>;
}

/// Checks `1 <= min < max` with whole numbers
#[derive(Debug, Default, Clone, Copy)]
pub struct LimitsValidator;

impl LimitsValidator {
    /// Validate form values
    pub fn check(limits: &PolicyLimits) -> Result<(), ValidationErrors> {
        let min = f64::from(limits.instance_min_count);
        let max = f64::from(limits.instance_max_count);
        let mut errors = ValidationErrors::new();

        if number_with_fraction_or_exceed_range(Some(min), 1.0, max - 1.0, true) {
            errors.add(
                "instance_min_count",
                format!(
                    "The minimum instance count must be an integer from 1 to {}",
                    limits.instance_max_count.saturating_sub(1)
                ),
            );
        }

        if number_with_fraction_or_exceed_range(Some(max), min + 1.0, f64::MAX, true) {
            errors.add(
                "instance_max_count",
                format!(
                    "The maximum instance count must be an integer greater than {}",
                    limits.instance_min_count
                ),
            );
        }

        errors.into_result()
    }
}

impl FormValidator<AutoscalerContext> for LimitsValidator {
    fn validate(&self, ctx: &AutoscalerContext) -> Result<(), ValidationErrors> {
        let mut errors = match Self::check(&ctx.limits) {
            Ok(()) => ValidationErrors::new(),
            Err(errors) => errors,
        };
        errors.require_text("timezone", &ctx.limits.timezone, "Please select a timezone");
        errors.into_result()
    }
}

/// Loads the policy when the form is shown
struct LoadPolicy {
    api: Arc<dyn AutoscalerPolicyApi>,
    app_guid: String,
}

#[async_trait]
impl StepHandler<AutoscalerContext> for LoadPolicy {
    async fn handle(&self, ctx: &mut AutoscalerContext) -> StepOutcome {
        ctx.app_guid = self.app_guid.clone();

        let policy = match self.api.get_policy(&self.app_guid).await {
            Ok(Some(policy)) => policy,
            Ok(None) => {
                debug!(app_guid = %self.app_guid, "No autoscaler policy, using defaults");
                AutoscalerPolicy::default()
            }
            Err(e) => {
                warn!(app_guid = %self.app_guid, error = %e, "Could not load autoscaler policy");
                AutoscalerPolicy::default()
            }
        };

        ctx.limits = PolicyLimits::from_policy(&policy);
        ctx.current_policy = Some(policy);
        StepOutcome::Success
    }
}

/// Saves the edited policy
struct SavePolicy {
    api: Arc<dyn AutoscalerPolicyApi>,
}

impl SavePolicy {
    async fn run(&self, ctx: &mut AutoscalerContext) -> PipelineResult<()> {
        if ctx.app_guid.is_empty() {
            return Err(PipelineError::MissingInput("application"));
        }

        let base = ctx.current_policy.clone().unwrap_or_default();
        let policy = ctx.limits.apply_to(&base);
        self.api.update_policy(&ctx.app_guid, policy.clone()).await?;

        info!(
            app_guid = %ctx.app_guid,
            min = policy.instance_min_count,
            max = policy.instance_max_count,
            "Autoscaler policy saved"
        );
        ctx.saved_policy = Some(policy);
        Ok(())
    }
}

#[async_trait]
impl StepHandler<AutoscalerContext> for SavePolicy {
    async fn handle(&self, ctx: &mut AutoscalerContext) -> StepOutcome {
        outcome(self.run(ctx).await)
    }
}

/// Controller of the autoscaler policy editor
pub struct EditAutoscalerPolicyWorkflow {
    engine: Arc<WorkflowEngine<AutoscalerContext>>,
    api: Arc<dyn AutoscalerPolicyApi>,
}

impl EditAutoscalerPolicyWorkflow {
    /// Create a controller driving `engine`
    pub fn new(engine: Arc<WorkflowEngine<AutoscalerContext>>, api: Arc<dyn AutoscalerPolicyApi>) -> Self {
        Self { engine, api }
    }

    /// The engine running the editor
    pub fn engine(&self) -> &Arc<WorkflowEngine<AutoscalerContext>> {
        &self.engine
    }

    /// Definition for editing the policy of `app_guid`
    pub fn definition(&self, app_guid: &str) -> WorkflowDefinition<AutoscalerContext> {
        WorkflowDefinition::new("Edit AutoScaler Policy").with_step(
            Step::new("Default Instance Limits", "edit-limit-form")
                .with_template("autoscaler/edit-limits.html")
                .with_next_label("Save")
                .with_validator(Arc::new(LimitsValidator))
                .with_on_enter(Arc::new(LoadPolicy {
                    api: self.api.clone(),
                    app_guid: app_guid.to_string(),
                }))
                .with_on_next(Arc::new(SavePolicy {
                    api: self.api.clone(),
                }))
                .last_step(),
        )
    }

    /// Start editing; the form resets and then fills from the loaded policy
    pub async fn start(&self, app_guid: &str) -> PipelineResult<()> {
        self.engine.start_workflow(self.definition(app_guid)).await?;
        Ok(())
    }

    /// Change the form values
    pub async fn set_limits(&self, limits: PolicyLimits) -> PipelineResult<()> {
        self.engine
            .update_context(move |ctx| ctx.limits = limits.clone())
            .await?;
        Ok(())
    }

    /// Abandon the edit
    pub async fn stop(&self) -> PipelineResult<()> {
        self.engine.stop_workflow().await?;
        Ok(())
    }
}
