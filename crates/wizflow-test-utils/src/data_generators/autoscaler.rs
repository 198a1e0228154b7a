//! Autoscaler fixtures.

use wizflow_pipeline::autoscaler::{AutoscalerPolicy, PolicyLimits, PolicySchedules};

/// Stored policy with a memory rule
pub fn policy(min: u32, max: u32) -> AutoscalerPolicy {
    AutoscalerPolicy {
        instance_min_count: min,
        instance_max_count: max,
        schedules: PolicySchedules {
            timezone: "Europe/Berlin".to_string(),
        },
        scaling_rules: vec![serde_json::json!({
            "metric_type": "memoryused",
            "threshold": 80,
            "operator": ">=",
            "adjustment": "+1"
        })],
    }
}

/// Form values
pub fn limits(min: u32, max: u32) -> PolicyLimits {
    PolicyLimits {
        instance_min_count: min,
        instance_max_count: max,
        timezone: "UTC".to_string(),
    }
}
