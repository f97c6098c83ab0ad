//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check node integrity (unique ids, exactly one primary)
//! - Validate value ranges (intervals > 0, thresholds within scale)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ArbiterConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::fmt;

use crate::config::schema::ArbiterConfig;
use crate::registry::NodeRole;
use crate::rules::RuleError;

/// A single semantic problem, tagged with the offending field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_config(config: &ArbiterConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let nonzero = [
        ("monitor.interval_secs", config.monitor.interval_secs),
        ("monitor.probe_timeout_secs", config.monitor.probe_timeout_secs),
        ("monitor.history_limit", config.monitor.history_limit as u64),
        ("evaluation.interval_secs", config.evaluation.interval_secs),
    ];
    for (field, value) in nonzero {
        if value == 0 {
            errors.push(ValidationError::new(field, "must be greater than zero"));
        }
    }

    if !config.probe.path.starts_with('/') {
        errors.push(ValidationError::new("probe.path", "must start with '/'"));
    }

    let mut ids = HashSet::new();
    for (i, node) in config.nodes.iter().enumerate() {
        let id = node.node_id();
        if id.as_str().is_empty() {
            errors.push(ValidationError::new(format!("nodes[{}].name", i), "must not be empty"));
        } else if !ids.insert(id.clone()) {
            errors.push(ValidationError::new(
                format!("nodes[{}].id", i),
                format!("duplicate node id '{}'", id),
            ));
        }
        if node.address.trim().is_empty() {
            errors.push(ValidationError::new(format!("nodes[{}].address", i), "must not be empty"));
        }
        if node.priority == 0 {
            errors.push(ValidationError::new(format!("nodes[{}].priority", i), "must be at least 1"));
        }
        if !(0.0..=100.0).contains(&node.uptime_percent) {
            errors.push(ValidationError::new(
                format!("nodes[{}].uptime_percent", i),
                "must be between 0 and 100",
            ));
        }
    }

    let primaries = config
        .nodes
        .iter()
        .filter(|n| n.role == NodeRole::Primary)
        .count();
    if !config.nodes.is_empty() && primaries != 1 {
        errors.push(ValidationError::new(
            "nodes",
            format!("exactly one primary required, found {}", primaries),
        ));
    }

    let mut rule_ids = HashSet::new();
    for (i, rule) in config.rules.iter().enumerate() {
        if !rule_ids.insert(rule.id.as_str()) {
            errors.push(ValidationError::new(
                format!("rules[{}].id", i),
                format!("duplicate rule id '{}'", rule.id),
            ));
        }
        if let Err(RuleError::Invalid { field, message, .. }) = rule.validate() {
            errors.push(ValidationError::new(format!("rules[{}].{}", i, field), message));
        }
    }

    if config.admin.enabled && config.admin.api_key.trim().is_empty() {
        errors.push(ValidationError::new("admin.api_key", "required when admin API is enabled"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::NodeConfig;
    use crate::registry::DataSyncStatus;
    use crate::rules::FailoverRule;

    fn node(name: &str, role: NodeRole, priority: u32) -> NodeConfig {
        NodeConfig {
            id: None,
            name: name.to_string(),
            address: "127.0.0.1:9000".to_string(),
            region: String::new(),
            role,
            priority,
            capabilities: Vec::new(),
            data_sync_status: DataSyncStatus::Synced,
            uptime_percent: 99.0,
        }
    }

    fn fields(config: &ArbiterConfig) -> Vec<String> {
        validate_config(config)
            .unwrap_err()
            .into_iter()
            .map(|e| e.field)
            .collect()
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&ArbiterConfig::default()).is_ok());
    }

    #[test]
    fn test_requires_exactly_one_primary() {
        let mut config = ArbiterConfig::default();
        config.nodes = vec![node("a", NodeRole::Secondary, 1), node("b", NodeRole::Secondary, 2)];
        assert_eq!(fields(&config), vec!["nodes"]);

        config.nodes[0].role = NodeRole::Primary;
        config.nodes[1].role = NodeRole::Primary;
        assert_eq!(fields(&config), vec!["nodes"]);

        config.nodes[1].role = NodeRole::Secondary;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = ArbiterConfig::default();
        config.monitor.interval_secs = 0;
        config.probe.path = "health".to_string();
        config.nodes = vec![node("a", NodeRole::Primary, 1), node("A", NodeRole::Secondary, 0)];
        let mut rule = FailoverRule::critical();
        rule.trigger.health_score_threshold = 120;
        config.rules.push(rule);

        let found = fields(&config);
        assert!(found.contains(&"monitor.interval_secs".to_string()));
        assert!(found.contains(&"probe.path".to_string()));
        assert!(found.contains(&"nodes[1].id".to_string()));
        assert!(found.contains(&"nodes[1].priority".to_string()));
        assert!(found.contains(&"rules[2].id".to_string()));
        assert!(found.contains(&"rules[2].trigger.health_score_threshold".to_string()));
    }

    #[test]
    fn test_rule_that_always_fires_is_rejected() {
        let mut config = ArbiterConfig::default();
        config.rules[0].trigger.consecutive_failures = 0;
        config.rules[1].trigger.uptime_threshold = -1.0;
        assert_eq!(
            fields(&config),
            vec![
                "rules[0].trigger.consecutive_failures",
                "rules[1].trigger.uptime_threshold",
            ]
        );
    }

    #[test]
    fn test_admin_needs_key() {
        let mut config = ArbiterConfig::default();
        config.admin.enabled = true;
        config.admin.api_key = String::new();
        assert_eq!(fields(&config), vec!["admin.api_key"]);
    }
}
