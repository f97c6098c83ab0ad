//! Rule evaluation and configuration.

use std::collections::HashSet;
use std::sync::{PoisonError, RwLock};

use thiserror::Error;

use crate::registry::Node;
use crate::rules::rule::{FailoverRule, TriggerCause};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    #[error("rule already exists: {0}")]
    DuplicateRule(String),

    #[error("unknown rule: {0}")]
    UnknownRule(String),

    #[error("invalid rule '{rule}': {field} {message}")]
    Invalid {
        rule: String,
        field: &'static str,
        message: &'static str,
    },
}

/// A rule that fired, with the condition that fired it.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleMatch {
    pub rule: FailoverRule,
    pub cause: TriggerCause,
}

/// Ordered set of failover rules.
#[derive(Debug, Default)]
pub struct RuleEngine {
    rules: RwLock<Vec<FailoverRule>>,
}

impl RuleEngine {
    /// Engine over rules that already passed config validation.
    pub fn new(mut rules: Vec<FailoverRule>) -> Self {
        rules.sort_by_key(|r| r.priority);
        Self {
            rules: RwLock::new(rules),
        }
    }

    /// First enabled rule, by ascending priority, that the primary trips.
    pub fn evaluate(&self, primary: &Node) -> Option<RuleMatch> {
        let rules = self.rules.read().unwrap_or_else(PoisonError::into_inner);
        rules
            .iter()
            .filter(|rule| rule.enabled)
            .find_map(|rule| {
                rule.triggered_by(primary).map(|cause| RuleMatch {
                    rule: rule.clone(),
                    cause,
                })
            })
    }

    /// All rules in evaluation order.
    pub fn rules(&self) -> Vec<FailoverRule> {
        self.rules.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn get(&self, id: &str) -> Option<FailoverRule> {
        self.rules
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|rule| rule.id == id)
            .cloned()
    }

    pub fn add_rule(&self, rule: FailoverRule) -> Result<(), RuleError> {
        rule.validate()?;
        let mut rules = self.rules.write().unwrap_or_else(PoisonError::into_inner);
        if rules.iter().any(|r| r.id == rule.id) {
            return Err(RuleError::DuplicateRule(rule.id));
        }
        tracing::info!(rule = %rule.id, priority = rule.priority, "Failover rule added");
        rules.push(rule);
        rules.sort_by_key(|r| r.priority);
        Ok(())
    }

    /// Replace the rule with the same id.
    pub fn update_rule(&self, rule: FailoverRule) -> Result<(), RuleError> {
        rule.validate()?;
        let mut rules = self.rules.write().unwrap_or_else(PoisonError::into_inner);
        let slot = rules
            .iter_mut()
            .find(|r| r.id == rule.id)
            .ok_or_else(|| RuleError::UnknownRule(rule.id.clone()))?;
        tracing::info!(rule = %rule.id, "Failover rule updated");
        *slot = rule;
        rules.sort_by_key(|r| r.priority);
        Ok(())
    }

    pub fn set_enabled(&self, id: &str, enabled: bool) -> Result<(), RuleError> {
        let mut rules = self.rules.write().unwrap_or_else(PoisonError::into_inner);
        let rule = rules
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| RuleError::UnknownRule(id.to_string()))?;
        rule.enabled = enabled;
        tracing::info!(rule = %id, enabled, "Failover rule toggled");
        Ok(())
    }

    pub fn remove_rule(&self, id: &str) -> Result<FailoverRule, RuleError> {
        let mut rules = self.rules.write().unwrap_or_else(PoisonError::into_inner);
        let index = rules
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| RuleError::UnknownRule(id.to_string()))?;
        tracing::info!(rule = %id, "Failover rule removed");
        Ok(rules.remove(index))
    }

    /// Swap in a whole new rule set (config reload). Nothing changes if any rule is invalid.
    pub fn replace_all(&self, mut next: Vec<FailoverRule>) -> Result<(), RuleError> {
        let mut seen = HashSet::new();
        for rule in &next {
            rule.validate()?;
            if !seen.insert(rule.id.as_str()) {
                return Err(RuleError::DuplicateRule(rule.id.clone()));
            }
        }
        next.sort_by_key(|r| r.priority);
        let mut rules = self.rules.write().unwrap_or_else(PoisonError::into_inner);
        *rules = next;
        Ok(())
    }
}
