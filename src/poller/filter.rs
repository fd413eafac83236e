//! 实例元数据保留规则

use crate::config::KeepFilter;
use crate::registry::InstanceRecord;

/// 有序的保留规则集合
///
/// 没有规则时保留全部实例；否则只要有一条规则命中即保留：
/// 元数据包含该 key，且期望值为空或与元数据值相等。
#[derive(Debug, Clone, Default)]
pub struct KeepRules {
    rules: Vec<KeepFilter>,
}

impl KeepRules {
    pub fn new(rules: Vec<KeepFilter>) -> Self {
        Self { rules }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn matches(&self, instance: &InstanceRecord) -> bool {
        if self.rules.is_empty() {
            return true;
        }
        self.rules.iter().any(|rule| {
            instance
                .metadata
                .get(&rule.key)
                .map(|v| rule.value.is_empty() || *v == rule.value)
                .unwrap_or(false)
        })
    }

    /// 健康且命中规则
    pub fn retains(&self, instance: &InstanceRecord) -> bool {
        instance.healthy && self.matches(instance)
    }
}

impl From<Vec<KeepFilter>> for KeepRules {
    fn from(rules: Vec<KeepFilter>) -> Self {
        Self::new(rules)
    }
}
