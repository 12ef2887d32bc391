use crate::buckets::BucketLayout;
use serde::{Deserialize, Serialize};

/// One prefix-scoped, time-based deletion rule enforced by the object
/// store itself. Rules are registered out of band by operator tooling;
/// the cache never invokes them at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleRule {
    /// Key prefix the rule applies to, including the trailing slash.
    pub prefix: String,
    pub expire_after_days: u32,
}

/// One rule per configured bucket class. The persistent bucket carries
/// no rule.
pub fn rules_for(layout: &BucketLayout) -> Vec<LifecycleRule> {
    layout
        .classes()
        .iter()
        .map(|class| LifecycleRule {
            prefix: format!("{}/", class.label()),
            expire_after_days: class.days(),
        })
        .collect()
}
