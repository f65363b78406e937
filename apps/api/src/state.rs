use std::sync::Arc;

use crate::matching::{build_matcher, SkillMatcher, StrategyKind};
use crate::reconcile::ReconciliationService;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub reconciler: Arc<ReconciliationService>,
    /// Strategy used when a request does not name one. Set via SKILL_MATCH_STRATEGY.
    pub default_strategy: StrategyKind,
}

impl AppState {
    /// Resolves an optional per-request strategy name to a matcher.
    pub fn matcher(&self, name: Option<&str>) -> Arc<dyn SkillMatcher> {
        let kind = name
            .map(StrategyKind::from_name)
            .unwrap_or(self.default_strategy);
        build_matcher(kind, self.reconciler.index())
    }
}
