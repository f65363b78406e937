use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::AppError;
use crate::matching::StrategyKind;
use crate::models::skill::SkillMatch;
use crate::reconcile::admin::{DriftReport, ResyncReport, SeedReport, SkillInventory};
use crate::reconcile::candidate::{apply_to_candidate, candidate_skill_labels};
use crate::skills::{Skill, SkillSet};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct SkillsRequest {
    pub skills: Vec<String>,
}

#[derive(Serialize)]
pub struct SkillsChangedResponse {
    pub skills: SkillSet,
    pub count: usize,
}

#[derive(Deserialize)]
pub struct ReconcileRequest {
    pub labels: Vec<String>,
    /// Overrides the configured strategy for this call.
    pub strategy: Option<String>,
}

#[derive(Serialize)]
pub struct ReconcileResponse {
    pub strategy: StrategyKind,
    pub matches: Vec<SkillMatch>,
    pub inserted: Vec<Skill>,
    pub degraded: bool,
}

#[derive(Deserialize)]
pub struct NormalizeCandidateRequest {
    pub candidate: Value,
    pub strategy: Option<String>,
}

#[derive(Serialize)]
pub struct NormalizeCandidateResponse {
    pub candidate: Value,
    pub rewritten: usize,
    pub matches: Vec<SkillMatch>,
    pub inserted: Vec<Skill>,
    pub degraded: bool,
}

fn require_skills(skills: &[String]) -> Result<(), AppError> {
    if skills.iter().all(|s| s.trim().is_empty()) {
        return Err(AppError::Validation(
            "skills must contain at least one non-blank label".to_string(),
        ));
    }
    Ok(())
}

/// GET /api/v1/skills
pub async fn handle_list_skills(
    State(state): State<AppState>,
) -> Result<Json<SkillInventory>, AppError> {
    Ok(Json(state.reconciler.list_with_status().await?))
}

/// POST /api/v1/skills
pub async fn handle_add_skills(
    State(state): State<AppState>,
    Json(req): Json<SkillsRequest>,
) -> Result<Json<SkillsChangedResponse>, AppError> {
    require_skills(&req.skills)?;
    let skills = state.reconciler.add_skills(&req.skills).await?;
    Ok(Json(SkillsChangedResponse {
        count: skills.len(),
        skills,
    }))
}

/// DELETE /api/v1/skills
pub async fn handle_remove_skills(
    State(state): State<AppState>,
    Json(req): Json<SkillsRequest>,
) -> Result<Json<SkillsChangedResponse>, AppError> {
    require_skills(&req.skills)?;
    let skills = state.reconciler.remove_skills(&req.skills).await?;
    Ok(Json(SkillsChangedResponse {
        count: skills.len(),
        skills,
    }))
}

/// POST /api/v1/skills/seed
pub async fn handle_seed(State(state): State<AppState>) -> Result<Json<SeedReport>, AppError> {
    Ok(Json(state.reconciler.seed_defaults().await?))
}

/// GET /api/v1/skills/audit
pub async fn handle_audit(State(state): State<AppState>) -> Result<Json<DriftReport>, AppError> {
    Ok(Json(state.reconciler.audit().await?))
}

/// POST /api/v1/skills/resync
pub async fn handle_resync(State(state): State<AppState>) -> Result<Json<ResyncReport>, AppError> {
    Ok(Json(state.reconciler.resync().await?))
}

/// POST /api/v1/skills/reconcile
pub async fn handle_reconcile(
    State(state): State<AppState>,
    Json(req): Json<ReconcileRequest>,
) -> Result<Json<ReconcileResponse>, AppError> {
    let matcher = state.matcher(req.strategy.as_deref());
    let result = state
        .reconciler
        .reconcile(&req.labels, matcher.as_ref())
        .await?;
    Ok(Json(ReconcileResponse {
        strategy: matcher.kind(),
        matches: result.matches,
        inserted: result.inserted,
        degraded: result.degraded,
    }))
}

/// POST /api/v1/candidates/normalize
pub async fn handle_normalize_candidate(
    State(state): State<AppState>,
    Json(req): Json<NormalizeCandidateRequest>,
) -> Result<Json<NormalizeCandidateResponse>, AppError> {
    if !req.candidate.is_object() {
        return Err(AppError::Validation(
            "candidate must be a JSON object".to_string(),
        ));
    }
    let labels = candidate_skill_labels(&req.candidate);
    let matcher = state.matcher(req.strategy.as_deref());
    let result = state
        .reconciler
        .reconcile(&labels, matcher.as_ref())
        .await?;

    let mut candidate = req.candidate;
    let rewritten = apply_to_candidate(&mut candidate, &result.matches);
    Ok(Json(NormalizeCandidateResponse {
        candidate,
        rewritten,
        matches: result.matches,
        inserted: result.inserted,
        degraded: result.degraded,
    }))
}
