use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::{get, patch},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use roteiro_order::affiliate::{summarize, AffiliateSummary, CommissionTier, COMMISSION_TIERS};
use roteiro_order::{Affiliate, AffiliateAction, AffiliateStatus, CommissionStatus, Referral};
use roteiro_shared::format_brl;

use crate::error::AppError;
use crate::extract::ApiJson;
use crate::middleware::{admin_auth_middleware, user_auth_middleware, Claims};
use crate::state::AppState;

#[derive(Debug, Serialize)]
struct TierView {
    #[serde(flatten)]
    tier: CommissionTier,
    bonus_display: String,
}

#[derive(Debug, Serialize)]
struct AffiliateDetail {
    affiliate: Affiliate,
    summary: AffiliateSummary,
    referrals: Vec<Referral>,
}

#[derive(Debug, Deserialize)]
struct ApplyRequest {
    name: Option<String>,
    pix_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AffiliateListQuery {
    status: Option<AffiliateStatus>,
}

#[derive(Debug, Deserialize)]
struct AffiliateUpdate {
    action: Option<AffiliateAction>,
    commission_rate: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct ReferralUpdate {
    status: CommissionStatus,
}

pub fn routes(state: AppState) -> Router<AppState> {
    let user = Router::new()
        .route("/api/affiliates/me", get(my_affiliate).post(apply))
        .route("/api/affiliates/referrals", get(my_referrals))
        .route_layer(from_fn_with_state(state.clone(), user_auth_middleware));

    let admin = Router::new()
        .route("/api/affiliates", get(list_affiliates))
        .route("/api/affiliates/{id}", get(get_affiliate).patch(update_affiliate))
        .route("/api/affiliates/referrals/{id}", patch(update_referral))
        .route_layer(from_fn_with_state(state, admin_auth_middleware));

    Router::new()
        .route("/api/affiliates/tiers", get(list_tiers))
        .merge(user)
        .merge(admin)
}

async fn list_tiers() -> Json<Vec<TierView>> {
    Json(
        COMMISSION_TIERS
            .iter()
            .map(|tier| TierView {
                tier: *tier,
                bonus_display: format_brl(tier.bonus_cents),
            })
            .collect(),
    )
}

async fn detail(state: &AppState, affiliate: Affiliate) -> Result<AffiliateDetail, AppError> {
    let referrals = state.affiliates.list_referrals(affiliate.id).await?;
    Ok(AffiliateDetail {
        summary: summarize(&referrals),
        affiliate,
        referrals,
    })
}

async fn my_affiliate(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<AffiliateDetail>, AppError> {
    let affiliate = state
        .affiliates
        .find_affiliate_by_user(&claims.sub)
        .await?
        .ok_or_else(|| AppError::not_found("affiliate profile"))?;
    Ok(Json(detail(&state, affiliate).await?))
}

async fn apply(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<ApplyRequest>,
) -> Result<(StatusCode, Json<Affiliate>), AppError> {
    if state.affiliates.find_affiliate_by_user(&claims.sub).await?.is_some() {
        return Err(AppError::ConflictError("already registered as affiliate".into()));
    }

    let name = req
        .name
        .or(claims.name.clone())
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| claims.email.clone());
    let pix_key = req.pix_key.map(|k| k.trim().to_string()).filter(|k| !k.is_empty());

    let affiliate = Affiliate::new(
        claims.sub.clone(),
        name,
        claims.email.clone(),
        state.business_rules.default_commission_rate,
        pix_key,
    );
    state.affiliates.create_affiliate(&affiliate).await?;
    info!("Affiliate application {} from {}", affiliate.code, claims.sub);
    Ok((StatusCode::CREATED, Json(affiliate)))
}

async fn my_referrals(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Referral>>, AppError> {
    let affiliate = state
        .affiliates
        .find_affiliate_by_user(&claims.sub)
        .await?
        .ok_or_else(|| AppError::not_found("affiliate profile"))?;
    Ok(Json(state.affiliates.list_referrals(affiliate.id).await?))
}

async fn list_affiliates(
    State(state): State<AppState>,
    Query(query): Query<AffiliateListQuery>,
) -> Result<Json<Vec<Affiliate>>, AppError> {
    Ok(Json(state.affiliates.list_affiliates(query.status).await?))
}

async fn get_affiliate(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<AffiliateDetail>, AppError> {
    let affiliate = state
        .affiliates
        .get_affiliate(id)
        .await?
        .ok_or_else(|| AppError::not_found(format_args!("affiliate {id}")))?;
    Ok(Json(detail(&state, affiliate).await?))
}

async fn update_affiliate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ApiJson(update): ApiJson<AffiliateUpdate>,
) -> Result<Json<Affiliate>, AppError> {
    if update.action.is_none() && update.commission_rate.is_none() {
        return Err(AppError::ValidationError("action or commission_rate is required".into()));
    }

    let mut affiliate = state
        .affiliates
        .get_affiliate(id)
        .await?
        .ok_or_else(|| AppError::not_found(format_args!("affiliate {id}")))?;

    if let Some(rate) = update.commission_rate {
        affiliate.set_commission_rate(rate)?;
    }
    if let Some(action) = update.action {
        affiliate.apply(action)?;
        info!("Affiliate {} is now {}", affiliate.code, affiliate.status.as_str());
    }

    state.affiliates.update_affiliate(&affiliate).await?;
    Ok(Json(affiliate))
}

async fn update_referral(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ApiJson(update): ApiJson<ReferralUpdate>,
) -> Result<Json<Referral>, AppError> {
    let mut referral = state
        .affiliates
        .get_referral(id)
        .await?
        .ok_or_else(|| AppError::not_found(format_args!("referral {id}")))?;

    referral.advance(update.status)?;
    state.affiliates.update_referral(&referral).await?;
    Ok(Json(referral))
}
