//! Member ledger mutation endpoints.
//!
//! Every mutation goes through the store trait, so the counter adjustment
//! fires inside the same transaction as the ledger write. There is no
//! direct-write bypass exposed here.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::MemberId;
use member_store::{Member, MemberStore, MemberUpdate, NewMember};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S: MemberStore> {
    pub store: S,
}

// -- Request types --

#[derive(Deserialize)]
pub struct CreateMemberRequest {
    pub name: String,
    pub email: String,
}

#[derive(Deserialize)]
pub struct UpdateMemberRequest {
    pub name: Option<String>,
    pub email: Option<String>,
}

// -- Response types --

#[derive(Serialize)]
pub struct MemberResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Member> for MemberResponse {
    fn from(member: Member) -> Self {
        Self {
            id: member.id.to_string(),
            name: member.name,
            email: member.email,
            created_at: member.created_at.to_rfc3339(),
            updated_at: member.updated_at.to_rfc3339(),
        }
    }
}

// -- Handlers --

/// POST /members — add a member to the ledger.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: MemberStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateMemberRequest>,
) -> Result<(axum::http::StatusCode, Json<MemberResponse>), ApiError> {
    if req.name.trim().is_empty() {
        return Err(ApiError::BadRequest("name must not be empty".to_string()));
    }
    if req.email.trim().is_empty() {
        return Err(ApiError::BadRequest("email must not be empty".to_string()));
    }

    let member = state
        .store
        .add_member(NewMember::new(req.name, req.email))
        .await?;

    Ok((axum::http::StatusCode::CREATED, Json(member.into())))
}

/// GET /members/:id — fetch a ledger row by ID.
#[tracing::instrument(skip(state))]
pub async fn get<S: MemberStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<MemberResponse>, ApiError> {
    let member_id = parse_member_id(&id)?;

    let member = state
        .store
        .get_member(member_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Member {id} not found")))?;

    Ok(Json(member.into()))
}

/// PUT /members/:id — update name and/or email; never touches the counter.
#[tracing::instrument(skip(state, req))]
pub async fn update<S: MemberStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateMemberRequest>,
) -> Result<Json<MemberResponse>, ApiError> {
    let member_id = parse_member_id(&id)?;

    if req.name.is_none() && req.email.is_none() {
        return Err(ApiError::BadRequest(
            "at least one of name or email is required".to_string(),
        ));
    }

    let member = state
        .store
        .update_member(
            member_id,
            MemberUpdate {
                name: req.name,
                email: req.email,
            },
        )
        .await?;

    Ok(Json(member.into()))
}

/// DELETE /members/:id — remove a member from the ledger.
#[tracing::instrument(skip(state))]
pub async fn remove<S: MemberStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<axum::http::StatusCode, ApiError> {
    let member_id = parse_member_id(&id)?;

    state.store.remove_member(member_id).await?;

    Ok(axum::http::StatusCode::NO_CONTENT)
}

fn parse_member_id(id: &str) -> Result<MemberId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid ID format: {e}")))?;
    Ok(MemberId::from(uuid))
}
