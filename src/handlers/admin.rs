use axum::{
    Json,
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    AppState,
    auth::AdminUser,
    errors::{AppError, AppResult, ErrorResponse},
    export,
    models::{
        AdminDashboardStats, Page, Question, QuestionFilter, StatusFilter, StatusQuery,
        StatusUpdateResponse, UpdateUserRequest, User, UserListQuery,
    },
};

/// list_users
///
/// [Admin Route] Every account, ordered by id.
#[utoipa::path(
    get,
    path = "/admin/users",
    params(UserListQuery),
    responses(
        (status = 200, description = "Users", body = [User]),
        (status = 403, description = "Admin privileges required", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_users(
    _admin: AdminUser,
    State(state): State<AppState>,
    Query(query): Query<UserListQuery>,
) -> AppResult<Json<Vec<User>>> {
    query.validate()?;
    let users = state
        .repo
        .list_users(Page {
            skip: query.skip,
            limit: query.limit,
        })
        .await?;
    Ok(Json(users))
}

/// update_user_role
///
/// [Admin Route] Changes a user's role (and optionally username/email).
#[utoipa::path(
    put,
    path = "/admin/users/{id}/role",
    params(("id" = i64, Path, description = "User id")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated user", body = User),
        (status = 400, description = "Invalid input or already registered", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_user_role(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateUserRequest>,
) -> AppResult<Json<User>> {
    payload.validate()?;

    let user = state
        .repo
        .update_user(id, payload)
        .await?
        .ok_or_else(AppError::user_not_found)?;

    tracing::info!(user_id = id, role = %user.role, by = admin.id, "user updated");
    Ok(Json(user))
}

/// set_question_status
///
/// [Admin Route] Moderation. Any status may follow any other; repeating the
/// current status succeeds without changing anything else.
#[utoipa::path(
    put,
    path = "/admin/questions/{id}/status",
    params(("id" = i64, Path, description = "Question id"), StatusQuery),
    responses(
        (status = 200, description = "Status changed", body = StatusUpdateResponse),
        (status = 404, description = "Question not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn set_question_status(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(StatusQuery { status }): Query<StatusQuery>,
) -> AppResult<Json<StatusUpdateResponse>> {
    state
        .repo
        .set_question_status(id, status)
        .await?
        .ok_or_else(AppError::question_not_found)?;

    tracing::info!(question_id = id, %status, by = admin.id, "question moderated");
    Ok(Json(StatusUpdateResponse {
        message: format!("Question status updated to {}", status),
        question_id: id,
        status,
    }))
}

/// export_excel
///
/// [Admin Route] Downloads the (optionally status-filtered) bank as `.xlsx`.
#[utoipa::path(
    get,
    path = "/admin/export/excel",
    params(StatusFilter),
    responses(
        (status = 200, description = "The .xlsx workbook as an attachment"),
        (status = 403, description = "Admin privileges required", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn export_excel(
    _admin: AdminUser,
    State(state): State<AppState>,
    Query(StatusFilter { status }): Query<StatusFilter>,
) -> AppResult<impl IntoResponse> {
    let filter = QuestionFilter {
        status,
        ..QuestionFilter::default()
    };
    let questions = state.repo.list_questions(filter, Page::ALL).await?;
    let bytes = export::build_workbook(&questions)?;

    tracing::info!(rows = questions.len(), "spreadsheet exported");

    let headers = [
        (header::CONTENT_TYPE, export::CONTENT_TYPE.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename={}", export::export_filename(status)),
        ),
    ];
    Ok((headers, bytes))
}

/// get_admin_stats
///
/// [Admin Route] Counters for the moderation dashboard.
#[utoipa::path(
    get,
    path = "/admin/stats",
    responses((status = 200, description = "Dashboard counters", body = AdminDashboardStats)),
    security(("bearer_auth" = []))
)]
pub async fn get_admin_stats(
    _admin: AdminUser,
    State(state): State<AppState>,
) -> AppResult<Json<AdminDashboardStats>> {
    let stats = state.repo.get_stats().await?;
    Ok(Json(stats))
}

/// list_all_questions
///
/// [Admin Route] The moderation queue: every owner, optionally one status.
#[utoipa::path(
    get,
    path = "/admin/questions",
    params(StatusFilter),
    responses((status = 200, description = "Questions", body = [Question])),
    security(("bearer_auth" = []))
)]
pub async fn list_all_questions(
    _admin: AdminUser,
    State(state): State<AppState>,
    Query(StatusFilter { status }): Query<StatusFilter>,
) -> AppResult<Json<Vec<Question>>> {
    let filter = QuestionFilter {
        status,
        ..QuestionFilter::default()
    };
    let questions = state.repo.list_questions(filter, Page::ALL).await?;
    Ok(Json(questions))
}
