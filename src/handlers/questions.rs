use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
};
use validator::Validate;

use crate::{
    AppState, access,
    auth::AuthUser,
    errors::{AppError, AppResult, ErrorResponse},
    models::{
        CountResponse, CreateQuestionRequest, ImageUploadForm, ImageUploadResponse, MessageResponse,
        Page, PageQuery, Question, QuestionFilter, QuestionQuery, StatusFilter,
        UpdateQuestionRequest,
    },
};

/// Loads a question and applies the ownership rule: 404 first, then 403.
async fn load_for(state: &AppState, id: i64, principal: &AuthUser) -> AppResult<Question> {
    let question = state
        .repo
        .get_question(id)
        .await?
        .ok_or_else(AppError::question_not_found)?;
    access::ensure_owner_or_admin(principal, question.user_id)?;
    Ok(question)
}

/// create_question
///
/// [Authenticated Route] Submits a new question owned by the caller.
/// Required text is trimmed before validation; the question always starts as `pending`.
#[utoipa::path(
    post,
    path = "/questions",
    request_body = CreateQuestionRequest,
    responses(
        (status = 201, description = "Question created", body = Question),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_question(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateQuestionRequest>,
) -> AppResult<(StatusCode, Json<Question>)> {
    let payload = payload.normalized();
    payload.validate()?;

    let question = state.repo.create_question(payload, user_id).await?;
    Ok((StatusCode::CREATED, Json(question)))
}

/// list_questions
///
/// [Authenticated Route] Searches questions. Admins search the whole bank,
/// everyone else only their own submissions.
#[utoipa::path(
    get,
    path = "/questions",
    params(QuestionQuery),
    responses(
        (status = 200, description = "Matching questions", body = [Question]),
        (status = 400, description = "Invalid pagination", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_questions(
    principal: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<QuestionQuery>,
) -> AppResult<Json<Vec<Question>>> {
    query.validate()?;

    let filter = QuestionFilter {
        owner_id: access::listing_scope(&principal),
        status: query.status,
        topic: query.topic,
        school_level: query.school_level,
    };
    let page = Page {
        skip: query.skip,
        limit: query.limit,
    };

    let questions = state.repo.list_questions(filter, page).await?;
    Ok(Json(questions))
}

/// list_my_questions
///
/// [Authenticated Route] The caller's own questions, for admins too.
#[utoipa::path(
    get,
    path = "/questions/my",
    params(PageQuery),
    responses((status = 200, description = "My questions", body = [Question])),
    security(("bearer_auth" = []))
)]
pub async fn list_my_questions(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<Vec<Question>>> {
    query.validate()?;

    let filter = QuestionFilter {
        owner_id: Some(user_id),
        ..QuestionFilter::default()
    };
    let page = Page {
        skip: query.skip,
        limit: query.limit,
    };

    let questions = state.repo.list_questions(filter, page).await?;
    Ok(Json(questions))
}

/// count_questions
///
/// [Authenticated Route] Same scoping as the listing.
#[utoipa::path(
    get,
    path = "/questions/count",
    params(StatusFilter),
    responses((status = 200, description = "Number of visible questions", body = CountResponse)),
    security(("bearer_auth" = []))
)]
pub async fn count_questions(
    principal: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<StatusFilter>,
) -> AppResult<Json<CountResponse>> {
    let total = state
        .repo
        .count_questions(access::listing_scope(&principal), filter.status)
        .await?;
    Ok(Json(CountResponse { total }))
}

#[utoipa::path(
    get,
    path = "/questions/{id}",
    params(("id" = i64, Path, description = "Question id")),
    responses(
        (status = 200, description = "Question", body = Question),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_question(
    principal: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Question>> {
    let question = load_for(&state, id, &principal).await?;
    Ok(Json(question))
}

/// update_question
///
/// [Authenticated Route] Partial update by the owner or an admin.
/// Fields that are absent or `null` keep their stored value. `status` is
/// accepted here too, without any transition guard.
#[utoipa::path(
    put,
    path = "/questions/{id}",
    params(("id" = i64, Path, description = "Question id")),
    request_body = UpdateQuestionRequest,
    responses(
        (status = 200, description = "Updated question", body = Question),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_question(
    principal: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateQuestionRequest>,
) -> AppResult<Json<Question>> {
    load_for(&state, id, &principal).await?;

    let payload = payload.normalized();
    payload.validate()?;

    // Deleted between the check and the write.
    let question = state
        .repo
        .update_question(id, payload)
        .await?
        .ok_or_else(AppError::question_not_found)?;
    Ok(Json(question))
}

#[utoipa::path(
    delete,
    path = "/questions/{id}",
    params(("id" = i64, Path, description = "Question id")),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_question(
    principal: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<MessageResponse>> {
    load_for(&state, id, &principal).await?;

    if !state.repo.delete_question(id).await? {
        return Err(AppError::question_not_found());
    }

    tracing::info!(question_id = id, by = principal.id, "question deleted");
    Ok(Json(MessageResponse {
        message: "Question deleted successfully".to_string(),
    }))
}

/// upload_image
///
/// [Authenticated Route] Attaches an image to a question.
///
/// Expects a multipart body with a `file` part whose declared content type starts
/// with `image/`. The bytes are stored under a fresh UUID name and the question's
/// `image_url` is pointed at `/uploads/<name>`.
#[utoipa::path(
    post,
    path = "/questions/{id}/upload-image",
    params(("id" = i64, Path, description = "Question id")),
    request_body(content = ImageUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Image stored", body = ImageUploadResponse),
        (status = 400, description = "Missing file or not an image", body = ErrorResponse),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn upload_image(
    principal: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    mut multipart: Multipart,
) -> AppResult<Json<ImageUploadResponse>> {
    load_for(&state, id, &principal).await?;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let content_type = field.content_type().unwrap_or_default();
        if !content_type.starts_with("image/") {
            return Err(AppError::Validation("File must be an image".to_string()));
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?;
        upload = Some((filename, bytes));
        break;
    }

    let (filename, bytes) =
        upload.ok_or_else(|| AppError::Validation("Missing 'file' field".to_string()))?;

    let url = state.storage.save(&filename, &bytes).await.map_err(|e| {
        tracing::error!(question_id = id, "image upload failed: {}", e);
        AppError::Internal(format!("Error uploading image: {}", e))
    })?;

    state
        .repo
        .update_question(id, UpdateQuestionRequest::image(url.clone()))
        .await?
        .ok_or_else(AppError::question_not_found)?;

    Ok(Json(ImageUploadResponse {
        message: "Image uploaded successfully".to_string(),
        url,
    }))
}
