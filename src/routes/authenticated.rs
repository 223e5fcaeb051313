use crate::{
    AppState,
    handlers::{auth, questions},
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

/// Authenticated Router Module
///
/// Every route here sits behind the `AuthUser` layer. Ownership of individual
/// questions is checked inside the handlers (creator or admin).
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        .route("/auth/me", get(auth::me))
        // POST/GET /questions
        // Create, or search with status/topic/school_level filters. Non-admins only
        // ever see their own questions.
        .route(
            "/questions",
            post(questions::create_question).get(questions::list_questions),
        )
        .route(
            "/questions/",
            post(questions::create_question).get(questions::list_questions),
        )
        // GET /questions/my
        // The caller's own questions regardless of role.
        .route("/questions/my", get(questions::list_my_questions))
        .route("/questions/count", get(questions::count_questions))
        // GET/PUT/DELETE /questions/{id}
        .route(
            "/questions/{id}",
            get(questions::get_question)
                .put(questions::update_question)
                .delete(questions::delete_question),
        )
        // POST /questions/{id}/upload-image
        // Multipart upload; the file lands in the upload directory and is served
        // back under /uploads. Uploads are not size-capped.
        .route(
            "/questions/{id}/upload-image",
            post(questions::upload_image).layer(DefaultBodyLimit::disable()),
        )
}
