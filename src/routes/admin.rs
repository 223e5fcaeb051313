use crate::{AppState, handlers::admin};
use axum::{
    Router,
    routing::{get, put},
};

/// Admin Router Module
///
/// Moderation, user management, export and dashboard endpoints. Nested under
/// `/admin` and wrapped in the `AdminUser` layer; each handler also takes
/// `AdminUser` itself so it stays safe if mounted elsewhere.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /admin/users?skip=&limit=
        .route("/users", get(admin::list_users))
        // PUT /admin/users/{id}/role
        // Partial update of role, username or email.
        .route("/users/{id}/role", put(admin::update_user_role))
        // GET /admin/questions?status=
        // Moderation queue across every owner.
        .route("/questions", get(admin::list_all_questions))
        // PUT /admin/questions/{id}/status?status=approved
        // Any status may follow any other.
        .route("/questions/{id}/status", put(admin::set_question_status))
        // GET /admin/export/excel?status=
        // Streams back an .xlsx attachment.
        .route("/export/excel", get(admin::export_excel))
        .route("/stats", get(admin::get_admin_stats))
}
