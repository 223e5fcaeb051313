use crate::{
    errors::AppResult,
    models::{
        AdminDashboardStats, CreateQuestionRequest, NewUser, Page, Question, QuestionFilter,
        QuestionStatus, StoredUser, UpdateQuestionRequest, UpdateUserRequest, User,
    },
};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, query_builder::QueryBuilder};
use std::sync::Arc;

/// Repository Trait
///
/// The abstract contract for all persistence operations. Handlers only ever see
/// `Arc<dyn Repository>`, so tests can swap in an in-memory implementation.
///
/// Authorization is NOT enforced here: callers decide who may touch what
/// (see `access`), the repository just reads and writes rows.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn create_user(&self, user: NewUser) -> AppResult<User>;
    async fn get_user_by_username(&self, username: &str) -> AppResult<Option<StoredUser>>;
    async fn get_user_by_email(&self, email: &str) -> AppResult<Option<User>>;
    async fn list_users(&self, page: Page) -> AppResult<Vec<User>>;
    /// Applies only the present fields. `None` when the user does not exist.
    async fn update_user(&self, id: i64, req: UpdateUserRequest) -> AppResult<Option<User>>;

    // --- Questions ---
    /// Inserts with `status = pending` and `registered_on = today`.
    async fn create_question(&self, req: CreateQuestionRequest, owner_id: i64) -> AppResult<Question>;
    async fn get_question(&self, id: i64) -> AppResult<Option<Question>>;
    /// Ordered by id, owner embedded. Text filters are case-insensitive substrings.
    async fn list_questions(&self, filter: QuestionFilter, page: Page) -> AppResult<Vec<Question>>;
    async fn count_questions(
        &self,
        owner_id: Option<i64>,
        status: Option<QuestionStatus>,
    ) -> AppResult<i64>;
    /// Applies only the present fields. `None` when the question does not exist.
    async fn update_question(
        &self,
        id: i64,
        req: UpdateQuestionRequest,
    ) -> AppResult<Option<Question>>;
    async fn set_question_status(
        &self,
        id: i64,
        status: QuestionStatus,
    ) -> AppResult<Option<Question>>;
    /// Returns true if a row was deleted.
    async fn delete_question(&self, id: i64) -> AppResult<bool>;

    // --- Dashboard ---
    async fn get_stats(&self) -> AppResult<AdminDashboardStats>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

const USER_COLUMNS: &str = "id, username, email, role, created_at, updated_at";

/// Question columns plus the owner's columns under an `owner_` prefix.
/// Expects the question relation aliased `q` and the users relation aliased `u`.
const QUESTION_COLUMNS: &str = r#"
    q.id, q.user_id, q.registered_on, q.topic, q.subtopic, q.statement, q.question_type,
    q.image_url, q.image_description, q.image_source, q.school_level,
    q.alternative_a, q.alternative_b, q.alternative_c, q.alternative_d, q.alternative_e,
    q.correct_answer, q.correct_answer_text, q.hint, q.bibliographic_source,
    q.exam_year, q.exam_board, q.status, q.created_at, q.updated_at,
    u.id AS owner_id, u.username AS owner_username, u.email AS owner_email,
    u.role AS owner_role, u.created_at AS owner_created_at, u.updated_at AS owner_updated_at
"#;

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by PostgreSQL.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Appends the WHERE clauses shared by listing and counting.
    fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: QuestionFilter) {
        if let Some(owner_id) = filter.owner_id {
            builder.push(" AND q.user_id = ").push_bind(owner_id);
        }
        if let Some(status) = filter.status {
            builder.push(" AND q.status = ").push_bind(status);
        }
        if let Some(topic) = filter.topic {
            builder.push(" AND q.topic ILIKE ").push_bind(format!("%{}%", topic));
        }
        if let Some(level) = filter.school_level {
            builder
                .push(" AND q.school_level ILIKE ")
                .push_bind(format!("%{}%", level));
        }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    // --- USERS ---

    async fn create_user(&self, user: NewUser) -> AppResult<User> {
        let sql = format!(
            "INSERT INTO users (username, email, password_hash, role) VALUES ($1, $2, $3, $4) RETURNING {}",
            USER_COLUMNS
        );
        // A unique violation here becomes AppError::Conflict via From<sqlx::Error>.
        let created = sqlx::query_as::<_, User>(&sql)
            .bind(user.username)
            .bind(user.email)
            .bind(user.password_hash)
            .bind(user.role)
            .fetch_one(&self.pool)
            .await?;
        Ok(created)
    }

    async fn get_user_by_username(&self, username: &str) -> AppResult<Option<StoredUser>> {
        let sql = format!(
            "SELECT {}, password_hash FROM users WHERE username = $1",
            USER_COLUMNS
        );
        let user = sqlx::query_as::<_, StoredUser>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn get_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn list_users(&self, page: Page) -> AppResult<Vec<User>> {
        let sql = format!(
            "SELECT {} FROM users ORDER BY id ASC OFFSET $1 LIMIT $2",
            USER_COLUMNS
        );
        let users = sqlx::query_as::<_, User>(&sql)
            .bind(page.skip)
            .bind(page.limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    /// Uses `COALESCE` so that only the fields present in `req` are written.
    async fn update_user(&self, id: i64, req: UpdateUserRequest) -> AppResult<Option<User>> {
        let sql = format!(
            r#"
            UPDATE users
            SET username = COALESCE($2, username),
                email = COALESCE($3, email),
                role = COALESCE($4, role),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(req.username)
            .bind(req.email)
            .bind(req.role)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    // --- QUESTIONS ---

    /// Inserts and joins the owner back in one round trip through a CTE.
    async fn create_question(&self, req: CreateQuestionRequest, owner_id: i64) -> AppResult<Question> {
        let sql = format!(
            r#"
            WITH q AS (
                INSERT INTO questions (
                    user_id, topic, subtopic, statement, question_type,
                    image_url, image_description, image_source, school_level,
                    alternative_a, alternative_b, alternative_c, alternative_d, alternative_e,
                    correct_answer, correct_answer_text, hint, bibliographic_source,
                    exam_year, exam_board
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)
                RETURNING *
            )
            SELECT {} FROM q JOIN users u ON u.id = q.user_id
            "#,
            QUESTION_COLUMNS
        );

        let question = sqlx::query_as::<_, Question>(&sql)
            .bind(owner_id)
            .bind(req.topic)
            .bind(req.subtopic)
            .bind(req.statement)
            .bind(req.question_type)
            .bind(req.image_url)
            .bind(req.image_description)
            .bind(req.image_source)
            .bind(req.school_level)
            .bind(req.alternative_a)
            .bind(req.alternative_b)
            .bind(req.alternative_c)
            .bind(req.alternative_d)
            .bind(req.alternative_e)
            .bind(req.correct_answer)
            .bind(req.correct_answer_text)
            .bind(req.hint)
            .bind(req.bibliographic_source)
            .bind(req.exam_year)
            .bind(req.exam_board)
            .fetch_one(&self.pool)
            .await?;

        tracing::info!(question_id = question.id, owner_id, "question created");
        Ok(question)
    }

    async fn get_question(&self, id: i64) -> AppResult<Option<Question>> {
        let sql = format!(
            "SELECT {} FROM questions q JOIN users u ON u.id = q.user_id WHERE q.id = $1",
            QUESTION_COLUMNS
        );
        let question = sqlx::query_as::<_, Question>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(question)
    }

    /// Flexible filtering through `QueryBuilder`; every user-supplied value is bound.
    async fn list_questions(&self, filter: QuestionFilter, page: Page) -> AppResult<Vec<Question>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {} FROM questions q JOIN users u ON u.id = q.user_id WHERE 1 = 1",
            QUESTION_COLUMNS
        ));

        Self::push_filters(&mut builder, filter);

        builder
            .push(" ORDER BY q.id ASC OFFSET ")
            .push_bind(page.skip)
            .push(" LIMIT ")
            .push_bind(page.limit);

        let questions = builder
            .build_query_as::<Question>()
            .fetch_all(&self.pool)
            .await?;
        Ok(questions)
    }

    async fn count_questions(
        &self,
        owner_id: Option<i64>,
        status: Option<QuestionStatus>,
    ) -> AppResult<i64> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM questions q WHERE 1 = 1");

        Self::push_filters(
            &mut builder,
            QuestionFilter {
                owner_id,
                status,
                ..QuestionFilter::default()
            },
        );

        let total = builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }

    /// Partial update. Required columns use `COALESCE`, so `None` keeps the stored
    /// value. Nullable columns take a "provided" flag plus a value, so `Some(None)`
    /// writes NULL.
    async fn update_question(
        &self,
        id: i64,
        req: UpdateQuestionRequest,
    ) -> AppResult<Option<Question>> {
        let sql = format!(
            r#"
            WITH q AS (
                UPDATE questions
                SET topic = COALESCE($2, topic),
                    subtopic = COALESCE($3, subtopic),
                    statement = COALESCE($4, statement),
                    question_type = COALESCE($5, question_type),
                    school_level = COALESCE($6, school_level),
                    alternative_a = COALESCE($7, alternative_a),
                    alternative_b = COALESCE($8, alternative_b),
                    alternative_c = COALESCE($9, alternative_c),
                    alternative_d = COALESCE($10, alternative_d),
                    alternative_e = COALESCE($11, alternative_e),
                    correct_answer = COALESCE($12, correct_answer),
                    correct_answer_text = COALESCE($13, correct_answer_text),
                    status = COALESCE($14, status),
                    image_url = CASE WHEN $15 THEN $16 ELSE image_url END,
                    image_description = CASE WHEN $17 THEN $18 ELSE image_description END,
                    image_source = CASE WHEN $19 THEN $20 ELSE image_source END,
                    hint = CASE WHEN $21 THEN $22 ELSE hint END,
                    bibliographic_source = CASE WHEN $23 THEN $24 ELSE bibliographic_source END,
                    exam_year = CASE WHEN $25 THEN $26 ELSE exam_year END,
                    exam_board = CASE WHEN $27 THEN $28 ELSE exam_board END,
                    updated_at = NOW()
                WHERE id = $1
                RETURNING *
            )
            SELECT {} FROM q JOIN users u ON u.id = q.user_id
            "#,
            QUESTION_COLUMNS
        );

        let question = sqlx::query_as::<_, Question>(&sql)
            .bind(id)
            .bind(req.topic)
            .bind(req.subtopic)
            .bind(req.statement)
            .bind(req.question_type)
            .bind(req.school_level)
            .bind(req.alternative_a)
            .bind(req.alternative_b)
            .bind(req.alternative_c)
            .bind(req.alternative_d)
            .bind(req.alternative_e)
            .bind(req.correct_answer)
            .bind(req.correct_answer_text)
            .bind(req.status)
            .bind(req.image_url.is_some())
            .bind(req.image_url.flatten())
            .bind(req.image_description.is_some())
            .bind(req.image_description.flatten())
            .bind(req.image_source.is_some())
            .bind(req.image_source.flatten())
            .bind(req.hint.is_some())
            .bind(req.hint.flatten())
            .bind(req.bibliographic_source.is_some())
            .bind(req.bibliographic_source.flatten())
            .bind(req.exam_year.is_some())
            .bind(req.exam_year.flatten())
            .bind(req.exam_board.is_some())
            .bind(req.exam_board.flatten())
            .fetch_optional(&self.pool)
            .await?;
        Ok(question)
    }

    /// Unconditional transition; any status may follow any other.
    async fn set_question_status(
        &self,
        id: i64,
        status: QuestionStatus,
    ) -> AppResult<Option<Question>> {
        let sql = format!(
            r#"
            WITH q AS (
                UPDATE questions SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING *
            )
            SELECT {} FROM q JOIN users u ON u.id = q.user_id
            "#,
            QUESTION_COLUMNS
        );
        let question = sqlx::query_as::<_, Question>(&sql)
            .bind(id)
            .bind(status)
            .fetch_optional(&self.pool)
            .await?;
        Ok(question)
    }

    async fn delete_question(&self, id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM questions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // --- DASHBOARD ---

    /// All dashboard counters in a single statement.
    async fn get_stats(&self) -> AppResult<AdminDashboardStats> {
        let stats = sqlx::query_as::<_, AdminDashboardStats>(
            r#"
            SELECT
                COUNT(*) AS total_questions,
                COUNT(*) FILTER (WHERE status = 'pending') AS pending_questions,
                COUNT(*) FILTER (WHERE status = 'approved') AS approved_questions,
                COUNT(*) FILTER (WHERE status = 'rejected') AS rejected_questions,
                (SELECT COUNT(*) FROM users) AS total_users,
                COUNT(*) FILTER (
                    WHERE status = 'approved' AND updated_at::date = CURRENT_DATE
                ) AS approved_today
            FROM questions
            "#,
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(stats)
    }
}
