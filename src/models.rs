use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, de};
use sqlx::{FromRow, Row, postgres::PgRow};
use thiserror::Error;
use ts_rs::TS;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

// --- Text-backed Enumerations ---

/// UnknownVariant
///
/// Raised when a stored or submitted string does not name a known enum variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} value: '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Implements `as_str`, `Display`, `FromStr` and the Postgres text codec for a
/// fieldless enum stored in a VARCHAR column guarded by a CHECK constraint.
macro_rules! text_enum {
    ($ty:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $ty {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($ty::$variant),)+
                    other => Err(UnknownVariant {
                        kind: stringify!($ty),
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl sqlx::Type<sqlx::Postgres> for $ty {
            fn type_info() -> sqlx::postgres::PgTypeInfo {
                <str as sqlx::Type<sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
                <str as sqlx::Type<sqlx::Postgres>>::compatible(ty)
            }
        }

        impl<'r> sqlx::Decode<'r, sqlx::Postgres> for $ty {
            fn decode(
                value: sqlx::postgres::PgValueRef<'r>,
            ) -> Result<Self, sqlx::error::BoxDynError> {
                let raw = <&str as sqlx::Decode<'r, sqlx::Postgres>>::decode(value)?;
                Ok(raw.parse::<$ty>()?)
            }
        }

        impl<'q> sqlx::Encode<'q, sqlx::Postgres> for $ty {
            fn encode_by_ref(
                &self,
                buf: &mut sqlx::postgres::PgArgumentBuffer,
            ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
                <&str as sqlx::Encode<'q, sqlx::Postgres>>::encode_by_ref(&self.as_str(), buf)
            }
        }
    };
}

/// Role
///
/// The RBAC field of a user. Admins bypass every ownership check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    #[default]
    User,
    Admin,
}

text_enum!(Role { User => "user", Admin => "admin" });

/// QuestionStatus
///
/// Moderation state of a question. Every question starts as `Pending`;
/// transitions between the three states are unrestricted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum QuestionStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

text_enum!(QuestionStatus {
    Pending => "pending",
    Approved => "approved",
    Rejected => "rejected",
});

/// AnswerKey
///
/// The letter of the correct alternative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub enum AnswerKey {
    A,
    B,
    C,
    D,
    E,
}

text_enum!(AnswerKey { A => "A", B => "B", C => "C", D => "D", E => "E" });

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// Public view of a row in the `users` table. The password hash is never part of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: Role,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// StoredUser
///
/// A `users` row together with its Argon2 PHC hash. Only the login flow reads this.
#[derive(Clone, FromRow)]
pub struct StoredUser {
    #[sqlx(flatten)]
    pub user: User,
    pub password_hash: String,
}

/// NewUser
///
/// Insert payload for the repository, built after the password has been hashed.
#[derive(Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

/// Question
///
/// A row of the `questions` table joined with its owner, who is embedded as `user`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Question {
    pub id: i64,
    pub user_id: i64,
    #[ts(type = "string")]
    pub registered_on: NaiveDate,
    pub topic: String,
    pub subtopic: String,
    pub statement: String,
    pub question_type: String,
    pub image_url: Option<String>,
    pub image_description: Option<String>,
    pub image_source: Option<String>,
    pub school_level: String,
    pub alternative_a: String,
    pub alternative_b: String,
    pub alternative_c: String,
    pub alternative_d: String,
    pub alternative_e: String,
    pub correct_answer: AnswerKey,
    pub correct_answer_text: String,
    pub hint: Option<String>,
    pub bibliographic_source: Option<String>,
    pub exam_year: Option<i32>,
    pub exam_board: Option<String>,
    pub status: QuestionStatus,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
    pub user: User,
}

/// Owner columns are selected with an `owner_` prefix so they do not collide
/// with the question's own `id`/`created_at`/`updated_at`.
impl<'r> FromRow<'r, PgRow> for Question {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            registered_on: row.try_get("registered_on")?,
            topic: row.try_get("topic")?,
            subtopic: row.try_get("subtopic")?,
            statement: row.try_get("statement")?,
            question_type: row.try_get("question_type")?,
            image_url: row.try_get("image_url")?,
            image_description: row.try_get("image_description")?,
            image_source: row.try_get("image_source")?,
            school_level: row.try_get("school_level")?,
            alternative_a: row.try_get("alternative_a")?,
            alternative_b: row.try_get("alternative_b")?,
            alternative_c: row.try_get("alternative_c")?,
            alternative_d: row.try_get("alternative_d")?,
            alternative_e: row.try_get("alternative_e")?,
            correct_answer: row.try_get("correct_answer")?,
            correct_answer_text: row.try_get("correct_answer_text")?,
            hint: row.try_get("hint")?,
            bibliographic_source: row.try_get("bibliographic_source")?,
            exam_year: row.try_get("exam_year")?,
            exam_board: row.try_get("exam_board")?,
            status: row.try_get("status")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            user: User {
                id: row.try_get("owner_id")?,
                username: row.try_get("owner_username")?,
                email: row.try_get("owner_email")?,
                role: row.try_get("owner_role")?,
                created_at: row.try_get("owner_created_at")?,
                updated_at: row.try_get("owner_updated_at")?,
            },
        })
    }
}

// --- Request Payloads (Input Schemas) ---

fn default_role() -> Role {
    Role::User
}

/// RegisterUserRequest
///
/// Input payload for `POST /auth/register`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, TS, ToSchema)]
#[ts(export)]
pub struct RegisterUserRequest {
    #[validate(length(min = 1, max = 50, message = "Username must be 1 to 50 characters"))]
    pub username: String,
    #[validate(email(message = "Invalid email format"), length(max = 100))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    #[serde(default = "default_role")]
    pub role: Role,
}

/// LoginForm
///
/// Form-encoded credentials for `POST /auth/login`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// TokenResponse
///
/// Bearer token issued on a successful login.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

/// UpdateUserRequest
///
/// Partial update applied by an admin through `PUT /admin/users/{id}/role`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, TS, ToSchema)]
#[ts(export)]
pub struct UpdateUserRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 50))]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

/// CreateQuestionRequest
///
/// Input payload for `POST /questions`. Call `normalized()` before `validate()`:
/// required text is stored trimmed, and a value that is blank once trimmed is rejected.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, TS, ToSchema)]
#[ts(export)]
pub struct CreateQuestionRequest {
    #[validate(length(min = 1, max = 100, message = "This field is required and cannot be empty"))]
    pub topic: String,
    #[validate(length(min = 1, max = 100, message = "This field is required and cannot be empty"))]
    pub subtopic: String,
    #[validate(length(min = 1, message = "This field is required and cannot be empty"))]
    pub statement: String,
    #[validate(length(min = 1, max = 50, message = "This field is required and cannot be empty"))]
    pub question_type: String,
    #[serde(default)]
    #[validate(length(max = 255))]
    pub image_url: Option<String>,
    #[serde(default)]
    pub image_description: Option<String>,
    #[serde(default)]
    #[validate(length(max = 255))]
    pub image_source: Option<String>,
    #[validate(length(min = 1, max = 50, message = "This field is required and cannot be empty"))]
    pub school_level: String,
    #[validate(length(min = 1, message = "All alternatives are required"))]
    pub alternative_a: String,
    #[validate(length(min = 1, message = "All alternatives are required"))]
    pub alternative_b: String,
    #[validate(length(min = 1, message = "All alternatives are required"))]
    pub alternative_c: String,
    #[validate(length(min = 1, message = "All alternatives are required"))]
    pub alternative_d: String,
    #[validate(length(min = 1, message = "All alternatives are required"))]
    pub alternative_e: String,
    pub correct_answer: AnswerKey,
    #[validate(length(min = 1, message = "All alternatives are required"))]
    pub correct_answer_text: String,
    #[serde(default)]
    pub hint: Option<String>,
    #[serde(default)]
    pub bibliographic_source: Option<String>,
    #[serde(default)]
    pub exam_year: Option<i32>,
    #[serde(default)]
    #[validate(length(max = 100))]
    pub exam_board: Option<String>,
}

impl CreateQuestionRequest {
    pub fn normalized(mut self) -> Self {
        for field in [
            &mut self.topic,
            &mut self.subtopic,
            &mut self.statement,
            &mut self.question_type,
            &mut self.school_level,
            &mut self.alternative_a,
            &mut self.alternative_b,
            &mut self.alternative_c,
            &mut self.alternative_d,
            &mut self.alternative_e,
            &mut self.correct_answer_text,
        ] {
            trim_in_place(field);
        }
        self
    }
}

/// UpdateQuestionRequest
///
/// Partial update payload for `PUT /questions/{id}`. Absent fields are left untouched.
/// Optional fields are `Option<Option<T>>`: an explicit `null` clears the stored value.
/// Required fields reject `null`.
/// `status` is accepted here as well, so owners can move their own questions
/// between moderation states.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, TS, ToSchema)]
#[ts(export)]
pub struct UpdateQuestionRequest {
    #[serde(default, deserialize_with = "non_null", skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 100, message = "This field is required and cannot be empty"))]
    pub topic: Option<String>,
    #[serde(default, deserialize_with = "non_null", skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 100, message = "This field is required and cannot be empty"))]
    pub subtopic: Option<String>,
    #[serde(default, deserialize_with = "non_null", skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "This field is required and cannot be empty"))]
    pub statement: Option<String>,
    #[serde(default, deserialize_with = "non_null", skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 50, message = "This field is required and cannot be empty"))]
    pub question_type: Option<String>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    #[ts(optional)]
    #[validate(length(max = 255))]
    pub image_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    #[ts(optional)]
    pub image_description: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    #[ts(optional)]
    #[validate(length(max = 255))]
    pub image_source: Option<Option<String>>,
    #[serde(default, deserialize_with = "non_null", skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 50, message = "This field is required and cannot be empty"))]
    pub school_level: Option<String>,
    #[serde(default, deserialize_with = "non_null", skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "All alternatives are required"))]
    pub alternative_a: Option<String>,
    #[serde(default, deserialize_with = "non_null", skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "All alternatives are required"))]
    pub alternative_b: Option<String>,
    #[serde(default, deserialize_with = "non_null", skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "All alternatives are required"))]
    pub alternative_c: Option<String>,
    #[serde(default, deserialize_with = "non_null", skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "All alternatives are required"))]
    pub alternative_d: Option<String>,
    #[serde(default, deserialize_with = "non_null", skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "All alternatives are required"))]
    pub alternative_e: Option<String>,
    #[serde(default, deserialize_with = "non_null", skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<AnswerKey>,
    #[serde(default, deserialize_with = "non_null", skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "All alternatives are required"))]
    pub correct_answer_text: Option<String>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    #[ts(optional)]
    pub hint: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    #[ts(optional)]
    pub bibliographic_source: Option<Option<String>>,
    #[serde(default, deserialize_with = "non_null", skip_serializing_if = "Option::is_none")]
    pub status: Option<QuestionStatus>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<i32>)]
    #[ts(optional)]
    pub exam_year: Option<Option<i32>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    #[ts(optional)]
    #[validate(length(max = 100))]
    pub exam_board: Option<Option<String>>,
}

impl UpdateQuestionRequest {
    pub fn normalized(mut self) -> Self {
        for field in [
            &mut self.topic,
            &mut self.subtopic,
            &mut self.statement,
            &mut self.question_type,
            &mut self.school_level,
            &mut self.alternative_a,
            &mut self.alternative_b,
            &mut self.alternative_c,
            &mut self.alternative_d,
            &mut self.alternative_e,
            &mut self.correct_answer_text,
        ]
        .into_iter()
        .flatten()
        {
            trim_in_place(field);
        }
        self
    }

    /// Payload that only points the question at a freshly uploaded image.
    pub fn image(url: String) -> Self {
        Self {
            image_url: Some(Some(url)),
            ..Self::default()
        }
    }
}

/// A present field, `null` included. Paired with `#[serde(default)]`, so an absent
/// field stays `None` while `null` becomes `Some(None)`.
fn nullable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// A present field that must not be `null`.
fn non_null<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer)?
        .map(Some)
        .ok_or_else(|| de::Error::custom("this field cannot be null"))
}

fn trim_in_place(value: &mut String) {
    let trimmed = value.trim();
    if trimmed.len() != value.len() {
        *value = trimmed.to_string();
    }
}

// --- Query Parameters ---

fn default_page_limit() -> i64 {
    50
}

fn default_user_limit() -> i64 {
    100
}

/// QuestionQuery
///
/// Filters and pagination accepted by `GET /questions`.
#[derive(Debug, Clone, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct QuestionQuery {
    #[serde(default)]
    #[validate(range(min = 0))]
    pub skip: i64,
    #[serde(default = "default_page_limit")]
    #[validate(range(min = 1, max = 100))]
    pub limit: i64,
    pub status: Option<QuestionStatus>,
    /// Case-insensitive substring of the topic.
    pub topic: Option<String>,
    /// Case-insensitive substring of the school level.
    pub school_level: Option<String>,
}

/// PageQuery
///
/// Pagination for `GET /questions/my`.
#[derive(Debug, Clone, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    #[serde(default)]
    #[validate(range(min = 0))]
    pub skip: i64,
    #[serde(default = "default_page_limit")]
    #[validate(range(min = 1, max = 100))]
    pub limit: i64,
}

/// UserListQuery
///
/// Pagination for `GET /admin/users`.
#[derive(Debug, Clone, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserListQuery {
    #[serde(default)]
    #[validate(range(min = 0))]
    pub skip: i64,
    #[serde(default = "default_user_limit")]
    #[validate(range(min = 1))]
    pub limit: i64,
}

/// StatusFilter
///
/// Optional status filter shared by count, export and the admin listing.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StatusFilter {
    pub status: Option<QuestionStatus>,
}

/// StatusQuery
///
/// Target status for `PUT /admin/questions/{id}/status`.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StatusQuery {
    pub status: QuestionStatus,
}

// --- Repository Arguments ---

/// QuestionFilter
///
/// Search criteria passed to the repository. `owner_id = None` searches every owner.
#[derive(Debug, Clone, Default)]
pub struct QuestionFilter {
    pub owner_id: Option<i64>,
    pub status: Option<QuestionStatus>,
    pub topic: Option<String>,
    pub school_level: Option<String>,
}

/// Page
#[derive(Debug, Clone, Copy)]
pub struct Page {
    pub skip: i64,
    pub limit: i64,
}

impl Page {
    /// No practical bound; used by the export and the admin listing.
    pub const ALL: Page = Page {
        skip: 0,
        limit: i64::MAX,
    };
}

// --- Output Schemas ---

/// CountResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CountResponse {
    pub total: i64,
}

/// MessageResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct MessageResponse {
    pub message: String,
}

/// StatusUpdateResponse
///
/// Confirmation returned by the admin moderation endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct StatusUpdateResponse {
    pub message: String,
    pub question_id: i64,
    pub status: QuestionStatus,
}

/// ImageUploadForm
///
/// Shape of the multipart body of `POST /questions/{id}/upload-image`, for the API docs.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct ImageUploadForm {
    #[schema(value_type = String, format = Binary)]
    file: Vec<u8>,
}

/// ImageUploadResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ImageUploadResponse {
    pub message: String,
    pub url: String,
}

/// AdminDashboardStats
///
/// Output schema for the administrative statistics dashboard (GET /admin/stats).
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct AdminDashboardStats {
    pub total_questions: i64,
    pub pending_questions: i64,
    pub approved_questions: i64,
    pub rejected_questions: i64,
    pub total_users: i64,
    /// Approved questions whose last update happened today.
    pub approved_today: i64,
}
