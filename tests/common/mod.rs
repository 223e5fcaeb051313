#![allow(dead_code)]

use async_trait::async_trait;
use calamine::{Data, Reader, Xlsx, open_workbook_from_rs};
use axum::{
    Router,
    body::Body,
    http::{Request, header},
    response::Response,
};
use chrono::Utc;
use geo_questions::{
    AppConfig, AppState, create_router,
    auth::issue_token,
    errors::{AppError, AppResult},
    export,
    models::{
        AdminDashboardStats, AnswerKey, CreateQuestionRequest, NewUser, Page, Question,
        QuestionFilter, QuestionStatus, Role, StoredUser, UpdateQuestionRequest,
        UpdateUserRequest, User,
    },
    password,
    repository::{Repository, RepositoryState},
    storage::{MockImageStore, StorageState},
};
use std::{
    io::Cursor,
    sync::{Arc, Mutex, OnceLock},
};

pub const PASSWORD: &str = "senha123";

// --- IN-MEMORY REPOSITORY ---

/// Behaves like the Postgres repository (ordering, filters, uniqueness,
/// cascade) without a database.
#[derive(Default)]
pub struct InMemoryRepository {
    users: Mutex<Vec<StoredUser>>,
    questions: Mutex<Vec<Question>>,
    next_user_id: Mutex<i64>,
    next_question_id: Mutex<i64>,
}

impl InMemoryRepository {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Deletes a user and, like the foreign key, every question they own.
    pub fn remove_user(&self, username: &str) {
        let mut users = self.users.lock().unwrap();
        let Some(pos) = users.iter().position(|u| u.user.username == username) else {
            return;
        };
        let removed = users.remove(pos);
        self.questions
            .lock()
            .unwrap()
            .retain(|q| q.user_id != removed.user.id);
    }

    pub fn user_count(&self) -> usize {
        self.users.lock().unwrap().len()
    }

    fn owner(&self, id: i64) -> Option<User> {
        self.users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.user.id == id)
            .map(|u| u.user.clone())
    }

    /// Re-embeds the current owner, the way the SQL join does.
    fn hydrate(&self, mut question: Question) -> Question {
        if let Some(owner) = self.owner(question.user_id) {
            question.user = owner;
        }
        question
    }

    fn ensure_unique(
        users: &[StoredUser],
        skip_id: Option<i64>,
        username: Option<&str>,
        email: Option<&str>,
    ) -> AppResult<()> {
        for stored in users.iter().filter(|u| Some(u.user.id) != skip_id) {
            if username == Some(stored.user.username.as_str()) {
                return Err(AppError::Conflict("Username already registered".to_string()));
            }
            if email == Some(stored.user.email.as_str()) {
                return Err(AppError::Conflict("Email already registered".to_string()));
            }
        }
        Ok(())
    }
}

fn paginate<T>(items: Vec<T>, page: Page) -> Vec<T> {
    items
        .into_iter()
        .skip(usize::try_from(page.skip).unwrap_or(0))
        .take(usize::try_from(page.limit).unwrap_or(usize::MAX))
        .collect()
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn matches(q: &Question, filter: &QuestionFilter) -> bool {
    filter.owner_id.is_none_or(|id| q.user_id == id)
        && filter.status.is_none_or(|s| q.status == s)
        && filter.topic.as_deref().is_none_or(|t| contains_ci(&q.topic, t))
        && filter
            .school_level
            .as_deref()
            .is_none_or(|l| contains_ci(&q.school_level, l))
}

fn apply<T>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn create_user(&self, user: NewUser) -> AppResult<User> {
        let mut users = self.users.lock().unwrap();
        Self::ensure_unique(&users, None, Some(&user.username), Some(&user.email))?;

        let mut next = self.next_user_id.lock().unwrap();
        *next += 1;
        let now = Utc::now();
        let created = User {
            id: *next,
            username: user.username,
            email: user.email,
            role: user.role,
            created_at: now,
            updated_at: now,
        };
        users.push(StoredUser {
            user: created.clone(),
            password_hash: user.password_hash,
        });
        Ok(created)
    }

    async fn get_user_by_username(&self, username: &str) -> AppResult<Option<StoredUser>> {
        let users = self.users.lock().unwrap();
        Ok(users.iter().find(|u| u.user.username == username).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let users = self.users.lock().unwrap();
        Ok(users
            .iter()
            .find(|u| u.user.email == email)
            .map(|u| u.user.clone()))
    }

    async fn list_users(&self, page: Page) -> AppResult<Vec<User>> {
        let mut users: Vec<User> = self
            .users
            .lock()
            .unwrap()
            .iter()
            .map(|u| u.user.clone())
            .collect();
        users.sort_by_key(|u| u.id);
        Ok(paginate(users, page))
    }

    async fn update_user(&self, id: i64, req: UpdateUserRequest) -> AppResult<Option<User>> {
        let mut users = self.users.lock().unwrap();
        Self::ensure_unique(&users, Some(id), req.username.as_deref(), req.email.as_deref())?;

        let Some(stored) = users.iter_mut().find(|u| u.user.id == id) else {
            return Ok(None);
        };
        apply(&mut stored.user.username, req.username);
        apply(&mut stored.user.email, req.email);
        apply(&mut stored.user.role, req.role);
        stored.user.updated_at = Utc::now();
        Ok(Some(stored.user.clone()))
    }

    async fn create_question(
        &self,
        req: CreateQuestionRequest,
        owner_id: i64,
    ) -> AppResult<Question> {
        let owner = self
            .owner(owner_id)
            .ok_or_else(|| AppError::Internal("owner does not exist".to_string()))?;

        let mut next = self.next_question_id.lock().unwrap();
        *next += 1;
        let now = Utc::now();
        let question = Question {
            id: *next,
            user_id: owner_id,
            registered_on: now.date_naive(),
            topic: req.topic,
            subtopic: req.subtopic,
            statement: req.statement,
            question_type: req.question_type,
            image_url: req.image_url,
            image_description: req.image_description,
            image_source: req.image_source,
            school_level: req.school_level,
            alternative_a: req.alternative_a,
            alternative_b: req.alternative_b,
            alternative_c: req.alternative_c,
            alternative_d: req.alternative_d,
            alternative_e: req.alternative_e,
            correct_answer: req.correct_answer,
            correct_answer_text: req.correct_answer_text,
            hint: req.hint,
            bibliographic_source: req.bibliographic_source,
            exam_year: req.exam_year,
            exam_board: req.exam_board,
            status: QuestionStatus::Pending,
            created_at: now,
            updated_at: now,
            user: owner,
        };
        self.questions.lock().unwrap().push(question.clone());
        Ok(question)
    }

    async fn get_question(&self, id: i64) -> AppResult<Option<Question>> {
        let found = self
            .questions
            .lock()
            .unwrap()
            .iter()
            .find(|q| q.id == id)
            .cloned();
        Ok(found.map(|q| self.hydrate(q)))
    }

    async fn list_questions(&self, filter: QuestionFilter, page: Page) -> AppResult<Vec<Question>> {
        let mut found: Vec<Question> = self
            .questions
            .lock()
            .unwrap()
            .iter()
            .filter(|q| matches(q, &filter))
            .cloned()
            .collect();
        found.sort_by_key(|q| q.id);
        Ok(paginate(found, page)
            .into_iter()
            .map(|q| self.hydrate(q))
            .collect())
    }

    async fn count_questions(
        &self,
        owner_id: Option<i64>,
        status: Option<QuestionStatus>,
    ) -> AppResult<i64> {
        let filter = QuestionFilter {
            owner_id,
            status,
            ..QuestionFilter::default()
        };
        let questions = self.questions.lock().unwrap();
        Ok(questions.iter().filter(|q| matches(q, &filter)).count() as i64)
    }

    async fn update_question(
        &self,
        id: i64,
        req: UpdateQuestionRequest,
    ) -> AppResult<Option<Question>> {
        let updated = {
            let mut questions = self.questions.lock().unwrap();
            let Some(q) = questions.iter_mut().find(|q| q.id == id) else {
                return Ok(None);
            };
            apply(&mut q.topic, req.topic);
            apply(&mut q.subtopic, req.subtopic);
            apply(&mut q.statement, req.statement);
            apply(&mut q.question_type, req.question_type);
            apply(&mut q.image_url, req.image_url);
            apply(&mut q.image_description, req.image_description);
            apply(&mut q.image_source, req.image_source);
            apply(&mut q.school_level, req.school_level);
            apply(&mut q.alternative_a, req.alternative_a);
            apply(&mut q.alternative_b, req.alternative_b);
            apply(&mut q.alternative_c, req.alternative_c);
            apply(&mut q.alternative_d, req.alternative_d);
            apply(&mut q.alternative_e, req.alternative_e);
            apply(&mut q.correct_answer, req.correct_answer);
            apply(&mut q.correct_answer_text, req.correct_answer_text);
            apply(&mut q.hint, req.hint);
            apply(&mut q.bibliographic_source, req.bibliographic_source);
            apply(&mut q.status, req.status);
            apply(&mut q.exam_year, req.exam_year);
            apply(&mut q.exam_board, req.exam_board);
            q.updated_at = Utc::now();
            q.clone()
        };
        Ok(Some(self.hydrate(updated)))
    }

    async fn set_question_status(
        &self,
        id: i64,
        status: QuestionStatus,
    ) -> AppResult<Option<Question>> {
        self.update_question(
            id,
            UpdateQuestionRequest {
                status: Some(status),
                ..UpdateQuestionRequest::default()
            },
        )
        .await
    }

    async fn delete_question(&self, id: i64) -> AppResult<bool> {
        let mut questions = self.questions.lock().unwrap();
        let before = questions.len();
        questions.retain(|q| q.id != id);
        Ok(questions.len() < before)
    }

    async fn get_stats(&self) -> AppResult<AdminDashboardStats> {
        let today = Utc::now().date_naive();
        let total_users = self.user_count() as i64;
        let questions = self.questions.lock().unwrap();
        let with_status = |s: QuestionStatus| questions.iter().filter(|q| q.status == s).count() as i64;

        Ok(AdminDashboardStats {
            total_questions: questions.len() as i64,
            pending_questions: with_status(QuestionStatus::Pending),
            approved_questions: with_status(QuestionStatus::Approved),
            rejected_questions: with_status(QuestionStatus::Rejected),
            total_users,
            approved_today: questions
                .iter()
                .filter(|q| {
                    q.status == QuestionStatus::Approved && q.updated_at.date_naive() == today
                })
                .count() as i64,
        })
    }
}

// --- TEST UTILITIES ---

/// Argon2 is slow in debug builds, so every seeded user shares one hash.
fn shared_hash() -> String {
    static HASH: OnceLock<String> = OnceLock::new();
    HASH.get_or_init(|| password::hash_password(PASSWORD).unwrap())
        .clone()
}

pub async fn seed_user(repo: &InMemoryRepository, username: &str, role: Role) -> User {
    repo.create_user(NewUser {
        username: username.to_string(),
        email: format!("{}@x.com", username),
        password_hash: shared_hash(),
        role,
    })
    .await
    .unwrap()
}

pub fn token_for(username: &str) -> String {
    issue_token(username, &AppConfig::default()).unwrap()
}

pub fn create_test_state(repo: Arc<InMemoryRepository>, storage: StorageState) -> AppState {
    AppState {
        repo: repo as RepositoryState,
        storage,
        config: AppConfig::default(),
    }
}

pub fn test_app(repo: Arc<InMemoryRepository>) -> Router {
    create_router(create_test_state(repo, Arc::new(MockImageStore::new())))
}

pub fn sample_question() -> CreateQuestionRequest {
    CreateQuestionRequest {
        topic: "Geografia Física".to_string(),
        subtopic: "Relevo".to_string(),
        statement: "Qual agente forma os cânions?".to_string(),
        question_type: "multiple_choice".to_string(),
        image_url: None,
        image_description: None,
        image_source: None,
        school_level: "Ensino Médio".to_string(),
        alternative_a: "Vento".to_string(),
        alternative_b: "Água corrente".to_string(),
        alternative_c: "Gelo".to_string(),
        alternative_d: "Vulcanismo".to_string(),
        alternative_e: "Tectonismo".to_string(),
        correct_answer: AnswerKey::B,
        correct_answer_text: "A erosão fluvial escava os cânions.".to_string(),
        hint: Some("Pense no Grand Canyon".to_string()),
        bibliographic_source: None,
        exam_year: Some(2019),
        exam_board: Some("ENEM".to_string()),
    }
}

// --- REQUEST BUILDERS ---

pub fn request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

pub fn json_request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: &serde_json::Value,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn form_request(uri: &str, form: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(form.to_string()))
        .unwrap()
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

// --- SPREADSHEET READER ---

/// Every row of the exported worksheet, header included, as display text.
pub fn read_sheet(bytes: &[u8]) -> Vec<Vec<String>> {
    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes.to_vec())).unwrap();
    let range = workbook.worksheet_range(export::SHEET_NAME).unwrap();
    range
        .rows()
        .map(|row| row.iter().map(cell_text).collect())
        .collect()
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.clone(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Empty => String::new(),
        other => format!("{:?}", other),
    }
}
