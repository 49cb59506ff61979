use axum::{
    Json,
    extract::{
        Multipart, State,
        multipart::MultipartRejection,
        rejection::JsonRejection,
    },
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use docbridge::{
    plan::{CollectionRequest, ReadPlan},
    query::CollectionPath,
};

use super::{
    AppState,
    schemas::{
        CredentialsRequest, DataResponse, DeleteFileRequest, GetObjectRequest, MessageResponse, MutationResponse,
        ObjectRequest, ResetPasswordRequest, SUCCESS, SessionResponse, UpdateUserRequest, UploadResponse,
    },
};
use crate::{
    credentials::{SESSION_TTL, Session},
    error::{ApiError, ApiResult},
    files::Upload,
    mutation::MutationOutcome,
    reader::JsonDocument,
};

/// Name of the cookie carrying the session.
pub const SESSION_COOKIE: &str = "session";

pub async fn healthz() -> &'static str {
    "ok"
}

pub async fn get_collection(
    State(state): State<AppState>,
    req: Result<Json<CollectionRequest>, JsonRejection>,
) -> ApiResult<Json<DataResponse<Vec<JsonDocument>>>> {
    let plan = ReadPlan::build(body(req)?)?;
    let documents = state.reader.read(&plan).await?;

    Ok(Json(DataResponse::new(documents)))
}

pub async fn get_object(
    State(state): State<AppState>,
    req: Result<Json<GetObjectRequest>, JsonRejection>,
) -> ApiResult<Json<DataResponse<Option<JsonDocument>>>> {
    let req = body(req)?;
    let collection = collection_path(req.collection_name.as_deref())?;
    let doc_id = req
        .doc_id
        .ok_or_else(|| ApiError::validation("\"docId\" is required"))?;

    let document = state.reader.read_one(&collection, &doc_id).await?;

    Ok(Json(DataResponse::new(document)))
}

pub async fn create_object(
    State(state): State<AppState>,
    req: Result<Json<ObjectRequest>, JsonRejection>,
) -> ApiResult<Json<MutationResponse>> {
    let req = body(req)?;
    let collection = collection_path(req.collection_name.as_deref())?;

    mutation_response(state.mutations.create(&collection, req.object_data).await)
}

pub async fn update_object(
    State(state): State<AppState>,
    req: Result<Json<ObjectRequest>, JsonRejection>,
) -> ApiResult<Json<MutationResponse>> {
    let req = body(req)?;
    let collection = collection_path(req.collection_name.as_deref())?;

    mutation_response(state.mutations.update(&collection, req.object_data).await)
}

pub async fn delete_object(
    State(state): State<AppState>,
    req: Result<Json<ObjectRequest>, JsonRejection>,
) -> ApiResult<Json<MutationResponse>> {
    let req = body(req)?;
    let collection = collection_path(req.collection_name.as_deref())?;

    mutation_response(state.mutations.delete(&collection, req.object_data).await)
}

pub async fn upload_file(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<UploadResponse>> {
    let mut multipart = multipart.map_err(|e| ApiError::validation(e.body_text()))?;
    let mut upload = None;
    let mut folder = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::validation(e.body_text()))?;

                upload = Some(Upload {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            },
            "folder" => {
                folder = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| ApiError::validation(e.body_text()))?,
                );
            },
            other => return Err(ApiError::validation(format!("\"{other}\" is not allowed"))),
        }
    }

    let url = state.files.upload(upload, folder.as_deref()).await?;

    Ok(Json(UploadResponse {
        status: SUCCESS,
        message: "File uploaded successfully".to_string(),
        file_url: url.to_string(),
    }))
}

pub async fn delete_file(
    State(state): State<AppState>,
    req: Result<Json<DeleteFileRequest>, JsonRejection>,
) -> ApiResult<Json<MessageResponse>> {
    let req = body(req)?;

    state
        .files
        .delete(req.file_url.as_deref().unwrap_or_default())
        .await?;

    Ok(Json(MessageResponse::new("File deleted successfully")))
}

pub async fn sign_in(
    State(state): State<AppState>,
    jar: CookieJar,
    req: Result<Json<CredentialsRequest>, JsonRejection>,
) -> ApiResult<(CookieJar, Json<SessionResponse>)> {
    let req = body(req)?;
    let session = state.credentials.sign_in(&req.credentials).await?;

    Ok(session_response(jar, session, state.cookie_secure))
}

pub async fn sign_up(
    State(state): State<AppState>,
    jar: CookieJar,
    req: Result<Json<CredentialsRequest>, JsonRejection>,
) -> ApiResult<(CookieJar, Json<SessionResponse>)> {
    let req = body(req)?;
    let session = state.credentials.sign_up(&req.credentials).await?;

    Ok(session_response(jar, session, state.cookie_secure))
}

/// Revokes the session and clears its cookie, whatever the outcome of the revocation.
pub async fn sign_out(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, ApiResult<Json<MessageResponse>>) {
    let cookie = jar
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string());
    let jar = match cookie {
        Some(_) => jar.remove(Cookie::build(SESSION_COOKIE).path("/")),
        None => jar,
    };

    let result = state
        .revocation
        .sign_out(cookie.as_deref())
        .await
        .map(|_| Json(MessageResponse::new("Logged out successfully")));

    (jar, result)
}

pub async fn reset_password(
    State(state): State<AppState>,
    req: Result<Json<ResetPasswordRequest>, JsonRejection>,
) -> ApiResult<Json<MessageResponse>> {
    let req = body(req)?;

    state.credentials.reset_password(&req.email).await?;

    Ok(Json(MessageResponse::new("Password reset email sent")))
}

pub async fn update_user(
    State(state): State<AppState>,
    req: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> ApiResult<Json<MessageResponse>> {
    let UpdateUserRequest { credentials } = body(req)?;
    let message = state
        .credentials
        .update_user(&credentials.uid, credentials.user)
        .await?;

    Ok(Json(MessageResponse::new(message)))
}

fn body<T>(req: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    req.map(|Json(value)| value)
        .map_err(|rejection| ApiError::validation(rejection.body_text()))
}

fn collection_path(name: Option<&str>) -> ApiResult<CollectionPath> {
    let name = name.ok_or_else(|| ApiError::validation("\"collectionName\" is required"))?;

    Ok(CollectionPath::parse(name)?)
}

fn mutation_response(outcome: ApiResult<MutationOutcome>) -> ApiResult<Json<MutationResponse>> {
    let MutationOutcome { message, data, .. } = outcome?;

    Ok(Json(MutationResponse {
        status: SUCCESS,
        message,
        data,
    }))
}

fn session_response(jar: CookieJar, session: Session, secure: bool) -> (CookieJar, Json<SessionResponse>) {
    let max_age = time::Duration::seconds(i64::try_from(SESSION_TTL.as_secs()).unwrap_or(i64::MAX));
    let cookie = Cookie::build((SESSION_COOKIE, session.cookie.clone()))
        .http_only(true)
        .same_site(SameSite::Strict)
        .path("/")
        .max_age(max_age)
        .secure(secure)
        .build();

    (
        jar.add(cookie),
        Json(SessionResponse {
            status: SUCCESS,
            user: session.uid,
            session_cookie: session.cookie,
        }),
    )
}
