//! Request and response bodies of the `/api` routes.
//!
//! Requests are closed records: an unknown key is rejected before a handler runs.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use docbridge::identity::UserUpdate;

use crate::{credentials::Credentials, reader::JsonDocument};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GetObjectRequest {
    #[serde(default)]
    pub collection_name: Option<String>,
    #[serde(default)]
    pub doc_id: Option<String>,
}

/// Body of create-object, update-object and delete-object.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ObjectRequest {
    #[serde(default)]
    pub collection_name: Option<String>,
    #[serde(default)]
    pub object_data: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DeleteFileRequest {
    #[serde(default)]
    pub file_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CredentialsRequest {
    pub credentials: Credentials,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResetPasswordRequest {
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateUserRequest {
    pub credentials: UserCredentials,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserCredentials {
    pub uid: String,
    pub user: UserUpdate,
}

#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub status: &'static str,
    pub data: T,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub status: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct MutationResponse {
    pub status: &'static str,
    pub message: String,
    pub data: JsonDocument,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub status: &'static str,
    pub message: String,
    pub file_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub status: &'static str,
    pub user: String,
    pub session_cookie: String,
}

pub const SUCCESS: &str = "success";

impl<T> DataResponse<T> {
    pub fn new(data: T) -> Self {
        Self { status: SUCCESS, data }
    }
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: SUCCESS,
            message: message.into(),
        }
    }
}
