// Copyright 2025 Crrow
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use snafu::Snafu;
use strum::EnumProperty;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code:    &'static str,
    pub message: String,
}

/// Errors returned by API handlers. Each variant carries its wire code and
/// HTTP status as enum properties.
#[derive(Debug, Snafu, strum_macros::EnumProperty)]
#[snafu(visibility(pub))]
pub enum ApiError {
    #[snafu(display("Not found: {resource}"))]
    #[strum(props(code = "not_found", http_status = "404"))]
    NotFound { resource: String },

    #[snafu(display("Service unavailable: {reason}"))]
    #[strum(props(code = "unavailable", http_status = "503"))]
    Unavailable { reason: String },

    #[snafu(display("Internal error: {reason}"))]
    #[strum(props(code = "internal", http_status = "500"))]
    Internal { reason: String },
}

impl ApiError {
    pub fn code(&self) -> &'static str { self.get_str("code").unwrap_or("internal") }

    pub fn http_status(&self) -> StatusCode {
        self.get_str("http_status")
            .and_then(|value| value.parse::<u16>().ok())
            .and_then(|value| StatusCode::from_u16(value).ok())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let body = Json(ErrorBody {
            code:    self.code(),
            message: self.to_string(),
        });
        (self.http_status(), body).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
