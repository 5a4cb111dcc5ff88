// Quill - A minimal multi-user blog built with Rust
// Copyright (C) 2025 Quill Project Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;

use crate::{error::AppError, AppState};

/// Peer address of the request, with IPv4-mapped IPv6 addresses unwrapped.
pub fn peer_ip(request: &Request<Body>) -> Option<String> {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_canonical().to_string())
}

/// Only let through peers listed in `site_whitelist`. A request whose peer
/// address is unknown is refused.
pub async fn whitelist_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    match peer_ip(&request) {
        Some(ip) if state.config.is_whitelisted(&ip) => next.run(request).await,
        Some(ip) => {
            tracing::warn!(ip = %ip, path = %request.uri().path(), "Peer not in whitelist");
            AppError::forbidden("Forbidden").into_response()
        }
        None => {
            tracing::warn!(path = %request.uri().path(), "No peer address, refusing");
            AppError::forbidden("Forbidden").into_response()
        }
    }
}
