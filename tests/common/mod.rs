#![allow(dead_code)]

pub mod mock_backend;

use session_gate::SessionParams;

/// Query string carrying all four session parameters.
pub fn full_query(base_url: &str, access_token: &str) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .append_pair("project_url", base_url)
        .append_pair("public_key", mock_backend::PUBLIC_KEY)
        .append_pair("access_token", access_token)
        .append_pair("refresh_token", mock_backend::REFRESH_TOKEN)
        .finish()
}

pub fn full_params(base_url: &str, access_token: &str) -> SessionParams {
    SessionParams::from_query(&full_query(base_url, access_token))
}
