// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Locating credentials on an inbound request.
//!
//! Browsers carry the access credential in the `docket_access` cookie
//! (HttpOnly, Secure, SameSite); API clients may send it as a bearer token.
//! The refresh credential only ever travels in the `docket_refresh` cookie.
//!
//! Credential values are never logged.

use http::header::{AUTHORIZATION, COOKIE};
use http::HeaderMap;
use tracing::instrument;

/// Default name of the access credential cookie.
pub const ACCESS_COOKIE_NAME: &str = "docket_access";

/// Default name of the refresh credential cookie.
pub const REFRESH_COOKIE_NAME: &str = "docket_refresh";

/// Extract a cookie value by name from the Cookie header.
pub fn extract_cookie(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
	headers
		.get_all(COOKIE)
		.iter()
		.filter_map(|value| value.to_str().ok())
		.flat_map(|value| value.split(';'))
		.find_map(|cookie| {
			let (name, value) = cookie.trim().split_once('=')?;
			(name == cookie_name).then(|| value.to_string())
		})
}

/// Extract a bearer token from the Authorization header.
///
/// Expects `Authorization: Bearer <token>`; the scheme is case-sensitive.
#[instrument(level = "trace", skip_all)]
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
	headers
		.get(AUTHORIZATION)?
		.to_str()
		.ok()?
		.strip_prefix("Bearer ")
		.map(|token| token.to_string())
}

/// Extract the access credential, preferring the cookie over the bearer header.
pub fn extract_access_credential(headers: &HeaderMap) -> Option<String> {
	extract_access_credential_with_cookie(headers, ACCESS_COOKIE_NAME)
}

/// Same as [`extract_access_credential`] with a custom cookie name.
pub fn extract_access_credential_with_cookie(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
	extract_cookie(headers, cookie_name)
		.filter(|v| !v.is_empty())
		.or_else(|| extract_bearer_token(headers))
}

/// Extract the refresh credential from its cookie.
pub fn extract_refresh_credential(headers: &HeaderMap) -> Option<String> {
	extract_refresh_credential_with_cookie(headers, REFRESH_COOKIE_NAME)
}

/// Same as [`extract_refresh_credential`] with a custom cookie name.
pub fn extract_refresh_credential_with_cookie(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
	extract_cookie(headers, cookie_name).filter(|v| !v.is_empty())
}

/// Cookie names a deployment carries its credentials in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialCookies {
	pub access: String,
	pub refresh: String,
}

impl Default for CredentialCookies {
	fn default() -> Self {
		Self::new(ACCESS_COOKIE_NAME, REFRESH_COOKIE_NAME)
	}
}

impl CredentialCookies {
	pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
		Self {
			access: access.into(),
			refresh: refresh.into(),
		}
	}

	pub fn access_credential(&self, headers: &HeaderMap) -> Option<String> {
		extract_access_credential_with_cookie(headers, &self.access)
	}

	pub fn refresh_credential(&self, headers: &HeaderMap) -> Option<String> {
		extract_refresh_credential_with_cookie(headers, &self.refresh)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use http::header::HeaderValue;

	#[test]
	fn extracts_access_cookie_among_others() {
		let mut headers = HeaderMap::new();
		headers.insert(
			COOKIE,
			HeaderValue::from_static("theme=dark; docket_access=abc.def.ghi; other=1"),
		);
		assert_eq!(
			extract_access_credential(&headers),
			Some("abc.def.ghi".to_string())
		);
	}

	#[test]
	fn falls_back_to_bearer_token() {
		let mut headers = HeaderMap::new();
		headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer tok123"));
		assert_eq!(extract_access_credential(&headers), Some("tok123".to_string()));
	}

	#[test]
	fn cookie_wins_over_bearer() {
		let mut headers = HeaderMap::new();
		headers.insert(COOKIE, HeaderValue::from_static("docket_access=from-cookie"));
		headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
		assert_eq!(
			extract_access_credential(&headers),
			Some("from-cookie".to_string())
		);
	}

	#[test]
	fn empty_cookie_falls_back_to_bearer() {
		let mut headers = HeaderMap::new();
		headers.insert(COOKIE, HeaderValue::from_static("docket_access="));
		headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
		assert_eq!(
			extract_access_credential(&headers),
			Some("from-header".to_string())
		);
	}

	#[test]
	fn returns_none_without_credentials() {
		let headers = HeaderMap::new();
		assert_eq!(extract_access_credential(&headers), None);
		assert_eq!(extract_refresh_credential(&headers), None);
	}

	#[test]
	fn basic_auth_is_not_a_bearer_token() {
		let mut headers = HeaderMap::new();
		headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"));
		assert_eq!(extract_bearer_token(&headers), None);
	}

	#[test]
	fn bearer_scheme_is_case_sensitive() {
		let mut headers = HeaderMap::new();
		headers.insert(AUTHORIZATION, HeaderValue::from_static("bearer token123"));
		assert_eq!(extract_bearer_token(&headers), None);
	}

	#[test]
	fn refresh_cookie_is_separate_from_access_cookie() {
		let mut headers = HeaderMap::new();
		headers.insert(
			COOKIE,
			HeaderValue::from_static("docket_access=a; docket_refresh=r"),
		);
		assert_eq!(extract_refresh_credential(&headers), Some("r".to_string()));
		assert_eq!(extract_access_credential(&headers), Some("a".to_string()));
	}

	#[test]
	fn reads_multiple_cookie_headers() {
		let mut headers = HeaderMap::new();
		headers.append(COOKIE, HeaderValue::from_static("theme=dark"));
		headers.append(COOKIE, HeaderValue::from_static("docket_access=second"));
		assert_eq!(extract_access_credential(&headers), Some("second".to_string()));
	}

	#[test]
	fn custom_cookie_name() {
		let mut headers = HeaderMap::new();
		headers.insert(
			COOKIE,
			HeaderValue::from_static("custom=mine; docket_access=default"),
		);
		assert_eq!(
			extract_access_credential_with_cookie(&headers, "custom"),
			Some("mine".to_string())
		);
	}

	#[test]
	fn custom_refresh_cookie_name() {
		let mut headers = HeaderMap::new();
		headers.insert(
			COOKIE,
			HeaderValue::from_static("docket_refresh=default; session_refresh=mine"),
		);
		assert_eq!(
			extract_refresh_credential_with_cookie(&headers, "session_refresh"),
			Some("mine".to_string())
		);
	}

	#[test]
	fn configured_cookie_names_replace_the_defaults() {
		let mut headers = HeaderMap::new();
		headers.insert(
			COOKIE,
			HeaderValue::from_static("docket_access=old; acc=new-a; docket_refresh=old; ref=new-r"),
		);
		let cookies = CredentialCookies::new("acc", "ref");
		assert_eq!(cookies.access_credential(&headers), Some("new-a".to_string()));
		assert_eq!(cookies.refresh_credential(&headers), Some("new-r".to_string()));

		let defaults = CredentialCookies::default();
		assert_eq!(defaults.access_credential(&headers), Some("old".to_string()));
		assert_eq!(defaults.refresh, REFRESH_COOKIE_NAME);
	}
}
