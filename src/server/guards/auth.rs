use crate::auth::{AuthUser, Role};
use crate::error::PanelError;
use crate::server::router::PanelState;
use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};

fn extract_header_token(headers: &axum::http::HeaderMap) -> Option<String> {
    headers
        .typed_get::<Authorization<Bearer>>()
        .map(|auth| auth.token().to_string())
}

fn extract_query_token(query: Option<&str>) -> Option<String> {
    query.and_then(|q| {
        url::form_urlencoded::parse(q.as_bytes())
            .find(|(k, _)| k == "token")
            .map(|(_, v)| v.into_owned())
    })
}

/// Verified caller. The bearer header wins over the `token` query parameter.
#[derive(Debug, Clone)]
pub struct RequireAuth(pub AuthUser);

impl RequireAuth {
    pub fn require(&self, role: Role) -> Result<&AuthUser, PanelError> {
        self.0.require(role)?;
        Ok(&self.0)
    }
}

impl FromRequestParts<PanelState> for RequireAuth {
    type Rejection = PanelError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &PanelState,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_header_token(&parts.headers)
            .or_else(|| extract_query_token(parts.uri.query()))
            .filter(|t| !t.is_empty())
            .ok_or(PanelError::MissingToken)?;

        let user = state.users.verify(&token).await?;
        Ok(RequireAuth(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, HeaderValue, header::AUTHORIZATION};

    #[test]
    fn reads_bearer_header() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(extract_header_token(&headers).as_deref(), Some("abc.def.ghi"));
        assert_eq!(extract_header_token(&HeaderMap::new()), None);
    }

    #[test]
    fn reads_token_query_param() {
        assert_eq!(
            extract_query_token(Some("x=1&token=a%2Eb")).as_deref(),
            Some("a.b")
        );
        assert_eq!(extract_query_token(Some("key=abc")), None);
        assert_eq!(extract_query_token(None), None);
    }
}
