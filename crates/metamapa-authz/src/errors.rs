use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthzError {
    #[error("invalid role: {0:?}")]
    InvalidRole(String),
    #[error("invalid route pattern: {0}")]
    InvalidRoutePattern(String),
    #[error("missing subject claim")]
    MissingSubject,
    #[error("claims must be a json object")]
    MalformedClaims,
}

pub type AuthzResult<T> = Result<T, AuthzError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_variants() {
        let errors = vec![
            AuthzError::InvalidRole(" ".to_string()),
            AuthzError::InvalidRoutePattern("perfil".to_string()),
            AuthzError::MissingSubject,
            AuthzError::MalformedClaims,
        ];

        for error in errors {
            let rendered = error.to_string();
            assert!(!rendered.is_empty());
        }
    }
}
