use thiserror::Error;
use uuid::Uuid;

use crate::error::HttpError;

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Order {0} not found")]
    OrderNotFound(Uuid),

    #[error("User {0} does not have access to order {1}")]
    AccessDenied(Uuid, Uuid),

    #[error("Freelancer {0} has not applied for this order")]
    FreelancerNotApplied(Uuid),

    #[error("No freelancer is assigned yet; a recipient must be selected")]
    SelectionRequired,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ChatError {
    /// Machine-readable code for policy failures, so a client can tell
    /// "prompt for applicant selection" apart from a plain denial.
    pub fn reason(&self) -> Option<&'static str> {
        match self {
            ChatError::FreelancerNotApplied(_) => Some("freelancer_not_applied"),
            ChatError::SelectionRequired => Some("selection_required"),
            _ => None,
        }
    }
}

impl From<ChatError> for HttpError {
    fn from(error: ChatError) -> Self {
        match error {
            ChatError::OrderNotFound(_) => HttpError::not_found(error.to_string()),

            ChatError::AccessDenied(_, _) => HttpError::forbidden(error.to_string()),

            ChatError::FreelancerNotApplied(_) | ChatError::SelectionRequired => {
                let reason = error.reason();
                let http_error = HttpError::unprocessable_entity(error.to_string());
                match reason {
                    Some(reason) => http_error.with_reason(reason),
                    None => http_error,
                }
            }

            ChatError::Database(_) => HttpError::server_error(error.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn maps_not_found_to_404() {
        let err: HttpError = ChatError::OrderNotFound(Uuid::nil()).into();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(err.reason, None);
    }

    #[test]
    fn maps_access_denied_to_403() {
        let err: HttpError = ChatError::AccessDenied(Uuid::nil(), Uuid::nil()).into();
        assert_eq!(err.status, StatusCode::FORBIDDEN);
        assert_eq!(err.reason, None);
    }

    #[test]
    fn policy_failures_carry_machine_readable_reasons() {
        let err: HttpError = ChatError::FreelancerNotApplied(Uuid::nil()).into();
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.reason, Some("freelancer_not_applied"));

        let err: HttpError = ChatError::SelectionRequired.into();
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.reason, Some("selection_required"));
    }
}
