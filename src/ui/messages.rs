//! User-facing error text.

use crate::error::SummaryError;

/// Map an error to the message shown to the user.
///
/// Field-level validation detail is rendered inline by the form; this is the
/// single dismissible message that accompanies it.
pub fn user_message(err: &SummaryError) -> String {
    match err {
        SummaryError::Validation { errors, .. } => match errors.first() {
            Some(first) if errors.len() == 1 => format!("Please check your input: {}", first.message),
            _ => "Please check the highlighted fields and try again.".to_string(),
        },
        SummaryError::Network(_) => {
            "Unable to reach the summary service. Check your connection and try again.".to_string()
        }
        SummaryError::Timeout { .. } => {
            "The summary is taking longer than expected. Please try again in a moment.".to_string()
        }
        SummaryError::Cancelled => "The request was cancelled.".to_string(),
        SummaryError::Http { status, body } => http_message(*status, &body.message),
        SummaryError::Decode(_) | SummaryError::InvalidConfig(_) => {
            "Something went wrong. Please try again.".to_string()
        }
    }
}

fn http_message(status: u16, server_message: &str) -> String {
    match status {
        400 if !server_message.is_empty() => format!("Invalid request: {}", server_message),
        400 => "Invalid request. Please check the PR URL and ticket ID.".to_string(),
        401 => "Authentication with an upstream service failed. Please contact your administrator."
            .to_string(),
        403 => "Access denied. The service may not have permission to read this pull request."
            .to_string(),
        404 => "Pull request or ticket not found. Please verify the URL and ticket ID.".to_string(),
        429 => "Too many requests. Please wait a moment before trying again.".to_string(),
        500 => "The summary service encountered an internal error. Please try again later."
            .to_string(),
        502..=504 => "The summary service is temporarily unavailable. Please try again later."
            .to_string(),
        _ => "Something went wrong. Please try again.".to_string(),
    }
}
