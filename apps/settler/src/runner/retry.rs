use crate::error::RequestError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Increment the counter; status and error type stay untouched.
    Retry { next: i32 },
    /// Flag for manual review; the counter stays where it is.
    Escalate,
}

/// Every request-scoped failure spends from the same budget.
pub fn decide(error_retries: i32, max_retries: i32) -> RetryDecision {
    if error_retries < max_retries {
        RetryDecision::Retry {
            next: error_retries.saturating_add(1),
        }
    } else {
        RetryDecision::Escalate
    }
}

pub fn error_note(err: &RequestError) -> String {
    format!("Error submitting result transaction: {err}")
}
