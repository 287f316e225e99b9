//! Field rules shared by every backend, checked before any mutation.

use crate::error::{Result, StoreError};
use crate::models::{MAX_COMMENT_LENGTH, MAX_POST_CONTENT_LENGTH, MAX_POST_TITLE_LENGTH};

fn check_text(field: &str, value: &str, max_chars: usize) -> Result<()> {
    if value.is_empty() {
        return Err(StoreError::Validation(format!("{field} is empty")));
    }
    if value.chars().count() > max_chars {
        return Err(StoreError::Validation(format!(
            "{field} is too long (maximum {max_chars} chars)"
        )));
    }
    Ok(())
}

pub fn validate_new_post(title: &str, content: &str) -> Result<()> {
    check_text("title", title, MAX_POST_TITLE_LENGTH)?;
    check_text("content", content, MAX_POST_CONTENT_LENGTH)
}

pub fn validate_comment_content(content: &str) -> Result<()> {
    check_text("content", content, MAX_COMMENT_LENGTH)
}
