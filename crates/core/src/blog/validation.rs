//! Client-side input checks.
//!
//! Everything here runs before a provider call; a failure means no request
//! was sent.

use quill_shared::{AppError, AppResult, UploadConfig};

use super::types::{Credentials, ImageUpload, NewAccount, NewPost, PostPatch, PostQuery};

/// Shortest password accepted at registration.
pub const MIN_PASSWORD_LENGTH: usize = 8;

fn required(field: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }
    Ok(())
}

/// `local@domain.tld` with no whitespace and a single `@`.
fn email_shape(email: &str) -> AppResult<()> {
    let email = email.trim();
    let well_formed = !email.chars().any(char::is_whitespace)
        && email.split_once('@').is_some_and(|(local, domain)| {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .split_once('.')
                    .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
        });
    if well_formed {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "'{email}' is not a valid email address"
        )))
    }
}

/// Checks registration input.
pub fn validate_new_account(account: &NewAccount) -> AppResult<()> {
    required("name", &account.name)?;
    required("email", &account.email)?;
    email_shape(&account.email)?;
    if account.password.is_empty() {
        return Err(AppError::Validation("password is required".to_string()));
    }
    if account.password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AppError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Checks login input.
pub fn validate_credentials(credentials: &Credentials) -> AppResult<()> {
    required("email", &credentials.email)?;
    if credentials.password.is_empty() {
        return Err(AppError::Validation("password is required".to_string()));
    }
    Ok(())
}

/// Checks a provider identifier.
pub fn validate_id(kind: &str, id: &str) -> AppResult<()> {
    if id.trim().is_empty() {
        return Err(AppError::Validation(format!("{kind} id is required")));
    }
    Ok(())
}

/// Checks a new post.
pub fn validate_new_post(post: &NewPost) -> AppResult<()> {
    required("title", &post.title)?;
    required("content", &post.content)?;
    validate_id("author", post.author_id.as_str())
}

/// Checks a partial update.
pub fn validate_patch(patch: &PostPatch) -> AppResult<()> {
    if patch.is_empty() {
        return Err(AppError::Validation(
            "update must change at least one field".to_string(),
        ));
    }
    if let Some(title) = &patch.title {
        required("title", title)?;
    }
    if let Some(content) = &patch.content {
        required("content", content)?;
    }
    Ok(())
}

/// Checks a feed query.
pub fn validate_query(query: &PostQuery) -> AppResult<()> {
    if query.limit == 0 {
        return Err(AppError::Validation("limit must be at least 1".to_string()));
    }
    if let Some(author_id) = &query.author_id {
        validate_id("author", author_id.as_str())?;
    }
    Ok(())
}

/// Checks an image against the upload limits.
pub fn validate_upload(upload: &ImageUpload, limits: &UploadConfig) -> AppResult<()> {
    if upload.bytes.is_empty() {
        return Err(AppError::Validation("image is empty".to_string()));
    }
    if upload.size() > limits.max_file_size {
        return Err(AppError::Validation(format!(
            "image is {} bytes; the limit is {} bytes",
            upload.size(),
            limits.max_file_size
        )));
    }
    if !limits.is_mime_type_allowed(&upload.content_type) {
        return Err(AppError::Validation(format!(
            "content type '{}' is not an accepted image type",
            upload.content_type
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_shared::types::UserId;
    use rstest::rstest;

    fn account(email: &str, password: &str, name: &str) -> NewAccount {
        NewAccount {
            email: email.to_string(),
            password: password.to_string(),
            name: name.to_string(),
        }
    }

    #[rstest]
    #[case("", "password123", "Alice", "email is required")]
    #[case("alice@example.com", "", "Alice", "password is required")]
    #[case("alice@example.com", "password123", "  ", "name is required")]
    #[case("alice@example.com", "short", "Alice", "at least 8 characters")]
    #[case("alice", "password123", "Alice", "not a valid email")]
    #[case("alice@localhost", "password123", "Alice", "not a valid email")]
    #[case("@example.com", "password123", "Alice", "not a valid email")]
    #[case("a@b@example.com", "password123", "Alice", "not a valid email")]
    #[case("al ice@example.com", "password123", "Alice", "not a valid email")]
    fn test_new_account_rejections(
        #[case] email: &str,
        #[case] password: &str,
        #[case] name: &str,
        #[case] expected: &str,
    ) {
        let err = validate_new_account(&account(email, password, name)).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(err.message().contains(expected), "{err}");
    }

    #[test]
    fn test_valid_account_passes() {
        let valid = account("alice@example.com", "password123", "Alice");
        assert!(validate_new_account(&valid).is_ok());
    }

    #[test]
    fn test_password_length_counts_characters() {
        // 8 multi-byte characters
        assert!(validate_new_account(&account("a@b.c", "ééééééééé", "A")).is_ok());
    }

    #[test]
    fn test_new_post_requires_title_and_content() {
        let mut post = NewPost {
            title: "Hello".into(),
            content: "World".into(),
            author_id: UserId::new("alice"),
            author_name: "Alice".into(),
            image: None,
        };
        assert!(validate_new_post(&post).is_ok());

        post.content = "\n".into();
        assert!(validate_new_post(&post).is_err());

        post.content = "World".into();
        post.title = String::new();
        assert!(validate_new_post(&post).is_err());
    }

    #[test]
    fn test_empty_patch_rejected() {
        assert!(validate_patch(&PostPatch::default()).is_err());
        assert!(
            validate_patch(&PostPatch {
                published: Some(false),
                ..PostPatch::default()
            })
            .is_ok()
        );
        assert!(
            validate_patch(&PostPatch {
                title: Some(String::new()),
                ..PostPatch::default()
            })
            .is_err()
        );
    }

    #[test]
    fn test_zero_limit_rejected() {
        assert!(validate_query(&PostQuery::latest(0)).is_err());
        assert!(validate_query(&PostQuery::latest(1)).is_ok());
    }

    #[test]
    fn test_upload_limits() {
        let limits = UploadConfig {
            max_file_size: 4,
            ..UploadConfig::default()
        };

        let png = |bytes: Vec<u8>| ImageUpload::new("a.png", "image/png", bytes);
        assert!(validate_upload(&png(vec![1, 2, 3]), &limits).is_ok());
        assert!(validate_upload(&png(Vec::new()), &limits).is_err());
        assert!(validate_upload(&png(vec![0; 5]), &limits).is_err());
        let pdf = ImageUpload::new("a.pdf", "application/pdf", vec![1]);
        assert!(validate_upload(&pdf, &limits).is_err());
    }
}
