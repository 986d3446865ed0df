//! Unit tests for JWT functionality.

use super::*;

fn create_test_service() -> JwtService {
    JwtService::new(JwtConfig {
        secret: "test-secret-key-for-testing".to_string(),
        session_expiry_secs: 3600,
    })
}

#[test]
fn test_issue_and_validate_round_trip() {
    let service = create_test_service();
    let user_id = UserId::unique();
    let session_id = SessionId::unique();

    let issued = service.issue(&user_id, &session_id).unwrap();
    let claims = service.validate(&issued.token).unwrap();

    assert_eq!(claims.user_id(), user_id);
    assert_eq!(claims.session_id(), session_id);
    assert_eq!(claims.exp, issued.expires_at.timestamp());
}

#[test]
fn test_claims_new_sets_correct_fields() {
    let user_id = UserId::new("u1");
    let session_id = SessionId::new("s1");
    let expires_at = Utc::now() + Duration::hours(1);

    let claims = SessionClaims::new(&user_id, &session_id, expires_at);

    assert_eq!(claims.sub, "u1");
    assert_eq!(claims.sid, "s1");
    assert!(claims.iat <= Utc::now().timestamp());
    assert_eq!(claims.exp, expires_at.timestamp());
}

#[test]
fn test_expired_token_is_rejected() {
    let service = JwtService::new(JwtConfig {
        secret: "test-secret-key-for-testing".to_string(),
        // Past the default 60s leeway.
        session_expiry_secs: -600,
    });

    let issued = service
        .issue(&UserId::unique(), &SessionId::unique())
        .unwrap();
    assert!(matches!(service.validate(&issued.token), Err(JwtError::Expired)));
}

#[test]
fn test_token_signed_with_other_secret_is_rejected() {
    let other = JwtService::new(JwtConfig {
        secret: "another-secret".to_string(),
        session_expiry_secs: 3600,
    });
    let issued = other.issue(&UserId::unique(), &SessionId::unique()).unwrap();

    let result = create_test_service().validate(&issued.token);
    assert!(matches!(result, Err(JwtError::DecodingError(_))));
}

#[test]
fn test_invalid_token() {
    let service = create_test_service();
    assert!(service.validate("invalid.token.here").is_err());
}

#[test]
fn test_debug_hides_token() {
    let issued = create_test_service()
        .issue(&UserId::unique(), &SessionId::unique())
        .unwrap();
    let rendered = format!("{issued:?}");
    assert!(!rendered.contains(&issued.token));
    assert!(rendered.contains("[hidden]"));
}
