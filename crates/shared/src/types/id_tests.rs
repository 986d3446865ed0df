use super::*;

#[test]
fn test_unique_ids_are_simple_uuids() {
    let id = PostId::unique();
    assert_eq!(id.as_str().len(), 32);
    assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn test_unique_ids_are_time_ordered() {
    let first = PostId::unique();
    let second = PostId::unique();
    assert_ne!(first, second);
    assert!(first < second);
}

#[test]
fn test_provider_ids_are_kept_verbatim() {
    let id = UserId::new("64f0c2a1e9d3b");
    assert_eq!(id.as_str(), "64f0c2a1e9d3b");
    assert_eq!(id.to_string(), "64f0c2a1e9d3b");
    assert_eq!(id.into_inner(), "64f0c2a1e9d3b");
}

#[test]
fn test_typed_id_serde_is_transparent() {
    let id = FileId::from("img-1");
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "\"img-1\"");

    let back: FileId = serde_json::from_str(&json).unwrap();
    assert_eq!(back, id);
}
