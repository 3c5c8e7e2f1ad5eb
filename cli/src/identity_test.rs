use super::*;

fn temp_store() -> (FileStore, PathBuf) {
    let dir = std::env::temp_dir().join(format!("anonpoll-identity-{}", Uuid::new_v4()));
    (FileStore::new(dir.join("nested").join(IDENTITY_FILE)), dir)
}

#[test]
fn generated_ids_are_prefixed_hex() {
    let id = generate_anon_id();
    let suffix = id.strip_prefix("anon_").expect("anon_ prefix");
    assert_eq!(suffix.len(), 12);
    assert!(suffix.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
}

#[test]
fn missing_file_loads_as_none() {
    let (store, dir) = temp_store();
    assert!(store.load().unwrap().is_none());
    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn load_or_create_persists_once() {
    let (store, dir) = temp_store();
    let first = load_or_create(&store).unwrap();
    let second = load_or_create(&store).unwrap();
    assert_eq!(first, second);

    let on_disk = std::fs::read_to_string(store.path()).unwrap();
    assert_eq!(on_disk.trim(), first);
    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn blank_file_is_replaced() {
    let (store, dir) = temp_store();
    std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
    std::fs::write(store.path(), "  \n").unwrap();

    let id = load_or_create(&store).unwrap();
    assert!(id.starts_with("anon_"));
    assert_eq!(store.load().unwrap().as_deref(), Some(id.as_str()));
    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn stored_value_is_trimmed() {
    let (store, dir) = temp_store();
    store.save("anon_custom").unwrap();
    assert_eq!(store.load().unwrap().as_deref(), Some("anon_custom"));
    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn memory_store_round_trips_and_resets() {
    let store = MemoryStore::new();
    let first = load_or_create(&store).unwrap();
    assert_eq!(load_or_create(&store).unwrap(), first);

    let replaced = reset(&store).unwrap();
    assert_ne!(replaced, first);
    assert_eq!(store.load().unwrap(), Some(replaced));
}
