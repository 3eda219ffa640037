#[cfg(test)]
mod tests {
    use crate::engine::{Engine, EngineError};
    use crate::engine::tests::helpers::*;
    use tempfile::TempDir;

    #[test]
    fn test_close_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let engine = Engine::open(memtable_only_config(tmp.path())).unwrap();

        engine.put(b"key", b"value").unwrap();
        engine.close().unwrap();
        engine.close().unwrap();
    }

    #[test]
    fn test_mutations_after_close_are_rejected() {
        let tmp = TempDir::new().unwrap();
        let engine = Engine::open(memtable_only_config(tmp.path())).unwrap();
        engine.close().unwrap();

        let err = engine.put(b"key", b"value").unwrap_err();
        assert!(matches!(err, EngineError::Closed));

        let err = engine.remove(b"key").unwrap_err();
        assert!(matches!(err, EngineError::Closed));
    }

    #[test]
    fn test_reads_still_work_after_close() {
        let tmp = TempDir::new().unwrap();
        let engine = Engine::open(memtable_only_config(tmp.path())).unwrap();

        engine.put(b"key", b"value").unwrap();
        engine.close().unwrap();

        assert_eq!(engine.get(b"key").unwrap(), Some(b"value".to_vec()));
    }

    #[test]
    fn test_empty_key_is_a_valid_key() {
        let tmp = TempDir::new().unwrap();
        let engine = Engine::open(memtable_only_config(tmp.path())).unwrap();

        engine.put(b"", b"empty key").unwrap();
        assert_eq!(engine.get(b"").unwrap(), Some(b"empty key".to_vec()));
    }

    #[test]
    fn test_empty_directory_reopen_with_stray_files_ignored() {
        // Non-.sst files in the directory are not tables and must not
        // break discovery.
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("notes.txt"), b"not a table").unwrap();

        let engine = Engine::open(memtable_only_config(tmp.path())).unwrap();
        assert_eq!(engine.get(b"anything").unwrap(), None);
    }

    #[test]
    fn test_value_larger_than_threshold() {
        // A single write may exceed the threshold on its own; it still
        // lands, rotates, and remains readable.
        let tmp = TempDir::new().unwrap();
        let engine = Engine::open(config(tmp.path(), 64)).unwrap();

        let value = vec![0xAB; 4096];
        engine.put(b"big", &value).unwrap();
        assert_eq!(engine.get(b"big").unwrap(), Some(value.clone()));

        engine.close().unwrap();
        drop(engine);

        let reopened = Engine::open(config(tmp.path(), 64)).unwrap();
        assert_eq!(reopened.get(b"big").unwrap(), Some(value));
    }

    #[test]
    fn test_many_overwrites_of_one_key() {
        let tmp = TempDir::new().unwrap();
        let engine = Engine::open(config(tmp.path(), 64)).unwrap();

        for i in 0..500u32 {
            engine
                .put(b"counter", format!("{i:010}").as_bytes())
                .unwrap();
        }
        assert_eq!(
            engine.get(b"counter").unwrap(),
            Some(b"0000000499".to_vec())
        );

        engine.close().unwrap();
        drop(engine);

        let reopened = Engine::open(config(tmp.path(), 64)).unwrap();
        assert_eq!(
            reopened.get(b"counter").unwrap(),
            Some(b"0000000499".to_vec())
        );
    }
}
