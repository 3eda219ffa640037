#[cfg(test)]
mod tests {
    use crate::memtable::Memtable;
    use tracing::Level;
    use tracing_subscriber::fmt::Subscriber;

    fn init_tracing() {
        let _ = Subscriber::builder()
            .with_max_level(Level::TRACE)
            .try_init();
    }

    #[test]
    fn test_put_and_get() {
        init_tracing();

        let memtable = Memtable::new(0);
        memtable.put(b"key1", b"value1").unwrap();

        assert_eq!(memtable.get(b"key1").unwrap(), Some(b"value1".to_vec()));
        assert_eq!(memtable.get(b"missing").unwrap(), None);
    }

    #[test]
    fn test_overwrite_returns_latest() {
        init_tracing();

        let memtable = Memtable::new(0);
        memtable.put(b"a", b"1").unwrap();
        memtable.put(b"a", b"2").unwrap();

        assert_eq!(memtable.get(b"a").unwrap(), Some(b"2".to_vec()));
    }

    #[test]
    fn test_tombstone_is_stored_as_empty_value() {
        init_tracing();

        let memtable = Memtable::new(0);
        memtable.put(b"key1", b"value1").unwrap();
        memtable.put(b"key1", b"").unwrap();

        // The memtable layer returns tombstones verbatim; mapping empty
        // to "absent" is the engine's job.
        assert_eq!(memtable.get(b"key1").unwrap(), Some(Vec::new()));
    }

    #[test]
    fn test_size_accounting_new_keys() {
        init_tracing();

        let memtable = Memtable::new(0);
        assert_eq!(memtable.size_bytes().unwrap(), 0);
        assert!(memtable.is_empty().unwrap());

        memtable.put(b"abc", b"12345").unwrap();
        assert_eq!(memtable.size_bytes().unwrap(), 8);

        memtable.put(b"d", b"6").unwrap();
        assert_eq!(memtable.size_bytes().unwrap(), 10);
        assert!(!memtable.is_empty().unwrap());
    }

    #[test]
    fn test_size_accounting_overwrite_delta() {
        init_tracing();

        let memtable = Memtable::new(0);
        memtable.put(b"abc", b"12345").unwrap();

        // Longer replacement grows the accumulator by the delta only.
        memtable.put(b"abc", b"1234567").unwrap();
        assert_eq!(memtable.size_bytes().unwrap(), 10);

        // Shorter replacement shrinks it.
        memtable.put(b"abc", b"1").unwrap();
        assert_eq!(memtable.size_bytes().unwrap(), 4);

        // Tombstone overwrite leaves only the key counted.
        memtable.put(b"abc", b"").unwrap();
        assert_eq!(memtable.size_bytes().unwrap(), 3);
    }

    #[test]
    fn test_id_is_stable() {
        init_tracing();

        let memtable = Memtable::new(42);
        memtable.put(b"k", b"v").unwrap();
        assert_eq!(memtable.id(), 42);
    }
}
