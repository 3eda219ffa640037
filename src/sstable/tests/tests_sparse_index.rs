#[cfg(test)]
mod tests {
    use crate::sstable::index::{INDEX_SAMPLE_STRIDE, SparseIndex};

    /// Build `count` records of exactly 1000 payload bytes each
    /// (4-byte key + 996-byte value), so the sampling cadence is easy to
    /// predict against the 4096-byte stride.
    fn kilobyte_entries(count: usize) -> Vec<(Vec<u8>, Vec<u8>)> {
        (0..count)
            .map(|i| (format!("k{i:03}").into_bytes(), vec![b'v'; 996]))
            .collect()
    }

    fn build(entries: &[(Vec<u8>, Vec<u8>)]) -> SparseIndex {
        SparseIndex::from_entries(entries.iter().map(|(k, v)| (k.as_slice(), v.as_slice())))
    }

    #[test]
    fn test_first_key_always_sampled_at_zero() {
        let entries = vec![(b"only".to_vec(), b"entry".to_vec())];
        let index = build(&entries);

        assert_eq!(index.len(), 1);
        assert_eq!(index.lookup(b"only"), (0, None));
    }

    #[test]
    fn test_sampling_resets_per_stride() {
        // With 1000-byte records the accumulator exceeds 4096 after five
        // records, so samples land at indices 0, 5, 10, 15.
        let entries = kilobyte_entries(20);
        let index = build(&entries);

        assert_eq!(index.len(), 4);
        assert_eq!(index.lookup(b"k000"), (0, Some(5)));
        assert_eq!(index.lookup(b"k005"), (5, Some(10)));
        assert_eq!(index.lookup(b"k015"), (15, None));
    }

    #[test]
    fn test_lookup_between_samples() {
        let entries = kilobyte_entries(20);
        let index = build(&entries);

        // Keys between two sampled keys resolve to the window below them.
        assert_eq!(index.lookup(b"k003"), (0, Some(5)));
        assert_eq!(index.lookup(b"k012"), (10, Some(15)));
        // Past the last sampled key the window is open-ended.
        assert_eq!(index.lookup(b"k019"), (15, None));
        assert_eq!(index.lookup(b"zzz"), (15, None));
    }

    #[test]
    fn test_lookup_before_first_key_yields_empty_window() {
        let entries = kilobyte_entries(20);
        let index = build(&entries);

        // No sampled key ≤ query → start 0; least sampled key > query is
        // the first sample → end 0. The window [0, 0) is empty.
        assert_eq!(index.lookup(b"a"), (0, Some(0)));
    }

    #[test]
    fn test_window_spans_at_most_one_stride_of_payload() {
        let entries = kilobyte_entries(100);
        let index = build(&entries);

        for i in 0..100 {
            let key = format!("k{i:03}").into_bytes();
            let (start, end) = index.lookup(&key);
            let end = end.unwrap_or(100);
            assert!(start <= i && i < end, "k{i:03} outside window [{start}, {end})");

            let window_bytes: usize = entries[start..end]
                .iter()
                .map(|(k, v)| k.len() + v.len())
                .sum();
            // One record may straddle the stride boundary.
            assert!(
                window_bytes <= INDEX_SAMPLE_STRIDE + 1000 + 1000,
                "window [{start}, {end}) spans {window_bytes} bytes"
            );
        }
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let entries = kilobyte_entries(20);
        let index = build(&entries);
        let raw = index.encode().unwrap();

        let decoded = SparseIndex::decode(&raw).unwrap();
        assert_eq!(decoded.len(), index.len());
        for i in 0..20 {
            let key = format!("k{i:03}").into_bytes();
            assert_eq!(decoded.lookup(&key), index.lookup(&key));
        }
    }

    #[test]
    fn test_empty_region_decodes_to_empty_index() {
        let index = SparseIndex::decode(&[]).unwrap();
        assert!(index.is_empty());
        assert_eq!(index.lookup(b"anything"), (0, None));
    }
}
