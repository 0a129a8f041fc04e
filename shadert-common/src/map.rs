/// Fast hash map type for small, non-adversarial keys.
pub type FastHashMap<K, V> = rustc_hash::FxHashMap<K, V>;

/// Fast hash set type for small, non-adversarial keys.
pub type FastHashSet<K> = rustc_hash::FxHashSet<K>;
