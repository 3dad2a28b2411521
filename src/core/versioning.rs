/*
 * Process-wide version counter shared by the tree model, the selection set and
 * the token index. Every mutation of those structures takes a fresh value, so a
 * cache stamp built from them can never collide with an earlier state, even when
 * a structure is replaced wholesale by a new instance.
 */
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_VERSION: AtomicU64 = AtomicU64::new(1);

pub fn next_version() -> u64 {
    NEXT_VERSION.fetch_add(1, Ordering::Relaxed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_version_is_strictly_increasing() {
        let a = next_version();
        let b = next_version();
        assert!(b > a);
    }
}
