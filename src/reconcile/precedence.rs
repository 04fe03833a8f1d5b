//! Collision-free precedence allocation
//!
//! The gateway rejects rules whose precedence collides with an existing
//! rule, so new override rules draw their precedence from an allocator
//! seeded with every value already in use by rules this engine does not
//! own.

use std::collections::HashSet;

use parking_lot::Mutex;

use crate::api::GatewayRule;

/// Hands out unused integer precedences, safe under concurrent callers
///
/// The cursor starts at 1 and skips every reserved value. The whole
/// check-and-increment runs under one lock so two concurrent callers can
/// never observe the same cursor position.
#[derive(Debug)]
pub struct PrecedenceAllocator {
    inner: Mutex<Inner>,
}

#[derive(Debug)]
struct Inner {
    reserved: HashSet<u32>,
    cursor: u32,
}

impl PrecedenceAllocator {
    /// Create an allocator with the given reserved precedences
    pub fn new(reserved: impl IntoIterator<Item = u32>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                reserved: reserved.into_iter().collect(),
                cursor: 1,
            }),
        }
    }

    /// Seed an allocator from the precedences of surviving rules
    pub fn seeded_from(rules: &[GatewayRule]) -> Self {
        Self::new(rules.iter().map(|rule| rule.precedence))
    }

    /// Return the next unused precedence
    pub fn next(&self) -> u32 {
        let mut inner = self.inner.lock();
        while inner.reserved.contains(&inner.cursor) {
            inner.cursor += 1;
        }
        let value = inner.cursor;
        inner.cursor += 1;
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_sequential_from_one() {
        let allocator = PrecedenceAllocator::new([]);
        assert_eq!(allocator.next(), 1);
        assert_eq!(allocator.next(), 2);
        assert_eq!(allocator.next(), 3);
    }

    #[test]
    fn test_skips_reserved_values() {
        let allocator = PrecedenceAllocator::new([1, 2, 4]);
        assert_eq!(allocator.next(), 3);
        assert_eq!(allocator.next(), 5);
        assert_eq!(allocator.next(), 6);
    }

    #[test]
    fn test_strictly_increasing() {
        let allocator = PrecedenceAllocator::new([3, 7, 8, 9]);
        let values: Vec<u32> = (0..20).map(|_| allocator.next()).collect();
        assert!(values.windows(2).all(|pair| pair[0] < pair[1]));
        assert!(values.iter().all(|v| ![3, 7, 8, 9].contains(v)));
    }

    #[test]
    fn test_concurrent_allocation_is_collision_free() {
        let reserved: Vec<u32> = (1..100).filter(|n| n % 3 == 0).collect();
        let allocator = Arc::new(PrecedenceAllocator::new(reserved.clone()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let allocator = Arc::clone(&allocator);
                std::thread::spawn(move || (0..50).map(|_| allocator.next()).collect::<Vec<u32>>())
            })
            .collect();

        let mut all: Vec<u32> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        let total = all.len();
        all.sort_unstable();
        all.dedup();

        assert_eq!(all.len(), total, "duplicate precedence handed out");
        assert!(all.iter().all(|v| !reserved.contains(v)));
    }
}
