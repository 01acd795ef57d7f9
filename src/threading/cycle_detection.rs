//! Cycle detection for reply-chain linking
//!
//! Mail clients cannot produce a message that replies to its own descendant, but
//! forged or corrupted In-Reply-To headers can. Linking such a message would turn
//! the forest into a graph, so the builder checks ancestry before every link.

/// Check if linking `child` under `parent` would create a cycle
///
/// Walks up the ancestry chain from the proposed parent following the parent
/// links recorded so far. Reaching `child` (or revisiting a node) means the link
/// would close a loop.
///
/// ```text
/// Current tree:  0 → 1 → 2
///
/// Trying to link: 0 under 2 (would create cycle 0 → 1 → 2 → 0)
/// Result: true
/// ```
pub fn detect_cycle_in_ancestry(parents: &[Option<usize>], child: usize, parent: usize) -> bool {
    // Bounded by the node count even if the parent links are already corrupt
    let mut steps = 0;
    let mut current = Some(parent);

    while let Some(node) = current {
        if node == child || steps > parents.len() {
            return true;
        }
        steps += 1;
        current = parents.get(node).copied().flatten();
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_cycle_simple_chain() {
        // 0 → 1 → 2, linking 3 under 2 is safe
        let parents = vec![None, Some(0), Some(1), None];
        assert!(!detect_cycle_in_ancestry(&parents, 3, 2));
    }

    #[test]
    fn test_cycle_detected() {
        let parents = vec![None, Some(0), Some(1)];
        assert!(detect_cycle_in_ancestry(&parents, 0, 2));
    }

    #[test]
    fn test_self_loop() {
        let parents = vec![None];
        assert!(detect_cycle_in_ancestry(&parents, 0, 0));
    }

    #[test]
    fn test_corrupt_links_terminate() {
        // 1 and 2 already point at each other
        let parents = vec![None, Some(2), Some(1)];
        assert!(detect_cycle_in_ancestry(&parents, 0, 1));
    }
}
