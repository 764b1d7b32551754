//! Priority ordering shared by extensions, listeners and runners.

/// Sorts first.
pub const HIGHEST_PRECEDENCE: i32 = i32::MIN;

/// Sorts last. Also the order of anything that does not declare one.
pub const LOWEST_PRECEDENCE: i32 = i32::MAX;

/// Stable sort by an order key; equal keys keep their relative position.
pub fn sort_by_order<T>(items: &mut [T], order: impl Fn(&T) -> i32) {
    items.sort_by_key(|item| order(item));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_is_stable_for_ties() {
        let mut items = vec![("c", 5), ("a", 1), ("b", 5), ("d", HIGHEST_PRECEDENCE)];
        sort_by_order(&mut items, |(_, order)| *order);
        let names: Vec<_> = items.iter().map(|(name, _)| *name).collect();
        assert_eq!(names, vec!["d", "a", "c", "b"]);
    }
}
