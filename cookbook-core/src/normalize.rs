//! Text normalization and position assignment shared by import and manual edits.

/// Trim and collapse internal whitespace runs to single spaces.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalized ingredient name: lowercase, whitespace-collapsed.
pub fn normalize_name(name: &str) -> String {
    collapse_whitespace(&name.to_lowercase())
}

/// Order items by their requested position and renumber them 0..n.
///
/// Items with an explicit position come first (ties keep input order),
/// followed by items without one, in input order.
pub fn assign_positions<T>(items: Vec<(Option<i32>, T)>) -> Vec<(i32, T)> {
    let mut indexed: Vec<(usize, Option<i32>, T)> = items
        .into_iter()
        .enumerate()
        .map(|(i, (pos, item))| (i, pos, item))
        .collect();

    indexed.sort_by_key(|(i, pos, _)| (pos.is_none(), pos.unwrap_or(0), *i));

    indexed
        .into_iter()
        .enumerate()
        .map(|(position, (_, _, item))| (position as i32, item))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("  All-Purpose   FLOUR\n"), "all-purpose flour");
        assert_eq!(normalize_name("   "), "");
    }

    #[test]
    fn test_assign_positions_sorts_and_renumbers() {
        let items = vec![(Some(10), "c"), (None, "d"), (Some(2), "a"), (Some(5), "b")];
        let out = assign_positions(items);
        assert_eq!(out, vec![(0, "a"), (1, "b"), (2, "c"), (3, "d")]);
    }

    #[test]
    fn test_assign_positions_keeps_input_order_for_ties_and_missing() {
        let items = vec![(None, "x"), (Some(1), "b1"), (None, "y"), (Some(1), "b2")];
        let out = assign_positions(items);
        assert_eq!(out, vec![(0, "b1"), (1, "b2"), (2, "x"), (3, "y")]);
    }

    #[test]
    fn test_assign_positions_empty() {
        let out: Vec<(i32, ())> = assign_positions(Vec::new());
        assert!(out.is_empty());
    }
}
