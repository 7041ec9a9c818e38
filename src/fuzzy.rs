//! Subsequence and prefix matching shared by the menu and the pickers.

/// True when every character of `query` appears in `candidate` in order.
/// Comparison is case-insensitive and an empty query matches everything.
pub fn matches(candidate: &str, query: &str) -> bool {
    if query.is_empty() {
        return true;
    }

    let candidate = candidate.to_lowercase();
    let mut remaining = candidate.chars();
    query
        .to_lowercase()
        .chars()
        .all(|wanted| remaining.any(|c| c == wanted))
}

/// Indices of the candidates that match `query`, prefix matches first.
///
/// Prefix matches are ordered by length, tighter matches first, with ties
/// kept in original order. Subsequence-only matches follow in original
/// order. Candidates that do not match at all are dropped.
pub fn rank<S: AsRef<str>>(candidates: &[S], query: &str) -> Vec<usize> {
    if query.is_empty() {
        return (0..candidates.len()).collect();
    }

    let query_lower = query.to_lowercase();
    let mut prefixed = Vec::new();
    let mut scattered = Vec::new();
    for (index, candidate) in candidates.iter().enumerate() {
        let candidate = candidate.as_ref();
        if candidate.to_lowercase().starts_with(&query_lower) {
            prefixed.push(index);
        } else if matches(candidate, &query_lower) {
            scattered.push(index);
        }
    }

    prefixed.sort_by_key(|index| candidates[*index].as_ref().chars().count());
    prefixed.extend(scattered);
    prefixed
}

#[cfg(test)]
mod tests {
    use super::{matches, rank};

    #[test]
    fn empty_query_matches_everything() {
        assert!(matches("anything", ""));
        assert!(matches("", ""));
    }

    #[test]
    fn subsequence_is_case_insensitive() {
        assert!(matches("Kube-System", "ksys"));
        assert!(matches("deployments", "DPL"));
        assert!(!matches("pods", "pdso"));
        assert!(!matches("", "a"));
    }

    #[test]
    fn rank_puts_prefix_matches_first() {
        let candidates = ["podcast", "pod-a", "apod"];
        let ranked = rank(&candidates, "pod")
            .into_iter()
            .map(|index| candidates[index])
            .collect::<Vec<_>>();
        assert_eq!(ranked, vec!["pod-a", "podcast", "apod"]);
    }

    #[test]
    fn rank_keeps_original_order_within_tiers() {
        let candidates = ["xpod", "pod-b", "p-o-d", "pod-a", "node"];
        assert_eq!(rank(&candidates, "pod"), vec![1, 3, 0, 2]);
    }

    #[test]
    fn rank_drops_non_matching_candidates() {
        let candidates = ["default", "kube-system"];
        assert!(rank(&candidates, "zzz").is_empty());
    }

    #[test]
    fn rank_with_empty_query_keeps_all() {
        let candidates = vec!["b".to_string(), "a".to_string()];
        assert_eq!(rank(&candidates, ""), vec![0, 1]);
    }
}
