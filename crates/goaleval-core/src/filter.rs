use crate::model::TestCase;

/// Narrow `cases` to the ordered subsequence whose tags intersect `requested`.
///
/// An empty request is the identity: the input comes back unchanged, in order,
/// without deduplication. Callers treat an empty selection as a fatal
/// configuration error; this function only selects.
pub fn filter_by_tags(cases: Vec<TestCase>, requested: &[String]) -> Vec<TestCase> {
    if requested.is_empty() {
        return cases;
    }
    cases
        .into_iter()
        .filter(|case| case.tags.iter().any(|t| requested.contains(t)))
        .collect()
}
