//! Convention-based mapping from dependency names to class names.

use convert_case::{Case, Casing};

/// Separator between the segments of a qualified class name
pub const SEPARATOR: &str = "::";

/// Turn a dependency name into a class name.
///
/// `team_query` gives `TeamQuery`. A `/` introduces a nested segment: `admin/team_query` gives
/// `Admin::TeamQuery`. Words are only split at `_`, so `s3client` gives `S3client`.
pub fn camelize(name: &str) -> String {
    name.split('/')
        .map(|segment| segment.from_case(Case::Snake).to_case(Case::Pascal))
        .collect::<Vec<_>>()
        .join(SEPARATOR)
}

/// List the qualified names under which a class is looked up, in lookup order.
///
/// Each namespace of the chain is searched from the innermost scope outwards, then the class is
/// looked up at the top level.
pub fn lookup_candidates(namespaces: &[String], class: &str) -> Vec<String> {
    let mut candidates: Vec<String> = Vec::new();
    let mut push = |candidate: String| {
        if !candidates.contains(&candidate) {
            candidates.push(candidate);
        }
    };

    for namespace in namespaces {
        let mut scope: Vec<&str> = namespace
            .split(SEPARATOR)
            .filter(|s| !s.is_empty())
            .collect();
        while !scope.is_empty() {
            push(format!("{}{SEPARATOR}{class}", scope.join(SEPARATOR)));
            scope.pop();
        }
    }
    push(class.to_string());
    candidates
}
