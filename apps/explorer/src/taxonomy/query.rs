use crate::domain::SplistItem;

/// Renders a splist as the backend's query fragment: `level = v1, v2; level2 = w1`.
///
/// Levels are grouped in order of first appearance (trimmed, lowercased) and
/// values are deduplicated within a level. Pairs with an empty side are skipped.
pub fn build_query_string(items: &[SplistItem]) -> String {
    let mut groups: Vec<(String, Vec<&str>)> = Vec::new();

    for item in items {
        let level = item.level.trim().to_lowercase();
        let value = item.value.trim();
        if level.is_empty() || value.is_empty() {
            continue;
        }

        match groups.iter_mut().find(|(name, _)| *name == level) {
            Some((_, values)) => {
                if !values.contains(&value) {
                    values.push(value);
                }
            }
            None => groups.push((level, vec![value])),
        }
    }

    groups
        .iter()
        .map(|(level, values)| format!("{level} = {}", values.join(", ")))
        .collect::<Vec<_>>()
        .join("; ")
}
