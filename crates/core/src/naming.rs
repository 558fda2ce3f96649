//! Container / stream naming derived from type names.

/// Suffixes stripped from a type name to form its container name.
pub const TYPE_SUFFIXES: [&str; 3] = ["Entity", "Aggregate", "Root"];

/// Resolve the container (table, collection, stream prefix) name for a type.
///
/// An explicit override always wins. Otherwise well-known suffixes are stripped
/// repeatedly, so `OrderAggregateRoot` becomes `Order`. A name that is nothing
/// but a suffix is kept as-is.
pub fn container_name(type_name: &str, name_override: Option<&str>) -> String {
    if let Some(name) = name_override.filter(|n| !n.trim().is_empty()) {
        return name.to_string();
    }

    // Generic or path-qualified names (`crate::Order`) use their last segment.
    let mut name = type_name.rsplit("::").next().unwrap_or(type_name);

    loop {
        let stripped = TYPE_SUFFIXES.iter().find_map(|suffix| {
            name.strip_suffix(suffix).filter(|rest| !rest.is_empty())
        });
        match stripped {
            Some(rest) => name = rest,
            None => break,
        }
    }

    name.to_string()
}
