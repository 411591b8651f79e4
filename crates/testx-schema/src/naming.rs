//! Naming rules for generated root fields, input types and tables

/// Pluralize an entity name for list fields and table names
pub fn pluralize(name: &str) -> String {
    let lower = name.to_ascii_lowercase();
    if ["s", "x", "z", "ch", "sh"]
        .iter()
        .any(|suffix| lower.ends_with(suffix))
    {
        return format!("{name}es");
    }

    let mut chars = lower.chars().rev();
    if let (Some('y'), Some(before)) = (chars.next(), chars.next())
        && !matches!(before, 'a' | 'e' | 'i' | 'o' | 'u')
    {
        let stem = name.get(..name.len() - 1).unwrap_or_default();
        return format!("{stem}ies");
    }

    format!("{name}s")
}

/// Lower the first character of a type name to build a field name
pub fn lower_camel(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Convert a type or field name to snake_case
pub fn snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut result = String::with_capacity(name.len() + 4);
    for (index, current) in chars.iter().enumerate() {
        if current.is_uppercase() && index > 0 {
            let previous = chars.get(index - 1);
            let next = chars.get(index + 1);
            let after_lower = previous.is_some_and(|c| c.is_lowercase() || c.is_ascii_digit());
            let acronym_end =
                previous.is_some_and(|c| c.is_uppercase()) && next.is_some_and(|c| c.is_lowercase());
            if (after_lower || acronym_end) && !result.ends_with('_') {
                result.push('_');
            }
        }
        result.extend(current.to_lowercase());
    }
    result
}

/// Name of the table holding rows of an entity
pub fn table_name(entity: &str) -> String {
    snake_case(&pluralize(entity))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("User", "Users")]
    #[case("Address", "Addresses")]
    #[case("Box", "Boxes")]
    #[case("Match", "Matches")]
    #[case("Category", "Categories")]
    #[case("Day", "Days")]
    #[case("Key", "Keys")]
    fn it_pluralizes(#[case] name: &str, #[case] expected: &str) {
        assert_eq!(pluralize(name), expected);
    }

    #[rstest]
    #[case("User", "users")]
    #[case("BlogPost", "blog_posts")]
    #[case("HTTPLog", "http_logs")]
    #[case("Category", "categories")]
    fn it_builds_table_names(#[case] name: &str, #[case] expected: &str) {
        assert_eq!(table_name(name), expected);
    }

    #[test]
    fn it_lowers_the_first_character() {
        assert_eq!(lower_camel("BlogPost"), "blogPost");
        assert_eq!(lower_camel(""), "");
    }

    #[test]
    fn it_snake_cases_field_names() {
        assert_eq!(snake_case("author"), "author");
        assert_eq!(snake_case("createdAt"), "created_at");
        assert_eq!(snake_case("address2Line"), "address2_line");
    }
}
