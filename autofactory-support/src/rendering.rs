//! Text rendering utilities for human-friendly diagnostics.
//!
//! Type names coming out of [`std::any::type_name`] are long and noisy
//! (`alloc::sync::Arc<dyn my_app::services::Mailer>`). Everything that ends
//! up in an error message or a factory signature goes through here first.

/// Shortens a fully qualified type name for display.
///
/// ```
/// use autofactory_support::rendering::shorten_type_name;
///
/// let short = shorten_type_name("my_app::services::user::UserService");
/// assert_eq!(short, "UserService");
///
/// let short = shorten_type_name("alloc::sync::Arc<dyn my_app::traits::Logger>");
/// assert_eq!(short, "Arc<dyn Logger>");
/// ```
pub fn shorten_type_name(full_name: &str) -> String {
    let mut result = String::with_capacity(full_name.len());
    let mut chars = full_name.chars().peekable();
    let mut segment = String::new();

    while let Some(ch) = chars.next() {
        match ch {
            ':' if chars.peek() == Some(&':') => {
                chars.next();
                segment.clear();
            }
            '<' | '>' | ',' | ' ' | '(' | ')' | '&' | '[' | ']' | ';' => {
                result.push_str(&segment);
                result.push(ch);
                segment.clear();
            }
            _ => segment.push(ch),
        }
    }

    result.push_str(&segment);
    result
}

/// Renders a resolution chain as a readable string.
///
/// ```
/// use autofactory_support::rendering::render_chain;
///
/// let chain = vec!["Mailer", "SmtpClient", "Mailer"];
/// assert_eq!(render_chain(&chain), "Mailer → SmtpClient → Mailer");
/// ```
pub fn render_chain(chain: &[impl AsRef<str>]) -> String {
    chain
        .iter()
        .map(|s| shorten_type_name(s.as_ref()))
        .collect::<Vec<_>>()
        .join(" → ")
}

/// Renders a factory signature, e.g. `fn(String, Option<Arc<dyn Part>>) -> Arc<dyn Widget>`.
///
/// ```
/// use autofactory_support::rendering::render_signature;
///
/// let sig = render_signature(&["alloc::string::String"], "alloc::sync::Arc<dyn app::Widget>");
/// assert_eq!(sig, "fn(String) -> Arc<dyn Widget>");
/// ```
pub fn render_signature(parameters: &[impl AsRef<str>], produced: &str) -> String {
    let params = parameters
        .iter()
        .map(|p| shorten_type_name(p.as_ref()))
        .collect::<Vec<_>>()
        .join(", ");
    format!("fn({params}) -> {}", shorten_type_name(produced))
}

/// Generates "did you mean?" suggestions based on registered types.
///
/// Compares the requested type name against available types
/// and returns the closest matches, best first.
pub fn suggest_similar(
    requested: &str,
    available: &[&str],
    max_suggestions: usize,
) -> Vec<String> {
    let requested_lower = requested.to_lowercase();
    let requested_short = shorten_type_name(requested).to_lowercase();

    let mut scored: Vec<(&str, usize)> = available
        .iter()
        .filter(|&&name| name != requested)
        .filter_map(|&name| {
            let name_lower = name.to_lowercase();
            let name_short = shorten_type_name(name).to_lowercase();

            if name_lower.contains(&requested_lower) || requested_lower.contains(&name_lower) {
                return Some((name, 100));
            }

            if name_short.contains(&requested_short) || requested_short.contains(&name_short) {
                return Some((name, 80));
            }

            let common = name_short
                .chars()
                .zip(requested_short.chars())
                .take_while(|(a, b)| a == b)
                .count();

            (common >= 3).then_some((name, common * 10))
        })
        .collect();

    scored.sort_by(|a, b| b.1.cmp(&a.1));
    scored
        .into_iter()
        .take(max_suggestions)
        .map(|(name, _)| name.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shorten_simple_path() {
        assert_eq!(shorten_type_name("my_app::services::UserService"), "UserService");
    }

    #[test]
    fn shorten_with_generics() {
        assert_eq!(
            shorten_type_name("core::option::Option<alloc::sync::Arc<dyn app::Part>>"),
            "Option<Arc<dyn Part>>"
        );
    }

    #[test]
    fn shorten_tuple() {
        assert_eq!(
            shorten_type_name("(alloc::string::String, u32)"),
            "(String, u32)"
        );
    }

    #[test]
    fn shorten_no_path() {
        assert_eq!(shorten_type_name("String"), "String");
    }

    #[test]
    fn render_chain_shortens_each_link() {
        let chain = vec!["app::A", "app::B", "app::A"];
        assert_eq!(render_chain(&chain), "A → B → A");
    }

    #[test]
    fn render_empty_chain() {
        let chain: Vec<&str> = vec![];
        assert_eq!(render_chain(&chain), "");
    }

    #[test]
    fn render_nullary_signature() {
        let params: [&str; 0] = [];
        assert_eq!(render_signature(&params, "app::Widget"), "fn() -> Widget");
    }

    #[test]
    fn render_binary_signature() {
        let sig = render_signature(
            &["alloc::string::String", "core::option::Option<app::Part>"],
            "app::Widget",
        );
        assert_eq!(sig, "fn(String, Option<Part>) -> Widget");
    }

    #[test]
    fn suggest_similar_types() {
        let available = vec![
            "my_app::UserService",
            "my_app::UserRepository",
            "my_app::Logger",
        ];

        let suggestions = suggest_similar("UserServise", &available, 3);
        assert!(!suggestions.is_empty());
        assert!(suggestions[0].contains("User"));
    }

    #[test]
    fn suggest_skips_exact_match() {
        let available = vec!["my_app::Database"];
        assert!(suggest_similar("my_app::Database", &available, 3).is_empty());
    }

    #[test]
    fn suggest_no_match() {
        let available = vec!["my_app::Database"];
        assert!(suggest_similar("XyzAbcDef", &available, 3).is_empty());
    }
}
