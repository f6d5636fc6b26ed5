//! Named-variable template expansion.
//!
//! Notification titles, bodies and link templates are user-supplied
//! strings expanded against a fixed variable set. Expansion is pure
//! substitution of `${name}` references; there is deliberately no
//! expression evaluation, so a template can never execute anything.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

fn variable_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("variable regex is valid"))
}

/// Expands `${name}` references in a template.
///
/// Unknown variables expand to the empty string.
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
/// use vigil_core::template;
///
/// let variables = HashMap::from([("name".to_string(), "nginx".to_string())]);
/// assert_eq!(
///     template::render("update for ${name}", &variables),
///     "update for nginx"
/// );
/// ```
#[must_use]
pub fn render(template: &str, variables: &HashMap<String, String>) -> String {
    variable_regex()
        .replace_all(template, |captures: &regex::Captures<'_>| {
            variables
                .get(&captures[1])
                .cloned()
                .unwrap_or_default()
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variables(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_render_substitutes_variables() {
        let rendered = render(
            "New ${kind} found for container ${name}",
            &variables(&[("kind", "tag"), ("name", "nginx")]),
        );
        assert_eq!(rendered, "New tag found for container nginx");
    }

    #[test]
    fn test_render_unknown_variable_is_empty() {
        assert_eq!(render("x${missing}y", &variables(&[])), "xy");
    }

    #[test]
    fn test_render_repeated_variable() {
        let rendered = render(
            "${v} then ${v}",
            &variables(&[("v", "1.2.3")]),
        );
        assert_eq!(rendered, "1.2.3 then 1.2.3");
    }

    #[test]
    fn test_render_no_expression_evaluation() {
        // Anything that is not a plain `${name}` reference passes through.
        let rendered = render("${1 + 1} and ${name.id}", &variables(&[("name", "x")]));
        assert_eq!(rendered, "${1 + 1} and ${name.id}");
    }
}
