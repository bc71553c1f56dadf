pub const QUESTIONS_SYSTEM: &str = include_str!("../data/prompts/questions_system.txt");
pub const QUESTIONS_USER: &str = include_str!("../data/prompts/questions_user.txt");
pub const PORTRAIT: &str = include_str!("../data/prompts/portrait.txt");
pub const PORTRAIT_LOGO: &str = include_str!("../data/prompts/portrait_logo.txt");
const PORTRAIT_STYLES: &str = include_str!("../data/portrait_styles.txt");

/// Replace `{{key}}` placeholders in a template string.
///
/// Substituted values are copied through verbatim, never re-scanned.
/// Unknown placeholders are left as they are.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut result = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let value = after.find("}}").and_then(|end| {
            let key = &after[..end];
            vars.iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| (*value, end))
        });
        match value {
            Some((value, end)) => {
                result.push_str(value);
                rest = &after[end + 2..];
            }
            None => {
                result.push_str("{{");
                rest = after;
            }
        }
    }
    result.push_str(rest);
    result
}

/// Named cartoon styles a portrait can be drawn in.
pub fn portrait_styles() -> Vec<&'static str> {
    PORTRAIT_STYLES
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_single_var() {
        assert_eq!(
            render("Hello {{name}}!", &[("name", "world")]),
            "Hello world!"
        );
    }

    #[test]
    fn test_render_repeated_var() {
        assert_eq!(render("{{n}} of {{n}}", &[("n", "6")]), "6 of 6");
    }

    #[test]
    fn test_render_does_not_rescan_values() {
        assert_eq!(
            render("{{a}} / {{b}}", &[("a", "{{b}}"), ("b", "two")]),
            "{{b}} / two"
        );
    }

    #[test]
    fn test_render_leaves_unknown_placeholders() {
        assert_eq!(render("{{x}} {{ y", &[("y", "1")]), "{{x}} {{ y");
    }

    #[test]
    fn test_prompts_are_non_empty() {
        assert!(!QUESTIONS_SYSTEM.is_empty());
        assert!(!QUESTIONS_USER.is_empty());
        assert!(!PORTRAIT.is_empty());
        assert!(!PORTRAIT_LOGO.is_empty());
    }

    #[test]
    fn test_questions_user_has_count_placeholders() {
        for key in ["{{total}}", "{{hard}}", "{{medium}}", "{{easy}}", "{{players_label}}"] {
            assert!(QUESTIONS_USER.contains(key), "missing {}", key);
        }
    }

    #[test]
    fn test_portrait_has_placeholders() {
        assert!(PORTRAIT.contains("{{answers}}"));
        assert!(PORTRAIT.contains("{{style}}"));
        assert!(PORTRAIT_LOGO.contains("{{logo_url}}"));
    }

    #[test]
    fn test_portrait_styles_list() {
        let styles = portrait_styles();
        assert_eq!(styles.len(), 22);
        assert!(styles.contains(&"Studio Ghibli"));
        assert!(styles.iter().all(|s| !s.is_empty()));
    }
}
