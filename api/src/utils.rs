// lowercase, ASCII-only slug, e.g. "Hello, Wörld!" -> "hello-world"
pub fn slugify(title: &str) -> String {
    slug::slugify(title)
}

// trim an optional string, dropping it if nothing is left
pub fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("  Crème brûlée: a guide! "), "creme-brulee-a-guide");
        assert_eq!(slugify("Real Estate"), "real-estate");
    }

    #[test]
    fn test_trimmed() {
        assert_eq!(trimmed(Some("  x ".into())), Some("x".into()));
        assert_eq!(trimmed(Some("   ".into())), None);
        assert_eq!(trimmed(None), None);
    }
}
