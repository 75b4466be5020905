// src/utils/html.rs

/// Sanitizes instructor-authored module content.
///
/// Whitelist-based: formatting tags such as <p>, <b>, <ul> survive, while
/// <script>, <iframe> and event-handler attributes are stripped.
pub fn sanitize_content(input: &str) -> String {
    ammonia::clean(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_formatting_and_drops_scripts() {
        let cleaned = sanitize_content(
            "<p>Check <b>vitals</b></p><script>alert(1)</script><img src=x onerror=alert(1)>",
        );
        assert!(cleaned.contains("<b>vitals</b>"));
        assert!(!cleaned.contains("script"));
        assert!(!cleaned.contains("onerror"));
    }
}
