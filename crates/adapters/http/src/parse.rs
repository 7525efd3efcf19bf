//! Text grammar of HTTP actions.
//!
//! ```text
//! action: <url template> (Reverse true)
//! ```

use commander_domain::dsl;
use commander_domain::error::DslError;
use commander_domain::rule::HttpAction;

use crate::template;

/// Parse the text of an HTTP action.
///
/// # Errors
///
/// Returns a [`DslError`] if the URL is missing, is not a valid template, or
/// an option carries an invalid value.
pub fn action(text: &str) -> Result<HttpAction, DslError> {
    let url = dsl::head(text);
    if url.is_empty() {
        return Err(DslError::Malformed(text.to_string()));
    }
    template::check(url).map_err(|err| DslError::Template(err.to_string()))?;
    Ok(HttpAction {
        url: url.to_string(),
        reverse: dsl::bool_option(text, "Reverse")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_parse_url_with_reverse() {
        let parsed = action("http://lights.local/api/off (Reverse true)").unwrap();
        assert_eq!(parsed.url, "http://lights.local/api/off");
        assert!(parsed.reverse);
    }

    #[test]
    fn should_keep_template_placeholders() {
        let parsed = action("http://hub/notify?name={{ name }}").unwrap();
        assert_eq!(parsed.url, "http://hub/notify?name={{ name }}");
        assert!(!parsed.reverse);
    }

    #[test]
    fn should_reject_missing_url() {
        assert!(matches!(action("(Reverse true)"), Err(DslError::Malformed(_))));
    }

    #[test]
    fn should_reject_broken_template() {
        assert!(matches!(
            action("http://hub/notify?name={{name"),
            Err(DslError::Template(_))
        ));
    }
}
