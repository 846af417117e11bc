//! HTML pages compiled into the binary and rendered with minijinja.

use crate::Result;
use axum::response::Html;
use minijinja::Environment;
use serde::Serialize;
use std::sync::LazyLock;

const PAGES: &[(&str, &str)] = &[
    ("base.html", include_str!("../../templates/base.html")),
    ("index.html", include_str!("../../templates/index.html")),
    ("processing.html", include_str!("../../templates/processing.html")),
    ("context.html", include_str!("../../templates/context.html")),
    ("final.html", include_str!("../../templates/final.html")),
    (
        "feedback_result.html",
        include_str!("../../templates/feedback_result.html"),
    ),
    ("error.html", include_str!("../../templates/error.html")),
];

// Pages are parsed on first use, so a syntax error surfaces as
// `Error::Template` from `render` rather than at startup.
static ENVIRONMENT: LazyLock<Environment<'static>> = LazyLock::new(|| {
    let mut env = Environment::new();
    env.set_loader(|name| {
        Ok(PAGES
            .iter()
            .find(|(page, _)| *page == name)
            .map(|(_, source)| source.to_string()))
    });
    env
});

/// Render a page by file name. `.html` names are auto-escaped.
pub fn render<S: Serialize>(name: &str, ctx: S) -> Result<Html<String>> {
    let template = ENVIRONMENT.get_template(name)?;
    Ok(Html(template.render(ctx)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use minijinja::context;

    #[test]
    fn test_every_page_renders() {
        for (name, _) in PAGES {
            let html = render(
                name,
                context! {
                    uid => "abc",
                    poll_ms => 1000,
                    max_wait_ms => 10000,
                    caption => "Sunny paws",
                    final_caption => "Sunny paws",
                    alternatives => vec!["One", "Two"],
                    status => 400,
                    message => "Bad upload",
                },
            )
            .unwrap();
            assert!(html.0.contains("<html"), "{} did not extend the layout", name);
        }
    }

    #[test]
    fn test_user_text_is_escaped() {
        let html = render("final.html", context! { caption => "<script>x</script>" }).unwrap();
        assert!(!html.0.contains("<script>x"));
        assert!(html.0.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_unknown_page_is_an_error() {
        assert!(render("missing.html", context! {}).is_err());
    }
}
