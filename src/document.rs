//! Wraps a rendered page into a complete HTML document.
use crate::config::DocumentSettings;
use canopy_render::RenderedPage;
use canopy_render::html::{escape_attr, escape_text};
use itertools::Itertools;

/// Id of the `<script>` element carrying the API cache for hydration.
pub const API_CACHE_ELEMENT_ID: &str = "canopy-api-cache";

/// Id of the `<style>` element carrying the custom-property rules.
pub const STYLE_VARIABLES_ELEMENT_ID: &str = "canopy-style-variables";

/// JSON for a `<script>` body. `<` only occurs inside JSON strings, where
/// `<` is an equivalent escape that cannot close the element.
fn script_json(json: &str) -> String {
    json.replace('<', "\\u003c")
}

/// CSS for a `<style>` body. `<\/` is a CSS escape for `</`, which the
/// HTML parser does not read as an end tag.
fn style_css(css: &str) -> String {
    css.replace("</", "<\\/")
}

pub fn render_document(page: &RenderedPage, settings: &DocumentSettings) -> String {
    let title = settings
        .title
        .as_deref()
        .map(|title| format!("<title>{}</title>\n", escape_text(title)))
        .unwrap_or_default();
    let script = settings
        .client_script
        .as_deref()
        .map(|src| format!("<script type=\"module\" src=\"{}\"></script>\n", escape_attr(src)))
        .unwrap_or_default();
    let styles = page.style_variables.iter().map(|rule| style_css(rule)).join("\n");

    format!(
        concat!(
            "<!DOCTYPE html>\n",
            "<html lang=\"{lang}\">\n",
            "<head>\n",
            "<meta charset=\"utf-8\">\n",
            "<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n",
            "{title}",
            "<style id=\"{style_id}\">\n{styles}\n</style>\n",
            "</head>\n",
            "<body>\n",
            "<div id=\"App\">{html}</div>\n",
            "<script type=\"application/json\" id=\"{cache_id}\">{cache}</script>\n",
            "{script}",
            "</body>\n",
            "</html>\n"
        ),
        lang = escape_attr(&settings.lang),
        title = title,
        style_id = STYLE_VARIABLES_ELEMENT_ID,
        styles = styles,
        html = page.html,
        cache_id = API_CACHE_ELEMENT_ID,
        cache = script_json(&page.api_cache.to_string()),
        script = script,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn page() -> RenderedPage {
        RenderedPage {
            html: "<main data-id=\"0\"></main>".to_string(),
            api_cache: json!({ "k": { "data": "</script><b>", "isLoading": false, "error": null } }),
            style_variables: vec![
                "[data-id=\"1\"] { --b: 2; }".to_string(),
                "[data-id=\"0\"] { --a: 1; }".to_string(),
            ],
            diagnostics: Vec::new(),
        }
    }

    #[test]
    fn document_contains_markup_styles_and_cache() {
        let settings = DocumentSettings {
            title: Some("Shop & Co".to_string()),
            client_script: Some("/app.js".to_string()),
            ..DocumentSettings::default()
        };
        let document = render_document(&page(), &settings);

        assert!(document.starts_with("<!DOCTYPE html>\n<html lang=\"en\">"));
        assert!(document.contains("<title>Shop &amp; Co</title>"));
        assert!(document.contains("<div id=\"App\"><main data-id=\"0\"></main></div>"));
        assert!(document.contains(
            "<style id=\"canopy-style-variables\">\n[data-id=\"1\"] { --b: 2; }\n[data-id=\"0\"] { --a: 1; }\n</style>"
        ));
        assert!(document.contains("<script type=\"module\" src=\"/app.js\"></script>"));
    }

    #[test]
    fn cache_cannot_break_out_of_its_script() {
        let document = render_document(&page(), &DocumentSettings::default());
        let start = document.find("id=\"canopy-api-cache\">").unwrap();
        let body = &document[start..];
        let end = body.find("</script>").unwrap();
        let json_text = &body["id=\"canopy-api-cache\">".len()..end];

        let decoded: serde_json::Value = serde_json::from_str(json_text).unwrap();
        assert_eq!(decoded["k"]["data"], "</script><b>");
    }

    #[test]
    fn styles_cannot_break_out_of_their_element() {
        let mut page = page();
        page.style_variables =
            vec!["[data-id=\"0\"] { --c: red</style><script>x()</script>; }".to_string()];
        let document = render_document(&page, &DocumentSettings::default());

        let start = document.find("<style id=\"canopy-style-variables\">").unwrap();
        let body = &document[start..];
        let end = body.find("</style>").unwrap();
        assert!(body[..end].contains("--c: red<\\/style><script>x()<\\/script>; }"));
    }
}
