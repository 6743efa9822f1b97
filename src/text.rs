use html_escape::decode_html_entities;
use scraper::Html;

/// Strip HTML from an arbitrary string: decode entities, drop tags, collapse
/// runs of whitespace to single spaces. Best effort, never fails; if the
/// markup parse yields nothing the entity-decoded text is returned instead.
pub fn clean(input: &str) -> String {
    let decoded = decode_html_entities(input);
    let fragment = Html::parse_fragment(&decoded);
    let text = collapse_whitespace(fragment.root_element().text());

    if text.is_empty() {
        collapse_whitespace(std::iter::once(decoded.as_ref()))
    } else {
        text
    }
}

fn collapse_whitespace<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    let mut out = String::new();
    for part in parts {
        for word in part.split_whitespace() {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(word);
        }
    }
    out
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_tags_and_decodes_entities() {
        assert_eq!(
            clean("Great <b>coffee</b> &amp; pastries!"),
            "Great coffee & pastries!"
        );
    }

    #[test]
    fn collapses_whitespace() {
        assert_eq!(clean("  a\n\t b   c  "), "a b c");
    }

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(clean("already clean"), "already clean");
    }

    #[test]
    fn nested_markup() {
        assert_eq!(
            clean("<div><p>one</p><p>two &lt;three&gt;</p></div>"),
            "one two <three>"
        );
    }

    #[test]
    fn never_panics_on_malformed_markup() {
        assert_eq!(clean("<b>unclosed"), "unclosed");
        assert_eq!(clean(""), "");
    }
}
