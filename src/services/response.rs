//! Parsing of the generator's raw answer into cards.
//!
//! The model is asked for `{"cards":[{"style": …, "html": …}, …]}` but does
//! not always comply: answers arrive wrapped in code fences, with prose around
//! the JSON, as a bare array, or as bare strings. These rules accept all of
//! those and then scrub each card's markup.
//!
//! ## Rule Order
//!
//! Fences are stripped and line endings normalised before locating the JSON
//! payload; markup scrubbing runs per card after parsing so that escaped
//! characters inside JSON strings are already decoded.

use crate::error::ServiceError;
use crate::gallery::GeneratedCard;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// Parse a raw generator answer into cards.
///
/// Returns an empty vector when the answer is well-formed but lists no cards;
/// the studio turns that into `GenerationError::EmptyResult`.
pub fn parse_cards(raw: &str) -> Result<Vec<GeneratedCard>, ServiceError> {
    let s = strip_code_fences(raw);
    let s = normalise_line_endings(&s);

    // A bare HTML answer counts as a single card. Checked first because
    // inline CSS braces would otherwise look like a JSON payload.
    let cards = if s.trim_start().starts_with('<') {
        vec![GeneratedCard::new(s.trim())]
    } else {
        cards_from_answer(&s)?
    };

    Ok(cards
        .into_iter()
        .filter_map(|mut card| {
            card.markup = scrub_markup(&card.markup);
            (!card.markup.is_empty()).then_some(card)
        })
        .collect())
}

// ── Rule 1: Strip outer code fences ──────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[a-zA-Z]*\s*\n(.*)\n```\s*$").unwrap());

fn strip_code_fences(input: &str) -> String {
    if let Some(caps) = RE_OUTER_FENCES.captures(input.trim()) {
        caps[1].to_string()
    } else {
        input.to_string()
    }
}

// ── Rule 2: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 3: Locate the JSON payload ──────────────────────────────────────────

/// Try every `{` / `[` in order and take the first one that starts a JSON
/// value of an accepted shape. Prose around the payload may contain brackets
/// of its own, and anything after the value is ignored.
fn cards_from_answer(input: &str) -> Result<Vec<GeneratedCard>, ServiceError> {
    let mut last_err =
        ServiceError::InvalidResponse("answer contains neither JSON nor HTML".into());

    for (start, _) in input.match_indices(['{', '[']) {
        let mut values = serde_json::Deserializer::from_str(&input[start..]).into_iter::<Value>();
        match values.next() {
            Some(Ok(value)) => match cards_from_value(&value) {
                Ok(cards) => return Ok(cards),
                Err(e) => last_err = e,
            },
            Some(Err(e)) => {
                last_err = ServiceError::InvalidResponse(format!("malformed JSON: {e}"));
            }
            None => {}
        }
    }

    Err(last_err)
}

// ── Rule 4: Accept the shapes models actually produce ────────────────────────

fn cards_from_value(value: &Value) -> Result<Vec<GeneratedCard>, ServiceError> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(map) => match map.get("cards") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(ServiceError::InvalidResponse(
                    "JSON object has no \"cards\" array".into(),
                ))
            }
        },
        _ => {
            return Err(ServiceError::InvalidResponse(
                "JSON is neither an object nor an array".into(),
            ))
        }
    };

    items.iter().map(card_from_item).collect()
}

fn card_from_item(item: &Value) -> Result<GeneratedCard, ServiceError> {
    match item {
        Value::String(markup) => Ok(GeneratedCard::new(markup.as_str())),
        Value::Object(map) => {
            let markup = ["html", "markup", "content"]
                .iter()
                .find_map(|k| map.get(*k).and_then(Value::as_str))
                .ok_or_else(|| {
                    ServiceError::InvalidResponse("card entry has no \"html\" field".into())
                })?;
            let card = GeneratedCard::new(markup);
            Ok(match map.get("style").and_then(Value::as_str) {
                Some(style) if !style.trim().is_empty() => card.with_style(style.trim()),
                _ => card,
            })
        }
        other => Err(ServiceError::InvalidResponse(format!(
            "unexpected card entry: {other}"
        ))),
    }
}

// ── Rule 5: Scrub card markup ────────────────────────────────────────────────
//
// Cards are rendered by a real browser during export, so anything executable
// is dropped: `<script>` elements and inline `on*=` handlers.

static RE_SCRIPT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").unwrap());

/// An `on*=` attribute inside a start tag; group 1 is everything before it.
static RE_EVENT_HANDLER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)(<[a-z][^>]*?)\s+on[a-z]+\s*=\s*("[^"]*"|'[^']*'|[^\s>]+)"#).unwrap()
});

fn scrub_markup(markup: &str) -> String {
    let mut s = RE_SCRIPT.replace_all(markup, "").into_owned();
    // One handler per tag and pass; repeat until every tag is clean.
    loop {
        let next = RE_EVENT_HANDLER.replace_all(&s, "${1}");
        if next == s {
            break;
        }
        s = next.into_owned();
    }
    remove_invisible_chars(&s).trim().to_string()
}

// ── Rule 6: Strip invisible Unicode ──────────────────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_cards_object() {
        let raw = r#"{"cards":[{"style":"minimal","html":"<div>a</div>"},{"style":"dark","html":"<div>b</div>"}]}"#;
        let cards = parse_cards(raw).unwrap();
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].markup, "<div>a</div>");
        assert_eq!(cards[1].style.as_deref(), Some("dark"));
    }

    #[test]
    fn parses_fenced_json_with_prose() {
        let raw = "```json\nHere you go:\n{\"cards\": [\"<div>x</div>\"]}\n```";
        let cards = parse_cards(raw).unwrap();
        assert_eq!(cards, vec![GeneratedCard::new("<div>x</div>")]);
    }

    #[test]
    fn parses_bare_array() {
        let raw = r#"[{"markup":"<section>1</section>"},"<section>2</section>"]"#;
        let cards = parse_cards(raw).unwrap();
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].markup, "<section>1</section>");
    }

    #[test]
    fn bare_html_is_one_card() {
        let cards = parse_cards("<div class=\"card\">solo</div>\n").unwrap();
        assert_eq!(cards.len(), 1);
    }

    #[test]
    fn html_with_inline_css_is_not_mistaken_for_json() {
        let raw = "<style>.c{color:red}</style><div class=\"c\">x</div>";
        let cards = parse_cards(raw).unwrap();
        assert_eq!(cards.len(), 1);
        assert!(cards[0].markup.starts_with("<style>"));
    }

    #[test]
    fn empty_cards_list_is_not_an_error() {
        assert!(parse_cards(r#"{"cards": []}"#).unwrap().is_empty());
    }

    #[test]
    fn blank_cards_are_dropped() {
        let cards = parse_cards(r#"{"cards": ["  ", "<div>ok</div>"]}"#).unwrap();
        assert_eq!(cards.len(), 1);
    }

    #[test]
    fn prose_only_is_invalid() {
        let err = parse_cards("Sorry, I cannot help with that.").unwrap_err();
        assert!(matches!(err, ServiceError::InvalidResponse(_)));
    }

    #[test]
    fn object_without_cards_is_invalid() {
        assert!(parse_cards(r#"{"html": "<div></div>"}"#).is_err());
    }

    #[test]
    fn scripts_and_handlers_are_removed() {
        let raw = r#"{"cards":["<div onclick=\"steal()\">hi<script>alert(1)</script></div>"]}"#;
        let cards = parse_cards(raw).unwrap();
        assert_eq!(cards[0].markup, "<div>hi</div>");
    }

    #[test]
    fn every_handler_on_a_tag_is_removed() {
        let raw = r#"{"cards":["<img src='a.png' onerror='x()' onload=y() alt=\"a\"><b onmouseover=\"z\">t</b>"]}"#;
        let cards = parse_cards(raw).unwrap();
        assert_eq!(cards[0].markup, "<img src='a.png' alt=\"a\"><b>t</b>");
    }

    #[test]
    fn text_resembling_handlers_is_kept() {
        let raw = r#"{"cards":["<div><code>let one = 1;</code><p>Always on = true</p></div>"]}"#;
        let cards = parse_cards(raw).unwrap();
        assert_eq!(
            cards[0].markup,
            "<div><code>let one = 1;</code><p>Always on = true</p></div>"
        );
    }

    #[test]
    fn brackets_in_leading_prose_are_skipped() {
        let raw = "Here are the cards [minimal, dark]:\n{\"cards\":[\"<div>a</div>\",\"<div>b</div>\"]}";
        let cards = parse_cards(raw).unwrap();
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[1].markup, "<div>b</div>");
    }

    #[test]
    fn trailing_prose_after_json_is_ignored() {
        let raw = r#"{"cards":["<div>a</div>"]} Let me know if you want {more}."#;
        assert_eq!(parse_cards(raw).unwrap().len(), 1);
    }

    #[test]
    fn invisible_chars_are_removed() {
        let raw = "{\"cards\":[\"<p>a\u{200B}b</p>\"]}";
        assert_eq!(parse_cards(raw).unwrap()[0].markup, "<p>ab</p>");
    }
}
