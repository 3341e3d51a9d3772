//! Question extraction from application-form markup.
//!
//! The document is parsed with `scraper` (html5ever's error-recovering tree
//! builder), so unclosed or truncated markup still yields a tree. Noise
//! subtrees (scripts, styles, navigation, hidden elements) are ignored, then
//! the remaining elements are walked in document order:
//!
//! ```text
//! <label>          → question, unless it labels a choice/non-text control
//! <legend>         → question, when its fieldset holds radio/checkbox inputs
//! unlabeled control → question from aria-label, else placeholder
//! ```
//!
//! Duplicates are kept; the caller decides what an empty result means.

use std::collections::{HashMap, HashSet};

use scraper::{ElementRef, Html};
use serde::Serialize;

/// Elements whose whole subtree never contributes questions.
const NOISE_TAGS: &[&str] = &[
    "script", "style", "noscript", "template", "head", "nav", "footer", "svg", "iframe",
];

/// Descendants of a label whose text is not part of the label itself.
const SKIP_TEXT_TAGS: &[&str] = &["option", "select", "textarea", "script", "style"];

/// `input` types that are not answered with free text.
const NON_TEXT_INPUT_TYPES: &[&str] = &[
    "radio", "checkbox", "hidden", "submit", "button", "reset", "image", "file", "password",
    "range", "color",
];

/// One extracted question and its document-order position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Question {
    pub index: usize,
    pub text: String,
}

/// Extract the ordered questions of `html`. Never fails: markup that cannot
/// be made sense of produces fewer (possibly zero) questions.
pub fn extract_questions(html: &str) -> Vec<Question> {
    let document = Html::parse_document(html);
    let root = document.root_element();

    // Ids resolve across the whole document so a visible label can see
    // that its control is hidden.
    let mut by_id: HashMap<&str, ElementRef<'_>> = HashMap::new();
    for el in root.descendants().filter_map(ElementRef::wrap) {
        if let Some(id) = el.value().attr("id") {
            by_id.entry(id).or_insert(el);
        }
    }

    let elements: Vec<ElementRef<'_>> = root
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|el| !is_suppressed(el))
        .collect();

    let mut label_targets: HashSet<&str> = HashSet::new();
    for el in &elements {
        if el.value().name() == "label" {
            if let Some(target) = el.value().attr("for") {
                label_targets.insert(target);
            }
        }
    }

    let mut texts = Vec::new();
    for el in &elements {
        let candidate = match el.value().name() {
            "label" => {
                let control = el
                    .value()
                    .attr("for")
                    .and_then(|id| by_id.get(id).copied())
                    .or_else(|| first_control(el));
                match control {
                    Some(c) if is_suppressed(&c) => None,
                    Some(c) if is_control(&c) && !is_text_control(&c) => None,
                    _ => Some(element_text(el)),
                }
            }
            "legend" => el
                .parent()
                .and_then(ElementRef::wrap)
                .filter(|p| p.value().name() == "fieldset" && holds_choice_controls(p))
                .map(|_| element_text(el)),
            _ if is_text_control(el) && !is_labeled(el, &label_targets) => el
                .value()
                .attr("aria-label")
                .filter(|s| !s.trim().is_empty())
                .or_else(|| el.value().attr("placeholder"))
                .map(normalize),
            _ => None,
        };

        if let Some(text) = candidate.filter(|t| !t.is_empty()) {
            texts.push(text);
        }
    }

    texts
        .into_iter()
        .enumerate()
        .map(|(index, text)| Question { index, text })
        .collect()
}

fn is_noise(el: &ElementRef<'_>) -> bool {
    let v = el.value();
    NOISE_TAGS.contains(&v.name())
        || v.attr("hidden").is_some()
        || v.attr("aria-hidden").is_some_and(|a| a.eq_ignore_ascii_case("true"))
}

fn is_suppressed(el: &ElementRef<'_>) -> bool {
    is_noise(el) || el.ancestors().filter_map(ElementRef::wrap).any(|a| is_noise(&a))
}

fn is_control(el: &ElementRef<'_>) -> bool {
    matches!(el.value().name(), "input" | "textarea" | "select")
}

fn input_type<'a>(el: &ElementRef<'a>) -> &'a str {
    el.value().attr("type").unwrap_or("text")
}

fn is_text_control(el: &ElementRef<'_>) -> bool {
    match el.value().name() {
        "textarea" | "select" => true,
        "input" => {
            let ty = input_type(el).to_ascii_lowercase();
            !NON_TEXT_INPUT_TYPES.contains(&ty.as_str())
        }
        _ => false,
    }
}

fn is_choice_control(el: &ElementRef<'_>) -> bool {
    el.value().name() == "input"
        && matches!(input_type(el).to_ascii_lowercase().as_str(), "radio" | "checkbox")
}

fn first_control<'a>(el: &ElementRef<'a>) -> Option<ElementRef<'a>> {
    el.descendants()
        .skip(1)
        .filter_map(ElementRef::wrap)
        .find(is_control)
}

fn holds_choice_controls(fieldset: &ElementRef<'_>) -> bool {
    fieldset
        .descendants()
        .filter_map(ElementRef::wrap)
        .any(|e| is_choice_control(&e))
}

fn is_labeled(el: &ElementRef<'_>, label_targets: &HashSet<&str>) -> bool {
    el.value().attr("id").is_some_and(|id| label_targets.contains(id))
        || el.value().attr("aria-labelledby").is_some()
        || el
            .ancestors()
            .filter_map(ElementRef::wrap)
            .any(|a| a.value().name() == "label")
}

fn element_text(el: &ElementRef<'_>) -> String {
    let mut raw = String::new();
    collect_text(*el, &mut raw);
    normalize(&raw)
}

fn collect_text(el: ElementRef<'_>, out: &mut String) {
    for child in el.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
        } else if let Some(child_el) = ElementRef::wrap(child) {
            let name = child_el.value().name();
            if name == "br" {
                out.push(' ');
            } else if !SKIP_TEXT_TAGS.contains(&name) {
                collect_text(child_el, out);
            }
        }
    }
}

/// Collapse whitespace and drop a trailing required-field marker.
fn normalize(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.trim_end_matches('*').trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(html: &str) -> Vec<String> {
        extract_questions(html).into_iter().map(|q| q.text).collect()
    }

    #[test]
    fn labeled_inputs_in_document_order() {
        let html = r#"
            <form>
              <label for="name">Name?</label><input id="name" type="text">
              <label for="why">Why this company?</label><textarea id="why"></textarea>
              <label for="str">Strengths?</label><input id="str">
            </form>"#;
        let qs = extract_questions(html);
        assert_eq!(qs.len(), 3);
        assert_eq!(qs[0], Question { index: 0, text: "Name?".into() });
        assert_eq!(qs[1].text, "Why this company?");
        assert_eq!(qs[2], Question { index: 2, text: "Strengths?".into() });
    }

    #[test]
    fn noise_subtrees_are_ignored() {
        let html = r#"
            <head><title>Apply</title><style>label { color: red }</style></head>
            <nav><label for="search">Search the site</label><input id="search"></nav>
            <script>document.write("<label>Injected?</label>")</script>
            <div hidden><label>Hidden?</label><input></div>
            <div aria-hidden="true"><label>Also hidden?</label><input></div>
            <form><label>Visible? <input></label></form>
            <footer><label>Newsletter email</label><input></footer>"#;
        assert_eq!(texts(html), vec!["Visible?"]);
    }

    #[test]
    fn label_for_hidden_control_is_skipped() {
        let html = r#"
            <label for="x">Secret?</label><div hidden><input id="x"></div>
            <label for="y">Also secret?</label><span aria-hidden="true"><textarea id="y"></textarea></span>
            <label for="z">Shown?</label><input id="z">"#;
        assert_eq!(texts(html), vec!["Shown?"]);
    }

    #[test]
    fn nested_control_label_excludes_option_text() {
        let html = r#"
            <label>Preferred start
              <select><option>January</option><option>March</option></select>
            </label>"#;
        assert_eq!(texts(html), vec!["Preferred start"]);
    }

    #[test]
    fn choice_labels_are_options_and_legend_is_the_question() {
        let html = r#"
            <fieldset>
              <legend>Are you willing to relocate?</legend>
              <input type="radio" id="y" name="r"><label for="y">Yes</label>
              <input type="radio" id="n" name="r"><label for="n">No</label>
            </fieldset>
            <fieldset>
              <legend>Contact details</legend>
              <label for="mail">Email</label><input id="mail" type="email">
            </fieldset>
            <label><input type="checkbox"> I agree to the terms</label>"#;
        assert_eq!(texts(html), vec!["Are you willing to relocate?", "Email"]);
    }

    #[test]
    fn unlabeled_controls_fall_back_to_aria_label_then_placeholder() {
        let html = r#"
            <input aria-label="LinkedIn profile URL">
            <textarea placeholder="Tell us about a project you are proud of"></textarea>
            <input type="hidden" name="csrf" placeholder="never">
            <input type="submit" aria-label="Send">
            <input id="x" placeholder="ignored because labeled"><label for="x">Portfolio</label>"#;
        assert_eq!(
            texts(html),
            vec![
                "LinkedIn profile URL",
                "Tell us about a project you are proud of",
                "Portfolio",
            ]
        );
    }

    #[test]
    fn duplicates_are_preserved() {
        let html = "<label>Why?</label><input><label>Why?</label><input>";
        let qs = extract_questions(html);
        assert_eq!(qs.len(), 2);
        assert_eq!(qs[0].text, qs[1].text);
        assert_eq!(qs[1].index, 1);
    }

    #[test]
    fn whitespace_and_required_marker_are_normalised() {
        let html = "<label>\n   Expected\n salary <span class=req>*</span>\n</label><input>";
        assert_eq!(texts(html), vec!["Expected salary"]);
    }

    #[test]
    fn malformed_markup_is_best_effort() {
        let html = r#"<div><label for="q1">Name?</label><input id="q1"><p><label for="q2">Strengths?"#;
        assert_eq!(texts(html), vec!["Name?", "Strengths?"]);
    }

    #[test]
    fn garbage_input_yields_nothing() {
        assert!(extract_questions("").is_empty());
        assert!(extract_questions("<<<>>></label></input>&&&;").is_empty());
        assert!(extract_questions("<p>No form here, just prose.</p>").is_empty());
    }

    #[test]
    fn file_inputs_are_not_questions() {
        let html = r#"<label for="cv">Resume</label><input id="cv" type="file">"#;
        assert!(extract_questions(html).is_empty());
    }
}
