use lazy_static::lazy_static;
use scraper::{Html, Node, Selector};

lazy_static! {
    static ref BODY: Selector = Selector::parse("body").expect("valid selector");
}

fn is_hidden(name: &str) -> bool {
    matches!(name, "script" | "style")
}

/// Visible text of the `<body>`, one chunk per line. Script and style
/// contents are dropped; lines are trimmed and split on double spaces.
pub fn extract_text(html: &str) -> Option<String> {
    let doc = Html::parse_document(html);
    let body = doc.select(&BODY).next()?;

    let mut raw = String::new();
    for node in body.descendants() {
        let Node::Text(text) = node.value() else { continue };
        let hidden = node
            .ancestors()
            .any(|a| matches!(a.value(), Node::Element(e) if is_hidden(e.name())));
        if !hidden {
            raw.push_str(text);
        }
    }

    let chunks: Vec<&str> = raw
        .lines()
        .map(str::trim)
        .flat_map(|line| line.split("  "))
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .collect();
    Some(chunks.join("\n"))
}
