//! Text helpers shared by the source adapters and the normalizer.

const BLOCK_TAGS: [&str; 17] = [
    "p", "br", "div", "li", "ul", "ol", "tr", "td", "th", "blockquote", "section", "h1", "h2", "h3", "h4",
    "h5", "h6",
];

/// Strip markup from feed descriptions. HuggingFace entries sometimes carry
/// `<p>` wrapped abstracts. Only block-level tags separate words, so
/// `<b>things</b>.` stays "things.".
pub fn extract_text_from_html(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut tag = String::new();
    let mut in_tag = false;

    for c in html.chars() {
        match c {
            '<' if !in_tag => in_tag = true,
            '>' if in_tag => {
                if is_block_tag(&tag) {
                    text.push(' ');
                }
                tag.clear();
                in_tag = false;
            }
            _ if in_tag => tag.push(c),
            _ => text.push(c),
        }
    }

    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_block_tag(tag: &str) -> bool {
    let name: String = tag
        .trim_start_matches('/')
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase();
    BLOCK_TAGS.contains(&name.as_str())
}

/// Cut `text` to at most `max_chars` characters, appending `...` when anything
/// was removed. Counts characters, not bytes.
pub fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => format!("{}...", &text[..byte_index]),
        None => text.to_string(),
    }
}

const NAME_SUFFIXES: [&str; 6] = ["jr", "jr.", "sr", "sr.", "ii", "iii"];

/// Split a single "A, B and C" style author string into names. Lists that
/// already hold one name per entry pass through trimmed, repeats included.
/// "Lovelace, Ada" and "Martin Luther King, Jr." stay one name.
pub fn split_author_list(authors: &[String]) -> Vec<String> {
    let names: Vec<String> = authors
        .iter()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect();

    if let [single] = names.as_slice() {
        if looks_joined(single) {
            return split_joined(single);
        }
    }
    names
}

fn looks_joined(entry: &str) -> bool {
    if entry.contains(';') || entry.contains(" and ") {
        return true;
    }
    let parts: Vec<&str> = entry.split(',').map(str::trim).collect();
    match parts.len() {
        1 => false,
        // "Lovelace, Ada" or "King, Jr." is one person.
        2 => parts.iter().all(|p| p.split_whitespace().count() > 1) && !is_suffix(parts[1]),
        _ => true,
    }
}

fn split_joined(entry: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for part in entry.split([',', ';']).flat_map(|part| part.split(" and ")) {
        let name = part.trim().trim_start_matches("and ").trim();
        if name.is_empty() {
            continue;
        }
        if is_suffix(name) {
            if let Some(previous) = names.last_mut() {
                previous.push_str(", ");
                previous.push_str(name);
                continue;
            }
        }
        names.push(name.to_string());
    }
    names
}

fn is_suffix(part: &str) -> bool {
    NAME_SUFFIXES.contains(&part.trim().to_lowercase().as_str())
}

/// Trim, drop empties and repeated entries (case-insensitive), keep order.
pub fn dedup_preserving_order(items: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    items
        .iter()
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .filter(|item| seen.insert(item.to_lowercase()))
        .map(str::to_string)
        .collect()
}
