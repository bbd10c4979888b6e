//! Rule-based primary category assignment.

pub const DEFAULT_CATEGORY: &str = "Machine Learning";
pub const TRENDING_CATEGORY: &str = "Trending Research";

/// arXiv subject tags the fetcher queries, with the label each maps to. The
/// first tag on an entry that appears here wins.
pub const CATEGORY_LABELS: [(&str, &str); 6] = [
    ("cs.CV", "Computer Vision"),
    ("cs.CL", "Natural Language Processing"),
    ("cs.LG", "Machine Learning"),
    ("cs.AI", "Artificial Intelligence"),
    ("cs.NE", "Neural Computing"),
    ("stat.ML", "Statistical ML"),
];

// Checked in this order; the first group with a hit decides.
const KEYWORD_RULES: [(&str, &[&str]); 4] = [
    ("Computer Vision", &["vision", "image", "visual", "cnn", "object detection"]),
    ("Natural Language Processing", &["nlp", "language", "text", "bert", "transformer"]),
    ("Reinforcement Learning", &["reinforcement", "rl", "agent", "policy"]),
    ("Deep Learning", &["neural", "deep", "network", "cnn", "rnn"]),
];

pub fn label_for_tag(tag: &str) -> Option<&'static str> {
    CATEGORY_LABELS
        .iter()
        .find(|(t, _)| *t == tag)
        .map(|(_, label)| *label)
}

/// Pick one category for a paper. Pure: same input, same answer.
pub fn classify(categories: &[String], title: &str, abstract_text: &str) -> String {
    if let Some(label) = categories.iter().find_map(|c| label_for_tag(c.trim())) {
        return label.to_string();
    }

    let text = format!("{} {}", title, abstract_text).to_lowercase();
    let words = tokenize(&text);
    for (label, keywords) in KEYWORD_RULES {
        if keywords.iter().any(|k| keyword_hit(&text, &words, k)) {
            return label.to_string();
        }
    }

    DEFAULT_CATEGORY.to_string()
}

fn tokenize(text: &str) -> Vec<&str> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect()
}

// Keywords match anywhere in the text ("subnetworks" hits "network"). Short
// ones ("rl", "cnn") must start a word, so "rlhf" hits but "world" does not.
fn keyword_hit(text: &str, words: &[&str], keyword: &str) -> bool {
    if keyword.len() <= 3 {
        words.iter().any(|w| w.starts_with(keyword))
    } else {
        text.contains(keyword)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_tag_mapping_takes_precedence() {
        let label = classify(&tags(&["math.OC", "cs.CL", "cs.CV"]), "Image segmentation", "");
        assert_eq!(label, "Natural Language Processing");
    }

    #[test]
    fn test_keyword_precedence_order() {
        // Both vision and language terms present: vision wins.
        assert_eq!(classify(&[], "Visual question answering with language", ""), "Computer Vision");
        assert_eq!(classify(&[], "Pretraining BERT variants", ""), "Natural Language Processing");
        assert_eq!(classify(&[], "Offline RL for robotics", "a learned policy"), "Reinforcement Learning");
        assert_eq!(classify(&[], "Deep equilibrium models", ""), "Deep Learning");
        assert_eq!(classify(&[], "Gradient boosting revisited", "tabular benchmarks"), DEFAULT_CATEGORY);
    }

    #[test]
    fn test_short_keywords_need_whole_words() {
        assert_eq!(classify(&[], "A world model survey", "curl and url handling"), DEFAULT_CATEGORY);
    }

    #[test]
    fn test_keywords_match_inside_words() {
        assert_eq!(classify(&[], "Scaling RLHF with reward models", "We align chat models."), "Reinforcement Learning");
        assert_eq!(classify(&[], "Pruning subnetworks", "Lottery tickets at scale."), "Deep Learning");
        assert_eq!(classify(&[], "Multi-agent coordination", ""), "Reinforcement Learning");
    }

    #[test]
    fn test_multi_word_keyword() {
        assert_eq!(classify(&[], "Fast Object Detection at scale", ""), "Computer Vision");
    }

    #[test]
    fn test_classify_is_deterministic() {
        let cats = tags(&["q-bio.NC"]);
        let first = classify(&cats, "Spiking neural dynamics", "We model cortex.");
        for _ in 0..10 {
            assert_eq!(classify(&cats, "Spiking neural dynamics", "We model cortex."), first);
        }
    }
}
