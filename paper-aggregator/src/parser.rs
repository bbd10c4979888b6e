use crate::types::{ParsedEntry, ParsedFeed, PipelineError, Result};
use chrono::Utc;
use feed_rs::parser;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Parses Atom (arXiv API) and RSS (HuggingFace trending) documents into a
/// source-neutral entry list.
#[derive(Debug, Default)]
pub struct FeedParser;

impl FeedParser {
    pub fn new() -> Self {
        Self
    }

    /// A document that does not parse at all is an error. Individual entries
    /// that are malformed are skipped and counted in `ParsedFeed::skipped`.
    pub fn parse_feed(&self, content: &str) -> Result<ParsedFeed> {
        debug!("Parsing feed content ({} bytes)", content.len());

        let feed = parser::parse(content.as_bytes())
            .map_err(|e| PipelineError::Parse(format!("Failed to parse feed: {}", e)))?;

        let mut seen_ids = HashSet::new();
        let mut entries = Vec::new();
        let mut skipped = 0;

        for entry in feed.entries {
            match Self::parse_entry(entry) {
                Ok(parsed) => {
                    if !seen_ids.insert(parsed.id.clone()) {
                        debug!(id = %parsed.id, "Skipping repeated entry");
                        continue;
                    }
                    entries.push(parsed);
                }
                Err(e) => {
                    warn!(error = %e, "Skipping malformed feed entry");
                    skipped += 1;
                }
            }
        }

        info!(entries = entries.len(), skipped, "Parsed feed");

        Ok(ParsedFeed { entries, skipped })
    }

    fn parse_entry(entry: feed_rs::model::Entry) -> Result<ParsedEntry> {
        let title = entry
            .title
            .map(|t| collapse_whitespace(&t.content))
            .filter(|t| !t.is_empty())
            .ok_or_else(|| PipelineError::Parse(format!("entry {} has no title", entry.id)))?;

        let summary = entry
            .summary
            .map(|s| collapse_whitespace(&s.content))
            .unwrap_or_default();

        let link = entry
            .links
            .iter()
            .find(|l| l.rel.as_deref().map_or(true, |rel| rel == "alternate"))
            .or_else(|| entry.links.first())
            .map(|l| l.href.clone());

        let pdf_link = entry
            .links
            .iter()
            .find(|l| l.media_type.as_deref() == Some("application/pdf") || l.title.as_deref() == Some("pdf"))
            .map(|l| l.href.clone());

        let authors = entry
            .authors
            .into_iter()
            .map(|a| collapse_whitespace(&a.name))
            .filter(|name| !name.is_empty())
            .collect();

        let published_at = entry.published.or(entry.updated).map(|dt| dt.with_timezone(&Utc));

        let categories = entry.categories.into_iter().map(|c| c.term).collect();

        Ok(ParsedEntry {
            id: entry.id,
            title,
            summary,
            link,
            pdf_link,
            authors,
            published_at,
            categories,
        })
    }
}

/// Feed text arrives hard-wrapped; fold every whitespace run into one space.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const ATOM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>ArXiv Query</title>
  <id>http://arxiv.org/api/query</id>
  <updated>2024-05-01T00:00:00Z</updated>
  <entry>
    <id>http://arxiv.org/abs/2405.00001v1</id>
    <updated>2024-05-01T00:00:00Z</updated>
    <published>2024-05-01T00:00:00Z</published>
    <title>Sparse
      Mixture Models</title>
    <summary>  We study sparse
      mixtures.  </summary>
    <author><name>Ada Lovelace</name></author>
    <author><name>Alan Turing</name></author>
    <link href="http://arxiv.org/abs/2405.00001v1" rel="alternate" type="text/html"/>
    <link title="pdf" href="http://arxiv.org/pdf/2405.00001v1" rel="related" type="application/pdf"/>
    <category term="cs.LG" scheme="http://arxiv.org/schemas/atom"/>
    <category term="stat.ML" scheme="http://arxiv.org/schemas/atom"/>
  </entry>
  <entry>
    <id>http://arxiv.org/abs/2405.00002v1</id>
    <updated>2024-05-01T00:00:00Z</updated>
    <summary>An entry without a title.</summary>
  </entry>
</feed>"#;

    #[test]
    fn test_parse_atom_entry_fields() {
        let parsed = FeedParser::new().parse_feed(ATOM).unwrap();
        assert_eq!(parsed.entries.len(), 1);
        assert_eq!(parsed.skipped, 1);

        let entry = &parsed.entries[0];
        assert_eq!(entry.title, "Sparse Mixture Models");
        assert_eq!(entry.summary, "We study sparse mixtures.");
        assert_eq!(entry.authors, vec!["Ada Lovelace", "Alan Turing"]);
        assert_eq!(entry.categories, vec!["cs.LG", "stat.ML"]);
        assert_eq!(entry.link.as_deref(), Some("http://arxiv.org/abs/2405.00001v1"));
        assert_eq!(entry.pdf_link.as_deref(), Some("http://arxiv.org/pdf/2405.00001v1"));
        assert!(entry.published_at.is_some());
    }

    #[test]
    fn test_garbage_is_a_parse_error() {
        let result = FeedParser::new().parse_feed("<html><body>rate limited</body></html>");
        assert!(matches!(result, Err(PipelineError::Parse(_))));
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  a\n  b\t c "), "a b c");
        assert_eq!(collapse_whitespace(""), "");
    }
}
