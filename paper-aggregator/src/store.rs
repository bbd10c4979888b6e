use crate::types::{DifficultyLevel, PaperRecord, PaperSource, Persist, PipelineError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

/// Read-only filter over stored papers. The same filter runs as SQL in
/// [`PaperStore::search`] and in memory through [`PaperQuery::matches`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperQuery {
    pub category: Option<String>,
    /// Case-insensitive substring of the title or technical summary.
    pub search: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub limit: usize,
}

impl Default for PaperQuery {
    fn default() -> Self {
        Self {
            category: None,
            search: None,
            since: None,
            until: None,
            limit: 20,
        }
    }
}

impl PaperQuery {
    /// `since`/`until` are compared against the time the paper was fetched.
    pub fn matches(&self, paper: &PaperRecord) -> bool {
        if let Some(category) = self.category.as_deref() {
            if paper.primary_category != category {
                return false;
            }
        }
        if let Some(needle) = self.search.as_deref().map(str::to_lowercase).filter(|n| !n.is_empty()) {
            let in_title = paper.title.to_lowercase().contains(&needle);
            let in_summary = paper
                .technical_summary
                .as_deref()
                .is_some_and(|s| s.to_lowercase().contains(&needle));
            if !in_title && !in_summary {
                return false;
            }
        }
        if self.since.is_some_and(|since| paper.fetched_at < since) {
            return false;
        }
        if self.until.is_some_and(|until| paper.fetched_at > until) {
            return false;
        }
        true
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperStats {
    pub total_papers: i64,
    pub categories: i64,
    pub added_today: i64,
    pub average_summary_length: f64,
}

/// A stored paper with the row metadata the store adds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredPaper {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub paper: PaperRecord,
}

/// Postgres-backed `research_papers` table.
pub struct PaperStore {
    db: PgPool,
}

impl PaperStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let db = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(30))
            .connect(database_url)
            .await?;
        Ok(Self { db })
    }

    /// Apply the embedded schema migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.db).await?;
        info!("Database schema is up to date");
        Ok(())
    }

    pub async fn exists(&self, paper_url: &str) -> Result<bool> {
        let found: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM research_papers WHERE paper_url = $1)")
            .bind(paper_url)
            .fetch_one(&self.db)
            .await?;
        Ok(found)
    }

    /// Insert every paper in one transaction. Papers whose `paper_url` is
    /// already stored are skipped; any other failure rolls the batch back.
    pub async fn insert_batch(&self, papers: &[PaperRecord]) -> Result<usize> {
        if papers.is_empty() {
            return Ok(0);
        }

        let mut tx = self.db.begin().await?;
        let mut inserted = 0;

        for paper in papers {
            let result = sqlx::query(
                r#"
                INSERT INTO research_papers (
                    id, title, abstract, authors, source, paper_url, pdf_url, arxiv_id,
                    published_at, categories, category, technical_summary, key_contributions,
                    methodology, significance, practical_applications, limitations,
                    difficulty_level, keywords, fetched_at, created_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21)
                ON CONFLICT (paper_url) DO NOTHING
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(&paper.title)
            .bind(&paper.abstract_text)
            .bind(Json(&paper.authors))
            .bind(paper.source.as_str())
            .bind(&paper.paper_url)
            .bind(&paper.pdf_url)
            .bind(&paper.arxiv_id)
            .bind(paper.published)
            .bind(Json(&paper.categories))
            .bind(&paper.primary_category)
            .bind(paper.technical_summary.as_deref().unwrap_or_default())
            .bind(paper.key_contributions.as_ref().map(Json))
            .bind(&paper.methodology)
            .bind(&paper.significance)
            .bind(&paper.practical_applications)
            .bind(&paper.limitations)
            .bind(paper.difficulty_level.map(|d| d.as_str()))
            .bind(paper.keywords.as_ref().map(Json))
            .bind(paper.fetched_at)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() > 0 {
                inserted += 1;
            } else {
                debug!(paper_url = %paper.paper_url, "Paper already stored");
            }
        }

        tx.commit().await?;
        info!("Stored {} new papers out of {} submitted", inserted, papers.len());
        Ok(inserted)
    }

    /// Newest first.
    pub async fn recent(&self, limit: usize) -> Result<Vec<StoredPaper>> {
        self.search(&PaperQuery { limit, ..PaperQuery::default() }).await
    }

    pub async fn search(&self, query: &PaperQuery) -> Result<Vec<StoredPaper>> {
        let mut sql = QueryBuilder::<Postgres>::new("SELECT * FROM research_papers WHERE TRUE");

        if let Some(category) = &query.category {
            sql.push(" AND category = ").push_bind(category.clone());
        }
        if let Some(search) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
            let pattern = format!("%{}%", escape_like(search.trim()));
            sql.push(" AND (title ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR technical_summary ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        if let Some(since) = query.since {
            sql.push(" AND created_at >= ").push_bind(since);
        }
        if let Some(until) = query.until {
            sql.push(" AND created_at <= ").push_bind(until);
        }
        sql.push(" ORDER BY created_at DESC LIMIT ").push_bind(query.limit as i64);

        let rows = sql.build().fetch_all(&self.db).await?;
        rows.iter().map(row_to_paper).collect()
    }

    pub async fn stats(&self) -> Result<PaperStats> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS total_papers,
                COUNT(DISTINCT category) AS categories,
                COUNT(*) FILTER (WHERE created_at >= date_trunc('day', NOW())) AS added_today,
                COALESCE(AVG(LENGTH(technical_summary)), 0)::float8 AS average_summary_length
            FROM research_papers
            "#,
        )
        .fetch_one(&self.db)
        .await?;

        Ok(PaperStats {
            total_papers: row.try_get("total_papers")?,
            categories: row.try_get("categories")?,
            added_today: row.try_get("added_today")?,
            average_summary_length: row.try_get("average_summary_length")?,
        })
    }
}

fn escape_like(text: &str) -> String {
    text.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

fn row_to_paper(row: &PgRow) -> Result<StoredPaper> {
    let source: String = row.try_get("source")?;
    let source = PaperSource::from_label(&source)
        .ok_or_else(|| PipelineError::Parse(format!("unknown paper source {:?}", source)))?;

    let difficulty: Option<String> = row.try_get("difficulty_level")?;

    let paper = PaperRecord {
        title: row.try_get("title")?,
        abstract_text: row.try_get("abstract")?,
        authors: row.try_get::<Json<Vec<String>>, _>("authors")?.0,
        source,
        arxiv_id: row.try_get("arxiv_id")?,
        paper_url: row.try_get("paper_url")?,
        pdf_url: row.try_get("pdf_url")?,
        published: row.try_get("published_at")?,
        categories: row.try_get::<Json<Vec<String>>, _>("categories")?.0,
        primary_category: row.try_get("category")?,
        fetched_at: row.try_get("fetched_at")?,
        technical_summary: row.try_get("technical_summary")?,
        key_contributions: row.try_get::<Option<Json<Vec<String>>>, _>("key_contributions")?.map(|j| j.0),
        methodology: row.try_get("methodology")?,
        significance: row.try_get("significance")?,
        practical_applications: row.try_get("practical_applications")?,
        limitations: row.try_get("limitations")?,
        difficulty_level: difficulty.as_deref().and_then(DifficultyLevel::from_label),
        keywords: row.try_get::<Option<Json<Vec<String>>>, _>("keywords")?.map(|j| j.0),
    };

    Ok(StoredPaper {
        id: row.try_get("id")?,
        created_at: row.try_get("created_at")?,
        paper,
    })
}

impl Persist for PaperStore {
    async fn exists(&self, paper_url: &str) -> anyhow::Result<bool> {
        Ok(PaperStore::exists(self, paper_url).await?)
    }

    async fn store(&self, papers: &[PaperRecord]) -> anyhow::Result<usize> {
        Ok(self.insert_batch(papers).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    fn paper(title: &str, category: &str, summary: Option<&str>) -> PaperRecord {
        let mut paper = PaperRecord::new(title, "abstract", PaperSource::Arxiv, "https://arxiv.org/abs/1");
        paper.primary_category = category.to_string();
        paper.technical_summary = summary.map(str::to_string);
        paper
    }

    #[test]
    fn test_query_matches_category_and_text() {
        let query = PaperQuery {
            category: Some("Computer Vision".to_string()),
            search: Some("DIFFUSION".to_string()),
            ..PaperQuery::default()
        };

        assert!(query.matches(&paper("Latent diffusion for images", "Computer Vision", None)));
        assert!(query.matches(&paper("Image synthesis", "Computer Vision", Some("A diffusion model."))));
        assert!(!query.matches(&paper("Image synthesis", "Computer Vision", Some("A GAN."))));
        assert!(!query.matches(&paper("Latent diffusion", "Deep Learning", None)));
    }

    #[test]
    fn test_query_date_range() {
        let record = paper("Title", "Machine Learning", None);
        let before = record.fetched_at - ChronoDuration::hours(1);
        let after = record.fetched_at + ChronoDuration::hours(1);

        assert!(PaperQuery { since: Some(before), until: Some(after), ..PaperQuery::default() }.matches(&record));
        assert!(!PaperQuery { since: Some(after), ..PaperQuery::default() }.matches(&record));
        assert!(!PaperQuery { until: Some(before), ..PaperQuery::default() }.matches(&record));
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("100%_done\\"), "100\\%\\_done\\\\");
    }
}
