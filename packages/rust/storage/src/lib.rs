//! libSQL storage layer for generated ideas.
//!
//! The [`Storage`] struct wraps a local libSQL database holding one row per
//! persisted research package. The pipeline talks to it through the
//! [`IdeaStore`] trait so tests and alternative backends can stand in.

mod migrations;

use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use deepcut_shared::{DeepCutError, Idea, IdeaId, ResearchPackage, Result};
use libsql::{Connection, Database, params};

/// Persistence collaborator for research packages.
#[async_trait]
pub trait IdeaStore: Send + Sync {
    /// Persist a finished package. Fails if `id` already exists.
    async fn save_idea(
        &self,
        id: &IdeaId,
        topic: &str,
        style: Option<&str>,
        package: &ResearchPackage,
        automated: bool,
    ) -> Result<()>;

    /// Fetch one idea, or `None` if no row has this id.
    async fn get_idea_by_id(&self, id: &IdeaId) -> Result<Option<Idea>>;

    /// List ideas newest first, optionally filtered by a topic substring.
    async fn get_all_ideas(&self, search: Option<&str>) -> Result<Vec<Idea>>;

    /// Delete one idea. Returns whether a row was removed.
    async fn delete_idea(&self, id: &IdeaId) -> Result<bool>;
}

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
}

impl Storage {
    /// Open or create a database at `path` and apply pending migrations.
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| DeepCutError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DeepCutError::Persistence(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| DeepCutError::Persistence(e.to_string()))?;

        let storage = Self { db, conn };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn.execute_batch(migration.sql).await.map_err(|e| {
                    DeepCutError::Persistence(format!(
                        "migration v{} failed: {e}",
                        migration.version
                    ))
                })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }
}

#[async_trait]
impl IdeaStore for Storage {
    #[tracing::instrument(skip(self, package), fields(%id))]
    async fn save_idea(
        &self,
        id: &IdeaId,
        topic: &str,
        style: Option<&str>,
        package: &ResearchPackage,
        automated: bool,
    ) -> Result<()> {
        let research_json = serde_json::to_string(package)
            .map_err(|e| DeepCutError::Persistence(format!("serialize package: {e}")))?;
        let now = Utc::now().to_rfc3339();

        self.conn
            .execute(
                "INSERT INTO ideas (id, topic, style, research_data, created_via_automation, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    id.to_string(),
                    topic,
                    style,
                    research_json,
                    i64::from(automated),
                    now.as_str()
                ],
            )
            .await
            .map_err(|e| DeepCutError::Persistence(e.to_string()))?;

        tracing::debug!("idea saved");
        Ok(())
    }

    async fn get_idea_by_id(&self, id: &IdeaId) -> Result<Option<Idea>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, topic, style, research_data, created_via_automation, created_at
                 FROM ideas WHERE id = ?1",
                params![id.to_string()],
            )
            .await
            .map_err(|e| DeepCutError::Persistence(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_idea(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(DeepCutError::Persistence(e.to_string())),
        }
    }

    async fn get_all_ideas(&self, search: Option<&str>) -> Result<Vec<Idea>> {
        let search = search.map(str::trim).filter(|s| !s.is_empty());

        let mut rows = match search {
            Some(term) => {
                let pattern = format!("%{}%", escape_like(term));
                self.conn
                    .query(
                        "SELECT id, topic, style, research_data, created_via_automation, created_at
                         FROM ideas WHERE topic LIKE ?1 ESCAPE '\\'
                         ORDER BY created_at DESC, id DESC",
                        params![pattern],
                    )
                    .await
            }
            None => {
                self.conn
                    .query(
                        "SELECT id, topic, style, research_data, created_via_automation, created_at
                         FROM ideas ORDER BY created_at DESC, id DESC",
                        params![],
                    )
                    .await
            }
        }
        .map_err(|e| DeepCutError::Persistence(e.to_string()))?;

        let mut results = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DeepCutError::Persistence(e.to_string()))?
        {
            results.push(row_to_idea(&row)?);
        }
        Ok(results)
    }

    async fn delete_idea(&self, id: &IdeaId) -> Result<bool> {
        let affected = self
            .conn
            .execute("DELETE FROM ideas WHERE id = ?1", params![id.to_string()])
            .await
            .map_err(|e| DeepCutError::Persistence(e.to_string()))?;
        Ok(affected > 0)
    }
}

/// Escape `%`, `_` and the escape character itself for a `LIKE ... ESCAPE '\'` pattern.
fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Convert a database row to an [`Idea`].
fn row_to_idea(row: &libsql::Row) -> Result<Idea> {
    let id: String = row
        .get(0)
        .map_err(|e| DeepCutError::Persistence(e.to_string()))?;
    let research_json: String = row
        .get(3)
        .map_err(|e| DeepCutError::Persistence(e.to_string()))?;
    let created_at: String = row
        .get(5)
        .map_err(|e| DeepCutError::Persistence(e.to_string()))?;

    Ok(Idea {
        id: id
            .parse()
            .map_err(|e| DeepCutError::Persistence(format!("invalid idea id {id}: {e}")))?,
        topic: row
            .get::<String>(1)
            .map_err(|e| DeepCutError::Persistence(e.to_string()))?,
        style: row.get::<String>(2).ok(),
        research_data: serde_json::from_str(&research_json)
            .map_err(|e| DeepCutError::Persistence(format!("corrupt research data for {id}: {e}")))?,
        created_via_automation: row.get::<i64>(4).unwrap_or(0) != 0,
        created_at: chrono::DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| DeepCutError::Persistence(format!("invalid date: {e}")))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use deepcut_shared::{SectionKey, SectionPayload};
    use uuid::Uuid;

    /// Create a temp file storage for testing.
    async fn test_storage() -> Storage {
        let tmp = std::env::temp_dir().join(format!("deepcut_test_{}.db", Uuid::now_v7()));
        Storage::open(&tmp).await.expect("open test db")
    }

    fn package(title: &str) -> ResearchPackage {
        let viral: SectionPayload =
            serde_json::from_value(serde_json::json!({ "titles": [title] })).unwrap();
        let raw = SectionPayload::fallback("unstructured notes");
        ResearchPackage {
            viral_concept: viral,
            background_research: raw.clone(),
            interview_targets: raw.clone(),
            documents_and_data: raw.clone(),
            foia_suggestions: raw.clone(),
            story_structure: raw.clone(),
            visual_suggestions: raw,
        }
    }

    #[tokio::test]
    async fn open_and_migrate() {
        let storage = test_storage().await;
        assert_eq!(storage.get_schema_version().await, 1);
    }

    #[tokio::test]
    async fn idempotent_migration() {
        let tmp = std::env::temp_dir().join(format!("deepcut_test_{}.db", Uuid::now_v7()));
        let s1 = Storage::open(&tmp).await.expect("first open");
        drop(s1);
        let s2 = Storage::open(&tmp).await.expect("second open");
        assert_eq!(s2.get_schema_version().await, 1);
    }

    #[tokio::test]
    async fn save_and_fetch_roundtrip() {
        let storage = test_storage().await;
        let id = IdeaId::new();

        storage
            .save_idea(&id, "Operation Paperclip", Some("noir"), &package("Paperclip"), false)
            .await
            .expect("save idea");

        let idea = storage
            .get_idea_by_id(&id)
            .await
            .expect("get idea")
            .expect("idea exists");
        assert_eq!(idea.id, id);
        assert_eq!(idea.topic, "Operation Paperclip");
        assert_eq!(idea.style.as_deref(), Some("noir"));
        assert!(!idea.created_via_automation);
        assert_eq!(idea.research_data, package("Paperclip"));
        assert!(
            idea.research_data
                .section(SectionKey::StoryStructure)
                .is_fallback()
        );
    }

    #[tokio::test]
    async fn automated_flag_and_null_style() {
        let storage = test_storage().await;
        let id = IdeaId::new();
        storage
            .save_idea(&id, "The Dyatlov Pass", None, &package("Dyatlov"), true)
            .await
            .unwrap();

        let idea = storage.get_idea_by_id(&id).await.unwrap().unwrap();
        assert!(idea.created_via_automation);
        assert!(idea.style.is_none());
    }

    #[tokio::test]
    async fn duplicate_id_is_rejected() {
        let storage = test_storage().await;
        let id = IdeaId::new();
        storage
            .save_idea(&id, "First", None, &package("a"), false)
            .await
            .unwrap();

        let err = storage
            .save_idea(&id, "Second", None, &package("b"), false)
            .await
            .unwrap_err();
        assert!(matches!(err, DeepCutError::Persistence(_)));
    }

    #[tokio::test]
    async fn missing_idea_is_none() {
        let storage = test_storage().await;
        assert!(storage.get_idea_by_id(&IdeaId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_with_search() {
        let storage = test_storage().await;
        for topic in ["Operation Paperclip", "MKUltra", "Project Paperclip II"] {
            storage
                .save_idea(&IdeaId::new(), topic, None, &package(topic), false)
                .await
                .unwrap();
        }

        let all = storage.get_all_ideas(None).await.expect("list all");
        assert_eq!(all.len(), 3);

        let hits = storage.get_all_ideas(Some("paperclip")).await.expect("search");
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|i| i.topic.contains("Paperclip")));

        let blank = storage.get_all_ideas(Some("  ")).await.unwrap();
        assert_eq!(blank.len(), 3);
    }

    #[tokio::test]
    async fn search_treats_wildcards_literally() {
        let storage = test_storage().await;
        storage
            .save_idea(&IdeaId::new(), "100% Proof", None, &package("x"), false)
            .await
            .unwrap();
        storage
            .save_idea(&IdeaId::new(), "1000 Proofs", None, &package("y"), false)
            .await
            .unwrap();

        let hits = storage.get_all_ideas(Some("0%")).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].topic, "100% Proof");
    }

    #[tokio::test]
    async fn delete_reports_whether_removed() {
        let storage = test_storage().await;
        let id = IdeaId::new();
        storage
            .save_idea(&id, "Topic", None, &package("t"), false)
            .await
            .unwrap();

        assert!(storage.delete_idea(&id).await.unwrap());
        assert!(!storage.delete_idea(&id).await.unwrap());
        assert!(storage.get_idea_by_id(&id).await.unwrap().is_none());
    }

    #[test]
    fn escape_like_escapes_wildcards() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("plain"), "plain");
    }
}
