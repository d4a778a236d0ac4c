//! Package assembly and persistence.
//!
//! Collects the per-stage results into a [`ResearchPackage`] once every
//! stage has succeeded, then hands the package to an [`IdeaStore`].

use std::collections::BTreeMap;

use tracing::{debug, info, instrument};

use deepcut_shared::{
    DeepCutError, IdeaId, ResearchPackage, Result, SectionKey, SectionPayload, SectionResult,
};
use deepcut_storage::IdeaStore;

/// Accumulates stage results in execution order.
#[derive(Debug, Default)]
pub struct SectionResults {
    results: Vec<SectionResult>,
}

impl SectionResults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: SectionKey, payload: SectionPayload) {
        self.results.push(SectionResult { key, payload });
    }

    pub(crate) fn len(&self) -> usize {
        self.results.len()
    }
}

/// Build the package from a complete set of results.
///
/// Every section must appear exactly once.
pub fn assemble(results: SectionResults) -> Result<ResearchPackage> {
    let mut by_key: BTreeMap<SectionKey, SectionPayload> = BTreeMap::new();
    for SectionResult { key, payload } in results.results {
        if by_key.insert(key, payload).is_some() {
            return Err(DeepCutError::Generation(format!(
                "section {key} produced more than once"
            )));
        }
    }

    let mut take = |key: SectionKey| {
        by_key
            .remove(&key)
            .ok_or_else(|| DeepCutError::Generation(format!("section {key} was never generated")))
    };

    let package = ResearchPackage {
        viral_concept: take(SectionKey::ViralConcept)?,
        background_research: take(SectionKey::BackgroundResearch)?,
        interview_targets: take(SectionKey::InterviewTargets)?,
        documents_and_data: take(SectionKey::DocumentsAndData)?,
        foia_suggestions: take(SectionKey::FoiaSuggestions)?,
        story_structure: take(SectionKey::StoryStructure)?,
        visual_suggestions: take(SectionKey::VisualSuggestions)?,
    };

    let fallbacks = package.fallback_sections();
    if !fallbacks.is_empty() {
        debug!(?fallbacks, "package contains unstructured sections");
    }
    Ok(package)
}

/// Write a finished package under `id`.
#[instrument(skip_all, fields(%id, automated))]
pub async fn persist(
    store: &dyn IdeaStore,
    id: &IdeaId,
    topic: &str,
    style: Option<&str>,
    package: &ResearchPackage,
    automated: bool,
) -> Result<()> {
    store
        .save_idea(id, topic, style, package, automated)
        .await
        .map_err(|e| match e {
            DeepCutError::Persistence(_) => e,
            other => DeepCutError::Persistence(other.message()),
        })?;
    info!("idea saved");
    Ok(())
}
