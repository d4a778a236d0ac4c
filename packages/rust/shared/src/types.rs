//! Core domain types for DeepCut research packages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{DeepCutError, Result};

// ---------------------------------------------------------------------------
// IdeaId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for persisted idea identifiers (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdeaId(pub Uuid);

impl IdeaId {
    /// Generate a fresh identifier. Every pipeline run gets its own.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for IdeaId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for IdeaId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for IdeaId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// SectionKey
// ---------------------------------------------------------------------------

/// One section of a research package. Declaration order is the stage order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SectionKey {
    ViralConcept,
    BackgroundResearch,
    InterviewTargets,
    DocumentsAndData,
    FoiaSuggestions,
    StoryStructure,
    VisualSuggestions,
}

impl SectionKey {
    /// Every section, in stage order.
    pub const ALL: [SectionKey; 7] = [
        Self::ViralConcept,
        Self::BackgroundResearch,
        Self::InterviewTargets,
        Self::DocumentsAndData,
        Self::FoiaSuggestions,
        Self::StoryStructure,
        Self::VisualSuggestions,
    ];

    /// Wire name used in events and persisted JSON.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ViralConcept => "viralConcept",
            Self::BackgroundResearch => "backgroundResearch",
            Self::InterviewTargets => "interviewTargets",
            Self::DocumentsAndData => "documentsAndData",
            Self::FoiaSuggestions => "foiaSuggestions",
            Self::StoryStructure => "storyStructure",
            Self::VisualSuggestions => "visualSuggestions",
        }
    }
}

impl std::fmt::Display for SectionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// SectionPayload
// ---------------------------------------------------------------------------

/// The `{ "raw": text }` sentinel stored when generated text was not a JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FallbackPayload {
    /// The original generated text, untouched.
    pub raw: String,
}

/// Parsed output of one stage.
///
/// The generation service enforces no schema, so a payload is either whatever
/// JSON object the model produced or the fallback wrapper. Typed views in
/// [`crate::sections`] interpret the structured variant at the point of use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SectionPayload {
    Fallback(FallbackPayload),
    Structured(Map<String, Value>),
}

impl SectionPayload {
    /// Wrap unparseable text in the fallback sentinel.
    pub fn fallback(raw: impl Into<String>) -> Self {
        Self::Fallback(FallbackPayload { raw: raw.into() })
    }

    /// Whether this payload is the `{ raw }` fallback.
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback(_))
    }

    /// The unstructured text, if this is a fallback payload.
    pub fn raw(&self) -> Option<&str> {
        match self {
            Self::Fallback(f) => Some(&f.raw),
            Self::Structured(_) => None,
        }
    }

    /// The structured object, if the model returned one.
    pub fn as_object(&self) -> Option<&Map<String, Value>> {
        match self {
            Self::Structured(map) => Some(map),
            Self::Fallback(_) => None,
        }
    }

    /// Convert into a plain JSON value (fallbacks become `{ "raw": .. }`).
    pub fn to_value(&self) -> Value {
        match self {
            Self::Structured(map) => Value::Object(map.clone()),
            Self::Fallback(f) => serde_json::json!({ "raw": f.raw }),
        }
    }
}

/// A stage's key paired with its parsed payload.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionResult {
    pub key: SectionKey,
    pub payload: SectionPayload,
}

// ---------------------------------------------------------------------------
// ResearchPackage
// ---------------------------------------------------------------------------

/// The assembled output of a full pipeline run, one payload per section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchPackage {
    pub viral_concept: SectionPayload,
    pub background_research: SectionPayload,
    pub interview_targets: SectionPayload,
    pub documents_and_data: SectionPayload,
    pub foia_suggestions: SectionPayload,
    pub story_structure: SectionPayload,
    pub visual_suggestions: SectionPayload,
}

impl ResearchPackage {
    /// Borrow the payload stored under `key`.
    pub fn section(&self, key: SectionKey) -> &SectionPayload {
        match key {
            SectionKey::ViralConcept => &self.viral_concept,
            SectionKey::BackgroundResearch => &self.background_research,
            SectionKey::InterviewTargets => &self.interview_targets,
            SectionKey::DocumentsAndData => &self.documents_and_data,
            SectionKey::FoiaSuggestions => &self.foia_suggestions,
            SectionKey::StoryStructure => &self.story_structure,
            SectionKey::VisualSuggestions => &self.visual_suggestions,
        }
    }

    /// Keys whose payload fell back to raw text.
    pub fn fallback_sections(&self) -> Vec<SectionKey> {
        SectionKey::ALL
            .into_iter()
            .filter(|k| self.section(*k).is_fallback())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// GenerationRequest
// ---------------------------------------------------------------------------

/// Caller input for one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    topic: String,
    style: Option<String>,
}

impl GenerationRequest {
    /// Validate and normalize caller input.
    ///
    /// Whitespace around the topic and style is trimmed; a blank topic is a
    /// validation error and a blank style counts as absent.
    pub fn new(topic: impl Into<String>, style: Option<String>) -> Result<Self> {
        let topic = topic.into().trim().to_string();
        if topic.is_empty() {
            return Err(DeepCutError::validation("Topic is required"));
        }
        let style = style
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        Ok(Self { topic, style })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn style(&self) -> Option<&str> {
        self.style.as_deref()
    }
}

// ---------------------------------------------------------------------------
// Idea
// ---------------------------------------------------------------------------

/// A persisted research package and the input that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Idea {
    pub id: IdeaId,
    pub topic: String,
    pub style: Option<String>,
    pub research_data: ResearchPackage,
    /// `true` when the scheduled trigger produced this idea.
    pub created_via_automation: bool,
    pub created_at: DateTime<Utc>,
}
