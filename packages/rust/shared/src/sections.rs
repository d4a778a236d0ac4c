//! Typed views over generated section payloads.
//!
//! The generation service returns loosely shaped JSON, so these structs are
//! read on demand and every field is tolerant: a missing, `null` or mistyped
//! field takes its default without affecting its siblings. Only a fallback
//! payload yields `None`; nothing here returns an error.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::types::{ResearchPackage, SectionPayload};

/// Section A: titles and the hook for the documentary.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ViralConcept {
    #[serde(deserialize_with = "lenient_list")]
    pub titles: Vec<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub logline: String,
    #[serde(deserialize_with = "lenient_text")]
    pub hook: String,
    #[serde(deserialize_with = "lenient_text")]
    pub angle: String,
    #[serde(deserialize_with = "lenient_text")]
    pub why_now: String,
}

/// Section B.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BackgroundResearch {
    #[serde(deserialize_with = "lenient_text")]
    pub summary: String,
    #[serde(deserialize_with = "lenient_list")]
    pub timeline: Vec<TimelineEntry>,
    #[serde(deserialize_with = "lenient_list")]
    pub key_facts: Vec<String>,
    #[serde(deserialize_with = "lenient_list")]
    pub controversies: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TimelineEntry {
    #[serde(deserialize_with = "lenient_text")]
    pub date: String,
    #[serde(deserialize_with = "lenient_text")]
    pub event: String,
}

/// Section C.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct InterviewTargets {
    #[serde(deserialize_with = "lenient_list")]
    pub targets: Vec<InterviewTarget>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct InterviewTarget {
    #[serde(deserialize_with = "lenient_text")]
    pub name: String,
    #[serde(deserialize_with = "lenient_text")]
    pub role: String,
    #[serde(deserialize_with = "lenient_text")]
    pub relevance: String,
    #[serde(deserialize_with = "lenient_text")]
    pub approach: String,
}

/// Section D.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DocumentsAndData {
    #[serde(deserialize_with = "lenient_list")]
    pub documents: Vec<DocumentSource>,
    #[serde(deserialize_with = "lenient_list")]
    pub datasets: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DocumentSource {
    #[serde(deserialize_with = "lenient_text")]
    pub title: String,
    #[serde(deserialize_with = "lenient_text")]
    pub source: String,
    #[serde(deserialize_with = "lenient_text")]
    pub description: String,
    #[serde(deserialize_with = "lenient")]
    pub url: Option<String>,
}

/// Section E.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FoiaSuggestions {
    #[serde(deserialize_with = "lenient_list")]
    pub requests: Vec<FoiaRequest>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FoiaRequest {
    #[serde(deserialize_with = "lenient_text")]
    pub agency: String,
    #[serde(deserialize_with = "lenient_text")]
    pub description: String,
    #[serde(deserialize_with = "lenient_text")]
    pub template: String,
}

/// Section F.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StoryStructure {
    #[serde(deserialize_with = "lenient_list")]
    pub acts: Vec<StoryAct>,
    #[serde(deserialize_with = "lenient_text")]
    pub runtime: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StoryAct {
    #[serde(deserialize_with = "lenient_text")]
    pub title: String,
    #[serde(deserialize_with = "lenient_text")]
    pub summary: String,
    #[serde(deserialize_with = "lenient_list")]
    pub beats: Vec<String>,
}

/// Section G.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VisualSuggestions {
    #[serde(deserialize_with = "lenient_list")]
    pub archival: Vec<String>,
    #[serde(deserialize_with = "lenient_list")]
    pub recreations: Vec<String>,
    #[serde(deserialize_with = "lenient_list")]
    pub graphics: Vec<String>,
    #[serde(deserialize_with = "lenient_list")]
    pub locations: Vec<String>,
}

/// Strings pass through, numbers and booleans are rendered, anything else is empty.
fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    })
}

/// Keeps the elements that decode as `T`; a non-array is an empty list.
fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// Interpret a structured payload as `T`. Fallbacks give `None`.
pub fn view<T: DeserializeOwned>(payload: &SectionPayload) -> Option<T> {
    let map = payload.as_object()?;
    serde_json::from_value(Value::Object(map.clone())).ok()
}

impl ResearchPackage {
    pub fn viral_concept_view(&self) -> Option<ViralConcept> {
        view(&self.viral_concept)
    }

    pub fn background_research_view(&self) -> Option<BackgroundResearch> {
        view(&self.background_research)
    }

    pub fn interview_targets_view(&self) -> Option<InterviewTargets> {
        view(&self.interview_targets)
    }

    pub fn documents_and_data_view(&self) -> Option<DocumentsAndData> {
        view(&self.documents_and_data)
    }

    pub fn foia_suggestions_view(&self) -> Option<FoiaSuggestions> {
        view(&self.foia_suggestions)
    }

    pub fn story_structure_view(&self) -> Option<StoryStructure> {
        view(&self.story_structure)
    }

    pub fn visual_suggestions_view(&self) -> Option<VisualSuggestions> {
        view(&self.visual_suggestions)
    }

    /// Headline for notifications: the first generated title, else the topic.
    ///
    /// Reads `titles[0]` straight from the payload, so unrelated fields never
    /// matter. A missing `titles` key, an empty array, a blank or non-string
    /// first entry, and a fallback payload all resolve to the topic.
    pub fn display_title(&self, topic: &str) -> String {
        self.viral_concept
            .as_object()
            .and_then(|map| map.get("titles"))
            .and_then(Value::as_array)
            .and_then(|titles| titles.first())
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map_or_else(|| topic.to_string(), str::to_string)
    }
}
