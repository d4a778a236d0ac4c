//! The fixed, ordered table of generation stages.
//!
//! Table order is part of the external contract: callers key UI updates on the
//! section name and expect `generating` / `complete` pairs in this order.

use deepcut_shared::SectionKey;

use crate::prompts;

/// One step of the pipeline, producing one section of the package.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stage {
    /// Section this stage fills.
    pub key: SectionKey,
    /// System prompt sent to the generation service.
    pub prompt: &'static str,
    /// Sampling temperature in `[0, 1]`.
    pub temperature: f32,
    /// Human-readable progress label.
    pub label: &'static str,
}

/// All stages, in execution order.
pub const STAGES: [Stage; 7] = [
    Stage {
        key: SectionKey::ViralConcept,
        prompt: prompts::VIRAL_CONCEPT_PROMPT,
        temperature: 0.7,
        label: "Crafting viral concept & angle...",
    },
    Stage {
        key: SectionKey::BackgroundResearch,
        prompt: prompts::BACKGROUND_RESEARCH_PROMPT,
        temperature: 0.4,
        label: "Researching background...",
    },
    Stage {
        key: SectionKey::InterviewTargets,
        prompt: prompts::INTERVIEW_TARGETS_PROMPT,
        temperature: 0.5,
        label: "Identifying interview targets...",
    },
    Stage {
        key: SectionKey::DocumentsAndData,
        prompt: prompts::DOCUMENTS_DATA_PROMPT,
        temperature: 0.4,
        label: "Finding documents & data sources...",
    },
    Stage {
        key: SectionKey::FoiaSuggestions,
        prompt: prompts::FOIA_PROMPT,
        temperature: 0.4,
        label: "Drafting FOIA requests...",
    },
    Stage {
        key: SectionKey::StoryStructure,
        prompt: prompts::STORY_STRUCTURE_PROMPT,
        temperature: 0.6,
        label: "Building story structure...",
    },
    Stage {
        key: SectionKey::VisualSuggestions,
        prompt: prompts::VISUAL_SUGGESTIONS_PROMPT,
        temperature: 0.5,
        label: "Planning visual elements...",
    },
];

/// Temperature for the automated topic pre-stage.
pub const DAILY_TOPIC_TEMPERATURE: f32 = 0.9;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_covers_every_section() {
        let keys: Vec<SectionKey> = STAGES.iter().map(|s| s.key).collect();
        assert_eq!(keys, SectionKey::ALL.to_vec());
    }

    #[test]
    fn temperatures_in_unit_range() {
        for stage in &STAGES {
            assert!(
                (0.0..=1.0).contains(&stage.temperature),
                "{} has temperature {}",
                stage.key,
                stage.temperature
            );
        }
        assert!((0.0..=1.0).contains(&DAILY_TOPIC_TEMPERATURE));
    }

    #[test]
    fn prompts_request_json_and_labels_present() {
        for stage in &STAGES {
            assert!(stage.prompt.contains("JSON"), "{} prompt", stage.key);
            assert!(!stage.label.is_empty());
        }
    }
}
