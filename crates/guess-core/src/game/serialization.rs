use serde::{Deserialize, Serialize};

use crate::model::{KnowledgeBase, KnowledgeError};

/// Serialisable form of a knowledge base.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KnowledgeSnapshot {
    pub candidates: Vec<String>,
    pub appearances: Vec<u64>,
    pub questions: Vec<String>,
    /// One row per question, one column per candidate.
    pub matrix: Vec<Vec<f64>>,
}

impl KnowledgeSnapshot {
    /// Captures `knowledge`, rounding matrix cells to three decimals.
    pub fn capture(knowledge: &KnowledgeBase) -> Self {
        KnowledgeSnapshot {
            candidates: knowledge.candidate_names().to_vec(),
            appearances: knowledge.appearances().to_vec(),
            questions: knowledge.question_texts().to_vec(),
            matrix: knowledge
                .rows()
                .map(|row| row.iter().map(|value| round3(*value)).collect())
                .collect(),
        }
    }

    pub fn restore(self) -> Result<KnowledgeBase, KnowledgeError> {
        KnowledgeBase::new(
            self.candidates,
            self.appearances,
            self.questions,
            self.matrix,
        )
    }

    pub fn to_json(knowledge: &KnowledgeBase) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&Self::capture(knowledge))
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
