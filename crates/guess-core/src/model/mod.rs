pub mod answer;
pub mod knowledge;

pub use answer::{Answer, AnswerScale};
pub use knowledge::{Candidate, KnowledgeBase, KnowledgeError, Question};
