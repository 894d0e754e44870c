use thiserror::Error;

/// One guessable entity of the knowledge base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate<'a> {
    pub index: usize,
    pub name: &'a str,
    pub appearances: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question<'a> {
    pub index: usize,
    pub text: &'a str,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum KnowledgeError {
    #[error("knowledge base has no candidates")]
    NoCandidates,
    #[error("knowledge base has no questions")]
    NoQuestions,
    #[error("expected {expected} appearance counters, found {found}")]
    CounterCount { expected: usize, found: usize },
    #[error("expected {expected} matrix rows, found {found}")]
    RowCount { expected: usize, found: usize },
    #[error("matrix row {row} has {found} entries, expected {expected}")]
    RowWidth {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("matrix entry ({question}, {candidate}) = {value} is outside [0, 1]")]
    OutOfRange {
        question: usize,
        candidate: usize,
        value: f64,
    },
}

/// Learned expectations `D[question][candidate]` plus per-candidate appearance counters.
///
/// The matrix is stored row-major, one row per question.
#[derive(Debug, Clone, PartialEq)]
pub struct KnowledgeBase {
    candidates: Vec<String>,
    appearances: Vec<u64>,
    questions: Vec<String>,
    matrix: Vec<f64>,
}

impl KnowledgeBase {
    pub fn new(
        candidates: Vec<String>,
        appearances: Vec<u64>,
        questions: Vec<String>,
        rows: Vec<Vec<f64>>,
    ) -> Result<Self, KnowledgeError> {
        if candidates.is_empty() {
            return Err(KnowledgeError::NoCandidates);
        }
        if questions.is_empty() {
            return Err(KnowledgeError::NoQuestions);
        }
        if appearances.len() != candidates.len() {
            return Err(KnowledgeError::CounterCount {
                expected: candidates.len(),
                found: appearances.len(),
            });
        }
        if rows.len() != questions.len() {
            return Err(KnowledgeError::RowCount {
                expected: questions.len(),
                found: rows.len(),
            });
        }

        let width = candidates.len();
        let mut matrix = Vec::with_capacity(width * questions.len());
        for (question, row) in rows.into_iter().enumerate() {
            if row.len() != width {
                return Err(KnowledgeError::RowWidth {
                    row: question,
                    expected: width,
                    found: row.len(),
                });
            }
            for (candidate, value) in row.into_iter().enumerate() {
                if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                    return Err(KnowledgeError::OutOfRange {
                        question,
                        candidate,
                        value,
                    });
                }
                matrix.push(value);
            }
        }

        Ok(Self {
            candidates,
            appearances,
            questions,
            matrix,
        })
    }

    pub fn candidate_count(&self) -> usize {
        self.candidates.len()
    }

    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    pub fn candidate(&self, index: usize) -> Option<Candidate<'_>> {
        let name = self.candidates.get(index)?;
        Some(Candidate {
            index,
            name,
            appearances: self.appearances[index],
        })
    }

    pub fn question(&self, index: usize) -> Option<Question<'_>> {
        let text = self.questions.get(index)?;
        Some(Question { index, text })
    }

    pub fn candidate_names(&self) -> &[String] {
        &self.candidates
    }

    pub fn question_texts(&self) -> &[String] {
        &self.questions
    }

    pub fn appearances(&self) -> &[u64] {
        &self.appearances
    }

    /// Expected answer value for `(question, candidate)`.
    pub fn expected(&self, question: usize, candidate: usize) -> f64 {
        self.matrix[question * self.candidates.len() + candidate]
    }

    /// Expected answers of every candidate for `question`.
    pub fn row(&self, question: usize) -> &[f64] {
        let width = self.candidates.len();
        &self.matrix[question * width..(question + 1) * width]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.matrix.chunks(self.candidates.len())
    }

    /// Prior distribution from normalised appearance counters.
    ///
    /// Falls back to uniform when every counter is zero.
    pub fn prior(&self) -> Vec<f64> {
        let total: f64 = self.appearances.iter().map(|&count| count as f64).sum();
        if total == 0.0 {
            let uniform = 1.0 / self.candidates.len() as f64;
            return vec![uniform; self.candidates.len()];
        }
        self.appearances
            .iter()
            .map(|&count| count as f64 / total)
            .collect()
    }

    /// Case-insensitive lookup by name.
    pub fn find_candidate(&self, name: &str) -> Option<usize> {
        let wanted = name.trim().to_lowercase();
        self.candidates
            .iter()
            .position(|candidate| candidate.to_lowercase() == wanted)
    }

    pub(crate) fn set_expected(&mut self, question: usize, candidate: usize, value: f64) {
        let width = self.candidates.len();
        self.matrix[question * width + candidate] = value.clamp(0.0, 1.0);
    }

    pub(crate) fn record_appearance(&mut self, candidate: usize) {
        self.appearances[candidate] = self.appearances[candidate].saturating_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> KnowledgeBase {
        KnowledgeBase::new(
            vec!["Chat".into(), "Chien".into(), "Poisson".into()],
            vec![2, 1, 1],
            vec!["Miaule-t-il ?".into(), "Aboie-t-il ?".into()],
            vec![vec![0.9, 0.1, 0.5], vec![0.2, 0.8, 0.5]],
        )
        .expect("valid knowledge base")
    }

    #[test]
    fn rows_are_indexed_by_question() {
        let kb = sample();
        assert_eq!(kb.row(1), &[0.2, 0.8, 0.5]);
        assert_eq!(kb.expected(0, 2), 0.5);
        assert_eq!(kb.rows().count(), 2);
    }

    #[test]
    fn prior_normalises_counters() {
        let kb = sample();
        assert_eq!(kb.prior(), vec![0.5, 0.25, 0.25]);
    }

    #[test]
    fn prior_is_uniform_when_counters_are_zero() {
        let kb = KnowledgeBase::new(
            vec!["a".into(), "b".into()],
            vec![0, 0],
            vec!["q".into()],
            vec![vec![1.0, 0.0]],
        )
        .unwrap();
        assert_eq!(kb.prior(), vec![0.5, 0.5]);
    }

    #[test]
    fn rejects_ragged_and_out_of_range_rows() {
        let ragged = KnowledgeBase::new(
            vec!["a".into(), "b".into()],
            vec![1, 1],
            vec!["q".into()],
            vec![vec![1.0]],
        );
        assert!(matches!(ragged, Err(KnowledgeError::RowWidth { row: 0, .. })));

        let out_of_range = KnowledgeBase::new(
            vec!["a".into()],
            vec![1],
            vec!["q".into()],
            vec![vec![1.5]],
        );
        assert!(matches!(
            out_of_range,
            Err(KnowledgeError::OutOfRange { question: 0, candidate: 0, .. })
        ));

        let nan = KnowledgeBase::new(
            vec!["a".into()],
            vec![1],
            vec!["q".into()],
            vec![vec![f64::NAN]],
        );
        assert!(matches!(nan, Err(KnowledgeError::OutOfRange { .. })));
    }

    #[test]
    fn rejects_empty_sets() {
        let no_questions = KnowledgeBase::new(vec!["a".into()], vec![1], vec![], vec![]);
        assert_eq!(no_questions, Err(KnowledgeError::NoQuestions));
        let no_candidates = KnowledgeBase::new(vec![], vec![], vec!["q".into()], vec![vec![]]);
        assert_eq!(no_candidates, Err(KnowledgeError::NoCandidates));
    }

    #[test]
    fn setters_keep_entries_in_unit_interval() {
        let mut kb = sample();
        kb.set_expected(0, 0, 1.7);
        assert_eq!(kb.expected(0, 0), 1.0);
        kb.record_appearance(2);
        assert_eq!(kb.candidate(2).map(|c| c.appearances), Some(2));
        assert_eq!(kb.find_candidate("chien"), Some(1));
    }

    #[test]
    fn prior_handles_saturated_counters() {
        let kb = KnowledgeBase::new(
            vec!["a".into(), "b".into()],
            vec![u64::MAX, 5],
            vec!["q".into()],
            vec![vec![0.5, 0.5]],
        )
        .unwrap();
        let prior = kb.prior();
        assert!((prior.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(prior[0] > 0.999);
        assert!(prior[1] > 0.0);
    }
}
