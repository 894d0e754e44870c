//! When to keep asking, when to guess, and when to give up and ask for help.

use tracing::{Level, event};

use crate::belief::{BeliefState, parse_env_f64};
use crate::select::{QuestionSelector, Selection};

const DEFAULT_MARGIN: f64 = 0.3;
const DEFAULT_MAX_FAILURES: u32 = 3;

/// Rule deciding whether the leading candidate is convincing enough to guess.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfidenceRule {
    /// Guess when the leader beats the runner-up by more than `margin`.
    Margin { margin: f64 },
    /// Guess when the leader's probability reaches `threshold`.
    Absolute { threshold: f64 },
}

impl Default for ConfidenceRule {
    fn default() -> Self {
        ConfidenceRule::Margin {
            margin: DEFAULT_MARGIN,
        }
    }
}

impl ConfidenceRule {
    /// `GUESS_CONFIDENCE_THRESHOLD` selects the absolute rule; otherwise
    /// `GUESS_CONFIDENCE_MARGIN` tunes the margin rule.
    pub fn from_env() -> Self {
        if let Ok(raw) = std::env::var("GUESS_CONFIDENCE_THRESHOLD") {
            if let Some(threshold) = raw.parse::<f64>().ok().filter(|v| v.is_finite()) {
                return ConfidenceRule::Absolute {
                    threshold: threshold.clamp(0.0, 1.0),
                };
            }
        }
        ConfidenceRule::Margin {
            margin: parse_env_f64("GUESS_CONFIDENCE_MARGIN", DEFAULT_MARGIN).clamp(0.0, 1.0),
        }
    }

    /// Returns the leader and its probability when the rule is satisfied.
    pub fn accepts(&self, belief: &BeliefState) -> Option<(usize, f64)> {
        let (best, runner_up) = belief.top_two();
        let (candidate, probability) = best?;
        let satisfied = match *self {
            ConfidenceRule::Margin { margin } => {
                let second = runner_up.map(|(_, p)| p).unwrap_or(0.0);
                probability > second + margin
            }
            ConfidenceRule::Absolute { threshold } => probability >= threshold,
        };
        satisfied.then_some((candidate, probability))
    }
}

/// States of a game session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Asking { question: usize },
    Guessing { candidate: usize },
    Confirmed { candidate: usize },
    SuggestionRequired,
    Closed,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Confirmed { .. } | Phase::Closed)
    }
}

/// What the session should do next.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Verdict {
    Ask {
        question: usize,
    },
    Guess {
        candidate: usize,
        confidence: f64,
        forced: bool,
    },
    Escalate,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecisionPolicy {
    pub rule: ConfidenceRule,
    /// Rejected guesses tolerated before escalating.
    pub max_failures: u32,
}

impl Default for DecisionPolicy {
    fn default() -> Self {
        Self {
            rule: ConfidenceRule::default(),
            max_failures: DEFAULT_MAX_FAILURES,
        }
    }
}

impl DecisionPolicy {
    pub fn from_env() -> Self {
        let max_failures = std::env::var("GUESS_MAX_FAILURES")
            .ok()
            .and_then(|raw| raw.parse::<u32>().ok())
            .unwrap_or(DEFAULT_MAX_FAILURES)
            .max(1);
        Self {
            rule: ConfidenceRule::from_env(),
            max_failures,
        }
    }

    /// Decision after a belief update: guess if confident, otherwise ask the
    /// next question, forcing a guess once the questions run out.
    pub fn after_answer(
        &self,
        belief: &BeliefState,
        selector: &QuestionSelector<'_>,
        asked: &[bool],
    ) -> Verdict {
        if let Some((candidate, confidence)) = self.rule.accepts(belief) {
            return guess(candidate, confidence, false);
        }
        self.continue_or_force(belief, selector, asked)
    }

    /// Decision after the player rejected a guess. `failures` already counts
    /// the rejection that just happened.
    pub fn after_rejection(
        &self,
        belief: &BeliefState,
        failures: u32,
        selector: &QuestionSelector<'_>,
        asked: &[bool],
    ) -> Verdict {
        if failures >= self.max_failures {
            event!(
                target: "guess_core::escalation",
                Level::INFO,
                failures,
                reason = "failure_limit"
            );
            return Verdict::Escalate;
        }
        self.continue_or_force(belief, selector, asked)
    }

    fn continue_or_force(
        &self,
        belief: &BeliefState,
        selector: &QuestionSelector<'_>,
        asked: &[bool],
    ) -> Verdict {
        if belief.admissible_count() == 0 {
            event!(
                target: "guess_core::escalation",
                Level::INFO,
                reason = "no_candidates_left"
            );
            return Verdict::Escalate;
        }
        match selector.select(belief, asked) {
            Selection::Ask { question, .. } => Verdict::Ask { question },
            Selection::Exhausted => match belief.best() {
                Some((candidate, confidence)) => guess(candidate, confidence, true),
                None => Verdict::Escalate,
            },
        }
    }
}

fn guess(candidate: usize, confidence: f64, forced: bool) -> Verdict {
    event!(
        target: "guess_core::guess",
        Level::INFO,
        candidate = candidate as u64,
        confidence,
        forced
    );
    Verdict::Guess {
        candidate,
        confidence,
        forced,
    }
}
