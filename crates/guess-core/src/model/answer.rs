use core::fmt;

/// One step of the five-point fuzzy answer scale.
///
/// The discriminant is the wire encoding shared with callers; reordering the
/// variants changes the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Answer {
    Yes = 0,
    ProbablyYes = 1,
    DontKnow = 2,
    ProbablyNo = 3,
    No = 4,
}

impl Answer {
    pub const ALL: [Answer; 5] = [
        Answer::Yes,
        Answer::ProbablyYes,
        Answer::DontKnow,
        Answer::ProbablyNo,
        Answer::No,
    ];

    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Answer::Yes),
            1 => Some(Answer::ProbablyYes),
            2 => Some(Answer::DontKnow),
            3 => Some(Answer::ProbablyNo),
            4 => Some(Answer::No),
            _ => None,
        }
    }

    pub const fn index(self) -> usize {
        self as usize
    }

    /// Numeric strength of the answer in `[0, 1]`.
    pub const fn value(self) -> f64 {
        match self {
            Answer::Yes => 1.0,
            Answer::ProbablyYes => 0.75,
            Answer::DontKnow => 0.5,
            Answer::ProbablyNo => 0.25,
            Answer::No => 0.0,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Answer::Yes => "Oui",
            Answer::ProbablyYes => "Plutôt oui",
            Answer::DontKnow => "Je ne sais pas",
            Answer::ProbablyNo => "Plutôt non",
            Answer::No => "Non",
        }
    }

    /// Scale entry whose value is closest to `value` (lowest index on ties).
    pub fn nearest(value: f64) -> Self {
        let mut best = Answer::Yes;
        let mut best_distance = f64::INFINITY;
        for answer in Answer::ALL {
            let distance = (answer.value() - value).abs();
            if distance < best_distance {
                best = answer;
                best_distance = distance;
            }
        }
        best
    }
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The fixed answer scale handed to callers at the start of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AnswerScale;

impl AnswerScale {
    pub const SIZE: usize = Answer::ALL.len();

    pub fn labels(&self) -> Vec<&'static str> {
        Answer::ALL.iter().map(|answer| answer.label()).collect()
    }

    pub fn values(&self) -> [f64; Self::SIZE] {
        Answer::ALL.map(Answer::value)
    }

    pub fn resolve(&self, index: usize) -> Option<Answer> {
        Answer::from_index(index)
    }
}
