//! Screening questionnaire: questions, answer weights and severity bands.
//!
//! Six questions, each answered with one of four frequency options weighted
//! 0 to 3. The total (0..=18) maps onto a severity band.

mod engine;

pub use engine::{Outcome, Progress, SurveyEngine, SurveySession};

/// Number of questions in one pass.
pub const QUESTION_COUNT: usize = QUESTIONS.len();

/// Largest total a full pass can produce.
pub const MAX_SCORE: u32 = QUESTION_COUNT as u32 * 3;

const QUESTIONS: [&str; 6] = [
    "Как часто вы испытываете мало интереса или удовольствия от занятий, которые обычно доставляют радость?",
    "Как часто вы чувствуете себя усталым или без сил?",
    "Как часто вам трудно засыпать или слишком рано просыпаться?",
    "Как часто вы ощущаете, что всё в жизни теряет смысл?",
    "Как часто вы чувствуете себя нервным или беспокойным?",
    "Как часто вы чувствуете себя беспомощным или одиноким?",
];

/// A question of the survey.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Question {
    pub index: usize,
    pub prompt: &'static str,
}

impl Question {
    pub const FIRST: Question = Question {
        index: 0,
        prompt: QUESTIONS[0],
    };

    pub fn get(index: usize) -> Option<Self> {
        QUESTIONS
            .get(index)
            .map(|&prompt| Self { index, prompt })
    }

    /// Every question shares the same answer options.
    pub fn options(&self) -> [AnswerOption; 4] {
        AnswerOption::ALL
    }

    pub fn is_last(&self) -> bool {
        self.index + 1 == QUESTION_COUNT
    }
}

/// How often the user experienced what the question describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnswerOption {
    Never,
    SeveralDays,
    MoreThanHalf,
    NearlyEveryDay,
}

impl AnswerOption {
    pub const ALL: [AnswerOption; 4] = [
        AnswerOption::Never,
        AnswerOption::SeveralDays,
        AnswerOption::MoreThanHalf,
        AnswerOption::NearlyEveryDay,
    ];

    /// Button label shown to the user.
    pub fn label(self) -> &'static str {
        match self {
            AnswerOption::Never => "Никогда",
            AnswerOption::SeveralDays => "Несколько дней",
            AnswerOption::MoreThanHalf => "Более половины времени",
            AnswerOption::NearlyEveryDay => "Практически каждый день",
        }
    }

    pub fn weight(self) -> u32 {
        match self {
            AnswerOption::Never => 0,
            AnswerOption::SeveralDays => 1,
            AnswerOption::MoreThanHalf => 2,
            AnswerOption::NearlyEveryDay => 3,
        }
    }

    /// Position in [`AnswerOption::ALL`], also used in button payloads.
    pub fn index(self) -> usize {
        self.weight() as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL.into_iter().find(|o| o.label() == label)
    }
}

/// Severity band derived from the total score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Nominal,
    MildStress,
    Moderate,
    Severe,
}

impl Severity {
    /// Bands are inclusive on their upper bound: 5, 10 and 15 belong to the
    /// lower band.
    pub fn from_total(total: u32) -> Self {
        match total {
            0..=5 => Severity::Nominal,
            6..=10 => Severity::MildStress,
            11..=15 => Severity::Moderate,
            _ => Severity::Severe,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Severity::Nominal => "Ваше состояние в порядке.",
            Severity::MildStress => "Есть признаки стресса. Попробуйте отдохнуть.",
            Severity::Moderate => {
                "Возможно умеренная депрессия. Подумайте о разговоре с психологом."
            }
            Severity::Severe => "Вы можете испытывать тяжёлую депрессию. Обратитесь за помощью.",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Nominal => "nominal",
            Severity::MildStress => "mild_stress",
            Severity::Moderate => "moderate",
            Severity::Severe => "severe",
        }
    }
}

/// Sum of answer weights.
pub fn total_score(answers: &[AnswerOption]) -> u32 {
    answers.iter().map(|a| a.weight()).sum()
}
