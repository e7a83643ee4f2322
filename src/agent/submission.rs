//! Parsing inbound text into submissions.
//!
//! Text is either a slash command, one of the main menu buttons, or free
//! text.

use crate::content;

/// Parses user input into Submission types.
pub struct SubmissionParser;

impl SubmissionParser {
    /// Parse message content into a Submission.
    pub fn parse(content: &str) -> Submission {
        let trimmed = content.trim();

        if let Some(submission) = Self::parse_menu_button(trimmed) {
            return submission;
        }

        let Some(without_slash) = trimmed.strip_prefix('/') else {
            return Submission::FreeText {
                text: trimmed.to_string(),
            };
        };

        let (command, args) = split_first_word(without_slash);
        // Group chats address commands as /cmd@botname.
        let command = command
            .split_once('@')
            .map(|(c, _)| c)
            .unwrap_or(command)
            .to_lowercase();
        let args = args.unwrap_or_default();

        match command.as_str() {
            "start" => Submission::Start,
            "help" => Submission::Help,
            "setname" => Submission::SetName {
                name: args.to_string(),
            },
            "diagnosis" => Submission::Diagnosis,
            "cancel" => Submission::Cancel,
            "history" => Submission::History,
            "mood" => Self::parse_mood(args),
            "reminder" => Self::parse_reminder(args),
            "relax" => Submission::Relax,
            "quote" => Submission::Quote,
            "faq" => Submission::Faq,
            "helpme" => Submission::Emergency,
            _ => Submission::Unknown { command },
        }
    }

    fn parse_menu_button(text: &str) -> Option<Submission> {
        let submission = match text {
            content::MENU_DIAGNOSIS => Submission::Diagnosis,
            content::MENU_MOOD => Submission::MoodPrompt,
            content::MENU_RELAX => Submission::Relax,
            content::MENU_QUOTES => Submission::Quote,
            content::MENU_REMINDERS => Submission::ReminderInfo,
            content::MENU_GOALS => Submission::Goals,
            content::MENU_FAQ => Submission::Faq,
            content::MENU_EMERGENCY => Submission::Emergency,
            _ => return None,
        };
        Some(submission)
    }

    /// `/mood`, `/mood <text>`, `/mood <score> [text]`.
    fn parse_mood(args: &str) -> Submission {
        if args.is_empty() {
            return Submission::MoodPrompt;
        }
        let (first, rest) = split_first_word(args);
        match first.parse::<i64>() {
            Ok(score) => Submission::Mood {
                score: Some(score),
                text: rest.unwrap_or_default().to_string(),
            },
            Err(_) => Submission::Mood {
                score: None,
                text: args.to_string(),
            },
        }
    }

    /// `/reminder <minutes> <text>`. Validation of the minutes happens when
    /// the reminder is scheduled.
    fn parse_reminder(args: &str) -> Submission {
        match split_first_word(args) {
            (minutes, Some(text)) if !minutes.is_empty() => Submission::Reminder {
                minutes: minutes.to_string(),
                text: text.to_string(),
            },
            _ => Submission::ReminderUsage,
        }
    }
}

/// Split a string into the first word and the rest.
fn split_first_word(s: &str) -> (&str, Option<&str>) {
    match s.find(char::is_whitespace) {
        Some(idx) => {
            let rest = s[idx..].trim();
            if rest.is_empty() {
                (&s[..idx], None)
            } else {
                (&s[..idx], Some(rest))
            }
        }
        None => (s, None),
    }
}

/// A parsed user request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// Greeting plus the main menu.
    Start,
    Help,
    SetName {
        name: String,
    },
    /// Begin the screening survey.
    Diagnosis,
    /// Abandon the running survey.
    Cancel,
    /// Show past screening results.
    History,
    /// Ask the user to describe their mood.
    MoodPrompt,
    Mood {
        score: Option<i64>,
        text: String,
    },
    Reminder {
        minutes: String,
        text: String,
    },
    /// `/reminder` with missing arguments.
    ReminderUsage,
    /// The reminders menu button.
    ReminderInfo,
    Relax,
    Quote,
    Goals,
    Faq,
    Emergency,
    /// Text that is neither a command nor a menu button.
    FreeText {
        text: String,
    },
    /// A slash command the bot does not know.
    Unknown {
        command: String,
    },
}

impl Submission {
    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Submission::Start => "start",
            Submission::Help => "help",
            Submission::SetName { .. } => "setname",
            Submission::Diagnosis => "diagnosis",
            Submission::Cancel => "cancel",
            Submission::History => "history",
            Submission::MoodPrompt => "mood_prompt",
            Submission::Mood { .. } => "mood",
            Submission::Reminder { .. } => "reminder",
            Submission::ReminderUsage => "reminder_usage",
            Submission::ReminderInfo => "reminder_info",
            Submission::Relax => "relax",
            Submission::Quote => "quote",
            Submission::Goals => "goals",
            Submission::Faq => "faq",
            Submission::Emergency => "emergency",
            Submission::FreeText { .. } => "free_text",
            Submission::Unknown { .. } => "unknown",
        }
    }
}
