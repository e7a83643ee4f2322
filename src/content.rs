//! User-facing text.
//!
//! Keep every string the bot sends in this module so wording stays in one
//! place.

use rand::seq::SliceRandom;

use crate::channels::Keyboard;
use crate::error::{Error, ReminderError, StoreError, SurveyError};
use crate::history::{DiagnosisEntry, MOOD_SCORE_MAX, MOOD_SCORE_MIN};
use crate::survey::Outcome;

pub const DEFAULT_NAME: &str = "друг";

pub const MENU_DIAGNOSIS: &str = "📝 Диагностика";
pub const MENU_MOOD: &str = "📔 Дневник настроения";
pub const MENU_RELAX: &str = "🧘‍♂️ Релаксация";
pub const MENU_QUOTES: &str = "💬 Цитаты";
pub const MENU_REMINDERS: &str = "⏰ Напоминания";
pub const MENU_GOALS: &str = "🎯 Цели";
pub const MENU_FAQ: &str = "❓ FAQ";
pub const MENU_EMERGENCY: &str = "🚨 Помощь";

pub const HELP_TEXT: &str = "Вот что я могу сделать:\n\
    - /setname Иван — установить имя\n\
    - /diagnosis — начать диагностику\n\
    - /cancel — прервать диагностику\n\
    - /history — история результатов\n\
    - /mood 7 Хороший день — запись в дневник с оценкой от 1 до 10\n\
    - /reminder 5 Пить воду — напоминание\n\
    - /relax, /quote, /faq, /helpme\n\
    - Просто напиши, чтобы добавить в дневник настроения";

pub const RELAX_TEXT: &str = "Техника релаксации:\n\
    1. Найдите спокойное место.\n\
    2. Закройте глаза и глубоко вдохните.\n\
    3. Медленно выдохните, расслабляя тело.\n\
    4. Повторите 5 раз.\n\
    5. Почувствуйте спокойствие.";

pub const FAQ_TEXT: &str = "Часто задаваемые вопросы:\n\
    1. Как установить имя? /setname Иван\n\
    2. Как начать диагностику? /diagnosis\n\
    3. Как вести дневник? Просто напишите текст.\n\
    4. Как установить напоминание? /reminder 10 Пить воду";

pub const EMERGENCY_TEXT: &str = "🚨 Экстренная помощь:\n\
    📞 Телефон доверия: 8-800-2000-122\n\
    📞 Психологическая помощь: 112\n\
    📞 В экстренных случаях звоните: 103";

pub const QUOTES: [&str; 4] = [
    "Счастье — это когда то, что ты думаешь, говоришь и делаешь — в гармонии. — Махатма Ганди",
    "Ты сильнее, чем тебе кажется.",
    "Каждый день — шанс начать заново.",
    "Ты — главный герой своей жизни, а не жертва.",
];

pub const MOOD_PROMPT: &str = "Опиши, как ты себя чувствуешь.";
pub const MOOD_SAVED: &str = "Спасибо! Запись добавлена в дневник настроения.";
pub const FREE_TEXT_HINT: &str =
    "Я понимаю только команды. Чтобы сделать запись в дневнике, используй /mood, а список команд — /help.";
pub const REMINDER_USAGE: &str = "Использование: /reminder <минуты> <сообщение>";
pub const REMINDER_MENU: &str = "Установи напоминание командой: /reminder <минуты> <текст>";
pub const GOALS_TEXT: &str = "Функционал целей в разработке.";
pub const SURVEY_CANCELLED: &str = "Диагностика прервана. Начать заново: /diagnosis";
pub const NO_SURVEY: &str = "Сейчас диагностика не идёт. Начать: /diagnosis";
pub const NO_HISTORY: &str = "Вы ещё не проходили диагностику. Начать: /diagnosis";
pub const PROGRESS_CAPTION: &str = "Прогресс состояния";
pub const GENERIC_FAILURE: &str = "Что-то пошло не так. Попробуйте ещё раз позже.";

/// Reply keyboard shown after /start.
pub fn main_menu() -> Keyboard {
    [
        [MENU_DIAGNOSIS, MENU_MOOD],
        [MENU_RELAX, MENU_QUOTES],
        [MENU_REMINDERS, MENU_GOALS],
        [MENU_FAQ, MENU_EMERGENCY],
    ]
    .iter()
    .map(|row| row.iter().map(|s| s.to_string()).collect())
    .collect()
}

pub fn greeting(name: Option<&str>) -> String {
    format!(
        "Привет, {}! Я твой личный психолог-бот.\nВыбери одну из опций в меню ниже:",
        name.unwrap_or(DEFAULT_NAME)
    )
}

pub fn name_saved(name: &str) -> String {
    format!("Приятно познакомиться, {name}!")
}

pub fn reminder_set(minutes: u64) -> String {
    format!("Напоминание установлено через {minutes} мин.")
}

pub fn reminder_message(text: &str) -> String {
    format!("🔔 Напоминание: {text}")
}

pub fn random_quote() -> &'static str {
    QUOTES
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(QUOTES[0])
}

pub fn survey_result(outcome: &Outcome) -> String {
    format!(
        "Ваш результат: {}\n\n{}\n\nВот ваш прогресс:",
        outcome.total,
        outcome.severity.message()
    )
}

pub fn history_summary(history: &[DiagnosisEntry]) -> String {
    let mut out = String::from("История результатов:\n");
    for entry in history {
        out.push_str(&format!("{} — {}\n", entry.date, entry.score));
    }
    out.trim_end().to_string()
}

/// Photo caption naming the period the chart covers.
pub fn progress_caption(history: &[DiagnosisEntry]) -> String {
    match (history.first(), history.last()) {
        (Some(first), Some(last)) if history.len() > 1 => format!(
            "{PROGRESS_CAPTION}: {} — {}, результатов: {}",
            first.date,
            last.date,
            history.len()
        ),
        (Some(only), _) => format!("{PROGRESS_CAPTION}: {}", only.date),
        _ => PROGRESS_CAPTION.to_string(),
    }
}

/// What to tell the user when a request fails.
pub fn describe_error(error: &Error) -> String {
    match error {
        Error::Store(StoreError::EmptyName) => "Укажи имя после команды: /setname Иван".to_string(),
        Error::Store(StoreError::EmptyMood) => {
            "Напиши текст записи, например: /mood 7 Хороший день".to_string()
        }
        Error::Store(StoreError::MoodScoreOutOfRange { .. }) => format!(
            "Оценка настроения должна быть от {MOOD_SCORE_MIN} до {MOOD_SCORE_MAX}."
        ),
        Error::Survey(SurveyError::NoSession { .. }) => {
            "Диагностика не начата или устарела. Начните заново: /diagnosis".to_string()
        }
        Error::Survey(SurveyError::OutOfSequence { .. }) => {
            "Этот вопрос уже отвечен. Ответьте на текущий вопрос или начните заново: /diagnosis"
                .to_string()
        }
        Error::Survey(SurveyError::UnknownAnswer { .. }) => {
            "Неизвестный вариант ответа.".to_string()
        }
        Error::Survey(SurveyError::Incomplete { answered, expected }) => {
            format!("Отвечено {answered} из {expected} вопросов. Продолжите диагностику.")
        }
        Error::Reminder(ReminderError::InvalidDelay { .. }) => {
            "Пожалуйста, укажите целое число минут.".to_string()
        }
        Error::Reminder(ReminderError::EmptyMessage) => REMINDER_USAGE.to_string(),
        _ => GENERIC_FAILURE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::survey::Severity;

    #[test]
    fn menu_has_four_rows_of_two() {
        let menu = main_menu();
        assert_eq!(menu.len(), 4);
        assert!(menu.iter().all(|row| row.len() == 2));
        assert_eq!(menu[0][0], MENU_DIAGNOSIS);
    }

    #[test]
    fn greeting_falls_back_to_default_name() {
        assert!(greeting(None).starts_with("Привет, друг!"));
        assert!(greeting(Some("Лена")).starts_with("Привет, Лена!"));
    }

    #[test]
    fn random_quote_is_one_of_the_quotes() {
        for _ in 0..20 {
            assert!(QUOTES.contains(&random_quote()));
        }
    }

    #[test]
    fn survey_result_mentions_score_and_band() {
        let outcome = Outcome {
            total: 12,
            severity: Severity::Moderate,
            history: vec![],
        };
        let text = survey_result(&outcome);
        assert!(text.contains("12"));
        assert!(text.contains(Severity::Moderate.message()));
    }

    #[test]
    fn progress_caption_names_the_covered_dates() {
        use crate::history::Timestamp;
        use chrono::NaiveDate;

        let at = |day| {
            Timestamp::from_naive(
                NaiveDate::from_ymd_opt(2024, 5, day)
                    .unwrap()
                    .and_hms_opt(9, 30, 0)
                    .unwrap(),
            )
        };
        let history = vec![
            DiagnosisEntry { date: at(1), score: 4 },
            DiagnosisEntry { date: at(8), score: 7 },
            DiagnosisEntry { date: at(15), score: 3 },
        ];

        assert_eq!(
            progress_caption(&history),
            "Прогресс состояния: 2024-05-01 09:30 — 2024-05-15 09:30, результатов: 3"
        );
        assert_eq!(
            progress_caption(&history[..1]),
            "Прогресс состояния: 2024-05-01 09:30"
        );
        assert_eq!(progress_caption(&[]), PROGRESS_CAPTION);
    }

    #[test]
    fn io_failures_are_not_leaked_to_users() {
        let err = Error::from(StoreError::Write {
            path: "/secret/path.json".into(),
            source: std::io::Error::other("disk full"),
        });
        assert_eq!(describe_error(&err), GENERIC_FAILURE);
    }
}
