//! User-facing reply texts

use crate::time_of_day::TimeOfDay;

const TIME_HINT: &str = "Напиши время в формате ЧЧ:ММ (например, 19:30)";
const TEXT_HINT: &str = "Напиши любой текст (например: «Займись ботом!»)";

pub fn greeting(display_name: &str) -> String {
    format!(
        "Привет, {}!\n\n⏰ В какое время напоминать тебе?\n{}",
        display_name, TIME_HINT
    )
}

pub fn time_accepted(time: TimeOfDay) -> String {
    format!(
        "⏰ Отлично! Время установлено на {}.\n\n✏️ Какой текст напоминания ты хочешь получать?\n{}",
        time, TEXT_HINT
    )
}

pub fn invalid_time() -> String {
    format!("❌ Неправильный формат времени.\nПожалуйста, {}", lowercase_first(TIME_HINT))
}

pub fn empty_text() -> String {
    format!("✏️ Текст напоминания не может быть пустым.\n{}", TEXT_HINT)
}

pub fn reminder_set(time: TimeOfDay, text: &str) -> String {
    format!(
        "✅ Готово! Напоминание установлено:\n\n⏰ Время: {} каждый день\n📝 Текст: «{}»",
        time, text
    )
}

pub fn no_session() -> String {
    "👋 Чтобы настроить напоминание, отправь команду /start".to_string()
}

pub fn schedule_failed() -> String {
    "❌ Не удалось установить напоминание. Попробуй ещё раз: /start".to_string()
}

fn lowercase_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_greeting_uses_name() {
        let text = greeting("Jane Doe");
        assert!(text.starts_with("Привет, Jane Doe!"));
        assert!(text.contains("ЧЧ:ММ"));
    }

    #[test]
    fn test_invalid_time_hint() {
        assert_eq!(
            invalid_time(),
            "❌ Неправильный формат времени.\nПожалуйста, напиши время в формате ЧЧ:ММ (например, 19:30)"
        );
    }

    #[test]
    fn test_reminder_set_echoes_time_and_text() {
        let text = reminder_set(TimeOfDay::new(9, 5).unwrap(), "Take your pills");
        assert!(text.contains("09:05 каждый день"));
        assert!(text.contains("«Take your pills»"));
    }
}
