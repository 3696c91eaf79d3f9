use chrono::{DateTime, Utc};
use teloxide::types::{KeyboardButton, KeyboardMarkup, ReplyMarkup};

/// Распознанная кнопка главного меню.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    AddStudent,
    MarkPayment,
    ListStudents,
    DaysRemaining,
    GroupReminder,
    Stats,
    ListGroups,
    SetGroupHelp,
}

/// Подписи кнопок и их действия.
/// Клавиатура и разбор входящего текста строятся из одной таблицы.
pub const MENU_LABELS: &[(&str, MenuAction)] = &[
    ("➕ O'quvchi qo'shish", MenuAction::AddStudent),
    ("💰 To'lov belgilash", MenuAction::MarkPayment),
    ("📋 O'quvchilar ro'yxati", MenuAction::ListStudents),
    ("⏰ Qolgan kunlar", MenuAction::DaysRemaining),
    ("📨 Guruhga to'lovlarni eslatish", MenuAction::GroupReminder),
    ("📊 Statistika", MenuAction::Stats),
    ("📱 Guruhlar ro'yxati", MenuAction::ListGroups),
    ("⚙️ Joriy guruhni o'rnatish", MenuAction::SetGroupHelp),
];

impl MenuAction {
    pub fn from_label(text: &str) -> Option<Self> {
        MENU_LABELS
            .iter()
            .find(|(label, _)| *label == text)
            .map(|(_, action)| *action)
    }
}

/// Главное меню администратора, по две кнопки в ряд.
pub fn main_menu_keyboard() -> ReplyMarkup {
    let rows = MENU_LABELS
        .chunks(2)
        .map(|pair| {
            pair.iter()
                .map(|(label, _)| KeyboardButton::new(*label))
                .collect()
        })
        .collect::<Vec<Vec<_>>>();

    ReplyMarkup::Keyboard(KeyboardMarkup::new(rows).resize_keyboard())
}

/// Даты в сообщениях — в формате ДД.ММ.ГГГГ.
pub fn format_date(date: DateTime<Utc>) -> String {
    date.format("%d.%m.%Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn labels_map_to_actions() {
        assert_eq!(
            MenuAction::from_label("➕ O'quvchi qo'shish"),
            Some(MenuAction::AddStudent)
        );
        assert_eq!(
            MenuAction::from_label("📊 Statistika"),
            Some(MenuAction::Stats)
        );
        assert_eq!(MenuAction::from_label("salom"), None);
        // Подписи сравниваются дословно, вместе с эмодзи
        assert_eq!(MenuAction::from_label("Statistika"), None);
    }

    #[test]
    fn every_label_is_unique() {
        let mut labels: Vec<_> = MENU_LABELS.iter().map(|(label, _)| *label).collect();
        labels.sort_unstable();
        labels.dedup();
        assert_eq!(labels.len(), MENU_LABELS.len());
    }

    #[test]
    fn dates_use_dotted_format() {
        let date = Utc.with_ymd_and_hms(2024, 1, 31, 10, 30, 0).unwrap();
        assert_eq!(format_date(date), "31.01.2024");
    }
}
