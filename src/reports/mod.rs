use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::handlers::utils::format_date;
use crate::models::student::days_left;
use crate::models::{DueBucket, Group, PaymentStatus, Student};

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━";

/// Ученик с назначенной датой оплаты, уже посчитанной в днях.
#[derive(Debug, Clone)]
pub struct DueEntry {
    pub mention: String,
    pub days: i64,
    pub date: DateTime<Utc>,
}

/// Ученики группы, разложенные по четырем категориям срочности.
#[derive(Debug, Default)]
pub struct DueLists {
    pub overdue: Vec<DueEntry>,
    pub due_today: Vec<DueEntry>,
    pub due_soon: Vec<DueEntry>,
    pub current: Vec<DueEntry>,
}

impl DueLists {
    /// «Зеленые» ученики в рассылку не попадают, им напоминать не о чем.
    pub fn has_actionable(&self) -> bool {
        !self.overdue.is_empty() || !self.due_today.is_empty() || !self.due_soon.is_empty()
    }
}

pub fn partition_by_due(students: &[Student], now: DateTime<Utc>) -> DueLists {
    let mut lists = DueLists::default();

    for student in students {
        let Some(next_payment) = student.next_payment else {
            continue;
        };
        let days = days_left(next_payment, now);
        let entry = DueEntry {
            mention: student.mention(),
            days,
            date: next_payment,
        };

        match DueBucket::classify(days) {
            DueBucket::Overdue => lists.overdue.push(entry),
            DueBucket::DueToday => lists.due_today.push(entry),
            DueBucket::DueSoon => lists.due_soon.push(entry),
            DueBucket::Current => lists.current.push(entry),
        }
    }

    // Самые просроченные и самые близкие сроки — первыми
    lists.overdue.sort_by_key(|entry| entry.days);
    lists.due_today.sort_by_key(|entry| entry.days);
    lists.due_soon.sort_by_key(|entry| entry.days);
    lists.current.sort_by_key(|entry| entry.days);

    lists
}

/// Сводное сообщение для рассылки в группу.
/// None, когда напоминать некому — все три «горящие» категории пусты.
pub fn render_group_reminder(due: &DueLists) -> Option<String> {
    if !due.has_actionable() {
        return None;
    }

    let mut message = String::from("📢 OYLIK TO'LOV ESLATMALARI\n");
    message.push_str(RULE);
    message.push_str("\n\n");

    if !due.overdue.is_empty() {
        message.push_str("🔴 MUDDATI O'TGAN:\n\n");
        for entry in &due.overdue {
            message.push_str(&format!(
                "▪️ {}\n   ⚠️ {} kun kechikkan\n   📅 {}\n\n",
                entry.mention,
                -entry.days,
                format_date(entry.date)
            ));
        }
    }

    if !due.due_today.is_empty() {
        message.push_str("🟡 BUGUN TO'LOV:\n\n");
        for entry in &due.due_today {
            message.push_str(&format!(
                "▪️ {}\n   📅 {}\n\n",
                entry.mention,
                format_date(entry.date)
            ));
        }
    }

    if !due.due_soon.is_empty() {
        message.push_str("🟠 YAQIN MUDDAT (7 kun ichida):\n\n");
        for entry in &due.due_soon {
            message.push_str(&format!(
                "▪️ {}\n   ⏰ {} kun qoldi\n   📅 {}\n\n",
                entry.mention,
                entry.days,
                format_date(entry.date)
            ));
        }
    }

    message.push_str(RULE);
    message.push_str("\n💡 To'lovlarni o'z vaqtida amalga oshiring!");

    Some(message)
}

/// Отчет администратору после успешной рассылки.
pub fn render_reminder_report(group_title: &str, due: &DueLists) -> String {
    let total = due.overdue.len() + due.due_today.len() + due.due_soon.len();
    format!(
        "✅ {} guruhiga eslatma yuborildi!\n\n\
         📊 Jami: {} ta o'quvchi\n\
         🔴 Kechikkan: {}\n\
         🟡 Bugun: {}\n\
         🟠 7 kun ichida: {}",
        group_title,
        total,
        due.overdue.len(),
        due.due_today.len(),
        due.due_soon.len()
    )
}

pub fn render_nothing_to_remind(group_title: &str, current_count: usize) -> String {
    format!(
        "ℹ️ {} guruhida eslatish kerak bo'lgan o'quvchi yo'q.\n\n\
         ✅ To'lagan: {} ta\n\
         Barcha o'quvchilar o'z vaqtida to'lovni amalga oshirgan.",
        group_title, current_count
    )
}

/// Полный список учеников со статусами и ближайшими датами.
pub fn render_student_list(
    students: &[Student],
    group_titles: &HashMap<i64, String>,
    now: DateTime<Utc>,
) -> String {
    let mut text = String::from("📋 O'QUVCHILAR RO'YXATI\n");
    text.push_str(RULE);
    text.push_str("\n\n");

    for student in students {
        let glyph = if student.status == PaymentStatus::Paid {
            "✅"
        } else {
            "⚠️"
        };
        let next_date = student
            .next_payment
            .map(format_date)
            .unwrap_or_else(|| "Belgilanmagan".to_string());

        text.push_str(&format!("{} {}\n", glyph, student.name));
        text.push_str(&format!("   🆔 ID: {}\n", student.user_id));
        text.push_str(&format!("   📱 {}\n", student.phone));
        text.push_str(&format!(
            "   📱 Guruh: {}\n",
            group_title(student.group_id, group_titles)
        ));
        text.push_str(&format!("   📅 Keyingi to'lov: {}\n", next_date));

        if let Some(days) = student.days_left(now) {
            let line = match DueBucket::classify(days) {
                DueBucket::Overdue => format!("   🔴 {} kun kechikkan\n", -days),
                DueBucket::DueToday => "   🟡 Bugun to'lov\n".to_string(),
                _ => format!("   ⏰ {} kun qoldi\n", days),
            };
            text.push_str(&line);
        }
        text.push('\n');
    }

    if students.is_empty() {
        text.push_str("Ro'yxat bo'sh");
    } else {
        text.push_str(RULE);
        text.push_str(&format!("\n📊 Jami: {} ta o'quvchi", students.len()));
    }

    text
}

/// Кому сколько осталось до оплаты, от самых горящих к «зеленым».
pub fn render_days_remaining(
    students: &[Student],
    group_titles: &HashMap<i64, String>,
    now: DateTime<Utc>,
) -> String {
    let mut text = String::from("⏰ TO'LOVGA QOLGAN KUNLAR\n");
    text.push_str(RULE);
    text.push_str("\n\n");

    let mut with_dates: Vec<(&Student, i64)> = students
        .iter()
        .filter_map(|student| student.days_left(now).map(|days| (student, days)))
        .collect();
    with_dates.sort_by_key(|(_, days)| *days);

    if with_dates.is_empty() {
        text.push_str("Hech kimga to'lov belgilanmagan");
        return text;
    }

    for (student, days) in &with_dates {
        let (glyph, status) = match DueBucket::classify(*days) {
            DueBucket::Overdue => ("🔴", format!("KECHIKDI ({} kun)", -days)),
            DueBucket::DueToday => ("🟡", "BUGUN TO'LOV".to_string()),
            DueBucket::DueSoon => ("🟠", format!("{} kun qoldi", days)),
            DueBucket::Current => ("🟢", format!("{} kun qoldi", days)),
        };

        text.push_str(&format!("{} {}\n", glyph, student.name));
        text.push_str(&format!("   📱 {}\n", student.phone));
        text.push_str(&format!(
            "   📱 Guruh: {}\n",
            group_title(student.group_id, group_titles)
        ));
        if let Some(next_payment) = student.next_payment {
            text.push_str(&format!("   📅 {}\n", format_date(next_payment)));
        }
        text.push_str(&format!("   ⏱ {}\n\n", status));
    }

    text.push_str(RULE);
    text.push_str(&format!("\n📊 Jami: {} ta o'quvchi", with_dates.len()));

    text
}

/// Общая статистика: категории считаются так же, как в рассылке.
pub fn render_stats(students: &[Student], group_count: usize, now: DateTime<Utc>) -> String {
    let mut overdue = 0usize;
    let mut today = 0usize;
    let mut week = 0usize;
    let mut paid = 0usize;

    for student in students {
        if let Some(days) = student.days_left(now) {
            match DueBucket::classify(days) {
                DueBucket::Overdue => overdue += 1,
                DueBucket::DueToday => today += 1,
                DueBucket::DueSoon => week += 1,
                DueBucket::Current => paid += 1,
            }
        }
    }

    let total = students.len();
    let mut text = String::from("📊 UMUMIY STATISTIKA\n");
    text.push_str(RULE);
    text.push_str("\n\n");
    text.push_str(&format!("👥 Jami o'quvchilar: {} ta\n", total));
    text.push_str(&format!("📱 Guruhlar soni: {} ta\n\n", group_count));
    text.push_str("TO'LOV HOLATI:\n");
    text.push_str(&format!("✅ To'lagan: {} ta\n", paid));
    text.push_str(&format!("🟠 7 kun ichida: {} ta\n", week));
    text.push_str(&format!("🟡 Bugun to'lov: {} ta\n", today));
    text.push_str(&format!("🔴 Kechikkan: {} ta\n\n", overdue));

    if total > 0 {
        let paid_percent = paid as f64 / total as f64 * 100.0;
        text.push_str(&format!("📈 To'lagan foiz: {:.1}%\n", paid_percent));
    }

    text.push_str(RULE);

    text
}

pub fn render_group_list(groups: &[Group], student_counts: &HashMap<i64, i64>) -> String {
    let mut text = String::from("📱 GURUHLAR RO'YXATI\n");
    text.push_str(RULE);
    text.push_str("\n\n");

    for (index, group) in groups.iter().enumerate() {
        let count = student_counts.get(&group.group_id).copied().unwrap_or(0);
        text.push_str(&format!("{}. {}\n", index + 1, group.title));
        text.push_str(&format!("   🆔 ID: {}\n", group.group_id));
        text.push_str(&format!("   👥 O'quvchilar: {} ta\n\n", count));
    }

    if groups.is_empty() {
        text.push_str(
            "Hech qanday guruh topilmadi.\n\n\
             Guruhga botni qo'shing va /setgroup komandasini yuboring.",
        );
    } else {
        text.push_str(RULE);
        text.push_str(&format!("\n📊 Jami: {} ta guruh", groups.len()));
    }

    text
}

/// Список групп перед выбором адресата рассылки.
pub fn render_group_pick_list(groups: &[Group]) -> String {
    let mut text = String::from(
        "📨 GURUHGA TO'LOV ESLATMASI\n\nQaysi guruhga eslatma yuborishni xohlaysiz?\n\n",
    );

    for group in groups {
        text.push_str(&format!(
            "🆔 Guruh ID: {}\n📱 Nomi: {}\n\n",
            group.group_id, group.title
        ));
    }

    text.push_str(RULE);
    text.push_str("\nGuruh ID sini kiriting:");

    text
}

/// Список групп на шаге привязки нового ученика.
pub fn render_group_pick_for_student(groups: &[Group]) -> String {
    let mut text = String::from("📱 GURUHNI TANLANG\n\n");

    for (index, group) in groups.iter().enumerate() {
        text.push_str(&format!(
            "{}. {}\n   🆔 ID: {}\n\n",
            index + 1,
            group.title,
            group.group_id
        ));
    }

    text.push_str(RULE);
    text.push_str("\nO'quvchini qaysi guruhga qo'shmoqchisiz?\nGuruh ID sini kiriting:");

    text
}

/// Список учеников перед выбором, кому отмечать оплату.
pub fn render_payment_pick_list(
    students: &[Student],
    group_titles: &HashMap<i64, String>,
) -> String {
    let mut text = String::from("💰 TO'LOV BELGILASH\n\nO'quvchilar ro'yxati:\n\n");

    for (index, student) in students.iter().enumerate() {
        text.push_str(&format!("{}. {}\n", index + 1, student.name));
        text.push_str(&format!("   🆔 ID: {}\n", student.user_id));
        text.push_str(&format!("   📱 {}\n", student.phone));
        text.push_str(&format!(
            "   📱 Guruh: {}\n\n",
            group_title(student.group_id, group_titles)
        ));
    }

    text.push_str(RULE);
    text.push_str("\nO'quvchining Telegram ID sini kiriting:");

    text
}

fn group_title(group_id: Option<i64>, titles: &HashMap<i64, String>) -> String {
    group_id
        .and_then(|id| titles.get(&id).cloned())
        .unwrap_or_else(|| "Guruhsiz".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn student(user_id: i64, name: &str, days_from_now: Option<i64>) -> Student {
        Student {
            user_id,
            name: name.to_string(),
            phone: "+998900000000".to_string(),
            username: None,
            group_id: Some(10),
            last_payment: None,
            next_payment: days_from_now.map(|days| now() + Duration::days(days)),
            payment_days: None,
            status: PaymentStatus::Active,
            added_date: now(),
        }
    }

    #[test]
    fn partition_is_disjoint_and_sorted() {
        let students = vec![
            student(1, "Olim", Some(-3)),
            student(2, "Karim", Some(0)),
            student(3, "Aziz", Some(2)),
            student(4, "Bek", Some(10)),
            student(5, "Sardor", None),
            student(6, "Jasur", Some(-1)),
        ];

        let due = partition_by_due(&students, now());

        assert_eq!(due.overdue.len(), 2);
        assert_eq!(due.due_today.len(), 1);
        assert_eq!(due.due_soon.len(), 1);
        assert_eq!(due.current.len(), 1);
        // Ученик без даты оплаты не попадает ни в одну категорию
        let placed = due.overdue.len() + due.due_today.len() + due.due_soon.len() + due.current.len();
        assert_eq!(placed, 5);

        // Самая глубокая просрочка первой
        assert_eq!(due.overdue[0].days, -3);
        assert_eq!(due.overdue[1].days, -1);
    }

    #[test]
    fn group_reminder_has_one_section_per_bucket() {
        let students = vec![
            student(1, "Olim", Some(-3)),
            student(2, "Karim", Some(0)),
            student(3, "Aziz", Some(2)),
            student(4, "Bek", Some(10)),
        ];

        let due = partition_by_due(&students, now());
        let message = render_group_reminder(&due).expect("three actionable buckets");

        assert!(message.contains("MUDDATI O'TGAN"));
        assert!(message.contains("Olim"));
        assert!(message.contains("3 kun kechikkan"));

        assert!(message.contains("BUGUN TO'LOV"));
        assert!(message.contains("Karim"));

        assert!(message.contains("YAQIN MUDDAT"));
        assert!(message.contains("Aziz"));
        assert!(message.contains("2 kun qoldi"));

        // «Зеленый» ученик в рассылку не попадает
        assert!(!message.contains("Bek"));
    }

    #[test]
    fn group_reminder_mentions_username_when_known() {
        let mut with_username = student(1, "Olim", Some(-1));
        with_username.username = Some("olim_uz".to_string());

        let due = partition_by_due(&[with_username], now());
        let message = render_group_reminder(&due).unwrap();

        assert!(message.contains("@olim_uz"));
        assert!(!message.contains("▪️ Olim"));
    }

    #[test]
    fn nothing_to_remind_when_everyone_is_current() {
        let students = vec![student(1, "Olim", Some(30)), student(2, "Karim", Some(8))];

        let due = partition_by_due(&students, now());

        assert!(render_group_reminder(&due).is_none());
        let fallback = render_nothing_to_remind("Matematika", due.current.len());
        assert!(fallback.contains("Matematika"));
        assert!(fallback.contains("2 ta"));
    }

    #[test]
    fn reminder_report_counts_buckets() {
        let students = vec![
            student(1, "Olim", Some(-3)),
            student(2, "Karim", Some(0)),
            student(3, "Aziz", Some(2)),
            student(4, "Bek", Some(10)),
        ];

        let due = partition_by_due(&students, now());
        let report = render_reminder_report("Fizika", &due);

        assert!(report.contains("Jami: 3 ta"));
        assert!(report.contains("🔴 Kechikkan: 1"));
        assert!(report.contains("🟡 Bugun: 1"));
        assert!(report.contains("🟠 7 kun ichida: 1"));
    }

    #[test]
    fn days_remaining_is_sorted_ascending() {
        let students = vec![
            student(1, "Olim", Some(15)),
            student(2, "Karim", Some(-2)),
            student(3, "Aziz", Some(3)),
            student(4, "Sardor", None),
        ];

        let text = render_days_remaining(&students, &HashMap::new(), now());

        let karim = text.find("Karim").unwrap();
        let aziz = text.find("Aziz").unwrap();
        let olim = text.find("Olim").unwrap();
        assert!(karim < aziz && aziz < olim);

        // Ученик без даты не учитывается ни в списке, ни в итоге
        assert!(!text.contains("Sardor"));
        assert!(text.contains("Jami: 3 ta"));
    }

    #[test]
    fn stats_counts_buckets_and_percent() {
        let students = vec![
            student(1, "Olim", Some(-3)),
            student(2, "Karim", Some(0)),
            student(3, "Aziz", Some(5)),
            student(4, "Bek", Some(30)),
        ];

        let text = render_stats(&students, 2, now());

        assert!(text.contains("Jami o'quvchilar: 4 ta"));
        assert!(text.contains("Guruhlar soni: 2 ta"));
        assert!(text.contains("✅ To'lagan: 1 ta"));
        assert!(text.contains("🟠 7 kun ichida: 1 ta"));
        assert!(text.contains("🟡 Bugun to'lov: 1 ta"));
        assert!(text.contains("🔴 Kechikkan: 1 ta"));
        assert!(text.contains("To'lagan foiz: 25.0%"));
    }

    #[test]
    fn group_list_shows_student_counts() {
        let groups = vec![
            Group {
                group_id: -100200,
                title: "Matematika".to_string(),
                added_date: now(),
            },
            Group {
                group_id: -100300,
                title: "Fizika".to_string(),
                added_date: now(),
            },
        ];
        let counts = HashMap::from([(-100200_i64, 7_i64)]);

        let text = render_group_list(&groups, &counts);

        assert!(text.contains("1. Matematika"));
        assert!(text.contains("O'quvchilar: 7 ta"));
        assert!(text.contains("2. Fizika"));
        assert!(text.contains("O'quvchilar: 0 ta"));
        assert!(text.contains("Jami: 2 ta guruh"));
    }

    #[test]
    fn empty_roster_and_empty_group_list() {
        let text = render_student_list(&[], &HashMap::new(), now());
        assert!(text.contains("Ro'yxat bo'sh"));

        let text = render_group_list(&[], &HashMap::new());
        assert!(text.contains("Hech qanday guruh topilmadi"));
    }
}
