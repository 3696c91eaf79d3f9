/// Активный многошаговый сценарий администратора.
/// Промежуточные значения живут прямо в вариантах шага, так что
/// незавершенный диалог не оставляет следов нигде, кроме сессии.
#[derive(Debug, Clone, PartialEq)]
pub enum Dialog {
    AddStudent(AddStudentStep),
    MarkPayment(MarkPaymentStep),
    SendReminder(SendReminderStep),
}

/// Шаги сценария «добавить ученика»: имя → телефон → Telegram ID → группа.
#[derive(Debug, Clone, PartialEq)]
pub enum AddStudentStep {
    Name,
    Phone { name: String },
    UserId { name: String, phone: String },
    Group { name: String, phone: String, user_id: i64 },
}

/// Шаги сценария «отметить оплату»: выбор ученика → срок в днях.
#[derive(Debug, Clone, PartialEq)]
pub enum MarkPaymentStep {
    SelectStudent,
    PaymentDays { user_id: i64 },
}

/// Единственный шаг сценария рассылки напоминаний: выбор группы.
#[derive(Debug, Clone, PartialEq)]
pub enum SendReminderStep {
    SelectGroup,
}
