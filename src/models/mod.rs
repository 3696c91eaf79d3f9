pub mod dialog;
pub mod group;
pub mod student;

pub use dialog::{AddStudentStep, Dialog, MarkPaymentStep, SendReminderStep};
pub use group::Group;
pub use student::{DueBucket, PaymentStatus, Student};
