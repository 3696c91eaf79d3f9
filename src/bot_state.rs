use std::collections::HashMap;
use std::sync::Arc;

use teloxide::types::UserId;
use tokio::sync::RwLock;

use crate::database::Database;
use crate::models::Dialog;
use crate::scheduler::ReminderScheduler;

type SessionMap = Arc<RwLock<HashMap<UserId, Dialog>>>;

/// Активные диалоги, по одному на оператора.
/// Сессия создается при входе в сценарий, снимается при завершении или сбросе,
/// а новый сценарий просто перезаписывает старую.
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: SessionMap,
}

impl SessionStore {
    pub async fn get(&self, operator: UserId) -> Option<Dialog> {
        self.sessions.read().await.get(&operator).cloned()
    }

    pub async fn set(&self, operator: UserId, dialog: Dialog) {
        self.sessions.write().await.insert(operator, dialog);
    }

    pub async fn clear(&self, operator: UserId) {
        self.sessions.write().await.remove(&operator);
    }
}

#[derive(Clone)]
pub struct BotState {
    pub db: Database,
    pub admin_id: UserId,
    pub sessions: SessionStore,
    pub scheduler: ReminderScheduler,
}

impl BotState {
    pub fn new(db: Database, admin_id: UserId, scheduler: ReminderScheduler) -> Self {
        Self {
            db,
            admin_id,
            sessions: SessionStore::default(),
            scheduler,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AddStudentStep, MarkPaymentStep};

    #[tokio::test]
    async fn session_created_overwritten_and_cleared() {
        let store = SessionStore::default();
        let operator = UserId(1);

        assert_eq!(store.get(operator).await, None);

        store
            .set(operator, Dialog::AddStudent(AddStudentStep::Name))
            .await;
        assert_eq!(
            store.get(operator).await,
            Some(Dialog::AddStudent(AddStudentStep::Name))
        );

        // Новый сценарий вытесняет незавершенный старый
        store
            .set(operator, Dialog::MarkPayment(MarkPaymentStep::SelectStudent))
            .await;
        assert_eq!(
            store.get(operator).await,
            Some(Dialog::MarkPayment(MarkPaymentStep::SelectStudent))
        );

        store.clear(operator).await;
        assert_eq!(store.get(operator).await, None);
    }

    #[tokio::test]
    async fn sessions_are_isolated_per_operator() {
        let store = SessionStore::default();

        store
            .set(UserId(1), Dialog::AddStudent(AddStudentStep::Name))
            .await;
        store
            .set(UserId(2), Dialog::MarkPayment(MarkPaymentStep::SelectStudent))
            .await;

        assert_eq!(
            store.get(UserId(1)).await,
            Some(Dialog::AddStudent(AddStudentStep::Name))
        );
        assert_eq!(
            store.get(UserId(2)).await,
            Some(Dialog::MarkPayment(MarkPaymentStep::SelectStudent))
        );
    }
}
