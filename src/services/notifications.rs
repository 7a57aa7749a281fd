//! Notification dispatcher: email plus in-app inbox.
//!
//! Delivery problems are logged and swallowed; a failed email never undoes
//! the state change that triggered it.

use std::sync::Arc;

use async_trait::async_trait;

use super::email::Mailer;
use crate::{
    error::{AppError, AppResult},
    models::{
        notification::{NewNotification, Notification, OutgoingEmail, TargetKind},
        user::UserShort,
    },
};

/// Storage for in-app notifications
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InboxStore: Send + Sync {
    async fn push(&self, notification: &NewNotification) -> AppResult<()>;
    async fn list(&self, recipient_id: i32, unread_only: bool) -> AppResult<Vec<Notification>>;
    async fn mark_read(&self, id: i32, recipient_id: i32) -> AppResult<bool>;
    async fn mark_all_read(&self, recipient_id: i32) -> AppResult<u64>;
}

/// What actually went out for one event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Delivery {
    pub emailed: bool,
    pub stored: bool,
}

/// One event worth telling somebody about
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Notice {
    pub email: Option<OutgoingEmail>,
    pub in_app: Option<NewNotification>,
}

#[derive(Clone)]
pub struct NotificationService {
    mailer: Arc<dyn Mailer>,
    inbox: Arc<dyn InboxStore>,
}

impl NotificationService {
    pub fn new(mailer: Arc<dyn Mailer>, inbox: Arc<dyn InboxStore>) -> Self {
        Self { mailer, inbox }
    }

    /// Deliver both halves of a notice
    pub async fn dispatch(&self, notice: Notice) -> Delivery {
        let mut delivery = Delivery::default();

        if let Some(email) = notice.email {
            match self.mailer.send(&email.to, &email.subject, &email.body).await {
                Ok(()) => delivery.emailed = true,
                Err(e) => tracing::warn!(to = %email.to, subject = %email.subject, "Email delivery failed: {}", e),
            }
        }

        if let Some(notification) = notice.in_app {
            match self.inbox.push(&notification).await {
                Ok(()) => delivery.stored = true,
                Err(e) => tracing::warn!(
                    recipient_id = notification.recipient_id,
                    "Storing in-app notification failed: {}",
                    e
                ),
            }
        }

        delivery
    }

    /// Send a plain email, reporting failure to the caller
    pub async fn send_email(&self, email: &OutgoingEmail) -> AppResult<()> {
        self.mailer.send(&email.to, &email.subject, &email.body).await
    }

    pub async fn list(&self, recipient_id: i32, unread_only: bool) -> AppResult<Vec<Notification>> {
        self.inbox.list(recipient_id, unread_only).await
    }

    pub async fn mark_read(&self, id: i32, recipient_id: i32) -> AppResult<()> {
        if self.inbox.mark_read(id, recipient_id).await? {
            Ok(())
        } else {
            Err(AppError::NotFound(format!("Notification with id {} not found", id)))
        }
    }

    pub async fn mark_all_read(&self, recipient_id: i32) -> AppResult<u64> {
        self.inbox.mark_all_read(recipient_id).await
    }
}

// ---------------------------------------------------------------------------
// Notice builders
// ---------------------------------------------------------------------------

fn in_app(recipient: &UserShort, actor_id: i32, verb: &str, kind: TargetKind, target_id: i32, description: String) -> NewNotification {
    NewNotification {
        recipient_id: recipient.id,
        actor_id: Some(actor_id),
        verb: verb.to_string(),
        target_kind: kind,
        target_id,
        description,
    }
}

fn email(to: &UserShort, subject: &str, body: String) -> OutgoingEmail {
    OutgoingEmail {
        to: to.email.clone(),
        subject: subject.to_string(),
        body,
    }
}

/// A patron asked the creator for access to a private collection
pub fn access_requested(patron: &UserShort, creator: &UserShort, collection_id: i32, title: &str) -> Notice {
    let description = format!(
        "User {} has requested access to collection '{}'. Please review the request.",
        patron.username, title
    );
    Notice {
        email: Some(email(creator, "New Collection Access Request", description.clone())),
        in_app: Some(in_app(creator, patron.id, "has requested access to", TargetKind::Collection, collection_id, description)),
    }
}

pub fn access_approved(actor_id: i32, patron: &UserShort, collection_id: i32, title: &str) -> Notice {
    let description = format!("Your request for access to collection '{}' has been approved.", title);
    Notice {
        email: Some(email(patron, "Access Request Approved", description.clone())),
        in_app: Some(in_app(patron, actor_id, "has approved your access to", TargetKind::Collection, collection_id, description)),
    }
}

pub fn access_denied(actor_id: i32, patron: &UserShort, collection_id: i32, title: &str) -> Notice {
    Notice {
        email: None,
        in_app: Some(in_app(
            patron,
            actor_id,
            "has denied your access to",
            TargetKind::Collection,
            collection_id,
            format!("Your request for access to collection '{}' was denied.", title),
        )),
    }
}

pub fn borrow_approved(actor_id: i32, patron: &UserShort, lora_id: i32, title: &str, duration: &str) -> Notice {
    let description = format!("Your request to borrow '{}' for {} has been approved.", title, duration);
    Notice {
        email: Some(email(patron, "Borrow Request Approved", description.clone())),
        in_app: Some(in_app(patron, actor_id, "approved your borrow request for", TargetKind::Lora, lora_id, description)),
    }
}

pub fn borrow_denied(actor_id: i32, patron: &UserShort, lora_id: i32, title: &str) -> Notice {
    let description = format!("Your request to borrow '{}' has been denied.", title);
    Notice {
        email: Some(email(patron, "Borrow Request Denied", description.clone())),
        in_app: Some(in_app(patron, actor_id, "denied your borrow request for", TargetKind::Lora, lora_id, description)),
    }
}

pub fn lora_returned(patron: &UserShort, title: &str) -> Notice {
    Notice {
        email: Some(email(
            patron,
            "LoRA Returned",
            format!(
                "Your borrowed LoRA '{}' has been returned successfully and is now available.",
                title
            ),
        )),
        in_app: None,
    }
}

pub fn promoted(actor_id: i32, user: &UserShort) -> Notice {
    Notice {
        email: Some(email(
            user,
            "Role Promotion",
            "Congratulations! You have been promoted to librarian.".to_string(),
        )),
        in_app: Some(in_app(
            user,
            actor_id,
            "has promoted you to",
            TargetKind::User,
            user.id,
            "You have been promoted to librarian.".to_string(),
        )),
    }
}

pub fn due_reminder(patron: &UserShort, title: &str, due: chrono::DateTime<chrono::Utc>) -> OutgoingEmail {
    email(
        patron,
        &format!("Reminder: {} is due soon", title),
        format!(
            "Dear {},\n\nYour borrowed LoRA '{}' is due on {}. Please return it on time.\n\nThank you.",
            patron.username,
            title,
            due.format("%Y-%m-%d %H:%M")
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::Role;
    use crate::services::email::MockMailer;
    use mockall::predicate::*;

    fn patron() -> UserShort {
        UserShort {
            id: 5,
            username: "ada".to_string(),
            email: "ada@example.com".to_string(),
            role: Role::Patron,
        }
    }

    #[tokio::test]
    async fn dispatch_sends_email_and_stores_notification() {
        let mut mailer = MockMailer::new();
        mailer
            .expect_send()
            .with(eq("ada@example.com"), eq("Borrow Request Approved"), always())
            .times(1)
            .returning(|_, _, _| Ok(()));

        let mut inbox = MockInboxStore::new();
        inbox
            .expect_push()
            .withf(|n| n.recipient_id == 5 && n.target_kind == TargetKind::Lora && n.target_id == 42)
            .times(1)
            .returning(|_| Ok(()));

        let service = NotificationService::new(Arc::new(mailer), Arc::new(inbox));
        let delivery = service
            .dispatch(borrow_approved(1, &patron(), 42, "Watercolor", "2d 0h"))
            .await;

        assert_eq!(delivery, Delivery { emailed: true, stored: true });
    }

    #[test]
    fn mail_failure_does_not_stop_in_app_delivery() {
        let mut mailer = MockMailer::new();
        mailer
            .expect_send()
            .returning(|_, _, _| Err(AppError::Internal("smtp down".to_string())));

        let mut inbox = MockInboxStore::new();
        inbox.expect_push().times(1).returning(|_| Ok(()));

        let service = NotificationService::new(Arc::new(mailer), Arc::new(inbox));
        let delivery = tokio_test::block_on(service.dispatch(borrow_denied(1, &patron(), 42, "Watercolor")));

        assert_eq!(delivery, Delivery { emailed: false, stored: true });
    }

    #[tokio::test]
    async fn email_only_notice_skips_inbox() {
        let mut mailer = MockMailer::new();
        mailer.expect_send().times(1).returning(|_, _, _| Ok(()));

        let mut inbox = MockInboxStore::new();
        inbox.expect_push().never();

        let service = NotificationService::new(Arc::new(mailer), Arc::new(inbox));
        let delivery = service.dispatch(lora_returned(&patron(), "Watercolor")).await;

        assert_eq!(delivery, Delivery { emailed: true, stored: false });
    }

    #[tokio::test]
    async fn marking_someone_elses_notification_is_not_found() {
        let mut inbox = MockInboxStore::new();
        inbox.expect_mark_read().with(eq(3), eq(5)).returning(|_, _| Ok(false));

        let service = NotificationService::new(Arc::new(MockMailer::new()), Arc::new(inbox));
        assert!(matches!(service.mark_read(3, 5).await, Err(AppError::NotFound(_))));
    }

    #[test]
    fn access_request_notice_goes_to_creator() {
        let creator = UserShort {
            id: 1,
            username: "curator".to_string(),
            email: "curator@example.com".to_string(),
            role: Role::Librarian,
        };
        let notice = access_requested(&patron(), &creator, 9, "Portraits");

        assert_eq!(notice.email.as_ref().map(|e| e.to.as_str()), Some("curator@example.com"));
        let in_app = notice.in_app.unwrap();
        assert_eq!(in_app.recipient_id, 1);
        assert_eq!(in_app.actor_id, Some(5));
        assert!(in_app.description.contains("ada"));
    }

    #[test]
    fn reminder_mentions_due_date() {
        let due = chrono::DateTime::parse_from_rfc3339("2025-03-01T14:30:00Z")
            .unwrap()
            .with_timezone(&chrono::Utc);
        let email = due_reminder(&patron(), "Watercolor", due);
        assert_eq!(email.subject, "Reminder: Watercolor is due soon");
        assert!(email.body.contains("2025-03-01 14:30"));
    }
}
