//! Due-date reminder sweep

use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use tokio::task::JoinHandle;

use super::notifications::{self, NotificationService};
use crate::{
    config::RemindersConfig,
    error::AppResult,
    models::user::{UserClaims, UserShort},
    repository::Repository,
};

#[derive(Clone)]
pub struct RemindersService {
    repository: Repository,
    notifications: NotificationService,
    config: RemindersConfig,
}

impl RemindersService {
    pub fn new(repository: Repository, notifications: NotificationService, config: RemindersConfig) -> Self {
        Self {
            repository,
            notifications,
            config,
        }
    }

    /// Email every patron whose LoRA falls due within the window. A record is
    /// marked reminded only when its email went out. Returns the number sent.
    pub async fn sweep(&self) -> AppResult<u32> {
        let now = Utc::now();
        let window = Duration::hours(self.config.window_hours);
        let due = self.repository.borrows.due_for_reminder(now, window).await?;

        let mut sent = 0;
        for row in due {
            if !row.item.needs_reminder(now, window) {
                continue;
            }

            let patron: UserShort = match self.repository.users.get_by_id(row.item.patron_id).await {
                Ok(user) => user.into(),
                Err(e) => {
                    tracing::warn!(borrowed_id = row.item.id, "Skipping reminder: {}", e);
                    continue;
                }
            };
            let email = notifications::due_reminder(&patron, &row.lora_title, row.item.due_date());

            match self.notifications.send_email(&email).await {
                Ok(()) => {
                    self.repository.borrows.mark_reminder_sent(row.item.id).await?;
                    sent += 1;
                }
                Err(e) => tracing::warn!(
                    borrowed_id = row.item.id,
                    patron_id = patron.id,
                    "Failed to send due reminder: {}",
                    e
                ),
            }
        }

        if sent > 0 {
            tracing::info!(sent, "Sent due-date reminders");
        }
        Ok(sent)
    }

    /// Librarian-triggered sweep
    pub async fn sweep_now(&self, claims: &UserClaims) -> AppResult<u32> {
        claims.require_librarian()?;
        self.sweep().await
    }

    /// Run the sweep periodically in the background
    pub fn spawn(self) -> Option<JoinHandle<()>> {
        if !self.config.enabled {
            tracing::info!("Due-date reminders disabled");
            return None;
        }

        let period = StdDuration::from_secs(self.config.interval_minutes.max(1) * 60);
        tracing::info!(
            interval_minutes = self.config.interval_minutes,
            window_hours = self.config.window_hours,
            "Starting due-date reminder task"
        );

        Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if let Err(e) = self.sweep().await {
                    tracing::error!("Reminder sweep failed: {}", e);
                }
            }
        }))
    }
}
