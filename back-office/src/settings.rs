//! Site settings and event administration
//!
//! Settings live in one versioned singleton. Event CRUD reads the
//! current settings, edits the event list, and writes the whole record
//! back through the store's compare-and-swap path; a concurrent admin
//! edit surfaces as a version conflict instead of being overwritten.

use crate::{BackOffice, Error, Result};
use ledger_store::{AppEvent, SiteSettings, UserStatus};
use uuid::Uuid;

impl BackOffice {
    /// Current site settings. Public read, no token required.
    pub fn get_site_settings(&self) -> Result<SiteSettings> {
        Ok(self.store().get_settings()?)
    }

    /// Replace the site settings wholesale
    pub async fn update_site_settings(
        &self,
        token: &str,
        settings: SiteSettings,
    ) -> Result<SiteSettings> {
        self.auth().verify(token)?;
        let settings = self.store().put_settings(settings).await?;
        tracing::info!("Site settings updated");
        Ok(settings)
    }

    /// Add a scheduled event
    pub async fn add_event(&self, token: &str, event: AppEvent) -> Result<SiteSettings> {
        self.auth().verify(token)?;

        let mut settings = self.store().get_settings()?;
        settings.events.push(event);
        Ok(self.store().put_settings(settings).await?)
    }

    /// Update a scheduled event in place, matched by id
    pub async fn update_event(&self, token: &str, event: AppEvent) -> Result<SiteSettings> {
        self.auth().verify(token)?;

        let mut settings = self.store().get_settings()?;
        let slot = settings
            .events
            .iter_mut()
            .find(|e| e.id == event.id)
            .ok_or_else(|| Error::EventNotFound(event.id.clone()))?;
        *slot = event;
        Ok(self.store().put_settings(settings).await?)
    }

    /// Delete a scheduled event by id
    pub async fn delete_event(&self, token: &str, event_id: &str) -> Result<SiteSettings> {
        self.auth().verify(token)?;

        let mut settings = self.store().get_settings()?;
        let before = settings.events.len();
        settings.events.retain(|e| e.id != event_id);
        if settings.events.len() == before {
            return Err(Error::EventNotFound(event_id.to_string()));
        }
        Ok(self.store().put_settings(settings).await?)
    }

    /// Administrative change of a user's account status
    pub async fn update_user_status(
        &self,
        token: &str,
        user_id: Uuid,
        status: UserStatus,
    ) -> Result<()> {
        self.auth().verify(token)?;

        let mut user = self
            .store()
            .list_users()?
            .into_iter()
            .find(|u| u.id == user_id)
            .ok_or_else(|| ledger_store::Error::UserNotFound(user_id.to_string()))?;

        user.status = status;
        let user = self.store().put_user(user).await?;
        tracing::info!(wallet = %user.wallet_address, ?status, "User status updated");
        Ok(())
    }
}
