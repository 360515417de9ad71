//! Live support chat
//!
//! One session per wallet, created lazily on the first message. A user
//! message flags the session unread for operators; an operator reply
//! clears the flag.

use crate::{BackOffice, Error, Result};
use chrono::Utc;
use ledger_store::{ChatMessage, ChatSender, ChatSession, WalletAddress};

impl BackOffice {
    /// Append a message to a wallet's support session, creating the
    /// session if needed
    pub async fn send_chat_message(
        &self,
        wallet: &str,
        sender: ChatSender,
        text: &str,
    ) -> Result<ChatSession> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::InvalidInput("empty chat message".to_string()));
        }

        let wallet = WalletAddress::new(wallet);
        let mut session = self
            .store()
            .get_chat(&wallet)?
            .unwrap_or_else(|| ChatSession::new(wallet.clone()));

        let now = Utc::now();
        session.messages.push(ChatMessage {
            text: text.to_string(),
            sender,
            timestamp: now,
        });
        session.unread_admin = sender == ChatSender::User;
        session.last_message_at = Some(now);

        let session = self.store().put_chat(session).await?;
        tracing::debug!(wallet = %wallet, ?sender, "Chat message stored");
        Ok(session)
    }

    /// Operator acknowledgment: clear the unread flag on a session
    pub async fn mark_chat_read(&self, token: &str, wallet: &str) -> Result<ChatSession> {
        self.auth().verify(token)?;

        let wallet = WalletAddress::new(wallet);
        let mut session = self
            .store()
            .get_chat(&wallet)?
            .ok_or_else(|| Error::InvalidInput(format!("no chat session for {}", wallet)))?;

        if session.unread_admin {
            session.unread_admin = false;
            session = self.store().put_chat(session).await?;
        }
        Ok(session)
    }

    /// All support sessions, unread first then most recent
    pub fn list_chat_sessions(&self, token: &str) -> Result<Vec<ChatSession>> {
        self.auth().verify(token)?;

        let mut sessions = self.store().list_chats()?;
        sessions.sort_by(|a, b| {
            b.unread_admin
                .cmp(&a.unread_admin)
                .then(b.last_message_at.cmp(&a.last_message_at))
        });
        Ok(sessions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::back_office;

    const ADDR: &str = "0xAb5801a7D398351b8bE11C439e05C5B3259aeC9B";

    #[tokio::test]
    async fn test_session_created_on_first_message() {
        let (office, _temp) = back_office().await;

        let session = office
            .send_chat_message(ADDR, ChatSender::User, "hello?")
            .await
            .unwrap();
        assert_eq!(session.messages.len(), 1);
        assert!(session.unread_admin);
        assert!(session.last_message_at.is_some());

        // Wallet casing maps to the same session
        let session = office
            .send_chat_message(&ADDR.to_ascii_lowercase(), ChatSender::User, "anyone?")
            .await
            .unwrap();
        assert_eq!(session.messages.len(), 2);
    }

    #[tokio::test]
    async fn test_admin_reply_clears_unread() {
        let (office, _temp) = back_office().await;

        office
            .send_chat_message(ADDR, ChatSender::User, "help")
            .await
            .unwrap();
        let session = office
            .send_chat_message(ADDR, ChatSender::Admin, "on it")
            .await
            .unwrap();
        assert!(!session.unread_admin);
        assert_eq!(session.messages.len(), 2);
    }

    #[tokio::test]
    async fn test_mark_read_requires_session_and_token() {
        let (office, _temp) = back_office().await;
        let token = office.test_login();

        office
            .send_chat_message(ADDR, ChatSender::User, "ping")
            .await
            .unwrap();

        assert!(matches!(
            office.mark_chat_read("bogus", ADDR).await,
            Err(Error::Unauthorized)
        ));

        let session = office.mark_chat_read(token.as_str(), ADDR).await.unwrap();
        assert!(!session.unread_admin);

        assert!(office
            .mark_chat_read(token.as_str(), "0xnobody")
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_empty_message_rejected() {
        let (office, _temp) = back_office().await;
        assert!(matches!(
            office.send_chat_message(ADDR, ChatSender::User, "   ").await,
            Err(Error::InvalidInput(_))
        ));
    }
}
