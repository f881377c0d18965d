//! Physical book exchange: offers, messages and transactions.

use crate::catalog::BookSummary;
use crate::db::{
    Activity, ActivityKind, BookCondition, Database, ExchangeMessage, ExchangeOffer,
    ExchangeTransaction, ExchangeType, Notification, NotificationKind, TransactionStatus,
    now_timestamp,
};
use crate::error::{AppError, Result};
use uuid::Uuid;

/// Exchange service.
pub struct ExchangeService {
    db: Database,
}

impl ExchangeService {
    /// Create a new exchange service.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    // ----- Offers -----

    /// Publish an offer for a physical book.
    pub fn create_offer(
        &self,
        user_id: &str,
        book: BookSummary,
        condition: BookCondition,
        exchange_type: ExchangeType,
        description: Option<String>,
        location: Option<String>,
    ) -> Result<ExchangeOffer> {
        let now = now_timestamp();
        let offer = ExchangeOffer {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            book_id: book.id.clone(),
            book,
            condition,
            description,
            exchange_type,
            location,
            active: true,
            created_at: now,
            updated_at: now,
        };

        self.db.insert_offer(&offer)?;
        self.record_offer_activity(&offer);
        Ok(offer)
    }

    /// Update an offer's editable fields, scoped to its owner.
    pub fn update_offer(
        &self,
        user_id: &str,
        offer_id: &str,
        condition: BookCondition,
        exchange_type: ExchangeType,
        description: Option<String>,
        location: Option<String>,
    ) -> Result<ExchangeOffer> {
        let mut offer = self.owned_offer(user_id, offer_id)?;

        offer.condition = condition;
        offer.exchange_type = exchange_type;
        offer.description = description;
        offer.location = location;
        offer.updated_at = now_timestamp();

        self.db.update_offer(&offer)?;
        Ok(offer)
    }

    /// Hide or re-publish an offer, scoped to its owner.
    pub fn set_offer_active(&self, user_id: &str, offer_id: &str, active: bool) -> Result<()> {
        self.owned_offer(user_id, offer_id)?;
        self.db.set_offer_active(offer_id, user_id, active)?;
        Ok(())
    }

    /// Delete an offer, scoped to its owner.
    pub fn delete_offer(&self, user_id: &str, offer_id: &str) -> Result<()> {
        self.owned_offer(user_id, offer_id)?;
        self.db.delete_offer(offer_id, user_id)?;
        Ok(())
    }

    /// Get an offer by ID.
    pub fn offer(&self, offer_id: &str) -> Result<ExchangeOffer> {
        self.db
            .get_offer(offer_id)?
            .ok_or_else(|| AppError::NotFound(format!("offer {}", offer_id)))
    }

    /// Active offers for a book, newest first.
    pub fn offers_for_book(&self, book_id: &str) -> Result<Vec<ExchangeOffer>> {
        self.db.get_offers_by_book(book_id)
    }

    /// All of a user's own offers, including inactive ones.
    pub fn user_offers(&self, user_id: &str) -> Result<Vec<ExchangeOffer>> {
        self.db.get_user_offers(user_id)
    }

    fn owned_offer(&self, user_id: &str, offer_id: &str) -> Result<ExchangeOffer> {
        let offer = self.offer(offer_id)?;
        if offer.user_id != user_id {
            return Err(AppError::Forbidden(
                "offer belongs to another user".to_string(),
            ));
        }
        Ok(offer)
    }

    // ----- Messages -----

    /// Send a message about an offer.
    ///
    /// The sender must be either the offer's owner or the other party;
    /// the recipient is always the opposite side.
    pub fn send_message(
        &self,
        sender_id: &str,
        offer_id: &str,
        recipient_id: &str,
        body: &str,
    ) -> Result<ExchangeMessage> {
        let body = body.trim();
        if body.is_empty() {
            return Err(AppError::Validation("Message cannot be empty".to_string()));
        }

        let offer = self.offer(offer_id)?;
        if sender_id == recipient_id {
            return Err(AppError::Validation(
                "Cannot message yourself".to_string(),
            ));
        }
        // One side of the conversation is always the offer owner.
        if offer.user_id != sender_id && offer.user_id != recipient_id {
            return Err(AppError::Validation(
                "Message must involve the offer owner".to_string(),
            ));
        }

        let message = ExchangeMessage {
            id: Uuid::new_v4().to_string(),
            offer_id: offer_id.to_string(),
            sender_id: sender_id.to_string(),
            recipient_id: recipient_id.to_string(),
            message: body.to_string(),
            read: false,
            created_at: now_timestamp(),
        };

        self.db.insert_message(&message)?;
        Ok(message)
    }

    /// All messages on an offer, oldest first. Participants only.
    pub fn offer_messages(&self, user_id: &str, offer_id: &str) -> Result<Vec<ExchangeMessage>> {
        let offer = self.offer(offer_id)?;
        let messages = self.db.get_offer_messages(offer_id)?;

        let participates = offer.user_id == user_id
            || messages
                .iter()
                .any(|m| m.sender_id == user_id || m.recipient_id == user_id);
        if !participates {
            return Err(AppError::Forbidden(
                "not a participant in this conversation".to_string(),
            ));
        }

        Ok(messages)
    }

    /// Mark a message as read. Recipient only.
    pub fn mark_message_read(&self, user_id: &str, message_id: &str) -> Result<()> {
        let message = self
            .db
            .get_message(message_id)?
            .ok_or_else(|| AppError::NotFound(format!("message {}", message_id)))?;

        if message.recipient_id != user_id {
            return Err(AppError::Forbidden(
                "message is addressed to another user".to_string(),
            ));
        }

        self.db.mark_message_read(message_id, user_id)?;
        Ok(())
    }

    /// Count a user's unread messages.
    pub fn unread_message_count(&self, user_id: &str) -> Result<i64> {
        self.db.count_unread_messages(user_id)
    }

    // ----- Transactions -----

    /// Request an exchange on an offer.
    pub fn request_exchange(&self, user_id: &str, offer_id: &str) -> Result<ExchangeTransaction> {
        let offer = self.offer(offer_id)?;

        if !offer.active {
            return Err(AppError::Validation(
                "Offer is no longer active".to_string(),
            ));
        }
        if offer.user_id == user_id {
            return Err(AppError::Validation(
                "Cannot exchange with yourself".to_string(),
            ));
        }
        if self.db.get_active_transaction(offer_id, user_id)?.is_some() {
            return Err(AppError::Validation(
                "You already have an open request for this offer".to_string(),
            ));
        }

        let now = now_timestamp();
        let tx = ExchangeTransaction {
            id: Uuid::new_v4().to_string(),
            offer_id: offer_id.to_string(),
            requester_id: user_id.to_string(),
            owner_id: offer.user_id.clone(),
            status: TransactionStatus::Pending,
            transaction_type: offer.exchange_type,
            created_at: now,
            updated_at: now,
            completed_at: None,
        };

        self.db.insert_transaction(&tx)?;
        self.notify(
            &offer.user_id,
            user_id,
            NotificationKind::ExchangeRequest,
            Some(&tx.id),
            &format!("New exchange request for \"{}\"", offer.book.title),
        );

        Ok(tx)
    }

    /// Move a transaction to a new status.
    ///
    /// Pending requests are accepted or rejected by the owner, cancelled
    /// by either side. Accepted ones can be completed or cancelled by
    /// either side. Everything else is invalid.
    pub fn update_transaction_status(
        &self,
        user_id: &str,
        transaction_id: &str,
        new_status: TransactionStatus,
    ) -> Result<ExchangeTransaction> {
        let mut tx = self
            .db
            .get_transaction(transaction_id)?
            .ok_or_else(|| AppError::NotFound(format!("transaction {}", transaction_id)))?;

        let is_owner = tx.owner_id == user_id;
        let is_participant = is_owner || tx.requester_id == user_id;
        if !is_participant {
            return Err(AppError::Forbidden(
                "transaction involves other users".to_string(),
            ));
        }

        use TransactionStatus::*;
        let allowed = match (tx.status, new_status) {
            (Pending, Accepted) | (Pending, Rejected) => is_owner,
            (Pending, Cancelled) => true,
            (Accepted, Completed) | (Accepted, Cancelled) => true,
            _ => false,
        };
        if !allowed {
            return Err(AppError::Validation(format!(
                "Cannot move transaction from {} to {}",
                tx.status.as_str(),
                new_status.as_str()
            )));
        }

        let completed_at = (new_status == Completed).then(now_timestamp);
        self.db
            .update_transaction_status(transaction_id, new_status, completed_at)?;
        tx.status = new_status;
        tx.completed_at = completed_at;
        tx.updated_at = now_timestamp();

        let counterparty = if is_owner {
            tx.requester_id.clone()
        } else {
            tx.owner_id.clone()
        };
        self.notify(
            &counterparty,
            user_id,
            NotificationKind::ExchangeStatus,
            Some(&tx.id),
            &format!("Exchange request is now {}", new_status.as_str()),
        );

        Ok(tx)
    }

    /// All transactions the user participates in, newest first.
    pub fn user_transactions(&self, user_id: &str) -> Result<Vec<ExchangeTransaction>> {
        self.db.list_user_transactions(user_id)
    }

    // ----- Internals -----

    fn record_offer_activity(&self, offer: &ExchangeOffer) {
        let activity = Activity {
            id: Uuid::new_v4().to_string(),
            user_id: offer.user_id.clone(),
            kind: ActivityKind::ExchangeOffer,
            book_id: Some(offer.book_id.clone()),
            book: Some(offer.book.clone()),
            related_id: Some(offer.id.clone()),
            created_at: offer.created_at,
        };

        if let Err(e) = self.db.insert_activity(&activity) {
            tracing::warn!(error = %e, "Failed to record offer activity");
        }
    }

    /// Notifications are best effort, a write failure never fails the
    /// exchange operation itself.
    fn notify(
        &self,
        user_id: &str,
        sender_id: &str,
        kind: NotificationKind,
        related_id: Option<&str>,
        message: &str,
    ) {
        let notification = Notification {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            sender_id: sender_id.to_string(),
            kind,
            related_id: related_id.map(str::to_string),
            message: message.to_string(),
            read: false,
            created_at: now_timestamp(),
        };

        if let Err(e) = self.db.insert_notification(&notification) {
            tracing::warn!(error = %e, "Failed to deliver notification");
        }
    }
}
