use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for customer records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClientId(pub String);

/// Identifier wrapper for card applications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

/// Identifier wrapper for production batches.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BatchId(pub String);

/// Identifier wrapper for issued cards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CardId(pub String);

/// Application states; `IN_BATCH` is entered only through batch membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    New,
    InReview,
    Approved,
    Rejected,
    InBatch,
}

impl ApplicationStatus {
    pub const fn code(self) -> &'static str {
        match self {
            ApplicationStatus::New => "NEW",
            ApplicationStatus::InReview => "IN_REVIEW",
            ApplicationStatus::Approved => "APPROVED",
            ApplicationStatus::Rejected => "REJECTED",
            ApplicationStatus::InBatch => "IN_BATCH",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "NEW" => Some(Self::New),
            "IN_REVIEW" => Some(Self::InReview),
            "APPROVED" => Some(Self::Approved),
            "REJECTED" => Some(Self::Rejected),
            "IN_BATCH" => Some(Self::InBatch),
            _ => None,
        }
    }

    /// A decision may be recorded only before one has been taken.
    pub const fn accepts_decision(self) -> bool {
        matches!(self, ApplicationStatus::New | ApplicationStatus::InReview)
    }

    /// A card may exist only after approval.
    pub const fn allows_card(self) -> bool {
        matches!(self, ApplicationStatus::Approved | ApplicationStatus::InBatch)
    }
}

/// Batch states; card issuance is a separate action gated on `RECEIVED`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchStatus {
    Created,
    Sent,
    Received,
}

impl BatchStatus {
    pub const fn code(self) -> &'static str {
        match self {
            BatchStatus::Created => "CREATED",
            BatchStatus::Sent => "SENT",
            BatchStatus::Received => "RECEIVED",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "CREATED" => Some(Self::Created),
            "SENT" => Some(Self::Sent),
            "RECEIVED" => Some(Self::Received),
            _ => None,
        }
    }

    /// The only legal forward step, if any.
    pub const fn next(self) -> Option<Self> {
        match self {
            BatchStatus::Created => Some(BatchStatus::Sent),
            BatchStatus::Sent => Some(BatchStatus::Received),
            BatchStatus::Received => None,
        }
    }
}

/// Card states; `CLOSED` is an administrative terminal reachable from any
/// other state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CardStatus {
    Created,
    Issued,
    Delivered,
    Handed,
    Activated,
    Closed,
}

impl CardStatus {
    pub const fn code(self) -> &'static str {
        match self {
            CardStatus::Created => "CREATED",
            CardStatus::Issued => "ISSUED",
            CardStatus::Delivered => "DELIVERED",
            CardStatus::Handed => "HANDED",
            CardStatus::Activated => "ACTIVATED",
            CardStatus::Closed => "CLOSED",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "CREATED" => Some(Self::Created),
            "ISSUED" => Some(Self::Issued),
            "DELIVERED" => Some(Self::Delivered),
            "HANDED" => Some(Self::Handed),
            "ACTIVATED" => Some(Self::Activated),
            "CLOSED" => Some(Self::Closed),
            _ => None,
        }
    }

    /// The only event accepted from this state, if any.
    pub const fn next_event(self) -> Option<CardEvent> {
        match self {
            CardStatus::Created => Some(CardEvent::Issued),
            CardStatus::Issued => Some(CardEvent::Delivered),
            CardStatus::Delivered => Some(CardEvent::Handed),
            CardStatus::Handed => Some(CardEvent::Activated),
            CardStatus::Activated | CardStatus::Closed => None,
        }
    }
}

/// Lifecycle events a card accepts, strictly in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardEvent {
    Issued,
    Delivered,
    Handed,
    Activated,
}

impl CardEvent {
    pub const fn label(self) -> &'static str {
        match self {
            CardEvent::Issued => "issued",
            CardEvent::Delivered => "delivered",
            CardEvent::Handed => "handed",
            CardEvent::Activated => "activated",
        }
    }

    const fn resulting_status(self) -> CardStatus {
        match self {
            CardEvent::Issued => CardStatus::Issued,
            CardEvent::Delivered => CardStatus::Delivered,
            CardEvent::Handed => CardStatus::Handed,
            CardEvent::Activated => CardStatus::Activated,
        }
    }
}

/// Outcome requested for an application under review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approve,
    Reject,
}

/// Customer record; inert data referenced by applications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub full_name: String,
    pub phone: String,
    pub email: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub doc_number: String,
    pub doc_issue_date: Option<NaiveDate>,
    pub doc_issuer: Option<String>,
    pub reg_address: Option<String>,
    pub fact_address: Option<String>,
    pub segment: Option<String>,
    pub kyc_status: Option<String>,
    pub risk_level: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One request to issue a card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub application_no: String,
    pub client_id: ClientId,
    pub product_id: u32,
    pub tariff_id: u32,
    pub channel_id: u32,
    pub branch_id: u32,
    pub delivery_method_id: u32,
    pub status: ApplicationStatus,
    pub priority: Option<String>,
    pub embossing_name: Option<String>,
    pub delivery_address: Option<String>,
    pub delivery_comment: Option<String>,
    pub comment: Option<String>,
    pub requested_at: DateTime<Utc>,
    pub planned_issue_date: Option<NaiveDate>,
    pub kyc_score: Option<u16>,
    pub kyc_result: Option<String>,
    pub reject_reason_id: Option<u32>,
    pub decision_at: Option<DateTime<Utc>>,
    pub decision_by: Option<String>,
    pub batch_id: Option<BatchId>,
    pub card_id: Option<CardId>,
}

/// One application inside a batch, optionally linked to its card once issued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchItem {
    pub application_id: ApplicationId,
    pub card_id: Option<CardId>,
}

/// A shipment of cards to and from a production vendor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub id: BatchId,
    pub batch_no: String,
    pub vendor_id: u32,
    pub status: BatchStatus,
    pub planned_send_at: Option<NaiveDate>,
    pub sent_at: Option<DateTime<Utc>>,
    pub received_at: Option<DateTime<Utc>>,
    pub items: Vec<BatchItem>,
    pub created_at: DateTime<Utc>,
}

impl Batch {
    pub fn contains(&self, application_id: &ApplicationId) -> bool {
        self.items.iter().any(|item| &item.application_id == application_id)
    }

    /// Advance to `target`, stamping the matching timestamp the first time
    /// the transition fires.
    pub fn set_status(
        &mut self,
        target: BatchStatus,
        now: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        if self.status.next() != Some(target) {
            return Err(TransitionError {
                entity: "batch",
                id: self.id.0.clone(),
                current: self.status.code(),
                operation: match target {
                    BatchStatus::Created => "set status CREATED",
                    BatchStatus::Sent => "set status SENT",
                    BatchStatus::Received => "set status RECEIVED",
                },
            });
        }

        self.status = target;
        match target {
            BatchStatus::Sent => {
                self.sent_at.get_or_insert(now);
            }
            BatchStatus::Received => {
                self.received_at.get_or_insert(now);
            }
            BatchStatus::Created => {}
        }
        Ok(())
    }
}

/// The physical card tracked from creation to activation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub card_no: String,
    pub pan_masked: String,
    pub expiry_month: u8,
    pub expiry_year: u16,
    pub application_id: ApplicationId,
    pub batch_id: Option<BatchId>,
    pub status: CardStatus,
    pub created_at: DateTime<Utc>,
    pub issued_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub handed_at: Option<DateTime<Utc>>,
    pub activated_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl Card {
    /// Apply the next lifecycle event. Only the event matching the card's
    /// current state is accepted; the timestamp is stamped exactly once.
    pub fn apply_event(
        &mut self,
        event: CardEvent,
        now: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        if self.status.next_event() != Some(event) {
            return Err(TransitionError {
                entity: "card",
                id: self.id.0.clone(),
                current: self.status.code(),
                operation: event.label(),
            });
        }

        self.status = event.resulting_status();
        let slot = match event {
            CardEvent::Issued => &mut self.issued_at,
            CardEvent::Delivered => &mut self.delivered_at,
            CardEvent::Handed => &mut self.handed_at,
            CardEvent::Activated => &mut self.activated_at,
        };
        slot.get_or_insert(now);
        Ok(())
    }

    /// Administrative closure, legal from every state but `CLOSED` itself.
    pub fn close(&mut self, now: DateTime<Utc>) -> Result<(), TransitionError> {
        if self.status == CardStatus::Closed {
            return Err(TransitionError {
                entity: "card",
                id: self.id.0.clone(),
                current: self.status.code(),
                operation: "close",
            });
        }
        self.status = CardStatus::Closed;
        self.closed_at.get_or_insert(now);
        Ok(())
    }
}

/// Raised when an operation is not legal from the entity's current state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} {id} cannot {operation} from status {current}")]
pub struct TransitionError {
    pub entity: &'static str,
    pub id: String,
    pub current: &'static str,
    pub operation: &'static str,
}
