//! PostgreSQL implementation of the storage interface.
//!
//! Uses `sqlx::PgPool` with plain queries and manual row mapping. The
//! agreement formation path runs inside one transaction with `FOR UPDATE`
//! row locks so concurrent acceptance attempts on the same request are
//! linearized: the loser re-reads the offer under the lock, observes it is
//! no longer pending, and fails with a conflict instead of producing a
//! second loan.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{AgreementTerms, LoanStore, LoanTransition};
use crate::domain::loan_request::UnknownStatus;
use crate::domain::{
    CondoId, Loan, LoanId, LoanOffer, LoanRequest, LoanStatus, OfferId, OfferStatus, RequestId,
    RequestStatus, UserId,
};
use crate::error::MarketError;

type RequestRow = (
    Uuid,
    Uuid,
    Uuid,
    String,
    Option<String>,
    String,
    DateTime<Utc>,
);

type OfferRow = (Uuid, Uuid, Uuid, String, DateTime<Utc>);

type LoanRow = (
    Uuid,
    Uuid,
    Uuid,
    Uuid,
    Uuid,
    NaiveDate,
    String,
    String,
    String,
    Option<DateTime<Utc>>,
    Option<DateTime<Utc>>,
    Option<String>,
    Option<String>,
    DateTime<Utc>,
    DateTime<Utc>,
);

const LOAN_COLUMNS: &str = "id, loan_request_id, offer_id, owner_id, borrower_id, \
     agreed_return_date, digital_term, handover_photo_url, status, handover_date, \
     actual_return_date, return_condition_notes, return_photo_url, created_at, updated_at";

/// PostgreSQL-backed [`LoanStore`] using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new store with the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Runs the embedded migrations.
    ///
    /// # Errors
    ///
    /// Returns a [`MarketError::Persistence`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), MarketError> {
        sqlx::migrate!()
            .run(&self.pool)
            .await
            .map_err(|e| MarketError::Persistence(e.to_string()))
    }
}

fn map_request(row: RequestRow) -> Result<LoanRequest, MarketError> {
    let (id, requester_id, condo_id, title, description, status, created_at) = row;
    let status: RequestStatus = status
        .parse()
        .map_err(|e: UnknownStatus| MarketError::Internal(e.to_string()))?;
    Ok(LoanRequest {
        id: RequestId::from_uuid(id),
        requester_id: UserId::from_uuid(requester_id),
        condo_id: CondoId::from_uuid(condo_id),
        title,
        description,
        status,
        created_at,
    })
}

fn map_offer(row: OfferRow) -> Result<LoanOffer, MarketError> {
    let (id, loan_request_id, offerer_id, status, created_at) = row;
    let status: OfferStatus = status
        .parse()
        .map_err(|e: UnknownStatus| MarketError::Internal(e.to_string()))?;
    Ok(LoanOffer {
        id: OfferId::from_uuid(id),
        loan_request_id: RequestId::from_uuid(loan_request_id),
        offerer_id: UserId::from_uuid(offerer_id),
        status,
        created_at,
    })
}

fn map_loan(row: LoanRow) -> Result<Loan, MarketError> {
    let (
        id,
        loan_request_id,
        offer_id,
        owner_id,
        borrower_id,
        agreed_return_date,
        digital_term,
        handover_photo_url,
        status,
        handover_date,
        actual_return_date,
        return_condition_notes,
        return_photo_url,
        created_at,
        updated_at,
    ) = row;
    let status: LoanStatus = status
        .parse()
        .map_err(|e: UnknownStatus| MarketError::Internal(e.to_string()))?;
    Ok(Loan {
        id: LoanId::from_uuid(id),
        loan_request_id: RequestId::from_uuid(loan_request_id),
        offer_id: OfferId::from_uuid(offer_id),
        owner_id: UserId::from_uuid(owner_id),
        borrower_id: UserId::from_uuid(borrower_id),
        agreed_return_date,
        digital_term,
        handover_photo_url,
        status,
        handover_date,
        actual_return_date,
        return_condition_notes,
        return_photo_url,
        created_at,
        updated_at,
    })
}

#[async_trait]
impl LoanStore for PostgresStore {
    async fn insert_request(&self, request: &LoanRequest) -> Result<(), MarketError> {
        sqlx::query(
            "INSERT INTO loan_requests \
             (id, requester_id, condo_id, title, description, status, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(request.id.as_uuid())
        .bind(request.requester_id.as_uuid())
        .bind(request.condo_id.as_uuid())
        .bind(&request.title)
        .bind(&request.description)
        .bind(request.status.as_str())
        .bind(request.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_open_requests(
        &self,
        condo_id: CondoId,
        excluding: UserId,
    ) -> Result<Vec<LoanRequest>, MarketError> {
        let rows = sqlx::query_as::<_, RequestRow>(
            "SELECT id, requester_id, condo_id, title, description, status, created_at \
             FROM loan_requests \
             WHERE condo_id = $1 AND status = 'open' AND requester_id <> $2 \
             ORDER BY created_at DESC",
        )
        .bind(condo_id.as_uuid())
        .bind(excluding.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(map_request).collect()
    }

    async fn get_request(&self, id: RequestId) -> Result<Option<LoanRequest>, MarketError> {
        let row = sqlx::query_as::<_, RequestRow>(
            "SELECT id, requester_id, condo_id, title, description, status, created_at \
             FROM loan_requests WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(map_request).transpose()
    }

    async fn cancel_request(&self, id: RequestId) -> Result<Option<LoanRequest>, MarketError> {
        let row = sqlx::query_as::<_, RequestRow>(
            "UPDATE loan_requests SET status = 'cancelled' \
             WHERE id = $1 AND status = 'open' \
             RETURNING id, requester_id, condo_id, title, description, status, created_at",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(map_request).transpose()
    }

    async fn insert_offer(&self, offer: &LoanOffer) -> Result<(), MarketError> {
        let mut tx = self.pool.begin().await?;

        // Share-lock the parent request so this insert serializes against
        // a concurrent formation's FOR UPDATE: whichever lands second
        // re-reads the committed status and loses cleanly.
        let row = sqlx::query_as::<_, (String,)>(
            "SELECT status FROM loan_requests WHERE id = $1 FOR SHARE",
        )
        .bind(offer.loan_request_id.as_uuid())
        .fetch_optional(&mut *tx)
        .await?;

        match row {
            None => return Err(MarketError::RequestNotFound(offer.loan_request_id)),
            Some((status,)) if status != RequestStatus::Open.as_str() => {
                return Err(MarketError::RequestClosed(offer.loan_request_id));
            }
            Some(_) => {}
        }

        sqlx::query(
            "INSERT INTO loan_offers (id, loan_request_id, offerer_id, status, created_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(offer.id.as_uuid())
        .bind(offer.loan_request_id.as_uuid())
        .bind(offer.offerer_id.as_uuid())
        .bind(offer.status.as_str())
        .bind(offer.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn offers_for_request(&self, id: RequestId) -> Result<Vec<LoanOffer>, MarketError> {
        let rows = sqlx::query_as::<_, OfferRow>(
            "SELECT id, loan_request_id, offerer_id, status, created_at \
             FROM loan_offers WHERE loan_request_id = $1 ORDER BY created_at ASC",
        )
        .bind(id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(map_offer).collect()
    }

    async fn form_agreement(
        &self,
        offer_id: OfferId,
        acting_user_id: UserId,
        terms: AgreementTerms,
    ) -> Result<Loan, MarketError> {
        let mut tx = self.pool.begin().await?;

        // Lock the offer and its parent request so competing formation
        // attempts on the same request serialize here. The status check
        // below reads the locked rows, not a stale snapshot.
        let row = sqlx::query_as::<_, (Uuid, Uuid, String, Uuid, Uuid, String)>(
            "SELECT o.id, o.offerer_id, o.status, r.id, r.requester_id, r.status \
             FROM loan_offers o \
             JOIN loan_requests r ON r.id = o.loan_request_id \
             WHERE o.id = $1 \
             FOR UPDATE OF o, r",
        )
        .bind(offer_id.as_uuid())
        .fetch_optional(&mut *tx)
        .await?;

        let Some((_, offerer_id, offer_status, request_id, requester_id, request_status)) = row
        else {
            return Err(MarketError::OfferNotFound(offer_id));
        };

        if requester_id != *acting_user_id.as_uuid() {
            return Err(MarketError::Permission(
                "only the original requester may accept an offer".into(),
            ));
        }
        if offer_status != OfferStatus::Pending.as_str()
            || request_status != RequestStatus::Open.as_str()
        {
            return Err(MarketError::OfferUnavailable(offer_id));
        }

        let accepted = sqlx::query(
            "UPDATE loan_offers SET status = 'accepted' WHERE id = $1 AND status = 'pending'",
        )
        .bind(offer_id.as_uuid())
        .execute(&mut *tx)
        .await?;
        if accepted.rows_affected() != 1 {
            return Err(MarketError::OfferUnavailable(offer_id));
        }

        sqlx::query(
            "UPDATE loan_offers SET status = 'rejected' \
             WHERE loan_request_id = $1 AND status = 'pending'",
        )
        .bind(request_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE loan_requests SET status = 'fulfilled' WHERE id = $1")
            .bind(request_id)
            .execute(&mut *tx)
            .await?;

        let now = Utc::now();
        let loan = Loan {
            id: LoanId::new(),
            loan_request_id: RequestId::from_uuid(request_id),
            offer_id,
            owner_id: UserId::from_uuid(offerer_id),
            borrower_id: UserId::from_uuid(requester_id),
            agreed_return_date: terms.agreed_return_date,
            digital_term: terms.digital_term,
            handover_photo_url: terms.handover_photo_url,
            status: LoanStatus::PendingHandover,
            handover_date: None,
            actual_return_date: None,
            return_condition_notes: None,
            return_photo_url: None,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            "INSERT INTO loans \
             (id, loan_request_id, offer_id, owner_id, borrower_id, agreed_return_date, \
              digital_term, handover_photo_url, status, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(loan.id.as_uuid())
        .bind(loan.loan_request_id.as_uuid())
        .bind(loan.offer_id.as_uuid())
        .bind(loan.owner_id.as_uuid())
        .bind(loan.borrower_id.as_uuid())
        .bind(loan.agreed_return_date)
        .bind(&loan.digital_term)
        .bind(&loan.handover_photo_url)
        .bind(loan.status.as_str())
        .bind(loan.created_at)
        .bind(loan.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(loan)
    }

    async fn get_loan(&self, id: LoanId) -> Result<Option<Loan>, MarketError> {
        let row = sqlx::query_as::<_, LoanRow>(&format!(
            "SELECT {LOAN_COLUMNS} FROM loans WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(map_loan).transpose()
    }

    async fn loans_for_user(
        &self,
        user_id: UserId,
    ) -> Result<(Vec<Loan>, Vec<Loan>), MarketError> {
        let lent = sqlx::query_as::<_, LoanRow>(&format!(
            "SELECT {LOAN_COLUMNS} FROM loans WHERE owner_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        let borrowed = sqlx::query_as::<_, LoanRow>(&format!(
            "SELECT {LOAN_COLUMNS} FROM loans WHERE borrower_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        Ok((
            lent.into_iter().map(map_loan).collect::<Result<_, _>>()?,
            borrowed
                .into_iter()
                .map(map_loan)
                .collect::<Result<_, _>>()?,
        ))
    }

    async fn apply_transition(
        &self,
        id: LoanId,
        transition: &LoanTransition,
    ) -> Result<Option<Loan>, MarketError> {
        let row = match transition {
            LoanTransition::ConfirmHandover => {
                sqlx::query_as::<_, LoanRow>(&format!(
                    "UPDATE loans \
                     SET status = 'active', handover_date = now(), updated_at = now() \
                     WHERE id = $1 AND status = 'pending_handover' \
                     RETURNING {LOAN_COLUMNS}"
                ))
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await?
            }
            LoanTransition::InitiateReturn {
                condition_notes,
                return_photo_url,
            } => {
                sqlx::query_as::<_, LoanRow>(&format!(
                    "UPDATE loans \
                     SET status = 'pending_return_confirmation', \
                         return_condition_notes = $2, return_photo_url = $3, \
                         updated_at = now() \
                     WHERE id = $1 AND status = 'active' \
                     RETURNING {LOAN_COLUMNS}"
                ))
                .bind(id.as_uuid())
                .bind(condition_notes)
                .bind(return_photo_url)
                .fetch_optional(&self.pool)
                .await?
            }
            LoanTransition::ConfirmReturn => {
                sqlx::query_as::<_, LoanRow>(&format!(
                    "UPDATE loans \
                     SET status = 'returned', actual_return_date = now(), updated_at = now() \
                     WHERE id = $1 AND status = 'pending_return_confirmation' \
                     RETURNING {LOAN_COLUMNS}"
                ))
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await?
            }
            LoanTransition::RaiseDispute => {
                sqlx::query_as::<_, LoanRow>(&format!(
                    "UPDATE loans SET status = 'disputed', updated_at = now() \
                     WHERE id = $1 AND status NOT IN ('returned', 'disputed') \
                     RETURNING {LOAN_COLUMNS}"
                ))
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await?
            }
        };

        row.map(map_loan).transpose()
    }
}
