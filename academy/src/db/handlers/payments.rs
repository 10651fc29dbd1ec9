//! Database repository for recorded payments.

use crate::db::{
    errors::Result,
    models::payments::{PaymentCreateDBRequest, PaymentDBResponse, PaymentWithCustomer},
};
use crate::types::abbrev_uuid;
use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use tracing::instrument;

/// Totals over a set of payments
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, sqlx::FromRow)]
pub struct PaymentTotals {
    /// Sum of amounts in cents
    pub amount_cents: i64,
    pub count: i64,
    pub succeeded: i64,
    pub unique_customers: i64,
}

pub struct Payments<'c> {
    db: &'c mut PgConnection,
}

const PAYMENT_WITH_CUSTOMER: &str = r#"
    SELECT pay.*, p.email, p.full_name, c.title AS course_title
    FROM payments pay
    LEFT JOIN profiles p ON p.id = pay.user_id
    LEFT JOIN courses c ON c.id = pay.course_id
"#;

impl<'c> Payments<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request), fields(user_id = %abbrev_uuid(&request.user_id), amount = request.amount), err)]
    pub async fn create(&mut self, request: &PaymentCreateDBRequest) -> Result<PaymentDBResponse> {
        let payment = sqlx::query_as::<_, PaymentDBResponse>(
            r#"
            INSERT INTO payments (user_id, course_id, amount, currency, payment_intent_id, status, payment_method, coupon_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(request.user_id)
        .bind(request.course_id)
        .bind(request.amount)
        .bind(&request.currency)
        .bind(&request.payment_intent_id)
        .bind(&request.status)
        .bind(&request.payment_method)
        .bind(request.coupon_id)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(payment)
    }

    #[instrument(skip(self), err)]
    pub async fn get_by_intent(&mut self, payment_intent_id: &str) -> Result<Option<PaymentDBResponse>> {
        let payment = sqlx::query_as::<_, PaymentDBResponse>("SELECT * FROM payments WHERE payment_intent_id = $1")
            .bind(payment_intent_id)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(payment)
    }

    /// Set the status of the payment for an intent. Returns `None` when no payment was recorded.
    #[instrument(skip(self), err)]
    pub async fn set_status_by_intent(&mut self, payment_intent_id: &str, status: &str) -> Result<Option<PaymentDBResponse>> {
        let payment = sqlx::query_as::<_, PaymentDBResponse>("UPDATE payments SET status = $2 WHERE payment_intent_id = $1 RETURNING *")
            .bind(payment_intent_id)
            .bind(status)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(payment)
    }

    /// Payments with payer and course names, newest first, optionally limited to those since a time
    #[instrument(skip(self), err)]
    pub async fn list_with_customers(&mut self, since: Option<DateTime<Utc>>, limit: Option<i64>) -> Result<Vec<PaymentWithCustomer>> {
        let rows = sqlx::query_as::<_, PaymentWithCustomer>(&format!(
            "{PAYMENT_WITH_CUSTOMER} WHERE ($1::timestamptz IS NULL OR pay.created_at >= $1) ORDER BY pay.created_at DESC LIMIT $2"
        ))
        .bind(since)
        .bind(limit)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(rows)
    }

    #[instrument(skip(self), err)]
    pub async fn totals(&mut self, since: Option<DateTime<Utc>>) -> Result<PaymentTotals> {
        let totals = sqlx::query_as::<_, PaymentTotals>(
            r#"
            SELECT
                COALESCE(SUM(amount), 0)::BIGINT AS amount_cents,
                COUNT(*) AS count,
                COUNT(*) FILTER (WHERE status = 'succeeded') AS succeeded,
                COUNT(DISTINCT user_id) AS unique_customers
            FROM payments
            WHERE ($1::timestamptz IS NULL OR created_at >= $1)
            "#,
        )
        .bind(since)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(totals)
    }

    /// `(created_at, amount_cents)` for payments since a time, for bucketing by month
    #[instrument(skip(self), err)]
    pub async fn amounts_since(&mut self, since: DateTime<Utc>) -> Result<Vec<(DateTime<Utc>, i64)>> {
        let rows = sqlx::query_as::<_, (DateTime<Utc>, i64)>(
            "SELECT created_at, amount FROM payments WHERE created_at >= $1 ORDER BY created_at ASC",
        )
        .bind(since)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::errors::DbError;
    use crate::db::models::payments::{PAYMENT_STATUS_COMPLETED, PAYMENT_STATUS_SUCCEEDED};
    use crate::test::utils::create_test_user;
    use sqlx::PgPool;

    fn request(user_id: crate::types::UserId, intent: &str, amount: i64) -> PaymentCreateDBRequest {
        PaymentCreateDBRequest {
            user_id,
            course_id: None,
            amount,
            currency: "usd".to_string(),
            payment_intent_id: intent.to_string(),
            status: PAYMENT_STATUS_COMPLETED.to_string(),
            payment_method: "stripe".to_string(),
            coupon_id: None,
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_payment_intent_is_unique(pool: PgPool) {
        let user = create_test_user(&pool, false).await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Payments::new(&mut conn);

        repo.create(&request(user.id, "pi_1", 29700)).await.unwrap();
        let err = repo.create(&request(user.id, "pi_1", 29700)).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
        assert!(err.is_unique_violation_on("payments_payment_intent_id_unique"));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_set_status_is_idempotent(pool: PgPool) {
        let user = create_test_user(&pool, false).await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Payments::new(&mut conn);

        repo.create(&request(user.id, "pi_2", 100)).await.unwrap();
        for _ in 0..2 {
            let updated = repo.set_status_by_intent("pi_2", PAYMENT_STATUS_SUCCEEDED).await.unwrap().unwrap();
            assert_eq!(updated.status, PAYMENT_STATUS_SUCCEEDED);
        }
        assert!(repo.set_status_by_intent("pi_unknown", PAYMENT_STATUS_SUCCEEDED).await.unwrap().is_none());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_totals(pool: PgPool) {
        let alice = create_test_user(&pool, false).await;
        let bob = create_test_user(&pool, false).await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Payments::new(&mut conn);

        assert_eq!(repo.totals(None).await.unwrap(), PaymentTotals::default());

        repo.create(&request(alice.id, "pi_a1", 1000)).await.unwrap();
        repo.create(&request(alice.id, "pi_a2", 2000)).await.unwrap();
        repo.create(&request(bob.id, "pi_b1", 500)).await.unwrap();
        repo.set_status_by_intent("pi_b1", PAYMENT_STATUS_SUCCEEDED).await.unwrap();

        let totals = repo.totals(None).await.unwrap();
        assert_eq!(totals.amount_cents, 3500);
        assert_eq!(totals.count, 3);
        assert_eq!(totals.succeeded, 1);
        assert_eq!(totals.unique_customers, 2);

        let future = repo.totals(Some(Utc::now() + chrono::Duration::days(1))).await.unwrap();
        assert_eq!(future.count, 0);

        let listed = repo.list_with_customers(None, Some(2)).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed[0].email.is_some());
    }
}
