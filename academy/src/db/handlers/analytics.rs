//! Aggregate queries for the admin dashboard.

use chrono::{DateTime, Datelike, Months, TimeZone, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use sqlx::PgPool;
use tracing::instrument;

use crate::{
    api::models::admin::{AdminOverview, MonthlyRevenue, PaymentResponse, PaymentsReport, RecentEnrollmentResponse, TimeRange},
    db::{
        errors::{DbError, Result},
        handlers::{Enrollments, Payments, Reviews, payments::PaymentTotals},
    },
};

/// Months shown in the revenue chart, including the current one
pub const REVENUE_MONTHS: u32 = 6;

/// Rows shown in each of the "recent" panels
pub const RECENT_LIMIT: i64 = 5;

/// Convert cents to dollars
fn dollars(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

/// Midnight UTC on the first day of the month `months_back` months before `now`'s month
fn month_start(now: DateTime<Utc>, months_back: u32) -> DateTime<Utc> {
    let first = Utc
        .with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()
        .unwrap_or(now);
    first.checked_sub_months(Months::new(months_back)).unwrap_or(first)
}

/// Bucket payment amounts into the last [`REVENUE_MONTHS`] calendar months, oldest first.
///
/// Every month appears even without payments; amounts outside the window are ignored.
pub fn revenue_by_month(amounts: &[(DateTime<Utc>, i64)], now: DateTime<Utc>) -> Vec<MonthlyRevenue> {
    (0..REVENUE_MONTHS)
        .rev()
        .map(|back| {
            let start = month_start(now, back);
            let cents: i64 = amounts
                .iter()
                .filter(|(at, _)| at.year() == start.year() && at.month() == start.month())
                .map(|(_, amount)| amount)
                .sum();
            MonthlyRevenue {
                month: start.format("%b %Y").to_string(),
                revenue: dollars(cents),
            }
        })
        .collect()
}

#[instrument(skip(db), err)]
async fn get_payment_totals(db: &PgPool) -> Result<PaymentTotals> {
    let mut conn = db.acquire().await.map_err(DbError::from)?;
    Payments::new(&mut conn).totals(None).await
}

#[instrument(skip(db), err)]
async fn get_monthly_amounts(db: &PgPool, since: DateTime<Utc>) -> Result<Vec<(DateTime<Utc>, i64)>> {
    let mut conn = db.acquire().await.map_err(DbError::from)?;
    Payments::new(&mut conn).amounts_since(since).await
}

#[instrument(skip(db), err)]
async fn get_recent_payments(db: &PgPool) -> Result<Vec<PaymentResponse>> {
    let mut conn = db.acquire().await.map_err(DbError::from)?;
    let rows = Payments::new(&mut conn).list_with_customers(None, Some(RECENT_LIMIT)).await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

#[instrument(skip(db), err)]
async fn get_recent_enrollments(db: &PgPool) -> Result<Vec<RecentEnrollmentResponse>> {
    let mut conn = db.acquire().await.map_err(DbError::from)?;
    let rows = Enrollments::new(&mut conn).recent(RECENT_LIMIT).await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

#[instrument(skip(db), err)]
async fn get_enrollment_counts(db: &PgPool) -> Result<crate::db::handlers::enrollments::EnrollmentCounts> {
    let mut conn = db.acquire().await.map_err(DbError::from)?;
    Enrollments::new(&mut conn).counts().await
}

#[instrument(skip(db), err)]
async fn get_average_rating(db: &PgPool) -> Result<Decimal> {
    let mut conn = db.acquire().await.map_err(DbError::from)?;
    let average = Reviews::new(&mut conn).average_rating().await?;
    Ok(average
        .unwrap_or(Decimal::ZERO)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
}

/// Everything on the admin overview page
#[instrument(skip(db), err)]
pub async fn get_admin_overview(db: &PgPool, now: DateTime<Utc>) -> Result<AdminOverview> {
    let window_start = month_start(now, REVENUE_MONTHS - 1);

    let (totals, amounts, enrollment_counts, average_rating, recent_enrollments, recent_payments) = tokio::try_join!(
        get_payment_totals(db),
        get_monthly_amounts(db, window_start),
        get_enrollment_counts(db),
        get_average_rating(db),
        get_recent_enrollments(db),
        get_recent_payments(db),
    )?;

    let revenue_by_month = revenue_by_month(&amounts, now);
    let this_month_revenue = revenue_by_month.last().map(|m| m.revenue).unwrap_or(Decimal::ZERO);

    Ok(AdminOverview {
        total_revenue: dollars(totals.amount_cents),
        total_students: enrollment_counts.total,
        active_students: enrollment_counts.active,
        average_rating,
        total_payments: totals.count,
        successful_payments: totals.succeeded,
        revenue_by_month,
        this_month_revenue,
        recent_enrollments,
        recent_payments,
    })
}

/// The admin payments page for a time range
#[instrument(skip(db), err)]
pub async fn get_payments_report(db: &PgPool, range: TimeRange, now: DateTime<Utc>) -> Result<PaymentsReport> {
    let since = range.since(now);
    let mut conn = db.acquire().await.map_err(DbError::from)?;
    let mut repo = Payments::new(&mut conn);

    let payments = repo.list_with_customers(since, None).await?;
    let totals = repo.totals(since).await?;

    let total_revenue = dollars(totals.amount_cents);
    let average_transaction = if totals.count > 0 {
        (total_revenue / Decimal::from(totals.count)).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    } else {
        Decimal::ZERO
    };

    Ok(PaymentsReport {
        payments: payments.into_iter().map(Into::into).collect(),
        total_revenue,
        total_transactions: totals.count,
        unique_customers: totals.unique_customers,
        average_transaction,
    })
}
