//! Wall-clock boundary scheduling.
//!
//! Boundaries follow the local wall clock. Times that do not exist locally
//! (DST gaps) resolve to the next existing hour; ambiguous times resolve to
//! their earliest instant.

use crate::runtime::Notification;
use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, TimeZone, Timelike};
use tokio::sync::mpsc;
use tokio::time::sleep;

/// Minutes after midnight on the 1st at which the month boundary fires,
/// leaving the 00:00 hour boundary time to rank the month's last hour.
pub const MONTH_BOUNDARY_DELAY_MINUTES: u32 = 2;

fn resolve_forward<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> Option<DateTime<Tz>> {
    (0..3).find_map(|shift| {
        tz.from_local_datetime(&(naive + TimeDelta::hours(shift)))
            .earliest()
    })
}

/// Start of the local hour containing `now`.
pub fn hour_start<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Tz> {
    let naive = now.naive_local();
    let truncated = naive.date().and_time(NaiveTime::MIN) + TimeDelta::hours(naive.hour() as i64);
    match now.timezone().from_local_datetime(&truncated).earliest() {
        Some(start) if start <= *now => start,
        _ => now.clone(),
    }
}

/// Local midnight of the day containing `now`.
pub fn local_midnight<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Tz> {
    let midnight = now.naive_local().date().and_time(NaiveTime::MIN);
    match resolve_forward(&now.timezone(), midnight) {
        Some(midnight) if midnight <= *now => midnight,
        _ => hour_start(now),
    }
}

/// First full local hour strictly after `now`.
pub fn next_hour_boundary<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Tz> {
    let naive = now.naive_local();
    let next = naive.date().and_time(NaiveTime::MIN) + TimeDelta::hours(naive.hour() as i64 + 1);
    match resolve_forward(&now.timezone(), next) {
        Some(boundary) if boundary > *now => boundary,
        _ => now.clone() + TimeDelta::hours(1),
    }
}

fn month_boundary_on(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN) + TimeDelta::minutes(MONTH_BOUNDARY_DELAY_MINUTES as i64)
}

/// Next month boundary strictly after `now`: local 00:02 on the 1st.
pub fn next_month_boundary<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Tz> {
    let tz = now.timezone();
    let today = now.naive_local().date();

    let this_month = today.with_day(1).map(month_boundary_on);
    if let Some(boundary) = this_month.and_then(|naive| resolve_forward(&tz, naive)) {
        if boundary > *now {
            return boundary;
        }
    }

    let (year, month) = if today.month() == 12 {
        (today.year() + 1, 1)
    } else {
        (today.year(), today.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .map(month_boundary_on)
        .and_then(|naive| resolve_forward(&tz, naive))
        .filter(|boundary| boundary > now)
        .unwrap_or_else(|| now.clone() + TimeDelta::days(28))
}

async fn sleep_until(target: DateTime<Local>) {
    // the wall clock may lag the monotonic timer, so re-check after waking
    loop {
        let remaining = target - Local::now();
        match remaining.to_std() {
            Ok(duration) if !duration.is_zero() => sleep(duration).await,
            _ => return,
        }
    }
}

async fn run_boundaries(
    name: &'static str,
    tx: mpsc::Sender<Notification>,
    next: fn(&DateTime<Local>) -> DateTime<Local>,
    notification: fn(DateTime<Local>) -> Notification,
) {
    loop {
        let target = next(&Local::now());
        tracing::debug!("Next {} at {}", name, target);
        sleep_until(target).await;

        if tx.send(notification(Local::now())).await.is_err() {
            tracing::info!("Notification channel closed, {} scheduler stopping", name);
            return;
        }
    }
}

/// Sends a [`Notification::HourBoundary`] at every local hour.
pub async fn run_hour_boundaries(tx: mpsc::Sender<Notification>) {
    run_boundaries(
        "hour boundary",
        tx,
        next_hour_boundary,
        Notification::HourBoundary,
    )
    .await
}

/// Sends a [`Notification::MonthBoundary`] at local 00:02 on every 1st.
pub async fn run_month_boundaries(tx: mpsc::Sender<Notification>) {
    run_boundaries(
        "month boundary",
        tx,
        next_month_boundary,
        Notification::MonthBoundary,
    )
    .await
}
