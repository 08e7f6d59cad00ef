//! Reporting handlers: dimension reports, dashboard and activity feed

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use shared::{ActivityRecord, Dashboard, Report, ReportDimension, ReportPeriod};

use crate::error::{AppError, AppResult};
use crate::middleware::CurrentActor;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    pub period: Option<String>,
    pub dimension: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    pub period: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ActivityQuery {
    pub limit: Option<usize>,
}

/// Missing period means the default month window
fn parse_period(raw: Option<&str>) -> AppResult<ReportPeriod> {
    raw.map_or(Ok(ReportPeriod::default()), |value| {
        value
            .parse()
            .map_err(|e: shared::ParseKindError| AppError::validation("period", e.to_string()))
    })
}

fn parse_dimension(raw: Option<&str>) -> AppResult<ReportDimension> {
    let value = raw.ok_or_else(|| AppError::validation("dimension", "Value is required"))?;
    value
        .parse()
        .map_err(|e: shared::ParseKindError| AppError::validation("dimension", e.to_string()))
}

/// Grouped report for one window and dimension
pub async fn get_report(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Query(query): Query<ReportQuery>,
) -> AppResult<Json<Report>> {
    let period = parse_period(query.period.as_deref())?;
    let dimension = parse_dimension(query.dimension.as_deref())?;
    let report = state.ledger().get_report(&actor, period, dimension).await?;
    Ok(Json(report))
}

/// Headline figures, trends and critical alerts
pub async fn get_dashboard(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Query(query): Query<DashboardQuery>,
) -> AppResult<Json<Dashboard>> {
    let period = parse_period(query.period.as_deref())?;
    let dashboard = state.ledger().get_dashboard(&actor, period).await?;
    Ok(Json(dashboard))
}

pub async fn get_activity_feed(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Query(query): Query<ActivityQuery>,
) -> AppResult<Json<Vec<ActivityRecord>>> {
    let feed = state.ledger().get_activity_feed(&actor, query.limit).await?;
    Ok(Json(feed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_period_defaults_to_month() {
        assert_eq!(parse_period(None).unwrap(), ReportPeriod::Month);
        assert_eq!(parse_period(Some("quarter")).unwrap(), ReportPeriod::Quarter);
        assert!(matches!(
            parse_period(Some("fortnight")),
            Err(AppError::Validation { ref field, .. }) if field == "period"
        ));
    }

    #[test]
    fn test_parse_dimension_is_required() {
        assert!(matches!(
            parse_dimension(None),
            Err(AppError::Validation { ref field, .. }) if field == "dimension"
        ));
        assert!(matches!(
            parse_dimension(Some("supplier")),
            Err(AppError::Validation { ref field, .. }) if field == "dimension"
        ));
        assert_eq!(
            parse_dimension(Some("weekday")).unwrap(),
            ReportDimension::Weekday
        );
    }
}
