// Handlers for the export API

use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
};
use serde::Deserialize;

use crate::{
    config::QuerySettings,
    error::{AppError, AppResult},
    routes::AppState,
    scraper,
};

/// Optional per-request overrides of the configured list filters.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportParams {
    pub acc_id: Option<String>,
    pub code1: Option<String>,
    pub code2: Option<String>,
    pub cust_cname: Option<String>,
    pub lang: Option<String>,
    pub page_size: Option<u32>,
}

impl ExportParams {
    fn apply(self, base: &QuerySettings) -> QuerySettings {
        QuerySettings {
            acc_id: self.acc_id.unwrap_or_else(|| base.acc_id.clone()),
            code1: self.code1.unwrap_or_else(|| base.code1.clone()),
            code2: self.code2.unwrap_or_else(|| base.code2.clone()),
            cust_name: self.cust_cname.unwrap_or_else(|| base.cust_name.clone()),
            lang: self.lang.unwrap_or_else(|| base.lang.clone()),
            page_size: self.page_size.unwrap_or(base.page_size),
        }
    }
}

pub async fn health() -> &'static str {
    "ok"
}

/// Runs a full export and answers with the CSV as a file download.
pub async fn export_csv(
    State(app_state): State<AppState>,
    Query(params): Query<ExportParams>,
) -> AppResult<impl IntoResponse> {
    let query = params.apply(&app_state.settings.query);
    query.validate().map_err(|e| AppError::BadRequest(e.to_string()))?;
    tracing::info!("[HANDLER] /api/export - Request received for {:?}", query);

    let today = chrono::Utc::now().date_naive();
    let export = scraper::run_export(
        &app_state.client,
        &query,
        &app_state.settings.pacing,
        today,
        app_state.progress.as_ref(),
    )
    .await?;

    tracing::info!("[HANDLER] /api/export - Returning {} rows as {}", export.rows, export.filename);
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", export.filename)),
        ],
        export.csv,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_fall_back_to_configured_query() {
        let base = QuerySettings {
            acc_id: "CBA_MS_ID".into(),
            code1: "05".into(),
            code2: "01".into(),
            cust_name: String::new(),
            lang: "zh_TW".into(),
            page_size: 50,
        };
        let params = ExportParams {
            code2: Some("02".into()),
            lang: Some("en".into()),
            ..Default::default()
        };

        let query = params.apply(&base);

        assert_eq!(query.acc_id, "CBA_MS_ID");
        assert_eq!(query.code2, "02");
        assert_eq!(query.lang, "en");
        assert_eq!(query.page_size, 50);
    }
}
