use crate::{
    config::{PacingSettings, QuerySettings},
    csv_export,
    error::{DetailFetchError, ScrapeError, TransportError},
    merge,
    models::{DetailRecord, Export, ListPage, ListRecord, MergedRow},
    progress::{ProgressEvent, ProgressSink},
    taf_api::TafClient,
    task_runner,
};
use chrono::NaiveDate;
use serde_json::Value;
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tokio::time::sleep;

/// Everything the list endpoint returned, in page order.
#[derive(Debug)]
pub struct CollectedList {
    pub items: Vec<ListRecord>,
    pub page_count: u32,
    pub query_count: u64,
}

fn parse_page(body: Value) -> Result<ListPage, ScrapeError> {
    serde_json::from_value(body).map_err(|e| ScrapeError::Protocol(format!("list response is not an object: {}", e)))
}

/// Walks the list endpoint from page 1 to the page count page 1 reports.
///
/// Pages are fetched one after another with `page_delay` between consecutive
/// requests. Any failed page aborts the run, and page 1 must carry an
/// `itemList` array. Later pages without one count as empty.
pub async fn collect_list(
    client: &TafClient,
    query: &QuerySettings,
    page_delay: Duration,
    sink: &dyn ProgressSink,
) -> Result<CollectedList, ScrapeError> {
    sink.report(ProgressEvent::ListStarted { page_size: query.page_size });

    let first = parse_page(client.fetch_list_page(query, 1).await?)?;
    let page_count = first.page_count();
    let query_count = first.query_count();
    let mut items = first
        .items()
        .ok_or_else(|| ScrapeError::Protocol("first page has no itemList; unexpected format or no data".into()))?;

    sink.report(ProgressEvent::ListDiscovered { query_count, page_count });
    sink.report(ProgressEvent::PageFetched { page: 1, page_count, received: items.len(), total: items.len() });

    for page in 2..=page_count {
        if !page_delay.is_zero() {
            sleep(page_delay).await;
        }

        let page_items = parse_page(client.fetch_list_page(query, page).await?)?
            .items()
            .unwrap_or_default();
        let received = page_items.len();
        items.extend(page_items);

        sink.report(ProgressEvent::PageFetched { page, page_count, received, total: items.len() });
    }

    Ok(CollectedList { items, page_count, query_count })
}

/// Keeps the first record for every identifier, in encounter order. Records
/// without an identifier are dropped.
pub fn dedup_by_uuid(items: Vec<ListRecord>) -> Vec<ListRecord> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| item.uuid().is_some_and(|id| seen.insert(id)))
        .collect()
}

async fn try_fetch_detail(client: &TafClient, uuid: &str, lang: &str) -> Result<DetailRecord, DetailFetchError> {
    let failed = |source| DetailFetchError { uuid: uuid.to_string(), source };
    let body = client.fetch_detail(uuid, lang).await.map_err(failed)?;
    serde_json::from_value(body)
        .map(DetailRecord::new)
        .map_err(|source| failed(TransportError::Decode { url: client.detail_url().to_string(), source }))
}

/// Looks up the detail record for `record`. Never fails: a failed lookup is
/// reported to `sink` and replaced by an empty record, and records without an
/// identifier skip the request entirely.
pub async fn fetch_detail_or_empty(
    client: &TafClient,
    record: &ListRecord,
    lang: &str,
    sink: &dyn ProgressSink,
) -> DetailRecord {
    let Some(uuid) = record.uuid() else {
        return DetailRecord::default();
    };

    match try_fetch_detail(client, &uuid, lang).await {
        Ok(detail) => detail,
        Err(e) => {
            sink.report(ProgressEvent::DetailFailed { uuid: e.uuid.clone(), message: e.source.to_string() });
            DetailRecord::default()
        }
    }
}

/// Fetches details for every record with bounded concurrency and merges each
/// pair into a row. Output order matches `records`.
pub async fn build_dataset(
    client: &TafClient,
    records: Vec<ListRecord>,
    lang: &str,
    pacing: &PacingSettings,
    sink: &dyn ProgressSink,
) -> Result<Vec<MergedRow>, ScrapeError> {
    sink.report(ProgressEvent::DetailsStarted { count: records.len() });

    task_runner::map_limit(records, pacing.detail_concurrency, pacing.detail_delay(), move |record| async move {
        let detail = fetch_detail_or_empty(client, &record, lang, sink).await;
        Ok::<_, ScrapeError>(merge::merge_record(&record, &detail))
    })
    .await
}

/// Runs the whole pipeline: list pages, de-duplication, details, merge, CSV.
pub async fn run_export(
    client: &TafClient,
    query: &QuerySettings,
    pacing: &PacingSettings,
    today: NaiveDate,
    sink: &dyn ProgressSink,
) -> Result<Export, ScrapeError> {
    let started = Instant::now();

    let collected = collect_list(client, query, pacing.page_delay(), sink).await?;
    let unique = dedup_by_uuid(collected.items);
    sink.report(ProgressEvent::Deduplicated { unique: unique.len() });

    let rows = build_dataset(client, unique, &query.lang, pacing, sink).await?;
    let csv = csv_export::to_csv(&rows)?;
    let filename = csv_export::export_filename(query, today);

    sink.report(ProgressEvent::Completed {
        rows: rows.len(),
        filename: filename.clone(),
        elapsed: started.elapsed(),
    });

    Ok(Export { filename, csv, rows: rows.len() })
}
