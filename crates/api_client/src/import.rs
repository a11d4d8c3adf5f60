//! Import commit: one create call per preview row, spread over a small
//! fixed pool of worker threads.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use tally_core::{Transaction, TransactionCache};
use tally_io::ImportPreview;

use crate::client::{ApiClient, ApiError};

/// Upper bound on create calls in flight at once.
pub const IMPORT_WORKERS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub imported: usize,
}

impl ImportSummary {
    pub fn message(&self) -> String {
        format!("Imported {} transaction(s)", self.imported)
    }
}

/// At least one create failed. Rows in `created` exist on the backend and
/// were not rolled back.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportCommitError {
    pub created: usize,
    pub attempted: usize,
    /// First failure in row order.
    pub source: ApiError,
}

impl fmt::Display for ImportCommitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Import failed: {} ({} of {} transaction(s) were created)",
            self.source, self.created, self.attempted
        )
    }
}

impl std::error::Error for ImportCommitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// Create every row of `preview` concurrently, at most `IMPORT_WORKERS`
/// requests at a time.
///
/// On full success each new transaction is merged into `cache`. On any
/// failure the cache is left alone and the caller should re-fetch.
pub fn confirm_import(
    client: &ApiClient,
    preview: &ImportPreview,
    cache: &mut TransactionCache,
) -> Result<ImportSummary, ImportCommitError> {
    log::info!("importing {} row(s) from {}", preview.len(), preview.file_name);

    let results = create_rows(client, preview);

    let attempted = results.len();
    let mut created = Vec::with_capacity(attempted);
    let mut first_error = None;
    for (row, result) in preview.rows.iter().zip(results) {
        match result {
            Ok(tx) => created.push(tx),
            Err(e) => {
                log::warn!("{} row {}: {}", preview.file_name, row.row_number, e);
                first_error.get_or_insert(e);
            }
        }
    }

    if let Some(source) = first_error {
        return Err(ImportCommitError { created: created.len(), attempted, source });
    }

    for tx in created {
        cache.created(tx);
    }
    Ok(ImportSummary { imported: attempted })
}

type RowResult = Result<Transaction, ApiError>;

/// Results in row order. The calling thread works alongside the helpers, so
/// the import still completes if no helper thread can be started.
fn create_rows(client: &ApiClient, preview: &ImportPreview) -> Vec<RowResult> {
    let rows = &preview.rows;
    let next = AtomicUsize::new(0);

    let work = || {
        let mut done = Vec::new();
        loop {
            let index = next.fetch_add(1, Ordering::Relaxed);
            let Some(row) = rows.get(index) else {
                break;
            };
            done.push((index, client.create_transaction(&row.to_new_transaction())));
        }
        done
    };

    let mut slots: Vec<Option<RowResult>> = (0..rows.len()).map(|_| None).collect();

    thread::scope(|scope| {
        let helpers: Vec<_> = (1..IMPORT_WORKERS.min(rows.len()))
            .filter_map(|n| {
                thread::Builder::new()
                    .name(format!("tally-import-{}", n))
                    .spawn_scoped(scope, &work)
                    .map_err(|e| log::warn!("could not start import worker: {}", e))
                    .ok()
            })
            .collect();

        for (index, result) in work() {
            slots[index] = Some(result);
        }
        for helper in helpers {
            match helper.join() {
                Ok(done) => {
                    for (index, result) in done {
                        slots[index] = Some(result);
                    }
                }
                Err(_) => log::warn!("import worker panicked"),
            }
        }
    });

    slots
        .into_iter()
        .map(|slot| slot.unwrap_or_else(|| Err(ApiError::Network("import worker panicked".into()))))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use tally_io::parse_import;

    const CSV: &str = "date,type,category,amount,description\n\
                       2024-01-01,expense,food,12.50,lunch\n\
                       2024-01-02,income,salary,2000,\n";

    fn created_json(id: i64, date: &str) -> serde_json::Value {
        serde_json::json!({ "id": id, "type": "expense", "amount": 1, "date": date })
    }

    #[test]
    fn test_confirm_import_merges_into_cache() {
        let server = MockServer::start();
        let preview = parse_import("jan.csv", CSV).unwrap();

        let first = server.mock(|when, then| {
            when.method(POST)
                .path("/transactions")
                .header("Authorization", "Bearer tok")
                .json_body(serde_json::to_value(preview.rows[0].to_new_transaction()).unwrap());
            then.status(201).json_body(created_json(10, "2024-01-01"));
        });
        let second = server.mock(|when, then| {
            when.method(POST)
                .path("/transactions")
                .json_body(serde_json::to_value(preview.rows[1].to_new_transaction()).unwrap());
            then.status(201).json_body(created_json(11, "2024-01-02"));
        });

        let client = ApiClient::new(server.base_url()).with_token("tok");
        let mut cache = TransactionCache::default();
        let summary = confirm_import(&client, &preview, &mut cache).unwrap();

        first.assert();
        second.assert();
        assert_eq!(summary.imported, 2);
        assert_eq!(summary.message(), "Imported 2 transaction(s)");
        assert_eq!(cache.len(), 2);
        assert!(cache.get(10).is_some());
        assert!(cache.get(11).is_some());
    }

    #[test]
    fn test_more_rows_than_workers() {
        let server = MockServer::start();

        let rows = IMPORT_WORKERS * 2 + 3;
        let mut csv = String::from("date,type,category,amount,description\n");
        for day in 1..=rows {
            csv.push_str(&format!("2024-03-{:02},expense,food,{},\n", day, day));
        }
        let preview = parse_import("march.csv", &csv).unwrap();
        assert_eq!(preview.len(), rows);

        let create = server.mock(|when, then| {
            when.method(POST).path("/transactions");
            then.status(201).json_body(created_json(1, "2024-03-01"));
        });

        let client = ApiClient::new(server.base_url()).with_token("tok");
        let mut cache = TransactionCache::default();
        let summary = confirm_import(&client, &preview, &mut cache).unwrap();

        create.assert_hits(rows);
        assert_eq!(summary.imported, rows);
        assert_eq!(cache.len(), rows);
    }

    #[test]
    fn test_partial_failure_reports_created_count() {
        let server = MockServer::start();
        let preview = parse_import("jan.csv", CSV).unwrap();

        server.mock(|when, then| {
            when.method(POST)
                .path("/transactions")
                .json_body(serde_json::to_value(preview.rows[0].to_new_transaction()).unwrap());
            then.status(201).json_body(created_json(10, "2024-01-01"));
        });
        server.mock(|when, then| {
            when.method(POST)
                .path("/transactions")
                .json_body(serde_json::to_value(preview.rows[1].to_new_transaction()).unwrap());
            then.status(422).json_body(serde_json::json!({ "message": "Date is in a closed period." }));
        });

        let client = ApiClient::new(server.base_url()).with_token("tok");
        let mut cache = TransactionCache::default();
        let err = confirm_import(&client, &preview, &mut cache).unwrap_err();

        assert_eq!(err.created, 1);
        assert_eq!(err.attempted, 2);
        assert_eq!(err.source, ApiError::Http(422, "Date is in a closed period.".into()));
        assert_eq!(
            err.to_string(),
            "Import failed: Date is in a closed period. (1 of 2 transaction(s) were created)"
        );
        assert!(cache.is_empty());
    }
}
