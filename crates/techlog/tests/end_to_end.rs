//! End-to-end tests for the techlog pipeline.
//!
//! These tests verify:
//! 1. A real file name anchors every timestamp
//! 2. The same file feeds both the search and the trace sinks
//! 3. Multi-line entries survive intact
//! 4. Skipped entries are counted, not fatal
//! 5. File-level failures abort before anything is sent

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use techlog::{
    BulkFileStore, DateContext, IntakeFileBackend, MemoryDocumentStore, MemoryTraceBackend,
    ReaderOptions, SearchAdapter, TechLogError, TraceAdapter, TraceOptions, ingest_file,
    ingest_reader,
};

const SCENARIO: &str = "10:15.123456-5000,DBPOSTGRS,3,process=rphost,Usr=admin,Sql=\"SELECT 1\"\n";

fn write_log(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).expect("write log");
    path
}

fn search_memory(path: &Path) -> (MemoryDocumentStore, techlog::IngestStats) {
    let store = MemoryDocumentStore::new();
    let mut adapter =
        SearchAdapter::new(store.clone(), "1c_tech_log", 2000).expect("search adapter");
    let stats = ingest_file(path, ReaderOptions::default(), &mut adapter).expect("ingest");
    (store, stats)
}

// ============================================================================
// Single DB event through both sinks
// ============================================================================

#[test]
fn test_scenario_search_document() {
    let dir = TempDir::new().expect("tempdir");
    let path = write_log(&dir, "25060510.log", SCENARIO);

    let (store, stats) = search_memory(&path);
    assert_eq!(stats.events, 1);
    assert!(store.has_index("1c_tech_log"));
    assert_eq!(store.requests(), 1);

    let operations = store.operations();
    assert_eq!(operations.len(), 1);
    let doc = serde_json::to_value(&operations[0].document).expect("serialize");
    assert_eq!(doc["timestamp"], "2025-06-05T10:10:15.123456");
    assert_eq!(doc["duration"], 5000);
    assert_eq!(doc["event_name"], "DBPOSTGRS");
    assert_eq!(doc["level"], "3");
    assert_eq!(doc["process"], "rphost");
    assert_eq!(doc["user"], "admin");
    assert_eq!(doc["sql_text"], "SELECT 1");
    assert!(doc.get("trace.id").is_none());
}

#[test]
fn test_scenario_trace_transaction() {
    let dir = TempDir::new().expect("tempdir");
    let path = write_log(&dir, "25060510.log", SCENARIO);

    let backend = MemoryTraceBackend::new(500);
    let recording = backend.recording();
    let mut adapter = TraceAdapter::new(backend, TraceOptions::default());
    ingest_file(&path, ReaderOptions::default(), &mut adapter).expect("ingest");
    assert!(recording.is_closed());

    let transactions = recording.transactions();
    assert_eq!(transactions.len(), 1);
    let tx = &transactions[0];
    assert_eq!(tx.name.as_deref(), Some("DB:SELECT"));
    assert_eq!(tx.transaction_type, "1c-log");
    assert_eq!(tx.result.as_deref(), Some("success"));
    assert_eq!(tx.start.to_rfc3339(), "2025-06-05T10:10:15.123456+00:00");
    assert_eq!(tx.user.as_ref().map(|u| u.username.as_str()), Some("admin"));

    assert_eq!(tx.spans.len(), 1);
    let span = &tx.spans[0];
    assert_eq!(span.name, "process_event");
    assert!((span.duration_ms.unwrap_or_default() - 5.0).abs() < 1e-9);
    assert_eq!(
        span.labels.get("event_type").map(String::as_str),
        Some("DBPOSTGRS")
    );
    assert!(recording.errors().is_empty());
}

#[test]
fn test_scenario_file_sinks() {
    let dir = TempDir::new().expect("tempdir");
    let path = write_log(&dir, "25060510.log", SCENARIO);

    let mut search = SearchAdapter::new(BulkFileStore::new(Vec::new()), "1c_tech_log", 2000)
        .expect("search adapter");
    ingest_file(&path, ReaderOptions::default(), &mut search).expect("ingest");
    let bulk = String::from_utf8(search.into_store().into_inner().expect("flush"))
        .expect("utf-8");
    let lines: Vec<&str> = bulk.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("\"_index\":\"1c_tech_log\""));
    assert!(lines[1].contains("\"sql_text\":\"SELECT 1\""));

    let intake = dir.path().join("trace.ndjson");
    {
        let writer = techlog::create_output(&intake).expect("create");
        let backend =
            IntakeFileBackend::new(writer, "1c-enterprise", "production", 500).expect("backend");
        let mut trace = TraceAdapter::new(backend, TraceOptions::default());
        ingest_file(&path, ReaderOptions::default(), &mut trace).expect("ingest");
    }
    let content = fs::read_to_string(&intake).expect("read intake");
    let kinds: Vec<String> = content
        .lines()
        .map(|line| {
            let value: serde_json::Value = serde_json::from_str(line).expect("json");
            value
                .as_object()
                .and_then(|obj| obj.keys().next().cloned())
                .unwrap_or_default()
        })
        .collect();
    assert_eq!(kinds, vec!["metadata", "span", "transaction"]);
}

// ============================================================================
// Mixed content
// ============================================================================

const MIXED: &str = "\
48:11.566001-120,SCALL,2,process=rphost,t:connectID=7,Prm=\"MName=RunJob,Module=Jobs\"
48:11.600000-3400,DBMSSQL,4,process=rphost,Sql=\"select a,
    b
  from t\",RowsAffected=3,DBMS=DBMSSQL
48:12.000000-0,EXCP,1,Context=\"Form.Module : 12\"
48:13.000000-10,DBPOSTGRS,3,Sql=\"\"
48:14.000000-10,CALL,1,RowsAffected=lots
not a marker at all
";

#[test]
fn test_mixed_file_through_search() {
    let dir = TempDir::new().expect("tempdir");
    let path = write_log(&dir, "24022918.log", MIXED);

    let (store, stats) = search_memory(&path);
    assert_eq!(stats.entries, 5);
    assert_eq!(stats.events, 4);
    assert_eq!(stats.validation_skipped, 1);

    let docs: Vec<_> = store.operations().into_iter().map(|op| op.document).collect();
    assert_eq!(docs[0].parameters.get("MName").map(String::as_str), Some("RunJob"));
    assert_eq!(docs[0].connect_id.as_deref(), Some("7"));
    assert_eq!(docs[1].sql_text.as_deref(), Some("select a,\n    b\n  from t"));
    assert_eq!(docs[1].rows_affected, Some(3));
    assert_eq!(docs[2].context.as_deref(), Some("Form.Module : 12"));
    assert_eq!(docs[0].timestamp.to_string(), "2024-02-29 18:48:11.566001");
}

#[test]
fn test_mixed_file_through_trace() {
    let dir = TempDir::new().expect("tempdir");
    let path = write_log(&dir, "24022918.log", MIXED);

    let backend = MemoryTraceBackend::new(500);
    let recording = backend.recording();
    let mut adapter = TraceAdapter::new(backend, TraceOptions::default());
    ingest_file(&path, ReaderOptions::default(), &mut adapter).expect("ingest");

    let names: Vec<String> = recording
        .transactions()
        .into_iter()
        .filter_map(|tx| tx.name)
        .collect();
    assert_eq!(names, vec!["SCALL:RunJob", "DB:SELECT", "EXCP", "DB:Query"]);

    let zero = &recording.transactions()[2];
    assert!((zero.duration_ms.unwrap_or_default() - 1.0).abs() < 1e-9);
}

#[test]
fn test_correlated_event_joins_external_trace() {
    let text = "10:00.000000-2000,CALL,1,elastic.trace.id=0af7651916cd43dd8448eb211c80319c,\
                elastic.transaction.id=b7ad6b7169203331,elastic.span.id=00f067aa0ba902b7\n";
    let context = DateContext::new(2025, 6, 5, 10).expect("context");

    let store = MemoryDocumentStore::new();
    let mut search = SearchAdapter::new(store.clone(), "logs", 10).expect("search adapter");
    ingest_reader(Cursor::new(text), context, ReaderOptions::default(), &mut search)
        .expect("ingest");
    let doc = serde_json::to_value(&store.operations()[0].document).expect("serialize");
    assert_eq!(doc["trace.id"], "0af7651916cd43dd8448eb211c80319c");
    assert_eq!(doc["span.id"], "00f067aa0ba902b7");

    let backend = MemoryTraceBackend::new(10);
    let recording = backend.recording();
    let mut trace = TraceAdapter::new(backend, TraceOptions::default());
    ingest_reader(Cursor::new(text), context, ReaderOptions::default(), &mut trace)
        .expect("ingest");
    let tx = &recording.transactions()[0];
    assert_eq!(tx.trace_id, "0af7651916cd43dd8448eb211c80319c");
    assert_eq!(tx.parent_id.as_deref(), Some("00f067aa0ba902b7"));
}

// ============================================================================
// Batching
// ============================================================================

#[test]
fn test_batches_split_at_batch_size() {
    let text: String = (0..25)
        .map(|i| format!("10:{:02}.000000-1,CALL,1,process=p{i}\n", i % 60))
        .collect();
    let context = DateContext::new(2025, 1, 1, 0).expect("context");

    let store = MemoryDocumentStore::new();
    let mut adapter = SearchAdapter::new(store.clone(), "logs", 10).expect("search adapter");
    let stats = ingest_reader(
        Cursor::new(text),
        context,
        ReaderOptions::default(),
        &mut adapter,
    )
    .expect("ingest");

    assert_eq!(stats.events, 25);
    assert_eq!(store.requests(), 3);
    assert_eq!(store.len(), 25);
    assert_eq!(adapter.pending(), 0);
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_bad_file_name_sends_nothing() {
    let dir = TempDir::new().expect("tempdir");
    let path = write_log(&dir, "rphost_1234.log", SCENARIO);

    let store = MemoryDocumentStore::new();
    let mut adapter = SearchAdapter::new(store.clone(), "logs", 10).expect("search adapter");
    let result = ingest_file(&path, ReaderOptions::default(), &mut adapter);

    assert!(matches!(result, Err(TechLogError::InvalidFileName { .. })));
    assert!(store.is_empty());
}

#[test]
fn test_span_limit_aborts_trace_run() {
    let dir = TempDir::new().expect("tempdir");
    let path = write_log(&dir, "25060510.log", SCENARIO);

    let backend = MemoryTraceBackend::new(0);
    let recording = backend.recording();
    let result = {
        let mut adapter = TraceAdapter::new(backend, TraceOptions::default());
        ingest_file(&path, ReaderOptions::default(), &mut adapter)
    };

    assert!(matches!(result, Err(TechLogError::SpanLimitExceeded { .. })));
    assert_eq!(recording.errors().len(), 1);
    assert_eq!(
        recording.transactions()[0].result.as_deref(),
        Some("error")
    );
    assert!(recording.is_closed());
}
