//! End-to-end tests for a mounted data list.

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::json;

use horizon_datalist::dispatch::FilterDispatchBuilder;
use horizon_datalist::prelude::*;
use horizon_datalist::query::{encode_pagination, translate, PaginationParams};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn orders_config() -> DataListConfig {
    DataListConfig::new("orders")
        .with_take(10)
        .with_view(View::new("main").with_group(FilterGroup::with_filters(["status", "region"])))
}

/// A runner that records every request and completes immediately.
fn recording_runner() -> (Arc<dyn FilterRunner>, Arc<Mutex<Vec<FetchRequest>>>) {
    let requests = Arc::new(Mutex::new(Vec::new()));
    let requests_clone = requests.clone();
    let runner: Arc<dyn FilterRunner> = Arc::new(move |request: FetchRequest, done: FetchDone| {
        requests_clone.lock().push(request);
        done(Ok(()));
    });
    (runner, requests)
}

fn collect_updates(store: &MemoryStore) -> Arc<Mutex<Vec<StoreUpdate>>> {
    let updates = Arc::new(Mutex::new(Vec::new()));
    let updates_clone = updates.clone();
    store
        .changed()
        .connect(move |update| updates_clone.lock().push(update.clone()));
    updates
}

fn mount(
    config: DataListConfig,
    query: &str,
    store: Arc<MemoryStore>,
    signals: Arc<HostSignals>,
) -> DataList {
    let (runner, _) = recording_runner();
    DataList::builder(config)
        .store(store)
        .runner(runner)
        .signals(signals)
        .query_source(Arc::new(query.to_string()))
        .mount()
        .expect("Failed to mount data list")
}

#[test]
fn test_query_without_filters_resolves_nothing() {
    init_tracing();
    let store = MemoryStore::shared();
    let updates = collect_updates(&store);
    let list = mount(
        orders_config(),
        "?skip=10&take=10&page=2&view=main",
        store,
        HostSignals::shared(),
    );

    assert_eq!(list.dispatch().lookups(), 0);
    let batches: Vec<_> = updates
        .lock()
        .iter()
        .filter_map(|update| match update {
            StoreUpdate::FilterChange(batch) => Some(batch.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(batches, vec![FilterChangeBatch::Batch(Vec::new())]);
}

#[test]
fn test_foreign_pagination_signal_is_ignored() {
    init_tracing();
    let store = MemoryStore::shared();
    let signals = HostSignals::shared();
    let _list = mount(orders_config(), "", store.clone(), signals.clone());

    let before = store.update_count();
    signals.emit_pagination(Pagination::new("dl__items__customers", 10, 10, 2));
    signals.emit_pagination(Pagination::new("orders", 10, 10, 2));
    assert_eq!(store.update_count(), before);
}

#[test]
fn test_own_pagination_signal_fetches_then_applies() {
    init_tracing();
    let store = MemoryStore::shared();
    let signals = HostSignals::shared();
    let (runner, requests) = recording_runner();
    let list = DataList::builder(orders_config())
        .store(store.clone())
        .runner(runner)
        .signals(signals.clone())
        .query_source(Arc::new("?view=main&status=open".to_string()))
        .mount()
        .unwrap();

    let page = Pagination::new(list.pagination_id(), 20, 10, 3);
    signals.emit_pagination(page.clone());

    let requests = requests.lock();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].view.as_deref(), Some("main"));
    assert_eq!(requests[0].state.filter("status", Some("main")).unwrap().value, "open");
    assert_eq!(store.state().pagination, Some(page));
}

#[test]
fn test_pagination_survives_a_query_string_round_trip() {
    let original = Pagination::new("dl__items__orders", 20, 10, 3);
    let query = format!("?{}", encode_pagination(&original));

    let translation = translate(&query);
    assert!(translation.filter_batch.is_empty());
    let decoded = PaginationParams::from_query(&translation.query_object)
        .resolve(&PaginationDefaults::default(), "dl__items__orders");
    assert_eq!(decoded, original);
}

#[test]
fn test_identical_payload_pushed_twice_updates_once() {
    init_tracing();
    let store = MemoryStore::shared();
    let signals = HostSignals::shared();
    let push_fn = Arc::new(Mutex::new(None));
    let push_clone = push_fn.clone();
    let (runner, _) = recording_runner();
    let _list = DataList::builder(orders_config())
        .store(store.clone())
        .runner(runner)
        .signals(signals.clone())
        .hooks(Hooks::new().push_dispatch(move |push| *push_clone.lock() = Some(push)))
        .mount()
        .unwrap();

    let before = store.update_count();
    let payload = ItemsPayload::from_json_lenient(r#"{"Items":[{"id":1},{"id":2}],"total":2}"#);
    signals.emit_render(payload.clone());
    signals.emit_render(payload.clone());
    let push = push_fn.lock().take().expect("push_dispatch hook was not wired");
    push(payload.clone());

    assert_eq!(store.update_count(), before + 1);
    assert_eq!(store.state().items.unwrap().count, 2);
}

#[test]
fn test_duplicate_filter_id_binds_first_group() {
    let view = View::new("main")
        .with_group(FilterGroup {
            id: Some("primary".into()),
            label: None,
            filters: vec![FilterDefinition::new("status").with_label("Status")],
        })
        .with_group(FilterGroup {
            id: Some("secondary".into()),
            label: None,
            filters: vec![FilterDefinition::new("status").with_label("Status (legacy)")],
        });
    let builder = FilterDispatchBuilder::new(vec![view]);

    let definition = builder.find_definition("main", "status").unwrap();
    assert_eq!(definition.label.as_deref(), Some("Status"));
    assert_eq!(
        builder.resolve(Some("main"), "status", json!("active")),
        Some(FilterChange::new("status", Some("main".into()), "active"))
    );
}

#[test]
fn test_end_to_end_pagination_filters_and_snapshot() {
    init_tracing();
    let store = MemoryStore::shared();
    let updates = collect_updates(&store);
    let query = "?skip=0&take=25&page=1&view=main&status=active";
    let _list = mount(orders_config(), query, store.clone(), HostSignals::shared());

    let expected_pagination = Pagination::new("dl__items__orders", 0, 25, 1);
    let updates = updates.lock();

    let batches: Vec<_> = updates
        .iter()
        .filter_map(|update| match update {
            StoreUpdate::FilterChange(batch) => Some(batch.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(
        batches,
        vec![FilterChangeBatch::Batch(vec![FilterChange::new(
            "status",
            Some("main".into()),
            "active"
        )])]
    );

    let snapshots: Vec<_> = updates
        .iter()
        .filter_map(|update| match update {
            StoreUpdate::AppInit(init) if init.query_object.is_some() => Some(init.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(snapshots.len(), 1);
    let snapshot = &snapshots[0];
    assert_eq!(snapshot.pagination, Some(expected_pagination.clone()));
    assert_eq!(snapshot.query_string.as_deref(), Some(query));
    let query_object = snapshot.query_object.as_ref().unwrap();
    assert_eq!(query_object.get("take").and_then(QueryValue::as_text), Some("25"));
    assert_eq!(query_object.get("view").and_then(QueryValue::as_text), Some("main"));

    assert_eq!(store.state().pagination, Some(expected_pagination));
}

#[test]
fn test_end_to_end_sort_object() {
    init_tracing();
    let store = MemoryStore::shared();
    let updates = collect_updates(&store);
    let query = r#"?view=main&sort={"price":"ASC"}"#;
    let _list = mount(orders_config(), query, store.clone(), HostSignals::shared());

    let records: Vec<FilterChange> = updates
        .lock()
        .iter()
        .filter_map(|update| match update {
            StoreUpdate::FilterChange(batch) => Some(batch.records().to_vec()),
            _ => None,
        })
        .flatten()
        .collect();

    assert!(records.iter().all(|record| record.id != "price"));
    let sorts: Vec<_> = records.iter().filter(|record| record.is_sort()).collect();
    assert_eq!(sorts.len(), 1);
    assert_eq!(sorts[0].id, "sort-price");
    assert_eq!(sorts[0].value, "ASC");
}

#[test]
fn test_deferred_on_init_supplies_preferences() {
    init_tracing();
    let store = MemoryStore::shared();
    let parked: Arc<Mutex<Option<InitReady>>> = Arc::new(Mutex::new(None));
    let parked_clone = parked.clone();
    let (runner, _) = recording_runner();

    let list = DataList::builder(orders_config())
        .store(store.clone())
        .runner(runner)
        .query_source(Arc::new("?view=main&status=open".to_string()))
        .hooks(Hooks::new().on_init(move |state, config| {
            assert_eq!(state.config.as_ref().map(|c| c.id.as_str()), Some("orders"));
            assert_eq!(config.id, "orders");
            Some(Box::new(move |ready: InitReady| *parked_clone.lock() = Some(ready)) as InitDeferral)
        }))
        .mount()
        .unwrap();

    assert_eq!(list.phase(), InitPhase::AwaitingHost);
    assert!(store.state().filters.is_empty());

    // Items pushed while waiting are still applied.
    list.signals().emit_render(ItemsPayload::new(vec![json!("row")], 1));
    assert!(store.state().items.is_some());

    let ready = parked.lock().take().unwrap();
    ready.resume(Some(Preferences::new().with("columns", json!(["id", "status"]))));

    assert_eq!(list.phase(), InitPhase::Complete);
    let state = store.state();
    assert_eq!(state.preferences.as_ref().unwrap().get("columns"), Some(&json!(["id", "status"])));
    assert_eq!(state.filter("status", Some("main")).unwrap().value, "open");
}

#[test]
fn test_undecodable_preferences_do_not_block_startup() {
    init_tracing();
    let store = MemoryStore::shared();
    let (runner, _) = recording_runner();
    let list = DataList::builder(orders_config())
        .store(store.clone())
        .runner(runner)
        .preference_store(Arc::new(MemoryPreferenceStore::with_raw("{\"columns\": [")))
        .query_source(Arc::new("?view=main&region=emea".to_string()))
        .mount()
        .unwrap();

    assert_eq!(list.phase(), InitPhase::Complete);
    let state = store.state();
    assert_eq!(state.preferences, None);
    assert_eq!(state.filter("region", Some("main")).unwrap().value, "emea");
}

#[test]
fn test_file_preferences_survive_remount() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let prefs: Arc<dyn PreferenceStore> =
        Arc::new(FilePreferenceStore::new(dir.path().join("list.json")));
    let (runner, _) = recording_runner();

    let first = DataList::builder(orders_config())
        .store(MemoryStore::shared())
        .runner(runner.clone())
        .preference_store(prefs.clone())
        .mount()
        .unwrap();
    first
        .save_preferences(Preferences::new().with("pageSize", 50))
        .unwrap();
    drop(first);

    let store = MemoryStore::shared();
    let _second = DataList::builder(orders_config())
        .store(store.clone())
        .runner(runner)
        .preference_store(prefs)
        .mount()
        .unwrap();
    assert_eq!(
        store.state().preferences.unwrap().get("pageSize"),
        Some(&json!(50))
    );
}

#[test]
fn test_two_instances_share_signals_without_cross_talk() {
    init_tracing();
    let signals = HostSignals::shared();
    let orders_store = MemoryStore::shared();
    let customers_store = MemoryStore::shared();
    let orders = mount(orders_config(), "", orders_store.clone(), signals.clone());
    let _customers = mount(
        DataListConfig::new("customers"),
        "",
        customers_store.clone(),
        signals.clone(),
    );

    let customers_before = customers_store.update_count();
    signals.emit_pagination(Pagination::new(orders.pagination_id(), 10, 10, 2));
    assert_eq!(orders_store.state().pagination.unwrap().page, 2);
    assert_eq!(customers_store.update_count(), customers_before);
}
