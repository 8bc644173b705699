//! End-to-end tests: CSV bytes → loader → builder → store → queries.

use buzzwatch_core::data::{DatasetLoader, FileSource, StaticSource, TableLayout};
use buzzwatch_core::{build_snapshot, DatasetStore, SignalParams, StockQuery};
use std::io::Write;
use std::sync::Arc;

const PRICES: &str = "\
stock name,2024-03-01,2024-03-02,2024-03-03,2024-03-04,2024-03-05,2024-03-06,2024-03-07,2024-03-08,2024-03-09,2024-03-10,volume_std
DROP,100,101,99,100,101,99,100,101,99,60,1200
FLAT,10,10,10,10,10,10,10,10,10,10,300
SPIKE,50,51,49,50,50,51,49,50,50,50,800
EMPTY,,,,,,,,,,,100
";

const VOLUMES: &str = "\
stock name,v1,v2,v3,v4,v5,v6,v7,v8,volume_std
DROP,1000,1000,1000,1000,1000,1000,1000,900,12
FLAT,500,500,500,500,500,500,500,500,3
SPIKE,1000,1000,1000,1000,1000,1000,1000,5000,4
";

fn query_for(loader: &DatasetLoader) -> (Arc<DatasetStore>, StockQuery) {
    let store = Arc::new(DatasetStore::new());
    let snapshot = build_snapshot(loader.load().unwrap(), 1).unwrap();
    store.swap(snapshot);
    let query = StockQuery::new(Arc::clone(&store), SignalParams::default());
    (store, query)
}

#[test]
fn full_pipeline_flags_buzzing_stocks() {
    let loader = DatasetLoader::new(Box::new(StaticSource::new(PRICES)), TableLayout::default())
        .with_volume_source(Box::new(StaticSource::new(VOLUMES)));
    let (_store, query) = query_for(&loader);

    assert_eq!(query.list_stocks(), vec!["DROP", "FLAT", "SPIKE"]);

    let breaches: Vec<_> = query.price_deviation_breaches().into_iter().collect();
    assert_eq!(breaches, vec!["DROP"]);

    let spikes: Vec<_> = query.volume_spikes().into_iter().collect();
    assert_eq!(spikes, vec!["SPIKE"]);

    let buzzing: Vec<_> = query.buzzing_stocks().into_iter().collect();
    assert_eq!(buzzing, vec!["DROP", "SPIKE"]);

    let report = query.signal_report();
    assert_eq!(report.cycle, 1);
    assert_eq!(report.buzzing.len(), 2);
}

#[test]
fn price_series_is_in_date_order() {
    let loader = DatasetLoader::new(Box::new(StaticSource::new(PRICES)), TableLayout::default());
    let (_store, query) = query_for(&loader);

    let series = query.price_series("FLAT").unwrap();
    assert_eq!(series.points.len(), 10);
    assert_eq!(series.points[0].date, "2024-03-01");
    assert_eq!(series.points[9].date, "2024-03-10");
    assert_eq!(series.mean, 10.0);
    assert_eq!(series.std, 0.0);

    assert!(query.price_series("EMPTY").is_err());
}

#[test]
fn without_volume_days_nothing_spikes() {
    let loader = DatasetLoader::new(Box::new(StaticSource::new(PRICES)), TableLayout::default());
    let (store, query) = query_for(&loader);

    assert!(query.volume_spikes().is_empty());
    assert!(store.snapshot().volumes().day_labels().is_empty());
    assert_eq!(
        store.snapshot().volumes().get("DROP").unwrap().summary,
        Some(1200.0)
    );
}

#[test]
fn file_source_feeds_the_same_pipeline() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(PRICES.as_bytes()).unwrap();

    let loader = DatasetLoader::new(Box::new(FileSource::new(file.path())), TableLayout::default());
    let (_store, query) = query_for(&loader);
    assert_eq!(query.list_stocks().len(), 3);
}

#[test]
fn custom_layout_labels() {
    let csv = "ticker,d1,d2,vol\nAAA,1,2,3\n";
    let layout = TableLayout {
        id_column: "ticker".into(),
        volume_column: "vol".into(),
    };
    let loader = DatasetLoader::new(Box::new(StaticSource::new(csv)), layout);
    let (_store, query) = query_for(&loader);
    assert_eq!(query.list_stocks(), vec!["AAA"]);
}

#[test]
fn report_serializes_to_json() {
    let loader = DatasetLoader::new(Box::new(StaticSource::new(PRICES)), TableLayout::default())
        .with_volume_source(Box::new(StaticSource::new(VOLUMES)));
    let (_store, query) = query_for(&loader);

    let json = serde_json::to_value(query.signal_report()).unwrap();
    assert_eq!(json["cycle"], 1);
    assert_eq!(json["buzzing"], serde_json::json!(["DROP", "SPIKE"]));
}
