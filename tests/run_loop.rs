//! Run loop tests against recording producer and document store doubles.

use async_trait::async_trait;
use basket_generator::{EventGenerator, GeneratorConfig};
use basket_kafka_producer::{
    Delivery, MessageProducer, NoopProducer, ProduceError, SchemaRegistryError,
};
use basket_loadgen::{FileDump, RunLoop, RunOptions};
use basket_mongodb_sink::{BatchSinkWriter, DocumentStore, SinkError};
use basket_types::{Basket, Payment, RecordKind, SalesRecord, SeedCatalog};
use bson::{Bson, Document};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq)]
enum Event {
    Produce {
        kind: RecordKind,
        invoice: String,
        topic: String,
        key: String,
    },
    Flush,
    Close,
    InsertOne {
        kind: RecordKind,
        invoice: String,
    },
    InsertMany {
        kind: RecordKind,
        invoices: Vec<String>,
    },
}

type EventLog = Arc<Mutex<Vec<Event>>>;

struct RecordingProducer {
    log: EventLog,
    fail_on: Option<RecordKind>,
    cancel_after: Option<(usize, CancellationToken)>,
    produced: usize,
}

impl RecordingProducer {
    fn new(log: &EventLog) -> Self {
        Self {
            log: log.clone(),
            fail_on: None,
            cancel_after: None,
            produced: 0,
        }
    }
}

#[async_trait]
impl MessageProducer for RecordingProducer {
    async fn produce(
        &mut self,
        record: SalesRecord<'_>,
        topic: &str,
        key: &str,
    ) -> Result<Delivery, ProduceError> {
        if self.fail_on == Some(record.kind()) {
            return Err(ProduceError::SchemaRegistry(SchemaRegistryError::Api {
                subject: format!("{topic}-value"),
                status: 500,
                code: 50001,
                message: "unavailable".to_string(),
            }));
        }

        self.log.lock().unwrap().push(Event::Produce {
            kind: record.kind(),
            invoice: record.invoice_number().to_string(),
            topic: topic.to_string(),
            key: key.to_string(),
        });
        self.produced += 1;
        if let Some((after, token)) = &self.cancel_after {
            if self.produced >= *after {
                token.cancel();
            }
        }

        Ok(Delivery {
            partition: 0,
            offset: self.produced as i64 - 1,
        })
    }

    async fn flush(&mut self, _timeout: Duration) -> usize {
        self.log.lock().unwrap().push(Event::Flush);
        0
    }

    async fn close(&mut self) {
        self.log.lock().unwrap().push(Event::Close);
    }
}

struct RecordingStore {
    log: EventLog,
    refuse_writes: bool,
}

impl RecordingStore {
    fn new(log: &EventLog) -> Self {
        Self {
            log: log.clone(),
            refuse_writes: false,
        }
    }

    fn refusing(log: &EventLog) -> Self {
        Self {
            log: log.clone(),
            refuse_writes: true,
        }
    }

    fn refusal() -> SinkError {
        SinkError::MongoDB(mongodb::error::Error::from(std::io::Error::other(
            "write refused",
        )))
    }
}

fn invoice_of(document: &Document) -> String {
    document.get_str("invoiceNumber").unwrap_or_default().to_string()
}

#[async_trait]
impl DocumentStore for RecordingStore {
    async fn insert_one(&self, kind: RecordKind, document: Document) -> Result<Bson, SinkError> {
        if self.refuse_writes {
            return Err(Self::refusal());
        }
        let mut log = self.log.lock().unwrap();
        log.push(Event::InsertOne {
            kind,
            invoice: invoice_of(&document),
        });
        Ok(Bson::Int64(log.len() as i64))
    }

    async fn insert_many(
        &self,
        kind: RecordKind,
        documents: Vec<Document>,
    ) -> Result<usize, SinkError> {
        if self.refuse_writes {
            return Err(Self::refusal());
        }
        let count = documents.len();
        self.log.lock().unwrap().push(Event::InsertMany {
            kind,
            invoices: documents.iter().map(invoice_of).collect(),
        });
        Ok(count)
    }
}

fn catalog() -> SeedCatalog {
    SeedCatalog::from_json(
        r#"{
          "clerks":   [{ "id": "c1", "name": "Alex" }, { "id": "c2", "name": "Sam" }],
          "stores":   [{ "id": "s1", "name": "Downtown" }, { "id": "s2", "name": "Harbour" }],
          "products": [
            { "id": "A", "name": "Tea",    "brand": "Leaf", "category": "Drinks", "price": 10.0 },
            { "id": "B", "name": "Coffee", "brand": "Bean", "category": "Drinks", "price": 7.5 }
          ]
        }"#,
    )
    .unwrap()
}

fn generator(seed: u64) -> EventGenerator {
    EventGenerator::new(GeneratorConfig::default(), Some(seed)).unwrap()
}

fn kafka_options(iterations: u64, flush_interval: u64) -> RunOptions {
    RunOptions {
        iterations: Some(iterations),
        flush_interval,
        pacing_seed: Some(1),
        ..Default::default()
    }
}

fn events(log: &EventLog) -> Vec<Event> {
    log.lock().unwrap().clone()
}

fn produced(log: &EventLog) -> Vec<(RecordKind, String)> {
    events(log)
        .into_iter()
        .filter_map(|e| match e {
            Event::Produce { kind, invoice, .. } => Some((kind, invoice)),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_basket_produced_before_its_payment() {
    let log = EventLog::default();
    let run_loop: RunLoop<RecordingStore> = RunLoop::new(
        kafka_options(3, 0),
        catalog(),
        generator(7),
        Box::new(RecordingProducer::new(&log)),
        CancellationToken::new(),
    );

    let metrics = run_loop.run().await.unwrap();
    assert_eq!(metrics.iterations, 3);
    assert_eq!(metrics.baskets_produced, 3);
    assert_eq!(metrics.payments_produced, 3);

    let produced = produced(&log);
    assert_eq!(produced.len(), 6);
    for pair in produced.chunks(2) {
        assert_eq!(pair[0].0, RecordKind::Basket);
        assert_eq!(pair[1].0, RecordKind::Payment);
        assert_eq!(pair[0].1, pair[1].1);
    }

    for event in events(&log) {
        if let Event::Produce {
            kind, topic, key, ..
        } = event
        {
            let expected = match kind {
                RecordKind::Basket => "pos_basket",
                RecordKind::Payment => "pos_pmnt",
            };
            assert_eq!(topic, expected);
            assert!(key == "Downtown" || key == "Harbour");
        }
    }
    assert_eq!(events(&log).last(), Some(&Event::Close));
}

#[tokio::test]
async fn test_flush_once_per_interval() {
    let log = EventLog::default();
    let run_loop: RunLoop<RecordingStore> = RunLoop::new(
        kafka_options(7, 3),
        catalog(),
        generator(11),
        Box::new(RecordingProducer::new(&log)),
        CancellationToken::new(),
    );

    let metrics = run_loop.run().await.unwrap();
    assert_eq!(metrics.flushes, 2);

    // Payments produced before each flush
    let mut payments = 0;
    let mut at_flush = Vec::new();
    for event in events(&log) {
        match event {
            Event::Produce {
                kind: RecordKind::Payment,
                ..
            } => payments += 1,
            Event::Flush => at_flush.push(payments),
            _ => {}
        }
    }
    assert_eq!(at_flush, vec![3, 6]);
}

#[tokio::test]
async fn test_disabled_broker_goes_through_noop_producer() {
    let log = EventLog::default();
    let writer = BatchSinkWriter::new(RecordingStore::new(&log), 1);
    let options = RunOptions {
        iterations: Some(4),
        sleep_ms: 50,
        pacing_seed: Some(3),
        ..Default::default()
    };
    let run_loop = RunLoop::new(
        options,
        catalog(),
        generator(3),
        Box::new(NoopProducer),
        CancellationToken::new(),
    )
    .with_documents(writer);

    let metrics = run_loop.run().await.unwrap();
    assert_eq!(metrics.iterations, 4);
    assert_eq!(metrics.baskets_produced, 0);
    assert_eq!(metrics.payments_produced, 0);
    assert_eq!(metrics.flushes, 0);
    assert_eq!(metrics.documents_written, 8);
}

#[tokio::test]
async fn test_full_batches_written_in_lock_step() {
    let log = EventLog::default();
    let writer = BatchSinkWriter::new(RecordingStore::new(&log), 3);
    let run_loop = RunLoop::new(
        kafka_options(3, 0),
        catalog(),
        generator(5),
        Box::new(RecordingProducer::new(&log)),
        CancellationToken::new(),
    )
    .with_documents(writer);

    let metrics = run_loop.run().await.unwrap();
    assert_eq!(metrics.documents_written, 6);
    assert_eq!(metrics.document_failures, 0);

    let invoices: Vec<String> = produced(&log)
        .into_iter()
        .filter(|(kind, _)| *kind == RecordKind::Basket)
        .map(|(_, invoice)| invoice)
        .collect();

    let writes: Vec<Event> = events(&log)
        .into_iter()
        .filter(|e| matches!(e, Event::InsertMany { .. } | Event::InsertOne { .. }))
        .collect();
    assert_eq!(
        writes,
        vec![
            Event::InsertMany {
                kind: RecordKind::Basket,
                invoices: invoices.clone(),
            },
            Event::InsertMany {
                kind: RecordKind::Payment,
                invoices,
            },
        ]
    );
}

#[tokio::test]
async fn test_partial_batch_drained_at_end_of_run() {
    let log = EventLog::default();
    let writer = BatchSinkWriter::new(RecordingStore::new(&log), 3);
    let run_loop = RunLoop::new(
        RunOptions {
            iterations: Some(4),
            ..Default::default()
        },
        catalog(),
        generator(9),
        Box::new(RecordingProducer::new(&log)),
        CancellationToken::new(),
    )
    .with_documents(writer);

    let metrics = run_loop.run().await.unwrap();
    assert_eq!(metrics.documents_written, 8);

    let sizes: Vec<(RecordKind, usize)> = events(&log)
        .into_iter()
        .filter_map(|e| match e {
            Event::InsertMany { kind, invoices } => Some((kind, invoices.len())),
            _ => None,
        })
        .collect();
    assert_eq!(
        sizes,
        vec![
            (RecordKind::Basket, 3),
            (RecordKind::Payment, 3),
            (RecordKind::Basket, 1),
            (RecordKind::Payment, 1),
        ]
    );
}

#[tokio::test]
async fn test_single_document_mode_writes_every_record() {
    let log = EventLog::default();
    let writer = BatchSinkWriter::new(RecordingStore::new(&log), 1);
    let run_loop = RunLoop::new(
        RunOptions {
            iterations: Some(2),
            ..Default::default()
        },
        catalog(),
        generator(13),
        Box::new(RecordingProducer::new(&log)),
        CancellationToken::new(),
    )
    .with_documents(writer);

    run_loop.run().await.unwrap();

    let kinds: Vec<RecordKind> = events(&log)
        .into_iter()
        .filter_map(|e| match e {
            Event::InsertOne { kind, .. } => Some(kind),
            _ => None,
        })
        .collect();
    assert_eq!(
        kinds,
        vec![
            RecordKind::Basket,
            RecordKind::Payment,
            RecordKind::Basket,
            RecordKind::Payment
        ]
    );
    assert!(!events(&log)
        .iter()
        .any(|e| matches!(e, Event::InsertMany { .. })));
}

#[tokio::test]
async fn test_broker_failure_is_fatal() {
    let log = EventLog::default();
    let mut producer = RecordingProducer::new(&log);
    producer.fail_on = Some(RecordKind::Payment);

    let run_loop: RunLoop<RecordingStore> = RunLoop::new(
        kafka_options(5, 0),
        catalog(),
        generator(17),
        Box::new(producer),
        CancellationToken::new(),
    );

    let err = run_loop.run().await.unwrap_err();
    let message = format!("{err:#}");
    assert!(message.contains("Failed to produce payment"));
    assert!(message.contains("pos_pmnt"));

    // Only the first basket got out, and the producer was still closed
    assert_eq!(produced(&log).len(), 1);
    assert_eq!(events(&log).last(), Some(&Event::Close));
}

#[tokio::test]
async fn test_cancelled_before_start_runs_nothing() {
    let log = EventLog::default();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let run_loop: RunLoop<RecordingStore> = RunLoop::new(
        RunOptions {
            iterations: None,
                ..Default::default()
        },
        catalog(),
        generator(19),
        Box::new(RecordingProducer::new(&log)),
        cancel,
    );

    let metrics = run_loop.run().await.unwrap();
    assert_eq!(metrics.iterations, 0);
    assert!(produced(&log).is_empty());
}

#[tokio::test]
async fn test_unbounded_run_stops_on_cancel() {
    let log = EventLog::default();
    let cancel = CancellationToken::new();
    let mut producer = RecordingProducer::new(&log);
    // Cancel while the fourth pair is in flight
    producer.cancel_after = Some((8, cancel.clone()));

    let run_loop: RunLoop<RecordingStore> = RunLoop::new(
        RunOptions {
            iterations: None,
                sleep_ms: 5,
            pacing_seed: Some(2),
            ..Default::default()
        },
        catalog(),
        generator(23),
        Box::new(producer),
        cancel,
    );

    let metrics = run_loop.run().await.unwrap();
    assert_eq!(metrics.iterations, 4);
    assert_eq!(produced(&log).len(), 8);
}

#[tokio::test]
async fn test_same_seed_same_invoices() {
    async fn invoices(seed: u64) -> Vec<(RecordKind, String)> {
        let log = EventLog::default();
        let run_loop: RunLoop<RecordingStore> = RunLoop::new(
            kafka_options(5, 0),
            catalog(),
            generator(seed),
            Box::new(RecordingProducer::new(&log)),
            CancellationToken::new(),
        );
        run_loop.run().await.unwrap();
        produced(&log)
    }

    assert_eq!(invoices(42).await, invoices(42).await);
    assert_ne!(invoices(42).await, invoices(43).await);
}

#[tokio::test]
async fn test_file_dump_written_per_run() {
    let dir = TempDir::new().unwrap();
    let dump = FileDump::create(dir.path(), "test-run").await.unwrap();
    let basket_path = dump.basket_path().to_path_buf();
    let payment_path = dump.payment_path().to_path_buf();

    let log = EventLog::default();
    let run_loop: RunLoop<RecordingStore> = RunLoop::new(
        RunOptions {
            iterations: Some(3),
            ..Default::default()
        },
        catalog(),
        generator(29),
        Box::new(RecordingProducer::new(&log)),
        CancellationToken::new(),
    )
    .with_file_dump(dump);

    let metrics = run_loop.run().await.unwrap();
    assert_eq!(metrics.file_failures, 0);

    let baskets: Vec<Basket> =
        serde_json::from_str(&std::fs::read_to_string(basket_path).unwrap()).unwrap();
    let payments: Vec<Payment> =
        serde_json::from_str(&std::fs::read_to_string(payment_path).unwrap()).unwrap();
    assert_eq!(baskets.len(), 3);
    assert_eq!(payments.len(), 3);
    for (basket, payment) in baskets.iter().zip(&payments) {
        assert_eq!(basket.invoice_number, payment.invoice_number);
        assert_eq!(basket.total, payment.paid);
    }
}

#[tokio::test]
async fn test_document_store_failures_do_not_stop_the_run() {
    let log = EventLog::default();
    let writer = BatchSinkWriter::new(RecordingStore::refusing(&log), 2);
    let run_loop = RunLoop::new(
        kafka_options(5, 0),
        catalog(),
        generator(31),
        Box::new(RecordingProducer::new(&log)),
        CancellationToken::new(),
    )
    .with_documents(writer);

    let metrics = run_loop.run().await.unwrap();
    assert_eq!(metrics.iterations, 5);
    assert_eq!(metrics.payments_produced, 5);
    assert_eq!(metrics.documents_written, 0);
    // Two full batches and the final partial one, both collections each time
    assert_eq!(metrics.document_failures, 10);
}

#[tokio::test]
async fn test_single_document_failures_do_not_stop_the_run() {
    let log = EventLog::default();
    let writer = BatchSinkWriter::new(RecordingStore::refusing(&log), 1);
    let run_loop = RunLoop::new(
        RunOptions {
            iterations: Some(3),
            ..Default::default()
        },
        catalog(),
        generator(37),
        Box::new(NoopProducer),
        CancellationToken::new(),
    )
    .with_documents(writer);

    let metrics = run_loop.run().await.unwrap();
    assert_eq!(metrics.iterations, 3);
    assert_eq!(metrics.document_failures, 6);
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn test_file_dump_failures_do_not_stop_the_run() {
    // Every write to /dev/full fails once the buffer spills
    let full = std::path::PathBuf::from("/dev/full");
    let dump = FileDump::open("full-disk", full.clone(), full).await.unwrap();

    let log = EventLog::default();
    let run_loop: RunLoop<RecordingStore> = RunLoop::new(
        RunOptions {
            iterations: Some(50),
            ..Default::default()
        },
        catalog(),
        generator(41),
        Box::new(RecordingProducer::new(&log)),
        CancellationToken::new(),
    )
    .with_file_dump(dump);

    let metrics = run_loop.run().await.unwrap();
    assert_eq!(metrics.iterations, 50);
    assert_eq!(metrics.payments_produced, 50);
    assert!(metrics.file_failures > 0);
}
