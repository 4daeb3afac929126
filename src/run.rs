//! The run loop.
//!
//! One iteration generates a basket and its payment, produces both through
//! the [`MessageProducer`] (basket first, each acknowledged before the next
//! call; a disabled broker is a `NoopProducer` whose placeholder deliveries are
//! not counted and skip the mid-pair pause), writes both
//! to the document store, appends both to the dump files and then pauses for
//! a random interval. Iterations never overlap.
//!
//! Generation, serialization and broker errors end the run. Document store
//! and file errors are logged with the invoice number, counted, and the run
//! continues.

use crate::file_dump::FileDump;
use crate::metrics::RunMetrics;
use anyhow::Context;
use basket_generator::EventGenerator;
use basket_kafka_producer::MessageProducer;
use basket_mongodb_sink::{BatchSinkWriter, DocumentStore, WriteOutcome};
use basket_types::{SalesRecord, SeedCatalog};
use chrono::Local;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

/// Flush timeout used for the periodic broker flush.
pub const DEFAULT_FLUSH_TIMEOUT: Duration = Duration::from_secs(10);

/// Loop controls.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Iterations to run; `None` runs until cancelled.
    pub iterations: Option<u64>,
    /// Upper bound of each random pause, in milliseconds.
    pub sleep_ms: u64,
    pub basket_topic: String,
    pub payment_topic: String,
    /// Produced pairs between flushes; 0 disables the periodic flush.
    pub flush_interval: u64,
    pub flush_timeout: Duration,
    /// Seed for the pause draws.
    pub pacing_seed: Option<u64>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            iterations: Some(1),
            sleep_ms: 0,
            basket_topic: "pos_basket".to_string(),
            payment_topic: "pos_pmnt".to_string(),
            flush_interval: 0,
            flush_timeout: DEFAULT_FLUSH_TIMEOUT,
            pacing_seed: None,
        }
    }
}

/// Drives generation and delivery for a whole run.
pub struct RunLoop<S> {
    options: RunOptions,
    catalog: SeedCatalog,
    generator: EventGenerator,
    producer: Box<dyn MessageProducer>,
    documents: Option<BatchSinkWriter<S>>,
    file_dump: Option<FileDump>,
    pacing: StdRng,
    cancel: CancellationToken,
    flush_counter: u64,
    metrics: RunMetrics,
}

impl<S: DocumentStore> RunLoop<S> {
    pub fn new(
        options: RunOptions,
        catalog: SeedCatalog,
        generator: EventGenerator,
        producer: Box<dyn MessageProducer>,
        cancel: CancellationToken,
    ) -> Self {
        let pacing = match options.pacing_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            options,
            catalog,
            generator,
            producer,
            documents: None,
            file_dump: None,
            pacing,
            cancel,
            flush_counter: 0,
            metrics: RunMetrics::default(),
        }
    }

    /// Also write every record to the document store.
    pub fn with_documents(mut self, writer: BatchSinkWriter<S>) -> Self {
        self.documents = Some(writer);
        self
    }

    /// Also append every record to the dump files.
    pub fn with_file_dump(mut self, dump: FileDump) -> Self {
        self.file_dump = Some(dump);
        self
    }

    /// Run to completion or cancellation, then drain every sink.
    pub async fn run(mut self) -> anyhow::Result<RunMetrics> {
        self.generator
            .check_catalog(&self.catalog)
            .context("Seed catalog cannot feed the generator")?;

        let started_at = Local::now();
        let start = Instant::now();
        info!("**** LETS GO Processing ****");

        let outcome = self.drive().await;
        self.shutdown().await;

        self.metrics.total_duration = start.elapsed();
        outcome?;

        self.metrics.report(started_at, Local::now());
        Ok(self.metrics)
    }

    async fn drive(&mut self) -> anyhow::Result<()> {
        let mut iteration: u64 = 0;
        loop {
            if let Some(limit) = self.options.iterations {
                if iteration >= limit {
                    break;
                }
            }
            if self.cancel.is_cancelled() {
                info!("Run cancelled after {iteration} iterations");
                break;
            }
            iteration += 1;

            let txn_start = Instant::now();
            self.run_iteration(iteration).await?;
            self.metrics.iterations += 1;
            debug!("Record {iteration} took {:?}", txn_start.elapsed());

            self.pause().await;
        }
        Ok(())
    }

    async fn run_iteration(&mut self, iteration: u64) -> anyhow::Result<()> {
        let generated = self
            .generator
            .generate_basket(&self.catalog)
            .with_context(|| format!("Failed to generate basket for record {iteration}"))?;
        let basket = &generated.basket;
        let invoice = basket.invoice_number.as_str();
        let payment =
            self.generator
                .generate_payment(invoice, generated.event_time, basket.total);

        let basket_json = SalesRecord::Basket(basket)
            .to_json()
            .with_context(|| format!("Failed to serialize basket {invoice}"))?;
        let payment_json = SalesRecord::Payment(&payment)
            .to_json()
            .with_context(|| format!("Failed to serialize payment {invoice}"))?;

        if tracing::enabled!(tracing::Level::TRACE) {
            for record in [SalesRecord::Basket(basket), SalesRecord::Payment(&payment)] {
                if let Ok(pretty) = record.to_pretty_json() {
                    trace!("{pretty}");
                }
            }
        }

        let delivery = self
            .producer
            .produce(
                SalesRecord::Basket(basket),
                &self.options.basket_topic,
                &generated.store_name,
            )
            .await
            .with_context(|| {
                format!(
                    "Failed to produce basket {invoice} to '{}'",
                    self.options.basket_topic
                )
            })?;
        if delivery.is_delivered() {
            self.metrics.baskets_produced += 1;
            debug!(
                "Basket {invoice} at partition {} offset {}",
                delivery.partition, delivery.offset
            );
            self.pause().await;
        }

        let delivery = self
            .producer
            .produce(
                SalesRecord::Payment(&payment),
                &self.options.payment_topic,
                &generated.store_name,
            )
            .await
            .with_context(|| {
                format!(
                    "Failed to produce payment {invoice} to '{}'",
                    self.options.payment_topic
                )
            })?;
        if delivery.is_delivered() {
            self.metrics.payments_produced += 1;
            debug!(
                "Payment {invoice} at partition {} offset {}",
                delivery.partition, delivery.offset
            );
        }

        self.flush_counter += 1;
        if self.options.flush_interval > 0 && self.flush_counter >= self.options.flush_interval {
            let remaining = self.producer.flush(self.options.flush_timeout).await;
            self.metrics.flushes += 1;
            if remaining > 0 {
                error!(
                    "Failed to flush all messages after {:?}: {remaining} message(s) remain",
                    self.options.flush_timeout
                );
            } else {
                debug!("{iteration}/{}, messages flushed from the queue", self.flush_counter);
            }
            self.flush_counter = 0;
        }

        if let Some(writer) = self.documents.as_mut() {
            match writer.write_pair(&basket_json, &payment_json).await {
                Ok(WriteOutcome::Inserted { basket, payment }) => {
                    debug!("Invoice {invoice} inserted as {basket} / {payment}");
                }
                Ok(WriteOutcome::Flushed(flushed)) => {
                    debug!(
                        "Document batch written: {} baskets, {} payments",
                        flushed.baskets, flushed.payments
                    );
                }
                Ok(WriteOutcome::Buffered) => {}
                Err(e) => {
                    error!("Document store write failed for invoice {invoice}: {e}");
                }
            }
        }

        if let Some(dump) = self.file_dump.as_mut() {
            if let Err(e) = dump.append_pair(basket, &payment).await {
                self.metrics.file_failures += 1;
                error!("File dump failed for invoice {invoice}: {e:#}");
            }
        }

        Ok(())
    }

    /// Sleep for a uniform draw from `[0, sleep_ms]`, waking early on cancellation.
    async fn pause(&mut self) {
        if self.options.sleep_ms == 0 {
            return;
        }
        let millis = self.pacing.gen_range(0..=self.options.sleep_ms);
        trace!("Going to sleep for {millis} ms");
        tokio::select! {
            _ = self.cancel.cancelled() => {}
            _ = tokio::time::sleep(Duration::from_millis(millis)) => {}
        }
    }

    async fn shutdown(&mut self) {
        if let Some(writer) = self.documents.as_mut() {
            match writer.finish().await {
                Ok(flushed) if flushed.baskets + flushed.payments > 0 => {
                    info!(
                        "Wrote final document batch: {} baskets, {} payments",
                        flushed.baskets, flushed.payments
                    );
                }
                Ok(_) => {}
                Err(e) => error!("Final document batch failed: {e}"),
            }
            let stats = writer.stats();
            self.metrics.documents_written = stats.documents_written;
            self.metrics.document_failures = stats.failed_documents;
        }

        self.producer.close().await;

        if let Some(dump) = self.file_dump.take() {
            let run_id = dump.run_id().to_string();
            if let Err(e) = dump.close().await {
                warn!("Failed to close dump files for run {run_id}: {e:#}");
            }
        }
    }
}
