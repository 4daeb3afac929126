//! Batch sink writer.
//!
//! With a batch size of 1 every record goes straight to the store. Larger
//! batch sizes buffer basket/payment pairs in one slot buffer; a flush splits
//! the slots into one bulk write per collection, so a basket and its payment
//! always land in the same flush.

use crate::buffer::BatchBuffer;
use crate::convert::json_to_document;
use crate::error::SinkError;
use crate::store::DocumentStore;
use basket_types::RecordKind;
use bson::{Bson, Document};
use tracing::debug;

/// Result of a `write_pair` call.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome {
    /// Written immediately; carries the assigned `_id`s.
    Inserted { basket: Bson, payment: Bson },
    /// Held in the batch buffer.
    Buffered,
    /// Buffered, and this pair completed the batch.
    Flushed(FlushOutcome),
}

/// Documents written by one lock-step flush.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushOutcome {
    pub baskets: usize,
    pub payments: usize,
}

/// Running totals for the writer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkStats {
    pub documents_written: u64,
    pub single_writes: u64,
    pub bulk_writes: u64,
    /// Documents lost to conversion or write errors.
    pub failed_documents: u64,
}

/// Routes converted records to a [`DocumentStore`], one at a time or in batches.
pub struct BatchSinkWriter<S> {
    store: S,
    batch_size: usize,
    /// One slot per pair: the fill count is shared by both kinds.
    pairs: BatchBuffer<(Document, Document)>,
    stats: SinkStats,
}

impl<S: DocumentStore> BatchSinkWriter<S> {
    pub fn new(store: S, batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            store,
            batch_size,
            pairs: BatchBuffer::new(batch_size),
            stats: SinkStats::default(),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn stats(&self) -> SinkStats {
        self.stats
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Pairs currently buffered.
    pub fn pending(&self) -> usize {
        self.pairs.len()
    }

    /// Convert a JSON record and insert it on its own, whatever the batch size.
    pub async fn write_record(&mut self, kind: RecordKind, json: &[u8]) -> Result<Bson, SinkError> {
        let document = match json_to_document(json) {
            Ok(document) => document,
            Err(source) => {
                self.stats.failed_documents += 1;
                return Err(SinkError::Convert { kind, source });
            }
        };
        self.insert_single(kind, document).await
    }

    async fn insert_single(&mut self, kind: RecordKind, document: Document) -> Result<Bson, SinkError> {
        match self.store.insert_one(kind, document).await {
            Ok(id) => {
                self.stats.documents_written += 1;
                self.stats.single_writes += 1;
                debug!("Inserted {kind} document {id}");
                Ok(id)
            }
            Err(e) => {
                self.stats.failed_documents += 1;
                Err(e)
            }
        }
    }

    /// Write a basket and its payment.
    ///
    /// Both records are converted first; if either fails the whole pair is
    /// dropped so no payment is ever written without its basket. With a batch
    /// size of 1 both are inserted immediately, basket first. Otherwise the
    /// pair takes the next slot and a full buffer is flushed.
    pub async fn write_pair(
        &mut self,
        basket_json: &[u8],
        payment_json: &[u8],
    ) -> Result<WriteOutcome, SinkError> {
        let converted = json_to_document(basket_json)
            .map_err(|source| SinkError::Convert {
                kind: RecordKind::Basket,
                source,
            })
            .and_then(|basket| {
                json_to_document(payment_json)
                    .map(|payment| (basket, payment))
                    .map_err(|source| SinkError::Convert {
                        kind: RecordKind::Payment,
                        source,
                    })
            });
        let (basket, payment) = match converted {
            Ok(pair) => pair,
            Err(e) => {
                self.stats.failed_documents += 2;
                return Err(e);
            }
        };

        if self.batch_size == 1 {
            let basket = self.insert_single(RecordKind::Basket, basket).await;
            let payment = self.insert_single(RecordKind::Payment, payment).await;
            return Ok(WriteOutcome::Inserted {
                basket: basket?,
                payment: payment?,
            });
        }

        if self.pairs.push((basket, payment)).is_err() {
            // Full buffers are flushed as soon as they fill
            self.stats.failed_documents += 2;
            return Err(SinkError::BatchOverflow {
                capacity: self.batch_size,
            });
        }
        if self.pairs.is_full() {
            return self.flush().await.map(WriteOutcome::Flushed);
        }
        Ok(WriteOutcome::Buffered)
    }

    /// Bulk-write every buffered pair, baskets first. The buffer is drained even on error.
    pub async fn flush(&mut self) -> Result<FlushOutcome, SinkError> {
        let (baskets, payments): (Vec<Document>, Vec<Document>) =
            self.pairs.drain_and_reset().into_iter().unzip();

        let basket_result = self.write_batch(RecordKind::Basket, baskets).await;
        let payment_result = self.write_batch(RecordKind::Payment, payments).await;

        let outcome = FlushOutcome {
            baskets: basket_result?,
            payments: payment_result?,
        };
        debug!(
            "Flushed {} basket and {} payment documents",
            outcome.baskets, outcome.payments
        );
        Ok(outcome)
    }

    async fn write_batch(
        &mut self,
        kind: RecordKind,
        documents: Vec<Document>,
    ) -> Result<usize, SinkError> {
        if documents.is_empty() {
            return Ok(0);
        }
        let count = documents.len();
        match self.store.insert_many(kind, documents).await {
            Ok(inserted) => {
                self.stats.documents_written += inserted as u64;
                self.stats.bulk_writes += 1;
                Ok(inserted)
            }
            Err(e) => {
                self.stats.failed_documents += count as u64;
                Err(e)
            }
        }
    }

    /// Write any partially filled batch. Call once at shutdown.
    pub async fn finish(&mut self) -> Result<FlushOutcome, SinkError> {
        if self.pairs.is_empty() {
            return Ok(FlushOutcome::default());
        }
        self.flush().await
    }
}
