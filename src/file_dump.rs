//! Per-run JSON dump of generated records.
//!
//! Each run writes `{run_id}_basket.json` and `{run_id}_pmnt.json` under the
//! output directory. Every file holds one JSON array of pretty-printed
//! records and is valid JSON once closed.

use anyhow::Context;
use basket_types::{Basket, Payment, RecordKind, SalesRecord};
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::debug;

struct DumpFile {
    path: PathBuf,
    writer: BufWriter<File>,
    records: u64,
}

impl DumpFile {
    async fn create(path: PathBuf) -> anyhow::Result<Self> {
        let file = File::create(&path)
            .await
            .with_context(|| format!("Failed to create dump file {path:?}"))?;
        let mut writer = BufWriter::new(file);
        writer.write_all(b"[\n").await?;
        debug!("Opened dump file {path:?}");
        Ok(Self {
            path,
            writer,
            records: 0,
        })
    }

    async fn append(&mut self, record: SalesRecord<'_>) -> anyhow::Result<()> {
        let pretty = record.to_pretty_json()?;
        if self.records > 0 {
            self.writer.write_all(b",\n").await?;
        }
        self.writer.write_all(pretty.as_bytes()).await?;
        self.records += 1;
        Ok(())
    }

    async fn close(mut self) -> anyhow::Result<u64> {
        self.writer.write_all(b"\n]\n").await?;
        self.writer
            .flush()
            .await
            .with_context(|| format!("Failed to flush dump file {:?}", self.path))?;
        Ok(self.records)
    }
}

/// The basket and payment dump files of one run.
pub struct FileDump {
    run_id: String,
    baskets: DumpFile,
    payments: DumpFile,
}

impl FileDump {
    /// Create both files under `dir`, creating the directory if needed.
    pub async fn create(dir: &Path, run_id: impl Into<String>) -> anyhow::Result<Self> {
        let run_id = run_id.into();
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create output directory {dir:?}"))?;

        let basket_path = Self::file_path(dir, &run_id, RecordKind::Basket);
        let payment_path = Self::file_path(dir, &run_id, RecordKind::Payment);
        Self::open(run_id, basket_path, payment_path).await
    }

    /// Create both files at explicit paths.
    pub async fn open(
        run_id: impl Into<String>,
        basket_path: PathBuf,
        payment_path: PathBuf,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            run_id: run_id.into(),
            baskets: DumpFile::create(basket_path).await?,
            payments: DumpFile::create(payment_path).await?,
        })
    }

    pub fn file_path(dir: &Path, run_id: &str, kind: RecordKind) -> PathBuf {
        dir.join(format!("{run_id}_{}.json", kind.file_suffix()))
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn basket_path(&self) -> &Path {
        &self.baskets.path
    }

    pub fn payment_path(&self) -> &Path {
        &self.payments.path
    }

    /// Append a basket and its payment. Both are attempted; the first error is returned.
    pub async fn append_pair(&mut self, basket: &Basket, payment: &Payment) -> anyhow::Result<()> {
        let basket_result = self
            .baskets
            .append(SalesRecord::Basket(basket))
            .await
            .with_context(|| format!("Failed to append basket to {:?}", self.baskets.path));
        let payment_result = self
            .payments
            .append(SalesRecord::Payment(payment))
            .await
            .with_context(|| format!("Failed to append payment to {:?}", self.payments.path));
        basket_result.and(payment_result)
    }

    /// Terminate both arrays and flush to disk.
    pub async fn close(self) -> anyhow::Result<()> {
        let baskets = self.baskets.close().await?;
        let payments = self.payments.close().await?;
        debug!(
            "Closed dump files for run {}: {baskets} baskets, {payments} payments",
            self.run_id
        );
        Ok(())
    }
}
