//! MongoDB sink for basket-loadgen.
//!
//! Records arrive as the same compact JSON produced for the broker path and
//! are converted into BSON documents before being written:
//!
//! - batch size 1: every record is inserted immediately with `insert_one`
//! - batch size N: basket/payment pairs accumulate in one [`BatchBuffer`] of
//!   slots and are bulk-written, one `insert_many` per collection, once N
//!   pairs are buffered
//!
//! ## Usage
//!
//! ```rust,no_run
//! use basket_mongodb_sink::{BatchSinkWriter, CollectionNames, MongoDocumentStore};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let names = CollectionNames::new("pos_basket", "pos_pmnt");
//! let store = MongoDocumentStore::connect("mongodb://localhost:27017", "pos", names).await?;
//! let mut writer = BatchSinkWriter::new(store, 100);
//!
//! writer
//!     .write_pair(
//!         br#"{"invoiceNumber":"inv-1","total":20.13}"#,
//!         br#"{"invoiceNumber":"inv-1","paid":20.13}"#,
//!     )
//!     .await?;
//! writer.finish().await?;
//! # Ok(())
//! # }
//! ```

pub mod buffer;
pub mod convert;
pub mod error;
pub mod store;
pub mod writer;

pub use buffer::BatchBuffer;
pub use convert::json_to_document;
pub use error::{ConvertError, SinkError};
pub use store::{CollectionNames, DocumentStore, MongoDocumentStore};
pub use writer::{BatchSinkWriter, FlushOutcome, SinkStats, WriteOutcome};
