//! Generated sales records.
//!
//! Field names on the wire (JSON documents, file dump) are camelCase:
//!
//! ```text
//! Basket  { invoiceNumber, saleDateTime, saleTimestamp, store, clerk,
//!           terminalPoint, basketItems, nett, vat, total }
//! Payment { invoiceNumber, payDateTime, payTimestamp, paid, finTransactionId }
//! ```

use crate::error::EncodeError;
use crate::proto;
use serde::{Deserialize, Serialize};

/// Reference to a store or clerk by id and display name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdRef {
    pub id: String,
    pub name: String,
}

/// One line of a basket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasketItem {
    pub id: String,
    pub name: String,
    pub brand: String,
    pub category: String,
    pub price: f64,
    pub quantity: i32,
}

/// A retail sale with line items and computed totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Basket {
    pub invoice_number: String,
    /// Local time with millisecond precision and the configured zone offset appended.
    pub sale_date_time: String,
    /// Epoch milliseconds of the same instant as `sale_date_time`.
    pub sale_timestamp: String,
    pub store: IdRef,
    pub clerk: IdRef,
    pub terminal_point: String,
    pub basket_items: Vec<BasketItem>,
    pub nett: f64,
    pub vat: f64,
    pub total: f64,
}

/// Settlement of a basket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub invoice_number: String,
    pub pay_date_time: String,
    pub pay_timestamp: String,
    pub paid: f64,
    pub fin_transaction_id: String,
}

/// The two kinds of record the pipeline emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Basket,
    Payment,
}

impl RecordKind {
    /// Protobuf message name registered with the schema registry.
    pub fn message_name(&self) -> &'static str {
        match self {
            RecordKind::Basket => "Basket",
            RecordKind::Payment => "Payment",
        }
    }

    /// Suffix used for the per-run dump files.
    pub fn file_suffix(&self) -> &'static str {
        match self {
            RecordKind::Basket => "basket",
            RecordKind::Payment => "pmnt",
        }
    }

    /// Protobuf schema text for this record kind.
    pub fn proto_schema(&self) -> &'static str {
        match self {
            RecordKind::Basket => proto::BASKET_PROTO,
            RecordKind::Payment => proto::PAYMENT_PROTO,
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordKind::Basket => write!(f, "basket"),
            RecordKind::Payment => write!(f, "payment"),
        }
    }
}

/// A borrowed record of either kind, handed to the sinks.
#[derive(Debug, Clone, Copy)]
pub enum SalesRecord<'a> {
    Basket(&'a Basket),
    Payment(&'a Payment),
}

impl SalesRecord<'_> {
    pub fn kind(&self) -> RecordKind {
        match self {
            SalesRecord::Basket(_) => RecordKind::Basket,
            SalesRecord::Payment(_) => RecordKind::Payment,
        }
    }

    pub fn invoice_number(&self) -> &str {
        match self {
            SalesRecord::Basket(b) => &b.invoice_number,
            SalesRecord::Payment(p) => &p.invoice_number,
        }
    }

    /// Compact JSON encoding, the intermediate form for the document store.
    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        match self {
            SalesRecord::Basket(b) => serde_json::to_vec(b),
            SalesRecord::Payment(p) => serde_json::to_vec(p),
        }
    }

    /// Pretty-printed JSON, used for the file dump and trace echo.
    pub fn to_pretty_json(&self) -> serde_json::Result<String> {
        match self {
            SalesRecord::Basket(b) => serde_json::to_string_pretty(b),
            SalesRecord::Payment(p) => serde_json::to_string_pretty(p),
        }
    }

    /// Protobuf binary encoding of the record body (without any registry framing).
    pub fn encode_protobuf(&self) -> Result<Vec<u8>, EncodeError> {
        match self {
            SalesRecord::Basket(b) => proto::encode_basket(b),
            SalesRecord::Payment(p) => proto::encode_payment(p),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_basket() -> Basket {
        Basket {
            invoice_number: "inv-1".to_string(),
            sale_date_time: "2024-06-15T12:30:45.123+02:00".to_string(),
            sale_timestamp: "1718447445123".to_string(),
            store: IdRef {
                id: "s1".to_string(),
                name: "Downtown".to_string(),
            },
            clerk: IdRef {
                id: "c1".to_string(),
                name: "Alice".to_string(),
            },
            terminal_point: "7".to_string(),
            basket_items: vec![BasketItem {
                id: "p1".to_string(),
                name: "Tea".to_string(),
                brand: "Leaf".to_string(),
                category: "Drinks".to_string(),
                price: 10.0,
                quantity: 2,
            }],
            nett: 20.0,
            vat: 3.0,
            total: 23.0,
        }
    }

    pub(crate) fn sample_payment() -> Payment {
        Payment {
            invoice_number: "inv-1".to_string(),
            pay_date_time: "2024-06-15T12:33:10.123+02:00".to_string(),
            pay_timestamp: "1718447590123".to_string(),
            paid: 23.0,
            fin_transaction_id: "fin-1".to_string(),
        }
    }

    #[test]
    fn test_basket_json_field_names() {
        let basket = sample_basket();
        let value: serde_json::Value =
            serde_json::from_slice(&SalesRecord::Basket(&basket).to_json().unwrap()).unwrap();

        let keys: Vec<&str> = value
            .as_object()
            .unwrap()
            .keys()
            .map(|k| k.as_str())
            .collect();
        assert_eq!(
            keys,
            vec![
                "invoiceNumber",
                "saleDateTime",
                "saleTimestamp",
                "store",
                "clerk",
                "terminalPoint",
                "basketItems",
                "nett",
                "vat",
                "total"
            ]
        );
        assert_eq!(value["basketItems"][0]["quantity"], 2);
    }

    #[test]
    fn test_payment_json_field_names() {
        let payment = sample_payment();
        let json = String::from_utf8(SalesRecord::Payment(&payment).to_json().unwrap()).unwrap();
        assert!(json.contains("\"finTransactionId\":\"fin-1\""));
        assert!(json.contains("\"payTimestamp\":\"1718447590123\""));
    }

    #[test]
    fn test_record_kind_accessors() {
        let basket = sample_basket();
        let record = SalesRecord::Basket(&basket);
        assert_eq!(record.kind(), RecordKind::Basket);
        assert_eq!(record.invoice_number(), "inv-1");
        assert_eq!(RecordKind::Payment.file_suffix(), "pmnt");
        assert_eq!(RecordKind::Payment.to_string(), "payment");
    }
}
