//! Protobuf schema and wire encoding for sales records.
//!
//! The schema text is what gets registered with the schema registry. The
//! top-level record message is declared first in each file so that its
//! message index is `[0]`.
//!
//! Encoding follows proto3 wire format:
//! - Each field is encoded as (tag, value) pairs
//! - Tag = (field_number << 3) | wire_type
//! - Nested messages are written as length-delimited bytes

use crate::error::EncodeError;
use crate::record::{Basket, BasketItem, IdRef, Payment};
use protobuf::CodedOutputStream;

/// Schema for the basket topic.
pub const BASKET_PROTO: &str = r#"syntax = "proto3";
package sales;

message Basket {
  string invoiceNumber = 1;
  string saleDateTime = 2;
  string saleTimestamp = 3;
  IdRef store = 4;
  IdRef clerk = 5;
  string terminalPoint = 6;
  repeated BasketItem basketItems = 7;
  double nett = 8;
  double vat = 9;
  double total = 10;
}

message IdRef {
  string id = 1;
  string name = 2;
}

message BasketItem {
  string id = 1;
  string name = 2;
  string brand = 3;
  string category = 4;
  double price = 5;
  int32 quantity = 6;
}
"#;

/// Schema for the payment topic.
pub const PAYMENT_PROTO: &str = r#"syntax = "proto3";
package sales;

message Payment {
  string invoiceNumber = 1;
  string payDateTime = 2;
  string payTimestamp = 3;
  double paid = 4;
  string finTransactionId = 5;
}
"#;

type Result<T> = std::result::Result<T, EncodeError>;

/// Run `write` against a fresh output stream and return the encoded bytes.
fn encode_message<F>(message: &'static str, write: F) -> Result<Vec<u8>>
where
    F: FnOnce(&mut CodedOutputStream) -> protobuf::Result<()>,
{
    let mut buffer = Vec::new();
    {
        let mut stream = CodedOutputStream::vec(&mut buffer);
        write(&mut stream)
            .and_then(|_| stream.flush())
            .map_err(|source| EncodeError::Protobuf { message, source })?;
    }
    Ok(buffer)
}

fn encode_id_ref(id_ref: &IdRef) -> Result<Vec<u8>> {
    encode_message("IdRef", |s| {
        s.write_string(1, &id_ref.id)?;
        s.write_string(2, &id_ref.name)
    })
}

fn encode_basket_item(item: &BasketItem) -> Result<Vec<u8>> {
    encode_message("BasketItem", |s| {
        s.write_string(1, &item.id)?;
        s.write_string(2, &item.name)?;
        s.write_string(3, &item.brand)?;
        s.write_string(4, &item.category)?;
        s.write_double(5, item.price)?;
        s.write_int32(6, item.quantity)
    })
}

/// Encode a basket as a `sales.Basket` message.
pub fn encode_basket(basket: &Basket) -> Result<Vec<u8>> {
    let store = encode_id_ref(&basket.store)?;
    let clerk = encode_id_ref(&basket.clerk)?;
    let items = basket
        .basket_items
        .iter()
        .map(encode_basket_item)
        .collect::<Result<Vec<_>>>()?;

    encode_message("Basket", |s| {
        s.write_string(1, &basket.invoice_number)?;
        s.write_string(2, &basket.sale_date_time)?;
        s.write_string(3, &basket.sale_timestamp)?;
        s.write_bytes(4, &store)?;
        s.write_bytes(5, &clerk)?;
        s.write_string(6, &basket.terminal_point)?;
        for item in &items {
            s.write_bytes(7, item)?;
        }
        s.write_double(8, basket.nett)?;
        s.write_double(9, basket.vat)?;
        s.write_double(10, basket.total)
    })
}

/// Encode a payment as a `sales.Payment` message.
pub fn encode_payment(payment: &Payment) -> Result<Vec<u8>> {
    encode_message("Payment", |s| {
        s.write_string(1, &payment.invoice_number)?;
        s.write_string(2, &payment.pay_date_time)?;
        s.write_string(3, &payment.pay_timestamp)?;
        s.write_double(4, payment.paid)?;
        s.write_string(5, &payment.fin_transaction_id)
    })
}
