//! Schema-registry wire envelope.
//!
//! ```text
//! ┌───────────┬──────────────────┬─────────────────┬──────────────────┐
//! │ magic (0) │ schema id (u32)  │ message indexes │ protobuf payload │
//! │  1 byte   │  4 bytes, BE     │  zigzag varints │                  │
//! └───────────┴──────────────────┴─────────────────┴──────────────────┘
//! ```
//!
//! Message indexes locate the record message inside its schema file. The
//! common case `[0]` (first message) is written as the single byte `0`.

/// Leading byte of every framed payload.
pub const MAGIC_BYTE: u8 = 0;

// Zig-Zag varint, as used by the registry envelope for message indexes
fn write_varint(buf: &mut Vec<u8>, n: i64) {
    let mut val = ((n << 1) ^ (n >> 63)) as u64;
    while val >= 0x80 {
        buf.push((val as u8) | 0x80);
        val >>= 7;
    }
    buf.push(val as u8);
}

#[cfg(test)]
fn read_varint(bytes: &[u8], pos: &mut usize) -> Option<i64> {
    let mut result: u64 = 0;
    let mut shift = 0;
    loop {
        let byte = *bytes.get(*pos)?;
        *pos += 1;
        result |= ((byte & 0x7f) as u64) << shift;
        if byte & 0x80 == 0 {
            break;
        }
        shift += 7;
        if shift >= 64 {
            return None;
        }
    }
    Some(((result >> 1) as i64) ^ -((result & 1) as i64))
}

/// Encode the message-index path of the record message.
pub fn encode_message_indexes(indexes: &[i64]) -> Vec<u8> {
    if indexes == [0] {
        return vec![0];
    }
    let mut buf = Vec::new();
    write_varint(&mut buf, indexes.len() as i64);
    for index in indexes {
        write_varint(&mut buf, *index);
    }
    buf
}

/// Wrap a protobuf payload in the registry envelope.
pub fn frame(schema_id: u32, indexes: &[i64], payload: &[u8]) -> Vec<u8> {
    let index_bytes = encode_message_indexes(indexes);
    let mut out = Vec::with_capacity(5 + index_bytes.len() + payload.len());
    out.push(MAGIC_BYTE);
    out.extend_from_slice(&schema_id.to_be_bytes());
    out.extend_from_slice(&index_bytes);
    out.extend_from_slice(payload);
    out
}

/// A decoded envelope.
#[cfg(test)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Framed<'a> {
    pub schema_id: u32,
    pub indexes: Vec<i64>,
    pub payload: &'a [u8],
}

/// Split a framed payload back into its parts. Returns `None` on a bad header.
#[cfg(test)]
pub(crate) fn unframe(bytes: &[u8]) -> Option<Framed<'_>> {
    if bytes.len() < 5 || bytes[0] != MAGIC_BYTE {
        return None;
    }
    let schema_id = u32::from_be_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]);

    let mut pos = 5;
    let count = read_varint(bytes, &mut pos)?;
    let indexes = if count == 0 {
        vec![0]
    } else {
        (0..count)
            .map(|_| read_varint(bytes, &mut pos))
            .collect::<Option<Vec<_>>>()?
    };

    Some(Framed {
        schema_id,
        indexes,
        payload: &bytes[pos..],
    })
}
