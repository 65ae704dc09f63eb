// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Packet framing and CBOR helpers for the session stream.
//!
//! Packet layout:
//!
//! ``MAGIC(4) || VERSION(2) || FLAGS(2) || LENGTH(4) || PAYLOAD || CHECKSUM(32)``
//!
//! * PAYLOAD is a CBOR `OpEnvelope`
//! * CHECKSUM = blake3-256 over HEADER (first 12 bytes) || PAYLOAD

use blake3::Hasher;
use ciborium::value::Value;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

use crate::{Message, OpEnvelope};

/// Protocol magic constant "TESS".
pub const MAGIC: [u8; 4] = *b"TESS";
/// Wire protocol version (big-endian u16).
pub const VERSION: u16 = 0x0001;
/// Reserved flags (set to zero for v1).
pub const FLAGS: u16 = 0x0000;
/// Header size in bytes.
pub const HEADER_BYTES: usize = 12;
/// Trailing checksum size in bytes.
pub const CHECKSUM_BYTES: usize = 32;
/// Default upper bound on a single payload.
pub const MAX_PAYLOAD: usize = 8 * 1024 * 1024;

/// Framing or codec failure.
#[derive(Debug, Error)]
pub enum WireError {
    /// Fewer bytes than the header/length announce.
    #[error("incomplete packet")]
    Incomplete,
    /// First four bytes are not [`MAGIC`].
    #[error("bad magic")]
    BadMagic,
    /// Peer speaks another protocol version.
    #[error("unsupported version {0:#06x}")]
    UnsupportedVersion(u16),
    /// Declared payload exceeds the configured limit.
    #[error("payload too large ({len} > {max})")]
    PayloadTooLarge {
        /// Declared payload length.
        len: usize,
        /// Configured limit.
        max: usize,
    },
    /// blake3 checksum did not match header || payload.
    #[error("checksum mismatch")]
    ChecksumMismatch,
    /// CBOR serialization failed.
    #[error("cbor encode: {0}")]
    Encode(String),
    /// CBOR deserialization failed.
    #[error("cbor decode: {0}")]
    Decode(String),
    /// Envelope carried an op this side does not know.
    #[error("unknown op {0}")]
    UnknownOp(String),
}

/// Encode to CBOR bytes.
pub fn to_cbor<T: Serialize>(value: &T) -> Result<Vec<u8>, WireError> {
    let mut out = Vec::new();
    ciborium::ser::into_writer(value, &mut out).map_err(|e| WireError::Encode(e.to_string()))?;
    Ok(out)
}

/// Decode from CBOR bytes.
pub fn from_cbor<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, WireError> {
    ciborium::de::from_reader(bytes).map_err(|e| WireError::Decode(e.to_string()))
}

fn to_value<T: Serialize>(value: &T) -> Result<Value, WireError> {
    Value::serialized(value).map_err(|e| WireError::Encode(e.to_string()))
}

fn from_value<T: DeserializeOwned>(value: &Value) -> Result<T, WireError> {
    value
        .deserialized()
        .map_err(|e| WireError::Decode(e.to_string()))
}

/// A full packet (header + payload + checksum).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Raw header (12 bytes).
    pub header: [u8; HEADER_BYTES],
    /// CBOR payload bytes.
    pub payload: Vec<u8>,
    /// blake3 checksum over header||payload.
    pub checksum: [u8; CHECKSUM_BYTES],
}

impl Packet {
    /// Build a packet around a CBOR payload.
    pub fn from_payload(payload: Vec<u8>) -> Result<Self, WireError> {
        let len = u32::try_from(payload.len()).map_err(|_| WireError::PayloadTooLarge {
            len: payload.len(),
            max: u32::MAX as usize,
        })?;
        let mut header = [0u8; HEADER_BYTES];
        header[0..4].copy_from_slice(&MAGIC);
        header[4..6].copy_from_slice(&VERSION.to_be_bytes());
        header[6..8].copy_from_slice(&FLAGS.to_be_bytes());
        header[8..12].copy_from_slice(&len.to_be_bytes());
        let checksum = checksum(&header, &payload);
        Ok(Self {
            header,
            payload,
            checksum,
        })
    }

    /// Serialize header || payload || checksum.
    pub fn into_bytes(self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_BYTES + self.payload.len() + CHECKSUM_BYTES);
        out.extend_from_slice(&self.header);
        out.extend_from_slice(&self.payload);
        out.extend_from_slice(&self.checksum);
        out
    }

    /// Encode an `OpEnvelope` into a full packet byte vector.
    pub fn encode_envelope<P: Serialize>(env: &OpEnvelope<P>) -> Result<Vec<u8>, WireError> {
        Ok(Packet::from_payload(to_cbor(env)?)?.into_bytes())
    }

    /// Decode a packet from the front of `bytes`, returning the envelope and bytes consumed.
    pub fn decode_envelope<P: DeserializeOwned>(
        bytes: &[u8],
    ) -> Result<(OpEnvelope<P>, usize), WireError> {
        let Some(frame_len) = frame_len(bytes, usize::MAX)? else {
            return Err(WireError::Incomplete);
        };
        if bytes.len() < frame_len {
            return Err(WireError::Incomplete);
        }
        let header = &bytes[..HEADER_BYTES];
        let payload = &bytes[HEADER_BYTES..frame_len - CHECKSUM_BYTES];
        let sum = &bytes[frame_len - CHECKSUM_BYTES..frame_len];
        if checksum(header, payload)[..] != *sum {
            return Err(WireError::ChecksumMismatch);
        }
        let env: OpEnvelope<P> = from_cbor(payload)?;
        Ok((env, frame_len))
    }
}

fn checksum(header: &[u8], payload: &[u8]) -> [u8; CHECKSUM_BYTES] {
    let mut hasher = Hasher::new();
    hasher.update(header);
    hasher.update(payload);
    *hasher.finalize().as_bytes()
}

/// Total packet length announced by the header at the front of `buf`.
///
/// `Ok(None)` until a whole header is buffered. Validates magic and version so
/// a desynchronized stream fails fast instead of waiting on a bogus length.
pub fn frame_len(buf: &[u8], max_payload: usize) -> Result<Option<usize>, WireError> {
    if buf.len() < HEADER_BYTES {
        return Ok(None);
    }
    if buf[0..4] != MAGIC {
        return Err(WireError::BadMagic);
    }
    let version = u16::from_be_bytes([buf[4], buf[5]]);
    if version != VERSION {
        return Err(WireError::UnsupportedVersion(version));
    }
    let len = u32::from_be_bytes([buf[8], buf[9], buf[10], buf[11]]) as usize;
    if len > max_payload {
        return Err(WireError::PayloadTooLarge {
            len,
            max: max_payload,
        });
    }
    HEADER_BYTES
        .checked_add(len)
        .and_then(|v| v.checked_add(CHECKSUM_BYTES))
        .map(Some)
        .ok_or(WireError::PayloadTooLarge {
            len,
            max: max_payload,
        })
}

/// Drain one complete packet from the front of an accumulator, if buffered.
pub fn try_extract_frame(acc: &mut Vec<u8>, max_payload: usize) -> Result<Option<Vec<u8>>, WireError> {
    let Some(frame_len) = frame_len(acc, max_payload)? else {
        return Ok(None);
    };
    if acc.len() < frame_len {
        return Ok(None);
    }
    Ok(Some(acc.drain(..frame_len).collect()))
}

/// Encode a `Message` into a packet with the provided logical timestamp.
pub fn encode_message(msg: &Message, ts: u64) -> Result<Vec<u8>, WireError> {
    let payload = match msg {
        Message::Polygon(p) | Message::Triangle(p) => to_value(p)?,
        Message::Error(e) => to_value(e)?,
        Message::Close => Value::Null,
    };
    let env = OpEnvelope {
        op: msg.op_name().to_string(),
        ts,
        payload,
    };
    Packet::encode_envelope(&env)
}

/// Decode bytes into (Message, ts, bytes_consumed).
pub fn decode_message(bytes: &[u8]) -> Result<(Message, u64, usize), WireError> {
    let (env, used) = Packet::decode_envelope::<Value>(bytes)?;
    let msg = match env.op.as_str() {
        "polygon" => Message::Polygon(from_value(&env.payload)?),
        "triangle" => Message::Triangle(from_value(&env.payload)?),
        "error" => Message::Error(from_value(&env.payload)?),
        "close" => Message::Close,
        other => return Err(WireError::UnknownOp(other.to_string())),
    };
    Ok((msg, env.ts, used))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ErrorPayload, Polygon, ValidationError, Vertex};

    #[test]
    fn polygon_packet_decodes_with_ts_and_length() {
        let msg = Message::Polygon(Polygon::unit_square());
        let bytes = encode_message(&msg, 7).unwrap();
        assert_eq!(&bytes[0..4], b"TESS");

        let (decoded, ts, used) = decode_message(&bytes).unwrap();
        assert_eq!(decoded, msg);
        assert_eq!(ts, 7);
        assert_eq!(used, bytes.len());
    }

    #[test]
    fn triangle_keeps_fractional_and_negative_coordinates() {
        let msg = Message::Triangle(Polygon::new(vec![
            Vertex::new(-0.125, 1e-9, 3.5),
            Vertex::new(1.0e12, -7.0, 0.1),
            Vertex::new(0.0, -0.0, 2.0),
        ]));
        let (decoded, _, _) = decode_message(&encode_message(&msg, 0).unwrap()).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn empty_polygon_and_close_are_representable() {
        for msg in [Message::Polygon(Polygon::default()), Message::Close] {
            let (decoded, _, _) = decode_message(&encode_message(&msg, 1).unwrap()).unwrap();
            assert_eq!(decoded, msg);
        }
    }

    #[test]
    fn error_payload_survives_the_wire() {
        let msg = Message::Error(ErrorPayload::invalid_polygon(ValidationError::NoVertices, 0));
        let (decoded, _, _) = decode_message(&encode_message(&msg, 3).unwrap()).unwrap();
        let Message::Error(payload) = &decoded else {
            panic!("expected error, got {decoded:?}");
        };
        assert_eq!(payload.as_invalid_polygon().map(|d| d.vertex_count), Some(0));
    }

    #[test]
    fn flipped_payload_byte_fails_checksum() {
        let mut bytes = encode_message(&Message::Close, 0).unwrap();
        bytes[HEADER_BYTES] ^= 0xff;
        assert!(matches!(
            decode_message(&bytes),
            Err(WireError::ChecksumMismatch)
        ));
    }

    #[test]
    fn bad_magic_and_version_are_rejected() {
        let good = encode_message(&Message::Close, 0).unwrap();

        let mut bad_magic = good.clone();
        bad_magic[0] = b'X';
        assert!(matches!(decode_message(&bad_magic), Err(WireError::BadMagic)));

        let mut bad_version = good;
        bad_version[5] = 0x02;
        assert!(matches!(
            decode_message(&bad_version),
            Err(WireError::UnsupportedVersion(0x0002))
        ));
    }

    #[test]
    fn unknown_op_is_an_error() {
        let env = OpEnvelope {
            op: "subscribe".to_string(),
            ts: 0,
            payload: Value::Null,
        };
        let bytes = Packet::encode_envelope(&env).unwrap();
        assert!(matches!(decode_message(&bytes), Err(WireError::UnknownOp(op)) if op == "subscribe"));
    }

    #[test]
    fn try_extract_frame_drains_one_frame_and_preserves_remainder() {
        let f1 = encode_message(&Message::Polygon(Polygon::unit_square()), 0).unwrap();
        let f2 = encode_message(&Message::Close, 1).unwrap();
        let mut acc = [f1.clone(), f2.clone()].concat();

        // a partial header is not a frame yet
        let mut partial = f1[..5].to_vec();
        assert!(try_extract_frame(&mut partial, MAX_PAYLOAD).unwrap().is_none());

        let pkt1 = try_extract_frame(&mut acc, MAX_PAYLOAD).unwrap().expect("pkt1");
        assert_eq!(pkt1, f1);
        assert_eq!(acc, f2);

        let pkt2 = try_extract_frame(&mut acc, MAX_PAYLOAD).unwrap().expect("pkt2");
        assert_eq!(pkt2, f2);
        assert!(acc.is_empty());
    }

    #[test]
    fn oversized_length_is_rejected_before_buffering() {
        let mut acc = encode_message(&Message::Polygon(Polygon::unit_square()), 0).unwrap();
        let err = try_extract_frame(&mut acc, 4).expect_err("too large");
        assert!(matches!(err, WireError::PayloadTooLarge { max: 4, .. }));
    }
}
