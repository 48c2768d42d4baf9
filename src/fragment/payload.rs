//! Wire encoding for frames.
//!
//! Each datagram is laid out as
//! `[FRAME_MAGIC][u16 header_len][header bytes][frame payload]`. The header is
//! encoded with fixed-width integers, so the overhead only depends on the
//! part tag variant and [`frame_overhead`] can report the worst case.

use std::num::NonZeroUsize;

use bincode::{
    borrow_decode_from_slice,
    config::{self, Config},
    encode_to_vec,
    error::EncodeError,
};
use bytes::{BufMut, Bytes, BytesMut};

use super::{
    DeliveryMode,
    FragmentIndex,
    FrameDecodeError,
    FrameHeader,
    MessageId,
    PartTag,
};

/// Magic prefix that marks a peerframe datagram.
pub const FRAME_MAGIC: &[u8; 4] = b"PFRM";

const LEN_PREFIX: usize = std::mem::size_of::<u16>();

fn header_config() -> impl Config { config::standard().with_fixed_int_encoding() }

/// Largest number of bytes a frame adds around its payload.
///
/// # Panics
///
/// Panics if encoding a constant header fails, which would indicate a
/// programmer error in the header definition.
#[must_use]
pub fn frame_overhead() -> NonZeroUsize {
    let widest = FrameHeader::new(
        MessageId::new(u64::MAX),
        FragmentIndex::new(u32::MAX),
        u32::MAX,
        DeliveryMode::UnorderedUnreliable,
        PartTag::Attachment(u32::MAX),
    );
    let header_bytes = encode_to_vec(widest, header_config())
        .unwrap_or_else(|err| panic!("frame header encoding must be infallible: {err}"));
    let overhead = FRAME_MAGIC.len() + LEN_PREFIX + header_bytes.len();
    NonZeroUsize::new(overhead)
        .unwrap_or_else(|| panic!("frame overhead must be non-zero (computed {overhead})"))
}

/// Encode a frame into a single datagram.
///
/// # Errors
///
/// Returns an [`EncodeError`] if the header cannot be encoded.
pub fn encode_frame(header: FrameHeader, payload: &[u8]) -> Result<Bytes, EncodeError> {
    let header_bytes = encode_to_vec(header, header_config())?;
    let header_len = u16::try_from(header_bytes.len())
        .map_err(|_| EncodeError::Other("frame header length must fit within u16::MAX"))?;

    let mut buf =
        BytesMut::with_capacity(FRAME_MAGIC.len() + LEN_PREFIX + header_bytes.len() + payload.len());
    buf.put_slice(FRAME_MAGIC);
    buf.put_u16(header_len);
    buf.put_slice(&header_bytes);
    buf.put_slice(payload);
    Ok(buf.freeze())
}

/// Split a datagram into its header and payload.
///
/// The returned header is guaranteed to carry an index inside its declared
/// total.
///
/// # Errors
///
/// Returns [`FrameDecodeError`] when the marker is absent, the datagram is
/// truncated, the header is malformed, or the index is out of range.
pub fn decode_frame(datagram: &[u8]) -> Result<(FrameHeader, &[u8]), FrameDecodeError> {
    let Some(prefix) = datagram.get(..FRAME_MAGIC.len()) else {
        return Err(FrameDecodeError::MissingMagic);
    };
    if prefix != FRAME_MAGIC {
        return Err(FrameDecodeError::MissingMagic);
    }

    let len_offset = FRAME_MAGIC.len();
    let Some(&[hi, lo]) = datagram.get(len_offset..len_offset + LEN_PREFIX) else {
        return Err(FrameDecodeError::Truncated {
            additional: len_offset + LEN_PREFIX - datagram.len(),
        });
    };
    let header_len = usize::from(u16::from_be_bytes([hi, lo]));
    let header_start = len_offset + LEN_PREFIX;
    let header_end = header_start + header_len;

    let Some(header_bytes) = datagram.get(header_start..header_end) else {
        return Err(FrameDecodeError::Truncated {
            additional: header_end.saturating_sub(datagram.len()),
        });
    };

    let (header, consumed) =
        borrow_decode_from_slice::<FrameHeader, _>(header_bytes, header_config())?;
    if consumed != header_len {
        return Err(FrameDecodeError::HeaderLengthMismatch {
            advertised: header_len,
            consumed,
        });
    }
    if !header.is_in_range() {
        return Err(FrameDecodeError::IndexOutOfRange {
            message_id: header.message_id(),
            index: header.index(),
            total: header.total(),
        });
    }

    let payload = datagram.get(header_end..).unwrap_or_default();
    Ok((header, payload))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(index: u32, total: u32, part: PartTag) -> FrameHeader {
        FrameHeader::new(
            MessageId::new(9),
            FragmentIndex::new(index),
            total,
            DeliveryMode::ReliableOrdered,
            part,
        )
    }

    #[test]
    fn decode_recovers_header_and_payload() {
        let header = header(2, 3, PartTag::Attachment(0));
        let encoded = encode_frame(header, &[1, 2, 3, 4]).expect("encode frame");

        let (decoded, payload) = decode_frame(&encoded).expect("decode frame");
        assert_eq!(decoded, header);
        assert_eq!(payload, [1, 2, 3, 4]);
    }

    #[test]
    fn overhead_bounds_every_header_variant() {
        for part in [PartTag::Text, PartTag::Attachment(u32::MAX)] {
            let encoded = encode_frame(header(0, 1, part), &[]).expect("encode frame");
            assert!(encoded.len() <= frame_overhead().get());
        }
    }

    #[test]
    fn decode_rejects_foreign_datagrams() {
        let err = decode_frame(b"hello world").expect_err("marker must be required");
        assert!(matches!(err, FrameDecodeError::MissingMagic));
    }

    #[test]
    fn decode_rejects_truncated_header() {
        let encoded = encode_frame(header(0, 1, PartTag::Text), b"x").expect("encode frame");
        let cut = FRAME_MAGIC.len() + LEN_PREFIX + 3;
        let err = decode_frame(&encoded[..cut]).expect_err("truncated header must fail");
        assert!(matches!(err, FrameDecodeError::Truncated { .. }));
    }

    #[test]
    fn decode_rejects_index_beyond_total() {
        let encoded = encode_frame(header(4, 4, PartTag::Text), b"x").expect("encode frame");
        let err = decode_frame(&encoded).expect_err("index past total must fail");
        assert!(matches!(
            err,
            FrameDecodeError::IndexOutOfRange { total: 4, .. }
        ));
    }

    #[test]
    fn decode_rejects_length_mismatch() {
        let header_bytes =
            encode_to_vec(header(0, 1, PartTag::Text), header_config()).expect("encode header");
        let mut padded = header_bytes.clone();
        padded.extend_from_slice(&[0, 0]);
        let advertised = u16::try_from(padded.len()).expect("header fits in u16");

        let mut datagram = Vec::new();
        datagram.extend_from_slice(FRAME_MAGIC);
        datagram.extend_from_slice(&advertised.to_be_bytes());
        datagram.extend_from_slice(&padded);

        let err = decode_frame(&datagram).expect_err("padded header must fail");
        assert!(matches!(
            err,
            FrameDecodeError::HeaderLengthMismatch { consumed, .. } if consumed == header_bytes.len()
        ));
    }
}
