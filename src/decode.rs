//! Raw-log decoding for CTF exchange `OrderFilled` events.
//!
//! Decoding is pure: callers hand in the topic list and data hex from an
//! `eth_getLogs` entry and get a typed fill or a classified error. A log
//! whose topic0 is not the expected signature is `UnrecognizedEvent`;
//! a log with the right signature but malformed payload is `DecodeError`.
//! The two are counted separately upstream.

use ethereum_types::U256;

use crate::error::PipeError;
use crate::eth::{eip55_checksum_address, parse_hex_32, parse_hex_bytes};

pub const ORDER_FILLED_TOPIC: &str =
    "0xd0a08e8c493f9c94f29311604c9de1b4e8c8d4c06bd0c789af57f2d65bfec0f6";

/// Exchange amount fields use USDC-style 6-decimal fixed point.
const AMOUNT_DECIMALS: u32 = 6;

/// One decoded `OrderFilled` event. Asset ids are decimal strings to match
/// the gamma `clobTokenIds` representation; id "0" is the collateral leg.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderFill {
    pub maker: String,
    pub taker: String,
    pub maker_asset_id: String,
    pub taker_asset_id: String,
    pub maker_amount: f64,
    pub taker_amount: f64,
    pub fee: f64,
}

impl OrderFill {
    /// Dollar notional. One leg is collateral and one is outcome tokens;
    /// the larger of the two is the fill's cash size.
    pub fn notional(&self) -> f64 {
        self.maker_amount.max(self.taker_amount)
    }

    /// Token id of the non-collateral leg, when the fill has one.
    pub fn outcome_asset_id(&self) -> Option<&str> {
        if self.maker_asset_id != "0" {
            Some(&self.maker_asset_id)
        } else if self.taker_asset_id != "0" {
            Some(&self.taker_asset_id)
        } else {
            None
        }
    }
}

struct WordCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> WordCursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn read_word(&mut self) -> Result<&'a [u8], PipeError> {
        let end = self.pos + 32;
        if end > self.data.len() {
            return Err(PipeError::DecodeError(format!(
                "log data truncated at word {}",
                self.pos / 32
            )));
        }
        let word = &self.data[self.pos..end];
        self.pos = end;
        Ok(word)
    }

    fn read_u256(&mut self) -> Result<U256, PipeError> {
        Ok(U256::from_big_endian(self.read_word()?))
    }

    fn read_amount(&mut self, decimals: u32) -> Result<f64, PipeError> {
        let v = self.read_u256()?;
        if v.bits() > 128 {
            return Err(PipeError::DecodeError(format!(
                "amount {v} overflows 128 bits"
            )));
        }
        Ok(v.as_u128() as f64 / 10f64.powi(decimals as i32))
    }
}

/// Decode one raw log. `expected_topic0` comes from config so a redeploy
/// with a new event signature is a config change, not a code change.
pub fn decode_order_filled(
    topics: &[String],
    data_hex: &str,
    expected_topic0: &str,
) -> Result<OrderFill, PipeError> {
    let topic0 = topics.first().ok_or(PipeError::UnrecognizedEvent)?;
    if !topic0.eq_ignore_ascii_case(expected_topic0) {
        return Err(PipeError::UnrecognizedEvent);
    }
    if topics.len() < 3 {
        return Err(PipeError::DecodeError(format!(
            "OrderFilled carries {} topics, need 3",
            topics.len()
        )));
    }

    let maker = address_from_topic(&topics[1])?;
    let taker = address_from_topic(&topics[2])?;

    let data = parse_hex_bytes(data_hex)
        .map_err(|e| PipeError::DecodeError(format!("log data: {e:#}")))?;
    if data.len() % 32 != 0 {
        return Err(PipeError::DecodeError(format!(
            "log data length {} is not word aligned",
            data.len()
        )));
    }
    if data.len() < 5 * 32 {
        return Err(PipeError::DecodeError(format!(
            "log data holds {} words, need 5",
            data.len() / 32
        )));
    }

    let mut cursor = WordCursor::new(&data);
    let maker_asset_id = cursor.read_u256()?.to_string();
    let taker_asset_id = cursor.read_u256()?.to_string();
    let maker_amount = cursor.read_amount(AMOUNT_DECIMALS)?;
    let taker_amount = cursor.read_amount(AMOUNT_DECIMALS)?;
    let fee = cursor.read_amount(AMOUNT_DECIMALS)?;

    Ok(OrderFill {
        maker,
        taker,
        maker_asset_id,
        taker_asset_id,
        maker_amount,
        taker_amount,
        fee,
    })
}

/// Indexed addresses arrive left-padded to a full word.
fn address_from_topic(topic: &str) -> Result<String, PipeError> {
    let word =
        parse_hex_32(topic).map_err(|e| PipeError::DecodeError(format!("indexed address: {e:#}")))?;
    let mut addr = [0u8; 20];
    addr.copy_from_slice(&word[12..]);
    Ok(eip55_checksum_address(addr))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn word_hex(v: u128) -> String {
        format!("{v:064x}")
    }

    fn data_hex(words: &[u128]) -> String {
        let mut s = String::from("0x");
        for w in words {
            s.push_str(&word_hex(*w));
        }
        s
    }

    fn addr_topic(byte: u8) -> String {
        format!("0x{}{}", "00".repeat(12), hex::encode([byte; 20]))
    }

    #[test]
    fn decodes_well_formed_fill() {
        let topics = vec![
            ORDER_FILLED_TOPIC.to_string(),
            addr_topic(0x11),
            addr_topic(0x22),
        ];
        let data = data_hex(&[999, 0, 25_000_000, 12_500_000, 10_000]);

        let fill = decode_order_filled(&topics, &data, ORDER_FILLED_TOPIC).expect("decode");
        assert_eq!(fill.maker.to_lowercase(), format!("0x{}", "11".repeat(20)));
        assert_eq!(fill.taker.to_lowercase(), format!("0x{}", "22".repeat(20)));
        assert_eq!(fill.maker_asset_id, "999");
        assert_eq!(fill.taker_asset_id, "0");
        assert_approx_eq!(fill.maker_amount, 25.0);
        assert_approx_eq!(fill.taker_amount, 12.5);
        assert_approx_eq!(fill.fee, 0.01);
        assert_approx_eq!(fill.notional(), 25.0);
        assert_eq!(fill.outcome_asset_id(), Some("999"));
    }

    #[test]
    fn wrong_signature_is_unrecognized_not_malformed() {
        let topics = vec![
            format!("0x{}", "ee".repeat(32)),
            addr_topic(0x11),
            addr_topic(0x22),
        ];
        let data = data_hex(&[1, 0, 1, 1, 0]);
        let err = decode_order_filled(&topics, &data, ORDER_FILLED_TOPIC).unwrap_err();
        assert!(matches!(err, PipeError::UnrecognizedEvent));
    }

    #[test]
    fn signature_match_is_case_insensitive() {
        let topics = vec![
            ORDER_FILLED_TOPIC.to_uppercase().replace("0X", "0x"),
            addr_topic(0x11),
            addr_topic(0x22),
        ];
        let data = data_hex(&[1, 0, 1, 1, 0]);
        assert!(decode_order_filled(&topics, &data, ORDER_FILLED_TOPIC).is_ok());
    }

    #[test]
    fn truncated_data_is_decode_error() {
        let topics = vec![
            ORDER_FILLED_TOPIC.to_string(),
            addr_topic(0x11),
            addr_topic(0x22),
        ];
        let data = data_hex(&[999, 0, 25_000_000, 12_500_000]);
        let err = decode_order_filled(&topics, &data, ORDER_FILLED_TOPIC).unwrap_err();
        assert!(matches!(err, PipeError::DecodeError(_)));
    }

    #[test]
    fn ragged_data_is_decode_error() {
        let topics = vec![
            ORDER_FILLED_TOPIC.to_string(),
            addr_topic(0x11),
            addr_topic(0x22),
        ];
        let mut data = data_hex(&[999, 0, 25_000_000, 12_500_000, 10_000]);
        data.push_str("abcd");
        let err = decode_order_filled(&topics, &data, ORDER_FILLED_TOPIC).unwrap_err();
        assert!(matches!(err, PipeError::DecodeError(_)));
    }

    #[test]
    fn extra_trailing_words_are_tolerated() {
        let topics = vec![
            ORDER_FILLED_TOPIC.to_string(),
            addr_topic(0x11),
            addr_topic(0x22),
        ];
        let data = data_hex(&[999, 0, 25_000_000, 12_500_000, 10_000, 7]);
        assert!(decode_order_filled(&topics, &data, ORDER_FILLED_TOPIC).is_ok());
    }

    #[test]
    fn asset_ids_render_as_decimal_strings() {
        let topics = vec![
            ORDER_FILLED_TOPIC.to_string(),
            addr_topic(0x11),
            addr_topic(0x22),
        ];
        let mut data = String::from("0x");
        data.push_str(&"f".repeat(64));
        for w in [0u128, 1_000_000, 1_000_000, 0] {
            data.push_str(&word_hex(w));
        }

        let fill = decode_order_filled(&topics, &data, ORDER_FILLED_TOPIC).expect("decode");
        assert_eq!(
            fill.maker_asset_id,
            "115792089237316195423570985008687907853269984665640564039457584007913129639935"
        );
    }

    #[test]
    fn missing_address_topics_are_decode_errors() {
        let topics = vec![ORDER_FILLED_TOPIC.to_string()];
        let data = data_hex(&[1, 0, 1, 1, 0]);
        let err = decode_order_filled(&topics, &data, ORDER_FILLED_TOPIC).unwrap_err();
        assert!(matches!(err, PipeError::DecodeError(_)));
    }
}
