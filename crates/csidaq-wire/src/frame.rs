use std::str::FromStr;

use crate::error::{Result, WireError};

/// Number of comma-delimited fields in a CSI data record.
pub const CSI_FIELD_COUNT: usize = 25;

/// One parsed CSI data record, corresponding to one wireless reception
/// event reported by the node.
///
/// Field order matches the node's wire format exactly. The final `data`
/// field is the opaque subcarrier payload; it may itself contain commas,
/// so record splitting is bounded and the 25th field absorbs the rest.
/// Frames are immutable once parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct CsiFrame {
    /// Structural type tag, always `CSI_DATA` on the current firmware.
    pub frame_type: String,
    pub seq: u32,
    pub mac: String,
    pub rssi: i32,
    pub rate: f64,
    pub sig_mode: u8,
    pub mcs: u8,
    pub bandwidth: u8,
    pub smoothing: u8,
    pub not_sounding: u8,
    pub aggregation: u8,
    pub stbc: u8,
    pub fec_coding: u8,
    pub sgi: u8,
    pub noise_floor: i32,
    pub ampdu_cnt: u32,
    pub channel: u8,
    pub secondary_channel: u8,
    pub local_timestamp: i64,
    pub ant: u8,
    pub sig_len: u32,
    pub rx_state: u8,
    /// Length of the subcarrier payload as reported by the node.
    pub len: u32,
    pub first_word: u32,
    /// Opaque subcarrier payload, verbatim except for one stripped pair
    /// of surrounding quotes.
    pub data: String,
}

impl CsiFrame {
    /// Parse one raw record.
    ///
    /// The record is split into at most [`CSI_FIELD_COUNT`] parts so that
    /// commas inside the trailing `data` field stay intact. Anything that
    /// does not yield exactly 25 parts, or holds non-numeric content in a
    /// numeric field, is malformed.
    pub fn parse(raw: &str) -> Result<Self> {
        let parts: Vec<&str> = raw.splitn(CSI_FIELD_COUNT, ',').collect();
        if parts.len() != CSI_FIELD_COUNT {
            return Err(WireError::FieldCount {
                expected: CSI_FIELD_COUNT,
                got: parts.len(),
            });
        }

        Ok(Self {
            frame_type: parts[0].to_string(),
            seq: parse_num(parts[1], "seq")?,
            mac: parts[2].to_string(),
            rssi: parse_num(parts[3], "rssi")?,
            rate: parse_num(parts[4], "rate")?,
            sig_mode: parse_num(parts[5], "sig_mode")?,
            mcs: parse_num(parts[6], "mcs")?,
            bandwidth: parse_num(parts[7], "bandwidth")?,
            smoothing: parse_num(parts[8], "smoothing")?,
            not_sounding: parse_num(parts[9], "not_sounding")?,
            aggregation: parse_num(parts[10], "aggregation")?,
            stbc: parse_num(parts[11], "stbc")?,
            fec_coding: parse_num(parts[12], "fec_coding")?,
            sgi: parse_num(parts[13], "sgi")?,
            noise_floor: parse_num(parts[14], "noise_floor")?,
            ampdu_cnt: parse_num(parts[15], "ampdu_cnt")?,
            channel: parse_num(parts[16], "channel")?,
            secondary_channel: parse_num(parts[17], "secondary_channel")?,
            local_timestamp: parse_num(parts[18], "local_timestamp")?,
            ant: parse_num(parts[19], "ant")?,
            sig_len: parse_num(parts[20], "sig_len")?,
            rx_state: parse_num(parts[21], "rx_state")?,
            len: parse_num(parts[22], "len")?,
            first_word: parse_num(parts[23], "first_word")?,
            data: unquote(parts[24]).to_string(),
        })
    }
}

fn parse_num<T: FromStr>(value: &str, field: &'static str) -> Result<T> {
    value.trim().parse().map_err(|_| WireError::Field {
        field,
        value: value.to_string(),
    })
}

/// Strip one pair of surrounding quote characters, if both are present.
fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_with_data(data: &str) -> String {
        format!(
            "CSI_DATA,42,AA:BB:CC:DD:EE:FF,-40,11.0,1,7,1,0,0,0,0,0,1,-92,3,6,1,123456789,0,100,0,128,1,{data}"
        )
    }

    #[test]
    fn parses_full_record() {
        let raw = record_with_data("12 -3 45 6");
        let frame = CsiFrame::parse(&raw).expect("record should parse");

        assert_eq!(frame.frame_type, "CSI_DATA");
        assert_eq!(frame.seq, 42);
        assert_eq!(frame.mac, "AA:BB:CC:DD:EE:FF");
        assert_eq!(frame.rssi, -40);
        assert_eq!(frame.rate, 11.0);
        assert_eq!(frame.noise_floor, -92);
        assert_eq!(frame.channel, 6);
        assert_eq!(frame.local_timestamp, 123_456_789);
        assert_eq!(frame.len, 128);
        assert_eq!(frame.data, "12 -3 45 6");
    }

    #[test]
    fn strips_one_quote_pair_from_data() {
        let raw = record_with_data("\"01 02 03\"");
        let frame = CsiFrame::parse(&raw).expect("quoted record should parse");
        assert_eq!(frame.data, "01 02 03");
    }

    #[test]
    fn keeps_unbalanced_quote() {
        let raw = record_with_data("\"01 02 03");
        let frame = CsiFrame::parse(&raw).expect("record should parse");
        assert_eq!(frame.data, "\"01 02 03");
    }

    #[test]
    fn excess_commas_stay_inside_data() {
        let raw = record_with_data("1,2,3,4,5");
        let frame = CsiFrame::parse(&raw).expect("record should parse");
        assert_eq!(frame.data, "1,2,3,4,5");
    }

    #[test]
    fn rejects_short_record() {
        let err = CsiFrame::parse("CSI_DATA,1,AA:BB:CC:DD:EE:FF,-40").expect_err("too few fields");
        assert!(matches!(
            err,
            WireError::FieldCount {
                expected: CSI_FIELD_COUNT,
                got: 4
            }
        ));
    }

    #[test]
    fn rejects_empty_record() {
        assert!(matches!(
            CsiFrame::parse(""),
            Err(WireError::FieldCount { .. })
        ));
    }

    #[test]
    fn rejects_non_numeric_numeric_field() {
        let raw = record_with_data("x").replace("-40", "strong");
        let err = CsiFrame::parse(&raw).expect_err("non-numeric rssi");
        assert!(matches!(err, WireError::Field { field: "rssi", .. }));
    }

    #[test]
    fn rejects_fractional_integer_field() {
        let raw = record_with_data("x").replace("CSI_DATA,42,", "CSI_DATA,4.2,");
        let err = CsiFrame::parse(&raw).expect_err("fractional seq");
        assert!(matches!(err, WireError::Field { field: "seq", .. }));
    }
}
