use regex::Regex;

use crate::TopupStatus;

/// The keyword OkeConnect embeds in a dispatch response once the top-up has gone through.
pub const FULFILLMENT_SUCCESS_KEYWORD: &str = "Sukses";

/// OkeConnect status checks answer in free prose, e.g.
/// `"TRX ML86 ke 12345678 status Sukses. SN: GM240501ABC."`. There is no structured status code, so the status
/// token and serial number are scraped out with regexes. An unrecognisable response parses as status "Unknown",
/// which callers treat as "still pending".
pub fn parse_topup_status(text: &str) -> TopupStatus {
    // The patterns deliberately avoid anchoring on line breaks; some responses arrive as a single line.
    let status = Regex::new(r"(?i)status\s+(\w+)")
        .ok()
        .and_then(|re| re.captures(text))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| "Unknown".to_string());
    let serial_number = Regex::new(r"(?i)SN:\s+([^\s.,]+)")
        .ok()
        .and_then(|re| re.captures(text))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string());
    TopupStatus { status, serial_number, raw: text.to_string() }
}

/// Whether a raw dispatch response already indicates settlement. Dispatch responses are logged either way; this
/// only decides whether the follow-up status polling can be skipped.
pub fn dispatch_indicates_success(text: &str) -> bool {
    text.contains(FULFILLMENT_SUCCESS_KEYWORD)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_status_and_serial() {
        let text = "TRX ML86 ke 1234567890 status Sukses. SN: GM240501XYZ. Saldo 1.234.567";
        let parsed = parse_topup_status(text);
        assert_eq!(parsed.status, "Sukses");
        assert_eq!(parsed.serial_number.as_deref(), Some("GM240501XYZ"));
        assert!(parsed.is_fulfilled());
    }

    #[test]
    fn parses_pending_status_without_serial() {
        let text = "TRX ML86 ke 1234567890 status Pending";
        let parsed = parse_topup_status(text);
        assert_eq!(parsed.status, "Pending");
        assert_eq!(parsed.serial_number, None);
        assert!(!parsed.is_fulfilled());
    }

    #[test]
    fn unrecognisable_response_is_unknown() {
        let parsed = parse_topup_status("ERR malformed gateway reply");
        assert_eq!(parsed.status, "Unknown");
        assert!(!parsed.is_fulfilled());
    }

    #[test]
    fn status_parse_spans_line_breaks() {
        let text = "TRX ML86 ke 1234567890\nstatus Gagal.\nSN: -";
        let parsed = parse_topup_status(text);
        assert_eq!(parsed.status, "Gagal");
    }

    #[test]
    fn dispatch_keyword_detection() {
        assert!(dispatch_indicates_success("Trx berhasil, status Sukses"));
        assert!(!dispatch_indicates_success("Trx sedang diproses"));
    }
}
