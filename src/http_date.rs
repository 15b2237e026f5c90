//! HTTP dates (`Sun, 06 Nov 1994 08:49:37 GMT`).

use jiff::Timestamp;
use jiff::fmt::rfc2822::{DateTimeParser, DateTimePrinter};

static PARSER: DateTimeParser = DateTimeParser::new();
static PRINTER: DateTimePrinter = DateTimePrinter::new();

/// Format a timestamp as an HTTP date.
pub fn format_http_date(ts: Timestamp) -> Option<String> {
    PRINTER.timestamp_to_rfc9110_string(&ts).ok()
}

/// Parse an HTTP date. Returns `None` for anything unparseable.
pub fn parse_http_date(value: &str) -> Option<Timestamp> {
    PARSER.parse_timestamp(value.trim()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_dates_round_trip() {
        let ts = parse_http_date("Sun, 06 Nov 1994 08:49:37 GMT").unwrap();
        assert_eq!(ts.as_second(), 784111777);
        assert_eq!(format_http_date(ts).unwrap(), "Sun, 06 Nov 1994 08:49:37 GMT");
    }

    #[test]
    fn garbage_dates_are_ignored() {
        assert!(parse_http_date("yesterday").is_none());
        assert!(parse_http_date("").is_none());
    }
}
