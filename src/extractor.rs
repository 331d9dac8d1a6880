use roxmltree::{Document as XmlDocument, Node, ParsingOptions};

use crate::error::{IngestError, Result};
use crate::models::TradeRecord;

const TRADE_TAG: &str = "trade";

/// Parses `text` as XML and returns every `<trade>` element in document order.
///
/// Missing or unparsable fields fall back to their defaults; only a
/// structurally broken document is an error.
pub fn extract(text: &str) -> Result<Vec<TradeRecord>> {
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    let doc = XmlDocument::parse_with_options(text, options)
        .map_err(|e| IngestError::MalformedDocument(e.to_string()))?;

    let trades: Vec<TradeRecord> = doc
        .descendants()
        .filter(|node| is_element_named(node, TRADE_TAG))
        .map(|node| read_trade(&node))
        .collect();

    tracing::debug!(trades = trades.len(), "extracted trade elements");
    Ok(trades)
}

fn read_trade(trade: &Node<'_, '_>) -> TradeRecord {
    TradeRecord {
        date: field_text(trade, "date"),
        symbol: field_text(trade, "symbol"),
        trade_type: field_text(trade, "type"),
        quantity: field_text(trade, "quantity")
            .and_then(|text| parse_leading_int(&text))
            .unwrap_or(0),
        price: field_text(trade, "price")
            .and_then(|text| parse_leading_float(&text))
            .unwrap_or(0.0),
        counterparty: field_text(trade, "counterparty"),
    }
}

/// Text content of the first descendant element named `tag`.
fn field_text(parent: &Node<'_, '_>, tag: &str) -> Option<String> {
    parent
        .descendants()
        .skip(1)
        .find(|node| is_element_named(node, tag))
        .map(|node| {
            node.descendants()
                .filter(|n| n.is_text())
                .filter_map(|n| n.text())
                .collect()
        })
}

/// Matches the qualified name as written, so `<x:trade>` is not a `trade`.
fn is_element_named(node: &Node<'_, '_>, tag: &str) -> bool {
    node.is_element() && qualified_name(node) == tag
}

fn qualified_name<'a>(node: &Node<'a, '_>) -> &'a str {
    let source = node.document().input_text();
    let start = node.range().start + 1;
    let rest = source.get(start..).unwrap_or("");
    let end = rest
        .find(|c: char| c.is_whitespace() || c == '/' || c == '>')
        .unwrap_or(rest.len());
    &rest[..end]
}

/// Reads the integer at the start of `text`, ignoring anything after it.
fn parse_leading_int(text: &str) -> Option<i64> {
    let text = text.trim_start();
    let bytes = text.as_bytes();
    let sign = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let digits = count_digits(&bytes[sign..]);
    if digits == 0 {
        return None;
    }
    text[..sign + digits].parse().ok()
}

/// Reads the decimal number (with optional fraction and exponent) at the
/// start of `text`, ignoring anything after it.
fn parse_leading_float(text: &str) -> Option<f64> {
    let text = text.trim_start();
    let bytes = text.as_bytes();
    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));

    let int_digits = count_digits(&bytes[end..]);
    end += int_digits;
    let mut frac_digits = 0;
    if bytes.get(end) == Some(&b'.') {
        frac_digits = count_digits(&bytes[end + 1..]);
        if int_digits > 0 || frac_digits > 0 {
            end += 1 + frac_digits;
        }
    }
    if int_digits == 0 && frac_digits == 0 {
        return None;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp = end + 1;
        if matches!(bytes.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        let exp_digits = count_digits(&bytes[exp.min(bytes.len())..]);
        if exp_digits > 0 {
            end = exp + exp_digits;
        }
    }

    text[..end].parse::<f64>().ok().filter(|value| value.is_finite())
}

fn count_digits(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| b.is_ascii_digit()).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_TRADES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<trades>
  <trade>
    <date>2024-03-01</date>
    <symbol>MSFT</symbol>
    <type>BUY</type>
    <quantity>150</quantity>
    <price>402.15</price>
    <counterparty>Goldman Sachs</counterparty>
  </trade>
  <trade>
    <date>2024-03-02</date>
    <symbol>TSLA</symbol>
    <type>SELL</type>
    <quantity>40</quantity>
    <price>198.7</price>
    <counterparty>Morgan Stanley</counterparty>
  </trade>
</trades>"#;

    #[test]
    fn extracts_trades_in_document_order() {
        let trades = extract(TWO_TRADES).unwrap();
        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0].symbol.as_deref(), Some("MSFT"));
        assert_eq!(trades[0].trade_type.as_deref(), Some("BUY"));
        assert_eq!(trades[0].quantity, 150);
        assert!((trades[0].price - 402.15).abs() < 1e-9);
        assert_eq!(trades[1].symbol.as_deref(), Some("TSLA"));
        assert_eq!(trades[1].counterparty.as_deref(), Some("Morgan Stanley"));
    }

    #[test]
    fn missing_fields_use_defaults() {
        let trades = extract("<trades><trade><symbol>IBM</symbol></trade></trades>").unwrap();
        assert_eq!(trades.len(), 1);
        let trade = &trades[0];
        assert_eq!(trade.symbol.as_deref(), Some("IBM"));
        assert_eq!(trade.date, None);
        assert_eq!(trade.trade_type, None);
        assert_eq!(trade.counterparty, None);
        assert_eq!(trade.quantity, 0);
        assert_eq!(trade.price, 0.0);
    }

    #[test]
    fn unparsable_numbers_use_defaults() {
        let xml = "<t><trade><quantity>lots</quantity><price>n/a</price></trade>\
                   <trade><quantity> 7 </quantity><price>NaN</price></trade></t>";
        let trades = extract(xml).unwrap();
        assert_eq!(trades[0].quantity, 0);
        assert_eq!(trades[0].price, 0.0);
        assert_eq!(trades[1].quantity, 7);
        assert_eq!(trades[1].price, 0.0);
    }

    #[test]
    fn numbers_are_read_from_the_leading_digits() {
        let xml = "<t>\
            <trade><quantity>100.00</quantity><price>402.15 USD</price></trade>\
            <trade><quantity>150 shares</quantity><price>1e2</price></trade>\
            <trade><quantity>1e3</quantity><price>-.5e-1x</price></trade>\
            <trade><quantity>\n  -42kg</quantity><price>7.</price></trade>\
            </t>";
        let trades = extract(xml).unwrap();
        let values: Vec<(i64, f64)> = trades.iter().map(|t| (t.quantity, t.price)).collect();
        assert_eq!(
            values,
            vec![(100, 402.15), (150, 100.0), (1, -0.05), (-42, 7.0)]
        );
    }

    #[test]
    fn leading_number_edge_cases() {
        assert_eq!(parse_leading_int("+8"), Some(8));
        assert_eq!(parse_leading_int("-"), None);
        assert_eq!(parse_leading_int("x12"), None);
        assert_eq!(parse_leading_float("."), None);
        assert_eq!(parse_leading_float("3e"), Some(3.0));
        assert_eq!(parse_leading_float("2E+2"), Some(200.0));
        assert_eq!(parse_leading_float("Infinity"), None);
        assert_eq!(parse_leading_float("1e999"), None);
    }

    #[test]
    fn prefixed_elements_are_not_trades() {
        let xml = r#"<trades xmlns:x="urn:x" xmlns="urn:default">
            <x:trade><symbol>SKIP</symbol></x:trade>
            <trade><symbol>KEEP</symbol><x:price>9.5</x:price><quantity>3</quantity></trade>
        </trades>"#;
        let trades = extract(xml).unwrap();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].symbol.as_deref(), Some("KEEP"));
        assert_eq!(trades[0].quantity, 3);
        assert_eq!(trades[0].price, 0.0);
    }

    #[test]
    fn finds_trades_at_any_depth() {
        let xml = "<book><desk><trade><symbol>A</symbol></trade></desk>\
                   <trade><symbol>B</symbol></trade>\
                   <desk><group><trade><symbol>C</symbol></trade></group></desk></book>";
        let symbols: Vec<_> = extract(xml)
            .unwrap()
            .into_iter()
            .filter_map(|t| t.symbol)
            .collect();
        assert_eq!(symbols, vec!["A", "B", "C"]);
    }

    #[test]
    fn field_text_joins_nested_text() {
        let xml = "<trades><trade><counterparty>JP <b>Morgan</b></counterparty></trade></trades>";
        let trades = extract(xml).unwrap();
        assert_eq!(trades[0].counterparty.as_deref(), Some("JP Morgan"));
    }

    #[test]
    fn document_without_trades_is_empty() {
        assert!(extract("<trades/>").unwrap().is_empty());
    }

    #[test]
    fn malformed_markup_fails() {
        let err = extract("<trades><trade></trades>").unwrap_err();
        assert!(matches!(err, IngestError::MalformedDocument(_)));
        assert!(matches!(extract(""), Err(IngestError::MalformedDocument(_))));
    }

    #[test]
    fn extraction_is_repeatable() {
        assert_eq!(extract(TWO_TRADES).unwrap(), extract(TWO_TRADES).unwrap());
    }
}
