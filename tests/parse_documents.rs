use std::path::{Path, PathBuf};

use chrono::{FixedOffset, TimeZone, Utc};
use ofx::{AccountKind, Ofx, OfxError, ParserConfig, TransactionKind, read_file};

fn data_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("data").join(name)
}

fn parse(name: &str) -> Result<Ofx, OfxError> {
    read_file(&data_path(name), &ParserConfig::default())
}

fn verify_ofx(ofx: &Ofx, account_number: &str, routing_id: &str) {
    assert_eq!(ofx.account_number, account_number, "wrong account number");
    assert_eq!(ofx.bank_code, routing_id, "wrong routing number");
}

#[test]
fn parse_v102() {
    let ofx = parse("v102.ofx").unwrap();
    verify_ofx(&ofx, "098-121", "987654321");
    assert_eq!(ofx.kind, AccountKind::Savings);

    let ids: Vec<_> = ofx.transactions.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, ["980315001", "980310001", "980309001"]);

    let deposit = &ofx.transactions[0];
    assert_eq!(deposit.kind, TransactionKind::Credit);
    assert_eq!(deposit.amount, "200.00".parse().unwrap());
    assert_eq!(deposit.description, "DEPOSIT");
    assert_eq!(deposit.memo, "automatic deposit");
    assert_eq!(
        deposit.posted_date.as_ref().unwrap().instant(),
        Utc.with_ymd_and_hms(2007, 3, 15, 0, 0, 0).unwrap()
    );

    let cheque = &ofx.transactions[2];
    assert_eq!(cheque.kind, TransactionKind::Debit);
    assert_eq!(cheque.description, "John Hancock");
    assert_eq!(cheque.memo, "");

    assert_eq!(ofx.balance(), "250.00".parse().unwrap());
}

#[test]
fn parse_v103() {
    let ofx = parse("v103.ofx").unwrap();
    verify_ofx(&ofx, "098-121", "987654321");
    assert_eq!(ofx.branch_code, "0012");
    assert_eq!(ofx.kind, AccountKind::Checking);
    assert_eq!(ofx.transactions.len(), 2);

    let breakfast = &ofx.transactions[0];
    assert_eq!(breakfast.description, "Café du Monde");
    assert_eq!(breakfast.kind, TransactionKind::Debit);
    assert_eq!(
        breakfast.posted_date.as_ref().unwrap().instant(),
        Utc.with_ymd_and_hms(2007, 4, 1, 12, 0, 0).unwrap()
    );
    assert_eq!(
        breakfast.user_date.as_ref().unwrap().instant(),
        Utc.with_ymd_and_hms(2007, 3, 31, 0, 0, 0).unwrap()
    );

    // Zero is a debit
    assert_eq!(ofx.transactions[1].kind, TransactionKind::Debit);
}

#[test]
fn parse_v211_xml() {
    let ofx = parse("v211.ofx").unwrap();
    assert_eq!(ofx.account_number, "4111111111111111");
    assert_eq!(ofx.bank_code, "");
    assert_eq!(ofx.kind, AccountKind::Unknown);
    assert_eq!(ofx.transactions.len(), 2);

    let grocery = &ofx.transactions[0];
    assert_eq!(grocery.description, "GROCERY & DELI");
    assert_eq!(grocery.memo, "");
    let posted = grocery.posted_date.as_ref().unwrap();
    assert_eq!(posted.zone_name(), Some("EST"));
    let est = FixedOffset::west_opt(5 * 3600).unwrap();
    let expected = est.with_ymd_and_hms(2023, 12, 15, 8, 30, 15).unwrap()
        + chrono::Duration::milliseconds(250);
    assert_eq!(posted.instant(), expected);
    assert_eq!(posted.instant().offset(), &est);

    let payment = &ofx.transactions[1];
    assert_eq!(payment.kind, TransactionKind::Credit);
    assert_eq!(payment.amount.to_string(), "500");
}

#[test]
fn malformed_amount_fails_whole_parse() {
    match parse("bad_amount.ofx") {
        Err(OfxError::InvalidAmount { text, .. }) => assert_eq!(text, "12.34.56"),
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn malformed_date_fails_whole_parse() {
    let err = parse("bad_date.ofx").unwrap_err();
    assert!(matches!(&err, OfxError::InvalidDateTime { text, .. } if text == "2007"));
    assert_eq!(err.to_string(), "Invalid date/time string '2007' in <DTPOSTED>");
}

#[test]
fn strict_header_rejects_unknown_charset() {
    let src = "OFXHEADER:100\nDATA:OFXSGML\nVERSION:102\nCHARSET:KOI8\n\n<OFX></OFX>";
    let config = ParserConfig {
        strict_header: true,
        ..Default::default()
    };
    assert!(matches!(
        ofx::read_document(src.as_bytes(), &config),
        Err(OfxError::Header { .. })
    ));
    assert!(ofx::read_document(src.as_bytes(), &ParserConfig::default()).is_ok());
}
