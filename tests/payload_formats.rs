use qrlog::{payload::QrFormat, record::RecordDraft};

const SN: &str = "SN12345";
const VC: &str = "654321";
const UID: &str = "4D91EC53E5DDA7D7";

#[test]
fn every_format_matches_its_template() {
    let cases = [
        (
            QrFormat::Olarm,
            "https://olarm.com/o/flxr?a=SN12345,4D91EC53E5DDA7D7,654321",
        ),
        (
            QrFormat::Json,
            r#"{"sn":"SN12345","vc":"654321","uid":"4D91EC53E5DDA7D7"}"#,
        ),
        (QrFormat::Csv, "SN12345,654321,4D91EC53E5DDA7D7"),
        (QrFormat::Pipe, "SN12345|654321|4D91EC53E5DDA7D7"),
        (QrFormat::Compact, "SN12345:654321:4D91EC53E5DDA7D7"),
        (
            QrFormat::Labeled,
            "Serial Number: SN12345\nVerification Code: 654321\nDevUID: 4D91EC53E5DDA7D7",
        ),
        (
            QrFormat::Url,
            "https://validate.example.com?sn=SN12345&vc=654321&uid=4D91EC53E5DDA7D7",
        ),
    ];

    for (format, expected) in cases {
        assert_eq!(format.encode(SN, VC, UID), expected, "format {format}");
    }
}

#[test]
fn unknown_format_name_falls_back_to_olarm() {
    assert_eq!(QrFormat::parse("bogus"), QrFormat::Olarm);
    assert_eq!(QrFormat::parse(""), QrFormat::Olarm);
    assert_eq!(
        QrFormat::parse("bogus").encode(SN, VC, UID),
        QrFormat::Olarm.encode(SN, VC, UID)
    );
}

#[test]
fn format_names_resolve_case_insensitively() {
    for format in QrFormat::ALL {
        assert_eq!(QrFormat::parse(format.name()), format);
        assert_eq!(QrFormat::parse(&format.name().to_uppercase()), format);
        assert_eq!(QrFormat::parse(&format!("  {format} ")), format);
    }
    assert_eq!(QrFormat::default(), QrFormat::Olarm);
}

#[test]
fn encoding_is_deterministic() {
    for format in QrFormat::ALL {
        assert_eq!(format.encode(SN, VC, UID), format.encode(SN, VC, UID));
    }
}

#[test]
fn json_payload_escapes_and_parses() {
    let text = QrFormat::Json.encode("A\"B", "1\\2", "ü");
    let value: serde_json::Value = serde_json::from_str(&text).expect("valid json");
    assert_eq!(value["sn"], "A\"B");
    assert_eq!(value["vc"], "1\\2");
    assert_eq!(value["uid"], "ü");
}

#[test]
fn draft_encoding_uses_draft_fields() {
    let draft = RecordDraft::new(SN, VC, UID).with_device_name("Front door");
    assert_eq!(
        QrFormat::Csv.encode_draft(&draft),
        QrFormat::Csv.encode(SN, VC, UID)
    );
}

#[test]
fn format_deserializes_leniently() {
    let parsed: QrFormat = serde_json::from_str("\"PIPE\"").expect("deserialize");
    assert_eq!(parsed, QrFormat::Pipe);
    let fallback: QrFormat = serde_json::from_str("\"nope\"").expect("deserialize");
    assert_eq!(fallback, QrFormat::Olarm);
    assert_eq!(serde_json::to_string(&QrFormat::Labeled).expect("serialize"), "\"labeled\"");
}
