
use fixtures::*;

use xmlbench::bridge::bridge;
use xmlbench::codec::compact::{CompactCursor, transcode};
use xmlbench::codec::text::TextSink;
use xmlbench::codec::vocab::Vocabulary;
use xmlbench::normalize::normalize;
use xmlbench::settings::{CodecSettings, IndexedContentLevel};

/// Decodes a compact document and renders it back as canonical text.
fn canonical_of_compact(doc: &[u8], settings: &CodecSettings, vocab: Option<&Vocabulary>) -> Vec<u8> {
    let mut cursor = match vocab {
        Some(vocab) => CompactCursor::with_vocabulary(doc, settings, vocab.clone()),
        None => CompactCursor::new(doc, settings),
    };
    let mut out = Vec::new();
    let mut sink = TextSink::canonical(&mut out);
    bridge(&mut cursor, &mut sink).unwrap();
    out
}

#[test]
fn normalization_is_a_fixpoint_on_every_sample() {
    ensure_env_logger_initialized();

    for sample in all_xml_samples() {
        let text = std::fs::read(&sample).unwrap();
        let once = normalize(&text).unwrap();
        let twice = normalize(&once).unwrap();
        assert_eq!(once, twice, "not a fixpoint: {sample:?}");
    }
}

#[test]
fn compact_roundtrip_is_canonically_lossless_at_every_level() {
    ensure_env_logger_initialized();

    for level in [
        IndexedContentLevel::None,
        IndexedContentLevel::Default,
        IndexedContentLevel::Full,
    ] {
        let settings = CodecSettings::new().indexed_content(level);
        for sample in all_xml_samples() {
            let text = std::fs::read(&sample).unwrap();
            let doc = transcode(&text, &settings, None).unwrap();

            let roundtripped = canonical_of_compact(&doc, &settings, None);
            assert_eq!(
                roundtripped,
                normalize(&text).unwrap(),
                "lost content at level {level:?} on {sample:?}"
            );
        }
    }
}

#[test]
fn an_external_vocabulary_shrinks_without_losing_content() {
    ensure_env_logger_initialized();

    let settings = CodecSettings::new().use_external_vocabulary(true);
    let text = std::fs::read(purchase_order_sample()).unwrap();

    let mut vocab = Vocabulary::new();
    vocab.train(&text).unwrap();

    let seeded = transcode(&text, &settings, Some(&vocab)).unwrap();
    let bare = transcode(&text, &settings, None).unwrap();
    assert!(
        seeded.len() < bare.len(),
        "seeded {} >= bare {}",
        seeded.len(),
        bare.len()
    );

    let roundtripped = canonical_of_compact(&seeded, &settings, Some(&vocab));
    assert_eq!(roundtripped, normalize(&text).unwrap());
}

#[test]
fn canonical_form_of_a_small_document() {
    ensure_env_logger_initialized();

    let out = normalize(br#"<doc a="1"><empty/><note><![CDATA[x < y]]></note></doc>"#).unwrap();
    insta::assert_snapshot!(
        String::from_utf8(out).unwrap(),
        @r#"<?xml version="1.0" encoding="UTF-8"?><doc a="1"><empty></empty><note>x &lt; y</note></doc>"#
    );
}
