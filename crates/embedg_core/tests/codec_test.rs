//! Identifier codec behavior over the public API.

use embedg_core::{ComponentFlags, ComponentReference, MAX_SET_ID_LEN, SetId, codec};
use embedg_error::CodecErrorKind;

#[test]
fn test_simple_reference_round_trips() {
    let set_id = SetId::new("a1b2").unwrap();
    let identifier = codec::encode(&set_id, ComponentFlags::empty());
    let decoded = codec::decode(&identifier).unwrap();
    assert_eq!(decoded.set_id(), &set_id);
    assert!(decoded.flags().is_empty());
}

#[test]
fn test_widest_reference_fits_budget() {
    let set_id = SetId::new("z".repeat(MAX_SET_ID_LEN)).unwrap();
    let identifier = codec::encode(&set_id, ComponentFlags::all());
    assert!(identifier.len() <= codec::IDENTIFIER_BUDGET);
    assert_eq!(identifier.len(), codec::MAX_ENCODED_LEN);
}

#[test]
fn test_generated_set_ids_round_trip() {
    for _ in 0..16 {
        let reference = ComponentReference::new(
            SetId::generate(),
            ComponentFlags::ONE_SHOT | ComponentFlags::COOLDOWN,
        );
        assert_eq!(codec::decode(&reference.identifier()).unwrap(), reference);
    }
}

#[test]
fn test_triggered_marking_changes_identifier() {
    let reference = ComponentReference::new(SetId::new("poll").unwrap(), ComponentFlags::ONE_SHOT);
    let consumed = reference.with_flags(ComponentFlags::TRIGGERED);
    assert_ne!(reference.identifier(), consumed.identifier());
    assert!(codec::decode(&consumed.identifier()).unwrap().is_triggered());
}

#[test]
fn test_future_version_is_unsupported_not_malformed() {
    let err = codec::decode("act7:poll").unwrap_err();
    assert!(matches!(err.kind(), CodecErrorKind::UnsupportedVersion(tag) if tag == "act7"));
    assert!(err.is_foreign());
}

#[test]
fn test_legacy_identifiers_are_foreign() {
    for identifier in ["action:1", "12345", "", "ticket-open", "act:x", "acts1:x"] {
        let err = codec::decode(identifier).unwrap_err();
        assert!(err.is_foreign(), "{identifier} should be foreign");
    }
}

#[test]
fn test_only_canonical_identifiers_decode() {
    assert!(codec::decode("act01:abc").is_err());
    assert_eq!(
        codec::decode("act1:abc").unwrap().identifier(),
        "act1:abc"
    );
}

#[test]
fn test_overflowing_version_is_unsupported() {
    for tag in ["act4294967296", "act99999999999999999999"] {
        let err = codec::decode(&format!("{tag}:abc")).unwrap_err();
        assert!(
            matches!(err.kind(), CodecErrorKind::UnsupportedVersion(t) if t == tag),
            "{tag} gave {err}"
        );
    }
}
