//! Identifier codec.
//!
//! Discord limits a component `custom_id` (and a select option `value`) to
//! 100 characters. References are packed as
//!
//! ```text
//! act<version>:<set_id>[:<flags>]
//! ```
//!
//! where `flags` is exactly two lowercase hex digits and is omitted when no
//! flag is set, so every reference has exactly one encoding. The widest
//! possible identifier is `act1:` + 64 + `:ff`, 72 characters.

use crate::reference::{ComponentFlags, ComponentReference, MAX_SET_ID_LEN, SetId};
use embedg_error::{CodecError, CodecErrorKind, CodecResult};

/// Maximum identifier length accepted by Discord.
pub const IDENTIFIER_BUDGET: usize = 100;

/// Tag marking identifiers produced by this codec.
pub const SCHEME_PREFIX: &str = "act";

/// Identifier scheme version produced by [`encode`].
pub const SCHEME_VERSION: u32 = 1;

/// Field separator.
pub const SEPARATOR: char = ':';

const FLAGS_WIDTH: usize = 2;

/// Longest identifier [`encode`] can produce.
pub const MAX_ENCODED_LEN: usize =
    SCHEME_PREFIX.len() + 1 + 1 + MAX_SET_ID_LEN + 1 + FLAGS_WIDTH;

const _: () = assert!(MAX_ENCODED_LEN <= IDENTIFIER_BUDGET);

/// Encode a set id and flags into a component identifier.
///
/// # Examples
///
/// ```
/// use embedg_core::{ComponentFlags, SetId, codec};
///
/// let set_id = SetId::new("a1b2").unwrap();
/// assert_eq!(codec::encode(&set_id, ComponentFlags::empty()), "act1:a1b2");
/// assert_eq!(codec::encode(&set_id, ComponentFlags::ONE_SHOT), "act1:a1b2:01");
/// ```
pub fn encode(set_id: &SetId, flags: ComponentFlags) -> String {
    let mut identifier = format!("{SCHEME_PREFIX}{SCHEME_VERSION}{SEPARATOR}{set_id}");
    if !flags.is_empty() {
        identifier.push(SEPARATOR);
        identifier.push_str(&format!("{:02x}", flags.bits()));
    }
    debug_assert!(identifier.len() <= IDENTIFIER_BUDGET);
    identifier
}

/// Decode a component identifier.
///
/// # Errors
///
/// * [`CodecErrorKind::MalformedIdentifier`] if the identifier is not in this
///   codec's format (foreign, corrupt, or a version with leading zeros),
/// * [`CodecErrorKind::UnsupportedVersion`] if it carries our tag with any
///   other version than [`SCHEME_VERSION`], however large.
pub fn decode(identifier: &str) -> CodecResult<ComponentReference> {
    if identifier.len() > IDENTIFIER_BUDGET {
        return Err(malformed(format!(
            "identifier is {} bytes, budget is {}",
            identifier.len(),
            IDENTIFIER_BUDGET
        )));
    }

    let (tag, payload) = identifier
        .split_once(SEPARATOR)
        .ok_or_else(|| malformed("missing separator"))?;

    let version = scheme_version(tag)
        .ok_or_else(|| malformed(format!("unknown scheme tag {tag:?}")))?;
    if version.starts_with('0') {
        return Err(malformed(format!("non-canonical scheme version in {tag:?}")));
    }
    if version != SCHEME_VERSION.to_string() {
        return Err(CodecError::new(CodecErrorKind::UnsupportedVersion(
            tag.to_string(),
        )));
    }

    let mut segments = payload.split(SEPARATOR);
    let set_segment = segments.next().unwrap_or_default();
    let flags_segment = segments.next();
    if segments.next().is_some() {
        return Err(malformed("too many segments"));
    }

    let set_id = SetId::new(set_segment).map_err(|e| malformed(e.kind().to_string()))?;
    let flags = match flags_segment {
        None => ComponentFlags::empty(),
        Some(raw) => decode_flags(raw)?,
    };

    Ok(ComponentReference::new(set_id, flags))
}

/// Whether an identifier carries this codec's scheme tag, regardless of version.
pub fn is_ours(identifier: &str) -> bool {
    identifier
        .split_once(SEPARATOR)
        .and_then(|(tag, _)| scheme_version(tag))
        .is_some()
}

/// The digits after the scheme tag, if `tag` is ours.
fn scheme_version(tag: &str) -> Option<&str> {
    tag.strip_prefix(SCHEME_PREFIX)
        .filter(|v| !v.is_empty() && v.bytes().all(|b| b.is_ascii_digit()))
}

fn decode_flags(raw: &str) -> CodecResult<ComponentFlags> {
    let well_formed = raw.len() == FLAGS_WIDTH
        && raw
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
    if !well_formed {
        return Err(malformed(format!("flags {raw:?} are not two lowercase hex digits")));
    }
    let bits = u8::from_str_radix(raw, 16).map_err(|e| malformed(e.to_string()))?;
    if bits == 0 {
        return Err(malformed("empty flags must be omitted"));
    }
    ComponentFlags::from_bits(bits).ok_or_else(|| malformed(format!("unknown flag bits {raw}")))
}

#[track_caller]
fn malformed(reason: impl Into<String>) -> CodecError {
    CodecError::new(CodecErrorKind::MalformedIdentifier(reason.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(id: &str) -> SetId {
        SetId::new(id).unwrap()
    }

    #[test]
    fn test_plain_round_trip() {
        let identifier = encode(&set("a1b2"), ComponentFlags::empty());
        assert_eq!(identifier, "act1:a1b2");
        let reference = decode(&identifier).unwrap();
        assert_eq!(reference.set_id(), &set("a1b2"));
        assert!(reference.flags().is_empty());
    }

    #[test]
    fn test_round_trip_every_flag_combination() {
        let id = set("set_01");
        for bits in 0..=ComponentFlags::all().bits() {
            let flags = ComponentFlags::from_bits_truncate(bits);
            let reference = decode(&encode(&id, flags)).unwrap();
            assert_eq!(reference, ComponentReference::new(id.clone(), flags));
        }
    }

    #[test]
    fn test_maximum_length_fits_budget() {
        let id = set(&"z".repeat(MAX_SET_ID_LEN));
        let identifier = encode(&id, ComponentFlags::all());
        assert_eq!(identifier.len(), MAX_ENCODED_LEN);
        assert!(identifier.len() <= IDENTIFIER_BUDGET);
        assert_eq!(decode(&identifier).unwrap().set_id(), &id);
    }

    #[test]
    fn test_foreign_identifiers_are_malformed() {
        for foreign in [
            "",
            "ticket-close",
            "embed:author",
            "action:abc",
            "actx:abc",
            "act:abc",
            "act1",
        ] {
            let err = decode(foreign).unwrap_err();
            assert!(
                matches!(err.kind(), CodecErrorKind::MalformedIdentifier(_)),
                "{foreign:?} gave {err}"
            );
        }
    }

    #[test]
    fn test_future_version_is_unsupported() {
        let err = decode("act2:a1b2").unwrap_err();
        assert_eq!(
            err.kind(),
            &CodecErrorKind::UnsupportedVersion("act2".to_string())
        );
        assert!(err.is_foreign());
    }

    #[test]
    fn test_leading_zero_version_rejected() {
        for identifier in ["act01:abc", "act0:abc", "act001:abc:01"] {
            assert!(
                matches!(
                    decode(identifier).unwrap_err().kind(),
                    CodecErrorKind::MalformedIdentifier(_)
                ),
                "{identifier} should be malformed"
            );
        }
    }

    #[test]
    fn test_huge_version_is_unsupported() {
        let err = decode("act99999999999:abc").unwrap_err();
        assert_eq!(
            err.kind(),
            &CodecErrorKind::UnsupportedVersion("act99999999999".to_string())
        );
    }

    #[test]
    fn test_non_canonical_flags_rejected() {
        assert!(decode("act1:a1b2:00").is_err());
        assert!(decode("act1:a1b2:1").is_err());
        assert!(decode("act1:a1b2:0A").is_err());
        assert!(decode("act1:a1b2:80").is_err());
        assert!(decode("act1:a1b2:01:02").is_err());
        assert!(decode("act1::01").is_err());
    }

    #[test]
    fn test_overlong_identifier_rejected() {
        let identifier = format!("act1:{}", "a".repeat(IDENTIFIER_BUDGET));
        assert!(matches!(
            decode(&identifier).unwrap_err().kind(),
            CodecErrorKind::MalformedIdentifier(_)
        ));
    }

    #[test]
    fn test_is_ours() {
        assert!(is_ours("act1:abc"));
        assert!(is_ours("act7:abc"));
        assert!(!is_ours("embed:title"));
        assert!(!is_ours("act:abc"));
    }
}
