//! DNS query-name extraction from raw messages.
//!
//! Packet-level capture collaborators hand the core raw UDP payloads; this
//! module pulls the first question's name out of them. Deliberately not a
//! full DNS parser: responses, answer sections, and EDNS are ignored.

/// DNS header length in bytes.
const HEADER_LEN: usize = 12;
/// QR bit in the flags word; set on responses.
const QR_MASK: u16 = 0x8000;
/// Label length bytes with either of the top bits set are compression
/// pointers (or reserved forms); questions in real queries never start with
/// one, so we bail out rather than follow it.
const POINTER_MASK: u8 = 0xC0;

/// Extracts the first question's query name from a raw DNS message.
///
/// Returns `None` for responses, messages without a question, truncated
/// messages, or names that are not valid label sequences. The returned name
/// has labels joined by dots and no trailing dot; case is preserved for the
/// normalizer to handle.
pub fn extract_query_name(payload: &[u8]) -> Option<String> {
    if payload.len() < HEADER_LEN {
        return None;
    }

    let flags = u16::from_be_bytes([payload[2], payload[3]]);
    if flags & QR_MASK != 0 {
        // Response, not a query.
        return None;
    }

    let question_count = u16::from_be_bytes([payload[4], payload[5]]);
    if question_count == 0 {
        return None;
    }

    let mut name = String::new();
    let mut cursor = HEADER_LEN;

    loop {
        let length = *payload.get(cursor)?;
        if length == 0 {
            break;
        }
        if length & POINTER_MASK != 0 {
            return None;
        }
        cursor += 1;

        let length = length as usize;
        let label = payload.get(cursor..cursor + length)?;
        if !name.is_empty() {
            name.push('.');
        }
        name.push_str(&String::from_utf8_lossy(label));
        cursor += length;
    }

    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds a minimal DNS message with the given flags, QDCOUNT, and name.
    fn build_message(flags: u16, qdcount: u16, labels: &[&str]) -> Vec<u8> {
        let mut msg = vec![0u8; HEADER_LEN];
        msg[0..2].copy_from_slice(&0x1234u16.to_be_bytes()); // id
        msg[2..4].copy_from_slice(&flags.to_be_bytes());
        msg[4..6].copy_from_slice(&qdcount.to_be_bytes());
        for label in labels {
            msg.push(label.len() as u8);
            msg.extend_from_slice(label.as_bytes());
        }
        msg.push(0); // root
        msg.extend_from_slice(&1u16.to_be_bytes()); // QTYPE A
        msg.extend_from_slice(&1u16.to_be_bytes()); // QCLASS IN
        msg
    }

    #[test]
    fn test_extracts_query_name() {
        let msg = build_message(0x0100, 1, &["www", "example", "com"]);
        assert_eq!(extract_query_name(&msg).as_deref(), Some("www.example.com"));
    }

    #[test]
    fn test_preserves_case_for_normalizer() {
        let msg = build_message(0x0100, 1, &["EXAMPLE", "Com"]);
        assert_eq!(extract_query_name(&msg).as_deref(), Some("EXAMPLE.Com"));
    }

    #[test]
    fn test_rejects_response() {
        let msg = build_message(0x8180, 1, &["example", "com"]);
        assert_eq!(extract_query_name(&msg), None);
    }

    #[test]
    fn test_rejects_zero_questions() {
        let msg = build_message(0x0100, 0, &["example", "com"]);
        assert_eq!(extract_query_name(&msg), None);
    }

    #[test]
    fn test_rejects_truncated_header() {
        assert_eq!(extract_query_name(&[0u8; 7]), None);
    }

    #[test]
    fn test_rejects_truncated_label() {
        let mut msg = build_message(0x0100, 1, &["example", "com"]);
        msg.truncate(HEADER_LEN + 4); // mid-label
        assert_eq!(extract_query_name(&msg), None);
    }

    #[test]
    fn test_rejects_compression_pointer() {
        let mut msg = vec![0u8; HEADER_LEN];
        msg[4..6].copy_from_slice(&1u16.to_be_bytes());
        msg.push(0xC0);
        msg.push(0x0C);
        assert_eq!(extract_query_name(&msg), None);
    }
}
