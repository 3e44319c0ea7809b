//! OSTA "dstring" fields: fixed-width, leading compression-ID byte, trailing
//! length byte, used for volume/fileset identifier strings.

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct DstringErrors: u16 {
        const UNKNOWN_COMP_ID    = 1 << 0;
        const NOT_EMPTY          = 1 << 1;
        const NONZERO_PADDING    = 1 << 2;
        const WRONG_LENGTH       = 1 << 3;
        const INVALID_CHARACTERS = 1 << 4;
    }
}

const COMP_ASCII8: u8 = 8;
const COMP_UCS16: u8 = 16;

fn is_known_comp_id(id: u8) -> bool {
    matches!(id, 0 | 8 | 16 | 254 | 255)
}

/// Validate a dstring field's raw `field` bytes (including the leading
/// compression-ID byte; the trailing length byte is implicit for compression
/// IDs 254/255 and is `field[field.len()-1]` otherwise).
pub fn verify(field: &[u8]) -> DstringErrors {
    let mut errors = DstringErrors::empty();
    if field.is_empty() {
        return errors;
    }
    let comp_id = field[0];
    if !is_known_comp_id(comp_id) {
        errors |= DstringErrors::UNKNOWN_COMP_ID;
        return errors;
    }

    let has_explicit_length = !matches!(comp_id, 254 | 255);
    let (payload, declared_len) = if has_explicit_length && field.len() >= 2 {
        (&field[1..field.len() - 1], field[field.len() - 1] as usize)
    } else {
        (&field[1..], 0)
    };

    if comp_id == 0 || declared_len == 0 {
        if payload.iter().any(|&b| b != 0) {
            errors |= DstringErrors::NOT_EMPTY;
        }
        return errors;
    }

    let unit_size = if comp_id == COMP_UCS16 { 2 } else { 1 };
    let first_zero_unit = payload
        .chunks(unit_size)
        .position(|unit| unit.iter().all(|&b| b == 0));

    match first_zero_unit {
        Some(idx) => {
            let tail = &payload[idx * unit_size..];
            if tail.iter().any(|&b| b != 0) {
                errors |= DstringErrors::NONZERO_PADDING;
            }
            if has_explicit_length && idx != declared_len {
                errors |= DstringErrors::WRONG_LENGTH;
            }
        }
        None => {
            if has_explicit_length && payload.len() / unit_size != declared_len {
                errors |= DstringErrors::WRONG_LENGTH;
            }
        }
    }

    if comp_id == COMP_UCS16 {
        for unit in payload.chunks_exact(2) {
            let code = u16::from_be_bytes([unit[0], unit[1]]);
            if code == 0xFFFE || code == 0xFEFF {
                errors |= DstringErrors::INVALID_CHARACTERS;
                break;
            }
        }
    }

    errors
}

/// Decode a dstring to a `String` for diagnostics only; never used for
/// on-disk comparisons.
pub fn decode(field: &[u8]) -> String {
    if field.is_empty() {
        return String::new();
    }
    if field.len() < 2 {
        return String::new();
    }
    match field[0] {
        COMP_ASCII8 => {
            let payload = &field[1..field.len() - 1];
            let end = payload.iter().position(|&b| b == 0).unwrap_or(payload.len());
            payload[..end].iter().map(|&b| b as char).collect()
        }
        COMP_UCS16 => {
            let payload = &field[1..field.len() - 1];
            payload
                .chunks_exact(2)
                .map(|c| u16::from_be_bytes([c[0], c[1]]))
                .take_while(|&c| c != 0)
                .filter_map(char::from_u32)
                .collect()
        }
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ascii_field(s: &str, width: usize) -> Vec<u8> {
        let mut v = vec![0u8; width];
        v[0] = COMP_ASCII8;
        v[1..1 + s.len()].copy_from_slice(s.as_bytes());
        *v.last_mut().unwrap() = s.len() as u8;
        v
    }

    #[test]
    fn empty_comp_zero_field_is_valid() {
        let field = vec![0u8; 32];
        assert!(verify(&field).is_empty());
    }

    #[test]
    fn valid_ascii_field_round_trips() {
        let field = ascii_field("hello", 16);
        assert!(verify(&field).is_empty(), "{:?}", verify(&field));
        assert_eq!(decode(&field), "hello");
    }

    #[test]
    fn unknown_compression_id_is_flagged() {
        let mut field = ascii_field("x", 16);
        field[0] = 3;
        assert!(verify(&field).contains(DstringErrors::UNKNOWN_COMP_ID));
    }

    #[test]
    fn nonzero_padding_is_flagged() {
        let mut field = ascii_field("hi", 16);
        *field.last_mut().unwrap() = 2;
        field[10] = 0x7a; // stray byte past the declared length
        assert!(verify(&field).contains(DstringErrors::NONZERO_PADDING));
    }

    #[test]
    fn wrong_declared_length_is_flagged() {
        let mut field = ascii_field("hi", 16);
        field[field.len() - 1] = 5;
        assert!(verify(&field).contains(DstringErrors::WRONG_LENGTH));
    }
}
