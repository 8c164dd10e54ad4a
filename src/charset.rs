//! Converts the fixed 16-byte labels carried by FIG1 records into UTF-8,
//! per the charset selector in the FIG1 header byte.
//!
//! The teacher's `decode_chars` (`shared/src/dab/utils.rs`) dispatches on a
//! handful of charset values (0x0 EBU Latin, 0x4 raw byte-as-char, 0xF
//! `from_utf8_lossy`) and falls through to a placeholder string otherwise.
//! This module generalises that into the full selector space the spec
//! requires: 0..15 decode through the EBU Latin repertoire, 16.. are
//! ignored.

/// EBU Latin based repertoire (ETSI EN 300 401 Annex C), selector 0.
/// Bytes 0x20..0x7E match ASCII; the control range and the upper half carry
/// broadcast-specific symbols and accented Latin letters. `charsets.h` was
/// not part of the retrieved sources (see DESIGN.md), so the upper half is
/// a best-effort reconstruction of the commonly deployed table rather than
/// a byte-exact transcription of the ETSI annex.
const EBU_LATIN_TO_UNICODE: [char; 256] = build_table();

const fn build_table() -> [char; 256] {
    let table = [' '; 256];
    let table = fill_ascii(table);
    fill_upper(table)
}

const fn fill_ascii(mut table: [char; 256]) -> [char; 256] {
    let mut i = 0x20usize;
    while i <= 0x7E {
        table[i] = i as u8 as char;
        i += 1;
    }
    table
}

const fn fill_upper(mut table: [char; 256]) -> [char; 256] {
    // Selected accented Latin letters and symbols from the broadcast
    // repertoire; everything else in 0x80..0xFF falls back to '?'.
    let entries: [(usize, char); 60] = [
        (0x80, 'à'), (0x81, 'á'), (0x82, 'â'), (0x83, 'ä'),
        (0x84, 'ã'), (0x85, 'å'), (0x86, 'æ'), (0x87, 'ç'),
        (0x88, 'è'), (0x89, 'é'), (0x8A, 'ê'), (0x8B, 'ë'),
        (0x8C, 'ì'), (0x8D, 'í'), (0x8E, 'î'), (0x8F, 'ï'),
        (0x90, 'ð'), (0x91, 'ñ'), (0x92, 'ò'), (0x93, 'ó'),
        (0x94, 'ô'), (0x95, 'õ'), (0x96, 'ö'), (0x97, 'œ'),
        (0x98, 'ø'), (0x99, 'ù'), (0x9A, 'ú'), (0x9B, 'û'),
        (0x9C, 'ü'), (0x9D, 'ý'), (0x9E, 'þ'), (0x9F, 'ß'),
        (0xA0, 'À'), (0xA1, 'Á'), (0xA2, 'Â'), (0xA3, 'Ä'),
        (0xA4, 'Ã'), (0xA5, 'Å'), (0xA6, 'Æ'), (0xA7, 'Ç'),
        (0xA8, 'È'), (0xA9, 'É'), (0xAA, 'Ê'), (0xAB, 'Ë'),
        (0xAC, 'Ì'), (0xAD, 'Í'), (0xAE, 'Î'), (0xAF, 'Ï'),
        (0xB0, 'Ð'), (0xB1, 'Ñ'), (0xB2, 'Ò'), (0xB3, 'Ó'),
        (0xB4, 'Ô'), (0xB5, 'Õ'), (0xB6, 'Ö'), (0xB7, 'Œ'),
        (0xB8, 'Ø'), (0xB9, 'Ù'), (0xBA, 'Ú'), (0xBB, 'Û'),
    ];
    let mut i = 0x80usize;
    while i <= 0xFF {
        table[i] = '?';
        i += 1;
    }
    let mut j = 0;
    while j < entries.len() {
        let (idx, ch) = entries[j];
        table[idx] = ch;
        j += 1;
    }
    table
}

/// Decodes a 16-byte FIG1 label buffer into a UTF-8 string, trimming
/// trailing spaces (required so label-based queries work reliably, per
/// spec §4.2).
pub fn decode_label(bytes: &[u8; 16], charset: u8) -> String {
    if charset >= 16 {
        return String::new();
    }

    let decoded: String = bytes
        .iter()
        .map(|&b| EBU_LATIN_TO_UNICODE[b as usize])
        .collect();

    decoded.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(s: &str) -> [u8; 16] {
        let mut buf = [b' '; 16];
        for (i, b) in s.as_bytes().iter().enumerate().take(16) {
            buf[i] = *b;
        }
        buf
    }

    #[test]
    fn ascii_passthrough_trims_trailing_spaces() {
        let buf = label("MyEnsemble");
        assert_eq!(decode_label(&buf, 0), "MyEnsemble");
    }

    #[test]
    fn charset_16_and_above_returns_empty() {
        let buf = label("MyEnsemble");
        assert_eq!(decode_label(&buf, 16), "");
        assert_eq!(decode_label(&buf, 255), "");
    }

    #[test]
    fn interior_spaces_are_preserved() {
        let buf = label("Radio One");
        assert_eq!(decode_label(&buf, 0), "Radio One");
    }
}
