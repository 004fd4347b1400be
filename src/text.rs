//! Packed-text codec: Z-strings, zchars and ZSCII
//!
//! Z-characters are five bits, stored in groups of three across a 16-bit
//! word; the top bit of a word marks the end of the string. Decoding runs
//! through an alphabet register with temporary shifts, abbreviation
//! expansion and a 10-bit ZSCII escape. Encoding is only needed for
//! dictionary keys (6 zchars in 4 bytes for versions 1-3).

use std::collections::HashMap;

use bitreader::BitReader;
use lazy_static::lazy_static;
use log::trace;

use crate::error::{ZError, ZResult};
use crate::memory::Memory;

pub type Zchar = u8;

const ALPHABET_A0: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const ALPHABET_A1: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
/// Alphabet 2 for versions 2+: index 1 is newline.
const ALPHABET_A2: &[u8] = b" \n0123456789.,!?_#'\"/\\-:()";
/// Version 1 swaps the newline out for `<`.
const ALPHABET_A2_V1: &[u8] = b" 0123456789.,!?_#'\"/\\<-:()";

/// Dictionary keys hold six zchars in versions 1-3.
const DICT_ZCHARS: usize = 6;

/// ZSCII codes 155.. map to accented characters.
const EXTRA_CHARACTERS: [char; 69] = [
    'ä', 'ö', 'ü', 'Ä', 'Ö', 'Ü', 'ß', '«', '»', 'ë', 'ï', 'ÿ', 'Ë', 'Ï', 'á', 'é', 'í', 'ó',
    'ú', 'ý', 'Á', 'É', 'Í', 'Ó', 'Ú', 'Ý', 'à', 'è', 'ì', 'ò', 'ù', 'À', 'È', 'Ì', 'Ò', 'Ù',
    'â', 'ê', 'î', 'ô', 'û', 'Â', 'Ê', 'Î', 'Ô', 'Û', 'å', 'Å', 'ø', 'Ø', 'ã', 'ñ', 'õ', 'Ã',
    'Ñ', 'Õ', 'æ', 'Æ', 'ç', 'Ç', 'þ', 'ð', 'Þ', 'Ð', '£', 'œ', 'Œ', '¡', '¿',
];

lazy_static! {
    /// ASCII character to zchar sequence, derived from the version 2+
    /// alphabet tables. Lowercase letters are a single code; everything
    /// else pairs with a shift code.
    static ref ENCODE_MAP: HashMap<u8, Vec<Zchar>> = {
        let mut m = HashMap::new();
        for (i, &c) in ALPHABET_A0.iter().enumerate() {
            m.insert(c, vec![6 + i as Zchar]);
        }
        for (i, &c) in ALPHABET_A1.iter().enumerate() {
            m.insert(c, vec![4, 6 + i as Zchar]);
        }
        for (i, &c) in ALPHABET_A2.iter().enumerate() {
            m.insert(c, vec![5, 6 + i as Zchar]);
        }
        m
    };
}

fn alphabet_table(version: u8, alphabet: usize) -> &'static [u8] {
    match (alphabet, version) {
        (1, _) => ALPHABET_A1,
        (2, 1) => ALPHABET_A2_V1,
        (2, _) => ALPHABET_A2,
        _ => ALPHABET_A0,
    }
}

/// Split one packed word into its end flag and three zchars.
fn unpack_zword(word: [u8; 2]) -> ZResult<(bool, [Zchar; 3])> {
    let mut reader = BitReader::new(&word);
    let map = |e| ZError::story(format!("zchar unpack failed: {e}"));
    let last = reader.read_u8(1).map_err(map)? == 1;
    let mut chars = [0u8; 3];
    for c in chars.iter_mut() {
        *c = reader.read_u8(5).map_err(map)?;
    }
    Ok((last, chars))
}

/// Read a packed Z-string starting at `addr`. Returns the zchars and the
/// number of bytes consumed. A string that runs off the end of memory is a
/// story error rather than a runaway loop.
pub fn read_zchars(mem: &Memory, addr: usize) -> ZResult<(Vec<Zchar>, usize)> {
    let mut chars = Vec::new();
    let mut offset = addr;
    loop {
        let word = [mem.read_byte(offset)?, mem.read_byte(offset + 1)?];
        offset += 2;
        let (last, triple) = unpack_zword(word)?;
        chars.extend_from_slice(&triple);
        if last {
            break;
        }
    }
    Ok((chars, offset - addr))
}

/// Decode zchars to ZSCII codes. `allow_abbreviations` is cleared inside an
/// abbreviation expansion so that expansions cannot recurse; expansion
/// codes met there are silently skipped without consuming their index.
pub fn decode_zchars(
    mem: &Memory,
    version: u8,
    abbrev_table: usize,
    chars: &[Zchar],
    allow_abbreviations: bool,
) -> ZResult<Vec<u16>> {
    let mut zscii: Vec<u16> = Vec::with_capacity(chars.len() * 5);
    let mut alphabet = 0usize;
    let mut last_alphabet = 0usize;
    let mut temporary = false;

    let mut i = 0;
    while i < chars.len() {
        let zc = chars[i];
        // Zchar 2 (below version 3) and zchar 4 move one alphabet up;
        // 3 and 5 move two. 4 and 5 lock the shift in versions 1-2.
        if (version < 3 && zc == 2) || zc == 4 {
            last_alphabet = alphabet;
            alphabet = (alphabet + 1) % 3;
            temporary = zc == 2 || version >= 3;
        } else if (version < 3 && zc == 3) || zc == 5 {
            last_alphabet = alphabet;
            alphabet = (alphabet + 2) % 3;
            temporary = zc == 3 || version >= 3;
        } else {
            match zc {
                0 => zscii.push(32),
                1 if version == 1 => zscii.push(13),
                1..=3 if version >= 2 && allow_abbreviations => {
                    // Version 2 only expands through zchar 1; 2 and 3 are
                    // shifts there and never reach this arm.
                    if zc == 1 || version >= 3 {
                        i += 1;
                        let Some(&index) = chars.get(i) else {
                            break;
                        };
                        let entry =
                            abbrev_table + 2 * (32 * (zc as usize - 1) + index as usize);
                        let string_addr = mem.read_word(entry)? as usize * 2;
                        trace!("abbreviation {zc}/{index} at {string_addr:#06x}");
                        let (abbrev, _) = read_zchars(mem, string_addr)?;
                        let expansion =
                            decode_zchars(mem, version, abbrev_table, &abbrev, false)?;
                        zscii.extend_from_slice(&expansion);
                    }
                }
                6 if alphabet == 2 => {
                    // 10-bit ZSCII escape: five high bits then five low.
                    if i + 2 >= chars.len() {
                        break;
                    }
                    let high = (chars[i + 1] as u16) << 5;
                    let low = chars[i + 2] as u16;
                    i += 2;
                    zscii.push(high | low);
                }
                6..=31 => {
                    let table = alphabet_table(version, alphabet);
                    zscii.push(table[zc as usize - 6] as u16);
                }
                _ => {} // expansion code with expansion disabled
            }
            if temporary {
                alphabet = last_alphabet;
            }
        }
        i += 1;
    }

    Ok(zscii)
}

/// Decode the Z-string at `addr` into text, with abbreviation expansion.
/// Returns the text and the number of bytes the string occupied.
pub fn decode_string(
    mem: &Memory,
    version: u8,
    abbrev_table: usize,
    addr: usize,
) -> ZResult<(String, usize)> {
    let (chars, len) = read_zchars(mem, addr)?;
    let zscii = decode_zchars(mem, version, abbrev_table, &chars, true)?;
    Ok((zscii_to_string(&zscii), len))
}

fn zscii_to_char(c: u16) -> char {
    match c {
        32..=126 => c as u8 as char,
        10 | 13 => '\n',
        155..=251 => *EXTRA_CHARACTERS
            .get(c as usize - 155)
            .unwrap_or(&'?'),
        _ => '?',
    }
}

pub fn zscii_to_string(zscii: &[u16]) -> String {
    zscii.iter().map(|&c| zscii_to_char(c)).collect()
}

pub fn string_to_zscii(text: &str) -> Vec<u16> {
    text.chars().map(|c| c as u16).collect()
}

fn char_to_zchars(c: u16) -> Vec<Zchar> {
    if c <= 255 {
        if let Some(seq) = ENCODE_MAP.get(&(c as u8)) {
            return seq.clone();
        }
    }
    vec![0]
}

/// Encode ZSCII text into a 4-byte dictionary key: six zchars, truncated
/// without splitting a shift pair, padded with 5s, end bit set on the
/// final word.
pub fn encode_dictionary_word(zscii: &[u16]) -> [u8; 4] {
    let mut zchars: Vec<Zchar> = Vec::with_capacity(DICT_ZCHARS);
    for &c in zscii {
        let seq = char_to_zchars(c);
        if zchars.len() + seq.len() > DICT_ZCHARS {
            break;
        }
        zchars.extend_from_slice(&seq);
    }
    while zchars.len() < DICT_ZCHARS {
        zchars.push(5);
    }

    let mut out = [0u8; 4];
    for (w, triple) in zchars.chunks(3).enumerate() {
        let word =
            ((triple[0] as u16) << 10) | ((triple[1] as u16) << 5) | triple[2] as u16;
        out[w * 2] = (word >> 8) as u8;
        out[w * 2 + 1] = (word & 0xFF) as u8;
    }
    out[2] |= 0x80;
    out
}
