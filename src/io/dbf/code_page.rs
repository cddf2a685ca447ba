//! Text encodings for attribute tables.
//!
//! A dBase file names its code page with the language driver byte at header
//! offset 29. Shapefile tooling additionally writes a `.cpg` sidecar holding
//! an encoding label, which takes precedence when present.

use encoding_rs::Encoding;

/// Encoding used when neither a `.cpg` label nor a known driver byte exists.
pub const FALLBACK_ENCODING: &Encoding = encoding_rs::WINDOWS_1252;

/// Get the encoding for a dBase language driver id.
///
/// Returns `None` for 0x00 (no driver recorded) and unrecognized ids.
pub fn encoding_from_language_driver(ldid: u8) -> Option<&'static Encoding> {
    match ldid {
        // DOS code pages; encoding_rs has no 437/850 so Western ids fold to 1252
        0x01 | 0x02 | 0x09 | 0x0A | 0x0B | 0x0D | 0x0E | 0x0F | 0x10 | 0x11 | 0x14
        | 0x15 | 0x18 | 0x19 | 0x1A | 0x1B | 0x1D | 0x24 | 0x25 | 0x37 => {
            Some(encoding_rs::WINDOWS_1252)
        }
        0x26 | 0x65 => Some(encoding_rs::IBM866), // Russian DOS
        0x1F | 0x22 | 0x23 | 0x40 | 0x64 => Some(encoding_rs::WINDOWS_1250), // Central European DOS

        // Windows/ANSI code pages
        0x03 | 0x57 | 0x58 | 0x59 => Some(encoding_rs::WINDOWS_1252),
        0x13 | 0x7B => Some(encoding_rs::SHIFT_JIS),
        0x4D | 0x7A => Some(encoding_rs::GBK),
        0x4E | 0x79 => Some(encoding_rs::EUC_KR),
        0x4F | 0x78 => Some(encoding_rs::BIG5),
        0x50 | 0x7C => Some(encoding_rs::WINDOWS_874),
        0x7D => Some(encoding_rs::WINDOWS_1255),
        0x7E => Some(encoding_rs::WINDOWS_1256),
        0x86 => Some(encoding_rs::WINDOWS_1254),
        0xC8 => Some(encoding_rs::WINDOWS_1250),
        0xC9 => Some(encoding_rs::WINDOWS_1251),
        0xCA => Some(encoding_rs::WINDOWS_1254),
        0xCB => Some(encoding_rs::WINDOWS_1253),
        0xCC => Some(encoding_rs::WINDOWS_1257),

        _ => None,
    }
}

/// Language driver id to record for `encoding`; 0x00 when dBase has no id
/// for it (UTF-8 among others), in which case the `.cpg` sidecar carries it.
pub fn language_driver_for(encoding: &'static Encoding) -> u8 {
    if encoding == encoding_rs::WINDOWS_1252 {
        0x57
    } else if encoding == encoding_rs::WINDOWS_1250 {
        0xC8
    } else if encoding == encoding_rs::WINDOWS_1251 {
        0xC9
    } else if encoding == encoding_rs::WINDOWS_1253 {
        0xCB
    } else if encoding == encoding_rs::WINDOWS_1254 {
        0xCA
    } else if encoding == encoding_rs::WINDOWS_1257 {
        0xCC
    } else if encoding == encoding_rs::SHIFT_JIS {
        0x13
    } else if encoding == encoding_rs::GBK {
        0x4D
    } else if encoding == encoding_rs::EUC_KR {
        0x4E
    } else if encoding == encoding_rs::BIG5 {
        0x4F
    } else {
        0x00
    }
}

/// Get the encoding named by the contents of a `.cpg` file.
///
/// Accepts WHATWG labels (`UTF-8`, `windows-1251`) and the bare code page
/// numbers ESRI tools write (`1252`, `65001`).
pub fn encoding_from_cpg(contents: &str) -> Option<&'static Encoding> {
    let label = contents.trim();
    if let Some(enc) = Encoding::for_label(label.as_bytes()) {
        return Some(enc);
    }
    match label.to_ascii_lowercase().as_str() {
        "65001" | "utf8" => Some(encoding_rs::UTF_8),
        "ansi_1252" | "1252" => Some(encoding_rs::WINDOWS_1252),
        "88591" | "8859_1" => Some(encoding_rs::WINDOWS_1252),
        other => other
            .strip_prefix("ansi_")
            .unwrap_or(other)
            .parse::<u16>()
            .ok()
            .and_then(|cp| Encoding::for_label(format!("windows-{cp}").as_bytes())),
    }
}

/// Label written into a `.cpg` sidecar
pub fn cpg_label(encoding: &'static Encoding) -> &'static str {
    encoding.name()
}
