//! Script detection for inserted text runs
//!
//! Decides whether a run can be drawn with a single-byte base-14 font or
//! needs a composite (CID-keyed) font, and which regional glyph collection
//! the composite font should declare.

use std::borrow::Cow;

/// Regional glyph-set identity chosen for a text run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Ordering {
    /// Every codepoint is 7-bit ASCII
    #[default]
    Latin,
    /// Adobe-GB1
    SimplifiedChinese,
    /// Adobe-CNS1
    TraditionalChinese,
    /// Adobe-Japan1
    Japanese,
    /// Adobe-Korea1
    Korean,
}

impl Ordering {
    /// True when the run needs a composite font
    pub fn is_cjk(self) -> bool {
        self != Ordering::Latin
    }

    /// `Ordering` entry of the CIDSystemInfo dictionary
    pub fn collection(self) -> Option<&'static str> {
        match self {
            Ordering::Latin => None,
            Ordering::SimplifiedChinese => Some("GB1"),
            Ordering::TraditionalChinese => Some("CNS1"),
            Ordering::Japanese => Some("Japan1"),
            Ordering::Korean => Some("Korea1"),
        }
    }

    /// `Supplement` entry of the CIDSystemInfo dictionary
    pub fn supplement(self) -> i64 {
        match self {
            Ordering::Latin => 0,
            Ordering::SimplifiedChinese => 5,
            Ordering::TraditionalChinese => 7,
            Ordering::Japanese => 7,
            Ordering::Korean => 2,
        }
    }

    /// Predefined CMap taking 2-byte UCS-2 codes to CIDs of this collection
    pub fn ucs2_cmap(self) -> Option<&'static str> {
        match self {
            Ordering::Latin => None,
            Ordering::SimplifiedChinese => Some("UniGB-UCS2-H"),
            Ordering::TraditionalChinese => Some("UniCNS-UCS2-H"),
            Ordering::Japanese => Some("UniJIS-UCS2-H"),
            Ordering::Korean => Some("UniKS-UCS2-H"),
        }
    }
}

/// Decode caller bytes as UTF-8, replacing each invalid unit with U+FFFD
///
/// Decoding never fails: a bad byte must not block an otherwise valid run.
pub fn decode_lossy(bytes: &[u8]) -> Cow<'_, str> {
    let decoded = String::from_utf8_lossy(bytes);
    if let Cow::Owned(_) = decoded {
        log::warn!("text run contained invalid UTF-8; substituted U+FFFD");
    }
    decoded
}

fn is_kana(cp: u32) -> bool {
    (0x3040..=0x30FF).contains(&cp)
}

fn is_hangul(cp: u32) -> bool {
    (0xAC00..=0xD7AF).contains(&cp) || (0x1100..=0x11FF).contains(&cp)
}

fn is_bopomofo(cp: u32) -> bool {
    (0x3100..=0x312F).contains(&cp)
}

/// Classify a text run
///
/// Mixed runs still resolve to exactly one ordering, with priority
/// Japanese > Korean > Traditional Chinese > Simplified Chinese.
pub fn classify(text: &str) -> Ordering {
    if text.is_ascii() {
        return Ordering::Latin;
    }

    let (mut japanese, mut korean, mut traditional) = (false, false, false);
    for c in text.chars() {
        let cp = c as u32;
        japanese |= is_kana(cp);
        korean |= is_hangul(cp);
        traditional |= is_bopomofo(cp);
    }

    if japanese {
        Ordering::Japanese
    } else if korean {
        Ordering::Korean
    } else if traditional {
        Ordering::TraditionalChinese
    } else {
        Ordering::SimplifiedChinese
    }
}
