//! Turkish text canonicalization.
//!
//! Every name comparison in the crate (city slugs, district keys, place
//! matching) goes through `fold_turkish` on both sides. The fold must be
//! idempotent: folding an already-folded string returns it unchanged.

/// Canonicalize a Turkish string for matching: decompose, strip combining
/// marks, map the Turkish-specific letters to ASCII base letters,
/// lowercase, trim.
///
/// Dotted capital İ lowercases to plain `i` here, so "İzmir" and "izmir"
/// fold to the same output.
pub fn fold_turkish(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            'ğ' | 'Ğ' => out.push('g'),
            'ü' | 'Ü' => out.push('u'),
            'ş' | 'Ş' => out.push('s'),
            'ı' | 'İ' => out.push('i'),
            'ö' | 'Ö' => out.push('o'),
            'ç' | 'Ç' => out.push('c'),
            // Combining diacritical marks (U+0300..U+036F) from
            // pre-decomposed input are dropped outright.
            '\u{0300}'..='\u{036f}' => {}
            _ => {
                for d in decompose(c) {
                    if !('\u{0300}'..='\u{036f}').contains(&d) {
                        out.extend(d.to_lowercase());
                    }
                }
            }
        }
    }
    out.trim().to_string()
}

/// Minimal NFD decomposition for the Latin range this app actually sees.
/// Characters without a known decomposition pass through unchanged.
fn decompose(c: char) -> Vec<char> {
    match c {
        'â' | 'Â' => vec!['a', '\u{0302}'],
        'î' | 'Î' => vec!['i', '\u{0302}'],
        'û' | 'Û' => vec!['u', '\u{0302}'],
        'á' | 'Á' => vec!['a', '\u{0301}'],
        'à' | 'À' => vec!['a', '\u{0300}'],
        'é' | 'É' => vec!['e', '\u{0301}'],
        'è' | 'È' => vec!['e', '\u{0300}'],
        'ê' | 'Ê' => vec!['e', '\u{0302}'],
        'í' | 'Í' => vec!['i', '\u{0301}'],
        'ó' | 'Ó' => vec!['o', '\u{0301}'],
        'ú' | 'Ú' => vec!['u', '\u{0301}'],
        'ñ' | 'Ñ' => vec!['n', '\u{0303}'],
        _ => vec![c],
    }
}

/// Build the content-store key for a (province, district) pair.
pub fn district_key(province: &str, district: &str) -> String {
    format!("{}|{}", fold_turkish(province), fold_turkish(district))
}

/// Escape a string for inclusion in rendered HTML content.
pub fn escape_html(unsafe_text: &str) -> String {
    let mut out = String::with_capacity(unsafe_text.len());
    for c in unsafe_text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(c),
        }
    }
    out
}
