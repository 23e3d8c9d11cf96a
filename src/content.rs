//! District content: the generated JSON content file, the legacy HTML
//! detail fields, and the merge layer that decides which one a district
//! surfaces.
//!
//! The content file is produced offline (AI generation pipeline) and
//! consumed read-only. It keeps the Turkish field names it was generated
//! with (`genel_bilgi`, `gezilecek_yerler`, `yeme_icme`, `isim`, ...).

use crate::places::{Candidate, Category};
use crate::text::{district_key, escape_html};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

// ─── Content records ─────────────────────────────────────────────

/// One entry in a content list. Older generator runs emitted bare name
/// strings; newer ones emit objects.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ContentPlace {
    Named {
        isim: String,
        #[serde(default)]
        aciklama: Option<String>,
        #[serde(default)]
        resim: Option<String>,
    },
    Bare(String),
}

impl ContentPlace {
    pub fn name(&self) -> &str {
        match self {
            Self::Named { isim, .. } => isim,
            Self::Bare(name) => name,
        }
    }

    pub fn description(&self) -> Option<&str> {
        match self {
            Self::Named { aciklama, .. } => aciklama.as_deref(),
            Self::Bare(_) => None,
        }
    }

    pub fn image(&self) -> Option<&str> {
        match self {
            Self::Named { resim, .. } => resim.as_deref(),
            Self::Bare(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SightseeingLists {
    #[serde(rename = "doğa", default)]
    pub nature: Vec<ContentPlace>,
    #[serde(rename = "tarih", default)]
    pub history: Vec<ContentPlace>,
}

/// Generated content for one (province, district) pair.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentRecord {
    pub city: String,
    pub district: String,
    #[serde(default)]
    pub genel_bilgi: Option<String>,
    #[serde(default)]
    pub gezilecek_yerler: Option<SightseeingLists>,
    #[serde(default)]
    pub yeme_icme: Vec<ContentPlace>,
}

impl ContentRecord {
    /// Candidate place names in resolution order: nature, history, food.
    pub fn candidates(&self) -> Vec<Candidate> {
        let mut out = Vec::new();
        if let Some(lists) = &self.gezilecek_yerler {
            out.extend(lists.nature.iter().map(|p| Candidate {
                name: p.name().to_string(),
                category: Category::Nature,
            }));
            out.extend(lists.history.iter().map(|p| Candidate {
                name: p.name().to_string(),
                category: Category::History,
            }));
        }
        out.extend(self.yeme_icme.iter().map(|p| Candidate {
            name: p.name().to_string(),
            category: Category::Food,
        }));
        out
    }
}

// ─── Content store ───────────────────────────────────────────────

#[derive(Debug)]
pub enum ContentError {
    Io(String),
    Parse(String),
}

impl fmt::Display for ContentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(msg) => write!(f, "cannot read content file: {}", msg),
            Self::Parse(msg) => write!(f, "cannot parse content file: {}", msg),
        }
    }
}

impl std::error::Error for ContentError {}

/// Process-wide lookup of content records keyed by folded
/// `"province|district"`. Populated once at startup, read-only after.
pub struct ContentStore {
    records: HashMap<String, ContentRecord>,
}

impl ContentStore {
    pub fn empty() -> Self {
        Self { records: HashMap::new() }
    }

    pub fn load(path: &Path) -> Result<Self, ContentError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ContentError::Io(e.to_string()))?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ContentError> {
        let items: Vec<ContentRecord> =
            serde_json::from_str(raw).map_err(|e| ContentError::Parse(e.to_string()))?;
        let mut records = HashMap::new();
        for item in items {
            records.insert(district_key(&item.city, &item.district), item);
        }
        Ok(Self { records })
    }

    pub fn get(&self, province: &str, district: &str) -> Option<&ContentRecord> {
        self.records.get(&district_key(province, district))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// ─── Empty-content detection ─────────────────────────────────────

/// Null, blank, `"[]"`, `"{}"` and `"null"` all count as "no content".
/// Legacy rows sometimes stored empty JSON arrays with stray whitespace,
/// so the check collapses whitespace before comparing.
pub fn is_empty_content(value: Option<&str>) -> bool {
    let Some(value) = value else { return true };
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed == "[]" || trimmed == "{}" || trimmed == "null" {
        return true;
    }
    let collapsed: String = trimmed.chars().filter(|c| !c.is_whitespace()).collect();
    collapsed == "[]" || collapsed == "{}"
}

// ─── Rendering structured lists to the legacy HTML shape ─────────

pub fn render_places_html(places: &[ContentPlace]) -> String {
    if places.is_empty() {
        return String::new();
    }
    let items: String = places
        .iter()
        .map(|place| {
            let name = escape_html(place.name());
            let description = escape_html(place.description().unwrap_or(""));
            let photo = match place.image() {
                Some(url) if !url.is_empty() => format!(
                    " <a href=\"{}\" target=\"_blank\" rel=\"noopener\">Fotoğraf</a>",
                    encode_uri(url)
                ),
                _ => String::new(),
            };
            format!("<li><strong>{}</strong>: {}{}</li>", name, description, photo)
        })
        .collect();
    format!("<ul>{}</ul>", items)
}

/// Percent-encode a URL the way JavaScript's `encodeURI` does: non-ASCII
/// and unsafe bytes are encoded, URL structure characters pass through.
fn encode_uri(url: &str) -> String {
    const KEEP: &str = ";,/?:@&=+$-_.!~*'()#";
    let mut out = String::with_capacity(url.len());
    for c in url.chars() {
        if c.is_ascii_alphanumeric() || KEEP.contains(c) {
            out.push(c);
        } else {
            let mut buf = [0u8; 4];
            for b in c.encode_utf8(&mut buf).bytes() {
                out.push_str(&format!("%{:02X}", b));
            }
        }
    }
    out
}

// ─── Legacy HTML place-list parsing ──────────────────────────────

/// Extract place names from a legacy HTML detail field: the text of each
/// `<li>`, or of each `<p>` when no list items exist. Paragraphs that
/// start with `<em>` are editorial notes, not place names.
pub fn parse_place_names_from_html(html: &str) -> Vec<String> {
    let mut names = tag_texts(html, "li", false);
    if names.is_empty() {
        names = tag_texts(html, "p", true);
    }
    names
}

fn tag_texts(html: &str, tag: &str, skip_em: bool) -> Vec<String> {
    let open = format!("<{}", tag);
    let close = format!("</{}>", tag);
    let mut out = Vec::new();
    let mut pos = 0;

    while let Some(start) = find_ascii_ci(html, &open, pos) {
        // The byte right after "<li" must end the tag name.
        match html.as_bytes().get(start + open.len()) {
            Some(b'>') | Some(b'/') => {}
            Some(b) if b.is_ascii_whitespace() => {}
            _ => {
                pos = start + open.len();
                continue;
            }
        }
        let Some(open_end) = html[start..].find('>') else { break };
        let content_start = start + open_end + 1;
        let Some(end) = find_ascii_ci(html, &close, content_start) else { break };
        let inner = &html[content_start..end];

        if !(skip_em && inner.trim_start().to_ascii_lowercase().starts_with("<em>")) {
            let text = strip_tags(inner);
            if !text.is_empty() {
                out.push(text);
            }
        }
        pos = end + close.len();
    }
    out
}

/// Byte offset of the next ASCII-case-insensitive occurrence of `needle`
/// at or after `from`. Tag names are ASCII, so this stays index-safe on
/// Turkish text where full lowercasing would shift byte offsets.
fn find_ascii_ci(haystack: &str, needle: &str, from: usize) -> Option<usize> {
    let hay = haystack.as_bytes();
    let ndl = needle.as_bytes();
    if from + ndl.len() > hay.len() {
        return None;
    }
    (from..=hay.len() - ndl.len())
        .find(|&i| hay[i..i + ndl.len()].eq_ignore_ascii_case(ndl))
}

fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.trim().to_string()
}

// ─── Merge layer ─────────────────────────────────────────────────

/// The merged detail payload for one district, ready for the API.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct MergedDetail {
    pub general_info: String,
    pub nature_places: String,
    pub historical_places: String,
    pub food_drink: String,
}

/// Prefer the generated content record; fall back to the legacy HTML
/// fields; render absent content as empty strings.
pub fn merge_detail(
    record: Option<&ContentRecord>,
    legacy: Option<&crate::storage::DistrictDetailRow>,
) -> MergedDetail {
    if let Some(record) = record {
        let lists = record.gezilecek_yerler.clone().unwrap_or_default();
        return MergedDetail {
            general_info: record.genel_bilgi.clone().unwrap_or_default(),
            nature_places: render_places_html(&lists.nature),
            historical_places: render_places_html(&lists.history),
            food_drink: render_places_html(&record.yeme_icme),
        };
    }

    let field = |value: Option<&str>| -> String {
        if is_empty_content(value) {
            String::new()
        } else {
            value.unwrap_or_default().to_string()
        }
    };

    match legacy {
        Some(row) => MergedDetail {
            general_info: field(row.general_info.as_deref()),
            nature_places: field(row.nature_places.as_deref()),
            historical_places: field(row.historical_places.as_deref()),
            food_drink: field(row.food_drink.as_deref()),
        },
        None => MergedDetail::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::DistrictDetailRow;

    const SAMPLE: &str = r#"[
        {
            "city": "Yalova",
            "district": "Merkez",
            "genel_bilgi": "Yalova'nın merkez ilçesi.",
            "gezilecek_yerler": {
                "doğa": [
                    {"isim": "X Parkı", "aciklama": "Sahil parkı", "resim": "https://example.com/x parkı.jpg"}
                ],
                "tarih": ["Eski İskele"]
            },
            "yeme_icme": [
                {"isim": "Balıkçı Lokantası", "aciklama": "Taze balık"}
            ]
        }
    ]"#;

    #[test]
    fn test_store_keyed_by_folded_names() {
        let store = ContentStore::from_json(SAMPLE).unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.get("YALOVA", "merkez").is_some());
        assert!(store.get("Yalova", "Çınarcık").is_none());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("details.json");
        std::fs::write(&path, SAMPLE).unwrap();
        let store = ContentStore::load(&path).unwrap();
        assert!(store.get("Yalova", "Merkez").is_some());
    }

    #[test]
    fn test_candidates_order_and_categories() {
        let store = ContentStore::from_json(SAMPLE).unwrap();
        let record = store.get("Yalova", "Merkez").unwrap();
        let candidates = record.candidates();
        assert_eq!(candidates.len(), 3);
        assert_eq!(candidates[0].name, "X Parkı");
        assert_eq!(candidates[0].category, Category::Nature);
        assert_eq!(candidates[1].name, "Eski İskele");
        assert_eq!(candidates[1].category, Category::History);
        assert_eq!(candidates[2].category, Category::Food);
    }

    #[test]
    fn test_is_empty_content() {
        assert!(is_empty_content(None));
        assert!(is_empty_content(Some("")));
        assert!(is_empty_content(Some("   ")));
        assert!(is_empty_content(Some("[]")));
        assert!(is_empty_content(Some("{}")));
        assert!(is_empty_content(Some("null")));
        assert!(is_empty_content(Some("[ \n ]")));
        assert!(!is_empty_content(Some("<ul><li>X</li></ul>")));
    }

    #[test]
    fn test_render_places_html() {
        let store = ContentStore::from_json(SAMPLE).unwrap();
        let record = store.get("Yalova", "Merkez").unwrap();
        let lists = record.gezilecek_yerler.as_ref().unwrap();

        let html = render_places_html(&lists.nature);
        assert!(html.starts_with("<ul><li><strong>X Parkı</strong>: Sahil parkı"));
        assert!(html.contains("href=\"https://example.com/x%20park%C4%B1.jpg\""));
        assert!(html.contains(">Fotoğraf</a>"));

        assert_eq!(render_places_html(&[]), "");
    }

    #[test]
    fn test_render_escapes_html() {
        let places = vec![ContentPlace::Named {
            isim: "<script>alert(1)</script>".into(),
            aciklama: Some("a & b".into()),
            resim: None,
        }];
        let html = render_places_html(&places);
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("a &amp; b"));
    }

    #[test]
    fn test_parse_li_names() {
        let html = "<ul><li><strong>X Parkı</strong>: açıklama</li><li>Eski İskele</li></ul>";
        let names = parse_place_names_from_html(html);
        assert_eq!(names, vec!["X Parkı: açıklama", "Eski İskele"]);
    }

    #[test]
    fn test_parse_p_fallback() {
        let html = "<p>Yürüyüş Yolu</p><p><em>Not: sezonluk</em></p><p>Çınarcık Sahili</p>";
        let names = parse_place_names_from_html(html);
        assert_eq!(names, vec!["Yürüyüş Yolu", "Çınarcık Sahili"]);
    }

    #[test]
    fn test_parse_prefers_li_over_p() {
        let html = "<p>intro</p><ul><li>A</li></ul>";
        assert_eq!(parse_place_names_from_html(html), vec!["A"]);
    }

    #[test]
    fn test_parse_empty_and_plain_text() {
        assert!(parse_place_names_from_html("").is_empty());
        assert!(parse_place_names_from_html("düz metin, etiket yok").is_empty());
    }

    #[test]
    fn test_merge_prefers_record() {
        let store = ContentStore::from_json(SAMPLE).unwrap();
        let record = store.get("Yalova", "Merkez");
        let legacy = DistrictDetailRow {
            general_info: Some("eski bilgi".into()),
            ..Default::default()
        };
        let merged = merge_detail(record, Some(&legacy));
        assert_eq!(merged.general_info, "Yalova'nın merkez ilçesi.");
        assert!(merged.nature_places.contains("X Parkı"));
    }

    #[test]
    fn test_merge_falls_back_to_legacy() {
        let legacy = DistrictDetailRow {
            general_info: Some("eski bilgi".into()),
            nature_places: Some("[]".into()),
            historical_places: Some("<ul><li>Kale</li></ul>".into()),
            food_drink: None,
        };
        let merged = merge_detail(None, Some(&legacy));
        assert_eq!(merged.general_info, "eski bilgi");
        assert_eq!(merged.nature_places, ""); // "[]" is no content
        assert!(merged.historical_places.contains("Kale"));
        assert_eq!(merged.food_drink, "");
    }

    #[test]
    fn test_merge_nothing() {
        let merged = merge_detail(None, None);
        assert_eq!(merged.general_info, "");
    }

    #[test]
    fn test_bare_string_entries() {
        let store = ContentStore::from_json(SAMPLE).unwrap();
        let record = store.get("Yalova", "Merkez").unwrap();
        let lists = record.gezilecek_yerler.as_ref().unwrap();
        assert_eq!(lists.history[0].name(), "Eski İskele");
        assert!(lists.history[0].description().is_none());
    }
}
