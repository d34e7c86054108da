//! Text normalization, variant generation and similarity scoring.
//!
//! All of this is local and pure; the oracle is never consulted here.

use regex::Regex;
use std::sync::OnceLock;

/// Minimum score for a local lexical match to count.
pub const LEXICAL_MATCH_THRESHOLD: f64 = 0.7;

const SEPARATORS: &[&str] = &[",", "-", "\u{2013}", "/", " at ", " in "];

const PREFIXES: &[&str] = &[
    "university of",
    "the university of",
    "college of",
    "institute of",
    "school of",
    "the ",
];

const SUFFIXES: &[&str] = &[" university", " college", " institute", " school"];

const STOPWORDS: &[&str] = &["of", "the", "and", "in", "at", "for", "a", "an"];

/// US state names to postal abbreviations.
pub const STATE_ABBREVIATIONS: &[(&str, &str)] = &[
    ("alabama", "al"),
    ("alaska", "ak"),
    ("arizona", "az"),
    ("arkansas", "ar"),
    ("california", "ca"),
    ("colorado", "co"),
    ("connecticut", "ct"),
    ("delaware", "de"),
    ("florida", "fl"),
    ("georgia", "ga"),
    ("hawaii", "hi"),
    ("idaho", "id"),
    ("illinois", "il"),
    ("indiana", "in"),
    ("iowa", "ia"),
    ("kansas", "ks"),
    ("kentucky", "ky"),
    ("louisiana", "la"),
    ("maine", "me"),
    ("maryland", "md"),
    ("massachusetts", "ma"),
    ("michigan", "mi"),
    ("minnesota", "mn"),
    ("mississippi", "ms"),
    ("missouri", "mo"),
    ("montana", "mt"),
    ("nebraska", "ne"),
    ("nevada", "nv"),
    ("new hampshire", "nh"),
    ("new jersey", "nj"),
    ("new mexico", "nm"),
    ("new york", "ny"),
    ("north carolina", "nc"),
    ("north dakota", "nd"),
    ("ohio", "oh"),
    ("oklahoma", "ok"),
    ("oregon", "or"),
    ("pennsylvania", "pa"),
    ("rhode island", "ri"),
    ("south carolina", "sc"),
    ("south dakota", "sd"),
    ("tennessee", "tn"),
    ("texas", "tx"),
    ("utah", "ut"),
    ("vermont", "vt"),
    ("virginia", "va"),
    ("washington", "wa"),
    ("west virginia", "wv"),
    ("wisconsin", "wi"),
    ("wyoming", "wy"),
    ("district of columbia", "dc"),
    ("puerto rico", "pr"),
];

/// Semantic category of a field, as far as variant generation cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldCategory {
    School,
    Location,
    Degree,
    Demographic,
    Other,
}

impl FieldCategory {
    pub fn from_field_type(field_type: Option<&str>) -> Self {
        let Some(t) = field_type else {
            return FieldCategory::Other;
        };
        let t = t.to_lowercase();
        let has = |words: &[&str]| words.iter().any(|w| t.contains(w));
        if has(&["school", "university", "college", "education", "institution"]) {
            FieldCategory::School
        } else if has(&["location", "city", "country", "address"]) {
            FieldCategory::Location
        } else if has(&["degree"]) {
            FieldCategory::Degree
        } else if has(&[
            "demographic",
            "gender",
            "race",
            "ethnicity",
            "hispanic",
            "veteran",
            "disability",
        ]) {
            FieldCategory::Demographic
        } else {
            FieldCategory::Other
        }
    }
}

/// Best lexical match of a desired value among options.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    /// The option text, verbatim.
    pub text: String,
    /// Similarity in `[0, 1]`.
    pub score: f64,
}

fn punctuation_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\w\s-]").expect("valid regex"))
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn lower_with_separators(text: &str) -> String {
    let mut out = text.trim().to_lowercase();
    for sep in SEPARATORS {
        out = out.replace(sep, " ");
    }
    out
}

/// Canonical comparison form: lower-cased, separators collapsed,
/// institutional prefixes/suffixes stripped, punctuation removed.
pub fn normalize_text(text: &str) -> String {
    if text.trim().is_empty() {
        return String::new();
    }
    let mut out = lower_with_separators(text).trim().to_string();
    for prefix in PREFIXES {
        if let Some(rest) = out.strip_prefix(prefix) {
            out = rest.trim().to_string();
        }
    }
    for suffix in SUFFIXES {
        if let Some(rest) = out.strip_suffix(suffix) {
            out = rest.trim().to_string();
        }
    }
    let out = punctuation_re().replace_all(&out, "");
    collapse_whitespace(&out)
}

/// Alternative renderings of `value` to widen matching recall.
///
/// Always contains the original value. Sorted longest first.
pub fn generate_variants(value: &str, category: FieldCategory) -> Vec<String> {
    let mut variants: Vec<String> = Vec::new();
    let mut push = |v: String| {
        let v = v.trim().to_string();
        if !v.is_empty() && !variants.contains(&v) {
            variants.push(v);
        }
    };

    push(value.to_string());
    let normalized = normalize_text(value);
    push(normalized.clone());

    match category {
        FieldCategory::School => {
            for v in school_variants(value) {
                push(v);
            }
        }
        FieldCategory::Location => {
            for v in location_variants(value) {
                push(v);
            }
        }
        FieldCategory::Degree => {
            for v in degree_variants(&normalized) {
                push(v.to_string());
            }
        }
        FieldCategory::Demographic => {
            for v in demographic_variants(&normalized) {
                push(v.to_string());
            }
        }
        FieldCategory::Other => {}
    }

    variants.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()));
    variants
}

fn initials(words: &[&str]) -> String {
    words
        .iter()
        .filter(|w| !STOPWORDS.contains(w))
        .filter_map(|w| w.chars().next())
        .collect()
}

fn school_variants(value: &str) -> Vec<String> {
    let mut out = Vec::new();
    let lowered = value.trim().to_lowercase();
    let flat = collapse_whitespace(&lower_with_separators(value));
    let words: Vec<&str> = flat.split(' ').filter(|w| !w.is_empty()).collect();

    let all = initials(&words);
    if all.chars().count() >= 2 {
        out.push(all);
    }

    // "University of California, Berkeley" -> "uc berkeley"
    if let Some((head, campus)) = lowered.split_once(',') {
        let head_flat = collapse_whitespace(&lower_with_separators(head));
        let head_words: Vec<&str> = head_flat.split(' ').filter(|w| !w.is_empty()).collect();
        let head_initials = initials(&head_words);
        let campus = collapse_whitespace(campus);
        if head_initials.chars().count() >= 2 && !campus.is_empty() {
            out.push(format!("{} {}", head_initials, campus));
        }
    }
    out
}

fn state_abbreviation(name: &str) -> Option<&'static str> {
    let name = name.trim().to_lowercase();
    STATE_ABBREVIATIONS
        .iter()
        .find(|(full, _)| *full == name)
        .map(|(_, abbr)| *abbr)
}

fn location_variants(value: &str) -> Vec<String> {
    let parts: Vec<String> = value
        .split(',')
        .map(|p| p.trim().to_lowercase())
        .filter(|p| !p.is_empty())
        .collect();
    let mut out = Vec::new();
    let Some(city) = parts.first() else {
        return out;
    };
    out.push(city.clone());
    if let Some(region) = parts.get(1) {
        match state_abbreviation(region) {
            Some(abbr) => {
                out.push(format!("{}, {}", city, abbr));
                out.push(abbr.to_string());
            }
            None => out.push(format!("{}, {}", city, region)),
        }
    }
    out
}

fn degree_variants(normalized: &str) -> Vec<&'static str> {
    let mut out = Vec::new();
    if normalized.contains("bachelor") {
        out.extend(["bs", "ba"]);
    }
    if normalized.contains("master") {
        out.extend(["ms", "ma", "mba"]);
    }
    if normalized.contains("doctor") || normalized.contains("phd") {
        out.push("phd");
    }
    if normalized.contains("associate") {
        out.extend(["aa", "as"]);
    }
    out
}

fn demographic_variants(normalized: &str) -> Vec<&'static str> {
    const DECLINES: &[&str] = &[
        "prefer not to say",
        "prefer not to answer",
        "decline to answer",
        "decline to self identify",
        "i dont wish to answer",
        "decline",
    ];
    match normalized {
        "yes" => vec!["y"],
        "no" => vec!["n"],
        other if DECLINES.iter().any(|d| other.contains(d)) => vec!["decline", "na", "n/a"],
        _ => Vec::new(),
    }
}

/// Levenshtein distance over chars.
fn edit_distance(a: &[char], b: &[char]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut cur = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        cur[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            cur[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(cur[j] + 1);
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[b.len()]
}

/// Edit-distance ratio in `[0, 1]`; 1.0 means identical.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let longest = a.len().max(b.len());
    if longest == 0 {
        return 1.0;
    }
    1.0 - edit_distance(&a, &b) as f64 / longest as f64
}

/// Similarity after normalizing both sides.
pub fn normalized_similarity(expected: &str, actual: &str) -> f64 {
    similarity(&normalize_text(expected), &normalize_text(actual))
}

/// Best option for `desired` by comparing every variant to every normalized option.
pub fn best_lexical_match(
    desired: &str,
    options: &[String],
    category: FieldCategory,
) -> Option<MatchResult> {
    let variants: Vec<String> = generate_variants(desired, category)
        .into_iter()
        .map(|v| normalize_text(&v))
        .filter(|v| !v.is_empty())
        .collect();

    let mut best: Option<MatchResult> = None;
    for option in options {
        let candidate = normalize_text(option);
        if candidate.is_empty() {
            continue;
        }
        let score = variants
            .iter()
            .map(|v| similarity(v, &candidate))
            .fold(0.0, f64::max);
        if best.as_ref().map_or(true, |b| score > b.score) {
            best = Some(MatchResult {
                text: option.clone(),
                score,
            });
        }
    }
    best.filter(|m| m.score >= LEXICAL_MATCH_THRESHOLD)
}

/// Truncate to at most `max` chars.
pub fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_text() {
        assert_eq!(
            normalize_text("University of California, Berkeley"),
            "california berkeley"
        );
        assert_eq!(normalize_text("  Stanford University "), "stanford");
        assert_eq!(normalize_text("New York / NY"), "new york ny");
        assert_eq!(normalize_text("Yes!"), "yes");
        assert_eq!(normalize_text(""), "");
    }

    #[test]
    fn test_location_variants() {
        let variants = generate_variants("Berkeley, California", FieldCategory::Location);
        assert!(variants.contains(&"berkeley".to_string()), "{:?}", variants);
        assert!(variants.contains(&"berkeley, ca".to_string()), "{:?}", variants);
        assert!(variants.contains(&"Berkeley, California".to_string()));
    }

    #[test]
    fn test_location_unknown_region() {
        let variants = generate_variants("Toronto, Ontario", FieldCategory::Location);
        assert!(variants.contains(&"toronto, ontario".to_string()));
        assert!(variants.contains(&"toronto".to_string()));
    }

    #[test]
    fn test_school_variants() {
        let variants =
            generate_variants("University of California, Berkeley", FieldCategory::School);
        assert!(variants.contains(&"ucb".to_string()), "{:?}", variants);
        assert!(variants.contains(&"uc berkeley".to_string()), "{:?}", variants);
    }

    #[test]
    fn test_degree_variants() {
        let variants = generate_variants("Master of Science", FieldCategory::Degree);
        for v in ["ms", "ma", "mba"] {
            assert!(variants.contains(&v.to_string()));
        }
        let variants = generate_variants("PhD", FieldCategory::Degree);
        assert!(variants.contains(&"phd".to_string()));
    }

    #[test]
    fn test_demographic_variants() {
        let variants = generate_variants("Yes", FieldCategory::Demographic);
        assert!(variants.contains(&"y".to_string()));
        let variants = generate_variants("I prefer not to say", FieldCategory::Demographic);
        assert!(variants.contains(&"n/a".to_string()));
    }

    #[test]
    fn test_variants_sorted_longest_first() {
        let variants = generate_variants("Berkeley, California", FieldCategory::Location);
        let lens: Vec<usize> = variants.iter().map(|v| v.chars().count()).collect();
        let mut sorted = lens.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(lens, sorted);
    }

    #[test]
    fn test_similarity_bounds() {
        assert_eq!(similarity("", ""), 1.0);
        assert_eq!(similarity("abc", "abc"), 1.0);
        assert_eq!(similarity("abc", "xyz"), 0.0);
        let s = similarity("kitten", "sitting");
        assert!((s - (1.0 - 3.0 / 7.0)).abs() < 1e-9);
    }

    #[test]
    fn test_best_lexical_match() {
        let options = vec![
            "Bachelor's Degree".to_string(),
            "Master's Degree".to_string(),
            "Doctorate".to_string(),
        ];
        let m = best_lexical_match("Masters Degree", &options, FieldCategory::Degree).unwrap();
        assert_eq!(m.text, "Master's Degree");
        assert!(m.score >= LEXICAL_MATCH_THRESHOLD);

        assert!(best_lexical_match("Astronaut", &options, FieldCategory::Other).is_none());
    }

    #[test]
    fn test_field_category() {
        assert_eq!(
            FieldCategory::from_field_type(Some("school")),
            FieldCategory::School
        );
        assert_eq!(
            FieldCategory::from_field_type(Some("current_location")),
            FieldCategory::Location
        );
        assert_eq!(
            FieldCategory::from_field_type(Some("veteran_status")),
            FieldCategory::Demographic
        );
        assert_eq!(FieldCategory::from_field_type(None), FieldCategory::Other);
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("ab", 10), "ab");
    }
}
