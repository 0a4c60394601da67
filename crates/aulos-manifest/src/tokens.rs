#![forbid(unsafe_code)]

//! Media-URL template handling.
//!
//! Segment addressing templates carry `$Time$` and `$Number$` tokens that
//! are substituted when a concrete segment is materialized (`$$` escapes a
//! literal dollar). Representation-id and bitrate placeholders are
//! resolved upstream by the format-specific parser before templates reach
//! this crate.

use url::Url;

/// Resolve a media template against every candidate base URL of a
/// Representation.
///
/// Returns one candidate URL string per base. A template that is itself an
/// absolute URL is returned as-is; a base that cannot absorb the template
/// is skipped. With no bases at all, the bare template is the only
/// candidate.
pub fn create_index_urls(base_urls: &[Url], template: Option<&str>) -> Vec<String> {
    let Some(template) = template else {
        return base_urls.iter().map(|u| u.to_string()).collect();
    };
    if base_urls.is_empty() {
        return vec![template.to_string()];
    }
    base_urls
        .iter()
        .filter_map(|base| base.join(template).ok())
        .map(|u| u.to_string())
        .collect()
}

/// Substitute `$Time$` and `$Number$` tokens in a materialized template.
///
/// `time` is in index-timescale units; tokens whose value is unknown are
/// left untouched so the defect is visible downstream.
pub fn substitute_tokens(template: &str, time: Option<f64>, number: Option<u64>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(idx) = rest.find('$') {
        out.push_str(&rest[..idx]);
        let after = &rest[idx + 1..];
        if let Some(stripped) = after.strip_prefix('$') {
            out.push('$');
            rest = stripped;
        } else if let Some(stripped) = after.strip_prefix("Time$") {
            match time {
                Some(t) => out.push_str(&format!("{}", t.round() as i64)),
                None => out.push_str("$Time$"),
            }
            rest = stripped;
        } else if let Some(stripped) = after.strip_prefix("Number$") {
            match number {
                Some(n) => out.push_str(&n.to_string()),
                None => out.push_str("$Number$"),
            }
            rest = stripped;
        } else {
            out.push('$');
            rest = after;
        }
    }
    out.push_str(rest);
    out
}
