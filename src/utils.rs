use anyhow::Result;
use url::Url;

pub fn filename_from_url(url_str: &str) -> Result<String> {
    let url = Url::parse(url_str)?;

    if let Some(segments) = url.path_segments() {
        if let Some(filename) = segments.last() {
            if !filename.is_empty() {
                return Ok(filename.to_string());
            }
        }
    }

    // Fallback if no filename found in path
    Ok(format!("download_{}", uuid::Uuid::new_v4()))
}

/// Makes a page title safe as a directory name on every platform.
pub fn sanitize_title(title: &str) -> String {
    title
        .chars()
        .filter(|c| {
            !c.is_control() && !matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*')
        })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Resolves a site-relative reference (e.g. a slide path) against the page URL.
pub fn resolve_url(page_url: &str, reference: &str) -> Result<String> {
    let base = Url::parse(page_url)?;
    Ok(base.join(reference)?.to_string())
}
