use anyhow::Result;

pub(super) const MIN_ENCRYPTION_KEY_LEN: usize = 21;

pub(super) fn require_non_empty(label: &str, s: &str) -> Result<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        anyhow::bail!("{label} must be set");
    }
    Ok(trimmed.to_string())
}

pub(super) fn parse_http_url(label: &str, s: &str) -> Result<String> {
    let url = require_non_empty(label, s)?;
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        anyhow::bail!("{label} must be an http(s) url: {url}");
    }
    Ok(url.trim_end_matches('/').to_string())
}

pub(super) fn parse_encryption_key(label: &str, s: &str) -> Result<String> {
    if s.chars().count() < MIN_ENCRYPTION_KEY_LEN {
        anyhow::bail!(
            "{label} is undefined or insecure (require at least {MIN_ENCRYPTION_KEY_LEN} chars)"
        );
    }
    Ok(s.to_string())
}
