//! Authenticated download URLs.

use url::Url;

use crate::error::Result;

/// Append the web service token as a `token` query parameter.
///
/// Uses `?` when the URL has no query yet and `&` otherwise, so module
/// file URLs (which usually carry `forcedownload=1`) and bare attachment
/// URLs both come out well formed.
pub fn append_token(raw_url: &str, token: &str) -> Result<Url> {
    let mut url = Url::parse(raw_url)?;
    url.query_pairs_mut().append_pair("token", token);
    Ok(url)
}
