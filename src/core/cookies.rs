//! `Cookie` header construction.

use url::Url;

use super::session::{CookieQuery, CookieStore, StoreError};
use super::types::CookieRecord;

/// Join cookies as `name=value; ` pairs, keeping the trailing separator.
pub fn build_cookie_header<'a, I>(cookies: I) -> String
where
    I: IntoIterator<Item = &'a CookieRecord>,
{
    cookies
        .into_iter()
        .map(|cookie| format!("{}={}; ", cookie.name, cookie.value))
        .collect()
}

/// Like [`build_cookie_header`] but drops secure cookies unless the target
/// is `https`.
pub fn build_scoped_cookie_header(cookies: &[CookieRecord], target: &Url) -> String {
    let secure_target = target.scheme().eq_ignore_ascii_case("https");
    build_cookie_header(
        cookies
            .iter()
            .filter(|cookie| !cookie.secure || secure_target),
    )
}

/// Query the store by origin, by `.host` and by bare host, in that order.
/// Duplicates across the three lookups are kept.
pub async fn collect_request_cookies(
    store: &dyn CookieStore,
    target: &Url,
) -> Result<Vec<CookieRecord>, StoreError> {
    let Some(host) = target.host_str() else {
        return Ok(Vec::new());
    };

    let queries = [
        CookieQuery::Url(target.origin().ascii_serialization()),
        CookieQuery::Domain(format!(".{host}")),
        CookieQuery::Domain(host.to_string()),
    ];

    let mut cookies = Vec::new();
    for query in &queries {
        cookies.extend(store.query(query).await?);
    }
    Ok(cookies)
}
