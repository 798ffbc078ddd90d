//! One module per crawl stage. Each stage owns its selector tables, page
//! actions and readiness probe as data; page markup changes land here and
//! nowhere else.

pub mod leaderboard;
pub mod top_traders;
pub mod wallet_screener;

/// Scheme and host of a URL, for absolutizing scraped hrefs
pub(crate) fn site_origin(url: &str) -> Option<&str> {
    let scheme_end = url.find("://")? + 3;
    match url[scheme_end..].find('/') {
        Some(i) => Some(&url[..scheme_end + i]),
        None => Some(url),
    }
}

#[cfg(test)]
mod tests {
    use super::site_origin;

    #[test]
    fn origin_strips_the_path() {
        assert_eq!(
            site_origin("https://dexscreener.com/gainers/solana"),
            Some("https://dexscreener.com")
        );
        assert_eq!(
            site_origin("https://dexscreener.com"),
            Some("https://dexscreener.com")
        );
        assert_eq!(site_origin("not a url"), None);
    }
}
