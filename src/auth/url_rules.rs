//! Usage: URL classification rules driving the login flow's state transitions.

pub const TIKTOK_LOGIN_URL: &str = "https://www.tiktok.com/login";
pub const TOKEN_EXCHANGE_URL: &str = "https://streamlabs.com/api/v5/slobs/auth/data";

const STREAMLABS_AUTHORIZE_URL: &str = "https://streamlabs.com/m/login";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlClass {
    /// TikTok login/registration surface, including third-party auth hops.
    ProviderLogin,
    /// A TikTok page only reachable with an authenticated session.
    ProviderLoggedIn,
    /// Streamlabs consent surface, no captured code yet.
    ConsentPending,
    /// Consent granted: a `code` query parameter together with a success marker.
    ConsentGranted { code: String },
    Other,
}

pub fn build_authorize_url(code_challenge: &str) -> String {
    format!(
        "{STREAMLABS_AUTHORIZE_URL}?force_verify=1&external=mobile&skip_splash=1&tiktok&code_challenge={code_challenge}"
    )
}

pub fn extract_auth_code(url: &str) -> Option<String> {
    let parsed: reqwest::Url = url.parse().ok()?;
    parsed
        .query_pairs()
        .find(|(key, _)| key == "code")
        .map(|(_, value)| value.into_owned())
        .filter(|code| !code.is_empty())
}

fn has_success_marker(url: &str) -> bool {
    url.contains("success=true")
        || url.contains("streamlabs.com/tiktok/auth")
        || url.contains("streamlabs.com/dashboard")
}

pub fn classify(url: &str) -> UrlClass {
    if url.contains("streamlabs.com") {
        if let Some(code) = extract_auth_code(url) {
            if has_success_marker(url) {
                return UrlClass::ConsentGranted { code };
            }
            // Code without a success marker: an intermediate hop, keep waiting.
            return UrlClass::ConsentPending;
        }
        if url.contains("/m/login") || url.contains("/tiktok/auth") {
            return UrlClass::ConsentPending;
        }
        return UrlClass::Other;
    }

    if url.contains("tiktok.com") {
        if url.contains("/login") || url.contains("/register") || url.contains("third-party") {
            return UrlClass::ProviderLogin;
        }
        // Internal media endpoints fire during login; they prove nothing.
        if url.contains("webcast") {
            return UrlClass::Other;
        }
        return UrlClass::ProviderLoggedIn;
    }

    UrlClass::Other
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_page_is_provider_login() {
        assert_eq!(
            classify("https://www.tiktok.com/login?lang=en"),
            UrlClass::ProviderLogin
        );
        assert_eq!(
            classify("https://www.tiktok.com/login/phone-or-email"),
            UrlClass::ProviderLogin
        );
    }

    #[test]
    fn home_feed_is_logged_in() {
        assert_eq!(
            classify("https://www.tiktok.com/foryou"),
            UrlClass::ProviderLoggedIn
        );
        assert_eq!(
            classify("https://www.tiktok.com/"),
            UrlClass::ProviderLoggedIn
        );
        assert_eq!(
            classify("https://www.tiktok.com/discover"),
            UrlClass::ProviderLoggedIn
        );
    }

    #[test]
    fn webcast_endpoints_are_not_login_evidence() {
        assert_eq!(
            classify("https://webcast.tiktok.com/webcast/fetch/"),
            UrlClass::Other
        );
    }

    #[test]
    fn code_with_success_marker_is_granted() {
        let url = "https://streamlabs.com/tiktok/auth?success=true&code=abc123";
        assert_eq!(
            classify(url),
            UrlClass::ConsentGranted {
                code: "abc123".to_string()
            }
        );
    }

    #[test]
    fn code_without_marker_stays_pending() {
        let url = "https://streamlabs.com/m/login?code=abc123";
        assert_eq!(classify(url), UrlClass::ConsentPending);
    }

    #[test]
    fn empty_code_is_not_captured() {
        let url = "https://streamlabs.com/tiktok/auth?success=true&code=";
        assert_eq!(classify(url), UrlClass::ConsentPending);
    }

    #[test]
    fn consent_page_without_code_is_pending() {
        assert_eq!(
            classify("https://streamlabs.com/m/login?skip_splash=1"),
            UrlClass::ConsentPending
        );
    }

    #[test]
    fn unrelated_urls_are_other() {
        assert_eq!(classify("https://example.com/"), UrlClass::Other);
        assert_eq!(classify("about:blank"), UrlClass::Other);
    }

    #[test]
    fn authorize_url_carries_all_parameters() {
        let url = build_authorize_url("CHALLENGE43");
        assert!(url.starts_with("https://streamlabs.com/m/login?"));
        assert!(url.contains("force_verify=1"));
        assert!(url.contains("external=mobile"));
        assert!(url.contains("skip_splash=1"));
        assert!(url.contains("tiktok"));
        assert!(url.ends_with("code_challenge=CHALLENGE43"));
    }

    #[test]
    fn extract_auth_code_reads_the_query() {
        assert_eq!(
            extract_auth_code("https://streamlabs.com/x?a=1&code=zzz&b=2"),
            Some("zzz".to_string())
        );
        assert_eq!(extract_auth_code("https://streamlabs.com/x?a=1"), None);
    }
}
