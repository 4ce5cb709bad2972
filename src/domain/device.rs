use once_cell::sync::Lazy;
use regex::Regex;

static MOBILE_USER_AGENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)Android|webOS|iPhone|iPad|iPod|BlackBerry|IEMobile|Opera Mini")
        .expect("mobile user-agent pattern is valid")
});

/// Whether the client runs on a phone or tablet. No user agent means the
/// request did not come from a browser, which is never treated as mobile.
pub fn is_mobile(user_agent: Option<&str>) -> bool {
    user_agent.is_some_and(|ua| MOBILE_USER_AGENT.is_match(ua))
}
