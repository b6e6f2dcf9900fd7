// Link risk evaluation - core logic for the domain blacklist.
//
// Extracts URL-like substrings from message text (bare domains count, the
// way Telegram itself linkifies them), expands known link shorteners by one
// redirect hop, and checks the resulting host against the configured
// blacklist. Whitelisted links short-circuit before any resolution happens.
//
// NO transport dependencies here - the single network hop goes through the
// RedirectResolver port.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("Redirect resolution failed: {0}")]
    Resolution(String),
}

/// Port for expanding a shortened link. Exactly one hop is attempted; the
/// caller degrades to the original host on any failure.
#[async_trait]
pub trait RedirectResolver: Send + Sync {
    async fn resolve_redirect(&self, url: &Url, timeout: Duration) -> Result<Url, LinkError>;
}

/// Verdict for one extracted link. Derived per message, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkVerdict {
    pub url: String,
    pub resolved_host: String,
    pub blacklisted: bool,
    pub whitelisted: bool,
}

impl LinkVerdict {
    /// Whitelist takes precedence over blacklist.
    pub fn is_flagged(&self) -> bool {
        self.blacklisted && !self.whitelisted
    }
}

/// Hosts known to be link shorteners; only these get a resolution hop.
const SHORTENER_HOSTS: &[&str] = &[
    "bit.ly",
    "bitly.com",
    "t.co",
    "goo.gl",
    "tinyurl.com",
    "is.gd",
    "ow.ly",
    "buff.ly",
    "rb.gy",
    "cutt.ly",
    "rebrand.ly",
];

/// Hosts Telegram uses for t.me-style channel/user links.
const TELEGRAM_HOSTS: &[&str] = &["t.me", "telegram.me", "telegram.dog"];

const RESOLVE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
enum WhitelistEntry {
    Host(String),
    Username(String),
}

pub struct LinkRiskService<R: RedirectResolver> {
    resolver: R,
    blacklist: Vec<String>,
    whitelist: Vec<WhitelistEntry>,
}

impl<R: RedirectResolver> LinkRiskService<R> {
    pub fn new(resolver: R, blacklisted_domains: &[String], exclude_links: &[String]) -> Self {
        Self {
            resolver,
            blacklist: blacklisted_domains
                .iter()
                .map(|d| normalize_host(d))
                .collect(),
            whitelist: exclude_links.iter().map(|e| parse_whitelist_entry(e)).collect(),
        }
    }

    /// Evaluate every link-like substring of `text`, preserving input order.
    /// A message with no links yields an empty vec.
    pub async fn evaluate(&self, text: &str) -> Vec<LinkVerdict> {
        let mut verdicts = Vec::new();
        for url in extract_link_candidates(text) {
            verdicts.push(self.judge(url).await);
        }
        verdicts
    }

    async fn judge(&self, url: Url) -> LinkVerdict {
        let host = normalize_host(url.host_str().unwrap_or_default());

        if self.is_whitelisted(&url, &host) {
            return LinkVerdict {
                url: url.to_string(),
                resolved_host: host,
                blacklisted: false,
                whitelisted: true,
            };
        }

        let resolved_host = if SHORTENER_HOSTS.contains(&host.as_str()) {
            match self.resolver.resolve_redirect(&url, RESOLVE_TIMEOUT).await {
                Ok(resolved) => normalize_host(resolved.host_str().unwrap_or(&host)),
                Err(err) => {
                    // Degrade to checking the shortener host itself.
                    tracing::debug!("Could not expand {}: {}", url, err);
                    host.clone()
                }
            }
        } else {
            host.clone()
        };

        let blacklisted = self
            .blacklist
            .iter()
            .any(|domain| host_matches_domain(&resolved_host, domain));

        LinkVerdict {
            url: url.to_string(),
            resolved_host,
            blacklisted,
            whitelisted: false,
        }
    }

    fn is_whitelisted(&self, url: &Url, host: &str) -> bool {
        self.whitelist.iter().any(|entry| match entry {
            WhitelistEntry::Host(allowed) => host == allowed,
            WhitelistEntry::Username(name) => {
                TELEGRAM_HOSTS.contains(&host) && telegram_username(url).as_deref() == Some(name)
            }
        })
    }
}

/// Suffix match: `evil.com` matches `evil.com` and `sub.evil.com`, not
/// `notevil.com`.
fn host_matches_domain(host: &str, domain: &str) -> bool {
    host == domain || host.ends_with(&format!(".{domain}"))
}

/// Lowercase and drop a leading `www.`.
fn normalize_host(host: &str) -> String {
    let host = host.trim().to_lowercase();
    host.strip_prefix("www.").map(str::to_string).unwrap_or(host)
}

fn telegram_username(url: &Url) -> Option<String> {
    let first = url.path_segments()?.next()?;
    if first.is_empty() {
        return None;
    }
    Some(first.to_lowercase())
}

fn parse_whitelist_entry(entry: &str) -> WhitelistEntry {
    let trimmed = entry.trim();

    if let Some(name) = trimmed.strip_prefix('@') {
        return WhitelistEntry::Username(name.to_lowercase());
    }

    // Entries may carry a scheme or path; reduce t.me links to a username
    // and everything else to its host.
    if let Some(url) = parse_candidate(trimmed) {
        let host = normalize_host(url.host_str().unwrap_or_default());
        if TELEGRAM_HOSTS.contains(&host.as_str()) {
            if let Some(name) = telegram_username(&url) {
                return WhitelistEntry::Username(name);
            }
        }
        return WhitelistEntry::Host(host);
    }

    WhitelistEntry::Host(normalize_host(trimmed))
}

/// Extract URL-like substrings, preserving their order of appearance.
pub fn extract_link_candidates(text: &str) -> Vec<Url> {
    text.split(|c: char| {
        c.is_whitespace() || matches!(c, ',' | '(' | ')' | '<' | '>' | '"' | '\'')
    })
    .filter_map(|token| {
        let token = token.trim_end_matches(['.', ',', '!', '?', ';', ':']);
        parse_candidate(token)
    })
    .collect()
}

/// Try to parse a token the way Telegram does, allowing an implicit
/// `http://` prefix for bare domains.
fn parse_candidate(token: &str) -> Option<Url> {
    if token.is_empty() {
        return None;
    }
    // Emails are not links.
    if token.contains('@') && !token.contains("://") {
        return None;
    }

    let url = match Url::parse(token) {
        Ok(url) => url,
        Err(_) => Url::parse(&format!("http://{token}")).ok()?,
    };

    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }

    // Require a dotted host with an alphabetic TLD so prose like "e.g" or
    // "3.14" doesn't count as a link.
    let host = url.host_str()?;
    if !host.contains('.') {
        return None;
    }
    let tld = host.rsplit('.').next()?;
    if tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic()) {
        Some(url)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Resolver that returns a fixed answer and remembers being called.
    struct MockResolver {
        answer: Result<&'static str, &'static str>,
        called: AtomicBool,
    }

    impl MockResolver {
        fn resolving_to(target: &'static str) -> Self {
            Self {
                answer: Ok(target),
                called: AtomicBool::new(false),
            }
        }

        fn failing() -> Self {
            Self {
                answer: Err("timed out"),
                called: AtomicBool::new(false),
            }
        }

        fn was_called(&self) -> bool {
            self.called.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RedirectResolver for MockResolver {
        async fn resolve_redirect(
            &self,
            _url: &Url,
            _timeout: Duration,
        ) -> Result<Url, LinkError> {
            self.called.store(true, Ordering::SeqCst);
            match self.answer {
                Ok(target) => Ok(Url::parse(target).unwrap()),
                Err(reason) => Err(LinkError::Resolution(reason.to_string())),
            }
        }
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn blacklisted_domain_is_flagged_by_suffix() {
        let service = LinkRiskService::new(
            MockResolver::failing(),
            &strings(&["spam.co"]),
            &[],
        );

        let verdicts = service.evaluate("look at http://sub.spam.co/offer").await;
        assert_eq!(verdicts.len(), 1);
        assert!(verdicts[0].blacklisted);
        assert!(verdicts[0].is_flagged());
        assert_eq!(verdicts[0].resolved_host, "sub.spam.co");

        // The resolver is only consulted for known shorteners.
        assert!(!service.resolver.was_called());
    }

    #[tokio::test]
    async fn suffix_match_does_not_catch_lookalikes() {
        let service = LinkRiskService::new(
            MockResolver::failing(),
            &strings(&["evil.com"]),
            &[],
        );

        let verdicts = service.evaluate("https://notevil.com").await;
        assert_eq!(verdicts.len(), 1);
        assert!(!verdicts[0].blacklisted);
    }

    #[tokio::test]
    async fn shortener_is_expanded_before_the_blacklist_check() {
        let service = LinkRiskService::new(
            MockResolver::resolving_to("http://sub.spam.co/landing"),
            &strings(&["spam.co"]),
            &[],
        );

        let verdicts = service.evaluate("http://bit.ly/x").await;
        assert_eq!(verdicts.len(), 1);
        assert!(verdicts[0].is_flagged());
        assert_eq!(verdicts[0].resolved_host, "sub.spam.co");
        assert!(service.resolver.was_called());
    }

    #[tokio::test]
    async fn resolution_failure_falls_back_to_the_original_host() {
        let service = LinkRiskService::new(
            MockResolver::failing(),
            &strings(&["spam.co"]),
            &[],
        );

        let verdicts = service.evaluate("http://bit.ly/x").await;
        assert_eq!(verdicts.len(), 1);
        assert_eq!(verdicts[0].resolved_host, "bit.ly");
        assert!(!verdicts[0].is_flagged());
    }

    #[tokio::test]
    async fn whitelist_wins_over_blacklist() {
        let service = LinkRiskService::new(
            MockResolver::failing(),
            &strings(&["good.org"]),
            &strings(&["good.org"]),
        );

        let verdicts = service.evaluate("see good.org/page").await;
        assert_eq!(verdicts.len(), 1);
        assert!(verdicts[0].whitelisted);
        assert!(!verdicts[0].blacklisted);
        assert!(!verdicts[0].is_flagged());
    }

    #[tokio::test]
    async fn whitelisted_shortener_is_never_resolved() {
        let service = LinkRiskService::new(
            MockResolver::resolving_to("http://spam.co"),
            &strings(&["spam.co"]),
            &strings(&["bit.ly"]),
        );

        let verdicts = service.evaluate("http://bit.ly/fine").await;
        assert!(verdicts[0].whitelisted);
        assert!(!service.resolver.was_called());
    }

    #[tokio::test]
    async fn username_entries_match_telegram_links() {
        let service = LinkRiskService::new(
            MockResolver::failing(),
            &strings(&["t.me"]),
            &strings(&["@ourchannel"]),
        );

        let verdicts = service
            .evaluate("join https://t.me/OurChannel and https://t.me/spammy")
            .await;
        assert_eq!(verdicts.len(), 2);
        assert!(verdicts[0].whitelisted);
        assert!(!verdicts[1].whitelisted);
        assert!(verdicts[1].is_flagged());
    }

    #[tokio::test]
    async fn no_links_means_no_verdicts() {
        let service = LinkRiskService::new(MockResolver::failing(), &[], &[]);
        assert!(service.evaluate("just a normal message").await.is_empty());
    }

    #[tokio::test]
    async fn verdicts_preserve_input_order() {
        let service = LinkRiskService::new(
            MockResolver::failing(),
            &strings(&["b.com"]),
            &[],
        );

        let verdicts = service.evaluate("a.com then b.com then c.com").await;
        let hosts: Vec<&str> = verdicts.iter().map(|v| v.resolved_host.as_str()).collect();
        assert_eq!(hosts, vec!["a.com", "b.com", "c.com"]);
        assert!(verdicts[1].is_flagged());
    }

    #[test]
    fn extraction_handles_bare_domains_and_punctuation() {
        let found = extract_link_candidates(
            "try www.example.com, or (https://other.net/path)! e.g. not 3.14 or me@mail.com",
        );
        let hosts: Vec<&str> = found.iter().filter_map(|u| u.host_str()).collect();
        assert_eq!(hosts, vec!["www.example.com", "other.net"]);
    }

    #[test]
    fn extraction_ignores_non_http_schemes() {
        assert!(extract_link_candidates("ftp://files.example.com").is_empty());
        assert!(extract_link_candidates("tel:5551234").is_empty());
    }
}
