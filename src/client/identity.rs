use std::net::Ipv4Addr;

use rand::seq::IndexedRandom;
use rand::Rng;

const USER_AGENT_TEMPLATES: &[&str] = &[
    "Mozilla/5.0 (Windows NT 11.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/{v} Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_{m}_0) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/{v} Safari/537.36",
    "Mozilla/5.0 (Windows NT 11.0; Win64; x64; rv:{r}) Gecko/20100101 Firefox/{r}",
];

/// Client-identifying request metadata, drawn fresh for every attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestIdentity {
    pub user_agent: String,
    pub forwarded_ip: Ipv4Addr,
}

impl RequestIdentity {
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            user_agent: random_user_agent(rng),
            forwarded_ip: Ipv4Addr::new(
                rng.random_range(1..=255),
                rng.random_range(1..=255),
                rng.random_range(1..=255),
                rng.random_range(1..=255),
            ),
        }
    }

    /// Headers for a page request. `origin` is the scheme and host of the
    /// event page, e.g. `https://in.bookmyshow.com`.
    pub fn headers(&self, origin: &str) -> Vec<(&'static str, String)> {
        let ip = self.forwarded_ip.to_string();
        vec![
            ("User-Agent", self.user_agent.clone()),
            ("Accept", "application/json, text/plain, */*".to_string()),
            ("Accept-Language", "en-IN,en;q=0.9".to_string()),
            ("Origin", origin.to_string()),
            ("Referer", format!("{}/", origin)),
            ("X-Forwarded-For", ip.clone()),
            ("Client-IP", ip),
        ]
    }
}

fn random_user_agent<R: Rng + ?Sized>(rng: &mut R) -> String {
    let template = USER_AGENT_TEMPLATES
        .choose(&mut *rng)
        .copied()
        .unwrap_or(USER_AGENT_TEMPLATES[0]);
    let chrome = format!(
        "{}.0.{}.{}",
        rng.random_range(90..=120),
        rng.random_range(1000..=5000),
        rng.random_range(0..=150)
    );

    template
        .replace("{v}", &chrome)
        .replace("{m}", &rng.random_range(12..=15).to_string())
        .replace("{r}", &rng.random_range(90..=120).to_string())
}
