// src/ingest/providers/news_rss.rs
//! Region news from a set of RSS 2.0 / Atom feeds.
//!
//! Feeds are independent: one feed failing does not drop the others. The
//! adapter only reports a failure when every configured feed failed.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use metrics::counter;
use quick_xml::de::from_str;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;

use crate::ingest::providers::{iso, local_now, Mode};
use crate::ingest::types::{to_raw_value, Article, NewsRaw, SourceProvider};
use crate::ingest::{contains_any, normalize_text, scrub_html_entities_for_xml, take_chars, FetchError};
use crate::signal::Signal;

pub const DEFAULT_FEEDS: &[&str] = &[
    "https://feeds.bbci.co.uk/news/world/middle_east/rss.xml",
    "https://www.aljazeera.com/xml/rss/all.xml",
];

const TOPIC_KEYWORDS: &[&str] = &["iran", "tehran", "persian gulf", "strait of hormuz"];
const ALERT_KEYWORDS: &[&str] = &[
    "strike", "attack", "military", "bomb", "missile", "war", "imminent", "troops", "forces",
];
const TITLE_MAX_CHARS: usize = 100;
const DEDUP_PREFIX_CHARS: usize = 40;

// ---- RSS 2.0 ----

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}
#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}
#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    description: Option<String>,
}

// ---- Atom ----

#[derive(Debug, Deserialize)]
struct Feed {
    #[serde(rename = "entry", default)]
    entry: Vec<Entry>,
}
#[derive(Debug, Deserialize)]
struct Entry {
    title: Option<TextNode>,
    summary: Option<TextNode>,
}
/// Atom text constructs carry a `type` attribute next to the text.
#[derive(Debug, Deserialize)]
struct TextNode {
    #[serde(rename = "$text", default)]
    value: String,
}

pub struct NewsRssProvider {
    feeds: Vec<Mode>,
}

impl NewsRssProvider {
    pub fn from_fixture_strs(bodies: &[&str]) -> Self {
        Self {
            feeds: bodies.iter().map(|s| Mode::Fixture(s.to_string())).collect(),
        }
    }

    pub fn from_urls<I, S>(urls: I, client: reqwest::Client) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            feeds: urls
                .into_iter()
                .map(|u| Mode::Http {
                    url: u.into(),
                    client: client.clone(),
                })
                .collect(),
        }
    }
}

#[async_trait]
impl SourceProvider for NewsRssProvider {
    async fn fetch_latest(&self) -> Result<Value, FetchError> {
        let mut articles = Vec::new();
        let mut last_err = None;
        let mut ok_feeds = 0usize;

        for (idx, feed) in self.feeds.iter().enumerate() {
            let parsed = match feed.body().await {
                Ok(body) => parse_feed(&body),
                Err(e) => Err(e),
            };
            match parsed {
                Ok(mut found) => {
                    ok_feeds += 1;
                    articles.append(&mut found);
                }
                Err(e) => {
                    tracing::warn!(error = %e, provider = "News", feed = idx, "feed skipped");
                    counter!("radar_news_feed_errors_total").increment(1);
                    last_err = Some(e);
                }
            }
        }

        if ok_feeds == 0 {
            if let Some(e) = last_err {
                return Err(e);
            }
        }
        to_raw_value(&summarize(articles, local_now()))
    }

    fn signal(&self) -> Signal {
        Signal::News
    }

    fn name(&self) -> &'static str {
        "News"
    }
}

/// Topic-filtered articles of one feed, in feed order. RSS `<item>`s are
/// tried first, then Atom `<entry>`s.
pub fn parse_feed(xml: &str) -> Result<Vec<Article>, FetchError> {
    let xml_clean = scrub_html_entities_for_xml(xml);

    let pairs: Vec<(String, String)> = match from_str::<Rss>(&xml_clean) {
        Ok(rss) if !rss.channel.item.is_empty() => rss
            .channel
            .item
            .into_iter()
            .map(|it| (it.title.unwrap_or_default(), it.description.unwrap_or_default()))
            .collect(),
        rss_result => match from_str::<Feed>(&xml_clean) {
            Ok(feed) => feed
                .entry
                .into_iter()
                .map(|e| {
                    (
                        e.title.map(|t| t.value).unwrap_or_default(),
                        e.summary.map(|t| t.value).unwrap_or_default(),
                    )
                })
                .collect(),
            Err(atom_err) => {
                // An RSS document without items is still a valid, empty feed.
                if rss_result.is_ok() {
                    Vec::new()
                } else {
                    return Err(FetchError::Parse(format!("feed is neither RSS nor Atom: {atom_err}")));
                }
            }
        },
    };

    Ok(pairs
        .into_iter()
        .filter_map(|(title, desc)| classify(&title, &desc))
        .collect())
}

/// `Some(article)` if the entry is on topic, flagged when it mentions a
/// severity keyword.
fn classify(title: &str, desc: &str) -> Option<Article> {
    let title = normalize_text(title);
    let combined = format!("{} {}", title, normalize_text(desc)).to_lowercase();
    if !contains_any(&combined, TOPIC_KEYWORDS) {
        return None;
    }
    Some(Article {
        title: take_chars(&title, TITLE_MAX_CHARS),
        is_alert: contains_any(&combined, ALERT_KEYWORDS),
    })
}

/// Count alerts over every matching entry, then deduplicate on the
/// case-folded title prefix (first occurrence wins). A story repeated across
/// feeds therefore weighs more than once in `alert_count`.
pub fn summarize(articles: Vec<Article>, now: NaiveDateTime) -> NewsRaw {
    let alert_count = articles.iter().filter(|a| a.is_alert).count() as u32;
    let mut seen = HashSet::new();
    let unique: Vec<Article> = articles
        .into_iter()
        .filter(|a| seen.insert(take_chars(&a.title, DEDUP_PREFIX_CHARS).to_lowercase()))
        .collect();
    NewsRaw {
        total_count: unique.len() as u32,
        alert_count,
        articles: unique,
        timestamp: iso(now),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel><title>World</title><link>https://example.org</link>
<item><title>Iran warns of missile response</title><description>Tehran&nbsp;officials spoke.</description></item>
<item><title>Football results</title><description>Nothing here.</description></item>
<item><title>Shipping in the Strait of Hormuz resumes</title><description><![CDATA[<p>Calm waters</p>]]></description></item>
</channel></rss>"#;

    const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom"><title>Feed</title>
<entry><title type="text">Troops gather near Iran border</title><summary type="html">Report</summary></entry>
<entry><title>Weather today</title><summary>Sunny</summary></entry>
</feed>"#;

    fn now() -> NaiveDateTime {
        chrono::NaiveDate::from_ymd_opt(2026, 1, 10)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    #[test]
    fn rss_items_are_topic_filtered_and_flagged() {
        let a = parse_feed(RSS).unwrap();
        assert_eq!(a.len(), 2);
        assert!(a[0].is_alert);
        assert_eq!(a[1].title, "Shipping in the Strait of Hormuz resumes");
        assert!(!a[1].is_alert);
    }

    #[test]
    fn atom_entries_are_read() {
        let a = parse_feed(ATOM).unwrap();
        assert_eq!(a.len(), 1);
        assert_eq!(a[0].title, "Troops gather near Iran border");
        assert!(a[0].is_alert);
    }

    #[test]
    fn garbage_is_parse_failure() {
        assert!(matches!(parse_feed("<rss><channel><item>"), Err(FetchError::Parse(_))));
    }

    #[test]
    fn dedup_uses_first_forty_chars_and_alerts_count_before_it() {
        let long = "Iran and regional powers meet for talks in Geneva on Monday";
        let articles = vec![
            Article { title: long.to_string(), is_alert: false },
            Article { title: long.to_uppercase(), is_alert: true },
            Article { title: "Iran strike reported".into(), is_alert: true },
        ];
        let rec = summarize(articles, now());
        assert_eq!(rec.total_count, 2);
        // the dropped duplicate still counts as an alert
        assert_eq!(rec.alert_count, 2);
        assert!(!rec.articles[0].is_alert);
        assert_eq!(rec.timestamp, "2026-01-10T08:00:00");
    }

    #[test]
    fn titles_are_truncated() {
        let title = format!("Iran {}", "x".repeat(150));
        let a = classify(&title, "").unwrap();
        assert_eq!(a.title.chars().count(), TITLE_MAX_CHARS);
    }

    #[tokio::test]
    async fn one_bad_feed_does_not_abort_the_rest() {
        let p = NewsRssProvider::from_fixture_strs(&["<<<", RSS]);
        let v = p.fetch_latest().await.unwrap();
        let rec: NewsRaw = serde_json::from_value(v).unwrap();
        assert_eq!(rec.total_count, 2);
        assert_eq!(rec.alert_count, 1);
    }

    #[tokio::test]
    async fn all_feeds_failing_is_a_failure() {
        let p = NewsRssProvider::from_fixture_strs(&["<<<", "<rss><channel>"]);
        assert!(p.fetch_latest().await.is_err());
    }
}
