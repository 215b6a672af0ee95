//! Browser user agents.

use std::fmt;

use rand::{
    distr::{Distribution, StandardUniform},
    seq::IndexedRandom,
};

const PLATFORMS: [&str; 8] = [
    "Windows NT 10.0; Win64; x64",
    "Windows NT 6.1; WOW64",
    "Macintosh; Intel Mac OS X 10_15_7",
    "Macintosh; Intel Mac OS X 13_4",
    "X11; Linux x86_64",
    "X11; Ubuntu; Linux x86_64",
    "iPhone; CPU iPhone OS 16_5 like Mac OS X",
    "Linux; Android 13; Pixel 7",
];

#[derive(Debug, Clone, Copy)]
enum Browser {
    Chrome,
    Firefox,
    Safari,
    Opera,
}

/// A browser user agent string.
#[derive(Debug, Clone)]
pub struct UserAgent {
    browser: Browser,
    platform: &'static str,
    major: u16,
    minor: u16,
    build: u16,
}

impl Distribution<UserAgent> for StandardUniform {
    fn sample<R>(&self, rng: &mut R) -> UserAgent
    where
        R: rand::Rng + ?Sized,
    {
        let browser = match rng.random_range(0..4) {
            0 => Browser::Chrome,
            1 => Browser::Firefox,
            2 => Browser::Safari,
            3 => Browser::Opera,
            _ => unreachable!(),
        };
        UserAgent {
            browser,
            platform: PLATFORMS.choose(rng).expect("platforms are not empty"),
            major: rng.random_range(40..130),
            minor: rng.random_range(0..10),
            build: rng.random_range(1000..6000),
        }
    }
}

impl fmt::Display for UserAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let UserAgent {
            browser,
            platform,
            major,
            minor,
            build,
        } = self;
        match browser {
            Browser::Chrome => write!(
                f,
                "Mozilla/5.0 ({platform}) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/{major}.0.{build}.{minor} Safari/537.36"
            ),
            Browser::Firefox => write!(
                f,
                "Mozilla/5.0 ({platform}; rv:{major}.{minor}) Gecko/20100101 Firefox/{major}.{minor}"
            ),
            Browser::Safari => write!(
                f,
                "Mozilla/5.0 ({platform}) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/{}.{minor} Safari/605.1.15",
                major % 12 + 5
            ),
            Browser::Opera => write!(
                f,
                "Mozilla/5.0 ({platform}) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/{major}.0.{build}.{minor} Safari/537.36 OPR/{}.0.{build}.{minor}",
                major.saturating_sub(14)
            ),
        }
    }
}
