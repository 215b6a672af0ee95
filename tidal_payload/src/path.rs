//! Request paths.
//!
//! A path is a leading slash followed by between `min` and `max` buzzword
//! segments joined by random separators, and closed with a file-extension
//! suffix. Spaces are percent-encoded.

use rand::seq::IndexedRandom;

/// Segment separators. Duplicates bias the draw towards `-` and `/`.
pub const SEPARATORS: [&str; 7] = ["-", "-", "_", "%20", "/", "/", "/"];

/// Suffixes closing every path.
pub const EXTENSIONS: [&str; 9] = [
    ".html", ".php", ".htm", ".jpg", ".png", ".gif", ".svg", ".css", ".js",
];

/// Segment vocabulary. Some entries carry spaces, which leave the generator
/// as `%20`.
pub const BUZZWORDS: [&str; 64] = [
    "adaptive",
    "analyzing",
    "asynchronous",
    "attitude",
    "bandwidth",
    "benchmark",
    "capability",
    "circuit",
    "clear thinking",
    "collaboration",
    "complexity",
    "conglomeration",
    "contingency",
    "core",
    "customer loyalty",
    "database",
    "dedicated",
    "definition",
    "emulation",
    "encoding",
    "encryption",
    "extranet",
    "firmware",
    "flexibility",
    "focus group",
    "forecast",
    "frame",
    "framework",
    "function",
    "functionalities",
    "hierarchy",
    "hub",
    "implementation",
    "infrastructure",
    "initiative",
    "installation",
    "interface",
    "intranet",
    "knowledge user",
    "leverage",
    "matrices",
    "matrix",
    "methodology",
    "middleware",
    "migration",
    "model",
    "moderator",
    "monitoring",
    "moratorium",
    "neural net",
    "open architecture",
    "orchestration",
    "paradigm",
    "parallelism",
    "policy",
    "portal",
    "productivity",
    "project",
    "projection",
    "protocol",
    "service desk",
    "software",
    "solution",
    "standardization",
];

/// Inclusive bounds on the number of segments in a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathLength {
    /// Fewest segments.
    pub min: u32,
    /// Most segments.
    pub max: u32,
}

impl Default for PathLength {
    fn default() -> Self {
        Self { min: 1, max: 5 }
    }
}

impl PathLength {
    /// Raise either bound below one to one and swap them if inverted.
    #[must_use]
    pub fn normalized(self) -> Self {
        let (min, max) = crate::normalize(self.min, self.max);
        Self { min, max }
    }
}

/// Draw a request path with a segment count inside `length`.
///
/// `length` is normalized before use.
pub fn path<R>(rng: &mut R, length: PathLength) -> String
where
    R: rand::Rng + ?Sized,
{
    let PathLength { min, max } = length.normalized();
    let segments = rng.random_range(min..=max);

    let mut path = String::from("/");
    for idx in 0..segments {
        if idx > 0 {
            path.push_str(SEPARATORS.choose(rng).expect("separators are not empty"));
        }
        path.push_str(BUZZWORDS.choose(rng).expect("buzzwords are not empty"));
    }
    path.push_str(EXTENSIONS.choose(rng).expect("extensions are not empty"));

    path.replace(' ', "%20")
}
