//! HTTP request methods.
//!
//! A percentage roll in `0..=100` is compared against cumulative thresholds
//! in the order GET, POST, PUT, PATCH, DELETE. GET wins when the roll is at
//! most `get`, POST when it is at most `get + post`, and so on. A roll above
//! every threshold picks uniformly from all standard methods.

use std::fmt;

use rand::{
    distr::{Distribution, StandardUniform},
    seq::IndexedRandom,
};

use crate::{Error, check_percentage};

/// A standard HTTP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET
    Get,
    /// HEAD
    Head,
    /// POST
    Post,
    /// PUT
    Put,
    /// PATCH
    Patch,
    /// DELETE
    Delete,
    /// CONNECT
    Connect,
    /// OPTIONS
    Options,
    /// TRACE
    Trace,
}

impl Method {
    /// Every standard method.
    pub const ALL: [Method; 9] = [
        Method::Get,
        Method::Head,
        Method::Post,
        Method::Put,
        Method::Patch,
        Method::Delete,
        Method::Connect,
        Method::Options,
        Method::Trace,
    ];

    /// The method token as it appears on the request line.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Connect => "CONNECT",
            Method::Options => "OPTIONS",
            Method::Trace => "TRACE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Distribution<Method> for StandardUniform {
    fn sample<R>(&self, rng: &mut R) -> Method
    where
        R: rand::Rng + ?Sized,
    {
        *Method::ALL
            .choose(rng)
            .expect("method list is not empty")
    }
}

/// Percent weights of the explicitly weighted methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodWeights {
    /// Percent of requests that are GET.
    pub get: u8,
    /// Percent of requests that are POST.
    pub post: u8,
    /// Percent of requests that are PUT.
    pub put: u8,
    /// Percent of requests that are PATCH.
    pub patch: u8,
    /// Percent of requests that are DELETE.
    pub delete: u8,
}

impl Default for MethodWeights {
    fn default() -> Self {
        Self {
            get: 60,
            post: 30,
            put: 0,
            patch: 0,
            delete: 0,
        }
    }
}

impl MethodWeights {
    /// Check the weights are usable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Percentage`] if any weight exceeds 100 and
    /// [`Error::MethodWeights`] if GET and POST together claim 100 percent or
    /// more, which would leave PUT, PATCH and DELETE unreachable.
    pub fn validate(self) -> Result<Self, Error> {
        check_percentage("GET", self.get)?;
        check_percentage("POST", self.post)?;
        check_percentage("PUT", self.put)?;
        check_percentage("PATCH", self.patch)?;
        check_percentage("DELETE", self.delete)?;

        let head = u16::from(self.get) + u16::from(self.post);
        if head >= 100 {
            return Err(Error::MethodWeights(head));
        }
        Ok(self)
    }

    /// Draw a method.
    pub fn choose<R>(&self, rng: &mut R) -> Method
    where
        R: rand::Rng + ?Sized,
    {
        let roll = u16::from(crate::roll(rng));

        let mut threshold = 0_u16;
        for (weight, method) in [
            (self.get, Method::Get),
            (self.post, Method::Post),
            (self.put, Method::Put),
            (self.patch, Method::Patch),
            (self.delete, Method::Delete),
        ] {
            threshold += u16::from(weight);
            if roll <= threshold {
                return method;
            }
        }

        rng.random()
    }
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;
    use rand::{SeedableRng, rngs::SmallRng};

    use super::{Method, MethodWeights};
    use crate::Error;

    const DRAWS: usize = 50_000;

    fn weights(get: u8, post: u8, put: u8, patch: u8, delete: u8) -> MethodWeights {
        MethodWeights {
            get,
            post,
            put,
            patch,
            delete,
        }
    }

    fn frequency(weights: &MethodWeights, seed: u64, method: Method) -> f64 {
        let mut rng = SmallRng::seed_from_u64(seed);
        let hits = (0..DRAWS)
            .filter(|_| weights.choose(&mut rng) == method)
            .count();
        hits as f64 / DRAWS as f64
    }

    #[test]
    fn get_and_post_converge_to_weights() {
        for (seed, (get, post)) in [(60, 30), (10, 80), (50, 0), (0, 50), (33, 33), (90, 9)]
            .into_iter()
            .enumerate()
        {
            let weights = weights(get, post, 0, 0, 0).validate().expect("valid weights");
            let seed = seed as u64;

            // The roll spans 101 values. Rolls past every threshold fall back
            // to a uniform pick over all nine methods, which includes both.
            let fallback = f64::from(100 - get - post) / 101.0 / 9.0;
            let expected_get = f64::from(get + 1) / 101.0 + fallback;
            let expected_post = f64::from(post) / 101.0 + fallback;

            let get_freq = frequency(&weights, seed, Method::Get);
            let post_freq = frequency(&weights, seed, Method::Post);
            assert!(
                (get_freq - expected_get).abs() < 0.01,
                "GET {get}% observed {get_freq}, expected {expected_get}"
            );
            assert!(
                (post_freq - expected_post).abs() < 0.01,
                "POST {post}% observed {post_freq}, expected {expected_post}"
            );
        }
    }

    #[test]
    fn later_methods_are_reachable_cumulatively() {
        // With independent thresholds PUT would be shadowed by GET here.
        let weights = weights(40, 20, 30, 0, 0).validate().expect("valid weights");
        let put_freq = frequency(&weights, 11, Method::Put);
        assert!((put_freq - 0.30).abs() < 0.03, "PUT observed {put_freq}");
    }

    #[test]
    fn get_plus_post_at_one_hundred_is_rejected() {
        assert_eq!(
            weights(60, 40, 0, 0, 0).validate(),
            Err(Error::MethodWeights(100))
        );
        assert_eq!(
            weights(99, 1, 0, 0, 0).validate(),
            Err(Error::MethodWeights(100))
        );
        assert!(weights(99, 0, 0, 0, 0).validate().is_ok());
    }

    #[test]
    fn out_of_range_weight_is_rejected() {
        assert!(matches!(
            weights(0, 0, 101, 0, 0).validate(),
            Err(Error::Percentage { name: "PUT", value: 101 })
        ));
    }

    #[test]
    fn fallback_is_uniform_over_standard_methods() {
        let weights = weights(0, 0, 0, 0, 0);
        let mut rng = SmallRng::seed_from_u64(3);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..DRAWS {
            seen.insert(weights.choose(&mut rng));
        }
        assert_eq!(seen.len(), Method::ALL.len());
    }

    proptest! {
        #[test]
        fn choice_is_a_standard_method(seed: u64, get in 0u8..50, post in 0u8..50, rest in 0u8..=100) {
            let weights = weights(get, post, rest, rest / 2, rest / 3);
            let mut rng = SmallRng::seed_from_u64(seed);
            let method = weights.choose(&mut rng);
            prop_assert!(Method::ALL.contains(&method));
        }
    }
}
