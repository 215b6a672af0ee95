//! Response status codes and body sizes.

use rand::seq::IndexedRandom;

/// The status returned for a successful request.
pub const OK: u16 = 200;

/// Statuses drawn when a request is not a plain success. Never contains
/// [`OK`].
pub const NON_OK_CODES: [u16; 21] = [
    201, 202, 204, 301, 302, 304, 400, 401, 403, 404, 405, 408, 409, 410, 413, 429, 500, 501, 502,
    503, 504,
];

/// Body size range, in bytes, for successful responses.
pub const OK_BYTES: std::ops::RangeInclusive<u32> = 800..=3100;

/// Body size range, in bytes, for every other response.
pub const NON_OK_BYTES: std::ops::RangeInclusive<u32> = 30..=120;

/// Draw a status code, [`OK`] with roughly `ok_percent` percent probability
/// and otherwise one of [`NON_OK_CODES`].
pub fn status_code<R>(rng: &mut R, ok_percent: u8) -> u16
where
    R: rand::Rng + ?Sized,
{
    if crate::roll(rng) <= ok_percent {
        OK
    } else {
        *NON_OK_CODES
            .choose(rng)
            .expect("status pool is not empty")
    }
}

/// Draw a response body size. Successful responses skew large, the rest
/// small.
pub fn bytes_sent<R>(rng: &mut R, status_code: u16) -> u32
where
    R: rand::Rng + ?Sized,
{
    if status_code == OK {
        rng.random_range(OK_BYTES)
    } else {
        rng.random_range(NON_OK_BYTES)
    }
}
