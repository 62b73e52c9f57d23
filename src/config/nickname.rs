//! Random default nickname.
//!
//! Produces `stemNNN` (e.g. `codec42`), short enough for the 9-character
//! nickname limit many networks still enforce.

use rand::RngExt;

const STEMS: &[&str] = &[
    "wire", "frame", "crlf", "line", "byte", "codec", "relay", "parse", "token", "pipe",
];

pub fn generate_nickname() -> String {
    let mut rng = rand::rng();
    let stem = STEMS[rng.random_range(0..STEMS.len())];
    let num: u16 = rng.random_range(0..1000);
    format!("{}{}", stem, num)
}
