//! Randomized Android Chrome user agents.

use rand::Rng;
use rand::seq::SliceRandom;

const ANDROID_DEVICES: [(&str, &str); 10] = [
    ("13", "SM-S918B"),
    ("13", "SM-A536B"),
    ("14", "SM-S921B"),
    ("12", "Pixel 6"),
    ("13", "Pixel 7"),
    ("14", "Pixel 8 Pro"),
    ("12", "M2101K6G"),
    ("13", "2201117TG"),
    ("13", "CPH2451"),
    ("11", "moto g(30)"),
];

const CHROME_MAJOR_VERSIONS: std::ops::RangeInclusive<u32> = 110..=128;

/// Builds a Chrome-on-Android user agent with a random device and build.
pub fn random_android_chrome<R: Rng + ?Sized>(rng: &mut R) -> String {
    let (android, model) = ANDROID_DEVICES
        .choose(rng)
        .copied()
        .unwrap_or(ANDROID_DEVICES[0]);
    let major = rng.gen_range(CHROME_MAJOR_VERSIONS);
    let build = rng.gen_range(5000..=6600);
    let patch = rng.gen_range(50..=200);

    format!(
        "Mozilla/5.0 (Linux; Android {android}; {model}) AppleWebKit/537.36 \
         (KHTML, like Gecko) Chrome/{major}.0.{build}.{patch} Mobile Safari/537.36"
    )
}
