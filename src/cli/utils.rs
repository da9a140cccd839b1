//! Utility functions for CLI operations.

use crate::forum::ForumStorage;
use crate::Result;
use chrono::{TimeZone, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use std::fs;
use std::path::Path;

/// Opens the forum storage under `data_dir`, creating the directory if needed.
pub fn open_storage(data_dir: &Path) -> Result<ForumStorage> {
    if !data_dir.exists() {
        fs::create_dir_all(data_dir)?;
    }
    ForumStorage::new(data_dir)
}

/// Produces `count` fresh names of the form `{base}{n}`.
///
/// `n` starts at `start` and grows until `taken` reports a free name. Bases
/// are drawn at random from `bases`.
pub fn unique_names<R, F>(
    rng: &mut R,
    bases: &[&str],
    separator: &str,
    start: usize,
    count: usize,
    mut taken: F,
) -> Result<Vec<String>>
where
    R: Rng,
    F: FnMut(&str) -> Result<bool>,
{
    let mut names = Vec::with_capacity(count);
    let mut n = start;
    while names.len() < count {
        let Some(base) = bases.choose(rng) else {
            break;
        };
        let candidate = format!("{}{}{}", base, separator, n);
        if !taken(&candidate)? && !names.contains(&candidate) {
            names.push(candidate);
        }
        n += 1;
    }
    Ok(names)
}

/// Picks between `min` and `max` distinct items, fewer if there are not enough.
pub fn random_subset<'a, T, R>(rng: &mut R, items: &'a [T], min: usize, max: usize) -> Vec<&'a T>
where
    R: Rng,
{
    let max = max.min(items.len());
    let min = min.min(max);
    let amount = rng.gen_range(min..=max);
    items.choose_multiple(rng, amount).collect()
}

/// Leading non-digit part of `name`, capitalized: `"nina12"` gives `"Nina"`.
pub fn first_name_of(name: &str) -> String {
    let letters: String = name.chars().take_while(|c| !c.is_ascii_digit()).collect();
    let mut chars = letters.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Formats a millisecond Unix timestamp for display.
pub fn format_timestamp(millis: u64) -> String {
    match Utc.timestamp_millis_opt(millis as i64).single() {
        Some(datetime) => datetime.format("%Y-%m-%d %H:%M UTC").to_string(),
        None => millis.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_unique_names_skip_taken() {
        let mut rng = StdRng::seed_from_u64(7);
        let names = unique_names(&mut rng, &["nina"], "", 0, 3, |name| {
            Ok(name == "nina1")
        })
        .unwrap();
        assert_eq!(names, vec!["nina0", "nina2", "nina3"]);
    }

    #[test]
    fn test_random_subset_bounds() {
        let mut rng = StdRng::seed_from_u64(1);
        let items = [1, 2, 3];
        for _ in 0..50 {
            let picked = random_subset(&mut rng, &items, 1, 10);
            assert!(!picked.is_empty() && picked.len() <= 3);
        }
        assert!(random_subset(&mut rng, &[] as &[u8], 1, 3).is_empty());
    }

    #[test]
    fn test_first_name_of() {
        assert_eq!(first_name_of("nina12"), "Nina");
        assert_eq!(first_name_of("eleniovey0"), "Eleniovey");
        assert_eq!(first_name_of("42"), "");
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0), "1970-01-01 00:00 UTC");
    }
}
