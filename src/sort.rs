use std::{cmp::Ordering, fmt::Display, str::FromStr};

use crate::{catalog::Kata, error::KataError, ledger::last_completion};

/// Column the kata table is ordered by. Ties are always broken by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Name,
    Description,
    Lines,
    Done,
    /// Most recently done first, never done last.
    LastDone,
}

impl FromStr for SortKey {
    type Err = KataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "name" => Ok(SortKey::Name),
            "desc" | "description" => Ok(SortKey::Description),
            "lines" => Ok(SortKey::Lines),
            "done" => Ok(SortKey::Done),
            "last" | "last done" => Ok(SortKey::LastDone),
            _ => Err(KataError::UnknownSortKey(s.to_string())),
        }
    }
}

impl Display for SortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortKey::Name => write!(f, "name"),
            SortKey::Description => write!(f, "description"),
            SortKey::Lines => write!(f, "lines"),
            SortKey::Done => write!(f, "done"),
            SortKey::LastDone => write!(f, "last"),
        }
    }
}

impl SortKey {
    pub fn compare(self, a: &Kata, b: &Kata) -> Ordering {
        let primary = match self {
            SortKey::Name => Ordering::Equal,
            SortKey::Description => a.description.cmp(&b.description),
            SortKey::Lines => a.lines.cmp(&b.lines),
            SortKey::Done => a.completions.len().cmp(&b.completions.len()),
            // None < Some, so reversing puts katas that were never done at the end.
            SortKey::LastDone => {
                last_completion(&b.completions).cmp(&last_completion(&a.completions))
            }
        };
        primary.then_with(|| a.name.cmp(&b.name))
    }
}

pub fn sort_katas(katas: &mut [Kata], key: SortKey) {
    katas.sort_by(|a, b| key.compare(a, b));
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};

    use crate::{catalog::Kata, error::KataError};

    use super::{sort_katas, SortKey};

    const ALL_KEYS: [SortKey; 5] = [
        SortKey::Name,
        SortKey::Description,
        SortKey::Lines,
        SortKey::Done,
        SortKey::LastDone,
    ];

    fn day(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, day, 8, 30, 0).unwrap()
    }

    fn katas() -> Vec<Kata> {
        vec![
            Kata::new("lookup", "")
                .with_description("Look up addresses")
                .with_lines(40)
                .with_completions(vec![day(3), day(1)]),
            Kata::new("clock", "")
                .with_description("Clock server")
                .with_lines(40),
            Kata::new("bcounter", "")
                .with_description("Count bytes")
                .with_lines(25)
                .with_completions(vec![day(2)]),
            Kata::new("findgo", "")
                .with_description("Count bytes")
                .with_lines(60)
                .with_completions(vec![day(1), day(3)]),
            Kata::new("areader", "")
                .with_description("Reader")
                .with_lines(12),
        ]
    }

    fn names(katas: &[Kata]) -> Vec<&str> {
        katas.iter().map(|k| k.name.as_str()).collect()
    }

    fn sorted(key: SortKey) -> Vec<Kata> {
        let mut katas = katas();
        sort_katas(&mut katas, key);
        katas
    }

    #[test]
    fn test_parse_keys_case_insensitively() {
        assert_eq!("NAME".parse::<SortKey>().unwrap(), SortKey::Name);
        assert_eq!("Desc".parse::<SortKey>().unwrap(), SortKey::Description);
        assert_eq!("description".parse::<SortKey>().unwrap(), SortKey::Description);
        assert_eq!("lines".parse::<SortKey>().unwrap(), SortKey::Lines);
        assert_eq!("Done".parse::<SortKey>().unwrap(), SortKey::Done);
        assert_eq!("last".parse::<SortKey>().unwrap(), SortKey::LastDone);
        assert_eq!("Last Done".parse::<SortKey>().unwrap(), SortKey::LastDone);
    }

    #[test]
    fn test_unknown_key_is_named() {
        let error = "stars".parse::<SortKey>().unwrap_err();
        assert!(matches!(&error, KataError::UnknownSortKey(key) if key == "stars"));
        assert!(error.to_string().contains("stars"));
    }

    #[test]
    fn test_sort_by_each_key() {
        assert_eq!(
            names(&sorted(SortKey::Name)),
            vec!["areader", "bcounter", "clock", "findgo", "lookup"]
        );
        assert_eq!(
            names(&sorted(SortKey::Description)),
            vec!["clock", "bcounter", "findgo", "lookup", "areader"]
        );
        assert_eq!(
            names(&sorted(SortKey::Lines)),
            vec!["areader", "bcounter", "clock", "lookup", "findgo"]
        );
        assert_eq!(
            names(&sorted(SortKey::Done)),
            vec!["areader", "clock", "bcounter", "findgo", "lookup"]
        );
    }

    #[test]
    fn test_sort_by_last_puts_never_done_last() {
        // findgo and lookup share their latest completion even though it's stored at a
        // different position.
        assert_eq!(
            names(&sorted(SortKey::LastDone)),
            vec!["findgo", "lookup", "bcounter", "areader", "clock"]
        );
    }

    #[test]
    fn test_sort_is_independent_of_input_order() {
        for key in ALL_KEYS {
            let expected = sorted(key);

            let mut reversed = katas();
            reversed.reverse();
            sort_katas(&mut reversed, key);
            assert_eq!(reversed, expected, "sorting by {key}");

            let mut again = expected.clone();
            sort_katas(&mut again, key);
            assert_eq!(again, expected, "sorting by {key} twice");
        }
    }
}
