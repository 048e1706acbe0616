// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Version extraction used to order change-log files within a directory.

/// A dotted numeric version segment pulled out of a file name, e.g.
/// `orders-1.2.3-final.yaml` -> `[1, 2, 3]`. Files with no recognisable
/// version sort before any version (`[]` is the smallest possible key).
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Version(pub Vec<u32>);

/// Extracts the first run of `N.N[.N[.N]]` digits found in `name`.
pub fn extract_version(name: &str) -> Version {
    let bytes = name.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i].is_ascii_digit() {
            let start = i;
            let mut parts = Vec::new();
            let mut j = i;
            loop {
                let seg_start = j;
                while j < bytes.len() && bytes[j].is_ascii_digit() {
                    j += 1;
                }
                if j == seg_start {
                    break;
                }
                // parse_ascii digits only, guaranteed by the while loop above
                let Ok(n) = name[seg_start..j].parse::<u32>() else {
                    break;
                };
                parts.push(n);
                if j < bytes.len() && bytes[j] == b'.' && j + 1 < bytes.len() && bytes[j + 1].is_ascii_digit() {
                    j += 1;
                } else {
                    break;
                }
            }
            if !parts.is_empty() {
                return Version(parts);
            }
            i = start + 1;
        } else {
            i += 1;
        }
    }
    Version::default()
}

/// Sorts file names (or full paths) by [`extract_version`], stable on ties.
pub fn sort_by_version<T: AsRef<str>>(mut names: Vec<T>) -> Vec<T> {
    names.sort_by(|a, b| extract_version(a.as_ref()).cmp(&extract_version(b.as_ref())));
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_simple_dotted_version() {
        assert_eq!(extract_version("x-1.2.yaml").0, vec![1, 2]);
    }

    #[test]
    fn extracts_three_part_version() {
        assert_eq!(extract_version("x-1.2.3.yaml").0, vec![1, 2, 3]);
    }

    #[test]
    fn missing_version_sorts_smallest() {
        assert_eq!(extract_version("no-version-here.yaml"), Version::default());
    }

    #[test]
    fn orders_versions_correctly() {
        let files = vec!["x-1.10.yaml", "x-1.2.yaml", "x-1.2.3.yaml", "plain.yaml"];
        let sorted = sort_by_version(files);
        assert_eq!(sorted, vec!["plain.yaml", "x-1.2.yaml", "x-1.2.3.yaml", "x-1.10.yaml"]);
    }
}
