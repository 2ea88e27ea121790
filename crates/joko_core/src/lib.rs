use std::str::FromStr;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

pub mod serde_glam;
pub mod task;
pub mod trace;

/// This newtype is used to represents relative paths inside pathing packs
/// 1. It won't start with `/`, because its a relative path
/// 2. It can be empty to represent the root of the pack
/// 3. No expansion of special characters like  `.` or `..` stuff.
/// 4. It is always lowercase, packs authored on windows reference files with random casing.
/// 5. It will use `/` as the path separator.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RelativePath(SmolStr);

impl Serialize for RelativePath {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.0.as_str())
    }
}
impl<'de> Deserialize<'de> for RelativePath {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(RelativePath::new(&s))
    }
}

impl RelativePath {
    pub fn new(path: &str) -> Self {
        Self(Self::normalize(path).into())
    }

    pub fn normalize(path: &str) -> String {
        let normalized_slash = path.trim().replace('\\', "/");
        let trimmed_path = normalized_slash.trim_start_matches('/');
        trimmed_path.to_lowercase()
    }

    pub fn join_str(&self, path: &str) -> Self {
        let normalized_path = RelativePath::normalize(path);
        if normalized_path.is_empty() {
            return Self(self.0.clone());
        }
        if self.0.is_empty() {
            // no need to push `/` if we are empty, as that would make it an absolute path
            return Self(normalized_path.into());
        }

        let mut new = self.0.to_string();
        if !self.0.ends_with('/') {
            new.push('/');
        }
        new.push_str(&normalized_path);
        Self(new.into())
    }

    pub fn ends_with(&self, ext: &str) -> bool {
        self.0.ends_with(ext)
    }
    pub fn is_tbin(&self) -> bool {
        self.ends_with(".trl")
    }
    pub fn is_xml(&self) -> bool {
        self.ends_with(".xml")
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RelativePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl From<RelativePath> for String {
    fn from(val: RelativePath) -> String {
        val.0.into()
    }
}
impl FromStr for RelativePath {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rstest::rstest;
    use similar_asserts::assert_eq;

    #[rstest]
    #[case("Data\\Icons\\Chest.PNG", "data/icons/chest.png")]
    #[case("/trails/a.trl", "trails/a.trl")]
    #[case("  \\\\root.xml ", "root.xml")]
    #[case("", "")]
    fn normalizes(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(RelativePath::new(raw).as_str(), expected);
    }

    #[test]
    fn join_keeps_a_single_separator() {
        let base = RelativePath::new("Data/");
        assert_eq!(base.join_str("\\Icons\\A.png").as_str(), "data/icons/a.png");
        assert_eq!(RelativePath::default().join_str("x.xml").as_str(), "x.xml");
        assert_eq!(base.join_str("").as_str(), "data/");
        assert!(base.join_str("x.trl").is_tbin());
    }
}
