//! Progress profiles.
//!
//! Each profile keeps its completion state in its own JSON file inside the data
//! directory, named `<profile_name>_progress.json`. Profiles let several
//! playthroughs share one device.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// A progress profile with its name and progress file path.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub name: String,
    pub display_name: String,
    pub file_path: PathBuf,
}

const SUFFIX: &str = "_progress";

impl Profile {
    /// Create a profile with the given display name.
    pub fn new(display_name: &str, dir: &Path) -> Self {
        let name = sanitize_profile_name(display_name);
        let file_path = dir.join(format!("{name}{SUFFIX}.json"));

        Profile {
            name,
            display_name: display_name.to_string(),
            file_path,
        }
    }

    /// Recognise a profile from an existing progress file.
    pub fn from_file(file_path: PathBuf) -> Option<Self> {
        if file_path.extension()?.to_str()? != "json" {
            return None;
        }
        let stem = file_path.file_stem()?.to_str()?;
        let name = stem.strip_suffix(SUFFIX)?;
        if name.is_empty() {
            return None;
        }

        Some(Profile {
            name: name.to_string(),
            display_name: name.replace('_', " "),
            file_path,
        })
    }
}

/// Convert a display name to a safe profile name for file naming.
/// Lowercases and collapses runs of non-alphanumerics into single underscores.
pub fn sanitize_profile_name(display_name: &str) -> String {
    display_name
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect::<String>()
        .split('_')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

/// Discover all profiles in the data directory, sorted by display name.
pub fn discover_profiles(dir: &Path) -> Result<Vec<Profile>, std::io::Error> {
    let mut profiles = Vec::new();

    if !dir.exists() {
        return Ok(profiles);
    }

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() {
            if let Some(profile) = Profile::from_file(path) {
                profiles.push(profile);
            }
        }
    }

    profiles.sort_by(|a, b| a.display_name.cmp(&b.display_name));
    Ok(profiles)
}

/// Find the most recently written profile in the data directory.
pub fn most_recent_profile(dir: &Path) -> Result<Option<Profile>, std::io::Error> {
    let mut most_recent: Option<(Profile, SystemTime)> = None;

    for profile in discover_profiles(dir)? {
        let Ok(modified) = fs::metadata(&profile.file_path).and_then(|m| m.modified()) else {
            continue;
        };
        match &most_recent {
            Some((_, current)) if *current >= modified => {}
            _ => most_recent = Some((profile, modified)),
        }
    }

    Ok(most_recent.map(|(profile, _)| profile))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_profile_name() {
        assert_eq!(sanitize_profile_name("Second Run"), "second_run");
        assert_eq!(sanitize_profile_name("NG+ Hard-Mode_2"), "ng_hard_mode_2");
        assert_eq!(sanitize_profile_name("  Multiple   Spaces  "), "multiple_spaces");
        assert_eq!(sanitize_profile_name(""), "");
    }

    #[test]
    fn profile_round_trips_through_file_name() {
        let dir = Path::new("/data");
        let profile = Profile::new("Second Run", dir);
        assert_eq!(profile.file_path, dir.join("second_run_progress.json"));

        let found = Profile::from_file(profile.file_path.clone()).unwrap();
        assert_eq!(found.name, "second_run");
        assert_eq!(found.display_name, "second run");

        assert!(Profile::from_file(dir.join("quests.json")).is_none());
        assert!(Profile::from_file(dir.join("_progress.json")).is_none());
        assert!(Profile::from_file(dir.join("a_progress.json.tmp")).is_none());
    }

    #[test]
    fn discovers_profiles_and_most_recent() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(most_recent_profile(dir.path()).unwrap().is_none());

        fs::write(dir.path().join("beta_progress.json"), "{}").unwrap();
        fs::write(dir.path().join("alpha_progress.json"), "{}").unwrap();
        fs::write(dir.path().join("quests.json"), "[]").unwrap();

        let names: Vec<String> = discover_profiles(dir.path())
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["alpha", "beta"]);
        assert!(most_recent_profile(dir.path()).unwrap().is_some());
    }
}
