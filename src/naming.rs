use std::ffi::{OsStr, OsString};
use std::path::PathBuf;

use crate::metadata::ProgrammeMetadata;
use crate::normalize::{normalize_title, zero_pad};

/// Where a converted file should end up, relative to its base directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetLocation {
    pub file_name: OsString,
    pub subdirectory: Option<PathBuf>,
}

impl TargetLocation {
    pub fn relative_path(&self) -> PathBuf {
        match &self.subdirectory {
            Some(dir) => dir.join(&self.file_name),
            None => PathBuf::from(&self.file_name),
        }
    }
}

/// Builds the target name for a programme.
///
/// `extension` includes its leading dot, or is empty. Standalone programmes
/// are named after the episode title alone; anything with a position uses the
/// `Show - sNNeNN - Episode` form. A `Show/Series N` subdirectory is only
/// produced when organizing and both positions are known.
pub fn synthesize(
    metadata: &ProgrammeMetadata,
    extension: impl AsRef<OsStr>,
    organize_into_series: bool,
) -> TargetLocation {
    let show_title = normalize_title(&metadata.show_title);
    let episode_title = normalize_title(&metadata.episode_title);

    let stem = if metadata.is_standalone() {
        episode_title
    } else {
        format!(
            "{} - s{}e{} - {}",
            show_title,
            zero_pad(metadata.series_position),
            zero_pad(metadata.episode_position),
            episode_title
        )
    };

    let mut file_name = OsString::from(stem);
    file_name.push(extension);

    let subdirectory = (organize_into_series && metadata.is_fully_numbered()).then(|| {
        PathBuf::from(&show_title).join(format!("Series {}", metadata.series_position))
    });

    TargetLocation {
        file_name,
        subdirectory,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn episode() -> ProgrammeMetadata {
        ProgrammeMetadata {
            episode_title: "The Beginning".to_string(),
            show_title: "Show Name".to_string(),
            episode_position: 3,
            series_position: 1,
        }
    }

    #[test]
    fn test_episodic_name() {
        let target = synthesize(&episode(), ".mp4", false);
        assert_eq!(target.file_name, "Show Name - s01e03 - The Beginning.mp4");
        assert_eq!(target.subdirectory, None);
    }

    #[test]
    fn test_episodic_name_with_series_dir() {
        let target = synthesize(&episode(), ".mp4", true);
        assert_eq!(target.subdirectory, Some(PathBuf::from("Show Name/Series 1")));
        assert_eq!(
            target.relative_path(),
            PathBuf::from("Show Name/Series 1/Show Name - s01e03 - The Beginning.mp4")
        );
    }

    #[test]
    fn test_standalone_name() {
        let metadata = ProgrammeMetadata {
            episode_title: "Special Episode".to_string(),
            show_title: "Ignored Show".to_string(),
            ..Default::default()
        };

        for organize in [false, true] {
            let target = synthesize(&metadata, ".mp4", organize);
            assert_eq!(target.file_name, "Special Episode.mp4");
            assert_eq!(target.subdirectory, None);
        }
    }

    #[test]
    fn test_partial_numbering_stays_flat() {
        let metadata = ProgrammeMetadata {
            episode_title: "Pilot".to_string(),
            show_title: "Show".to_string(),
            episode_position: 2,
            series_position: 0,
        };

        let target = synthesize(&metadata, ".m4a", true);
        assert_eq!(target.file_name, "Show - s00e02 - Pilot.m4a");
        assert_eq!(target.subdirectory, None);
    }

    #[test]
    fn test_titles_are_normalized() {
        let metadata = ProgrammeMetadata {
            episode_title: "Part 1: Rose".to_string(),
            show_title: "Doctor Who?".to_string(),
            episode_position: 1,
            series_position: 12,
        };

        let target = synthesize(&metadata, "", true);
        assert_eq!(target.file_name, "Doctor Who - s12e01 - Part 1 Rose");
        assert_eq!(target.subdirectory, Some(PathBuf::from("Doctor Who/Series 12")));
    }
}
