//! File and folder naming rules shared by both storage backends.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Fallback type when the extension says nothing useful.
pub const GENERIC_MIME: &str = "application/octet-stream";

/// Check that `name` is usable as a single path component inside a course
/// folder: no separators, no NUL, and not `.` or `..` itself.
pub fn check_component(name: &str) -> Result<()> {
    if name.is_empty() || name == "." || name == ".." {
        return Err(Error::InvalidFilename(format!(
            "Not a file name: '{}'",
            name
        )));
    }

    if name.contains('/') || name.contains('\\') {
        return Err(Error::InvalidFilename(format!(
            "Path separators not allowed in filename: '{}'",
            name
        )));
    }

    if name.contains('\0') {
        return Err(Error::InvalidFilename(format!(
            "Null bytes not allowed in filename: '{}'",
            name
        )));
    }

    Ok(())
}

/// Validate a logical file name as received from the course site.
///
/// Returns an error if the name could escape the course folder or would be
/// taken for an in-flight download.
pub fn sanitize_filename(name: &str) -> Result<String> {
    check_component(name)?;

    // Leading dots are reserved for in-flight downloads
    if name.trim().is_empty() || name.starts_with('.') {
        return Err(Error::InvalidFilename(format!(
            "Filename cannot be empty or hidden: '{}'",
            name
        )));
    }

    Ok(name.to_string())
}

/// Make a course name safe to use as a single path component.
///
/// Every place a course name touches storage, folder names and index
/// filters alike, goes through here.
pub fn sanitize_course_name(course_name: &str) -> String {
    course_name
        .chars()
        .map(|c| match c {
            '/' | '\\' => '_',
            c => c,
        })
        .collect()
}

/// `<root_folder>/<sanitized course>` relative to the downloads root.
pub fn relative_course_dir(root_folder: &str, course_name: &str) -> PathBuf {
    Path::new(root_folder).join(sanitize_course_name(course_name))
}

/// Index-style relative path (forward slashes, trailing slash) of a course folder.
pub fn index_relative_path(root_folder: &str, course_name: &str) -> String {
    format!("{}/{}/", root_folder, sanitize_course_name(course_name))
}

/// Path fragment that selects one course folder in an index query.
pub fn index_course_filter(course_name: &str) -> String {
    format!("/{}/", sanitize_course_name(course_name))
}

/// Temporary name used while a file is downloading.
pub fn partial_filename(file_name: &str) -> String {
    format!(".{}.part", file_name)
}

/// Whether a directory entry is an in-flight download rather than content.
pub fn is_partial(file_name: &str) -> bool {
    file_name.starts_with('.')
}

/// MIME type derived from the file extension.
pub fn mime_for(file_name: &str) -> String {
    mime_guess::from_path(file_name)
        .first_raw()
        .unwrap_or(GENERIC_MIME)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename_valid() {
        assert_eq!(sanitize_filename("handout.pdf").unwrap(), "handout.pdf");
        assert_eq!(
            sanitize_filename("Lecture 1: intro.pptx").unwrap(),
            "Lecture 1: intro.pptx"
        );
    }

    #[test]
    fn test_sanitize_filename_rejects_escapes() {
        assert!(sanitize_filename("../etc/passwd").is_err());
        assert!(sanitize_filename("path/to/file.txt").is_err());
        assert!(sanitize_filename("path\\file.txt").is_err());
        assert!(sanitize_filename("file\0name.txt").is_err());
        assert!(sanitize_filename("   ").is_err());
        assert!(sanitize_filename(".handout.pdf.part").is_err());
        assert!(sanitize_filename("..").is_err());
    }

    #[test]
    fn test_sanitize_filename_allows_embedded_dots() {
        assert_eq!(sanitize_filename("Chapter 1...pdf").unwrap(), "Chapter 1...pdf");
        assert_eq!(sanitize_filename("v1..2.zip").unwrap(), "v1..2.zip");
    }

    #[test]
    fn test_check_component() {
        assert!(check_component("notes.pdf").is_ok());
        assert!(check_component("a..b").is_ok());
        for bad in ["", ".", "..", "../notes.pdf", "a/b", "a\\b", "a\0b"] {
            assert!(check_component(bad).is_err(), "{:?}", bad);
        }
    }

    #[test]
    fn test_course_name_separators_replaced_everywhere() {
        for name in ["CS F111/ECE", "a\\b/c", "//", "plain"] {
            let sanitized = sanitize_course_name(name);
            assert!(!sanitized.contains('/') && !sanitized.contains('\\'));

            let dir = relative_course_dir("CMS", name);
            assert_eq!(dir, Path::new("CMS").join(&sanitized));
            assert_eq!(dir.components().count(), 2);

            assert_eq!(index_relative_path("CMS", name), format!("CMS/{}/", sanitized));
            assert!(index_relative_path("CMS", name).contains(&index_course_filter(name)));
        }
        assert_eq!(sanitize_course_name("CS F111/ECE"), "CS F111_ECE");
    }

    #[test]
    fn test_course_filter_does_not_match_prefixes() {
        let other = index_relative_path("CMS", "XCS");
        assert!(!other.contains(&index_course_filter("CS")));
    }

    #[test]
    fn test_partial_names() {
        assert_eq!(partial_filename("a.pdf"), ".a.pdf.part");
        assert!(is_partial(&partial_filename("a.pdf")));
        assert!(!is_partial("a.pdf"));
    }

    #[test]
    fn test_mime_for() {
        assert_eq!(mime_for("slides.pdf"), "application/pdf");
        assert_eq!(mime_for("photo.PNG"), "image/png");
        assert_eq!(mime_for("noextension"), GENERIC_MIME);
    }
}
