//! Deterministic construction of output file paths.
//!
//! Path building is pure: directories are only created by the manager
//! immediately before a write. Output base names always carry the owning
//! step's short id so steps sharing an output name cannot collide.

use std::path::{Path, PathBuf};

use crate::core::naming::pascal_case;

/// Structured (subject/session/task-like) naming fields for one save call.
///
/// When any of these are supplied the path follows the domain derivatives
/// layout instead of a flat file in the output root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructuredFields {
    pub subject: Option<String>,
    pub session: Option<String>,
    pub task: Option<String>,
    pub run: Option<String>,
    /// Datatype directory segment; falls back to the configured default.
    pub datatype: Option<String>,
}

/// Inputs for one path construction.
#[derive(Debug, Clone)]
pub struct PathRequest<'a> {
    pub step_id: &'a str,
    pub name: &'a str,
    pub suffix: Option<&'a str>,
    pub extension: Option<&'a str>,
    pub structured: Option<&'a StructuredFields>,
    /// Overrides the computed directory, never the filename.
    pub custom_dir: Option<&'a Path>,
    pub output_root: &'a Path,
    pub default_datatype: &'a str,
}

/// Prefix `name` with the step id unless it already carries it.
pub fn prefixed_name(step_id: &str, name: &str) -> String {
    if name.starts_with(step_id) {
        name.to_string()
    } else {
        format!("{step_id}_{name}")
    }
}

/// Build the output path for one save call.
pub fn build_output_path(request: &PathRequest<'_>) -> PathBuf {
    match request.structured {
        Some(fields) => structured_path(request, fields),
        None => flat_path(request),
    }
}

fn flat_path(request: &PathRequest<'_>) -> PathBuf {
    let mut filename = prefixed_name(request.step_id, request.name);
    if let Some(suffix) = request.suffix {
        filename.push('_');
        filename.push_str(suffix);
    }
    if let Some(extension) = request.extension {
        filename.push_str(extension);
    }
    base_dir(request, None).join(filename)
}

fn structured_path(request: &PathRequest<'_>, fields: &StructuredFields) -> PathBuf {
    let datatype = fields
        .datatype
        .as_deref()
        .unwrap_or(request.default_datatype);

    let mut entities = Vec::new();
    if let Some(subject) = &fields.subject {
        entities.push(format!("sub-{subject}"));
    }
    if let Some(session) = &fields.session {
        entities.push(format!("ses-{session}"));
    }
    if let Some(task) = &fields.task {
        entities.push(format!("task-{task}"));
    }
    if let Some(run) = &fields.run {
        entities.push(format!("run-{run}"));
    }
    entities.push(format!("desc-{}", structured_description(request)));
    if let Some(suffix) = request.suffix {
        entities.push(suffix.to_string());
    }

    let mut filename = entities.join("_");
    if let Some(extension) = request.extension {
        filename.push_str(extension);
    }

    let mut dir_fields = Vec::new();
    if let Some(subject) = &fields.subject {
        dir_fields.push(format!("sub-{subject}"));
    }
    if let Some(session) = &fields.session {
        dir_fields.push(format!("ses-{session}"));
    }
    dir_fields.push(datatype.to_string());

    base_dir(request, Some(&dir_fields)).join(filename)
}

/// Description entity: step id followed by the PascalCase output name.
fn structured_description(request: &PathRequest<'_>) -> String {
    let bare = request
        .name
        .strip_prefix(&format!("{}_", request.step_id))
        .unwrap_or(request.name);
    format!("{}{}", request.step_id, pascal_case(bare))
}

fn base_dir(request: &PathRequest<'_>, structured_dirs: Option<&[String]>) -> PathBuf {
    if let Some(dir) = request.custom_dir {
        return dir.to_path_buf();
    }
    let mut dir = request.output_root.to_path_buf();
    if let Some(segments) = structured_dirs {
        for segment in segments {
            dir.push(segment);
        }
    }
    dir
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request<'a>(root: &'a Path, structured: Option<&'a StructuredFields>) -> PathRequest<'a> {
        PathRequest {
            step_id: "00",
            name: "summary",
            suffix: Some("plot"),
            extension: Some(".png"),
            structured,
            custom_dir: None,
            output_root: root,
            default_datatype: "eeg",
        }
    }

    #[test]
    fn flat_path_prefixes_step_id() {
        let root = Path::new("/derivatives");
        let path = build_output_path(&request(root, None));
        assert_eq!(path, Path::new("/derivatives/00_summary_plot.png"));
    }

    #[test]
    fn prefixing_is_idempotent() {
        assert_eq!(prefixed_name("00", "summary"), "00_summary");
        assert_eq!(prefixed_name("00", "00_summary"), "00_summary");
    }

    #[test]
    fn flat_path_without_suffix_or_extension() {
        let root = Path::new("/out");
        let req = PathRequest {
            suffix: None,
            extension: None,
            ..request(root, None)
        };
        assert_eq!(build_output_path(&req), Path::new("/out/00_summary"));
    }

    #[test]
    fn structured_path_builds_nested_layout() {
        let root = Path::new("/derivatives");
        let fields = StructuredFields {
            subject: Some("01".to_string()),
            session: Some("02".to_string()),
            task: Some("rest".to_string()),
            run: None,
            datatype: None,
        };
        let path = build_output_path(&request(root, Some(&fields)));
        assert_eq!(
            path,
            Path::new(
                "/derivatives/sub-01/ses-02/eeg/sub-01_ses-02_task-rest_desc-00Summary_plot.png"
            )
        );
    }

    #[test]
    fn structured_description_strips_existing_prefix() {
        let root = Path::new("/derivatives");
        let fields = StructuredFields {
            subject: Some("01".to_string()),
            ..StructuredFields::default()
        };
        let req = PathRequest {
            name: "00_summary",
            ..request(root, Some(&fields))
        };
        let path = build_output_path(&req);
        assert!(path.to_string_lossy().contains("desc-00Summary"));
    }

    #[test]
    fn custom_dir_overrides_directory_only() {
        let root = Path::new("/derivatives");
        let custom = Path::new("/elsewhere");
        let req = PathRequest {
            custom_dir: Some(custom),
            ..request(root, None)
        };
        assert_eq!(
            build_output_path(&req),
            Path::new("/elsewhere/00_summary_plot.png")
        );

        let fields = StructuredFields {
            subject: Some("01".to_string()),
            ..StructuredFields::default()
        };
        let req = PathRequest {
            custom_dir: Some(custom),
            ..request(root, Some(&fields))
        };
        assert_eq!(
            build_output_path(&req),
            Path::new("/elsewhere/sub-01_desc-00Summary_plot.png")
        );
    }
}
