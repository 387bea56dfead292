use std::path::Path;

/// Extensions treated as shortcuts: shell links and ClickOnce application references.
pub const SHORTCUT_EXTENSIONS: [&str; 2] = ["lnk", "appref-ms"];

/// Whether `path` names a shortcut file, judged only by its extension (case-insensitive).
pub fn is_shortcut(path: impl AsRef<Path>) -> bool {
	path.as_ref()
		.extension()
		.and_then(|extension| extension.to_str())
		.is_some_and(|extension| {
			SHORTCUT_EXTENSIONS
				.iter()
				.any(|candidate| candidate.eq_ignore_ascii_case(extension))
		})
}
