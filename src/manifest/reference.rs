//! Sheet references: how the manifest points at each sheet image.

use std::path::{Component, Path};

/// Compute the externally visible reference for a sheet.
///
/// With a prefix the reference is `<prefix>/<sheet basename>`. Without one
/// it is the sheet's directory relative to the manifest's directory, followed
/// by the basename. Separators are always `/`.
pub fn sheet_reference(sheet: &Path, manifest: &Path, prefix: Option<&str>) -> String {
    let basename = sheet
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    if let Some(prefix) = prefix {
        return format!("{}/{}", prefix.trim_end_matches('/'), basename);
    }

    let from = manifest.parent().unwrap_or_else(|| Path::new(""));
    let to = sheet.parent().unwrap_or_else(|| Path::new(""));
    let relative = relative_dir(from, to);

    if relative.is_empty() {
        basename
    } else {
        format!("{}/{}", relative, basename)
    }
}

/// Lexical relative path from one directory to another, `/`-separated.
fn relative_dir(from: &Path, to: &Path) -> String {
    let from: Vec<Component> = from.components().filter(|c| *c != Component::CurDir).collect();
    let to: Vec<Component> = to.components().filter(|c| *c != Component::CurDir).collect();

    let common = from.iter().zip(&to).take_while(|(a, b)| a == b).count();

    let ups = std::iter::repeat("..".to_string()).take(from.len() - common);
    let downs = to[common..].iter().map(|c| c.as_os_str().to_string_lossy().into_owned());

    ups.chain(downs).collect::<Vec<_>>().join("/")
}
