/*
 * Path helpers: resolving the per-user settings directory and turning file system
 * paths into the `/`-separated, root-relative keys used throughout the tree model.
 */
use directories::ProjectDirs;
use std::fs;
use std::path::{Component, Path, PathBuf};

/*
 * Returns the application's local (non-roaming) configuration directory, creating
 * it if needed. `None` if the platform offers no suitable location or the
 * directory cannot be created.
 */
pub fn get_base_app_config_local_dir(app_name: &str) -> Option<PathBuf> {
    log::trace!("PathUtils: Resolving base app config local dir for '{app_name}'");
    ProjectDirs::from("", "", app_name).and_then(|proj_dirs| {
        let config_path = proj_dirs.config_local_dir();
        if !config_path.exists() {
            if let Err(e) = fs::create_dir_all(config_path) {
                log::error!(
                    "PathUtils: Failed to create base app config directory {config_path:?}: {e}"
                );
                return None;
            }
            log::debug!("PathUtils: Created base app config directory: {config_path:?}");
        }
        Some(config_path.to_path_buf())
    })
}

/*
 * Builds the tree key for `path` relative to `root`: normal components joined with
 * `/`, independent of the platform separator. `None` when `path` is not under
 * `root` or is `root` itself.
 */
pub fn tree_key_for(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

/*
 * Maps a tree key back onto the file system under `root`. `None` when a segment
 * would leave the root: `..`, or anything that is not a single plain component.
 */
pub fn path_for_tree_key(root: &Path, key: &str) -> Option<PathBuf> {
    let mut path = root.to_path_buf();
    for part in key.split('/').filter(|part| !part.is_empty() && *part != ".") {
        let mut components = Path::new(part).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(normal)), None) => path.push(normal),
            _ => {
                log::warn!("PathUtils: Rejecting key {key:?}; segment {part:?} leaves the root.");
                return None;
            }
        }
    }
    Some(path)
}

/* Lower-cased extension of the last key segment, if any. */
pub fn key_extension(key: &str) -> Option<String> {
    let name = key.rsplit('/').next()?;
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}
