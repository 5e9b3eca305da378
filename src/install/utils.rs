use std::ffi::OsStr;
use std::path::Path;

/// Check if a directory is in PATH
pub fn is_directory_in_path(directory: &Path) -> bool {
    std::env::var_os("PATH").is_some_and(|path| path_list_contains(&path, directory))
}

fn path_list_contains(path_var: &OsStr, directory: &Path) -> bool {
    let wanted = directory.canonicalize().unwrap_or_else(|_| directory.to_path_buf());
    std::env::split_paths(path_var).any(|entry| {
        entry == directory || entry.canonicalize().is_ok_and(|canonical| canonical == wanted)
    })
}
