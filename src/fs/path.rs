//! Path resolution.

use std::collections::VecDeque;

use log::debug;

use crate::{
    disk::BlockDevice,
    fs::{
        config::{MAX_SYMLINK_FOLLOWS, ROOT_ID},
        descriptor::DescriptorId,
        error::{FileSystemError, Result},
        FileSystem,
    },
};

/// Non-empty components of `path`.
pub fn segments(path: &str) -> impl DoubleEndedIterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Splits `path` into its parent path and final name.
///
/// `"/a/b"` gives `("/a", "b")`, `"/b"` gives `("/", "b")` and `"b"` gives
/// `("", "b")`. A path without a final name (`""`, `"/"`) is invalid.
pub fn split_parent(path: &str) -> Result<(&str, &str)> {
    let trimmed = path.trim_end_matches('/');
    let (parent, name) = match trimmed.rfind('/') {
        Some(i) => {
            let parent = trimmed[..i].trim_end_matches('/');
            (if parent.is_empty() { "/" } else { parent }, &trimmed[i + 1..])
        }
        None => ("", trimmed),
    };
    if name.is_empty() {
        return Err(FileSystemError::InvalidPath(path.to_string()));
    }
    Ok((parent, name))
}

impl<D: BlockDevice> FileSystem<D> {
    /// Resolves `path` to a descriptor id without modifying anything.
    ///
    /// Relative paths start at `from`; a leading `/` starts at the root.
    /// Symlinks met before the last component are always dereferenced; the
    /// last component is dereferenced only with `follow_last`. Relative
    /// symlink targets resolve from the directory holding the symlink.
    pub fn lookup(&self, path: &str, from: DescriptorId, follow_last: bool) -> Result<DescriptorId> {
        let mut current = if path.starts_with('/') {
            ROOT_ID
        } else {
            self.table.get(from)?.id
        };
        let mut pending: VecDeque<String> = segments(path).map(str::to_string).collect();
        let mut follows = 0;

        while let Some(segment) = pending.pop_front() {
            if !self.table.get(current)?.is_dir() {
                return Err(FileSystemError::NotADirectory(path.to_string()));
            }
            let entry = self
                .find_entry(current, &segment)?
                .ok_or_else(|| FileSystemError::NotFound(path.to_string()))?;
            let child = self.table.get(entry.descriptor_id)?;

            if child.is_symlink() && (!pending.is_empty() || follow_last) {
                follows += 1;
                if follows > MAX_SYMLINK_FOLLOWS {
                    return Err(FileSystemError::TooManySymlinks(path.to_string()));
                }
                let target = self.read_link(child.id)?;
                debug!("lookup {}: {} -> {}", path, segment, target);

                if target.starts_with('/') {
                    current = ROOT_ID;
                }
                for part in segments(&target).rev() {
                    pending.push_front(part.to_string());
                }
                continue;
            }

            current = child.id;
        }

        Ok(current)
    }

    /// Resolves the directory that would hold the last component of `path`.
    pub(crate) fn resolve_parent<'p>(&self, path: &'p str) -> Result<(DescriptorId, &'p str)> {
        let (parent_path, name) = split_parent(path)?;
        let parent = self.lookup(parent_path, ROOT_ID, true)?;
        if !self.table.get(parent)?.is_dir() {
            return Err(FileSystemError::NotADirectory(parent_path.to_string()));
        }
        Ok((parent, name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_parent_handles_roots_and_relatives() {
        assert_eq!(split_parent("/a/b").unwrap(), ("/a", "b"));
        assert_eq!(split_parent("/b").unwrap(), ("/", "b"));
        assert_eq!(split_parent("b").unwrap(), ("", "b"));
        assert_eq!(split_parent("a/b/").unwrap(), ("a", "b"));
        assert_eq!(split_parent("//x").unwrap(), ("/", "x"));
    }

    #[test]
    fn split_parent_rejects_nameless_paths() {
        assert!(matches!(split_parent("/"), Err(FileSystemError::InvalidPath(_))));
        assert!(matches!(split_parent(""), Err(FileSystemError::InvalidPath(_))));
    }

    #[test]
    fn segments_skip_empty_components() {
        let parts: Vec<_> = segments("//a///b/").collect();
        assert_eq!(parts, ["a", "b"]);
    }
}
