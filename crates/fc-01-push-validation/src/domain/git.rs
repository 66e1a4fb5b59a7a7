//! Git object views returned by a [`LocalRepo`](crate::ports::outbound::LocalRepo).

/// Author or committer identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitSignature {
    pub name: String,
    pub email: String,
    /// Unix seconds.
    pub when: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub hash: String,
    pub tree_hash: String,
    pub parent_hashes: Vec<String>,
    pub author: GitSignature,
    pub committer: GitSignature,
    pub message: String,
}

impl Commit {
    pub fn num_parents(&self) -> usize {
        self.parent_hashes.len()
    }

    pub fn is_merge(&self) -> bool {
        self.parent_hashes.len() > 1
    }

    pub fn is_parent(&self, hash: &str) -> bool {
        self.parent_hashes.iter().any(|p| p == hash)
    }
}

/// An annotated tag object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub hash: String,
    pub name: String,
    pub target_hash: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileMode {
    Regular,
    Executable,
    Symlink,
    Dir,
    Submodule,
}

impl FileMode {
    /// Regular or executable file content.
    pub fn is_file(self) -> bool {
        matches!(self, Self::Regular | Self::Executable)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub name: String,
    pub mode: FileMode,
    pub hash: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tree {
    pub hash: String,
    pub entries: Vec<TreeEntry>,
}
