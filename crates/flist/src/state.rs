//! Carried-over state for diff-compressing consecutive manifest entries.

/// The previous entry's fields, consulted and updated entry by entry.
///
/// This is the incremental-diff state of the manifest, not a cache: both the
/// encoder and the decoder must thread one `DiffState` through the whole
/// list, in list order, or the elided fields reconstruct wrong values.
#[derive(Debug, Clone, Default)]
pub struct DiffState {
    last_name: Vec<u8>,
    last_mode: u32,
    last_mtime: i64,
    last_uid: Option<u32>,
    last_gid: Option<u32>,
    last_rdev_major: Option<u32>,
}

impl DiffState {
    /// Fresh state for the start of a list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The previous entry's path bytes.
    #[must_use]
    pub fn last_name(&self) -> &[u8] {
        &self.last_name
    }

    /// The previous entry's mode.
    #[must_use]
    pub const fn last_mode(&self) -> u32 {
        self.last_mode
    }

    /// The previous entry's mtime.
    #[must_use]
    pub const fn last_mtime(&self) -> i64 {
        self.last_mtime
    }

    /// The previous entry's owner id, if any entry carried one yet.
    #[must_use]
    pub const fn last_uid(&self) -> Option<u32> {
        self.last_uid
    }

    /// The previous entry's group id, if any entry carried one yet.
    #[must_use]
    pub const fn last_gid(&self) -> Option<u32> {
        self.last_gid
    }

    /// The previous device entry's major number, if one was seen.
    #[must_use]
    pub const fn last_rdev_major(&self) -> Option<u32> {
        self.last_rdev_major
    }

    /// Number of leading bytes `name` shares with the previous entry's name,
    /// capped at 255 so it fits the one-byte prefix field.
    #[must_use]
    pub fn common_prefix_len(&self, name: &[u8]) -> usize {
        self.last_name
            .iter()
            .zip(name.iter())
            .take_while(|(a, b)| a == b)
            .count()
            .min(255)
    }

    /// Replaces the carried name, reusing the existing allocation.
    pub fn set_last_name(&mut self, name: &[u8]) {
        self.last_name.clear();
        self.last_name.extend_from_slice(name);
    }

    /// Replaces the carried mode.
    pub const fn set_last_mode(&mut self, mode: u32) {
        self.last_mode = mode;
    }

    /// Replaces the carried mtime.
    pub const fn set_last_mtime(&mut self, mtime: i64) {
        self.last_mtime = mtime;
    }

    /// Replaces the carried owner id.
    pub const fn set_last_uid(&mut self, uid: u32) {
        self.last_uid = Some(uid);
    }

    /// Replaces the carried group id.
    pub const fn set_last_gid(&mut self, gid: u32) {
        self.last_gid = Some(gid);
    }

    /// Replaces the carried device major number.
    pub const fn set_last_rdev_major(&mut self, major: u32) {
        self.last_rdev_major = Some(major);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_length_stops_at_first_difference() {
        let mut state = DiffState::new();
        state.set_last_name(b"dir/file1");
        assert_eq!(state.common_prefix_len(b"dir/file2"), 8);
        assert_eq!(state.common_prefix_len(b"other"), 0);
        assert_eq!(state.common_prefix_len(b"dir/file1"), 9);
    }

    #[test]
    fn prefix_length_caps_at_255() {
        let mut state = DiffState::new();
        let long = vec![b'a'; 300];
        state.set_last_name(&long);
        assert_eq!(state.common_prefix_len(&long), 255);
    }

    #[test]
    fn ids_start_absent() {
        let state = DiffState::new();
        assert_eq!(state.last_uid(), None);
        assert_eq!(state.last_gid(), None);
        assert_eq!(state.last_rdev_major(), None);
    }
}
