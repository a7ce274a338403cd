//! Permission bits as they travel on the wire.
//!
//! The wire field is a `u16` whose bit positions are the classic POSIX octal
//! values, so `0o755` on disk is `0o755` in the archive. Bits outside the
//! twelve known flags are dropped when decoding.

use std::fmt;

use bitflags::bitflags;

bitflags! {
    /// The twelve POSIX permission flags an entry can carry.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Permissions: u16 {
        const OWNER_READ = 0o400;
        const OWNER_WRITE = 0o200;
        const OWNER_EXEC = 0o100;
        const GROUP_READ = 0o040;
        const GROUP_WRITE = 0o020;
        const GROUP_EXEC = 0o010;
        const OTHERS_READ = 0o004;
        const OTHERS_WRITE = 0o002;
        const OTHERS_EXEC = 0o001;
        const SET_UID = 0o4000;
        const SET_GID = 0o2000;
        const STICKY_BIT = 0o1000;
    }
}

impl Permissions {
    /// Typical mode for a freshly created directory (`rwxr-xr-x`).
    pub const DIR_DEFAULT: Self = Self::from_bits_truncate(0o755);
    /// Typical mode for a freshly created file (`rw-r--r--`).
    pub const FILE_DEFAULT: Self = Self::from_bits_truncate(0o644);

    /// Encodes the flags into the 16-bit wire value.
    pub fn to_wire(self) -> u16 {
        self.bits()
    }

    /// Decodes a wire value. Unknown bits are ignored.
    pub fn from_wire(value: u16) -> Self {
        Self::from_bits_truncate(value)
    }

    /// Builds the flag set from a host `st_mode`, ignoring the file-type bits.
    pub fn from_mode(mode: u32) -> Self {
        Self::from_bits_truncate((mode & 0o7777) as u16)
    }

    /// Returns the permission part of a host `st_mode`.
    pub fn to_mode(self) -> u32 {
        u32::from(self.bits())
    }
}

impl fmt::Display for Permissions {
    /// `ls`-style rendering, e.g. `rwsr-x--T`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let triads = [
            (Self::OWNER_READ, Self::OWNER_WRITE, Self::OWNER_EXEC, Self::SET_UID, 's'),
            (Self::GROUP_READ, Self::GROUP_WRITE, Self::GROUP_EXEC, Self::SET_GID, 's'),
            (Self::OTHERS_READ, Self::OTHERS_WRITE, Self::OTHERS_EXEC, Self::STICKY_BIT, 't'),
        ];
        let mut out = String::with_capacity(9);
        for (read, write, exec, special, mark) in triads {
            out.push(if self.contains(read) { 'r' } else { '-' });
            out.push(if self.contains(write) { 'w' } else { '-' });
            out.push(match (self.contains(exec), self.contains(special)) {
                (true, true) => mark,
                (false, true) => mark.to_ascii_uppercase(),
                (true, false) => 'x',
                (false, false) => '-',
            });
        }
        f.write_str(&out)
    }
}
