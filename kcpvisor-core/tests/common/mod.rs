//! Shared fixtures for integration tests
#![allow(dead_code)]

use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::Write;
use tar::{Builder, EntryType, Header};

/// A tar entry to put in a fixture archive
pub enum Entry<'a> {
    Dir(&'a str),
    File(&'a str, &'a [u8]),
    Symlink(&'a str, &'a str),
    /// Regular file written with the name bytes as-is, bypassing the
    /// builder's path checks
    RawFile(&'a str, &'a [u8]),
    /// Directory written with the name bytes as-is
    RawDir(&'a str),
}

/// Build a `.tar.gz` archive in memory
pub fn tar_gz(entries: &[Entry<'_>]) -> Vec<u8> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = Builder::new(encoder);

    for entry in entries {
        match entry {
            Entry::Dir(name) => {
                let mut header = Header::new_gnu();
                header.set_entry_type(EntryType::Directory);
                header.set_mode(0o755);
                header.set_size(0);
                builder
                    .append_data(&mut header, name, std::io::empty())
                    .unwrap();
            }
            Entry::File(name, data) => {
                let mut header = Header::new_gnu();
                header.set_entry_type(EntryType::Regular);
                header.set_mode(0o644);
                header.set_size(data.len() as u64);
                builder.append_data(&mut header, name, *data).unwrap();
            }
            Entry::Symlink(name, target) => {
                let mut header = Header::new_gnu();
                header.set_entry_type(EntryType::Symlink);
                header.set_size(0);
                builder.append_link(&mut header, name, target).unwrap();
            }
            Entry::RawFile(name, data) => {
                let header = raw_header(name, EntryType::Regular, 0o644, data.len());
                builder.append(&header, *data).unwrap();
            }
            Entry::RawDir(name) => {
                let header = raw_header(name, EntryType::Directory, 0o755, 0);
                builder.append(&header, std::io::empty()).unwrap();
            }
        }
    }

    let encoder = builder.into_inner().unwrap();
    let mut gz = encoder.finish().unwrap();
    gz.flush().unwrap();
    gz
}

fn raw_header(name: &str, entry_type: EntryType, mode: u32, size: usize) -> Header {
    let mut header = Header::new_old();
    let bytes = name.as_bytes();
    header.as_old_mut().name[..bytes.len()].copy_from_slice(bytes);
    header.set_entry_type(entry_type);
    header.set_mode(mode);
    header.set_size(size as u64);
    header.set_cksum();
    header
}

/// True while `pid` exists and has not exited
///
/// Zombies awaiting their reaper count as exited.
#[cfg(unix)]
pub fn process_running(pid: u32) -> bool {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    if kill(Pid::from_raw(pid as i32), None).is_err() {
        return false;
    }
    match std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
        Ok(stat) => stat
            .rsplit_once(')')
            .map(|(_, rest)| !rest.trim_start().starts_with('Z'))
            .unwrap_or(true),
        // No procfs: trust the signal check
        Err(_) => !std::path::Path::new("/proc/self").exists(),
    }
}

/// Shell script standing in for the kcptun client
///
/// Answers `-v` with a version line; otherwise echoes its config argument.
pub const FAKE_CLIENT: &[u8] = b"#!/bin/sh\n\
if [ \"$1\" = \"-v\" ]; then\n\
  echo \"kcptun version 20230101\"\n\
  exit 0\n\
fi\n\
echo \"remote address: 127.0.0.1:29900\"\n\
echo \"config: $2\" >&2\n";
