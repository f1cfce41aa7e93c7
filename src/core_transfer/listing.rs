use chrono::{DateTime, Local, Utc};
use nix::unistd::{access, AccessFlags};
use std::fs::{self, Metadata};
use std::io;
use std::os::unix::fs::{FileTypeExt, PermissionsExt};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// How each entry of a listing is rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListFormat {
    /// LIST: `ls -l` style lines.
    Long,
    /// NLST: bare names.
    Names,
    /// MLSD: machine readable facts, selected by letter (`m`, `p`, `s`, `t`).
    Facts(String),
}

#[derive(Debug)]
pub struct ListEntry {
    pub name: String,
    pub path: PathBuf,
    pub meta: Metadata,
    /// `cdir`/`pdir` for the `.` and `..` entries of MLSD.
    pub special: Option<&'static str>,
}

/// Captures the entries of `path` once, directories first, each group by name.
///
/// A regular file yields a single entry for itself. The MLSD `..` of `root`
/// is `root` itself.
pub fn snapshot(path: &Path, root: &Path, format: &ListFormat) -> io::Result<Vec<ListEntry>> {
    let meta = fs::metadata(path)?;
    if !meta.is_dir() {
        return Ok(vec![entry_for(path)?]);
    }

    let mut entries = Vec::new();
    for entry in fs::read_dir(path)? {
        let entry = entry?;
        let entry_path = entry.path();
        // Dangling symlinks still show up, described by the link itself.
        let meta = match fs::metadata(&entry_path) {
            Ok(meta) => meta,
            Err(_) => match entry.metadata() {
                Ok(meta) => meta,
                Err(_) => continue,
            },
        };
        entries.push(ListEntry {
            name: entry.file_name().to_string_lossy().into_owned(),
            path: entry_path,
            meta,
            special: None,
        });
    }
    entries.sort_by(|a, b| {
        b.meta
            .is_dir()
            .cmp(&a.meta.is_dir())
            .then_with(|| a.name.cmp(&b.name))
    });

    if let ListFormat::Facts(_) = format {
        let parent = match path.parent() {
            Some(parent) if path != root && parent.starts_with(root) => parent,
            _ => path,
        };
        let parent_meta = fs::metadata(parent).unwrap_or_else(|_| meta.clone());
        entries.insert(
            0,
            ListEntry {
                name: String::from(".."),
                path: parent.to_path_buf(),
                meta: parent_meta,
                special: Some("pdir"),
            },
        );
        entries.insert(
            0,
            ListEntry {
                name: String::from("."),
                path: path.to_path_buf(),
                meta,
                special: Some("cdir"),
            },
        );
    }

    Ok(entries)
}

/// A single entry describing `path` itself, named by its last component.
pub fn entry_for(path: &Path) -> io::Result<ListEntry> {
    let meta = fs::metadata(path)?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| String::from("/"));
    Ok(ListEntry {
        name,
        path: path.to_path_buf(),
        meta,
        special: None,
    })
}

/// Renders one entry as a CRLF terminated line.
pub fn format_entry(entry: &ListEntry, format: &ListFormat) -> String {
    match format {
        ListFormat::Long => format!(
            "{} 1 {:>5} {:>5} {:>12} {} {}\r\n",
            mode_string(&entry.meta),
            0,
            0,
            entry.meta.len(),
            local_time(&entry.meta),
            entry.name
        ),
        ListFormat::Names => format!("{}\r\n", entry.name),
        ListFormat::Facts(facts) => format!("{} {}\r\n", format_facts(entry, facts), entry.name),
    }
}

/// The `fact=value;` list of MLST/MLSD, always in `modify perm size type` order.
pub fn format_facts(entry: &ListEntry, facts: &str) -> String {
    let is_dir = entry.meta.is_dir();
    let mut out = String::new();

    if facts.contains('m') {
        out.push_str(&format!("modify={};", utc_stamp(&entry.meta)));
    }
    if facts.contains('p') {
        let readable = access(&entry.path, AccessFlags::R_OK).is_ok();
        let writable = access(&entry.path, AccessFlags::W_OK).is_ok();
        let mut perm = String::new();
        if is_dir {
            if readable {
                perm.push_str("le");
            }
            if writable {
                perm.push_str("pc");
            }
        } else {
            if readable {
                perm.push('r');
            }
            if writable {
                perm.push('w');
            }
        }
        out.push_str(&format!("perm={};", perm));
    }
    if facts.contains('s') && !is_dir {
        out.push_str(&format!("size={};", entry.meta.len()));
    }
    if facts.contains('t') {
        let kind = match entry.special {
            Some(special) => special,
            None if is_dir => "dir",
            None => "file",
        };
        out.push_str(&format!("type={};", kind));
    }

    out
}

/// Picks MLST facts from an `OPTS MLST type;size;...` argument.
pub fn parse_mlst_facts(arg: &str) -> String {
    let mut facts = String::new();
    for (name, letter) in [("modify", 'm'), ("perm", 'p'), ("size", 's'), ("type", 't')] {
        let wanted = arg
            .split(';')
            .any(|fact| fact.trim().eq_ignore_ascii_case(name));
        if wanted {
            facts.push(letter);
        }
    }
    facts
}

/// Spells out selected facts the way OPTS MLST confirms them.
pub fn describe_facts(facts: &str) -> String {
    let mut out = String::new();
    for (name, letter) in [("modify", 'm'), ("perm", 'p'), ("size", 's'), ("type", 't')] {
        if facts.contains(letter) {
            out.push_str(name);
            out.push(';');
        }
    }
    out
}

/// `YYYYMMDDHHMMSS` in UTC, as used by MDTM and the `modify` fact.
pub fn utc_stamp(meta: &Metadata) -> String {
    let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
    DateTime::<Utc>::from(modified)
        .format("%Y%m%d%H%M%S")
        .to_string()
}

fn local_time(meta: &Metadata) -> String {
    let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
    DateTime::<Local>::from(modified)
        .format("%b %e %H:%M")
        .to_string()
}

fn mode_string(meta: &Metadata) -> String {
    let file_type = meta.file_type();
    let kind = if file_type.is_dir() {
        'd'
    } else if file_type.is_symlink() {
        'l'
    } else if file_type.is_block_device() {
        'b'
    } else if file_type.is_char_device() {
        'c'
    } else if file_type.is_fifo() {
        'p'
    } else if file_type.is_socket() {
        's'
    } else {
        '-'
    };

    let mode = meta.permissions().mode();
    let mut out = String::with_capacity(10);
    out.push(kind);
    for shift in [6, 3, 0] {
        let bits = (mode >> shift) & 0o7;
        out.push(if bits & 0o4 != 0 { 'r' } else { '-' });
        out.push(if bits & 0o2 != 0 { 'w' } else { '-' });
        out.push(if bits & 0o1 != 0 { 'x' } else { '-' });
    }
    out
}
