//! The classpath index: maps binary names to the bytes of their class files
//! (or to registered source-backed declarations) across directory, JAR and
//! JMOD roots.
//!
//! Building the index only scans entry listings; class bytes are read on
//! first [`ClasspathIndex::locate`] and cached for the life of the index, so
//! repeated lookups never re-read the same file. Parsing the bytes into
//! symbols is the type system's job — the index implements
//! [`sable_types::TypeProvider`] as that bridge.

#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::ffi::OsStr;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use thiserror::Error;

use sable_classfile::ClassFile;
use sable_types::{TypeDefStub, TypeProvider};

#[derive(Debug, Error)]
pub enum ClasspathError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("classfile error: {0}")]
    ClassFile(#[from] sable_classfile::Error),
}

/// One classpath root.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ClasspathEntry {
    ClassDir(PathBuf),
    Jar(PathBuf),
    Jmod(PathBuf),
}

impl ClasspathEntry {
    pub fn path(&self) -> &Path {
        match self {
            ClasspathEntry::ClassDir(p) | ClasspathEntry::Jar(p) | ClasspathEntry::Jmod(p) => p,
        }
    }
}

/// What [`ClasspathIndex::locate`] found for a name.
#[derive(Debug, Clone)]
pub enum ClassSource {
    /// Raw class-file bytes, shared from the index's byte cache.
    Bytes(Arc<[u8]>),
    /// A declaration registered for this run, shadowing any binary entry.
    Source(TypeDefStub),
}

#[derive(Debug, Clone)]
enum Location {
    /// A `.class` file under a class directory.
    File(PathBuf),
    /// A member of the archive at `archive`.
    ZipMember { archive: PathBuf, member: String },
}

/// Lookup table from binary name to class-file location.
///
/// Earlier entries shadow later ones, matching JVM classpath order. The
/// index itself performs no parsing and caches nothing but raw bytes.
#[derive(Debug, Default)]
pub struct ClasspathIndex {
    locations: HashMap<String, Location>,
    sources: RwLock<HashMap<String, TypeDefStub>>,
    byte_cache: RwLock<HashMap<String, Arc<[u8]>>>,
}

impl ClasspathIndex {
    pub fn build(entries: &[ClasspathEntry]) -> Result<Self, ClasspathError> {
        let mut locations = HashMap::new();
        for entry in entries {
            tracing::debug!(entry = %entry.path().display(), "scanning classpath entry");
            let scanned = scan_entry(entry)?;
            for (binary_name, location) in scanned {
                // First entry on the path wins.
                locations.entry(binary_name).or_insert(location);
            }
        }

        Ok(Self {
            locations,
            sources: RwLock::new(HashMap::new()),
            byte_cache: RwLock::new(HashMap::new()),
        })
    }

    /// Registers an in-memory source-backed declaration for this run. It
    /// shadows any binary entry of the same name.
    pub fn register_source(&self, decl: TypeDefStub) {
        let binary_name = decl.class.internal_name.replace('/', ".");
        self.sources
            .write()
            .expect("lock poisoned")
            .insert(binary_name, decl);
    }

    /// Locates a binary name. `None` means not found — a normal outcome, not
    /// an error; resolution degrades the reference, not the whole program.
    pub fn locate(&self, binary_name: &str) -> Option<ClassSource> {
        let name = binary_name.replace('/', ".");

        if let Some(decl) = self.sources.read().expect("lock poisoned").get(&name) {
            return Some(ClassSource::Source(decl.clone()));
        }

        if let Some(bytes) = self.byte_cache.read().expect("lock poisoned").get(&name) {
            return Some(ClassSource::Bytes(bytes.clone()));
        }

        let location = self.locations.get(&name)?;
        let bytes: Arc<[u8]> = match read_location(location) {
            Ok(bytes) => bytes.into(),
            Err(err) => {
                tracing::warn!(name = %name, error = %err, "failed to read located class file");
                return None;
            }
        };

        let mut cache = self.byte_cache.write().expect("lock poisoned");
        let bytes = cache.entry(name).or_insert(bytes).clone();
        Some(ClassSource::Bytes(bytes))
    }

    /// Binary names of everything locatable, sorted. Registered sources are
    /// included.
    pub fn binary_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.locations.keys().cloned().collect();
        names.extend(self.sources.read().expect("lock poisoned").keys().cloned());
        names.sort();
        names.dedup();
        names
    }
}

impl TypeProvider for ClasspathIndex {
    fn lookup_type(&self, binary_name: &str) -> Option<TypeDefStub> {
        match self.locate(binary_name)? {
            ClassSource::Source(decl) => Some(decl),
            ClassSource::Bytes(bytes) => {
                match ClassFile::parse(&bytes).and_then(|class| class.stub()) {
                    Ok(stub) => Some(TypeDefStub::binary(stub)),
                    Err(err) => {
                        tracing::warn!(name = %binary_name, error = %err, "unreadable class file");
                        None
                    }
                }
            }
        }
    }
}

fn read_location(location: &Location) -> Result<Vec<u8>, ClasspathError> {
    match location {
        Location::File(path) => Ok(std::fs::read(path)?),
        Location::ZipMember { archive, member } => {
            let file = std::fs::File::open(archive)?;
            let mut archive = zip::ZipArchive::new(file)?;
            let mut entry = archive.by_name(member)?;
            let mut bytes = Vec::with_capacity(entry.size() as usize);
            entry.read_to_end(&mut bytes)?;
            Ok(bytes)
        }
    }
}

fn scan_entry(entry: &ClasspathEntry) -> Result<Vec<(String, Location)>, ClasspathError> {
    match entry {
        ClasspathEntry::ClassDir(dir) => scan_class_dir(dir),
        ClasspathEntry::Jar(path) => scan_zip(path, ZipKind::Jar),
        ClasspathEntry::Jmod(path) => scan_zip(path, ZipKind::Jmod),
    }
}

fn scan_class_dir(dir: &Path) -> Result<Vec<(String, Location)>, ClasspathError> {
    let mut out = Vec::new();
    for entry in walkdir::WalkDir::new(dir)
        .follow_links(false)
        .into_iter()
        .filter_map(Result::ok)
    {
        if !entry.file_type().is_file() {
            continue;
        }
        if entry.path().extension() != Some(OsStr::new("class")) {
            continue;
        }

        let relative = entry.path().strip_prefix(dir).unwrap_or(entry.path());
        let Some(binary_name) = binary_name_from_member(&relative.to_string_lossy()) else {
            continue;
        };
        out.push((binary_name, Location::File(entry.into_path())));
    }
    Ok(out)
}

enum ZipKind {
    Jar,
    Jmod,
}

fn scan_zip(path: &Path, kind: ZipKind) -> Result<Vec<(String, Location)>, ClasspathError> {
    let file = std::fs::File::open(path)?;
    let mut archive = zip::ZipArchive::new(file)?;

    let multi_release = match kind {
        ZipKind::Jar => jar_is_multi_release(&mut archive),
        ZipKind::Jmod => false,
    };

    // Per name: the best member seen so far. Version 0 is the base entry;
    // base wins over any versioned member, otherwise the highest version
    // wins.
    let mut best: HashMap<String, (u32, String)> = HashMap::new();

    for index in 0..archive.len() {
        let member = archive.by_index(index)?;
        if !member.is_file() {
            continue;
        }
        let member_name = member.name().to_owned();
        drop(member);

        if !member_name.ends_with(".class") {
            continue;
        }

        let (version, class_path) = match kind {
            ZipKind::Jmod => {
                // JMODs place class files under `classes/`.
                let Some(rest) = member_name.strip_prefix("classes/") else {
                    continue;
                };
                (0, rest.to_owned())
            }
            ZipKind::Jar => {
                if let Some(rest) = member_name.strip_prefix("META-INF/versions/") {
                    if !multi_release {
                        continue;
                    }
                    let Some((version, rest)) = rest.split_once('/') else {
                        continue;
                    };
                    let Ok(version) = version.parse::<u32>() else {
                        continue;
                    };
                    (version, rest.to_owned())
                } else if member_name.starts_with("META-INF/") {
                    continue;
                } else {
                    (0, member_name.clone())
                }
            }
        };

        let Some(binary_name) = binary_name_from_member(&class_path) else {
            continue;
        };

        match best.get(&binary_name) {
            None => {
                best.insert(binary_name, (version, member_name));
            }
            Some((existing, _)) => {
                if *existing == 0 {
                    continue;
                }
                if version == 0 || version > *existing {
                    best.insert(binary_name, (version, member_name));
                }
            }
        }
    }

    Ok(best
        .into_iter()
        .map(|(binary_name, (_, member))| {
            (
                binary_name,
                Location::ZipMember {
                    archive: path.to_path_buf(),
                    member,
                },
            )
        })
        .collect())
}

/// `com/example/Foo.class` (or a platform path) → `com.example.Foo`. Module
/// and package descriptors are not classes and yield `None`.
fn binary_name_from_member(member: &str) -> Option<String> {
    let stripped = member.strip_suffix(".class")?;
    let binary = stripped
        .replace(std::path::MAIN_SEPARATOR, ".")
        .replace('/', ".");
    let simple = binary.rsplit('.').next().unwrap_or(&binary);
    if simple == "module-info" || simple == "package-info" {
        return None;
    }
    Some(binary)
}

fn jar_is_multi_release<R: Read + std::io::Seek>(archive: &mut zip::ZipArchive<R>) -> bool {
    let mut file = match archive.by_name("META-INF/MANIFEST.MF") {
        Ok(file) => file,
        Err(_) => return false,
    };

    let mut manifest = String::new();
    if file.read_to_string(&mut manifest).is_err() {
        return false;
    }

    manifest.lines().any(|line| {
        line.split_once(':').is_some_and(|(key, value)| {
            key.trim().eq_ignore_ascii_case("Multi-Release")
                && value.trim().eq_ignore_ascii_case("true")
        })
    })
}
