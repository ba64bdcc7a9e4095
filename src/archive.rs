//! Archive module
//!
//! Packs a directory's contents into ZIP or TAR archives and unpacks them
//! again, picking the format from the archive's file extension.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Archive source not found: {0}")]
    NotFound(PathBuf),

    #[error("Unsupported archive format: {0}")]
    UnsupportedFormat(String),
}

pub type Result<T> = std::result::Result<T, ArchiveError>;

/// Supported archive formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveFormat {
    #[default]
    Zip,
    Tar,
    #[serde(rename = "tar.gz", alias = "gztar", alias = "tgz")]
    TarGz,
}

impl ArchiveFormat {
    /// Detect archive format from file extension
    pub fn from_extension(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?.to_lowercase();
        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            return Some(Self::TarGz);
        }

        match Path::new(&name).extension().and_then(|e| e.to_str()) {
            Some("zip" | "jar" | "war" | "ear") => Some(Self::Zip),
            Some("tar") => Some(Self::Tar),
            _ => None,
        }
    }

    /// File extension written by `create_archive`, without the leading dot
    pub fn extension(self) -> &'static str {
        match self {
            Self::Zip => "zip",
            Self::Tar => "tar",
            Self::TarGz => "tar.gz",
        }
    }

    /// Append this format's extension to an archive base name.
    ///
    /// `/tmp/archive` becomes `/tmp/archive.zip`; existing dots in the base
    /// name are kept as they are.
    pub fn archive_path(self, base: &Path) -> PathBuf {
        let mut name = base.as_os_str().to_os_string();
        name.push(".");
        name.push(self.extension());
        PathBuf::from(name)
    }
}

impl FromStr for ArchiveFormat {
    type Err = ArchiveError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "zip" => Ok(Self::Zip),
            "tar" => Ok(Self::Tar),
            "tar.gz" | "tgz" | "gztar" => Ok(Self::TarGz),
            other => Err(ArchiveError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl std::fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// Write the contents of `source` (not `source` itself) into a new archive.
///
/// Entry names are relative to `source` and use `/` separators. The parent
/// directory of `archive_path` is created if needed, and the archive file is
/// never added to itself when it lives inside `source`. Returns the number of
/// entries written.
pub fn create_archive(source: &Path, archive_path: &Path, format: ArchiveFormat) -> Result<usize> {
    if !source.exists() {
        return Err(ArchiveError::NotFound(source.to_path_buf()));
    }

    if let Some(parent) = archive_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let file = File::create(archive_path)?;
    let count = match format {
        ArchiveFormat::Zip => write_zip(source, archive_path, BufWriter::new(file))?,
        ArchiveFormat::Tar => {
            let (mut writer, count) = write_tar(source, archive_path, BufWriter::new(file))?;
            writer.flush()?;
            count
        }
        ArchiveFormat::TarGz => {
            let encoder = flate2::write::GzEncoder::new(BufWriter::new(file), flate2::Compression::default());
            let (encoder, count) = write_tar(source, archive_path, encoder)?;
            encoder.finish()?.flush()?;
            count
        }
    };

    tracing::debug!("Wrote {} entries to {}", count, archive_path.display());
    Ok(count)
}

/// Unpack an archive into `destination`, creating it when missing.
///
/// The format comes from the archive's extension. Entries that would land
/// outside `destination` are not written.
pub fn unpack_archive(archive_path: &Path, destination: &Path) -> Result<ArchiveFormat> {
    if !archive_path.exists() {
        return Err(ArchiveError::NotFound(archive_path.to_path_buf()));
    }

    let format = ArchiveFormat::from_extension(archive_path)
        .ok_or_else(|| ArchiveError::UnsupportedFormat(archive_path.display().to_string()))?;

    fs::create_dir_all(destination)?;
    let reader = BufReader::new(File::open(archive_path)?);

    match format {
        ArchiveFormat::Zip => {
            let mut archive = zip::ZipArchive::new(reader)?;
            archive.extract(destination)?;
        }
        ArchiveFormat::Tar => tar::Archive::new(reader).unpack(destination)?,
        ArchiveFormat::TarGz => {
            tar::Archive::new(flate2::read::GzDecoder::new(reader)).unpack(destination)?;
        }
    }

    Ok(format)
}

// ZIP

fn write_zip<W: Write + io::Seek>(source: &Path, archive_path: &Path, writer: W) -> Result<usize> {
    let mut writer = zip::ZipWriter::new(writer);
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);

    let mut count = 0;
    for entry in source_entries(source, archive_path) {
        let entry = entry?;
        let name = entry_name(source, entry.path());

        if is_directory(&entry) {
            writer.add_directory(format!("{name}/"), options)?;
        } else {
            writer.start_file(name, options)?;
            let mut file = File::open(entry.path())?;
            io::copy(&mut file, &mut writer)?;
        }
        count += 1;
    }

    writer.finish()?.flush()?;
    Ok(count)
}

// TAR

fn write_tar<W: Write>(source: &Path, archive_path: &Path, writer: W) -> Result<(W, usize)> {
    let mut builder = tar::Builder::new(writer);

    let mut count = 0;
    for entry in source_entries(source, archive_path) {
        let entry = entry?;
        let name = entry_name(source, entry.path());

        if is_directory(&entry) {
            builder.append_dir(&name, entry.path())?;
        } else {
            builder.append_path_with_name(entry.path(), &name)?;
        }
        count += 1;
    }

    Ok((builder.into_inner()?, count))
}

fn source_entries<'a>(
    source: &Path,
    archive_path: &'a Path,
) -> impl Iterator<Item = std::result::Result<DirEntry, walkdir::Error>> + 'a {
    WalkDir::new(source)
        .min_depth(1)
        .into_iter()
        .filter_entry(move |e| e.path() != archive_path)
}

fn is_directory(entry: &DirEntry) -> bool {
    entry.file_type().is_dir() || (entry.path_is_symlink() && entry.path().is_dir())
}

fn entry_name(source: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(source).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
