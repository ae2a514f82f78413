// ABOUTME: Artifact transfer from the local working copy to the remote host.
// ABOUTME: Streams a tar archive over SSH, excluding version-control metadata.

use std::path::Path;
use thiserror::Error;

use crate::ssh::RemoteRunner;

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("failed to archive working copy: {0}")]
    Archive(#[from] std::io::Error),

    #[error("remote extraction exited with code {code}: {detail}")]
    Extract { code: u32, detail: String },

    #[error("upload failed: {0}")]
    Upload(#[from] crate::ssh::Error),
}

/// Mirror `local` to `remote_dir` on the host.
///
/// The remote directory is recreated, so files deleted locally do not
/// linger remotely. The archive is extracted by a single remote invocation
/// consuming stdin.
pub async fn upload_tree<R: RemoteRunner + ?Sized>(
    runner: &R,
    local: &Path,
    remote_dir: &str,
) -> Result<(), TransferError> {
    let archive = build_archive(local)?;
    tracing::debug!(bytes = archive.len(), remote_dir, "uploading artifact archive");

    let command = format!(
        "rm -rf {dir} && mkdir -p {dir} && tar -xf - -C {dir}",
        dir = remote_dir
    );

    let output = runner.run_with_input(&command, &archive).await?;
    if !output.success() {
        return Err(TransferError::Extract {
            code: output.exit_code,
            detail: output.detail(),
        });
    }

    Ok(())
}

/// Build a plain tar of `root`, skipping any `.git` entry.
fn build_archive(root: &Path) -> std::io::Result<Vec<u8>> {
    let mut builder = tar::Builder::new(Vec::new());
    append_dir(&mut builder, root, root)?;
    builder.into_inner()
}

fn append_dir(
    builder: &mut tar::Builder<Vec<u8>>,
    root: &Path,
    dir: &Path,
) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        if entry.file_name() == ".git" {
            continue;
        }

        let rel = path
            .strip_prefix(root)
            .map_err(std::io::Error::other)?
            .to_path_buf();
        let file_type = entry.file_type()?;

        if file_type.is_dir() {
            builder.append_dir(&rel, &path)?;
            append_dir(builder, root, &path)?;
        } else if file_type.is_file() {
            builder.append_path_with_name(&path, &rel)?;
        }
        // Symlinks are not part of the deployable tree.
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn archive_names(archive: &[u8]) -> Vec<String> {
        let mut names = Vec::new();
        let mut reader = tar::Archive::new(archive);
        for entry in reader.entries().unwrap() {
            let entry = entry.unwrap();
            names.push(entry.path().unwrap().to_string_lossy().to_string());
        }
        names
    }

    #[test]
    fn archive_skips_git_metadata() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Dockerfile"), "FROM scratch\n").unwrap();
        std::fs::create_dir(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/main.txt"), "hello").unwrap();
        std::fs::create_dir(dir.path().join(".git")).unwrap();
        std::fs::write(dir.path().join(".git/HEAD"), "ref: refs/heads/main").unwrap();

        let archive = build_archive(dir.path()).unwrap();
        let names = archive_names(&archive);

        assert!(names.iter().any(|n| n == "Dockerfile"));
        assert!(names.iter().any(|n| n == "src/main.txt"));
        assert!(!names.iter().any(|n| n.starts_with(".git")));
    }

    #[test]
    fn archive_preserves_file_contents() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("app.conf"), "port=3000\n").unwrap();

        let archive = build_archive(dir.path()).unwrap();
        let mut reader = tar::Archive::new(&archive[..]);
        let mut contents = String::new();
        for entry in reader.entries().unwrap() {
            let mut entry = entry.unwrap();
            if entry.path().unwrap().to_string_lossy() == "app.conf" {
                entry.read_to_string(&mut contents).unwrap();
            }
        }

        assert_eq!(contents, "port=3000\n");
    }
}
