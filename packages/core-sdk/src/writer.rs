use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{GenerateError, Result};
use crate::models::{ArtifactBundle, WrittenArtifact, DIAGNOSTIC_FILE_NAME};

fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|source| GenerateError::Filesystem {
        path: dir.to_path_buf(),
        source,
    })
}

fn write_file(path: PathBuf, content: &str) -> Result<PathBuf> {
    fs::write(&path, content).map_err(|source| GenerateError::Filesystem {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

/**
 * \brief 写入产物包：按需创建目录（含父级），同名文件直接覆盖。
 * \return 按写入顺序返回已写文件
 */
pub fn write_bundle(bundle: &ArtifactBundle) -> Result<Vec<WrittenArtifact>> {
    ensure_dir(&bundle.dir)?;
    let mut written = Vec::with_capacity(bundle.artifacts.len());
    for artifact in &bundle.artifacts {
        let path = write_file(
            bundle.dir.join(artifact.kind.file_name()),
            &artifact.content,
        )?;
        written.push(WrittenArtifact {
            kind: artifact.kind,
            path,
        });
    }
    Ok(written)
}

/**
 * \brief 保存模型原始回复，供解析失败时排查。
 */
pub fn write_diagnostic(dir: &Path, raw_reply: &str) -> Result<PathBuf> {
    ensure_dir(dir)?;
    write_file(dir.join(DIAGNOSTIC_FILE_NAME), raw_reply)
}
