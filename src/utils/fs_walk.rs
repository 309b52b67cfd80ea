//! 目录遍历
//!
//! 所有遍历都遵循同一顺序约定：条目按文件名排序，先深度优先处理子目录，再处理当前目录的文件。
//! 扁平化时重名后缀的分配顺序依赖这个约定。

use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// 单个目录内最多跳过的读取错误数，超过后停止读取该目录
const MAX_ENTRY_FAILURES: usize = 16;

/// 一个目录的直接子项（已排序）
#[derive(Debug, Default)]
pub struct DirListing {
    pub dirs: Vec<PathBuf>,
    pub files: Vec<PathBuf>,
}

/// 列出目录的直接子项
///
/// 单个条目读取或 stat 失败时跳过该条目；只有目录本身打开失败时返回错误
pub async fn list_dir(dir: &Path) -> std::io::Result<DirListing> {
    let mut entries = fs::read_dir(dir).await?;
    let mut raw = Vec::new();
    let mut failures = 0;
    while let Some(item) = entries.next_entry().await.transpose() {
        if item.is_err() {
            failures += 1;
        }
        raw.push(item.map(|entry| entry.path()));
        if failures > MAX_ENTRY_FAILURES {
            break;
        }
    }
    let mut paths = readable_paths(dir, raw);
    paths.sort();

    let mut listing = DirListing::default();
    for path in paths {
        match fs::metadata(&path).await {
            Ok(meta) if meta.is_dir() => listing.dirs.push(path),
            Ok(_) => listing.files.push(path),
            Err(e) => debug!("跳过无法访问的条目 {}: {}", path.display(), e),
        }
    }
    Ok(listing)
}

fn readable_paths(dir: &Path, entries: Vec<std::io::Result<PathBuf>>) -> Vec<PathBuf> {
    entries
        .into_iter()
        .filter_map(|entry| {
            entry
                .map_err(|e| warn!("⚠️  读取目录条目失败 {}：{}", dir.display(), e))
                .ok()
        })
        .collect()
}

/// 与 `list_dir` 相同，但读取失败时记录警告并返回空列表
pub async fn list_dir_lenient(dir: &Path) -> DirListing {
    list_dir(dir).await.unwrap_or_else(|e| {
        warn!("⚠️  读取目录失败 {}：{}", dir.display(), e);
        DirListing::default()
    })
}

/// 小写后缀（带点），没有后缀时为空字符串
pub fn extension_lower(path: &Path) -> String {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}

/// 后缀是否匹配（忽略大小写）
pub fn has_extension(path: &Path, ext: &str) -> bool {
    extension_lower(path) == ext.to_lowercase()
}

/// 递归收集指定后缀的所有文件
pub async fn collect_files_with_ext(dir: &Path, ext: &str) -> Vec<PathBuf> {
    let root = dir.to_path_buf();
    let ext = ext.to_string();
    tokio::task::spawn_blocking(move || walk_files_with_ext(&root, &ext))
        .await
        .unwrap_or_else(|e| {
            warn!("⚠️  遍历目录任务异常 {}：{}", dir.display(), e);
            Vec::new()
        })
}

fn walk_files_with_ext(root: &Path, ext: &str) -> Vec<PathBuf> {
    WalkDir::new(root)
        .follow_links(true)
        // 同级条目中目录在前，再按文件名排序
        .sort_by(|a, b| {
            b.file_type()
                .is_dir()
                .cmp(&a.file_type().is_dir())
                .then_with(|| a.file_name().cmp(b.file_name()))
        })
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                debug!("跳过无法访问的条目: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && has_extension(entry.path(), ext))
        .map(|entry| entry.into_path())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_extension_lower() {
        assert_eq!(extension_lower(Path::new("a/B.IPYNB")), ".ipynb");
        assert_eq!(extension_lower(Path::new("x.tar.gz")), ".gz");
        assert_eq!(extension_lower(Path::new("Makefile")), "");
        assert!(has_extension(Path::new("Hw.Py"), ".py"));
    }

    #[tokio::test]
    async fn test_collect_order_subdirs_first() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        std::fs::create_dir_all(root.join("b/inner")).unwrap();
        std::fs::create_dir_all(root.join("a")).unwrap();
        std::fs::write(root.join("0_root.ipynb"), "{}").unwrap();
        std::fs::write(root.join("a/x.ipynb"), "{}").unwrap();
        std::fs::write(root.join("b/inner/y.ipynb"), "{}").unwrap();
        std::fs::write(root.join("b/z.ipynb"), "{}").unwrap();
        std::fs::write(root.join("b/notes.txt"), "").unwrap();

        let found = collect_files_with_ext(root, ".ipynb").await;
        let rel: Vec<_> = found
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            rel,
            vec![
                PathBuf::from("a/x.ipynb"),
                PathBuf::from("b/inner/y.ipynb"),
                PathBuf::from("b/z.ipynb"),
                PathBuf::from("0_root.ipynb"),
            ]
        );
    }

    #[tokio::test]
    async fn test_list_dir_splits_and_sorts() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        std::fs::create_dir_all(root.join("sub")).unwrap();
        std::fs::write(root.join("b.txt"), "").unwrap();
        std::fs::write(root.join("a.txt"), "").unwrap();

        let listing = list_dir(root).await.unwrap();
        assert_eq!(listing.dirs, vec![root.join("sub")]);
        assert_eq!(listing.files, vec![root.join("a.txt"), root.join("b.txt")]);
        assert!(list_dir(&root.join("missing")).await.is_err());
    }

    #[test]
    fn test_failed_entry_keeps_the_rest() {
        let dir = Path::new("/data");
        let entries = vec![
            Ok(PathBuf::from("/data/a.zip")),
            Err(std::io::Error::new(std::io::ErrorKind::Other, "stale handle")),
            Ok(PathBuf::from("/data/b.zip")),
        ];
        assert_eq!(
            readable_paths(dir, entries),
            vec![PathBuf::from("/data/a.zip"), PathBuf::from("/data/b.zip")]
        );
    }

    #[tokio::test]
    async fn test_missing_dir_is_empty() {
        let found = collect_files_with_ext(Path::new("/nonexistent/dir"), ".py").await;
        assert!(found.is_empty());
    }
}
