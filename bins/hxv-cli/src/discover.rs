//! 输入文件发现.
//!
//! 目录模式下只处理扩展名为 `.264`/`.265` 且文件头魔数正确的文件.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, warn};

/// HX 录像的文件扩展名
const HX_EXTENSIONS: &[&str] = &["265", "264"];

/// 扩展名是否为 HX 录像
fn has_hx_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| HX_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
}

/// 列出目录下的 HX 录像文件, 按路径排序
pub fn discover_inputs(dir: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    walk(dir, recursive, &mut found)?;
    found.sort();
    Ok(found)
}

fn walk(dir: &Path, recursive: bool, found: &mut Vec<PathBuf>) -> Result<()> {
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("无法读取目录 {}", dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        if path.is_dir() {
            if recursive {
                walk(&path, recursive, found)?;
            }
            continue;
        }
        if !has_hx_extension(&path) {
            continue;
        }
        match hxv::is_hx_file(&path) {
            Ok(true) => found.push(path),
            Ok(false) => debug!("跳过魔数不符的文件: {}", path.display()),
            Err(e) => warn!("无法读取 {}: {e}", path.display()),
        }
    }
    Ok(())
}

/// 目录模式下的输出路径: 保持相对目录结构, 替换扩展名
pub fn output_path_for(
    input: &Path,
    indir: &Path,
    outdir: Option<&Path>,
    format: &str,
) -> PathBuf {
    let Some(outdir) = outdir else {
        return hxv::rewrap::default_output_path(input, format);
    };
    let relative = input.strip_prefix(indir).unwrap_or(input);
    hxv::rewrap::default_output_path(&outdir.join(relative), format)
}
