// 该文件是 Guanwu （观物） 项目的一部分。
// src/assets.rs - 资源提取与暂存
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum AssetError {
  #[error("资源缺失: {0}")]
  Missing(String),
  #[error("I/O 错误: {0}")]
  Io(#[from] io::Error),
}

/// 只读资源仓库，按文件名取完整字节内容
pub trait AssetStore {
  fn read(&self, name: &str) -> Result<Vec<u8>, AssetError>;
}

/// 目录形式的资源仓库（打包的模型文件放在一个目录里）
pub struct DirAssetStore {
  root: PathBuf,
}

impl DirAssetStore {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }
}

impl AssetStore for DirAssetStore {
  fn read(&self, name: &str) -> Result<Vec<u8>, AssetError> {
    let path = self.root.join(name);
    match std::fs::read(&path) {
      Ok(bytes) => Ok(bytes),
      Err(e) if e.kind() == io::ErrorKind::NotFound => Err(AssetError::Missing(name.to_string())),
      Err(e) => Err(e.into()),
    }
  }
}

/// 内存资源仓库，用于内嵌资源与测试
#[derive(Default)]
pub struct MemoryAssetStore {
  entries: HashMap<String, Vec<u8>>,
}

impl MemoryAssetStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert(&mut self, name: impl Into<String>, bytes: impl Into<Vec<u8>>) {
    self.entries.insert(name.into(), bytes.into());
  }
}

impl AssetStore for MemoryAssetStore {
  fn read(&self, name: &str) -> Result<Vec<u8>, AssetError> {
    self
      .entries
      .get(name)
      .cloned()
      .ok_or_else(|| AssetError::Missing(name.to_string()))
  }
}

/// 资源暂存器
///
/// 推理库只接受文件系统路径，不接受内存缓冲，所以把打包资源
/// 完整复制到可写的暂存目录，返回复制后的路径。暂存副本不做清理。
pub struct Provisioner {
  staging: PathBuf,
}

impl Provisioner {
  /// 使用指定暂存目录
  pub fn new(staging: impl Into<PathBuf>) -> Self {
    Self {
      staging: staging.into(),
    }
  }

  /// 在 root 下创建一个按时间命名的会话级暂存目录
  pub fn session_under(root: impl AsRef<Path>) -> Self {
    let staging = root
      .as_ref()
      .join(format!("session-{}", Utc::now().format("%Y%m%d-%H%M%S")));
    Self { staging }
  }

  pub fn staging(&self) -> &Path {
    &self.staging
  }

  /// 把一个资源复制到暂存目录，返回写入后的路径
  pub fn provision(&self, store: &dyn AssetStore, name: &str) -> Result<PathBuf, AssetError> {
    let bytes = store.read(name)?;
    std::fs::create_dir_all(&self.staging)?;
    let path = self.staging.join(name);
    std::fs::write(&path, &bytes)?;
    info!("资源 {} 已暂存到 {}", name, path.display());
    Ok(path)
  }
}
