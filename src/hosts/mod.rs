//! 本地 hosts 表
//!
//! 保留原文件中的注释、空行和未被修改过的条目原样输出；
//! 只有被增删过的条目会重新渲染为 `<ip>\t<host> <host>...`，每行保留原有的换行符（LF 或 CRLF）。

pub mod backup;
pub mod sync;

use std::fmt;
use std::path::{Path, PathBuf};

pub use backup::BackupManager;
pub use sync::HostSynchronizer;

/// 平台默认的 hosts 文件路径
pub fn default_hosts_path() -> PathBuf {
    if cfg!(windows) {
        let root = std::env::var("SystemRoot").unwrap_or_else(|_| r"C:\Windows".to_string());
        PathBuf::from(root).join(r"System32\drivers\etc\hosts")
    } else {
        PathBuf::from("/etc/hosts")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum HostsLine {
    /// 空行、注释或无法识别的行，原样保留
    Verbatim(String),
    Entry(HostEntry),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct HostEntry {
    ip: String,
    hostnames: Vec<String>,
    comment: Option<String>,
    /// 未修改时保留原始文本
    raw: Option<String>,
}

impl HostEntry {
    fn parse(line: &str) -> Option<Self> {
        let (body, comment) = match line.split_once('#') {
            Some((body, comment)) => (body, Some(comment.trim().to_string())),
            None => (line, None),
        };
        let mut fields = body.split_whitespace();
        let ip = fields.next()?.to_string();
        let hostnames: Vec<String> = fields.map(str::to_string).collect();
        if hostnames.is_empty() {
            return None;
        }
        Some(Self {
            ip,
            hostnames,
            comment,
            raw: Some(line.to_string()),
        })
    }

    fn has_host(&self, hostname: &str) -> bool {
        self.hostnames
            .iter()
            .any(|h| h.eq_ignore_ascii_case(hostname))
    }
}

impl fmt::Display for HostEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(raw) = &self.raw {
            return f.write_str(raw);
        }
        write!(f, "{}\t{}", self.ip, self.hostnames.join(" "))?;
        if let Some(comment) = &self.comment {
            write!(f, " # {}", comment)?;
        }
        Ok(())
    }
}

/// 一行内容及其原始换行符（`"\r\n"`、`"\n"`，文件末行可能为空）
#[derive(Debug, Clone, PartialEq, Eq)]
struct Line {
    content: HostsLine,
    ending: &'static str,
}

/// hosts 表：内存中的行集合 + 读写路径
#[derive(Debug, Clone)]
pub struct HostsFile {
    path: PathBuf,
    lines: Vec<Line>,
    /// 新增行使用的换行符，取自文件第一行
    newline: &'static str,
}

impl HostsFile {
    /// 从文件加载
    pub async fn load(path: impl Into<PathBuf>) -> std::io::Result<Self> {
        let path = path.into();
        let content = tokio::fs::read_to_string(&path).await?;
        Ok(Self::parse(path, &content))
    }

    /// 解析 hosts 文本，`path` 为之后 `save` 写入的位置
    pub fn parse(path: impl Into<PathBuf>, content: &str) -> Self {
        let lines: Vec<Line> = content
            .split_inclusive('\n')
            .map(|piece| {
                let (text, ending) = if let Some(text) = piece.strip_suffix("\r\n") {
                    (text, "\r\n")
                } else if let Some(text) = piece.strip_suffix('\n') {
                    (text, "\n")
                } else {
                    (piece, "")
                };
                Line {
                    content: parse_line(text),
                    ending,
                }
            })
            .collect();
        let newline = match lines.first().map(|line| line.ending) {
            Some("\r\n") => "\r\n",
            _ => "\n",
        };
        Self {
            path: path.into(),
            lines,
            newline,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 删除某个主机名的全部映射，没有主机名的条目会被移除
    ///
    /// 返回被移除映射的数量
    pub fn remove_host(&mut self, hostname: &str) -> usize {
        let mut removed = 0;
        self.lines.retain_mut(|line| {
            let HostsLine::Entry(entry) = &mut line.content else {
                return true;
            };
            if !entry.has_host(hostname) {
                return true;
            }
            let before = entry.hostnames.len();
            entry.hostnames.retain(|h| !h.eq_ignore_ascii_case(hostname));
            removed += before - entry.hostnames.len();
            entry.raw = None;
            !entry.hostnames.is_empty()
        });
        removed
    }

    /// 添加映射：优先追加到相同 IP 的第一条条目，否则新增一行
    pub fn add_host(&mut self, ip: &str, hostname: &str) {
        for line in self.lines.iter_mut() {
            if let HostsLine::Entry(entry) = &mut line.content
                && entry.ip == ip
            {
                if !entry.has_host(hostname) {
                    entry.hostnames.push(hostname.to_string());
                    entry.raw = None;
                }
                return;
            }
        }

        // 末行没有换行符时，新行接在它后面并继承“无换行”
        let ending = match self.lines.last_mut() {
            Some(last) if last.ending.is_empty() => {
                last.ending = self.newline;
                ""
            }
            _ => self.newline,
        };
        self.lines.push(Line {
            content: HostsLine::Entry(HostEntry {
                ip: ip.to_string(),
                hostnames: vec![hostname.to_string()],
                comment: None,
                raw: None,
            }),
            ending,
        });
    }

    /// 按文件顺序列出映射到该主机名的 IP
    pub fn hosts_for(&self, hostname: &str) -> Vec<&str> {
        self.entries()
            .filter(|entry| entry.has_host(hostname))
            .map(|entry| entry.ip.as_str())
            .collect()
    }

    /// 所有 (ip, 主机名列表)
    pub fn mappings(&self) -> Vec<(&str, Vec<&str>)> {
        self.entries()
            .map(|entry| {
                (
                    entry.ip.as_str(),
                    entry.hostnames.iter().map(String::as_str).collect(),
                )
            })
            .collect()
    }

    fn entries(&self) -> impl Iterator<Item = &HostEntry> {
        self.lines.iter().filter_map(|line| match &line.content {
            HostsLine::Entry(entry) => Some(entry),
            HostsLine::Verbatim(_) => None,
        })
    }

    /// 写回原路径
    pub async fn save(&self) -> std::io::Result<()> {
        self.save_as(&self.path).await
    }

    /// 原地覆盖写到指定路径
    pub async fn save_as(&self, path: &Path) -> std::io::Result<()> {
        tokio::fs::write(path, self.to_string()).await
    }
}

fn parse_line(text: &str) -> HostsLine {
    let trimmed = text.trim_start();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return HostsLine::Verbatim(text.to_string());
    }
    match HostEntry::parse(text) {
        Some(entry) => HostsLine::Entry(entry),
        None => HostsLine::Verbatim(text.to_string()),
    }
}

impl fmt::Display for HostsFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            match &line.content {
                HostsLine::Verbatim(raw) => f.write_str(raw)?,
                HostsLine::Entry(entry) => write!(f, "{}", entry)?,
            }
            f.write_str(line.ending)?;
        }
        Ok(())
    }
}
