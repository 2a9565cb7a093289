use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::error::AdminError;
use crate::guard::DeleteEndpoint;
use crate::listing::ListQuery;

const DEFAULT_PROVIDER: &str = "main";
const RECORD_EXTENSION: &str = "json";

fn default_provider() -> String {
    DEFAULT_PROVIDER.to_string()
}

/// A blog post as stored on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub slug: String,
    #[serde(default = "default_provider")]
    pub provide: String,
    #[serde(default)]
    pub public: bool,
    #[serde(default)]
    pub indexed: bool,
    #[serde(default)]
    pub creation: i64,
    #[serde(default)]
    pub modified: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub meta: BTreeMap<String, String>,
}

impl Post {
    pub fn new(slug: &str) -> Result<Self, AdminError> {
        validate_slug(slug)?;
        let now = now_unix();
        Ok(Self {
            slug: slug.to_string(),
            provide: default_provider(),
            public: false,
            indexed: false,
            creation: now,
            modified: now,
            title: String::new(),
            excerpt: String::new(),
            content: String::new(),
            tags: BTreeSet::new(),
            meta: BTreeMap::new(),
        })
    }
}

/// Slugs are dash-joined groups of `[a-z0-9]`, i.e. they match
/// `^[a-z0-9]+(-[a-z0-9]+)*$`.
pub fn validate_slug(slug: &str) -> Result<(), AdminError> {
    let valid = !slug.is_empty()
        && slug.split('-').all(|group| {
            !group.is_empty()
                && group
                    .bytes()
                    .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
        });
    if valid {
        Ok(())
    } else {
        Err(AdminError::InvalidSlug(slug.to_string()))
    }
}

/// Reject absolute paths and anything that could leave the post directory.
fn validate_file_name(name: &str) -> Result<(), AdminError> {
    let path = Path::new(name);
    let safe = !name.is_empty()
        && path
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
    if safe {
        Ok(())
    } else {
        Err(AdminError::UnsafeFileName(name.to_string()))
    }
}

pub fn now_unix() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

/// Directory of post records (`<slug>.json`) and per-post upload folders
/// (`<slug>/`).
#[derive(Debug, Clone)]
pub struct PostStore {
    root: PathBuf,
}

impl PostStore {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .with_context(|| format!("failed to create posts dir: {}", root.display()))?;
        Ok(Self { root })
    }

    fn record_path(&self, slug: &str) -> PathBuf {
        self.root.join(format!("{}.{}", slug, RECORD_EXTENSION))
    }

    /// Upload folder of a post.
    pub fn resource_dir(&self, slug: &str) -> PathBuf {
        self.root.join(slug)
    }

    pub fn exists(&self, slug: &str) -> bool {
        self.record_path(slug).is_file()
    }

    pub fn get(&self, slug: &str) -> Result<Post> {
        validate_slug(slug)?;
        let path = self.record_path(slug);
        if !path.is_file() {
            return Err(AdminError::PostNotFound(slug.to_string()).into());
        }
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to read post {}", path.display()))?;
        let post: Post = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse post {}", path.display()))?;
        Ok(post)
    }

    pub fn create(&self, slug: &str) -> Result<Post> {
        validate_slug(slug)?;
        if self.exists(slug) {
            return Err(AdminError::SlugExists(slug.to_string()).into());
        }
        let mut post = Post::new(slug)?;
        self.save(&mut post)?;
        info!(slug, "created post");
        Ok(post)
    }

    pub fn save(&self, post: &mut Post) -> Result<()> {
        validate_slug(&post.slug)?;
        if post.provide.is_empty() {
            post.provide = default_provider();
        }
        post.modified = now_unix();
        let path = self.record_path(&post.slug);
        let raw = serde_json::to_string_pretty(post).context("failed to serialize post")?;
        fs::write(&path, raw).with_context(|| format!("failed to write {}", path.display()))?;
        debug!(slug = %post.slug, "saved post record");
        Ok(())
    }

    pub fn all(&self) -> Result<Vec<Post>> {
        let mut posts = Vec::new();
        let entries = fs::read_dir(&self.root)
            .with_context(|| format!("failed to read posts dir: {}", self.root.display()))?;
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(RECORD_EXTENSION) {
                continue;
            }
            let Some(slug) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            if validate_slug(slug).is_err() {
                continue;
            }
            match self.get(slug) {
                Ok(post) => posts.push(post),
                Err(err) => warn!(slug, error = %format!("{:#}", err), "skipping unreadable post"),
            }
        }
        Ok(posts)
    }

    /// Remove a post record together with its upload folder.
    pub fn delete(&self, slug: &str) -> Result<()> {
        validate_slug(slug)?;
        let path = self.record_path(slug);
        if !path.is_file() {
            return Err(AdminError::PostNotFound(slug.to_string()).into());
        }
        fs::remove_file(&path).with_context(|| format!("failed to remove {}", path.display()))?;
        let dir = self.resource_dir(slug);
        if dir.is_dir() {
            fs::remove_dir_all(&dir)
                .with_context(|| format!("failed to remove {}", dir.display()))?;
        }
        info!(slug, "deleted post");
        Ok(())
    }

    /// Number of posts per provider, most used first.
    pub fn provider_counts(&self) -> Result<Vec<(String, usize)>> {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for post in self.all()? {
            *counts.entry(post.provide).or_default() += 1;
        }
        let mut counts: Vec<_> = counts.into_iter().collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        Ok(counts)
    }

    /// One page of posts matching `query`, newest first, plus the page count.
    pub fn list(&self, query: &ListQuery, page_size: usize) -> Result<(Vec<Post>, usize)> {
        let page_size = page_size.max(1);
        let mut matches: Vec<Post> = self
            .all()?
            .into_iter()
            .filter(|post| query.matches(post))
            .collect();
        matches.sort_by(|a, b| b.creation.cmp(&a.creation).then_with(|| a.slug.cmp(&b.slug)));
        let max_page = matches.len().div_ceil(page_size);
        let offset = (query.page - 1).saturating_mul(page_size);
        let page = matches.into_iter().skip(offset).take(page_size).collect();
        Ok((page, max_page))
    }

    /// Files attached to a post, relative to its folder, sorted.
    pub fn files(&self, slug: &str) -> Result<Vec<String>> {
        validate_slug(slug)?;
        let dir = self.resource_dir(slug);
        let mut files = Vec::new();
        if dir.is_dir() {
            collect_files(&dir, &dir, &mut files)?;
        }
        files.sort();
        Ok(files)
    }

    pub fn upload(&self, slug: &str, name: &str, source: &Path) -> Result<()> {
        validate_file_name(name)?;
        validate_slug(slug)?;
        if !self.exists(slug) {
            return Err(AdminError::PostNotFound(slug.to_string()).into());
        }
        let target = self.resource_dir(slug).join(name);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        fs::copy(source, &target).with_context(|| {
            format!("failed to copy {} to {}", source.display(), target.display())
        })?;
        info!(slug, name, "uploaded file");
        Ok(())
    }

    pub fn delete_file(&self, slug: &str, name: &str) -> Result<()> {
        validate_file_name(name)?;
        validate_slug(slug)?;
        let target = self.resource_dir(slug).join(name);
        if !target.is_file() {
            return Err(AdminError::FileNotFound {
                slug: slug.to_string(),
                name: name.to_string(),
            }
            .into());
        }
        fs::remove_file(&target).with_context(|| format!("failed to remove {}", target.display()))?;
        info!(slug, name, "deleted file");
        Ok(())
    }
}

/// Delete endpoint of one post: a submitted form removes the named file.
pub struct StoreEndpoint<'a> {
    store: &'a PostStore,
    slug: String,
}

impl<'a> StoreEndpoint<'a> {
    pub fn new(store: &'a PostStore, slug: impl Into<String>) -> Self {
        Self {
            store,
            slug: slug.into(),
        }
    }
}

impl DeleteEndpoint for StoreEndpoint<'_> {
    fn submit_delete(&mut self, name: &str) -> Result<()> {
        self.store.delete_file(&self.slug, name)
    }
}

fn collect_files(root: &Path, dir: &Path, out: &mut Vec<String>) -> Result<()> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        if path.is_dir() {
            collect_files(root, &path, out)?;
        } else if let Ok(relative) = path.strip_prefix(root) {
            let parts: Vec<String> = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            out.push(parts.join("/"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, PostStore) {
        let dir = TempDir::new().unwrap();
        let store = PostStore::open(dir.path().join("posts")).unwrap();
        (dir, store)
    }

    #[test]
    fn test_validate_slug() {
        assert!(validate_slug("hello").is_ok());
        assert!(validate_slug("hello-world-2").is_ok());
        assert!(validate_slug("").is_err());
        assert!(validate_slug("Hello").is_err());
        assert!(validate_slug("a--b").is_err());
        assert!(validate_slug("-a").is_err());
        assert!(validate_slug("a_b").is_err());
    }

    #[test]
    fn test_validate_file_name() {
        assert!(validate_file_name("cover.png").is_ok());
        assert!(validate_file_name("img/cover.png").is_ok());
        assert!(validate_file_name("../secret").is_err());
        assert!(validate_file_name("/etc/passwd").is_err());
        assert!(validate_file_name("").is_err());
    }

    #[test]
    fn test_create_rejects_duplicates() {
        let (_dir, store) = store();
        store.create("first").unwrap();
        let err = store.create("first").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AdminError>(),
            Some(AdminError::SlugExists(_))
        ));
    }

    #[test]
    fn test_save_roundtrip_defaults_provider() {
        let (_dir, store) = store();
        let mut post = store.create("note").unwrap();
        post.provide.clear();
        post.meta.insert("author".into(), "me".into());
        store.save(&mut post).unwrap();

        let loaded = store.get("note").unwrap();
        assert_eq!(loaded.provide, "main");
        assert_eq!(loaded.meta["author"], "me");
    }

    #[test]
    fn test_files_upload_and_delete() {
        let (dir, store) = store();
        store.create("gallery").unwrap();
        let source = dir.path().join("src.txt");
        fs::write(&source, "data").unwrap();

        assert!(store.files("gallery").unwrap().is_empty());
        store.upload("gallery", "b.txt", &source).unwrap();
        store.upload("gallery", "img/a.txt", &source).unwrap();
        assert_eq!(store.files("gallery").unwrap(), vec!["b.txt", "img/a.txt"]);

        store.delete_file("gallery", "img/a.txt").unwrap();
        assert_eq!(store.files("gallery").unwrap(), vec!["b.txt"]);
        assert!(store.delete_file("gallery", "img/a.txt").is_err());
    }

    #[test]
    fn test_list_paginates_newest_first() {
        let (_dir, store) = store();
        for (i, slug) in ["a", "b", "c"].iter().enumerate() {
            let mut post = store.create(slug).unwrap();
            post.creation = i as i64;
            store.save(&mut post).unwrap();
        }

        let (page, max_page) = store.list(&ListQuery::parse(""), 2).unwrap();
        assert_eq!(max_page, 2);
        let slugs: Vec<_> = page.iter().map(|p| p.slug.as_str()).collect();
        assert_eq!(slugs, vec!["c", "b"]);

        let (page, _) = store.list(&ListQuery::parse("page=2"), 2).unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].slug, "a");
    }

    #[test]
    fn test_list_skips_unreadable_records() {
        let (dir, store) = store();
        store.create("good").unwrap();
        fs::write(dir.path().join("posts").join("broken.json"), "{ not json").unwrap();

        let (page, max_page) = store.list(&ListQuery::parse(""), 10).unwrap();
        assert_eq!(max_page, 1);
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].slug, "good");
    }

    #[test]
    fn test_delete_removes_record_and_files() {
        let (dir, store) = store();
        store.create("gallery").unwrap();
        store.create("other").unwrap();
        let source = dir.path().join("src.txt");
        fs::write(&source, "data").unwrap();
        store.upload("gallery", "img/a.txt", &source).unwrap();

        store.delete("gallery").unwrap();
        assert!(!store.exists("gallery"));
        assert!(!store.resource_dir("gallery").exists());
        assert!(store.exists("other"));

        let err = store.delete("gallery").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AdminError>(),
            Some(AdminError::PostNotFound(_))
        ));
    }

    #[test]
    fn test_provider_counts_most_used_first() {
        let (_dir, store) = store();
        for (slug, provide) in [("a", "notes"), ("b", "main"), ("c", "notes"), ("d", "feed")] {
            let mut post = store.create(slug).unwrap();
            post.provide = provide.to_string();
            store.save(&mut post).unwrap();
        }

        let counts = store.provider_counts().unwrap();
        assert_eq!(
            counts,
            vec![
                ("notes".to_string(), 2),
                ("feed".to_string(), 1),
                ("main".to_string(), 1),
            ]
        );
    }
}
