//! Documentation-tree generation from a menu config.
//!
//! The config is a JSON menu: nodes with a title, optional content (the
//! generation instruction), and optional child items. The tree is walked
//! depth-first; every node with content becomes one Markdown page in a
//! directory mirroring the tree. Pages are independent generation jobs, so
//! they run under the bounded concurrency limit.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use quill_core::messages::ChatMessage;
use quill_llm::{CompletionGateway, CompletionOptions};

/// The documentation menu.
#[derive(Debug, Deserialize)]
pub struct Menu {
    /// Title of the whole documentation set.
    pub title: String,
    /// Top-level sections.
    #[serde(default)]
    pub items: Vec<MenuNode>,
}

/// One menu node.
#[derive(Debug, Deserialize)]
pub struct MenuNode {
    /// Section or page title.
    pub title: String,
    /// Generation instruction; nodes without content are pure directories.
    #[serde(default)]
    pub content: Option<String>,
    /// Child nodes.
    #[serde(default)]
    pub items: Vec<MenuNode>,
}

/// What one run produced.
#[derive(Debug, Default)]
pub struct DocsReport {
    /// Relative paths of the generated pages.
    pub pages: Vec<String>,
}

/// Visit every node depth-first with its slug trail.
pub fn for_each_menu_node<'a, F>(nodes: &'a [MenuNode], visit: &mut F)
where
    F: FnMut(&'a MenuNode, &[String]),
{
    fn walk<'a, F>(nodes: &'a [MenuNode], trail: &mut Vec<String>, visit: &mut F)
    where
        F: FnMut(&'a MenuNode, &[String]),
    {
        for node in nodes {
            trail.push(slug(&node.title));
            visit(node, trail);
            walk(&node.items, trail, visit);
            trail.pop();
        }
    }
    let mut trail = Vec::new();
    walk(nodes, &mut trail, visit);
}

/// File-system-safe slug of a title.
#[must_use]
pub fn slug(title: &str) -> String {
    let mut out = String::new();
    let mut pending_dash = false;
    for ch in title.to_lowercase().chars() {
        if ch.is_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(ch);
        } else {
            pending_dash = true;
        }
    }
    if out.is_empty() { "untitled".into() } else { out }
}

/// Where a node's page lives: `<trail>.md`, or `<trail>/index.md` for nodes
/// that also have children.
#[must_use]
pub fn page_path(trail: &[String], has_children: bool) -> PathBuf {
    let mut path: PathBuf = trail.iter().collect();
    if has_children {
        path.push("index.md");
    } else {
        let _ = path.set_extension("md");
    }
    path
}

/// The plain-text outline of the whole menu, given to every page as context.
#[must_use]
pub fn outline(menu: &Menu) -> String {
    let mut out = format!("{}\n", menu.title);
    for_each_menu_node(&menu.items, &mut |node, trail| {
        let indent = "  ".repeat(trail.len() - 1);
        out.push_str(&format!("{indent}- {}\n", node.title));
    });
    out
}

/// Generate the documentation tree.
pub async fn run(
    gateway: Arc<CompletionGateway>,
    root: &Path,
    config_path: &Path,
    out_dir: &Path,
    concurrency: usize,
) -> anyhow::Result<DocsReport> {
    let raw = std::fs::read_to_string(root.join(config_path))?;
    let menu: Menu = serde_json::from_str(&raw)?;
    let outline = outline(&menu);

    // Collect pages first; generation is async and the walk is not.
    let mut pages: Vec<(String, String, PathBuf)> = Vec::new();
    for_each_menu_node(&menu.items, &mut |node, trail| {
        if let Some(content) = &node.content {
            pages.push((
                node.title.clone(),
                content.clone(),
                page_path(trail, !node.items.is_empty()),
            ));
        }
    });
    info!(pages = pages.len(), "generating documentation tree");

    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let out_root = root.join(out_dir);
    let outcomes = futures::future::join_all(pages.iter().map(|(title, content, rel)| {
        let semaphore = Arc::clone(&semaphore);
        let gateway = &gateway;
        let outline = outline.as_str();
        let out_root = &out_root;
        async move {
            let Ok(_permit) = semaphore.acquire().await else {
                return None;
            };
            match generate_page(gateway, outline, title, content, &out_root.join(rel)).await {
                Ok(()) => Some(rel.to_string_lossy().into_owned()),
                Err(e) => {
                    warn!(title, error = %e, "page generation failed");
                    None
                }
            }
        }
    }))
    .await;

    Ok(DocsReport {
        pages: outcomes.into_iter().flatten().collect(),
    })
}

async fn generate_page(
    gateway: &CompletionGateway,
    outline: &str,
    title: &str,
    content: &str,
    target: &Path,
) -> anyhow::Result<()> {
    let messages = vec![
        ChatMessage::system(format!(
            "You are writing one page of a documentation set in Markdown. The outline of \
             the whole set:\n{outline}"
        )),
        ChatMessage::user(format!(
            "Write the documentation page titled \"{title}\". {content}"
        )),
    ];
    let completion = gateway
        .complete(&messages, &CompletionOptions::default())
        .await?;

    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(target, completion.text).await?;
    info!(page = %target.display(), "documentation page written");
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
